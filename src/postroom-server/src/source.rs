/*
 * Postroom mail worker
 * Copyright (C) 2023 viridIT SAS
 *
 * This program is free software: you can redistribute it and/or modify it under
 * the terms of the GNU General Public License as published by the Free Software
 * Foundation, either version 3 of the License, or any later version.
 *
 * This program is distributed in the hope that it will be useful, but WITHOUT
 * ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
 * FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License along with
 * this program. If not, see https://www.gnu.org/licenses/.
 *
*/
use crate::QueueError;
use redis::AsyncCommands;

/// A shared list of serialized tasks, consumed with a blocking pop.
///
/// Popped entries are removed from the source, whatever happens to them afterward.
#[async_trait::async_trait]
pub trait TaskSource: Send {
    /// Wait, without timeout, for the next entry and return its raw payload.
    async fn pop(&mut self) -> Result<Vec<u8>, QueueError>;
}

/// Accept both the bare `host:port` form and a full redis url.
#[must_use]
pub fn redis_url(address: &str) -> String {
    if address.contains("://") {
        address.to_owned()
    } else {
        format!("redis://{address}")
    }
}

/// A redis list popped with `BRPOP`.
pub struct RedisQueue {
    connection: redis::aio::Connection,
    key: String,
}

impl std::fmt::Debug for RedisQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisQueue")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl RedisQueue {
    /// Open a dedicated connection: the blocking pop holds it for as long as the list is empty.
    ///
    /// # Errors
    ///
    /// * the address is not a valid redis url
    /// * the server cannot be reached
    #[tracing::instrument(skip(key), err)]
    pub async fn connect(address: &str, key: impl Into<String> + Send) -> Result<Self, QueueError> {
        let client = redis::Client::open(redis_url(address).as_str()).map_err(QueueError::Connection)?;
        let connection = client
            .get_async_connection()
            .await
            .map_err(QueueError::Connection)?;

        Ok(Self {
            connection,
            key: key.into(),
        })
    }

    /// Name of the list.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }
}

#[async_trait::async_trait]
impl TaskSource for RedisQueue {
    async fn pop(&mut self) -> Result<Vec<u8>, QueueError> {
        loop {
            // a zero timeout blocks until an entry is pushed
            let popped: Option<(String, Vec<u8>)> = self.connection.brpop(&self.key, 0.0).await?;

            if let Some((_, payload)) = popped {
                return Ok(payload);
            }
        }
    }
}
