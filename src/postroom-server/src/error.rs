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

/// Failure of a pop on the task list.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// The connection to the queue is unusable.
    #[error("queue connection failure: {0}")]
    Connection(#[source] redis::RedisError),
    /// The command failed, but the connection is still up.
    #[error("queue command failure: {0}")]
    Command(#[source] redis::RedisError),
}

impl From<redis::RedisError> for QueueError {
    fn from(error: redis::RedisError) -> Self {
        if error.is_io_error() || error.is_connection_dropped() || error.is_connection_refusal() {
            Self::Connection(error)
        } else {
            Self::Command(error)
        }
    }
}

impl QueueError {
    /// Can the dispatch loop keep popping after this error ?
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

/// Reason the dispatch loop stopped.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The queue connection is unusable.
    #[error("cannot pop from list: {0}")]
    Queue(#[source] QueueError),
    /// Too many pops failed in a row.
    #[error("cannot pop from list, {count} consecutive failures, last: {last}")]
    TooManyErrors {
        /// Number of consecutive failures.
        count: u32,
        /// Last failure.
        #[source]
        last: QueueError,
    },
    /// The dispatch task panicked or was cancelled.
    #[error("dispatch loop aborted: {0}")]
    Aborted(#[from] tokio::task::JoinError),
}
