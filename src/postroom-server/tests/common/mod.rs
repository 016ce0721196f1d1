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

use postroom_delivery::Task;
use postroom_server::{Deliver, QueueError, TaskSource};

/// A task source serving a fixed script, then blocking forever like an empty list.
pub struct ScriptedSource(pub std::collections::VecDeque<Result<Vec<u8>, QueueError>>);

impl ScriptedSource {
    pub fn new(entries: impl IntoIterator<Item = Result<Vec<u8>, QueueError>>) -> Self {
        Self(entries.into_iter().collect())
    }
}

#[async_trait::async_trait]
impl TaskSource for ScriptedSource {
    async fn pop(&mut self) -> Result<Vec<u8>, QueueError> {
        match self.0.pop_front() {
            Some(entry) => entry,
            None => std::future::pending().await,
        }
    }
}

pub fn payload(subject: &str, recipients: &[&str]) -> Result<Vec<u8>, QueueError> {
    Ok(serde_json::to_vec(&Task::new(subject, "<p>hello</p>", recipients.iter().copied())).unwrap())
}

pub fn connection_lost() -> Result<Vec<u8>, QueueError> {
    Err(redis::RedisError::from(std::io::Error::from(std::io::ErrorKind::ConnectionReset)).into())
}

pub fn wrong_type() -> Result<Vec<u8>, QueueError> {
    Err(redis::RedisError::from((
        redis::ErrorKind::ResponseError,
        "WRONGTYPE Operation against a key holding the wrong kind of value",
    ))
    .into())
}

/// A deliverer holding each delivery until a permit is released.
pub struct GatedDeliverer {
    pub gate: tokio::sync::Semaphore,
    pub delivered: std::sync::Mutex<Vec<Task>>,
}

impl GatedDeliverer {
    pub fn closed() -> Self {
        Self {
            gate: tokio::sync::Semaphore::new(0),
            delivered: std::sync::Mutex::default(),
        }
    }

    pub fn open() -> Self {
        Self {
            gate: tokio::sync::Semaphore::new(1024),
            delivered: std::sync::Mutex::default(),
        }
    }

    pub fn subjects(&self) -> Vec<String> {
        let mut subjects = self
            .delivered
            .lock()
            .unwrap()
            .iter()
            .map(|task| task.subject().to_owned())
            .collect::<Vec<_>>();
        subjects.sort();
        subjects
    }
}

#[async_trait::async_trait]
impl Deliver for GatedDeliverer {
    async fn deliver(&self, task: Task) {
        self.gate.acquire().await.unwrap().forget();
        self.delivered.lock().unwrap().push(task);
    }
}

/// Poll `condition` until it holds, failing the test after a few seconds.
pub async fn eventually(condition: impl Fn() -> bool) {
    tokio::time::timeout(std::time::Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
}

/// In-memory sink for the events emitted while a test runs.
///
/// Installed with `set_default`, so only a current-thread runtime sees every event.
#[derive(Clone, Default)]
pub struct Logs(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

impl Logs {
    pub fn subscriber(&self) -> impl tracing::Subscriber + Send + Sync {
        tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish()
    }

    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for Logs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for Logs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
