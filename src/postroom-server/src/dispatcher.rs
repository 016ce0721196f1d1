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
use crate::{DispatchError, InFlight, QueueError, TaskSource};
use postroom_delivery::{Mailer, Task};

/// Consecutive transient pop failures tolerated before the loop gives up.
pub const DEFAULT_MAX_POP_ERRORS: u32 = 5;

/// Something that runs one delivery to completion.
///
/// Failures are reported by the implementation itself, never to the dispatch loop.
#[async_trait::async_trait]
pub trait Deliver: Send + Sync + 'static {
    /// Deliver one task.
    async fn deliver(&self, task: Task);
}

#[async_trait::async_trait]
impl Deliver for Mailer {
    async fn deliver(&self, task: Task) {
        Mailer::deliver(self, &task).await;
    }
}

/// Outcome of one iteration of the dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// A delivery has been spawned.
    Dispatched,
    /// The payload could not be decoded and was dropped.
    Discarded,
}

/// Pops tasks one at a time and spawns one delivery per task.
pub struct Dispatcher<S, D> {
    source: S,
    deliverer: std::sync::Arc<D>,
    in_flight: InFlight,
    max_pop_errors: u32,
}

impl<S, D> std::fmt::Debug for Dispatcher<S, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("in_flight", &self.in_flight)
            .field("max_pop_errors", &self.max_pop_errors)
            .finish_non_exhaustive()
    }
}

impl<S: TaskSource + 'static, D: Deliver> Dispatcher<S, D> {
    /// Create a dispatcher counting its deliveries in `in_flight`.
    pub fn new(source: S, deliverer: std::sync::Arc<D>, in_flight: InFlight) -> Self {
        Self {
            source,
            deliverer,
            in_flight,
            max_pop_errors: DEFAULT_MAX_POP_ERRORS,
        }
    }

    /// Set the number of consecutive transient pop failures tolerated, at least one.
    #[must_use]
    pub fn with_max_pop_errors(mut self, max_pop_errors: u32) -> Self {
        self.max_pop_errors = max_pop_errors.max(1);
        self
    }

    /// Counter of the deliveries spawned by this dispatcher.
    #[must_use]
    pub const fn in_flight(&self) -> &InFlight {
        &self.in_flight
    }

    /// Pop one entry, decode it, and spawn its delivery.
    ///
    /// # Errors
    ///
    /// * the pop failed
    pub async fn step(&mut self) -> Result<Step, QueueError> {
        let payload = self.source.pop().await?;
        tracing::info!("Processing task from list.");

        let task = match Task::decode(&payload) {
            Ok(task) => task,
            Err(error) => {
                tracing::warn!(%error, "Discarding task.");
                return Ok(Step::Discarded);
            }
        };

        let guard = self.in_flight.enter();
        tracing::debug!(
            in_flight = self.in_flight.count(),
            recipients = task.recipients().len(),
            "Dispatching task."
        );

        let deliverer = self.deliverer.clone();
        tokio::spawn(async move {
            let _guard = guard;
            deliverer.deliver(task).await;
        });

        Ok(Step::Dispatched)
    }

    /// Pop and dispatch forever.
    ///
    /// # Errors
    ///
    /// * the queue connection is unusable
    /// * too many consecutive pops failed
    #[tracing::instrument(name = "dispatch", skip_all)]
    pub async fn run(mut self) -> Result<std::convert::Infallible, DispatchError> {
        let mut failures = 0;

        loop {
            match self.step().await {
                Ok(_) => failures = 0,
                Err(error) if error.is_terminal() => {
                    tracing::error!(%error, "Cannot pop from list.");
                    return Err(DispatchError::Queue(error));
                }
                Err(error) => {
                    failures += 1;
                    tracing::warn!(%error, failures, max = self.max_pop_errors, "Pop from list failed.");

                    if failures >= self.max_pop_errors {
                        return Err(DispatchError::TooManyErrors {
                            count: failures,
                            last: error,
                        });
                    }
                }
            }
        }
    }
}
