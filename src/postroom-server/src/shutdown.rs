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
use crate::{Deliver, DispatchError, Dispatcher, InFlight, TaskSource};

/// Outcome of the drain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Drain {
    /// Every delivery dispatched so far has concluded.
    Completed,
    /// The drain timeout elapsed first, those deliveries were abandoned.
    TimedOut {
        /// Deliveries still in flight.
        abandoned: usize,
    },
}

/// Runs the dispatch loop until an interrupt, then waits for the in-flight deliveries.
///
/// The drain is cooperative: deliveries are never cancelled. Without a drain timeout,
/// a delivery stuck on an unresponsive relay keeps the process alive.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShutdownCoordinator {
    drain_timeout: Option<std::time::Duration>,
}

impl ShutdownCoordinator {
    /// Create a coordinator, `None` waits for the deliveries without limit.
    #[must_use]
    pub const fn new(drain_timeout: Option<std::time::Duration>) -> Self {
        Self { drain_timeout }
    }

    /// Wait for `in_flight` to reach zero, or for the drain timeout.
    #[tracing::instrument(name = "drain", skip_all, fields(in_flight = in_flight.count()))]
    pub async fn drain(&self, in_flight: &InFlight) -> Drain {
        tracing::info!("Waiting for in-progress tasks to finish.");

        match self.drain_timeout {
            None => in_flight.wait_idle().await,
            Some(drain_timeout) => {
                if tokio::time::timeout(drain_timeout, in_flight.wait_idle())
                    .await
                    .is_err()
                {
                    let abandoned = in_flight.count();
                    tracing::warn!(abandoned, ?drain_timeout, "Drain timeout reached.");
                    return Drain::TimedOut { abandoned };
                }
            }
        }

        tracing::info!("Tasks finished.");
        Drain::Completed
    }

    /// Run `dispatcher` until `interrupt` resolves, stop popping, then drain.
    ///
    /// A single interrupt starts the one and only shutdown sequence.
    ///
    /// # Errors
    ///
    /// * the dispatch loop stopped on its own (the deliveries are drained first)
    pub async fn run<S, D, F>(
        self,
        dispatcher: Dispatcher<S, D>,
        interrupt: F,
    ) -> Result<Drain, DispatchError>
    where
        S: TaskSource + 'static,
        D: Deliver,
        F: std::future::Future<Output = ()> + Send,
    {
        let in_flight = dispatcher.in_flight().clone();
        let mut dispatch = tokio::spawn(dispatcher.run());

        tokio::select! {
            () = interrupt => {
                dispatch.abort();
                tracing::info!("Interrupt received.");

                Ok(self.drain(&in_flight).await)
            }
            joined = &mut dispatch => {
                let error = match joined {
                    Ok(Ok(never)) => match never {},
                    Ok(Err(error)) => error,
                    Err(error) => DispatchError::Aborted(error),
                };
                tracing::error!(%error, "Dispatch loop stopped.");

                self.drain(&in_flight).await;
                Err(error)
            }
        }
    }
}
