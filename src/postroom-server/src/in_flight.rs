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

/// Number of deliveries currently running.
///
/// Incremented right before a delivery is spawned, decremented when its
/// [`InFlightGuard`] is dropped, whatever the outcome of the delivery.
#[derive(Debug, Clone, Default)]
pub struct InFlight {
    inner: std::sync::Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    count: std::sync::atomic::AtomicUsize,
    idle: tokio::sync::Notify,
}

/// One delivery in flight, released on drop.
#[must_use]
#[derive(Debug)]
pub struct InFlightGuard {
    inner: std::sync::Arc<Inner>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self
            .inner
            .count
            .fetch_sub(1, std::sync::atomic::Ordering::SeqCst)
            == 1
        {
            self.inner.idle.notify_waiters();
        }
    }
}

impl InFlight {
    /// Create a counter at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one delivery.
    pub fn enter(&self) -> InFlightGuard {
        self.inner
            .count
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        InFlightGuard {
            inner: self.inner.clone(),
        }
    }

    /// Number of deliveries in flight.
    #[must_use]
    pub fn count(&self) -> usize {
        self.inner.count.load(std::sync::atomic::Ordering::SeqCst)
    }

    /// Wait until no delivery is in flight.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.inner.idle.notified();
            tokio::pin!(notified);
            // registered before reading the count, so a release in between is not missed
            notified.as_mut().enable();

            if self.count() == 0 {
                return;
            }
            notified.await;
        }
    }
}
