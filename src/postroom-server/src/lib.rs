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

//! Postroom server
//!
//! **task list** -> [`Dispatcher`] -> one spawned delivery per task, counted by [`InFlight`]
//! until the [`ShutdownCoordinator`] drains them.

#![doc(html_no_source)]
#![deny(missing_docs)]
#![forbid(unsafe_code)]
//
#![warn(rust_2018_idioms)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::cargo)]
//
#![allow(clippy::multiple_crate_versions)]

mod dispatcher;
mod error;
mod in_flight;
mod shutdown;
mod source;

pub use dispatcher::{Deliver, Dispatcher, Step, DEFAULT_MAX_POP_ERRORS};
pub use error::{DispatchError, QueueError};
pub use in_flight::{InFlight, InFlightGuard};
pub use shutdown::{Drain, ShutdownCoordinator};
pub use source::{redis_url, RedisQueue, TaskSource};
