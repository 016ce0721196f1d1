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

//! Postroom delivery
//!
//! Turns one queued [`Task`] into one SMTP transaction against the configured relay.

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

mod error;
mod mailer;
mod task;
mod template;

pub use error::{DecodeError, DeliveryError};
pub use mailer::{Mailer, SmtpSettings, TransportKind};
pub use task::Task;
pub use template::{Template, DEFAULT_TEMPLATE};

/// Mailbox address used for the sender and the envelope recipients.
pub use lettre::Address;
/// Reply of the relay once the message has been accepted.
pub use lettre::transport::smtp::response::Response;
