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

/// Failure to decode a queue entry into a [`crate::Task`].
#[derive(Debug, thiserror::Error)]
#[error("malformed task payload: {0}")]
pub struct DecodeError(#[from] serde_json::Error);

/// Failure of one delivery. Never retried.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The envelope would have no recipient.
    #[error("task has no recipient")]
    NoRecipient,
    /// A recipient is not a valid mailbox.
    #[error("'{address}' is not a valid address: {source}")]
    Address {
        /// Recipient as written in the task.
        address: String,
        /// Parsing error.
        #[source]
        source: lettre::address::AddressError,
    },
    /// The envelope was rejected before reaching the relay.
    #[error("cannot build envelope: {0}")]
    Envelope(#[from] lettre::error::Error),
    /// The tls parameters for the relay could not be built.
    #[error("cannot setup tls for '{host}': {source}")]
    Tls {
        /// Relay hostname.
        host: String,
        /// Tls error.
        #[source]
        source: lettre::transport::smtp::Error,
    },
    /// The relay could not be reached, refused the credentials or rejected the transaction.
    #[error("relay '{relay}' failed: {source}")]
    Transport {
        /// `host:port` of the relay.
        relay: String,
        /// Smtp error.
        #[source]
        source: lettre::transport::smtp::Error,
    },
}

impl DeliveryError {
    /// Where the delivery failed, used as logging context.
    ///
    /// * `envelope`: the task cannot be addressed, the relay was not contacted
    /// * `tls`: tls setup or handshake
    /// * `connection`: the relay cannot be reached or dropped the session
    /// * `timeout`: the relay did not answer in time
    /// * `rejected`: permanent (5xx) reply to a command, including `AUTH`
    /// * `deferred`: transient (4xx) reply to a command
    /// * `protocol`: the reply could not be understood
    ///
    /// The command that failed is in the error message.
    #[must_use]
    pub fn stage(&self) -> &'static str {
        match self {
            Self::NoRecipient | Self::Address { .. } | Self::Envelope(_) => "envelope",
            Self::Tls { .. } => "tls",
            Self::Transport { source, .. } if source.is_permanent() => "rejected",
            Self::Transport { source, .. } if source.is_transient() => "deferred",
            Self::Transport { source, .. } if source.is_timeout() => "timeout",
            Self::Transport { source, .. } if source.is_tls() => "tls",
            Self::Transport { source, .. } if source.is_response() || source.is_client() => {
                "protocol"
            }
            Self::Transport { .. } => "connection",
        }
    }
}
