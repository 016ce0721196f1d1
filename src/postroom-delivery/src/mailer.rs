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
use crate::{DeliveryError, Task, Template};
use lettre::address::Envelope;
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::transport::smtp::client::{Tls, TlsParameters};
use lettre::transport::smtp::response::Response;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};

/// Settings of the relay, loaded once at startup.
#[derive(Clone)]
pub struct SmtpSettings {
    /// Hostname of the relay.
    pub host: String,
    /// Port of the relay.
    pub port: u16,
    /// Address used in the `From:` header and the `MAIL FROM` command.
    pub sender: lettre::Address,
    /// Username for `AUTH PLAIN`.
    pub username: Option<String>,
    /// Password for `AUTH PLAIN`.
    pub password: Option<String>,
    /// Timeout of each smtp command, `None` waits forever.
    pub timeout: Option<std::time::Duration>,
    /// Template of the message.
    pub template: Template,
}

impl std::fmt::Debug for SmtpSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("sender", &self.sender)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl SmtpSettings {
    /// Credentials to authenticate with, only if both username and password are non-empty.
    #[must_use]
    pub fn credentials(&self) -> Option<Credentials> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Some(Credentials::new(username.to_owned(), password.to_owned()))
            }
            _ => None,
        }
    }
}

/// How the mailer talks to the relay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum TransportKind {
    /// `AUTH PLAIN` submission, upgraded with STARTTLS when the relay offers it.
    /// Every recipient is on the envelope.
    Authenticated,
    /// Plain MAIL / RCPT / DATA session. Only the first recipient is on the envelope,
    /// the `To:` header still lists all of them.
    Unauthenticated,
}

/// Sends [`Task`]s to the relay.
pub struct Mailer {
    settings: SmtpSettings,
    relay: String,
    kind: TransportKind,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl std::fmt::Debug for Mailer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mailer")
            .field("settings", &self.settings)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl Mailer {
    /// Build the transport for the relay.
    ///
    /// # Errors
    ///
    /// * the tls parameters for the relay hostname cannot be built (authenticated only)
    pub fn new(settings: SmtpSettings) -> Result<Self, DeliveryError> {
        let relay = format!("{}:{}", settings.host, settings.port);
        let builder = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
            .port(settings.port)
            .timeout(settings.timeout);

        let (kind, transport) = if let Some(credentials) = settings.credentials() {
            let tls = TlsParameters::new(settings.host.clone()).map_err(|source| {
                DeliveryError::Tls {
                    host: settings.host.clone(),
                    source,
                }
            })?;

            (
                TransportKind::Authenticated,
                builder
                    .credentials(credentials)
                    .authentication(vec![Mechanism::Plain])
                    .tls(Tls::Opportunistic(tls))
                    .build(),
            )
        } else {
            tracing::warn!(%relay, "No auth details provided, using unauthenticated SMTP.");
            (TransportKind::Unauthenticated, builder.build())
        };

        Ok(Self {
            settings,
            relay,
            kind,
            transport,
        })
    }

    /// Transport selected from the settings.
    #[must_use]
    pub const fn kind(&self) -> TransportKind {
        self.kind
    }

    /// `host:port` of the relay.
    #[must_use]
    pub fn relay(&self) -> &str {
        &self.relay
    }

    /// Render the message sent after `DATA`.
    #[must_use]
    pub fn render(&self, task: &Task) -> String {
        self.settings.template.render(
            &task.recipients().join(", "),
            self.settings.sender.as_ref(),
            task.subject(),
            task.message(),
        )
    }

    /// Envelope of the transaction for the selected transport.
    ///
    /// # Errors
    ///
    /// * there is no recipient
    /// * a recipient on the envelope is not a valid address
    pub fn envelope(&self, task: &Task) -> Result<Envelope, DeliveryError> {
        let recipients = match self.kind {
            TransportKind::Authenticated => task.recipients(),
            TransportKind::Unauthenticated => task.recipients().get(..1).unwrap_or_default(),
        };

        if recipients.is_empty() {
            return Err(DeliveryError::NoRecipient);
        }

        let to = recipients
            .iter()
            .map(|address| {
                address
                    .parse::<lettre::Address>()
                    .map_err(|source| DeliveryError::Address {
                        address: address.clone(),
                        source,
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Envelope::new(Some(self.settings.sender.clone()), to)?)
    }

    /// Run one smtp transaction for the task.
    ///
    /// # Errors
    ///
    /// * see [`Mailer::envelope`]
    /// * the relay is unreachable, refused the credentials or rejected the sender, a recipient or the message
    pub async fn submit(&self, task: &Task) -> Result<Response, DeliveryError> {
        let envelope = self.envelope(task)?;
        let message = self.render(task);

        tracing::debug!("Sending email to SMTP server.");

        self.transport
            .send_raw(&envelope, message.as_bytes())
            .await
            .map_err(|source| DeliveryError::Transport {
                relay: self.relay.clone(),
                source,
            })
    }

    /// Run one smtp transaction for the task, and log the outcome.
    ///
    /// Failures are terminal: the task is dropped.
    #[tracing::instrument(name = "delivery", skip_all, fields(relay = %self.relay, transport = %self.kind, recipients = task.recipients().len()))]
    pub async fn deliver(&self, task: &Task) {
        match self.submit(task).await {
            Ok(response) => {
                tracing::info!(code = %response.code(), "Email sent successfully.");
            }
            Err(error) => {
                tracing::error!(relay = %self.relay, stage = %error.stage(), %error, "Email delivery failure.");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn settings(username: Option<&str>, password: Option<&str>) -> SmtpSettings {
        SmtpSettings {
            host: "localhost".to_owned(),
            port: 25,
            sender: "noreply@x.com".parse().unwrap(),
            username: username.map(str::to_owned),
            password: password.map(str::to_owned),
            timeout: None,
            template: Template::default(),
        }
    }

    fn to(envelope: &Envelope) -> Vec<String> {
        envelope.to().iter().map(ToString::to_string).collect()
    }

    #[rstest::rstest]
    #[case(Some("user"), Some("secret"), TransportKind::Authenticated)]
    #[case(None, None, TransportKind::Unauthenticated)]
    #[case(Some("user"), None, TransportKind::Unauthenticated)]
    #[case(None, Some("secret"), TransportKind::Unauthenticated)]
    #[case(Some(""), Some("secret"), TransportKind::Unauthenticated)]
    #[case(Some("user"), Some(""), TransportKind::Unauthenticated)]
    fn transport_selection(
        #[case] username: Option<&str>,
        #[case] password: Option<&str>,
        #[case] expected: TransportKind,
    ) {
        assert_eq!(
            Mailer::new(settings(username, password)).unwrap().kind(),
            expected
        );
    }

    #[test]
    fn relay_and_kind_display() {
        let mailer = Mailer::new(settings(None, None)).unwrap();
        assert_eq!(mailer.relay(), "localhost:25");
        assert_eq!(mailer.kind().to_string(), "unauthenticated");
    }

    #[test]
    fn render_single_recipient() {
        let mailer = Mailer::new(settings(Some("user"), Some("secret"))).unwrap();
        let message = mailer.render(&Task::new("Hi", "<p>hello</p>", ["a@x.com"]));

        let (headers, body) = message.split_once("\r\n\r\n").unwrap();
        assert_eq!(
            headers.split("\r\n").collect::<Vec<_>>(),
            [
                "Content-Type: text/html; charset=\"UTF-8\";",
                "To: a@x.com",
                "From: noreply@x.com",
                "Subject: Hi",
            ]
        );
        assert_eq!(body, "<p>hello</p>");
    }

    #[test]
    fn authenticated_envelope_has_every_recipient() {
        let mailer = Mailer::new(settings(Some("user"), Some("secret"))).unwrap();
        let envelope = mailer
            .envelope(&Task::new("Hi", "", ["a@x.com", "b@x.com"]))
            .unwrap();

        assert_eq!(envelope.from().unwrap().to_string(), "noreply@x.com");
        assert_eq!(to(&envelope), ["a@x.com", "b@x.com"]);
    }

    #[test]
    fn unauthenticated_envelope_has_first_recipient() {
        let mailer = Mailer::new(settings(None, None)).unwrap();
        let task = Task::new("Hi", "<p>hello</p>", ["a@x.com", "b@x.com"]);

        assert_eq!(to(&mailer.envelope(&task).unwrap()), ["a@x.com"]);
        assert!(mailer.render(&task).contains("\r\nTo: a@x.com, b@x.com\r\n"));
    }

    #[rstest::rstest]
    #[case(Some("user"), Some("secret"))]
    #[case(None, None)]
    fn no_recipient(#[case] username: Option<&str>, #[case] password: Option<&str>) {
        let mailer = Mailer::new(settings(username, password)).unwrap();
        let error = mailer
            .envelope(&Task::new("Hi", "", Vec::<String>::new()))
            .unwrap_err();

        assert!(matches!(error, DeliveryError::NoRecipient));
        assert_eq!(error.stage(), "envelope");
    }

    #[test]
    fn invalid_recipient() {
        let mailer = Mailer::new(settings(Some("user"), Some("secret"))).unwrap();
        let error = mailer
            .envelope(&Task::new("Hi", "", ["a@x.com", "not an address"]))
            .unwrap_err();

        assert!(
            matches!(error, DeliveryError::Address { ref address, .. } if address == "not an address")
        );
    }

    #[test]
    fn debug_hides_password() {
        let debug = format!("{:?}", settings(Some("user"), Some("secret")));

        assert!(!debug.contains("secret"));
        assert!(debug.contains("***"));
    }
}
