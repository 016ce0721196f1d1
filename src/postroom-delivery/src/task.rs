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
use crate::DecodeError;

/// An outbound email request, decoded from a queue entry.
///
/// ```json
/// { "subject": "Hi", "message": "<p>hello</p>", "recipients": ["a@x.com"] }
/// ```
///
/// `recipients` is mandatory, `subject` and `message` default to an empty string.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Task {
    #[serde(default)]
    subject: String,
    #[serde(default)]
    message: String,
    recipients: Vec<String>,
}

impl Task {
    /// Create a task.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        message: impl Into<String>,
        recipients: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            subject: subject.into(),
            message: message.into(),
            recipients: recipients.into_iter().map(Into::into).collect(),
        }
    }

    /// Decode the raw payload popped from the queue.
    ///
    /// # Errors
    ///
    /// * the payload is not valid utf-8 json
    /// * the payload is not an object, or the `recipients` field is missing
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        Ok(serde_json::from_slice(payload)?)
    }

    /// Subject of the email, may be empty.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Body of the email, interpreted as html.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Recipients, in the order of the payload.
    #[must_use]
    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decode() {
        let task = Task::decode(
            br#"{"subject":"Hi","message":"<p>hello</p>","recipients":["a@x.com","b@x.com"]}"#,
        )
        .unwrap();

        assert_eq!(
            task,
            Task::new("Hi", "<p>hello</p>", ["a@x.com", "b@x.com"])
        );
    }

    #[test]
    fn decode_defaults() {
        let task = Task::decode(br#"{"recipients":[]}"#).unwrap();

        assert_eq!(task.subject(), "");
        assert_eq!(task.message(), "");
        assert!(task.recipients().is_empty());
    }

    #[rstest::rstest]
    #[case::missing_recipients(br#"{"subject":"Hi","message":"body"}"#.as_slice())]
    #[case::not_json(b"subject=Hi".as_slice())]
    #[case::not_an_object(br#"["a@x.com"]"#.as_slice())]
    #[case::wrong_type(br#"{"recipients":"a@x.com"}"#.as_slice())]
    #[case::invalid_utf8(b"{\"recipients\":[\"\xff\"]}".as_slice())]
    #[case::empty(b"".as_slice())]
    fn decode_malformed(#[case] payload: &[u8]) {
        Task::decode(payload).unwrap_err();
    }
}
