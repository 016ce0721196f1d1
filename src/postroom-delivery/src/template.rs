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

/// Template of the message sent to the relay.
pub const DEFAULT_TEMPLATE: &str = "Content-Type: text/html; charset=\"UTF-8\";\r\n\
                                    To: {to}\r\n\
                                    From: {from}\r\n\
                                    Subject: {subject}\r\n\
                                    \r\n\
                                    {body}";

const PLACEHOLDERS: [&str; 4] = ["{to}", "{from}", "{subject}", "{body}"];

/// A message template with `{to}`, `{from}`, `{subject}` and `{body}` placeholders.
///
/// Unknown `{...}` sequences are kept as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template(String);

impl Default for Template {
    fn default() -> Self {
        Self(DEFAULT_TEMPLATE.to_owned())
    }
}

impl From<String> for Template {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl Template {
    /// Fill the placeholders in a single pass: substituted values are never scanned again.
    #[must_use]
    pub fn render(&self, to: &str, from: &str, subject: &str, body: &str) -> String {
        let values = [to, from, subject, body];
        let mut out = String::with_capacity(self.0.len() + values.iter().map(|i| i.len()).sum::<usize>());

        let mut rest = self.0.as_str();
        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];

            match PLACEHOLDERS
                .iter()
                .zip(values)
                .find(|(placeholder, _)| tail.starts_with(*placeholder))
            {
                Some((placeholder, value)) => {
                    out.push_str(value);
                    rest = &tail[placeholder.len()..];
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        }
        out.push_str(rest);

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default() {
        assert_eq!(
            Template::default().render("a@x.com, b@x.com", "noreply@x.com", "Hi", "<p>hello</p>"),
            "Content-Type: text/html; charset=\"UTF-8\";\r\n\
             To: a@x.com, b@x.com\r\n\
             From: noreply@x.com\r\n\
             Subject: Hi\r\n\
             \r\n\
             <p>hello</p>"
        );
    }

    #[test]
    fn values_are_not_rescanned() {
        assert_eq!(
            Template::from("{subject}|{body}".to_owned()).render("to", "from", "{body}", "{to}"),
            "{body}|{to}"
        );
    }

    #[test]
    fn unknown_braces() {
        assert_eq!(
            Template::from("{{to}} {unknown} {".to_owned()).render("a@x.com", "", "", ""),
            "{a@x.com} {unknown} {"
        );
    }
}
