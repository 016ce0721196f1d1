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

/// Settings of the worker, each one given as a flag or through its environment variable.
#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Hostname of the SMTP relay.
    #[arg(long, env = "SMTP_HOST")]
    pub smtp_host: String,

    /// Port of the SMTP relay.
    #[arg(long, env = "SMTP_PORT")]
    pub smtp_port: u16,

    /// Address of the sender, in the `From:` header and the envelope.
    #[arg(long, env = "SENDER_ADDRESS")]
    pub sender_address: String,

    /// Username for `AUTH PLAIN`, authentication is disabled unless a password is also set.
    #[arg(long, env = "SMTP_USERNAME")]
    pub smtp_username: Option<String>,

    /// Password for `AUTH PLAIN`, authentication is disabled unless a username is also set.
    #[arg(long, env = "SMTP_PASSWORD", hide_env_values = true)]
    pub smtp_password: Option<String>,

    /// Timeout of each SMTP command (ex: "30s"), no timeout by default.
    #[arg(long, env = "SMTP_TIMEOUT", value_parser = humantime::parse_duration)]
    pub smtp_timeout: Option<std::time::Duration>,

    /// Address of the redis server, `host:port` or a redis url.
    #[arg(long, env = "REDIS_ADDRESS")]
    pub redis_address: String,

    /// Name of the redis list holding the tasks.
    #[arg(long, env = "REDIS_KEY", default_value = "tasks")]
    pub redis_key: String,

    /// Maximum time to wait for in-flight deliveries on shutdown (ex: "1m"), unbounded by default.
    #[arg(long, env = "DRAIN_TIMEOUT", value_parser = humantime::parse_duration)]
    pub drain_timeout: Option<std::time::Duration>,

    /// Consecutive failed pops tolerated before exiting.
    #[arg(long, env = "MAX_POP_ERRORS", default_value_t = postroom_server::DEFAULT_MAX_POP_ERRORS)]
    pub max_pop_errors: u32,

    /// Log filter directives (ex: "info,postroom_delivery=debug").
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Also write the logs to this file.
    #[arg(long, env = "LOG_FILE")]
    pub log_file: Option<std::path::PathBuf>,
}

impl Args {
    /// Settings of the relay.
    ///
    /// # Errors
    ///
    /// * the sender address is not valid
    pub fn smtp_settings(&self) -> anyhow::Result<postroom_delivery::SmtpSettings> {
        Ok(postroom_delivery::SmtpSettings {
            host: self.smtp_host.clone(),
            port: self.smtp_port,
            sender: self
                .sender_address
                .parse::<postroom_delivery::Address>()
                .map_err(|error| {
                    anyhow::anyhow!("'{}' is not a valid address: {error}", self.sender_address)
                })?,
            username: self.smtp_username.clone(),
            password: self.smtp_password.clone(),
            timeout: self.smtp_timeout,
            template: postroom_delivery::Template::default(),
        })
    }

    /// Startup banner.
    #[must_use]
    pub fn banner(&self) -> String {
        format!(
            "\n=========\nPost Room\n=========\nRedis Server:\t{}\nRedis List:\t{}\nMail Server:\t{}:{}\n",
            self.redis_address, self.redis_key, self.smtp_host, self.smtp_port
        )
    }
}
