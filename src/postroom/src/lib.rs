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

//! Postroom executable

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

mod args;

pub use args::Args;

#[cfg(debug_assertions)]
macro_rules! get_fmt {
    () => {
        tracing_subscriber::fmt::layer()
            .with_file(true)
            .with_line_number(true)
            .with_thread_ids(true)
            .with_target(true)
    };
}

#[cfg(not(debug_assertions))]
macro_rules! get_fmt {
    () => {
        tracing_subscriber::fmt::layer()
            .compact()
            .with_thread_ids(false)
            .with_target(false)
    };
}

/// Initialize the tracing subsystem: stdout, plus a file if `--log-file` is set.
///
/// # Errors
///
/// * the log level directives are invalid
/// * the log file path has no parent directory or file name
/// * a global subscriber is already installed
pub fn init_logs(args: &Args) -> anyhow::Result<()> {
    use anyhow::Context;
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = tracing_subscriber::EnvFilter::try_new(&args.log_level)
        .with_context(|| format!("invalid log level '{}'", args.log_level))?;

    let file = match &args.log_file {
        Some(filename) => {
            let (Some(directory), Some(file_name)) = (
                filename.parent(),
                filename.file_name().and_then(std::ffi::OsStr::to_str),
            ) else {
                anyhow::bail!(
                    "filepath at '{}' does not have a parent or is not valid",
                    filename.display()
                )
            };

            Some(
                get_fmt!()
                    .with_ansi(false)
                    .with_writer(tracing_appender::rolling::never(directory, file_name)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(get_fmt!().with_writer(std::io::stdout).with_ansi(true))
        .with(file)
        .try_init()?;

    tracing::info!(
        level = %args.log_level,
        file = ?args.log_file,
        "Postroom logs initialized."
    );

    Ok(())
}
