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
use anyhow::Context;
use postroom::Args;
use postroom_delivery::Mailer;
use postroom_server::{Dispatcher, Drain, InFlight, RedisQueue, ShutdownCoordinator};

async fn interrupt() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "Cannot listen for the interrupt signal.");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenv::dotenv();
    let args = <Args as clap::Parser>::parse();

    postroom::init_logs(&args)?;
    println!("{}", args.banner());

    let mailer = Mailer::new(args.smtp_settings()?).context("cannot setup the mail sender")?;
    let queue = RedisQueue::connect(&args.redis_address, args.redis_key.clone())
        .await
        .with_context(|| format!("cannot connect to redis at '{}'", args.redis_address))?;

    tracing::info!(
        key = queue.key(),
        address = %args.redis_address,
        relay = mailer.relay(),
        transport = %mailer.kind(),
        "Worker registered for tasks."
    );

    let dispatcher = Dispatcher::new(queue, std::sync::Arc::new(mailer), InFlight::new())
        .with_max_pop_errors(args.max_pop_errors);

    let drain = ShutdownCoordinator::new(args.drain_timeout)
        .run(dispatcher, interrupt())
        .await?;

    tracing::info!("Exiting.");

    match drain {
        Drain::Completed => Ok(()),
        Drain::TimedOut { abandoned } => {
            anyhow::bail!("exited with {abandoned} delivery(ies) still in flight")
        }
    }
}
