#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![warn(clippy::dbg_macro, clippy::use_debug)]
#![warn(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::unimplemented,
    clippy::todo,
    clippy::unreachable
)]
#![warn(
    clippy::shadow_unrelated,
    clippy::str_to_string,
    clippy::wildcard_enum_match_arm
)]
#![allow(clippy::module_name_repetitions)]

use anyhow::{Context, Result};
use service_healthcheck::{HttpChecker, Monitor};
use tokio::{signal, time::interval};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

mod config;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = config::load().context("could not load environment variables")?;

    let monitor = Monitor::new(config.check_interval(), config.critical_error_timeout());
    for url in config.urls() {
        let checker = HttpChecker::new(url, url, config.request_timeout())
            .with_context(|| format!("could not create checker for {url}"))?;
        monitor.register_check(checker).await?;
    }
    if monitor.registered().await == 0 {
        warn!("no urls configured, set CHECK_URLS to monitor endpoints");
    }

    let shutdown = CancellationToken::new();
    monitor.start(shutdown.clone()).await?;

    let mut report = interval(config.check_interval());
    loop {
        tokio::select! {
            res = signal::ctrl_c() => {
                res.context("could not listen for shutdown signal")?;
                info!("shutting down");
                break;
            }
            _ = report.tick() => {
                for check in monitor.checks().await {
                    info!(
                        status = ?check.status,
                        status_code = ?check.status_code,
                        "{}: {}",
                        check.name,
                        check.message
                    );
                }
            }
        }
    }

    shutdown.cancel();
    monitor.stop().await;
    Ok(())
}
