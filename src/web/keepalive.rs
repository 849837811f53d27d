//! Periodic self-ping that keeps free-tier hosts from idling the process.

use std::time::Duration;

use reqwest::StatusCode;
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};

use crate::web::wait_for_shutdown;

/// Ping `url` every `period`, starting one period from now, until shutdown.
pub async fn run(
    client: reqwest::Client,
    url: String,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!("Self-ping every {}s against {}", period.as_secs(), url);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match ping(&client, &url).await {
                    Ok(status) => info!("Self-Ping successful. Status: {}", status.as_u16()),
                    Err(e) => error!("Self-Ping Error: {}", e),
                }
            }
            _ = wait_for_shutdown(&mut shutdown_rx) => {
                info!("Self-ping stopped");
                break;
            }
        }
    }
}

pub async fn ping(client: &reqwest::Client, url: &str) -> Result<StatusCode, reqwest::Error> {
    let response = client.get(url).send().await?;
    Ok(response.status())
}
