//! Product readiness probe
//!
//! The product is started outside the harness; before a run we only wait for
//! its base URL to answer.

use std::time::{Duration, Instant};

use tokio::time::sleep;
use tracing::{info, warn};

use crate::error::{E2eError, E2eResult};

pub struct ServerProbe {
    client: reqwest::Client,
    interval: Duration,
}

impl ServerProbe {
    pub fn new() -> E2eResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()?;
        Ok(Self {
            client,
            interval: Duration::from_millis(250),
        })
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Poll `base_url` until it answers with a success status
    pub async fn wait_until_ready(&self, base_url: &str, timeout: Duration) -> E2eResult<()> {
        let start = Instant::now();
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.client.get(base_url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    info!("Product is ready at {} after {} attempts", base_url, attempts);
                    return Ok(());
                }
                Ok(resp) => {
                    warn!("Readiness check returned {}", resp.status());
                }
                Err(e) => {
                    if attempts == 1 {
                        info!("Waiting for {} to come up...", base_url);
                    }
                    // Connection refused is expected while the product starts
                    if !e.is_connect() {
                        warn!("Readiness check error: {}", e);
                    }
                }
            }

            if start.elapsed() + self.interval >= timeout {
                return Err(E2eError::ServerUnavailable(attempts));
            }
            sleep(self.interval).await;
        }
    }
}
