// src/retry.rs
//! Small retry helper for outbound calls whose failures are usually
//! transient. Delay doubles per attempt when backoff is on.

use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::from_secs(2),
            backoff: true,
        }
    }
}

/// Run `op` until it succeeds or attempts are exhausted; returns the last
/// error in that case.
pub async fn with_retry<T, F, Fut>(config: RetryConfig, mut op: F) -> anyhow::Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let attempts = config.max_attempts.max(1);
    let mut last_err = None;

    for attempt in 1..=attempts {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) => {
                if attempt < attempts {
                    let delay = if config.backoff {
                        config.delay * (1u32 << (attempt - 1))
                    } else {
                        config.delay
                    };
                    tracing::debug!(attempt, ?delay, error = ?e, "retrying after failure");
                    tokio::time::sleep(delay).await;
                }
                last_err = Some(e);
            }
        }
    }

    Err(last_err
        .unwrap_or_else(|| anyhow::anyhow!("retry loop finished without attempts"))
        .context(format!("failed after {attempts} attempts")))
}
