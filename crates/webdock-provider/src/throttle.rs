//! Server creation pacing
//!
//! The platform rejects bursts of server creations. Two mechanisms keep a
//! provider instance under that limit: a stagger proportional to how many
//! servers it already created, and a linear backoff when the platform still
//! refuses.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use webdock_api::ApiError;
use webdock_config::CreateConfig;

/// Platform message for a rejected creation burst
pub const TOO_MANY_SERVERS: &str = "You are creating too many servers in too short of a timespan. Please wait a while and try again a bit later.";

/// Count of servers created by one provider instance
#[derive(Debug)]
pub struct CreationThrottle {
    created: AtomicU64,
    stagger: Duration,
}

impl CreationThrottle {
    pub fn new(stagger: Duration) -> Self {
        Self {
            created: AtomicU64::new(0),
            stagger,
        }
    }

    pub fn created(&self) -> u64 {
        self.created.load(Ordering::SeqCst)
    }

    /// Claim the next creation slot and return how long it must wait
    pub fn reserve(&self) -> Duration {
        let earlier = self.created.fetch_add(1, Ordering::SeqCst);
        self.stagger
            .saturating_mul(u32::try_from(earlier).unwrap_or(u32::MAX))
    }

    /// Wait for the next slot; false if cancelled first
    pub async fn wait_turn(&self, cancel: &CancellationToken) -> bool {
        let delay = self.reserve();
        if delay.is_zero() {
            return !cancel.is_cancelled();
        }

        info!(delay = ?delay, "staggering server creation");
        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}

/// Linear retry of a creation call rejected as too many servers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateBackoff {
    pub retries: u32,
    pub step: Duration,
}

impl Default for CreateBackoff {
    fn default() -> Self {
        Self {
            retries: 3,
            step: Duration::from_secs(60),
        }
    }
}

impl From<&CreateConfig> for CreateBackoff {
    fn from(config: &CreateConfig) -> Self {
        Self {
            retries: config.retries,
            step: config.backoff(),
        }
    }
}

pub fn is_too_many_servers(error: &ApiError) -> bool {
    error.platform_message() == Some(TOO_MANY_SERVERS)
}

impl CreateBackoff {
    /// Run `trigger`, retrying after `attempt × step` while the platform
    /// reports too many creations
    ///
    /// Only the triggering call is retried. Exhausted retries or
    /// cancellation return the last platform error.
    pub async fn run<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut trigger: F,
    ) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut attempt = 0;
        loop {
            match trigger().await {
                Err(e) if is_too_many_servers(&e) && attempt < self.retries => {
                    attempt += 1;
                    let delay = self.step.saturating_mul(attempt);
                    warn!(attempt, delay = ?delay, "too many server creations, retrying later");

                    tokio::select! {
                        _ = cancel.cancelled() => return Err(e),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                other => return other,
            }
        }
    }
}
