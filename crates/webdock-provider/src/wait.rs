//! Waiting for asynchronous platform actions
//!
//! Mutating calls return as soon as the platform accepts the action. The
//! [`ActionPoller`] turns the returned tracking token into a bounded wait by
//! polling the event log until the matching event reaches a terminal status.
//!
//! ```text
//!            ┌────────── Pending (waiting / working) ─────────┐
//!            ▼                                                │
//!   sleep(delay) ──► query event log ──► classify ────────────┤
//!                                           │                 │
//!                        finished ──────────┤ probe failed ───┘
//!                                           ▼
//!                       Succeeded / Failed / TimedOut / Cancelled
//! ```
//!
//! [`ActionPoller::wait_for_server_up`] adds a TCP probe: a finished event
//! only counts once `address:port` accepts a connection.

use crate::error::WaitError;
use async_trait::async_trait;
use std::collections::HashSet;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use webdock_api::{ActionHandle, Event, EventLog, EventQuery, StatusClass};
use webdock_config::PollConfig;

type WaitResult<T> = std::result::Result<T, WaitError>;

/// Deadline used when `timeout` does not fit in an `Instant`
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Poll cadence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitConfig {
    /// Waited before every query, the first one included
    pub delay: Duration,
    /// Floor between consecutive queries
    pub min_interval: Duration,
    /// Upper bound of a single TCP probe
    pub connect_timeout: Duration,
    /// Page size used when filtering the event log client-side
    pub per_page: u32,
    /// Pages scanned per poll before giving up on finding the token
    pub max_pages: u32,
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(10),
            min_interval: Duration::from_secs(3),
            connect_timeout: Duration::from_secs(60),
            per_page: 50,
            max_pages: 5,
        }
    }
}

impl From<&PollConfig> for WaitConfig {
    fn from(poll: &PollConfig) -> Self {
        Self {
            delay: poll.delay(),
            min_interval: poll.min_interval(),
            connect_timeout: poll.connect_timeout(),
            ..Default::default()
        }
    }
}

impl WaitConfig {
    /// Interval between two consecutive queries
    fn interval(&self) -> Duration {
        self.delay.max(self.min_interval)
    }
}

/// Network probe used by the reachability gate
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn probe(&self, address: &str, port: u16, timeout: Duration) -> io::Result<()>;
}

/// Plain TCP handshake
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProbe;

#[async_trait]
impl ReachabilityProbe for TcpProbe {
    async fn probe(&self, address: &str, port: u16, timeout: Duration) -> io::Result<()> {
        match tokio::time::timeout(timeout, TcpStream::connect((address, port))).await {
            Ok(Ok(_stream)) => Ok(()),
            Ok(Err(e)) => Err(e),
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("connect timed out after {:?}", timeout),
            )),
        }
    }
}

/// Target of the reachability gate
struct Gate<'a> {
    address: &'a str,
    port: u16,
}

impl Gate<'_> {
    fn display(&self) -> String {
        if self.address.contains(':') {
            format!("[{}]:{}", self.address, self.port)
        } else {
            format!("{}:{}", self.address, self.port)
        }
    }
}

/// Waits for platform actions to complete
///
/// Holds no per-wait state; one poller can serve any number of
/// concurrent waits on distinct tokens.
#[derive(Clone)]
pub struct ActionPoller {
    events: Arc<dyn EventLog>,
    probe: Arc<dyn ReachabilityProbe>,
    config: WaitConfig,
    cancel: CancellationToken,
}

impl ActionPoller {
    pub fn new(events: Arc<dyn EventLog>, config: WaitConfig) -> Self {
        Self {
            events,
            probe: Arc::new(TcpProbe),
            config,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn ReachabilityProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Stop waiting once `cancel` fires
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn config(&self) -> &WaitConfig {
        &self.config
    }

    /// Wait until the event for `handle` is finished
    pub async fn wait_for_action(
        &self,
        handle: &ActionHandle,
        timeout: Duration,
    ) -> WaitResult<Event> {
        self.run(handle, timeout, None).await
    }

    /// Wait until the event for `handle` is finished and `address:port`
    /// accepts a TCP connection
    pub async fn wait_for_server_up(
        &self,
        handle: &ActionHandle,
        address: &str,
        port: u16,
        timeout: Duration,
    ) -> WaitResult<Event> {
        self.run(handle, timeout, Some(Gate { address, port })).await
    }

    async fn run(
        &self,
        handle: &ActionHandle,
        timeout: Duration,
        gate: Option<Gate<'_>>,
    ) -> WaitResult<Event> {
        if handle.is_empty() {
            return Err(WaitError::MissingHandle);
        }

        let started = Instant::now();
        let deadline = started
            .checked_add(timeout)
            .unwrap_or_else(|| started + FAR_FUTURE);
        let mut pause = self.config.delay;
        let mut attempt: u32 = 0;
        let mut last_status: Option<String> = None;
        let mut unreachable = false;

        loop {
            if !self.sleep_within(pause, deadline).await {
                if self.cancel.is_cancelled() {
                    return Err(WaitError::Cancelled {
                        handle: handle.clone(),
                    });
                }
                return Err(self.deadline_error(
                    handle,
                    started,
                    timeout,
                    &gate,
                    unreachable,
                    last_status,
                ));
            }

            attempt += 1;
            let event = match self.latest_event(handle).await {
                Ok(event) => event,
                Err(_) if self.cancel.is_cancelled() => {
                    return Err(WaitError::Cancelled {
                        handle: handle.clone(),
                    });
                }
                Err(e) => return Err(e),
            };

            debug!(
                token = %handle,
                attempt,
                status = %event.status,
                "polled event log"
            );

            if self.cancel.is_cancelled() {
                return Err(WaitError::Cancelled {
                    handle: handle.clone(),
                });
            }

            match event.status.class() {
                StatusClass::Pending => {
                    unreachable = false;
                }
                StatusClass::Failed => {
                    return Err(WaitError::ActionFailed {
                        handle: handle.clone(),
                        event_id: event.id,
                        status: event.status.clone(),
                        message: event.message.clone().unwrap_or_default(),
                    });
                }
                StatusClass::Target => match &gate {
                    None => {
                        info!(token = %handle, attempt, "action finished");
                        return Ok(event);
                    }
                    Some(gate) => {
                        let remaining = deadline.saturating_duration_since(Instant::now());
                        let budget = self.config.connect_timeout.min(remaining);

                        match self.probe.probe(gate.address, gate.port, budget).await {
                            Ok(()) => {
                                info!(
                                    token = %handle,
                                    attempt,
                                    address = %gate.display(),
                                    "action finished and server is reachable"
                                );
                                return Ok(event);
                            }
                            Err(e) => {
                                warn!(
                                    token = %handle,
                                    address = %gate.display(),
                                    "action finished but server is not reachable yet: {}",
                                    e
                                );
                                unreachable = true;
                            }
                        }

                        if self.cancel.is_cancelled() {
                            return Err(WaitError::Cancelled {
                                handle: handle.clone(),
                            });
                        }
                    }
                },
            }

            last_status = Some(event.status.to_string());
            pause = self.config.interval();
        }
    }

    /// Sleep for `pause`, bounded by the deadline
    ///
    /// Returns false when the deadline is reached or the wait is cancelled.
    async fn sleep_within(&self, pause: Duration, deadline: Instant) -> bool {
        let now = Instant::now();
        if now >= deadline || self.cancel.is_cancelled() {
            return false;
        }

        let wake = now.checked_add(pause).unwrap_or(deadline).min(deadline);
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep_until(wake) => wake < deadline,
        }
    }

    fn deadline_error(
        &self,
        handle: &ActionHandle,
        started: Instant,
        timeout: Duration,
        gate: &Option<Gate<'_>>,
        unreachable: bool,
        last_status: Option<String>,
    ) -> WaitError {
        let elapsed = started.elapsed();
        match gate {
            Some(gate) if unreachable => WaitError::Unreachable {
                handle: handle.clone(),
                address: gate.display(),
                elapsed,
                timeout,
            },
            _ => WaitError::Timeout {
                handle: handle.clone(),
                elapsed,
                timeout,
                last_status: last_status.unwrap_or_else(|| "none".to_string()),
            },
        }
    }

    /// Fetch the event for `handle`, filtering every page client-side
    async fn latest_event(&self, handle: &ActionHandle) -> WaitResult<Event> {
        let per_page = self.config.per_page.max(1);
        let mut matching = Vec::new();

        for page in 1..=self.config.max_pages.max(1) {
            let query = EventQuery::for_callback(handle.as_str()).with_page(page, per_page);
            let events = self
                .events
                .list_events(&query)
                .await
                .map_err(|source| WaitError::Transport {
                    handle: handle.clone(),
                    source,
                })?;

            let full_page = events.len() >= per_page as usize;
            matching.extend(events.into_iter().filter(|e| e.matches(handle.as_str())));

            if !matching.is_empty() || !full_page {
                break;
            }
        }

        select_latest(handle, matching)
    }
}

/// Pick the most recently started event; refuse to guess on ties
fn select_latest(handle: &ActionHandle, events: Vec<Event>) -> WaitResult<Event> {
    let mut seen = HashSet::new();
    let mut events: Vec<Event> = events.into_iter().filter(|e| seen.insert(e.id)).collect();

    match events.len() {
        0 => Err(WaitError::EmptyEventLog {
            handle: handle.clone(),
        }),
        1 => Ok(events.remove(0)),
        count => {
            let ambiguous = || WaitError::AmbiguousEvent {
                handle: handle.clone(),
                count,
            };

            let mut started = Vec::with_capacity(count);
            for event in events {
                let at = event.started_at().ok_or_else(ambiguous)?;
                started.push((at, event));
            }

            let latest = started.iter().map(|(at, _)| *at).max().ok_or_else(ambiguous)?;
            let mut newest: Vec<Event> = started
                .into_iter()
                .filter(|(at, _)| *at == latest)
                .map(|(_, event)| event)
                .collect();

            if newest.len() > 1 {
                return Err(WaitError::AmbiguousEvent {
                    handle: handle.clone(),
                    count: newest.len(),
                });
            }
            newest.pop().ok_or_else(ambiguous)
        }
    }
}
