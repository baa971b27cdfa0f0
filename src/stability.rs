//! DOM stability monitor.
//!
//! Network idle is not enough for client-rendered pages that fetch after the
//! initial load, so this samples structural metrics (child count, scroll
//! height, serialized length) until two consecutive samples agree within
//! tolerance, then waits for the page's framework if one is recognised.

use crate::config::StabilityConfig;
use crate::driver::{LoadState, PageDriver};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

/// Outcome of a stability wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stability {
    /// Metrics stopped changing after this many polls.
    Settled { polls: u32 },
    /// Still churning when the timeout hit, or metrics were unreadable.
    TimedOut,
    /// The page is gone.
    Closed,
}

impl Stability {
    pub fn is_settled(&self) -> bool {
        matches!(self, Stability::Settled { .. })
    }
}

/// Waits for pages to stop changing.
#[derive(Debug, Clone)]
pub struct StabilityMonitor {
    config: StabilityConfig,
}

impl StabilityMonitor {
    pub fn new(config: &StabilityConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &StabilityConfig {
        &self.config
    }

    /// Wait with the configured timeout, then sleep `extra_wait`.
    pub async fn await_stable<P: PageDriver>(&self, page: &P, extra_wait: Duration) -> Stability {
        self.await_stable_within(page, self.config.timeout(), extra_wait)
            .await
    }

    /// Best effort: failures are logged and folded into the outcome.
    pub async fn await_stable_within<P: PageDriver>(
        &self,
        page: &P,
        timeout: Duration,
        extra_wait: Duration,
    ) -> Stability {
        if page.is_closed().await {
            return Stability::Closed;
        }

        let load_timeout = Duration::from_millis(self.config.load_timeout_ms);
        if let Err(e) = page
            .wait_for_load(LoadState::DomContentLoaded, load_timeout)
            .await
        {
            if e.is_page_unavailable() {
                return Stability::Closed;
            }
            debug!("DOMContentLoaded not observed: {}", e);
        }

        let outcome = match self.poll_metrics(page, timeout).await {
            Ok(outcome) => outcome,
            Err(e) if e.is_page_unavailable() => return Stability::Closed,
            Err(e) => {
                warn!("Could not sample DOM metrics: {}", e);
                sleep(Duration::from_millis(self.config.fallback_wait_ms)).await;
                return Stability::TimedOut;
            }
        };

        if !extra_wait.is_zero() {
            sleep(extra_wait).await;
        }
        self.await_framework(page).await;
        outcome
    }

    async fn poll_metrics<P: PageDriver>(&self, page: &P, timeout: Duration) -> crate::Result<Stability> {
        let deadline = Instant::now() + timeout;
        let mut previous = page.metrics().await?;
        let mut polls = 0;
        loop {
            sleep(self.config.poll_interval()).await;
            let current = page.metrics().await?;
            polls += 1;
            if current.is_close_to(
                &previous,
                self.config.height_tolerance,
                self.config.length_tolerance,
            ) {
                debug!("DOM settled after {} polls", polls);
                return Ok(Stability::Settled { polls });
            }
            if Instant::now() >= deadline {
                debug!(
                    "DOM still changing after {}ms ({} polls)",
                    timeout.as_millis(),
                    polls
                );
                return Ok(Stability::TimedOut);
            }
            previous = current;
        }
    }

    /// Poll the framework's own idle signal, if the page has one.
    async fn await_framework<P: PageDriver>(&self, page: &P) {
        let framework = match page.detect_framework().await {
            Ok(Some(f)) => f,
            Ok(None) => return,
            Err(e) => {
                debug!("Framework probe failed: {}", e);
                return;
            }
        };

        debug!("Waiting for {} to settle", framework);
        let deadline = Instant::now() + Duration::from_millis(self.config.framework_timeout_ms);
        loop {
            match page.framework_settled(framework).await {
                Ok(true) => return,
                Ok(false) => {}
                Err(e) => {
                    debug!("{} stability hook unavailable: {}", framework, e);
                    sleep(Duration::from_millis(self.config.fallback_wait_ms)).await;
                    return;
                }
            }
            if Instant::now() >= deadline {
                warn!("{} still busy after {}ms", framework, self.config.framework_timeout_ms);
                return;
            }
            sleep(self.config.poll_interval()).await;
        }
    }
}
