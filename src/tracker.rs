//! Page/tab tracker.
//!
//! Exactly one tab is active at a time. A tab announced as newly opened
//! becomes active once it has loaded and settled. Shortly after an action,
//! any tab not seen before is preferred over the current one, since clicks
//! often open their target in a new tab. Otherwise the current tab stays
//! active while it is open, falling back to the newest open tab.

use crate::config::TrackerConfig;
use crate::driver::{BrowserContext, LoadState, PageDriver, PageId};
use crate::stability::StabilityMonitor;
use crate::Result;
use std::collections::HashSet;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug)]
pub struct TabTracker {
    config: TrackerConfig,
    current: Option<PageId>,
    /// Every tab observed so far.
    known: HashSet<PageId>,
    switched_at: Option<Instant>,
}

impl TabTracker {
    pub fn new(config: &TrackerConfig) -> Self {
        Self {
            config: config.clone(),
            current: None,
            known: HashSet::new(),
            switched_at: None,
        }
    }

    /// Make `id` the active tab without waiting on it.
    pub fn adopt(&mut self, id: PageId) {
        self.known.insert(id.clone());
        self.current = Some(id);
    }

    pub fn current(&self) -> Option<&PageId> {
        self.current.as_ref()
    }

    /// Whether focus moved to another tab within the recency window.
    pub fn recently_switched(&self) -> bool {
        self.switched_at
            .is_some_and(|t| t.elapsed() <= self.config.recency_window())
    }

    /// Re-resolve the active tab. `None` means no tab is open and the
    /// session is over.
    pub async fn active_page<C: BrowserContext>(
        &mut self,
        ctx: &mut C,
        monitor: &StabilityMonitor,
        last_action: Option<Instant>,
    ) -> Result<Option<PageId>> {
        let opened = ctx.take_opened().await?;
        let open = ctx.pages().await?;

        if let Some(id) = opened.iter().rev().find(|id| open.contains(id)) {
            info!("New tab opened: {}", id);
            self.switch_to(ctx, id.clone(), monitor).await;
        }
        self.known.extend(opened);

        if open.is_empty() {
            if self.current.take().is_some() {
                warn!("All tabs are closed");
            }
            return Ok(None);
        }

        if self.within_recency_window(last_action) {
            let newer = open
                .iter()
                .rev()
                .find(|id| !self.known.contains(*id) && self.current.as_ref() != Some(*id))
                .cloned();
            if let Some(id) = newer {
                info!("Switching to newer tab {}", id);
                self.switch_to(ctx, id, monitor).await;
            }
        }
        self.known.extend(open.iter().cloned());

        if let Some(current) = &self.current {
            if open.contains(current) {
                return Ok(Some(current.clone()));
            }
            debug!("Active tab {} is gone", current);
        }

        // Pages are oldest first, so the last one is the newest.
        let Some(newest) = open.last().cloned() else {
            return Ok(None);
        };
        debug!("Falling back to newest tab {}", newest);
        self.switch_to(ctx, newest.clone(), monitor).await;
        Ok(Some(newest))
    }

    /// Whether an action at `last_action` is recent enough that a new tab
    /// is likely its result.
    pub fn within_recency_window(&self, last_action: Option<Instant>) -> bool {
        last_action.is_some_and(|t| t.elapsed() <= self.config.recency_window())
    }

    async fn switch_to<C: BrowserContext>(
        &mut self,
        ctx: &C,
        id: PageId,
        monitor: &StabilityMonitor,
    ) {
        if let Some(page) = ctx.page(&id) {
            let timeout = Duration::from_millis(self.config.tab_load_timeout_ms);
            if let Err(e) = page.wait_for_load(LoadState::Load, timeout).await {
                debug!("Tab {} did not finish loading: {}", id, e);
            }
            monitor.await_stable(page, Duration::ZERO).await;
        }

        // The very first adoption is not a switch.
        if self.current.is_some() {
            self.switched_at = Some(Instant::now());
        }
        self.known.insert(id.clone());
        self.current = Some(id);
    }
}
