use crate::config::{Action, EngineConfig, Plan, RunnerConfig};
use crate::driver::{BrowserContext, PageDriver, PageId};
use crate::executor::ActionExecutor;
use crate::locator::ElementLocator;
use crate::session::Session;
use crate::stability::{Stability, StabilityMonitor};
use crate::{Error, Result};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Result of running a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunResult {
    /// Whether every step completed.
    pub success: bool,
    /// Number of steps completed.
    pub steps_executed: usize,
    /// Zero-based index of the step that failed.
    pub failed_step: Option<usize>,
    /// Error message if failed.
    pub error: Option<String>,
    /// Total duration in milliseconds.
    pub duration_ms: u64,
}

/// Executes plans step by step against a browser context.
///
/// Before every step the active tab is re-resolved and left to settle.
/// The first step that fails ends the run.
pub struct PlanRunner {
    config: RunnerConfig,
    session: Session,
    locator: ElementLocator,
    executor: ActionExecutor,
    monitor: StabilityMonitor,
}

impl PlanRunner {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config: config.runner.clone(),
            locator: ElementLocator::new(&config.locator),
            executor: ActionExecutor::new(&config.executor),
            monitor: StabilityMonitor::new(&config.stability),
            session: Session::new(config),
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    /// Run the plan. Step failures are logged and reported in the result,
    /// never returned as errors.
    pub async fn run<C: BrowserContext>(&mut self, plan: &Plan, ctx: &mut C) -> RunResult {
        let start = Instant::now();
        let elapsed = |start: Instant| start.elapsed().as_millis() as u64;

        if plan.is_empty() {
            warn!("No valid plan found");
            return RunResult {
                success: false,
                steps_executed: 0,
                failed_step: None,
                error: Some("plan has no steps".into()),
                duration_ms: elapsed(start),
            };
        }

        let total = plan.len();
        for (i, step) in plan.steps().iter().enumerate() {
            info!("Step {}/{}: {}", i + 1, total, step);
            if let Err(e) = self.run_step(step, ctx).await {
                warn!("Step {} ({}) failed: {}", i + 1, step, e);
                return RunResult {
                    success: false,
                    steps_executed: i,
                    failed_step: Some(i),
                    error: Some(e.to_string()),
                    duration_ms: elapsed(start),
                };
            }
        }

        info!("Plan completed ({} steps)", total);
        RunResult {
            success: true,
            steps_executed: total,
            failed_step: None,
            error: None,
            duration_ms: elapsed(start),
        }
    }

    /// Run one step, retrying on a fresh active page if the page vanished.
    async fn run_step<C: BrowserContext>(&mut self, step: &Action, ctx: &mut C) -> Result<()> {
        let mut retries = 0;
        loop {
            match self.attempt_step(step, ctx).await {
                Err(e) if e.is_page_unavailable() && retries < self.config.page_retry_attempts => {
                    retries += 1;
                    info!(
                        "Page went away during '{}', re-resolving (retry {}/{})",
                        step.name(),
                        retries,
                        self.config.page_retry_attempts
                    );
                }
                other => return other,
            }
        }
    }

    async fn active_page<C: BrowserContext>(&mut self, ctx: &mut C) -> Result<PageId> {
        let last_action = self.session.last_action();
        self.session
            .tracker
            .active_page(ctx, &self.monitor, last_action)
            .await?
            .ok_or_else(|| Error::PageUnavailable("no open tabs".into()))
    }

    async fn attempt_step<C: BrowserContext>(&mut self, step: &Action, ctx: &mut C) -> Result<()> {
        let id = self.active_page(ctx).await?;
        let page = page_of(ctx, &id)?;
        if self.monitor.await_stable(page, Duration::ZERO).await == Stability::Closed {
            return Err(Error::PageUnavailable(format!("tab {} closed", id)));
        }

        match step {
            Action::Goto { url } => self.goto(ctx, &id, url).await,
            Action::PressEnter => {
                page.press_key("Enter").await?;
                self.session.mark_action();
                Ok(())
            }
            Action::Wait { duration } => {
                debug!("wait: {}ms", duration.as_millis());
                tokio::time::sleep(*duration).await;
                Ok(())
            }
            Action::Click { .. }
            | Action::Hover { .. }
            | Action::Fill { .. }
            | Action::Type { .. }
            | Action::Select { .. } => self.element_step(ctx, &id, step).await,
        }
    }

    async fn goto<C: BrowserContext>(&mut self, ctx: &mut C, id: &PageId, url: &str) -> Result<()> {
        let page = page_of(ctx, id)?;
        let current = page.url().await?;
        if same_url(&current, url) {
            info!("Already on {}", url);
            return Ok(());
        }

        let timeout = Duration::from_millis(self.config.navigation_timeout_ms);
        let outcome = page.goto(url, timeout).await;
        self.session.mark_action();

        match outcome {
            Ok(()) => {}
            Err(e) if e.is_page_unavailable() => return Err(e),
            Err(e) => {
                // The load may have failed after the URL changed, or the
                // navigation continued in another tab.
                let id = self.active_page(ctx).await?;
                let landed = page_of(ctx, &id)?.url().await.unwrap_or_default();
                if !same_url(&landed, url) {
                    return Err(match e {
                        Error::NavigationFailed(_) => e,
                        other => Error::NavigationFailed(format!("{}: {}", url, other)),
                    });
                }
                warn!("Navigation reported '{}' but the page is at {}", e, url);
            }
        }

        let id = self.active_page(ctx).await?;
        let extra = Duration::from_millis(self.config.post_goto_wait_ms);
        self.monitor.await_stable(page_of(ctx, &id)?, extra).await;
        Ok(())
    }

    async fn element_step<C: BrowserContext>(
        &mut self,
        ctx: &mut C,
        id: &PageId,
        step: &Action,
    ) -> Result<()> {
        let kind = step.kind();
        let target = step.target().unwrap_or_default();
        let settle = Duration::from_millis(self.config.post_action_settle_ms);

        {
            let page = page_of(ctx, id)?;
            if self.session.tracker.recently_switched() {
                debug!("Recent tab switch, letting {} settle", id);
                self.monitor.await_stable(page, settle).await;
            }

            let url = page.url().await?;
            let located = self
                .locator
                .locate(page, &self.session.cache, &url, target, kind)
                .await?;
            self.executor
                .execute(page, &mut self.session, kind, &located, target, step.value())
                .await?;
        }

        if kind == crate::config::ActionKind::Click {
            let id = self.active_page(ctx).await?;
            self.monitor.await_stable(page_of(ctx, &id)?, settle).await;
        }
        Ok(())
    }
}

fn page_of<'a, C: BrowserContext>(ctx: &'a C, id: &PageId) -> Result<&'a C::Page> {
    ctx.page(id)
        .ok_or_else(|| Error::PageUnavailable(format!("tab {} is not open", id)))
}

/// URLs equal up to surrounding whitespace and a trailing slash.
fn same_url(a: &str, b: &str) -> bool {
    a.trim().trim_end_matches('/') == b.trim().trim_end_matches('/')
}
