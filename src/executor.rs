//! Action executor: performs one interaction on a located element.
//!
//! Clicks fall back from a native click to a dispatched DOM event to calling
//! the element's own `click()`. Every success is written to the selector
//! cache and stamps the session's last-action time.

use crate::cache::{ElementMeta, InteractionKind};
use crate::config::{ActionKind, ExecutorConfig};
use crate::driver::{ElementHandle, ElementInfo, PageDriver, Selector};
use crate::locator::Located;
use crate::session::Session;
use crate::{Error, Result};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Selector that finds the element again on a later visit: tag plus a
/// text predicate, or the bare tag when there is no text.
pub fn reconstruct_selector(info: &ElementInfo) -> Selector {
    Selector::has_text(info.tag.clone(), info.selector_text())
}

/// Performs interactions with fallbacks.
#[derive(Debug, Clone)]
pub struct ActionExecutor {
    config: ExecutorConfig,
}

impl ActionExecutor {
    pub fn new(config: &ExecutorConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    /// Perform `kind` on the located element.
    ///
    /// `value` is the text for fill / type and the option for select.
    pub async fn execute<P: PageDriver>(
        &self,
        page: &P,
        session: &mut Session,
        kind: ActionKind,
        located: &Located,
        description: &str,
        value: Option<&str>,
    ) -> Result<()> {
        let url = page.url().await?;
        let handle = &located.handle;
        self.ensure_rendered(page, handle).await?;

        match kind {
            ActionKind::Click => self.click(page, handle, description).await?,
            ActionKind::Hover => {
                let timeout = Duration::from_millis(self.config.hover_timeout_ms);
                page.hover(handle, timeout)
                    .await
                    .map_err(|e| failed("hover", description, e))?;
            }
            ActionKind::Fill => {
                let value = require_value(kind, value)?;
                page.fill(handle, value)
                    .await
                    .map_err(|e| failed("fill", description, e))?;
            }
            ActionKind::Type => {
                let value = require_value(kind, value)?;
                let timeout = Duration::from_millis(self.config.click_timeout_ms);
                page.click(handle, timeout)
                    .await
                    .map_err(|e| failed("focus", description, e))?;
                page.type_text(value, Duration::from_millis(self.config.type_delay_ms))
                    .await
                    .map_err(|e| failed("type", description, e))?;
            }
            ActionKind::Select => {
                let option = require_value(kind, value)?;
                page.select_option(handle, option)
                    .await
                    .map_err(|e| failed("select", description, e))?;
            }
            other => {
                return Err(Error::ActionFailed(format!(
                    "'{}' does not act on an element",
                    other
                )))
            }
        }

        info!("{} '{}' succeeded", kind, description);
        let meta = ElementMeta {
            kind: InteractionKind::for_action(kind),
            text: located.info.comparison_text(),
            tag: located.info.tag.clone(),
        };
        session
            .cache
            .record(&url, description, reconstruct_selector(&located.info), meta);
        session.mark_action();
        Ok(())
    }

    /// Scroll the element into view and wait until it is painted. Times out
    /// with a warning rather than an error; the action is attempted anyway.
    pub async fn ensure_rendered<P: PageDriver>(
        &self,
        page: &P,
        handle: &ElementHandle,
    ) -> Result<()> {
        page.scroll_into_view(handle).await?;

        let deadline = Instant::now() + Duration::from_millis(self.config.visibility_timeout_ms);
        loop {
            match page.is_rendered(handle).await {
                Ok(true) => break,
                Ok(false) => {}
                Err(e @ (Error::ElementNotFound(_) | Error::PageUnavailable(_))) => return Err(e),
                Err(e) => debug!("visibility probe failed: {}", e),
            }
            if Instant::now() >= deadline {
                warn!(
                    "Element {} not rendered after {}ms, proceeding",
                    handle, self.config.visibility_timeout_ms
                );
                break;
            }
            sleep(Duration::from_millis(self.config.visibility_poll_ms)).await;
        }

        if self.config.settle_ms > 0 {
            sleep(Duration::from_millis(self.config.settle_ms)).await;
        }
        Ok(())
    }

    async fn click<P: PageDriver>(
        &self,
        page: &P,
        handle: &ElementHandle,
        description: &str,
    ) -> Result<()> {
        let timeout = Duration::from_millis(self.config.click_timeout_ms);
        let err = match page.click(handle, timeout).await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_page_unavailable() => return Err(e),
            Err(e) => e,
        };
        debug!("native click on '{}' failed: {}", description, err);

        let err = match page.dispatch_click(handle).await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_page_unavailable() => return Err(e),
            Err(e) => e,
        };
        debug!("dispatched click on '{}' failed: {}", description, err);

        match page.invoke_click(handle).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_page_unavailable() => Err(e),
            Err(e) => Err(Error::ActionFailed(format!(
                "every click strategy failed for '{}': {}",
                description, e
            ))),
        }
    }
}

fn require_value(kind: ActionKind, value: Option<&str>) -> Result<&str> {
    match value {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::ActionFailed(format!("'{}' needs a non-empty value", kind))),
    }
}

/// Wrap an interaction error, keeping page loss distinguishable.
fn failed(what: &str, description: &str, e: Error) -> Error {
    match e {
        Error::PageUnavailable(_) => e,
        other => Error::ActionFailed(format!("{} '{}' failed: {}", what, description, other)),
    }
}
