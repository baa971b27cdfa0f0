//! Chromium backend over `eoka`.
//!
//! Elements are addressed by stamping a `data-nav-handle` attribute onto
//! matched nodes, so every handle doubles as a CSS selector the CDP layer
//! can click, fill and hover.

use super::scripts::{self, handle_selector};
use super::{
    BoundingBox, BrowserContext, DomMetrics, ElementHandle, ElementInfo, Framework, LoadState,
    PageDriver, PageId, Selector,
};
use crate::config::BrowserConfig;
use crate::{Error, Result};
use eoka::{Browser, Page};
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// How long a liveness probe may take before the tab is considered gone.
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);
const READY_POLL: Duration = Duration::from_millis(50);
const NETWORK_IDLE_MS: u64 = 500;

#[derive(Debug, Deserialize)]
struct QueryReply {
    #[serde(default)]
    handles: Vec<String>,
    #[serde(default)]
    error: Option<String>,
}

/// One tab of an [`EokaBrowser`].
pub struct EokaPage {
    page: Page,
    id: PageId,
    closed: AtomicBool,
}

impl EokaPage {
    fn new(page: Page) -> Self {
        let id = PageId::new(page.target_id().to_string());
        Self {
            page,
            id,
            closed: AtomicBool::new(false),
        }
    }

    /// The underlying `eoka` page.
    pub fn inner(&self) -> &Page {
        &self.page
    }

    fn mark_closed(&self) {
        self.closed.store(true, Ordering::Relaxed);
    }

    fn closed_flag(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    /// Map a CDP failure, recognising a tab that went away.
    fn classify(&self, e: eoka::Error) -> Error {
        let msg = e.to_string();
        let lower = msg.to_lowercase();
        if self.closed_flag()
            || lower.contains("target closed")
            || lower.contains("no target")
            || lower.contains("detached")
            || lower.contains("session closed")
        {
            self.mark_closed();
            return Error::PageUnavailable(format!("tab {}: {}", self.id, msg));
        }
        match e {
            eoka::Error::ElementNotFound(what) => Error::ElementNotFound(what),
            other => Error::Browser(other),
        }
    }

    async fn eval_string(&self, js: &str) -> Result<String> {
        if self.closed_flag() {
            return Err(Error::PageUnavailable(format!("tab {} is closed", self.id)));
        }
        self.page
            .evaluate::<String>(js)
            .await
            .map_err(|e| self.classify(e))
    }

    async fn eval_json<T: serde::de::DeserializeOwned>(&self, js: &str) -> Result<T> {
        let raw = self.eval_string(js).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Run an element-level script; `'missing'` means the handle is stale.
    async fn on_element(&self, script: &str, element: &ElementHandle) -> Result<String> {
        let reply = self
            .eval_string(&scripts::call(script, &element.as_str()))
            .await?;
        if reply == "missing" {
            return Err(Error::ElementNotFound(format!(
                "element {} is no longer attached",
                element
            )));
        }
        Ok(reply)
    }

    async fn query(
        &self,
        root: Option<&ElementHandle>,
        selector: &Selector,
    ) -> Result<Vec<ElementHandle>> {
        let root = root.map(|r| r.as_str());
        let request = match selector {
            Selector::Css(css) => serde_json::json!({ "kind": "css", "css": css, "root": root }),
            Selector::Text {
                pattern,
                case_insensitive,
            } => serde_json::json!({
                "kind": "text",
                "pattern": pattern,
                "flags": if *case_insensitive { "i" } else { "" },
                "root": root,
            }),
            Selector::HasText { tag, text } => {
                serde_json::json!({ "kind": "has_text", "tag": tag, "text": text, "root": root })
            }
        };
        let reply: QueryReply = self
            .eval_json(&scripts::call(scripts::QUERY_JS, &request))
            .await?;
        match reply.error.as_deref() {
            None => Ok(reply.handles.into_iter().map(ElementHandle::new).collect()),
            Some("stale") => Err(Error::ElementNotFound(format!(
                "query root {} is no longer attached",
                root.unwrap_or_default()
            ))),
            Some(msg) => Err(Error::ActionFailed(format!(
                "selector '{}' rejected: {}",
                selector, msg
            ))),
        }
    }

    async fn with_timeout<T, F>(&self, what: &str, timeout: Duration, fut: F) -> Result<T>
    where
        F: std::future::Future<Output = eoka::Result<T>>,
    {
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result.map_err(|e| self.classify(e)),
            Err(_) => Err(Error::Timeout(format!(
                "{} did not finish within {}ms",
                what,
                timeout.as_millis()
            ))),
        }
    }
}

impl PageDriver for EokaPage {
    fn id(&self) -> &PageId {
        &self.id
    }

    async fn url(&self) -> Result<String> {
        if self.closed_flag() {
            return Err(Error::PageUnavailable(format!("tab {} is closed", self.id)));
        }
        self.page.url().await.map_err(|e| self.classify(e))
    }

    async fn is_closed(&self) -> bool {
        if self.closed_flag() {
            return true;
        }
        match tokio::time::timeout(PROBE_TIMEOUT, self.page.evaluate::<bool>("true")).await {
            Ok(Ok(_)) => false,
            _ => {
                self.mark_closed();
                true
            }
        }
    }

    async fn query_all(&self, selector: &Selector) -> Result<Vec<ElementHandle>> {
        self.query(None, selector).await
    }

    async fn query_within(
        &self,
        root: &ElementHandle,
        selector: &Selector,
    ) -> Result<Vec<ElementHandle>> {
        self.query(Some(root), selector).await
    }

    async fn describe(&self, element: &ElementHandle) -> Result<ElementInfo> {
        let info: Option<ElementInfo> = self
            .eval_json(&scripts::call(scripts::DESCRIBE_JS, &element.as_str()))
            .await?;
        info.ok_or_else(|| {
            Error::ElementNotFound(format!("element {} is no longer attached", element))
        })
    }

    async fn metrics(&self) -> Result<DomMetrics> {
        self.eval_json(scripts::METRICS_JS).await
    }

    async fn wait_for_load(&self, state: LoadState, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            let ready = self.eval_string(scripts::READY_STATE_JS).await?;
            let reached = match state {
                LoadState::DomContentLoaded => ready != "loading",
                LoadState::Load => ready == "complete",
            };
            if reached {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(Error::Timeout(format!(
                    "page still '{}' after {}ms",
                    ready,
                    timeout.as_millis()
                )));
            }
            tokio::time::sleep(READY_POLL).await;
        }
    }

    async fn detect_framework(&self) -> Result<Option<Framework>> {
        let name = self.eval_string(scripts::FRAMEWORK_JS).await?;
        Ok(match name.as_str() {
            "angular" => Some(Framework::Angular),
            "angularjs" => Some(Framework::AngularJs),
            _ => None,
        })
    }

    async fn framework_settled(&self, framework: Framework) -> Result<bool> {
        let js = match framework {
            Framework::Angular => scripts::ANGULAR_SETTLED_JS,
            Framework::AngularJs => scripts::ANGULARJS_SETTLED_JS,
        };
        self.page
            .evaluate::<bool>(js)
            .await
            .map_err(|e| self.classify(e))
    }

    async fn scroll_into_view(&self, element: &ElementHandle) -> Result<()> {
        self.on_element(scripts::SCROLL_JS, element).await?;
        Ok(())
    }

    async fn is_rendered(&self, element: &ElementHandle) -> Result<bool> {
        let reply = self.on_element(scripts::RENDERED_JS, element).await?;
        Ok(serde_json::from_str(&reply)?)
    }

    async fn click(&self, element: &ElementHandle, timeout: Duration) -> Result<()> {
        let selector = handle_selector(element.as_str());
        self.with_timeout("click", timeout, self.page.click(&selector))
            .await
    }

    async fn dispatch_click(&self, element: &ElementHandle) -> Result<()> {
        self.on_element(scripts::DISPATCH_CLICK_JS, element).await?;
        Ok(())
    }

    async fn invoke_click(&self, element: &ElementHandle) -> Result<()> {
        self.on_element(scripts::INVOKE_CLICK_JS, element).await?;
        Ok(())
    }

    async fn hover(&self, element: &ElementHandle, timeout: Duration) -> Result<()> {
        let reply = self.on_element(scripts::BBOX_JS, element).await?;
        let bbox: BoundingBox = serde_json::from_str(&reply)?;
        let (cx, cy) = bbox.center();
        self.with_timeout(
            "hover",
            timeout,
            self.page.session().dispatch_mouse_event(
                eoka::cdp::MouseEventType::MouseMoved,
                cx,
                cy,
                None,
                None,
            ),
        )
        .await
    }

    async fn fill(&self, element: &ElementHandle, value: &str) -> Result<()> {
        let selector = handle_selector(element.as_str());
        self.page
            .fill(&selector, value)
            .await
            .map_err(|e| self.classify(e))
    }

    async fn type_text(&self, text: &str, delay: Duration) -> Result<()> {
        if delay.is_zero() {
            return self
                .page
                .type_text(text)
                .await
                .map_err(|e| self.classify(e));
        }
        let mut buf = [0u8; 4];
        for ch in text.chars() {
            self.page
                .type_text(ch.encode_utf8(&mut buf))
                .await
                .map_err(|e| self.classify(e))?;
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn select_option(&self, element: &ElementHandle, option: &str) -> Result<()> {
        let arg = serde_json::json!({ "id": element.as_str(), "val": option });
        let reply = self
            .eval_string(&scripts::call(scripts::SELECT_JS, &arg))
            .await?;
        match reply.as_str() {
            "true" => Ok(()),
            "missing" => Err(Error::ElementNotFound(format!(
                "element {} is no longer attached",
                element
            ))),
            _ => Err(Error::ElementNotFound(format!(
                "option \"{}\" in element {}",
                option, element
            ))),
        }
    }

    async fn press_key(&self, key: &str) -> Result<()> {
        self.page
            .human()
            .press_key(key)
            .await
            .map_err(|e| self.classify(e))
    }

    async fn goto(&self, url: &str, timeout: Duration) -> Result<()> {
        let start = Instant::now();
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(match self.classify(e) {
                    Error::Browser(inner) => Error::NavigationFailed(format!("{}: {}", url, inner)),
                    other => other,
                })
            }
            Err(_) => {
                return Err(Error::NavigationFailed(format!(
                    "{}: no response within {}ms",
                    url,
                    timeout.as_millis()
                )))
            }
        }
        // Some sites poll forever; idle is best effort.
        let remaining = timeout.saturating_sub(start.elapsed());
        if let Err(e) = self
            .page
            .wait_for_network_idle(NETWORK_IDLE_MS, remaining.as_millis() as u64)
            .await
        {
            debug!("network never went idle after goto {}: {}", url, e);
        }
        Ok(())
    }
}

/// A Chromium instance and the tabs it has open.
///
/// Tabs opened by the page itself (`target=_blank`, `window.open`) are
/// picked up on the next [`BrowserContext::pages`] or
/// [`BrowserContext::take_opened`] call.
pub struct EokaBrowser {
    browser: Browser,
    pages: Vec<EokaPage>,
    /// Targets that existed before launch, or that were replaced on adoption.
    ignored: HashSet<String>,
    opened: Vec<PageId>,
}

impl EokaBrowser {
    /// Launch a browser and open the start page.
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let stealth = eoka::StealthConfig {
            headless: config.headless,
            user_agent: config.user_agent.clone(),
            viewport_width: config.viewport.as_ref().map(|v| v.width).unwrap_or(1280),
            viewport_height: config.viewport.as_ref().map(|v| v.height).unwrap_or(720),
            ..Default::default()
        };

        debug!("Launching browser (headless: {})", config.headless);
        let browser = Browser::launch_with_config(stealth).await?;
        let ignored = browser.tabs().await?.into_iter().map(|t| t.id).collect();
        let start = config.start_url.as_deref().unwrap_or("about:blank");
        let page = browser.new_page(start).await?;

        Ok(Self {
            browser,
            pages: vec![EokaPage::new(page)],
            ignored,
            opened: Vec::new(),
        })
    }

    /// Close the browser.
    pub async fn close(self) -> Result<()> {
        self.browser.close().await?;
        Ok(())
    }

    /// Reconcile our tab list with what the browser reports.
    async fn sync(&mut self) -> Result<()> {
        let tabs = self.browser.tabs().await?;
        let live: HashSet<&str> = tabs.iter().map(|t| t.id.as_str()).collect();
        for page in &self.pages {
            if !live.contains(page.id.as_str()) {
                page.mark_closed();
            }
        }
        self.pages.retain(|p| !p.closed_flag());

        // Tabs the page opened on its own; wait until they have a URL.
        let orphans: Vec<(String, String)> = tabs
            .iter()
            .filter(|t| !self.ignored.contains(&t.id))
            .filter(|t| !self.pages.iter().any(|p| p.id.as_str() == t.id))
            .filter(|t| !t.url.is_empty() && t.url != "about:blank")
            .map(|t| (t.id.clone(), t.url.clone()))
            .collect();

        for (orphan, url) in orphans {
            debug!("Adopting tab {} ({})", orphan, url);
            let page = EokaPage::new(self.browser.new_page(&url).await?);
            self.ignored.insert(orphan.clone());
            if let Err(e) = self.browser.close_tab(&orphan).await {
                warn!("Failed to close adopted tab {}: {}", orphan, e);
            }
            self.opened.push(page.id.clone());
            self.pages.push(page);
        }
        Ok(())
    }
}

impl BrowserContext for EokaBrowser {
    type Page = EokaPage;

    async fn pages(&mut self) -> Result<Vec<PageId>> {
        self.sync().await?;
        Ok(self.pages.iter().map(|p| p.id.clone()).collect())
    }

    fn page(&self, id: &PageId) -> Option<&EokaPage> {
        self.pages.iter().find(|p| &p.id == id)
    }

    async fn take_opened(&mut self) -> Result<Vec<PageId>> {
        self.sync().await?;
        Ok(std::mem::take(&mut self.opened))
    }
}
