//! Element locator.
//!
//! Resolves a free-text description to one element on the live page. The
//! strategies run in order and the first hit wins:
//!
//! 1. structured code (`COMP3702`) against attributes, then card containers
//! 2. a fresh selector cache entry for this URL and description
//! 3. rich-text editors, for text entry into "post content" and the like
//! 4. similarity over interactive elements
//!
//! Nothing below the configured threshold is ever returned.

pub mod code;
pub mod fuzzy;
pub mod textarea;

use crate::cache::SelectorCache;
use crate::config::{ActionKind, LocatorConfig};
use crate::driver::{ElementHandle, ElementInfo, PageDriver, Selector};
use crate::{Error, Result};
use std::cmp::Reverse;
use std::fmt;
use textarea::describe_live;
use tracing::{debug, info};

/// Interactive elements considered by the similarity pass.
pub const INTERACTIVE_SELECTOR: &str = r#"a, button, [role="button"], [role="link"], input, textarea, select, [role="textbox"], [contenteditable="true"]"#;

/// Which strategy produced a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    StructuredCode,
    Cache,
    TextArea,
    /// Visible text equal to the description, or a title / heading
    /// containing it.
    Exact,
    Fuzzy,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Strategy::StructuredCode => "structured code",
            Strategy::Cache => "cache",
            Strategy::TextArea => "text area",
            Strategy::Exact => "exact",
            Strategy::Fuzzy => "fuzzy",
        };
        f.write_str(s)
    }
}

/// A resolved element.
#[derive(Debug, Clone)]
pub struct Located {
    pub handle: ElementHandle,
    pub info: ElementInfo,
    pub strategy: Strategy,
    /// Similarity to the description; 100 for non-fuzzy strategies.
    pub score: u8,
}

impl Located {
    fn new(handle: ElementHandle, info: ElementInfo, strategy: Strategy) -> Self {
        Self {
            handle,
            info,
            strategy,
            score: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Tier {
    Fuzzy,
    Exact,
}

/// Score a candidate against the description.
fn rank(description: &str, info: &ElementInfo) -> (Tier, u8) {
    let desc = description.trim().to_lowercase();
    let text = info.comparison_text();
    if !desc.is_empty() && info.text.trim().to_lowercase() == desc {
        return (Tier::Exact, 100);
    }
    let mentions = |s: &Option<String>| {
        s.as_deref()
            .is_some_and(|s| !desc.is_empty() && s.to_lowercase().contains(&desc))
    };
    if mentions(&info.title) || mentions(&info.heading) {
        return (Tier::Exact, 99);
    }
    (Tier::Fuzzy, fuzzy::best_score(description, &text))
}

/// Resolves descriptions to elements.
#[derive(Debug, Clone)]
pub struct ElementLocator {
    config: LocatorConfig,
}

impl ElementLocator {
    pub fn new(config: &LocatorConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Resolve `description` on `page`, which is currently at `url`.
    ///
    /// `intent` is the action about to be performed; text entry enables the
    /// editor heuristic.
    pub async fn locate<P: PageDriver>(
        &self,
        page: &P,
        cache: &SelectorCache,
        url: &str,
        description: &str,
        intent: ActionKind,
    ) -> Result<Located> {
        if let Some(code) = code::extract_code(description, self.config.min_code_len) {
            debug!("'{}' carries code {}", description, code);
            if let Some(found) = self.by_code(page, &code).await? {
                info!("Found '{}' by course code {}", description, code);
                return Ok(found);
            }
        }

        if let Some(entry) = cache.get(url, description) {
            match first_visible(page, &entry.selector).await {
                Ok(Some((handle, info))) => {
                    info!("Found '{}' via cached selector {}", description, entry.selector);
                    return Ok(Located::new(handle, info, Strategy::Cache));
                }
                Ok(None) => debug!("cached selector {} no longer matches", entry.selector),
                Err(e) if e.is_page_unavailable() => return Err(e),
                Err(e) => debug!("cached selector {} failed: {}", entry.selector, e),
            }
        }

        if textarea::wants_text_area(intent, description, &self.config.text_entry_keywords) {
            if let Some((handle, info)) = textarea::find_editor(page, &self.config).await? {
                info!("Found text area <{}> for '{}'", info.tag, description);
                return Ok(Located::new(handle, info, Strategy::TextArea));
            }
        }

        if let Some(found) = self.by_similarity(page, description).await? {
            info!(
                "Found '{}' ({} match, score {}): '{}'",
                description,
                found.strategy,
                found.score,
                found.info.comparison_text()
            );
            return Ok(found);
        }

        if let Some(found) = self.by_exact_text(page, description).await? {
            info!("Found '{}' by exact text <{}>", description, found.info.tag);
            return Ok(found);
        }

        Err(Error::ElementNotFound(format!(
            "no element matching '{}' (threshold {})",
            description, self.config.threshold
        )))
    }

    async fn by_code<P: PageDriver>(&self, page: &P, code: &str) -> Result<Option<Located>> {
        for probe in code::probe_selectors(code) {
            for handle in page.query_all(&probe).await? {
                let Some(info) = describe_live(page, &handle).await? else {
                    continue;
                };
                if !info.visible {
                    continue;
                }
                debug!("code probe {} hit <{}>", probe, info.tag);
                return Ok(Some(Located::new(handle, info, Strategy::StructuredCode)));
            }
        }

        let containers = page
            .query_all(&Selector::css(code::CONTAINER_SELECTOR))
            .await?;
        let mut visible = Vec::new();
        for handle in containers {
            if let Some(info) = describe_live(page, &handle).await? {
                if info.visible {
                    visible.push((handle, info));
                }
            }
        }

        for (handle, info) in &visible {
            if code::squash(&info.text).contains(code) {
                debug!("code found in container <{}>", info.tag);
                return Ok(Some(Located::new(
                    handle.clone(),
                    info.clone(),
                    Strategy::StructuredCode,
                )));
            }
        }

        // Codes hidden in child attributes rather than rendered text.
        for (container, _) in &visible {
            let children = match page.query_within(container, &Selector::css("*")).await {
                Ok(children) => children,
                Err(Error::ElementNotFound(_)) => continue,
                Err(e) => return Err(e),
            };
            for handle in children {
                let Some(info) = describe_live(page, &handle).await? else {
                    continue;
                };
                let haystack = format!(
                    "{} {}",
                    info.text,
                    info.title.as_deref().unwrap_or_default()
                );
                if info.visible && code::squash(&haystack).contains(code) {
                    debug!("code found in container child <{}>", info.tag);
                    return Ok(Some(Located::new(handle, info, Strategy::StructuredCode)));
                }
            }
        }
        Ok(None)
    }

    async fn by_similarity<P: PageDriver>(
        &self,
        page: &P,
        description: &str,
    ) -> Result<Option<Located>> {
        let handles = page
            .query_all(&Selector::css(INTERACTIVE_SELECTOR))
            .await?;

        let mut best: Option<((Tier, u8, bool, Reverse<usize>), ElementHandle, ElementInfo)> =
            None;
        let mut considered = 0;
        for (index, handle) in handles.into_iter().enumerate() {
            let Some(info) = describe_live(page, &handle).await? else {
                continue;
            };
            if !info.visible {
                continue;
            }
            considered += 1;
            let (tier, score) = rank(description, &info);
            if score < self.config.threshold {
                continue;
            }
            let key = (tier, score, info.is_button(), Reverse(index));
            if best.as_ref().map_or(true, |(k, _, _)| key > *k) {
                best = Some((key, handle, info));
            }
        }
        debug!(
            "{} visible candidates for '{}', best: {:?}",
            considered,
            description,
            best.as_ref().map(|(k, _, _)| (k.0, k.1))
        );

        Ok(best.map(|((tier, score, _, _), handle, info)| Located {
            handle,
            info,
            strategy: match tier {
                Tier::Exact => Strategy::Exact,
                Tier::Fuzzy => Strategy::Fuzzy,
            },
            score,
        }))
    }

    /// Any element whose whole text is the description, interactive or not.
    async fn by_exact_text<P: PageDriver>(
        &self,
        page: &P,
        description: &str,
    ) -> Result<Option<Located>> {
        let trimmed = description.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let selector = Selector::text_regex(format!(r"^\s*{}\s*$", regex::escape(trimmed)));
        Ok(first_visible(page, &selector)
            .await?
            .map(|(handle, info)| Located::new(handle, info, Strategy::Exact)))
    }
}

/// First visible element matching the selector.
async fn first_visible<P: PageDriver>(
    page: &P,
    selector: &Selector,
) -> Result<Option<(ElementHandle, ElementInfo)>> {
    for handle in page.query_all(selector).await? {
        if let Some(info) = describe_live(page, &handle).await? {
            if info.visible {
                return Ok(Some((handle, info)));
            }
        }
    }
    Ok(None)
}
