//! Browser capability interface.
//!
//! The engine never talks to a browser directly. It needs a handful of
//! capabilities (query the DOM, describe an element, click, type, wait) and
//! a way to enumerate tabs; anything that provides [`PageDriver`] and
//! [`BrowserContext`] can be driven. [`cdp`] implements both over a real
//! Chromium via `eoka`.

pub mod cdp;
mod scripts;

use crate::Result;
use serde::Deserialize;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Identifies a tab within a browsing context.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageId(pub String);

impl PageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque reference to a DOM node. Only meaningful for the page load it
/// was obtained from; after navigation it simply stops resolving.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle(String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Bounding box in viewport coordinates.
#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// Attributes of an element used for matching and for rebuilding a selector.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ElementInfo {
    /// Lowercase tag name.
    pub tag: String,
    /// Trimmed visible text.
    pub text: String,
    pub placeholder: Option<String>,
    /// Text of the `<label for=...>` pointing at this element.
    pub label: Option<String>,
    /// Text of the nearest enclosing `div`, `li`, `section` or `article`.
    pub container_text: Option<String>,
    pub title: Option<String>,
    /// Text of a heading that is, or sits inside, this element.
    pub heading: Option<String>,
    pub bbox: Option<BoundingBox>,
    pub visible: bool,
}

impl ElementInfo {
    pub fn is_button(&self) -> bool {
        self.tag == "button"
    }

    /// Text the element is matched on. Elements without visible text borrow
    /// from their label, placeholder and surrounding container.
    pub fn comparison_text(&self) -> String {
        if !self.text.trim().is_empty() {
            return self.text.trim().to_string();
        }
        [&self.label, &self.placeholder, &self.container_text]
            .into_iter()
            .filter_map(|s| s.as_deref().map(str::trim))
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Text written into a reconstructed `has-text` selector.
    /// Form fields fall back to placeholder and label.
    pub fn selector_text(&self) -> String {
        let text = self.text.trim();
        if !text.is_empty() {
            return text.to_string();
        }
        if matches!(self.tag.as_str(), "input" | "textarea" | "select" | "div") {
            return [&self.placeholder, &self.label]
                .into_iter()
                .filter_map(|s| s.as_deref().map(str::trim))
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(" ");
        }
        String::new()
    }
}

/// Structural metrics sampled to decide whether the DOM has settled.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
pub struct DomMetrics {
    pub child_count: u64,
    pub scroll_height: i64,
    pub dom_length: u64,
}

impl DomMetrics {
    /// Same child count, and height / length within the given tolerances.
    pub fn is_close_to(&self, other: &DomMetrics, height_tol: i64, length_tol: u64) -> bool {
        self.child_count == other.child_count
            && (self.scroll_height - other.scroll_height).abs() < height_tol
            && self.dom_length.abs_diff(other.dom_length) < length_tol
    }
}

/// Page load milestones.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    DomContentLoaded,
    Load,
}

/// Client-side frameworks with a usable "settled" signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Framework {
    /// AngularJS (1.x): `$http.pendingRequests`.
    AngularJs,
    /// Angular (2+): testability API.
    Angular,
}

impl fmt::Display for Framework {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Framework::AngularJs => write!(f, "AngularJS"),
            Framework::Angular => write!(f, "Angular"),
        }
    }
}

/// How to find elements.
///
/// Serializes to the string forms used in the selector cache:
/// plain CSS, `text=/pattern/i`, or `tag:has-text('text')`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Css(String),
    /// Deepest elements whose visible text matches the regex.
    Text {
        pattern: String,
        case_insensitive: bool,
    },
    /// Elements with the tag whose text (or placeholder / label for form
    /// fields) contains `text`, case-insensitively. An empty `text` matches
    /// every element with the tag.
    HasText { tag: String, text: String },
}

impl Selector {
    pub fn css(s: impl Into<String>) -> Self {
        Selector::Css(s.into())
    }

    /// Case-insensitive regex text selector.
    pub fn text_regex(pattern: impl Into<String>) -> Self {
        Selector::Text {
            pattern: pattern.into(),
            case_insensitive: true,
        }
    }

    pub fn has_text(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Selector::HasText {
            tag: tag.into(),
            text: text.into(),
        }
    }

    /// Parse the string form back into a selector. Anything that is not a
    /// text or has-text selector is treated as CSS.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if let Some(rest) = s.strip_prefix("text=/") {
            if let Some(pattern) = rest.strip_suffix("/i") {
                return Selector::text_regex(pattern);
            }
            if let Some(pattern) = rest.strip_suffix('/') {
                return Selector::Text {
                    pattern: pattern.into(),
                    case_insensitive: false,
                };
            }
        }
        if let Some((tag, rest)) = s.split_once(":has-text('") {
            let tag_ok = !tag.is_empty() && tag.chars().all(|c| c.is_ascii_alphanumeric() || c == '-');
            if let (true, Some(text)) = (tag_ok, rest.strip_suffix("')")) {
                return Selector::has_text(tag, text.replace("\\'", "'"));
            }
        }
        Selector::Css(s.to_string())
    }
}

impl FromStr for Selector {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Selector::parse(s))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Css(s) => f.write_str(s),
            Selector::Text {
                pattern,
                case_insensitive,
            } => write!(
                f,
                "text=/{}/{}",
                pattern,
                if *case_insensitive { "i" } else { "" }
            ),
            Selector::HasText { tag, text } if text.is_empty() => f.write_str(tag),
            Selector::HasText { tag, text } => {
                write!(f, "{}:has-text('{}')", tag, text.replace('\'', "\\'"))
            }
        }
    }
}

/// What the engine needs from a single tab.
///
/// Methods that take an [`ElementHandle`] fail with
/// [`Error::ElementNotFound`](crate::Error::ElementNotFound) once the node is
/// gone, and page-level methods fail with
/// [`Error::PageUnavailable`](crate::Error::PageUnavailable) once the tab is closed.
#[allow(async_fn_in_trait)]
pub trait PageDriver {
    fn id(&self) -> &PageId;

    async fn url(&self) -> Result<String>;

    async fn is_closed(&self) -> bool;

    /// All elements matching the selector, in document order.
    async fn query_all(&self, selector: &Selector) -> Result<Vec<ElementHandle>>;

    /// Descendants of `root` matching the selector, in document order.
    async fn query_within(
        &self,
        root: &ElementHandle,
        selector: &Selector,
    ) -> Result<Vec<ElementHandle>>;

    async fn describe(&self, element: &ElementHandle) -> Result<ElementInfo>;

    async fn metrics(&self) -> Result<DomMetrics>;

    async fn wait_for_load(&self, state: LoadState, timeout: Duration) -> Result<()>;

    async fn detect_framework(&self) -> Result<Option<Framework>>;

    /// Whether the framework reports no outstanding async work.
    async fn framework_settled(&self, framework: Framework) -> Result<bool>;

    async fn scroll_into_view(&self, element: &ElementHandle) -> Result<()>;

    /// Computed style is not hidden and the rendered box is non-zero.
    async fn is_rendered(&self, element: &ElementHandle) -> Result<bool>;

    /// Native (input-level) click.
    async fn click(&self, element: &ElementHandle, timeout: Duration) -> Result<()>;

    /// Dispatch a synthetic `click` event on the node.
    async fn dispatch_click(&self, element: &ElementHandle) -> Result<()>;

    /// Call the node's own `click()` after scrolling it into view.
    async fn invoke_click(&self, element: &ElementHandle) -> Result<()>;

    async fn hover(&self, element: &ElementHandle, timeout: Duration) -> Result<()>;

    /// Assign the value directly.
    async fn fill(&self, element: &ElementHandle, value: &str) -> Result<()>;

    /// Emit keystrokes to the focused element.
    async fn type_text(&self, text: &str, delay: Duration) -> Result<()>;

    /// Choose an option by value or label.
    async fn select_option(&self, element: &ElementHandle, option: &str) -> Result<()>;

    async fn press_key(&self, key: &str) -> Result<()>;

    async fn goto(&self, url: &str, timeout: Duration) -> Result<()>;
}

/// A browsing context holding one or more tabs.
#[allow(async_fn_in_trait)]
pub trait BrowserContext {
    type Page: PageDriver;

    /// Open tabs, oldest first.
    async fn pages(&mut self) -> Result<Vec<PageId>>;

    fn page(&self, id: &PageId) -> Option<&Self::Page>;

    /// Tabs opened since the last call, oldest first.
    async fn take_opened(&mut self) -> Result<Vec<PageId>>;
}
