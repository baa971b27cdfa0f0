//! # lms-navigator
//!
//! Drives a live browser session from free-text element descriptions. A plan
//! (an ordered list of typed steps, usually produced by an external planner)
//! is executed step by step: the active tab is re-resolved, the DOM is left to
//! settle, the described element is located and the action is performed.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use lms_navigator::{EngineConfig, EokaBrowser, Plan, PlanRunner};
//!
//! # #[tokio::main]
//! # async fn main() -> lms_navigator::Result<()> {
//! let config = EngineConfig::load("configs/navigator.yaml")?;
//! let plan = Plan::load("plans/announcements.yaml")?;
//! let mut browser = EokaBrowser::launch(&config.browser).await?;
//! let mut runner = PlanRunner::new(config);
//! let result = runner.run(&plan, &mut browser).await;
//! println!("Success: {}", result.success);
//! # Ok(())
//! # }
//! ```

pub mod cache;
mod config;
pub mod driver;
pub mod executor;
pub mod locator;
pub mod planner;
mod runner;
mod session;
pub mod stability;
pub mod tracker;

pub use cache::{CacheEntry, ElementMeta, InteractionKind, SelectorCache};
pub use config::{
    Action, ActionKind, BrowserConfig, CacheConfig, EngineConfig, ExecutorConfig, LocatorConfig,
    Plan, RawStep, RunnerConfig, StabilityConfig, TrackerConfig, Viewport,
};
pub use driver::cdp::{EokaBrowser, EokaPage};
pub use driver::{
    BoundingBox, BrowserContext, DomMetrics, ElementHandle, ElementInfo, Framework, LoadState,
    PageDriver, PageId, Selector,
};
pub use executor::ActionExecutor;
pub use locator::{ElementLocator, Located, Strategy};
pub use planner::{Example, ExampleLibrary, PlanGenerator};
pub use runner::{PlanRunner, RunResult};
pub use session::Session;
pub use stability::{Stability, StabilityMonitor};
pub use tracker::TabTracker;

/// Result type for lms-navigator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading plans or driving the browser.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("action failed: {0}")]
    ActionFailed(String),

    #[error("page unavailable: {0}")]
    PageUnavailable(String),

    #[error("navigation failed: {0}")]
    NavigationFailed(String),

    #[error("plan unavailable: {0}")]
    PlanUnavailable(String),

    #[error("invalid step {index}: {reason}")]
    InvalidStep { index: usize, reason: String },

    #[error("config error: {0}")]
    Config(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),
}

impl Error {
    /// Whether the error means the page went away under us (closed tab,
    /// navigation mid-operation) and the active page should be re-resolved.
    pub fn is_page_unavailable(&self) -> bool {
        matches!(self, Error::PageUnavailable(_))
    }
}
