use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Top-level engine settings.
///
/// Every field has a default, so an empty document is a valid config.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Browser launch configuration.
    pub browser: BrowserConfig,

    /// Element resolution tuning.
    pub locator: LocatorConfig,

    /// DOM quiescence detection.
    pub stability: StabilityConfig,

    /// Interaction timeouts.
    pub executor: ExecutorConfig,

    /// Selector cache freshness.
    pub cache: CacheConfig,

    /// Tab focus tracking.
    pub tracker: TrackerConfig,

    /// Plan execution.
    pub runner: RunnerConfig,
}

impl EngineConfig {
    /// Load config from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse config from a YAML string.
    pub fn parse(yaml: &str) -> Result<Self> {
        let config: EngineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with every wait shrunk to a few milliseconds.
    pub fn fast() -> Self {
        Self {
            browser: BrowserConfig::default(),
            locator: LocatorConfig::default(),
            stability: StabilityConfig {
                timeout_ms: 50,
                poll_interval_ms: 1,
                load_timeout_ms: 10,
                framework_timeout_ms: 10,
                fallback_wait_ms: 1,
                ..StabilityConfig::default()
            },
            executor: ExecutorConfig {
                click_timeout_ms: 50,
                hover_timeout_ms: 50,
                visibility_timeout_ms: 10,
                visibility_poll_ms: 1,
                settle_ms: 0,
                type_delay_ms: 0,
            },
            cache: CacheConfig::default(),
            tracker: TrackerConfig {
                tab_load_timeout_ms: 10,
                ..TrackerConfig::default()
            },
            runner: RunnerConfig {
                navigation_timeout_ms: 100,
                post_action_settle_ms: 0,
                post_goto_wait_ms: 0,
                page_retry_attempts: 1,
            },
        }
    }

    /// Validate the config.
    pub fn validate(&self) -> Result<()> {
        if self.locator.threshold > 100 {
            return Err(Error::Config(
                "locator.threshold must be between 0 and 100".into(),
            ));
        }
        if self.stability.poll_interval_ms == 0 {
            return Err(Error::Config(
                "stability.poll_interval_ms must be at least 1".into(),
            ));
        }
        if self.stability.timeout_ms == 0 {
            return Err(Error::Config(
                "stability.timeout_ms must be at least 1".into(),
            ));
        }
        if self.cache.ttl_secs == 0 {
            return Err(Error::Config("cache.ttl_secs must be at least 1".into()));
        }
        if self.locator.text_entry_keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(Error::Config(
                "locator.text_entry_keywords must not contain empty entries".into(),
            ));
        }
        Ok(())
    }
}

/// Browser launch configuration.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run in headless mode.
    pub headless: bool,

    /// Custom user agent.
    pub user_agent: Option<String>,

    /// Viewport size.
    pub viewport: Option<Viewport>,

    /// Page opened when the session starts.
    pub start_url: Option<String>,
}

/// Viewport dimensions.
#[derive(Debug, Clone, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

fn default_threshold() -> u8 {
    70
}
fn default_min_code_len() -> usize {
    5
}
fn default_editor_min_width() -> f64 {
    100.0
}
fn default_editor_min_height() -> f64 {
    50.0
}
fn default_text_entry_keywords() -> Vec<String> {
    ["post", "content", "reply", "comment", "text", "message"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Element resolution tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Minimum similarity (0-100) a fuzzy candidate needs to be accepted.
    pub threshold: u8,
    /// Shortest normalized structured code worth probing for.
    pub min_code_len: usize,
    /// Rich-text editors smaller than this are ignored.
    pub editor_min_width: f64,
    pub editor_min_height: f64,
    /// Words that mark a text-entry description as aimed at a large text area.
    pub text_entry_keywords: Vec<String>,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            min_code_len: default_min_code_len(),
            editor_min_width: default_editor_min_width(),
            editor_min_height: default_editor_min_height(),
            text_entry_keywords: default_text_entry_keywords(),
        }
    }
}

/// DOM quiescence detection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    pub timeout_ms: u64,
    pub poll_interval_ms: u64,
    /// Budget for the initial DOMContentLoaded wait.
    pub load_timeout_ms: u64,
    /// Allowed scroll height drift in pixels.
    pub height_tolerance: i64,
    /// Allowed serialized DOM length drift in characters.
    pub length_tolerance: u64,
    pub framework_timeout_ms: u64,
    /// Sleep used when metrics cannot be read at all.
    pub fallback_wait_ms: u64,
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 5000,
            poll_interval_ms: 200,
            load_timeout_ms: 2000,
            height_tolerance: 5,
            length_tolerance: 100,
            framework_timeout_ms: 3000,
            fallback_wait_ms: 1000,
        }
    }
}

impl StabilityConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Interaction timeouts.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    pub click_timeout_ms: u64,
    pub hover_timeout_ms: u64,
    /// How long to wait for an element to be painted before acting anyway.
    pub visibility_timeout_ms: u64,
    pub visibility_poll_ms: u64,
    /// Pause after the element is confirmed rendered.
    pub settle_ms: u64,
    /// Delay between keystrokes for `type` steps.
    pub type_delay_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            click_timeout_ms: 15000,
            hover_timeout_ms: 10000,
            visibility_timeout_ms: 5000,
            visibility_poll_ms: 100,
            settle_ms: 300,
            type_delay_ms: 100,
        }
    }
}

/// Selector cache freshness.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_secs: 3600 }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Tab focus tracking.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// After an action, newly appeared tabs within this window take focus.
    pub recency_window_ms: u64,
    pub tab_load_timeout_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            recency_window_ms: 3000,
            tab_load_timeout_ms: 15000,
        }
    }
}

impl TrackerConfig {
    pub fn recency_window(&self) -> Duration {
        Duration::from_millis(self.recency_window_ms)
    }
}

/// Plan execution.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub navigation_timeout_ms: u64,
    /// Extra settle time after a click or a recent tab switch.
    pub post_action_settle_ms: u64,
    /// Fixed pause after a successful `goto`.
    pub post_goto_wait_ms: u64,
    /// How many times a step is retried on a fresh active page when the
    /// page disappears mid-step.
    pub page_retry_attempts: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            navigation_timeout_ms: 30000,
            post_action_settle_ms: 2000,
            post_goto_wait_ms: 1000,
            page_retry_attempts: 1,
        }
    }
}
