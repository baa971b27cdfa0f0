//! Selector cache: (page URL, description) to the last selector that worked.
//!
//! Entries live for the process only and are never deleted; a newer entry
//! with the same key replaces the old one, and entries older than the TTL
//! read as absent.

use crate::config::ActionKind;
use crate::driver::Selector;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// What kind of interaction produced a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    TextMatch,
    InputField,
    TextArea,
    Select,
}

impl InteractionKind {
    pub fn for_action(kind: ActionKind) -> Self {
        match kind {
            ActionKind::Fill => InteractionKind::InputField,
            ActionKind::Type => InteractionKind::TextArea,
            ActionKind::Select => InteractionKind::Select,
            _ => InteractionKind::TextMatch,
        }
    }
}

impl fmt::Display for InteractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InteractionKind::TextMatch => "text_match",
            InteractionKind::InputField => "input_field",
            InteractionKind::TextArea => "text_area",
            InteractionKind::Select => "select",
        };
        f.write_str(s)
    }
}

/// Small attribute bag stored alongside a cached selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementMeta {
    pub kind: InteractionKind,
    /// Text the element matched on.
    pub text: String,
    pub tag: String,
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub selector: Selector,
    pub info: ElementMeta,
    pub stored_at: Instant,
}

impl CacheEntry {
    pub fn is_fresh_at(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.stored_at) < ttl
    }
}

/// In-memory selector cache.
#[derive(Debug, Clone)]
pub struct SelectorCache {
    ttl: Duration,
    entries: HashMap<String, CacheEntry>,
}

impl SelectorCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cache key: the URL and the trimmed, lowercased description.
    pub fn key(url: &str, description: &str) -> String {
        format!("{}|||{}", url, description.trim().to_lowercase())
    }

    /// Fresh entry for the pair, if any.
    pub fn get(&self, url: &str, description: &str) -> Option<&CacheEntry> {
        self.get_at(Instant::now(), url, description)
    }

    /// Lookup as if the current time were `now`.
    pub fn get_at(&self, now: Instant, url: &str, description: &str) -> Option<&CacheEntry> {
        let key = Self::key(url, description);
        let entry = self.entries.get(&key)?;
        if entry.is_fresh_at(now, self.ttl) {
            Some(entry)
        } else {
            debug!("cache entry for {} expired", key);
            None
        }
    }

    pub fn record(&mut self, url: &str, description: &str, selector: Selector, info: ElementMeta) {
        self.record_at(Instant::now(), url, description, selector, info);
    }

    pub fn record_at(
        &mut self,
        now: Instant,
        url: &str,
        description: &str,
        selector: Selector,
        info: ElementMeta,
    ) {
        let key = Self::key(url, description);
        debug!("cache store {} -> {}", key, selector);
        self.entries.insert(
            key,
            CacheEntry {
                selector,
                info,
                stored_at: now,
            },
        );
    }

    /// Number of stored entries, fresh or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

impl Default for SelectorCache {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}
