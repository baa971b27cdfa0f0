use crate::cache::SelectorCache;
use crate::config::EngineConfig;
use crate::tracker::TabTracker;
use tokio::time::Instant;

/// Mutable state of one automation session: the selector cache, the
/// active-tab tracker and the time of the last action.
#[derive(Debug)]
pub struct Session {
    config: EngineConfig,
    pub cache: SelectorCache,
    pub tracker: TabTracker,
    last_action: Option<Instant>,
}

impl Session {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            cache: SelectorCache::new(config.cache.ttl()),
            tracker: TabTracker::new(&config.tracker),
            last_action: None,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Record that an action just happened.
    pub fn mark_action(&mut self) {
        self.last_action = Some(Instant::now());
    }

    pub fn last_action(&self) -> Option<Instant> {
        self.last_action
    }

    /// Whether the last action is recent enough that a new tab is likely
    /// its result.
    pub fn within_recency_window(&self) -> bool {
        self.tracker.within_recency_window(self.last_action)
    }
}
