pub mod plan;
pub mod schema;

pub use plan::{Action, ActionKind, Plan, RawStep};
pub use schema::{
    BrowserConfig, CacheConfig, EngineConfig, ExecutorConfig, LocatorConfig, RunnerConfig,
    StabilityConfig, TrackerConfig, Viewport,
};
