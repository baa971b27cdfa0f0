//! Plan generation.
//!
//! Turning a user goal into steps is normally done by an external model
//! seeded with similar worked examples. [`ExampleLibrary`] covers the
//! retrieval half locally: it returns the plan of the closest example query.

use crate::config::Plan;
use crate::locator::fuzzy;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// Produces a plan for a free-text goal.
#[allow(async_fn_in_trait)]
pub trait PlanGenerator {
    async fn plan_for(&self, goal: &str) -> Result<Plan>;

    /// Like [`plan_for`](Self::plan_for), but an unavailable plan becomes an
    /// empty one, which the runner reports as a failed run.
    async fn generate_or_empty(&self, goal: &str) -> Plan {
        match self.plan_for(goal).await {
            Ok(plan) => plan,
            Err(e) => {
                warn!("No plan for '{}': {}", goal, e);
                Plan::empty()
            }
        }
    }
}

/// A worked example: a user query and the plan that satisfies it.
#[derive(Debug, Clone, Deserialize)]
pub struct Example {
    pub query: String,
    pub plan: Plan,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LibraryDoc {
    Wrapped { examples: Vec<Example> },
    Bare(Vec<Example>),
}

fn default_min_score() -> u8 {
    60
}

/// Examples matched to goals by word-order-insensitive similarity.
#[derive(Debug, Clone)]
pub struct ExampleLibrary {
    examples: Vec<Example>,
    min_score: u8,
}

impl ExampleLibrary {
    pub fn new(examples: Vec<Example>) -> Self {
        Self {
            examples,
            min_score: default_min_score(),
        }
    }

    /// Load examples from a YAML (or JSON) file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    pub fn parse(yaml: &str) -> Result<Self> {
        let examples = match serde_yaml::from_str(yaml)? {
            LibraryDoc::Wrapped { examples } | LibraryDoc::Bare(examples) => examples,
        };
        Ok(Self::new(examples))
    }

    /// Minimum similarity (0-100) for an example to be used.
    pub fn with_min_score(mut self, min_score: u8) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    /// Closest example and its score; earlier examples win ties.
    pub fn best_match(&self, goal: &str) -> Option<(&Example, u8)> {
        let mut best: Option<(&Example, u8)> = None;
        for example in &self.examples {
            let score = fuzzy::token_sort_ratio(goal, &example.query);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((example, score));
            }
        }
        best
    }
}

impl PlanGenerator for ExampleLibrary {
    async fn plan_for(&self, goal: &str) -> Result<Plan> {
        if goal.trim().is_empty() {
            return Err(Error::PlanUnavailable("empty goal".into()));
        }
        let Some((example, score)) = self.best_match(goal) else {
            return Err(Error::PlanUnavailable("example library is empty".into()));
        };
        debug!("closest example '{}' (score {})", example.query, score);
        if score < self.min_score {
            return Err(Error::PlanUnavailable(format!(
                "no example close to '{}' (best '{}' at {})",
                goal, example.query, score
            )));
        }
        if example.plan.is_empty() {
            return Err(Error::PlanUnavailable(format!(
                "example '{}' has no steps",
                example.query
            )));
        }
        info!("Using plan of example '{}' (score {})", example.query, score);
        Ok(example.plan.clone())
    }
}
