use crate::{Error, Result};
use serde::{Deserialize, Deserializer};
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// A step as emitted by the plan generator, before validation.
///
/// Every field except `action` is optional on the wire; which ones are
/// required depends on the action and is checked by [`RawStep::into_action`].
#[derive(Debug, Clone, Default, Deserialize, serde::Serialize, PartialEq)]
#[serde(default)]
pub struct RawStep {
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option: Option<String>,
    /// Seconds, for `wait`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
}

const ACTION_NAMES: &[&str] = &[
    "goto",
    "click",
    "hover",
    "fill",
    "type",
    "press_enter",
    "select",
    "wait",
];

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn looks_like_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

impl RawStep {
    /// Validate the step into a typed [`Action`]. `index` is only used for
    /// error reporting.
    pub fn into_action(self, index: usize) -> Result<Action> {
        let invalid = |reason: String| Error::InvalidStep { index, reason };
        let action = self.action.trim().to_lowercase();

        let target = || {
            non_empty(&self.element_description)
                .map(str::to_string)
                .ok_or_else(|| invalid(format!("'{}' requires element_description", action)))
        };
        // Typed content is kept verbatim; only blank text is rejected.
        let text = || {
            self.text
                .clone()
                .filter(|t| !t.trim().is_empty())
                .ok_or_else(|| invalid(format!("'{}' requires non-empty text", action)))
        };

        match action.as_str() {
            "goto" => {
                // Some generated plans put the URL in element_description.
                let url = non_empty(&self.url)
                    .or_else(|| non_empty(&self.element_description).filter(|d| looks_like_url(d)))
                    .ok_or_else(|| invalid("'goto' requires url".into()))?;
                Ok(Action::Goto {
                    url: url.to_string(),
                })
            }
            "click" => Ok(Action::Click { target: target()? }),
            "hover" => Ok(Action::Hover { target: target()? }),
            "fill" => Ok(Action::Fill {
                target: target()?,
                value: text()?,
            }),
            "type" => Ok(Action::Type {
                target: target()?,
                value: text()?,
            }),
            "press_enter" => Ok(Action::PressEnter),
            "select" => {
                let option = non_empty(&self.option)
                    .or_else(|| non_empty(&self.text))
                    .ok_or_else(|| invalid("'select' requires option".into()))?;
                Ok(Action::Select {
                    target: target()?,
                    option: option.to_string(),
                })
            }
            "wait" => {
                let secs = self.time.unwrap_or(0.0);
                let duration = Duration::try_from_secs_f64(secs)
                    .map_err(|e| invalid(format!("'wait' has invalid time {}: {}", secs, e)))?;
                Ok(Action::Wait { duration })
            }
            "" => Err(invalid("missing action".into())),
            other => Err(invalid(format!(
                "unknown action '{}', expected one of: {}",
                other,
                ACTION_NAMES.join(", ")
            ))),
        }
    }
}

/// The action verb of a step, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Goto,
    Click,
    Hover,
    Fill,
    Type,
    PressEnter,
    Select,
    Wait,
}

impl ActionKind {
    /// Fill and Type put text into an element.
    pub fn is_text_entry(self) -> bool {
        matches!(self, ActionKind::Fill | ActionKind::Type)
    }

    /// Whether the step acts on a described element.
    pub fn needs_element(self) -> bool {
        matches!(
            self,
            ActionKind::Click
                | ActionKind::Hover
                | ActionKind::Fill
                | ActionKind::Type
                | ActionKind::Select
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            ActionKind::Goto => "goto",
            ActionKind::Click => "click",
            ActionKind::Hover => "hover",
            ActionKind::Fill => "fill",
            ActionKind::Type => "type",
            ActionKind::PressEnter => "press_enter",
            ActionKind::Select => "select",
            ActionKind::Wait => "wait",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A validated plan step.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Goto { url: String },
    Click { target: String },
    Hover { target: String },
    Fill { target: String, value: String },
    Type { target: String, value: String },
    PressEnter,
    Select { target: String, option: String },
    Wait { duration: Duration },
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Goto { .. } => ActionKind::Goto,
            Action::Click { .. } => ActionKind::Click,
            Action::Hover { .. } => ActionKind::Hover,
            Action::Fill { .. } => ActionKind::Fill,
            Action::Type { .. } => ActionKind::Type,
            Action::PressEnter => ActionKind::PressEnter,
            Action::Select { .. } => ActionKind::Select,
            Action::Wait { .. } => ActionKind::Wait,
        }
    }

    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    /// Element description, for element steps.
    pub fn target(&self) -> Option<&str> {
        match self {
            Action::Click { target }
            | Action::Hover { target }
            | Action::Fill { target, .. }
            | Action::Type { target, .. }
            | Action::Select { target, .. } => Some(target),
            _ => None,
        }
    }

    /// Payload handed to the executor (text to enter, option to pick).
    pub fn value(&self) -> Option<&str> {
        match self {
            Action::Fill { value, .. } | Action::Type { value, .. } => Some(value),
            Action::Select { option, .. } => Some(option),
            _ => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Goto { url } => write!(f, "goto {}", url),
            Action::PressEnter => f.write_str("press_enter"),
            Action::Wait { duration } => write!(f, "wait {}ms", duration.as_millis()),
            other => {
                write!(f, "{} '{}'", other.name(), other.target().unwrap_or_default())?;
                if let Some(v) = other.value() {
                    write!(f, " = '{}'", v)?;
                }
                Ok(())
            }
        }
    }
}

/// Wire shapes accepted for a plan: `{ steps: [...] }` or a bare list.
#[derive(Deserialize)]
#[serde(untagged)]
enum PlanDoc {
    Wrapped {
        #[serde(default)]
        steps: Vec<RawStep>,
    },
    Bare(Vec<RawStep>),
}

impl PlanDoc {
    fn into_steps(self) -> Vec<RawStep> {
        match self {
            PlanDoc::Wrapped { steps } | PlanDoc::Bare(steps) => steps,
        }
    }
}

/// An ordered, validated sequence of actions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Plan {
    steps: Vec<Action>,
}

impl Plan {
    pub fn new(steps: Vec<Action>) -> Self {
        Self { steps }
    }

    /// Plan with no steps; running it reports failure without touching the page.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a plan from a YAML or JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse a plan from YAML (JSON documents are valid YAML too).
    pub fn parse(yaml: &str) -> Result<Self> {
        let doc: PlanDoc = serde_yaml::from_str(yaml)?;
        Self::from_raw(doc.into_steps())
    }

    /// Parse a plan from JSON, as returned by the plan generator.
    pub fn from_json(json: &str) -> Result<Self> {
        let doc: PlanDoc = serde_json::from_str(json)?;
        Self::from_raw(doc.into_steps())
    }

    /// Validate raw steps. The first malformed step rejects the whole plan.
    pub fn from_raw(steps: Vec<RawStep>) -> Result<Self> {
        let steps = steps
            .into_iter()
            .enumerate()
            .map(|(i, s)| s.into_action(i))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[Action] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl<'de> Deserialize<'de> for Plan {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let doc = PlanDoc::deserialize(deserializer)?;
        Plan::from_raw(doc.into_steps()).map_err(serde::de::Error::custom)
    }
}
