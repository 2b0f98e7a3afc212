use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use crate::views::RenderContext;

/// Opaque storm identifier as returned by the bridge.
pub type StormId = String;

/// Which dashboard the engine is driving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Historical,
    Nowcast,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Historical => write!(f, "historical"),
            Mode::Nowcast => write!(f, "nowcast"),
        }
    }
}

/// Time slice of the dataset that is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum Scope {
    Year(i32),
    Date(NaiveDate),
}

impl Scope {
    pub fn year(&self) -> i32 {
        match self {
            Scope::Year(year) => *year,
            Scope::Date(date) => chrono::Datelike::year(date),
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Scope::Year(_) => None,
            Scope::Date(date) => Some(*date),
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Year(year) => write!(f, "{}", year),
            Scope::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
        }
    }
}

/// Common error type for engine operations.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unknown storm: {0}")]
    UnknownStorm(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("malformed payload: {0}")]
    Decode(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("analysis failed: {0}")]
    Analysis(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Trait implemented by every visual surface the engine keeps in sync.
///
/// A synchronizer owns exactly one surface. `render` must be idempotent for an
/// unchanged context and must not depend on sibling synchronizers.
pub trait ViewSynchronizer {
    type Output: Clone + fmt::Debug + PartialEq + Serialize;

    fn name(&self) -> &'static str;
    fn render(&mut self, context: &RenderContext<'_>) -> Self::Output;
    fn reset(&mut self) {}
}
