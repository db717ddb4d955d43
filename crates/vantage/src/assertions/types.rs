use std::fmt;

use serde::{Deserialize, Serialize};

use crate::timing::Phase;

/// Comparison applied to a numeric value (status code, latency)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberComparison {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl NumberComparison {
    pub fn compare(&self, actual: i64, target: i64) -> bool {
        match self {
            NumberComparison::Eq => actual == target,
            NumberComparison::NotEq => actual != target,
            NumberComparison::Gt => actual > target,
            NumberComparison::Gte => actual >= target,
            NumberComparison::Lt => actual < target,
            NumberComparison::Lte => actual <= target,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            NumberComparison::Eq => "==",
            NumberComparison::NotEq => "!=",
            NumberComparison::Gt => ">",
            NumberComparison::Gte => ">=",
            NumberComparison::Lt => "<",
            NumberComparison::Lte => "<=",
        }
    }
}

/// Comparison applied to a header value or the response body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StringComparison {
    /// Only meaningful for headers: the key exists, value ignored
    Present,
    Eq,
    NotEq,
    Contains,
    NotContains,
    Empty,
    NotEmpty,
}

impl StringComparison {
    pub fn compare(&self, actual: &str, target: &str) -> bool {
        match self {
            StringComparison::Present => true,
            StringComparison::Eq => actual == target,
            StringComparison::NotEq => actual != target,
            StringComparison::Contains => actual.contains(target),
            StringComparison::NotContains => !actual.contains(target),
            StringComparison::Empty => actual.is_empty(),
            StringComparison::NotEmpty => !actual.is_empty(),
        }
    }

    fn describe(&self, target: &str) -> String {
        match self {
            StringComparison::Present => "to be present".to_string(),
            StringComparison::Eq => format!("to equal {target:?}"),
            StringComparison::NotEq => format!("not to equal {target:?}"),
            StringComparison::Contains => format!("to contain {target:?}"),
            StringComparison::NotContains => format!("not to contain {target:?}"),
            StringComparison::Empty => "to be empty".to_string(),
            StringComparison::NotEmpty => "not to be empty".to_string(),
        }
    }
}

/// Which latency figure a timing assertion looks at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimingTarget {
    Dns,
    Connection,
    Tls,
    Ttfb,
    Transfer,
    /// Wall-clock latency of the whole request
    Total,
}

impl TimingTarget {
    pub fn phase(&self) -> Option<Phase> {
        match self {
            TimingTarget::Dns => Some(Phase::Dns),
            TimingTarget::Connection => Some(Phase::Connection),
            TimingTarget::Tls => Some(Phase::Tls),
            TimingTarget::Ttfb => Some(Phase::Ttfb),
            TimingTarget::Transfer => Some(Phase::Transfer),
            TimingTarget::Total => None,
        }
    }
}

impl fmt::Display for TimingTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.phase() {
            Some(phase) => write!(f, "{phase} phase"),
            None => f.write_str("total latency"),
        }
    }
}

/// A declarative rule evaluated against a check result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Assertion {
    /// Compare the status code against a single value
    #[serde(rename_all = "camelCase")]
    Status { compare: NumberComparison, target: i64 },

    /// Status code lies within `min..=max`
    #[serde(rename_all = "camelCase")]
    StatusRange { min: u16, max: u16 },

    /// Compare a response header; a missing header always fails
    #[serde(rename_all = "camelCase")]
    Header {
        key: String,
        compare: StringComparison,
        #[serde(default)]
        target: String,
    },

    /// Compare the (possibly truncated) response body
    #[serde(rename_all = "camelCase")]
    TextBody {
        compare: StringComparison,
        #[serde(default)]
        target: String,
    },

    /// Compare a phase duration or the total latency, in milliseconds
    #[serde(rename_all = "camelCase")]
    Timing { phase: TimingTarget, compare: NumberComparison, target: i64 },
}

impl Assertion {
    pub fn status_eq(code: u16) -> Self {
        Assertion::Status { compare: NumberComparison::Eq, target: i64::from(code) }
    }

    pub fn header_present(key: impl Into<String>) -> Self {
        Assertion::Header { key: key.into(), compare: StringComparison::Present, target: String::new() }
    }

    pub fn body_contains(target: impl Into<String>) -> Self {
        Assertion::TextBody { compare: StringComparison::Contains, target: target.into() }
    }

    pub fn latency_below(phase: TimingTarget, threshold_ms: i64) -> Self {
        Assertion::Timing { phase, compare: NumberComparison::Lt, target: threshold_ms }
    }

    /// Human readable expectation, used in outcome reasons
    pub(crate) fn expectation(&self) -> String {
        match self {
            Assertion::Status { compare, target } => {
                format!("status code {} {target}", compare.symbol())
            }
            Assertion::StatusRange { min, max } => format!("status code in {min}..={max}"),
            Assertion::Header { key, compare, target } => {
                format!("header {key:?} {}", compare.describe(target))
            }
            Assertion::TextBody { compare, target } => format!("body {}", compare.describe(target)),
            Assertion::Timing { phase, compare, target } => {
                format!("{phase} {} {target} ms", compare.symbol())
            }
        }
    }
}

/// Result of evaluating one assertion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionOutcome {
    pub assertion: Assertion,
    pub passed: bool,
    pub reason: String,
}
