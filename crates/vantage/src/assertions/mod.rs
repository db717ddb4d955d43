//! Assertion engine.
//!
//! Declarative pass/fail rules evaluated against a [`CheckResult`]. Every
//! assertion is evaluated independently so callers always get the full list
//! of failures.
//!
//! [`CheckResult`]: crate::protocol::CheckResult

mod evaluate;
mod types;

pub use evaluate::{evaluate, implicit_pass, passes};
pub use types::{Assertion, AssertionOutcome, NumberComparison, StringComparison, TimingTarget};
