use super::types::{Assertion, AssertionOutcome};
use crate::protocol::CheckResult;

/// Evaluate every assertion against a result, in order.
///
/// One failing assertion never prevents the others from being evaluated.
pub fn evaluate(assertions: &[Assertion], result: &CheckResult) -> Vec<AssertionOutcome> {
    assertions.iter().map(|assertion| evaluate_one(assertion, result)).collect()
}

/// Overall pass state of a result.
///
/// With no assertions the implicit rule applies. A redirected response
/// never passes, whatever its assertions say.
pub fn passes(outcomes: &[AssertionOutcome], result: &CheckResult) -> bool {
    if result.redirected {
        return false;
    }
    if outcomes.is_empty() {
        return implicit_pass(result);
    }
    outcomes.iter().all(|outcome| outcome.passed)
}

/// Rule used when a monitor has no assertions: ok status and no redirect
pub fn implicit_pass(result: &CheckResult) -> bool {
    result.is_ok() && !result.redirected
}

fn evaluate_one(assertion: &Assertion, result: &CheckResult) -> AssertionOutcome {
    let expectation = assertion.expectation();
    let (passed, actual) = match assertion {
        Assertion::Status { compare, target } => {
            let actual = i64::from(result.status_code);
            (compare.compare(actual, *target), format!("got {actual}"))
        }
        Assertion::StatusRange { min, max } => {
            let actual = result.status_code;
            ((*min..=*max).contains(&actual), format!("got {actual}"))
        }
        Assertion::Header { key, compare, target } => match result.header(key) {
            Some(value) => (compare.compare(value, target), format!("got {value:?}")),
            None => (false, "header is missing".to_string()),
        },
        Assertion::TextBody { compare, target } => {
            let body = result.body.as_deref().unwrap_or_default();
            (compare.compare(body, target), format!("body is {} bytes", body.len()))
        }
        Assertion::Timing { phase, compare, target } => {
            let actual = match phase.phase() {
                Some(phase) => result.timing.phase(phase),
                None => Ok(result.latency as i64),
            };
            match actual {
                Ok(actual) => (compare.compare(actual, *target), format!("got {actual} ms")),
                Err(error) => (false, format!("timing is invalid: {error}")),
            }
        }
    };

    let verdict = if passed { "passed" } else { "failed" };
    AssertionOutcome {
        assertion: assertion.clone(),
        passed,
        reason: format!("expected {expectation}: {verdict}, {actual}"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::assertions::{NumberComparison, StringComparison, TimingTarget};
    use crate::region::Region;
    use crate::timing::Timing;

    fn result(status_code: u16) -> CheckResult {
        let mut headers = BTreeMap::new();
        headers.insert("content-type".to_string(), "text/html; charset=utf-8".to_string());
        CheckResult {
            region: Region::Ams,
            status_code,
            latency: 120,
            headers,
            body: Some("<html>hello world</html>".to_string()),
            timing: Timing {
                dns_start: 0,
                dns_done: 10,
                connect_start: 10,
                connect_done: 20,
                tls_handshake_start: 20,
                tls_handshake_done: 60,
                first_byte_start: 60,
                first_byte_done: 110,
                transfer_start: 110,
                transfer_done: 120,
            },
            timestamp: 0,
            redirected: false,
        }
    }

    #[test]
    fn test_status_assertions() {
        let outcomes = evaluate(
            &[
                Assertion::status_eq(200),
                Assertion::StatusRange { min: 200, max: 299 },
                Assertion::Status { compare: NumberComparison::Lt, target: 200 },
            ],
            &result(200),
        );

        let passed: Vec<bool> = outcomes.iter().map(|o| o.passed).collect();
        assert_eq!(passed, vec![true, true, false]);
        assert_eq!(outcomes[2].reason, "expected status code < 200: failed, got 200");
    }

    #[test]
    fn test_missing_header_fails() {
        let outcomes = evaluate(
            &[
                Assertion::header_present("x-request-id"),
                Assertion::Header {
                    key: "x-request-id".to_string(),
                    compare: StringComparison::NotContains,
                    target: "abc".to_string(),
                },
            ],
            &result(200),
        );

        assert!(outcomes.iter().all(|o| !o.passed));
        assert!(outcomes[0].reason.contains("header is missing"));
    }

    #[test]
    fn test_header_key_is_case_insensitive() {
        let outcomes = evaluate(
            &[Assertion::Header {
                key: "Content-Type".to_string(),
                compare: StringComparison::Contains,
                target: "text/html".to_string(),
            }],
            &result(200),
        );
        assert!(outcomes[0].passed);
    }

    #[test]
    fn test_body_assertions() {
        let mut without_body = result(200);
        without_body.body = None;

        assert!(evaluate(&[Assertion::body_contains("hello")], &result(200))[0].passed);
        assert!(!evaluate(&[Assertion::body_contains("hello")], &without_body)[0].passed);
        assert!(
            evaluate(
                &[Assertion::TextBody { compare: StringComparison::Empty, target: String::new() }],
                &without_body
            )[0]
                .passed
        );
    }

    #[test]
    fn test_timing_assertions() {
        let outcomes = evaluate(
            &[
                Assertion::latency_below(TimingTarget::Tls, 50),
                Assertion::latency_below(TimingTarget::Ttfb, 50),
                Assertion::Timing {
                    phase: TimingTarget::Total,
                    compare: NumberComparison::Gt,
                    target: 100,
                },
            ],
            &result(200),
        );
        let passed: Vec<bool> = outcomes.iter().map(|o| o.passed).collect();
        assert_eq!(passed, vec![true, false, true]);
    }

    #[test]
    fn test_invalid_timing_fails_timing_assertion() {
        let mut broken = result(200);
        broken.timing.dns_done = -1;
        let outcomes = evaluate(&[Assertion::latency_below(TimingTarget::Dns, 50)], &broken);
        assert!(!outcomes[0].passed);
        assert!(outcomes[0].reason.contains("timing is invalid"));
    }

    #[test]
    fn test_one_failure_does_not_stop_evaluation() {
        let outcomes = evaluate(
            &[Assertion::status_eq(500), Assertion::body_contains("hello")],
            &result(200),
        );
        assert_eq!(outcomes.len(), 2);
        assert!(!outcomes[0].passed);
        assert!(outcomes[1].passed);
    }

    #[test]
    fn test_implicit_rule() {
        assert!(passes(&[], &result(200)));
        assert!(!passes(&[], &result(500)));

        let mut redirected = result(200);
        redirected.redirected = true;
        assert!(!passes(&[], &redirected));

        let outcomes = evaluate(&[Assertion::status_eq(200)], &redirected);
        assert!(!passes(&outcomes, &redirected));
    }

    #[test]
    fn test_explicit_assertions_replace_implicit_rule() {
        let not_found = result(404);
        let outcomes = evaluate(&[Assertion::status_eq(404)], &not_found);
        assert!(passes(&outcomes, &not_found));
    }
}
