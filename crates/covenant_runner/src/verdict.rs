//! Verdict classification.

use crate::{
    error::ScenarioError,
    result::{AssertionRecord, TestStatus},
};

/// Classifies the outcome of one run from the escaped error (if any) and
/// the captured records.
pub struct VerdictDecider;

impl VerdictDecider {
    pub fn decide(error: Option<&ScenarioError>, records: &[AssertionRecord]) -> TestStatus {
        if let Some(error) = error {
            return match error {
                ScenarioError::Timeout { .. } => TestStatus::Aborted {
                    reason: "timeout".to_owned(),
                },
                ScenarioError::Contract(violation) => TestStatus::AssertionFailed {
                    message: violation.message.clone(),
                    expected: violation.expected.clone(),
                    actual: violation.actual.clone(),
                },
                ScenarioError::Assertion {
                    message,
                    expected,
                    actual,
                    ..
                } => TestStatus::AssertionFailed {
                    message: message.clone(),
                    expected: expected.clone(),
                    actual: actual.clone(),
                },
                other => TestStatus::ExecutionError {
                    cause: other.cause_name().to_owned(),
                    message: other.to_string(),
                },
            };
        }
        if let Some(first_failed) = records.iter().find(|record| record.is_failed()) {
            return TestStatus::AssertionFailed {
                message: first_failed.message.clone(),
                expected: first_failed.expected.clone(),
                actual: first_failed.actual.clone(),
            };
        }
        TestStatus::Passed
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        error::ContractViolation,
        result::{AssertionRule, RecordStatus},
    };

    use super::*;

    #[test]
    fn escaped_assertion_beats_records() {
        let status = VerdictDecider::decide(
            Some(&ScenarioError::Assertion {
                message: "broke".into(),
                expected: Some("1".into()),
                actual: Some("2".into()),
                frames: Vec::new(),
            }),
            &[],
        );
        assert_eq!(
            status,
            TestStatus::AssertionFailed {
                message: "broke".into(),
                expected: Some("1".into()),
                actual: Some("2".into()),
            }
        );
    }

    #[test]
    fn contract_violations_classify_as_assertion_failures() {
        let violation = ContractViolation::new(
            AssertionRule::Annotation {
                name: "Positive".into(),
            },
            "must be positive",
        );
        let status = VerdictDecider::decide(Some(&ScenarioError::Contract(violation)), &[]);
        assert!(matches!(status, TestStatus::AssertionFailed { .. }));
    }

    #[test]
    fn timeout_aborts() {
        let status = VerdictDecider::decide(Some(&ScenarioError::Timeout { millis: 10 }), &[]);
        assert_eq!(
            status,
            TestStatus::Aborted {
                reason: "timeout".into()
            }
        );
    }

    #[test]
    fn first_failed_record_wins_without_an_error() {
        let records = vec![
            AssertionRecord::passed(AssertionRule::StandardAssertion, "fine"),
            AssertionRecord::failed(AssertionRule::StandardAssertion, "first broken")
                .with_comparison(Some("a".into()), Some("b".into())),
            AssertionRecord::failed(AssertionRule::StandardAssertion, "second broken"),
        ];
        let status = VerdictDecider::decide(None, &records);
        assert_eq!(
            status,
            TestStatus::AssertionFailed {
                message: "first broken".into(),
                expected: Some("a".into()),
                actual: Some("b".into()),
            }
        );
        assert_eq!(records[0].status, RecordStatus::Passed);
    }

    #[test]
    fn all_passed_is_passed() {
        let records = vec![AssertionRecord::passed(
            AssertionRule::StandardAssertion,
            "fine",
        )];
        assert_eq!(VerdictDecider::decide(None, &records), TestStatus::Passed);
        assert_eq!(VerdictDecider::decide(None, &[]), TestStatus::Passed);
    }
}
