use crate::document;
use crate::engine::EngineOutcome;
use crate::types::{CaseReport, CaseStatus, FixtureKind, TestPair};

/// Classify one invocation outcome under the case's fixture policy.
///
/// For a normal fixture the document's per-query verdicts decide; for an
/// expected-failure fixture the mere existence of a parseable document is
/// the failure, independent of its contents.
pub fn classify(pair: &TestPair, kind: FixtureKind, outcome: &EngineOutcome) -> CaseReport {
    let base = CaseReport {
        name: pair.name(),
        program: pair.program.clone(),
        queries: pair.queries.clone(),
        status: CaseStatus::Failed,
        total: 0,
        failing_ids: Vec::new(),
        diagnostic: None,
    };
    match (kind, outcome) {
        (FixtureKind::ExpectedFailure, EngineOutcome::NoDocument { .. }) => CaseReport {
            status: CaseStatus::PassedAsExpectedFailure,
            ..base
        },
        (FixtureKind::ExpectedFailure, EngineOutcome::Document(root)) => CaseReport {
            status: CaseStatus::FailedPragmaViolation,
            total: document::collect_verdicts(root)
                .map(|v| v.len())
                .unwrap_or(0),
            diagnostic: Some("engine accepted a program it was expected to reject".to_string()),
            ..base
        },
        (FixtureKind::Normal, EngineOutcome::NoDocument { diagnostic }) => CaseReport {
            status: CaseStatus::ParseErrorUnexpected,
            diagnostic: Some(diagnostic.clone()),
            ..base
        },
        (FixtureKind::Normal, EngineOutcome::Document(root)) => {
            match document::collect_verdicts(root) {
                Err(e) => CaseReport {
                    status: CaseStatus::Failed,
                    diagnostic: Some(e.to_string()),
                    ..base
                },
                Ok(verdicts) => {
                    let failing_ids: Vec<String> = verdicts
                        .iter()
                        .filter(|v| !v.passed)
                        .map(|v| v.id.clone())
                        .collect();
                    CaseReport {
                        status: if failing_ids.is_empty() {
                            CaseStatus::Passed
                        } else {
                            CaseStatus::FailedPragmaViolation
                        },
                        total: verdicts.len(),
                        failing_ids,
                        ..base
                    }
                }
            }
        }
    }
}
