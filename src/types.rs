use serde::Serialize;
use std::path::PathBuf;

/// Naming policy for a fixture: a normal program is expected to be
/// accepted, an intentionally-invalid one is expected to be rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixtureKind {
    Normal,
    ExpectedFailure,
}

/// One discovered test case: a program file and its query file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestPair {
    pub program: PathBuf,
    pub queries: PathBuf,
}

impl TestPair {
    /// Case name shown in reports: the program file's stem.
    pub fn name(&self) -> String {
        self.program
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.to_string_lossy().into_owned())
    }
}

/// Pass/fail for one query, with the id taken verbatim from the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryVerdict {
    pub id: String,
    pub passed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CaseStatus {
    Passed,
    PassedAsExpectedFailure,
    Failed,
    FailedPragmaViolation,
    ParseErrorUnexpected,
}

impl CaseStatus {
    pub fn is_pass(self) -> bool {
        matches!(self, Self::Passed | Self::PassedAsExpectedFailure)
    }
}

/// Classified outcome of one test case.
#[derive(Debug, Clone, Serialize)]
pub struct CaseReport {
    pub name: String,
    pub program: PathBuf,
    pub queries: PathBuf,
    pub status: CaseStatus,
    /// Number of query nodes in the result document (0 without one).
    pub total: usize,
    pub failing_ids: Vec<String>,
    /// Engine or document diagnostics when no usable verdicts exist.
    pub diagnostic: Option<String>,
}

impl CaseReport {
    pub fn is_pass(&self) -> bool {
        self.status.is_pass()
    }

    pub fn passed_queries(&self) -> usize {
        self.total.saturating_sub(self.failing_ids.len())
    }
}

/// All case reports of one batch run, in discovery order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub cases: Vec<CaseReport>,
}

impl RunReport {
    pub fn all_passed(&self) -> bool {
        self.cases.iter().all(CaseReport::is_pass)
    }

    pub fn failed_cases(&self) -> usize {
        self.cases.iter().filter(|c| !c.is_pass()).count()
    }
}
