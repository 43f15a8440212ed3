//! Accumulating check reports
//!
//! Every check keeps going after the first problem and records each distinct
//! finding. A report passes when it only holds [`FindingKind::NotApplicable`]
//! notes, and its message is the concatenation of every failing finding, one
//! per line.

use serde_json::{json, Value as JsonValue};
use std::fmt;

/// Classification of a single finding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FindingKind {
    /// The data failed a quality check
    Problem,
    /// Unsupported or missing configuration (unknown frequency tag, missing
    /// fill value, missing axis, zero weights)
    Configuration,
    /// The output collaborator could not persist a summary or chart
    Output,
    /// Part of the check could not run on this input; not a failure
    NotApplicable,
}

impl FindingKind {
    /// Prefix used when rendering the finding
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Problem => "PROBLEM",
            Self::Configuration => "CONFIGURATION",
            Self::Output => "OUTPUT",
            Self::NotApplicable => "NOT APPLICABLE",
        }
    }

    /// Whether findings of this kind fail the check
    #[must_use]
    pub const fn is_failure(self) -> bool {
        !matches!(self, Self::NotApplicable)
    }
}

/// One line of a report
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub kind: FindingKind,
    pub text: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.prefix(), self.text)
    }
}

/// Outcome of a check: pass/fail plus every finding recorded on the way
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckResult {
    name: String,
    findings: Vec<Finding>,
}

impl CheckResult {
    /// Create an empty (passing) report for the named check
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            findings: Vec::new(),
        }
    }

    /// Name of the check that produced this report
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record a finding, ignoring exact duplicates
    pub fn record(&mut self, kind: FindingKind, text: impl Into<String>) {
        let finding = Finding {
            kind,
            text: text.into(),
        };
        if !self.findings.contains(&finding) {
            self.findings.push(finding);
        }
    }

    pub fn problem(&mut self, text: impl Into<String>) {
        self.record(FindingKind::Problem, text);
    }

    pub fn configuration(&mut self, text: impl Into<String>) {
        self.record(FindingKind::Configuration, text);
    }

    pub fn output(&mut self, text: impl Into<String>) {
        self.record(FindingKind::Output, text);
    }

    pub fn not_applicable(&mut self, text: impl Into<String>) {
        self.record(FindingKind::NotApplicable, text);
    }

    /// Append every finding of `other` to this report
    pub fn merge(&mut self, other: CheckResult) {
        for finding in other.findings {
            self.record(finding.kind, finding.text);
        }
    }

    /// True when no failing finding was recorded
    #[must_use]
    pub fn passed(&self) -> bool {
        !self.findings.iter().any(|f| f.kind.is_failure())
    }

    /// Failing findings, one per line, each terminated by `\n`
    #[must_use]
    pub fn message(&self) -> String {
        self.findings
            .iter()
            .filter(|f| f.kind.is_failure())
            .map(|f| format!("{f}\n"))
            .collect()
    }

    #[must_use]
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Findings of the given kind
    pub fn of_kind(&self, kind: FindingKind) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(move |f| f.kind == kind)
    }

    /// Whether any finding of the given kind was recorded
    #[must_use]
    pub fn has(&self, kind: FindingKind) -> bool {
        self.of_kind(kind).next().is_some()
    }

    /// The `(passed, message)` pair
    #[must_use]
    pub fn into_parts(self) -> (bool, String) {
        (self.passed(), self.message())
    }

    /// JSON representation used by the command-line report
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        let findings: Vec<JsonValue> = self
            .findings
            .iter()
            .map(|f| json!({ "kind": f.kind.prefix(), "text": f.text }))
            .collect();
        json!({
            "check": self.name,
            "passed": self.passed(),
            "message": self.message(),
            "findings": findings,
        })
    }
}
