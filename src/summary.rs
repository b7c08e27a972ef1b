// 📋 Run Summary
// Non-fatal conditions are collected here and reported once at the end of a run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

// ============================================================================
// ISSUES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IssueKind {
    /// A classifier could not decide; the item is queued for human review
    ClassificationAmbiguity,
    /// An authored row matched no pipeline row
    MergeOrphan,
    /// An external source row could not be used
    SkippedRow,
    /// A card is missing authored content and stays out of the import file
    IncompleteCard,
    /// A card type was not emitted because of duplicate join keys
    JoinCollision,
    /// A pipeline row lost its card key to a higher-ranked row and was dropped
    DuplicateCardKey,
}

impl IssueKind {
    pub fn label(&self) -> &str {
        match self {
            IssueKind::ClassificationAmbiguity => "classification ambiguity",
            IssueKind::MergeOrphan => "merge orphan",
            IssueKind::SkippedRow => "skipped row",
            IssueKind::IncompleteCard => "incomplete card",
            IssueKind::JoinCollision => "join collision",
            IssueKind::DuplicateCardKey => "duplicate card key",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Critical, // A whole artifact was not produced
    Warning,  // Data was dropped or left unresolved
    Info,     // Expected gaps, e.g. content not yet authored
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub kind: IssueKind,
    pub severity: Severity,
    pub stage: String,
    pub subject: String,
    pub message: String,
}

impl Issue {
    pub fn new(kind: IssueKind, stage: &str, subject: &str, message: &str) -> Self {
        let severity = match kind {
            IssueKind::JoinCollision => Severity::Critical,
            IssueKind::MergeOrphan | IssueKind::SkippedRow | IssueKind::DuplicateCardKey => {
                Severity::Warning
            }
            IssueKind::ClassificationAmbiguity | IssueKind::IncompleteCard => Severity::Info,
        };
        Issue {
            kind,
            severity,
            stage: stage.to_string(),
            subject: subject.to_string(),
            message: message.to_string(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} '{}': {}",
            self.stage,
            self.kind.label(),
            self.subject,
            self.message
        )
    }
}

// ============================================================================
// RUN SUMMARY
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    issues: Vec<Issue>,
    counters: BTreeMap<String, usize>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, issue: Issue) {
        if issue.severity != Severity::Info {
            warn!(stage = %issue.stage, subject = %issue.subject, "{}", issue.message);
        }
        self.issues.push(issue);
    }

    /// Add to a named counter (rows written, items merged, ...)
    pub fn count(&mut self, name: &str, amount: usize) {
        *self.counters.entry(name.to_string()).or_insert(0) += amount;
    }

    pub fn counter(&self, name: &str) -> usize {
        self.counters.get(name).copied().unwrap_or(0)
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    pub fn issues_of(&self, kind: IssueKind) -> impl Iterator<Item = &Issue> {
        self.issues.iter().filter(move |i| i.kind == kind)
    }

    pub fn issue_count(&self, kind: IssueKind) -> usize {
        self.issues_of(kind).count()
    }

    pub fn has_critical_issues(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Critical)
    }

    pub fn merge(&mut self, other: RunSummary) {
        self.issues.extend(other.issues);
        for (name, amount) in other.counters {
            self.count(&name, amount);
        }
    }

    pub fn summary(&self) -> String {
        let by_kind: BTreeMap<IssueKind, usize> =
            self.issues.iter().fold(BTreeMap::new(), |mut acc, issue| {
                *acc.entry(issue.kind).or_insert(0) += 1;
                acc
            });

        if by_kind.is_empty() {
            return "no issues".to_string();
        }

        by_kind
            .iter()
            .map(|(kind, n)| format!("{} {}", n, kind.label()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn counters(&self) -> &BTreeMap<String, usize> {
        &self.counters
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_count() {
        let mut summary = RunSummary::new();
        summary.record(Issue::new(IssueKind::MergeOrphan, "assemble", "chat", "no pipeline row"));
        summary.record(Issue::new(IssueKind::IncompleteCard, "assemble", "chien", "no translation"));
        summary.record(Issue::new(IssueKind::IncompleteCard, "assemble", "loup", "no translation"));
        summary.count("vocabulary cards", 3);

        assert_eq!(summary.issue_count(IssueKind::IncompleteCard), 2);
        assert_eq!(summary.counter("vocabulary cards"), 3);
        assert!(!summary.has_critical_issues());
        assert_eq!(summary.summary(), "1 merge orphan, 2 incomplete card");
    }

    #[test]
    fn test_collision_is_critical() {
        let mut summary = RunSummary::new();
        summary.record(Issue::new(IssueKind::JoinCollision, "assemble", "chat", "appears twice"));
        assert!(summary.has_critical_issues());
    }

    #[test]
    fn test_merge_summaries() {
        let mut a = RunSummary::new();
        a.count("rows", 2);
        let mut b = RunSummary::new();
        b.count("rows", 3);
        b.record(Issue::new(IssueKind::SkippedRow, "merge-external", "row 4", "empty word"));

        a.merge(b);

        assert_eq!(a.counter("rows"), 5);
        assert_eq!(a.issues().len(), 1);
        assert_eq!(
            a.issues()[0].to_string(),
            "[merge-external] skipped row 'row 4': empty word"
        );
    }

    #[test]
    fn test_empty_summary() {
        assert_eq!(RunSummary::new().summary(), "no issues");
    }
}
