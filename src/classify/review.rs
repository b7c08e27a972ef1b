// Classify, don't decide: a classifier either resolves an item or hands the
// candidates to a human.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExceptionStatus {
    Open,
    Resolved,
}

impl ExceptionStatus {
    pub fn as_str(&self) -> &str {
        match self {
            ExceptionStatus::Open => "open",
            ExceptionStatus::Resolved => "resolved",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Review<T> {
    Resolved(T),
    NeedsReview { reason: String, candidates: Vec<T> },
}

impl<T> Review<T> {
    pub fn needs_review(reason: impl Into<String>, candidates: Vec<T>) -> Self {
        Review::NeedsReview {
            reason: reason.into(),
            candidates,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Review::Resolved(_))
    }

    pub fn resolved(&self) -> Option<&T> {
        match self {
            Review::Resolved(value) => Some(value),
            Review::NeedsReview { .. } => None,
        }
    }

    pub fn candidates(&self) -> &[T] {
        match self {
            Review::Resolved(_) => &[],
            Review::NeedsReview { candidates, .. } => candidates,
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            Review::Resolved(_) => "",
            Review::NeedsReview { reason, .. } => reason,
        }
    }

    pub fn status(&self) -> ExceptionStatus {
        if self.is_resolved() {
            ExceptionStatus::Resolved
        } else {
            ExceptionStatus::Open
        }
    }
}

impl<T: fmt::Display> Review<T> {
    /// Resolved value, or the candidate list joined with " | "
    pub fn describe(&self) -> String {
        match self {
            Review::Resolved(value) => value.to_string(),
            Review::NeedsReview { candidates, .. } => candidates
                .iter()
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(" | "),
        }
    }
}
