// 🏷️ Suffix Rules - Rules as Data
// Ordered (masculine suffix → feminine suffix) tables, first match wins.

use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

// ============================================================================
// RULE DEFINITION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuffixRule {
    /// Masculine ending, e.g. "ien"
    pub from: String,

    /// Feminine ending replacing `from`, e.g. "ienne"
    pub to: String,

    /// Display name written to artifacts ("-ien → -ienne")
    #[serde(default)]
    pub name: String,

    /// Priority (higher = tried first). Equal priorities keep table order.
    #[serde(default)]
    pub priority: i32,
}

impl SuffixRule {
    pub fn new(from: &str, to: &str) -> Self {
        SuffixRule {
            from: from.to_string(),
            to: to.to_string(),
            name: format!("-{} → -{}", from, to),
            priority: 0,
        }
    }

    /// Check if the masculine form ends with this rule's suffix
    pub fn matches(&self, word: &str) -> bool {
        !self.from.is_empty() && word.len() > self.from.len() && word.ends_with(&self.from)
    }

    /// Derive the feminine companion: stem + `to`
    pub fn apply(&self, word: &str) -> Option<String> {
        if !self.matches(word) {
            return None;
        }
        let stem = &word[..word.len() - self.from.len()];
        Some(format!("{}{}", stem, self.to))
    }

    /// True if `feminine` is exactly what this rule derives from `masculine`
    pub fn explains(&self, masculine: &str, feminine: &str) -> bool {
        self.apply(masculine).as_deref() == Some(feminine)
    }

    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            format!("-{} → -{}", self.from, self.to)
        } else {
            self.name.clone()
        }
    }
}

// ============================================================================
// RULE TABLE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<SuffixRule>", into = "Vec<SuffixRule>")]
pub struct SuffixRuleTable {
    rules: Vec<SuffixRule>,
}

impl From<Vec<SuffixRule>> for SuffixRuleTable {
    fn from(rules: Vec<SuffixRule>) -> Self {
        SuffixRuleTable::from_rules(rules)
    }
}

impl From<SuffixRuleTable> for Vec<SuffixRule> {
    fn from(table: SuffixRuleTable) -> Self {
        table.rules
    }
}

impl SuffixRuleTable {
    pub fn new() -> Self {
        SuffixRuleTable { rules: Vec::new() }
    }

    /// Load rules from JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read rules file: {:?}", path.as_ref()))?;

        let rules: Vec<SuffixRule> =
            serde_json::from_str(&content).context("Failed to parse rules JSON")?;

        Ok(SuffixRuleTable::from_rules(rules))
    }

    /// Create table from a list of rules
    pub fn from_rules(mut rules: Vec<SuffixRule>) -> Self {
        // sort_by is stable: equal priorities keep their table order
        rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        SuffixRuleTable { rules }
    }

    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        SuffixRuleTable::from_rules(
            pairs
                .iter()
                .map(|(from, to)| SuffixRule::new(from, to))
                .collect(),
        )
    }

    /// Agentive noun endings, most specific first
    pub fn professions() -> Self {
        SuffixRuleTable::from_pairs(&[
            ("teur", "trice"),
            ("eur", "euse"),
            ("ier", "ière"),
            ("ien", "ienne"),
            ("er", "ère"),
            ("ant", "ante"),
            ("iste", "iste"),
        ])
    }

    /// Adjective feminine patterns, most specific first
    pub fn adjectives() -> Self {
        SuffixRuleTable::from_pairs(&[
            ("eux", "euse"),
            ("if", "ive"),
            ("er", "ère"),
            ("eur", "euse"),
            ("teur", "trice"),
            ("et", "ète"),
            ("f", "ve"),
            ("eau", "elle"),
            ("c", "che"),
            ("c", "que"),
            ("gu", "guë"),
            ("gu", "gue"),
            ("ou", "olle"),
            ("in", "igne"),
            ("x", "se"),
            ("ong", "ongue"),
        ])
    }

    /// First rule whose suffix matches the word
    pub fn first_match(&self, word: &str) -> Option<&SuffixRule> {
        self.rules.iter().find(|rule| rule.matches(word))
    }

    /// First rule that turns `masculine` into `feminine`
    pub fn explain(&self, masculine: &str, feminine: &str) -> Option<&SuffixRule> {
        self.rules
            .iter()
            .find(|rule| rule.explains(masculine, feminine))
    }

    pub fn rules(&self) -> &[SuffixRule] {
        &self.rules
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl Default for SuffixRuleTable {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// TESTS
// ============================================================================
