// 🔬 Irregularity Classifiers
// Four read-only passes over the lexicon. Each pass annotates; none mutates.
// Output is sorted by lemma so re-runs are byte-identical.

pub mod adjectives;
pub mod gender;
pub mod professions;
pub mod review;
pub mod verbs;

pub use adjectives::{classify_adjectives, AdjectiveClass, AdjectiveFinding, IrregularFormRow};
pub use gender::{classify_genders, load_known_homographs, GenderFinding, GenderReading};
pub use professions::{classify_professions, FeminineChoice, PairStatus, ProfessionFinding};
pub use review::{ExceptionStatus, Review};
pub use verbs::{classify_verbs, verb_group, VerbFinding};

use crate::artifact::ArtifactWriter;
use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::frequency::{round2, FrequencyWeights};
use crate::lexicon::{Lexicon, LexiconEntry};
use crate::summary::{Issue, IssueKind};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::info;

// ============================================================================
// EXCEPTION MODEL
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExceptionKind {
    GenderHomograph,
    MissingFeminineForm,
    IrregularFemininePattern,
    ProfessionPair,
    IrregularVerb,
}

impl ExceptionKind {
    pub fn as_str(&self) -> &str {
        match self {
            ExceptionKind::GenderHomograph => "gender-homograph",
            ExceptionKind::MissingFeminineForm => "missing-feminine-form",
            ExceptionKind::IrregularFemininePattern => "irregular-feminine-pattern",
            ExceptionKind::ProfessionPair => "profession-pair",
            ExceptionKind::IrregularVerb => "irregular-verb",
        }
    }
}

/// A lexicon entry flagged for special handling
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedException {
    pub lemma: String,
    pub kind: ExceptionKind,
    pub companion: Option<String>,
    pub status: ExceptionStatus,
    pub frequency: f64,

    // Evidence
    pub form_m: String,
    pub form_f: String,
    pub pattern: String,
    pub reason: String,
    pub candidates: Vec<String>,
}

impl ClassifiedException {
    pub fn new(lemma: &str, kind: ExceptionKind, frequency: f64) -> Self {
        ClassifiedException {
            lemma: lemma.to_string(),
            kind,
            companion: None,
            status: ExceptionStatus::Resolved,
            frequency,
            form_m: String::new(),
            form_f: String::new(),
            pattern: String::new(),
            reason: String::new(),
            candidates: Vec::new(),
        }
    }

    /// Builder pattern: add the paired form
    pub fn with_companion(mut self, companion: &str) -> Self {
        self.companion = Some(companion.to_string());
        self
    }

    pub fn with_forms(mut self, form_m: &str, form_f: &str) -> Self {
        self.form_m = form_m.to_string();
        self.form_f = form_f.to_string();
        self
    }

    pub fn with_pattern(mut self, pattern: &str) -> Self {
        self.pattern = pattern.to_string();
        self
    }

    pub fn with_reason(mut self, reason: &str) -> Self {
        self.reason = reason.to_string();
        self
    }

    /// Copy status, reason and candidates from a review result
    pub fn with_review<T: std::fmt::Display>(mut self, review: &Review<T>) -> Self {
        self.status = review.status();
        if !review.is_resolved() {
            self.reason = review.reason().to_string();
            self.candidates = review.candidates().iter().map(|c| c.to_string()).collect();
        }
        self
    }

    pub fn is_open(&self) -> bool {
        self.status == ExceptionStatus::Open
    }

    fn sort_key(&self) -> (&str, ExceptionKind, &str, &str) {
        (
            self.lemma.as_str(),
            self.kind,
            self.form_m.as_str(),
            self.form_f.as_str(),
        )
    }

    pub fn to_row(&self) -> ExceptionRow {
        ExceptionRow {
            lemma: self.lemma.clone(),
            kind: self.kind.as_str().to_string(),
            status: self.status.as_str().to_string(),
            companion: self.companion.clone().unwrap_or_default(),
            form_m: self.form_m.clone(),
            form_f: self.form_f.clone(),
            pattern: self.pattern.clone(),
            frequency: round2(self.frequency),
            reason: self.reason.clone(),
            candidates: self.candidates.join(" | "),
        }
    }
}

pub const EXCEPTION_HEADERS: [&str; 10] = [
    "lemma",
    "kind",
    "status",
    "companion",
    "form_m",
    "form_f",
    "pattern",
    "frequency",
    "reason",
    "candidates",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExceptionRow {
    pub lemma: String,
    pub kind: String,
    pub status: String,
    pub companion: String,
    pub form_m: String,
    pub form_f: String,
    pub pattern: String,
    pub frequency: f64,
    pub reason: String,
    pub candidates: String,
}

// ============================================================================
// SHARED HELPERS
// ============================================================================

/// Lemma → highest combined frequency among the lemma rows accepted by
/// `filter`, dropping lemmas under the configured minimum. Sorted by lemma.
pub(crate) fn lemma_table<F>(
    lexicon: &Lexicon,
    weights: &FrequencyWeights,
    min_frequency: f64,
    filter: F,
) -> BTreeMap<String, f64>
where
    F: Fn(&LexiconEntry) -> bool,
{
    let mut table: BTreeMap<String, f64> = BTreeMap::new();
    for entry in lexicon.lemmas().filter(|e| filter(e)) {
        let freq = entry.combined_frequency(weights);
        let slot = table.entry(entry.lemma.clone()).or_insert(freq);
        if freq > *slot {
            *slot = freq;
        }
    }
    table.retain(|_, freq| *freq >= min_frequency);
    table
}

// ============================================================================
// CLASSIFICATION REPORT
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ClassificationReport {
    pub genders: Vec<GenderFinding>,
    pub professions: Vec<ProfessionFinding>,
    pub adjectives: Vec<AdjectiveFinding>,
    pub verbs: Vec<VerbFinding>,
}

impl ClassificationReport {
    /// Every exception from every pass, sorted by lemma then form
    pub fn exceptions(&self) -> Vec<ClassifiedException> {
        let mut all: Vec<ClassifiedException> = Vec::new();
        all.extend(self.genders.iter().map(|g| g.to_exception()));
        all.extend(self.professions.iter().filter_map(|p| p.to_exception()));
        all.extend(self.adjectives.iter().filter_map(|a| a.to_exception()));
        all.extend(self.verbs.iter().filter_map(|v| v.to_exception()));

        all.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        all
    }

    /// One row per form of every irregular adjective
    pub fn irregular_forms(&self) -> Vec<IrregularFormRow> {
        let mut rows: Vec<IrregularFormRow> = self
            .adjectives
            .iter()
            .flat_map(|a| a.form_rows())
            .collect();
        rows.sort_by(|a, b| (&a.lemma, &a.form).cmp(&(&b.lemma, &b.form)));
        rows
    }

    pub fn adjective(&self, lemma: &str) -> Option<&AdjectiveFinding> {
        self.adjectives.iter().find(|a| a.lemma == lemma)
    }

    pub fn verb(&self, lemma: &str) -> Option<&VerbFinding> {
        self.verbs.iter().find(|v| v.lemma == lemma)
    }

    /// Open exceptions, reported as ambiguities
    pub fn issues(&self) -> Vec<Issue> {
        self.exceptions()
            .iter()
            .filter(|e| e.is_open())
            .map(|e| {
                Issue::new(
                    IssueKind::ClassificationAmbiguity,
                    "classify",
                    &e.lemma,
                    &format!("{}: {}", e.kind.as_str(), e.reason),
                )
            })
            .collect()
    }

    pub fn summary(&self) -> String {
        let exceptions = self.exceptions();
        let open = exceptions.iter().filter(|e| e.is_open()).count();
        format!(
            "{} exceptions ({} open) | {} genderless nouns, {} professions, {} adjectives, {} verbs",
            exceptions.len(),
            open,
            self.genders.len(),
            self.professions.len(),
            self.adjectives.len(),
            self.verbs.len()
        )
    }
}

/// Run every pass.
pub fn classify_lexicon(
    lexicon: &Lexicon,
    config: &PipelineConfig,
    known_homographs: &HashSet<String>,
) -> ClassificationReport {
    let report = ClassificationReport {
        genders: classify_genders(lexicon, config, known_homographs),
        professions: classify_professions(lexicon, config),
        adjectives: classify_adjectives(lexicon, config),
        verbs: classify_verbs(lexicon, config),
    };

    info!("{}", report.summary());
    report
}

// ============================================================================
// ARTIFACTS
// ============================================================================

pub fn write_report(
    report: &ClassificationReport,
    dir: &Path,
    writer: &ArtifactWriter,
) -> PipelineResult<Vec<PathBuf>> {
    let mut written = Vec::new();

    let path = dir.join("exceptions.csv");
    let rows: Vec<ExceptionRow> = report.exceptions().iter().map(|e| e.to_row()).collect();
    writer.write_csv(&path, &EXCEPTION_HEADERS, &rows)?;
    written.push(path);

    let path = dir.join("adjectives.csv");
    let rows: Vec<adjectives::AdjectiveRow> = report.adjectives.iter().map(|a| a.to_row()).collect();
    writer.write_csv(&path, &adjectives::ADJECTIVE_HEADERS, &rows)?;
    written.push(path);

    let path = dir.join("irregular_adjective_forms.csv");
    writer.write_csv(&path, &adjectives::FORM_HEADERS, &report.irregular_forms())?;
    written.push(path);

    let path = dir.join("verb_groups.csv");
    let rows: Vec<verbs::VerbRow> = report.verbs.iter().map(|v| v.to_row()).collect();
    writer.write_csv(&path, &verbs::VERB_HEADERS, &rows)?;
    written.push(path);

    Ok(written)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::{Gender, Number};

    fn noun(form: &str, lemma: &str, gender: Option<Gender>, freq: f64) -> LexiconEntry {
        let mut entry = LexiconEntry::new(form, lemma, "NOM")
            .with_number(Number::Singular)
            .with_frequencies(freq, freq);
        entry.gender = gender;
        if form == lemma {
            entry.is_lemma = true;
        }
        entry
    }

    fn sample_lexicon() -> Lexicon {
        Lexicon::from_entries(vec![
            noun("acteur", "acteur", Some(Gender::Masculine), 20.0),
            noun("actrice", "acteur", Some(Gender::Feminine), 5.0),
            noun("pharmacien", "pharmacien", Some(Gender::Masculine), 8.0),
            noun("empereur", "empereur", Some(Gender::Masculine), 6.0),
            noun("impératrice", "empereur", Some(Gender::Feminine), 2.0),
            noun("enfant", "enfant", None, 90.0),
            noun("livre", "livre", None, 50.0),
            LexiconEntry::new("beau", "beau", "ADJ")
                .with_gender(Gender::Masculine)
                .with_number(Number::Singular)
                .with_frequencies(40.0, 40.0)
                .as_lemma(),
            LexiconEntry::new("belle", "beau", "ADJ")
                .with_gender(Gender::Feminine)
                .with_number(Number::Singular),
            LexiconEntry::new("faire", "faire", "VER").with_frequencies(100.0, 100.0).as_lemma(),
        ])
    }

    #[test]
    fn test_exceptions_sorted_and_complete() {
        let config = PipelineConfig::default();
        let known: HashSet<String> = ["livre".to_string()].into_iter().collect();
        let report = classify_lexicon(&sample_lexicon(), &config, &known);

        let exceptions = report.exceptions();
        let keys: Vec<(&str, &str)> = exceptions
            .iter()
            .map(|e| (e.lemma.as_str(), e.kind.as_str()))
            .collect();

        assert_eq!(
            keys,
            vec![
                ("beau", "irregular-feminine-pattern"),
                ("empereur", "profession-pair"),
                ("enfant", "gender-homograph"),
                ("faire", "irregular-verb"),
                ("livre", "gender-homograph"),
                ("pharmacien", "missing-feminine-form"),
            ]
        );

        // open: enfant (no gendered sibling) and pharmacien
        let issues = report.issues();
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.kind == IssueKind::ClassificationAmbiguity));
    }

    #[test]
    fn test_classification_is_idempotent() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();
        let config = PipelineConfig::default();
        let known = HashSet::new();

        let first = classify_lexicon(&sample_lexicon(), &config, &known);
        let second = classify_lexicon(&sample_lexicon(), &config, &known);
        write_report(&first, dir_a.path(), &ArtifactWriter::default()).unwrap();
        write_report(&second, dir_b.path(), &ArtifactWriter::default()).unwrap();

        for name in ["exceptions.csv", "adjectives.csv", "irregular_adjective_forms.csv", "verb_groups.csv"] {
            let a = std::fs::read(dir_a.path().join(name)).unwrap();
            let b = std::fs::read(dir_b.path().join(name)).unwrap();
            assert_eq!(a, b, "{} differs between runs", name);
        }
    }

    #[test]
    fn test_classification_does_not_touch_lexicon() {
        let lexicon = sample_lexicon();
        let before = lexicon.entries().to_vec();
        classify_lexicon(&lexicon, &PipelineConfig::default(), &HashSet::new());
        assert_eq!(lexicon.entries(), &before[..]);
    }

    #[test]
    fn test_min_frequency_filters_every_pass() {
        let mut config = PipelineConfig::default();
        config.classify.min_frequency = 1000.0;

        let report = classify_lexicon(&sample_lexicon(), &config, &HashSet::new());
        assert!(report.exceptions().is_empty());
    }

    #[test]
    fn test_exception_row_flattens_candidates() {
        let review: Review<&str> = Review::needs_review("why", vec!["a", "b"]);
        let row = ClassifiedException::new("x", ExceptionKind::GenderHomograph, 1.234)
            .with_review(&review)
            .to_row();

        assert_eq!(row.status, "open");
        assert_eq!(row.candidates, "a | b");
        assert_eq!(row.frequency, 1.23);
        assert_eq!(row.kind, "gender-homograph");
    }
}
