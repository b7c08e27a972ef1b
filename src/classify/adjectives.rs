// Adjective pass: how the feminine singular is formed.

use super::{lemma_table, ClassifiedException, ExceptionKind, Review};
use crate::config::PipelineConfig;
use crate::frequency::round2;
use crate::lexicon::{Gender, Lexicon, LexiconEntry, Number};
use crate::rules::SuffixRuleTable;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

const TRAILING_VOWELS: &str = "aeiouy";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdjectiveClass {
    /// Same form for both genders (rouge, facile)
    Invariable,
    /// Feminine adds one trailing vowel (petit → petite)
    Regular,
    /// Anything else; carries the pattern name
    Irregular(String),
}

impl fmt::Display for AdjectiveClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AdjectiveClass::Invariable => write!(f, "invariable"),
            AdjectiveClass::Regular => write!(f, "regular m+e"),
            AdjectiveClass::Irregular(pattern) => write!(f, "irregular ({})", pattern),
        }
    }
}

/// Classify a masculine/feminine pair.
pub fn classify_pair(form_m: &str, form_f: &str, rules: &SuffixRuleTable) -> AdjectiveClass {
    if form_m == form_f {
        return AdjectiveClass::Invariable;
    }

    if let Some(rest) = form_f.strip_prefix(form_m) {
        let mut chars = rest.chars();
        if let (Some(c), None) = (chars.next(), chars.next()) {
            if TRAILING_VOWELS.contains(c) {
                return AdjectiveClass::Regular;
            }
        }
    }

    if let Some(last) = form_m.chars().last() {
        if form_f == format!("{}{}e", form_m, last) {
            return AdjectiveClass::Irregular("doubled consonant".to_string());
        }
    }

    match rules.explain(form_m, form_f) {
        Some(rule) => AdjectiveClass::Irregular(rule.display_name()),
        None => AdjectiveClass::Irregular("unique".to_string()),
    }
}

// ============================================================================
// FINDINGS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct AdjectiveFinding {
    pub lemma: String,
    pub frequency: f64,
    pub form_m: String,
    pub form_f: Option<String>,
    pub class: Review<AdjectiveClass>,
}

impl AdjectiveFinding {
    pub fn is_irregular(&self) -> bool {
        matches!(self.class, Review::Resolved(AdjectiveClass::Irregular(_)))
    }

    pub fn pattern(&self) -> Option<&str> {
        match &self.class {
            Review::Resolved(AdjectiveClass::Irregular(pattern)) => Some(pattern),
            _ => None,
        }
    }

    /// Regular and invariable adjectives are annotated only
    pub fn to_exception(&self) -> Option<ClassifiedException> {
        let form_f = self.form_f.as_deref().unwrap_or("");
        match &self.class {
            Review::Resolved(AdjectiveClass::Irregular(pattern)) => Some(
                ClassifiedException::new(
                    &self.lemma,
                    ExceptionKind::IrregularFemininePattern,
                    self.frequency,
                )
                .with_forms(&self.form_m, form_f)
                .with_companion(form_f)
                .with_pattern(pattern),
            ),
            Review::Resolved(_) => None,
            Review::NeedsReview { .. } => Some(
                ClassifiedException::new(&self.lemma, ExceptionKind::MissingFeminineForm, self.frequency)
                    .with_forms(&self.form_m, "")
                    .with_review(&self.class),
            ),
        }
    }

    /// One row per form for irregular adjectives, none otherwise
    pub fn form_rows(&self) -> Vec<IrregularFormRow> {
        let (pattern, form_f) = match (self.pattern(), &self.form_f) {
            (Some(p), Some(f)) => (p, f),
            _ => return Vec::new(),
        };

        vec![
            IrregularFormRow {
                lemma: self.lemma.clone(),
                form: self.form_m.clone(),
                gender: Gender::Masculine.code().to_string(),
                pattern: pattern.to_string(),
                frequency: round2(self.frequency),
            },
            IrregularFormRow {
                lemma: self.lemma.clone(),
                form: form_f.clone(),
                gender: Gender::Feminine.code().to_string(),
                pattern: pattern.to_string(),
                frequency: round2(self.frequency),
            },
        ]
    }

    pub fn to_row(&self) -> AdjectiveRow {
        AdjectiveRow {
            lemma: self.lemma.clone(),
            form_m: self.form_m.clone(),
            form_f: self.form_f.clone().unwrap_or_default(),
            class: self.class.describe(),
            status: self.class.status().as_str().to_string(),
            frequency: round2(self.frequency),
        }
    }
}

pub const ADJECTIVE_HEADERS: [&str; 6] = ["lemma", "form_m", "form_f", "class", "status", "frequency"];
pub const FORM_HEADERS: [&str; 5] = ["lemma", "form", "gender", "pattern", "frequency"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjectiveRow {
    pub lemma: String,
    pub form_m: String,
    pub form_f: String,
    pub class: String,
    pub status: String,
    pub frequency: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IrregularFormRow {
    pub lemma: String,
    pub form: String,
    pub gender: String,
    pub pattern: String,
    pub frequency: f64,
}

// ============================================================================
// PASS
// ============================================================================

fn pick<'a>(
    rows: &[&'a LexiconEntry],
    gender: Option<Gender>,
    numbers: &[Option<Number>],
) -> Option<&'a str> {
    numbers.iter().find_map(|number| {
        rows.iter()
            .find(|e| e.gender == gender && e.number == *number)
            .map(|e| e.surface_form.as_str())
    })
}

pub fn classify_adjectives(lexicon: &Lexicon, config: &PipelineConfig) -> Vec<AdjectiveFinding> {
    let classify = &config.classify;
    let normalize = |lemma: &str| -> String {
        classify
            .compound_lemmas
            .get(lemma)
            .cloned()
            .unwrap_or_else(|| lemma.to_string())
    };
    let is_liaison = |lemma: &str| classify.liaison_forms.iter().any(|l| l == lemma);

    // Raw lemma spellings that normalise onto each base lemma
    let mut spellings: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for entry in lexicon.entries().iter().filter(|e| e.category == "ADJ") {
        if is_liaison(&entry.lemma) {
            continue;
        }
        let spelled = spellings.entry(normalize(&entry.lemma)).or_default();
        if !spelled.contains(&entry.lemma) {
            spelled.push(entry.lemma.clone());
        }
    }

    let raw_table = lemma_table(lexicon, &config.weights, classify.min_frequency, |e| {
        e.category == "ADJ" && !is_liaison(&e.lemma)
    });
    let mut table: BTreeMap<String, f64> = BTreeMap::new();
    for (lemma, freq) in raw_table {
        let slot = table.entry(normalize(&lemma)).or_insert(freq);
        if freq > *slot {
            *slot = freq;
        }
    }

    let singular = [Some(Number::Singular), None];
    let mut findings = Vec::new();
    for (lemma, frequency) in table {
        let family: Vec<&LexiconEntry> = spellings
            .get(&lemma)
            .map(|raw| raw.iter().flat_map(|r| lexicon.siblings(r, "ADJ")).collect())
            .unwrap_or_default();
        let nouns = lexicon.siblings(&lemma, "NOM");

        let genderless = pick(&family, None, &singular);
        let form_m = match pick(&family, Some(Gender::Masculine), &singular).or(genderless) {
            Some(form) => form.to_string(),
            None => continue,
        };
        let form_f = pick(&family, Some(Gender::Feminine), &[Some(Number::Singular)])
            .or_else(|| pick(&nouns, Some(Gender::Feminine), &[Some(Number::Singular)]))
            .or(genderless)
            .map(str::to_string);

        let class = match &form_f {
            Some(f) => Review::Resolved(classify_pair(&form_m, f, &classify.adjective_rules)),
            None => Review::needs_review(
                "no feminine form attested",
                vec![AdjectiveClass::Invariable, AdjectiveClass::Regular],
            ),
        };

        findings.push(AdjectiveFinding {
            lemma,
            frequency,
            form_m,
            form_f,
            class,
        });
    }

    debug!(count = findings.len(), "adjective pass done");
    findings
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adj(form: &str, lemma: &str, gender: Option<Gender>, number: Option<Number>) -> LexiconEntry {
        let mut entry = LexiconEntry::new(form, lemma, "ADJ").with_frequencies(10.0, 10.0);
        entry.gender = gender;
        entry.number = number;
        entry.is_lemma = form == lemma;
        entry
    }

    const M: Option<Gender> = Some(Gender::Masculine);
    const F: Option<Gender> = Some(Gender::Feminine);
    const S: Option<Number> = Some(Number::Singular);

    fn run(entries: Vec<LexiconEntry>) -> Vec<AdjectiveFinding> {
        classify_adjectives(&Lexicon::from_entries(entries), &PipelineConfig::default())
    }

    #[test]
    fn test_classify_pair() {
        let rules = SuffixRuleTable::adjectives();
        assert_eq!(classify_pair("rouge", "rouge", &rules), AdjectiveClass::Invariable);
        assert_eq!(classify_pair("petit", "petite", &rules), AdjectiveClass::Regular);
        assert_eq!(
            classify_pair("bon", "bonne", &rules),
            AdjectiveClass::Irregular("doubled consonant".to_string())
        );
        assert_eq!(
            classify_pair("heureux", "heureuse", &rules),
            AdjectiveClass::Irregular("-eux → -euse".to_string())
        );
        assert_eq!(
            classify_pair("frais", "fraîche", &rules),
            AdjectiveClass::Irregular("unique".to_string())
        );
    }

    #[test]
    fn test_beau_yields_two_rows() {
        let findings = run(vec![
            adj("beau", "beau", M, S),
            adj("belle", "beau", F, S),
            adj("beaux", "beau", M, Some(Number::Plural)),
        ]);

        assert_eq!(findings.len(), 1);
        let beau = &findings[0];
        assert!(beau.is_irregular());
        assert_eq!(beau.pattern(), Some("-eau → -elle"));

        let rows = beau.form_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].form, "beau");
        assert_eq!(rows[0].gender, "m");
        assert_eq!(rows[1].form, "belle");
        assert_eq!(rows[1].gender, "f");

        let exception = beau.to_exception().unwrap();
        assert_eq!(exception.kind, ExceptionKind::IrregularFemininePattern);
        assert_eq!(exception.companion.as_deref(), Some("belle"));
    }

    #[test]
    fn test_regular_and_invariable_not_exceptions() {
        let findings = run(vec![
            adj("petit", "petit", M, S),
            adj("petite", "petit", F, S),
            adj("rouge", "rouge", None, S),
        ]);

        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.to_exception().is_none()));
        assert!(findings.iter().all(|f| f.form_rows().is_empty()));
    }

    #[test]
    fn test_missing_feminine_needs_review() {
        let findings = run(vec![adj("grognon", "grognon", M, S)]);

        let exception = findings[0].to_exception().unwrap();
        assert_eq!(exception.kind, ExceptionKind::MissingFeminineForm);
        assert!(exception.is_open());
        assert_eq!(exception.candidates, vec!["invariable", "regular m+e"]);
    }

    #[test]
    fn test_feminine_from_noun_sibling() {
        let findings = run(vec![
            adj("nouveau", "nouveau", M, S),
            LexiconEntry::new("nouvelle", "nouveau", "NOM")
                .with_gender(Gender::Feminine)
                .with_number(Number::Singular),
        ]);

        assert_eq!(findings[0].form_f.as_deref(), Some("nouvelle"));
        assert!(findings[0].is_irregular());
    }

    #[test]
    fn test_liaison_skipped_and_compound_normalised() {
        let findings = run(vec![
            adj("bel", "bel", M, S),
            adj("mou", "mou", M, S),
            adj("molle", "mou,mol", F, S),
        ]);

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].lemma, "mou");
        assert_eq!(findings[0].form_f.as_deref(), Some("molle"));
        assert_eq!(findings[0].pattern(), Some("-ou → -olle"));
    }
}
