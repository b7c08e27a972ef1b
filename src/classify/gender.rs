// Gender pass: nouns whose lemma row carries no gender.

use super::{lemma_table, ClassifiedException, ExceptionKind, Review};
use crate::artifact::read_word_list;
use crate::config::PipelineConfig;
use crate::error::PipelineResult;
use crate::lexicon::{Gender, Lexicon, LexiconEntry};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GenderReading {
    /// Both genders exist with different meanings (le livre / la livre)
    Homograph,
    /// One meaning, either article (un enfant / une enfant)
    CommonGender,
    FeminineOnly,
    MasculineOnly,
}

impl fmt::Display for GenderReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            GenderReading::Homograph => "homograph",
            GenderReading::CommonGender => "common gender",
            GenderReading::FeminineOnly => "feminine only",
            GenderReading::MasculineOnly => "masculine only",
        };
        write!(f, "{}", label)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenderFinding {
    pub lemma: String,
    pub frequency: f64,
    pub review: Review<GenderReading>,
}

impl GenderFinding {
    pub fn to_exception(&self) -> ClassifiedException {
        ClassifiedException::new(&self.lemma, ExceptionKind::GenderHomograph, self.frequency)
            .with_pattern(&self.review.describe())
            .with_review(&self.review)
    }
}

/// Decide what a gender-less noun is from its gendered siblings.
pub fn read_gender(
    lemma: &str,
    siblings: &[&LexiconEntry],
    known_homographs: &HashSet<String>,
) -> Review<GenderReading> {
    if known_homographs.contains(lemma) {
        return Review::Resolved(GenderReading::Homograph);
    }

    let has = |gender: Gender| siblings.iter().any(|e| e.gender == Some(gender));

    match (has(Gender::Masculine), has(Gender::Feminine)) {
        (true, true) => Review::needs_review(
            "both genders attested",
            vec![GenderReading::Homograph, GenderReading::CommonGender],
        ),
        (false, true) => Review::Resolved(GenderReading::FeminineOnly),
        (true, false) => Review::Resolved(GenderReading::MasculineOnly),
        (false, false) => Review::needs_review(
            "no gendered sibling",
            vec![GenderReading::CommonGender, GenderReading::Homograph],
        ),
    }
}

pub fn classify_genders(
    lexicon: &Lexicon,
    config: &PipelineConfig,
    known_homographs: &HashSet<String>,
) -> Vec<GenderFinding> {
    let table = lemma_table(lexicon, &config.weights, config.classify.min_frequency, |e| {
        e.category == "NOM" && e.gender.is_none()
    });

    let findings: Vec<GenderFinding> = table
        .into_iter()
        .map(|(lemma, frequency)| {
            let siblings = lexicon.siblings(&lemma, "NOM");
            let review = read_gender(&lemma, &siblings, known_homographs);
            GenderFinding {
                lemma,
                frequency,
                review,
            }
        })
        .collect();

    debug!(count = findings.len(), "gender pass done");
    findings
}

/// Known homographs: one lemma per line; a `lemme`/`lemma` header line and
/// `#` comments are ignored. A configured but missing file is reported and
/// treated as empty.
pub fn load_known_homographs(path: Option<&Path>) -> PipelineResult<HashSet<String>> {
    read_word_list(path, "known homographs")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::Number;
    use std::io::Write;

    fn noun(form: &str, lemma: &str, gender: Option<Gender>) -> LexiconEntry {
        let mut entry = LexiconEntry::new(form, lemma, "NOM").with_number(Number::Singular);
        entry.gender = gender;
        entry.is_lemma = form == lemma && gender.is_none();
        entry
    }

    #[test]
    fn test_read_gender_cases() {
        let known: HashSet<String> = HashSet::new();
        let m = noun("x", "x", Some(Gender::Masculine));
        let f = noun("x", "x", Some(Gender::Feminine));
        let bare = noun("x", "x", None);

        assert_eq!(
            read_gender("x", &[&bare, &m], &known),
            Review::Resolved(GenderReading::MasculineOnly)
        );
        assert_eq!(
            read_gender("x", &[&bare, &f], &known),
            Review::Resolved(GenderReading::FeminineOnly)
        );

        let both = read_gender("x", &[&bare, &m, &f], &known);
        assert_eq!(both.candidates(), &[GenderReading::Homograph, GenderReading::CommonGender]);

        let none = read_gender("x", &[&bare], &known);
        assert_eq!(none.reason(), "no gendered sibling");
        assert_eq!(none.candidates()[0], GenderReading::CommonGender);
    }

    #[test]
    fn test_known_homograph_wins() {
        let known: HashSet<String> = ["livre".to_string()].into_iter().collect();
        let m = noun("livre", "livre", Some(Gender::Masculine));
        let f = noun("livre", "livre", Some(Gender::Feminine));

        assert_eq!(
            read_gender("livre", &[&m, &f], &known),
            Review::Resolved(GenderReading::Homograph)
        );
    }

    #[test]
    fn test_pass_only_sees_genderless_lemmas() {
        let lexicon = Lexicon::from_entries(vec![
            noun("chat", "chat", Some(Gender::Masculine)),
            noun("enfant", "enfant", None),
        ]);
        let findings = classify_genders(&lexicon, &PipelineConfig::default(), &HashSet::new());

        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].lemma, "enfant");
        assert!(findings[0].to_exception().is_open());
    }

    #[test]
    fn test_load_known_homographs() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "lemme\n# pairs\nlivre\nmode,extra\n\npoêle").unwrap();

        let known = load_known_homographs(Some(file.path())).unwrap();
        assert_eq!(known.len(), 3);
        assert!(known.contains("mode"));

        assert!(load_known_homographs(None).unwrap().is_empty());
        assert!(load_known_homographs(Some(Path::new("/nonexistent.csv"))).unwrap().is_empty());
    }
}
