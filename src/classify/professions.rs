// Profession pass: agentive nouns and their feminine counterparts.

use super::{lemma_table, ClassifiedException, ExceptionKind, Review};
use crate::config::PipelineConfig;
use crate::lexicon::{Gender, Lexicon, LexiconEntry, Number};
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairStatus {
    /// Feminine follows a suffix rule
    Regular(String),
    /// Same form for both genders
    Invariable,
    /// Feminine attested but not derivable (empereur / impératrice)
    Irregular,
    /// No feminine form in the lexicon
    MasculineOnly,
}

/// What a human can decide for a masculine-only profession noun
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeminineChoice {
    AddFeminine(String),
    MasculineByConvention,
    NotAPerson,
}

impl fmt::Display for FeminineChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeminineChoice::AddFeminine(form) => write!(f, "add feminine {}", form),
            FeminineChoice::MasculineByConvention => write!(f, "masculine-only by convention"),
            FeminineChoice::NotAPerson => write!(f, "not a person-denoting noun"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProfessionFinding {
    pub lemma: String,
    pub frequency: f64,
    pub form_m: String,
    pub form_f: Option<String>,
    pub status: PairStatus,
    /// Feminine to propose: the attested one, or stem + rule suffix
    pub companion: Option<String>,
}

impl ProfessionFinding {
    pub fn review(&self) -> Option<Review<FeminineChoice>> {
        match self.status {
            PairStatus::MasculineOnly => {
                let mut candidates = Vec::new();
                if let Some(companion) = &self.companion {
                    candidates.push(FeminineChoice::AddFeminine(companion.clone()));
                }
                candidates.push(FeminineChoice::MasculineByConvention);
                candidates.push(FeminineChoice::NotAPerson);
                Some(Review::needs_review("no feminine form attested", candidates))
            }
            _ => None,
        }
    }

    /// Regular and invariable pairs need nothing
    pub fn to_exception(&self) -> Option<ClassifiedException> {
        let form_f = self.form_f.as_deref().unwrap_or("");
        match &self.status {
            PairStatus::Regular(_) | PairStatus::Invariable => None,
            PairStatus::Irregular => Some(
                ClassifiedException::new(&self.lemma, ExceptionKind::ProfessionPair, self.frequency)
                    .with_forms(&self.form_m, form_f)
                    .with_companion(form_f)
                    .with_pattern("irregular"),
            ),
            PairStatus::MasculineOnly => {
                let mut exception = ClassifiedException::new(
                    &self.lemma,
                    ExceptionKind::MissingFeminineForm,
                    self.frequency,
                )
                .with_forms(&self.form_m, "");
                if let Some(companion) = &self.companion {
                    exception = exception.with_companion(companion);
                }
                if let Some(review) = self.review() {
                    exception = exception.with_review(&review);
                }
                Some(exception)
            }
        }
    }
}

fn singular_form(siblings: &[&LexiconEntry], gender: Gender) -> Option<String> {
    siblings
        .iter()
        .find(|e| e.gender == Some(gender) && e.number == Some(Number::Singular))
        .or_else(|| {
            siblings
                .iter()
                .find(|e| e.gender == Some(gender) && e.number.is_none())
        })
        .map(|e| e.surface_form.clone())
}

pub fn classify_professions(lexicon: &Lexicon, config: &PipelineConfig) -> Vec<ProfessionFinding> {
    let rules = &config.classify.profession_rules;
    let table = lemma_table(lexicon, &config.weights, config.classify.min_frequency, |e| {
        e.category == "NOM" && rules.first_match(&e.lemma).is_some()
    });

    let mut findings = Vec::new();
    for (lemma, frequency) in table {
        let siblings = lexicon.siblings(&lemma, "NOM");

        // Feminine-only and gender-less families are not profession pairs
        let form_m = match singular_form(&siblings, Gender::Masculine) {
            Some(form) => form,
            None => continue,
        };
        let form_f = singular_form(&siblings, Gender::Feminine);

        let (status, companion) = match &form_f {
            Some(f) if *f == form_m => (PairStatus::Invariable, None),
            Some(f) => match rules.explain(&form_m, f) {
                Some(rule) => (PairStatus::Regular(rule.display_name()), Some(f.clone())),
                None => (PairStatus::Irregular, Some(f.clone())),
            },
            None => {
                let derived = rules.first_match(&form_m).and_then(|r| r.apply(&form_m));
                (PairStatus::MasculineOnly, derived)
            }
        };

        findings.push(ProfessionFinding {
            lemma,
            frequency,
            form_m,
            form_f,
            status,
            companion,
        });
    }

    debug!(count = findings.len(), "profession pass done");
    findings
}
