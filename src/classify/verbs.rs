// Verb pass: conjugation group from the infinitive ending.

use super::{lemma_table, ClassifiedException, ExceptionKind};
use crate::config::PipelineConfig;
use crate::frequency::round2;
use crate::lexicon::Lexicon;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// `-er` verbs that are nonetheless third group
const IRREGULAR_ER_VERBS: [&str; 1] = ["aller"];

/// Group (1, 2 or 3) and the ending that decided it.
pub fn verb_group(lemma: &str, present_participle: Option<&str>) -> (u8, &'static str) {
    if IRREGULAR_ER_VERBS.contains(&lemma) {
        return (3, "-er exception");
    }
    if lemma.ends_with("er") {
        return (1, "regular -er");
    }
    // before "-ir": voir, pouvoir, recevoir
    if lemma.ends_with("oir") {
        return (3, "-oir");
    }
    if lemma.ends_with("ir") {
        return match present_participle {
            Some(p) if p.ends_with("issant") => (2, "regular -ir (-issant)"),
            _ => (3, "-ir sans -issant"),
        };
    }
    if lemma.ends_with("re") {
        return (3, "-re");
    }
    (3, "unknown")
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerbFinding {
    pub lemma: String,
    pub frequency: f64,
    pub group: u8,
    pub ending: String,
    pub present_participle: Option<String>,
    pub note: String,
}

impl VerbFinding {
    pub fn is_irregular(&self) -> bool {
        self.group == 3
    }

    /// Label used on conjugation cards
    pub fn group_label(&self) -> String {
        match self.group {
            1 => "1er groupe".to_string(),
            n => format!("{}e groupe", n),
        }
    }

    pub fn to_exception(&self) -> Option<ClassifiedException> {
        if !self.is_irregular() {
            return None;
        }
        Some(
            ClassifiedException::new(&self.lemma, ExceptionKind::IrregularVerb, self.frequency)
                .with_pattern(&self.ending)
                .with_reason(&self.note),
        )
    }

    pub fn to_row(&self) -> VerbRow {
        VerbRow {
            lemma: self.lemma.clone(),
            group: self.group,
            ending: self.ending.clone(),
            present_participle: self.present_participle.clone().unwrap_or_default(),
            note: self.note.clone(),
            frequency: round2(self.frequency),
        }
    }
}

pub const VERB_HEADERS: [&str; 6] = ["lemma", "group", "ending", "present_participle", "note", "frequency"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerbRow {
    pub lemma: String,
    pub group: u8,
    pub ending: String,
    pub present_participle: String,
    pub note: String,
    pub frequency: f64,
}

pub fn classify_verbs(lexicon: &Lexicon, config: &PipelineConfig) -> Vec<VerbFinding> {
    let table = lemma_table(lexicon, &config.weights, config.classify.min_frequency, |e| {
        e.category == "VER"
    });

    let findings: Vec<VerbFinding> = table
        .into_iter()
        .map(|(lemma, frequency)| {
            let participle = lexicon.present_participle(&lemma);
            let (group, ending) = verb_group(&lemma, participle);
            let note = config
                .classify
                .verb_notes
                .get(&lemma)
                .cloned()
                .unwrap_or_default();
            VerbFinding {
                present_participle: participle.map(str::to_string),
                lemma,
                frequency,
                group,
                ending: ending.to_string(),
                note,
            }
        })
        .collect();

    debug!(
        count = findings.len(),
        irregular = findings.iter().filter(|v| v.is_irregular()).count(),
        "verb pass done"
    );
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexicon::LexiconEntry;

    #[test]
    fn test_verb_groups() {
        assert_eq!(verb_group("parler", None).0, 1);
        assert_eq!(verb_group("aller", None), (3, "-er exception"));
        assert_eq!(verb_group("finir", Some("finissant")).0, 2);
        assert_eq!(verb_group("partir", Some("partant")).0, 3);
        assert_eq!(verb_group("partir", None).0, 3);
        assert_eq!(verb_group("prendre", None), (3, "-re"));
        assert_eq!(verb_group("voir", None), (3, "-oir"));
        assert_eq!(verb_group("recevoir", Some("recevant")), (3, "-oir"));
        assert_eq!(verb_group("dormir", Some("dormant")), (3, "-ir sans -issant"));
        assert_eq!(verb_group("ok", None), (3, "unknown"));
    }

    #[test]
    fn test_pass_uses_participle_and_notes() {
        let lexicon = Lexicon::from_entries(vec![
            LexiconEntry::new("finir", "finir", "VER").as_lemma(),
            LexiconEntry::new("finissant", "finir", "VER").with_verb_info("par:pre;"),
            LexiconEntry::new("faire", "faire", "VER").as_lemma(),
            LexiconEntry::new("parler", "parler", "VER").as_lemma(),
        ]);

        let findings = classify_verbs(&lexicon, &PipelineConfig::default());
        assert_eq!(findings.len(), 3);

        let finir = findings.iter().find(|v| v.lemma == "finir").unwrap();
        assert_eq!(finir.group, 2);
        assert_eq!(finir.group_label(), "2e groupe");
        assert!(finir.to_exception().is_none());

        let faire = findings.iter().find(|v| v.lemma == "faire").unwrap();
        let exception = faire.to_exception().unwrap();
        assert_eq!(exception.kind, ExceptionKind::IrregularVerb);
        assert_eq!(exception.reason, "très irrégulier (je fais, je ferai)");
    }
}
