// 🦴 Card skeletons
// Pipeline-side rows for every card type, before authored content is joined in.

use crate::artifact::ArtifactWriter;
use crate::assemble::{vocabulary_key, CardType};
use crate::classify::verbs::verb_group;
use crate::classify::{AdjectiveClass, ClassificationReport, Review};
use crate::deduplication::ExternalVocabularyItem;
use crate::error::PipelineResult;
use crate::extract::{selection, CategorySelection, SelectionRow};
use crate::frequency::round2;
use crate::summary::{Issue, IssueKind};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Words taking `l'` (h included: aspirated h is not in the lexicon)
const FRENCH_VOWELS: &str = "aeiouhéèêëàâäùûüîïôœæ";

const NOTE_PREVIEW_CHARS: usize = 80;

lazy_static! {
    static ref POS_COMMON_GENDER: Regex = Regex::new(r"\bn\.?\s*m\.?\s*(/|ou)\s*f\.?").unwrap();
    static ref POS_MASCULINE: Regex = Regex::new(r"\bn\.?\s*m\b").unwrap();
    static ref POS_FEMININE: Regex = Regex::new(r"\bn\.?\s*f\b").unwrap();
    static ref POS_NOUN: Regex = Regex::new(r"\bnom\b").unwrap();
    static ref POS_VERB: Regex = Regex::new(r"\bv[ti]?\.?(\s|$)").unwrap();
    static ref POS_ADJECTIVE: Regex = Regex::new(r"\badj\b").unwrap();
    static ref POS_ADVERB: Regex = Regex::new(r"\badv\b").unwrap();
    static ref POS_LOCUTION: Regex = Regex::new(r"\bloc\b").unwrap();
    static ref POS_INTERJECTION: Regex = Regex::new(r"\binterj\b").unwrap();
}

// ============================================================================
// FORMATTING
// ============================================================================

pub fn starts_with_vowel(word: &str) -> bool {
    word.chars()
        .next()
        .and_then(|c| c.to_lowercase().next())
        .map(|c| FRENCH_VOWELS.contains(c))
        .unwrap_or(false)
}

/// Noun with its article: "le chat", "l'arbre (m)", "le/la enfant"…
pub fn format_noun(lemma: &str, gender: &str) -> String {
    let lemma = lemma.trim();
    let elided = starts_with_vowel(lemma);
    match (gender, elided) {
        ("m", true) => format!("l'{} (m)", lemma),
        ("m", false) => format!("le {}", lemma),
        ("f", true) => format!("l'{} (f)", lemma),
        ("f", false) => format!("la {}", lemma),
        ("m/f", true) => format!("l'{} (m/f)", lemma),
        ("m/f", false) => format!("le/la {}", lemma),
        _ => lemma.to_string(),
    }
}

/// Lexicon category (and gender for nouns) to card WordType
pub fn word_type(category: &str, gender: &str) -> String {
    match category {
        "NOM" => match gender {
            "m" => "m",
            "f" => "f",
            _ => "m/f",
        }
        .to_string(),
        "VER" | "AUX" => "v".to_string(),
        "ADJ:NUM" => "num".to_string(),
        "ADJ" => "adj".to_string(),
        "ADV" => "adv".to_string(),
        "PRE" => "prep".to_string(),
        "CON" => "conj".to_string(),
        "ONO" => "interj".to_string(),
        tag if tag.starts_with("PRO:") => "pron".to_string(),
        tag if tag.starts_with("ART:") => "art".to_string(),
        tag if tag.starts_with("ADJ:") => "adj".to_string(),
        tag => tag.to_lowercase(),
    }
}

/// Free-form dictionary POS ("n. m.", "loc. verb.", "adj.") to WordType.
/// Unrecognised tags pass through lower-cased; empty ones become `expr`.
pub fn pos_to_word_type(pos: &str) -> String {
    let pos = pos.trim().to_lowercase();
    if pos.is_empty() {
        return "expr".to_string();
    }

    if POS_COMMON_GENDER.is_match(&pos) {
        return "m/f".to_string();
    }
    if POS_MASCULINE.is_match(&pos) {
        return "m".to_string();
    }
    if POS_FEMININE.is_match(&pos) {
        return "f".to_string();
    }
    if POS_NOUN.is_match(&pos) {
        return "m/f".to_string();
    }
    if POS_VERB.is_match(&pos) || pos.starts_with('v') {
        return "v".to_string();
    }

    let tagged = [
        (&*POS_ADJECTIVE, "adj"),
        (&*POS_ADVERB, "adv"),
        (&*POS_LOCUTION, "loc"),
        (&*POS_INTERJECTION, "interj"),
    ];
    for (pattern, word_type) in tagged {
        if pattern.is_match(&pos) {
            return word_type.to_string();
        }
    }
    if pos.contains("expr") {
        return "expr".to_string();
    }
    pos
}

fn preview(text: &str) -> String {
    if text.chars().count() > NOTE_PREVIEW_CHARS {
        let cut: String = text.chars().take(NOTE_PREVIEW_CHARS).collect();
        format!("{}...", cut)
    } else {
        text.to_string()
    }
}

// ============================================================================
// SKELETON ROWS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RowSource {
    Lexique,
    External,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VocabularySkeleton {
    #[serde(rename = "French")]
    pub french: String,
    #[serde(rename = "WordType")]
    pub word_type: String,
    #[serde(rename = "Notes")]
    pub notes: String,
    #[serde(rename = "Source")]
    pub source: RowSource,
    #[serde(rename = "Frequency")]
    pub frequency: f64,
    #[serde(rename = "Priority")]
    pub priority: String,
}

impl VocabularySkeleton {
    fn lexique(french: String, word_type: String, notes: &str, frequency: f64) -> Self {
        VocabularySkeleton {
            french,
            word_type,
            notes: notes.to_string(),
            source: RowSource::Lexique,
            frequency: round2(frequency),
            priority: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConjugationSkeleton {
    #[serde(rename = "Verb")]
    pub verb: String,
    #[serde(rename = "Group")]
    pub group: String,
    #[serde(rename = "Pattern")]
    pub pattern: String,
    #[serde(rename = "Notes")]
    pub notes: String,
    #[serde(rename = "Frequency")]
    pub frequency: f64,
}

pub const VOCABULARY_SKELETON_HEADERS: [&str; 6] =
    ["French", "WordType", "Notes", "Source", "Frequency", "Priority"];
pub const CONJUGATION_SKELETON_HEADERS: [&str; 5] = ["Verb", "Group", "Pattern", "Notes", "Frequency"];

/// A pipeline row that lost its card key to a higher-ranked row
#[derive(Debug, Clone, PartialEq)]
pub struct DroppedRow {
    pub card_type: CardType,
    /// French field of the row that kept the key
    pub kept: String,
    pub row: VocabularySkeleton,
}

impl DroppedRow {
    pub fn to_issue(&self) -> Issue {
        Issue::new(
            IssueKind::DuplicateCardKey,
            "assemble",
            &self.row.french,
            &format!(
                "{} row ({}, {}) shares its card key with '{}' and was dropped",
                self.card_type, self.row.word_type, self.row.frequency, self.kept
            ),
        )
    }
}

/// Keep the first row per card key. `rows` must already be in rank order.
pub fn dedupe_by_key(
    rows: Vec<VocabularySkeleton>,
    card_type: CardType,
) -> (Vec<VocabularySkeleton>, Vec<DroppedRow>) {
    let mut holders: HashMap<String, String> = HashMap::new();
    let mut kept = Vec::with_capacity(rows.len());
    let mut dropped = Vec::new();

    for row in rows {
        match holders.entry(vocabulary_key(&row.french)) {
            Entry::Occupied(holder) => {
                debug!(card_type = %card_type, row = %row.french, kept = %holder.get(), "duplicate card key");
                dropped.push(DroppedRow {
                    card_type,
                    kept: holder.get().clone(),
                    row,
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(row.french.clone());
                kept.push(row);
            }
        }
    }
    (kept, dropped)
}

/// Every pipeline-side row, in rank order per card type
#[derive(Debug, Clone, Default)]
pub struct Skeletons {
    pub vocabulary: Vec<VocabularySkeleton>,
    pub conjugation: Vec<ConjugationSkeleton>,
    pub expressions: Vec<VocabularySkeleton>,
    /// Rows merged away because their card key was already taken
    pub dropped: Vec<DroppedRow>,
}

impl Skeletons {
    pub fn build(
        selections: &[CategorySelection],
        report: &ClassificationReport,
        external: &[ExternalVocabularyItem],
        blacklist: &HashSet<String>,
    ) -> Self {
        let (vocabulary, mut dropped) = build_vocabulary(selections, report, blacklist);
        let (expressions, dropped_expressions) = build_expressions(external, blacklist);
        dropped.extend(dropped_expressions);

        let skeletons = Skeletons {
            vocabulary,
            conjugation: build_conjugation(selections, report, blacklist),
            expressions,
            dropped,
        };
        info!("{}", skeletons.summary());
        skeletons
    }

    pub fn issues(&self) -> Vec<Issue> {
        self.dropped.iter().map(|d| d.to_issue()).collect()
    }

    pub fn summary(&self) -> String {
        format!(
            "{} vocabulary, {} conjugation, {} expression rows ({} dropped on duplicate keys)",
            self.vocabulary.len(),
            self.conjugation.len(),
            self.expressions.len(),
            self.dropped.len()
        )
    }
}

fn is_blacklisted(blacklist: &HashSet<String>, word: &str) -> bool {
    blacklist.contains(&word.trim().to_lowercase())
}

fn vocabulary_rows(row: &SelectionRow, report: &ClassificationReport) -> Vec<VocabularySkeleton> {
    let kind = word_type(&row.category, &row.gender);

    match row.category.as_str() {
        "NOM" => vec![VocabularySkeleton::lexique(
            format_noun(&row.lemma, &kind),
            kind,
            "",
            row.frequency,
        )],
        "ADJ" => adjective_rows(row, report),
        _ => vec![VocabularySkeleton::lexique(row.lemma.clone(), kind, "", row.frequency)],
    }
}

/// Irregular adjectives get one row per form so each can carry its own card
fn adjective_rows(row: &SelectionRow, report: &ClassificationReport) -> Vec<VocabularySkeleton> {
    let single = |french: &str, notes: &str| {
        vec![VocabularySkeleton::lexique(
            french.to_string(),
            "adj".to_string(),
            notes,
            row.frequency,
        )]
    };

    let finding = match report.adjective(&row.lemma) {
        Some(f) => f,
        None => return single(&row.lemma, ""),
    };

    match (&finding.class, &finding.form_f) {
        (Review::Resolved(AdjectiveClass::Irregular(pattern)), Some(form_f)) => vec![
            VocabularySkeleton::lexique(
                finding.form_m.clone(),
                "adj".to_string(),
                &format!("irrégulier ({}), fém. {}", pattern, form_f),
                row.frequency,
            ),
            VocabularySkeleton::lexique(
                form_f.clone(),
                "adj".to_string(),
                &format!("fém. de {}", finding.form_m),
                row.frequency,
            ),
        ],
        (Review::Resolved(AdjectiveClass::Regular), Some(form_f)) => {
            single(&format!("{}, {}", finding.form_m, form_f), "+e au féminin")
        }
        (Review::Resolved(AdjectiveClass::Invariable), _) => single(&finding.form_m, "invariable"),
        _ => single(&row.lemma, ""),
    }
}

fn by_frequency(a: (&str, f64), b: (&str, f64)) -> Ordering {
    b.1.partial_cmp(&a.1)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.0.to_lowercase().cmp(&b.0.to_lowercase()))
}

/// Vocabulary rows across all categories, most frequent first. Rows that
/// would share a card key keep only their most frequent variant; the rest
/// are returned as dropped.
pub fn build_vocabulary(
    selections: &[CategorySelection],
    report: &ClassificationReport,
    blacklist: &HashSet<String>,
) -> (Vec<VocabularySkeleton>, Vec<DroppedRow>) {
    let mut rows: Vec<VocabularySkeleton> = selections
        .iter()
        .flat_map(|s| s.rows.iter())
        .filter(|row| !is_blacklisted(blacklist, &row.lemma))
        .flat_map(|row| vocabulary_rows(row, report))
        .collect();

    rows.sort_by(|a, b| by_frequency((&a.french, a.frequency), (&b.french, b.frequency)));

    dedupe_by_key(rows, CardType::Vocabulary)
}

/// One conjugation row per selected verb
pub fn build_conjugation(
    selections: &[CategorySelection],
    report: &ClassificationReport,
    blacklist: &HashSet<String>,
) -> Vec<ConjugationSkeleton> {
    let verbs = match selection(selections, "VER") {
        Some(selection) => selection,
        None => return Vec::new(),
    };

    let mut rows: Vec<ConjugationSkeleton> = verbs
        .rows
        .iter()
        .filter(|row| !is_blacklisted(blacklist, &row.lemma))
        .map(|row| match report.verb(&row.lemma) {
            Some(finding) => ConjugationSkeleton {
                verb: row.lemma.clone(),
                group: finding.group_label(),
                pattern: finding.ending.clone(),
                notes: finding.note.clone(),
                frequency: row.frequency,
            },
            // below the classifier's frequency floor
            None => {
                let (group, ending) = verb_group(&row.lemma, None);
                ConjugationSkeleton {
                    verb: row.lemma.clone(),
                    group: if group == 1 {
                        "1er groupe".to_string()
                    } else {
                        format!("{}e groupe", group)
                    },
                    pattern: ending.to_string(),
                    notes: String::new(),
                    frequency: row.frequency,
                }
            }
        })
        .collect();

    rows.sort_by(|a, b| by_frequency((&a.verb, a.frequency), (&b.verb, b.frequency)));
    rows
}

/// Expression rows from merged external vocabulary, in merge rank order.
/// Items that differ only by article ("tuque" n.f. and "la tuque") share a
/// card key; the higher-ranked one is kept.
pub fn build_expressions(
    items: &[ExternalVocabularyItem],
    blacklist: &HashSet<String>,
) -> (Vec<VocabularySkeleton>, Vec<DroppedRow>) {
    let rows: Vec<VocabularySkeleton> = items
        .iter()
        .filter(|item| !is_blacklisted(blacklist, &item.word))
        .map(|item| {
            let kind = pos_to_word_type(&item.part_of_speech);
            let french = if matches!(kind.as_str(), "m" | "f" | "m/f") {
                format_noun(&item.word, &kind)
            } else {
                item.word.clone()
            };

            let definition = preview(&item.definition);
            let notes = match (item.translation.is_empty(), definition.is_empty()) {
                (false, false) => format!("{} | {}", item.translation, definition),
                (false, true) => item.translation.clone(),
                (true, _) => definition,
            };

            VocabularySkeleton {
                french,
                word_type: kind,
                notes,
                source: RowSource::External,
                frequency: round2(item.frequency),
                priority: item.priority.as_str().to_string(),
            }
        })
        .collect();

    dedupe_by_key(rows, CardType::Expression)
}

// ============================================================================
// ARTIFACTS
// ============================================================================

pub fn write_skeletons(
    skeletons: &Skeletons,
    dir: &Path,
    writer: &ArtifactWriter,
) -> PipelineResult<Vec<PathBuf>> {
    let vocabulary = dir.join("vocabulary_skeleton.csv");
    writer.write_csv(&vocabulary, &VOCABULARY_SKELETON_HEADERS, &skeletons.vocabulary)?;

    let conjugation = dir.join("conjugation_skeleton.csv");
    writer.write_csv(&conjugation, &CONJUGATION_SKELETON_HEADERS, &skeletons.conjugation)?;

    let expressions = dir.join("expressions_skeleton.csv");
    writer.write_csv(&expressions, &VOCABULARY_SKELETON_HEADERS, &skeletons.expressions)?;

    Ok(vec![vocabulary, conjugation, expressions])
}

// ============================================================================
// TESTS
// ============================================================================
