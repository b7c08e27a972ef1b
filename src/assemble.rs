// 🃏 Card Assembler - Join pipeline skeletons with authored content
//
// Every authored row must land on exactly one pipeline row:
//   pipeline row + authored row  → filled card (complete if content checks pass)
//   pipeline row alone           → empty content, incomplete
//   authored row alone           → merge orphan
//   duplicate key on either side → join collision, card type not emitted

use crate::artifact::ArtifactWriter;
use crate::config::PipelineConfig;
use crate::deduplication::merge_key;
use crate::error::{PipelineError, PipelineResult};
use crate::skeleton::{ConjugationSkeleton, Skeletons, VocabularySkeleton};
use crate::summary::{Issue, IssueKind, RunSummary};
use csv::ReaderBuilder;
use lazy_static::lazy_static;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

pub const VOCABULARY_COLUMNS: [&str; 9] = [
    "French",
    "Russian",
    "WordType",
    "ExampleFrench",
    "ExampleRussian",
    "Notes",
    "Emoji",
    "Audio",
    "AudioExample",
];

pub const CONJUGATION_COLUMNS: [&str; 6] =
    ["Verb", "Translation", "ConjSingular", "ConjPlural", "Pattern", "Notes"];

/// Word types that go into the level decks; everything else is `autres`
pub const MAJOR_WORD_TYPES: [&str; 5] = ["m", "f", "m/f", "v", "adj"];

/// Level name and first rank (inclusive); a level ends where the next starts
pub const LEVELS: [(&str, usize); 4] = [("a1_a2", 0), ("b1", 1000), ("b2", 3000), ("c1", 5000)];
pub const OTHER_LEVEL: &str = "autres";

lazy_static! {
    static ref CLOZE: Regex = Regex::new(r"\{\{c[1-9][0-9]*::[^{}]+?(::[^{}]*)?\}\}").unwrap();
}

// ============================================================================
// CARD TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    Vocabulary,
    Conjugation,
    Expression,
}

impl CardType {
    pub fn name(&self) -> &str {
        match self {
            CardType::Vocabulary => "vocabulary",
            CardType::Conjugation => "conjugation",
            CardType::Expression => "expressions",
        }
    }

    /// Import columns, in Anki field order
    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            CardType::Vocabulary | CardType::Expression => &VOCABULARY_COLUMNS,
            CardType::Conjugation => &CONJUGATION_COLUMNS,
        }
    }

    /// Hand-authored content file for this card type
    pub fn authored_file(&self) -> String {
        format!("{}.csv", self.name())
    }
}

impl fmt::Display for CardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A flat card record that can be joined and written
pub trait Card: Clone {
    /// Key both sides of the join agree on
    fn join_key(&self) -> String;

    /// Take the authored content fields; pipeline-owned fields stay
    fn fill_from(&mut self, authored: &Self);

    /// Content checks beyond "an authored row exists"
    fn is_complete(&self) -> bool;

    /// Field values in column order
    fn fields(&self) -> Vec<String>;

    /// Short label for issues
    fn label(&self) -> String;
}

// ============================================================================
// JOIN KEYS
// ============================================================================

const GENDER_MARKERS: [&str; 3] = [" (m/f)", " (m)", " (f)"];
const ARTICLES: [&str; 6] = ["le/la ", "le ", "la ", "les ", "l'", "l’"];

/// Surface-form key: NFC, lower-cased, without article or gender marker.
/// "l'arbre (m)", "L'arbre" and "arbre" share one key.
pub fn vocabulary_key(french: &str) -> String {
    let mut key = merge_key(french);
    for marker in GENDER_MARKERS {
        if let Some(rest) = key.strip_suffix(marker) {
            key = rest.to_string();
            break;
        }
    }
    for article in ARTICLES {
        if let Some(rest) = key.strip_prefix(article) {
            if !rest.is_empty() {
                key = rest.to_string();
            }
            break;
        }
    }
    key.trim().to_string()
}

// ============================================================================
// CLOZE MARKUP
// ============================================================================

/// Number of well-formed `{{cN::text}}` / `{{cN::text::hint}}` deletions, or
/// None when the field has broken cloze markup.
pub fn cloze_count(text: &str) -> Option<usize> {
    let well_formed = CLOZE.find_iter(text).count();
    let opened = text.matches("{{").count();
    let closed = text.matches("}}").count();
    if opened == well_formed && closed == well_formed {
        Some(well_formed)
    } else {
        None
    }
}

// ============================================================================
// RECORDS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyCard {
    #[serde(rename = "French")]
    pub french: String,
    #[serde(rename = "Russian")]
    pub russian: String,
    #[serde(rename = "WordType")]
    pub word_type: String,
    #[serde(rename = "ExampleFrench")]
    pub example_french: String,
    #[serde(rename = "ExampleRussian")]
    pub example_russian: String,
    #[serde(rename = "Notes")]
    pub notes: String,
    #[serde(rename = "Emoji")]
    pub emoji: String,
    #[serde(rename = "Audio")]
    pub audio: String,
    #[serde(rename = "AudioExample")]
    pub audio_example: String,
}

impl From<&VocabularySkeleton> for VocabularyCard {
    fn from(skeleton: &VocabularySkeleton) -> Self {
        VocabularyCard {
            french: skeleton.french.clone(),
            word_type: skeleton.word_type.clone(),
            notes: skeleton.notes.clone(),
            ..Default::default()
        }
    }
}

fn take(field: &mut String, authored: &str) {
    if !authored.trim().is_empty() {
        *field = authored.trim().to_string();
    }
}

impl Card for VocabularyCard {
    fn join_key(&self) -> String {
        vocabulary_key(&self.french)
    }

    fn fill_from(&mut self, authored: &Self) {
        take(&mut self.russian, &authored.russian);
        take(&mut self.example_french, &authored.example_french);
        take(&mut self.example_russian, &authored.example_russian);
        take(&mut self.notes, &authored.notes);
        take(&mut self.emoji, &authored.emoji);
        take(&mut self.audio, &authored.audio);
        take(&mut self.audio_example, &authored.audio_example);
        if self.word_type.is_empty() {
            take(&mut self.word_type, &authored.word_type);
        }
    }

    fn is_complete(&self) -> bool {
        !self.russian.is_empty()
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.french.clone(),
            self.russian.clone(),
            self.word_type.clone(),
            self.example_french.clone(),
            self.example_russian.clone(),
            self.notes.clone(),
            self.emoji.clone(),
            self.audio.clone(),
            self.audio_example.clone(),
        ]
    }

    fn label(&self) -> String {
        self.french.clone()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConjugationCard {
    #[serde(rename = "Verb")]
    pub verb: String,
    #[serde(rename = "Translation")]
    pub translation: String,
    #[serde(rename = "ConjSingular")]
    pub conj_singular: String,
    #[serde(rename = "ConjPlural")]
    pub conj_plural: String,
    #[serde(rename = "Pattern")]
    pub pattern: String,
    #[serde(rename = "Notes")]
    pub notes: String,
}

impl From<&ConjugationSkeleton> for ConjugationCard {
    fn from(skeleton: &ConjugationSkeleton) -> Self {
        let pattern = if skeleton.pattern.is_empty() {
            skeleton.group.clone()
        } else {
            format!("{} ({})", skeleton.group, skeleton.pattern)
        };
        ConjugationCard {
            verb: skeleton.verb.clone(),
            pattern,
            notes: skeleton.notes.clone(),
            ..Default::default()
        }
    }
}

impl Card for ConjugationCard {
    fn join_key(&self) -> String {
        merge_key(&self.verb)
    }

    fn fill_from(&mut self, authored: &Self) {
        take(&mut self.translation, &authored.translation);
        take(&mut self.conj_singular, &authored.conj_singular);
        take(&mut self.conj_plural, &authored.conj_plural);
        take(&mut self.pattern, &authored.pattern);
        take(&mut self.notes, &authored.notes);
    }

    /// At least one well-formed cloze and no broken markup
    fn is_complete(&self) -> bool {
        match (cloze_count(&self.conj_singular), cloze_count(&self.conj_plural)) {
            (Some(singular), Some(plural)) => singular + plural > 0,
            _ => false,
        }
    }

    fn fields(&self) -> Vec<String> {
        vec![
            self.verb.clone(),
            self.translation.clone(),
            self.conj_singular.clone(),
            self.conj_plural.clone(),
            self.pattern.clone(),
            self.notes.clone(),
        ]
    }

    fn label(&self) -> String {
        self.verb.clone()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardRecord<C> {
    pub card: C,
    /// Position in the pipeline ordering (frequency rank)
    pub rank: usize,
    pub authored: bool,
    pub complete: bool,
}

impl<C: Card> CardRecord<C> {
    fn review_fields(&self) -> Vec<String> {
        let mut fields = self.card.fields();
        fields.push(self.complete.to_string());
        fields
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JoinOutcome<C> {
    pub records: Vec<CardRecord<C>>,
    /// Authored rows with no pipeline counterpart
    pub orphans: Vec<C>,
}

impl<C> JoinOutcome<C> {
    pub fn complete_count(&self) -> usize {
        self.records.iter().filter(|r| r.complete).count()
    }
}

// ============================================================================
// JOIN
// ============================================================================

fn find_collision<'a, I>(keys: I) -> Option<(String, usize)>
where
    I: Iterator<Item = &'a String>,
{
    let mut counts: BTreeMap<&String, usize> = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .find(|(_, count)| *count > 1)
        .map(|(key, count)| (key.clone(), count))
}

/// Join pipeline rows with authored rows of one card type.
pub fn join_cards<C: Card>(
    card_type: CardType,
    pipeline: Vec<C>,
    authored: Vec<C>,
) -> PipelineResult<JoinOutcome<C>> {
    let pipeline_keys: Vec<String> = pipeline.iter().map(|c| c.join_key()).collect();
    let authored_keys: Vec<String> = authored.iter().map(|c| c.join_key()).collect();

    for keys in [&pipeline_keys, &authored_keys] {
        if let Some((key, count)) = find_collision(keys.iter()) {
            return Err(PipelineError::JoinCollision {
                card_type: card_type.name().to_string(),
                key,
                count,
            });
        }
    }

    let mut by_key: BTreeMap<String, C> = authored_keys.into_iter().zip(authored).collect();

    let records = pipeline
        .into_iter()
        .zip(pipeline_keys)
        .enumerate()
        .map(|(rank, (mut card, key))| {
            let authored = match by_key.remove(&key) {
                Some(content) => {
                    card.fill_from(&content);
                    true
                }
                None => false,
            };
            let complete = authored && card.is_complete();
            CardRecord {
                card,
                rank,
                authored,
                complete,
            }
        })
        .collect();

    Ok(JoinOutcome {
        records,
        orphans: by_key.into_values().collect(),
    })
}

/// Read hand-authored rows. Missing columns read as empty; a missing file
/// means nothing has been authored yet.
pub fn read_authored<C: DeserializeOwned>(path: &Path) -> PipelineResult<Vec<C>> {
    if !path.exists() {
        info!(path = %path.display(), "no authored content yet");
        return Ok(Vec::new());
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| PipelineError::csv(path, e))?;

    let mut rows = Vec::new();
    for result in reader.deserialize::<C>() {
        rows.push(result.map_err(|e| PipelineError::csv(path, e))?);
    }
    Ok(rows)
}

// ============================================================================
// AUDIO
// ============================================================================

/// File-name slug: lower-case, accents folded, other characters → `_`.
/// "l'hôpital" → "l_hopital", "être" → "etre".
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    for c in text.to_lowercase().nfd() {
        if is_combining_mark(c) {
            continue;
        }
        match c {
            'œ' => slug.push_str("oe"),
            'æ' => slug.push_str("ae"),
            c if c.is_ascii_alphanumeric() => slug.push(c),
            _ => {
                if !slug.is_empty() && !slug.ends_with('_') {
                    slug.push('_');
                }
            }
        }
    }
    slug.trim_end_matches('_').to_string()
}

/// Pre-generated audio clips, looked up by slug
#[derive(Debug, Clone, Default)]
pub struct AudioLibrary {
    dir: Option<PathBuf>,
}

impl AudioLibrary {
    pub fn new(dir: Option<PathBuf>) -> Self {
        AudioLibrary { dir }
    }

    /// `[sound:<slug>.mp3]` when the clip exists
    pub fn sound_tag(&self, text: &str) -> Option<String> {
        let dir = self.dir.as_ref()?;
        let slug = slugify(text);
        if slug.is_empty() {
            return None;
        }
        let file = format!("{}.mp3", slug);
        dir.join(&file)
            .exists()
            .then(|| format!("[sound:{}]", file))
    }

    /// Fill empty audio fields; authored values win
    pub fn fill(&self, card: &mut VocabularyCard) {
        if card.audio.is_empty() {
            if let Some(tag) = self.sound_tag(&card.french) {
                card.audio = tag;
            }
        }
        if card.audio_example.is_empty() && !card.example_french.is_empty() {
            if let Some(tag) = self.sound_tag(&card.example_french) {
                card.audio_example = tag;
            }
        }
    }
}

// ============================================================================
// LEVELS
// ============================================================================

/// Level deck for a vocabulary record
pub fn level_for(word_type: &str, rank: usize) -> &'static str {
    if !MAJOR_WORD_TYPES.contains(&word_type) {
        return OTHER_LEVEL;
    }
    LEVELS
        .iter()
        .rev()
        .find(|(_, start)| rank >= *start)
        .map(|(name, _)| *name)
        .unwrap_or(OTHER_LEVEL)
}

/// Complete vocabulary records grouped by level, each in rank order
pub fn split_levels(
    records: &[CardRecord<VocabularyCard>],
) -> BTreeMap<&'static str, Vec<&VocabularyCard>> {
    let mut levels: BTreeMap<&'static str, Vec<&VocabularyCard>> = LEVELS
        .iter()
        .map(|(name, _)| (*name, Vec::new()))
        .chain(std::iter::once((OTHER_LEVEL, Vec::new())))
        .collect();

    for record in records.iter().filter(|r| r.complete) {
        levels
            .entry(level_for(&record.card.word_type, record.rank))
            .or_default()
            .push(&record.card);
    }
    levels
}

// ============================================================================
// ASSEMBLER
// ============================================================================

/// What happened to one card type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeckOutcome {
    pub card_type: CardType,
    pub records: usize,
    pub complete: usize,
    pub orphans: usize,
    /// Set when a join collision stopped this card type
    pub aborted: Option<String>,
}

impl DeckOutcome {
    pub fn summary(&self) -> String {
        match &self.aborted {
            Some(reason) => format!("{}: not emitted ({})", self.card_type, reason),
            None => format!(
                "{}: {} records, {} complete, {} orphans",
                self.card_type, self.records, self.complete, self.orphans
            ),
        }
    }
}

pub struct CardAssembler {
    pub authored_dir: PathBuf,
    pub out_dir: PathBuf,
    pub audio: AudioLibrary,
    pub writer: ArtifactWriter,
}

impl CardAssembler {
    pub fn from_config(config: &PipelineConfig, writer: ArtifactWriter) -> Self {
        CardAssembler {
            authored_dir: config.paths.authored_dir.clone(),
            out_dir: config.cards_dir(),
            audio: AudioLibrary::new(config.assemble.audio_dir.clone()),
            writer,
        }
    }

    /// Join and write every card type. A collision stops only its own type.
    pub fn assemble(
        &self,
        skeletons: &Skeletons,
        summary: &mut RunSummary,
    ) -> PipelineResult<Vec<DeckOutcome>> {
        let vocabulary: Vec<VocabularyCard> = skeletons.vocabulary.iter().map(VocabularyCard::from).collect();
        let conjugation: Vec<ConjugationCard> =
            skeletons.conjugation.iter().map(ConjugationCard::from).collect();
        let expressions: Vec<VocabularyCard> = skeletons.expressions.iter().map(VocabularyCard::from).collect();

        Ok(vec![
            self.assemble_type(CardType::Vocabulary, vocabulary, summary)?,
            self.assemble_type(CardType::Conjugation, conjugation, summary)?,
            self.assemble_type(CardType::Expression, expressions, summary)?,
        ])
    }

    fn assemble_type<C>(
        &self,
        card_type: CardType,
        pipeline: Vec<C>,
        summary: &mut RunSummary,
    ) -> PipelineResult<DeckOutcome>
    where
        C: Card + DeserializeOwned + DeckExtras,
    {
        let authored_path = self.authored_dir.join(card_type.authored_file());
        let authored: Vec<C> = read_authored(&authored_path)?;

        let mut outcome = match join_cards(card_type, pipeline, authored) {
            Ok(outcome) => outcome,
            Err(err @ PipelineError::JoinCollision { .. }) => {
                let reason = err.to_string();
                summary.record(Issue::new(
                    IssueKind::JoinCollision,
                    "assemble",
                    card_type.name(),
                    &reason,
                ));
                return Ok(DeckOutcome {
                    card_type,
                    records: 0,
                    complete: 0,
                    orphans: 0,
                    aborted: Some(reason),
                });
            }
            Err(err) => return Err(err),
        };

        for record in &mut outcome.records {
            record.card.fill_audio(&self.audio);
        }

        for orphan in &outcome.orphans {
            summary.record(Issue::new(
                IssueKind::MergeOrphan,
                "assemble",
                &orphan.label(),
                &format!("authored {} row has no pipeline counterpart", card_type),
            ));
        }
        for record in outcome.records.iter().filter(|r| !r.complete) {
            let message = if record.authored {
                "authored content fails completeness checks"
            } else {
                "no authored content"
            };
            summary.record(Issue::new(
                IssueKind::IncompleteCard,
                "assemble",
                &record.card.label(),
                message,
            ));
        }

        self.write_deck(card_type, &outcome)?;

        let deck = DeckOutcome {
            card_type,
            records: outcome.records.len(),
            complete: outcome.complete_count(),
            orphans: outcome.orphans.len(),
            aborted: None,
        };
        summary.count(&format!("{} cards", card_type), deck.complete);
        info!("{}", deck.summary());
        Ok(deck)
    }

    fn write_deck<C: Card + DeckExtras>(
        &self,
        card_type: CardType,
        outcome: &JoinOutcome<C>,
    ) -> PipelineResult<()> {
        let columns = card_type.columns();

        let import: Vec<Vec<String>> = outcome
            .records
            .iter()
            .filter(|r| r.complete)
            .map(|r| r.card.fields())
            .collect();
        self.writer
            .write_csv(&self.out_dir.join(format!("{}.csv", card_type)), columns, &import)?;

        let mut review_columns = columns.to_vec();
        review_columns.push("Complete");
        let review: Vec<Vec<String>> = outcome.records.iter().map(|r| r.review_fields()).collect();
        self.writer.write_csv(
            &self.out_dir.join(format!("{}_review.csv", card_type)),
            &review_columns,
            &review,
        )?;

        if card_type == CardType::Vocabulary {
            C::write_levels(outcome, &self.out_dir.join("levels"), &self.writer)?;
        }
        Ok(())
    }
}

/// Card-specific extras: audio lookup and level decks (vocabulary only)
pub trait DeckExtras: Sized {
    fn fill_audio(&mut self, _audio: &AudioLibrary) {}

    fn write_levels(
        _outcome: &JoinOutcome<Self>,
        _dir: &Path,
        _writer: &ArtifactWriter,
    ) -> PipelineResult<()> {
        Ok(())
    }
}

impl DeckExtras for VocabularyCard {
    fn fill_audio(&mut self, audio: &AudioLibrary) {
        audio.fill(self);
    }

    fn write_levels(
        outcome: &JoinOutcome<Self>,
        dir: &Path,
        writer: &ArtifactWriter,
    ) -> PipelineResult<()> {
        for (level, cards) in split_levels(&outcome.records) {
            let rows: Vec<Vec<String>> = cards.iter().map(|c| c.fields()).collect();
            writer.write_csv(&dir.join(format!("{}.csv", level)), &VOCABULARY_COLUMNS, &rows)?;
        }
        Ok(())
    }
}

impl DeckExtras for ConjugationCard {}

/// Warn about authored files that no card type reads
pub fn unused_authored_files(authored_dir: &Path) -> Vec<PathBuf> {
    let known: Vec<String> = [CardType::Vocabulary, CardType::Conjugation, CardType::Expression]
        .iter()
        .map(|t| t.authored_file())
        .collect();

    let entries = match std::fs::read_dir(authored_dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };

    let mut unused: Vec<PathBuf> = entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map(|ext| ext == "csv").unwrap_or(false))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| !known.iter().any(|k| k == n))
                .unwrap_or(false)
        })
        .collect();
    unused.sort();
    for path in &unused {
        warn!(path = %path.display(), "authored file not read by any card type");
    }
    unused
}

// ============================================================================
// TESTS
// ============================================================================
