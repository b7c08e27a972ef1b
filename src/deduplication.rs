// 🔍 Vocabulary Merger - Deduplicate external word lists
// Items from every source are keyed on their normalised word and combined.
// The result does not depend on the order the sources were read in.

use crate::artifact::ArtifactWriter;
use crate::config::ExternalConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::external::{get_adapter, RawVocabularyItem, SourceBatch, VocabularySource};
use crate::frequency::{round2, FrequencyWeights};
use crate::lexicon::Lexicon;
use chrono::{DateTime, Utc};
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

pub const MERGED_HEADERS: [&str; 7] = [
    "word",
    "pos",
    "definition",
    "translation",
    "sources",
    "priority",
    "frequency",
];

const LEADING_ARTICLES: [&str; 7] = ["le ", "la ", "l'", "les ", "un ", "une ", "des "];

// ============================================================================
// MERGED ITEM
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Medium,
    High,
}

impl Priority {
    /// High when at least two distinct sources list the word
    pub fn from_source_count(count: usize) -> Self {
        if count >= 2 {
            Priority::High
        } else {
            Priority::Medium
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExternalVocabularyItem {
    pub word: String,
    pub part_of_speech: String,
    pub definition: String,
    pub translation: String,
    pub source_tags: BTreeSet<VocabularySource>,
    pub priority: Priority,
    pub frequency: f64,
}

impl ExternalVocabularyItem {
    pub fn key(&self) -> String {
        merge_key(&self.word)
    }

    pub fn sources_label(&self) -> String {
        self.source_tags
            .iter()
            .map(|s| s.code())
            .collect::<Vec<_>>()
            .join(",")
    }

    pub fn to_row(&self) -> MergedRow {
        MergedRow {
            word: self.word.clone(),
            pos: self.part_of_speech.clone(),
            definition: self.definition.clone(),
            translation: self.translation.clone(),
            sources: self.sources_label(),
            priority: self.priority.as_str().to_string(),
            frequency: round2(self.frequency),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedRow {
    pub word: String,
    pub pos: String,
    pub definition: String,
    pub translation: String,
    pub sources: String,
    pub priority: String,
    pub frequency: f64,
}

impl MergedRow {
    /// Back to an item; unknown source codes are dropped
    pub fn into_item(self) -> ExternalVocabularyItem {
        let source_tags: BTreeSet<VocabularySource> = self
            .sources
            .split(',')
            .filter_map(VocabularySource::from_code)
            .collect();
        ExternalVocabularyItem {
            priority: Priority::from_source_count(source_tags.len()),
            word: self.word,
            part_of_speech: self.pos,
            definition: self.definition,
            translation: self.translation,
            source_tags,
            frequency: self.frequency,
        }
    }
}

// ============================================================================
// KEYS
// ============================================================================

/// Merge key: trimmed, NFC, lower-cased, inner whitespace collapsed
pub fn merge_key(word: &str) -> String {
    let nfc: String = word.trim().nfc().collect();
    nfc.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Lookup key against the lexicon: merge key without leading article or
/// trailing punctuation
pub fn lookup_key(word: &str) -> String {
    let mut key = merge_key(word);
    for article in LEADING_ARTICLES {
        if let Some(rest) = key.strip_prefix(article) {
            key = rest.to_string();
            break;
        }
    }
    key.trim_end_matches(|c| ".,;:!?".contains(c)).to_string()
}

// ============================================================================
// FREQUENCY LOOKUP
// ============================================================================

/// Highest combined frequency per lemma and surface form
#[derive(Debug, Clone, Default)]
pub struct FrequencyIndex {
    by_word: HashMap<String, f64>,
}

impl FrequencyIndex {
    pub fn from_lexicon(lexicon: &Lexicon, weights: &FrequencyWeights) -> Self {
        let mut by_word: HashMap<String, f64> = HashMap::new();
        for entry in lexicon.entries() {
            let freq = entry.combined_frequency(weights);
            for word in [&entry.lemma, &entry.surface_form] {
                let key = merge_key(word);
                if key.is_empty() {
                    continue;
                }
                let slot = by_word.entry(key).or_insert(0.0);
                if freq > *slot {
                    *slot = freq;
                }
            }
        }
        FrequencyIndex { by_word }
    }

    /// Whole expression first, then its first word; 0 when unknown
    pub fn lookup(&self, word: &str) -> f64 {
        let key = lookup_key(word);
        if let Some(freq) = self.by_word.get(&key) {
            return *freq;
        }
        key.split_whitespace()
            .next()
            .and_then(|first| self.by_word.get(first))
            .copied()
            .unwrap_or(0.0)
    }
}

// ============================================================================
// MERGER
// ============================================================================

pub struct VocabularyMerger {
    /// Drop items without a definition after merging (default: false)
    pub require_definition: bool,
}

impl VocabularyMerger {
    /// Create merger with default options
    pub fn new() -> Self {
        VocabularyMerger {
            require_definition: false,
        }
    }

    pub fn from_config(config: &ExternalConfig) -> Self {
        VocabularyMerger {
            require_definition: config.require_definition,
        }
    }

    /// Combine items sharing a merge key. Output sorted by key.
    pub fn merge(&self, batches: &[SourceBatch]) -> Vec<ExternalVocabularyItem> {
        let mut groups: BTreeMap<String, Vec<&RawVocabularyItem>> = BTreeMap::new();
        for item in batches.iter().flat_map(|b| b.items.iter()) {
            let key = merge_key(&item.word);
            if key.is_empty() {
                continue;
            }
            groups.entry(key).or_default().push(item);
        }

        groups
            .into_values()
            .map(|group| self.combine(&group))
            .filter(|item| !self.require_definition || !item.definition.is_empty())
            .collect()
    }

    /// Merge, look up frequencies, then rank.
    pub fn merge_and_rank(
        &self,
        batches: &[SourceBatch],
        frequencies: &FrequencyIndex,
    ) -> Vec<ExternalVocabularyItem> {
        let mut items = self.merge(batches);
        for item in &mut items {
            item.frequency = frequencies.lookup(&item.word);
        }
        rank(&mut items);
        items
    }

    fn combine(&self, group: &[&RawVocabularyItem]) -> ExternalVocabularyItem {
        // Fixed source preference, then ordinal order: independent of input order
        let best = |field: fn(&RawVocabularyItem) -> &str| -> String {
            group
                .iter()
                .copied()
                .filter(|item| !field(item).is_empty())
                .min_by(|a, b| {
                    a.source
                        .preference()
                        .cmp(&b.source.preference())
                        .then_with(|| field(a).cmp(field(b)))
                })
                .map(|item| field(item).to_string())
                .unwrap_or_default()
        };

        let part_of_speech = group
            .iter()
            .map(|item| item.part_of_speech.as_str())
            .filter(|pos| !pos.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>()
            .join("; ");

        let source_tags: BTreeSet<VocabularySource> = group.iter().map(|item| item.source).collect();

        ExternalVocabularyItem {
            word: best(|item| item.word.trim()),
            part_of_speech,
            definition: best(|item| item.definition.as_str()),
            translation: best(|item| item.translation.as_str()),
            priority: Priority::from_source_count(source_tags.len()),
            source_tags,
            frequency: 0.0,
        }
    }
}

impl Default for VocabularyMerger {
    fn default() -> Self {
        Self::new()
    }
}

/// Priority (high first), then frequency descending, then word ascending
pub fn rank(items: &mut [ExternalVocabularyItem]) {
    items.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| b.frequency.partial_cmp(&a.frequency).unwrap_or(Ordering::Equal))
            .then_with(|| a.word.cmp(&b.word))
    });
}

// ============================================================================
// SNAPSHOT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDigest {
    pub source: VocabularySource,
    pub file: String,
    pub sha256: String,
    pub adapter_version: String,
    pub rows: usize,
    pub skipped: usize,
}

/// Describes one merged snapshot: when it was taken and from which files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub snapshot_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub sources: Vec<SourceDigest>,
    pub items: usize,
    pub skipped_rows: usize,
}

impl SnapshotManifest {
    pub fn new(batches: &[SourceBatch], items: usize) -> PipelineResult<Self> {
        let mut sources = Vec::new();
        for batch in batches {
            sources.push(SourceDigest {
                source: batch.source,
                file: batch
                    .path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("unknown.csv")
                    .to_string(),
                sha256: file_sha256(&batch.path)?,
                adapter_version: get_adapter(batch.source).version().to_string(),
                rows: batch.items.len(),
                skipped: batch.skipped.len(),
            });
        }

        Ok(SnapshotManifest {
            snapshot_id: Uuid::new_v4(),
            created_at: Utc::now(),
            skipped_rows: sources.iter().map(|s| s.skipped).sum(),
            sources,
            items,
        })
    }
}

pub fn file_sha256(path: &Path) -> PipelineResult<String> {
    let bytes = fs::read(path).map_err(|e| PipelineError::io(path, e))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

/// Write `merged.csv` and `manifest.json` into `dir`.
pub fn write_snapshot(
    items: &[ExternalVocabularyItem],
    batches: &[SourceBatch],
    dir: &Path,
    writer: &ArtifactWriter,
) -> PipelineResult<(PathBuf, SnapshotManifest)> {
    let manifest = SnapshotManifest::new(batches, items.len())?;

    let csv_path = dir.join("merged.csv");
    let rows: Vec<MergedRow> = items.iter().map(|i| i.to_row()).collect();
    writer.write_csv(&csv_path, &MERGED_HEADERS, &rows)?;
    writer.write_json(&dir.join("manifest.json"), &manifest)?;

    info!(
        snapshot_id = %manifest.snapshot_id,
        items = manifest.items,
        skipped = manifest.skipped_rows,
        "external vocabulary snapshot"
    );
    Ok((csv_path, manifest))
}

/// Read a merged snapshot back. A missing file yields no items.
pub fn read_merged(path: &Path) -> PipelineResult<Vec<ExternalVocabularyItem>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| PipelineError::csv(path, e))?;

    let mut items = Vec::new();
    for result in reader.deserialize::<MergedRow>() {
        let row = result.map_err(|e| PipelineError::csv(path, e))?;
        items.push(row.into_item());
    }
    Ok(items)
}

// ============================================================================
// TESTS
// ============================================================================
