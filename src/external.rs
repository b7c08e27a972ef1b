// 🌐 External Vocabulary Sources
// One adapter per downloaded word-list layout, all producing the same raw item.

use crate::error::{PipelineError, PipelineResult};
use csv::{ReaderBuilder, StringRecord};
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

lazy_static! {
    /// "mot (n. f.)" → word + part of speech
    static ref TERM_WITH_POS: Regex = Regex::new(r"^(.+?)\s*\(([^)]+)\)").unwrap();
    /// "[Québec]", "[Canada]" usage markers
    static ref USAGE_MARKER: Regex = Regex::new(r"\s*\[.*?\]").unwrap();
    static ref PARENTHESIZED: Regex = Regex::new(r"\s*\([^)]*\)\s*").unwrap();
}

// ============================================================================
// CORE TYPES
// ============================================================================

/// Where a vocabulary item came from. Variant order is the output order of
/// merged source tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VocabularySource {
    Cameleon,
    Curated,
    Exionnaire,
    Oqlf,
    Wiktionary,
}

impl VocabularySource {
    pub const ALL: [VocabularySource; 5] = [
        VocabularySource::Cameleon,
        VocabularySource::Curated,
        VocabularySource::Exionnaire,
        VocabularySource::Oqlf,
        VocabularySource::Wiktionary,
    ];

    /// Human-readable name for display
    pub fn name(&self) -> &str {
        match self {
            VocabularySource::Cameleon => "Le Caméléon",
            VocabularySource::Curated => "Curated list",
            VocabularySource::Exionnaire => "Exionnaire",
            VocabularySource::Oqlf => "OQLF",
            VocabularySource::Wiktionary => "Wiktionary",
        }
    }

    /// Short code used in artifacts
    pub fn code(&self) -> &str {
        match self {
            VocabularySource::Cameleon => "cameleon",
            VocabularySource::Curated => "curated",
            VocabularySource::Exionnaire => "exionnaire",
            VocabularySource::Oqlf => "oqlf",
            VocabularySource::Wiktionary => "wiktionary",
        }
    }

    pub fn from_code(code: &str) -> Option<VocabularySource> {
        VocabularySource::ALL
            .iter()
            .copied()
            .find(|s| s.code() == code.trim())
    }

    /// Lower wins when two sources disagree on a field
    pub fn preference(&self) -> u8 {
        match self {
            VocabularySource::Curated => 0,
            VocabularySource::Cameleon => 1,
            VocabularySource::Oqlf => 2,
            VocabularySource::Wiktionary => 3,
            VocabularySource::Exionnaire => 4,
        }
    }
}

/// One usable row of a source file, before merging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawVocabularyItem {
    pub word: String,
    pub part_of_speech: String,
    pub definition: String,
    pub translation: String,

    // Provenance
    pub source: VocabularySource,
    pub line_number: usize,
}

impl RawVocabularyItem {
    pub fn new(word: &str, source: VocabularySource, line_number: usize) -> Self {
        RawVocabularyItem {
            word: word.to_string(),
            part_of_speech: String::new(),
            definition: String::new(),
            translation: String::new(),
            source,
            line_number,
        }
    }

    /// Builder pattern: add part of speech
    pub fn with_pos(mut self, pos: &str) -> Self {
        self.part_of_speech = pos.to_string();
        self
    }

    /// Builder pattern: add definition
    pub fn with_definition(mut self, definition: &str) -> Self {
        self.definition = definition.to_string();
        self
    }

    /// Builder pattern: add translation
    pub fn with_translation(mut self, translation: &str) -> Self {
        self.translation = translation.to_string();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedRow {
    pub line_number: usize,
    pub reason: String,
}

/// Everything one adapter read from one file
#[derive(Debug, Clone, PartialEq)]
pub struct SourceBatch {
    pub source: VocabularySource,
    pub path: PathBuf,
    pub items: Vec<RawVocabularyItem>,
    /// Malformed rows: CSV errors or empty words
    pub skipped: Vec<SkippedRow>,
    /// Rows dropped on purpose (codes, numerals)
    pub filtered: usize,
}

impl SourceBatch {
    pub fn new(source: VocabularySource, path: &Path) -> Self {
        SourceBatch {
            source,
            path: path.to_path_buf(),
            items: Vec::new(),
            skipped: Vec::new(),
            filtered: 0,
        }
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: {} items, {} skipped, {} filtered",
            self.source.name(),
            self.items.len(),
            self.skipped.len(),
            self.filtered
        )
    }
}

// ============================================================================
// ADAPTER TRAIT
// ============================================================================

/// SourceAdapter - one implementation per file layout
pub trait SourceAdapter: Send + Sync {
    /// Parse a downloaded source file. A missing file is fatal; bad rows are
    /// skipped and counted in the batch.
    fn parse(&self, path: &Path) -> PipelineResult<SourceBatch>;

    /// The source this adapter handles
    fn source(&self) -> VocabularySource;

    /// Adapter version (recorded in the snapshot manifest)
    fn version(&self) -> &str {
        "1.0.0"
    }
}

/// What a layout-specific row mapper decided
enum RowOutcome {
    Item(RawVocabularyItem),
    Filtered,
    Malformed(String),
}

/// Named-column view of a CSV record. Unknown columns read as "".
struct Row<'a> {
    headers: &'a StringRecord,
    record: &'a StringRecord,
}

impl<'a> Row<'a> {
    fn get(&self, name: &str) -> &'a str {
        self.headers
            .iter()
            .position(|h| h.trim() == name)
            .and_then(|i| self.record.get(i))
            .map(str::trim)
            .unwrap_or("")
    }
}

/// Shared CSV loop for every adapter
fn read_source<F>(path: &Path, source: VocabularySource, map_row: F) -> PipelineResult<SourceBatch>
where
    F: Fn(&Row, usize) -> RowOutcome,
{
    if !path.exists() {
        return Err(PipelineError::data_source(path, "source file not found"));
    }

    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| PipelineError::csv(path, e))?
        .clone();

    let mut batch = SourceBatch::new(source, path);

    for (idx, result) in reader.records().enumerate() {
        let line_number = idx + 2;
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                batch.skipped.push(SkippedRow {
                    line_number,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let row = Row {
            headers: &headers,
            record: &record,
        };
        match map_row(&row, line_number) {
            RowOutcome::Item(item) if item.word.trim().is_empty() => batch.skipped.push(SkippedRow {
                line_number,
                reason: "empty word".to_string(),
            }),
            RowOutcome::Item(item) => batch.items.push(item),
            RowOutcome::Filtered => batch.filtered += 1,
            RowOutcome::Malformed(reason) => batch.skipped.push(SkippedRow { line_number, reason }),
        }
    }

    debug!(path = %path.display(), "{}", batch.summary());
    Ok(batch)
}

// ============================================================================
// TEXT HELPERS
// ============================================================================

/// Python-style title case: first letter of every alphabetic run upper-cased
pub fn title_case(word: &str) -> String {
    let mut out = String::with_capacity(word.len());
    let mut prev_alpha = false;
    for c in word.chars() {
        if c.is_alphabetic() {
            if prev_alpha {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(c);
            prev_alpha = false;
        }
    }
    out
}

/// True if the word has letters and none of them is lower-case
pub fn is_all_caps(word: &str) -> bool {
    word.chars().any(|c| c.is_uppercase()) && !word.chars().any(|c| c.is_lowercase())
}

/// "Achalant, E" → "Achalant"; "mot (fam.)" → "mot"
pub fn base_word(raw: &str) -> String {
    let word = PARENTHESIZED.replace_all(raw, "");
    let word = word.trim();
    let parts: Vec<&str> = word.split(", ").collect();
    if parts.len() == 2 && parts[1].chars().count() <= 4 {
        return parts[0].trim().to_string();
    }
    word.to_string()
}

// ============================================================================
// ADAPTERS
// ============================================================================

/// OQLF official terminology export
pub struct OqlfAdapter;

impl SourceAdapter for OqlfAdapter {
    fn parse(&self, path: &Path) -> PipelineResult<SourceBatch> {
        read_source(path, self.source(), |row, line| {
            let term = row.get("Termes_Officialises");
            if term.is_empty() {
                return RowOutcome::Malformed("empty term".to_string());
            }

            let (word, pos) = match TERM_WITH_POS.captures(term) {
                Some(caps) => (
                    caps.get(1).map(|m| m.as_str().trim()).unwrap_or(""),
                    caps.get(2).map(|m| m.as_str().trim()).unwrap_or(""),
                ),
                None => (term, ""),
            };
            let word = USAGE_MARKER.replace_all(word, "");

            let definition = row.get("Definition");
            let english = row.get("Equivalent_anglais");
            let definition = match (definition.is_empty(), english.is_empty()) {
                (false, false) => format!("{} (en: {})", definition, english),
                (true, false) => format!("(en: {})", english),
                _ => definition.to_string(),
            };

            RowOutcome::Item(
                RawVocabularyItem::new(word.trim(), self.source(), line)
                    .with_pos(pos)
                    .with_definition(&definition),
            )
        })
    }

    fn source(&self) -> VocabularySource {
        VocabularySource::Oqlf
    }
}

/// Le Caméléon glossary: word, pos, definition
pub struct CameleonAdapter;

impl SourceAdapter for CameleonAdapter {
    fn parse(&self, path: &Path) -> PipelineResult<SourceBatch> {
        read_source(path, self.source(), |row, line| {
            let raw = row.get("word");
            if raw.is_empty() {
                return RowOutcome::Malformed("empty word".to_string());
            }
            RowOutcome::Item(
                RawVocabularyItem::new(&base_word(raw), self.source(), line)
                    .with_pos(&row.get("pos").to_lowercase())
                    .with_definition(row.get("definition")),
            )
        })
    }

    fn source(&self) -> VocabularySource {
        VocabularySource::Cameleon
    }
}

/// Wiktionary category dump: word only
pub struct WiktionaryAdapter;

impl SourceAdapter for WiktionaryAdapter {
    fn parse(&self, path: &Path) -> PipelineResult<SourceBatch> {
        read_source(path, self.source(), |row, line| {
            let word = row.get("word");
            if word.is_empty() {
                return RowOutcome::Malformed("empty word".to_string());
            }
            // Abbreviation codes and numerals are not vocabulary
            if word.chars().count() <= 2 && is_all_caps(word) {
                return RowOutcome::Filtered;
            }
            if word.chars().all(|c| c.is_ascii_digit()) {
                return RowOutcome::Filtered;
            }
            RowOutcome::Item(RawVocabularyItem::new(word, self.source(), line))
        })
    }

    fn source(&self) -> VocabularySource {
        VocabularySource::Wiktionary
    }
}

/// Exionnaire list: upper-case words
pub struct ExionnaireAdapter;

impl SourceAdapter for ExionnaireAdapter {
    fn parse(&self, path: &Path) -> PipelineResult<SourceBatch> {
        read_source(path, self.source(), |row, line| {
            let word = row.get("word");
            if word.is_empty() {
                return RowOutcome::Malformed("empty word".to_string());
            }
            RowOutcome::Item(RawVocabularyItem::new(&title_case(word), self.source(), line))
        })
    }

    fn source(&self) -> VocabularySource {
        VocabularySource::Exionnaire
    }
}

/// Hand-maintained list: word, pos, definition, translation
pub struct CuratedAdapter;

impl SourceAdapter for CuratedAdapter {
    fn parse(&self, path: &Path) -> PipelineResult<SourceBatch> {
        read_source(path, self.source(), |row, line| {
            let word = row.get("word");
            if word.is_empty() {
                return RowOutcome::Malformed("empty word".to_string());
            }
            RowOutcome::Item(
                RawVocabularyItem::new(word, self.source(), line)
                    .with_pos(row.get("pos"))
                    .with_definition(row.get("definition"))
                    .with_translation(row.get("translation")),
            )
        })
    }

    fn source(&self) -> VocabularySource {
        VocabularySource::Curated
    }
}

// ============================================================================
// FACTORY FUNCTIONS
// ============================================================================

/// Detect the source from the file name, e.g. "oqlf_termes_officialises.csv"
pub fn detect_source(path: &Path) -> Option<VocabularySource> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_lowercase();

    if filename.contains("oqlf") {
        return Some(VocabularySource::Oqlf);
    }
    if filename.contains("cameleon") || filename.contains("caméléon") {
        return Some(VocabularySource::Cameleon);
    }
    if filename.contains("wiktionary") {
        return Some(VocabularySource::Wiktionary);
    }
    if filename.contains("exionnaire") {
        return Some(VocabularySource::Exionnaire);
    }
    if filename.contains("curated") || filename.contains("manual") {
        return Some(VocabularySource::Curated);
    }
    None
}

/// Factory: adapter for a source
pub fn get_adapter(source: VocabularySource) -> Box<dyn SourceAdapter> {
    match source {
        VocabularySource::Oqlf => Box::new(OqlfAdapter),
        VocabularySource::Cameleon => Box::new(CameleonAdapter),
        VocabularySource::Wiktionary => Box::new(WiktionaryAdapter),
        VocabularySource::Exionnaire => Box::new(ExionnaireAdapter),
        VocabularySource::Curated => Box::new(CuratedAdapter),
    }
}

/// CSV files in `dir` with a recognised source, sorted by path.
/// Unrecognised files are logged and ignored; a missing directory is fatal.
pub fn discover_sources(dir: &Path) -> PipelineResult<Vec<(PathBuf, VocabularySource)>> {
    if !dir.is_dir() {
        return Err(PipelineError::data_source(dir, "sources directory not found"));
    }

    let mut found = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| PipelineError::io(dir, e))? {
        let path = entry.map_err(|e| PipelineError::io(dir, e))?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        match detect_source(&path) {
            Some(source) => found.push((path, source)),
            None => warn!(path = %path.display(), "unrecognised source file, ignoring"),
        }
    }
    found.sort();
    Ok(found)
}

/// Parse every given source file.
pub fn load_sources(files: &[(PathBuf, VocabularySource)]) -> PipelineResult<Vec<SourceBatch>> {
    let mut batches = Vec::new();
    for (path, source) in files {
        let batch = get_adapter(*source).parse(path)?;
        info!("{}", batch.summary());
        batches.push(batch);
    }
    Ok(batches)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn write_source(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_detect_source() {
        assert_eq!(detect_source(Path::new("oqlf_termes_officialises.csv")), Some(VocabularySource::Oqlf));
        assert_eq!(detect_source(Path::new("cameleon_quebecismes.csv")), Some(VocabularySource::Cameleon));
        assert_eq!(detect_source(Path::new("Wiktionary_QC.csv")), Some(VocabularySource::Wiktionary));
        assert_eq!(detect_source(Path::new("random.csv")), None);
    }

    #[test]
    fn test_oqlf_adapter() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_source(
            dir.path(),
            "oqlf.csv",
            "Termes_Officialises,Definition,Equivalent_anglais\n\
             courriel (n. m.),Message électronique,email\n\
             clavardage [Québec],,chat\n\
             ,orphan definition,\n",
        );

        let batch = OqlfAdapter.parse(&path).unwrap();

        assert_eq!(batch.items.len(), 2);
        assert_eq!(batch.items[0].word, "courriel");
        assert_eq!(batch.items[0].part_of_speech, "n. m.");
        assert_eq!(batch.items[0].definition, "Message électronique (en: email)");
        assert_eq!(batch.items[1].word, "clavardage");
        assert_eq!(batch.items[1].definition, "(en: chat)");
        assert_eq!(batch.skipped.len(), 1);
        assert_eq!(batch.skipped[0].line_number, 4);
    }

    #[test]
    fn test_cameleon_strips_gender_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_source(
            dir.path(),
            "cameleon.csv",
            "word,pos,definition\n\"Achalant, E\",ADJ.,Qui dérange\nDépanneur,N.M.,Petite épicerie\n",
        );

        let batch = CameleonAdapter.parse(&path).unwrap();

        assert_eq!(batch.items[0].word, "Achalant");
        assert_eq!(batch.items[0].part_of_speech, "adj.");
        assert_eq!(batch.items[1].definition, "Petite épicerie");
    }

    #[test]
    fn test_wiktionary_filters_codes() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_source(dir.path(), "wiktionary.csv", "word\nQC\n1995\nchum\n\n");

        let batch = WiktionaryAdapter.parse(&path).unwrap();

        assert_eq!(batch.items.len(), 1);
        assert_eq!(batch.items[0].word, "chum");
        assert_eq!(batch.filtered, 2);
    }

    #[test]
    fn test_exionnaire_title_case() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_source(dir.path(), "exionnaire.csv", "word\nDÉPANNEUR\nPATENTE À GOSSE\n");

        let batch = ExionnaireAdapter.parse(&path).unwrap();

        assert_eq!(batch.items[0].word, "Dépanneur");
        assert_eq!(batch.items[1].word, "Patente À Gosse");
    }

    #[test]
    fn test_curated_unknown_columns_default_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_source(dir.path(), "curated.csv", "word,translation\ntuque,шапка\n");

        let batch = CuratedAdapter.parse(&path).unwrap();

        assert_eq!(batch.items[0].translation, "шапка");
        assert_eq!(batch.items[0].definition, "");
        assert_eq!(batch.items[0].part_of_speech, "");
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let err = CuratedAdapter.parse(Path::new("/nonexistent/curated.csv")).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_discover_sources_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write_source(dir.path(), "wiktionary.csv", "word\n");
        write_source(dir.path(), "cameleon.csv", "word\n");
        write_source(dir.path(), "notes.txt", "");
        write_source(dir.path(), "unknown.csv", "word\n");

        let found = discover_sources(dir.path()).unwrap();
        let sources: Vec<VocabularySource> = found.iter().map(|(_, s)| *s).collect();
        assert_eq!(sources, vec![VocabularySource::Cameleon, VocabularySource::Wiktionary]);
    }

    #[test]
    fn test_text_helpers() {
        assert_eq!(title_case("ACHALANT"), "Achalant");
        assert!(is_all_caps("QC"));
        assert!(!is_all_caps("Qc"));
        assert!(!is_all_caps("42"));
        assert_eq!(base_word("Pas pire, pas mal"), "Pas pire, pas mal");
        assert_eq!(base_word("Niaiseux, EUSE"), "Niaiseux");
        assert_eq!(base_word("Achalant, E"), "Achalant");
        assert_eq!(base_word("bine (fam.)"), "bine");
    }
}
