// 📚 Lexicon Loader
// Reads a Lexique383-style TSV into typed rows. Read-only after load.

use crate::error::{PipelineError, PipelineResult};
use crate::frequency::FrequencyWeights;
use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const REQUIRED_COLUMNS: [&str; 8] = [
    "ortho",
    "lemme",
    "cgram",
    "genre",
    "nombre",
    "freqlemfilms2",
    "freqlemlivres",
    "islem",
];

// ============================================================================
// CORE TYPES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Gender {
    Masculine,
    Feminine,
}

impl Gender {
    /// Parse a Lexique `genre` cell ("m", "f", or empty)
    pub fn parse(raw: &str) -> Option<Gender> {
        match raw.trim().to_uppercase().as_str() {
            "M" => Some(Gender::Masculine),
            "F" => Some(Gender::Feminine),
            _ => None,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Gender::Masculine => "m",
            Gender::Feminine => "f",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Number {
    Singular,
    Plural,
}

impl Number {
    pub fn parse(raw: &str) -> Option<Number> {
        match raw.trim().to_uppercase().as_str() {
            "S" => Some(Number::Singular),
            "P" => Some(Number::Plural),
            _ => None,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Number::Singular => "s",
            Number::Plural => "p",
        }
    }
}

/// One row of the lexicon: a surface form with its lemma and attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LexiconEntry {
    pub surface_form: String,
    pub lemma: String,
    pub category: String,
    pub gender: Option<Gender>,
    pub number: Option<Number>,
    pub film_frequency: f64,
    pub book_frequency: f64,
    pub is_lemma: bool,

    // Optional columns
    pub verb_info: Option<String>,
    pub homograph_count: Option<u32>,
}

impl LexiconEntry {
    pub fn new(surface_form: &str, lemma: &str, category: &str) -> Self {
        LexiconEntry {
            surface_form: surface_form.to_string(),
            lemma: lemma.to_string(),
            category: normalize_tag(category),
            gender: None,
            number: None,
            film_frequency: 0.0,
            book_frequency: 0.0,
            is_lemma: false,
            verb_info: None,
            homograph_count: None,
        }
    }

    /// Builder pattern: set gender
    pub fn with_gender(mut self, gender: Gender) -> Self {
        self.gender = Some(gender);
        self
    }

    /// Builder pattern: set number
    pub fn with_number(mut self, number: Number) -> Self {
        self.number = Some(number);
        self
    }

    /// Builder pattern: set both corpus frequencies
    pub fn with_frequencies(mut self, film: f64, book: f64) -> Self {
        self.film_frequency = film;
        self.book_frequency = book;
        self
    }

    /// Builder pattern: mark as lemma row
    pub fn as_lemma(mut self) -> Self {
        self.is_lemma = true;
        self
    }

    /// Builder pattern: set `infover`
    pub fn with_verb_info(mut self, info: &str) -> Self {
        self.verb_info = Some(info.to_string());
        self
    }

    pub fn combined_frequency(&self, weights: &FrequencyWeights) -> f64 {
        weights.combine(self.film_frequency, self.book_frequency)
    }

    pub fn is_present_participle(&self) -> bool {
        self.verb_info
            .as_deref()
            .map(|info| info.split(';').any(|part| part.trim() == "par:pre"))
            .unwrap_or(false)
    }
}

// ============================================================================
// LEXICON
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    source: PathBuf,
    entries: Vec<LexiconEntry>,
    families: HashMap<(String, String), Vec<usize>>,
}

impl Lexicon {
    pub fn from_entries(entries: Vec<LexiconEntry>) -> Self {
        let mut families: HashMap<(String, String), Vec<usize>> = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            families
                .entry((entry.lemma.clone(), entry.category.clone()))
                .or_default()
                .push(idx);
        }

        Lexicon {
            source: PathBuf::new(),
            entries,
            families,
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Every row, inflected forms included
    pub fn entries(&self) -> &[LexiconEntry] {
        &self.entries
    }

    /// Rows flagged as lemmas
    pub fn lemmas(&self) -> impl Iterator<Item = &LexiconEntry> {
        self.entries.iter().filter(|e| e.is_lemma)
    }

    /// All rows sharing `(lemma, category)`, in file order
    pub fn siblings(&self, lemma: &str, category: &str) -> Vec<&LexiconEntry> {
        self.families
            .get(&(lemma.to_string(), category.to_string()))
            .map(|idxs| idxs.iter().map(|&i| &self.entries[i]).collect())
            .unwrap_or_default()
    }

    /// Surface form of the verb's present participle, if the lexicon lists one
    pub fn present_participle(&self, lemma: &str) -> Option<&str> {
        self.siblings(lemma, "VER")
            .into_iter()
            .find(|e| e.is_present_participle())
            .map(|e| e.surface_form.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Trim and upper-case a category or gender tag
pub fn normalize_tag(raw: &str) -> String {
    raw.trim().to_uppercase()
}

fn parse_frequency(raw: &str) -> f64 {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .unwrap_or(0.0)
}

fn parse_flag(raw: &str) -> bool {
    let raw = raw.trim();
    raw == "1" || raw.eq_ignore_ascii_case("true")
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

// ============================================================================
// LOADER
// ============================================================================

/// Load the lexicon TSV. A missing file, a missing required column, or a
/// malformed row aborts the run.
pub fn load_lexicon(path: &Path) -> PipelineResult<Lexicon> {
    if !path.exists() {
        return Err(PipelineError::data_source(path, "file not found"));
    }

    let file = File::open(path).map_err(|e| PipelineError::io(path, e))?;
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .quoting(false)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| PipelineError::csv(path, e))?
        .clone();

    let column = |name: &str| headers.iter().position(|h| h.trim() == name);

    let missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|name| column(name).is_none())
        .collect();
    if !missing.is_empty() {
        return Err(PipelineError::data_source(
            path,
            format!("missing required column(s): {}", missing.join(", ")),
        ));
    }

    // Checked above
    let idx = |name: &str| column(name).unwrap_or(usize::MAX);
    let (ortho, lemme, cgram, genre, nombre) = (
        idx("ortho"),
        idx("lemme"),
        idx("cgram"),
        idx("genre"),
        idx("nombre"),
    );
    let (films, livres, islem) = (idx("freqlemfilms2"), idx("freqlemlivres"), idx("islem"));
    let infover = column("infover");
    let nbhomogr = column("nbhomogr");

    let mut entries = Vec::new();
    for (row_num, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            PipelineError::data_source(path, format!("malformed row at line {}: {}", row_num + 2, e))
        })?;

        let field = |i: usize| record.get(i).unwrap_or("");

        let mut entry = LexiconEntry::new(field(ortho).trim(), field(lemme).trim(), field(cgram));
        entry.gender = Gender::parse(field(genre));
        entry.number = Number::parse(field(nombre));
        entry.film_frequency = parse_frequency(field(films));
        entry.book_frequency = parse_frequency(field(livres));
        entry.is_lemma = parse_flag(field(islem));
        entry.verb_info = infover.and_then(|i| non_empty(field(i)));
        entry.homograph_count = nbhomogr.and_then(|i| field(i).trim().parse::<u32>().ok());

        entries.push(entry);
    }

    let mut lexicon = Lexicon::from_entries(entries);
    lexicon.source = path.to_path_buf();

    debug!(path = %path.display(), "lexicon parsed");
    info!(
        rows = lexicon.len(),
        lemmas = lexicon.lemmas().count(),
        "loaded lexicon"
    );

    Ok(lexicon)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str =
        "ortho\tlemme\tcgram\tgenre\tnombre\tfreqlemfilms2\tfreqlemlivres\tinfover\tislem\tnbhomogr";

    fn write_lexicon(rows: &[&str]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        for row in rows {
            writeln!(file, "{}", row).unwrap();
        }
        file
    }

    #[test]
    fn test_load_typed_rows() {
        let file = write_lexicon(&[
            "acteur\tacteur\tNOM\tm\ts\t12.5\t20.1\t\t1\t1",
            "actrice\tactrice\tNOM\tf\ts\t3.2\t4\t\t1\t1",
            "finissant\tfinir\tVER\t\t\t60\t40\tpar:pre;\t0\t1",
            "oui\toui\tADV\t\t\tabc\t\t\t1\t",
        ]);

        let lexicon = load_lexicon(file.path()).unwrap();

        assert_eq!(lexicon.len(), 4);
        assert_eq!(lexicon.lemmas().count(), 3);

        let acteur = &lexicon.entries()[0];
        assert_eq!(acteur.gender, Some(Gender::Masculine));
        assert_eq!(acteur.number, Some(Number::Singular));
        assert_eq!(acteur.film_frequency, 12.5);
        assert_eq!(acteur.homograph_count, Some(1));

        // Unparseable and empty numbers coerce to zero
        let oui = &lexicon.entries()[3];
        assert_eq!(oui.film_frequency, 0.0);
        assert_eq!(oui.book_frequency, 0.0);
        assert_eq!(oui.gender, None);

        assert_eq!(lexicon.present_participle("finir"), Some("finissant"));
    }

    #[test]
    fn test_missing_file_is_data_source_error() {
        let err = load_lexicon(Path::new("/nonexistent/Lexique383.tsv")).unwrap_err();
        assert!(matches!(err, PipelineError::DataSource { .. }));
    }

    #[test]
    fn test_missing_column_is_named() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "ortho\tlemme\tcgram\tgenre\tnombre\tfreqlemfilms2\tislem").unwrap();
        writeln!(file, "chat\tchat\tNOM\tm\ts\t10\t1").unwrap();

        let err = load_lexicon(file.path()).unwrap_err();
        assert!(err.to_string().contains("freqlemlivres"));
    }

    #[test]
    fn test_optional_columns_absent() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "ortho\tlemme\tcgram\tgenre\tnombre\tfreqlemfilms2\tfreqlemlivres\tislem"
        )
        .unwrap();
        writeln!(file, "chat\tchat\tnom\tm\ts\t10\t5\ttrue").unwrap();

        let lexicon = load_lexicon(file.path()).unwrap();
        let chat = &lexicon.entries()[0];

        assert_eq!(chat.category, "NOM");
        assert!(chat.is_lemma);
        assert_eq!(chat.verb_info, None);
        assert_eq!(chat.homograph_count, None);
    }

    #[test]
    fn test_malformed_row_reports_line() {
        let file = write_lexicon(&[
            "chat\tchat\tNOM\tm\ts\t10\t5\t\t1\t1",
            "chien\tchien\tNOM",
        ]);

        let err = load_lexicon(file.path()).unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn test_siblings_by_lemma_and_category() {
        let lexicon = Lexicon::from_entries(vec![
            LexiconEntry::new("beau", "beau", "ADJ").with_gender(Gender::Masculine).as_lemma(),
            LexiconEntry::new("belle", "beau", "ADJ").with_gender(Gender::Feminine),
            LexiconEntry::new("beau", "beau", "NOM").with_gender(Gender::Masculine),
        ]);

        assert_eq!(lexicon.siblings("beau", "ADJ").len(), 2);
        assert_eq!(lexicon.siblings("beau", "NOM").len(), 1);
        assert!(lexicon.siblings("laid", "ADJ").is_empty());
    }
}
