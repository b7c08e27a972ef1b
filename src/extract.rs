// 🗂️ Category Extractor
// Lemma rows grouped by category, ranked by combined frequency, capped.

use crate::artifact::ArtifactWriter;
use crate::config::{ExtractConfig, PipelineConfig};
use crate::error::PipelineResult;
use crate::frequency::{round2, FrequencyWeights};
use crate::lexicon::{Gender, Lexicon, LexiconEntry, Number};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::info;

pub const SELECTION_HEADERS: [&str; 5] = ["lemma", "category", "gender", "frequency", "forms"];

// ============================================================================
// CORE TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionRow {
    pub lemma: String,
    pub category: String,
    pub gender: String,
    pub frequency: f64,
    pub forms: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CategorySelection {
    pub category: String,
    pub rows: Vec<SelectionRow>,
}

impl CategorySelection {
    /// Output file name: ':' is not portable in file names
    pub fn file_name(&self) -> String {
        format!("{}.csv", self.category.replace(':', "_"))
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ============================================================================
// RANKING
// ============================================================================

/// Descending combined frequency, ties by ascending surface form
pub fn rank_order(a: (&str, f64), b: (&str, f64)) -> Ordering {
    b.1.partial_cmp(&a.1)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.0.cmp(b.0))
}

/// Build one selection per category, sorted by category name.
pub fn extract_categories(
    lexicon: &Lexicon,
    config: &ExtractConfig,
    weights: &FrequencyWeights,
) -> Vec<CategorySelection> {
    let mut groups: BTreeMap<String, Vec<&LexiconEntry>> = BTreeMap::new();
    for entry in lexicon.lemmas() {
        if entry.category.is_empty() {
            continue;
        }
        groups.entry(entry.category.clone()).or_default().push(entry);
    }

    let mut selections = Vec::new();
    for (category, mut entries) in groups {
        entries.sort_by(|a, b| {
            rank_order(
                (a.surface_form.as_str(), a.combined_frequency(weights)),
                (b.surface_form.as_str(), b.combined_frequency(weights)),
            )
        });

        let mut seen = HashSet::new();
        let mut rows = Vec::new();
        for entry in entries {
            if !seen.insert(entry.lemma.clone()) {
                continue;
            }
            let siblings = lexicon.siblings(&entry.lemma, &entry.category);
            rows.push(SelectionRow {
                lemma: entry.lemma.clone(),
                category: category.clone(),
                gender: entry.gender.map(|g| g.code().to_string()).unwrap_or_default(),
                frequency: round2(entry.combined_frequency(weights)),
                forms: format_forms(&entry.lemma, &siblings),
            });
        }

        if config.is_capped(&category) {
            rows.truncate(config.top_n);
        }

        selections.push(CategorySelection { category, rows });
    }

    info!(categories = selections.len(), "extracted category selections");
    selections
}

/// Find a selection by category tag
pub fn selection<'a>(
    selections: &'a [CategorySelection],
    category: &str,
) -> Option<&'a CategorySelection> {
    selections.iter().find(|s| s.category == category)
}

// ============================================================================
// FORMS SUMMARY
// ============================================================================

/// Summarise an inflection family: "m.sg/f.sg m.pl/f.pl", "m/f", "sg, pl",
/// or a single form.
pub fn format_forms(lemma: &str, siblings: &[&LexiconEntry]) -> String {
    let find = |gender: Option<Gender>, number: Option<Number>| {
        siblings
            .iter()
            .find(|e| e.gender == gender && e.number == number)
            .map(|e| e.surface_form.as_str())
    };
    let masc = Some(Gender::Masculine);
    let fem = Some(Gender::Feminine);
    let sg = Some(Number::Singular);
    let pl = Some(Number::Plural);

    let mut ms = find(masc, sg).or_else(|| find(None, sg));
    let mut fs = find(fem, sg);
    let mp = find(masc, pl).or_else(|| find(None, pl));
    let fp = find(fem, pl);

    if ms.is_none() && mp.is_none() {
        ms = find(masc, None).or_else(|| find(None, None));
    }
    if fs.is_none() && fp.is_none() {
        fs = find(fem, None);
    }

    let mut distinct: Vec<&str> = [ms, fs, mp, fp].iter().flatten().copied().collect();
    distinct.sort_unstable();
    distinct.dedup();

    match distinct.len() {
        0 => return lemma.to_string(),
        1 => return distinct[0].to_string(),
        _ => {}
    }

    let differs = |a: Option<&str>, b: Option<&str>| matches!((a, b), (Some(x), Some(y)) if x != y);
    let gender_diff = differs(ms, fs);
    let number_diff = differs(ms, mp) || differs(fs, fp);

    let pair = |a: Option<&str>, b: Option<&str>| -> Option<String> {
        match (a, b) {
            (Some(x), Some(y)) => Some(format!("{}/{}", x, y)),
            (Some(x), None) | (None, Some(x)) => Some(x.to_string()),
            (None, None) => None,
        }
    };

    if gender_diff && number_diff {
        let singular = pair(ms, fs).unwrap_or_default();
        match pair(mp, fp) {
            Some(plural) => format!("{} {}", singular, plural),
            None => singular,
        }
    } else if gender_diff {
        format!("{}/{}", ms.unwrap_or(""), fs.unwrap_or(""))
    } else if number_diff {
        format!(
            "{}, {}",
            ms.or(fs).unwrap_or(""),
            mp.or(fp).unwrap_or("")
        )
    } else {
        distinct[0].to_string()
    }
}

// ============================================================================
// ARTIFACTS
// ============================================================================

/// Write one CSV per large category and collect small ones into other.csv.
pub fn write_selections(
    selections: &[CategorySelection],
    dir: &Path,
    config: &PipelineConfig,
    writer: &ArtifactWriter,
) -> PipelineResult<Vec<PathBuf>> {
    let mut written = Vec::new();
    let mut other: Vec<&SelectionRow> = Vec::new();

    for selection in selections {
        if selection.len() < config.extract.min_category_size {
            // selections are sorted by category, rows by rank
            other.extend(selection.rows.iter());
            continue;
        }

        let path = dir.join(selection.file_name());
        writer.write_csv(&path, &SELECTION_HEADERS, &selection.rows)?;
        written.push(path);
    }

    if !other.is_empty() {
        let path = dir.join("other.csv");
        writer.write_csv(&path, &SELECTION_HEADERS, &other)?;
        written.push(path);
    }

    Ok(written)
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn lemma(form: &str, category: &str, film: f64, book: f64) -> LexiconEntry {
        LexiconEntry::new(form, form, category)
            .with_frequencies(film, book)
            .as_lemma()
    }

    fn small_config(top_n: usize) -> ExtractConfig {
        ExtractConfig {
            top_n,
            ..ExtractConfig::default()
        }
    }

    #[test]
    fn test_rank_and_cap() {
        let lexicon = Lexicon::from_entries(vec![
            lemma("manger", "VER", 10.0, 10.0),
            lemma("aller", "VER", 100.0, 100.0),
            lemma("finir", "VER", 50.0, 50.0),
            lemma("boire", "VER", 10.0, 10.0),
        ]);

        let selections = extract_categories(&lexicon, &small_config(3), &FrequencyWeights::default());
        let verbs = selection(&selections, "VER").unwrap();

        let lemmas: Vec<&str> = verbs.rows.iter().map(|r| r.lemma.as_str()).collect();
        // tie between boire and manger broken by surface form
        assert_eq!(lemmas, vec!["aller", "finir", "boire"]);
        assert_eq!(verbs.rows[0].frequency, 100.0);
    }

    #[test]
    fn test_uncapped_category_passes_through() {
        let entries = (0..5).map(|i| lemma(&format!("prep{}", i), "PRE", i as f64, 0.0)).collect();
        let lexicon = Lexicon::from_entries(entries);

        let selections = extract_categories(&lexicon, &small_config(2), &FrequencyWeights::default());
        assert_eq!(selection(&selections, "PRE").unwrap().len(), 5);
    }

    #[test]
    fn test_lemma_once_per_category() {
        let lexicon = Lexicon::from_entries(vec![
            lemma("être", "VER", 10.0, 0.0),
            lemma("être", "VER", 5.0, 0.0),
            lemma("être", "AUX", 50.0, 0.0),
        ]);

        let selections = extract_categories(&lexicon, &small_config(10), &FrequencyWeights::default());

        let verbs = selection(&selections, "VER").unwrap();
        assert_eq!(verbs.len(), 1);
        assert_eq!(verbs.rows[0].frequency, 6.0);
        assert_eq!(selection(&selections, "AUX").unwrap().len(), 1);
    }

    #[test]
    fn test_inflected_rows_not_selected() {
        let lexicon = Lexicon::from_entries(vec![
            lemma("chat", "NOM", 10.0, 0.0),
            LexiconEntry::new("chats", "chat", "NOM").with_frequencies(10.0, 0.0),
        ]);

        let selections = extract_categories(&lexicon, &small_config(10), &FrequencyWeights::default());
        assert_eq!(selection(&selections, "NOM").unwrap().len(), 1);
    }

    #[test]
    fn test_format_forms_four_way() {
        let family = vec![
            LexiconEntry::new("beau", "beau", "ADJ").with_gender(Gender::Masculine).with_number(Number::Singular),
            LexiconEntry::new("belle", "beau", "ADJ").with_gender(Gender::Feminine).with_number(Number::Singular),
            LexiconEntry::new("beaux", "beau", "ADJ").with_gender(Gender::Masculine).with_number(Number::Plural),
            LexiconEntry::new("belles", "beau", "ADJ").with_gender(Gender::Feminine).with_number(Number::Plural),
        ];
        let refs: Vec<&LexiconEntry> = family.iter().collect();

        assert_eq!(format_forms("beau", &refs), "beau/belle beaux/belles");
    }

    #[test]
    fn test_format_forms_number_only_and_single() {
        let family = vec![
            LexiconEntry::new("chat", "chat", "NOM").with_gender(Gender::Masculine).with_number(Number::Singular),
            LexiconEntry::new("chats", "chat", "NOM").with_gender(Gender::Masculine).with_number(Number::Plural),
        ];
        let refs: Vec<&LexiconEntry> = family.iter().collect();
        assert_eq!(format_forms("chat", &refs), "chat, chats");

        let single = vec![LexiconEntry::new("vite", "vite", "ADV")];
        let refs: Vec<&LexiconEntry> = single.iter().collect();
        assert_eq!(format_forms("vite", &refs), "vite");
        assert_eq!(format_forms("rien", &[]), "rien");
    }

    #[test]
    fn test_small_categories_go_to_other() {
        let dir = tempfile::tempdir().unwrap();
        let lexicon = Lexicon::from_entries(vec![
            lemma("chat", "NOM", 10.0, 0.0),
            lemma("chien", "NOM", 20.0, 0.0),
            lemma("et", "CON", 90.0, 0.0),
            lemma("dans", "PRE", 80.0, 0.0),
        ]);
        let mut config = PipelineConfig::default();
        config.extract.min_category_size = 2;

        let selections = extract_categories(&lexicon, &config.extract, &config.weights);
        let paths = write_selections(&selections, dir.path(), &config, &ArtifactWriter::default()).unwrap();

        assert_eq!(paths.len(), 2);
        assert!(dir.path().join("NOM.csv").exists());

        let other = std::fs::read_to_string(dir.path().join("other.csv")).unwrap();
        let lines: Vec<&str> = other.lines().collect();
        assert_eq!(lines[0], "lemma,category,gender,frequency,forms");
        assert!(lines[1].starts_with("et,CON"));
        assert!(lines[2].starts_with("dans,PRE"));
    }

    #[test]
    fn test_file_name_replaces_colon() {
        let selection = CategorySelection {
            category: "ADJ:NUM".to_string(),
            rows: Vec::new(),
        };
        assert_eq!(selection.file_name(), "ADJ_NUM.csv");
    }
}
