// ⚙️ Pipeline Configuration
// Built once at startup and passed by reference to every stage.

use crate::frequency::FrequencyWeights;
use crate::rules::SuffixRuleTable;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

// ============================================================================
// ROOT CONFIG
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub weights: FrequencyWeights,
    pub extract: ExtractConfig,
    pub classify: ClassifyConfig,
    pub external: ExternalConfig,
    pub assemble: AssembleConfig,
}

impl PipelineConfig {
    /// Load configuration from a JSON file. Missing keys fall back to defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: PipelineConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config JSON: {}", path.display()))?;

        Ok(config)
    }

    /// Directory holding per-category selections
    pub fn categories_dir(&self) -> PathBuf {
        self.paths.out_dir.join("categories")
    }

    /// Directory holding classifier artifacts
    pub fn classified_dir(&self) -> PathBuf {
        self.paths.out_dir.join("classified")
    }

    /// Directory holding the merged external vocabulary snapshot
    pub fn external_dir(&self) -> PathBuf {
        self.paths.out_dir.join("external")
    }

    /// Directory holding assembled card files
    pub fn cards_dir(&self) -> PathBuf {
        self.paths.out_dir.join("cards")
    }
}

// ============================================================================
// SECTIONS
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Lexique383-style TSV
    pub lexicon: PathBuf,

    /// Root of every artifact the pipeline writes
    pub out_dir: PathBuf,

    /// Downloaded external word lists (one CSV per source)
    pub sources_dir: PathBuf,

    /// Hand-authored card content (vocabulary.csv, conjugation.csv, expressions.csv)
    pub authored_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        PathsConfig {
            lexicon: PathBuf::from("data/Lexique383.tsv"),
            out_dir: PathBuf::from("output"),
            sources_dir: PathBuf::from("data/external"),
            authored_dir: PathBuf::from("content"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractConfig {
    /// Maximum rows kept for each capped category
    pub top_n: usize,

    /// High-volume categories truncated to `top_n`
    pub capped_categories: Vec<String>,

    /// Categories with fewer rows are collected into other.csv
    pub min_category_size: usize,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        ExtractConfig {
            top_n: 10_000,
            capped_categories: ["NOM", "VER", "ADJ", "ADV"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_category_size: 100,
        }
    }
}

impl ExtractConfig {
    pub fn is_capped(&self, category: &str) -> bool {
        self.capped_categories.iter().any(|c| c == category)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifyConfig {
    /// Lemmas below this combined frequency are ignored by every pass
    pub min_frequency: f64,

    /// Optional list of known gender homographs, one lemma per line
    pub known_homographs: Option<PathBuf>,

    pub profession_rules: SuffixRuleTable,
    pub adjective_rules: SuffixRuleTable,

    /// Pre-vowel adjective variants that are not separate lemmas
    pub liaison_forms: Vec<String>,

    /// Compound lemma spellings mapped to their base lemma
    pub compound_lemmas: BTreeMap<String, String>,

    /// Notes attached to irregular verbs
    pub verb_notes: BTreeMap<String, String>,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        ClassifyConfig {
            min_frequency: 0.0,
            known_homographs: None,
            profession_rules: SuffixRuleTable::professions(),
            adjective_rules: SuffixRuleTable::adjectives(),
            liaison_forms: ["bel", "vieil", "nouvel", "fol", "mol"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            compound_lemmas: [("mou,mol", "mou")]
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            verb_notes: default_verb_notes(),
        }
    }
}

fn default_verb_notes() -> BTreeMap<String, String> {
    [
        ("être", "auxiliaire"),
        ("avoir", "auxiliaire"),
        ("aller", "3e groupe (-er exception)"),
        ("pouvoir", "-oir (je peux, je pourrai)"),
        ("vouloir", "-oir (je veux, je voudrai)"),
        ("savoir", "-oir (je sais, je saurai)"),
        ("devoir", "-oir (je dois, je devrai)"),
        ("voir", "-oir (je vois, je verrai)"),
        ("recevoir", "-cevoir (je reçois)"),
        ("falloir", "-oir impersonnel (il faut)"),
        ("venir", "-enir (je viens, je viendrai)"),
        ("tenir", "-enir (je tiens, je tiendrai)"),
        ("partir", "-tir (je pars)"),
        ("sortir", "-tir (je sors)"),
        ("dormir", "-mir (je dors)"),
        ("courir", "-ourir (je cours, je courrai)"),
        ("mourir", "-ourir (je meurs, je mourrai)"),
        ("ouvrir", "-vrir (j'ouvre) - comme -er"),
        ("prendre", "-endre (je prends)"),
        ("mettre", "-ettre (je mets)"),
        ("faire", "très irrégulier (je fais, je ferai)"),
        ("dire", "irrégulier (je dis, vous dites)"),
        ("écrire", "-ire (j'écris)"),
        ("conduire", "-uire (je conduis)"),
        ("vivre", "-ivre (je vis)"),
        ("boire", "irrégulier (je bois, nous buvons)"),
        ("croire", "-oire (je crois)"),
        ("connaître", "-aître (je connais)"),
        ("craindre", "-aindre (je crains)"),
        ("résoudre", "-oudre (je résous)"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalConfig {
    /// Drop merged items that ended up without a definition
    pub require_definition: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AssembleConfig {
    /// Directory of generated `<slug>.mp3` files used to fill the Audio field
    pub audio_dir: Option<PathBuf>,

    /// Lemmas never carded, one per line
    pub blacklist: Option<PathBuf>,
}

// ============================================================================
// TESTS
// ============================================================================
