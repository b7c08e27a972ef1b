// Lexique Deck - Core Library
// Lexicon-to-flashcard content pipeline, exposed for the CLI and tests

pub mod artifact;
pub mod assemble;       // Card Assembler
pub mod classify;       // Irregularity Classifiers
pub mod config;
pub mod deduplication;  // External Vocabulary Merger
pub mod error;
pub mod external;       // Source adapters
pub mod extract;        // Category Extractor
pub mod frequency;      // Frequency Scorer
pub mod lexicon;        // Lexicon Loader
pub mod pipeline;
pub mod rules;          // Suffix rule tables
pub mod skeleton;
pub mod summary;

// Re-export commonly used types
pub use artifact::{ArtifactWriter, WriteOutcome};
pub use assemble::{
    join_cards, Card, CardAssembler, CardRecord, CardType, ConjugationCard, DeckOutcome,
    JoinOutcome, VocabularyCard,
};
pub use classify::{
    classify_lexicon, ClassificationReport, ClassifiedException, ExceptionKind, ExceptionStatus,
    Review,
};
pub use config::PipelineConfig;
pub use deduplication::{
    ExternalVocabularyItem, FrequencyIndex, Priority, SnapshotManifest, VocabularyMerger,
};
pub use error::{PipelineError, PipelineResult};
pub use external::{
    detect_source, get_adapter, RawVocabularyItem, SourceAdapter, SourceBatch, VocabularySource,
};
pub use extract::{extract_categories, CategorySelection, SelectionRow};
pub use frequency::{combined_frequency, FrequencyWeights};
pub use lexicon::{load_lexicon, Gender, Lexicon, LexiconEntry, Number};
pub use pipeline::Pipeline;
pub use rules::{SuffixRule, SuffixRuleTable};
pub use skeleton::Skeletons;
pub use summary::{Issue, IssueKind, RunSummary, Severity};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
