// 🚂 Pipeline stages
// Loader → Extractor → Classifiers → Merger → Assembler. Each stage takes the
// previous stage's snapshot in memory and writes its own artifacts.

use crate::artifact::{read_word_list, ArtifactWriter};
use crate::assemble::{unused_authored_files, CardAssembler, DeckOutcome};
use crate::classify::{classify_lexicon, load_known_homographs, write_report, ClassificationReport};
use crate::config::PipelineConfig;
use crate::deduplication::{read_merged, write_snapshot, ExternalVocabularyItem, FrequencyIndex, VocabularyMerger};
use crate::error::PipelineResult;
use crate::external::{discover_sources, load_sources};
use crate::extract::{extract_categories, write_selections, CategorySelection};
use crate::lexicon::{load_lexicon, Lexicon};
use crate::skeleton::{write_skeletons, Skeletons};
use crate::summary::{Issue, IssueKind, RunSummary};
use tracing::warn;

pub struct Pipeline {
    pub config: PipelineConfig,
    pub writer: ArtifactWriter,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, writer: ArtifactWriter) -> Self {
        Pipeline { config, writer }
    }

    pub fn load_lexicon(&self) -> PipelineResult<Lexicon> {
        load_lexicon(&self.config.paths.lexicon)
    }

    // ========================================================================
    // STAGES
    // ========================================================================

    /// Extract category selections and write them
    pub fn extract(&self, lexicon: &Lexicon, summary: &mut RunSummary) -> PipelineResult<Vec<CategorySelection>> {
        let selections = extract_categories(lexicon, &self.config.extract, &self.config.weights);
        let written = write_selections(&selections, &self.config.categories_dir(), &self.config, &self.writer)?;

        summary.count("selected lemmas", selections.iter().map(|s| s.len()).sum());
        summary.count("category files", written.len());
        Ok(selections)
    }

    /// Run the classifiers, write their artifacts, report open exceptions
    pub fn classify(&self, lexicon: &Lexicon, summary: &mut RunSummary) -> PipelineResult<ClassificationReport> {
        let known = load_known_homographs(self.config.classify.known_homographs.as_deref())?;
        let report = classify_lexicon(lexicon, &self.config, &known);
        write_report(&report, &self.config.classified_dir(), &self.writer)?;

        for issue in report.issues() {
            summary.record(issue);
        }
        summary.count("exceptions", report.exceptions().len());
        Ok(report)
    }

    /// Parse every source file, merge, rank and write the snapshot
    pub fn merge_external(
        &self,
        lexicon: &Lexicon,
        summary: &mut RunSummary,
    ) -> PipelineResult<Vec<ExternalVocabularyItem>> {
        let files = discover_sources(&self.config.paths.sources_dir)?;
        let batches = load_sources(&files)?;

        for batch in &batches {
            for skipped in &batch.skipped {
                summary.record(Issue::new(
                    IssueKind::SkippedRow,
                    "merge-external",
                    &format!("{}:{}", batch.source.code(), skipped.line_number),
                    &skipped.reason,
                ));
            }
        }

        let frequencies = FrequencyIndex::from_lexicon(lexicon, &self.config.weights);
        let items = VocabularyMerger::from_config(&self.config.external).merge_and_rank(&batches, &frequencies);
        write_snapshot(&items, &batches, &self.config.external_dir(), &self.writer)?;

        summary.count("external items", items.len());
        Ok(items)
    }

    /// Build skeletons, join with authored content, write the card files
    pub fn build_cards(
        &self,
        selections: &[CategorySelection],
        report: &ClassificationReport,
        external: &[ExternalVocabularyItem],
        summary: &mut RunSummary,
    ) -> PipelineResult<Vec<DeckOutcome>> {
        let blacklist = read_word_list(self.config.assemble.blacklist.as_deref(), "blacklist")?;
        let skeletons = Skeletons::build(selections, report, external, &blacklist);
        write_skeletons(&skeletons, &self.config.cards_dir(), &self.writer)?;
        for issue in skeletons.issues() {
            summary.record(issue);
        }

        unused_authored_files(&self.config.paths.authored_dir);
        CardAssembler::from_config(&self.config, self.writer).assemble(&skeletons, summary)
    }

    /// Assemble from the lexicon and the last external snapshot on disk
    pub fn assemble(&self, lexicon: &Lexicon, summary: &mut RunSummary) -> PipelineResult<Vec<DeckOutcome>> {
        let selections = extract_categories(lexicon, &self.config.extract, &self.config.weights);
        let known = load_known_homographs(self.config.classify.known_homographs.as_deref())?;
        let report = classify_lexicon(lexicon, &self.config, &known);
        let external = read_merged(&self.config.external_dir().join("merged.csv"))?;

        self.build_cards(&selections, &report, &external, summary)
    }

    /// Every stage in order. Without a sources directory the external stage
    /// falls back to the last snapshot.
    pub fn run(&self, lexicon: &Lexicon, summary: &mut RunSummary) -> PipelineResult<Vec<DeckOutcome>> {
        let selections = self.extract(lexicon, summary)?;
        let report = self.classify(lexicon, summary)?;

        let external = if self.config.paths.sources_dir.is_dir() {
            self.merge_external(lexicon, summary)?
        } else {
            warn!(
                path = %self.config.paths.sources_dir.display(),
                "no external sources directory, using last snapshot"
            );
            read_merged(&self.config.external_dir().join("merged.csv"))?
        };

        self.build_cards(&selections, &report, &external, summary)
    }
}
