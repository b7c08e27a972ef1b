// 💾 Artifact writer
// Every stage writes a complete CSV/JSON snapshot; re-runs overwrite unless
// `skip_existing` is set.

use crate::error::{PipelineError, PipelineResult};
use csv::WriterBuilder;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written(usize),
    Skipped,
}

impl WriteOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, WriteOutcome::Written(_))
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactWriter {
    pub skip_existing: bool,
}

impl ArtifactWriter {
    pub fn new(skip_existing: bool) -> Self {
        ArtifactWriter { skip_existing }
    }

    /// Write `records` under an explicit header row, so empty artifacts still
    /// carry their columns.
    pub fn write_csv<T: Serialize>(
        &self,
        path: &Path,
        headers: &[&str],
        records: &[T],
    ) -> PipelineResult<WriteOutcome> {
        if self.should_skip(path) {
            return Ok(WriteOutcome::Skipped);
        }
        ensure_parent(path)?;

        let mut writer = WriterBuilder::new()
            .has_headers(false)
            .from_path(path)
            .map_err(|e| PipelineError::csv(path, e))?;

        writer
            .write_record(headers)
            .map_err(|e| PipelineError::csv(path, e))?;
        for record in records {
            writer
                .serialize(record)
                .map_err(|e| PipelineError::csv(path, e))?;
        }
        writer.flush().map_err(|e| PipelineError::io(path, e))?;

        info!(path = %path.display(), rows = records.len(), "wrote artifact");
        Ok(WriteOutcome::Written(records.len()))
    }

    pub fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> PipelineResult<WriteOutcome> {
        if self.should_skip(path) {
            return Ok(WriteOutcome::Skipped);
        }
        ensure_parent(path)?;

        let json = serde_json::to_string_pretty(value)
            .map_err(|e| PipelineError::data_source(path, format!("serialize failed: {}", e)))?;
        fs::write(path, json).map_err(|e| PipelineError::io(path, e))?;

        info!(path = %path.display(), "wrote manifest");
        Ok(WriteOutcome::Written(1))
    }

    fn should_skip(&self, path: &Path) -> bool {
        let skip = self.skip_existing && path.exists();
        if skip {
            debug!(path = %path.display(), "artifact exists, skipping");
        }
        skip
    }
}

/// One word per line, first CSV column only. Header lines (`lemme`, `lemma`,
/// `word`), blank lines and `#` comments are skipped. A missing file logs a
/// warning and reads as empty.
pub fn read_word_list(path: Option<&Path>, what: &str) -> PipelineResult<HashSet<String>> {
    let path = match path {
        Some(p) => p,
        None => return Ok(HashSet::new()),
    };

    if !path.exists() {
        warn!(path = %path.display(), "{} file not found, continuing without it", what);
        return Ok(HashSet::new());
    }

    let content = fs::read_to_string(path).map_err(|e| PipelineError::io(path, e))?;
    let words: HashSet<String> = content
        .lines()
        .filter_map(|line| line.split(',').next())
        .map(str::trim)
        .filter(|w| !w.is_empty() && !w.starts_with('#'))
        .filter(|w| !["lemme", "lemma", "word"].contains(w))
        .map(str::to_string)
        .collect();

    debug!(path = %path.display(), count = words.len(), "read {}", what);
    Ok(words)
}

fn ensure_parent(path: &Path) -> PipelineResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| PipelineError::io(parent, e))?;
        }
    }
    Ok(())
}
