// 🚨 Error taxonomy for the pipeline
//
// Fatal conditions are `PipelineError` values. Everything that should only be
// counted and reported at the end of a run lives in `summary::Issue`.

use std::path::{Path, PathBuf};

// ============================================================================
// PIPELINE ERROR
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Missing or malformed required input. Aborts the run.
    #[error("data source {}: {reason}", path.display())]
    DataSource { path: PathBuf, reason: String },

    /// Two records share one join key inside one card type.
    /// Aborts that card type's emission only.
    #[error("join collision in {card_type} cards: key '{key}' appears {count} times")]
    JoinCollision {
        card_type: String,
        key: String,
        count: usize,
    },

    #[error("csv error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn data_source(path: &Path, reason: impl Into<String>) -> Self {
        PipelineError::DataSource {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub fn csv(path: &Path, source: csv::Error) -> Self {
        PipelineError::Csv {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn io(path: &Path, source: std::io::Error) -> Self {
        PipelineError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// True for errors that stop the whole run, false for errors scoped
    /// to a single card type.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, PipelineError::JoinCollision { .. })
    }
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_source_message_names_path() {
        let err = PipelineError::data_source(Path::new("Lexique383.tsv"), "file not found");
        let msg = err.to_string();
        assert!(msg.contains("Lexique383.tsv"));
        assert!(msg.contains("file not found"));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_join_collision_is_scoped() {
        let err = PipelineError::JoinCollision {
            card_type: "vocabulary".to_string(),
            key: "chat".to_string(),
            count: 2,
        };
        assert!(!err.is_fatal());
        assert!(err.to_string().contains("'chat'"));
    }
}
