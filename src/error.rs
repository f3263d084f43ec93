use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by loading, resampling, summarising and persisting a core.
///
/// Per-cell numerical trouble (an inverted depth outside the proxy table, an
/// empty age grid) is never an error: it shows up as NaN cells or empty
/// matrices in the result instead.
#[derive(Debug, Error)]
pub enum ProxyError {
    /// One of the three per-core input files does not exist.
    #[error("missing input file: {}", path.display())]
    MissingInput { path: PathBuf },

    /// An input file exists but its contents cannot be used.
    #[error("malformed input {}: {reason}", path.display())]
    Malformed { path: PathBuf, reason: String },

    /// Grid axis and sample array disagree on the number of columns.
    #[error("size of grid ({grid}) not equal to the number of columns ({columns}) in samples")]
    ShapeMismatch { grid: usize, columns: usize },

    /// A configuration value is out of its valid domain.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Writing a result or band export failed. The in-memory result is
    /// unaffected.
    #[error("failed to persist {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ProxyError {
    pub(crate) fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        ProxyError::Malformed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn persistence(
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        ProxyError::Persistence {
            path: path.into(),
            source: source.into(),
        }
    }

    /// True when the error only means "this core has no inputs"; batch
    /// callers skip such cores and carry on.
    pub fn is_missing_input(&self) -> bool {
        matches!(self, ProxyError::MissingInput { .. })
    }
}

pub type Result<T> = std::result::Result<T, ProxyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_input_names_the_path() {
        let err = ProxyError::MissingInput {
            path: PathBuf::from("cores/HP1C_settings.txt"),
        };
        assert!(err.is_missing_input());
        assert!(err.to_string().contains("cores/HP1C_settings.txt"));
    }

    #[test]
    fn shape_mismatch_reports_both_sizes() {
        let err = ProxyError::ShapeMismatch { grid: 4, columns: 7 };
        let msg = err.to_string();
        assert!(msg.contains("(4)"));
        assert!(msg.contains("(7)"));
        assert!(!err.is_missing_input());
    }
}
