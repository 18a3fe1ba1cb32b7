use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum AssembleError {
    #[error("unexpected file format: {path} ({reason})")]
    #[diagnostic(help("file names must follow <YY-MM-DD>L<n>[-<k>]-<detail>.<ext>"))]
    Format { path: String, reason: String },

    #[error(
        "row count mismatch in sample {sample_id}: {path} has {found} rows, expected {expected}"
    )]
    Consistency {
        sample_id: String,
        expected: usize,
        found: usize,
        path: String,
    },

    #[error("experiment tag mismatch in sample {sample_id}: {path} has {found:?}, expected {expected:?}")]
    TagMismatch {
        sample_id: String,
        expected: String,
        found: String,
        path: String,
    },

    #[error("no cells found for sample {sample_id}")]
    EmptyGroup { sample_id: String },

    #[error("invalid filename pattern for {source_kind}: {message}")]
    InvalidPattern {
        source_kind: String,
        message: String,
    },

    #[error("filesystem error: {0}")]
    Filesystem(String),

    #[error("failed to parse table {path}: {message}")]
    Csv { path: String, message: String },

    #[error("failed to read time cache at {0}")]
    #[diagnostic(help("remove it with `kira-sa cache clear` or run with --no-cache"))]
    CacheRead(Utf8PathBuf),

    #[error("failed to parse time cache at {path}: {message}")]
    #[diagnostic(help("remove it with `kira-sa cache clear` or run with --no-cache"))]
    CacheParse { path: Utf8PathBuf, message: String },

    #[error("failed to write time cache at {path}: {message}")]
    CacheWrite { path: Utf8PathBuf, message: String },

    #[error("failed to read config file at {0}")]
    ConfigRead(Utf8PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),
}

impl AssembleError {
    pub(crate) fn format(path: impl ToString, reason: impl Into<String>) -> Self {
        AssembleError::Format {
            path: path.to_string(),
            reason: reason.into(),
        }
    }
}
