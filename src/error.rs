use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while enumerating, planning or rewriting history.
#[derive(Debug, Error)]
pub enum Error {
    /// The `git` binary was not found on `$PATH`.
    #[error("`git` not found in PATH")]
    GitNotFound,

    /// The given path does not exist or is not inside a git work tree.
    #[error("not a git repository: '{}'", .0.display())]
    RepositoryNotFound(PathBuf),

    /// The commit message corpus could not be located or read.
    #[error("commit message corpus not found: '{}'", .0.display())]
    CorpusNotFound(PathBuf),

    /// A display name with fewer than two whitespace-separated tokens.
    #[error("invalid name format: '{0}' (expected at least a first and last name)")]
    InvalidNameFormat(String),

    /// A replacement value that cannot be stored in a filter table.
    #[error("{field} cannot contain line breaks or control separators: {value:?}")]
    UnencodableValue { field: &'static str, value: String },

    /// Offset and range place commit dates outside what git can store.
    #[error(
        "date range out of bounds: offset {base_offset_years} years, range {range_years} years \
         (dates must fall between 1970 and 9999)"
    )]
    InvalidDateRange {
        base_offset_years: f64,
        range_years: f64,
    },

    /// A git subprocess exited with a non-zero status.
    #[error("`{command}` failed: {stderr}")]
    Subprocess { command: String, stderr: String },

    /// Output from git that could not be parsed.
    #[error("unexpected git output: {0}")]
    InvalidOutput(String),

    /// Reading interactive input failed.
    #[error("prompt error: {0}")]
    Prompt(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Result alias used across the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;
