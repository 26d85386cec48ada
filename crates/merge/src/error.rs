use std::path::PathBuf;

use serde::{Serialize, Serializer};
use shopmerge_io::{ReadError, WriteError};
use thiserror::Error;

/// Failures that stop a whole run or a whole category.
#[derive(Debug, Error)]
pub enum MergeError {
    /// The source directory does not exist. Fatal for the run.
    #[error("source directory not found: {}", .0.display())]
    SourceRootMissing(PathBuf),

    /// Amazon settlement was selected without a country mapping. Fatal for the run.
    #[error("the amazon-settlement category needs a country mapping file")]
    MappingRequired,

    #[error("cannot create output directory {}: {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot list {}: {source}", .path.display())]
    Scan {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Write(#[from] WriteError),

    #[error("cannot rename {} to {}: {source}", .from.display(), .to.display())]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Glob(#[from] glob::PatternError),

    #[error("invalid pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Why one file contributed no rows. The rest of the category still runs.
#[derive(Debug, Error)]
pub enum SkipReason {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error("missing column '{0}'")]
    MissingColumn(String),

    #[error("no data rows")]
    Empty,

    #[error("no country mapping matches store '{0}'")]
    UnknownCountry(String),
}

impl Serialize for SkipReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
