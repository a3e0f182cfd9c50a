use std::io;

use thiserror::Error;

use crate::types::{Cui, TableName};

/// Error type for source parsing, joining, and index persistence failures.
#[derive(Debug, Error)]
pub enum InstallError {
    /// A source row is shorter than its table schema.
    #[error("{table} line {line}: expected at least {expected} fields, found {found}")]
    SchemaViolation {
        /// Table the row came from.
        table: TableName,
        /// 1-based line number of the row.
        line: u64,
        /// Columns the schema requires.
        expected: usize,
        /// Fields the row carried.
        found: usize,
    },
    /// A concept-string row references a concept absent from MRSTY.
    #[error("concept '{cui}' (MRCONSO line {line}) has no semantic types")]
    MissingSemanticTypes {
        /// Concept identifier that failed the join.
        cui: Cui,
        /// 1-based MRCONSO line of the row.
        line: u64,
    },
    /// ASCII folding was requested in a build without the `unicode` feature.
    #[error(
        "unicode normalization requested but this build has no ASCII folding support; rebuild with `--features unicode`"
    )]
    UnicodeNormalizationUnavailable,
    /// The similarity index could not be written or read.
    #[error("similarity index failure: {0}")]
    SimilarityIndex(String),
    /// The exact-lookup store could not be written or read.
    #[error("concept store failure: {0}")]
    ConceptStore(String),
    /// Filesystem failure.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// Invalid run configuration or missing source table.
    #[error("configuration error: {0}")]
    Configuration(String),
}
