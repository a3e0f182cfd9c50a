#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// `clap` command surface for the `umls-install` binary.
pub mod cli;
/// Run configuration types.
pub mod config;
/// Centralized constants for source tables, output layout, and store encoding.
pub mod constants;
/// Dual-index driver and full install run.
pub mod driver;
/// Extraction, dedup, and semantic-type join stage.
pub mod extraction;
/// Progress reporting helpers.
pub mod metrics;
/// RRF table decoding, semantic-type loader, and concept-string stream.
pub mod source;
/// Writer seams and the two persisted stores.
pub mod store;
/// Input/output transports (filesystem today).
pub mod transport;
/// Shared type aliases.
pub mod types;
/// Surface-form normalization helpers.
pub mod utils;

mod errors;

pub use config::{InstallConfig, NormalizationOptions};
pub use driver::{InstallSummary, TablePaths, encode_terms, install, run_pipeline};
pub use errors::InstallError;
pub use extraction::{ExtractedTerm, ExtractionStats, Extractor, SeenSet};
pub use metrics::{ProgressReporter, ProgressStatus};
pub use source::{ConsoStream, RrfRecord, RrfSchema, SemanticTypeMap};
pub use store::{
    ConceptMatch, ConceptStoreWriter, CuiSemTypesReader, CuiSemTypesWriter, Measure,
    SimilarityIndexWriter, SimstringReader, SimstringWriter,
};
pub use types::{Cui, SemanticType, SurfaceForm};
