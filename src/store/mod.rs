//! Insert-only seams between the install run and the two persisted stores.
//!
//! - `SimilarityIndexWriter` receives one surface form per call.
//! - `ConceptStoreWriter` receives one `(surface form, concept, semantic types)` triple per call.
//!
//! Inserts are not coordinated across the two writers; a failure in one leaves
//! whatever the other already persisted in place.

use std::io;

use crate::errors::InstallError;
use crate::extraction::ExtractedTerm;
use crate::types::{SemanticType, SurfaceForm};

/// Exact surface-form lookup store backed by `simd-r-drive`.
pub mod cui_semtypes;
/// Character n-gram similarity index backed by `simd-r-drive`.
pub mod simstring;

pub use cui_semtypes::{ConceptMatch, CuiSemTypesReader, CuiSemTypesWriter};
pub use simstring::{Measure, SimstringReader, SimstringWriter};

/// Sink for surface forms feeding an approximate-match index.
pub trait SimilarityIndexWriter {
    /// Add one surface form.
    fn insert(&mut self, term: &str) -> Result<(), InstallError>;

    /// Flush buffered state. Called once after the last insert.
    fn finish(&mut self) -> Result<(), InstallError> {
        Ok(())
    }
}

/// Sink for surface-form to concept records feeding an exact-lookup store.
pub trait ConceptStoreWriter {
    /// Add one surface form with its concept and semantic types.
    fn insert(
        &mut self,
        term: &str,
        cui: &str,
        semantic_types: &[SemanticType],
    ) -> Result<(), InstallError>;

    /// Flush buffered state. Called once after the last insert.
    fn finish(&mut self) -> Result<(), InstallError> {
        Ok(())
    }
}

/// In-memory similarity sink (dry runs and tests).
impl SimilarityIndexWriter for Vec<SurfaceForm> {
    fn insert(&mut self, term: &str) -> Result<(), InstallError> {
        self.push(term.to_string());
        Ok(())
    }
}

/// In-memory concept sink (dry runs and tests).
impl ConceptStoreWriter for Vec<ExtractedTerm> {
    fn insert(
        &mut self,
        term: &str,
        cui: &str,
        semantic_types: &[SemanticType],
    ) -> Result<(), InstallError> {
        self.push(ExtractedTerm {
            text: term.to_string(),
            cui: cui.to_string(),
            semantic_types: semantic_types.to_vec(),
        });
        Ok(())
    }
}

fn map_index_err(err: io::Error) -> InstallError {
    InstallError::SimilarityIndex(err.to_string())
}

fn map_concept_err(err: io::Error) -> InstallError {
    InstallError::ConceptStore(err.to_string())
}
