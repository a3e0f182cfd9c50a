//! Dual-index driver and full install run.
//!
//! A run is strictly sequential: the semantic-type table is loaded completely,
//! then concept-string rows are pulled one at a time through the extractor and
//! each surviving term is inserted into the similarity index and the concept
//! store before the next row is read.

use std::path::{Path, PathBuf};
use std::time::Instant;

use tracing::info;

use crate::config::{InstallConfig, NormalizationOptions};
use crate::constants::install::{LOWERCASE_FLAG, NORMALIZE_UNICODE_FLAG};
use crate::errors::InstallError;
use crate::extraction::{ExtractedTerm, ExtractionStats, Extractor, SeenSet};
use crate::metrics::{ProgressReporter, format_u64_with_commas};
use crate::source::{ConsoStream, SemanticTypeMap};
use crate::store::{
    ConceptStoreWriter, CuiSemTypesWriter, SimilarityIndexWriter, SimstringWriter,
};
use crate::transport::fs::{clear_flag, count_lines, ensure_dir, write_flag};

/// Resolved input tables of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TablePaths {
    /// Concept-string table.
    pub mrconso: PathBuf,
    /// Concept-to-semantic-type table.
    pub mrsty: PathBuf,
}

impl TablePaths {
    /// Locate both tables under the configured source directory.
    pub fn resolve(config: &InstallConfig) -> Result<Self, InstallError> {
        Ok(Self {
            mrconso: config.mrconso_path()?,
            mrsty: config.mrsty_path()?,
        })
    }
}

/// Outcome of a completed run.
#[derive(Clone, Debug, PartialEq)]
pub struct InstallSummary {
    /// Concepts loaded from the semantic-type table.
    pub concepts: usize,
    /// Extraction counters (records read, terms emitted, duplicates dropped).
    pub extraction: ExtractionStats,
    /// Terms inserted into both stores.
    pub inserted: u64,
    /// Wall-clock seconds for the whole run.
    pub elapsed_secs: f64,
}

/// Insert every extracted term into both stores, in emission order.
///
/// Stops at the first extraction or insertion error. The two inserts for a term
/// are independent: if the concept insert fails, the similarity insert for the
/// same term has already happened.
pub fn encode_terms<I, S, C>(
    terms: I,
    similarity: &mut S,
    concepts: &mut C,
) -> Result<u64, InstallError>
where
    I: IntoIterator<Item = Result<ExtractedTerm, InstallError>>,
    S: SimilarityIndexWriter + ?Sized,
    C: ConceptStoreWriter + ?Sized,
{
    let mut inserted = 0u64;
    for term in terms {
        let term = term?;
        similarity.insert(&term.text)?;
        concepts.insert(&term.text, &term.cui, &term.semantic_types)?;
        inserted += 1;
    }
    Ok(inserted)
}

/// Write or clear the normalization marker files in `dir` so they match `options`.
pub fn apply_flags(dir: &Path, options: NormalizationOptions) -> Result<(), InstallError> {
    for (flag, enabled) in [
        (NORMALIZE_UNICODE_FLAG, options.normalize_unicode),
        (LOWERCASE_FLAG, options.lowercase),
    ] {
        if enabled {
            write_flag(dir, flag)?;
        } else {
            clear_flag(dir, flag)?;
        }
    }
    Ok(())
}

/// Run the pipeline from `tables` into caller-provided stores, then finish both.
pub fn run_pipeline<S, C>(
    config: &InstallConfig,
    tables: &TablePaths,
    similarity: &mut S,
    concepts: &mut C,
) -> Result<InstallSummary, InstallError>
where
    S: SimilarityIndexWriter + ?Sized,
    C: ConceptStoreWriter + ?Sized,
{
    let start = Instant::now();
    let semantic_types = SemanticTypeMap::load(&tables.mrsty, config.mrsty_schema.clone())?;

    let progress_start = Instant::now();
    let total = count_lines(&tables.mrconso)?;
    let records = ConsoStream::open(
        &tables.mrconso,
        config.mrconso_schema.clone(),
        config.language.clone(),
    )?;
    let mut seen = SeenSet::new();
    let mut extractor = Extractor::new(
        records,
        &semantic_types,
        &mut seen,
        config.normalization,
    )
    .with_progress(ProgressReporter::new(total, config.progress_every).with_start(progress_start));

    let inserted = encode_terms(&mut extractor, similarity, concepts)?;
    let extraction = extractor.stats();
    similarity.finish()?;
    concepts.finish()?;

    Ok(InstallSummary {
        concepts: semantic_types.len(),
        extraction,
        inserted,
        elapsed_secs: start.elapsed().as_secs_f64(),
    })
}

/// Full install: pre-flight checks, flag files, both stores under the destination.
pub fn install(config: &InstallConfig) -> Result<InstallSummary, InstallError> {
    config.validate()?;
    let tables = TablePaths::resolve(config)?;

    ensure_dir(config.destination())?;
    apply_flags(config.destination(), config.normalization)?;

    let mut similarity = SimstringWriter::create(&config.simstring_dir())?;
    let mut concepts = CuiSemTypesWriter::create(&config.cuisty_dir())?;
    let summary = run_pipeline(config, &tables, &mut similarity, &mut concepts)?;

    info!(
        "[umls:install] completed in {:.2}s (records={}, terms={}, duplicates={})",
        summary.elapsed_secs,
        format_u64_with_commas(summary.extraction.records),
        format_u64_with_commas(summary.inserted),
        format_u64_with_commas(summary.extraction.duplicates)
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{SemanticType, SurfaceForm};

    struct FailingConcepts;

    impl ConceptStoreWriter for FailingConcepts {
        fn insert(&mut self, _: &str, _: &str, _: &[SemanticType]) -> Result<(), InstallError> {
            Err(InstallError::ConceptStore("disk full".into()))
        }
    }

    fn term(text: &str, cui: &str) -> Result<ExtractedTerm, InstallError> {
        Ok(ExtractedTerm {
            text: text.into(),
            cui: cui.into(),
            semantic_types: vec!["T047".into()],
        })
    }

    #[test]
    fn encode_inserts_into_both_stores_in_order() {
        let mut similarity: Vec<SurfaceForm> = Vec::new();
        let mut concepts: Vec<ExtractedTerm> = Vec::new();
        let inserted = encode_terms(
            vec![term("fever", "C1"), term("cough", "C2")],
            &mut similarity,
            &mut concepts,
        )
        .unwrap();
        assert_eq!(inserted, 2);
        assert_eq!(similarity, vec!["fever", "cough"]);
        assert_eq!(concepts[1].cui, "C2");
    }

    #[test]
    fn encode_stops_at_first_extraction_error() {
        let mut similarity: Vec<SurfaceForm> = Vec::new();
        let mut concepts: Vec<ExtractedTerm> = Vec::new();
        let terms = vec![
            term("fever", "C1"),
            Err(InstallError::MissingSemanticTypes {
                cui: "C9".into(),
                line: 2,
            }),
            term("cough", "C2"),
        ];
        let err = encode_terms(terms, &mut similarity, &mut concepts).unwrap_err();
        assert!(matches!(err, InstallError::MissingSemanticTypes { .. }));
        assert_eq!(similarity, vec!["fever"]);
        assert_eq!(concepts.len(), 1);
    }

    #[test]
    fn concept_failure_leaves_similarity_insert_in_place() {
        let mut similarity: Vec<SurfaceForm> = Vec::new();
        let err = encode_terms(vec![term("fever", "C1")], &mut similarity, &mut FailingConcepts)
            .unwrap_err();
        assert!(matches!(err, InstallError::ConceptStore(_)));
        assert_eq!(similarity, vec!["fever"]);
    }
}
