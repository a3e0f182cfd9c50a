use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use simd_r_drive::storage_engine::DataStore;
use simd_r_drive::storage_engine::traits::{DataStoreReader, DataStoreWriter};
use tracing::info;

use super::{ConceptStoreWriter, map_concept_err};
use crate::constants::cui_semtypes::{
    CUI_KEY_PREFIX, RECORD_VERSION, STORE_FILENAME, TERM_KEY_PREFIX,
};
use crate::errors::InstallError;
use crate::transport::fs::{ensure_dir, remove_stale_file};
use crate::types::{Cui, SemanticType};

#[derive(Clone, Debug, Default, bitcode::Encode, bitcode::Decode)]
/// Concepts recorded for one surface form, in insertion order.
struct TermRecord {
    cuis: Vec<Cui>,
}

#[derive(Clone, Debug, bitcode::Encode, bitcode::Decode)]
/// Semantic types recorded for one concept.
struct CuiRecord {
    semantic_types: Vec<SemanticType>,
}

/// One exact-lookup hit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConceptMatch {
    /// Concept the surface form maps to.
    pub cui: Cui,
    /// Semantic types of the concept.
    pub semantic_types: Vec<SemanticType>,
}

/// Builds the surface form to concept store.
///
/// Layout: `term:<surface form>` holds the concept list of a form and
/// `cui:<concept>` holds the semantic types of a concept.
pub struct CuiSemTypesWriter {
    store: DataStore,
    path: PathBuf,
    written_cuis: HashSet<Cui>,
    terms: u64,
}

impl fmt::Debug for CuiSemTypesWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CuiSemTypesWriter")
            .field("path", &self.path)
            .field("terms", &self.terms)
            .field("concepts", &self.written_cuis.len())
            .finish()
    }
}

impl CuiSemTypesWriter {
    /// Create `dir` and start a fresh store inside it, replacing any previous one.
    pub fn create(dir: &Path) -> Result<Self, InstallError> {
        ensure_dir(dir)?;
        let path = dir.join(STORE_FILENAME);
        remove_stale_file(&path)?;
        let store = DataStore::open(path.as_path()).map_err(map_concept_err)?;
        info!("[umls:install] concept store at {}", path.display());
        Ok(Self {
            store,
            path,
            written_cuis: HashSet::new(),
            terms: 0,
        })
    }

    /// Number of term inserts accepted so far.
    pub fn len(&self) -> u64 {
        self.terms
    }

    /// True before the first insert.
    pub fn is_empty(&self) -> bool {
        self.terms == 0
    }
}

impl ConceptStoreWriter for CuiSemTypesWriter {
    fn insert(
        &mut self,
        term: &str,
        cui: &str,
        semantic_types: &[SemanticType],
    ) -> Result<(), InstallError> {
        if !self.written_cuis.contains(cui) {
            let record = CuiRecord {
                semantic_types: semantic_types.to_vec(),
            };
            self.store
                .write(&prefixed_key(CUI_KEY_PREFIX, cui), &encode_record(&record))
                .map_err(map_concept_err)?;
            self.written_cuis.insert(cui.to_string());
        }

        let key = prefixed_key(TERM_KEY_PREFIX, term);
        let mut record: TermRecord = match self.store.read(&key).map_err(map_concept_err)? {
            Some(entry) => decode_record(entry.as_ref())?,
            None => TermRecord::default(),
        };
        if !record.cuis.iter().any(|existing| existing == cui) {
            record.cuis.push(cui.to_string());
            self.store
                .write(&key, &encode_record(&record))
                .map_err(map_concept_err)?;
        }
        self.terms += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), InstallError> {
        info!(
            "[umls:install] concept store complete (terms={}, concepts={})",
            self.terms,
            self.written_cuis.len()
        );
        Ok(())
    }
}

/// Read access to an exact-lookup store.
pub struct CuiSemTypesReader {
    store: DataStore,
}

impl fmt::Debug for CuiSemTypesReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CuiSemTypesReader").finish_non_exhaustive()
    }
}

impl CuiSemTypesReader {
    /// Open the store built in `dir`.
    pub fn open(dir: &Path) -> Result<Self, InstallError> {
        let path = dir.join(STORE_FILENAME);
        if !path.is_file() {
            return Err(InstallError::ConceptStore(format!(
                "no concept store at {}",
                path.display()
            )));
        }
        let store = DataStore::open(path.as_path()).map_err(map_concept_err)?;
        Ok(Self { store })
    }

    /// Concepts (with semantic types) recorded for surface form `term`.
    pub fn get(&self, term: &str) -> Result<Vec<ConceptMatch>, InstallError> {
        let key = prefixed_key(TERM_KEY_PREFIX, term);
        let Some(entry) = self.store.read(&key).map_err(map_concept_err)? else {
            return Ok(Vec::new());
        };
        let record: TermRecord = decode_record(entry.as_ref())?;
        let mut matches = Vec::with_capacity(record.cuis.len());
        for cui in record.cuis {
            let semantic_types = self.semantic_types(&cui)?.ok_or_else(|| {
                InstallError::ConceptStore(format!(
                    "term '{term}' references concept '{cui}' without semantic types"
                ))
            })?;
            matches.push(ConceptMatch {
                cui,
                semantic_types,
            });
        }
        Ok(matches)
    }

    /// Semantic types recorded for concept `cui`.
    pub fn semantic_types(&self, cui: &str) -> Result<Option<Vec<SemanticType>>, InstallError> {
        let key = prefixed_key(CUI_KEY_PREFIX, cui);
        match self.store.read(&key).map_err(map_concept_err)? {
            Some(entry) => {
                let record: CuiRecord = decode_record(entry.as_ref())?;
                Ok(Some(record.semantic_types))
            }
            None => Ok(None),
        }
    }
}

fn prefixed_key(prefix: &[u8], value: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(prefix.len() + value.len());
    key.extend_from_slice(prefix);
    key.extend_from_slice(value.as_bytes());
    key
}

fn encode_record<T: bitcode::Encode>(record: &T) -> Vec<u8> {
    let payload = bitcode::encode(record);
    let mut buf = Vec::with_capacity(1 + payload.len());
    buf.push(RECORD_VERSION);
    buf.extend_from_slice(&payload);
    buf
}

fn decode_record<T>(bytes: &[u8]) -> Result<T, InstallError>
where
    T: for<'a> bitcode::Decode<'a>,
{
    if bytes.first().copied() != Some(RECORD_VERSION) {
        return Err(InstallError::ConceptStore(
            "concept store record version mismatch".into(),
        ));
    }
    bitcode::decode(&bytes[1..])
        .map_err(|err| InstallError::ConceptStore(format!("corrupt concept store record: {err}")))
}
