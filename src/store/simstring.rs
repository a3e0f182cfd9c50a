use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use simd_r_drive::storage_engine::DataStore;
use simd_r_drive::storage_engine::traits::{DataStoreReader, DataStoreWriter};
use tracing::{debug, info};

use super::{SimilarityIndexWriter, map_index_err};
use crate::constants::simstring::{
    INDEX_VERSION, META_KEY, NGRAM_SIZE, PAD_MARK, POSTING_KEY_PREFIX, REPEAT_MARK,
    STORE_FILENAME, STRING_KEY_PREFIX,
};
use crate::errors::InstallError;
use crate::transport::fs::{ensure_dir, remove_stale_file};
use crate::types::SurfaceForm;

/// Posting lists flushed per `batch_write` call.
const POSTING_WRITE_BATCH: usize = 4096;
/// Numerical slack applied before rounding size and overlap bounds.
const BOUND_EPSILON: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Eq, bitcode::Encode, bitcode::Decode)]
/// Persisted header written once the index is complete.
struct IndexMeta {
    version: u8,
    ngram: u32,
    count: u64,
    min_features: u32,
    max_features: u32,
}

/// Set-similarity measure used for approximate retrieval.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Measure {
    /// `|X ∩ Y| / sqrt(|X| |Y|)`
    Cosine,
    /// `2 |X ∩ Y| / (|X| + |Y|)`
    Dice,
    /// `|X ∩ Y| / |X ∪ Y|`
    Jaccard,
    /// `|X ∩ Y| / min(|X|, |Y|)`
    Overlap,
}

impl Measure {
    /// Feature-count range a match of a query with `query_len` features can have.
    fn size_bounds(self, query_len: usize, alpha: f64) -> (usize, Option<usize>) {
        let x = query_len as f64;
        match self {
            Measure::Cosine => (ceil(alpha * alpha * x), Some(floor(x / (alpha * alpha)))),
            Measure::Dice => (
                ceil(alpha / (2.0 - alpha) * x),
                Some(floor((2.0 - alpha) / alpha * x)),
            ),
            Measure::Jaccard => (ceil(alpha * x), Some(floor(x / alpha))),
            Measure::Overlap => (1, None),
        }
    }

    /// Minimum number of shared features for a candidate with `candidate_len` features.
    fn min_overlap(self, query_len: usize, candidate_len: usize, alpha: f64) -> usize {
        let x = query_len as f64;
        let y = candidate_len as f64;
        let tau = match self {
            Measure::Cosine => ceil(alpha * (x * y).sqrt()),
            Measure::Dice => ceil(0.5 * alpha * (x + y)),
            Measure::Jaccard => ceil(alpha * (x + y) / (1.0 + alpha)),
            Measure::Overlap => ceil(alpha * x.min(y)),
        };
        tau.max(1)
    }
}

/// Character n-grams of `text`, padded with `n - 1` marks on both sides.
///
/// Repeated n-grams are numbered (`ab`, `ab#2`) so the feature set keeps multiplicity.
pub fn ngram_features(text: &str, n: usize) -> Vec<String> {
    let n = n.max(1);
    let mut padded: Vec<char> = Vec::with_capacity(text.len() + 2 * (n - 1));
    padded.extend(std::iter::repeat_n(PAD_MARK, n - 1));
    padded.extend(text.chars());
    padded.extend(std::iter::repeat_n(PAD_MARK, n - 1));
    let mut occurrences: HashMap<String, u32> = HashMap::new();
    let mut features = Vec::with_capacity(padded.len().saturating_sub(n - 1));
    for window in padded.windows(n) {
        let gram: String = window.iter().collect();
        let seen = occurrences.entry(gram.clone()).or_insert(0);
        *seen += 1;
        if *seen == 1 {
            features.push(gram);
        } else {
            features.push(format!("{gram}{REPEAT_MARK}{seen}"));
        }
    }
    features
}

/// Builds the n-gram similarity index for one run.
///
/// Strings are persisted as they arrive; posting lists are kept in memory and
/// written by `finish`. An index whose writer never finished has no metadata
/// record and is refused by `SimstringReader::open`.
pub struct SimstringWriter {
    store: DataStore,
    path: PathBuf,
    ngram: usize,
    next_id: u64,
    postings: HashMap<(u32, String), Vec<u64>>,
    min_features: u32,
    max_features: u32,
    finished: bool,
}

impl fmt::Debug for SimstringWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimstringWriter")
            .field("path", &self.path)
            .field("ngram", &self.ngram)
            .field("count", &self.next_id)
            .field("finished", &self.finished)
            .finish()
    }
}

impl SimstringWriter {
    /// Create `dir` and start a fresh index inside it, replacing any previous one.
    pub fn create(dir: &Path) -> Result<Self, InstallError> {
        ensure_dir(dir)?;
        let path = dir.join(STORE_FILENAME);
        remove_stale_file(&path)?;
        let store = DataStore::open(path.as_path()).map_err(map_index_err)?;
        info!("[umls:install] similarity index at {}", path.display());
        Ok(Self {
            store,
            path,
            ngram: NGRAM_SIZE,
            next_id: 0,
            postings: HashMap::new(),
            min_features: u32::MAX,
            max_features: 0,
            finished: false,
        })
    }

    /// Number of strings inserted so far.
    pub fn len(&self) -> u64 {
        self.next_id
    }

    /// True before the first insert.
    pub fn is_empty(&self) -> bool {
        self.next_id == 0
    }

    fn write_postings(&self) -> Result<(), InstallError> {
        let mut batch: Vec<(Vec<u8>, Vec<u8>)> = Vec::with_capacity(POSTING_WRITE_BATCH);
        let mut lists = 0usize;
        for ((size, gram), ids) in &self.postings {
            batch.push((posting_key(*size, gram), bitcode::encode(ids)));
            if batch.len() >= POSTING_WRITE_BATCH {
                lists += batch.len();
                self.flush_batch(&batch)?;
                batch.clear();
            }
        }
        if !batch.is_empty() {
            lists += batch.len();
            self.flush_batch(&batch)?;
        }
        debug!(posting_lists = lists, path = %self.path.display(), "wrote posting lists");
        Ok(())
    }

    fn flush_batch(&self, batch: &[(Vec<u8>, Vec<u8>)]) -> Result<(), InstallError> {
        let entries: Vec<(&[u8], &[u8])> = batch
            .iter()
            .map(|(key, value)| (key.as_slice(), value.as_slice()))
            .collect();
        self.store.batch_write(&entries).map_err(map_index_err)?;
        Ok(())
    }
}

impl SimilarityIndexWriter for SimstringWriter {
    fn insert(&mut self, term: &str) -> Result<(), InstallError> {
        if self.finished {
            return Err(InstallError::SimilarityIndex(
                "insert after the index was finished".into(),
            ));
        }
        let id = self.next_id;
        self.store
            .write(&string_key(id), term.as_bytes())
            .map_err(map_index_err)?;
        let features = ngram_features(term, self.ngram);
        let size = features.len() as u32;
        for feature in features {
            self.postings.entry((size, feature)).or_default().push(id);
        }
        self.min_features = self.min_features.min(size);
        self.max_features = self.max_features.max(size);
        self.next_id += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), InstallError> {
        if self.finished {
            return Ok(());
        }
        self.write_postings()?;
        let meta = IndexMeta {
            version: INDEX_VERSION,
            ngram: self.ngram as u32,
            count: self.next_id,
            min_features: if self.next_id == 0 { 0 } else { self.min_features },
            max_features: self.max_features,
        };
        self.store
            .write(META_KEY, &encode_meta(&meta))
            .map_err(map_index_err)?;
        self.postings.clear();
        self.finished = true;
        info!(
            "[umls:install] similarity index complete (terms={})",
            self.next_id
        );
        Ok(())
    }
}

/// Read access to a finished similarity index.
pub struct SimstringReader {
    store: DataStore,
    meta: IndexMeta,
}

impl fmt::Debug for SimstringReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimstringReader")
            .field("meta", &self.meta)
            .finish()
    }
}

impl SimstringReader {
    /// Open the index built in `dir`.
    pub fn open(dir: &Path) -> Result<Self, InstallError> {
        let path = dir.join(STORE_FILENAME);
        if !path.is_file() {
            return Err(InstallError::SimilarityIndex(format!(
                "no similarity index at {}",
                path.display()
            )));
        }
        let store = DataStore::open(path.as_path()).map_err(map_index_err)?;
        let meta = match store.read(META_KEY).map_err(map_index_err)? {
            Some(entry) => decode_meta(entry.as_ref())?,
            None => {
                return Err(InstallError::SimilarityIndex(format!(
                    "similarity index at {} is incomplete (no metadata record)",
                    path.display()
                )));
            }
        };
        Ok(Self { store, meta })
    }

    /// Number of indexed strings.
    pub fn len(&self) -> u64 {
        self.meta.count
    }

    /// True if the index holds no strings.
    pub fn is_empty(&self) -> bool {
        self.meta.count == 0
    }

    /// Stored string with insertion id `id`.
    pub fn term(&self, id: u64) -> Result<Option<SurfaceForm>, InstallError> {
        let entry = self.store.read(&string_key(id)).map_err(map_index_err)?;
        Ok(entry.map(|entry| String::from_utf8_lossy(entry.as_ref()).into_owned()))
    }

    /// Strings whose similarity to `query` under `measure` is at least `threshold`,
    /// in insertion order.
    pub fn retrieve(
        &self,
        query: &str,
        measure: Measure,
        threshold: f64,
    ) -> Result<Vec<SurfaceForm>, InstallError> {
        if !(threshold > 0.0 && threshold <= 1.0) {
            return Err(InstallError::Configuration(format!(
                "similarity threshold must be in (0, 1], got {threshold}"
            )));
        }
        if self.meta.count == 0 {
            return Ok(Vec::new());
        }
        let features = ngram_features(query, self.meta.ngram as usize);
        let query_len = features.len();
        let (low, high) = measure.size_bounds(query_len, threshold);
        let low = low.max(self.meta.min_features as usize);
        let high = high
            .unwrap_or(usize::MAX)
            .min(self.meta.max_features as usize);

        let mut matches: BTreeSet<u64> = BTreeSet::new();
        for size in low..=high {
            let tau = measure.min_overlap(query_len, size, threshold);
            if tau > query_len {
                continue;
            }
            let keys: Vec<Vec<u8>> = features
                .iter()
                .map(|feature| posting_key(size as u32, feature))
                .collect();
            let key_refs: Vec<&[u8]> = keys.iter().map(|key| key.as_slice()).collect();
            let lists = self.store.batch_read(&key_refs).map_err(map_index_err)?;
            let mut counts: HashMap<u64, usize> = HashMap::new();
            for entry in lists.into_iter().flatten() {
                let ids: Vec<u64> = bitcode::decode(entry.as_ref()).map_err(|err| {
                    InstallError::SimilarityIndex(format!("corrupt posting list: {err}"))
                })?;
                for id in ids {
                    *counts.entry(id).or_insert(0) += 1;
                }
            }
            matches.extend(
                counts
                    .into_iter()
                    .filter(|(_, shared)| *shared >= tau)
                    .map(|(id, _)| id),
            );
        }

        let mut results = Vec::with_capacity(matches.len());
        for id in matches {
            let term = self.term(id)?.ok_or_else(|| {
                InstallError::SimilarityIndex(format!("posting references missing string {id}"))
            })?;
            results.push(term);
        }
        Ok(results)
    }
}

fn ceil(value: f64) -> usize {
    (value - BOUND_EPSILON).ceil().max(0.0) as usize
}

fn floor(value: f64) -> usize {
    (value + BOUND_EPSILON).floor().max(0.0) as usize
}

fn string_key(id: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(STRING_KEY_PREFIX.len() + 8);
    key.extend_from_slice(STRING_KEY_PREFIX);
    key.extend_from_slice(&id.to_le_bytes());
    key
}

fn posting_key(size: u32, gram: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(POSTING_KEY_PREFIX.len() + 4 + gram.len());
    key.extend_from_slice(POSTING_KEY_PREFIX);
    key.extend_from_slice(&size.to_le_bytes());
    key.extend_from_slice(gram.as_bytes());
    key
}

fn encode_meta(meta: &IndexMeta) -> Vec<u8> {
    let payload = bitcode::encode(meta);
    let mut buf = Vec::with_capacity(1 + payload.len());
    buf.push(INDEX_VERSION);
    buf.extend_from_slice(&payload);
    buf
}

fn decode_meta(bytes: &[u8]) -> Result<IndexMeta, InstallError> {
    if bytes.first().copied() != Some(INDEX_VERSION) {
        return Err(InstallError::SimilarityIndex(
            "similarity index version mismatch".into(),
        ));
    }
    bitcode::decode(&bytes[1..]).map_err(|err| {
        InstallError::SimilarityIndex(format!("corrupt similarity index metadata: {err}"))
    })
}
