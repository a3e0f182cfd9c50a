use std::borrow::Cow;
use std::path::{Path, PathBuf};

use crate::constants::install::{CUI_SEMTYPES_DB_DIR, PROGRESS_BATCH_SIZE, SIMSTRING_DB_DIR};
use crate::constants::rrf::{
    ENGLISH, FIELD_CUI, FIELD_LANGUAGE, FIELD_SEMANTIC_TYPE, FIELD_STRING, MRCONSO_FILENAME,
    MRCONSO_HEADERS, MRSTY_FILENAME, MRSTY_HEADERS,
};
use crate::errors::InstallError;
use crate::source::RrfSchema;
use crate::transport::fs::locate_table;
use crate::utils::ascii_folding_available;

/// Surface-form normalization switches applied before dedup.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NormalizationOptions {
    /// Fold surface forms to lowercase.
    pub lowercase: bool,
    /// Transliterate surface forms to their closest ASCII representation.
    pub normalize_unicode: bool,
}

/// Configuration for one full install run.
#[derive(Clone, Debug)]
pub struct InstallConfig {
    /// Directory holding `MRCONSO.RRF` and `MRSTY.RRF` (directly or under `META/`).
    pub source_dir: PathBuf,
    /// Directory receiving both stores and the flag files.
    pub destination_dir: PathBuf,
    /// Normalization applied to every surface form.
    pub normalization: NormalizationOptions,
    /// Language code kept from the concept-string table.
    pub language: Cow<'static, str>,
    /// Number of kept records between two progress status lines.
    pub progress_every: u64,
    /// Positional column schema of the concept-string table.
    pub mrconso_schema: RrfSchema,
    /// Positional column schema of the semantic-type table.
    pub mrsty_schema: RrfSchema,
}

impl InstallConfig {
    /// Create a config with the installer defaults for `source_dir` and `destination_dir`.
    pub fn new(source_dir: impl Into<PathBuf>, destination_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            destination_dir: destination_dir.into(),
            normalization: NormalizationOptions::default(),
            language: Cow::Borrowed(ENGLISH),
            progress_every: PROGRESS_BATCH_SIZE,
            mrconso_schema: RrfSchema::from_static(&MRCONSO_HEADERS),
            mrsty_schema: RrfSchema::from_static(&MRSTY_HEADERS),
        }
    }

    /// Enable or disable lowercase folding.
    pub fn with_lowercase(mut self, lowercase: bool) -> Self {
        self.normalization.lowercase = lowercase;
        self
    }

    /// Enable or disable ASCII folding.
    pub fn with_normalize_unicode(mut self, normalize_unicode: bool) -> Self {
        self.normalization.normalize_unicode = normalize_unicode;
        self
    }

    /// Override the language code kept from MRCONSO.
    pub fn with_language(mut self, language: impl Into<Cow<'static, str>>) -> Self {
        self.language = language.into();
        self
    }

    /// Override the progress reporting interval.
    pub fn with_progress_every(mut self, progress_every: u64) -> Self {
        self.progress_every = progress_every;
        self
    }

    /// Override the MRCONSO column schema.
    pub fn with_mrconso_schema(mut self, schema: RrfSchema) -> Self {
        self.mrconso_schema = schema;
        self
    }

    /// Override the MRSTY column schema.
    pub fn with_mrsty_schema(mut self, schema: RrfSchema) -> Self {
        self.mrsty_schema = schema;
        self
    }

    /// Pre-flight checks that must pass before any file is touched.
    pub fn validate(&self) -> Result<(), InstallError> {
        if self.normalization.normalize_unicode && !ascii_folding_available() {
            return Err(InstallError::UnicodeNormalizationUnavailable);
        }
        if self.progress_every == 0 {
            return Err(InstallError::Configuration(
                "progress interval must be greater than zero".into(),
            ));
        }
        if self.language.trim().is_empty() {
            return Err(InstallError::Configuration(
                "language code must not be empty".into(),
            ));
        }
        self.mrconso_schema
            .require(MRCONSO_FILENAME, &[FIELD_CUI, FIELD_LANGUAGE, FIELD_STRING])?;
        self.mrsty_schema
            .require(MRSTY_FILENAME, &[FIELD_CUI, FIELD_SEMANTIC_TYPE])?;
        Ok(())
    }

    /// Resolved path of the concept-string table.
    pub fn mrconso_path(&self) -> Result<PathBuf, InstallError> {
        locate_table(&self.source_dir, MRCONSO_FILENAME)
    }

    /// Resolved path of the semantic-type table.
    pub fn mrsty_path(&self) -> Result<PathBuf, InstallError> {
        locate_table(&self.source_dir, MRSTY_FILENAME)
    }

    /// Directory of the similarity index.
    pub fn simstring_dir(&self) -> PathBuf {
        self.destination_dir.join(SIMSTRING_DB_DIR)
    }

    /// Directory of the exact-lookup store.
    pub fn cuisty_dir(&self) -> PathBuf {
        self.destination_dir.join(CUI_SEMTYPES_DB_DIR)
    }

    /// Destination directory as a path reference.
    pub fn destination(&self) -> &Path {
        &self.destination_dir
    }
}
