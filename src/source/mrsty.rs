use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;
use std::time::Instant;

use tracing::info;

use crate::constants::rrf::{FIELD_CUI, FIELD_SEMANTIC_TYPE, MRSTY_FILENAME};
use crate::errors::InstallError;
use crate::source::{RrfReader, RrfSchema};
use crate::transport::fs::open_table;
use crate::types::{Cui, SemanticType};

/// Concept identifier to semantic types, in MRSTY file order.
///
/// Duplicate labels for one concept are kept as they appear. The map is built
/// once per run and only read afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SemanticTypeMap {
    types: HashMap<Cui, Vec<SemanticType>>,
}

impl SemanticTypeMap {
    /// Load the whole semantic-type table at `path`.
    pub fn load(path: &Path, schema: RrfSchema) -> Result<Self, InstallError> {
        let start = Instant::now();
        info!("[umls:install] loading semantic types from {}", path.display());
        let map = Self::from_reader(open_table(path)?, schema)?;
        info!(
            "[umls:install] semantic types loaded in {:.2}s (concepts={})",
            start.elapsed().as_secs_f64(),
            map.len()
        );
        Ok(map)
    }

    /// Build the map from any line source. All-or-nothing: the first bad row fails the load.
    pub fn from_reader<R: BufRead>(reader: R, schema: RrfSchema) -> Result<Self, InstallError> {
        schema.require(MRSTY_FILENAME, &[FIELD_CUI, FIELD_SEMANTIC_TYPE])?;
        let mut types: HashMap<Cui, Vec<SemanticType>> = HashMap::new();
        for record in RrfReader::new(reader, schema, MRSTY_FILENAME) {
            let record = record?;
            types
                .entry(record.field(FIELD_CUI).to_string())
                .or_default()
                .push(record.field(FIELD_SEMANTIC_TYPE).to_string());
        }
        Ok(Self { types })
    }

    /// Semantic types observed for `cui`.
    pub fn get(&self, cui: &str) -> Option<&[SemanticType]> {
        self.types.get(cui).map(Vec::as_slice)
    }

    /// True if `cui` has at least one semantic type.
    pub fn contains(&self, cui: &str) -> bool {
        self.types.contains_key(cui)
    }

    /// Number of distinct concepts.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// True if no concept was loaded.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl FromIterator<(Cui, SemanticType)> for SemanticTypeMap {
    fn from_iter<T: IntoIterator<Item = (Cui, SemanticType)>>(iter: T) -> Self {
        let mut types: HashMap<Cui, Vec<SemanticType>> = HashMap::new();
        for (cui, sty) in iter {
            types.entry(cui).or_default().push(sty);
        }
        Self { types }
    }
}
