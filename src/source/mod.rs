//! RRF table decoding shared by the semantic-type loader and the concept-string stream.
//!
//! Ownership model:
//! - `RrfSchema` names the positional columns of one table and is shared by
//!   every record decoded from it.
//! - `RrfReader` owns the line source and yields one `RrfRecord` per
//!   non-blank line, failing hard on rows shorter than the schema.

use std::io::{self, BufRead};
use std::sync::Arc;

use indexmap::IndexSet;

use crate::constants::rrf::FIELD_DELIMITER;
use crate::errors::InstallError;
use crate::types::{FieldName, TableName};

/// Semantic-type loader over MRSTY.
pub mod mrsty;
/// Language-filtered concept-string stream over MRCONSO.
pub mod mrconso;

pub use mrconso::ConsoStream;
pub use mrsty::SemanticTypeMap;

/// Ordered column names of an RRF table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RrfSchema {
    columns: IndexSet<FieldName>,
}

impl RrfSchema {
    /// Build a schema from column names in file order. Names must be unique.
    pub fn new<I, S>(columns: I) -> Result<Self, InstallError>
    where
        I: IntoIterator<Item = S>,
        S: Into<FieldName>,
    {
        let mut set = IndexSet::new();
        for column in columns {
            let column = column.into();
            if !set.insert(column.clone()) {
                return Err(InstallError::Configuration(format!(
                    "duplicate column '{column}' in table schema"
                )));
            }
        }
        if set.is_empty() {
            return Err(InstallError::Configuration(
                "table schema must name at least one column".into(),
            ));
        }
        Ok(Self { columns: set })
    }

    pub(crate) fn from_static(columns: &[&'static str]) -> Self {
        Self {
            columns: columns.iter().map(|name| name.to_string()).collect(),
        }
    }

    /// Number of columns a row must carry.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// True if the schema has no columns (never true for a constructed schema).
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Column names in positional order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    /// Position of `name` in the row, if the schema has it.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.get_index_of(name)
    }

    /// Check that every column in `fields` is part of this schema.
    pub fn require(&self, table: &str, fields: &[&str]) -> Result<(), InstallError> {
        let missing: Vec<&str> = fields
            .iter()
            .copied()
            .filter(|field| self.position(field).is_none())
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        Err(InstallError::Configuration(format!(
            "{table} schema is missing required column(s): {}",
            missing.join(", ")
        )))
    }
}

/// One decoded row of an RRF table.
#[derive(Clone, Debug)]
pub struct RrfRecord {
    schema: Arc<RrfSchema>,
    values: Vec<String>,
    line: u64,
}

impl RrfRecord {
    /// Decode `raw` against `schema`.
    ///
    /// Returns `Ok(None)` for blank lines. Rows that end with the RRF terminating
    /// delimiter carry one empty extra field; extra fields are dropped.
    pub fn decode(
        schema: &Arc<RrfSchema>,
        table: &str,
        line: u64,
        raw: &str,
    ) -> Result<Option<Self>, InstallError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let expected = schema.len();
        let mut values: Vec<String> = trimmed
            .split(FIELD_DELIMITER)
            .take(expected)
            .map(str::to_string)
            .collect();
        if values.len() < expected {
            return Err(InstallError::SchemaViolation {
                table: table.to_string(),
                line,
                expected,
                found: values.len(),
            });
        }
        values.shrink_to_fit();
        Ok(Some(Self {
            schema: Arc::clone(schema),
            values,
            line,
        }))
    }

    /// Value of column `name`, if the schema has it.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.schema
            .position(name)
            .and_then(|idx| self.values.get(idx))
            .map(String::as_str)
    }

    /// Value of a column the schema was validated to contain.
    pub(crate) fn field(&self, name: &str) -> &str {
        self.get(name).unwrap_or_default()
    }

    /// 1-based line number of this row in its table.
    pub fn line(&self) -> u64 {
        self.line
    }

    /// Iterate `(column, value)` pairs in schema order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.schema
            .columns()
            .zip(self.values.iter().map(String::as_str))
    }
}

/// Pull-based decoder over the lines of one RRF table.
pub struct RrfReader<R> {
    lines: io::Lines<R>,
    schema: Arc<RrfSchema>,
    table: TableName,
    line: u64,
    failed: bool,
}

impl<R: BufRead> RrfReader<R> {
    /// Decode rows from `reader` using `schema`; `table` labels diagnostics.
    pub fn new(reader: R, schema: RrfSchema, table: impl Into<TableName>) -> Self {
        Self {
            lines: reader.lines(),
            schema: Arc::new(schema),
            table: table.into(),
            line: 0,
            failed: false,
        }
    }

    /// The schema rows are decoded with.
    pub fn schema(&self) -> &RrfSchema {
        &self.schema
    }
}

impl<R: BufRead> Iterator for RrfReader<R> {
    type Item = Result<RrfRecord, InstallError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let raw = match self.lines.next()? {
                Ok(raw) => raw,
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err.into()));
                }
            };
            self.line += 1;
            match RrfRecord::decode(&self.schema, &self.table, self.line, &raw) {
                Ok(Some(record)) => return Some(Ok(record)),
                Ok(None) => continue,
                Err(err) => {
                    self.failed = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
