use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use crate::constants::rrf::{ENGLISH, FIELD_CUI, FIELD_LANGUAGE, FIELD_STRING, MRCONSO_FILENAME};
use crate::errors::InstallError;
use crate::source::{RrfReader, RrfRecord, RrfSchema};
use crate::transport::fs::open_table;

/// Lazy MRCONSO stream that yields only rows in one language.
///
/// Rows in other languages are skipped without being counted or logged. The
/// stream keeps no state beyond the current line and cannot be rewound; a new
/// pass means opening the table again.
pub struct ConsoStream<R> {
    rows: RrfReader<R>,
    language: Cow<'static, str>,
}

impl ConsoStream<BufReader<File>> {
    /// Open the concept-string table at `path`.
    pub fn open(
        path: &Path,
        schema: RrfSchema,
        language: impl Into<Cow<'static, str>>,
    ) -> Result<Self, InstallError> {
        Self::from_reader(open_table(path)?, schema, language)
    }
}

impl<R: BufRead> ConsoStream<R> {
    /// Stream rows from any line source.
    pub fn from_reader(
        reader: R,
        schema: RrfSchema,
        language: impl Into<Cow<'static, str>>,
    ) -> Result<Self, InstallError> {
        schema.require(MRCONSO_FILENAME, &[FIELD_CUI, FIELD_LANGUAGE, FIELD_STRING])?;
        Ok(Self {
            rows: RrfReader::new(reader, schema, MRCONSO_FILENAME),
            language: language.into(),
        })
    }

    /// English-only stream from any line source.
    pub fn english(reader: R, schema: RrfSchema) -> Result<Self, InstallError> {
        Self::from_reader(reader, schema, ENGLISH)
    }
}

impl<R: BufRead> Iterator for ConsoStream<R> {
    type Item = Result<RrfRecord, InstallError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.rows.next()? {
                Ok(record) if record.field(FIELD_LANGUAGE) == self.language.as_ref() => {
                    return Some(Ok(record));
                }
                Ok(_) => continue,
                Err(err) => return Some(Err(err)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn schema() -> RrfSchema {
        RrfSchema::new(["cui", "lat", "str"]).unwrap()
    }

    #[test]
    fn yields_only_english_rows() {
        let data = "C0001|ENG|Heart Attack\nC0002|SPA|Infarto\nC0003|FRE|Infarctus\nC0004|ENG|Angina\n";
        let strings: Vec<String> = ConsoStream::english(Cursor::new(data), schema())
            .unwrap()
            .map(|record| record.unwrap().field(FIELD_STRING).to_string())
            .collect();
        assert_eq!(strings, vec!["Heart Attack", "Angina"]);
    }

    #[test]
    fn language_is_configurable() {
        let data = "C0001|ENG|Heart Attack\nC0002|SPA|Infarto\n";
        let strings: Vec<String> = ConsoStream::from_reader(Cursor::new(data), schema(), "SPA")
            .unwrap()
            .map(|record| record.unwrap().field(FIELD_STRING).to_string())
            .collect();
        assert_eq!(strings, vec!["Infarto"]);
    }

    #[test]
    fn malformed_non_english_row_still_fails() {
        let data = "C0001|ENG|Heart Attack\nC0002|SPA\n";
        let results: Vec<Result<RrfRecord, InstallError>> =
            ConsoStream::english(Cursor::new(data), schema())
                .unwrap()
                .collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(
            results[1],
            Err(InstallError::SchemaViolation { line: 2, .. })
        ));
    }
}
