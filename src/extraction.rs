//! Extraction, dedup, and semantic-type join over the concept-string stream.
//!
//! The stage is a pull-based iterator: each call to `next` reads concept-string
//! rows until one yields a surface form not seen earlier in the run, joins it
//! with its semantic types, and returns it. The first error ends the stream.

use std::collections::HashSet;

use crate::config::NormalizationOptions;
use crate::constants::rrf::{FIELD_CUI, FIELD_STRING};
use crate::errors::InstallError;
use crate::metrics::ProgressReporter;
use crate::source::{RrfRecord, SemanticTypeMap};
use crate::types::{Cui, SemanticType, SurfaceForm};
use crate::utils::normalize_surface_form;

/// One normalized surface form joined with its concept and semantic types.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtractedTerm {
    /// Normalized surface form, unique within a run.
    pub text: SurfaceForm,
    /// Concept the first occurrence of `text` belongs to.
    pub cui: Cui,
    /// Semantic types of `cui` in MRSTY order.
    pub semantic_types: Vec<SemanticType>,
}

/// Normalized surface forms emitted so far in a run. Only grows.
#[derive(Clone, Debug, Default)]
pub struct SeenSet {
    forms: HashSet<SurfaceForm>,
}

impl SeenSet {
    /// Empty set for a new run.
    pub fn new() -> Self {
        Self::default()
    }

    /// True if `text` was already emitted.
    pub fn contains(&self, text: &str) -> bool {
        self.forms.contains(text)
    }

    /// Record `text`; returns false if it was already present.
    pub fn insert(&mut self, text: SurfaceForm) -> bool {
        self.forms.insert(text)
    }

    /// Number of distinct forms seen.
    pub fn len(&self) -> usize {
        self.forms.len()
    }

    /// True before the first form is recorded.
    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}

/// Counters kept while extracting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    /// Language-filtered rows pulled from the stream.
    pub records: u64,
    /// Terms yielded.
    pub emitted: u64,
    /// Rows dropped because their normalized form was already emitted.
    pub duplicates: u64,
}

/// Lazy extraction stage over a stream of concept-string rows.
pub struct Extractor<'run, I> {
    records: I,
    semantic_types: &'run SemanticTypeMap,
    seen: &'run mut SeenSet,
    options: NormalizationOptions,
    progress: Option<ProgressReporter>,
    stats: ExtractionStats,
    failed: bool,
}

impl<'run, I> Extractor<'run, I>
where
    I: Iterator<Item = Result<RrfRecord, InstallError>>,
{
    /// Extract from `records`, joining against a fully loaded `semantic_types`.
    pub fn new(
        records: I,
        semantic_types: &'run SemanticTypeMap,
        seen: &'run mut SeenSet,
        options: NormalizationOptions,
    ) -> Self {
        Self {
            records,
            semantic_types,
            seen,
            options,
            progress: None,
            stats: ExtractionStats::default(),
            failed: false,
        }
    }

    /// Attach a progress reporter fed with the running record count.
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Counters accumulated so far.
    pub fn stats(&self) -> ExtractionStats {
        self.stats
    }

    fn fail(&mut self, err: InstallError) -> Option<Result<ExtractedTerm, InstallError>> {
        self.failed = true;
        Some(Err(err))
    }
}

impl<I> Iterator for Extractor<'_, I>
where
    I: Iterator<Item = Result<RrfRecord, InstallError>>,
{
    type Item = Result<ExtractedTerm, InstallError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let record = match self.records.next()? {
                Ok(record) => record,
                Err(err) => return self.fail(err),
            };
            self.stats.records += 1;
            if let Some(progress) = &self.progress {
                progress.observe(self.stats.records);
            }

            let text = match normalize_surface_form(record.field(FIELD_STRING), self.options) {
                Ok(text) => text,
                Err(err) => return self.fail(err),
            };
            if self.seen.contains(&text) {
                self.stats.duplicates += 1;
                continue;
            }
            self.seen.insert(text.clone());

            let cui = record.field(FIELD_CUI);
            let Some(semantic_types) = self.semantic_types.get(cui) else {
                return self.fail(InstallError::MissingSemanticTypes {
                    cui: cui.to_string(),
                    line: record.line(),
                });
            };
            self.stats.emitted += 1;
            return Some(Ok(ExtractedTerm {
                text,
                cui: cui.to_string(),
                semantic_types: semantic_types.to_vec(),
            }));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{ConsoStream, RrfSchema};
    use std::io::Cursor;

    fn semantic_types() -> SemanticTypeMap {
        [
            ("C0001".to_string(), "T001".to_string()),
            ("C0002".to_string(), "T047".to_string()),
            ("C0002".to_string(), "T033".to_string()),
        ]
        .into_iter()
        .collect()
    }

    fn stream(data: &'static str) -> ConsoStream<Cursor<&'static str>> {
        ConsoStream::english(Cursor::new(data), RrfSchema::new(["cui", "lat", "str"]).unwrap())
            .unwrap()
    }

    fn lowercase() -> NormalizationOptions {
        NormalizationOptions {
            lowercase: true,
            normalize_unicode: false,
        }
    }

    #[test]
    fn case_variants_collapse_to_first_occurrence() {
        let map = semantic_types();
        let mut seen = SeenSet::new();
        let data = "C0001|ENG|Heart Attack\nC0001|ENG|heart attack\nC0002|SPA|Infarto\n";
        let terms: Vec<ExtractedTerm> = Extractor::new(stream(data), &map, &mut seen, lowercase())
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(
            terms,
            vec![ExtractedTerm {
                text: "heart attack".into(),
                cui: "C0001".into(),
                semantic_types: vec!["T001".into()],
            }]
        );
        assert_eq!(seen.len(), 1);
    }

    #[test]
    fn without_lowercase_case_variants_are_distinct() {
        let map = semantic_types();
        let mut seen = SeenSet::new();
        let data = "C0001|ENG|Heart Attack\nC0001|ENG| heart attack \n";
        let texts: Vec<String> = Extractor::new(
            stream(data),
            &map,
            &mut seen,
            NormalizationOptions::default(),
        )
        .map(|term| term.unwrap().text)
        .collect();
        assert_eq!(texts, vec!["Heart Attack", "heart attack"]);
    }

    #[test]
    fn first_concept_wins_for_shared_surface_form() {
        let map = semantic_types();
        let mut seen = SeenSet::new();
        let data = "C0002|ENG|Cold\nC0001|ENG|cold\nC0002|ENG|Common cold\n";
        let mut extractor = Extractor::new(stream(data), &map, &mut seen, lowercase());
        let terms: Vec<ExtractedTerm> = extractor.by_ref().map(Result::unwrap).collect();
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[0].cui, "C0002");
        assert_eq!(terms[0].semantic_types, vec!["T047", "T033"]);
        assert_eq!(terms[1].text, "common cold");
        assert_eq!(
            extractor.stats(),
            ExtractionStats {
                records: 3,
                emitted: 2,
                duplicates: 1,
            }
        );
    }

    #[test]
    fn missing_semantic_types_abort_the_stream() {
        let map = semantic_types();
        let mut seen = SeenSet::new();
        let data = "C0001|ENG|Angina\nC9999|ENG|Orphan\nC0002|ENG|Fever\n";
        let mut extractor = Extractor::new(stream(data), &map, &mut seen, lowercase());
        assert!(extractor.next().unwrap().is_ok());
        match extractor.next().unwrap() {
            Err(InstallError::MissingSemanticTypes { cui, line }) => {
                assert_eq!(cui, "C9999");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(extractor.next().is_none());
        assert_eq!(extractor.stats().emitted, 1);
    }

    #[test]
    fn duplicate_of_orphan_is_not_joined_twice() {
        let map = semantic_types();
        let mut seen = SeenSet::new();
        seen.insert("orphan".into());
        let data = "C9999|ENG|Orphan\n";
        let terms: Vec<_> = Extractor::new(stream(data), &map, &mut seen, lowercase()).collect();
        assert!(terms.is_empty());
    }

    #[test]
    fn blank_surface_form_joins_like_any_other() {
        let map = semantic_types();
        let mut seen = SeenSet::new();
        let data = "C0001|ENG|   \nC0002|ENG|\nC0001|ENG|Angina\n";
        let mut extractor = Extractor::new(stream(data), &map, &mut seen, lowercase());
        let terms: Vec<ExtractedTerm> = extractor.by_ref().map(Result::unwrap).collect();
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[0].text, "");
        assert_eq!(terms[0].cui, "C0001");
        assert_eq!(terms[1].text, "angina");
        assert_eq!(extractor.stats().duplicates, 1);
    }

    #[test]
    fn blank_surface_form_with_unknown_concept_aborts() {
        let map = semantic_types();
        let mut seen = SeenSet::new();
        let data = "C9999|ENG|\nC0001|ENG|Angina\n";
        let results: Vec<_> = Extractor::new(stream(data), &map, &mut seen, lowercase()).collect();
        assert_eq!(results.len(), 1);
        match &results[0] {
            Err(InstallError::MissingSemanticTypes { cui, line }) => {
                assert_eq!(cui, "C9999");
                assert_eq!(*line, 1);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn seen_set_spans_multiple_extractors_in_one_run() {
        let map = semantic_types();
        let mut seen = SeenSet::new();
        let first: Vec<_> =
            Extractor::new(stream("C0001|ENG|Angina\n"), &map, &mut seen, lowercase()).collect();
        assert_eq!(first.len(), 1);
        let second: Vec<_> =
            Extractor::new(stream("C0002|ENG|ANGINA\n"), &map, &mut seen, lowercase()).collect();
        assert!(second.is_empty());
    }

    #[cfg(feature = "unicode")]
    #[test]
    fn ascii_folding_participates_in_dedup() {
        let map = semantic_types();
        let mut seen = SeenSet::new();
        let data = "C0001|ENG|Ménière disease\nC0001|ENG|Meniere disease\n";
        let options = NormalizationOptions {
            lowercase: false,
            normalize_unicode: true,
        };
        let texts: Vec<String> = Extractor::new(stream(data), &map, &mut seen, options)
            .map(|term| term.unwrap().text)
            .collect();
        assert_eq!(texts, vec!["Meniere disease"]);
    }
}
