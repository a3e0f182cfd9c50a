/// Constants describing the RRF source tables.
pub mod rrf {
    /// Field separator used by every RRF table.
    pub const FIELD_DELIMITER: char = '|';
    /// File name of the concept-string table.
    pub const MRCONSO_FILENAME: &str = "MRCONSO.RRF";
    /// File name of the concept-to-semantic-type table.
    pub const MRSTY_FILENAME: &str = "MRSTY.RRF";
    /// Language code kept by the concept-string stream.
    pub const ENGLISH: &str = "ENG";
    /// Maximum directory depth searched when a table is not at the installation root.
    pub const TABLE_SEARCH_DEPTH: usize = 3;

    /// Column holding the concept identifier in both tables.
    pub const FIELD_CUI: &str = "cui";
    /// Column holding the language code in MRCONSO.
    pub const FIELD_LANGUAGE: &str = "lat";
    /// Column holding the surface form in MRCONSO.
    pub const FIELD_STRING: &str = "str";
    /// Column holding the semantic type in MRSTY.
    pub const FIELD_SEMANTIC_TYPE: &str = "sty";

    /// Default positional schema for MRCONSO rows.
    pub const MRCONSO_HEADERS: [&str; 18] = [
        "cui", "lat", "ts", "lui", "stt", "sui", "ispref", "aui", "saui", "scui", "sdui", "sab",
        "tty", "code", "str", "srl", "suppress", "cvf",
    ];
    /// Default positional schema for MRSTY rows.
    pub const MRSTY_HEADERS: [&str; 6] = ["cui", "sty", "hier", "desc", "sid", "num"];
}

/// Constants used by the install run and its output layout.
pub mod install {
    /// Number of English records between two progress status lines.
    pub const PROGRESS_BATCH_SIZE: u64 = 100_000;
    /// Directory (under the destination) holding the similarity index.
    pub const SIMSTRING_DB_DIR: &str = "umls-simstring.db";
    /// Directory (under the destination) holding the exact-lookup store.
    pub const CUI_SEMTYPES_DB_DIR: &str = "cui-semtypes.db";
    /// Marker written when surface forms were ASCII folded.
    pub const NORMALIZE_UNICODE_FLAG: &str = "normalize-unicode.flag";
    /// Marker written when surface forms were lowercased.
    pub const LOWERCASE_FLAG: &str = "lowercase.flag";
    /// Exit status used when ASCII folding is requested but not compiled in.
    pub const EXIT_MISSING_DEPENDENCY: u8 = 3;
    /// Exit status used for every other failed run.
    pub const EXIT_FAILURE: u8 = 1;
}

/// Constants used by the n-gram similarity index.
pub mod simstring {
    /// Data file inside the similarity index directory.
    pub const STORE_FILENAME: &str = "terms.simstring";
    /// Character n-gram size.
    pub const NGRAM_SIZE: usize = 3;
    /// Padding mark added on both sides of a string before n-gram extraction.
    pub const PAD_MARK: char = '$';
    /// Separator between an n-gram and its occurrence number.
    pub const REPEAT_MARK: char = '#';
    /// Key of the index metadata record.
    pub const META_KEY: &[u8] = b"__meta__";
    /// Key prefix for stored strings (followed by a little-endian id).
    pub const STRING_KEY_PREFIX: &[u8] = b"str:";
    /// Key prefix for posting lists (followed by feature count and n-gram).
    pub const POSTING_KEY_PREFIX: &[u8] = b"ng:";
    /// Version tag for the persisted metadata record.
    pub const INDEX_VERSION: u8 = 1;
}

/// Constants used by the exact-lookup store.
pub mod cui_semtypes {
    /// Data file inside the exact-lookup store directory.
    pub const STORE_FILENAME: &str = "cui-semtypes.bin";
    /// Key prefix for term to concept-list records.
    pub const TERM_KEY_PREFIX: &[u8] = b"term:";
    /// Key prefix for concept to semantic-type records.
    pub const CUI_KEY_PREFIX: &[u8] = b"cui:";
    /// Version tag prefixed to every persisted value.
    pub const RECORD_VERSION: u8 = 1;
}
