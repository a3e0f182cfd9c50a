/// Concept unique identifier shared by MRCONSO and MRSTY.
/// Example: `C0027051`
pub type Cui = String;
/// Semantic type label attached to a concept.
/// Examples: `T047`, `T121`
pub type SemanticType = String;
/// Surface form of a concept, raw or normalized.
/// Examples: `Heart Attack`, `heart attack`
pub type SurfaceForm = String;
/// Column name inside an RRF table schema.
/// Examples: `cui`, `lat`, `str`
pub type FieldName = String;
/// Human-readable table label used in diagnostics.
/// Examples: `MRCONSO.RRF`, `MRSTY.RRF`
pub type TableName = String;
/// Marker file name written into the destination directory.
/// Examples: `lowercase.flag`, `normalize-unicode.flag`
pub type FlagName = &'static str;
