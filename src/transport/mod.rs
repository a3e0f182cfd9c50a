/// Filesystem helpers for source tables, output directories, and flag files.
pub mod fs;
