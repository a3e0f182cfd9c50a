use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use crate::constants::rrf::TABLE_SEARCH_DEPTH;
use crate::errors::InstallError;
use crate::types::FlagName;

const TABLE_READ_BUFFER: usize = 1 << 20;

/// Create `dir` and any missing parents.
pub fn ensure_dir(dir: &Path) -> Result<(), InstallError> {
    fs::create_dir_all(dir)?;
    Ok(())
}

/// Open a source table for buffered line reading.
pub fn open_table(path: &Path) -> Result<BufReader<File>, InstallError> {
    let file = File::open(path).map_err(|err| {
        io::Error::new(
            err.kind(),
            format!("failed to open {}: {err}", path.display()),
        )
    })?;
    Ok(BufReader::with_capacity(TABLE_READ_BUFFER, file))
}

/// Count newline-terminated lines (plus a trailing unterminated one) in `path`.
pub fn count_lines(path: &Path) -> Result<u64, InstallError> {
    count_lines_in(open_table(path)?)
}

/// Count lines from any reader without decoding them.
pub fn count_lines_in<R: Read>(reader: R) -> Result<u64, InstallError> {
    let mut reader = BufReader::new(reader);
    let mut count = 0u64;
    let mut last = None;
    loop {
        let chunk = reader.fill_buf()?;
        if chunk.is_empty() {
            break;
        }
        count += chunk.iter().filter(|byte| **byte == b'\n').count() as u64;
        last = chunk.last().copied();
        let consumed = chunk.len();
        reader.consume(consumed);
    }
    if last.is_some_and(|byte| byte != b'\n') {
        count += 1;
    }
    Ok(count)
}

/// Find table `name` directly under `root`, or nested a few levels below it
/// (distributions usually ship tables under `META/`).
pub fn locate_table(root: &Path, name: &str) -> Result<PathBuf, InstallError> {
    let direct = root.join(name);
    if direct.is_file() {
        return Ok(direct);
    }
    let mut candidates: Vec<PathBuf> = WalkDir::new(root)
        .max_depth(TABLE_SEARCH_DEPTH)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file() && entry.file_name() == name)
        .map(|entry| entry.into_path())
        .collect();
    candidates.sort();
    candidates.into_iter().next().ok_or_else(|| {
        InstallError::Configuration(format!(
            "{name} not found under {} (searched {TABLE_SEARCH_DEPTH} levels)",
            root.display()
        ))
    })
}

/// Delete the file at `path` left by an earlier run. Returns true if one was removed.
///
/// A missing file is not an error; any other failure is.
pub fn remove_stale_file(path: &Path) -> Result<bool, InstallError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(err) => Err(io::Error::new(
            err.kind(),
            format!("failed to remove {}: {err}", path.display()),
        )
        .into()),
    }
}

/// Write the zero-byte marker `flag` into `dir`.
pub fn write_flag(dir: &Path, flag: FlagName) -> Result<PathBuf, InstallError> {
    let path = dir.join(flag);
    File::create(&path)?;
    Ok(path)
}

/// Remove a stale marker `flag` from `dir`, if present. Returns true if one was removed.
pub fn clear_flag(dir: &Path, flag: FlagName) -> Result<bool, InstallError> {
    let path = dir.join(flag);
    let removed = remove_stale_file(&path)?;
    if removed {
        warn!("[umls:install] removed stale flag {}", path.display());
    }
    Ok(removed)
}
