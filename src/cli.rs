use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, error::ErrorKind};

use crate::config::InstallConfig;
use crate::constants::install::PROGRESS_BATCH_SIZE;
use crate::constants::rrf::ENGLISH;
use crate::driver::{InstallSummary, install};

#[derive(Debug, Parser)]
#[command(
    name = "umls-install",
    version,
    disable_help_subcommand = true,
    about = "Build the term indexes from a UMLS distribution",
    long_about = "Stream MRCONSO.RRF and MRSTY.RRF once and build an n-gram similarity index plus an exact surface-form to concept store.",
    after_help = "Tables are looked up directly in UMLS_INSTALLATION_PATH first, then in nested directories such as META/."
)]
/// CLI for `umls-install`.
///
/// Common usage:
/// - Default English build: `umls-install /data/umls/2024AA /data/quickumls`
/// - Case-insensitive ASCII build: `umls-install -L -U /data/umls/2024AA /data/quickumls`
struct InstallCli {
    #[arg(
        value_name = "UMLS_INSTALLATION_PATH",
        help = "Location of UMLS installation files (`MRCONSO.RRF` and `MRSTY.RRF`)"
    )]
    umls_installation_path: PathBuf,
    #[arg(
        value_name = "DESTINATION_PATH",
        help = "Location where the index files are installed"
    )]
    destination_path: PathBuf,
    #[arg(
        short = 'L',
        long,
        help = "Consider only lowercase version of tokens"
    )]
    lowercase: bool,
    #[arg(
        short = 'U',
        long = "normalize-unicode",
        help = "Normalize unicode strings to their closest ASCII representation"
    )]
    normalize_unicode: bool,
    #[arg(
        long,
        default_value = ENGLISH,
        help = "Language code kept from MRCONSO"
    )]
    language: String,
    #[arg(
        long = "progress-every",
        default_value_t = PROGRESS_BATCH_SIZE,
        value_parser = parse_positive_u64,
        help = "Number of records between progress lines"
    )]
    progress_every: u64,
}

impl InstallCli {
    fn into_config(self) -> InstallConfig {
        InstallConfig::new(self.umls_installation_path, self.destination_path)
            .with_lowercase(self.lowercase)
            .with_normalize_unicode(self.normalize_unicode)
            .with_language(self.language)
            .with_progress_every(self.progress_every)
    }
}

/// Parse `args_iter` (without the program name) and run a full install.
///
/// Returns `Ok(None)` when only help or version output was requested.
pub fn run_install<I>(args_iter: I) -> Result<Option<InstallSummary>, Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let Some(cli) =
        parse_cli::<InstallCli, _>(std::iter::once("umls-install".to_string()).chain(args_iter))?
    else {
        return Ok(None);
    };
    let config = cli.into_config();
    let summary = install(&config)?;
    Ok(Some(summary))
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}

fn parse_positive_u64(raw: &str) -> Result<u64, String> {
    let value = raw
        .parse::<u64>()
        .map_err(|_| format!("invalid value '{raw}': expected a positive integer"))?;
    if value == 0 {
        return Err("value must be greater than zero".to_string());
    }
    Ok(value)
}
