use std::process::ExitCode;

use tracing_subscriber::EnvFilter;
use umls_install::InstallError;
use umls_install::constants::install::{EXIT_FAILURE, EXIT_MISSING_DEPENDENCY};

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    match umls_install::cli::run_install(std::env::args().skip(1)) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            if let Some(usage) = err.downcast_ref::<clap::Error>() {
                let _ = usage.print();
                return ExitCode::from(2);
            }
            eprintln!("umls-install: {err}");
            match err.downcast_ref::<InstallError>() {
                Some(InstallError::UnicodeNormalizationUnavailable) => {
                    ExitCode::from(EXIT_MISSING_DEPENDENCY)
                }
                _ => ExitCode::from(EXIT_FAILURE),
            }
        }
    }
}
