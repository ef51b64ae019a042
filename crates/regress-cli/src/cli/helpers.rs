use super::CliError;
use regress_core::domain::HarnessError;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

pub(super) const INSTALL_DIR_VAR: &str = "PHOSIMDIR";

/// Logging goes to stderr; stdout is reserved for the comparison
/// failure list.
pub(super) fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

pub(super) fn resolve_install_dir(flag: Option<PathBuf>) -> Result<PathBuf, CliError> {
    if let Some(dir) = flag {
        return Ok(dir);
    }
    match std::env::var_os(INSTALL_DIR_VAR) {
        Some(dir) if !dir.is_empty() => Ok(PathBuf::from(dir)),
        _ => Err(CliError::Harness(HarnessError::config(
            "CONFIG.INSTALL_DIR",
            format!(
                "no simulator install directory; pass --phosim-dir or set ${}",
                INSTALL_DIR_VAR
            ),
        ))),
    }
}

pub(super) fn resolve_install_path(install_root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        install_root.join(path)
    }
}

pub(super) fn harness(error: impl Into<HarnessError>) -> CliError {
    CliError::Harness(error.into())
}
