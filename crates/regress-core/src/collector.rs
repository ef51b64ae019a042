use crate::domain::{HarnessError, ARTIFACT_SUBDIRS};
use crate::driver::SimulatorInstall;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Copies the simulator's `output/` and `work/` artifacts into matching
/// subdirectories under `dest_root`, creating those subdirectories
/// first. Only plain files are copied; nested directories are skipped.
/// A source subdirectory the install never created is treated as empty.
/// Existing destination files are overwritten, so re-collecting after a
/// repeated run converges on the latest artifacts.
pub fn collect_outputs(install: &SimulatorInstall, dest_root: &Path) -> Result<(), CollectError> {
    for subdir in ARTIFACT_SUBDIRS {
        let dest = dest_root.join(subdir);
        fs::create_dir_all(&dest).map_err(|source| CollectError::CreateDir {
            path: dest.clone(),
            source,
        })?;

        let src = install.root().join(subdir);
        let entries = match fs::read_dir(&src) {
            Ok(entries) => entries,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                debug!("no '{subdir}' directory under {}, nothing to collect", install.root().display());
                continue;
            }
            Err(source) => return Err(CollectError::ReadDir { path: src, source }),
        };

        let mut copied = 0usize;
        for entry in entries {
            let entry = entry.map_err(|source| CollectError::ReadDir {
                path: src.clone(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let target = dest.join(entry.file_name());
            fs::copy(&path, &target).map_err(|source| CollectError::CopyFile {
                path: path.clone(),
                source,
            })?;
            copied += 1;
        }
        debug!("collected {copied} file(s) from {}", src.display());
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    #[error("failed to create collection directory '{}': {source}", path.display())]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to read simulator directory '{}': {source}", path.display())]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to copy simulator artifact '{}': {source}", path.display())]
    CopyFile {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl From<CollectError> for HarnessError {
    fn from(error: CollectError) -> Self {
        HarnessError::io_system("IO.COLLECT", error.to_string())
    }
}
