use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum CollectError {
    #[error("No files found under {}", folder.display())]
    NoFilesFound { folder: PathBuf },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Recursively lists all regular files under `root`, sorted
/// lexicographically. Symbolic links are never followed, whether they point
/// at files or directories. Zero matches is a fatal error, raised here so
/// no empty artifact is ever uploaded.
pub fn collect_files(root: &Path) -> Result<Vec<PathBuf>, CollectError> {
    let mut files = Vec::new();
    visit_dir(root, &mut files)?;
    if files.is_empty() {
        return Err(CollectError::NoFilesFound {
            folder: root.to_path_buf(),
        });
    }
    files.sort();
    info!(count = files.len(), root = %root.display(), "Collected files");
    Ok(files)
}

fn visit_dir(dir: &Path, results: &mut Vec<PathBuf>) -> Result<(), CollectError> {
    for entry_res in fs::read_dir(dir)? {
        let entry = entry_res?;
        // file_type() does not traverse symlinks
        let file_type = entry.file_type()?;
        let path = entry.path();
        if file_type.is_symlink() {
            debug!(path = %path.display(), "Skipping symlink");
            continue;
        }
        if file_type.is_dir() {
            visit_dir(&path, results)?;
        } else if file_type.is_file() {
            results.push(path);
        }
    }
    Ok(())
}
