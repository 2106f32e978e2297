//! All-or-nothing output files.
//!
//! Each output is first written to a temporary file next to its target and
//! only renamed into place once every output of the run is staged. If a
//! rename fails, the outputs already renamed by this run are removed again.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::CompileError;

/// An output written to a temporary sibling of its target.
#[derive(Debug)]
pub struct StagedFile {
    target: PathBuf,
    temp: NamedTempFile,
}

impl StagedFile {
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }
}

/// Write `bytes` to a temporary file in the target's directory.
pub fn stage(target: &Path, bytes: &[u8]) -> Result<StagedFile, CompileError> {
    let dir = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let io_error = |source| CompileError::Io {
        path: target.to_path_buf(),
        source,
    };

    let mut temp = NamedTempFile::new_in(dir).map_err(io_error)?;
    temp.write_all(bytes).map_err(io_error)?;
    temp.as_file().sync_all().map_err(io_error)?;

    tracing::trace!(target = %target.display(), bytes = bytes.len(), "output staged");
    Ok(StagedFile {
        target: target.to_path_buf(),
        temp,
    })
}

/// Rename every staged file into place.
///
/// # Errors
///
/// On the first failed rename, removes the targets already written by this
/// call and returns the error. Staged files not yet renamed are deleted when
/// dropped.
pub fn commit(staged: Vec<StagedFile>) -> Result<Vec<PathBuf>, CompileError> {
    let mut written: Vec<PathBuf> = Vec::with_capacity(staged.len());
    for file in staged {
        let target = file.target;
        if let Err(e) = file.temp.persist(&target) {
            for path in &written {
                if let Err(cleanup) = std::fs::remove_file(path) {
                    tracing::warn!(path = %path.display(), "failed to roll back output: {cleanup}");
                }
            }
            return Err(CompileError::Io {
                path: target,
                source: e.error,
            });
        }
        tracing::debug!(path = %target.display(), "output written");
        written.push(target);
    }
    Ok(written)
}

/// Stage and commit a single output.
pub fn write_atomic(target: &Path, bytes: &[u8]) -> Result<PathBuf, CompileError> {
    let mut written = commit(vec![stage(target, bytes)?])?;
    written.pop().ok_or_else(|| CompileError::Io {
        path: target.to_path_buf(),
        source: std::io::Error::other("nothing was written"),
    })
}
