//! Run-scoped scratch directory with guaranteed removal.

use crate::error::{MeditoneError, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A scratch directory owned by exactly one pipeline run.
///
/// The directory is removed when the guard is closed or dropped, on every
/// exit path. Removal failures are logged and never returned.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
    removed: bool,
}

impl ScratchDir {
    /// Create `<root>/<run_id>`.
    ///
    /// # Errors
    /// - `ScratchDirExists` if the directory is already present, which means
    ///   another run with the same id is active or was not cleaned up
    /// - `Io` for any other filesystem failure
    pub fn create(root: &Path, run_id: &str) -> Result<Self> {
        fs::create_dir_all(root)?;

        let path = root.join(run_id);
        match fs::create_dir(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(MeditoneError::ScratchDirExists {
                    path: path.display().to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        debug!(path = %path.display(), "scratch directory created");
        Ok(Self {
            path,
            removed: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory and everything in it now.
    pub fn close(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if self.removed {
            return;
        }
        self.removed = true;

        match fs::remove_dir_all(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "scratch directory removed"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove scratch directory"
            ),
        }
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        self.remove();
    }
}
