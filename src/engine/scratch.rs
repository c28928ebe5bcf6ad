//! engine::scratch
//!
//! Temporary working copies scoped to one action.
//!
//! A [`ScratchSpace`] owns a temporary directory that is removed when the
//! value is dropped, so scratch clones disappear on success and on every
//! error path alike.

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use super::error::WorkflowError;

const PREFIX: &str = "ris-puppet-";

/// Name of the control repository checkout inside a parent directory.
pub const CONTROL_REPO_DIR: &str = "control_repo";

#[derive(Debug)]
pub struct ScratchSpace {
    dir: TempDir,
}

impl ScratchSpace {
    /// Create a scratch directory under `parent`, or the system temp dir.
    pub fn create(parent: Option<&Path>) -> Result<Self, WorkflowError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(PREFIX);
        let dir = match parent {
            Some(parent) => {
                fs::create_dir_all(parent).map_err(WorkflowError::Scratch)?;
                builder.tempdir_in(parent)
            }
            None => builder.tempdir(),
        }
        .map_err(WorkflowError::Scratch)?;
        debug!(path = %dir.path().display(), "created scratch space");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the control repository is cloned inside this space.
    pub fn control_repo_dir(&self) -> PathBuf {
        self.dir.path().join(CONTROL_REPO_DIR)
    }
}

impl Drop for ScratchSpace {
    fn drop(&mut self) {
        debug!(path = %self.dir.path().display(), "removing scratch space");
    }
}
