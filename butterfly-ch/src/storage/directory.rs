//! Location of a storage's segment files

use std::path::{Path, PathBuf};

use butterfly_common::Result;

/// Where segments live: in memory only, or mirrored to files under a directory
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Directory {
    location: Option<PathBuf>,
}

impl Directory {
    /// Memory-only directory; `flush` is a no-op and `load_existing` finds nothing
    pub fn ram() -> Self {
        Self { location: None }
    }

    /// Directory persisted under `path`
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            location: Some(path.into()),
        }
    }

    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    pub fn is_persistent(&self) -> bool {
        self.location.is_some()
    }

    /// Path of a named segment, if persistent
    pub fn segment_path(&self, name: &str) -> Option<PathBuf> {
        self.location.as_ref().map(|dir| dir.join(name))
    }

    /// Create the directory on disk if needed
    pub fn ensure_exists(&self) -> Result<()> {
        if let Some(dir) = &self.location {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}
