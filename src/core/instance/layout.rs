use std::path::{Path, PathBuf};

use super::paths::normalize_lexically;

/// Well-known locations inside an instance directory.
///
/// The instance root is the ownership boundary for every file operation.
/// `natives/` holds platform libraries, `lib/` legacy loader data and
/// `.launcher-tmp/` scratch space for runtime artifacts.
#[derive(Debug, Clone)]
pub struct InstanceLayout {
    root: PathBuf,
}

impl InstanceLayout {
    pub fn new(root: &Path) -> Self {
        Self {
            root: normalize_lexically(root),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn natives_dir(&self) -> PathBuf {
        self.root.join("natives")
    }

    pub fn lib_dir(&self) -> PathBuf {
        self.root.join("lib")
    }

    /// Scratch directory for downloads that never land at their final path.
    pub fn scratch_dir(&self) -> PathBuf {
        self.root.join(".launcher-tmp")
    }
}
