// ─── Home Projection ───
// Makes instance content visible inside the compatibility home. Strategies
// are tried in order; the first that succeeds wins.

use std::collections::HashSet;
use std::ffi::OsString;
use std::io;
use std::path::Path;

use tracing::{debug, warn};

pub trait ProjectionStrategy: Send + Sync {
    fn name(&self) -> &'static str;
    fn project(&self, source: &Path, target: &Path) -> io::Result<()>;
}

/// Replace `target` with a symbolic link to `source`.
pub struct TryLink;

impl ProjectionStrategy for TryLink {
    fn name(&self) -> &'static str {
        "link"
    }

    fn project(&self, source: &Path, target: &Path) -> io::Result<()> {
        if let Ok(meta) = std::fs::symlink_metadata(target) {
            if meta.file_type().is_symlink() {
                if std::fs::read_link(target).is_ok_and(|existing| existing == source) {
                    return Ok(());
                }
                remove_link(target)?;
            } else if meta.is_dir() {
                std::fs::remove_dir_all(target)?;
            } else {
                std::fs::remove_file(target)?;
            }
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        create_link(source, target)
    }
}

/// Recursive mirror: adds, updates and removes files and empty directories
/// so `target` matches `source`. Links found in `target` are left alone.
pub struct MirrorCopy;

impl ProjectionStrategy for MirrorCopy {
    fn name(&self) -> &'static str {
        "mirror"
    }

    fn project(&self, source: &Path, target: &Path) -> io::Result<()> {
        if is_symlink(target) {
            return Ok(());
        }
        if source.is_dir() {
            if target.is_file() {
                std::fs::remove_file(target)?;
            }
            mirror_dir(source, target)
        } else {
            if target.is_dir() {
                std::fs::remove_dir_all(target)?;
            }
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            copy_if_changed(source, target)
        }
    }
}

fn mirror_dir(source: &Path, target: &Path) -> io::Result<()> {
    std::fs::create_dir_all(target)?;

    let mut wanted: HashSet<OsString> = HashSet::new();
    for entry in std::fs::read_dir(source)? {
        let entry = entry?;
        let name = entry.file_name();
        let src = entry.path();
        let dst = target.join(&name);
        wanted.insert(name);

        if is_symlink(&dst) {
            continue;
        }
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            if dst.is_file() {
                std::fs::remove_file(&dst)?;
            }
            mirror_dir(&src, &dst)?;
        } else if file_type.is_file() {
            if dst.is_dir() {
                std::fs::remove_dir_all(&dst)?;
            }
            copy_if_changed(&src, &dst)?;
        }
    }

    for entry in std::fs::read_dir(target)? {
        let entry = entry?;
        if wanted.contains(&entry.file_name()) {
            continue;
        }
        let file_type = entry.file_type()?;
        if file_type.is_symlink() {
            continue;
        }
        let stale = entry.path();
        if file_type.is_dir() {
            remove_stale_dir(&stale)?;
        } else {
            std::fs::remove_file(&stale)?;
        }
    }
    Ok(())
}

/// Remove stale files below `dir`, then `dir` itself once it is empty.
/// Directories still holding links stay.
fn remove_stale_dir(dir: &Path) -> io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let file_type = entry.file_type()?;
        if file_type.is_symlink() {
            continue;
        }
        if file_type.is_dir() {
            remove_stale_dir(&entry.path())?;
        } else {
            std::fs::remove_file(entry.path())?;
        }
    }
    if std::fs::read_dir(dir)?.next().is_none() {
        std::fs::remove_dir(dir)?;
    }
    Ok(())
}

fn copy_if_changed(source: &Path, target: &Path) -> io::Result<()> {
    let src_meta = std::fs::metadata(source)?;
    if let Ok(dst_meta) = std::fs::metadata(target) {
        let same_len = dst_meta.len() == src_meta.len();
        let not_older = match (src_meta.modified(), dst_meta.modified()) {
            (Ok(src), Ok(dst)) => dst >= src,
            _ => false,
        };
        if same_len && not_older {
            return Ok(());
        }
    }
    std::fs::copy(source, target)?;
    Ok(())
}

pub fn is_symlink(path: &Path) -> bool {
    std::fs::symlink_metadata(path)
        .map(|meta| meta.file_type().is_symlink())
        .unwrap_or(false)
}

#[cfg(unix)]
fn create_link(source: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(source, target)
}

#[cfg(windows)]
fn create_link(source: &Path, target: &Path) -> io::Result<()> {
    if source.is_dir() {
        std::os::windows::fs::symlink_dir(source, target)
    } else {
        std::os::windows::fs::symlink_file(source, target)
    }
}

#[cfg(unix)]
fn remove_link(target: &Path) -> io::Result<()> {
    std::fs::remove_file(target)
}

#[cfg(windows)]
fn remove_link(target: &Path) -> io::Result<()> {
    // Directory links on Windows are removed as directories.
    std::fs::remove_dir(target).or_else(|_| std::fs::remove_file(target))
}

/// Ordered strategy list.
pub struct Projector {
    strategies: Vec<Box<dyn ProjectionStrategy>>,
}

impl Default for Projector {
    fn default() -> Self {
        Self::new(vec![Box::new(TryLink), Box::new(MirrorCopy)])
    }
}

impl Projector {
    pub fn new(strategies: Vec<Box<dyn ProjectionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Project `source` onto `target`. Returns the strategy that succeeded,
    /// or every strategy's failure.
    pub fn project(&self, source: &Path, target: &Path) -> Result<&'static str, Vec<String>> {
        let mut failures = Vec::new();
        for strategy in &self.strategies {
            match strategy.project(source, target) {
                Ok(()) => {
                    debug!("Projected {:?} -> {:?} ({})", source, target, strategy.name());
                    return Ok(strategy.name());
                }
                Err(err) => {
                    warn!(
                        "Projection {} failed for {:?}: {}",
                        strategy.name(),
                        target,
                        err
                    );
                    failures.push(format!("{}: {}", strategy.name(), err));
                }
            }
        }
        Err(failures)
    }
}
