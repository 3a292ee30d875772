// ─── Path Containment ───
// Every path the pipeline touches under an instance is resolved here.
// Resolution is purely lexical: no filesystem access happens before the
// containment check succeeds.

use std::path::{Component, Path, PathBuf};

use crate::core::error::{LauncherError, LauncherResult};

/// Normalize a path lexically, folding `.` and `..` without touching disk.
///
/// Relative inputs are anchored on the current working directory.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let anchored = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut normalized = PathBuf::new();
    for component in anchored.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

/// Split a manifest path on both `/` and `\` and drop empty segments.
pub fn manifest_segments(raw: &str) -> Vec<&str> {
    raw.split(['/', '\\'])
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Resolve a slash-separated relative path inside `root`.
///
/// Fails with [`LauncherError::PathEscape`] when the path is absolute, carries
/// a drive prefix, or walks above the root through `..` segments.
pub fn resolve_inside(root: &Path, relative: &str) -> LauncherResult<PathBuf> {
    let escape = || LauncherError::PathEscape {
        root: root.to_path_buf(),
        path: relative.to_string(),
    };

    let trimmed = relative.trim();
    if trimmed.is_empty() {
        return Err(escape());
    }
    if trimmed.starts_with('/') || trimmed.starts_with('\\') || has_drive_prefix(trimmed) {
        return Err(escape());
    }

    let root = normalize_lexically(root);
    let mut resolved = root.clone();
    let mut depth = 0_usize;
    for segment in manifest_segments(trimmed) {
        match segment {
            "." => {}
            ".." => {
                if depth == 0 {
                    return Err(escape());
                }
                resolved.pop();
                depth -= 1;
            }
            name => {
                resolved.push(name);
                depth += 1;
            }
        }
    }

    if depth == 0 || !resolved.starts_with(&root) {
        return Err(escape());
    }
    Ok(resolved)
}

/// Check that an already-absolute path sits inside `root` (lexically).
pub fn ensure_inside(root: &Path, candidate: &Path) -> LauncherResult<PathBuf> {
    let root = normalize_lexically(root);
    let normalized = normalize_lexically(candidate);
    if normalized.starts_with(&root) && normalized != root {
        Ok(normalized)
    } else {
        Err(LauncherError::PathEscape {
            root,
            path: candidate.to_string_lossy().to_string(),
        })
    }
}

/// Relative, slash-separated form of `path` under `root`, if it is inside.
pub fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().to_string()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

fn has_drive_prefix(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Convert path to string for command lines.
pub fn safe_path_str(path: &Path) -> String {
    let text = path.to_string_lossy().to_string();

    #[cfg(target_os = "windows")]
    {
        // Java classpath handling can fail for Windows extended-length paths
        // (e.g. `\\?\C:\...`). Strip the prefix before building arguments.
        if let Some(stripped) = text.strip_prefix(r"\\?\") {
            return stripped.to_string();
        }
    }

    text
}
