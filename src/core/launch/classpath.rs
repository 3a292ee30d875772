// ─── Classpath Expansion ───
// Manifest classpath patterns are literal paths, single-segment globs
// (`*`, `?`) or recursive `**` globs, always relative to the instance root.

use std::path::{Path, PathBuf};

use globset::GlobBuilder;
use tracing::{debug, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::paths::{ensure_inside, manifest_segments, normalize_lexically};
use crate::core::instance::safe_path_str;

/// Platform-specific Java classpath separator.
pub fn classpath_separator() -> &'static str {
    if cfg!(target_os = "windows") {
        ";"
    } else {
        ":"
    }
}

/// Join classpath entries for `-cp`.
pub fn join_classpath(entries: &[PathBuf]) -> String {
    entries
        .iter()
        .map(|entry| safe_path_str(entry))
        .collect::<Vec<_>>()
        .join(classpath_separator())
}

/// Expand every pattern against `root`, order-preserving and de-duplicated.
///
/// Each pattern is checked for containment before anything is read from
/// disk; a pattern that could leave the root fails the whole expansion.
pub fn expand_classpath(root: &Path, patterns: &[String]) -> LauncherResult<Vec<PathBuf>> {
    let root = normalize_lexically(root);

    let mut checked = Vec::with_capacity(patterns.len());
    for pattern in patterns {
        if pattern.trim().is_empty() {
            continue;
        }
        checked.push((pattern.as_str(), contained_segments(&root, pattern)?));
    }

    let mut entries = Vec::new();
    for (pattern, segments) in checked {
        let mut matches = if segments.iter().any(|s| is_glob(s)) {
            expand_glob(&root, pattern, &segments)?
        } else {
            expand_literal(&root, &segments)
        };
        matches.sort();

        if matches.is_empty() {
            warn!("Classpath pattern {} matched nothing", pattern);
        } else {
            debug!("Classpath pattern {} -> {} entries", pattern, matches.len());
        }
        for path in matches {
            entries.push(ensure_inside(&root, &path)?);
        }
    }

    dedup_preserving_order(&mut entries);
    Ok(entries)
}

/// Lexical containment check; returns the pattern's folded segments.
fn contained_segments(root: &Path, pattern: &str) -> LauncherResult<Vec<String>> {
    let escape = || LauncherError::PathEscape {
        root: root.to_path_buf(),
        path: pattern.to_string(),
    };

    let trimmed = pattern.trim();
    if trimmed.starts_with('/') || trimmed.starts_with('\\') || has_drive_prefix(trimmed) {
        return Err(escape());
    }

    let mut segments: Vec<String> = Vec::new();
    for segment in manifest_segments(trimmed) {
        match segment {
            "." => {}
            ".." => {
                // `..` can only fold a literal segment; after a glob the
                // depth is unknown.
                match segments.last() {
                    Some(last) if !is_glob(last) => {
                        segments.pop();
                    }
                    _ => return Err(escape()),
                }
            }
            name => segments.push(name.to_string()),
        }
    }

    if segments.is_empty() {
        return Err(escape());
    }
    if segments.last().is_some_and(|s| s == "**") {
        segments.push("*".into());
    }
    Ok(segments)
}

/// Literal patterns may name a class directory as well as an archive.
fn expand_literal(root: &Path, segments: &[String]) -> Vec<PathBuf> {
    let path = segments.iter().fold(root.to_path_buf(), |acc, s| acc.join(s));
    if path.exists() {
        vec![path]
    } else {
        Vec::new()
    }
}

/// Walk from the pattern's literal prefix and keep files whose
/// root-relative path matches. Globs only ever contribute files.
fn expand_glob(root: &Path, pattern: &str, segments: &[String]) -> LauncherResult<Vec<PathBuf>> {
    let glob = segments
        .iter()
        .map(|s| escape_brackets(s))
        .collect::<Vec<_>>()
        .join("/");
    let matcher = GlobBuilder::new(&glob)
        .literal_separator(true)
        .build()
        .map_err(|err| {
            LauncherError::InvalidManifest(format!("invalid classpath pattern {pattern}: {err}"))
        })?
        .compile_matcher();

    let prefix_len = segments.iter().take_while(|s| !is_glob(s)).count();
    let base = segments[..prefix_len]
        .iter()
        .fold(root.to_path_buf(), |acc, s| acc.join(s));
    let max_depth = if segments[prefix_len..].iter().any(|s| s == "**") {
        usize::MAX
    } else {
        segments.len() - prefix_len
    };

    let mut files = Vec::new();
    collect_files(&base, max_depth, &mut files);
    files.retain(|file| {
        file.strip_prefix(root)
            .map(|relative| matcher.is_match(relative_slashes(relative)))
            .unwrap_or(false)
    });
    Ok(files)
}

fn collect_files(dir: &Path, depth: usize, out: &mut Vec<PathBuf>) {
    if depth == 0 {
        return;
    }
    for child in sorted_children(dir) {
        if child.is_file() {
            out.push(child);
        } else if child.is_dir() && !is_symlink(&child) {
            collect_files(&child, depth - 1, out);
        }
    }
}

fn relative_slashes(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Only `*`, `?` and `**` are wildcards in manifest patterns.
fn escape_brackets(segment: &str) -> String {
    let mut escaped = String::with_capacity(segment.len());
    for c in segment.chars() {
        match c {
            '[' | ']' | '{' | '}' => {
                escaped.push('[');
                escaped.push(c);
                escaped.push(']');
            }
            _ => escaped.push(c),
        }
    }
    escaped
}

fn sorted_children(dir: &Path) -> Vec<PathBuf> {
    let Ok(read) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut children: Vec<PathBuf> = read.flatten().map(|entry| entry.path()).collect();
    children.sort();
    children
}

fn is_symlink(path: &Path) -> bool {
    std::fs::symlink_metadata(path)
        .map(|meta| meta.file_type().is_symlink())
        .unwrap_or(false)
}

fn is_glob(segment: &str) -> bool {
    segment.contains('*') || segment.contains('?')
}

fn has_drive_prefix(raw: &str) -> bool {
    let bytes = raw.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

pub fn dedup_preserving_order(entries: &mut Vec<PathBuf>) {
    let mut seen = std::collections::HashSet::new();
    entries.retain(|entry| {
        let key = if cfg!(target_os = "windows") {
            entry.to_string_lossy().to_lowercase()
        } else {
            entry.to_string_lossy().to_string()
        };
        seen.insert(key)
    });
}
