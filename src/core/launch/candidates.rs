// ─── Game Archive Candidates ───
// Deterministic scoring of archives that could be "the" game archive.

use std::path::{Path, PathBuf};

use crate::core::error::LauncherResult;
use crate::core::instance::{relative_slash_path, resolve_inside};
use crate::core::manifest::ManifestModel;

/// File names a game archive is conventionally shipped under.
pub const CANONICAL_ARCHIVE_NAMES: &[&str] = &["minecraft.jar", "client.jar", "game.jar"];
const GAME_NAME: &str = "minecraft";

/// Candidates with no recognisable name must sit in the root and be at least
/// this large. Kept for compatibility with existing builds.
pub const UNNAMED_ARCHIVE_MIN_BYTES: u64 = 5 * 1024 * 1024;

const SCORE_PREFERRED_NAME: i32 = 1000;
const SCORE_CANONICAL_NAME: i32 = 900;
const SCORE_GAME_NAME: i32 = 650;
const SCORE_IN_ROOT: i32 = 280;
const PENALTY_LIBRARIES: i32 = -700;
const PENALTY_NATIVES: i32 = -320;
const PENALTY_LIB: i32 = -250;

const EXCLUDED_TREES: &[&str] = &["libraries", "lib", "mods", "natives"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveCandidate {
    pub path: PathBuf,
    /// Slash-separated path relative to the instance root.
    pub relative: String,
    pub score: i32,
}

/// Score one candidate; `None` when it is not eligible at all.
pub fn score_candidate(relative: &str, preferred_name: Option<&str>, size: u64) -> Option<i32> {
    let segments: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();
    let (file_name, dirs) = segments.split_last()?;
    let file_name = file_name.to_ascii_lowercase();
    if !file_name.ends_with(".jar") {
        return None;
    }

    let under = |tree: &str| dirs.iter().any(|d| d.eq_ignore_ascii_case(tree));
    let preferred_match = preferred_name.is_some_and(|p| p.eq_ignore_ascii_case(&file_name));

    if !preferred_match && EXCLUDED_TREES.iter().any(|tree| under(tree)) {
        return None;
    }

    let in_root = dirs.is_empty();
    let canonical = CANONICAL_ARCHIVE_NAMES.contains(&file_name.as_str());
    let named = file_name.contains(GAME_NAME);

    if !preferred_match && !canonical && !named && !(in_root && size >= UNNAMED_ARCHIVE_MIN_BYTES)
    {
        return None;
    }

    let mut score = 0;
    if preferred_match {
        score += SCORE_PREFERRED_NAME;
    }
    if canonical {
        score += SCORE_CANONICAL_NAME;
    }
    if named {
        score += SCORE_GAME_NAME;
    }
    if in_root {
        score += SCORE_IN_ROOT;
    }
    if under("libraries") {
        score += PENALTY_LIBRARIES;
    }
    if under("natives") {
        score += PENALTY_NATIVES;
    }
    if under("lib") {
        score += PENALTY_LIB;
    }
    Some(score)
}

/// Higher score first, then shorter relative path, then lexicographic.
pub fn rank(candidates: &mut [ArchiveCandidate]) {
    candidates.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.relative.len().cmp(&b.relative.len()))
            .then_with(|| a.relative.cmp(&b.relative))
    });
}

/// Collect and rank candidates from the manifest file list and the instance
/// tree, skipping `excluded` (typically an invalid preferred archive).
pub fn collect_candidates(
    root: &Path,
    manifest: &ManifestModel,
    preferred_name: Option<&str>,
    excluded: Option<&Path>,
) -> LauncherResult<Vec<ArchiveCandidate>> {
    let mut paths = Vec::new();
    for entry in &manifest.files {
        paths.push(resolve_inside(root, &entry.path)?);
    }
    walk_jars(root, &mut paths);

    let mut candidates: Vec<ArchiveCandidate> = Vec::new();
    for path in paths {
        if excluded.is_some_and(|skip| skip == path) {
            continue;
        }
        let Some(relative) = relative_slash_path(root, &path) else {
            continue;
        };
        if candidates.iter().any(|c| c.relative == relative) {
            continue;
        }
        let Ok(meta) = std::fs::metadata(&path) else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        if let Some(score) = score_candidate(&relative, preferred_name, meta.len()) {
            candidates.push(ArchiveCandidate {
                path,
                relative,
                score,
            });
        }
    }

    rank(&mut candidates);
    Ok(candidates)
}

fn walk_jars(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(read) = std::fs::read_dir(dir) else {
        return;
    };
    let mut children: Vec<_> = read.flatten().collect();
    children.sort_by_key(|entry| entry.file_name());

    for entry in children {
        let name = entry.file_name().to_string_lossy().to_string();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        if file_type.is_dir() {
            if !name.starts_with('.') {
                walk_jars(&entry.path(), out);
            }
        } else if file_type.is_file() && name.to_ascii_lowercase().ends_with(".jar") {
            out.push(entry.path());
        }
    }
}
