// ─── Dependency Data ───
// Legacy loaders look for `deobfuscation_data[_-]<version>.zip` in `lib/`,
// resolved against either the instance or the compatibility game directory.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::InstanceLayout;

const PREFIX: &str = "deobfuscation_data";
const SUFFIX: &str = ".zip";
const LIB_DIR: &str = "lib";

/// Version embedded in a dependency-data file name, if it is one.
pub fn parse_deobf_version(file_name: &str) -> Option<String> {
    let lower = file_name.to_ascii_lowercase();
    let rest = lower.strip_prefix(PREFIX)?;
    let rest = rest.strip_prefix('_').or_else(|| rest.strip_prefix('-'))?;
    let version = rest.strip_suffix(SUFFIX)?;
    (!version.is_empty()).then(|| version.to_string())
}

pub fn is_deobf_file_name(file_name: &str) -> bool {
    parse_deobf_version(file_name).is_some()
}

/// File name the loader for `version` asks for first.
pub fn deobf_hint(version: &str) -> String {
    format!("{PREFIX}_{version}{SUFFIX}")
}

/// Every dependency-data file under `root`, sorted, symlinked dirs skipped.
pub fn find_deobf_files(root: &Path) -> Vec<PathBuf> {
    let mut found = Vec::new();
    walk(root, &mut found);
    found.sort();
    found
}

fn walk(dir: &Path, found: &mut Vec<PathBuf>) {
    let Ok(read) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in read.flatten() {
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let name = entry.file_name().to_string_lossy().to_string();
        if file_type.is_dir() {
            if !name.starts_with('.') {
                walk(&entry.path(), found);
            }
        } else if file_type.is_file() && is_deobf_file_name(&name) {
            found.push(entry.path());
        }
    }
}

/// Version inferred from the first dependency-data file under `root`.
pub fn infer_version(root: &Path) -> Option<String> {
    find_deobf_files(root).iter().find_map(|path| {
        path.file_name()
            .and_then(|name| parse_deobf_version(&name.to_string_lossy()))
    })
}

/// Make sure a dependency-data file sits in both `lib/` locations.
///
/// Returns `false` (after a warning) when no such file exists anywhere.
pub fn ensure_deobf_data(
    instance_dir: &Path,
    compat_game_dir: &Path,
    version: &str,
) -> LauncherResult<bool> {
    let hint = deobf_hint(version);
    let targets = [
        InstanceLayout::new(instance_dir).lib_dir(),
        compat_game_dir.join(LIB_DIR),
    ];

    let Some(source) = pick_source(&targets, instance_dir, &hint) else {
        warn!(
            "No dependency data ({}) found for the legacy loader; continuing without it",
            hint
        );
        return Ok(false);
    };
    let Some(file_name) = source.file_name().map(|n| n.to_os_string()) else {
        return Ok(false);
    };

    for dir in &targets {
        let dest = dir.join(&file_name);
        if dest.is_file() {
            continue;
        }
        std::fs::create_dir_all(dir).map_err(|err| LauncherError::io(dir, err))?;
        std::fs::copy(&source, &dest).map_err(|err| LauncherError::io(&dest, err))?;
        info!("Placed dependency data at {:?}", dest);
    }
    Ok(true)
}

/// Prefer a file already in one of the `lib/` locations, then anything under
/// the instance; within each tier the version hint wins.
fn pick_source(lib_dirs: &[PathBuf], instance_dir: &Path, hint: &str) -> Option<PathBuf> {
    let mut in_libs = Vec::new();
    for dir in lib_dirs {
        let Ok(read) = std::fs::read_dir(dir) else {
            continue;
        };
        let mut files: Vec<PathBuf> = read
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter(|path| {
                path.file_name()
                    .is_some_and(|name| is_deobf_file_name(&name.to_string_lossy()))
            })
            .collect();
        files.sort();
        in_libs.extend(files);
    }

    let chosen = prefer_hint(&in_libs, hint).or_else(|| {
        let anywhere = find_deobf_files(instance_dir);
        prefer_hint(&anywhere, hint)
    });
    if let Some(path) = &chosen {
        debug!("Dependency data source: {:?}", path);
    }
    chosen
}

fn prefer_hint(files: &[PathBuf], hint: &str) -> Option<PathBuf> {
    files
        .iter()
        .find(|path| {
            path.file_name()
                .is_some_and(|name| name.to_string_lossy().eq_ignore_ascii_case(hint))
        })
        .or_else(|| files.first())
        .cloned()
}
