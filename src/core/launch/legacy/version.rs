use std::path::Path;

use crate::core::launch::plan::CompatMode;
use crate::core::manifest::{ManifestModel, RouteSpec};

use super::deobf::infer_version;

/// Token used when no version can be determined at all.
pub const LEGACY_TOKEN: &str = "legacy";

/// Pre-release version prefixes (alpha, beta, classic, pre-classic, indev).
const PRE_RELEASE_PREFIXES: &[&str] = &["rd-", "inf-"];
const PRE_RELEASE_LETTERS: &[char] = &['a', 'b', 'c'];

/// Route version, then manifest version (unless placeholder), then a version
/// inferred from dependency data in the instance, then `legacy`.
pub fn effective_version(manifest: &ManifestModel, route: &RouteSpec, instance_dir: &Path) -> String {
    route
        .version()
        .or(manifest.declared_version())
        .map(str::to_string)
        .or_else(|| infer_version(instance_dir))
        .unwrap_or_else(|| LEGACY_TOKEN.to_string())
}

pub fn classify(version: &str) -> CompatMode {
    let version = version.trim().to_ascii_lowercase();
    if version == LEGACY_TOKEN || is_pre_release(&version) {
        return CompatMode::Legacy;
    }
    match major_minor(&version) {
        Some((1, minor)) if minor <= 5 => CompatMode::Legacy,
        _ => CompatMode::Modern,
    }
}

fn is_pre_release(version: &str) -> bool {
    if PRE_RELEASE_PREFIXES.iter().any(|p| version.starts_with(p)) {
        return true;
    }
    let mut chars = version.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(letter), Some(digit)) if PRE_RELEASE_LETTERS.contains(&letter) && digit.is_ascii_digit()
    )
}

fn major_minor(version: &str) -> Option<(u32, u32)> {
    let mut parts = version.split('.');
    let major = leading_number(parts.next()?)?;
    let minor = leading_number(parts.next()?)?;
    Some((major, minor))
}

fn leading_number(part: &str) -> Option<u32> {
    let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}
