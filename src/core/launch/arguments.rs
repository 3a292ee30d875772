// ─── Argument Rewriting ───
// Placeholder substitution and flag surgery shared by the resolver,
// the compatibility shim and the orchestrator.

use std::path::Path;

use crate::core::auth::LaunchAccountProfile;
use crate::core::instance::safe_path_str;

use super::classpath::classpath_separator;

pub const LAUNCHER_NAME: &str = "ManifestLauncher";

/// Values known at resolve time.
pub struct PlaceholderContext<'a> {
    pub account: &'a LaunchAccountProfile,
    pub game_directory: &'a Path,
    pub natives_directory: &'a Path,
    pub version_name: &'a str,
}

impl PlaceholderContext<'_> {
    fn apply(&self, raw: &str) -> String {
        raw.replace("${auth_player_name}", &self.account.username)
            .replace("${auth_session}", &self.account.session)
            .replace("${auth_access_token}", &self.account.session)
            .replace("${auth_uuid}", &self.account.uuid)
            .replace("${game_directory}", &safe_path_str(self.game_directory))
            .replace("${natives_directory}", &safe_path_str(self.natives_directory))
            .replace("${version_name}", self.version_name)
            .replace("${classpath_separator}", classpath_separator())
            .replace("${launcher_name}", LAUNCHER_NAME)
            .replace("${launcher_version}", env!("CARGO_PKG_VERSION"))
    }
}

/// Substitute JVM arguments. The orchestrator always injects the classpath,
/// so explicit `-cp` pairs are dropped together with their value.
pub fn substitute_jvm_args(raw_args: &[String], ctx: &PlaceholderContext<'_>) -> Vec<String> {
    let mut sanitized = Vec::new();
    let mut i = 0;
    while i < raw_args.len() {
        let arg = &raw_args[i];
        if arg == "-cp" || arg == "-classpath" || arg == "--class-path" {
            i += 2;
            continue;
        }
        push_resolved(&mut sanitized, ctx.apply(arg));
        i += 1;
    }
    sanitized
}

pub fn substitute_game_args(raw_args: &[String], ctx: &PlaceholderContext<'_>) -> Vec<String> {
    let mut sanitized = Vec::new();
    for arg in raw_args {
        push_resolved(&mut sanitized, ctx.apply(arg));
    }
    sanitized
}

fn push_resolved(args: &mut Vec<String>, resolved: String) {
    // Unresolved placeholders would reach the client verbatim.
    if resolved.contains("${") {
        // A flag token stands alone; only a value takes its option with it.
        if !resolved.starts_with('-') {
            drop_dangling_option(args);
        }
        return;
    }
    args.push(resolved);
}

fn drop_dangling_option(args: &mut Vec<String>) {
    if args.last().is_some_and(|last| last.starts_with('-')) {
        let _ = args.pop();
    }
}

pub fn contains_flag(args: &[String], flag: &str) -> bool {
    args.iter().any(|arg| arg == flag)
}

/// Remove every occurrence of `flag`, and its value when one follows.
pub fn remove_flag(args: &mut Vec<String>, flag: &str) {
    let mut kept = Vec::with_capacity(args.len());
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag {
            let has_value = args.get(i + 1).is_some_and(|next| !next.starts_with("--"));
            i += if has_value { 2 } else { 1 };
            continue;
        }
        kept.push(std::mem::take(&mut args[i]));
        i += 1;
    }
    *args = kept;
}

/// Remove a bare marker flag (no value).
pub fn remove_marker(args: &mut Vec<String>, marker: &str) {
    args.retain(|arg| arg != marker);
}

/// Replace the value of `flag`, or append the pair.
pub fn upsert_flag(args: &mut Vec<String>, flag: &str, value: &str) {
    if let Some(pos) = args.iter().position(|arg| arg == flag) {
        match args.get_mut(pos + 1) {
            Some(existing) if !existing.starts_with("--") => *existing = value.to_string(),
            _ => args.insert(pos + 1, value.to_string()),
        }
        return;
    }
    args.push(flag.to_string());
    args.push(value.to_string());
}

pub fn set_jvm_system_property(args: &mut Vec<String>, property: &str, value: &str) {
    let prefix = format!("-D{}=", property);
    args.retain(|arg| !arg.starts_with(&prefix));
    args.push(format!("{}{}", prefix, value));
}

/// Drop `-Xms*`/`-Xmx*` and put the configured bounds first.
pub fn apply_heap_bounds(args: &mut Vec<String>, min_mb: u32, max_mb: u32) {
    args.retain(|arg| !arg.starts_with("-Xms") && !arg.starts_with("-Xmx"));
    args.insert(0, format!("-Xmx{}M", max_mb));
    args.insert(0, format!("-Xms{}M", min_mb));
}
