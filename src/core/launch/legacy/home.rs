use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::core::downloader::hash::sha256_hex;
use crate::core::instance::{normalize_lexically, safe_path_str};

/// Subdirectories projected from the instance into the compatibility game
/// directory.
pub const PROJECTED_DIRS: &[&str] = &[
    "libraries",
    "mods",
    "coremods",
    "config",
    "assets",
    "natives",
    "lib",
    "resources",
    "saves",
    "resourcepacks",
    "texturepacks",
];

/// Where legacy clients expect the game archive, relative to the game dir.
pub const PROJECTED_ARCHIVE: &str = "bin/minecraft.jar";

const HOME_ID_LEN: usize = 16;

/// Synthetic per-instance home for clients that hardcode home-relative paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatHome {
    /// Exposed to the child as its user home.
    pub root: PathBuf,
    /// Where the client looks for its data under that home.
    pub game_dir: PathBuf,
}

impl CompatHome {
    /// `<compat_root>/home-<16 hex>`; the id is derived from the instance's
    /// absolute path so relaunches land in the same place.
    pub fn for_instance(compat_root: &Path, instance_dir: &Path) -> Self {
        let absolute = safe_path_str(&normalize_lexically(instance_dir));
        let digest = sha256_hex(absolute.as_bytes());
        let root = compat_root.join(format!("home-{}", &digest[..HOME_ID_LEN]));
        let game_dir = game_dir_under(&root);
        Self { root, game_dir }
    }

    /// Environment variables that redirect the child's notion of home.
    pub fn env(&self) -> BTreeMap<String, String> {
        let home = safe_path_str(&self.root);
        let mut env = BTreeMap::new();
        if cfg!(target_os = "windows") {
            env.insert("USERPROFILE".to_string(), home.clone());
            env.insert("APPDATA".to_string(), home);
        } else {
            env.insert("HOME".to_string(), home);
        }
        env
    }
}

fn game_dir_under(home: &Path) -> PathBuf {
    if cfg!(target_os = "macos") {
        home.join("Library")
            .join("Application Support")
            .join("minecraft")
    } else {
        home.join(".minecraft")
    }
}
