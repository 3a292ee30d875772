use std::path::Path;

use crate::core::auth::{sanitize_legacy_username, LaunchAccountProfile};
use crate::core::instance::safe_path_str;
use crate::core::launch::arguments::{
    contains_flag, remove_flag, remove_marker, set_jvm_system_property, upsert_flag,
};
use crate::core::manifest::RouteSpec;

/// Game-arg marker that keeps the client on its own server list.
pub const NO_AUTO_CONNECT: &str = "--no-auto-connect";
/// Game-arg marker that forces auto-connect; wins over the disable marker.
pub const FORCE_AUTO_CONNECT: &str = "--force-auto-connect";

pub const FML_TWEAKER: &str = "cpw.mods.fml.common.launcher.FMLTweaker";

const IDENTITY_FLAGS: &[&str] = &["--username", "--session", "--uuid", "--server", "--port"];
const NATIVE_PATH_PROPERTIES: &[&str] = &[
    "java.library.path",
    "org.lwjgl.librarypath",
    "net.java.games.input.librarypath",
];

pub fn auto_connect_enabled(game_args: &[String]) -> bool {
    contains_flag(game_args, FORCE_AUTO_CONNECT) || !contains_flag(game_args, NO_AUTO_CONNECT)
}

pub fn strip_auto_connect_markers(game_args: &mut Vec<String>) {
    remove_marker(game_args, NO_AUTO_CONNECT);
    remove_marker(game_args, FORCE_AUTO_CONNECT);
}

/// Flag-style identity and route for modern clients.
pub fn apply_modern_args(
    game_args: &mut Vec<String>,
    account: &LaunchAccountProfile,
    route: &RouteSpec,
) {
    let auto_connect = auto_connect_enabled(game_args);
    strip_auto_connect_markers(game_args);

    upsert_flag(game_args, "--username", &account.username);
    upsert_flag(game_args, "--session", &account.session);
    upsert_flag(game_args, "--uuid", &account.uuid);

    remove_flag(game_args, "--server");
    remove_flag(game_args, "--port");
    if auto_connect {
        game_args.push("--server".into());
        game_args.push(route.address.clone());
        game_args.push("--port".into());
        game_args.push(route.port.to_string());
    }
}

/// Positional `username session server port` first, then the remaining args,
/// then `--version` and an optional loader tweak.
pub fn apply_legacy_game_args(
    game_args: &mut Vec<String>,
    account: &LaunchAccountProfile,
    route: &RouteSpec,
    version: &str,
    tweak_available: bool,
) {
    let auto_connect = auto_connect_enabled(game_args);
    strip_auto_connect_markers(game_args);

    for flag in IDENTITY_FLAGS {
        remove_flag(game_args, flag);
    }
    remove_flag(game_args, "--version");
    remove_flag(game_args, "--tweakClass");

    let (server, port) = if auto_connect {
        (route.address.clone(), route.port.to_string())
    } else {
        (String::new(), "0".to_string())
    };
    let positional = [
        sanitize_legacy_username(&account.username),
        account.session.clone(),
        server,
        port,
    ];
    game_args.splice(0..0, positional);

    game_args.push("--version".into());
    game_args.push(version.to_string());
    if tweak_available {
        game_args.push("--tweakClass".into());
        game_args.push(FML_TWEAKER.into());
    }
}

/// Point native-library properties at `natives` and set the home override.
pub fn apply_legacy_jvm_args(jvm_args: &mut Vec<String>, natives_dir: &Path, home: &Path) {
    if natives_dir.is_dir() {
        let natives = safe_path_str(natives_dir);
        for property in NATIVE_PATH_PROPERTIES {
            set_jvm_system_property(jvm_args, property, &natives);
        }
    }
    set_jvm_system_property(jvm_args, "user.home", &safe_path_str(home));
}
