pub mod layout;
pub mod paths;

pub use layout::InstanceLayout;
pub use paths::{ensure_inside, normalize_lexically, relative_slash_path, resolve_inside, safe_path_str};
