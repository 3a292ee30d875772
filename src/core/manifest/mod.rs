pub mod model;
pub mod route;

pub use model::{
    ContentKind, LaunchMode, ManifestFileEntry, ManifestModel, RuntimeRequirement,
    PLACEHOLDER_VERSION,
};
pub use route::RouteSpec;
