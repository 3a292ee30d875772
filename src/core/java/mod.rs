pub mod extract;
pub mod runtime;

pub use extract::{ensure_executable, extract_archive, ArchiveFormat};
pub use runtime::RuntimeProvisioner;
