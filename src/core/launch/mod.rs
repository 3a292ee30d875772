pub mod archive;
pub mod arguments;
pub mod candidates;
pub mod classpath;
pub mod legacy;
pub mod plan;
pub mod process;
pub mod resolver;

pub use legacy::LegacyCompatibilityShim;
pub use plan::{CompatMode, Invocation, LaunchPlan};
pub use process::{LaunchOutcome, LineSink, OutputLine, OutputStream, ProcessOrchestrator};
pub use resolver::{discover_entry_class, resolve, runtime_executable};
