//! Runtime profiles, function descriptors and debug configuration shared by
//! the fc-local emulator and CLI.

pub mod debug;
pub mod debug_config;
pub mod descriptor;
pub mod error;
pub mod event;
pub mod profile;
pub mod runtime;

pub use debug::{DebugIde, DebugSession};
pub use debug_config::{DebugConfigWriter, debug_config_document};
pub use descriptor::FunctionDescriptor;
pub use error::LocalError;
pub use profile::RuntimeProfile;
pub use runtime::{Runtime, RuntimeFamily};
