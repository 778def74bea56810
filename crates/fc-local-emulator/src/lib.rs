//! Local Docker emulation of Function Compute runtimes.
//!
//! [`LocalEmulator`] is the entry point: it dispatches on the function's
//! runtime, checks the trigger against the requested mode and hands the run
//! to an [`Orchestrator`], which assembles and executes the `docker run`
//! command.

pub mod assembler;
pub mod code;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod exec;
pub mod image;
pub mod orchestrator;
pub mod port;

pub use assembler::{CommandAssembler, CommandBuilder, ContainerCommand};
pub use config::{Credentials, DockerConfig, EmulatorConfig};
pub use context::{Invocation, InvocationRequest, Mode};
pub use dispatcher::{BootstrapRule, LocalEmulator, RuntimeCapabilities, RuntimeDispatcher};
pub use orchestrator::{LocalOutcome, Orchestrator};
