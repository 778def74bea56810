use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use fc_local_core::{DebugSession, FunctionDescriptor, RuntimeProfile};

use crate::config::Credentials;
use crate::dispatcher::RuntimeCapabilities;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Invoke,
    Start,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Invoke => write!(f, "invoke"),
            Mode::Start => write!(f, "start"),
        }
    }
}

/// What the caller asked for: one function, an optional debug session and an
/// event payload.
#[derive(Debug, Clone)]
pub struct InvocationRequest {
    pub descriptor: FunctionDescriptor,
    pub session: DebugSession,
    pub event: String,
    /// Project directory; relative code paths and `.vscode/` live here.
    pub base_dir: PathBuf,
}

/// Everything one local run needs, fixed at construction.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub mode: Mode,
    pub capabilities: RuntimeCapabilities,
    pub descriptor: FunctionDescriptor,
    pub session: DebugSession,
    pub event: String,
    pub base_dir: PathBuf,
    pub credentials: Credentials,
    pub container_name: String,
    pub instance_id: String,
    /// Address a debugger inside the container calls back to.
    pub remote_host: IpAddr,
}

impl Invocation {
    pub fn new(
        mode: Mode,
        capabilities: RuntimeCapabilities,
        request: InvocationRequest,
        credentials: Credentials,
    ) -> Self {
        let remote_host = if capabilities.profile == RuntimeProfile::Php {
            detect_remote_host()
        } else {
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        };
        Self {
            mode,
            capabilities,
            descriptor: request.descriptor,
            session: request.session,
            event: request.event,
            base_dir: request.base_dir,
            credentials,
            container_name: format!("fc-local-{}", uuid::Uuid::new_v4().simple()),
            instance_id: uuid::Uuid::new_v4().to_string(),
            remote_host,
        }
    }

    /// Pin the generated container name and instance id.
    pub fn with_identity(
        mut self,
        container_name: impl Into<String>,
        instance_id: impl Into<String>,
    ) -> Self {
        self.container_name = container_name.into();
        self.instance_id = instance_id.into();
        self
    }

    pub fn with_remote_host(mut self, remote_host: IpAddr) -> Self {
        self.remote_host = remote_host;
        self
    }

    /// Debugger variable for this run, if debugging is active and supported.
    pub fn debug_args(&self) -> Option<String> {
        self.capabilities.profile.debug_args(
            self.capabilities.runtime,
            &self.session,
            self.remote_host,
        )
    }
}

fn detect_remote_host() -> IpAddr {
    match local_ip_address::local_ip() {
        Ok(ip) => {
            tracing::debug!(ip = %ip, "Detected local IP address");
            ip
        }
        Err(e) => {
            tracing::warn!(error = %e, "Could not detect local IP address, using 127.0.0.1");
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}
