use std::net::IpAddr;

use crate::debug::{DebugIde, DebugSession};
use crate::runtime::{Runtime, RuntimeFamily};

/// Per-family debug policy for a runtime.
///
/// Profiles are stateless; [`RuntimeProfile::for_runtime`] is the single
/// lookup, so there is no override chain to follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeProfile {
    Nodejs,
    Python,
    Java,
    Php,
    Dotnet,
    Custom,
    CustomContainer,
}

const VSCODE_ONLY: &[DebugIde] = &[DebugIde::VsCode];
const VSCODE_OR_PYCHARM: &[DebugIde] = &[DebugIde::VsCode, DebugIde::PyCharm];
const JAVA_IDES: &[DebugIde] = &[DebugIde::IntelliJ, DebugIde::VsCode];

impl RuntimeProfile {
    pub fn for_runtime(runtime: Runtime) -> Self {
        match runtime.family() {
            RuntimeFamily::Nodejs => RuntimeProfile::Nodejs,
            RuntimeFamily::Python => RuntimeProfile::Python,
            RuntimeFamily::Java => RuntimeProfile::Java,
            RuntimeFamily::Php => RuntimeProfile::Php,
            RuntimeFamily::Dotnet => RuntimeProfile::Dotnet,
            RuntimeFamily::Custom => RuntimeProfile::Custom,
            RuntimeFamily::CustomContainer => RuntimeProfile::CustomContainer,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            RuntimeProfile::Nodejs => "nodejs",
            RuntimeProfile::Python => "python",
            RuntimeProfile::Java => "java",
            RuntimeProfile::Php => "php",
            RuntimeProfile::Dotnet => "dotnet",
            RuntimeProfile::Custom => "custom",
            RuntimeProfile::CustomContainer => "custom-container",
        }
    }

    /// IDEs a debug session may target for this runtime.
    pub fn supported_ides(&self, runtime: Runtime) -> &'static [DebugIde] {
        match self {
            RuntimeProfile::Python => match runtime {
                Runtime::Python27 | Runtime::Python3 => VSCODE_OR_PYCHARM,
                _ => VSCODE_ONLY,
            },
            RuntimeProfile::Java => JAVA_IDES,
            _ => VSCODE_ONLY,
        }
    }

    /// The debugger variable injected into the container, or `None` when
    /// debugging is inactive or unsupported for this combination.
    ///
    /// `remote_host` is the address the container should call back to; only
    /// the php profile uses it.
    pub fn debug_args(
        &self,
        runtime: Runtime,
        session: &DebugSession,
        remote_host: IpAddr,
    ) -> Option<String> {
        if *self == RuntimeProfile::Php {
            tracing::debug!(remote_host = %remote_host, "Using php xdebug remote host");
        }

        let port = session.active_port()?;

        match self {
            RuntimeProfile::Nodejs => Some(if runtime == Runtime::Nodejs6 {
                format!("DEBUG_OPTIONS=--debug-brk={port}")
            } else {
                format!("DEBUG_OPTIONS=--inspect-brk=0.0.0.0:{port}")
            }),
            RuntimeProfile::Python => {
                // ptvsd wait-for-attach is driven by VS Code; other IDEs get no args.
                match &session.ide {
                    Some(ide) if *ide != DebugIde::VsCode => None,
                    _ => Some(format!(
                        "DEBUG_OPTIONS=-m ptvsd --host 0.0.0.0 --port {port} --wait"
                    )),
                }
            }
            RuntimeProfile::Java => {
                let address = if runtime == Runtime::Java8 {
                    port.to_string()
                } else {
                    format!("*:{port}")
                };
                Some(format!(
                    "DEBUG_OPTIONS=-agentlib:jdwp=transport=dt_socket,server=y,suspend=y,quiet=y,address={address}"
                ))
            }
            RuntimeProfile::Php => Some(format!(
                "XDEBUG_CONFIG=remote_enable=1 remote_autostart=1 remote_port={port} remote_host={remote_host}"
            )),
            RuntimeProfile::Dotnet => {
                // TODO: dotnetcore3.1 once the emulation image ships a debugger for it
                (runtime == Runtime::Dotnetcore21).then(|| "DEBUG_OPTIONS=true".to_string())
            }
            RuntimeProfile::Custom | RuntimeProfile::CustomContainer => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const HOST: IpAddr = IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20));

    fn session(port: u16) -> DebugSession {
        DebugSession::new(Some(port), Some(DebugIde::VsCode))
    }

    fn args(runtime: Runtime, session: &DebugSession) -> Option<String> {
        RuntimeProfile::for_runtime(runtime).debug_args(runtime, session, HOST)
    }

    #[test]
    fn inactive_port_yields_nothing_for_every_runtime() {
        let idle = DebugSession::from_flags(Some("NaN"), Some("vscode"));
        let absent = DebugSession::default();
        for runtime in Runtime::ALL {
            assert_eq!(args(runtime, &idle), None, "{runtime}");
            assert_eq!(args(runtime, &absent), None, "{runtime}");
        }
    }

    #[test]
    fn nodejs_legacy_and_inspector_flags() {
        assert_eq!(
            args(Runtime::Nodejs6, &session(5858)).as_deref(),
            Some("DEBUG_OPTIONS=--debug-brk=5858")
        );
        assert_eq!(
            args(Runtime::Nodejs14, &session(9229)).as_deref(),
            Some("DEBUG_OPTIONS=--inspect-brk=0.0.0.0:9229")
        );
    }

    #[test]
    fn java8_binds_port_and_java11_binds_wildcard() {
        assert_eq!(
            args(Runtime::Java8, &session(5005)).as_deref(),
            Some(
                "DEBUG_OPTIONS=-agentlib:jdwp=transport=dt_socket,server=y,suspend=y,quiet=y,address=5005"
            )
        );
        assert_eq!(
            args(Runtime::Java11, &session(5005)).as_deref(),
            Some(
                "DEBUG_OPTIONS=-agentlib:jdwp=transport=dt_socket,server=y,suspend=y,quiet=y,address=*:5005"
            )
        );
    }

    #[test]
    fn dotnet_only_supports_21() {
        assert_eq!(
            args(Runtime::Dotnetcore21, &session(4711)).as_deref(),
            Some("DEBUG_OPTIONS=true")
        );
        assert_eq!(args(Runtime::Dotnetcore31, &session(4711)), None);
    }

    #[test]
    fn python_vscode_args_and_pycharm_suppression() {
        assert_eq!(
            args(Runtime::Python3, &session(3000)).as_deref(),
            Some("DEBUG_OPTIONS=-m ptvsd --host 0.0.0.0 --port 3000 --wait")
        );
        let pycharm = DebugSession::new(Some(3000), Some(DebugIde::PyCharm));
        assert_eq!(args(Runtime::Python3, &pycharm), None);
        let intellij = DebugSession::new(Some(3000), Some(DebugIde::IntelliJ));
        assert_eq!(args(Runtime::Python310, &intellij), None);
    }

    #[test]
    fn php_uses_remote_host() {
        assert_eq!(
            args(Runtime::Php72, &session(9003)).as_deref(),
            Some(
                "XDEBUG_CONFIG=remote_enable=1 remote_autostart=1 remote_port=9003 remote_host=192.168.1.20"
            )
        );
    }

    #[test]
    fn custom_runtimes_never_inject_args() {
        assert_eq!(args(Runtime::Custom, &session(9229)), None);
        assert_eq!(args(Runtime::CustomDebian10, &session(9229)), None);
        assert_eq!(args(Runtime::CustomContainer, &session(9229)), None);
    }

    #[test]
    fn supported_ides_per_profile() {
        let python = RuntimeProfile::Python;
        assert!(python.supported_ides(Runtime::Python3).contains(&DebugIde::PyCharm));
        assert_eq!(python.supported_ides(Runtime::Python39), &[DebugIde::VsCode]);
        assert!(RuntimeProfile::Java
            .supported_ides(Runtime::Java8)
            .contains(&DebugIde::IntelliJ));
        assert_eq!(
            RuntimeProfile::Nodejs.supported_ides(Runtime::Nodejs14),
            &[DebugIde::VsCode]
        );
    }
}
