use std::sync::Arc;

use tracing::Instrument;

use fc_local_core::{DebugIde, LocalError, Runtime, RuntimeFamily, RuntimeProfile};

use crate::assembler::CommandAssembler;
use crate::code::{CodeResolver, CodeUnpacker, ZipUnpacker};
use crate::config::{Credentials, EmulatorConfig};
use crate::context::{Invocation, InvocationRequest, Mode};
use crate::exec::{DockerShellRunner, ShellRunner};
use crate::orchestrator::{LocalOutcome, Orchestrator};
use crate::port::{PortFinder, TcpPortFinder};

/// How a runtime's bootstrap command reaches the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapRule {
    /// The stock image knows how to start the function.
    None,
    /// `customRuntimeConfig` command and args become `AGENT_SCRIPT`.
    AgentScript,
    /// `customContainerConfig` command and args follow the image.
    ContainerBootstrap,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeCapabilities {
    pub runtime: Runtime,
    pub profile: RuntimeProfile,
    pub supported_ides: &'static [DebugIde],
    pub bootstrap: BootstrapRule,
}

pub struct RuntimeDispatcher;

impl RuntimeDispatcher {
    /// Capabilities for a runtime identifier, or `None` if it cannot be emulated.
    pub fn dispatch(runtime: &str) -> Option<RuntimeCapabilities> {
        let runtime: Runtime = runtime.parse().ok()?;
        let profile = RuntimeProfile::for_runtime(runtime);
        let bootstrap = match runtime.family() {
            RuntimeFamily::Custom => BootstrapRule::AgentScript,
            RuntimeFamily::CustomContainer => BootstrapRule::ContainerBootstrap,
            _ => BootstrapRule::None,
        };
        Some(RuntimeCapabilities {
            runtime,
            profile,
            supported_ides: profile.supported_ides(runtime),
            bootstrap,
        })
    }
}

/// Entry point for `invoke` and `start`.
pub struct LocalEmulator {
    config: EmulatorConfig,
    credentials: Credentials,
    runner: Arc<dyn ShellRunner>,
    port_finder: Arc<dyn PortFinder>,
    unpacker: Arc<dyn CodeUnpacker>,
}

impl LocalEmulator {
    pub fn new(config: EmulatorConfig) -> Self {
        Self {
            config,
            credentials: Credentials::default(),
            runner: Arc::new(DockerShellRunner::new()),
            port_finder: Arc::new(TcpPortFinder),
            unpacker: Arc::new(ZipUnpacker),
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn with_runner(mut self, runner: Arc<dyn ShellRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_port_finder(mut self, port_finder: Arc<dyn PortFinder>) -> Self {
        self.port_finder = port_finder;
        self
    }

    pub fn with_unpacker(mut self, unpacker: Arc<dyn CodeUnpacker>) -> Self {
        self.unpacker = unpacker;
        self
    }

    /// Run the function once against the request's event.
    pub async fn invoke(&self, request: InvocationRequest) -> Result<LocalOutcome, LocalError> {
        self.run(Mode::Invoke, request).await
    }

    /// Serve the function over HTTP until the container exits.
    pub async fn start(&self, request: InvocationRequest) -> Result<LocalOutcome, LocalError> {
        self.run(Mode::Start, request).await
    }

    async fn run(&self, mode: Mode, request: InvocationRequest) -> Result<LocalOutcome, LocalError> {
        let span = tracing::info_span!(
            "local",
            mode = %mode,
            runtime = %request.descriptor.runtime,
            function = %request.descriptor.function_name,
        );
        self.dispatch_and_run(mode, request).instrument(span).await
    }

    async fn dispatch_and_run(
        &self,
        mode: Mode,
        request: InvocationRequest,
    ) -> Result<LocalOutcome, LocalError> {
        tracing::info!(base_dir = %request.base_dir.display(), "Local run starting");

        let Some(capabilities) = RuntimeDispatcher::dispatch(&request.descriptor.runtime) else {
            tracing::warn!("{} is not supported", request.descriptor.runtime);
            return Ok(LocalOutcome::Unsupported);
        };

        match mode {
            Mode::Invoke if request.descriptor.is_http_function() => {
                tracing::warn!(
                    "The function has an HTTP trigger. You had better use `fc-local start` instead"
                );
                return Ok(LocalOutcome::ModeMismatch);
            }
            Mode::Start if !request.descriptor.has_http_trigger() => {
                tracing::warn!(
                    "The function has no HTTP trigger. Use `fc-local invoke` instead"
                );
                return Ok(LocalOutcome::ModeMismatch);
            }
            _ => {}
        }

        let invocation = Invocation::new(mode, capabilities, request, self.credentials.clone());
        let assembler = CommandAssembler::new(self.port_finder.clone())
            .with_platform(self.config.docker.platform.clone());
        let orchestrator = Orchestrator::new(
            &assembler,
            self.runner.as_ref(),
            CodeResolver::new(self.unpacker.as_ref(), &invocation.base_dir),
            &self.config.docker,
        );

        let outcome = orchestrator.run(&invocation).await?;
        tracing::info!(outcome = ?outcome, "Local run finished");
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use fc_local_core::descriptor::{CodeUri, Trigger};
    use fc_local_core::{DebugSession, FunctionDescriptor};
    use tracing_test::traced_test;

    use crate::code::StubUnpacker;
    use crate::config::DockerConfig;
    use crate::exec::StubShellRunner;
    use crate::port::FixedPortFinder;

    fn http_trigger() -> Trigger {
        Trigger {
            trigger_name: Some("http".into()),
            trigger_type: "http".into(),
        }
    }

    fn request(runtime: &str, triggers: Vec<Trigger>) -> InvocationRequest {
        InvocationRequest {
            descriptor: FunctionDescriptor {
                function_name: "hello".into(),
                runtime: runtime.into(),
                code: Some(CodeUri::Path("./code".into())),
                triggers,
                ..Default::default()
            },
            session: DebugSession::default(),
            event: String::new(),
            base_dir: PathBuf::from("/project"),
        }
    }

    fn emulator(runner: Arc<StubShellRunner>) -> LocalEmulator {
        let config = EmulatorConfig {
            docker: DockerConfig {
                pull: false,
                ..Default::default()
            },
        };
        LocalEmulator::new(config)
            .with_runner(runner)
            .with_port_finder(Arc::new(FixedPortFinder::new(9001)))
            .with_unpacker(Arc::new(StubUnpacker::new()))
    }

    #[test]
    fn dispatch_maps_bootstrap_rules() {
        let custom = RuntimeDispatcher::dispatch("custom.debian10").unwrap();
        assert_eq!(custom.bootstrap, BootstrapRule::AgentScript);
        assert_eq!(custom.profile, RuntimeProfile::Custom);

        let container = RuntimeDispatcher::dispatch("custom-container").unwrap();
        assert_eq!(container.bootstrap, BootstrapRule::ContainerBootstrap);

        let java = RuntimeDispatcher::dispatch("java11").unwrap();
        assert_eq!(java.bootstrap, BootstrapRule::None);
        assert!(java.supported_ides.contains(&DebugIde::IntelliJ));
    }

    #[test]
    fn dispatch_rejects_unknown_runtimes() {
        assert!(RuntimeDispatcher::dispatch("go1").is_none());
        assert!(RuntimeDispatcher::dispatch("").is_none());
    }

    #[tokio::test]
    #[traced_test]
    async fn unsupported_runtime_is_a_logged_no_op() {
        let runner = Arc::new(StubShellRunner::new());
        let outcome = emulator(runner.clone())
            .invoke(request("go1", vec![]))
            .await
            .unwrap();

        assert_eq!(outcome, LocalOutcome::Unsupported);
        assert!(runner.commands().is_empty());
        assert!(logs_contain("go1 is not supported"));
    }

    #[tokio::test]
    #[traced_test]
    async fn invoke_on_http_function_is_a_mismatch() {
        let runner = Arc::new(StubShellRunner::new());
        let outcome = emulator(runner.clone())
            .invoke(request("nodejs14", vec![http_trigger()]))
            .await
            .unwrap();

        assert_eq!(outcome, LocalOutcome::ModeMismatch);
        assert!(runner.commands().is_empty());
        assert!(logs_contain("The function has an HTTP trigger"));
    }

    #[tokio::test]
    #[traced_test]
    async fn start_without_http_trigger_is_a_mismatch() {
        let runner = Arc::new(StubShellRunner::new());
        let outcome = emulator(runner.clone())
            .start(request("custom", vec![]))
            .await
            .unwrap();

        assert_eq!(outcome, LocalOutcome::ModeMismatch);
        assert!(runner.commands().is_empty());
        assert!(logs_contain("no HTTP trigger"));
    }

    #[tokio::test]
    #[traced_test]
    async fn start_runs_http_function() {
        let runner = Arc::new(StubShellRunner::new());
        let outcome = emulator(runner.clone())
            .start(request("custom", vec![http_trigger()]))
            .await
            .unwrap();

        assert_eq!(outcome, LocalOutcome::Completed);
        let commands = runner.commands();
        assert_eq!(commands.len(), 1);
        assert!(commands[0].contains("-p 9001:9000"));
        assert!(logs_contain("Found available port"));
    }

    #[tokio::test]
    async fn invoke_runs_event_function() {
        let runner = Arc::new(StubShellRunner::new());
        let mut req = request("python3.9", vec![]);
        req.event = "{\"a\": 1}".into();
        let outcome = emulator(runner.clone()).invoke(req).await.unwrap();

        assert_eq!(outcome, LocalOutcome::Completed);
        assert!(runner.commands()[0].ends_with(r#"--event '{"a":1}'"#));
    }
}
