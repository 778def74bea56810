use fc_local_core::{LocalError, Runtime};

use crate::assembler::{CommandBuilder, CommandPlan, ContainerCommand};
use crate::code::{CodeResolver, PreparedCode};
use crate::config::DockerConfig;
use crate::context::{Invocation, Mode};
use crate::exec::ShellRunner;
use crate::image::resolve_image;

/// Result of one local run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalOutcome {
    /// The container ran and exited cleanly (or was stopped by the user).
    Completed,
    /// The before-hook refused the run; nothing was built or executed.
    Aborted { reason: String },
    /// The runtime has no local emulation.
    Unsupported,
    /// `invoke` on an HTTP function, or `start` on one without an HTTP trigger.
    ModeMismatch,
}

/// The before-hook passed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Proceed;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aborted {
    pub reason: String,
}

impl Aborted {
    fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Validate an invocation before anything is built.
pub fn before_hook(inv: &Invocation) -> Result<Proceed, Aborted> {
    let runtime = inv.capabilities.runtime;

    if inv.descriptor.code_src().is_none() && runtime != Runtime::CustomContainer {
        return Err(Aborted::new(
            "code is invalid when runtime is not custom-container",
        ));
    }

    if inv.session.ide.is_some() != inv.session.is_active() {
        return Err(Aborted::new(
            "Args config and debug-port must exist simultaneously",
        ));
    }

    if let Some(ide) = &inv.session.ide {
        if !inv.capabilities.supported_ides.contains(ide) {
            return Err(Aborted::new(format!(
                "debug IDE {ide} is not supported for runtime {runtime}"
            )));
        }
    }

    Ok(Proceed)
}

/// Runs one invocation through before-hook, assembly, execution and after-hook.
pub struct Orchestrator<'a> {
    builder: &'a dyn CommandBuilder,
    runner: &'a dyn ShellRunner,
    resolver: CodeResolver<'a>,
    docker: &'a DockerConfig,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        builder: &'a dyn CommandBuilder,
        runner: &'a dyn ShellRunner,
        resolver: CodeResolver<'a>,
        docker: &'a DockerConfig,
    ) -> Self {
        Self {
            builder,
            runner,
            resolver,
            docker,
        }
    }

    pub async fn run(&self, inv: &Invocation) -> Result<LocalOutcome, LocalError> {
        tracing::debug!("Running before-hook");
        if let Err(aborted) = before_hook(inv) {
            tracing::error!(reason = %aborted.reason, "Local run aborted");
            return Ok(LocalOutcome::Aborted {
                reason: aborted.reason,
            });
        }

        let code = self
            .resolver
            .resolve(inv.capabilities.runtime, &inv.descriptor)
            .await?;

        let result = self.build_and_execute(inv, &code).await;

        tracing::debug!("Running after-hook");
        if let Err(e) = code.cleanup() {
            tracing::warn!(error = %e, "Failed to clean temporary code dir");
        }

        result.map(|()| LocalOutcome::Completed)
    }

    async fn build_and_execute(
        &self,
        inv: &Invocation,
        code: &PreparedCode,
    ) -> Result<(), LocalError> {
        let image = resolve_image(inv.capabilities.runtime, &inv.descriptor, self.docker)?;
        if image.stock && self.docker.pull {
            let pull = format!("docker pull {}", image.reference);
            self.runner.run(&pull, true).await?;
        }

        let plan = CommandPlan {
            invocation: inv,
            code_dir: code.dir(),
            image: &image.reference,
        };
        let command = match inv.mode {
            Mode::Invoke => self.builder.build_invoke(plan).await?,
            Mode::Start => self.builder.build_start(plan).await?,
        };
        tracing::debug!(command = %command.line, "Container command");

        self.execute(&command).await
    }

    /// Run the container; Ctrl-C stops it by name.
    async fn execute(&self, command: &ContainerCommand) -> Result<(), LocalError> {
        let interrupted = async {
            if tokio::signal::ctrl_c().await.is_err() {
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            result = self.runner.run(&command.line, true) => result,
            () = interrupted => {
                tracing::info!(container = %command.container_name, "Interrupted, stopping container");
                let kill = format!("docker kill {}", command.container_name);
                if let Err(e) = self.runner.run(&kill, false).await {
                    tracing::warn!(error = %e, container = %command.container_name, "Failed to stop container");
                }
                Ok(())
            }
        }
    }
}
