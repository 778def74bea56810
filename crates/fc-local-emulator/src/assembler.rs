use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;

use fc_local_core::descriptor::MountSpec;
use fc_local_core::event::{normalize_event, shell_single_quote, shell_word};
use fc_local_core::{DebugConfigWriter, LocalError, Runtime, debug_config_document};

use crate::context::{Invocation, Mode};
use crate::dispatcher::BootstrapRule;
use crate::port::PortFinder;

const CODE_MOUNT_TARGET: &str = "/code";

/// An assembled `docker run` line, consumed once by the runner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerCommand {
    pub line: String,
    pub container_name: String,
    /// Host port published for the function's HTTP server (start mode).
    pub host_port: Option<u16>,
}

/// Inputs resolved by the orchestrator before assembly.
#[derive(Debug, Clone, Copy)]
pub struct CommandPlan<'a> {
    pub invocation: &'a Invocation,
    pub code_dir: Option<&'a Path>,
    pub image: &'a str,
}

/// Builds the container command for each mode.
pub trait CommandBuilder: Send + Sync {
    fn build_invoke<'a>(
        &'a self,
        plan: CommandPlan<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<ContainerCommand, LocalError>> + Send + 'a>>;

    fn build_start<'a>(
        &'a self,
        plan: CommandPlan<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<ContainerCommand, LocalError>> + Send + 'a>>;
}

pub struct CommandAssembler {
    port_finder: Arc<dyn PortFinder>,
    platform: Option<String>,
}

impl CommandAssembler {
    pub fn new(port_finder: Arc<dyn PortFinder>) -> Self {
        Self {
            port_finder,
            platform: None,
        }
    }

    pub fn with_platform(mut self, platform: Option<String>) -> Self {
        self.platform = platform.filter(|p| !p.trim().is_empty());
        self
    }

    fn run_prefix(&self, invocation: &Invocation) -> Vec<String> {
        let mut parts = vec!["docker".to_string(), "run".to_string()];
        if let Some(platform) = &self.platform {
            parts.push(format!("--platform {platform}"));
        }
        parts.push(format!("--name {}", invocation.container_name));
        parts.push("--rm".into());
        parts
    }

    async fn assemble_invoke(&self, plan: CommandPlan<'_>) -> Result<ContainerCommand, LocalError> {
        let inv = plan.invocation;
        // custom-container images serve HTTP themselves: publish a port and run
        // the bootstrap, same as start.
        if inv.capabilities.bootstrap == BootstrapRule::ContainerBootstrap {
            let command = self.assemble_start(plan).await?;
            if let Some(port) = command.host_port {
                tracing::info!(
                    "curl -X POST 127.0.0.1:{port}/invoke -H \"Content-Type: application/octet-stream\" \
                     -H \"x-fc-function-name: {}\" -H \"x-fc-function-memory: {}\" \
                     -H \"x-fc-function-timeout: {}\" -d {}",
                    inv.descriptor.function_name,
                    inv.descriptor.memory_size(),
                    inv.descriptor.timeout(),
                    shell_single_quote(&normalize_event(&inv.event))
                );
            }
            return Ok(command);
        }

        let debug_args = inv.debug_args();

        let mut parts = self.run_prefix(inv);
        parts.push(format!("--memory={}m", inv.descriptor.memory_size()));
        parts.push(mount_string(plan.code_dir, &inv.descriptor.mounts));
        parts.push(env_string(inv, debug_args.as_deref()));
        parts.push(shell_word(plan.image));
        parts.push(format!(
            "--event {}",
            shell_single_quote(&normalize_event(&inv.event))
        ));

        write_debug_config(plan, debug_args.as_deref()).await?;

        Ok(ContainerCommand {
            line: join_parts(parts),
            container_name: inv.container_name.clone(),
            host_port: None,
        })
    }

    async fn assemble_start(&self, plan: CommandPlan<'_>) -> Result<ContainerCommand, LocalError> {
        let inv = plan.invocation;
        let ca_port = inv.descriptor.ca_port();
        let port = self.port_finder.find(ca_port).await?;
        tracing::info!(port, ca_port, "Found available port");
        tracing::info!(
            "You can use curl or Postman to make an HTTP request to 127.0.0.1:{port} to test the function"
        );

        let debug_args = inv.debug_args();

        let mut parts = self.run_prefix(inv);
        parts.push(format!("-p {port}:{ca_port}"));
        parts.push(format!("--memory={}m", inv.descriptor.memory_size()));
        parts.push(mount_string(plan.code_dir, &inv.descriptor.mounts));
        parts.push(env_string(inv, debug_args.as_deref()));
        parts.push(shell_word(plan.image));
        match inv.capabilities.bootstrap {
            BootstrapRule::ContainerBootstrap => {
                let config = inv.descriptor.custom_container_config.as_ref();
                parts.push(bootstrap_words(
                    config.and_then(|c| c.command.as_deref()),
                    config.and_then(|c| c.args.as_deref()),
                ));
            }
            BootstrapRule::None | BootstrapRule::AgentScript => {
                parts.push("--http --server".into());
            }
        }

        write_debug_config(plan, debug_args.as_deref()).await?;

        Ok(ContainerCommand {
            line: join_parts(parts),
            container_name: inv.container_name.clone(),
            host_port: Some(port),
        })
    }
}

impl CommandBuilder for CommandAssembler {
    fn build_invoke<'a>(
        &'a self,
        plan: CommandPlan<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<ContainerCommand, LocalError>> + Send + 'a>> {
        Box::pin(self.assemble_invoke(plan))
    }

    fn build_start<'a>(
        &'a self,
        plan: CommandPlan<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<ContainerCommand, LocalError>> + Send + 'a>> {
        Box::pin(self.assemble_start(plan))
    }
}

/// Persist a VS Code attach configuration when a vscode debug session is active.
async fn write_debug_config(plan: CommandPlan<'_>, debug_args: Option<&str>) -> Result<(), LocalError> {
    let inv = plan.invocation;
    if debug_args.is_none() || !inv.session.ide_is_vscode() {
        return Ok(());
    }
    let Some(port) = inv.session.active_port() else {
        return Ok(());
    };

    let runtime = inv.capabilities.runtime;
    let code_path = plan.code_dir.unwrap_or(inv.base_dir.as_path());
    match debug_config_document(runtime, code_path, port, &inv.descriptor.function_name) {
        Some(document) => {
            DebugConfigWriter::new(&inv.base_dir).write(&document).await?;
        }
        None => {
            tracing::warn!(runtime = %runtime, "No VS Code debug configuration for this runtime");
        }
    }
    Ok(())
}

/// `-v <code>:/code` followed by one `-v` per extra mount.
pub fn mount_string(code_dir: Option<&Path>, mounts: &[MountSpec]) -> String {
    let mut flags = Vec::new();
    if let Some(dir) = code_dir {
        tracing::debug!(code_dir = %dir.display(), "Mounting code");
        flags.push(format!(
            "-v {}",
            shell_word(&format!("{}:{CODE_MOUNT_TARGET}", dir.display()))
        ));
    }
    for mount in mounts {
        let mode = if mount.read_only { ":ro" } else { "" };
        let volume = format!("{}:{}{mode}", mount.source.display(), mount.target);
        flags.push(format!("-v {}", shell_word(&volume)));
    }
    flags.join(" ")
}

/// The `-e` (and debug `-p`) flags for a run.
pub fn env_string(inv: &Invocation, debug_args: Option<&str>) -> String {
    let descriptor = &inv.descriptor;
    let runtime = inv.capabilities.runtime;
    let creds = &inv.credentials;

    let mut vars: Vec<(&str, String)> = vec![
        ("FC_RUNTIME", descriptor.runtime.clone()),
        ("FC_TIMEOUT", descriptor.timeout().to_string()),
        ("FC_FUNC_CODE_PATH", "/code/".into()),
        ("ALIBABA_CLOUD_ACCESS_KEY_ID", creds.access_key_id.clone()),
        ("ALIBABA_CLOUD_ACCESS_KEY_SECRET", creds.access_key_secret.clone()),
        ("ALIBABA_CLOUD_SECURITY_TOKEN", creds.security_token.clone()),
        ("FC_ACCOUNT_ID", creds.account_id.clone()),
        ("FC_FUNCTION_HANDLER", descriptor.handler()),
        ("FC_FUNCTION_MEMORY_SIZE", descriptor.memory_size().to_string()),
        ("FC_FUNCTION_NAME", descriptor.function_name.clone()),
        ("FC_REGION", descriptor.region.clone()),
        ("FC_CUSTOM_LISTEN_PORT", descriptor.ca_port().to_string()),
        ("FC_INSTANCE_ID", inv.instance_id.clone()),
    ];
    if let Some(initializer) = descriptor.initializer() {
        vars.push((
            "FC_INITIALIZER_HANDLER",
            initializer.handler.clone().unwrap_or_default(),
        ));
        vars.push((
            "FC_INITIALIZATION_TIMEOUT",
            initializer
                .timeout
                .unwrap_or_else(|| descriptor.timeout())
                .to_string(),
        ));
    }

    let mut flags: Vec<String> = vars.iter().map(|(k, v)| env_flag(k, v)).collect();
    flags.extend(
        descriptor
            .environment_variables
            .iter()
            .map(|(k, v)| env_flag(k, v)),
    );

    tracing::debug!(debug_args = ?debug_args, "Resolved debug args");
    if let (Some(args), Some(port)) = (debug_args, inv.session.active_port()) {
        flags.push(format!("-e \"{}\"", escape_double_quoted(args)));
        if runtime != Runtime::Php72 {
            flags.push(format!("-p {port}:{port}"));
        }
        flags.push(env_flag("FC_MODE", "Debug"));
    }

    let agent_script = match (inv.capabilities.bootstrap, inv.mode) {
        (BootstrapRule::AgentScript, _) => {
            let config = descriptor.custom_runtime_config.as_ref();
            join_tokens(
                config.and_then(|c| c.command.as_deref()),
                config.and_then(|c| c.args.as_deref()),
            )
        }
        (BootstrapRule::ContainerBootstrap, Mode::Invoke) => {
            let config = descriptor.custom_container_config.as_ref();
            join_tokens(
                config.and_then(|c| c.command.as_deref()),
                config.and_then(|c| c.args.as_deref()),
            )
        }
        _ => String::new(),
    };
    if !agent_script.is_empty() {
        flags.push(env_flag("AGENT_SCRIPT", &agent_script));
    }

    if runtime.is_custom_family() {
        flags.push(env_flag("FC_SERVER_PORT", &descriptor.ca_port().to_string()));
    }

    flags.join(" ")
}

fn env_flag(key: &str, value: &str) -> String {
    format!("-e \"{key}={}\"", escape_double_quoted(value))
}

fn escape_double_quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '"' | '\\' | '$' | '`') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Command tokens then args tokens, space-joined; empty when neither is set.
fn join_tokens(command: Option<&[String]>, args: Option<&[String]>) -> String {
    command
        .unwrap_or_default()
        .iter()
        .chain(args.unwrap_or_default())
        .filter(|t| !t.is_empty())
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Bootstrap tokens as trailing shell words after the image.
fn bootstrap_words(command: Option<&[String]>, args: Option<&[String]>) -> String {
    command
        .unwrap_or_default()
        .iter()
        .chain(args.unwrap_or_default())
        .filter(|t| !t.is_empty())
        .map(|t| shell_word(t))
        .collect::<Vec<_>>()
        .join(" ")
}

fn join_parts(parts: Vec<String>) -> String {
    parts
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
