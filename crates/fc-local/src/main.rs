use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt};

use fc_local_core::{DebugSession, FunctionDescriptor};
use fc_local_emulator::{Credentials, EmulatorConfig, InvocationRequest, LocalEmulator, LocalOutcome};

#[derive(Parser)]
#[command(
    name = "fc-local",
    version,
    about = "Run Function Compute functions locally in Docker"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the function once against an event
    Invoke(InvokeArgs),
    /// Serve an HTTP-triggered function on a local port
    Start(FunctionArgs),
}

#[derive(Args)]
struct FunctionArgs {
    /// Function descriptor (bare props or a project file with `resources`)
    #[arg(short = 't', long, default_value = "function.yaml")]
    template: PathBuf,

    /// Resource to use when the template defines several
    #[arg(long)]
    resource: Option<String>,

    /// IDE to attach with: vscode, intellij or pycharm
    #[arg(short = 'c', long = "config", value_name = "IDE")]
    ide: Option<String>,

    /// Port the debugger listens on inside the container
    #[arg(short = 'd', long)]
    debug_port: Option<String>,

    /// Project directory (defaults to the template's directory)
    #[arg(long)]
    base_dir: Option<PathBuf>,

    /// Path to fc-local.toml
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[derive(Args)]
struct InvokeArgs {
    #[command(flatten)]
    function: FunctionArgs,

    /// Event payload
    #[arg(short = 'e', long)]
    event: Option<String>,

    /// Read the event payload from a file
    #[arg(short = 'f', long, conflicts_with = "event")]
    event_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; container output owns stdout
    fmt()
        .with_env_filter(
            EnvFilter::try_from_env("FC_LOCAL_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let outcome = match cli.command {
        Commands::Invoke(args) => {
            let event = read_event(args.event, args.event_file.as_deref()).await?;
            let (emulator, request) = prepare(&args.function, event).await?;
            emulator.invoke(request).await?
        }
        Commands::Start(args) => {
            let (emulator, request) = prepare(&args, String::new()).await?;
            emulator.start(request).await?
        }
    };

    match outcome {
        LocalOutcome::Completed => tracing::debug!("Done"),
        other => tracing::debug!(outcome = ?other, "Nothing was run"),
    }
    Ok(())
}

async fn prepare(args: &FunctionArgs, event: String) -> Result<(LocalEmulator, InvocationRequest)> {
    let config = EmulatorConfig::load(args.settings.as_deref()).context("Failed to load settings")?;

    let descriptor = FunctionDescriptor::from_file(&args.template, args.resource.as_deref())
        .await
        .with_context(|| format!("Failed to load function from {}", args.template.display()))?;

    let base_dir = match &args.base_dir {
        Some(dir) => dir.clone(),
        None => template_dir(&args.template)?,
    };

    let request = InvocationRequest {
        descriptor,
        session: DebugSession::from_flags(args.debug_port.as_deref(), args.ide.as_deref()),
        event,
        base_dir,
    };
    let emulator = LocalEmulator::new(config).with_credentials(Credentials::from_env());
    Ok((emulator, request))
}

fn template_dir(template: &Path) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    Ok(match template.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => cwd.join(parent),
        _ => cwd,
    })
}

async fn read_event(event: Option<String>, event_file: Option<&Path>) -> Result<String> {
    match (event, event_file) {
        (Some(event), _) => Ok(event),
        (None, Some(path)) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read event file {}", path.display())),
        (None, None) => Ok(String::new()),
    }
}
