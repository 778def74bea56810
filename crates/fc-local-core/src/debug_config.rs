use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Value, json};

use crate::error::LocalError;
use crate::profile::RuntimeProfile;
use crate::runtime::Runtime;

const LAUNCH_VERSION: &str = "0.2.0";
const REMOTE_ROOT: &str = "/code";

/// Build the VS Code attach configuration for a runtime.
///
/// Returns `None` for families without a standard attach configuration
/// (java, php, custom, custom-container).
pub fn debug_config_document(
    runtime: Runtime,
    code_path: &Path,
    debug_port: u16,
    function_name: &str,
) -> Option<Value> {
    let name = format!("fc/{function_name}");
    let code_path = code_path.display().to_string();

    let configuration = match RuntimeProfile::for_runtime(runtime) {
        RuntimeProfile::Nodejs => json!({
            "name": name,
            "type": "node",
            "request": "attach",
            "address": "localhost",
            "port": debug_port,
            "localRoot": code_path,
            "remoteRoot": REMOTE_ROOT,
            "protocol": if runtime == Runtime::Nodejs6 { "legacy" } else { "inspector" },
            "stopOnEntry": false,
        }),
        RuntimeProfile::Python => json!({
            "name": name,
            "type": "python",
            "request": "attach",
            "host": "localhost",
            "port": debug_port,
            "pathMappings": [
                {
                    "localRoot": code_path,
                    "remoteRoot": REMOTE_ROOT,
                }
            ],
        }),
        RuntimeProfile::Dotnet => {
            let pipe_args = json!([
                "-c",
                format!("docker exec -i $(docker ps -q -f publish={debug_port}) ${{debuggerCommand}}"),
            ]);
            json!({
                "name": name,
                "type": "coreclr",
                "request": "attach",
                "processName": "dotnet",
                "pipeTransport": {
                    "pipeProgram": "sh",
                    "pipeArgs": pipe_args,
                    "debuggerPath": "/vsdbg/vsdbg",
                    "pipeCwd": "${workspaceFolder}",
                },
                "windows": {
                    "pipeTransport": {
                        "pipeProgram": "powershell",
                        "pipeArgs": pipe_args,
                        "debuggerPath": "/vsdbg/vsdbg",
                        "pipeCwd": "${workspaceFolder}",
                    }
                },
                "sourceFileMap": {
                    "/code": code_path,
                },
            })
        }
        RuntimeProfile::Java
        | RuntimeProfile::Php
        | RuntimeProfile::Custom
        | RuntimeProfile::CustomContainer => return None,
    };

    Some(json!({
        "version": LAUNCH_VERSION,
        "configurations": [configuration],
    }))
}

/// Render a document as 4-space indented JSON, the layout VS Code writes.
pub fn render_document(document: &Value) -> Result<String, LocalError> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    document.serialize(&mut ser)?;
    String::from_utf8(buf).map_err(|e| LocalError::ConfigError(e.to_string()))
}

/// Persists debug configurations into the project's `.vscode` directory.
pub struct DebugConfigWriter {
    base_dir: PathBuf,
}

impl DebugConfigWriter {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn launch_path(&self) -> PathBuf {
        self.base_dir.join(".vscode").join("launch.json")
    }

    /// Write `document` to `.vscode/launch.json`, replacing any existing file.
    pub async fn write(&self, document: &Value) -> Result<PathBuf, LocalError> {
        let rendered = render_document(document)?;
        let path = self.launch_path();
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }

        tracing::info!(
            "You can paste these config to .vscode/launch.json, and then attach to your running function"
        );
        tracing::info!("///////////////// config begin /////////////////");
        tracing::info!("{rendered}");
        tracing::info!("///////////////// config end /////////////////");

        tokio::fs::write(&path, rendered).await?;
        tracing::debug!(path = %path.display(), "Debug configuration written");
        Ok(path)
    }
}
