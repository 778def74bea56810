use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::LocalError;

pub const DEFAULT_MEMORY_SIZE: u32 = 128;
pub const DEFAULT_CA_PORT: u16 = 9000;
pub const DEFAULT_TIMEOUT: u32 = 3;
const DEFAULT_CUSTOM_HANDLER: &str = "index.handler";

/// The local view of one Function Compute function, as written in the
/// function's `props` block.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionDescriptor {
    #[serde(default)]
    pub function_name: String,
    pub runtime: String,
    #[serde(default)]
    pub region: String,
    pub handler: Option<String>,
    pub timeout: Option<u32>,
    pub memory_size: Option<u32>,
    pub code: Option<CodeUri>,
    pub ca_port: Option<u16>,
    pub custom_container_config: Option<CustomContainerConfig>,
    pub custom_runtime_config: Option<CustomRuntimeConfig>,
    #[serde(default)]
    pub environment_variables: IndexMap<String, String>,
    pub instance_lifecycle_config: Option<InstanceLifecycleConfig>,
    #[serde(default)]
    pub triggers: Vec<Trigger>,
    #[serde(default)]
    pub mounts: Vec<MountSpec>,
}

/// `code: ./src` or `code: { src: ./src }`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CodeUri {
    Path(String),
    Source { src: Option<String> },
}

impl CodeUri {
    pub fn src(&self) -> Option<&str> {
        let src = match self {
            CodeUri::Path(path) => Some(path.as_str()),
            CodeUri::Source { src } => src.as_deref(),
        };
        src.filter(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomContainerConfig {
    pub image: Option<String>,
    pub command: Option<Vec<String>>,
    pub args: Option<Vec<String>>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomRuntimeConfig {
    pub command: Option<Vec<String>>,
    pub args: Option<Vec<String>>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceLifecycleConfig {
    pub initializer: Option<LifecycleHook>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleHook {
    pub handler: Option<String>,
    pub timeout: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    pub trigger_name: Option<String>,
    #[serde(alias = "type")]
    pub trigger_type: String,
}

/// A host directory bind-mounted into the emulation container (NAS stand-in).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MountSpec {
    pub source: PathBuf,
    pub target: String,
    #[serde(default)]
    pub read_only: bool,
}

impl FunctionDescriptor {
    /// Parse a descriptor from YAML.
    ///
    /// Accepts either a bare props document or a project file with a
    /// `resources.<name>.props` block; in the latter case `resource` selects
    /// the entry and defaults to the first one.
    pub fn from_yaml_str(content: &str, resource: Option<&str>) -> Result<Self, LocalError> {
        let doc: serde_yaml::Value = serde_yaml::from_str(content)?;
        let props = match doc.get("resources").and_then(|r| r.as_mapping()) {
            Some(resources) => {
                let entry = match resource {
                    Some(name) => resources.get(name).ok_or_else(|| {
                        LocalError::InvalidDescriptor(format!("resource {name} not found"))
                    })?,
                    None => resources.values().next().ok_or_else(|| {
                        LocalError::InvalidDescriptor("no resources defined".into())
                    })?,
                };
                entry.get("props").cloned().ok_or_else(|| {
                    LocalError::InvalidDescriptor("resource has no props".into())
                })?
            }
            None => doc,
        };
        Ok(serde_yaml::from_value(props)?)
    }

    pub async fn from_file(path: &Path, resource: Option<&str>) -> Result<Self, LocalError> {
        let content = tokio::fs::read_to_string(path).await?;
        Self::from_yaml_str(&content, resource)
    }

    pub fn memory_size(&self) -> u32 {
        self.memory_size.filter(|m| *m > 0).unwrap_or(DEFAULT_MEMORY_SIZE)
    }

    pub fn timeout(&self) -> u32 {
        self.timeout.unwrap_or(DEFAULT_TIMEOUT)
    }

    pub fn is_custom_container(&self) -> bool {
        self.runtime == "custom-container"
    }

    fn is_custom_runtime(&self) -> bool {
        self.runtime == "custom" || self.runtime == "custom.debian10"
    }

    /// Container-internal port the function's HTTP server listens on.
    pub fn ca_port(&self) -> u16 {
        if let Some(port) = self.ca_port {
            return port;
        }
        let configured = if self.is_custom_container() {
            self.custom_container_config.as_ref().and_then(|c| c.port)
        } else if self.is_custom_runtime() {
            self.custom_runtime_config.as_ref().and_then(|c| c.port)
        } else {
            None
        };
        configured.unwrap_or(DEFAULT_CA_PORT)
    }

    pub fn handler(&self) -> String {
        match &self.handler {
            Some(handler) => handler.clone(),
            None if self.runtime.starts_with("custom") => DEFAULT_CUSTOM_HANDLER.into(),
            None => String::new(),
        }
    }

    pub fn code_src(&self) -> Option<&str> {
        self.code.as_ref().and_then(CodeUri::src)
    }

    pub fn initializer(&self) -> Option<&LifecycleHook> {
        self.instance_lifecycle_config
            .as_ref()
            .and_then(|c| c.initializer.as_ref())
            .filter(|h| h.handler.as_deref().is_some_and(|s| !s.is_empty()))
    }

    /// True if any trigger is an HTTP trigger.
    pub fn has_http_trigger(&self) -> bool {
        self.triggers.iter().any(|t| t.trigger_type == "http")
    }

    /// True if the function is primarily HTTP-triggered (its first trigger is HTTP).
    pub fn is_http_function(&self) -> bool {
        self.triggers
            .first()
            .is_some_and(|t| t.trigger_type == "http")
    }
}
