use std::path::{Path, PathBuf};

use serde::Deserialize;

use fc_local_core::LocalError;

const CONFIG_FILE_NAME: &str = "fc-local.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EmulatorConfig {
    #[serde(default)]
    pub docker: DockerConfig,
}

/// Where emulation images come from and how containers are launched.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DockerConfig {
    #[serde(default = "default_registry")]
    pub registry: String,
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default = "default_version")]
    pub version: String,
    /// Replaces the stock per-runtime image for every non-container runtime.
    pub image: Option<String>,
    /// Passed to `docker run --platform`.
    pub platform: Option<String>,
    #[serde(default = "default_pull")]
    pub pull: bool,
}

fn default_registry() -> String {
    "registry.hub.docker.com".into()
}
fn default_namespace() -> String {
    "aliyunfc".into()
}
fn default_version() -> String {
    "3.0.0".into()
}
fn default_pull() -> bool {
    true
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            registry: default_registry(),
            namespace: default_namespace(),
            version: default_version(),
            image: None,
            platform: None,
            pull: default_pull(),
        }
    }
}

impl EmulatorConfig {
    pub fn from_file(path: &Path) -> Result<Self, LocalError> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| {
            LocalError::ConfigError(format!("Failed to parse {}: {e}", path.display()))
        })
    }

    /// Load the settings file and apply environment overrides.
    ///
    /// An explicit path must exist. Otherwise `./fc-local.toml` and then
    /// `~/.config/fc-local/fc-local.toml` are tried, falling back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self, LocalError> {
        let config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => match Self::candidate_paths().into_iter().find(|p| p.is_file()) {
                Some(path) => {
                    tracing::debug!(path = %path.display(), "Loading settings");
                    Self::from_file(&path)?
                }
                None => Self::default(),
            },
        };
        Ok(config.with_overrides(|key| std::env::var(key).ok()))
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(CONFIG_FILE_NAME)];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("fc-local").join(CONFIG_FILE_NAME));
        }
        paths
    }

    /// `FC_DOCKER_REGISTRY`, `FC_DOCKER_VERSION` and `FC_DOCKER_IMAGE_URL`
    /// take precedence over the file.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(registry) = set("FC_DOCKER_REGISTRY") {
            self.docker.registry = registry;
        }
        if let Some(version) = set("FC_DOCKER_VERSION") {
            self.docker.version = version;
        }
        if let Some(image) = set("FC_DOCKER_IMAGE_URL") {
            self.docker.image = Some(image);
        }
        self
    }
}

/// Account credentials forwarded into the container environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub access_key_secret: String,
    pub security_token: String,
    pub account_id: String,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).unwrap_or_default();
        Self {
            access_key_id: get("ALIBABA_CLOUD_ACCESS_KEY_ID"),
            access_key_secret: get("ALIBABA_CLOUD_ACCESS_KEY_SECRET"),
            security_token: get("ALIBABA_CLOUD_SECURITY_TOKEN"),
            account_id: get("FC_ACCOUNT_ID"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: EmulatorConfig = toml::from_str("").unwrap();
        assert_eq!(config.docker.registry, "registry.hub.docker.com");
        assert_eq!(config.docker.namespace, "aliyunfc");
        assert_eq!(config.docker.version, "3.0.0");
        assert!(config.docker.pull);
        assert_eq!(config.docker.platform, None);
    }

    #[test]
    fn parses_docker_section() {
        let toml_str = r#"
[docker]
registry = "registry.cn-hangzhou.aliyuncs.com"
version = "1.10.0"
platform = "linux/amd64"
pull = false
"#;
        let config: EmulatorConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.docker.registry, "registry.cn-hangzhou.aliyuncs.com");
        assert_eq!(config.docker.namespace, "aliyunfc");
        assert_eq!(config.docker.version, "1.10.0");
        assert_eq!(config.docker.platform.as_deref(), Some("linux/amd64"));
        assert!(!config.docker.pull);
    }

    #[test]
    fn env_overrides_file_values() {
        let config = EmulatorConfig::default().with_overrides(lookup(&[
            ("FC_DOCKER_REGISTRY", "mirror.local"),
            ("FC_DOCKER_VERSION", "9.9.9"),
            ("FC_DOCKER_IMAGE_URL", "mirror.local/fc/custom:1"),
        ]));
        assert_eq!(config.docker.registry, "mirror.local");
        assert_eq!(config.docker.version, "9.9.9");
        assert_eq!(config.docker.image.as_deref(), Some("mirror.local/fc/custom:1"));
    }

    #[test]
    fn blank_env_values_are_ignored() {
        let config =
            EmulatorConfig::default().with_overrides(lookup(&[("FC_DOCKER_VERSION", " ")]));
        assert_eq!(config.docker.version, "3.0.0");
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let result = EmulatorConfig::load(Some(&tmp.path().join("nope.toml")));
        assert!(matches!(result, Err(LocalError::IoError(_))));
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("fc-local.toml");
        std::fs::write(&path, "[docker\nregistry = 1").unwrap();
        let result = EmulatorConfig::from_file(&path);
        assert!(matches!(result, Err(LocalError::ConfigError(_))));
    }

    #[test]
    fn credentials_default_to_empty() {
        let creds = Credentials::from_lookup(lookup(&[("ALIBABA_CLOUD_ACCESS_KEY_ID", "AK")]));
        assert_eq!(creds.access_key_id, "AK");
        assert_eq!(creds.access_key_secret, "");
        assert_eq!(creds.account_id, "");
    }
}
