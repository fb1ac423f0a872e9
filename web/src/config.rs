use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Deserializer};
use std::{collections::HashMap, path::Path};
use tracing::debug;

#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub(crate) struct ListenConfig {
    pub(crate) host: String,
    pub(crate) port: u16,
}

const DEFAULT_HTTP_PORT: u16 = 80;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_SESSION_EXPIRY_DAYS: i64 = 1;

fn default_listen() -> ListenConfig {
    ListenConfig {
        host: DEFAULT_HOST.to_string(),
        port: DEFAULT_HTTP_PORT,
    }
}

fn default_registration_enabled() -> bool {
    true
}

fn default_session_expiry_days() -> i64 {
    DEFAULT_SESSION_EXPIRY_DAYS
}

// This handles the case where the `listen` block is PRESENT, but a field may be missing.
fn deserialize_listen_with_default_port<'de, D>(deserializer: D) -> Result<ListenConfig, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(deny_unknown_fields)]
    struct PartialListenConfig {
        host: Option<String>,
        port: Option<u16>,
    }

    let partial_config = PartialListenConfig::deserialize(deserializer)?;

    Ok(ListenConfig {
        host: partial_config
            .host
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: partial_config.port.unwrap_or(DEFAULT_HTTP_PORT),
    })
}

/// Settings for a single named environment (e.g. `dev` or `prod`) of the web
/// server
#[derive(Debug, Deserialize, PartialEq, Clone)]
#[serde(deny_unknown_fields)]
pub struct EnvConfig {
    #[serde(default = "default_listen")]
    #[serde(deserialize_with = "deserialize_listen_with_default_port")]
    pub(crate) listen: ListenConfig,
    pub(crate) database: String,
    #[serde(default = "default_registration_enabled")]
    pub(crate) user_registration_enabled: bool,
    #[serde(default = "default_session_expiry_days")]
    pub(crate) session_expiry_days: i64,
}

impl EnvConfig {
    /// Parse a yaml document that maps environment names to their config and
    /// return the config for `envname`
    pub(crate) fn from_yaml(yaml: &str, envname: &str) -> Result<Self> {
        let mut configs: HashMap<String, EnvConfig> =
            serde_yaml::from_str(yaml).with_context(|| "Failed to parse configuration")?;
        debug!(
            environments = ?configs.keys().collect::<Vec<_>>(),
            "Parsed configuration"
        );
        configs
            .remove(envname)
            .ok_or_else(|| anyhow!("No configuration found for environment '{envname}'"))
    }

    pub(crate) fn load(path: &Path, envname: &str) -> Result<Self> {
        debug!(?path, envname, "Loading configuration file");
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        Self::from_yaml(&yaml, envname)
    }
}
