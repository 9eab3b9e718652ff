use anyhow::{Context, Result, anyhow};
use libresponder::{DEFAULT_SERVER, backend::DEFAULT_TIMEOUT, sync::DEFAULT_INTERVAL};
use serde::{Deserialize, Serialize};
use std::{
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    time::Duration,
};
use tokio::{
    fs::{File, create_dir_all, read_to_string, set_permissions},
    io::AsyncWriteExt,
};
use tracing::debug;

fn project_dirs() -> Result<directories::ProjectDirs> {
    directories::ProjectDirs::from("org", "responder", "responderctl")
        .ok_or_else(|| anyhow!("Cannot find default project directories"))
}

/// Location of the configuration file
pub(crate) fn config_file() -> Result<PathBuf> {
    Ok(project_dirs()?.config_dir().join("config.json"))
}

fn default_server() -> String {
    DEFAULT_SERVER.to_string()
}

fn default_identity() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("identity.json"))
        .unwrap_or_else(|_| PathBuf::from("identity.json"))
}

fn default_interval() -> u64 {
    DEFAULT_INTERVAL.as_secs()
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Base url of the marker and messaging backend
    #[serde(default = "default_server")]
    pub server: String,
    /// File holding the responder's username and user id
    #[serde(default = "default_identity")]
    pub identity: PathBuf,
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: default_server(),
            identity: default_identity(),
            interval_secs: default_interval(),
            timeout_secs: default_timeout(),
        }
    }
}

impl Config {
    fn parse(contents: &str) -> Result<Self> {
        serde_json::from_str(contents).with_context(|| "Couldn't parse json string")
    }

    fn format(&self) -> Result<String> {
        serde_json::to_string_pretty(self).with_context(|| "Couldn't convert config to json")
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    /// Load the config, falling back to defaults when the file doesn't exist yet
    pub async fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let p = path.as_ref();
        match read_to_string(p).await {
            Ok(contents) => Self::parse(&contents)
                .with_context(|| format!("Invalid config file '{}'", p.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(?p, "No config file, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        debug!(?path, "Saving config");
        if let Some(parent) = path.parent() {
            create_dir_all(parent).await?;
        }
        let mut file = File::create(path).await?;
        let serialized = self.format()?;
        let mut perms = file.metadata().await?.permissions();
        perms.set_mode(0o600);
        set_permissions(path, perms).await?;
        file.write_all(serialized.as_bytes())
            .await
            .with_context(|| "Failed to write config file")?;
        Ok(())
    }
}
