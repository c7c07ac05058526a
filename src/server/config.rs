use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use restguard::config::{CommonConfig, GuardConfig};
use restguard::logs;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "ServerConfig::default_bind")]
    pub bind: String,

    /// Prefix of the example routes.
    #[serde(default = "ServerConfig::default_context_path")]
    pub context_path: String,

    #[serde(default)]
    pub workers: Option<u64>,

    #[serde(default)]
    pub keep_alive_secs: Option<u64>,

    #[serde(default = "ServerConfig::default_payload_limit_mib")]
    pub payload_limit_mib: usize,

    #[serde(default = "ServerConfig::default_log_level")]
    pub log_level: String,

    #[serde(default = "GuardConfig::default")]
    pub guard: GuardConfig,
}

impl CommonConfig for ServerConfig {
    fn default() -> Self {
        Self {
            bind: Self::default_bind(),
            context_path: Self::default_context_path(),
            workers: None,
            keep_alive_secs: None,
            payload_limit_mib: Self::default_payload_limit_mib(),
            log_level: Self::default_log_level(),
            guard: GuardConfig::default(),
        }
    }

    fn complete(&mut self) -> Result<()> {
        if self.bind.is_empty() {
            bail!("bind cannot be empty");
        }
        if !self.context_path.starts_with('/') {
            bail!("context_path '{}' should start with '/'", self.context_path);
        }
        self.context_path = self.context_path.trim_end_matches('/').to_string();
        if self.payload_limit_mib == 0 {
            bail!("payload_limit_mib must be greater than 0");
        }
        if let Some(0) = self.workers {
            bail!("workers must be greater than 0");
        }
        logs::parse_level(&self.log_level).context("log_level")?;

        self.guard.complete().context("guard")?;
        Ok(())
    }
}

impl ServerConfig {
    pub fn default_bind() -> String {
        String::from("127.0.0.1:7878")
    }

    pub fn default_context_path() -> String {
        String::from("/example")
    }

    pub fn default_payload_limit_mib() -> usize {
        1
    }

    pub fn default_log_level() -> String {
        String::from("info")
    }
}
