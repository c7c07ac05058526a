use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::{expandenv, CommonConfig, StringList};
use crate::utils::split_path;

/// A location inside the decoded token: a dotted path or its segments.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum LocationPath {
    Dotted(String),
    Segments(Vec<String>),
}

impl LocationPath {
    pub fn segments(&self) -> Vec<String> {
        match self {
            LocationPath::Dotted(path) => split_path(path),
            LocationPath::Segments(segments) => segments
                .iter()
                .filter(|s| !s.is_empty())
                .cloned()
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthzConfig {
    #[serde(default = "AuthzConfig::default_enabled")]
    pub enabled: bool,

    /// Where the permission list lives in the decoded token.
    #[serde(default)]
    pub permission_location: Option<LocationPath>,

    /// Where the permission group list lives in the decoded token.
    #[serde(default)]
    pub permission_group_location: Option<LocationPath>,

    #[serde(default)]
    pub permission_group_lookup: Option<HandshakeConfig>,

    #[serde(default)]
    pub permission_rules: Vec<PermissionRuleConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct PermissionRuleConfig {
    /// Only an explicit `false` disables the rule.
    #[serde(default)]
    pub enabled: Option<bool>,

    /// Regular expression tested against the request path and query.
    #[serde(default)]
    pub url: Option<String>,

    /// Allowed methods. Empty means any.
    #[serde(default)]
    pub methods: StringList,

    /// Required permission. Empty means that matching is enough.
    #[serde(default)]
    pub permission: Option<String>,
}

/// Settings of the handshake service resolving permission groups.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct HandshakeConfig {
    pub url: String,

    pub app_type: String,

    #[serde(default = "HandshakeConfig::default_timeout_ms")]
    pub timeout_ms: u64,
}

impl HandshakeConfig {
    pub fn default_timeout_ms() -> u64 {
        65000
    }

    fn complete(&mut self) -> Result<()> {
        self.url = expandenv("url", &self.url)?;
        self.app_type = expandenv("app_type", &self.app_type)?;
        if self.url.is_empty() {
            bail!("url cannot be empty");
        }
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            bail!("url '{}' should start with http:// or https://", self.url);
        }
        if self.timeout_ms == 0 {
            bail!("timeout_ms cannot be zero");
        }
        self.url = self.url.trim_end_matches('/').to_string();
        Ok(())
    }
}

impl CommonConfig for AuthzConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            permission_location: None,
            permission_group_location: None,
            permission_group_lookup: None,
            permission_rules: vec![],
        }
    }

    fn complete(&mut self) -> Result<()> {
        if let Some(lookup) = self.permission_group_lookup.as_mut() {
            lookup.complete().context("permission_group_lookup")?;
        }
        Ok(())
    }
}

impl AuthzConfig {
    pub fn default_enabled() -> bool {
        true
    }
}
