use std::path::{Path, PathBuf};
use std::{fs, io};

use anyhow::{bail, Context, Result};
use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::authz::config::AuthzConfig;
use crate::bypass::config::BypassRulesConfig;
use crate::errors::config::ErrorCodes;
use crate::token::codec::CodecConfig;
use crate::token::config::TokenConfig;

pub trait CommonConfig {
    fn default() -> Self;
    fn complete(&mut self) -> Result<()>;
}

/// Loads a TOML config file, falling back to defaults when the file does not exist.
pub fn load_config<T, P>(path: P) -> Result<T>
where
    T: CommonConfig + DeserializeOwned,
    P: AsRef<Path>,
{
    let path = PathBuf::from(path.as_ref());
    let mut cfg: T = match fs::read_to_string(&path) {
        Ok(s) => toml::from_str(&s)
            .with_context(|| format!("parse config file '{}' toml", path.display()))?,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            warn!(
                "Config file '{}' not found, using defaults",
                path.display()
            );
            T::default()
        }
        Err(err) => {
            return Err(err).with_context(|| format!("read config file '{}'", path.display()));
        }
    };

    cfg.complete().context("validate config")?;
    Ok(cfg)
}

/// See: [`shellexpand::full`].
pub fn expandenv(name: &str, s: impl AsRef<str>) -> Result<String> {
    let s =
        shellexpand::full(s.as_ref()).with_context(|| format!("expand env value for '{name}'"))?;
    Ok(s.to_string())
}

/// Either a single string or a list of strings. Strings are split on commas.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum StringList {
    Text(String),
    List(Vec<String>),
}

impl StringList {
    pub fn to_vec(&self) -> Vec<String> {
        match self {
            StringList::Text(text) => text
                .split(',')
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
            StringList::List(list) => list.clone(),
        }
    }
}

impl Default for StringList {
    fn default() -> Self {
        StringList::List(vec![])
    }
}

/// Configuration of the whole guard: token verification, bypassing rules,
/// authorization and error codes.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GuardConfig {
    /// When false, every middleware lets the requests through untouched.
    #[serde(default = "GuardConfig::default_enabled")]
    pub enabled: bool,

    #[serde(flatten)]
    pub token: TokenConfig,

    /// Paths that require an access-token. Empty means every request.
    #[serde(default)]
    pub protected_paths: Vec<String>,

    /// Paths that are marked as public resources and skip all the checks.
    #[serde(default)]
    pub public_paths: Vec<String>,

    /// A GET on this path answers the decoded access-token of the caller.
    #[serde(default)]
    pub access_token_detail_path: Option<String>,

    /// Use `Forwarded`/`X-Forwarded-*` headers to resolve the caller's
    /// hostname and ip.
    #[serde(default)]
    pub trust_proxy: bool,

    #[serde(default)]
    pub bypassing_rules: BypassRulesConfig,

    #[serde(default = "AuthzConfig::default")]
    pub authorization: AuthzConfig,

    #[serde(default = "ErrorCodes::default")]
    pub error_codes: ErrorCodes,

    #[serde(default = "CodecConfig::default")]
    pub codec: CodecConfig,
}

impl CommonConfig for GuardConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            token: TokenConfig::default(),
            protected_paths: vec![],
            public_paths: vec![],
            access_token_detail_path: None,
            trust_proxy: false,
            bypassing_rules: BypassRulesConfig::default(),
            authorization: AuthzConfig::default(),
            error_codes: ErrorCodes::default(),
            codec: CodecConfig::default(),
        }
    }

    fn complete(&mut self) -> Result<()> {
        self.token.complete().context("token")?;
        if self.enabled {
            if self.token.secret_key.is_empty() {
                bail!("secret_key is required when the guard is enabled");
            }
            if self.token.secret_key == TokenConfig::PLACEHOLDER_SECRET_KEY {
                bail!(
                    "secret_key must be changed from the '{}' placeholder",
                    TokenConfig::PLACEHOLDER_SECRET_KEY
                );
            }
        }

        for path in self.protected_paths.iter().chain(self.public_paths.iter()) {
            if !path.starts_with('/') {
                bail!("path '{path}' should start with '/'");
            }
        }
        if let Some(path) = self.access_token_detail_path.as_ref() {
            if !path.starts_with('/') {
                bail!("access_token_detail_path '{path}' should start with '/'");
            }
        }

        self.authorization.complete().context("authorization")?;
        self.error_codes.complete().context("error_codes")?;
        self.codec.complete().context("codec")?;
        Ok(())
    }
}

impl GuardConfig {
    pub fn default_enabled() -> bool {
        true
    }

    /// Paths the access-token gate applies to, the detail path included.
    pub fn guarded_paths(&self) -> Vec<String> {
        let mut paths = self.protected_paths.clone();
        if paths.is_empty() {
            return paths;
        }
        if let Some(path) = self.access_token_detail_path.as_ref() {
            paths.push(path.clone());
        }
        paths
    }
}
