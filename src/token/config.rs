use std::collections::BTreeMap;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::config::{expandenv, CommonConfig, StringList};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TokenConfig {
    /// Request header carrying the access-token.
    #[serde(default = "TokenConfig::default_access_token_header_name")]
    pub access_token_header_name: String,

    /// Query, route or body parameter carrying the access-token.
    #[serde(default = "TokenConfig::default_access_token_params_name")]
    pub access_token_params_name: String,

    /// Name under which the decoded identity is exposed to handlers.
    #[serde(default = "TokenConfig::default_access_token_object_name")]
    pub access_token_object_name: String,

    #[serde(default = "TokenConfig::default_secret_key")]
    pub secret_key: String,

    /// Historical keys, tried after `secret_key`. Either a comma separated
    /// string or a list.
    #[serde(default)]
    pub deprecated_keys: StringList,

    #[serde(default)]
    pub ignore_expiration: bool,

    #[serde(default)]
    pub access_token_transform: Option<RenameTransformConfig>,
}

/// Declarative field renaming applied to decoded tokens.
///
/// With a `selector`, the string value found at that path of the token picks
/// the rename table; the `"*"` table applies when no other one matches, and is
/// the only one used without a selector.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct RenameTransformConfig {
    #[serde(default)]
    pub selector: Option<String>,

    /// Rename tables: `old.path -> new.path`.
    #[serde(default)]
    pub renames: BTreeMap<String, BTreeMap<String, String>>,
}

impl RenameTransformConfig {
    pub const FALLBACK: &'static str = "*";
}

impl CommonConfig for TokenConfig {
    fn default() -> Self {
        Self {
            access_token_header_name: Self::default_access_token_header_name(),
            access_token_params_name: Self::default_access_token_params_name(),
            access_token_object_name: Self::default_access_token_object_name(),
            secret_key: Self::default_secret_key(),
            deprecated_keys: StringList::default(),
            ignore_expiration: false,
            access_token_transform: None,
        }
    }

    fn complete(&mut self) -> Result<()> {
        if self.access_token_header_name.is_empty() {
            bail!("access_token_header_name cannot be empty");
        }
        if self.access_token_params_name.is_empty() {
            bail!("access_token_params_name cannot be empty");
        }
        if self.access_token_object_name.is_empty() {
            bail!("access_token_object_name cannot be empty");
        }

        self.secret_key = expandenv("secret_key", &self.secret_key)?;

        let mut keys = Vec::new();
        for key in self.deprecated_keys.to_vec() {
            keys.push(expandenv("deprecated_keys", key).context("deprecated key")?);
        }
        self.deprecated_keys = StringList::List(keys);

        Ok(())
    }
}

impl TokenConfig {
    pub const PLACEHOLDER_SECRET_KEY: &'static str = "changeme";

    pub fn default_access_token_header_name() -> String {
        String::from("x-access-token")
    }

    pub fn default_access_token_params_name() -> String {
        String::from("token")
    }

    pub fn default_access_token_object_name() -> String {
        String::from("accessToken")
    }

    pub fn default_secret_key() -> String {
        String::from(Self::PLACEHOLDER_SECRET_KEY)
    }

    /// Keys to try when verifying: the primary first, then the deprecated
    /// ones in declared order, without duplicates.
    pub fn secret_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        if !self.secret_key.is_empty() {
            keys.push(self.secret_key.clone());
        }
        for key in self.deprecated_keys.to_vec() {
            if key.is_empty() || keys.contains(&key) {
                continue;
            }
            keys.push(key);
        }
        keys
    }
}
