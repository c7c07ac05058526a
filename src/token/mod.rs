pub mod codec;
pub mod config;
pub mod verifier;

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;

use crate::errors::ErrorKind;
use crate::utils::{json_get, rename_json_fields, split_path};

use self::config::RenameTransformConfig;

/// Why an access-token could not be turned into an identity.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum VerifyError {
    #[error("access-token not found")]
    NotFound,

    #[error("access-token expired")]
    Expired,

    #[error("invalid access-token: {0}")]
    Invalid(String),

    #[error("verify access-token failed: {0}")]
    Unknown(String),
}

impl VerifyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VerifyError::NotFound => ErrorKind::TokenNotFound,
            VerifyError::Expired => ErrorKind::TokenExpired,
            VerifyError::Invalid(_) => ErrorKind::TokenInvalid,
            VerifyError::Unknown(_) => ErrorKind::VerifierUnknownError,
        }
    }
}

/// Post-processing applied to a successfully verified token payload.
pub trait TokenTransform: Send + Sync {
    fn transform(&self, token: Value) -> Value;
}

impl<F> TokenTransform for F
where
    F: Fn(Value) -> Value + Send + Sync,
{
    fn transform(&self, token: Value) -> Value {
        self(token)
    }
}

/// Renames token fields according to a [`RenameTransformConfig`].
pub struct RenameTransform {
    selector: Option<Vec<String>>,
    renames: BTreeMap<String, BTreeMap<String, String>>,
}

impl RenameTransform {
    pub fn new(cfg: &RenameTransformConfig) -> Self {
        Self {
            selector: cfg.selector.as_deref().map(split_path),
            renames: cfg.renames.clone(),
        }
    }

    fn select(&self, token: &Value) -> Option<&BTreeMap<String, String>> {
        let selected = self
            .selector
            .as_ref()
            .and_then(|path| json_get(token, path))
            .and_then(Value::as_str)
            .and_then(|value| self.renames.get(value));
        selected.or_else(|| self.renames.get(RenameTransformConfig::FALLBACK))
    }
}

impl TokenTransform for RenameTransform {
    fn transform(&self, token: Value) -> Value {
        match self.select(&token) {
            Some(mappings) => rename_json_fields(token, mappings),
            None => token,
        }
    }
}
