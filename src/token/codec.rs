use anyhow::{bail, Context, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::{expandenv, CommonConfig};

use super::verifier::verify_with_key;
use super::VerifyError;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CodecConfig {
    #[serde(default = "CodecConfig::default_secret_key")]
    pub secret_key: String,

    /// Token lifetime, in seconds.
    #[serde(default = "CodecConfig::default_expires_in")]
    pub expires_in: u64,

    #[serde(default)]
    pub ignore_expiration: bool,

    /// Payload field receiving the lifetime of the issued token.
    #[serde(default = "CodecConfig::default_expires_in_field_name")]
    pub expires_in_field_name: String,
}

impl CommonConfig for CodecConfig {
    fn default() -> Self {
        Self {
            secret_key: Self::default_secret_key(),
            expires_in: Self::default_expires_in(),
            ignore_expiration: false,
            expires_in_field_name: Self::default_expires_in_field_name(),
        }
    }

    fn complete(&mut self) -> Result<()> {
        self.secret_key = expandenv("secret_key", &self.secret_key)?;
        if self.secret_key.is_empty() {
            bail!("secret_key cannot be empty");
        }
        if self.expires_in_field_name.is_empty() {
            bail!("expires_in_field_name cannot be empty");
        }
        Ok(())
    }
}

impl CodecConfig {
    pub fn default_secret_key() -> String {
        String::from("t0ps3cr3t")
    }

    pub fn default_expires_in() -> u64 {
        3600
    }

    pub fn default_expires_in_field_name() -> String {
        String::from("expiredIn")
    }
}

#[derive(Debug, Default, Clone)]
pub struct EncodeOptions {
    pub secret_key: Option<String>,
    pub expires_in: Option<u64>,
}

#[derive(Debug, Default, Clone)]
pub struct DecodeOptions {
    pub secret_key: Option<String>,
    pub ignore_expiration: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: u64,
    /// Unix timestamp, in seconds.
    pub expired_time: i64,
}

/// Issues and decodes HS256 access-tokens.
pub struct TokenCodec {
    cfg: CodecConfig,
}

impl TokenCodec {
    const EXPIRED_TIME_FIELD: &'static str = "expiredTime";

    pub fn new(cfg: CodecConfig) -> Self {
        Self { cfg }
    }

    pub fn encode(&self, payload: &Value, opts: &EncodeOptions) -> Result<IssuedToken> {
        let mut claims = match payload {
            Value::Object(map) => map.clone(),
            Value::Null => Map::new(),
            _ => bail!("token payload must be a JSON object"),
        };

        let expires_in = opts.expires_in.unwrap_or(self.cfg.expires_in);
        let now = Utc::now().timestamp();
        let expired_time = i64::try_from(expires_in)
            .ok()
            .and_then(|ttl| now.checked_add(ttl))
            .with_context(|| format!("expires_in {expires_in} is out of range"))?;
        claims.insert(
            self.cfg.expires_in_field_name.clone(),
            Value::from(expires_in),
        );
        claims.insert(
            String::from(Self::EXPIRED_TIME_FIELD),
            Value::from(expired_time),
        );
        claims.insert(String::from("iat"), Value::from(now));
        claims.insert(String::from("exp"), Value::from(expired_time));

        let key = opts.secret_key.as_deref().unwrap_or(&self.cfg.secret_key);
        let access_token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(key.as_bytes()),
        )
        .context("sign access-token")?;

        Ok(IssuedToken {
            access_token,
            expires_in,
            expired_time,
        })
    }

    pub fn decode(&self, token: &str, opts: &DecodeOptions) -> Result<Value, VerifyError> {
        let key = opts.secret_key.as_deref().unwrap_or(&self.cfg.secret_key);
        let ignore_expiration = opts
            .ignore_expiration
            .unwrap_or(self.cfg.ignore_expiration);
        verify_with_key(token, key, ignore_expiration)
    }

    /// Reads the payload without checking the signature or the lifetime.
    pub fn decode_unverified(&self, token: &str) -> Result<Value, VerifyError> {
        let segment = token
            .split('.')
            .nth(1)
            .ok_or_else(|| VerifyError::Invalid(String::from("jwt malformed")))?;
        let data = URL_SAFE_NO_PAD
            .decode(segment.trim_end_matches('='))
            .map_err(|e| VerifyError::Invalid(format!("invalid payload encoding: {e}")))?;
        serde_json::from_slice(&data).map_err(|e| VerifyError::Invalid(e.to_string()))
    }
}
