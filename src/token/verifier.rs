use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use log::debug;
use serde_json::Value;

use crate::context::RequestContext;
use crate::request::AccessRequest;

use super::config::TokenConfig;
use super::{RenameTransform, TokenTransform, VerifyError};

/// Verifies the access-token attached to a request against an ordered list
/// of secret keys.
pub struct TokenVerifier {
    header_name: String,
    params_name: String,

    secret_keys: Vec<String>,
    ignore_expiration: bool,

    transform: Option<Arc<dyn TokenTransform>>,
}

impl TokenVerifier {
    pub fn new(cfg: &TokenConfig) -> Self {
        let transform = cfg
            .access_token_transform
            .as_ref()
            .map(|t| Arc::new(RenameTransform::new(t)) as Arc<dyn TokenTransform>);
        Self {
            header_name: cfg.access_token_header_name.to_lowercase(),
            params_name: cfg.access_token_params_name.clone(),
            secret_keys: cfg.secret_keys(),
            ignore_expiration: cfg.ignore_expiration,
            transform,
        }
    }

    /// Replaces the transform built from the configuration.
    pub fn with_transform(mut self, transform: Arc<dyn TokenTransform>) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn secret_keys(&self) -> &[String] {
        &self.secret_keys
    }

    /// Looks for the token in the header, then the query string, then the
    /// route params, then the JSON body. Empty values are skipped.
    pub fn extract_token<'a>(&self, req: &'a AccessRequest) -> Option<&'a str> {
        let from_header = req
            .header(&self.header_name)
            .map(strip_bearer)
            .filter(|s| !s.is_empty());
        if from_header.is_some() {
            return from_header;
        }

        let lookup = |value: Option<&'a String>| value.map(String::as_str).filter(|s| !s.is_empty());
        lookup(req.query.get(&self.params_name))
            .or_else(|| lookup(req.params.get(&self.params_name)))
            .or_else(|| {
                req.body
                    .as_ref()
                    .and_then(|body| body.get(&self.params_name))
                    .and_then(Value::as_str)
                    .filter(|s| !s.is_empty())
            })
    }

    /// True when a token can be found without looking at the body.
    pub fn has_token_outside_body(&self, req: &AccessRequest) -> bool {
        let has = |value: Option<&String>| value.map(|s| !s.is_empty()).unwrap_or(false);
        req.header(&self.header_name)
            .map(|s| !strip_bearer(s).is_empty())
            .unwrap_or(false)
            || has(req.query.get(&self.params_name))
            || has(req.params.get(&self.params_name))
    }

    pub fn verify(&self, req: &AccessRequest) -> Result<Value, VerifyError> {
        let token = match self.extract_token(req) {
            Some(token) => token,
            None => {
                debug!("Req[{}] - access-token not found", req.request_id);
                return Err(VerifyError::NotFound);
            }
        };
        debug!(
            "Req[{}] - access-token found, verify with {} key(s), ignore_expiration: {}",
            req.request_id,
            self.secret_keys.len(),
            self.ignore_expiration
        );

        match verify_with_keys(token, &self.secret_keys, self.ignore_expiration) {
            Ok(payload) => {
                debug!(
                    "Req[{}] - Verification passed, token: {}",
                    req.request_id, payload
                );
                let payload = match self.transform.as_ref() {
                    Some(transform) => {
                        let payload = transform.transform(payload);
                        debug!(
                            "Req[{}] - transformed token: {}",
                            req.request_id, payload
                        );
                        payload
                    }
                    None => payload,
                };
                Ok(payload)
            }
            Err(err) => {
                debug!(
                    "Req[{}] - Verification failed, language: {:?}, error: {err}",
                    req.request_id, req.language
                );
                Err(err)
            }
        }
    }

    /// Verifies the request and stores the identity into the context.
    pub fn verify_and_attach(
        &self,
        req: &AccessRequest,
        ctx: &mut RequestContext,
    ) -> Result<Value, VerifyError> {
        let payload = self.verify(req)?;
        ctx.identity = Some(payload.clone());
        Ok(payload)
    }
}

fn strip_bearer(value: &str) -> &str {
    let value = value.trim();
    match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        _ => value,
    }
}

/// Tries every key in order. An invalid signature moves on to the next key,
/// expiry and unknown failures stop immediately.
pub fn verify_with_keys(
    token: &str,
    keys: &[String],
    ignore_expiration: bool,
) -> Result<Value, VerifyError> {
    let mut last_err = VerifyError::Unknown(String::from("no secret key configured"));
    for key in keys {
        match verify_with_key(token, key, ignore_expiration) {
            Ok(payload) => return Ok(payload),
            Err(err @ VerifyError::Invalid(_)) => last_err = err,
            Err(err) => return Err(err),
        }
    }
    Err(last_err)
}

/// Verifies an HS256/HS384/HS512 token with a single key.
pub fn verify_with_key(
    token: &str,
    key: &str,
    ignore_expiration: bool,
) -> Result<Value, VerifyError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.algorithms = vec![Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];
    validation.required_spec_claims = HashSet::new();
    validation.validate_aud = false;
    // Time based claims are checked below, against whole seconds.
    validation.validate_exp = false;
    validation.validate_nbf = false;

    let payload = decode::<Value>(token, &DecodingKey::from_secret(key.as_bytes()), &validation)
        .map_err(classify)?
        .claims;

    let now = Utc::now().timestamp() as f64;
    if !ignore_expiration {
        match payload.get("exp") {
            Some(Value::Number(exp)) => {
                if exp.as_f64().map(|exp| now >= exp).unwrap_or(false) {
                    return Err(VerifyError::Expired);
                }
            }
            Some(_) => return Err(VerifyError::Invalid(String::from("invalid exp value"))),
            None => {}
        }
    }
    match payload.get("nbf") {
        Some(Value::Number(nbf)) => {
            if nbf.as_f64().map(|nbf| nbf > now).unwrap_or(false) {
                return Err(VerifyError::Unknown(String::from("jwt not active")));
            }
        }
        Some(_) => return Err(VerifyError::Invalid(String::from("invalid nbf value"))),
        None => {}
    }

    Ok(payload)
}

fn classify(err: JwtError) -> VerifyError {
    match err.kind() {
        JwtErrorKind::ExpiredSignature => VerifyError::Expired,
        JwtErrorKind::InvalidToken
        | JwtErrorKind::InvalidSignature
        | JwtErrorKind::InvalidAlgorithm
        | JwtErrorKind::InvalidAlgorithmName
        | JwtErrorKind::InvalidAudience
        | JwtErrorKind::InvalidIssuer
        | JwtErrorKind::InvalidSubject
        | JwtErrorKind::MissingRequiredClaim(_)
        | JwtErrorKind::Base64(_)
        | JwtErrorKind::Json(_)
        | JwtErrorKind::Utf8(_) => VerifyError::Invalid(err.to_string()),
        _ => VerifyError::Unknown(err.to_string()),
    }
}
