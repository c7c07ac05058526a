use std::collections::BTreeMap;
use std::fmt;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::config::CommonConfig;

use super::ErrorKind;

/// `return_code` may be written as a number or a string.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum ReturnCode {
    Number(i64),
    Text(String),
}

impl fmt::Display for ReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReturnCode::Number(n) => write!(f, "{n}"),
            ReturnCode::Text(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ErrorCode {
    pub message: String,

    /// Messages by language code.
    #[serde(default)]
    pub message_in: BTreeMap<String, String>,

    #[serde(default)]
    pub return_code: Option<ReturnCode>,

    #[serde(default)]
    pub status_code: Option<u16>,

    #[serde(default)]
    pub description: Option<String>,
}

impl ErrorCode {
    fn new(message: &str, return_code: i64, status_code: u16) -> Self {
        Self {
            message: String::from(message),
            message_in: BTreeMap::new(),
            return_code: Some(ReturnCode::Number(return_code)),
            status_code: Some(status_code),
            description: None,
        }
    }
}

/// Error codes keyed by error name, such as `TokenExpiredError`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(transparent)]
pub struct ErrorCodes(pub BTreeMap<String, ErrorCode>);

impl CommonConfig for ErrorCodes {
    fn default() -> Self {
        let mut codes = BTreeMap::new();
        for kind in ErrorKind::all() {
            let code = match kind {
                ErrorKind::TokenExpired => ErrorCode::new("access-token is expired", 1001, 401),
                ErrorKind::TokenInvalid => ErrorCode::new("access-token is invalid", 1002, 401),
                ErrorKind::TokenNotFound => ErrorCode::new("access-token not found", 1003, 401),
                ErrorKind::VerifierUnknownError => {
                    ErrorCode::new("access-token verification unknown error", 1004, 500)
                }
                ErrorKind::InsufficientPermission => {
                    ErrorCode::new("Insufficient permissions to access", 1010, 403)
                }
            };
            codes.insert(String::from(kind.name()), code);
        }
        Self(codes)
    }

    /// Keeps the configured codes and fills in the defaults of the missing
    /// ones. A configured code without `return_code` or `status_code` takes
    /// them from the default of the same name.
    fn complete(&mut self) -> Result<()> {
        for (name, code) in self.0.iter() {
            if let Some(status) = code.status_code {
                if !(100..=599).contains(&status) {
                    bail!("invalid status_code {status} for error '{name}'");
                }
            }
        }
        for (name, default) in <Self as CommonConfig>::default().0 {
            match self.0.get_mut(&name) {
                Some(code) => {
                    code.return_code = code.return_code.take().or(default.return_code);
                    code.status_code = code.status_code.or(default.status_code);
                    code.description = code.description.take().or(default.description);
                }
                None => {
                    self.0.insert(name, default);
                }
            }
        }
        Ok(())
    }
}

impl ErrorCodes {
    pub fn get(&self, name: &str) -> Option<&ErrorCode> {
        self.0.get(name)
    }
}
