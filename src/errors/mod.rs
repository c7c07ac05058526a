pub mod config;

use serde_json::Value;
use thiserror::Error;

use self::config::{ErrorCodes, ReturnCode};

/// The errors the guard can answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    TokenNotFound,
    TokenExpired,
    TokenInvalid,
    VerifierUnknownError,
    InsufficientPermission,
}

impl ErrorKind {
    pub fn all() -> [ErrorKind; 5] {
        [
            ErrorKind::TokenNotFound,
            ErrorKind::TokenExpired,
            ErrorKind::TokenInvalid,
            ErrorKind::VerifierUnknownError,
            ErrorKind::InsufficientPermission,
        ]
    }

    /// Key of the error in the `error_codes` configuration.
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::TokenNotFound => "TokenNotFoundError",
            ErrorKind::TokenExpired => "TokenExpiredError",
            ErrorKind::TokenInvalid => "JsonWebTokenError",
            ErrorKind::VerifierUnknownError => "JwtVerifyUnknownError",
            ErrorKind::InsufficientPermission => "InsufficientError",
        }
    }
}

/// An error ready to be rendered as an HTTP response.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("{name}: {message}")]
pub struct GuardError {
    pub name: String,
    pub message: String,
    pub status_code: u16,
    pub return_code: Option<ReturnCode>,
    pub package_ref: Option<String>,
    pub language: Option<String>,
    pub payload: Option<Value>,
}

pub struct ErrorManager;

impl ErrorManager {
    pub fn new() -> Self {
        Self
    }

    /// Registers the error codes of a package and returns the builder that
    /// creates its errors.
    pub fn register(&self, namespace: &str, codes: &ErrorCodes) -> ErrorBuilder {
        ErrorBuilder {
            namespace: String::from(namespace),
            codes: codes.clone(),
        }
    }
}

impl Default for ErrorManager {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ErrorBuilder {
    namespace: String,
    codes: ErrorCodes,
}

impl ErrorBuilder {
    const UNSUPPORTED_MESSAGE: &'static str = "unsupported error";
    const UNSUPPORTED_RETURN_CODE: i64 = -1;
    const DEFAULT_STATUS_CODE: u16 = 500;

    pub fn new_error(&self, kind: ErrorKind, language: Option<&str>) -> GuardError {
        let name = kind.name();
        let language = language.map(String::from);
        let Some(code) = self.codes.get(name) else {
            return GuardError {
                name: String::from(name),
                message: String::from(Self::UNSUPPORTED_MESSAGE),
                status_code: Self::DEFAULT_STATUS_CODE,
                return_code: Some(ReturnCode::Number(Self::UNSUPPORTED_RETURN_CODE)),
                package_ref: Some(self.namespace.clone()),
                language,
                payload: None,
            };
        };

        let message = language
            .as_deref()
            .and_then(|lang| code.message_in.get(lang))
            .unwrap_or(&code.message)
            .clone();
        GuardError {
            name: String::from(name),
            message,
            status_code: code.status_code.unwrap_or(Self::DEFAULT_STATUS_CODE),
            return_code: code.return_code.clone(),
            package_ref: Some(self.namespace.clone()),
            language,
            payload: None,
        }
    }
}
