use actix_web::http::StatusCode;
use actix_web::{HttpResponse, HttpResponseBuilder};
use serde::Serialize;
use serde_json::Value;

use crate::errors::GuardError;

pub const GUARD_MISSING: &str = "Access guard is not configured";

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    name: &'a str,
    message: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    payload: Option<&'a Value>,
}

/// A wrapper struct for HTTP responses answered by the guard itself.
pub struct Response {
    http_response: HttpResponse,
}

impl Response {
    pub const RETURN_CODE_HEADER: &'static str = "X-Return-Code";
    pub const PACKAGE_REF_HEADER: &'static str = "X-Package-Ref";

    pub fn guard_error(err: &GuardError) -> Self {
        let status =
            StatusCode::from_u16(err.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut resp = HttpResponseBuilder::new(status);
        if let Some(package_ref) = err.package_ref.as_ref() {
            resp.insert_header((Self::PACKAGE_REF_HEADER, package_ref.as_str()));
        }
        if let Some(return_code) = err.return_code.as_ref() {
            resp.insert_header((Self::RETURN_CODE_HEADER, return_code.to_string()));
        }
        let body = ErrorBody {
            name: &err.name,
            message: &err.message,
            payload: err.payload.as_ref(),
        };
        Self {
            http_response: resp.json(body),
        }
    }

    pub fn not_found() -> Self {
        Self::plain_error(StatusCode::NOT_FOUND, "NotFound", "Resource not found")
    }

    pub fn error(message: &str) -> Self {
        Self::plain_error(StatusCode::INTERNAL_SERVER_ERROR, "ServerError", message)
    }

    pub fn json<T: Serialize>(data: T) -> Self {
        Self {
            http_response: HttpResponse::Ok().json(data),
        }
    }

    fn plain_error(status: StatusCode, name: &str, message: &str) -> Self {
        let body = ErrorBody {
            name,
            message,
            payload: None,
        };
        Self {
            http_response: HttpResponseBuilder::new(status).json(body),
        }
    }
}

impl From<Response> for HttpResponse {
    fn from(val: Response) -> Self {
        val.http_response
    }
}
