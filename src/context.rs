use std::future::{ready, Ready};

use actix_web::dev::Payload;
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest};
use serde_json::Value;

/// What the guard learned about a request, stored in its extensions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    /// The decoded access-token, once verified.
    pub identity: Option<Value>,

    /// Set for requests under the public paths.
    pub public_resource: bool,
}

impl RequestContext {
    /// Returns a copy of the context attached to the request, or an empty one.
    pub fn of(req: &HttpRequest) -> Self {
        req.extensions()
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_default()
    }

    pub fn store<M: HttpMessage>(self, msg: &M) {
        msg.extensions_mut().insert(self);
    }
}

impl FromRequest for RequestContext {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(Ok(Self::of(req)))
    }
}
