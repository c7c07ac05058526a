//! actix-web middlewares, to be registered with
//! [`actix_web::middleware::from_fn`]. They expect a `Data<RestGuard>` in the
//! application data.
//!
//! Route params are only resolved once the request is routed: to read the
//! access-token from a path segment such as `/p/{token}`, wrap the resource
//! or the scope declaring it instead of the `App`.

use actix_web::body::{EitherBody, MessageBody};
use actix_web::dev::{Payload, ServiceRequest, ServiceResponse};
use actix_web::http::{header, Method};
use actix_web::middleware::Next;
use actix_web::web::{Bytes, Data};
use actix_web::{Error, HttpMessage, HttpResponse};
use log::{debug, error};
use serde_json::Value;

use crate::context::RequestContext;
use crate::guard::RestGuard;
use crate::request::AccessRequest;
use crate::response::{self, Response};

type GuardResult<B> = Result<ServiceResponse<EitherBody<B>>, Error>;

/// Marks the requests under `public_paths` as public resources.
pub async fn public_access_middleware<B: MessageBody>(
    req: ServiceRequest,
    next: Next<B>,
) -> GuardResult<B> {
    let Some(guard) = load_guard(&req) else {
        return Ok(guard_missing(req));
    };
    mark_public(&guard, &req);
    next.call(req).await.map(|res| res.map_into_left_body())
}

/// Rejects the requests under the protected paths that carry no valid
/// access-token.
pub async fn access_token_middleware<B: MessageBody>(
    mut req: ServiceRequest,
    next: Next<B>,
) -> GuardResult<B> {
    let Some(guard) = load_guard(&req) else {
        return Ok(guard_missing(req));
    };
    if let Some(resp) = gate_access_token(&guard, &mut req).await {
        return Ok(req.into_response(resp).map_into_right_body());
    }
    next.call(req).await.map(|res| res.map_into_left_body())
}

/// Answers the decoded access-token on `access_token_detail_path`.
pub async fn token_reader_middleware<B: MessageBody>(
    req: ServiceRequest,
    next: Next<B>,
) -> GuardResult<B> {
    let Some(guard) = load_guard(&req) else {
        return Ok(guard_missing(req));
    };
    if let Some(resp) = read_token_detail(&guard, &req) {
        return Ok(req.into_response(resp).map_into_right_body());
    }
    next.call(req).await.map(|res| res.map_into_left_body())
}

/// Rejects the callers lacking the permission required by the first
/// matching permission rule.
pub async fn permission_middleware<B: MessageBody>(
    req: ServiceRequest,
    next: Next<B>,
) -> GuardResult<B> {
    let Some(guard) = load_guard(&req) else {
        return Ok(guard_missing(req));
    };
    if let Some(resp) = gate_permissions(&guard, &req).await {
        return Ok(req.into_response(resp).map_into_right_body());
    }
    next.call(req).await.map(|res| res.map_into_left_body())
}

/// The four middlewares above, in order.
pub async fn guard_middleware<B: MessageBody>(
    mut req: ServiceRequest,
    next: Next<B>,
) -> GuardResult<B> {
    let Some(guard) = load_guard(&req) else {
        return Ok(guard_missing(req));
    };

    mark_public(&guard, &req);
    if let Some(resp) = gate_access_token(&guard, &mut req).await {
        return Ok(req.into_response(resp).map_into_right_body());
    }
    if let Some(resp) = read_token_detail(&guard, &req) {
        return Ok(req.into_response(resp).map_into_right_body());
    }
    if let Some(resp) = gate_permissions(&guard, &req).await {
        return Ok(req.into_response(resp).map_into_right_body());
    }
    next.call(req).await.map(|res| res.map_into_left_body())
}

fn load_guard(req: &ServiceRequest) -> Option<Data<RestGuard>> {
    req.app_data::<Data<RestGuard>>().cloned()
}

fn guard_missing<B>(req: ServiceRequest) -> ServiceResponse<EitherBody<B>> {
    error!("No RestGuard found in the app data of {}", req.path());
    let resp: HttpResponse = Response::error(response::GUARD_MISSING).into();
    req.into_response(resp).map_into_right_body()
}

/// Builds the request view once and keeps it in the extensions, so that
/// every middleware logs with the same request id.
fn access_request(guard: &RestGuard, req: &ServiceRequest) -> AccessRequest {
    if let Some(access) = req.extensions().get::<AccessRequest>() {
        return access.clone();
    }
    let access = guard.access_request(req.request());
    req.extensions_mut().insert(access.clone());
    access
}

fn mark_public(guard: &RestGuard, req: &ServiceRequest) {
    if !guard.is_enabled() || !guard.is_public_path(req.path()) {
        return;
    }
    let mut ctx = RequestContext::of(req.request());
    ctx.public_resource = true;
    ctx.store(req);
}

async fn gate_access_token(guard: &RestGuard, req: &mut ServiceRequest) -> Option<HttpResponse> {
    if !guard.is_enabled() || !guard.is_protected_path(req.path()) {
        return None;
    }

    let mut ctx = RequestContext::of(req.request());
    let mut access = access_request(guard, req);
    if !ctx.public_resource
        && !guard.is_bypassed(&access)
        && !guard.verifier().has_token_outside_body(&access)
    {
        access.body = read_json_body(req).await;
    }

    let result = guard.check_access_token(&access, &mut ctx);
    ctx.store(&*req);
    match result {
        Ok(()) => None,
        Err(err) => Some(Response::guard_error(&err).into()),
    }
}

fn read_token_detail(guard: &RestGuard, req: &ServiceRequest) -> Option<HttpResponse> {
    if !guard.is_enabled() || req.method() != Method::GET || !guard.is_detail_path(req.path()) {
        return None;
    }
    let ctx = RequestContext::of(req.request());
    match ctx.identity {
        Some(identity @ Value::Object(_)) => Some(Response::json(identity).into()),
        _ => Some(Response::not_found().into()),
    }
}

async fn gate_permissions(guard: &RestGuard, req: &ServiceRequest) -> Option<HttpResponse> {
    if !guard.is_enabled() {
        return None;
    }
    let ctx = RequestContext::of(req.request());
    let access = access_request(guard, req);
    match guard.check_permissions(&access, &ctx).await {
        Ok(_) => None,
        Err(err) => Some(Response::guard_error(&err).into()),
    }
}

/// Reads a JSON body and puts the bytes back for the handlers.
async fn read_json_body(req: &mut ServiceRequest) -> Option<Value> {
    let is_json = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("json"))
        .unwrap_or(false);
    if !is_json {
        return None;
    }

    let bytes = match req.extract::<Bytes>().await {
        Ok(bytes) => bytes,
        Err(err) => {
            debug!("Read body of {} failed: {err}", req.path());
            return None;
        }
    };
    let body = serde_json::from_slice(&bytes).ok();
    req.set_payload(Payload::from(bytes));
    body
}
