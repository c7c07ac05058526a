pub mod config;

use std::time::Duration;

use actix_web::middleware::from_fn;
use actix_web::web::{self, Data, PayloadConfig};
use actix_web::{App, HttpRequest, HttpResponse, HttpServer};
use anyhow::{Context, Result};
use log::{debug, info};
use serde_json::{json, Value};

use restguard::context::RequestContext;
use restguard::guard::RestGuard;
use restguard::middleware::guard_middleware;
use restguard::token::codec::EncodeOptions;

use self::config::ServerConfig;

/// The example server: a few routes under the context path, all behind the
/// guard middleware.
pub struct RestfulServer {
    bind: String,
    context_path: String,

    guard: Data<RestGuard>,

    keep_alive_secs: Option<u64>,
    workers: Option<u64>,

    payload_limit_mib: usize,
}

impl RestfulServer {
    pub fn new(cfg: &ServerConfig) -> Result<Self> {
        let guard = RestGuard::new(cfg.guard.clone()).context("build guard")?;
        Ok(Self {
            bind: cfg.bind.clone(),
            context_path: cfg.context_path.clone(),
            guard: Data::new(guard),
            keep_alive_secs: cfg.keep_alive_secs,
            workers: cfg.workers,
            payload_limit_mib: cfg.payload_limit_mib,
        })
    }

    pub async fn run(self) -> Result<()> {
        let guard = self.guard.clone();
        let context_path = self.context_path.clone();
        let payload_limit = self.payload_limit_mib * 1024 * 1024;
        let mut srv = HttpServer::new(move || {
            App::new()
                .app_data(guard.clone())
                .app_data(PayloadConfig::new(payload_limit))
                .wrap(from_fn(guard_middleware))
                .configure(|cfg| routes(cfg, &context_path))
                .default_service(web::route().to(default_handler))
        });

        info!("Binding to http://{}", self.bind);
        srv = srv.bind(&self.bind).context("bind server")?;

        if let Some(keep_alive) = self.keep_alive_secs {
            srv = srv.keep_alive(Duration::from_secs(keep_alive));
        }
        if let Some(workers) = self.workers {
            srv = srv.workers(workers as usize);
        }

        info!("Starting restful server");
        srv.run().await.context("run server")?;

        info!("Server stopped by user");
        Ok(())
    }
}

/// Registers the example routes under `context_path`.
pub fn routes(cfg: &mut web::ServiceConfig, context_path: &str) {
    cfg.service(
        web::scope(context_path)
            .route("/token", web::post().to(issue_token))
            .service(
                web::scope("/jwt")
                    .route("/authorized", web::get().to(authorized))
                    .route("/session-info", web::get().to(session_info))
                    .route("/{tail:.*}", web::get().to(public_resource)),
            ),
    );
}

async fn authorized() -> HttpResponse {
    debug!("Request /jwt/authorized");
    HttpResponse::Ok().json(json!({"status": 200, "message": "authorized"}))
}

async fn session_info(ctx: RequestContext) -> HttpResponse {
    match ctx.identity {
        Some(identity @ Value::Object(_)) => HttpResponse::Ok().json(identity),
        _ => HttpResponse::NotFound().json(json!({})),
    }
}

async fn public_resource() -> HttpResponse {
    debug!("Request /jwt public resources");
    HttpResponse::Ok().json(json!({"status": 200, "message": "public"}))
}

async fn issue_token(body: web::Json<Value>, guard: Data<RestGuard>) -> HttpResponse {
    match guard
        .codec()
        .encode(&body.into_inner(), &EncodeOptions::default())
    {
        Ok(issued) => HttpResponse::Ok().json(issued),
        Err(err) => HttpResponse::BadRequest().json(json!({
            "name": "BadRequest",
            "message": format!("{err:#}"),
        })),
    }
}

async fn default_handler(req: HttpRequest) -> HttpResponse {
    let message = format!("No route to {} {}", req.method(), req.path());
    HttpResponse::NotFound().json(json!({"name": "NotFound", "message": message}))
}
