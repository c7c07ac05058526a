//! Access-token verification, bypassing rules and permission rules for
//! actix-web services.
//!
//! A [`guard::RestGuard`] is built once from a [`config::GuardConfig`], shared
//! through `web::Data`, and consulted by the middlewares of [`middleware`].

pub mod authz;
pub mod bypass;
pub mod compiler;
pub mod config;
pub mod context;
pub mod errors;
pub mod guard;
pub mod logs;
pub mod middleware;
pub mod request;
pub mod response;
pub mod token;
pub mod utils;
