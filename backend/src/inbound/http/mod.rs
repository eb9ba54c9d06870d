//! HTTP inbound adapter exposing REST endpoints.

pub mod auth;
pub mod credits;
pub mod error;
pub mod health;
pub mod payments;
pub mod posts;
pub mod schemas;
pub mod session;
pub mod session_config;
pub mod state;
pub mod sweeps;
#[cfg(test)]
pub mod test_utils;
pub mod validation;

pub use error::ApiResult;

use actix_web::{Scope, web};

use crate::domain::Error;

/// Routes served under `/api/v1`. Callers wrap the scope with the session
/// middleware.
pub fn api_scope() -> Scope {
    web::scope("/api/v1")
        .service(auth::create_session)
        .service(auth::delete_session)
        .service(credits::get_credits)
        .service(payments::create_order)
        .service(payments::verify_payment)
        .service(posts::create_draft)
        .service(posts::generate_post)
        .service(posts::schedule_post)
        .service(posts::publish_post)
        .service(posts::get_post)
}

/// Register the cron-only sweep endpoints.
pub fn internal_services(cfg: &mut web::ServiceConfig) {
    cfg.service(sweeps::sweep_scheduled)
        .service(sweeps::sweep_stale_generations);
}

/// JSON extractor configuration returning the standard error envelope for
/// malformed bodies.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        Error::invalid_request(format!("invalid JSON body: {err}")).into()
    })
}
