//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every HTTP endpoint, the error envelope schemas and
//! the session cookie security scheme. The document backs Swagger UI in
//! debug builds and is exported by `cargo run --bin openapi-dump`.

use crate::inbound::http::auth::{SessionRequest, SessionResponse};
use crate::inbound::http::credits::{CreditGrantBody, CreditsResponse, PaymentBody};
use crate::inbound::http::payments::{
    CreateOrderRequest, CreateOrderResponse, VerifyPaymentRequest, VerifyPaymentResponse,
};
use crate::inbound::http::posts::{
    CreateDraftBody, GeneratePostBody, PostBody, PublishPostBody, PublishPostResponse,
    SchedulePostBody,
};
use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};
use crate::inbound::http::sweeps::{ScheduledSweepResponse, StaleSweepResponse, SweepResultBody};
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Enrich the generated document with the session cookie security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);

        components.add_security_scheme(
            "SessionCookie",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                "session",
                "Session cookie issued by POST /api/v1/session.",
            ))),
        );
    }
}

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "VoicePost backend API",
        description = "Credits, payments and post publishing for voice-drafted LinkedIn posts."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    security(("SessionCookie" = [])),
    paths(
        crate::inbound::http::auth::create_session,
        crate::inbound::http::auth::delete_session,
        crate::inbound::http::credits::get_credits,
        crate::inbound::http::payments::create_order,
        crate::inbound::http::payments::verify_payment,
        crate::inbound::http::posts::create_draft,
        crate::inbound::http::posts::generate_post,
        crate::inbound::http::posts::schedule_post,
        crate::inbound::http::posts::publish_post,
        crate::inbound::http::posts::get_post,
        crate::inbound::http::sweeps::sweep_scheduled,
        crate::inbound::http::sweeps::sweep_stale_generations,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        ErrorSchema,
        ErrorCodeSchema,
        SessionRequest,
        SessionResponse,
        CreditsResponse,
        CreditGrantBody,
        PaymentBody,
        CreateOrderRequest,
        CreateOrderResponse,
        VerifyPaymentRequest,
        VerifyPaymentResponse,
        CreateDraftBody,
        GeneratePostBody,
        SchedulePostBody,
        PublishPostBody,
        PublishPostResponse,
        PostBody,
        ScheduledSweepResponse,
        StaleSweepResponse,
        SweepResultBody,
    )),
    tags(
        (name = "session", description = "Session exchange with the identity provider"),
        (name = "credits", description = "Credit balance"),
        (name = "payments", description = "Credit purchases"),
        (name = "posts", description = "Post drafting, scheduling and publishing"),
        (name = "internal", description = "Cron-only reconciliation sweeps"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
