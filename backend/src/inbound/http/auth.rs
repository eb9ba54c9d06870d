//! Session exchange handlers.
//!
//! ```text
//! POST /api/v1/session {"accessToken":"<identity provider token>"}
//! DELETE /api/v1/session
//! ```
//!
//! The identity provider owns sign-in; this service only trusts a token the
//! provider resolves, then tracks the user id in its own cookie session.

use actix_web::{HttpResponse, delete, post, web};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::ToSchema;

use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, require_text};

/// Request body for `POST /api/v1/session`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionRequest {
    /// Access token issued by the identity provider.
    pub access_token: Option<String>,
}

/// Response body for an established session.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SessionResponse {
    pub success: bool,
    pub user_id: String,
    /// Credits granted by this call; absent after the first session.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signup_credits_granted: Option<u32>,
}

/// Exchange an identity-provider token for a cookie session.
#[utoipa::path(
    post,
    path = "/api/v1/session",
    request_body = SessionRequest,
    responses(
        (status = 200, description = "Session established", body = SessionResponse,
            headers(("Set-Cookie" = String, description = "Session cookie"))),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 401, description = "Token rejected", body = ErrorSchema),
        (status = 502, description = "Identity provider unavailable", body = ErrorSchema)
    ),
    tags = ["session"],
    operation_id = "createSession",
    security([])
)]
#[post("/session")]
pub async fn create_session(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<SessionRequest>,
) -> ApiResult<web::Json<SessionResponse>> {
    let token = require_text(
        payload.into_inner().access_token,
        FieldName::new("accessToken"),
    )?;
    let established = state.session.establish(&token).await?;
    session.persist_user(&established.user_id)?;
    info!(user_id = %established.user_id, "session established");

    Ok(web::Json(SessionResponse {
        success: true,
        user_id: established.user_id.to_string(),
        signup_credits_granted: established.signup_credits_granted,
    }))
}

/// End the current session.
#[utoipa::path(
    delete,
    path = "/api/v1/session",
    responses((status = 204, description = "Session cleared")),
    tags = ["session"],
    operation_id = "deleteSession",
    security([])
)]
#[delete("/session")]
pub async fn delete_session(session: SessionContext) -> HttpResponse {
    session.clear();
    HttpResponse::NoContent().finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{EstablishedSession, MockSessionCommand};
    use crate::domain::{Error, UserId};
    use crate::inbound::http::state::{CronSecret, HttpStatePorts};
    use crate::inbound::http::test_utils::{
        TEST_USER_ID, test_session_middleware, unused_ports,
    };
    use actix_web::http::StatusCode;
    use actix_web::{App, test as actix_test};
    use rstest::rstest;
    use serde_json::{Value, json};
    use std::sync::Arc;

    fn test_app(
        session: MockSessionCommand,
    ) -> App<
        impl actix_web::dev::ServiceFactory<
            actix_web::dev::ServiceRequest,
            Config = (),
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
            InitError = (),
        >,
    > {
        let state = HttpState::new(
            HttpStatePorts {
                session: Arc::new(session),
                ..unused_ports()
            },
            CronSecret::new("unused"),
        );
        App::new()
            .app_data(web::Data::new(state))
            .wrap(test_session_middleware())
            .service(
                web::scope("/api/v1")
                    .service(create_session)
                    .service(delete_session),
            )
    }

    #[actix_web::test]
    async fn valid_token_sets_cookie_and_reports_grant() {
        let mut session = MockSessionCommand::new();
        session
            .expect_establish()
            .withf(|token| token == "good-token")
            .times(1)
            .returning(|_| {
                Ok(EstablishedSession {
                    user_id: UserId::new(TEST_USER_ID).expect("fixture id"),
                    signup_credits_granted: Some(3),
                })
            });
        let app = actix_test::init_service(test_app(session)).await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/session")
                .set_json(json!({ "accessToken": " good-token " }))
                .to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(
            response
                .response()
                .cookies()
                .any(|cookie| cookie.name() == "session")
        );
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["userId"], TEST_USER_ID);
        assert_eq!(body["signupCreditsGranted"], 3);
    }

    #[rstest]
    #[case(json!({}))]
    #[case(json!({ "accessToken": "" }))]
    #[actix_web::test]
    async fn missing_token_is_rejected_without_lookup(#[case] payload: Value) {
        let app = actix_test::init_service(test_app(MockSessionCommand::new())).await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/session")
                .set_json(payload)
                .to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["details"]["field"], "accessToken");
    }

    #[actix_web::test]
    async fn rejected_token_does_not_set_session() {
        let mut session = MockSessionCommand::new();
        session
            .expect_establish()
            .returning(|_| Err(Error::unauthorized("invalid access token")));
        let app = actix_test::init_service(test_app(session)).await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::post()
                .uri("/api/v1/session")
                .set_json(json!({ "accessToken": "expired" }))
                .to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(
            !response
                .response()
                .cookies()
                .any(|cookie| cookie.name() == "session")
        );
    }

    #[actix_web::test]
    async fn delete_returns_no_content() {
        let app = actix_test::init_service(test_app(MockSessionCommand::new())).await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::delete()
                .uri("/api/v1/session")
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }
}
