//! Credit balance handler.
//!
//! ```text
//! GET /api/v1/credits
//! ```

use actix_web::{get, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::CreditSummary;
use crate::domain::{CreditGrant, PaymentRecord};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;

/// One grant in the balance breakdown.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreditGrantBody {
    pub id: String,
    pub total_credits: u32,
    pub used_credits: u32,
    /// `free`, `purchase` or `adjustment`.
    pub source: String,
    pub created_at: String,
}

impl From<CreditGrant> for CreditGrantBody {
    fn from(grant: CreditGrant) -> Self {
        Self {
            id: grant.id.to_string(),
            total_credits: grant.total_credits,
            used_credits: grant.used_credits,
            source: grant.source.to_string(),
            created_at: grant.created_at.to_rfc3339(),
        }
    }
}

/// A recent payment. Gateway identifiers other than the order id are not
/// exposed.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentBody {
    pub order_id: String,
    /// Minor currency units.
    pub amount: u64,
    pub currency: String,
    pub credits_purchased: u32,
    /// `pending`, `success` or `failed`.
    pub status: String,
    pub created_at: String,
}

impl From<PaymentRecord> for PaymentBody {
    fn from(record: PaymentRecord) -> Self {
        Self {
            order_id: record.gateway_order_id,
            amount: record.amount,
            currency: record.currency,
            credits_purchased: record.credits_purchased,
            status: record.status.to_string(),
            created_at: record.created_at.to_rfc3339(),
        }
    }
}

/// Response body for `GET /api/v1/credits`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreditsResponse {
    pub available_credits: u64,
    /// Administrators publish without spending credits.
    pub is_admin: bool,
    pub credit_breakdown: Vec<CreditGrantBody>,
    pub recent_payments: Vec<PaymentBody>,
}

impl From<CreditSummary> for CreditsResponse {
    fn from(summary: CreditSummary) -> Self {
        Self {
            available_credits: summary.available_credits,
            is_admin: summary.is_admin,
            credit_breakdown: summary
                .credit_breakdown
                .into_iter()
                .map(CreditGrantBody::from)
                .collect(),
            recent_payments: summary
                .recent_payments
                .into_iter()
                .map(PaymentBody::from)
                .collect(),
        }
    }
}

/// Report the caller's credit position.
#[utoipa::path(
    get,
    path = "/api/v1/credits",
    responses(
        (status = 200, description = "Credit position", body = CreditsResponse),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["credits"],
    operation_id = "getCredits",
    security(("SessionCookie" = []))
)]
#[get("/credits")]
pub async fn get_credits(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<CreditsResponse>> {
    let user_id = session.require_user_id()?;
    let summary = state.credits.credit_summary(&user_id).await?;
    Ok(web::Json(CreditsResponse::from(summary)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::MockCreditsQuery;
    use crate::domain::{CreditSource, Error, PaymentStatus, PricePlan, TransactionId, UserId};
    use crate::inbound::http::state::{CronSecret, HttpStatePorts};
    use crate::inbound::http::test_utils::{
        TEST_USER_ID, login_cookie, test_login, test_session_middleware, unused_ports,
    };
    use actix_web::http::StatusCode;
    use actix_web::{App, test as actix_test};
    use chrono::Utc;
    use serde_json::Value;
    use std::sync::Arc;
    use uuid::Uuid;

    fn test_app(
        credits: MockCreditsQuery,
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
                credits: Arc::new(credits),
                ..unused_ports()
            },
            CronSecret::new("unused"),
        );
        App::new()
            .app_data(web::Data::new(state))
            .wrap(test_session_middleware())
            .configure(test_login)
            .service(web::scope("/api/v1").service(get_credits))
    }

    fn summary(user_id: &UserId) -> CreditSummary {
        let now = Utc::now();
        let mut payment = PaymentRecord::pending(
            user_id.clone(),
            &PricePlan::new("solo-global", 999, "INR", 30),
            TransactionId::generate(),
            "order_abc",
            now,
        );
        payment.status = PaymentStatus::Success;
        payment.gateway_payment_id = Some("pay_secret".to_owned());
        CreditSummary {
            available_credits: 31,
            is_admin: false,
            credit_breakdown: vec![CreditGrant {
                id: Uuid::new_v4(),
                user_id: user_id.clone(),
                total_credits: 3,
                used_credits: 2,
                source: CreditSource::Free,
                payment_record_id: None,
                created_at: now,
            }],
            recent_payments: vec![payment],
        }
    }

    #[actix_web::test]
    async fn returns_summary_for_session_user() {
        let mut credits = MockCreditsQuery::new();
        credits
            .expect_credit_summary()
            .withf(|user_id| user_id.as_ref() == TEST_USER_ID)
            .times(1)
            .returning(|user_id| Ok(summary(user_id)));
        let app = actix_test::init_service(test_app(credits)).await;
        let cookie = login_cookie(&app).await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/credits")
                .cookie(cookie)
                .to_request(),
        )
        .await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = actix_test::read_body_json(response).await;
        assert_eq!(body["availableCredits"], 31);
        assert_eq!(body["isAdmin"], false);
        assert_eq!(body["creditBreakdown"][0]["source"], "free");
        assert_eq!(body["creditBreakdown"][0]["usedCredits"], 2);
        assert_eq!(body["recentPayments"][0]["orderId"], "order_abc");
        assert_eq!(body["recentPayments"][0]["status"], "success");
        assert!(!body.to_string().contains("pay_secret"));
    }

    #[actix_web::test]
    async fn anonymous_callers_are_rejected() {
        let app = actix_test::init_service(test_app(MockCreditsQuery::new())).await;
        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get().uri("/api/v1/credits").to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn ledger_outage_surfaces_as_unavailable() {
        let mut credits = MockCreditsQuery::new();
        credits
            .expect_credit_summary()
            .returning(|_| Err(Error::service_unavailable("ledger unavailable")));
        let app = actix_test::init_service(test_app(credits)).await;
        let cookie = login_cookie(&app).await;

        let response = actix_test::call_service(
            &app,
            actix_test::TestRequest::get()
                .uri("/api/v1/credits")
                .cookie(cookie)
                .to_request(),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
