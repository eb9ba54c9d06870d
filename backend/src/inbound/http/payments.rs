//! Credit purchase handlers.
//!
//! ```text
//! POST /api/v1/payments/orders {"planId":"solo-global"}
//! POST /api/v1/payments/verify {"gatewayOrderId":"order_..","gatewayPaymentId":"pay_..","signature":".."}
//! ```

use actix_web::{post, web};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::ports::{CreatedPaymentOrder, PaymentVerificationRequest, VerifiedPayment};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, require_text};

/// Request body for `POST /api/v1/payments/orders`.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[schema(example = "solo-global")]
    pub plan_id: Option<String>,
}

/// Checkout parameters for the gateway's client widget.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub order_id: String,
    /// Minor currency units.
    pub amount: u64,
    pub currency: String,
    pub credits: u32,
    /// Gateway key id; never the secret.
    pub public_key: String,
}

impl From<CreatedPaymentOrder> for CreateOrderResponse {
    fn from(order: CreatedPaymentOrder) -> Self {
        Self {
            order_id: order.order_id,
            amount: order.amount,
            currency: order.currency,
            credits: order.credits,
            public_key: order.public_key,
        }
    }
}

/// Signed checkout result forwarded by the client.
///
/// Missing fields are passed through empty; the verifier rejects them
/// before any lookup.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub signature: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub credits_added: u32,
    /// Minor currency units.
    pub amount_paid: u64,
    pub currency: String,
}

impl From<VerifiedPayment> for VerifyPaymentResponse {
    fn from(payment: VerifiedPayment) -> Self {
        Self {
            success: true,
            credits_added: payment.credits_added,
            amount_paid: payment.amount_paid,
            currency: payment.currency,
        }
    }
}

/// Create a gateway order for a price plan.
#[utoipa::path(
    post,
    path = "/api/v1/payments/orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order created", body = CreateOrderResponse),
        (status = 400, description = "Unknown plan", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 502, description = "Payment gateway failure", body = ErrorSchema)
    ),
    tags = ["payments"],
    operation_id = "createPaymentOrder",
    security(("SessionCookie" = []))
)]
#[post("/payments/orders")]
pub async fn create_order(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateOrderRequest>,
) -> ApiResult<web::Json<CreateOrderResponse>> {
    let user_id = session.require_user_id()?;
    let plan_id = require_text(payload.into_inner().plan_id, FieldName::new("planId"))?;
    let order = state.payment_orders.create_order(&user_id, &plan_id).await?;
    Ok(web::Json(CreateOrderResponse::from(order)))
}

/// Verify a checkout result and credit the ledger.
///
/// Replaying an already verified payment returns the original outcome
/// without adding credits again.
#[utoipa::path(
    post,
    path = "/api/v1/payments/verify",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment verified", body = VerifyPaymentResponse),
        (status = 400, description = "Missing field or signature mismatch", body = ErrorSchema),
        (status = 401, description = "Unauthorised", body = ErrorSchema),
        (status = 404, description = "Unknown order", body = ErrorSchema),
        (status = 409, description = "Payment already failed", body = ErrorSchema)
    ),
    tags = ["payments"],
    operation_id = "verifyPayment",
    security(("SessionCookie" = []))
)]
#[post("/payments/verify")]
pub async fn verify_payment(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<VerifyPaymentRequest>,
) -> ApiResult<web::Json<VerifyPaymentResponse>> {
    let user_id = session.require_user_id()?;
    let VerifyPaymentRequest {
        gateway_order_id,
        gateway_payment_id,
        signature,
    } = payload.into_inner();
    let verified = state
        .payment_verification
        .verify(PaymentVerificationRequest {
            user_id,
            gateway_order_id: gateway_order_id.unwrap_or_default(),
            gateway_payment_id: gateway_payment_id.unwrap_or_default(),
            signature: signature.unwrap_or_default(),
        })
        .await?;
    Ok(web::Json(VerifyPaymentResponse::from(verified)))
}
