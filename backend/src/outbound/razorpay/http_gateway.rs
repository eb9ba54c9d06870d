//! Reqwest-backed Razorpay gateway adapter.
//!
//! Owns transport details only: basic-auth credentials, request timeout,
//! JSON encoding, and mapping of HTTP failures onto `PaymentGatewayError`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use tracing::debug;

use super::dto::{CreateOrderDto, ErrorEnvelopeDto, OrderDto};
use crate::domain::GatewaySecret;
use crate::domain::ports::{GatewayOrder, GatewayOrderRequest, PaymentGateway, PaymentGatewayError};

/// API key pair issued by Razorpay.
#[derive(Debug, Clone)]
pub struct RazorpayCredentials {
    /// Public key id, also handed to the checkout widget.
    pub key_id: String,
    /// Secret used for basic auth and for payment signatures.
    pub key_secret: GatewaySecret,
}

/// Payment gateway adapter creating orders through the Razorpay REST API.
pub struct RazorpayHttpGateway {
    client: Client,
    orders_endpoint: Url,
    credentials: RazorpayCredentials,
}

impl RazorpayHttpGateway {
    /// Build an adapter whose requests are bounded by `timeout`.
    ///
    /// `api_base` is the versioned API root, e.g.
    /// `https://api.razorpay.com/v1/`.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed or the
    /// orders endpoint cannot be derived from `api_base`.
    pub fn new(
        api_base: &Url,
        credentials: RazorpayCredentials,
        timeout: Duration,
    ) -> Result<Self, PaymentGatewayError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| PaymentGatewayError::transport(err.to_string()))?;
        let orders_endpoint = api_base
            .join("orders")
            .map_err(|err| PaymentGatewayError::transport(format!("invalid api base: {err}")))?;
        Ok(Self {
            client,
            orders_endpoint,
            credentials,
        })
    }
}

#[async_trait]
impl PaymentGateway for RazorpayHttpGateway {
    async fn create_order(
        &self,
        request: &GatewayOrderRequest,
    ) -> Result<GatewayOrder, PaymentGatewayError> {
        let response = self
            .client
            .post(self.orders_endpoint.clone())
            .basic_auth(
                &self.credentials.key_id,
                Some(self.credentials.key_secret.expose()),
            )
            .json(&CreateOrderDto::from(request))
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        let body = response.bytes().await.map_err(map_transport_error)?;
        if !status.is_success() {
            return Err(map_status_error(status, body.as_ref()));
        }

        let order = parse_order(body.as_ref())?;
        debug!(order_id = %order.id, receipt = %request.receipt, "gateway order created");
        Ok(order)
    }
}

fn parse_order(body: &[u8]) -> Result<GatewayOrder, PaymentGatewayError> {
    let decoded: OrderDto = serde_json::from_slice(body).map_err(|error| {
        PaymentGatewayError::decode(format!("invalid order payload: {error}"))
    })?;
    decoded.into_domain().map_err(PaymentGatewayError::decode)
}

fn map_transport_error(error: reqwest::Error) -> PaymentGatewayError {
    if error.is_timeout() {
        PaymentGatewayError::transport(format!("request timed out: {error}"))
    } else {
        PaymentGatewayError::transport(error.to_string())
    }
}

fn map_status_error(status: StatusCode, body: &[u8]) -> PaymentGatewayError {
    let message = serde_json::from_slice::<ErrorEnvelopeDto>(body)
        .ok()
        .and_then(|envelope| envelope.error.description)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unexpected status")
                .to_owned()
        });
    PaymentGatewayError::status(status.as_u16(), message)
}

#[cfg(test)]
mod tests {
    //! Coverage for the non-network mapping helpers.

    use super::*;
    use crate::domain::TransactionId;
    use rstest::rstest;

    #[rstest]
    fn order_request_carries_plan_in_notes() {
        let request = GatewayOrderRequest {
            amount: 999,
            currency: "INR".into(),
            receipt: TransactionId::from_persisted("rcpt_42"),
            plan_id: "solo-global".into(),
        };
        let json = serde_json::to_value(CreateOrderDto::from(&request)).expect("encode");
        assert_eq!(
            json,
            serde_json::json!({
                "amount": 999,
                "currency": "INR",
                "receipt": "rcpt_42",
                "notes": { "planId": "solo-global" }
            })
        );
    }

    #[rstest]
    fn parses_order_payload() {
        let body = br#"{"id":"order_9A","entity":"order","amount":999,"currency":"INR","status":"created"}"#;
        let order = parse_order(body).expect("order");
        assert_eq!(order.id, "order_9A");
        assert_eq!(order.amount, 999);
    }

    #[rstest]
    #[case(br#"{"amount":999}"#.as_slice())]
    #[case(br#"{"id":" ","amount":999,"currency":"INR"}"#.as_slice())]
    #[case(b"<html>".as_slice())]
    fn malformed_orders_are_decode_errors(#[case] body: &[u8]) {
        let error = parse_order(body).expect_err("malformed");
        assert!(matches!(error, PaymentGatewayError::Decode { .. }));
    }

    #[rstest]
    fn status_errors_prefer_gateway_description() {
        let body = br#"{"error":{"code":"BAD_REQUEST_ERROR","description":"Authentication failed"}}"#;
        let error = map_status_error(StatusCode::UNAUTHORIZED, body);
        assert_eq!(error, PaymentGatewayError::status(401_u16, "Authentication failed"));
    }

    #[rstest]
    fn status_errors_fall_back_to_reason_phrase() {
        let error = map_status_error(StatusCode::BAD_GATEWAY, b"");
        assert_eq!(error, PaymentGatewayError::status(502_u16, "Bad Gateway"));
    }

    #[rstest]
    fn orders_endpoint_is_joined_onto_api_base() {
        let base = Url::parse("https://api.razorpay.com/v1/").expect("url");
        let gateway = RazorpayHttpGateway::new(
            &base,
            RazorpayCredentials {
                key_id: "rzp_test_key".into(),
                key_secret: GatewaySecret::new("secret"),
            },
            Duration::from_secs(5),
        )
        .expect("gateway");
        assert_eq!(gateway.orders_endpoint.as_str(), "https://api.razorpay.com/v1/orders");
    }
}
