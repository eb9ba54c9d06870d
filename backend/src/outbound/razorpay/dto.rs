//! DTOs for the Razorpay Orders API.

use serde::{Deserialize, Serialize};

use crate::domain::ports::{GatewayOrder, GatewayOrderRequest};

#[derive(Debug, Serialize)]
pub(super) struct CreateOrderDto<'a> {
    pub(super) amount: u64,
    pub(super) currency: &'a str,
    pub(super) receipt: &'a str,
    pub(super) notes: OrderNotesDto<'a>,
}

#[derive(Debug, Serialize)]
pub(super) struct OrderNotesDto<'a> {
    #[serde(rename = "planId")]
    pub(super) plan_id: &'a str,
}

impl<'a> From<&'a GatewayOrderRequest> for CreateOrderDto<'a> {
    fn from(request: &'a GatewayOrderRequest) -> Self {
        Self {
            amount: request.amount,
            currency: &request.currency,
            receipt: request.receipt.as_str(),
            notes: OrderNotesDto {
                plan_id: &request.plan_id,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct OrderDto {
    pub(super) id: String,
    pub(super) amount: u64,
    pub(super) currency: String,
}

impl OrderDto {
    pub(super) fn into_domain(self) -> Result<GatewayOrder, String> {
        if self.id.trim().is_empty() {
            return Err("order id is empty".to_owned());
        }
        Ok(GatewayOrder {
            id: self.id,
            amount: self.amount,
            currency: self.currency,
        })
    }
}

/// Error envelope returned with non-2xx responses.
#[derive(Debug, Deserialize)]
pub(super) struct ErrorEnvelopeDto {
    pub(super) error: ErrorDto,
}

#[derive(Debug, Deserialize)]
pub(super) struct ErrorDto {
    #[serde(default)]
    pub(super) description: Option<String>,
}
