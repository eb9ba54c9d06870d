//! Razorpay outbound adapter.
//!
//! Thin HTTP implementation of the `PaymentGateway` port against the
//! Razorpay Orders API.

mod dto;
mod http_gateway;

pub use http_gateway::{RazorpayCredentials, RazorpayHttpGateway};
