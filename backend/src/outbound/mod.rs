//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed repositories using Diesel ORM
//! - **memory**: in-process store implementing the same repository ports
//! - **razorpay**: payment gateway order creation
//! - **webhooks**: content generation and publish automation webhooks
//! - **identity**: access token resolution against the hosted auth service
//!
//! Adapters are thin translators that convert between domain types and
//! infrastructure-specific representations. They contain no business logic.

pub mod identity;
pub mod memory;
pub mod persistence;
pub mod razorpay;
pub mod webhooks;
