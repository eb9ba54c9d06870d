//! OpenAPI schema definitions for domain types.
//!
//! Domain types remain framework-agnostic by not deriving `ToSchema`. This
//! module provides the schema definitions required for OpenAPI documentation
//! using utoipa's external schema registration.

use utoipa::ToSchema;

/// OpenAPI schema for [`crate::domain::ErrorCode`].
///
/// Stable machine-readable error codes returned in API error responses.
#[derive(ToSchema)]
#[schema(as = crate::domain::ErrorCode)]
pub enum ErrorCodeSchema {
    /// The request is malformed or fails validation.
    #[schema(rename = "invalid_request")]
    InvalidRequest,
    /// Authentication failed or is missing.
    #[schema(rename = "unauthorized")]
    Unauthorized,
    /// Authenticated but not permitted to perform this action.
    #[schema(rename = "forbidden")]
    Forbidden,
    /// The requested resource does not exist.
    #[schema(rename = "not_found")]
    NotFound,
    /// The resource is not in a state that allows the action.
    #[schema(rename = "conflict")]
    Conflict,
    /// The user has no credit left to spend.
    #[schema(rename = "insufficient_credits")]
    InsufficientCredits,
    /// A payment signature did not match.
    #[schema(rename = "invalid_signature")]
    InvalidSignature,
    /// The payment gateway or an automation webhook failed.
    #[schema(rename = "external_service")]
    ExternalService,
    /// A backing service is temporarily unavailable.
    #[schema(rename = "service_unavailable")]
    ServiceUnavailable,
    /// An unexpected error occurred on the server.
    #[schema(rename = "internal_error")]
    InternalError,
}

/// OpenAPI schema for [`crate::domain::Error`].
///
/// Every failure response uses this envelope.
#[derive(ToSchema)]
#[schema(as = crate::domain::Error)]
#[schema(rename_all = "camelCase")]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct ErrorSchema {
    /// Always `false` for errors.
    #[schema(example = false)]
    success: bool,
    /// Human-readable message returned to clients.
    #[schema(example = "Insufficient credits")]
    error: String,
    /// Stable machine-readable error code.
    #[schema(example = "insufficient_credits")]
    code: ErrorCodeSchema,
    /// Supplementary error details for clients.
    details: Option<serde_json::Value>,
    /// Correlation identifier for tracing this error across systems.
    #[schema(example = "3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    trace_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use utoipa::PartialSchema;

    fn schema_to_json<T: PartialSchema>() -> String {
        serde_json::to_string(&T::schema()).expect("schema serialises to JSON")
    }

    #[test]
    fn schemas_register_under_domain_names() {
        // utoipa replaces :: with . in schema names
        assert_eq!(ErrorCodeSchema::name(), "crate.domain.ErrorCode");
        assert_eq!(ErrorSchema::name(), "crate.domain.Error");
    }

    #[rstest]
    #[case("invalid_request")]
    #[case("unauthorized")]
    #[case("forbidden")]
    #[case("not_found")]
    #[case("conflict")]
    #[case("insufficient_credits")]
    #[case("invalid_signature")]
    #[case("external_service")]
    #[case("service_unavailable")]
    #[case("internal_error")]
    fn error_code_schema_lists_variant(#[case] code: &str) {
        assert!(
            schema_to_json::<ErrorCodeSchema>().contains(code),
            "missing {code}"
        );
    }

    #[rstest]
    #[case("success")]
    #[case("error")]
    #[case("details")]
    #[case("traceId")]
    fn error_schema_uses_envelope_field(#[case] field: &str) {
        assert!(
            schema_to_json::<ErrorSchema>().contains(field),
            "missing {field}"
        );
    }
}
