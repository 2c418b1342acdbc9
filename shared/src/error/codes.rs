//! Unified error codes for the storefront platform
//!
//! Error codes are shared between the server and the admin console.
//! They are organized by category:
//! - 0xxx: General errors
//! - 1xxx: Authentication errors
//! - 4xxx: Order errors
//! - 5xxx: Payment errors
//! - 6xxx: Catalog errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Required field missing
    RequiredField = 6,

    // ==================== 1xxx: Auth ====================
    /// Caller is not authenticated
    NotAuthenticated = 1001,
    /// Session token is invalid
    TokenInvalid = 1002,
    /// Session has expired
    SessionExpired = 1003,

    // ==================== 4xxx: Order ====================
    /// Order not found
    OrderNotFound = 4001,
    /// Order status transition is not allowed
    InvalidStatusTransition = 4002,
    /// Order has already been refunded
    OrderAlreadyRefunded = 4003,
    /// Cart is empty
    CartEmpty = 4004,

    // ==================== 5xxx: Payment ====================
    /// Payment reference already recorded (duplicate event)
    PaymentAlreadyProcessed = 5001,
    /// Webhook payload signature is invalid
    WebhookSignatureInvalid = 5002,
    /// Payment provider call failed
    PaymentProviderError = 5003,
    /// Refund event arrived before the matching order exists
    RefundBeforeCompletion = 5004,

    // ==================== 6xxx: Catalog ====================
    /// Product not found
    ProductNotFound = 6001,
    /// Product has invalid price
    ProductInvalidPrice = 6002,
    /// Product variant not found
    VariantNotFound = 6003,
    /// Featured list is at capacity
    FeaturedCapacityExceeded = 6004,
    /// Product is not currently featured
    NotFeatured = 6005,
    /// Category not found
    CategoryNotFound = 6101,
    /// Category name already exists
    CategoryNameExists = 6102,
    /// Tag not found
    TagNotFound = 6201,
    /// Tag name already exists
    TagNameExists = 6202,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// External service error (email, blob store)
    ExternalServiceError = 9003,
    /// Transient failure, caller should retry
    ServiceUnavailable = 9004,
    /// Configuration error
    ConfigError = 9005,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::RequiredField => "Required field is missing",

            // Auth
            ErrorCode::NotAuthenticated => "Caller is not authenticated",
            ErrorCode::TokenInvalid => "Session token is invalid",
            ErrorCode::SessionExpired => "Session has expired",

            // Order
            ErrorCode::OrderNotFound => "Order not found",
            ErrorCode::InvalidStatusTransition => "Order status transition is not allowed",
            ErrorCode::OrderAlreadyRefunded => "Order has already been refunded",
            ErrorCode::CartEmpty => "Cart contains no items",

            // Payment
            ErrorCode::PaymentAlreadyProcessed => "Payment has already been processed",
            ErrorCode::WebhookSignatureInvalid => "Webhook signature verification failed",
            ErrorCode::PaymentProviderError => "Payment provider call failed",
            ErrorCode::RefundBeforeCompletion => "Refund received before matching order exists",

            // Catalog
            ErrorCode::ProductNotFound => "Product not found",
            ErrorCode::ProductInvalidPrice => "Product price must be greater than zero",
            ErrorCode::VariantNotFound => "Product variant not found",
            ErrorCode::FeaturedCapacityExceeded => "Maximum of 3 featured products allowed",
            ErrorCode::NotFeatured => "Product is not currently featured",
            ErrorCode::CategoryNotFound => "Category not found",
            ErrorCode::CategoryNameExists => "Category name already exists",
            ErrorCode::TagNotFound => "Tag not found",
            ErrorCode::TagNameExists => "Tag name already exists",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::ExternalServiceError => "External service error",
            ErrorCode::ServiceUnavailable => "Service temporarily unavailable, retry later",
            ErrorCode::ConfigError => "Configuration error",
        }
    }
}

impl From<ErrorCode> for u16 {
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error returned when converting an unknown u16 into an [`ErrorCode`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::RequiredField),

            // Auth
            1001 => Ok(ErrorCode::NotAuthenticated),
            1002 => Ok(ErrorCode::TokenInvalid),
            1003 => Ok(ErrorCode::SessionExpired),

            // Order
            4001 => Ok(ErrorCode::OrderNotFound),
            4002 => Ok(ErrorCode::InvalidStatusTransition),
            4003 => Ok(ErrorCode::OrderAlreadyRefunded),
            4004 => Ok(ErrorCode::CartEmpty),

            // Payment
            5001 => Ok(ErrorCode::PaymentAlreadyProcessed),
            5002 => Ok(ErrorCode::WebhookSignatureInvalid),
            5003 => Ok(ErrorCode::PaymentProviderError),
            5004 => Ok(ErrorCode::RefundBeforeCompletion),

            // Catalog
            6001 => Ok(ErrorCode::ProductNotFound),
            6002 => Ok(ErrorCode::ProductInvalidPrice),
            6003 => Ok(ErrorCode::VariantNotFound),
            6004 => Ok(ErrorCode::FeaturedCapacityExceeded),
            6005 => Ok(ErrorCode::NotFeatured),
            6101 => Ok(ErrorCode::CategoryNotFound),
            6102 => Ok(ErrorCode::CategoryNameExists),
            6201 => Ok(ErrorCode::TagNotFound),
            6202 => Ok(ErrorCode::TagNameExists),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9003 => Ok(ErrorCode::ExternalServiceError),
            9004 => Ok(ErrorCode::ServiceUnavailable),
            9005 => Ok(ErrorCode::ConfigError),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::ValidationFailed.code(), 2);
        assert_eq!(ErrorCode::OrderNotFound.code(), 4001);
        assert_eq!(ErrorCode::PaymentAlreadyProcessed.code(), 5001);
        assert_eq!(ErrorCode::FeaturedCapacityExceeded.code(), 6004);
        assert_eq!(ErrorCode::ServiceUnavailable.code(), 9004);
    }

    #[test]
    fn test_round_trip() {
        for code in [
            ErrorCode::Success,
            ErrorCode::ValidationFailed,
            ErrorCode::NotAuthenticated,
            ErrorCode::OrderNotFound,
            ErrorCode::InvalidStatusTransition,
            ErrorCode::PaymentAlreadyProcessed,
            ErrorCode::WebhookSignatureInvalid,
            ErrorCode::RefundBeforeCompletion,
            ErrorCode::ProductNotFound,
            ErrorCode::FeaturedCapacityExceeded,
            ErrorCode::NotFeatured,
            ErrorCode::CategoryNotFound,
            ErrorCode::TagNotFound,
            ErrorCode::InternalError,
            ErrorCode::ServiceUnavailable,
        ] {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
    }

    #[test]
    fn test_invalid_code() {
        assert_eq!(ErrorCode::try_from(999), Err(InvalidErrorCode(999)));
        assert_eq!(ErrorCode::try_from(10000), Err(InvalidErrorCode(10000)));
        assert_eq!(ErrorCode::try_from(7001), Err(InvalidErrorCode(7001)));
    }

    #[test]
    fn test_serialize_as_u16() {
        let json = serde_json::to_string(&ErrorCode::FeaturedCapacityExceeded).unwrap();
        assert_eq!(json, "6004");
        let code: ErrorCode = serde_json::from_str("4001").unwrap();
        assert_eq!(code, ErrorCode::OrderNotFound);
    }
}
