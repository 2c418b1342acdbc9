//! HTTP status code mapping for error codes

use super::codes::ErrorCode;
use http::StatusCode;

impl ErrorCode {
    /// Get the appropriate HTTP status code for this error code
    pub fn http_status(&self) -> StatusCode {
        match self {
            // Success
            Self::Success => StatusCode::OK,

            // 400 Bad Request
            Self::ValidationFailed
            | Self::InvalidRequest
            | Self::RequiredField
            | Self::CartEmpty
            | Self::ProductInvalidPrice
            | Self::WebhookSignatureInvalid => StatusCode::BAD_REQUEST,

            // 404 Not Found
            Self::NotFound
            | Self::OrderNotFound
            | Self::ProductNotFound
            | Self::VariantNotFound
            | Self::NotFeatured
            | Self::CategoryNotFound
            | Self::TagNotFound => StatusCode::NOT_FOUND,

            // 409 Conflict
            Self::AlreadyExists
            | Self::PaymentAlreadyProcessed
            | Self::OrderAlreadyRefunded
            | Self::CategoryNameExists
            | Self::TagNameExists => StatusCode::CONFLICT,

            // 401 Unauthorized
            Self::NotAuthenticated | Self::TokenInvalid | Self::SessionExpired => {
                StatusCode::UNAUTHORIZED
            }

            // 422 Unprocessable Entity (business rule violations)
            Self::FeaturedCapacityExceeded | Self::InvalidStatusTransition => {
                StatusCode::UNPROCESSABLE_ENTITY
            }

            // 502 Bad Gateway
            Self::PaymentProviderError | Self::ExternalServiceError => StatusCode::BAD_GATEWAY,

            // 503 Service Unavailable (caller should retry)
            Self::ServiceUnavailable | Self::RefundBeforeCompletion => {
                StatusCode::SERVICE_UNAVAILABLE
            }

            // 500 Internal Server Error
            Self::Unknown | Self::InternalError | Self::DatabaseError | Self::ConfigError => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(ErrorCode::Success.http_status(), StatusCode::OK);
        assert_eq!(
            ErrorCode::ValidationFailed.http_status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ErrorCode::ProductNotFound.http_status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ErrorCode::PaymentAlreadyProcessed.http_status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ErrorCode::FeaturedCapacityExceeded.http_status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ErrorCode::RefundBeforeCompletion.http_status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ErrorCode::DatabaseError.http_status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
