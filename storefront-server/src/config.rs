//! Server configuration

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Storefront server configuration, loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// HTTP port
    pub http_port: u16,
    /// Environment: development | staging | production
    pub environment: String,
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
    /// URL to redirect after successful checkout (carries {CHECKOUT_SESSION_ID})
    pub checkout_success_url: String,
    /// URL to redirect after cancelled checkout
    pub checkout_cancel_url: String,
    /// Resend API key for transactional email
    pub resend_api_key: String,
    /// Sender address for transactional email
    pub email_from: String,
    /// Store admin address for new-order notifications
    pub admin_email: String,
    /// External identity provider verification endpoint for admin sessions
    pub identity_provider_url: String,
    /// External blob store upload endpoint
    pub blob_store_url: String,
    /// Public base URL for uploaded blobs
    pub blob_public_base_url: String,
    /// Seconds between compensating refund sweeps over the payment processor
    pub refund_sweep_secs: u64,
}

impl Config {
    /// Require a secret env var: must be set and non-empty in non-development environments.
    fn require_secret(name: &str, environment: &str) -> Result<String, BoxError> {
        let val = match std::env::var(name) {
            Ok(v) => v,
            Err(_) => {
                if environment != "development" {
                    return Err(format!("{name} must be set in {environment} environment").into());
                }
                format!("dev-{name}-not-for-production")
            }
        };
        if val.is_empty() && environment != "development" {
            return Err(format!("{name} must not be empty in {environment} environment").into());
        }
        Ok(val)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, BoxError> {
        let environment = std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into());

        Ok(Self {
            database_url: std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?,
            http_port: std::env::var("HTTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            environment: environment.clone(),
            stripe_secret_key: Self::require_secret("STRIPE_SECRET_KEY", &environment)?,
            stripe_webhook_secret: Self::require_secret("STRIPE_WEBHOOK_SECRET", &environment)?,
            checkout_success_url: std::env::var("CHECKOUT_SUCCESS_URL").unwrap_or_else(|_| {
                "http://localhost:8080/success?session_id={CHECKOUT_SESSION_ID}".into()
            }),
            checkout_cancel_url: std::env::var("CHECKOUT_CANCEL_URL")
                .unwrap_or_else(|_| "http://localhost:8080/cart".into()),
            resend_api_key: Self::require_secret("RESEND_API_KEY", &environment)?,
            email_from: std::env::var("EMAIL_FROM")
                .unwrap_or_else(|_| "orders@storefront.local".into()),
            admin_email: std::env::var("ADMIN_EMAIL")
                .unwrap_or_else(|_| "admin@storefront.local".into()),
            identity_provider_url: std::env::var("IDENTITY_PROVIDER_URL")
                .unwrap_or_else(|_| "http://localhost:9090/sessions/verify".into()),
            blob_store_url: std::env::var("BLOB_STORE_URL")
                .unwrap_or_else(|_| "http://localhost:9091/upload".into()),
            blob_public_base_url: std::env::var("BLOB_PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:9091/public".into()),
            refund_sweep_secs: std::env::var("REFUND_SWEEP_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        })
    }
}
