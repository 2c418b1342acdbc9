//! Application state for the storefront server

use sqlx::PgPool;

use crate::auth::SessionCache;
use crate::config::Config;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// PostgreSQL connection pool
    pub pool: PgPool,
    /// HTTP client for external collaborators (Stripe, Resend, identity, blob store)
    pub http: reqwest::Client,
    /// Stripe secret key
    pub stripe_secret_key: String,
    /// Stripe webhook signing secret
    pub stripe_webhook_secret: String,
    /// Checkout redirect URLs
    pub checkout_success_url: String,
    pub checkout_cancel_url: String,
    /// Resend API key
    pub resend_api_key: String,
    /// Sender address for transactional email
    pub email_from: String,
    /// Store admin address for new-order notifications
    pub admin_email: String,
    /// External identity provider verification endpoint
    pub identity_provider_url: String,
    /// External blob store endpoints
    pub blob_store_url: String,
    pub blob_public_base_url: String,
    /// Verified admin session cache
    pub sessions: SessionCache,
}

impl AppState {
    /// Create a new AppState: connect the pool and run migrations
    pub async fn new(config: &Config) -> Result<Self, BoxError> {
        let pool = PgPool::connect(&config.database_url).await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        Ok(Self {
            pool,
            http,
            stripe_secret_key: config.stripe_secret_key.clone(),
            stripe_webhook_secret: config.stripe_webhook_secret.clone(),
            checkout_success_url: config.checkout_success_url.clone(),
            checkout_cancel_url: config.checkout_cancel_url.clone(),
            resend_api_key: config.resend_api_key.clone(),
            email_from: config.email_from.clone(),
            admin_email: config.admin_email.clone(),
            identity_provider_url: config.identity_provider_url.clone(),
            blob_store_url: config.blob_store_url.clone(),
            blob_public_base_url: config.blob_public_base_url.clone(),
            sessions: SessionCache::new(),
        })
    }
}
