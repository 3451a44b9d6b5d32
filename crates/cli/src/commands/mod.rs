//! Subcommand implementations.

pub mod group;
pub mod migrate;
pub mod user;

use secrecy::SecretString;
use sqlx::PgPool;

/// Connection string from `CRM_DATABASE_URL`, falling back to `DATABASE_URL`.
fn database_url() -> Option<SecretString> {
    dotenvy::dotenv().ok();
    std::env::var("CRM_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
        .map(SecretString::from)
}

/// Connect to the CRM database, or `None` if no URL is configured.
async fn connect() -> Result<Option<PgPool>, sqlx::Error> {
    let Some(url) = database_url() else {
        return Ok(None);
    };
    tracing::info!("Connecting to database...");
    crm_web::db::create_pool(&url).await.map(Some)
}
