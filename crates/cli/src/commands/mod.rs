//! CLI command implementations.

pub mod admin;
pub mod migrate;
pub mod seed;

use secrecy::SecretString;

/// Errors shared by every command that needs the database.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Connect using `HEARTH_DATABASE_URL`, falling back to `DATABASE_URL`.
pub async fn connect() -> Result<sqlx::PgPool, ConnectError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("HEARTH_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConnectError::MissingEnvVar("HEARTH_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    Ok(hearth_storefront::db::create_pool(&database_url).await?)
}
