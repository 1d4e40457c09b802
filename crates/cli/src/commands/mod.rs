//! CLI subcommands.

pub mod migrate;
pub mod seed;

use secrecy::SecretString;

/// Read the database URL, falling back to the generic `DATABASE_URL`.
///
/// # Errors
///
/// Returns an error if neither variable is set.
pub fn database_url() -> Result<SecretString, Box<dyn std::error::Error>> {
    // Load .env file if present (ignore errors if not found)
    dotenvy::dotenv().ok();

    std::env::var("VENDORA_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| "VENDORA_DATABASE_URL not set".into())
}
