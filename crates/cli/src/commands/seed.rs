//! Seed sellers and their catalog from a YAML file.
//!
//! Each seller entry creates a seller account (skipped when the email is
//! already registered), applies the store settings and lists the products.
//! Writes go through the API services so the same validation applies.
//!
//! ```yaml
//! sellers:
//!   - name: Jordan Lee
//!     email: jordan@phones.test
//!     password: correct-horse-battery
//!     store:
//!       storeName: Jordan's Phones
//!       storeDescription: Refurbished flagships
//!     products:
//!       - name: Pixel 8
//!         description: Unlocked, 128GB
//!         brand: Google
//!         price: "499.00"
//!         quantity: 10
//!         storage: 128gb
//!         ram: 8gb
//!         condition: like_new
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::{error, info, warn};

use vendora_api::db::{self, Database};
use vendora_api::models::{ProductDraft, SellerSettings};
use vendora_api::services::auth::{AuthError, AuthService, Registration};
use vendora_api::services::products::ProductService;
use vendora_api::services::sellers::SellerService;
use vendora_core::{Email, Role, SellerId};

/// Top-level seed file.
#[derive(Debug, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub sellers: Vec<SeedSeller>,
}

/// A seller account with its store and listings.
#[derive(Debug, Deserialize)]
pub struct SeedSeller {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub store: SellerSettings,
    #[serde(default)]
    pub products: Vec<ProductDraft>,
}

/// Outcome counts for a seeding run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub sellers_created: usize,
    pub sellers_skipped: usize,
    pub products_created: usize,
}

/// Check every entry without touching the database.
///
/// Returns one message per problem found.
#[must_use]
pub fn validate(file: &SeedFile) -> Vec<String> {
    let mut errors = Vec::new();
    for (i, seller) in file.sellers.iter().enumerate() {
        let label = format!("sellers[{i}] ({})", seller.email);
        if let Err(e) = Email::parse(&seller.email) {
            errors.push(format!("{label}: {e}"));
        }
        if seller.name.trim().is_empty() {
            errors.push(format!("{label}: name is required"));
        }
        for (j, draft) in seller.products.iter().enumerate() {
            if let Err(e) = draft.clone().into_product(SellerId::new()) {
                errors.push(format!("{label}.products[{j}]: {e}"));
            }
        }
    }
    errors
}

/// Run the seed command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails validation,
/// or a database write fails.
pub async fn run(file_path: &str, dry_run: bool) -> Result<(), Box<dyn std::error::Error>> {
    // Verify file exists
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading seed file");

    // Read and validate YAML before connecting to database
    let content = tokio::fs::read_to_string(path).await?;
    let file: SeedFile = serde_yaml::from_str(&content)?;
    info!(sellers = file.sellers.len(), "Parsed seed file");

    let errors = validate(&file);
    if !errors.is_empty() {
        error!("Seed file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    if dry_run {
        info!("Dry run: seed file is valid, nothing written");
        return Ok(());
    }

    let database_url = super::database_url()?;
    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    let summary = seed(&Database::postgres(pool), file).await?;

    info!("Seeding complete!");
    info!("  Sellers created: {}", summary.sellers_created);
    info!("  Sellers skipped (already exist): {}", summary.sellers_skipped);
    info!("  Products created: {}", summary.products_created);
    Ok(())
}

/// Write a validated seed file into `db`.
///
/// # Errors
///
/// Returns the first failed write.
pub async fn seed(db: &Database, file: SeedFile) -> Result<SeedSummary, Box<dyn std::error::Error>> {
    let mut summary = SeedSummary::default();

    for entry in file.sellers {
        let registration = Registration {
            name: entry.name,
            email: entry.email.clone(),
            password: entry.password,
            role: Some(Role::Seller),
        };

        let user = match AuthService::new(db).register(registration).await {
            Ok(user) => user,
            Err(AuthError::UserAlreadyExists) => {
                warn!(email = %entry.email, "seller already exists, skipping");
                summary.sellers_skipped += 1;
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let sellers = SellerService::new(db);
        let seller = sellers.for_user(user.id).await?;
        sellers.update_settings(seller.id, user.id, entry.store).await?;
        summary.sellers_created += 1;

        let products = ProductService::new(db);
        for draft in entry.products {
            products.create(user.id, draft).await?;
            summary.products_created += 1;
        }
        info!(email = %entry.email, "seeded seller");
    }

    Ok(summary)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SEED: &str = r#"
sellers:
  - name: Jordan Lee
    email: jordan@phones.test
    password: correct-horse-battery
    store:
      storeName: Jordan's Phones
      storeDescription: Refurbished flagships
    products:
      - name: Pixel 8
        description: Unlocked
        brand: Google
        price: "499.00"
        salePrice: "449.00"
        quantity: 10
        condition: like_new
      - name: Galaxy S23
        description: Like new
        brand: Samsung
        price: "599.00"
        quantity: 2
"#;

    #[test]
    fn test_parse_and_validate() {
        let file: SeedFile = serde_yaml::from_str(SEED).unwrap();
        assert_eq!(file.sellers.len(), 1);
        assert_eq!(file.sellers.first().unwrap().products.len(), 2);
        assert!(validate(&file).is_empty());
    }

    #[test]
    fn test_validate_reports_bad_entries() {
        let yaml = r#"
sellers:
  - name: " "
    email: not-an-email
    password: correct-horse-battery
    products:
      - name: Broken
        description: Sale above price
        brand: Acme
        price: "10.00"
        salePrice: "12.00"
"#;
        let file: SeedFile = serde_yaml::from_str(yaml).unwrap();
        let errors = validate(&file);
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.contains("salePrice")));
    }

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let db = Database::memory();

        let file: SeedFile = serde_yaml::from_str(SEED).unwrap();
        let first = seed(&db, file).await.unwrap();
        assert_eq!(
            first,
            SeedSummary {
                sellers_created: 1,
                sellers_skipped: 0,
                products_created: 2,
            }
        );

        let file: SeedFile = serde_yaml::from_str(SEED).unwrap();
        let second = seed(&db, file).await.unwrap();
        assert_eq!(second.sellers_skipped, 1);
        assert_eq!(second.products_created, 0);

        let email = Email::parse("jordan@phones.test").unwrap();
        let user = db.users().find_by_email(&email).await.unwrap().unwrap();
        let seller = db.sellers().find_by_user(user.id).await.unwrap().unwrap();
        assert_eq!(seller.store_name, "Jordan's Phones");
        assert_eq!(seller.metrics.total_products, 2);
    }
}
