//! `PostgreSQL` store implementations.
//!
//! Queries are checked at runtime (`query_as` with `FromRow` row types) so the
//! crate builds without a live database. Embedded documents round-trip through
//! `sqlx::types::Json`.

mod customers;
mod orders;
mod products;
mod sellers;
mod users;

pub use customers::PgCustomerStore;
pub use orders::PgOrderStore;
pub use products::PgProductStore;
pub use sellers::PgSellerStore;
pub use users::PgUserStore;

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::RepositoryError;

/// Map a unique-constraint violation to `Conflict`, anything else to `Database`.
fn conflict_on_unique(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

/// Resolve a compare-and-swap update that matched no row.
///
/// The row either no longer exists or carries a newer version.
async fn missing_or_stale(pool: &PgPool, table: &str, id: Uuid) -> RepositoryError {
    let sql = format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE id = $1)");
    match sqlx::query_scalar::<_, bool>(&sql).bind(id).fetch_one(pool).await {
        Ok(true) => RepositoryError::Stale,
        Ok(false) => RepositoryError::NotFound,
        Err(e) => RepositoryError::Database(e),
    }
}

/// Apply the outcome of an `UPDATE ... RETURNING version, updated_at`.
async fn finish_update(
    pool: &PgPool,
    table: &str,
    id: Uuid,
    returned: Option<(i64, DateTime<Utc>)>,
    version: &mut i64,
    updated_at: &mut DateTime<Utc>,
) -> Result<(), RepositoryError> {
    match returned {
        Some((new_version, new_updated_at)) => {
            *version = new_version;
            *updated_at = new_updated_at;
            Ok(())
        }
        None => Err(missing_or_stale(pool, table, id).await),
    }
}

/// Fail with `NotFound` when a delete touched nothing.
fn deleted(rows: u64) -> Result<(), RepositoryError> {
    if rows == 0 {
        Err(RepositoryError::NotFound)
    } else {
        Ok(())
    }
}

fn to_db_quantity(quantity: u32) -> Result<i32, RepositoryError> {
    i32::try_from(quantity)
        .map_err(|_| RepositoryError::Conflict(format!("quantity {quantity} is out of range")))
}

fn from_db_quantity(quantity: i32) -> Result<u32, RepositoryError> {
    u32::try_from(quantity)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative quantity {quantity}")))
}
