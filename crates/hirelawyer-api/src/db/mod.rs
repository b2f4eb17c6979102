//! # PostgreSQL Persistence
//!
//! Backs every collaborator trait with PostgreSQL when `DATABASE_URL` is
//! set. Migrations are embedded at compile time from `./migrations`.
//!
//! Fees are stored as `BIGINT` cents. The active-slot rule is the partial
//! unique index `appointments_active_slot_uq`; its violations surface as
//! [`StoreError::SlotTaken`](crate::repository::StoreError::SlotTaken).

mod appointments;
mod notifications;

pub use appointments::PgRepository;
pub use notifications::PgNotifier;

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Open a connection pool.
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await?;
    tracing::info!("database pool initialized");
    Ok(pool)
}

/// Apply pending migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("database migrations applied");
    Ok(())
}

/// Cheap connectivity probe for readiness checks.
pub async fn ping(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
