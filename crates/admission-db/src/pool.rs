//! Connection setup for the admission store: pools, migrations, database
//! creation and a row summary for `admission db-init`.

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Executor, PgPool};
use tracing::info;

use crate::config::DbConfig;

/// Migrations embedded at compile time from `crates/admission-db/migrations/`.
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!();

/// `application_name` reported by every pooled connection.
pub const APPLICATION_NAME: &str = "admission";

/// Tables owned by the store: the read-only catalog first, then the plan
/// aggregate from root to leaves.
pub const TABLES: &[&str] = &[
    "institutions",
    "majors",
    "training_programs",
    "admission_methods",
    "subject_groups",
    "admission_plans",
    "admission_training_programs",
    "admission_majors",
    "admission_major_methods",
    "admission_major_method_subject_groups",
];

fn connect_options(url: &str) -> Result<PgConnectOptions> {
    let options = PgConnectOptions::from_str(url)
        .with_context(|| format!("invalid database URL {url}"))?
        .application_name(APPLICATION_NAME);
    Ok(options)
}

/// Create a connection pool from the config.
pub async fn create_pool(config: &DbConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(connect_options(&config.database_url)?)
        .await
        .with_context(|| format!("failed to connect to database at {}", config.database_url))?;
    Ok(pool)
}

/// Run all pending embedded migrations against the pool.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    MIGRATOR
        .run(pool)
        .await
        .context("failed to run database migrations")?;

    info!("migrations applied successfully");
    Ok(())
}

/// Versions of the embedded migrations not yet applied, ascending.
pub async fn pending_migrations(pool: &PgPool) -> Result<Vec<i64>> {
    let tracked: bool =
        sqlx::query_scalar("SELECT to_regclass('public._sqlx_migrations') IS NOT NULL")
            .fetch_one(pool)
            .await
            .context("failed to look up the migrations table")?;

    let applied: Vec<i64> = if tracked {
        sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success")
            .fetch_all(pool)
            .await
            .context("failed to list applied migrations")?
    } else {
        Vec::new()
    };

    let mut pending: Vec<i64> = MIGRATOR
        .iter()
        .filter(|m| !m.migration_type.is_down_migration() && !applied.contains(&m.version))
        .map(|m| m.version)
        .collect();
    pending.sort_unstable();
    Ok(pending)
}

/// Connect to an existing store whose schema is current.
///
/// Fails when a migration is pending; the schema is left untouched.
pub async fn open_store(config: &DbConfig) -> Result<PgPool> {
    let pool = create_pool(config).await?;
    let pending = match pending_migrations(&pool).await {
        Ok(pending) => pending,
        Err(e) => {
            pool.close().await;
            return Err(e);
        }
    };
    if !pending.is_empty() {
        pool.close().await;
        anyhow::bail!(
            "database schema is missing {} migration(s) (first: {}); run `admission db-init`",
            pending.len(),
            pending[0]
        );
    }
    Ok(pool)
}

/// Create the database when absent, connect, and apply every migration.
pub async fn prepare_store(config: &DbConfig) -> Result<PgPool> {
    ensure_database_exists(config).await?;
    let pool = create_pool(config).await?;
    if let Err(e) = run_migrations(&pool).await {
        pool.close().await;
        return Err(e);
    }
    Ok(pool)
}

/// Whether `name` can be spliced into `CREATE DATABASE` as a bare identifier.
pub fn is_valid_database_name(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 63
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Ensure the target database exists, creating it if necessary.
///
/// Connects to the `postgres` maintenance database and issues
/// `CREATE DATABASE <name>` when the target database is absent.
pub async fn ensure_database_exists(config: &DbConfig) -> Result<()> {
    let db_name = config
        .database_name()
        .context("could not determine database name from URL")?;
    // CREATE DATABASE cannot take a bind parameter.
    if !is_valid_database_name(db_name) {
        anyhow::bail!("database name {:?} contains invalid characters", db_name);
    }

    let maintenance_url = config.maintenance_url();
    let maint_pool = PgPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(connect_options(&maintenance_url)?)
        .await
        .with_context(|| {
            format!(
                "failed to connect to maintenance database at {}",
                maintenance_url
            )
        })?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(db_name)
            .fetch_one(&maint_pool)
            .await
            .context("failed to query pg_database")?;

    if exists {
        info!(db = db_name, "database already exists");
    } else {
        let stmt = format!("CREATE DATABASE {db_name}");
        maint_pool
            .execute(stmt.as_str())
            .await
            .with_context(|| format!("failed to create database {db_name}"))?;
        info!(db = db_name, "database created");
    }

    maint_pool.close().await;
    Ok(())
}

/// Row count of every store table, in [`TABLES`] order.
pub async fn table_counts(pool: &PgPool) -> Result<Vec<(&'static str, i64)>> {
    let mut counts = Vec::with_capacity(TABLES.len());
    for &table in TABLES {
        let query = format!("SELECT COUNT(*) FROM {table}");
        let count: i64 = sqlx::query_scalar(&query)
            .fetch_one(pool)
            .await
            .with_context(|| format!("failed to count rows in {table}"))?;
        counts.push((table, count));
    }
    Ok(counts)
}
