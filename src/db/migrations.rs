//! Database migrations module
//!
//! Code-based migrations for the BirdScope backend. All migrations are
//! embedded as SQL strings with variants for SQLite and MySQL, so a single
//! binary can bootstrap either backend.
//!
//! # Usage
//!
//! ```ignore
//! use birdscope::db::{create_pool, migrations};
//!
//! let pool = create_pool(&config).await?;
//! migrations::run_migrations(&pool).await?;
//! ```

use anyhow::{Context, Result};
use sqlx::{MySqlPool, Row, SqlitePool};

use super::DynDatabasePool;
use crate::config::DatabaseDriver;

/// A database migration with SQL for both SQLite and MySQL
#[derive(Debug, Clone)]
pub struct Migration {
    /// Migration version number (must be unique and sequential)
    pub version: i32,
    /// Human-readable migration name
    pub name: &'static str,
    /// SQL statements for SQLite
    pub up_sqlite: &'static str,
    /// SQL statements for MySQL
    pub up_mysql: &'static str,
}

/// All migrations for the BirdScope backend, embedded in the binary.
pub const MIGRATIONS: &[Migration] = &[
    // Migration 1: Create users table
    Migration {
        version: 1,
        name: "create_users",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                subscription_tier VARCHAR(20) NOT NULL DEFAULT 'free',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                email VARCHAR(255) NOT NULL UNIQUE,
                password_hash VARCHAR(255) NOT NULL,
                subscription_tier VARCHAR(20) NOT NULL DEFAULT 'free',
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP ON UPDATE CURRENT_TIMESTAMP
            );
            CREATE INDEX idx_users_email ON users(email);
        "#,
    },
    // Migration 2: Create sessions table
    Migration {
        version: 2,
        name: "create_sessions",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id INTEGER NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions(expires_at);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS sessions (
                id VARCHAR(64) PRIMARY KEY,
                user_id BIGINT NOT NULL,
                expires_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_sessions_user_id ON sessions(user_id);
            CREATE INDEX idx_sessions_expires_at ON sessions(expires_at);
        "#,
    },
    // Migration 3: Create scan ledger table
    // The unique (user_id, scan_date) index is what makes the conditional
    // upsert in ScanLedgerRepository::increment_if_below atomic.
    Migration {
        version: 3,
        name: "create_scan_ledger",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS scan_ledger (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                scan_date DATE NOT NULL,
                count INTEGER NOT NULL DEFAULT 0,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE (user_id, scan_date),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_scan_ledger_user_date ON scan_ledger(user_id, scan_date);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS scan_ledger (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                user_id BIGINT NOT NULL,
                scan_date DATE NOT NULL,
                count BIGINT NOT NULL DEFAULT 0,
                updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                UNIQUE KEY uniq_scan_ledger_user_date (user_id, scan_date),
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
        "#,
    },
    // Migration 4: Create sightings table
    Migration {
        version: 4,
        name: "create_sightings",
        up_sqlite: r#"
            CREATE TABLE IF NOT EXISTS sightings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                species_id VARCHAR(100) NOT NULL,
                common_name VARCHAR(255) NOT NULL,
                latitude REAL,
                longitude REAL,
                notes TEXT,
                sighted_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX IF NOT EXISTS idx_sightings_user_id ON sightings(user_id);
            CREATE INDEX IF NOT EXISTS idx_sightings_species_id ON sightings(species_id);
        "#,
        up_mysql: r#"
            CREATE TABLE IF NOT EXISTS sightings (
                id BIGINT PRIMARY KEY AUTO_INCREMENT,
                user_id BIGINT NOT NULL,
                species_id VARCHAR(100) NOT NULL,
                common_name VARCHAR(255) NOT NULL,
                latitude DOUBLE,
                longitude DOUBLE,
                notes TEXT,
                sighted_at TIMESTAMP NOT NULL,
                created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
            );
            CREATE INDEX idx_sightings_user_id ON sightings(user_id);
            CREATE INDEX idx_sightings_species_id ON sightings(species_id);
        "#,
    },
];

impl Migration {
    /// The SQL for the given backend, split into runnable statements.
    ///
    /// The embedded SQL never contains string literals with semicolons,
    /// so a plain split is sufficient.
    fn statements(&self, driver: DatabaseDriver) -> impl Iterator<Item = &'static str> {
        let sql = match driver {
            DatabaseDriver::Sqlite => self.up_sqlite,
            DatabaseDriver::Mysql => self.up_mysql,
        };
        sql.split(';').map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Run all pending migrations, in version order.
///
/// Returns the number of migrations applied.
pub async fn run_migrations(pool: &DynDatabasePool) -> Result<usize> {
    pool.execute(tracking_table_sql(pool.driver())).await?;

    let applied = applied_versions(pool).await?;
    let mut count = 0;

    for migration in MIGRATIONS {
        if applied.contains(&i64::from(migration.version)) {
            continue;
        }
        tracing::info!(
            version = migration.version,
            name = migration.name,
            "Applying migration"
        );
        apply(pool, migration)
            .await
            .with_context(|| format!("Failed to apply migration: {}", migration.name))?;
        count += 1;
    }

    if count > 0 {
        tracing::info!("Applied {} migration(s)", count);
    } else {
        tracing::debug!("No pending migrations");
    }

    Ok(count)
}

fn tracking_table_sql(driver: DatabaseDriver) -> &'static str {
    match driver {
        DatabaseDriver::Sqlite => {
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )"
        }
        DatabaseDriver::Mysql => {
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INT PRIMARY KEY,
                name VARCHAR(255) NOT NULL UNIQUE,
                applied_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
            )"
        }
    }
}

async fn applied_versions(pool: &DynDatabasePool) -> Result<Vec<i64>> {
    let sql = "SELECT version FROM _migrations ORDER BY version";
    let versions = match pool.driver() {
        DatabaseDriver::Sqlite => sqlx::query(sql)
            .fetch_all(pool.as_sqlite().unwrap())
            .await?
            .iter()
            .map(|row| row.get::<i64, _>("version"))
            .collect(),
        DatabaseDriver::Mysql => sqlx::query(sql)
            .fetch_all(pool.as_mysql().unwrap())
            .await?
            .iter()
            .map(|row| row.get::<i64, _>("version"))
            .collect(),
    };
    Ok(versions)
}

async fn apply(pool: &DynDatabasePool, migration: &Migration) -> Result<()> {
    match pool.driver() {
        DatabaseDriver::Sqlite => apply_sqlite(pool.as_sqlite().unwrap(), migration).await,
        DatabaseDriver::Mysql => apply_mysql(pool.as_mysql().unwrap(), migration).await,
    }
}

async fn apply_sqlite(pool: &SqlitePool, migration: &Migration) -> Result<()> {
    for statement in migration.statements(DatabaseDriver::Sqlite) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Migration {} statement failed", migration.version))?;
    }
    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;
    Ok(())
}

async fn apply_mysql(pool: &MySqlPool, migration: &Migration) -> Result<()> {
    for statement in migration.statements(DatabaseDriver::Mysql) {
        sqlx::query(statement)
            .execute(pool)
            .await
            .with_context(|| format!("Migration {} statement failed", migration.version))?;
    }
    sqlx::query("INSERT INTO _migrations (version, name) VALUES (?, ?)")
        .bind(migration.version)
        .bind(migration.name)
        .execute(pool)
        .await?;
    Ok(())
}
