//! Sighting repository
//!
//! Personal bird sighting log, one row per recorded observation.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Sighting;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Sighting repository trait
#[async_trait]
pub trait SightingRepository: Send + Sync {
    /// Persist a sighting, returning it with the assigned id
    async fn create(&self, sighting: &Sighting) -> Result<Sighting>;

    /// List a user's sightings, newest first
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Sighting>>;

    /// Number of sightings a user has stored
    async fn count_by_user(&self, user_id: i64) -> Result<i64>;

    /// Delete a sighting owned by the given user. Returns false when no such
    /// row exists (wrong id or wrong owner).
    async fn delete(&self, id: i64, user_id: i64) -> Result<bool>;
}

/// SQLx-based sighting repository implementation
pub struct SqlxSightingRepository {
    pool: DynDatabasePool,
}

impl SqlxSightingRepository {
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    pub fn boxed(pool: DynDatabasePool) -> Arc<dyn SightingRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SightingRepository for SqlxSightingRepository {
    async fn create(&self, sighting: &Sighting) -> Result<Sighting> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                create_sighting_sqlite(self.pool.as_sqlite().unwrap(), sighting).await
            }
            DatabaseDriver::Mysql => {
                create_sighting_mysql(self.pool.as_mysql().unwrap(), sighting).await
            }
        }
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Sighting>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_sightings_sqlite(self.pool.as_sqlite().unwrap(), user_id).await
            }
            DatabaseDriver::Mysql => {
                list_sightings_mysql(self.pool.as_mysql().unwrap(), user_id).await
            }
        }
    }

    async fn count_by_user(&self, user_id: i64) -> Result<i64> {
        let sql = "SELECT COUNT(*) AS n FROM sightings WHERE user_id = ?";
        let count = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(user_id)
                .fetch_one(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to count sightings")?
                .get::<i64, _>("n"),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(user_id)
                .fetch_one(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to count sightings")?
                .get::<i64, _>("n"),
        };
        Ok(count)
    }

    async fn delete(&self, id: i64, user_id: i64) -> Result<bool> {
        let sql = "DELETE FROM sightings WHERE id = ? AND user_id = ?";
        let affected = match self.pool.driver() {
            DatabaseDriver::Sqlite => sqlx::query(sql)
                .bind(id)
                .bind(user_id)
                .execute(self.pool.as_sqlite().unwrap())
                .await
                .context("Failed to delete sighting")?
                .rows_affected(),
            DatabaseDriver::Mysql => sqlx::query(sql)
                .bind(id)
                .bind(user_id)
                .execute(self.pool.as_mysql().unwrap())
                .await
                .context("Failed to delete sighting")?
                .rows_affected(),
        };
        Ok(affected > 0)
    }
}

async fn create_sighting_sqlite(pool: &SqlitePool, sighting: &Sighting) -> Result<Sighting> {
    let result = sqlx::query(
        r#"
        INSERT INTO sightings
            (user_id, species_id, common_name, latitude, longitude, notes, sighted_at, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(sighting.user_id)
    .bind(&sighting.species_id)
    .bind(&sighting.common_name)
    .bind(sighting.latitude)
    .bind(sighting.longitude)
    .bind(&sighting.notes)
    .bind(sighting.sighted_at)
    .bind(sighting.created_at)
    .execute(pool)
    .await
    .context("Failed to create sighting")?;

    let mut created = sighting.clone();
    created.id = result.last_insert_rowid();
    Ok(created)
}

async fn create_sighting_mysql(pool: &MySqlPool, sighting: &Sighting) -> Result<Sighting> {
    let result = sqlx::query(
        r#"
        INSERT INTO sightings
            (user_id, species_id, common_name, latitude, longitude, notes, sighted_at, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(sighting.user_id)
    .bind(&sighting.species_id)
    .bind(&sighting.common_name)
    .bind(sighting.latitude)
    .bind(sighting.longitude)
    .bind(&sighting.notes)
    .bind(sighting.sighted_at)
    .bind(sighting.created_at)
    .execute(pool)
    .await
    .context("Failed to create sighting")?;

    let mut created = sighting.clone();
    created.id = result.last_insert_id() as i64;
    Ok(created)
}

async fn list_sightings_sqlite(pool: &SqlitePool, user_id: i64) -> Result<Vec<Sighting>> {
    let rows = sqlx::query(
        r#"
        SELECT id, user_id, species_id, common_name, latitude, longitude, notes,
               sighted_at, created_at
        FROM sightings
        WHERE user_id = ?
        ORDER BY sighted_at DESC, id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to list sightings")?;

    Ok(rows
        .iter()
        .map(|row| Sighting {
            id: row.get("id"),
            user_id: row.get("user_id"),
            species_id: row.get("species_id"),
            common_name: row.get("common_name"),
            latitude: row.get("latitude"),
            longitude: row.get("longitude"),
            notes: row.get("notes"),
            sighted_at: row.get("sighted_at"),
            created_at: row.get("created_at"),
        })
        .collect())
}

async fn list_sightings_mysql(pool: &MySqlPool, user_id: i64) -> Result<Vec<Sighting>> {
    let rows = sqlx::query(
        r#"
        SELECT id, user_id, species_id, common_name, latitude, longitude, notes,
               sighted_at, created_at
        FROM sightings
        WHERE user_id = ?
        ORDER BY sighted_at DESC, id DESC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to list sightings")?;

    Ok(rows
        .iter()
        .map(|row| {
            let sighted_at: DateTime<Utc> = row.get("sighted_at");
            let created_at: DateTime<Utc> = row.get("created_at");
            Sighting {
                id: row.get("id"),
                user_id: row.get("user_id"),
                species_id: row.get("species_id"),
                common_name: row.get("common_name"),
                latitude: row.get("latitude"),
                longitude: row.get("longitude"),
                notes: row.get("notes"),
                sighted_at,
                created_at,
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::user::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations, DynDatabasePool};
    use crate::models::User;

    async fn setup() -> (DynDatabasePool, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let user = users
            .create(&User::new("birder@example.com".to_string(), "hash".to_string()))
            .await
            .expect("Failed to create user");
        (pool, user.id)
    }

    fn sample(user_id: i64, species: &str) -> Sighting {
        Sighting {
            id: 0,
            user_id,
            species_id: species.to_string(),
            common_name: "Northern Cardinal".to_string(),
            latitude: Some(40.7128),
            longitude: Some(-74.0060),
            notes: Some("At the feeder".to_string()),
            sighted_at: Utc::now(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let (pool, user_id) = setup().await;
        let repo = SqlxSightingRepository::new(pool);

        let created = repo.create(&sample(user_id, "norcar")).await.unwrap();
        assert!(created.id > 0);

        let listed = repo.list_by_user(user_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].species_id, "norcar");
        assert_eq!(repo.count_by_user(user_id).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_requires_ownership() {
        let (pool, user_id) = setup().await;
        let users = SqlxUserRepository::new(pool.clone());
        let other = users
            .create(&User::new("other@example.com".to_string(), "hash".to_string()))
            .await
            .unwrap();
        let repo = SqlxSightingRepository::new(pool);

        let created = repo.create(&sample(user_id, "norcar")).await.unwrap();

        // Another user cannot delete the row.
        assert!(!repo.delete(created.id, other.id).await.unwrap());
        assert!(repo.delete(created.id, user_id).await.unwrap());
        assert!(repo.list_by_user(user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_only_returns_own_rows() {
        let (pool, user_id) = setup().await;
        let users = SqlxUserRepository::new(pool.clone());
        let other = users
            .create(&User::new("other@example.com".to_string(), "hash".to_string()))
            .await
            .unwrap();
        let repo = SqlxSightingRepository::new(pool);

        repo.create(&sample(user_id, "norcar")).await.unwrap();
        repo.create(&sample(other.id, "blujay")).await.unwrap();

        let listed = repo.list_by_user(user_id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].user_id, user_id);
    }
}
