use anyhow::{Context, Result};
use log::info;
use sqlx::{migrate::MigrateDatabase, Sqlite, SqlitePool, Transaction};
use std::sync::Arc;

/// Schema version recorded in SQLite's user_version pragma once migration ran
const SCHEMA_VERSION: i64 = 2;

/// DbConnection manages database operations
#[derive(Clone)]
pub struct DbConnection {
    pool: Arc<SqlitePool>,
}

impl DbConnection {
    /// Open (creating and migrating if needed) the database at the given URL
    pub async fn new(url: &str) -> Result<Self> {
        // Create database if it doesn't exist
        if !Sqlite::database_exists(url).await.unwrap_or(false) {
            Sqlite::create_database(url)
                .await
                .with_context(|| format!("Failed to create database at {}", url))?
        }

        // Connect to the database
        let pool = SqlitePool::connect(url)
            .await
            .with_context(|| format!("Failed to connect to database at {}", url))?;

        // Bring the schema up to the current version
        Self::migrate(&pool).await?;

        Ok(Self { pool: Arc::new(pool) })
    }

    /// Initialize a test database with a unique name
    #[cfg(test)]
    pub async fn init_test() -> Result<Self> {
        // Generate a unique database name for tests
        let test_id = uuid::Uuid::new_v4().to_string();
        let db_url = format!("file:memdb_{}?mode=memory&cache=shared", test_id);

        Self::new(&db_url).await
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Begin a transaction; rolled back on drop unless committed
    pub async fn begin(&self) -> Result<Transaction<'static, Sqlite>> {
        Ok(self.pool.begin().await?)
    }

    /// Close the pool; in-flight operations finish first
    pub async fn close(&self) {
        self.pool.close().await;
    }

    /// The schema version currently recorded in the database
    pub async fn schema_version(&self) -> Result<i64> {
        let version: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(self.pool())
            .await?;
        Ok(version)
    }

    /// Apply any schema steps the database has not seen yet.
    ///
    /// Each step is gated on the version recorded in user_version, so
    /// re-opening an already-migrated database applies nothing. The steps
    /// and the version bump commit in one transaction: an interrupted
    /// migration leaves the recorded version matching the schema actually
    /// present, and the next open retries cleanly.
    async fn migrate(pool: &SqlitePool) -> Result<()> {
        let version: i64 = sqlx::query_scalar("PRAGMA user_version")
            .fetch_one(pool)
            .await?;

        if version >= SCHEMA_VERSION {
            return Ok(());
        }

        info!(
            "Migrating database schema from version {} to {}",
            version, SCHEMA_VERSION
        );

        let mut tx = pool.begin().await?;

        if version < 1 {
            Self::create_base_schema(&mut tx).await?;
        }
        if version < 2 {
            Self::add_size_columns(&mut tx).await?;
        }

        sqlx::query(&format!("PRAGMA user_version = {}", SCHEMA_VERSION))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(())
    }

    /// Version 1: the four entity tables and their lookup indexes
    async fn create_base_schema(tx: &mut Transaction<'static, Sqlite>) -> Result<()> {
        // Create owners table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS owners (
                id TEXT PRIMARY KEY,
                first_name TEXT NOT NULL,
                last_name TEXT NOT NULL,
                email TEXT,
                phone TEXT,
                address TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            "#,
        )
        .execute(&mut **tx)
        .await?;

        // Create boxes table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS boxes (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                location TEXT,
                status TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );
            "#,
        )
        .execute(&mut **tx)
        .await?;

        // Create animals table; owner_id and box_id are the authoritative
        // relationship columns (box occupancy is derived from box_id)
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS animals (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                species TEXT NOT NULL,
                breed TEXT,
                birth_date TEXT,
                gender TEXT NOT NULL,
                owner_id TEXT,
                box_id TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (owner_id) REFERENCES owners (id),
                FOREIGN KEY (box_id) REFERENCES boxes (id)
            );
            "#,
        )
        .execute(&mut **tx)
        .await?;

        // Create treatments table
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS treatments (
                id TEXT PRIMARY KEY,
                animal_id TEXT NOT NULL,
                type TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT,
                administration_date TEXT,
                next_due_date TEXT,
                administered BOOLEAN NOT NULL DEFAULT FALSE,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (animal_id) REFERENCES animals (id) ON DELETE CASCADE
            );
            "#,
        )
        .execute(&mut **tx)
        .await?;

        // Create index for ordering animals by name
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_animals_name
            ON animals(name);
            "#,
        )
        .execute(&mut **tx)
        .await?;

        // Create index for owner lookups
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_animals_owner_id
            ON animals(owner_id);
            "#,
        )
        .execute(&mut **tx)
        .await?;

        // Create index for occupant derivation
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_animals_box_id
            ON animals(box_id);
            "#,
        )
        .execute(&mut **tx)
        .await?;

        // Create index for availability filtering
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_boxes_status
            ON boxes(status);
            "#,
        )
        .execute(&mut **tx)
        .await?;

        // Create index for per-animal treatment lookups
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_treatments_animal_id
            ON treatments(animal_id);
            "#,
        )
        .execute(&mut **tx)
        .await?;

        // Create index for the overdue-treatment report
        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS idx_treatments_next_due_date
            ON treatments(next_due_date);
            "#,
        )
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Version 2: size categories arrived after the first release, so
    /// databases created before then lack the columns
    async fn add_size_columns(tx: &mut Transaction<'static, Sqlite>) -> Result<()> {
        sqlx::query("ALTER TABLE animals ADD COLUMN size TEXT")
            .execute(&mut **tx)
            .await?;

        sqlx::query("ALTER TABLE boxes ADD COLUMN size TEXT")
            .execute(&mut **tx)
            .await?;

        Ok(())
    }
}
