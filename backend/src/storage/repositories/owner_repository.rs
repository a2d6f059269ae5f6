use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};

use crate::storage::connection::DbConnection;
use shared::Owner;

/// Repository for owner records.
///
/// The owned-animal list on the model is a derived cache: ownership lives on
/// the animals table, and the ids are collected from there on load.
#[derive(Clone)]
pub struct OwnerRepository {
    db: DbConnection,
}

impl OwnerRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    fn owner_from_row(row: &SqliteRow) -> Owner {
        Owner {
            id: row.get("id"),
            first_name: row.get("first_name"),
            last_name: row.get("last_name"),
            email: row.get("email"),
            phone: row.get("phone"),
            address: row.get("address"),
            animal_ids: Vec::new(),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }

    async fn load_animal_ids(&self, owner_id: &str) -> Result<Vec<String>> {
        let rows = sqlx::query(
            r#"
            SELECT id FROM animals WHERE owner_id = ? ORDER BY name ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(|row| row.get("id")).collect())
    }

    /// Store an owner in the database
    pub async fn store_owner(&self, owner: &Owner) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO owners (id, first_name, last_name, email, phone, address, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&owner.id)
        .bind(&owner.first_name)
        .bind(&owner.last_name)
        .bind(&owner.email)
        .bind(&owner.phone)
        .bind(&owner.address)
        .bind(&owner.created_at)
        .bind(&owner.updated_at)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    /// Get an owner by ID, with its owned-animal ids collected
    pub async fn get_owner(&self, owner_id: &str) -> Result<Option<Owner>> {
        let row = sqlx::query(
            r#"
            SELECT id, first_name, last_name, email, phone, address, created_at, updated_at
            FROM owners
            WHERE id = ?
            "#,
        )
        .bind(owner_id)
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            Some(r) => {
                let mut owner = Self::owner_from_row(&r);
                owner.animal_ids = self.load_animal_ids(owner_id).await?;
                Ok(Some(owner))
            }
            None => Ok(None),
        }
    }

    /// Get an owner by ID inside an open transaction (animal ids not loaded)
    pub async fn get_owner_tx(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        owner_id: &str,
    ) -> Result<Option<Owner>> {
        let row = sqlx::query(
            r#"
            SELECT id, first_name, last_name, email, phone, address, created_at, updated_at
            FROM owners
            WHERE id = ?
            "#,
        )
        .bind(owner_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row.map(|r| Self::owner_from_row(&r)))
    }

    /// Check that an owner exists inside an open transaction
    pub async fn owner_exists_tx(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        owner_id: &str,
    ) -> Result<bool> {
        let row = sqlx::query(
            r#"
            SELECT 1 FROM owners WHERE id = ?
            "#,
        )
        .bind(owner_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row.is_some())
    }

    /// List all owners ordered by last then first name, animal ids collected
    pub async fn list_owners(&self) -> Result<Vec<Owner>> {
        let rows = sqlx::query(
            r#"
            SELECT id, first_name, last_name, email, phone, address, created_at, updated_at
            FROM owners
            ORDER BY last_name ASC, first_name ASC
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;

        let mut owners = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut owner = Self::owner_from_row(row);
            owner.animal_ids = self.load_animal_ids(&owner.id).await?;
            owners.push(owner);
        }

        Ok(owners)
    }

    /// Update an owner in the database inside an open transaction
    pub async fn update_owner_tx(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        owner: &Owner,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE owners
            SET first_name = ?, last_name = ?, email = ?, phone = ?, address = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&owner.first_name)
        .bind(&owner.last_name)
        .bind(&owner.email)
        .bind(&owner.phone)
        .bind(&owner.address)
        .bind(&owner.updated_at)
        .bind(&owner.id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Delete an owner inside an open transaction
    pub async fn delete_owner_tx(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        owner_id: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM owners WHERE id = ?
            "#,
        )
        .bind(owner_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}
