use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};

use crate::storage::connection::DbConnection;
use shared::{BoxStatus, ShelterBox};

/// Repository for box records.
///
/// The occupant is not a stored column: it is derived on load from the
/// animals table, which holds the authoritative box reference.
#[derive(Clone)]
pub struct BoxRepository {
    db: DbConnection,
}

impl BoxRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    fn box_from_row(row: &SqliteRow) -> Result<ShelterBox> {
        let status_raw: String = row.get("status");
        let status = BoxStatus::parse(&status_raw)
            .ok_or_else(|| anyhow::anyhow!("Unknown box status in store: {}", status_raw))?;

        Ok(ShelterBox {
            id: row.get("id"),
            name: row.get("name"),
            location: row.get("location"),
            size: row.get("size"),
            status,
            occupant_id: row.get("occupant_id"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    /// Store a box in the database
    pub async fn store_box(&self, shelter_box: &ShelterBox) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO boxes (id, name, location, size, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&shelter_box.id)
        .bind(&shelter_box.name)
        .bind(&shelter_box.location)
        .bind(&shelter_box.size)
        .bind(shelter_box.status.as_str())
        .bind(&shelter_box.created_at)
        .bind(&shelter_box.updated_at)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    /// Get a box by ID, with its occupant derived
    pub async fn get_box(&self, box_id: &str) -> Result<Option<ShelterBox>> {
        let row = sqlx::query(
            r#"
            SELECT b.id, b.name, b.location, b.size, b.status, b.created_at, b.updated_at, a.id AS occupant_id
            FROM boxes b
            LEFT JOIN animals a ON a.box_id = b.id
            WHERE b.id = ?
            "#,
        )
        .bind(box_id)
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            Some(r) => Ok(Some(Self::box_from_row(&r)?)),
            None => Ok(None),
        }
    }

    /// Get a box by ID inside an open transaction, with its occupant derived
    pub async fn get_box_tx(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        box_id: &str,
    ) -> Result<Option<ShelterBox>> {
        let row = sqlx::query(
            r#"
            SELECT b.id, b.name, b.location, b.size, b.status, b.created_at, b.updated_at, a.id AS occupant_id
            FROM boxes b
            LEFT JOIN animals a ON a.box_id = b.id
            WHERE b.id = ?
            "#,
        )
        .bind(box_id)
        .fetch_optional(&mut **tx)
        .await?;

        match row {
            Some(r) => Ok(Some(Self::box_from_row(&r)?)),
            None => Ok(None),
        }
    }

    /// List all boxes ordered by name
    pub async fn list_boxes(&self) -> Result<Vec<ShelterBox>> {
        let rows = sqlx::query(
            r#"
            SELECT b.id, b.name, b.location, b.size, b.status, b.created_at, b.updated_at, a.id AS occupant_id
            FROM boxes b
            LEFT JOIN animals a ON a.box_id = b.id
            ORDER BY b.name ASC
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(Self::box_from_row).collect()
    }

    /// List AVAILABLE boxes in the store's natural order (no sort applied)
    pub async fn get_available_boxes(&self) -> Result<Vec<ShelterBox>> {
        let rows = sqlx::query(
            r#"
            SELECT b.id, b.name, b.location, b.size, b.status, b.created_at, b.updated_at, a.id AS occupant_id
            FROM boxes b
            LEFT JOIN animals a ON a.box_id = b.id
            WHERE b.status = ?
            "#,
        )
        .bind(BoxStatus::Available.as_str())
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(Self::box_from_row).collect()
    }

    /// Update a box's fields inside an open transaction
    pub async fn update_box_tx(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        shelter_box: &ShelterBox,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE boxes
            SET name = ?, location = ?, size = ?, status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&shelter_box.name)
        .bind(&shelter_box.location)
        .bind(&shelter_box.size)
        .bind(shelter_box.status.as_str())
        .bind(&shelter_box.updated_at)
        .bind(&shelter_box.id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Set a box's status inside an open transaction; the housing engine
    /// pairs this with the animal's box reference
    pub async fn set_status_tx(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        box_id: &str,
        status: BoxStatus,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE boxes SET status = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(box_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Delete a box inside an open transaction
    pub async fn delete_box_tx(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        box_id: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM boxes WHERE id = ?
            "#,
        )
        .bind(box_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}
