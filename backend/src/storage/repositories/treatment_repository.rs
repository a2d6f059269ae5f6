use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};

use crate::storage::connection::DbConnection;
use shared::{Treatment, TreatmentType};

/// Map a treatments row to the model; shared with the animal repository,
/// which hydrates treatment collections on load
pub(crate) fn treatment_from_row(row: &SqliteRow) -> Treatment {
    Treatment {
        id: row.get("id"),
        animal_id: row.get("animal_id"),
        treatment_type: TreatmentType::parse(&row.get::<String, _>("type")),
        name: row.get("name"),
        description: row.get("description"),
        administration_date: row.get("administration_date"),
        next_due_date: row.get("next_due_date"),
        administered: row.get("administered"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// Repository for treatment records
#[derive(Clone)]
pub struct TreatmentRepository {
    db: DbConnection,
}

impl TreatmentRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    /// Store a treatment inside an open transaction
    pub async fn store_treatment_tx(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        treatment: &Treatment,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO treatments (id, animal_id, type, name, description, administration_date, next_due_date, administered, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&treatment.id)
        .bind(&treatment.animal_id)
        .bind(treatment.treatment_type.as_str())
        .bind(&treatment.name)
        .bind(&treatment.description)
        .bind(&treatment.administration_date)
        .bind(&treatment.next_due_date)
        .bind(treatment.administered)
        .bind(&treatment.created_at)
        .bind(&treatment.updated_at)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Get a treatment by ID
    pub async fn get_treatment(&self, treatment_id: &str) -> Result<Option<Treatment>> {
        let row = sqlx::query(
            r#"
            SELECT id, animal_id, type, name, description, administration_date, next_due_date, administered, created_at, updated_at
            FROM treatments
            WHERE id = ?
            "#,
        )
        .bind(treatment_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|r| treatment_from_row(&r)))
    }

    /// Get a treatment by ID inside an open transaction
    pub async fn get_treatment_tx(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        treatment_id: &str,
    ) -> Result<Option<Treatment>> {
        let row = sqlx::query(
            r#"
            SELECT id, animal_id, type, name, description, administration_date, next_due_date, administered, created_at, updated_at
            FROM treatments
            WHERE id = ?
            "#,
        )
        .bind(treatment_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row.map(|r| treatment_from_row(&r)))
    }

    /// Write the administer outcome: flag, administration date, next due date
    pub async fn update_treatment_tx(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        treatment: &Treatment,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE treatments
            SET administered = ?, administration_date = ?, next_due_date = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(treatment.administered)
        .bind(&treatment.administration_date)
        .bind(&treatment.next_due_date)
        .bind(&treatment.updated_at)
        .bind(&treatment.id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Delete every treatment belonging to an animal inside an open transaction
    pub async fn delete_for_animal_tx(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        animal_id: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM treatments WHERE animal_id = ?
            "#,
        )
        .bind(animal_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }
}
