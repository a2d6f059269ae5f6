use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, Transaction};

use crate::storage::connection::DbConnection;
use crate::storage::repositories::treatment_repository::treatment_from_row;
use shared::{Animal, Gender, Treatment};

/// Repository for animal records.
///
/// Loads outside a transaction come back hydrated: the animal carries its
/// treatment collection. Transaction-scoped reads skip hydration, the
/// engines only need the relationship columns there.
#[derive(Clone)]
pub struct AnimalRepository {
    db: DbConnection,
}

impl AnimalRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    fn animal_from_row(row: &SqliteRow) -> Animal {
        Animal {
            id: row.get("id"),
            name: row.get("name"),
            species: row.get("species"),
            breed: row.get("breed"),
            birth_date: row.get("birth_date"),
            gender: Gender::parse(&row.get::<String, _>("gender")),
            size: row.get("size"),
            owner_id: row.get("owner_id"),
            box_id: row.get("box_id"),
            treatments: Vec::new(),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }

    async fn load_treatments(&self, animal_id: &str) -> Result<Vec<Treatment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, animal_id, type, name, description, administration_date, next_due_date, administered, created_at, updated_at
            FROM treatments
            WHERE animal_id = ?
            ORDER BY ROWID ASC
            "#,
        )
        .bind(animal_id)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(treatment_from_row).collect())
    }

    /// Store an animal in the database
    pub async fn store_animal(&self, animal: &Animal) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO animals (id, name, species, breed, birth_date, gender, size, owner_id, box_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&animal.id)
        .bind(&animal.name)
        .bind(&animal.species)
        .bind(&animal.breed)
        .bind(&animal.birth_date)
        .bind(animal.gender.as_str())
        .bind(&animal.size)
        .bind(&animal.owner_id)
        .bind(&animal.box_id)
        .bind(&animal.created_at)
        .bind(&animal.updated_at)
        .execute(self.db.pool())
        .await?;
        Ok(())
    }

    /// Get an animal by ID, with its treatments loaded
    pub async fn get_animal(&self, animal_id: &str) -> Result<Option<Animal>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, species, breed, birth_date, gender, size, owner_id, box_id, created_at, updated_at
            FROM animals
            WHERE id = ?
            "#,
        )
        .bind(animal_id)
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            Some(r) => {
                let mut animal = Self::animal_from_row(&r);
                animal.treatments = self.load_treatments(animal_id).await?;
                Ok(Some(animal))
            }
            None => Ok(None),
        }
    }

    /// Get an animal by ID inside an open transaction (treatments not loaded)
    pub async fn get_animal_tx(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        animal_id: &str,
    ) -> Result<Option<Animal>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, species, breed, birth_date, gender, size, owner_id, box_id, created_at, updated_at
            FROM animals
            WHERE id = ?
            "#,
        )
        .bind(animal_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(row.map(|r| Self::animal_from_row(&r)))
    }

    /// List all animals ordered by name, with treatments loaded
    pub async fn list_animals(&self) -> Result<Vec<Animal>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, species, breed, birth_date, gender, size, owner_id, box_id, created_at, updated_at
            FROM animals
            ORDER BY name ASC
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;

        let mut animals = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut animal = Self::animal_from_row(row);
            animal.treatments = self.load_treatments(&animal.id).await?;
            animals.push(animal);
        }

        Ok(animals)
    }

    /// List an owner's animals ordered by name, with treatments loaded
    pub async fn list_by_owner(&self, owner_id: &str) -> Result<Vec<Animal>> {
        let rows = sqlx::query(
            r#"
            SELECT id, name, species, breed, birth_date, gender, size, owner_id, box_id, created_at, updated_at
            FROM animals
            WHERE owner_id = ?
            ORDER BY name ASC
            "#,
        )
        .bind(owner_id)
        .fetch_all(self.db.pool())
        .await?;

        let mut animals = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut animal = Self::animal_from_row(row);
            animal.treatments = self.load_treatments(&animal.id).await?;
            animals.push(animal);
        }

        Ok(animals)
    }

    /// Update an animal's descriptive fields inside an open transaction.
    ///
    /// The relationship columns (owner_id, box_id) are deliberately not
    /// written here; they change only through the dedicated setters below.
    pub async fn update_animal_tx(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        animal: &Animal,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE animals
            SET name = ?, species = ?, breed = ?, birth_date = ?, gender = ?, size = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&animal.name)
        .bind(&animal.species)
        .bind(&animal.breed)
        .bind(&animal.birth_date)
        .bind(animal.gender.as_str())
        .bind(&animal.size)
        .bind(&animal.updated_at)
        .bind(&animal.id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Point an animal at an owner, or clear the reference with None
    pub async fn set_owner_tx(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        animal_id: &str,
        owner_id: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE animals SET owner_id = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?
            "#,
        )
        .bind(owner_id)
        .bind(animal_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Point an animal at a box, or clear the reference with None
    pub async fn set_box_tx(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        animal_id: &str,
        box_id: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE animals SET box_id = ?, updated_at = CURRENT_TIMESTAMP WHERE id = ?
            "#,
        )
        .bind(box_id)
        .bind(animal_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Clear the owner reference on every animal the owner holds
    pub async fn clear_owner_references_tx(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        owner_id: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE animals SET owner_id = NULL, updated_at = CURRENT_TIMESTAMP WHERE owner_id = ?
            "#,
        )
        .bind(owner_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Delete an animal inside an open transaction
    pub async fn delete_animal_tx(
        &self,
        tx: &mut Transaction<'static, Sqlite>,
        animal_id: &str,
    ) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM animals WHERE id = ?
            "#,
        )
        .bind(animal_id)
        .execute(&mut **tx)
        .await?;
        Ok(())
    }

    /// Animals with at least one treatment due strictly before `today`
    /// (ISO dates compare correctly as text), ordered by name, hydrated so
    /// callers can show which treatments are behind
    pub async fn get_animals_with_overdue_treatments(&self, today: &str) -> Result<Vec<Animal>> {
        let rows = sqlx::query(
            r#"
            SELECT DISTINCT a.id, a.name, a.species, a.breed, a.birth_date, a.gender, a.size, a.owner_id, a.box_id, a.created_at, a.updated_at
            FROM animals a
            JOIN treatments t ON t.animal_id = a.id
            WHERE t.next_due_date IS NOT NULL AND t.next_due_date < ?
            ORDER BY a.name ASC
            "#,
        )
        .bind(today)
        .fetch_all(self.db.pool())
        .await?;

        let mut animals = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut animal = Self::animal_from_row(row);
            animal.treatments = self.load_treatments(&animal.id).await?;
            animals.push(animal);
        }

        Ok(animals)
    }
}
