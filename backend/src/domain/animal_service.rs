use chrono::Utc;
use log::{info, warn};

use crate::domain::errors::{ShelterError, ShelterResult};
use crate::storage::{
    AnimalRepository, BoxRepository, DbConnection, OwnerRepository, TreatmentRepository,
};
use shared::{
    normalize_optional_text, parse_date, Animal, AnimalListResponse, AnimalResponse, BoxStatus,
    CreateAnimalRequest, UpdateAnimalRequest, DATE_FORMAT,
};

/// Service for managing animal records.
///
/// Descriptive fields are updated here; the owner reference changes only
/// through `assign_owner` and the box reference only through the housing
/// service, so the relationship invariants stay with their engines.
#[derive(Clone)]
pub struct AnimalService {
    db: DbConnection,
    animal_repository: AnimalRepository,
    owner_repository: OwnerRepository,
    box_repository: BoxRepository,
    treatment_repository: TreatmentRepository,
}

impl AnimalService {
    /// Create a new AnimalService
    pub fn new(db: DbConnection) -> Self {
        let animal_repository = AnimalRepository::new(db.clone());
        let owner_repository = OwnerRepository::new(db.clone());
        let box_repository = BoxRepository::new(db.clone());
        let treatment_repository = TreatmentRepository::new(db.clone());
        Self {
            db,
            animal_repository,
            owner_repository,
            box_repository,
            treatment_repository,
        }
    }

    /// Register a new animal; it starts without an owner or a box
    pub async fn create_animal(&self, request: CreateAnimalRequest) -> ShelterResult<AnimalResponse> {
        info!(
            "Creating animal: name={}, species={}",
            request.name, request.species
        );

        self.validate_create_request(&request)?;

        let birth_date =
            self.normalize_optional_date("Birth date", request.birth_date.as_deref())?;

        let timestamp_rfc3339 = Utc::now().to_rfc3339();

        let animal = Animal {
            id: Animal::generate_id(),
            name: request.name.trim().to_string(),
            species: request.species.trim().to_string(),
            breed: normalize_optional_text(request.breed),
            birth_date,
            gender: request.gender,
            size: normalize_optional_text(request.size),
            owner_id: None,
            box_id: None,
            treatments: Vec::new(),
            created_at: timestamp_rfc3339.clone(),
            updated_at: timestamp_rfc3339,
        };

        self.animal_repository.store_animal(&animal).await?;

        info!("Created animal: {} with ID: {}", animal.name, animal.id);

        Ok(AnimalResponse {
            animal,
            success_message: "Animal created successfully".to_string(),
        })
    }

    /// Get an animal by ID, with its treatments loaded
    pub async fn get_animal(&self, animal_id: &str) -> ShelterResult<Option<Animal>> {
        info!("Getting animal: {}", animal_id);

        let animal = self.animal_repository.get_animal(animal_id).await?;

        if animal.is_none() {
            warn!("Animal not found: {}", animal_id);
        }

        Ok(animal)
    }

    /// List all animals ordered by name
    pub async fn list_animals(&self) -> ShelterResult<AnimalListResponse> {
        info!("Listing all animals");

        let animals = self.animal_repository.list_animals().await?;

        info!("Found {} animals", animals.len());

        Ok(AnimalListResponse { animals })
    }

    /// Update an animal's descriptive fields
    pub async fn update_animal(
        &self,
        animal_id: &str,
        request: UpdateAnimalRequest,
    ) -> ShelterResult<AnimalResponse> {
        info!("Updating animal: {}", animal_id);

        self.validate_update_request(&request)?;

        let mut tx = self.db.begin().await?;

        let mut animal = self
            .animal_repository
            .get_animal_tx(&mut tx, animal_id)
            .await?
            .ok_or_else(|| ShelterError::not_found("Animal", animal_id))?;

        if let Some(name) = request.name {
            animal.name = name.trim().to_string();
        }
        if let Some(species) = request.species {
            animal.species = species.trim().to_string();
        }
        if let Some(breed) = request.breed {
            animal.breed = normalize_optional_text(Some(breed));
        }
        if let Some(birth_date) = request.birth_date {
            animal.birth_date = self.normalize_optional_date("Birth date", Some(&birth_date))?;
        }
        if let Some(gender) = request.gender {
            animal.gender = gender;
        }
        if let Some(size) = request.size {
            animal.size = normalize_optional_text(Some(size));
        }

        animal.updated_at = Utc::now().to_rfc3339();

        self.animal_repository.update_animal_tx(&mut tx, &animal).await?;

        tx.commit().await.map_err(anyhow::Error::from)?;

        info!("Updated animal: {} with ID: {}", animal.name, animal.id);

        let animal = self
            .animal_repository
            .get_animal(animal_id)
            .await?
            .ok_or_else(|| ShelterError::not_found("Animal", animal_id))?;

        Ok(AnimalResponse {
            animal,
            success_message: "Animal updated successfully".to_string(),
        })
    }

    /// Delete an animal, releasing its box and dropping its treatment plan
    /// in the same transaction
    pub async fn delete_animal(&self, animal_id: &str) -> ShelterResult<()> {
        info!("Deleting animal: {}", animal_id);

        let mut tx = self.db.begin().await?;

        let animal = self
            .animal_repository
            .get_animal_tx(&mut tx, animal_id)
            .await?
            .ok_or_else(|| ShelterError::not_found("Animal", animal_id))?;

        if let Some(box_id) = animal.box_id.as_deref() {
            self.box_repository
                .set_status_tx(&mut tx, box_id, BoxStatus::Available)
                .await?;
        }
        self.treatment_repository
            .delete_for_animal_tx(&mut tx, animal_id)
            .await?;
        self.animal_repository
            .delete_animal_tx(&mut tx, animal_id)
            .await?;

        tx.commit().await.map_err(anyhow::Error::from)?;

        info!("Deleted animal: {} with ID: {}", animal.name, animal.id);

        Ok(())
    }

    /// Record which owner an animal belongs to; both must exist
    pub async fn assign_owner(&self, animal_id: &str, owner_id: &str) -> ShelterResult<Animal> {
        info!("Assigning owner {} to animal {}", owner_id, animal_id);

        let mut tx = self.db.begin().await?;

        if self
            .animal_repository
            .get_animal_tx(&mut tx, animal_id)
            .await?
            .is_none()
        {
            warn!("Animal not found: {}", animal_id);
            return Err(ShelterError::not_found("Animal", animal_id));
        }
        if !self.owner_repository.owner_exists_tx(&mut tx, owner_id).await? {
            warn!("Owner not found: {}", owner_id);
            return Err(ShelterError::not_found("Owner", owner_id));
        }

        self.animal_repository
            .set_owner_tx(&mut tx, animal_id, Some(owner_id))
            .await?;

        tx.commit().await.map_err(anyhow::Error::from)?;

        info!("Assigned owner {} to animal {}", owner_id, animal_id);

        let animal = self
            .animal_repository
            .get_animal(animal_id)
            .await?
            .ok_or_else(|| ShelterError::not_found("Animal", animal_id))?;
        Ok(animal)
    }

    /// Validate create animal request
    fn validate_create_request(&self, request: &CreateAnimalRequest) -> ShelterResult<()> {
        if request.name.trim().is_empty() {
            return Err(ShelterError::Validation(
                "Animal name cannot be empty".to_string(),
            ));
        }
        if request.species.trim().is_empty() {
            return Err(ShelterError::Validation(
                "Animal species cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Validate update animal request
    fn validate_update_request(&self, request: &UpdateAnimalRequest) -> ShelterResult<()> {
        if let Some(ref name) = request.name {
            if name.trim().is_empty() {
                return Err(ShelterError::Validation(
                    "Animal name cannot be empty".to_string(),
                ));
            }
        }
        if let Some(ref species) = request.species {
            if species.trim().is_empty() {
                return Err(ShelterError::Validation(
                    "Animal species cannot be empty".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Empty dates are fine (they clear the field); present ones must parse
    /// and are stored re-formatted, so the TEXT column is always zero-padded
    /// and text order matches date order
    fn normalize_optional_date(
        &self,
        field: &str,
        value: Option<&str>,
    ) -> ShelterResult<Option<String>> {
        let trimmed = match value {
            Some(value) => value.trim(),
            None => return Ok(None),
        };
        if trimmed.is_empty() {
            return Ok(None);
        }
        match parse_date(trimmed) {
            Some(date) => Ok(Some(date.format(DATE_FORMAT).to_string())),
            None => Err(ShelterError::Validation(format!(
                "{} must be a valid date in YYYY-MM-DD format",
                field
            ))),
        }
    }
}
