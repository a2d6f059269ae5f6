use log::{info, warn};

use crate::domain::errors::{ShelterError, ShelterResult};
use crate::storage::{AnimalRepository, BoxRepository, DbConnection};
use shared::{Animal, BoxStatus, ShelterBox};

/// Service for housing animals in boxes.
///
/// The animal's `box_id` is the authoritative side of the relationship; a
/// box's occupant is derived from it on load. Assignments and releases run
/// in one transaction, so a move between boxes either completes or leaves
/// both boxes as they were.
#[derive(Clone)]
pub struct HousingService {
    db: DbConnection,
    animal_repository: AnimalRepository,
    box_repository: BoxRepository,
}

impl HousingService {
    /// Create a new HousingService
    pub fn new(db: DbConnection) -> Self {
        let animal_repository = AnimalRepository::new(db.clone());
        let box_repository = BoxRepository::new(db.clone());
        Self {
            db,
            animal_repository,
            box_repository,
        }
    }

    /// Move an animal into a box, releasing its previous box if it had one
    pub async fn assign_box(&self, animal_id: &str, box_id: &str) -> ShelterResult<Animal> {
        info!("Assigning animal {} to box {}", animal_id, box_id);

        let mut tx = self.db.begin().await?;

        let animal = self
            .animal_repository
            .get_animal_tx(&mut tx, animal_id)
            .await?
            .ok_or_else(|| ShelterError::not_found("Animal", animal_id))?;
        let target = self
            .box_repository
            .get_box_tx(&mut tx, box_id)
            .await?
            .ok_or_else(|| ShelterError::not_found("Box", box_id))?;

        if !target.is_available() {
            warn!(
                "Box {} is not available (status: {})",
                target.name,
                target.status.as_str()
            );
            return Err(ShelterError::InvalidState(format!(
                "Box {} is not available for assignment (status: {})",
                target.name,
                target.status.as_str()
            )));
        }

        // The previous box is released in the same transaction, so a failure
        // between the two steps rolls the whole move back
        if let Some(previous_box_id) = animal.box_id.as_deref() {
            self.box_repository
                .set_status_tx(&mut tx, previous_box_id, BoxStatus::Available)
                .await?;
        }

        self.box_repository
            .set_status_tx(&mut tx, box_id, BoxStatus::Occupied)
            .await?;
        self.animal_repository
            .set_box_tx(&mut tx, animal_id, Some(box_id))
            .await?;

        tx.commit().await.map_err(anyhow::Error::from)?;

        info!("Assigned animal {} to box {}", animal.name, target.name);

        let animal = self
            .animal_repository
            .get_animal(animal_id)
            .await?
            .ok_or_else(|| ShelterError::not_found("Animal", animal_id))?;
        Ok(animal)
    }

    /// Take an animal out of its box; returns false if it had none
    pub async fn release_from_box(&self, animal_id: &str) -> ShelterResult<bool> {
        info!("Releasing animal {} from its box", animal_id);

        let mut tx = self.db.begin().await?;

        let animal = self
            .animal_repository
            .get_animal_tx(&mut tx, animal_id)
            .await?
            .ok_or_else(|| ShelterError::not_found("Animal", animal_id))?;

        let box_id = match animal.box_id.as_deref() {
            Some(box_id) => box_id,
            None => {
                info!("Animal {} is not housed in any box", animal.name);
                return Ok(false);
            }
        };

        self.box_repository
            .set_status_tx(&mut tx, box_id, BoxStatus::Available)
            .await?;
        self.animal_repository
            .set_box_tx(&mut tx, animal_id, None)
            .await?;

        tx.commit().await.map_err(anyhow::Error::from)?;

        info!("Released animal {} from box {}", animal.name, box_id);

        Ok(true)
    }

    /// List the available boxes an animal could move into.
    ///
    /// Animals with a recognized size only get boxes of the matching tier.
    /// Size unset or unrecognized: every available box is offered.
    pub async fn suitable_available_boxes(&self, animal_id: &str) -> ShelterResult<Vec<ShelterBox>> {
        info!("Finding suitable boxes for animal {}", animal_id);

        let animal = self
            .animal_repository
            .get_animal(animal_id)
            .await?
            .ok_or_else(|| ShelterError::not_found("Animal", animal_id))?;

        let available = self.box_repository.get_available_boxes().await?;

        let suitable = match animal.required_box_size() {
            Some(tier) => available
                .into_iter()
                .filter(|b| b.size.as_deref() == Some(tier.label()))
                .collect(),
            None => available,
        };

        info!(
            "Found {} suitable boxes for animal {}",
            suitable.len(),
            animal.name
        );

        Ok(suitable)
    }
}
