use chrono::Utc;
use log::{info, warn};

use crate::domain::errors::{ShelterError, ShelterResult};
use crate::storage::{BoxRepository, DbConnection};
use shared::{
    normalize_optional_text, BoxListResponse, BoxResponse, BoxStatus, CreateBoxRequest, ShelterBox,
    UpdateBoxRequest,
};

/// Service for managing shelter boxes.
///
/// OCCUPIED is reserved for the housing engine: callers can flip a box
/// between AVAILABLE, MAINTENANCE and CLEANING here, but moving into or out
/// of OCCUPIED only happens by assigning or releasing an animal.
#[derive(Clone)]
pub struct BoxService {
    db: DbConnection,
    box_repository: BoxRepository,
}

impl BoxService {
    /// Create a new BoxService
    pub fn new(db: DbConnection) -> Self {
        let box_repository = BoxRepository::new(db.clone());
        Self { db, box_repository }
    }

    /// Register a new box; it starts AVAILABLE unless told otherwise
    pub async fn create_box(&self, request: CreateBoxRequest) -> ShelterResult<BoxResponse> {
        info!("Creating box: name={}, size={}", request.name, request.size);

        self.validate_name_and_size(&request.name, Some(&request.size))?;

        let status = request.status.unwrap_or(BoxStatus::Available);
        if status == BoxStatus::Occupied {
            return Err(ShelterError::Validation(
                "A box cannot be created as occupied".to_string(),
            ));
        }

        let timestamp_rfc3339 = Utc::now().to_rfc3339();

        let shelter_box = ShelterBox {
            id: ShelterBox::generate_id(),
            name: request.name.trim().to_string(),
            location: normalize_optional_text(request.location),
            size: Some(request.size.trim().to_string()),
            status,
            occupant_id: None,
            created_at: timestamp_rfc3339.clone(),
            updated_at: timestamp_rfc3339,
        };

        self.box_repository.store_box(&shelter_box).await?;

        info!("Created box: {} with ID: {}", shelter_box.name, shelter_box.id);

        Ok(BoxResponse {
            shelter_box,
            success_message: "Box created successfully".to_string(),
        })
    }

    /// Get a box by ID, with its occupant derived from the animals table
    pub async fn get_box(&self, box_id: &str) -> ShelterResult<Option<ShelterBox>> {
        info!("Getting box: {}", box_id);

        let shelter_box = self.box_repository.get_box(box_id).await?;

        if shelter_box.is_none() {
            warn!("Box not found: {}", box_id);
        }

        Ok(shelter_box)
    }

    /// List all boxes ordered by name
    pub async fn list_boxes(&self) -> ShelterResult<BoxListResponse> {
        info!("Listing all boxes");

        let boxes = self.box_repository.list_boxes().await?;

        info!("Found {} boxes", boxes.len());

        Ok(BoxListResponse { boxes })
    }

    /// Update a box's details and non-occupancy status
    pub async fn update_box(
        &self,
        box_id: &str,
        request: UpdateBoxRequest,
    ) -> ShelterResult<BoxResponse> {
        info!("Updating box: {}", box_id);

        self.validate_update_request(&request)?;

        let mut tx = self.db.begin().await?;

        let mut shelter_box = self
            .box_repository
            .get_box_tx(&mut tx, box_id)
            .await?
            .ok_or_else(|| ShelterError::not_found("Box", box_id))?;

        if let Some(new_status) = request.status {
            if new_status != shelter_box.status {
                if shelter_box.status == BoxStatus::Occupied {
                    warn!(
                        "Rejecting status change for occupied box {}",
                        shelter_box.name
                    );
                    return Err(ShelterError::InvalidState(format!(
                        "Box {} is occupied; release its occupant before changing status",
                        shelter_box.name
                    )));
                }
                if new_status == BoxStatus::Occupied {
                    return Err(ShelterError::InvalidState(format!(
                        "Box {} cannot be marked occupied directly; assign an animal instead",
                        shelter_box.name
                    )));
                }
                shelter_box.status = new_status;
            }
        }

        if let Some(name) = request.name {
            shelter_box.name = name.trim().to_string();
        }
        if let Some(location) = request.location {
            shelter_box.location = normalize_optional_text(Some(location));
        }
        if let Some(size) = request.size {
            shelter_box.size = Some(size.trim().to_string());
        }

        shelter_box.updated_at = Utc::now().to_rfc3339();

        self.box_repository.update_box_tx(&mut tx, &shelter_box).await?;

        tx.commit().await.map_err(anyhow::Error::from)?;

        info!("Updated box: {} with ID: {}", shelter_box.name, shelter_box.id);

        let shelter_box = self
            .box_repository
            .get_box(box_id)
            .await?
            .ok_or_else(|| ShelterError::not_found("Box", box_id))?;

        Ok(BoxResponse {
            shelter_box,
            success_message: "Box updated successfully".to_string(),
        })
    }

    /// Delete a box; occupied boxes must be released first
    pub async fn delete_box(&self, box_id: &str) -> ShelterResult<()> {
        info!("Deleting box: {}", box_id);

        let mut tx = self.db.begin().await?;

        let shelter_box = self
            .box_repository
            .get_box_tx(&mut tx, box_id)
            .await?
            .ok_or_else(|| ShelterError::not_found("Box", box_id))?;

        if shelter_box.status == BoxStatus::Occupied {
            warn!("Rejecting deletion of occupied box {}", shelter_box.name);
            return Err(ShelterError::InvalidState(format!(
                "Box {} cannot be deleted while occupied",
                shelter_box.name
            )));
        }

        self.box_repository.delete_box_tx(&mut tx, box_id).await?;

        tx.commit().await.map_err(anyhow::Error::from)?;

        info!("Deleted box: {} with ID: {}", shelter_box.name, shelter_box.id);

        Ok(())
    }

    /// Validate box name and size values
    fn validate_name_and_size(&self, name: &str, size: Option<&str>) -> ShelterResult<()> {
        if name.trim().is_empty() {
            return Err(ShelterError::Validation(
                "Box name cannot be empty".to_string(),
            ));
        }
        if let Some(size) = size {
            if size.trim().is_empty() {
                return Err(ShelterError::Validation(
                    "Box size cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Validate update box request
    fn validate_update_request(&self, request: &UpdateBoxRequest) -> ShelterResult<()> {
        if let Some(ref name) = request.name {
            if name.trim().is_empty() {
                return Err(ShelterError::Validation(
                    "Box name cannot be empty".to_string(),
                ));
            }
        }
        if let Some(ref size) = request.size {
            if size.trim().is_empty() {
                return Err(ShelterError::Validation(
                    "Box size cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}
