use chrono::Utc;
use log::{info, warn};

use crate::domain::errors::{ShelterError, ShelterResult};
use crate::storage::{AnimalRepository, DbConnection, OwnerRepository};
use shared::{
    normalize_optional_text, Animal, CreateOwnerRequest, Owner, OwnerListResponse, OwnerResponse,
    UpdateOwnerRequest,
};

/// Service for managing owners.
///
/// The `animal_ids` list on an owner is derived from the animals table on
/// every load; this service never writes it. Deleting an owner detaches
/// their animals rather than deleting them.
#[derive(Clone)]
pub struct OwnerService {
    db: DbConnection,
    owner_repository: OwnerRepository,
    animal_repository: AnimalRepository,
}

impl OwnerService {
    /// Create a new OwnerService
    pub fn new(db: DbConnection) -> Self {
        let owner_repository = OwnerRepository::new(db.clone());
        let animal_repository = AnimalRepository::new(db.clone());
        Self {
            db,
            owner_repository,
            animal_repository,
        }
    }

    /// Register a new owner
    pub async fn create_owner(&self, request: CreateOwnerRequest) -> ShelterResult<OwnerResponse> {
        info!(
            "Creating owner: {} {}",
            request.first_name, request.last_name
        );

        self.validate_name(&request.first_name, &request.last_name)?;

        let timestamp_rfc3339 = Utc::now().to_rfc3339();

        let owner = Owner {
            id: Owner::generate_id(),
            first_name: request.first_name.trim().to_string(),
            last_name: request.last_name.trim().to_string(),
            email: normalize_optional_text(request.email),
            phone: normalize_optional_text(request.phone),
            address: normalize_optional_text(request.address),
            animal_ids: Vec::new(),
            created_at: timestamp_rfc3339.clone(),
            updated_at: timestamp_rfc3339,
        };

        self.owner_repository.store_owner(&owner).await?;

        info!("Created owner: {} with ID: {}", owner.full_name(), owner.id);

        Ok(OwnerResponse {
            owner,
            success_message: "Owner created successfully".to_string(),
        })
    }

    /// Get an owner by ID, with the IDs of their animals loaded
    pub async fn get_owner(&self, owner_id: &str) -> ShelterResult<Option<Owner>> {
        info!("Getting owner: {}", owner_id);

        let owner = self.owner_repository.get_owner(owner_id).await?;

        if owner.is_none() {
            warn!("Owner not found: {}", owner_id);
        }

        Ok(owner)
    }

    /// List all owners ordered by last name, then first name
    pub async fn list_owners(&self) -> ShelterResult<OwnerListResponse> {
        info!("Listing all owners");

        let owners = self.owner_repository.list_owners().await?;

        info!("Found {} owners", owners.len());

        Ok(OwnerListResponse { owners })
    }

    /// Update an owner's contact details
    pub async fn update_owner(
        &self,
        owner_id: &str,
        request: UpdateOwnerRequest,
    ) -> ShelterResult<OwnerResponse> {
        info!("Updating owner: {}", owner_id);

        self.validate_update_request(&request)?;

        let mut tx = self.db.begin().await?;

        let mut owner = self
            .owner_repository
            .get_owner_tx(&mut tx, owner_id)
            .await?
            .ok_or_else(|| ShelterError::not_found("Owner", owner_id))?;

        if let Some(first_name) = request.first_name {
            owner.first_name = first_name.trim().to_string();
        }
        if let Some(last_name) = request.last_name {
            owner.last_name = last_name.trim().to_string();
        }
        if let Some(email) = request.email {
            owner.email = normalize_optional_text(Some(email));
        }
        if let Some(phone) = request.phone {
            owner.phone = normalize_optional_text(Some(phone));
        }
        if let Some(address) = request.address {
            owner.address = normalize_optional_text(Some(address));
        }

        owner.updated_at = Utc::now().to_rfc3339();

        self.owner_repository.update_owner_tx(&mut tx, &owner).await?;

        tx.commit().await.map_err(anyhow::Error::from)?;

        info!("Updated owner: {} with ID: {}", owner.full_name(), owner.id);

        let owner = self
            .owner_repository
            .get_owner(owner_id)
            .await?
            .ok_or_else(|| ShelterError::not_found("Owner", owner_id))?;

        Ok(OwnerResponse {
            owner,
            success_message: "Owner updated successfully".to_string(),
        })
    }

    /// Delete an owner; their animals stay in the shelter, detached
    pub async fn delete_owner(&self, owner_id: &str) -> ShelterResult<()> {
        info!("Deleting owner: {}", owner_id);

        let mut tx = self.db.begin().await?;

        let owner = self
            .owner_repository
            .get_owner_tx(&mut tx, owner_id)
            .await?
            .ok_or_else(|| ShelterError::not_found("Owner", owner_id))?;

        // Detach and delete inside one transaction so no animal can end up
        // pointing at an owner row that is gone
        self.animal_repository
            .clear_owner_references_tx(&mut tx, owner_id)
            .await?;
        self.owner_repository.delete_owner_tx(&mut tx, owner_id).await?;

        tx.commit().await.map_err(anyhow::Error::from)?;

        info!("Deleted owner: {} with ID: {}", owner.full_name(), owner.id);

        Ok(())
    }

    /// List the animals belonging to an owner, ordered by name
    pub async fn list_owner_animals(&self, owner_id: &str) -> ShelterResult<Vec<Animal>> {
        info!("Listing animals for owner: {}", owner_id);

        if self.owner_repository.get_owner(owner_id).await?.is_none() {
            warn!("Owner not found: {}", owner_id);
            return Err(ShelterError::not_found("Owner", owner_id));
        }

        let animals = self.animal_repository.list_by_owner(owner_id).await?;

        info!("Found {} animals for owner {}", animals.len(), owner_id);

        Ok(animals)
    }

    /// Validate owner names
    fn validate_name(&self, first_name: &str, last_name: &str) -> ShelterResult<()> {
        if first_name.trim().is_empty() {
            return Err(ShelterError::Validation(
                "Owner first name cannot be empty".to_string(),
            ));
        }
        if last_name.trim().is_empty() {
            return Err(ShelterError::Validation(
                "Owner last name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Validate update owner request
    fn validate_update_request(&self, request: &UpdateOwnerRequest) -> ShelterResult<()> {
        if let Some(ref first_name) = request.first_name {
            if first_name.trim().is_empty() {
                return Err(ShelterError::Validation(
                    "Owner first name cannot be empty".to_string(),
                ));
            }
        }
        if let Some(ref last_name) = request.last_name {
            if last_name.trim().is_empty() {
                return Err(ShelterError::Validation(
                    "Owner last name cannot be empty".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::animal_service::AnimalService;
    use shared::{CreateAnimalRequest, Gender};

    async fn setup_test() -> (OwnerService, AnimalService) {
        let db = DbConnection::init_test().await.expect("Failed to create test database");
        (OwnerService::new(db.clone()), AnimalService::new(db))
    }

    fn create_request(first_name: &str, last_name: &str) -> CreateOwnerRequest {
        CreateOwnerRequest {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            email: Some("marie@example.org".to_string()),
            phone: None,
            address: Some("12 Rue des Lilas".to_string()),
        }
    }

    fn animal_request(name: &str) -> CreateAnimalRequest {
        CreateAnimalRequest {
            name: name.to_string(),
            species: "Cat".to_string(),
            breed: None,
            birth_date: None,
            gender: Gender::Female,
            size: None,
        }
    }

    #[tokio::test]
    async fn test_create_owner() {
        let (service, _) = setup_test().await;

        let response = service
            .create_owner(create_request("Marie", "Dupont"))
            .await
            .expect("Failed to create owner");

        assert_eq!(response.owner.first_name, "Marie");
        assert_eq!(response.owner.last_name, "Dupont");
        assert_eq!(response.owner.full_name(), "Marie Dupont");
        assert_eq!(response.owner.email, Some("marie@example.org".to_string()));
        assert!(response.owner.phone.is_none());
        assert!(response.owner.animal_ids.is_empty());
        assert!(response.owner.id.starts_with("owner::"));
        assert_eq!(response.success_message, "Owner created successfully");
    }

    #[tokio::test]
    async fn test_create_owner_validation() {
        let (service, _) = setup_test().await;

        let result = service.create_owner(create_request("", "Dupont")).await;
        assert!(matches!(result, Err(ShelterError::Validation(_))));

        let result = service.create_owner(create_request("Marie", "   ")).await;
        assert!(matches!(result, Err(ShelterError::Validation(_))));
    }

    #[tokio::test]
    async fn test_list_owners_ordered_by_name() {
        let (service, _) = setup_test().await;

        service
            .create_owner(create_request("Marie", "Dupont"))
            .await
            .expect("Failed to create owner");
        service
            .create_owner(create_request("Ana", "Costa"))
            .await
            .expect("Failed to create owner");
        service
            .create_owner(create_request("Luc", "Costa"))
            .await
            .expect("Failed to create owner");

        let response = service.list_owners().await.expect("Failed to list owners");
        let names: Vec<String> = response.owners.iter().map(Owner::full_name).collect();
        assert_eq!(names, vec!["Ana Costa", "Luc Costa", "Marie Dupont"]);
    }

    #[tokio::test]
    async fn test_update_owner_partial() {
        let (service, _) = setup_test().await;

        let created = service
            .create_owner(create_request("Marie", "Dupont"))
            .await
            .expect("Failed to create owner");

        let request = UpdateOwnerRequest {
            first_name: None,
            last_name: Some("Martin".to_string()),
            email: Some("".to_string()), // clears
            phone: Some("0601020304".to_string()),
            address: None,
        };
        let response = service
            .update_owner(&created.owner.id, request)
            .await
            .expect("Failed to update owner");

        assert_eq!(response.owner.first_name, "Marie");
        assert_eq!(response.owner.last_name, "Martin");
        assert!(response.owner.email.is_none());
        assert_eq!(response.owner.phone, Some("0601020304".to_string()));
        assert_eq!(response.owner.address, Some("12 Rue des Lilas".to_string()));
        assert_eq!(response.success_message, "Owner updated successfully");
    }

    #[tokio::test]
    async fn test_update_nonexistent_owner() {
        let (service, _) = setup_test().await;

        let request = UpdateOwnerRequest {
            first_name: Some("Marie".to_string()),
            last_name: None,
            email: None,
            phone: None,
            address: None,
        };
        let result = service.update_owner("owner::nonexistent", request).await;
        assert!(matches!(
            result,
            Err(ShelterError::NotFound { entity: "Owner", .. })
        ));
    }

    #[tokio::test]
    async fn test_delete_owner_detaches_animals() {
        let (service, animal_service) = setup_test().await;

        let owner = service
            .create_owner(create_request("Marie", "Dupont"))
            .await
            .expect("Failed to create owner")
            .owner;
        let first = animal_service
            .create_animal(animal_request("Mia"))
            .await
            .expect("Failed to create animal")
            .animal;
        let second = animal_service
            .create_animal(animal_request("Felix"))
            .await
            .expect("Failed to create animal")
            .animal;
        animal_service
            .assign_owner(&first.id, &owner.id)
            .await
            .expect("Failed to assign owner");
        animal_service
            .assign_owner(&second.id, &owner.id)
            .await
            .expect("Failed to assign owner");

        service.delete_owner(&owner.id).await.expect("Failed to delete owner");

        assert!(service
            .get_owner(&owner.id)
            .await
            .expect("Failed to query owner")
            .is_none());

        // Both animals survive, detached
        for id in [&first.id, &second.id] {
            let animal = animal_service
                .get_animal(id)
                .await
                .expect("Failed to get animal")
                .expect("Animal should survive its owner");
            assert!(animal.owner_id.is_none());
        }
    }

    #[tokio::test]
    async fn test_delete_nonexistent_owner() {
        let (service, _) = setup_test().await;

        let result = service.delete_owner("owner::nonexistent").await;
        assert!(matches!(
            result,
            Err(ShelterError::NotFound { entity: "Owner", .. })
        ));
    }

    #[tokio::test]
    async fn test_list_owner_animals() {
        let (service, animal_service) = setup_test().await;

        let owner = service
            .create_owner(create_request("Marie", "Dupont"))
            .await
            .expect("Failed to create owner")
            .owner;
        let rex = animal_service
            .create_animal(animal_request("Rex"))
            .await
            .expect("Failed to create animal")
            .animal;
        let bella = animal_service
            .create_animal(animal_request("Bella"))
            .await
            .expect("Failed to create animal")
            .animal;
        animal_service
            .assign_owner(&rex.id, &owner.id)
            .await
            .expect("Failed to assign owner");
        animal_service
            .assign_owner(&bella.id, &owner.id)
            .await
            .expect("Failed to assign owner");

        let animals = service
            .list_owner_animals(&owner.id)
            .await
            .expect("Failed to list owner animals");
        let names: Vec<&str> = animals.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Bella", "Rex"]);

        // The derived ID list on the owner matches the same ordering
        let owner = service
            .get_owner(&owner.id)
            .await
            .expect("Failed to get owner")
            .expect("Owner should exist");
        assert_eq!(owner.animal_ids, vec![bella.id, rex.id]);
    }

    #[tokio::test]
    async fn test_list_owner_animals_missing_owner() {
        let (service, _) = setup_test().await;

        let result = service.list_owner_animals("owner::nonexistent").await;
        assert!(matches!(
            result,
            Err(ShelterError::NotFound { entity: "Owner", .. })
        ));
    }
}
