//! # Shelter MIS Backend
//!
//! Contains all non-UI logic for the shelter management system.
//!
//! This crate brings together:
//! - **Domain**: Business rules for animals, owners, boxes and treatments
//! - **Storage**: SQLite persistence behind a shared connection handle
//!
//! The backend is UI-agnostic: a desktop shell, a CLI or a test harness all
//! drive it the same way, by initializing an [`AppState`] over a database
//! URL and calling the services on it.
//!
//! ## Architecture
//!
//! ```text
//! Caller (UI shell, tests)
//!     ↓
//! Domain Layer (services, engines)
//!     ↓
//! Storage Layer (repositories, SQLite)
//! ```
//!
//! ## Key Responsibilities
//!
//! - Open and migrate the database at startup
//! - Hand every service the same connection so cross-entity operations
//!   share one transactional store
//! - Keep relationship invariants (occupancy, ownership) inside the
//!   services rather than in any UI

pub mod domain;
pub mod storage;

use anyhow::Result;
use log::info;

use crate::domain::{AnimalService, BoxService, HousingService, OwnerService, TreatmentService};
use crate::storage::DbConnection;

pub use domain::*;
pub use storage::*;

/// Main application state that holds all services
#[derive(Clone)]
pub struct AppState {
    pub animal_service: AnimalService,
    pub owner_service: OwnerService,
    pub box_service: BoxService,
    pub housing_service: HousingService,
    pub treatment_service: TreatmentService,
}

/// Initialize the backend with all required services over one store
pub async fn initialize_backend(database_url: &str) -> Result<AppState> {
    info!("Setting up database");
    let db_conn = DbConnection::new(database_url).await?;

    info!("Setting up domain model");
    let animal_service = AnimalService::new(db_conn.clone());
    let owner_service = OwnerService::new(db_conn.clone());
    let box_service = BoxService::new(db_conn.clone());
    let housing_service = HousingService::new(db_conn.clone());
    let treatment_service = TreatmentService::new(db_conn);

    info!("Setting up application state");
    let app_state = AppState {
        animal_service,
        owner_service,
        box_service,
        housing_service,
        treatment_service,
    };

    Ok(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Local};
    use shared::{
        AddTreatmentRequest, BoxStatus, CreateAnimalRequest, CreateBoxRequest, CreateOwnerRequest,
        Gender, TreatmentType, DATE_FORMAT,
    };

    fn test_database_url() -> String {
        format!(
            "file:memdb_{}?mode=memory&cache=shared",
            uuid::Uuid::new_v4()
        )
    }

    fn days_from_today(days: i64) -> String {
        (Local::now().date_naive() + Duration::days(days))
            .format(DATE_FORMAT)
            .to_string()
    }

    #[tokio::test]
    async fn test_initialize_backend_shares_one_store() {
        let url = test_database_url();
        let state = initialize_backend(&url).await.expect("Failed to initialize backend");

        let owner = state
            .owner_service
            .create_owner(CreateOwnerRequest {
                first_name: "Marie".to_string(),
                last_name: "Dupont".to_string(),
                email: None,
                phone: None,
                address: None,
            })
            .await
            .expect("Failed to create owner")
            .owner;
        let animal = state
            .animal_service
            .create_animal(CreateAnimalRequest {
                name: "Rex".to_string(),
                species: "Dog".to_string(),
                breed: None,
                birth_date: None,
                gender: Gender::Male,
                size: None,
            })
            .await
            .expect("Failed to create animal")
            .animal;

        // A write through one service is visible through another
        state
            .animal_service
            .assign_owner(&animal.id, &owner.id)
            .await
            .expect("Failed to assign owner");
        let animals = state
            .owner_service
            .list_owner_animals(&owner.id)
            .await
            .expect("Failed to list owner animals");
        assert_eq!(animals.len(), 1);
        assert_eq!(animals[0].name, "Rex");
    }

    #[tokio::test]
    async fn test_rex_moves_in_and_gets_his_shots() {
        let url = test_database_url();
        let state = initialize_backend(&url).await.expect("Failed to initialize backend");

        let rex = state
            .animal_service
            .create_animal(CreateAnimalRequest {
                name: "Rex".to_string(),
                species: "Dog".to_string(),
                breed: Some("German Shepherd".to_string()),
                birth_date: Some("2021-06-15".to_string()),
                gender: Gender::Male,
                size: Some("Large".to_string()),
            })
            .await
            .expect("Failed to create Rex")
            .animal;
        let b1 = state
            .box_service
            .create_box(CreateBoxRequest {
                name: "B1".to_string(),
                location: Some("Wing A".to_string()),
                size: "16m²".to_string(),
                status: None,
            })
            .await
            .expect("Failed to create B1")
            .shelter_box;

        // A large dog is offered the large box
        let suitable = state
            .housing_service
            .suitable_available_boxes(&rex.id)
            .await
            .expect("Failed to find suitable boxes");
        assert_eq!(suitable.len(), 1);
        assert_eq!(suitable[0].id, b1.id);

        state
            .housing_service
            .assign_box(&rex.id, &b1.id)
            .await
            .expect("Failed to house Rex");
        let b1 = state
            .box_service
            .get_box(&b1.id)
            .await
            .expect("Failed to get box")
            .expect("Box should exist");
        assert_eq!(b1.status, BoxStatus::Occupied);
        assert_eq!(b1.occupant_id, Some(rex.id.clone()));

        // An overdue rabies shot makes him non-compliant
        let shot = state
            .treatment_service
            .add_treatment(AddTreatmentRequest {
                animal_id: rex.id.clone(),
                treatment_type: TreatmentType::Vaccination,
                name: "Rabies".to_string(),
                description: None,
                next_due_date: Some(days_from_today(-5)),
            })
            .await
            .expect("Failed to add vaccination")
            .treatment;
        assert!(!state
            .treatment_service
            .is_vaccination_up_to_date(&rex.id)
            .await
            .expect("Failed to check vaccination status"));
        let overdue = state
            .treatment_service
            .overdue_animals()
            .await
            .expect("Failed to list overdue animals");
        assert_eq!(overdue.len(), 1);
        assert_eq!(overdue[0].id, rex.id);

        // Administering with a due date next year restores compliance
        state
            .treatment_service
            .administer_treatment(&shot.id, Some(&days_from_today(365)))
            .await
            .expect("Failed to administer vaccination");
        assert!(state
            .treatment_service
            .is_vaccination_up_to_date(&rex.id)
            .await
            .expect("Failed to check vaccination status"));
        assert!(state
            .treatment_service
            .overdue_animals()
            .await
            .expect("Failed to list overdue animals")
            .is_empty());

        // Moving out frees the box
        let released = state
            .housing_service
            .release_from_box(&rex.id)
            .await
            .expect("Failed to release Rex");
        assert!(released);
        let b1 = state
            .box_service
            .get_box(&b1.id)
            .await
            .expect("Failed to get box")
            .expect("Box should exist");
        assert_eq!(b1.status, BoxStatus::Available);
        assert!(b1.occupant_id.is_none());
    }

    #[tokio::test]
    async fn test_list_response_serializes_for_callers() {
        let url = test_database_url();
        let state = initialize_backend(&url).await.expect("Failed to initialize backend");

        state
            .animal_service
            .create_animal(CreateAnimalRequest {
                name: "Mia".to_string(),
                species: "Cat".to_string(),
                breed: None,
                birth_date: None,
                gender: Gender::Female,
                size: None,
            })
            .await
            .expect("Failed to create animal");

        let response = state
            .animal_service
            .list_animals()
            .await
            .expect("Failed to list animals");
        let json = serde_json::to_string(&response).expect("Failed to serialize response");
        assert!(json.contains("\"animals\""));
        assert!(json.contains("\"Mia\""));
        assert!(json.contains("\"Female\""));
    }
}
