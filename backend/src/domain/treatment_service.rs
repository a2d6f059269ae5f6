use chrono::{Local, Utc};
use log::{info, warn};

use crate::domain::errors::{ShelterError, ShelterResult};
use crate::storage::{AnimalRepository, DbConnection, TreatmentRepository};
use shared::{
    normalize_optional_text, parse_date, AddTreatmentRequest, Animal, ComplianceStatus, Treatment,
    TreatmentResponse, DATE_FORMAT,
};

/// Service for treatment plans and medical compliance.
///
/// A treatment starts unadministered. Administering it stamps today's date,
/// sets the flag and moves the due date forward (or clears it). Compliance
/// is judged on the due date alone: a treatment with no parseable due date
/// never counts against the animal.
#[derive(Clone)]
pub struct TreatmentService {
    db: DbConnection,
    animal_repository: AnimalRepository,
    treatment_repository: TreatmentRepository,
}

impl TreatmentService {
    /// Create a new TreatmentService
    pub fn new(db: DbConnection) -> Self {
        let animal_repository = AnimalRepository::new(db.clone());
        let treatment_repository = TreatmentRepository::new(db.clone());
        Self {
            db,
            animal_repository,
            treatment_repository,
        }
    }

    /// Add a treatment to an animal's plan
    pub async fn add_treatment(&self, request: AddTreatmentRequest) -> ShelterResult<TreatmentResponse> {
        info!(
            "Adding {} treatment for animal {}",
            request.treatment_type.as_str(),
            request.animal_id
        );

        self.validate_add_request(&request)?;

        let next_due_date =
            self.normalize_optional_date("Next due date", request.next_due_date.as_deref())?;

        let timestamp_rfc3339 = Utc::now().to_rfc3339();

        let treatment = Treatment {
            id: Treatment::generate_id(),
            animal_id: request.animal_id.clone(),
            treatment_type: request.treatment_type,
            name: request.name.trim().to_string(),
            description: normalize_optional_text(request.description),
            administration_date: None,
            next_due_date,
            administered: false,
            created_at: timestamp_rfc3339.clone(),
            updated_at: timestamp_rfc3339,
        };

        let mut tx = self.db.begin().await?;

        if self
            .animal_repository
            .get_animal_tx(&mut tx, &treatment.animal_id)
            .await?
            .is_none()
        {
            warn!("Animal not found: {}", treatment.animal_id);
            return Err(ShelterError::not_found("Animal", treatment.animal_id));
        }

        self.treatment_repository
            .store_treatment_tx(&mut tx, &treatment)
            .await?;

        tx.commit().await.map_err(anyhow::Error::from)?;

        info!("Added treatment: {} with ID: {}", treatment.name, treatment.id);

        Ok(TreatmentResponse {
            treatment,
            success_message: "Treatment added successfully".to_string(),
        })
    }

    /// Mark a treatment as administered today and schedule the next one
    pub async fn administer_treatment(
        &self,
        treatment_id: &str,
        next_due_date: Option<&str>,
    ) -> ShelterResult<TreatmentResponse> {
        info!("Administering treatment: {}", treatment_id);

        let next_due_date = self.normalize_optional_date("Next due date", next_due_date)?;

        let mut tx = self.db.begin().await?;

        let mut treatment = self
            .treatment_repository
            .get_treatment_tx(&mut tx, treatment_id)
            .await?
            .ok_or_else(|| ShelterError::not_found("Treatment", treatment_id))?;

        treatment.administered = true;
        treatment.administration_date =
            Some(Local::now().date_naive().format(DATE_FORMAT).to_string());
        treatment.next_due_date = next_due_date;
        treatment.updated_at = Utc::now().to_rfc3339();

        self.treatment_repository
            .update_treatment_tx(&mut tx, &treatment)
            .await?;

        tx.commit().await.map_err(anyhow::Error::from)?;

        info!(
            "Administered treatment: {} with ID: {}",
            treatment.name, treatment.id
        );

        Ok(TreatmentResponse {
            treatment,
            success_message: "Treatment administered successfully".to_string(),
        })
    }

    /// Get a treatment by ID
    pub async fn get_treatment(&self, treatment_id: &str) -> ShelterResult<Option<Treatment>> {
        info!("Getting treatment: {}", treatment_id);

        let treatment = self.treatment_repository.get_treatment(treatment_id).await?;

        if treatment.is_none() {
            warn!("Treatment not found: {}", treatment_id);
        }

        Ok(treatment)
    }

    /// List an animal's treatments in the order they were added
    pub async fn list_animal_treatments(&self, animal_id: &str) -> ShelterResult<Vec<Treatment>> {
        info!("Listing treatments for animal: {}", animal_id);

        let animal = self
            .animal_repository
            .get_animal(animal_id)
            .await?
            .ok_or_else(|| ShelterError::not_found("Animal", animal_id))?;

        Ok(animal.treatments)
    }

    /// Classify a treatment's schedule against today's date
    pub fn classify(&self, treatment: &Treatment) -> ComplianceStatus {
        treatment.classify(Local::now().date_naive())
    }

    /// Whether an animal has no overdue vaccination as of today
    pub async fn is_vaccination_up_to_date(&self, animal_id: &str) -> ShelterResult<bool> {
        info!("Checking vaccination status for animal: {}", animal_id);

        let animal = self
            .animal_repository
            .get_animal(animal_id)
            .await?
            .ok_or_else(|| ShelterError::not_found("Animal", animal_id))?;

        Ok(animal.is_vaccination_up_to_date(Local::now().date_naive()))
    }

    /// Animals with at least one treatment strictly past its due date
    pub async fn overdue_animals(&self) -> ShelterResult<Vec<Animal>> {
        let today = Local::now().date_naive().format(DATE_FORMAT).to_string();

        let animals = self
            .animal_repository
            .get_animals_with_overdue_treatments(&today)
            .await?;

        info!("Found {} animals with overdue treatments", animals.len());

        Ok(animals)
    }

    /// Validate add treatment request
    fn validate_add_request(&self, request: &AddTreatmentRequest) -> ShelterResult<()> {
        if request.name.trim().is_empty() {
            return Err(ShelterError::Validation(
                "Treatment name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Empty dates are fine (no due date scheduled); present ones must parse
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
