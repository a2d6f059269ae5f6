use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lookahead window for the DUE_SOON compliance state, in days
pub const DUE_SOON_WINDOW_DAYS: i64 = 7;

/// Date format used for all calendar-date fields (birth dates, due dates)
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Animal ID in format: "animal::<uuid>"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Animal {
    pub id: String,
    pub name: String,
    pub species: String,
    pub breed: Option<String>,
    /// ISO 8601 date (YYYY-MM-DD)
    pub birth_date: Option<String>,
    pub gender: Gender,
    /// Size category ("Small"/"Medium"/"Large"); unrecognized values are kept as-is
    pub size: Option<String>,
    /// Authoritative owner reference
    pub owner_id: Option<String>,
    /// Authoritative housing reference; only the housing engine writes this
    pub box_id: Option<String>,
    /// Treatments belonging to this animal, loaded with it in insertion order
    pub treatments: Vec<Treatment>,
    /// RFC 3339 timestamp
    pub created_at: String,
    /// RFC 3339 timestamp
    pub updated_at: String,
}

/// Owner ID in format: "owner::<uuid>"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Owner {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    /// Derived cache of owned animal ids, rebuilt from Animal.owner_id at load time
    pub animal_ids: Vec<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A housing unit with capacity for exactly one animal.
///
/// Named ShelterBox because `Box` is taken by the standard library. ID format:
/// "box::<uuid>".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShelterBox {
    pub id: String,
    pub name: String,
    pub location: Option<String>,
    /// Size tier label ("4m²"/"9m²"/"16m²"); older records may have none
    pub size: Option<String>,
    pub status: BoxStatus,
    /// Derived from the occupant's box reference at load time, never stored
    pub occupant_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Treatment ID in format: "treatment::<uuid>"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Treatment {
    pub id: String,
    /// Owning animal; fixed at creation
    pub animal_id: String,
    pub treatment_type: TreatmentType,
    pub name: String,
    pub description: Option<String>,
    /// ISO 8601 date set when the treatment is administered
    pub administration_date: Option<String>,
    /// ISO 8601 date of the next scheduled visit; None means no follow-up
    pub next_due_date: Option<String>,
    pub administered: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Unknown,
}

impl Gender {
    /// Stored form ("Male"/"Female"/"Unknown")
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Male => "Male",
            Gender::Female => "Female",
            Gender::Unknown => "Unknown",
        }
    }

    /// Parse a stored value; anything unrecognized degrades to Unknown
    pub fn parse(value: &str) -> Self {
        match value {
            "Male" => Gender::Male,
            "Female" => Gender::Female,
            _ => Gender::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoxStatus {
    Available,
    Occupied,
    Maintenance,
    Cleaning,
}

impl BoxStatus {
    /// Stored form ("AVAILABLE"/"OCCUPIED"/"MAINTENANCE"/"CLEANING")
    pub fn as_str(&self) -> &'static str {
        match self {
            BoxStatus::Available => "AVAILABLE",
            BoxStatus::Occupied => "OCCUPIED",
            BoxStatus::Maintenance => "MAINTENANCE",
            BoxStatus::Cleaning => "CLEANING",
        }
    }

    /// Parse a stored value; box status is load-bearing, so unknown values are rejected
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "AVAILABLE" => Some(BoxStatus::Available),
            "OCCUPIED" => Some(BoxStatus::Occupied),
            "MAINTENANCE" => Some(BoxStatus::Maintenance),
            "CLEANING" => Some(BoxStatus::Cleaning),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreatmentType {
    Vaccination,
    Deworming,
    Other,
}

impl TreatmentType {
    /// Stored form ("VACCINATION"/"DEWORMING"/"OTHER")
    pub fn as_str(&self) -> &'static str {
        match self {
            TreatmentType::Vaccination => "VACCINATION",
            TreatmentType::Deworming => "DEWORMING",
            TreatmentType::Other => "OTHER",
        }
    }

    /// Parse a stored value; unrecognized types fold into the Other catch-all
    pub fn parse(value: &str) -> Self {
        match value {
            "VACCINATION" => TreatmentType::Vaccination,
            "DEWORMING" => TreatmentType::Deworming,
            _ => TreatmentType::Other,
        }
    }
}

/// Animal size category as entered on the animal record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnimalSize {
    Small,
    Medium,
    Large,
}

impl AnimalSize {
    /// Strict parse; None feeds the permissive suitability fallback
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Small" => Some(AnimalSize::Small),
            "Medium" => Some(AnimalSize::Medium),
            "Large" => Some(AnimalSize::Large),
            _ => None,
        }
    }

    /// The box tier an animal of this size needs
    pub fn box_size(&self) -> BoxSize {
        match self {
            AnimalSize::Small => BoxSize::Small,
            AnimalSize::Medium => BoxSize::Medium,
            AnimalSize::Large => BoxSize::Large,
        }
    }
}

/// Box size tier; labels are the floor areas shown on box records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoxSize {
    Small,
    Medium,
    Large,
}

impl BoxSize {
    /// Stored label ("4m²"/"9m²"/"16m²")
    pub fn label(&self) -> &'static str {
        match self {
            BoxSize::Small => "4m²",
            BoxSize::Medium => "9m²",
            BoxSize::Large => "16m²",
        }
    }
}

/// Compliance classification of a treatment relative to the current date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComplianceStatus {
    Ok,
    DueSoon,
    Overdue,
}

/// Parse an ISO 8601 calendar date (YYYY-MM-DD)
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT).ok()
}

/// Trim an optional text field, mapping empty and whitespace-only input to None
pub fn normalize_optional_text(value: Option<String>) -> Option<String> {
    match value {
        Some(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        None => None,
    }
}

impl Animal {
    /// Generate an animal ID
    pub fn generate_id() -> String {
        format!("animal::{}", Uuid::new_v4())
    }

    /// The box tier this animal needs, or None when its size is unset or unrecognized
    pub fn required_box_size(&self) -> Option<BoxSize> {
        self.size
            .as_deref()
            .and_then(AnimalSize::parse)
            .map(|size| size.box_size())
    }

    /// True when no vaccination treatment is overdue as of `today`.
    ///
    /// An animal with no vaccination treatments at all is vacuously up to date.
    pub fn is_vaccination_up_to_date(&self, today: NaiveDate) -> bool {
        !self.treatments.iter().any(|treatment| {
            treatment.treatment_type == TreatmentType::Vaccination && treatment.is_overdue(today)
        })
    }
}

impl Owner {
    /// Generate an owner ID
    pub fn generate_id() -> String {
        format!("owner::{}", Uuid::new_v4())
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl ShelterBox {
    /// Generate a box ID
    pub fn generate_id() -> String {
        format!("box::{}", Uuid::new_v4())
    }

    pub fn is_available(&self) -> bool {
        self.status == BoxStatus::Available
    }
}

impl Treatment {
    /// Generate a treatment ID
    pub fn generate_id() -> String {
        format!("treatment::{}", Uuid::new_v4())
    }

    /// The next due date parsed, when one is set and well-formed
    pub fn next_due(&self) -> Option<NaiveDate> {
        self.next_due_date.as_deref().and_then(parse_date)
    }

    /// Classify this treatment against `today`.
    ///
    /// OVERDUE when the due date has passed, DUE_SOON inside the 7-day
    /// lookahead window (a due date of `today` itself is DUE_SOON, a due date
    /// of `today + 7` is not yet), otherwise OK. A treatment with no due date
    /// never becomes due. The administered flag plays no part here: once a
    /// visit is administered its old due date is replaced, so only the
    /// current due date matters.
    pub fn classify(&self, today: NaiveDate) -> ComplianceStatus {
        match self.next_due() {
            Some(due) if due < today => ComplianceStatus::Overdue,
            Some(due) if due < today + Duration::days(DUE_SOON_WINDOW_DAYS) => {
                ComplianceStatus::DueSoon
            }
            _ => ComplianceStatus::Ok,
        }
    }

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.classify(today) == ComplianceStatus::Overdue
    }
}

/// Request for creating a new animal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateAnimalRequest {
    pub name: String,
    pub species: String,
    pub breed: Option<String>,
    pub birth_date: Option<String>, // ISO 8601 date format (YYYY-MM-DD)
    pub gender: Gender,
    pub size: Option<String>,
}

/// Request for updating an animal's descriptive fields.
///
/// Relationship fields (owner, box) have dedicated operations and are
/// deliberately absent here. `Some(value)` sets a field; for optional fields
/// an empty string clears it; `None` leaves it unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdateAnimalRequest {
    pub name: Option<String>,
    pub species: Option<String>,
    pub breed: Option<String>,
    pub birth_date: Option<String>,
    pub gender: Option<Gender>,
    pub size: Option<String>,
}

/// Response after creating or updating an animal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnimalResponse {
    pub animal: Animal,
    pub success_message: String,
}

/// Response containing a list of animals
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AnimalListResponse {
    pub animals: Vec<Animal>,
}

/// Request for creating a new owner
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateOwnerRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Request for updating an existing owner
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdateOwnerRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

/// Response after creating or updating an owner
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OwnerResponse {
    pub owner: Owner,
    pub success_message: String,
}

/// Response containing a list of owners
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OwnerListResponse {
    pub owners: Vec<Owner>,
}

/// Request for creating a new box
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateBoxRequest {
    pub name: String,
    pub location: Option<String>,
    /// Size tier label; required for new boxes
    pub size: String,
    /// Defaults to AVAILABLE; OCCUPIED is rejected (occupancy comes from assignment)
    pub status: Option<BoxStatus>,
}

/// Request for updating an existing box.
///
/// Status changes to or away from OCCUPIED are rejected; occupancy is owned
/// by the housing engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdateBoxRequest {
    pub name: Option<String>,
    pub location: Option<String>,
    pub size: Option<String>,
    pub status: Option<BoxStatus>,
}

/// Response after creating or updating a box
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoxResponse {
    pub shelter_box: ShelterBox,
    pub success_message: String,
}

/// Response containing a list of boxes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BoxListResponse {
    pub boxes: Vec<ShelterBox>,
}

/// Request for adding a treatment to an animal's plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AddTreatmentRequest {
    pub animal_id: String,
    pub treatment_type: TreatmentType,
    pub name: String,
    pub description: Option<String>,
    pub next_due_date: Option<String>, // ISO 8601 date format (YYYY-MM-DD)
}

/// Response after adding or administering a treatment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreatmentResponse {
    pub treatment: Treatment,
    pub success_message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn treatment_due(next_due_date: Option<&str>) -> Treatment {
        Treatment {
            id: Treatment::generate_id(),
            animal_id: "animal::test".to_string(),
            treatment_type: TreatmentType::Vaccination,
            name: "Rabies".to_string(),
            description: None,
            administration_date: None,
            next_due_date: next_due_date.map(|d| d.to_string()),
            administered: false,
            created_at: "2026-01-01T00:00:00+00:00".to_string(),
            updated_at: "2026-01-01T00:00:00+00:00".to_string(),
        }
    }

    fn date(value: &str) -> NaiveDate {
        parse_date(value).expect("test date must parse")
    }

    #[test]
    fn test_classify_overdue_before_today() {
        let today = date("2026-03-15");
        let treatment = treatment_due(Some("2026-03-14"));
        assert_eq!(treatment.classify(today), ComplianceStatus::Overdue);
    }

    #[test]
    fn test_classify_due_today_is_due_soon() {
        let today = date("2026-03-15");
        let treatment = treatment_due(Some("2026-03-15"));
        assert_eq!(treatment.classify(today), ComplianceStatus::DueSoon);
    }

    #[test]
    fn test_classify_inside_window_is_due_soon() {
        let today = date("2026-03-15");
        let treatment = treatment_due(Some("2026-03-18"));
        assert_eq!(treatment.classify(today), ComplianceStatus::DueSoon);
    }

    #[test]
    fn test_classify_window_boundary_is_ok() {
        let today = date("2026-03-15");
        // Exactly today + 7 falls outside the lookahead window
        let treatment = treatment_due(Some("2026-03-22"));
        assert_eq!(treatment.classify(today), ComplianceStatus::Ok);
    }

    #[test]
    fn test_classify_far_future_is_ok() {
        let today = date("2026-03-15");
        let treatment = treatment_due(Some("2026-03-25"));
        assert_eq!(treatment.classify(today), ComplianceStatus::Ok);
    }

    #[test]
    fn test_classify_no_due_date_is_ok() {
        let today = date("2026-03-15");
        let treatment = treatment_due(None);
        assert_eq!(treatment.classify(today), ComplianceStatus::Ok);
    }

    #[test]
    fn test_classify_unparseable_due_date_is_ok() {
        let today = date("2026-03-15");
        let treatment = treatment_due(Some("not-a-date"));
        assert_eq!(treatment.classify(today), ComplianceStatus::Ok);
    }

    #[test]
    fn test_classify_ignores_administered_flag() {
        let today = date("2026-03-15");
        let mut treatment = treatment_due(Some("2026-03-01"));
        treatment.administered = true;
        treatment.administration_date = Some("2026-02-01".to_string());
        assert_eq!(treatment.classify(today), ComplianceStatus::Overdue);
    }

    fn animal_with_treatments(treatments: Vec<Treatment>) -> Animal {
        Animal {
            id: Animal::generate_id(),
            name: "Rex".to_string(),
            species: "Dog".to_string(),
            breed: None,
            birth_date: None,
            gender: Gender::Male,
            size: Some("Large".to_string()),
            owner_id: None,
            box_id: None,
            treatments,
            created_at: "2026-01-01T00:00:00+00:00".to_string(),
            updated_at: "2026-01-01T00:00:00+00:00".to_string(),
        }
    }

    #[test]
    fn test_vaccination_up_to_date_with_no_treatments() {
        let today = date("2026-03-15");
        let animal = animal_with_treatments(vec![]);
        assert!(animal.is_vaccination_up_to_date(today));
    }

    #[test]
    fn test_vaccination_up_to_date_with_overdue_vaccination() {
        let today = date("2026-03-15");
        let animal = animal_with_treatments(vec![treatment_due(Some("2026-03-01"))]);
        assert!(!animal.is_vaccination_up_to_date(today));
    }

    #[test]
    fn test_vaccination_up_to_date_ignores_other_treatment_types() {
        let today = date("2026-03-15");
        let mut overdue_deworming = treatment_due(Some("2026-03-01"));
        overdue_deworming.treatment_type = TreatmentType::Deworming;
        let animal = animal_with_treatments(vec![overdue_deworming]);
        assert!(animal.is_vaccination_up_to_date(today));
    }

    #[test]
    fn test_vaccination_up_to_date_mixed_treatments() {
        let today = date("2026-03-15");
        let current = treatment_due(Some("2026-06-01"));
        let overdue = treatment_due(Some("2026-02-01"));
        let animal = animal_with_treatments(vec![current, overdue]);
        assert!(!animal.is_vaccination_up_to_date(today));
    }

    #[test]
    fn test_required_box_size_mapping() {
        let mut animal = animal_with_treatments(vec![]);

        animal.size = Some("Small".to_string());
        assert_eq!(animal.required_box_size(), Some(BoxSize::Small));

        animal.size = Some("Medium".to_string());
        assert_eq!(animal.required_box_size(), Some(BoxSize::Medium));

        animal.size = Some("Large".to_string());
        assert_eq!(animal.required_box_size(), Some(BoxSize::Large));
    }

    #[test]
    fn test_required_box_size_unset_or_garbage() {
        let mut animal = animal_with_treatments(vec![]);

        animal.size = None;
        assert_eq!(animal.required_box_size(), None);

        animal.size = Some("enormous".to_string());
        assert_eq!(animal.required_box_size(), None);

        // Case matters: stored categories are exact
        animal.size = Some("small".to_string());
        assert_eq!(animal.required_box_size(), None);
    }

    #[test]
    fn test_box_size_labels() {
        assert_eq!(BoxSize::Small.label(), "4m²");
        assert_eq!(BoxSize::Medium.label(), "9m²");
        assert_eq!(BoxSize::Large.label(), "16m²");
    }

    #[test]
    fn test_gender_parse_degrades_to_unknown() {
        assert_eq!(Gender::parse("Male"), Gender::Male);
        assert_eq!(Gender::parse("Female"), Gender::Female);
        assert_eq!(Gender::parse("Unknown"), Gender::Unknown);
        assert_eq!(Gender::parse("hamster"), Gender::Unknown);
        assert_eq!(Gender::parse(""), Gender::Unknown);
    }

    #[test]
    fn test_box_status_parse_is_strict() {
        assert_eq!(BoxStatus::parse("AVAILABLE"), Some(BoxStatus::Available));
        assert_eq!(BoxStatus::parse("OCCUPIED"), Some(BoxStatus::Occupied));
        assert_eq!(BoxStatus::parse("MAINTENANCE"), Some(BoxStatus::Maintenance));
        assert_eq!(BoxStatus::parse("CLEANING"), Some(BoxStatus::Cleaning));
        assert_eq!(BoxStatus::parse("available"), None);
        assert_eq!(BoxStatus::parse(""), None);
    }

    #[test]
    fn test_treatment_type_parse_folds_to_other() {
        assert_eq!(TreatmentType::parse("VACCINATION"), TreatmentType::Vaccination);
        assert_eq!(TreatmentType::parse("DEWORMING"), TreatmentType::Deworming);
        assert_eq!(TreatmentType::parse("OTHER"), TreatmentType::Other);
        assert_eq!(TreatmentType::parse("SURGERY"), TreatmentType::Other);
    }

    #[test]
    fn test_generate_ids_have_entity_prefixes() {
        assert!(Animal::generate_id().starts_with("animal::"));
        assert!(Owner::generate_id().starts_with("owner::"));
        assert!(ShelterBox::generate_id().starts_with("box::"));
        assert!(Treatment::generate_id().starts_with("treatment::"));

        // UUID-based ids never collide across calls
        assert_ne!(Animal::generate_id(), Animal::generate_id());
    }

    #[test]
    fn test_normalize_optional_text() {
        assert_eq!(normalize_optional_text(None), None);
        assert_eq!(normalize_optional_text(Some("".to_string())), None);
        assert_eq!(normalize_optional_text(Some("   ".to_string())), None);
        assert_eq!(
            normalize_optional_text(Some("  Husky  ".to_string())),
            Some("Husky".to_string())
        );
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(
            parse_date("2026-03-15"),
            NaiveDate::from_ymd_opt(2026, 3, 15)
        );
        assert!(parse_date("2026-13-15").is_none());
        assert!(parse_date("15/03/2026").is_none());
        assert!(parse_date("").is_none());
    }

    #[test]
    fn test_enum_json_casing_differs_from_stored_form() {
        // The embedding layer sees serde variant names; the store sees as_str
        // values. The two must not be confused.
        let status_json = serde_json::to_string(&BoxStatus::Available).expect("serialize status");
        assert_eq!(status_json, "\"Available\"");
        assert_eq!(BoxStatus::Available.as_str(), "AVAILABLE");

        let gender_json = serde_json::to_string(&Gender::Male).expect("serialize gender");
        assert_eq!(gender_json, "\"Male\"");
    }

    #[test]
    fn test_owner_full_name() {
        let owner = Owner {
            id: Owner::generate_id(),
            first_name: "Marie".to_string(),
            last_name: "Dupont".to_string(),
            email: None,
            phone: None,
            address: None,
            animal_ids: vec![],
            created_at: "2026-01-01T00:00:00+00:00".to_string(),
            updated_at: "2026-01-01T00:00:00+00:00".to_string(),
        };
        assert_eq!(owner.full_name(), "Marie Dupont");
    }
}
