//! # Domain Module
//!
//! Business logic for the shelter: animal, owner and box management plus
//! the two engines that sit on top of them.
//!
//! ## Services
//!
//! - `AnimalService`: animal records, owner assignment, cascading deletion
//! - `OwnerService`: owner records and their derived animal lists
//! - `BoxService`: box records, with occupancy-aware status guards
//! - `HousingService`: assigning animals to boxes and releasing them
//! - `TreatmentService`: treatment plans and medical compliance
//!
//! Services share one [`crate::storage::DbConnection`] and coordinate
//! multi-row changes through its transactions.

pub mod animal_service;
pub mod box_service;
pub mod errors;
pub mod housing_service;
pub mod owner_service;
pub mod treatment_service;

pub use animal_service::*;
pub use box_service::*;
pub use errors::*;
pub use housing_service::*;
pub use owner_service::*;
pub use treatment_service::*;
