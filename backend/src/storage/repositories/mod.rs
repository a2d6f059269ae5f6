// Repository modules
pub mod animal_repository;
pub mod box_repository;
pub mod owner_repository;
pub mod treatment_repository;

// Re-export repository types
pub use animal_repository::AnimalRepository;
pub use box_repository::BoxRepository;
pub use owner_repository::OwnerRepository;
pub use treatment_repository::TreatmentRepository;
