use thiserror::Error;

/// Failure taxonomy for shelter operations.
///
/// Business rejections (NotFound, InvalidState, Validation) are distinct
/// from Store, which means the persistence layer itself could not complete
/// an operation. Callers can branch on "the rule said no" versus "the system
/// could not be reached".
#[derive(Debug, Error)]
pub enum ShelterError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    Validation(String),

    #[error("Storage failure: {0}")]
    Store(#[from] anyhow::Error),
}

pub type ShelterResult<T> = Result<T, ShelterError>;

impl ShelterError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        ShelterError::NotFound {
            entity,
            id: id.into(),
        }
    }
}
