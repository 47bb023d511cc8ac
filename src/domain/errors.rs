use thiserror::Error;

use super::models::DriveField;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Polygon has no coordinates")]
    EmptyRing,

    #[error("Invalid {field} value: {message}")]
    InvalidInput { field: DriveField, message: String },

    /// Payload assembly was reached with a draft that never passed the area step.
    #[error("Drive draft is incomplete: {0} is missing")]
    IncompleteDraft(DriveField),
}

impl DomainError {
    pub fn invalid_input(field: DriveField, message: impl Into<String>) -> Self {
        DomainError::InvalidInput {
            field,
            message: message.into(),
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
