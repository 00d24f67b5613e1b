use kin_core::ModelError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sled(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Bincode(#[from] bincode::Error),

    #[error("Family not found: {0}")]
    FamilyNotFound(String),

    #[error("Member {member} not found in family {family}")]
    MemberNotFound { family: String, member: String },

    #[error(transparent)]
    Model(#[from] ModelError),
}

impl StoreError {
    /// True for the "does not exist" variants, as opposed to storage faults.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::FamilyNotFound(_)
                | StoreError::MemberNotFound { .. }
                | StoreError::Model(ModelError::MemberNotFound(_))
        )
    }

    /// True for storage faults.
    pub fn is_storage(&self) -> bool {
        matches!(self, StoreError::Sled(_) | StoreError::Bincode(_))
    }
}

pub type Result<T> = std::result::Result<T, StoreError>;
