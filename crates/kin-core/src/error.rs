use thiserror::Error;

/// Errors raised by the family model.
///
/// `IndexOutOfBounds` and `InvariantViolation` point at internal consistency
/// bugs; the other variants are caller mistakes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Matrix index out of bounds: ({row}, {col}) in a matrix of size {size}")]
    IndexOutOfBounds { row: usize, col: usize, size: usize },

    #[error("A member cannot be related to itself: {0}")]
    SelfLoop(String),

    #[error("Member not found: {0}")]
    MemberNotFound(String),

    #[error("Member already exists: {0}")]
    DuplicateMember(String),

    #[error("Member {member} already has a spouse ({spouse})")]
    SpouseConflict { member: String, spouse: String },

    #[error("Members {0} and {1} already share a different relation")]
    RelationConflict(String, String),

    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ModelError::IndexOutOfBounds {
            row: 4,
            col: 1,
            size: 3,
        };
        assert_eq!(
            err.to_string(),
            "Matrix index out of bounds: (4, 1) in a matrix of size 3"
        );

        let err = ModelError::SpouseConflict {
            member: "a".into(),
            spouse: "c".into(),
        };
        assert!(err.to_string().contains("already has a spouse (c)"));
    }
}
