//! Error taxonomy for planner operations

/// Errors surfaced by the planning engine and its collaborators.
///
/// Nothing in the library retries or recovers; the caller maps these onto
/// whatever status scheme it uses.
#[derive(Debug, thiserror::Error)]
pub enum PlannerError {
    /// A referenced item, recipe, generator, entry or planner does not exist.
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The request conflicts with the current planner state.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Catalog or stored data is broken in a way no user input can fix.
    #[error("data inconsistency: {0}")]
    DataInconsistency(String),

    #[error("catalog import failed: {0}")]
    Import(String),

    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl PlannerError {
    pub fn not_found(kind: &'static str, key: impl ToString) -> Self {
        PlannerError::NotFound {
            kind,
            key: key.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PlannerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_kind_and_key() {
        let err = PlannerError::not_found("recipe", 42);
        assert_eq!(err.to_string(), "recipe not found: 42");
    }

    #[test]
    fn storage_errors_convert() {
        let err: PlannerError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, PlannerError::Storage(_)));
    }
}
