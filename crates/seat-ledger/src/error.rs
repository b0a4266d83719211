//! Error types for seat-ledger

use thiserror::Error;

/// Errors raised while connecting to or preparing the backing database
#[derive(Error, Debug)]
pub enum StateError {
    /// Database connection error
    #[error("Database connection failed: {0}")]
    Connection(String),

    /// Database query error
    #[error("Database query failed: {0}")]
    Query(String),

    /// Schema setup error
    #[error("Schema setup failed: {0}")]
    SchemaSetup(String),
}

impl From<surrealdb::Error> for StateError {
    fn from(err: surrealdb::Error) -> Self {
        StateError::Query(err.to_string())
    }
}

/// Errors returned by the storage traits.
///
/// The first five variants are outcomes of the atomic seat operations and
/// carry no partial state: when one of them is returned, neither the seat
/// count nor the enrollment set was changed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Conditional increment matched no row: `current_count >= capacity`.
    #[error("section {offered_id} is full")]
    SectionFull { offered_id: String },

    #[error("student {student_id} already holds section {offered_id}")]
    AlreadyEnrolled {
        student_id: String,
        offered_id: String,
    },

    #[error("student {student_id} does not hold section {offered_id}")]
    NotEnrolled {
        student_id: String,
        offered_id: String,
    },

    #[error("offered course not found: {offered_id}")]
    OfferingNotFound { offered_id: String },

    /// The student's holdings changed after the caller read them.
    #[error("standing of student {student_id} changed since it was read")]
    StaleStanding { student_id: String },

    /// A record points at a parent that does not exist.
    #[error("{kind} {id} references unknown {target} {target_id}")]
    UnknownReference {
        kind: &'static str,
        id: String,
        target: &'static str,
        target_id: String,
    },

    /// Loading would break a stored invariant.
    #[error("integrity violation: {0}")]
    Integrity(String),

    /// Optimistic transaction conflict that survived all retries.
    #[error("transaction conflict: {0}")]
    Conflict(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl From<surrealdb::Error> for StorageError {
    fn from(err: surrealdb::Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}
