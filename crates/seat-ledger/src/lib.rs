//! Seat Ledger: persistence for the Registrar enrollment engine
//!
//! This crate owns every byte the registrar stores: reference data
//! (colleges, teachers, students, courses, semesters, offered sections),
//! the enrollment set, and the per-section seat counts.
//!
//! ## Layer 0 - Data/Persistence
//!
//! Focus: atomic seat operations and referential integrity.
//!
//! ## Key Components
//!
//! - `ReferenceStore` / `EnrollmentLedger` / `ReferenceLoader`: backend-agnostic traits
//! - `MemoryRegistrarStore`: in-memory implementation for tests and demos
//! - `SurrealRegistrarStore`: SurrealDB implementation (`mem://`, `surrealkv://`, `ws://`)

mod error;
pub mod fakes;
mod handle;
mod integrity;
pub mod migrations;
pub mod records;
pub mod schema;
pub mod storage_traits;
pub mod surreal_store;

pub use error::{StateError, StorageError};
pub use fakes::MemoryRegistrarStore;
pub use handle::{connect, RemoteAuth, StoreConfig};
pub use records::{
    College, CollegeId, Course, CourseId, Dataset, EnrollmentRecord, OfferedCourse, OfferedId,
    Section, Semester, SemesterId, StandingVersion, Student, StudentId, Teacher, TeacherId,
};
pub use storage_traits::{
    EnrollmentLedger, ReferenceLoader, ReferenceStore, RegistrarStore, StorageResult,
};
pub use surreal_store::SurrealRegistrarStore;

/// Result type for connection and schema operations
pub type Result<T> = std::result::Result<T, StateError>;
