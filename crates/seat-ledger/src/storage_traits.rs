//! Storage trait definitions for Registrar
//!
//! These traits define the core storage abstractions:
//! - `ReferenceStore`: read access to students, sections and semesters
//! - `EnrollmentLedger`: the enrollment set and its atomic seat operations
//! - `ReferenceLoader`: seeding reference data
//!
//! All traits are async and backend-agnostic. In-memory fakes are provided
//! for testing via the `fakes` module.

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::error::StorageError;
use crate::records::*;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

// ---------------------------------------------------------------------------
// ReferenceStore: read-mostly reference data
// ---------------------------------------------------------------------------

/// Read access to reference data.
///
/// Sections are returned joined with their course, teacher and college, and
/// reflect the seat count as of the call.
#[async_trait]
pub trait ReferenceStore: Send + Sync {
    /// Look up a student by ID.
    async fn student(&self, student_id: &StudentId) -> StorageResult<Option<Student>>;

    /// Look up one offered section by ID.
    async fn section(&self, offered_id: &OfferedId) -> StorageResult<Option<Section>>;

    /// Look up a semester by ID.
    async fn semester(&self, semester_id: &SemesterId) -> StorageResult<Option<Semester>>;

    /// The semester the active-semester pointer refers to, if any.
    async fn active_semester(&self) -> StorageResult<Option<Semester>>;

    /// All sections offered in a semester, ordered by course name then time slot.
    async fn sections_in_semester(&self, semester_id: &SemesterId) -> StorageResult<Vec<Section>>;
}

// ---------------------------------------------------------------------------
// EnrollmentLedger: enrollments and seat counts
// ---------------------------------------------------------------------------

/// The enrollment set plus the only two writes allowed on it.
///
/// Guarantees:
/// - `reserve_seat` increments `current_count` only while it is below
///   `capacity`, and inserts the enrollment in the same atomic step.
/// - `release_seat` deletes the enrollment and decrements `current_count` by
///   exactly one in the same atomic step.
/// - Both writes bump the student's `StandingVersion`; `reserve_seat`
///   commits only if the version still equals the one the caller read.
/// - A failed call leaves the count, the enrollment set and the version
///   untouched.
#[async_trait]
pub trait EnrollmentLedger: Send + Sync {
    /// Fetch a single enrollment.
    async fn enrollment(
        &self,
        student_id: &StudentId,
        offered_id: &OfferedId,
    ) -> StorageResult<Option<EnrollmentRecord>>;

    /// Sections a student holds in one semester, ordered by course name.
    async fn student_sections(
        &self,
        student_id: &StudentId,
        semester_id: &SemesterId,
    ) -> StorageResult<Vec<Section>>;

    /// All enrollments of one section, ordered by student ID.
    async fn roster(&self, offered_id: &OfferedId) -> StorageResult<Vec<EnrollmentRecord>>;

    /// Current version of the student's holdings. Zero for a student who
    /// has never reserved or released a seat.
    async fn standing_version(&self, student_id: &StudentId) -> StorageResult<StandingVersion>;

    /// Take a seat. Fails with `OfferingNotFound`, `StaleStanding` when
    /// the holdings moved past `seen`, `SectionFull` or `AlreadyEnrolled`.
    async fn reserve_seat(
        &self,
        student_id: &StudentId,
        offered_id: &OfferedId,
        at: NaiveDateTime,
        seen: StandingVersion,
    ) -> StorageResult<EnrollmentRecord>;

    /// Give a seat back. Fails with `NotEnrolled`. Returns the removed row.
    async fn release_seat(
        &self,
        student_id: &StudentId,
        offered_id: &OfferedId,
    ) -> StorageResult<EnrollmentRecord>;
}

// ---------------------------------------------------------------------------
// ReferenceLoader: seeding
// ---------------------------------------------------------------------------

/// Upserts reference data.
///
/// Semantics:
/// - Every foreign key must resolve, either within the dataset or against
///   rows already stored; otherwise nothing is written.
/// - `current_count` is never taken from the input: new offerings start at
///   zero and existing offerings keep their stored count.
/// - Lowering an offering's capacity below its stored count is rejected.
#[async_trait]
pub trait ReferenceLoader: Send + Sync {
    async fn load_dataset(&self, dataset: &Dataset) -> StorageResult<()>;

    /// Point the store at a semester, or clear the pointer with `None`.
    async fn set_active_semester(&self, semester_id: Option<&SemesterId>) -> StorageResult<()>;
}

/// Everything the enrollment engine needs from a backend.
pub trait RegistrarStore: ReferenceStore + EnrollmentLedger {}

impl<T: ReferenceStore + EnrollmentLedger> RegistrarStore for T {}
