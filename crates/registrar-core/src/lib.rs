//! Registrar Core Library
//!
//! The course-selection engine: selection rules, capacity-safe seat
//! reservation, and the read models built on top of them.
//!
//! ## Key Components
//!
//! - [`SeatCoordinator`]: the only writer of enrollments and seat counts
//! - [`eligibility`]: pure enroll/drop rules and the catalog preview rule
//! - [`build_catalog`] / [`build_timetable`]: student-facing views
//! - [`audit_seat_counts`]: stored count vs. roster reconciliation

pub mod audit;
pub mod catalog;
pub mod clock;
pub mod coordinator;
pub mod domain;
pub mod eligibility;
pub mod metrics;
pub mod obs;
pub mod policy;
pub mod telemetry;
pub mod timetable;

pub use audit::{audit_seat_counts, AuditReport, DriftIssue, SeatDrift};
pub use catalog::{build_catalog, Catalog, CourseGroup, CourseTier, OtherCollegeGroup, SectionView};
pub use clock::{Clock, FixedClock, SystemClock};
pub use coordinator::SeatCoordinator;
pub use domain::{ErrorKind, Ineligibility, RegistrarError, Result, Standing, ValidationError};
pub use eligibility::{
    academic_grade, check_drop, check_enroll, display_selectable, window_open, Eligibility,
    EnrollSnapshot,
};
pub use policy::{
    EnrollmentPolicy, PolicyError, WindowPolicy, CATALOG_CREDIT_CEILING, ENROLL_CREDIT_CEILING,
};
pub use timetable::{
    build_timetable, Timetable, TimetableEntry, TimetableRow, PERIODS, WEEKDAYS,
};

pub use seat_ledger::{
    Dataset, EnrollmentRecord, MemoryRegistrarStore, OfferedId, Section, Semester, SemesterId,
    StorageError, StudentId, SurrealRegistrarStore,
};

pub use metrics::METRICS;
pub use obs::{
    emit_audit_drift, emit_drop_committed, emit_enroll_capacity_conflict, emit_enroll_committed,
    emit_enroll_rejected, SeatSpan,
};
pub use telemetry::init_tracing;

/// Registrar version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
