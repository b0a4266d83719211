//! Domain-level error taxonomy for the enrollment engine.
//!
//! Every variant is a recoverable, user-facing outcome. Callers branch on
//! [`RegistrarError::kind`] rather than on individual variants.

use chrono::NaiveDateTime;
use seat_ledger::{CollegeId, OfferedId, SemesterId, StorageError, StudentId};
use serde::Serialize;

/// Malformed or dangling identifiers in a request.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    EmptyIdentifier { field: &'static str },

    #[error("unknown student: {0}")]
    UnknownStudent(StudentId),

    #[error("offered course does not exist: {0}")]
    UnknownOffering(OfferedId),
}

/// Why a student may not take (or give back) a particular section.
///
/// Variants appear in the order the checks run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Ineligibility {
    #[error("no active semester; course selection is unavailable")]
    NoActiveSemester,

    #[error("section belongs to semester {offering_semester}, not the active semester {active_semester}")]
    SemesterNotActive {
        offering_semester: SemesterId,
        active_semester: SemesterId,
    },

    #[error("course selection is only open from {start} to {end}")]
    OutsideSelectionWindow {
        start: NaiveDateTime,
        end: NaiveDateTime,
    },

    #[error("only courses offered by your own college ({student_college}) can be selected")]
    CollegeMismatch {
        student_college: CollegeId,
        course_college: CollegeId,
    },

    #[error("this course is only open to grade {target_grade} students (you are grade {student_grade})")]
    GradeMismatch {
        target_grade: i32,
        student_grade: i32,
    },

    #[error("already enrolled in this course section")]
    AlreadyEnrolled,

    #[error("already enrolled in \"{course_name}\"; duplicate course names are not allowed")]
    DuplicateCourseName { course_name: String },

    #[error("total credits would reach {would_total}, exceeding the {limit}-credit limit")]
    CreditLimitExceeded { would_total: u32, limit: u32 },

    #[error("time conflict at {time_slot} with enrolled course(s): {}", .conflicting.join(", "))]
    TimeConflict {
        time_slot: String,
        conflicting: Vec<String>,
    },

    #[error("section is full")]
    SectionFull,
}

impl Ineligibility {
    /// Stable machine-readable code, used in structured log events.
    pub fn code(&self) -> &'static str {
        match self {
            Ineligibility::NoActiveSemester => "no_active_semester",
            Ineligibility::SemesterNotActive { .. } => "semester_not_active",
            Ineligibility::OutsideSelectionWindow { .. } => "outside_selection_window",
            Ineligibility::CollegeMismatch { .. } => "college_mismatch",
            Ineligibility::GradeMismatch { .. } => "grade_mismatch",
            Ineligibility::AlreadyEnrolled => "already_enrolled",
            Ineligibility::DuplicateCourseName { .. } => "duplicate_course_name",
            Ineligibility::CreditLimitExceeded { .. } => "credit_limit_exceeded",
            Ineligibility::TimeConflict { .. } => "time_conflict",
            Ineligibility::SectionFull => "section_full",
        }
    }
}

/// Coarse classification of [`RegistrarError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Fix the request.
    Validation,
    /// The request is well-formed but a selection rule forbids it.
    Eligibility,
    /// Lost the race for the last seat; try another section.
    CapacityConflict,
    /// The enrollment to act on does not exist.
    State,
    /// Unexpected storage failure; nothing was applied.
    Storage,
}

/// Registrar domain errors.
#[derive(Debug, thiserror::Error)]
pub enum RegistrarError {
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("not eligible: {0}")]
    Ineligible(#[from] Ineligibility),

    #[error("section {offered_id} filled up before the seat could be reserved; try another section")]
    CapacityConflict { offered_id: OfferedId },

    #[error("student {student_id} is not enrolled in {offered_id}; nothing to drop")]
    NotEnrolled {
        student_id: StudentId,
        offered_id: OfferedId,
    },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl RegistrarError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistrarError::Validation(_) => ErrorKind::Validation,
            RegistrarError::Ineligible(_) => ErrorKind::Eligibility,
            RegistrarError::CapacityConflict { .. } => ErrorKind::CapacityConflict,
            RegistrarError::NotEnrolled { .. } => ErrorKind::State,
            RegistrarError::Storage(_) => ErrorKind::Storage,
        }
    }

    /// True for both the advisory pre-check and the commit-time refusal.
    pub fn is_section_full(&self) -> bool {
        matches!(
            self,
            RegistrarError::CapacityConflict { .. }
                | RegistrarError::Ineligible(Ineligibility::SectionFull)
        )
    }

    /// The selection rule that failed, if this is an eligibility outcome.
    pub fn ineligibility(&self) -> Option<&Ineligibility> {
        match self {
            RegistrarError::Ineligible(reason) => Some(reason),
            _ => None,
        }
    }
}

/// Result type for registrar domain operations.
pub type Result<T> = std::result::Result<T, RegistrarError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_taxonomy() {
        let err = RegistrarError::from(ValidationError::EmptyIdentifier { field: "student_id" });
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = RegistrarError::from(Ineligibility::AlreadyEnrolled);
        assert_eq!(err.kind(), ErrorKind::Eligibility);

        let err = RegistrarError::CapacityConflict {
            offered_id: "oc-1".into(),
        };
        assert_eq!(err.kind(), ErrorKind::CapacityConflict);
        assert!(err.is_section_full());

        let err = RegistrarError::NotEnrolled {
            student_id: "s-1".into(),
            offered_id: "oc-1".into(),
        };
        assert_eq!(err.kind(), ErrorKind::State);

        let err = RegistrarError::from(StorageError::Backend("boom".into()));
        assert_eq!(err.kind(), ErrorKind::Storage);
    }

    #[test]
    fn precheck_full_is_section_full() {
        let err = RegistrarError::from(Ineligibility::SectionFull);
        assert!(err.is_section_full());
        assert_eq!(err.ineligibility(), Some(&Ineligibility::SectionFull));
    }

    #[test]
    fn time_conflict_lists_courses() {
        let reason = Ineligibility::TimeConflict {
            time_slot: "Monday 8:00-9:40".into(),
            conflicting: vec!["Algorithms".into(), "Databases".into()],
        };
        let msg = reason.to_string();
        assert!(msg.contains("Algorithms, Databases"));
        assert_eq!(reason.code(), "time_conflict");
    }

    #[test]
    fn credit_limit_message() {
        let reason = Ineligibility::CreditLimitExceeded {
            would_total: 16,
            limit: 15,
        };
        assert_eq!(
            reason.to_string(),
            "total credits would reach 16, exceeding the 15-credit limit"
        );
    }

    #[test]
    fn reasons_serialize_with_tag() {
        let json = serde_json::to_value(Ineligibility::DuplicateCourseName {
            course_name: "Calculus I".into(),
        })
        .unwrap();
        assert_eq!(json["reason"], "duplicate_course_name");
        assert_eq!(json["course_name"], "Calculus I");
    }
}
