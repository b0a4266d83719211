//! Pure selection rules.
//!
//! Nothing here touches storage: callers load a [`EnrollSnapshot`] and the
//! functions decide. Enforcement (`check_enroll`, `check_drop`) and the
//! catalog preview (`display_selectable`) live side by side so the two
//! rule sets are maintained together.

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use seat_ledger::{OfferedId, Section, Semester, SemesterId, Student};
use serde::Serialize;

use crate::domain::{Ineligibility, Standing};
use crate::policy::{EnrollmentPolicy, WindowPolicy};

/// `today.year - enrollment_year + 1`
pub fn academic_grade(enrollment_year: i32, today: NaiveDate) -> i32 {
    today.year() - enrollment_year + 1
}

pub fn window_open(semester: &Semester, now: NaiveDateTime, window: WindowPolicy) -> bool {
    window.contains(semester.selection_start, semester.selection_end, now)
}

/// Everything the enroll rules read, captured at one point in time.
#[derive(Debug, Clone)]
pub struct EnrollSnapshot {
    pub student: Student,
    pub section: Section,
    pub active: Option<Semester>,
    /// The student's sections in the active semester.
    pub standing: Standing,
}

/// Outcome of a read-only eligibility evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Eligibility {
    pub offered_id: OfferedId,
    pub eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<Ineligibility>,
}

impl Eligibility {
    pub fn from_check(offered_id: OfferedId, check: Result<(), Ineligibility>) -> Self {
        match check {
            Ok(()) => Self {
                offered_id,
                eligible: true,
                reason: None,
            },
            Err(reason) => Self {
                offered_id,
                eligible: false,
                reason: Some(reason),
            },
        }
    }
}

/// Active semester, membership of the section, and the window.
fn check_semester_window<'a>(
    active: Option<&'a Semester>,
    semester_id: &SemesterId,
    now: NaiveDateTime,
    window: WindowPolicy,
) -> Result<&'a Semester, Ineligibility> {
    let active = active.ok_or(Ineligibility::NoActiveSemester)?;
    if &active.semester_id != semester_id {
        return Err(Ineligibility::SemesterNotActive {
            offering_semester: semester_id.clone(),
            active_semester: active.semester_id.clone(),
        });
    }
    if !window_open(active, now, window) {
        return Err(Ineligibility::OutsideSelectionWindow {
            start: active.selection_start,
            end: active.selection_end,
        });
    }
    Ok(active)
}

/// Run every enroll rule in order and report the first that fails.
pub fn check_enroll(
    snapshot: &EnrollSnapshot,
    now: NaiveDateTime,
    policy: &EnrollmentPolicy,
) -> Result<(), Ineligibility> {
    let EnrollSnapshot {
        student,
        section,
        active,
        standing,
    } = snapshot;

    check_semester_window(
        active.as_ref(),
        &section.semester_id,
        now,
        policy.enroll_window,
    )?;

    if section.college_id != student.college_id {
        return Err(Ineligibility::CollegeMismatch {
            student_college: student.college_id.clone(),
            course_college: section.college_id.clone(),
        });
    }

    let grade = academic_grade(student.enrollment_year, now.date());
    if section.target_grade != grade {
        return Err(Ineligibility::GradeMismatch {
            target_grade: section.target_grade,
            student_grade: grade,
        });
    }

    if standing.holds(&section.offered_id) {
        return Err(Ineligibility::AlreadyEnrolled);
    }

    if standing.holds_course_name(&section.course_name) {
        return Err(Ineligibility::DuplicateCourseName {
            course_name: section.course_name.clone(),
        });
    }

    let would_total = standing.total_credits + section.credits;
    if would_total > policy.enroll_credit_ceiling {
        return Err(Ineligibility::CreditLimitExceeded {
            would_total,
            limit: policy.enroll_credit_ceiling,
        });
    }

    let conflicting = standing.conflicts_with(&section.time_slot);
    if !conflicting.is_empty() {
        return Err(Ineligibility::TimeConflict {
            time_slot: section.time_slot.clone(),
            conflicting,
        });
    }

    if !section.has_open_seat() {
        return Err(Ineligibility::SectionFull);
    }

    Ok(())
}

/// Drop is allowed for a section of the active semester while the drop
/// window is open. Whether the enrollment exists is the ledger's call.
pub fn check_drop(
    active: Option<&Semester>,
    section: &Section,
    now: NaiveDateTime,
    policy: &EnrollmentPolicy,
) -> Result<(), Ineligibility> {
    check_semester_window(active, &section.semester_id, now, policy.drop_window).map(|_| ())
}

/// Catalog preview: college, grade, course name not yet held, seat free,
/// and credits within the display ceiling.
pub fn display_selectable(
    student: &Student,
    student_grade: i32,
    section: &Section,
    standing: &Standing,
    policy: &EnrollmentPolicy,
) -> bool {
    section.college_id == student.college_id
        && section.target_grade == student_grade
        && !standing.holds_course_name(&section.course_name)
        && section.has_open_seat()
        && standing.total_credits + section.credits <= policy.catalog_credit_ceiling
}
