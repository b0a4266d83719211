//! Row definitions for the Registrar SurrealDB tables
//!
//! Tables:
//! - college, teacher, student, course, semester: reference data
//! - offered_course: sections with their live seat count
//! - enrollment: one row per (student, section), record id `[student, section]`
//! - registrar_settings: singleton row `registrar_settings:active`
//!
//! Rows carry the SurrealDB record id and convert to and from the
//! backend-agnostic types in [`crate::records`] at the boundary.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use surrealdb::sql::Thing;

use crate::records::*;

pub(crate) const COLLEGE: &str = "college";
pub(crate) const TEACHER: &str = "teacher";
pub(crate) const STUDENT: &str = "student";
pub(crate) const COURSE: &str = "course";
pub(crate) const SEMESTER: &str = "semester";
pub(crate) const OFFERED_COURSE: &str = "offered_course";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollegeRow {
    #[serde(default, skip_serializing)]
    pub id: Option<Thing>,
    pub college_id: String,
    pub college_name: String,
}

impl From<&College> for CollegeRow {
    fn from(c: &College) -> Self {
        Self {
            id: None,
            college_id: c.college_id.0.clone(),
            college_name: c.college_name.clone(),
        }
    }
}

impl From<CollegeRow> for College {
    fn from(row: CollegeRow) -> Self {
        College {
            college_id: CollegeId(row.college_id),
            college_name: row.college_name,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeacherRow {
    #[serde(default, skip_serializing)]
    pub id: Option<Thing>,
    pub teacher_id: String,
    pub name: String,
    pub college_id: String,
}

impl From<&Teacher> for TeacherRow {
    fn from(t: &Teacher) -> Self {
        Self {
            id: None,
            teacher_id: t.teacher_id.0.clone(),
            name: t.name.clone(),
            college_id: t.college_id.0.clone(),
        }
    }
}

impl From<TeacherRow> for Teacher {
    fn from(row: TeacherRow) -> Self {
        Teacher {
            teacher_id: TeacherId(row.teacher_id),
            name: row.name,
            college_id: CollegeId(row.college_id),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentRow {
    #[serde(default, skip_serializing)]
    pub id: Option<Thing>,
    pub student_id: String,
    pub name: String,
    pub college_id: String,
    pub enrollment_year: i32,
}

impl From<&Student> for StudentRow {
    fn from(s: &Student) -> Self {
        Self {
            id: None,
            student_id: s.student_id.0.clone(),
            name: s.name.clone(),
            college_id: s.college_id.0.clone(),
            enrollment_year: s.enrollment_year,
        }
    }
}

impl From<StudentRow> for Student {
    fn from(row: StudentRow) -> Self {
        Student {
            student_id: StudentId(row.student_id),
            name: row.name,
            college_id: CollegeId(row.college_id),
            enrollment_year: row.enrollment_year,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseRow {
    #[serde(default, skip_serializing)]
    pub id: Option<Thing>,
    pub course_id: String,
    pub course_name: String,
    pub credits: u32,
    pub target_grade: i32,
    pub college_id: String,
}

impl From<&Course> for CourseRow {
    fn from(c: &Course) -> Self {
        Self {
            id: None,
            course_id: c.course_id.0.clone(),
            course_name: c.course_name.clone(),
            credits: c.credits,
            target_grade: c.target_grade,
            college_id: c.college_id.0.clone(),
        }
    }
}

impl From<CourseRow> for Course {
    fn from(row: CourseRow) -> Self {
        Course {
            course_id: CourseId(row.course_id),
            course_name: row.course_name,
            credits: row.credits,
            target_grade: row.target_grade,
            college_id: CollegeId(row.college_id),
        }
    }
}

/// Semester row. Window bounds are stored as ISO-8601 strings without a
/// zone, matching the naive local times used by the selection rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SemesterRow {
    #[serde(default, skip_serializing)]
    pub id: Option<Thing>,
    pub semester_id: String,
    pub semester_name: String,
    pub selection_start: NaiveDateTime,
    pub selection_end: NaiveDateTime,
}

impl From<&Semester> for SemesterRow {
    fn from(s: &Semester) -> Self {
        Self {
            id: None,
            semester_id: s.semester_id.0.clone(),
            semester_name: s.semester_name.clone(),
            selection_start: s.selection_start,
            selection_end: s.selection_end,
        }
    }
}

impl From<SemesterRow> for Semester {
    fn from(row: SemesterRow) -> Self {
        Semester {
            semester_id: SemesterId(row.semester_id),
            semester_name: row.semester_name,
            selection_start: row.selection_start,
            selection_end: row.selection_end,
        }
    }
}

/// Offered course row. `current_count` is deliberately absent from the
/// upsert payload (see [`OfferingUpsert`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OfferedCourseRow {
    #[serde(default, skip_serializing)]
    pub id: Option<Thing>,
    pub offered_id: String,
    pub course_id: String,
    pub teacher_id: String,
    pub semester_id: String,
    pub classroom: String,
    pub time_slot: String,
    pub capacity: u32,
    #[serde(default)]
    pub current_count: u32,
}

impl From<OfferedCourseRow> for OfferedCourse {
    fn from(row: OfferedCourseRow) -> Self {
        OfferedCourse {
            offered_id: OfferedId(row.offered_id),
            course_id: CourseId(row.course_id),
            teacher_id: TeacherId(row.teacher_id),
            semester_id: SemesterId(row.semester_id),
            classroom: row.classroom,
            time_slot: row.time_slot,
            capacity: row.capacity,
            current_count: row.current_count,
        }
    }
}

/// Reference fields of an offering, merged into the stored row so that an
/// existing `current_count` survives a reload.
#[derive(Debug, Clone, Serialize)]
pub struct OfferingUpsert {
    pub offered_id: String,
    pub course_id: String,
    pub teacher_id: String,
    pub semester_id: String,
    pub classroom: String,
    pub time_slot: String,
    pub capacity: u32,
}

impl From<&OfferedCourse> for OfferingUpsert {
    fn from(o: &OfferedCourse) -> Self {
        Self {
            offered_id: o.offered_id.0.clone(),
            course_id: o.course_id.0.clone(),
            teacher_id: o.teacher_id.0.clone(),
            semester_id: o.semester_id.0.clone(),
            classroom: o.classroom.clone(),
            time_slot: o.time_slot.clone(),
            capacity: o.capacity,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentRow {
    #[serde(default, skip_serializing)]
    pub id: Option<Thing>,
    pub student_id: String,
    pub offered_id: String,
    pub regular_score: Option<f64>,
    pub exam_score: Option<f64>,
    pub total_score: Option<f64>,
    pub enrolled_at: NaiveDateTime,
}

impl From<&EnrollmentRecord> for EnrollmentRow {
    fn from(e: &EnrollmentRecord) -> Self {
        Self {
            id: None,
            student_id: e.student_id.0.clone(),
            offered_id: e.offered_id.0.clone(),
            regular_score: e.regular_score,
            exam_score: e.exam_score,
            total_score: e.total_score,
            enrolled_at: e.enrolled_at,
        }
    }
}

impl From<EnrollmentRow> for EnrollmentRecord {
    fn from(row: EnrollmentRow) -> Self {
        EnrollmentRecord {
            student_id: StudentId(row.student_id),
            offered_id: OfferedId(row.offered_id),
            regular_score: row.regular_score,
            exam_score: row.exam_score,
            total_score: row.total_score,
            enrolled_at: row.enrolled_at,
        }
    }
}

/// Singleton settings row holding the active-semester pointer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsRow {
    #[serde(default, skip_serializing)]
    pub id: Option<Thing>,
    #[serde(default)]
    pub active_semester: Option<String>,
}
