//! Entity records shared by every storage backend
//!
//! Reference entities (colleges, teachers, students, courses, semesters,
//! offered courses) are read-only from the enrollment engine's point of
//! view. `EnrollmentRecord` rows and `OfferedCourse::current_count` are only
//! ever written through [`crate::EnrollmentLedger::reserve_seat`] and
//! [`crate::EnrollmentLedger::release_seat`].

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                $name(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name(s)
            }
        }
    };
}

string_id!(
    /// College (faculty) identifier
    CollegeId
);
string_id!(
    /// Teacher identifier
    TeacherId
);
string_id!(
    /// Student identifier (also the session username)
    StudentId
);
string_id!(
    /// Course catalogue identifier
    CourseId
);
string_id!(
    /// Semester identifier, e.g. `S2025A`
    SemesterId
);
string_id!(
    /// Identifier of one offered section of a course
    OfferedId
);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct College {
    pub college_id: CollegeId,
    pub college_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    pub teacher_id: TeacherId,
    pub name: String,
    pub college_id: CollegeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub student_id: StudentId,
    pub name: String,
    pub college_id: CollegeId,
    /// Calendar year the student enrolled; the academic grade is derived from it.
    pub enrollment_year: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub course_id: CourseId,
    /// Display name. Not unique in storage, but a student may hold at most
    /// one section per name in a semester.
    pub course_name: String,
    pub credits: u32,
    pub target_grade: i32,
    pub college_id: CollegeId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Semester {
    pub semester_id: SemesterId,
    pub semester_name: String,
    #[serde(with = "naive_datetime")]
    pub selection_start: NaiveDateTime,
    #[serde(with = "naive_datetime")]
    pub selection_end: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferedCourse {
    pub offered_id: OfferedId,
    pub course_id: CourseId,
    pub teacher_id: TeacherId,
    pub semester_id: SemesterId,
    pub classroom: String,
    /// Slot literal such as `"Monday 8:00-9:40"`.
    pub time_slot: String,
    pub capacity: u32,
    /// Ignored by loaders; owned by the seat operations.
    #[serde(default)]
    pub current_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrollmentRecord {
    pub student_id: StudentId,
    pub offered_id: OfferedId,
    pub regular_score: Option<f64>,
    pub exam_score: Option<f64>,
    pub total_score: Option<f64>,
    pub enrolled_at: NaiveDateTime,
}

impl EnrollmentRecord {
    /// A fresh, ungraded enrollment.
    pub fn new(student_id: StudentId, offered_id: OfferedId, enrolled_at: NaiveDateTime) -> Self {
        Self {
            student_id,
            offered_id,
            regular_score: None,
            exam_score: None,
            total_score: None,
            enrolled_at,
        }
    }
}

/// Version counter over the set of sections a student holds.
///
/// Every committed reserve or release bumps it. A reserve carries the
/// version its eligibility check was made against and is refused with
/// `StorageError::StaleStanding` when the stored version has moved on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StandingVersion(pub u64);

impl StandingVersion {
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Serde adapter for local datetimes written either as
/// `2025-09-01T09:00:00` or `2025-09-01 09:00:00`.
///
/// Output always uses the `T` separator.
pub mod naive_datetime {
    use chrono::NaiveDateTime;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    const FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

    pub fn parse(raw: &str) -> Result<NaiveDateTime, String> {
        let raw = raw.trim();
        FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
            .ok_or_else(|| {
                format!(
                    "invalid datetime {raw:?}: expected YYYY-MM-DDTHH:MM:SS or YYYY-MM-DD HH:MM:SS"
                )
            })
    }

    pub fn serialize<S>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(D::Error::custom)
    }
}

/// Read model: an offered course joined with its course, teacher and college.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub offered_id: OfferedId,
    pub course_id: CourseId,
    pub course_name: String,
    pub credits: u32,
    pub target_grade: i32,
    pub college_id: CollegeId,
    pub college_name: String,
    pub teacher_id: TeacherId,
    pub teacher_name: String,
    pub semester_id: SemesterId,
    pub classroom: String,
    pub time_slot: String,
    pub capacity: u32,
    pub current_count: u32,
}

impl Section {
    pub fn assemble(
        offering: &OfferedCourse,
        course: &Course,
        teacher: &Teacher,
        college: &College,
    ) -> Self {
        Self {
            offered_id: offering.offered_id.clone(),
            course_id: course.course_id.clone(),
            course_name: course.course_name.clone(),
            credits: course.credits,
            target_grade: course.target_grade,
            college_id: college.college_id.clone(),
            college_name: college.college_name.clone(),
            teacher_id: teacher.teacher_id.clone(),
            teacher_name: teacher.name.clone(),
            semester_id: offering.semester_id.clone(),
            classroom: offering.classroom.clone(),
            time_slot: offering.time_slot.clone(),
            capacity: offering.capacity,
            current_count: offering.current_count,
        }
    }

    pub fn has_open_seat(&self) -> bool {
        self.current_count < self.capacity
    }
}

/// Canonical section order: course name, then time slot, then id.
pub(crate) fn sort_sections(sections: &mut [Section]) {
    sections.sort_by(|a, b| {
        (&a.course_name, &a.time_slot, &a.offered_id).cmp(&(
            &b.course_name,
            &b.time_slot,
            &b.offered_id,
        ))
    });
}

/// A bundle of reference data used to seed a store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub colleges: Vec<College>,
    #[serde(default)]
    pub teachers: Vec<Teacher>,
    #[serde(default)]
    pub students: Vec<Student>,
    #[serde(default)]
    pub courses: Vec<Course>,
    #[serde(default)]
    pub semesters: Vec<Semester>,
    #[serde(default)]
    pub offerings: Vec<OfferedCourse>,
    /// Semester to mark active after loading; `None` leaves the pointer as is.
    #[serde(default)]
    pub active_semester: Option<SemesterId>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn ids_serialize_as_plain_strings() {
        let id = OfferedId::new("oc-1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"oc-1\"");
        assert_eq!(id.to_string(), "oc-1");
    }

    #[test]
    fn current_count_defaults_when_absent() {
        let json = serde_json::json!({
            "offered_id": "oc-1",
            "course_id": "c-1",
            "teacher_id": "t-1",
            "semester_id": "S1",
            "classroom": "A101",
            "time_slot": "Monday 8:00-9:40",
            "capacity": 30
        });
        let offering: OfferedCourse = serde_json::from_value(json).unwrap();
        assert_eq!(offering.current_count, 0);
    }

    #[test]
    fn new_enrollment_is_ungraded() {
        let rec = EnrollmentRecord::new("s-1".into(), "oc-1".into(), at(2025, 9, 1));
        assert!(rec.regular_score.is_none());
        assert!(rec.exam_score.is_none());
        assert!(rec.total_score.is_none());
    }

    #[test]
    fn section_open_seat() {
        let college = College {
            college_id: "CS".into(),
            college_name: "Computer Science".into(),
        };
        let teacher = Teacher {
            teacher_id: "t-1".into(),
            name: "Ada".into(),
            college_id: "CS".into(),
        };
        let course = Course {
            course_id: "c-1".into(),
            course_name: "Algorithms".into(),
            credits: 3,
            target_grade: 2,
            college_id: "CS".into(),
        };
        let mut offering = OfferedCourse {
            offered_id: "oc-1".into(),
            course_id: "c-1".into(),
            teacher_id: "t-1".into(),
            semester_id: "S1".into(),
            classroom: "A101".into(),
            time_slot: "Monday 8:00-9:40".into(),
            capacity: 2,
            current_count: 1,
        };
        let section = Section::assemble(&offering, &course, &teacher, &college);
        assert!(section.has_open_seat());
        assert_eq!(section.teacher_name, "Ada");
        assert_eq!(section.college_name, "Computer Science");

        offering.current_count = 2;
        assert!(!Section::assemble(&offering, &course, &teacher, &college).has_open_seat());
    }

    #[test]
    fn semester_window_accepts_space_separated_datetimes() {
        let json = serde_json::json!({
            "semester_id": "S2025F",
            "semester_name": "Fall 2025",
            "selection_start": "2025-09-01 09:00:00",
            "selection_end": "2025-09-14T12:00:00"
        });
        let semester: Semester = serde_json::from_value(json).unwrap();
        assert_eq!(semester.selection_start, at(2025, 9, 1) + chrono::Duration::hours(9));
        assert_eq!(semester.selection_end, at(2025, 9, 14) + chrono::Duration::hours(12));

        let back = serde_json::to_value(&semester).unwrap();
        assert_eq!(back["selection_start"], "2025-09-01T09:00:00");
    }

    #[test]
    fn semester_window_rejects_date_only() {
        let json = serde_json::json!({
            "semester_id": "S2025F",
            "semester_name": "Fall 2025",
            "selection_start": "2025-09-01",
            "selection_end": "2025-09-14 12:00:00"
        });
        let err = serde_json::from_value::<Semester>(json).unwrap_err();
        assert!(err.to_string().contains("2025-09-01"));
    }

    #[test]
    fn standing_version_starts_at_zero() {
        assert_eq!(StandingVersion::default(), StandingVersion(0));
        assert_eq!(StandingVersion::default().next(), StandingVersion(1));
    }
}
