//! Shared fixture: one college pair, a handful of sections, one active semester.

#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use seat_ledger::*;

/// Reserve against the student's current standing version.
pub async fn reserve<L: EnrollmentLedger + ?Sized>(
    store: &L,
    student_id: &StudentId,
    offered_id: &OfferedId,
    when: NaiveDateTime,
) -> StorageResult<EnrollmentRecord> {
    let seen = store.standing_version(student_id).await?;
    store.reserve_seat(student_id, offered_id, when, seen).await
}

pub fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

pub fn offering(id: &str, course: &str, sem: &str, slot: &str, capacity: u32) -> OfferedCourse {
    OfferedCourse {
        offered_id: id.into(),
        course_id: course.into(),
        teacher_id: "t-ada".into(),
        semester_id: sem.into(),
        classroom: "A101".into(),
        time_slot: slot.into(),
        capacity,
        current_count: 0,
    }
}

pub fn dataset() -> Dataset {
    Dataset {
        colleges: vec![
            College {
                college_id: "CS".into(),
                college_name: "Computer Science".into(),
            },
            College {
                college_id: "MA".into(),
                college_name: "Mathematics".into(),
            },
        ],
        teachers: vec![Teacher {
            teacher_id: "t-ada".into(),
            name: "Ada".into(),
            college_id: "CS".into(),
        }],
        students: vec![
            Student {
                student_id: "s-1".into(),
                name: "Lin".into(),
                college_id: "CS".into(),
                enrollment_year: 2024,
            },
            Student {
                student_id: "s-2".into(),
                name: "Kai".into(),
                college_id: "CS".into(),
                enrollment_year: 2024,
            },
        ],
        courses: vec![
            Course {
                course_id: "c-alg".into(),
                course_name: "Algorithms".into(),
                credits: 3,
                target_grade: 2,
                college_id: "CS".into(),
            },
            Course {
                course_id: "c-db".into(),
                course_name: "Databases".into(),
                credits: 2,
                target_grade: 2,
                college_id: "CS".into(),
            },
        ],
        semesters: vec![
            Semester {
                semester_id: "S2025A".into(),
                semester_name: "Autumn 2025".into(),
                selection_start: at(2025, 9, 1, 0, 0),
                selection_end: at(2025, 9, 14, 23, 59),
            },
            Semester {
                semester_id: "S2025S".into(),
                semester_name: "Spring 2025".into(),
                selection_start: at(2025, 2, 1, 0, 0),
                selection_end: at(2025, 2, 14, 23, 59),
            },
        ],
        offerings: vec![
            offering("oc-db", "c-db", "S2025A", "Tuesday 8:00-9:40", 30),
            offering("oc-alg-2", "c-alg", "S2025A", "Wednesday 10:00-11:40", 30),
            offering("oc-alg-1", "c-alg", "S2025A", "Monday 8:00-9:40", 1),
            offering("oc-old", "c-db", "S2025S", "Friday 8:00-9:40", 30),
        ],
        active_semester: Some("S2025A".into()),
    }
}
