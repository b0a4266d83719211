//! Shared fixture for registrar-core integration tests.
//!
//! Active semester `S2025A` with a selection window of
//! 2025-09-01 09:00 to 2025-09-14 12:00. The fixed clock sits inside it, on
//! 2025-09-03 10:00, so students who enrolled in 2024 are in grade 2.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use registrar_core::{FixedClock, SeatCoordinator};
use seat_ledger::*;

pub fn at(m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

pub fn in_window() -> NaiveDateTime {
    at(9, 3, 10, 0)
}

fn college(id: &str, name: &str) -> College {
    College {
        college_id: id.into(),
        college_name: name.into(),
    }
}

fn teacher(id: &str, name: &str, college: &str) -> Teacher {
    Teacher {
        teacher_id: id.into(),
        name: name.into(),
        college_id: college.into(),
    }
}

pub fn student(id: &str, college: &str, year: i32) -> Student {
    Student {
        student_id: id.into(),
        name: format!("Student {id}"),
        college_id: college.into(),
        enrollment_year: year,
    }
}

fn course(id: &str, name: &str, credits: u32, grade: i32, college: &str) -> Course {
    Course {
        course_id: id.into(),
        course_name: name.into(),
        credits,
        target_grade: grade,
        college_id: college.into(),
    }
}

fn offering(id: &str, course: &str, teacher: &str, sem: &str, slot: &str, capacity: u32) -> OfferedCourse {
    OfferedCourse {
        offered_id: id.into(),
        course_id: course.into(),
        teacher_id: teacher.into(),
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
            college("CS", "Computer Science"),
            college("MA", "Mathematics"),
            college("PH", "Physics"),
        ],
        teachers: vec![
            teacher("t-ada", "Ada", "CS"),
            teacher("t-gauss", "Gauss", "MA"),
            teacher("t-curie", "Curie", "PH"),
        ],
        students: vec![
            student("s-lin", "CS", 2024),
            student("s-kai", "CS", 2024),
            student("s-mo", "CS", 2023),
            student("s-ren", "MA", 2024),
        ],
        courses: vec![
            course("c-calc", "Calculus I", 4, 2, "CS"),
            course("c-alg", "Algorithms", 5, 2, "CS"),
            course("c-os", "Operating Systems", 5, 2, "CS"),
            course("c-net", "Networks", 4, 2, "CS"),
            course("c-db", "Databases", 2, 2, "CS"),
            course("c-eth", "Ethics", 1, 2, "CS"),
            course("c-stat", "Statistics", 2, 2, "CS"),
            course("c-sem", "Seminar", 1, 2, "CS"),
            course("c-arch", "Architecture", 3, 3, "CS"),
            course("c-lin", "Linear Algebra", 3, 2, "MA"),
            course("c-mech", "Mechanics", 3, 2, "PH"),
        ],
        semesters: vec![
            Semester {
                semester_id: "S2025A".into(),
                semester_name: "Autumn 2025".into(),
                selection_start: at(9, 1, 9, 0),
                selection_end: at(9, 14, 12, 0),
            },
            Semester {
                semester_id: "S2025S".into(),
                semester_name: "Spring 2025".into(),
                selection_start: at(2, 1, 9, 0),
                selection_end: at(2, 14, 12, 0),
            },
        ],
        offerings: vec![
            offering("oc-calc-a", "c-calc", "t-ada", "S2025A", "Monday 8:00-9:40", 30),
            offering("oc-calc-b", "c-calc", "t-ada", "S2025A", "Tuesday 8:00-9:40", 30),
            offering("oc-alg", "c-alg", "t-ada", "S2025A", "Monday 10:00-11:40", 30),
            offering("oc-os", "c-os", "t-ada", "S2025A", "Tuesday 10:00-11:40", 30),
            offering("oc-net", "c-net", "t-ada", "S2025A", "Wednesday 8:00-9:40", 30),
            offering("oc-db", "c-db", "t-ada", "S2025A", "Thursday 8:00-9:40", 30),
            offering("oc-eth", "c-eth", "t-ada", "S2025A", "Friday 8:00-9:40", 30),
            offering("oc-stat", "c-stat", "t-ada", "S2025A", "Monday 8:00-9:40", 30),
            offering("oc-last", "c-sem", "t-ada", "S2025A", "Thursday 14:00-15:40", 1),
            offering("oc-arch", "c-arch", "t-ada", "S2025A", "Friday 14:00-15:40", 30),
            offering("oc-lin", "c-lin", "t-gauss", "S2025A", "Monday 14:00-15:40", 30),
            offering("oc-mech", "c-mech", "t-curie", "S2025A", "Tuesday 14:00-15:40", 30),
            offering("oc-old", "c-db", "t-ada", "S2025S", "Friday 10:00-11:40", 30),
        ],
        active_semester: Some("S2025A".into()),
    }
}

/// The fixture plus `n` extra grade-2 CS students named `race-0`, `race-1`, ...
pub fn dataset_with_racers(n: usize) -> Dataset {
    let mut ds = dataset();
    ds.students
        .extend((0..n).map(|i| student(&format!("race-{i}"), "CS", 2024)));
    ds
}

pub fn memory_store() -> Arc<MemoryRegistrarStore> {
    Arc::new(MemoryRegistrarStore::seeded(&dataset()).unwrap())
}

pub fn coordinator_at<S: RegistrarStore + ?Sized>(
    store: Arc<S>,
    now: NaiveDateTime,
) -> SeatCoordinator<S> {
    SeatCoordinator::new(store).with_clock(Arc::new(FixedClock(now)))
}

pub fn coordinator<S: RegistrarStore + ?Sized>(store: Arc<S>) -> SeatCoordinator<S> {
    coordinator_at(store, in_window())
}

pub async fn seat_count<S: RegistrarStore + ?Sized>(store: &S, offered_id: &str) -> u32 {
    store
        .section(&offered_id.into())
        .await
        .unwrap()
        .unwrap()
        .current_count
}
