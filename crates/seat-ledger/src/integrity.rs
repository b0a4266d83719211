//! Referential checks applied before a dataset is written

use std::collections::{HashMap, HashSet};

use crate::error::StorageError;
use crate::records::*;
use crate::storage_traits::StorageResult;

/// IDs already present in a store, plus stored seat counts.
#[derive(Debug, Default)]
pub(crate) struct KnownIds {
    pub colleges: HashSet<String>,
    pub teachers: HashSet<String>,
    pub courses: HashSet<String>,
    pub semesters: HashSet<String>,
    pub seat_counts: HashMap<String, u32>,
}

impl KnownIds {
    fn absorb(&mut self, dataset: &Dataset) {
        self.colleges
            .extend(dataset.colleges.iter().map(|c| c.college_id.0.clone()));
        self.teachers
            .extend(dataset.teachers.iter().map(|t| t.teacher_id.0.clone()));
        self.courses
            .extend(dataset.courses.iter().map(|c| c.course_id.0.clone()));
        self.semesters
            .extend(dataset.semesters.iter().map(|s| s.semester_id.0.clone()));
    }
}

fn require(
    known: &HashSet<String>,
    kind: &'static str,
    id: &str,
    target: &'static str,
    target_id: &str,
) -> StorageResult<()> {
    if known.contains(target_id) {
        Ok(())
    } else {
        Err(StorageError::UnknownReference {
            kind,
            id: id.to_string(),
            target,
            target_id: target_id.to_string(),
        })
    }
}

/// Validate `dataset` against itself and the rows already stored.
pub(crate) fn check_dataset(dataset: &Dataset, mut known: KnownIds) -> StorageResult<()> {
    known.absorb(dataset);

    for teacher in &dataset.teachers {
        require(
            &known.colleges,
            "teacher",
            teacher.teacher_id.as_str(),
            "college",
            teacher.college_id.as_str(),
        )?;
    }
    for student in &dataset.students {
        require(
            &known.colleges,
            "student",
            student.student_id.as_str(),
            "college",
            student.college_id.as_str(),
        )?;
    }
    for course in &dataset.courses {
        require(
            &known.colleges,
            "course",
            course.course_id.as_str(),
            "college",
            course.college_id.as_str(),
        )?;
    }
    for semester in &dataset.semesters {
        if semester.selection_start > semester.selection_end {
            return Err(StorageError::Integrity(format!(
                "semester {} selection window ends before it starts",
                semester.semester_id
            )));
        }
    }
    for offering in &dataset.offerings {
        let id = offering.offered_id.as_str();
        require(&known.courses, "offering", id, "course", offering.course_id.as_str())?;
        require(&known.teachers, "offering", id, "teacher", offering.teacher_id.as_str())?;
        require(
            &known.semesters,
            "offering",
            id,
            "semester",
            offering.semester_id.as_str(),
        )?;
        if let Some(&stored) = known.seat_counts.get(id) {
            if offering.capacity < stored {
                return Err(StorageError::Integrity(format!(
                    "offering {id} capacity {} is below its {stored} enrolled students",
                    offering.capacity
                )));
            }
        }
    }
    if let Some(active) = &dataset.active_semester {
        require(
            &known.semesters,
            "dataset",
            "active_semester",
            "semester",
            active.as_str(),
        )?;
    }
    Ok(())
}
