//! Student-facing course catalog.
//!
//! Two views over the active semester's sections:
//! - the student's own college, grouped by course name and annotated with
//!   the preview rules from [`crate::eligibility::display_selectable`];
//! - every other college, grouped by (college, course name), unannotated.
//!
//! Own-college courses are ordered in three tiers (has a selectable
//! section, already enrolled, neither), each by course name. Sections
//! inside a course go selectable-first, then by slot text.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use seat_ledger::{RegistrarStore, Section, Semester, StudentId};
use serde::Serialize;
use tracing::debug;

use crate::domain::{Ineligibility, Result, Standing, ValidationError};
use crate::eligibility::{academic_grade, display_selectable, window_open};
use crate::policy::EnrollmentPolicy;

/// Display tier of an own-college course; variant order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CourseTier {
    Selectable,
    Enrolled,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SectionView {
    #[serde(flatten)]
    pub section: Section,
    pub is_enrolled: bool,
    pub selectable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseGroup {
    pub course_name: String,
    pub college_name: String,
    pub credits: u32,
    pub target_grade: i32,
    pub tier: CourseTier,
    /// The student holds some section of this course name.
    pub already_enrolled: bool,
    /// Adding this course would pass the display ceiling.
    pub would_exceed_limit: bool,
    pub sections: Vec<SectionView>,
}

impl CourseGroup {
    pub fn selectable_sections(&self) -> impl Iterator<Item = &SectionView> {
        self.sections.iter().filter(|s| s.selectable)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OtherCollegeGroup {
    pub college_name: String,
    pub course_name: String,
    pub credits: u32,
    pub target_grade: i32,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Catalog {
    pub semester: Semester,
    /// The catalog is a preview and is produced even when this is false.
    pub window_open: bool,
    pub student_id: StudentId,
    pub student_grade: i32,
    pub enrolled: Vec<Section>,
    pub total_credits: u32,
    pub own_college: Vec<CourseGroup>,
    pub other_colleges: Vec<String>,
    pub other_college_groups: Vec<OtherCollegeGroup>,
}

/// Build the catalog for `student_id` as of `now`.
pub async fn build_catalog<S: RegistrarStore + ?Sized>(
    store: &S,
    student_id: &StudentId,
    now: NaiveDateTime,
    policy: &EnrollmentPolicy,
) -> Result<Catalog> {
    let student = store
        .student(student_id)
        .await?
        .ok_or_else(|| ValidationError::UnknownStudent(student_id.clone()))?;
    let semester = store
        .active_semester()
        .await?
        .ok_or(Ineligibility::NoActiveSemester)?;

    let sections = store.sections_in_semester(&semester.semester_id).await?;
    let standing = Standing::new(
        store
            .student_sections(student_id, &semester.semester_id)
            .await?,
    );
    let grade = academic_grade(student.enrollment_year, now.date());

    let (own, other): (Vec<Section>, Vec<Section>) = sections
        .into_iter()
        .partition(|s| s.college_id == student.college_id);

    // Own college, grouped by course name.
    let mut by_name: BTreeMap<String, Vec<Section>> = BTreeMap::new();
    for section in own {
        by_name
            .entry(section.course_name.clone())
            .or_default()
            .push(section);
    }

    let mut own_college: Vec<CourseGroup> = by_name
        .into_iter()
        .map(|(course_name, sections)| {
            let rep = &sections[0];
            let credits = rep.credits;
            let target_grade = rep.target_grade;
            let college_name = rep.college_name.clone();
            let already_enrolled = standing.holds_course_name(&course_name);

            let mut views: Vec<SectionView> = sections
                .into_iter()
                .map(|section| SectionView {
                    is_enrolled: standing.holds(&section.offered_id),
                    selectable: display_selectable(&student, grade, &section, &standing, policy),
                    section,
                })
                .collect();
            views.sort_by(|a, b| {
                (!a.selectable, &a.section.time_slot, &a.section.offered_id).cmp(&(
                    !b.selectable,
                    &b.section.time_slot,
                    &b.section.offered_id,
                ))
            });

            let tier = if views.iter().any(|v| v.selectable) {
                CourseTier::Selectable
            } else if already_enrolled {
                CourseTier::Enrolled
            } else {
                CourseTier::Unavailable
            };

            CourseGroup {
                course_name,
                college_name,
                credits,
                target_grade,
                tier,
                already_enrolled,
                would_exceed_limit: standing.total_credits + credits
                    > policy.catalog_credit_ceiling,
                sections: views,
            }
        })
        .collect();
    // Stable: names are already ascending within each tier.
    own_college.sort_by_key(|g| g.tier);

    // Other colleges, grouped by (college name, course name).
    let other_colleges: Vec<String> = other
        .iter()
        .map(|s| s.college_name.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut by_college: BTreeMap<(String, String), Vec<Section>> = BTreeMap::new();
    for section in other {
        by_college
            .entry((section.college_name.clone(), section.course_name.clone()))
            .or_default()
            .push(section);
    }
    let other_college_groups = by_college
        .into_iter()
        .map(|((college_name, course_name), mut sections)| {
            sections.sort_by(|a, b| (&a.time_slot, &a.offered_id).cmp(&(&b.time_slot, &b.offered_id)));
            let (credits, target_grade) = (sections[0].credits, sections[0].target_grade);
            OtherCollegeGroup {
                college_name,
                course_name,
                credits,
                target_grade,
                sections,
            }
        })
        .collect();

    debug!(
        student_id = %student_id,
        own_courses = own_college.len(),
        "catalog built"
    );

    Ok(Catalog {
        window_open: window_open(&semester, now, policy.enroll_window),
        semester,
        student_id: student_id.clone(),
        student_grade: grade,
        total_credits: standing.total_credits,
        enrolled: standing.sections,
        own_college,
        other_colleges,
        other_college_groups,
    })
}
