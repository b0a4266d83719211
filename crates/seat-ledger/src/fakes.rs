//! In-memory fakes for storage traits (testing only)
//!
//! Provides `MemoryRegistrarStore`, which satisfies the `ReferenceStore`,
//! `EnrollmentLedger` and `ReferenceLoader` contracts without any external
//! dependencies. Every trait call runs inside a single critical section, so
//! the seat operations are atomic by construction.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::NaiveDateTime;

use crate::error::StorageError;
use crate::integrity::{check_dataset, KnownIds};
use crate::records::*;
use crate::storage_traits::*;

#[derive(Debug, Default)]
struct Tables {
    colleges: HashMap<CollegeId, College>,
    teachers: HashMap<TeacherId, Teacher>,
    students: HashMap<StudentId, Student>,
    courses: HashMap<CourseId, Course>,
    semesters: HashMap<SemesterId, Semester>,
    offerings: HashMap<OfferedId, OfferedCourse>,
    enrollments: BTreeMap<(StudentId, OfferedId), EnrollmentRecord>,
    standing: HashMap<StudentId, StandingVersion>,
    active_semester: Option<SemesterId>,
}

impl Tables {
    fn section(&self, offering: &OfferedCourse) -> StorageResult<Section> {
        let dangling = |what: &str, id: &str| {
            StorageError::Integrity(format!(
                "offering {} points at missing {what} {id}",
                offering.offered_id
            ))
        };
        let course = self
            .courses
            .get(&offering.course_id)
            .ok_or_else(|| dangling("course", offering.course_id.as_str()))?;
        let teacher = self
            .teachers
            .get(&offering.teacher_id)
            .ok_or_else(|| dangling("teacher", offering.teacher_id.as_str()))?;
        let college = self
            .colleges
            .get(&course.college_id)
            .ok_or_else(|| dangling("college", course.college_id.as_str()))?;
        Ok(Section::assemble(offering, course, teacher, college))
    }

    fn standing_of(&self, student_id: &StudentId) -> StandingVersion {
        self.standing.get(student_id).copied().unwrap_or_default()
    }

    fn bump_standing(&mut self, student_id: &StudentId) {
        let next = self.standing_of(student_id).next();
        self.standing.insert(student_id.clone(), next);
    }

    fn known_ids(&self) -> KnownIds {
        KnownIds {
            colleges: self.colleges.keys().map(|k| k.0.clone()).collect(),
            teachers: self.teachers.keys().map(|k| k.0.clone()).collect(),
            courses: self.courses.keys().map(|k| k.0.clone()).collect(),
            semesters: self.semesters.keys().map(|k| k.0.clone()).collect(),
            seat_counts: self
                .offerings
                .values()
                .map(|o| (o.offered_id.0.clone(), o.current_count))
                .collect(),
        }
    }

    fn load(&mut self, dataset: &Dataset) -> StorageResult<()> {
        check_dataset(dataset, self.known_ids())?;

        for c in &dataset.colleges {
            self.colleges.insert(c.college_id.clone(), c.clone());
        }
        for t in &dataset.teachers {
            self.teachers.insert(t.teacher_id.clone(), t.clone());
        }
        for s in &dataset.students {
            self.students.insert(s.student_id.clone(), s.clone());
        }
        for c in &dataset.courses {
            self.courses.insert(c.course_id.clone(), c.clone());
        }
        for s in &dataset.semesters {
            self.semesters.insert(s.semester_id.clone(), s.clone());
        }
        for o in &dataset.offerings {
            let stored = self
                .offerings
                .get(&o.offered_id)
                .map(|existing| existing.current_count)
                .unwrap_or(0);
            let mut row = o.clone();
            row.current_count = stored;
            self.offerings.insert(row.offered_id.clone(), row);
        }
        if let Some(active) = &dataset.active_semester {
            self.active_semester = Some(active.clone());
        }
        Ok(())
    }
}

/// In-memory registrar store backed by `HashMap`s behind one `Mutex`.
#[derive(Debug, Default)]
pub struct MemoryRegistrarStore {
    tables: Mutex<Tables>,
}

impl MemoryRegistrarStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store preloaded with `dataset`.
    pub fn seeded(dataset: &Dataset) -> StorageResult<Self> {
        let store = Self::new();
        store.tables.lock().unwrap().load(dataset)?;
        Ok(store)
    }

    /// Overwrite a stored seat count without touching enrollments.
    ///
    /// Only for exercising drift detection; the seat operations never
    /// call this.
    pub fn overwrite_seat_count(&self, offered_id: &OfferedId, count: u32) -> StorageResult<()> {
        let mut tables = self.tables.lock().unwrap();
        let offering =
            tables
                .offerings
                .get_mut(offered_id)
                .ok_or_else(|| StorageError::OfferingNotFound {
                    offered_id: offered_id.0.clone(),
                })?;
        offering.current_count = count;
        Ok(())
    }
}

#[async_trait]
impl ReferenceStore for MemoryRegistrarStore {
    async fn student(&self, student_id: &StudentId) -> StorageResult<Option<Student>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.students.get(student_id).cloned())
    }

    async fn section(&self, offered_id: &OfferedId) -> StorageResult<Option<Section>> {
        let tables = self.tables.lock().unwrap();
        tables
            .offerings
            .get(offered_id)
            .map(|o| tables.section(o))
            .transpose()
    }

    async fn semester(&self, semester_id: &SemesterId) -> StorageResult<Option<Semester>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.semesters.get(semester_id).cloned())
    }

    async fn active_semester(&self) -> StorageResult<Option<Semester>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .active_semester
            .as_ref()
            .and_then(|id| tables.semesters.get(id))
            .cloned())
    }

    async fn sections_in_semester(&self, semester_id: &SemesterId) -> StorageResult<Vec<Section>> {
        let tables = self.tables.lock().unwrap();
        let mut sections = tables
            .offerings
            .values()
            .filter(|o| &o.semester_id == semester_id)
            .map(|o| tables.section(o))
            .collect::<StorageResult<Vec<_>>>()?;
        sort_sections(&mut sections);
        Ok(sections)
    }
}

#[async_trait]
impl EnrollmentLedger for MemoryRegistrarStore {
    async fn enrollment(
        &self,
        student_id: &StudentId,
        offered_id: &OfferedId,
    ) -> StorageResult<Option<EnrollmentRecord>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .enrollments
            .get(&(student_id.clone(), offered_id.clone()))
            .cloned())
    }

    async fn student_sections(
        &self,
        student_id: &StudentId,
        semester_id: &SemesterId,
    ) -> StorageResult<Vec<Section>> {
        let tables = self.tables.lock().unwrap();
        let mut sections = Vec::new();
        for (sid, oid) in tables.enrollments.keys() {
            if sid != student_id {
                continue;
            }
            let Some(offering) = tables.offerings.get(oid) else {
                continue;
            };
            if &offering.semester_id == semester_id {
                sections.push(tables.section(offering)?);
            }
        }
        sort_sections(&mut sections);
        Ok(sections)
    }

    async fn roster(&self, offered_id: &OfferedId) -> StorageResult<Vec<EnrollmentRecord>> {
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .enrollments
            .values()
            .filter(|e| &e.offered_id == offered_id)
            .cloned()
            .collect())
    }

    async fn standing_version(&self, student_id: &StudentId) -> StorageResult<StandingVersion> {
        let tables = self.tables.lock().unwrap();
        Ok(tables.standing_of(student_id))
    }

    async fn reserve_seat(
        &self,
        student_id: &StudentId,
        offered_id: &OfferedId,
        at: NaiveDateTime,
        seen: StandingVersion,
    ) -> StorageResult<EnrollmentRecord> {
        let mut tables = self.tables.lock().unwrap();
        let key = (student_id.clone(), offered_id.clone());

        let offering =
            tables
                .offerings
                .get(offered_id)
                .ok_or_else(|| StorageError::OfferingNotFound {
                    offered_id: offered_id.0.clone(),
                })?;
        if tables.standing_of(student_id) != seen {
            return Err(StorageError::StaleStanding {
                student_id: student_id.0.clone(),
            });
        }
        if offering.current_count >= offering.capacity {
            return Err(StorageError::SectionFull {
                offered_id: offered_id.0.clone(),
            });
        }
        if tables.enrollments.contains_key(&key) {
            return Err(StorageError::AlreadyEnrolled {
                student_id: student_id.0.clone(),
                offered_id: offered_id.0.clone(),
            });
        }

        let record = EnrollmentRecord::new(student_id.clone(), offered_id.clone(), at);
        if let Some(offering) = tables.offerings.get_mut(offered_id) {
            offering.current_count += 1;
        }
        tables.enrollments.insert(key, record.clone());
        tables.bump_standing(student_id);
        Ok(record)
    }

    async fn release_seat(
        &self,
        student_id: &StudentId,
        offered_id: &OfferedId,
    ) -> StorageResult<EnrollmentRecord> {
        let mut tables = self.tables.lock().unwrap();
        let removed = tables
            .enrollments
            .remove(&(student_id.clone(), offered_id.clone()))
            .ok_or_else(|| StorageError::NotEnrolled {
                student_id: student_id.0.clone(),
                offered_id: offered_id.0.clone(),
            })?;
        if let Some(offering) = tables.offerings.get_mut(offered_id) {
            offering.current_count = offering.current_count.saturating_sub(1);
        }
        tables.bump_standing(student_id);
        Ok(removed)
    }
}

#[async_trait]
impl ReferenceLoader for MemoryRegistrarStore {
    async fn load_dataset(&self, dataset: &Dataset) -> StorageResult<()> {
        let mut tables = self.tables.lock().unwrap();
        tables.load(dataset)
    }

    async fn set_active_semester(&self, semester_id: Option<&SemesterId>) -> StorageResult<()> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(id) = semester_id {
            if !tables.semesters.contains_key(id) {
                return Err(StorageError::UnknownReference {
                    kind: "pointer",
                    id: "active_semester".to_string(),
                    target: "semester",
                    target_id: id.0.clone(),
                });
            }
        }
        tables.active_semester = semester_id.cloned();
        Ok(())
    }
}
