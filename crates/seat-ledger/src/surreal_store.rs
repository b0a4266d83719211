//! SurrealDB-backed registrar store
//!
//! Uses `schema::*Row` types for persistence, converting to/from
//! `records` types at the boundary. Seat operations run as single
//! SurrealQL transactions that `THROW` a marker on every refusal, so a
//! refused reservation never leaves a partial write behind.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use surrealdb::engine::any::Any;
use surrealdb::Surreal;
use tracing::{debug, info, instrument, warn};

use crate::error::StorageError;
use crate::handle::{connect, StoreConfig};
use crate::integrity::{check_dataset, KnownIds};
use crate::migrations;
use crate::records::*;
use crate::schema::*;
use crate::storage_traits::*;

/// Attempts after the first when SurrealDB reports a retryable conflict.
const MAX_CONFLICT_RETRIES: usize = 3;

const SECTION_FULL: &str = "section_full";
const ALREADY_ENROLLED: &str = "already_enrolled";
const OFFERING_NOT_FOUND: &str = "offering_not_found";
const NOT_ENROLLED: &str = "not_enrolled";
const STALE_STANDING: &str = "stale_standing";

const RESERVE_SEAT: &str = r#"
    BEGIN TRANSACTION;
    LET $offering = (SELECT capacity, current_count FROM type::thing('offered_course', $oid));
    IF array::len($offering) = 0 { THROW "offering_not_found"; };
    LET $standing = (SELECT VALUE version FROM type::thing('student_standing', $sid));
    IF (array::first($standing) ?? 0) != $seen { THROW "stale_standing"; };
    IF $offering[0].current_count >= $offering[0].capacity { THROW "section_full"; };
    LET $held = (SELECT student_id FROM type::thing('enrollment', [$sid, $oid]));
    IF array::len($held) > 0 { THROW "already_enrolled"; };
    LET $taken = (UPDATE type::thing('offered_course', $oid)
        SET current_count += 1
        WHERE current_count < capacity
        RETURN AFTER);
    IF array::len($taken) = 0 { THROW "section_full"; };
    CREATE type::thing('enrollment', [$sid, $oid]) CONTENT $row RETURN NONE;
    UPSERT type::thing('student_standing', $sid) SET student_id = $sid, version = $seen + 1 RETURN NONE;
    COMMIT TRANSACTION;
"#;

const RELEASE_SEAT: &str = r#"
    BEGIN TRANSACTION;
    LET $held = (SELECT student_id FROM type::thing('enrollment', [$sid, $oid]));
    IF array::len($held) = 0 { THROW "not_enrolled"; };
    DELETE type::thing('enrollment', [$sid, $oid]);
    UPDATE type::thing('offered_course', $oid)
        SET current_count -= 1
        WHERE current_count > 0
        RETURN NONE;
    LET $standing = (SELECT VALUE version FROM type::thing('student_standing', $sid));
    UPSERT type::thing('student_standing', $sid)
        SET student_id = $sid, version = (array::first($standing) ?? 0) + 1
        RETURN NONE;
    COMMIT TRANSACTION;
"#;

const LOAD_DATASET: &str = r#"
    BEGIN TRANSACTION;
    FOR $c IN $colleges { UPSERT type::thing('college', $c.college_id) CONTENT $c RETURN NONE; };
    FOR $t IN $teachers { UPSERT type::thing('teacher', $t.teacher_id) CONTENT $t RETURN NONE; };
    FOR $s IN $students { UPSERT type::thing('student', $s.student_id) CONTENT $s RETURN NONE; };
    FOR $c IN $courses { UPSERT type::thing('course', $c.course_id) CONTENT $c RETURN NONE; };
    FOR $s IN $semesters { UPSERT type::thing('semester', $s.semester_id) CONTENT $s RETURN NONE; };
    FOR $o IN $offerings { UPSERT type::thing('offered_course', $o.offered_id) MERGE $o RETURN NONE; };
    COMMIT TRANSACTION;
"#;

#[derive(Debug, Deserialize)]
struct StandingRow {
    #[serde(default)]
    version: u64,
}

#[derive(Debug, Deserialize)]
struct SeatCountRow {
    offered_id: String,
    #[serde(default)]
    current_count: u32,
}

/// Reference rows needed to join offerings into sections.
struct JoinMaps {
    courses: HashMap<String, Course>,
    teachers: HashMap<String, Teacher>,
    colleges: HashMap<String, College>,
}

impl JoinMaps {
    fn section(&self, offering: &OfferedCourse) -> StorageResult<Section> {
        let dangling = |what: &str, id: &str| {
            StorageError::Integrity(format!(
                "offering {} points at missing {what} {id}",
                offering.offered_id
            ))
        };
        let course = self
            .courses
            .get(offering.course_id.as_str())
            .ok_or_else(|| dangling("course", offering.course_id.as_str()))?;
        let teacher = self
            .teachers
            .get(offering.teacher_id.as_str())
            .ok_or_else(|| dangling("teacher", offering.teacher_id.as_str()))?;
        let college = self
            .colleges
            .get(course.college_id.as_str())
            .ok_or_else(|| dangling("college", course.college_id.as_str()))?;
        Ok(Section::assemble(offering, course, teacher, college))
    }
}

/// Which refusal marker, if any, a failed transaction carries.
fn seat_refusal(messages: &[String], student_id: &str, offered_id: &str) -> Option<StorageError> {
    let has = |marker: &str| messages.iter().any(|m| m.contains(marker));
    if has(OFFERING_NOT_FOUND) {
        Some(StorageError::OfferingNotFound {
            offered_id: offered_id.to_string(),
        })
    } else if has(STALE_STANDING) {
        Some(StorageError::StaleStanding {
            student_id: student_id.to_string(),
        })
    } else if has(SECTION_FULL) {
        Some(StorageError::SectionFull {
            offered_id: offered_id.to_string(),
        })
    } else if has(ALREADY_ENROLLED) {
        Some(StorageError::AlreadyEnrolled {
            student_id: student_id.to_string(),
            offered_id: offered_id.to_string(),
        })
    } else if has(NOT_ENROLLED) {
        Some(StorageError::NotEnrolled {
            student_id: student_id.to_string(),
            offered_id: offered_id.to_string(),
        })
    } else {
        None
    }
}

fn is_retryable(messages: &[String]) -> bool {
    messages.iter().any(|m| {
        let m = m.to_ascii_lowercase();
        m.contains("conflict") || m.contains("can be retried")
    })
}

/// SurrealDB-backed implementation of the registrar storage traits.
#[derive(Clone)]
pub struct SurrealRegistrarStore {
    db: Surreal<Any>,
}

impl SurrealRegistrarStore {
    /// Create an in-memory instance for testing.
    ///
    /// Connects to `mem://`, selects `registrar/main`, and runs `init_schema`.
    pub async fn in_memory() -> crate::Result<Self> {
        let store = Self::connect(&StoreConfig::in_memory()).await?;
        info!("SurrealRegistrarStore connected (in-memory)");
        Ok(store)
    }

    /// Connect with an explicit configuration and initialise the schema.
    pub async fn connect(config: &StoreConfig) -> crate::Result<Self> {
        let db = connect(config).await?;
        migrations::init_schema(&db).await?;
        Ok(Self { db })
    }

    /// Create from environment variables (see [`StoreConfig::from_env`]).
    pub async fn from_env() -> crate::Result<Self> {
        let config = StoreConfig::from_env();
        info!(url = %config.url, "SurrealRegistrarStore connecting");
        Self::connect(&config).await
    }

    // -- private helpers -----------------------------------------------------

    async fn row_by_id<T: DeserializeOwned>(
        &self,
        table: &'static str,
        id: &str,
    ) -> StorageResult<Option<T>> {
        let mut res = self
            .db
            .query("SELECT * FROM type::thing($tb, $id)")
            .bind(("tb", table))
            .bind(("id", id.to_string()))
            .await?;
        let rows: Vec<T> = res.take(0)?;
        Ok(rows.into_iter().next())
    }

    async fn join_maps(&self) -> StorageResult<JoinMaps> {
        let mut res = self
            .db
            .query("SELECT * FROM course; SELECT * FROM teacher; SELECT * FROM college;")
            .await?;
        let courses: Vec<CourseRow> = res.take(0)?;
        let teachers: Vec<TeacherRow> = res.take(1)?;
        let colleges: Vec<CollegeRow> = res.take(2)?;

        Ok(JoinMaps {
            courses: courses
                .into_iter()
                .map(|r| (r.course_id.clone(), Course::from(r)))
                .collect(),
            teachers: teachers
                .into_iter()
                .map(|r| (r.teacher_id.clone(), Teacher::from(r)))
                .collect(),
            colleges: colleges
                .into_iter()
                .map(|r| (r.college_id.clone(), College::from(r)))
                .collect(),
        })
    }

    async fn assemble(&self, rows: Vec<OfferedCourseRow>) -> StorageResult<Vec<Section>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let maps = self.join_maps().await?;
        let mut sections = rows
            .into_iter()
            .map(|row| maps.section(&OfferedCourse::from(row)))
            .collect::<StorageResult<Vec<_>>>()?;
        sort_sections(&mut sections);
        Ok(sections)
    }

    async fn known_ids(&self) -> StorageResult<KnownIds> {
        let mut res = self
            .db
            .query(
                "SELECT VALUE college_id FROM college; \
                 SELECT VALUE teacher_id FROM teacher; \
                 SELECT VALUE course_id FROM course; \
                 SELECT VALUE semester_id FROM semester; \
                 SELECT offered_id, current_count FROM offered_course;",
            )
            .await?;
        let colleges: Vec<String> = res.take(0)?;
        let teachers: Vec<String> = res.take(1)?;
        let courses: Vec<String> = res.take(2)?;
        let semesters: Vec<String> = res.take(3)?;
        let counts: Vec<SeatCountRow> = res.take(4)?;

        Ok(KnownIds {
            colleges: colleges.into_iter().collect(),
            teachers: teachers.into_iter().collect(),
            courses: courses.into_iter().collect(),
            semesters: semesters.into_iter().collect(),
            seat_counts: counts
                .into_iter()
                .map(|r| (r.offered_id, r.current_count))
                .collect(),
        })
    }

    /// Run a seat transaction, retrying on optimistic conflicts.
    ///
    /// `claim` carries the enrollment row and the standing version a
    /// reservation was checked against; releases pass `None`.
    async fn run_seat_transaction(
        &self,
        sql: &'static str,
        student_id: &StudentId,
        offered_id: &OfferedId,
        claim: Option<(EnrollmentRow, StandingVersion)>,
    ) -> StorageResult<()> {
        let mut attempt = 0;
        loop {
            let mut query = self
                .db
                .query(sql)
                .bind(("sid", student_id.0.clone()))
                .bind(("oid", offered_id.0.clone()));
            if let Some((row, seen)) = &claim {
                query = query.bind(("row", row.clone())).bind(("seen", seen.0));
            }
            let mut res = query.await?;

            let errors = res.take_errors();
            if errors.is_empty() {
                return Ok(());
            }
            let messages: Vec<String> = errors.into_values().map(|e| e.to_string()).collect();

            if let Some(refusal) = seat_refusal(&messages, student_id.as_str(), offered_id.as_str())
            {
                return Err(refusal);
            }
            if is_retryable(&messages) {
                if attempt < MAX_CONFLICT_RETRIES {
                    attempt += 1;
                    debug!(attempt, offered_id = %offered_id, "seat transaction conflict, retrying");
                    continue;
                }
                return Err(StorageError::Conflict(messages.join("; ")));
            }
            return Err(StorageError::Backend(messages.join("; ")));
        }
    }
}

#[async_trait]
impl ReferenceStore for SurrealRegistrarStore {
    async fn student(&self, student_id: &StudentId) -> StorageResult<Option<Student>> {
        let row: Option<StudentRow> = self.row_by_id(STUDENT, student_id.as_str()).await?;
        Ok(row.map(Student::from))
    }

    async fn section(&self, offered_id: &OfferedId) -> StorageResult<Option<Section>> {
        let Some(row) = self
            .row_by_id::<OfferedCourseRow>(OFFERED_COURSE, offered_id.as_str())
            .await?
        else {
            return Ok(None);
        };
        let offering = OfferedCourse::from(row);

        let course: Course = self
            .row_by_id::<CourseRow>(COURSE, offering.course_id.as_str())
            .await?
            .map(Course::from)
            .ok_or_else(|| {
                StorageError::Integrity(format!(
                    "offering {offered_id} points at missing course {}",
                    offering.course_id
                ))
            })?;
        let teacher: Teacher = self
            .row_by_id::<TeacherRow>(TEACHER, offering.teacher_id.as_str())
            .await?
            .map(Teacher::from)
            .ok_or_else(|| {
                StorageError::Integrity(format!(
                    "offering {offered_id} points at missing teacher {}",
                    offering.teacher_id
                ))
            })?;
        let college: College = self
            .row_by_id::<CollegeRow>(COLLEGE, course.college_id.as_str())
            .await?
            .map(College::from)
            .ok_or_else(|| {
                StorageError::Integrity(format!(
                    "course {} points at missing college {}",
                    course.course_id, course.college_id
                ))
            })?;

        Ok(Some(Section::assemble(&offering, &course, &teacher, &college)))
    }

    async fn semester(&self, semester_id: &SemesterId) -> StorageResult<Option<Semester>> {
        let row: Option<SemesterRow> = self.row_by_id(SEMESTER, semester_id.as_str()).await?;
        Ok(row.map(Semester::from))
    }

    async fn active_semester(&self) -> StorageResult<Option<Semester>> {
        let mut res = self
            .db
            .query("SELECT * FROM registrar_settings:active")
            .await?;
        let rows: Vec<SettingsRow> = res.take(0)?;
        match rows.into_iter().next().and_then(|r| r.active_semester) {
            Some(id) => self.semester(&SemesterId(id)).await,
            None => Ok(None),
        }
    }

    async fn sections_in_semester(&self, semester_id: &SemesterId) -> StorageResult<Vec<Section>> {
        let mut res = self
            .db
            .query("SELECT * FROM offered_course WHERE semester_id = $sem")
            .bind(("sem", semester_id.0.clone()))
            .await?;
        let rows: Vec<OfferedCourseRow> = res.take(0)?;
        self.assemble(rows).await
    }
}

#[async_trait]
impl EnrollmentLedger for SurrealRegistrarStore {
    async fn enrollment(
        &self,
        student_id: &StudentId,
        offered_id: &OfferedId,
    ) -> StorageResult<Option<EnrollmentRecord>> {
        let mut res = self
            .db
            .query("SELECT * FROM type::thing('enrollment', [$sid, $oid])")
            .bind(("sid", student_id.0.clone()))
            .bind(("oid", offered_id.0.clone()))
            .await?;
        let rows: Vec<EnrollmentRow> = res.take(0)?;
        Ok(rows.into_iter().next().map(EnrollmentRecord::from))
    }

    async fn student_sections(
        &self,
        student_id: &StudentId,
        semester_id: &SemesterId,
    ) -> StorageResult<Vec<Section>> {
        let mut res = self
            .db
            .query("SELECT VALUE offered_id FROM enrollment WHERE student_id = $sid")
            .bind(("sid", student_id.0.clone()))
            .await?;
        let held: Vec<String> = res.take(0)?;
        if held.is_empty() {
            return Ok(Vec::new());
        }
        let held: HashSet<String> = held.into_iter().collect();

        let mut res = self
            .db
            .query("SELECT * FROM offered_course WHERE semester_id = $sem")
            .bind(("sem", semester_id.0.clone()))
            .await?;
        let rows: Vec<OfferedCourseRow> = res.take(0)?;
        let rows = rows
            .into_iter()
            .filter(|r| held.contains(&r.offered_id))
            .collect();
        self.assemble(rows).await
    }

    async fn roster(&self, offered_id: &OfferedId) -> StorageResult<Vec<EnrollmentRecord>> {
        let mut res = self
            .db
            .query("SELECT * FROM enrollment WHERE offered_id = $oid ORDER BY student_id ASC")
            .bind(("oid", offered_id.0.clone()))
            .await?;
        let rows: Vec<EnrollmentRow> = res.take(0)?;
        Ok(rows.into_iter().map(EnrollmentRecord::from).collect())
    }

    async fn standing_version(&self, student_id: &StudentId) -> StorageResult<StandingVersion> {
        let row: Option<StandingRow> = self
            .row_by_id("student_standing", student_id.as_str())
            .await?;
        Ok(StandingVersion(row.map(|r| r.version).unwrap_or(0)))
    }

    #[instrument(
        skip(self),
        fields(student_id = %student_id, offered_id = %offered_id, seen = seen.0)
    )]
    async fn reserve_seat(
        &self,
        student_id: &StudentId,
        offered_id: &OfferedId,
        at: NaiveDateTime,
        seen: StandingVersion,
    ) -> StorageResult<EnrollmentRecord> {
        let record = EnrollmentRecord::new(student_id.clone(), offered_id.clone(), at);
        self.run_seat_transaction(
            RESERVE_SEAT,
            student_id,
            offered_id,
            Some((EnrollmentRow::from(&record), seen)),
        )
        .await?;
        debug!("seat reserved");
        Ok(record)
    }

    #[instrument(skip(self), fields(student_id = %student_id, offered_id = %offered_id))]
    async fn release_seat(
        &self,
        student_id: &StudentId,
        offered_id: &OfferedId,
    ) -> StorageResult<EnrollmentRecord> {
        let held =
            self.enrollment(student_id, offered_id)
                .await?
                .ok_or_else(|| StorageError::NotEnrolled {
                    student_id: student_id.0.clone(),
                    offered_id: offered_id.0.clone(),
                })?;
        self.run_seat_transaction(RELEASE_SEAT, student_id, offered_id, None)
            .await?;
        debug!("seat released");
        Ok(held)
    }
}

#[async_trait]
impl ReferenceLoader for SurrealRegistrarStore {
    #[instrument(skip_all, fields(offerings = dataset.offerings.len(), students = dataset.students.len()))]
    async fn load_dataset(&self, dataset: &Dataset) -> StorageResult<()> {
        check_dataset(dataset, self.known_ids().await?)?;

        let colleges: Vec<CollegeRow> = dataset.colleges.iter().map(CollegeRow::from).collect();
        let teachers: Vec<TeacherRow> = dataset.teachers.iter().map(TeacherRow::from).collect();
        let students: Vec<StudentRow> = dataset.students.iter().map(StudentRow::from).collect();
        let courses: Vec<CourseRow> = dataset.courses.iter().map(CourseRow::from).collect();
        let semesters: Vec<SemesterRow> =
            dataset.semesters.iter().map(SemesterRow::from).collect();
        let offerings: Vec<OfferingUpsert> =
            dataset.offerings.iter().map(OfferingUpsert::from).collect();

        let mut res = self
            .db
            .query(LOAD_DATASET)
            .bind(("colleges", colleges))
            .bind(("teachers", teachers))
            .bind(("students", students))
            .bind(("courses", courses))
            .bind(("semesters", semesters))
            .bind(("offerings", offerings))
            .await?;
        let errors = res.take_errors();
        if !errors.is_empty() {
            let messages: Vec<String> = errors.into_values().map(|e| e.to_string()).collect();
            warn!(errors = %messages.join("; "), "dataset load rolled back");
            return Err(StorageError::Backend(messages.join("; ")));
        }

        if let Some(active) = &dataset.active_semester {
            self.set_active_semester(Some(active)).await?;
        }
        info!("dataset loaded");
        Ok(())
    }

    async fn set_active_semester(&self, semester_id: Option<&SemesterId>) -> StorageResult<()> {
        if let Some(id) = semester_id {
            if self.semester(id).await?.is_none() {
                return Err(StorageError::UnknownReference {
                    kind: "pointer",
                    id: "active_semester".to_string(),
                    target: "semester",
                    target_id: id.0.clone(),
                });
            }
        }
        self.db
            .query("UPSERT registrar_settings:active SET active_semester = $sem RETURN NONE")
            .bind(("sem", semester_id.map(|id| id.0.clone())))
            .await?
            .check()?;
        Ok(())
    }
}
