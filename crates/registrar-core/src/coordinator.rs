//! Seat reservation coordinator.
//!
//! The only writer of enrollments and seat counts. Each `enroll` re-reads
//! fresh state, runs the selection rules, then asks the ledger for one
//! atomic conditional reserve; `drop` is the reverse.
//!
//! Serialization happens at two levels:
//! - in process, a keyed lock table orders requests per student and per
//!   section (student lock first, then section lock);
//! - in storage, `reserve_seat` only increments while `current_count <
//!   capacity`, and only commits while the student's standing version
//!   still matches the one the rules were checked against. Both guards
//!   stay authoritative when several processes share one database.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveDateTime;
use seat_ledger::{
    EnrollmentRecord, OfferedId, RegistrarStore, Semester, StorageError, Student, StudentId,
};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

use crate::catalog::{build_catalog, Catalog};
use crate::clock::{Clock, SystemClock};
use crate::domain::{Ineligibility, RegistrarError, Result, Standing, ValidationError};
use crate::eligibility::{check_drop, check_enroll, EnrollSnapshot, Eligibility};
use crate::metrics::METRICS;
use crate::obs::{
    emit_drop_committed, emit_enroll_capacity_conflict, emit_enroll_committed,
    emit_enroll_rejected, SeatSpan,
};
use crate::policy::EnrollmentPolicy;
use crate::timetable::{build_timetable, Timetable};

/// Re-checks after a reservation lost the standing race to another writer.
const MAX_STANDING_RETRIES: usize = 3;

/// Unused lock slots are pruned once the table grows past this size.
const LOCK_TABLE_PRUNE_AT: usize = 4096;

/// Per-key async mutexes, created on demand.
#[derive(Default)]
struct KeyedLocks {
    slots: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    async fn acquire(&self, key: String) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().await;
            if slots.len() >= LOCK_TABLE_PRUNE_AT {
                slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            }
            Arc::clone(slots.entry(key).or_default())
        };
        slot.lock_owned().await
    }
}

fn require_id(value: &str, field: &'static str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ValidationError::EmptyIdentifier { field }.into());
    }
    Ok(())
}

/// Enroll/drop entry point over any registrar store.
pub struct SeatCoordinator<S: ?Sized> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    policy: EnrollmentPolicy,
    locks: KeyedLocks,
}

impl<S: RegistrarStore + ?Sized> SeatCoordinator<S> {
    /// Wall clock and the default policy.
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            clock: Arc::new(SystemClock),
            policy: EnrollmentPolicy::default(),
            locks: KeyedLocks::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_policy(mut self, policy: EnrollmentPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn policy(&self) -> &EnrollmentPolicy {
        &self.policy
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    // -- reads ---------------------------------------------------------------

    async fn student(&self, student_id: &StudentId) -> Result<Student> {
        self.store
            .student(student_id)
            .await?
            .ok_or_else(|| ValidationError::UnknownStudent(student_id.clone()).into())
    }

    async fn standing(&self, student_id: &StudentId, active: Option<&Semester>) -> Result<Standing> {
        let Some(active) = active else {
            return Ok(Standing::default());
        };
        let sections = self
            .store
            .student_sections(student_id, &active.semester_id)
            .await?;
        Ok(Standing::new(sections))
    }

    async fn snapshot(&self, student_id: &StudentId, offered_id: &OfferedId) -> Result<EnrollSnapshot> {
        let student = self.student(student_id).await?;
        let section = self
            .store
            .section(offered_id)
            .await?
            .ok_or_else(|| ValidationError::UnknownOffering(offered_id.clone()))?;
        let active = self.store.active_semester().await?;
        let standing = self.standing(student_id, active.as_ref()).await?;
        Ok(EnrollSnapshot {
            student,
            section,
            active,
            standing,
        })
    }

    /// Read-only: would `enroll` pass the selection rules right now?
    pub async fn evaluate(&self, student_id: &StudentId, offered_id: &OfferedId) -> Result<Eligibility> {
        require_id(student_id.as_str(), "student_id")?;
        require_id(offered_id.as_str(), "offered_id")?;

        let snapshot = self.snapshot(student_id, offered_id).await?;
        let check = check_enroll(&snapshot, self.clock.now(), &self.policy);
        Ok(Eligibility::from_check(offered_id.clone(), check))
    }

    /// The student's sections in the active semester.
    pub async fn enrolled_sections(&self, student_id: &StudentId) -> Result<(Semester, Standing)> {
        require_id(student_id.as_str(), "student_id")?;
        self.student(student_id).await?;

        let active = self
            .store
            .active_semester()
            .await?
            .ok_or(Ineligibility::NoActiveSemester)?;
        let standing = self.standing(student_id, Some(&active)).await?;
        Ok((active, standing))
    }

    /// Catalog preview for one student.
    pub async fn catalog(&self, student_id: &StudentId) -> Result<Catalog> {
        require_id(student_id.as_str(), "student_id")?;
        build_catalog(self.store.as_ref(), student_id, self.clock.now(), &self.policy).await
    }

    /// Weekly grid of the student's active-semester sections.
    pub async fn timetable(&self, student_id: &StudentId) -> Result<Timetable> {
        let (semester, standing) = self.enrolled_sections(student_id).await?;
        Ok(build_timetable(&semester, &standing.sections))
    }

    // -- writes --------------------------------------------------------------

    /// Take a seat in `offered_id` for `student_id`.
    pub async fn enroll(&self, student_id: &StudentId, offered_id: &OfferedId) -> Result<EnrollmentRecord> {
        require_id(student_id.as_str(), "student_id")?;
        require_id(offered_id.as_str(), "offered_id")?;

        SeatSpan::new("enroll", student_id.as_str(), offered_id.as_str())
            .in_scope(self.enroll_serialized(student_id, offered_id))
            .await
    }

    async fn enroll_serialized(
        &self,
        student_id: &StudentId,
        offered_id: &OfferedId,
    ) -> Result<EnrollmentRecord> {
        let _student_guard = self.locks.acquire(format!("student:{student_id}")).await;
        let _section_guard = self.locks.acquire(format!("offering:{offered_id}")).await;
        debug!("seat locks acquired");

        let mut attempt = 0;
        loop {
            // Read the version before the snapshot so any write that lands
            // in between is caught at commit.
            let seen = self.store.standing_version(student_id).await?;
            let snapshot = self.snapshot(student_id, offered_id).await?;
            let now = self.clock.now();
            if let Err(reason) = check_enroll(&snapshot, now, &self.policy) {
                METRICS.inc_rejections();
                emit_enroll_rejected(student_id.as_str(), offered_id.as_str(), &reason);
                return Err(reason.into());
            }

            match self.store.reserve_seat(student_id, offered_id, now, seen).await {
                Err(StorageError::StaleStanding { .. }) if attempt < MAX_STANDING_RETRIES => {
                    attempt += 1;
                    debug!(attempt, "standing changed under the check, re-evaluating");
                }
                outcome => {
                    return self.settle_reservation(student_id, offered_id, &snapshot, outcome)
                }
            }
        }
    }

    fn settle_reservation(
        &self,
        student_id: &StudentId,
        offered_id: &OfferedId,
        snapshot: &EnrollSnapshot,
        outcome: std::result::Result<EnrollmentRecord, StorageError>,
    ) -> Result<EnrollmentRecord> {
        match outcome {
            Ok(record) => {
                METRICS.inc_enrollments();
                emit_enroll_committed(
                    student_id.as_str(),
                    offered_id.as_str(),
                    snapshot.section.credits,
                );
                Ok(record)
            }
            Err(StorageError::SectionFull { .. }) => {
                METRICS.inc_capacity_conflicts();
                emit_enroll_capacity_conflict(student_id.as_str(), offered_id.as_str());
                Err(RegistrarError::CapacityConflict {
                    offered_id: offered_id.clone(),
                })
            }
            Err(StorageError::AlreadyEnrolled { .. }) => {
                let reason = Ineligibility::AlreadyEnrolled;
                METRICS.inc_rejections();
                emit_enroll_rejected(student_id.as_str(), offered_id.as_str(), &reason);
                Err(reason.into())
            }
            Err(StorageError::OfferingNotFound { .. }) => {
                Err(ValidationError::UnknownOffering(offered_id.clone()).into())
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Give back the seat `student_id` holds in `offered_id`.
    ///
    /// The drop window is checked before the enrollment is looked up, so a
    /// closed window reports `OutsideSelectionWindow` even for sections the
    /// student never held.
    pub async fn drop(&self, student_id: &StudentId, offered_id: &OfferedId) -> Result<EnrollmentRecord> {
        require_id(student_id.as_str(), "student_id")?;
        require_id(offered_id.as_str(), "offered_id")?;

        SeatSpan::new("drop", student_id.as_str(), offered_id.as_str())
            .in_scope(self.drop_serialized(student_id, offered_id))
            .await
    }

    async fn drop_serialized(
        &self,
        student_id: &StudentId,
        offered_id: &OfferedId,
    ) -> Result<EnrollmentRecord> {
        let _student_guard = self.locks.acquire(format!("student:{student_id}")).await;
        let _section_guard = self.locks.acquire(format!("offering:{offered_id}")).await;

        self.student(student_id).await?;
        let section = self
            .store
            .section(offered_id)
            .await?
            .ok_or_else(|| ValidationError::UnknownOffering(offered_id.clone()))?;
        let active = self.store.active_semester().await?;

        if let Err(reason) = check_drop(active.as_ref(), &section, self.clock.now(), &self.policy) {
            METRICS.inc_rejections();
            return Err(reason.into());
        }

        match self.store.release_seat(student_id, offered_id).await {
            Ok(record) => {
                METRICS.inc_drops();
                emit_drop_committed(student_id.as_str(), offered_id.as_str());
                Ok(record)
            }
            Err(StorageError::NotEnrolled { .. }) => Err(RegistrarError::NotEnrolled {
                student_id: student_id.clone(),
                offered_id: offered_id.clone(),
            }),
            Err(other) => Err(other.into()),
        }
    }
}
