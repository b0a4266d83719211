//! Seat-count reconciliation.
//!
//! `current_count` duplicates the roster size. The seat operations keep the
//! two in lockstep; this audit confirms it after the fact. It only reads,
//! and nothing on the enroll/drop path depends on it.

use seat_ledger::{OfferedId, RegistrarStore, SemesterId};
use serde::Serialize;
use tracing::info;

use crate::domain::Result;
use crate::obs::emit_audit_drift;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum DriftIssue {
    /// Stored count differs from the number of enrollment rows.
    CountMismatch { stored: u32, roster: u32 },
    /// Stored count is above capacity.
    OverCapacity { stored: u32, capacity: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatDrift {
    pub offered_id: OfferedId,
    pub course_name: String,
    pub issues: Vec<DriftIssue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuditReport {
    pub semester_id: SemesterId,
    pub sections_checked: usize,
    pub drifts: Vec<SeatDrift>,
}

impl AuditReport {
    pub fn is_clean(&self) -> bool {
        self.drifts.is_empty()
    }
}

/// Compare every section's stored count with its roster and capacity.
pub async fn audit_seat_counts<S: RegistrarStore + ?Sized>(
    store: &S,
    semester_id: &SemesterId,
) -> Result<AuditReport> {
    let sections = store.sections_in_semester(semester_id).await?;
    let mut drifts = Vec::new();

    for section in &sections {
        let roster = u32::try_from(store.roster(&section.offered_id).await?.len())
            .unwrap_or(u32::MAX);
        let mut issues = Vec::new();
        if section.current_count != roster {
            issues.push(DriftIssue::CountMismatch {
                stored: section.current_count,
                roster,
            });
        }
        if section.current_count > section.capacity {
            issues.push(DriftIssue::OverCapacity {
                stored: section.current_count,
                capacity: section.capacity,
            });
        }
        if issues.is_empty() {
            continue;
        }

        emit_audit_drift(
            section.offered_id.as_str(),
            section.current_count,
            roster,
            section.capacity,
        );
        drifts.push(SeatDrift {
            offered_id: section.offered_id.clone(),
            course_name: section.course_name.clone(),
            issues,
        });
    }

    info!(
        semester_id = %semester_id,
        sections = sections.len(),
        drifts = drifts.len(),
        "seat-count audit finished"
    );
    Ok(AuditReport {
        semester_id: semester_id.clone(),
        sections_checked: sections.len(),
        drifts,
    })
}
