//! Structured observability hooks for enroll/drop lifecycle events.
//!
//! This module provides:
//! - Request-scoped tracing spans via `SeatSpan`
//! - Emission functions for outcomes: committed, rejected, capacity conflict,
//!   drop committed, and seat-count drift found by an audit
//!
//! Events are emitted at `info!` level, drift and conflicts at `warn!`
//! (filter with `RUST_LOG`).

use std::future::Future;

use tracing::instrument::Instrumented;
use tracing::{info, warn, Instrument};

use crate::domain::Ineligibility;

/// Request-scoped span tagged with the operation, student and section.
///
/// The span is attached to the request future rather than entered, so it
/// follows the request across `.await` points and worker threads.
///
/// # Example
///
/// ```ignore
/// SeatSpan::new("enroll", "2023001", "oc-42")
///     .in_scope(async { /* every event here carries op/student_id/offered_id */ })
///     .await;
/// ```
pub struct SeatSpan {
    span: tracing::Span,
}

impl SeatSpan {
    pub fn new(op: &'static str, student_id: &str, offered_id: &str) -> Self {
        Self {
            span: tracing::info_span!(
                "registrar.seat",
                op = op,
                student_id = %student_id,
                offered_id = %offered_id
            ),
        }
    }

    pub fn in_scope<F: Future>(self, fut: F) -> Instrumented<F> {
        fut.instrument(self.span)
    }
}

/// Emit event: enrollment committed.
pub fn emit_enroll_committed(student_id: &str, offered_id: &str, credits: u32) {
    info!(
        event = "enroll.committed",
        student_id = %student_id,
        offered_id = %offered_id,
        credits = credits,
    );
}

/// Emit event: a selection rule refused the request.
pub fn emit_enroll_rejected(student_id: &str, offered_id: &str, reason: &Ineligibility) {
    info!(
        event = "enroll.rejected",
        student_id = %student_id,
        offered_id = %offered_id,
        reason = reason.code(),
        detail = %reason,
    );
}

/// Emit event: the pre-check passed but the seat was gone at commit time.
pub fn emit_enroll_capacity_conflict(student_id: &str, offered_id: &str) {
    warn!(
        event = "enroll.capacity_conflict",
        student_id = %student_id,
        offered_id = %offered_id,
    );
}

/// Emit event: enrollment dropped and seat released.
pub fn emit_drop_committed(student_id: &str, offered_id: &str) {
    info!(event = "drop.committed", student_id = %student_id, offered_id = %offered_id);
}

/// Emit event: stored seat count disagrees with the roster or capacity.
pub fn emit_audit_drift(offered_id: &str, stored: u32, roster: u32, capacity: u32) {
    warn!(
        event = "audit.drift",
        offered_id = %offered_id,
        stored_count = stored,
        roster_count = roster,
        capacity = capacity,
    );
}
