//! A student's enrollments in the active semester.

use seat_ledger::{OfferedId, Section};
use serde::Serialize;

/// The held set the selection rules are evaluated against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Standing {
    pub sections: Vec<Section>,
    pub total_credits: u32,
}

impl Standing {
    pub fn new(sections: Vec<Section>) -> Self {
        let total_credits = sections.iter().map(|s| s.credits).sum();
        Self {
            sections,
            total_credits,
        }
    }

    pub fn holds(&self, offered_id: &OfferedId) -> bool {
        self.sections.iter().any(|s| &s.offered_id == offered_id)
    }

    /// Exact, case-sensitive match.
    pub fn holds_course_name(&self, course_name: &str) -> bool {
        self.sections.iter().any(|s| s.course_name == course_name)
    }

    /// Names of held courses whose slot text is identical to `time_slot`.
    pub fn conflicts_with(&self, time_slot: &str) -> Vec<String> {
        self.sections
            .iter()
            .filter(|s| s.time_slot == time_slot)
            .map(|s| s.course_name.clone())
            .collect()
    }
}
