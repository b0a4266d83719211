//! Selection rules that are configuration rather than logic.
//!
//! Two credit ceilings coexist on purpose: enrollment is refused above
//! [`ENROLL_CREDIT_CEILING`], while the catalog preview marks sections as
//! selectable up to [`CATALOG_CREDIT_CEILING`]. They are kept separate and
//! configurable; unifying them is a policy decision, not a code change.
//!
//! A policy file is TOML with any subset of the fields:
//!
//! ```toml
//! enroll_credit_ceiling = 15
//! catalog_credit_ceiling = 18
//! enroll_window = "calendar_day"
//! drop_window = "instant"
//! ```

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Hard cap on a student's active-semester credits, enforced at enroll time.
pub const ENROLL_CREDIT_CEILING: u32 = 15;

/// Cap used only when previewing selectable sections in the catalog.
pub const CATALOG_CREDIT_CEILING: u32 = 18;

/// How "now" is compared against a semester's selection window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowPolicy {
    /// Compare calendar dates only: the whole first and last day are open.
    CalendarDay,
    /// Compare full timestamps against `[start, end]`.
    Instant,
}

impl WindowPolicy {
    /// Inclusive on both ends.
    pub fn contains(self, start: NaiveDateTime, end: NaiveDateTime, now: NaiveDateTime) -> bool {
        match self {
            WindowPolicy::CalendarDay => {
                let today = now.date();
                start.date() <= today && today <= end.date()
            }
            WindowPolicy::Instant => start <= now && now <= end,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("failed to read policy file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid policy TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid policy: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EnrollmentPolicy {
    pub enroll_credit_ceiling: u32,
    pub catalog_credit_ceiling: u32,
    pub enroll_window: WindowPolicy,
    pub drop_window: WindowPolicy,
}

impl Default for EnrollmentPolicy {
    fn default() -> Self {
        Self {
            enroll_credit_ceiling: ENROLL_CREDIT_CEILING,
            catalog_credit_ceiling: CATALOG_CREDIT_CEILING,
            enroll_window: WindowPolicy::CalendarDay,
            drop_window: WindowPolicy::Instant,
        }
    }
}

impl EnrollmentPolicy {
    pub fn from_toml_str(s: &str) -> Result<Self, PolicyError> {
        let policy: Self = toml::from_str(s)?;
        policy.validate()?;
        Ok(policy)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PolicyError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| PolicyError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    fn validate(&self) -> Result<(), PolicyError> {
        if self.enroll_credit_ceiling == 0 {
            return Err(PolicyError::Invalid(
                "enroll_credit_ceiling must be positive".into(),
            ));
        }
        if self.catalog_credit_ceiling == 0 {
            return Err(PolicyError::Invalid(
                "catalog_credit_ceiling must be positive".into(),
            ));
        }
        Ok(())
    }
}
