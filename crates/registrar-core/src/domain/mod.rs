//! Domain models for the enrollment engine.
//!
//! - `error`: the typed outcome taxonomy returned to callers
//! - `standing`: what a student already holds in the active semester

pub mod error;
pub mod standing;

pub use error::{ErrorKind, Ineligibility, RegistrarError, Result, ValidationError};
pub use standing::Standing;
