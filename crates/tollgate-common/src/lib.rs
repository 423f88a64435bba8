//! # Tollgate Common
//!
//! Shared types, errors, and constants used across Tollgate components.
//!
//! ## Modules
//! - `types` - Wire and decision types (VerificationResult, Decision, etc.)
//! - `error` - Error taxonomy for the verify pipeline
//! - `constants` - Fixed policy values and configuration defaults

pub mod constants;
pub mod error;
pub mod types;

pub use error::{ClientError, ClientErrorKind, TollgateError};
pub use types::*;
