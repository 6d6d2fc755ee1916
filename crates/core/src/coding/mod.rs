//! Code format checks and code validation

pub mod formats;
pub mod validation;

pub use validation::{CodeValidationService, CodeValidator, InternalCodeValidator};
