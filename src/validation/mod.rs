//! Build-time validation of machine definitions.
//!
//! Uses Stillwater's `Validation` to accumulate ALL structural defects of a
//! table instead of stopping at the first one, so a broken machine reports
//! everything wrong with it in a single pass.

pub mod rules;
pub mod violations;

pub use rules::validate;
pub use violations::ModelViolation;
