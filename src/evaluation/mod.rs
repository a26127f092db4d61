//! Model evaluation: holdout comparison and walk-forward validation.

pub mod compare;
pub mod cross_validation;

pub use compare::{compare_all, compare_models, ComparisonRow, ComparisonTable};
pub use cross_validation::{cross_validate, CvConfig, CvResult, StepAccuracy};
