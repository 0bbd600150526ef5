//! Domain layer types and invariants.

pub mod account_name;
pub mod error;
pub mod localization;
