//! Application services layer.

pub mod error;
pub mod factory;
pub mod render;
