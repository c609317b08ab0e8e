//! Core planning types shared across the crate.

pub mod dest_schema;
pub mod normalize;
pub mod plan;
pub mod query;
pub mod traits;
