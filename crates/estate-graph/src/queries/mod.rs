//! Read-only graph queries.

pub mod analytics;
pub mod triples;
