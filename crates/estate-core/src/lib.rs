//! Estate Core Library
//!
//! Listing validation, reference data and domain types for the
//! Vienna apartment knowledge graph.

pub mod error;
pub mod listing;
pub mod neighbors;
pub mod reference;

pub use error::{EstateError, EstateResult, RejectReason};
pub use listing::{ApartmentFact, RawListing};
pub use reference::{District, PriceRange, PRICE_RANGES, VIENNA_DISTRICTS};
