//! Listing records: the loosely-typed input and the validated apartment fact.

pub mod extract;
pub mod validate;

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::EstateResult;

/// One listing as it appears in `result_for_db.json`.
///
/// Every field stays an untyped JSON value until [`validate::validate`]
/// decides whether the record becomes an [`ApartmentFact`]. A JSON `null`
/// is treated the same as an absent field.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawListing {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub postcode: Option<Value>,
    #[serde(default)]
    pub orgname: Option<Value>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub floor: Option<Value>,
    #[serde(default)]
    pub number_of_rooms: Option<Value>,
    #[serde(default)]
    pub location_quality: Option<Value>,
    #[serde(default)]
    pub estate_size: Option<Value>,
    #[serde(default)]
    pub lon: Option<Value>,
    #[serde(default)]
    pub lat: Option<Value>,
    #[serde(default)]
    pub published: Option<Value>,
}

impl RawListing {
    /// Build from an arbitrary JSON value. Non-object values yield `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value).ok()
    }
}

/// A validated apartment, ready to be written to the graph.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApartmentFact {
    pub id: String,
    pub postal_code: Option<i64>,
    pub owner: Option<String>,
    pub price: i64,
    pub floor: i64,
    pub number_of_rooms: f64,
    pub size: f64,
    pub quality: i64,
    pub lon: Option<f64>,
    pub lat: Option<f64>,
}

/// Load listings from a JSON array file.
///
/// Array entries that are not JSON objects are skipped with a warning.
pub fn load_listings(path: &Path) -> EstateResult<Vec<RawListing>> {
    let content = std::fs::read_to_string(path)?;
    let values: Vec<Value> = serde_json::from_str(&content)?;

    let mut listings = Vec::with_capacity(values.len());
    for (index, value) in values.into_iter().enumerate() {
        match RawListing::from_value(value) {
            Some(listing) => listings.push(listing),
            None => warn!(index, "Skipping listing entry that is not an object"),
        }
    }
    Ok(listings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_null_is_absent() {
        let listing = RawListing::from_value(json!({"id": "A1", "price": null})).unwrap();
        assert_eq!(listing.id, Some(json!("A1")));
        assert_eq!(listing.price, None);
    }

    #[test]
    fn test_non_object_rejected() {
        assert!(RawListing::from_value(json!([1, 2])).is_none());
        assert!(RawListing::from_value(json!("A1")).is_none());
    }

    #[test]
    fn test_load_listings_skips_non_objects() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[{{"id": "A1", "floor": 2}}, 42, {{"id": "A2"}}]"#).unwrap();

        let listings = load_listings(file.path()).unwrap();
        assert_eq!(listings.len(), 2);
        assert_eq!(listings[0].floor, Some(json!(2)));
        assert_eq!(listings[1].id, Some(json!("A2")));
    }
}
