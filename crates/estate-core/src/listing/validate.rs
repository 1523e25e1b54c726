//! Listing validation.
//!
//! Rules are applied in a fixed order and the first failing rule rejects the
//! whole record:
//!
//! 1. `location_quality` present and an integer
//! 2. `price` present and not a string, coerced to a non-negative integer
//! 3. `floor` present and not a string, coerced to an integer
//! 4. `lon` / `lat` optional, coerced to floating point when present
//! 5. `estate_size` present
//! 6. `number_of_rooms` present
//!
//! `id` is checked last. `postcode` and `orgname` never reject a record:
//! an unusable postcode surfaces later as a missing district.

use serde_json::Value;

use super::{ApartmentFact, RawListing};
use crate::error::RejectReason;

/// Validate a raw listing into an apartment fact.
pub fn validate(listing: &RawListing) -> Result<ApartmentFact, RejectReason> {
    let quality = match &listing.location_quality {
        None => return Err(RejectReason::MissingLocationQuality),
        Some(v) => v.as_i64().ok_or(RejectReason::NonIntegerLocationQuality)?,
    };

    let price = match &listing.price {
        None => return Err(RejectReason::MissingPrice),
        Some(Value::String(_)) => return Err(RejectReason::TextualPrice),
        Some(v) => truncate_to_int(v).ok_or(RejectReason::InvalidPrice)?,
    };
    if price < 0 {
        return Err(RejectReason::NegativePrice);
    }

    let floor = match &listing.floor {
        None => return Err(RejectReason::MissingFloor),
        Some(Value::String(_)) => return Err(RejectReason::TextualFloor),
        Some(v) => truncate_to_int(v).ok_or(RejectReason::InvalidFloor)?,
    };

    let lon = coerce_coordinate(listing.lon.as_ref(), "lon")?;
    let lat = coerce_coordinate(listing.lat.as_ref(), "lat")?;

    let size = match &listing.estate_size {
        None => return Err(RejectReason::MissingEstateSize),
        Some(v) => to_float(v).ok_or(RejectReason::InvalidEstateSize)?,
    };

    let number_of_rooms = match &listing.number_of_rooms {
        None => return Err(RejectReason::MissingRooms),
        Some(v) => to_float(v).ok_or(RejectReason::InvalidRooms)?,
    };

    let id = listing
        .id
        .as_ref()
        .and_then(identity)
        .ok_or(RejectReason::MissingId)?;

    Ok(ApartmentFact {
        id,
        postal_code: listing.postcode.as_ref().and_then(postal_code),
        owner: listing.orgname.as_ref().and_then(owner_name),
        price,
        floor,
        number_of_rooms,
        size,
        quality,
        lon,
        lat,
    })
}

/// Integer coercion for non-string numbers; fractional values truncate.
fn truncate_to_int(value: &Value) -> Option<i64> {
    if let Some(i) = value.as_i64() {
        return Some(i);
    }
    match value.as_f64() {
        Some(f) if f.is_finite() && f.abs() < i64::MAX as f64 => Some(f.trunc() as i64),
        _ => None,
    }
}

/// Float coercion accepting numbers and numeric strings.
fn to_float(value: &Value) -> Option<f64> {
    let f = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    f.is_finite().then_some(f)
}

fn coerce_coordinate(value: Option<&Value>, field: &'static str) -> Result<Option<f64>, RejectReason> {
    match value {
        None => Ok(None),
        Some(v) => to_float(v)
            .map(Some)
            .ok_or(RejectReason::InvalidCoordinate { field }),
    }
}

fn identity(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn postal_code(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn owner_name(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::{bucket_for, PRICE_RANGES};
    use serde_json::json;

    fn listing(value: Value) -> RawListing {
        RawListing::from_value(value).unwrap()
    }

    fn valid() -> Value {
        json!({
            "id": "A2",
            "price": 500000,
            "floor": 3,
            "number_of_rooms": 2,
            "estate_size": 60,
            "location_quality": 5,
            "postcode": 1010
        })
    }

    #[test]
    fn test_valid_record() {
        let fact = validate(&listing(valid())).unwrap();
        assert_eq!(fact.id, "A2");
        assert_eq!(fact.price, 500_000);
        assert_eq!(fact.floor, 3);
        assert_eq!(fact.number_of_rooms, 2.0);
        assert_eq!(fact.size, 60.0);
        assert_eq!(fact.quality, 5);
        assert_eq!(fact.postal_code, Some(1010));
        assert_eq!(fact.owner, None);
        assert_eq!(fact.lon, None);
        assert_eq!(fact.lat, None);
    }

    #[test]
    fn test_textual_price_rejected() {
        let mut record = valid();
        record["id"] = json!("A1");
        record["price"] = json!("not-a-number");
        record["floor"] = json!(2);
        assert_eq!(validate(&listing(record)), Err(RejectReason::TextualPrice));
    }

    #[test]
    fn test_numeric_string_price_still_rejected() {
        let mut record = valid();
        record["price"] = json!("500000");
        assert_eq!(validate(&listing(record)), Err(RejectReason::TextualPrice));
    }

    #[test]
    fn test_quality_must_be_integer() {
        let mut record = valid();
        record["location_quality"] = json!(4.5);
        assert_eq!(validate(&listing(record)), Err(RejectReason::NonIntegerLocationQuality));

        let mut record = valid();
        record["location_quality"] = json!("5");
        assert_eq!(validate(&listing(record)), Err(RejectReason::NonIntegerLocationQuality));

        let mut record = valid();
        record.as_object_mut().unwrap().remove("location_quality");
        assert_eq!(validate(&listing(record)), Err(RejectReason::MissingLocationQuality));
    }

    #[test]
    fn test_rule_order_quality_before_price() {
        let record = json!({"id": "A9", "price": "x"});
        assert_eq!(validate(&listing(record)), Err(RejectReason::MissingLocationQuality));
    }

    #[test]
    fn test_rule_order_floor_before_size() {
        let mut record = valid();
        record.as_object_mut().unwrap().remove("floor");
        record.as_object_mut().unwrap().remove("estate_size");
        assert_eq!(validate(&listing(record)), Err(RejectReason::MissingFloor));
    }

    #[test]
    fn test_fractional_price_truncates() {
        let mut record = valid();
        record["price"] = json!(349999.99);
        assert_eq!(validate(&listing(record)).unwrap().price, 349_999);
    }

    #[test]
    fn test_negative_price_rejected() {
        let mut record = valid();
        record["price"] = json!(-250000);
        assert_eq!(validate(&listing(record)), Err(RejectReason::NegativePrice));

        let mut record = valid();
        record["price"] = json!(-0.5);
        assert_eq!(validate(&listing(record)).unwrap().price, 0);
    }

    #[test]
    fn test_accepted_price_has_a_range() {
        for price in [0, 1, 249_999, 250_000, 500_000, 2_000_000] {
            let mut record = valid();
            record["price"] = json!(price);
            let fact = validate(&listing(record)).unwrap();
            assert!(bucket_for(&PRICE_RANGES, fact.price).is_some(), "no range for {}", price);
        }
    }

    #[test]
    fn test_textual_floor_rejected() {
        let mut record = valid();
        record["floor"] = json!("EG");
        assert_eq!(validate(&listing(record)), Err(RejectReason::TextualFloor));
    }

    #[test]
    fn test_lat_lands_in_lat() {
        let mut record = valid();
        record["lat"] = json!("48.21");
        record["lon"] = json!("16.37");
        let fact = validate(&listing(record)).unwrap();
        assert_eq!(fact.lon, Some(16.37));
        assert_eq!(fact.lat, Some(48.21));
    }

    #[test]
    fn test_garbage_coordinate_rejected() {
        let mut record = valid();
        record["lon"] = json!("east");
        assert_eq!(
            validate(&listing(record)),
            Err(RejectReason::InvalidCoordinate { field: "lon" })
        );
    }

    #[test]
    fn test_missing_size_and_rooms() {
        let mut record = valid();
        record.as_object_mut().unwrap().remove("estate_size");
        assert_eq!(validate(&listing(record)), Err(RejectReason::MissingEstateSize));

        let mut record = valid();
        record.as_object_mut().unwrap().remove("number_of_rooms");
        assert_eq!(validate(&listing(record)), Err(RejectReason::MissingRooms));
    }

    #[test]
    fn test_numeric_id_and_string_postcode() {
        let mut record = valid();
        record["id"] = json!(666356897);
        record["postcode"] = json!("1020");
        let fact = validate(&listing(record)).unwrap();
        assert_eq!(fact.id, "666356897");
        assert_eq!(fact.postal_code, Some(1020));
    }

    #[test]
    fn test_missing_id_rejected_last() {
        let mut record = valid();
        record.as_object_mut().unwrap().remove("id");
        assert_eq!(validate(&listing(record)), Err(RejectReason::MissingId));
    }

    #[test]
    fn test_owner_is_optional_and_trimmed() {
        let mut record = valid();
        record["orgname"] = json!("  Wohnbau GmbH ");
        assert_eq!(validate(&listing(record)).unwrap().owner.as_deref(), Some("Wohnbau GmbH"));

        let mut record = valid();
        record["orgname"] = json!("");
        assert_eq!(validate(&listing(record)).unwrap().owner, None);
    }
}
