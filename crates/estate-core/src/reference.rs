//! Static reference data materialized into the graph.
//!
//! Districts are seeded before any import; price ranges are handed to the
//! bucketing pass explicitly.

use serde::Serialize;

/// A Vienna district keyed by postal code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct District {
    pub postal_code: i64,
    pub name: &'static str,
}

impl District {
    pub const fn new(postal_code: i64, name: &'static str) -> Self {
        Self { postal_code, name }
    }
}

/// The 23 districts every apartment must resolve to.
pub const VIENNA_DISTRICTS: [District; 23] = [
    District::new(1010, "Innere Stadt"),
    District::new(1020, "Leopoldstadt"),
    District::new(1030, "Landstraße"),
    District::new(1040, "Wieden"),
    District::new(1050, "Margareten"),
    District::new(1060, "Mariahilf"),
    District::new(1070, "Neubau"),
    District::new(1080, "Josefstadt"),
    District::new(1090, "Alsergrund"),
    District::new(1100, "Favoriten"),
    District::new(1110, "Simmering"),
    District::new(1120, "Meidling"),
    District::new(1130, "Hietzing"),
    District::new(1140, "Penzing"),
    District::new(1150, "Rudolfsheim-Fünfhaus"),
    District::new(1160, "Ottakring"),
    District::new(1170, "Hernals"),
    District::new(1180, "Währing"),
    District::new(1190, "Döbling"),
    District::new(1200, "Brigittenau"),
    District::new(1210, "Floridsdorf"),
    District::new(1220, "Donaustadt"),
    District::new(1230, "Liesing"),
];

/// An inclusive price interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceRange {
    pub name: &'static str,
    pub min_price: i64,
    pub max_price: i64,
}

impl PriceRange {
    pub const fn new(name: &'static str, min_price: i64, max_price: i64) -> Self {
        Self {
            name,
            min_price,
            max_price,
        }
    }

    pub fn contains(&self, price: i64) -> bool {
        self.min_price <= price && price <= self.max_price
    }
}

/// The four price buckets. Together they cover every non-negative price
/// without overlap; the top bucket is open-ended.
pub const PRICE_RANGES: [PriceRange; 4] = [
    PriceRange::new("Low", 0, 400_000),
    PriceRange::new("Medium", 400_001, 900_000),
    PriceRange::new("High", 900_001, 1_500_000),
    PriceRange::new("Very High", 1_500_001, i64::MAX),
];

/// Find the bucket a price falls into.
pub fn bucket_for(ranges: &[PriceRange], price: i64) -> Option<&PriceRange> {
    ranges.iter().find(|r| r.contains(price))
}

/// Check that `ranges`, sorted by lower bound, tile `[0, i64::MAX]` with no
/// gaps or overlaps.
pub fn is_partition(ranges: &[PriceRange]) -> bool {
    let mut sorted: Vec<&PriceRange> = ranges.iter().collect();
    sorted.sort_by_key(|r| r.min_price);

    let mut expected_min = 0i64;
    for (i, range) in sorted.iter().enumerate() {
        if range.min_price != expected_min || range.max_price < range.min_price {
            return false;
        }
        if range.max_price == i64::MAX {
            return i == sorted.len() - 1;
        }
        expected_min = range.max_price + 1;
    }
    false
}
