//! Grouping apartments by exact coordinates.
//!
//! Neighbor links and address resolution both work on groups of apartments
//! sharing an identical `(lon, lat)` pair. Grouping by key keeps the work
//! linear in the number of apartments instead of a pairwise join.

use std::collections::BTreeMap;

/// An apartment id with its stored coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct Located {
    pub id: String,
    pub lon: f64,
    pub lat: f64,
}

/// Exact-equality key for a coordinate pair.
///
/// `-0.0` and `0.0` map to the same key; NaN has no key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CoordinateKey {
    lon_bits: u64,
    lat_bits: u64,
}

impl CoordinateKey {
    pub fn new(lon: f64, lat: f64) -> Option<Self> {
        if lon.is_nan() || lat.is_nan() {
            return None;
        }
        Some(Self {
            lon_bits: normalize(lon).to_bits(),
            lat_bits: normalize(lat).to_bits(),
        })
    }

    pub fn lon(&self) -> f64 {
        f64::from_bits(self.lon_bits)
    }

    pub fn lat(&self) -> f64 {
        f64::from_bits(self.lat_bits)
    }
}

fn normalize(v: f64) -> f64 {
    if v == 0.0 { 0.0 } else { v }
}

/// Apartments sharing one coordinate pair.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateGroup {
    pub lon: f64,
    pub lat: f64,
    pub ids: Vec<String>,
}

/// Group apartments by coordinate pair. Duplicate ids within a group are
/// collapsed; groups and ids come back in a stable order.
pub fn group_by_coordinates(items: &[Located]) -> Vec<CoordinateGroup> {
    let mut groups: BTreeMap<CoordinateKey, Vec<String>> = BTreeMap::new();
    for item in items {
        if let Some(key) = CoordinateKey::new(item.lon, item.lat) {
            groups.entry(key).or_default().push(item.id.clone());
        }
    }

    groups
        .into_iter()
        .map(|(key, mut ids)| {
            ids.sort();
            ids.dedup();
            CoordinateGroup { lon: key.lon(), lat: key.lat(), ids }
        })
        .collect()
}

/// Directed neighbor edges: both directions for every unordered pair of
/// distinct apartments in the same group, never a self pair.
pub fn neighbor_pairs(groups: &[CoordinateGroup]) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for group in groups {
        for from in &group.ids {
            for to in &group.ids {
                if from != to {
                    pairs.push((from.clone(), to.clone()));
                }
            }
        }
    }
    pairs
}
