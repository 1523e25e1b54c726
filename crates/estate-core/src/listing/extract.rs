//! Extraction of crawler dumps into loader input.
//!
//! Keeps only the recognised advert attributes, drops adverts without
//! coordinates and splits the `"lat,lon"` coordinate string into separate
//! `lat` / `lon` fields.

use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::EstateResult;

/// Advert attributes carried over to the loader input.
pub const EXTRACTED_PROPERTIES: &[&str] = &[
    "coordinates",
    "postcode",
    "id",
    "orgname",
    "floor",
    "number_of_rooms",
    "location_quality",
    "estate_size",
    "estate_size/living_area",
    "rooms",
    "price",
    "published",
];

/// Default output file name consumed by the loader.
pub const DEFAULT_OUTPUT_FILE: &str = "result_for_db.json";

/// Counters for one extraction run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractSummary {
    pub adverts_read: usize,
    pub records_written: usize,
    pub without_coordinates: usize,
    pub malformed_coordinates: usize,
}

/// Extract a single advert. Returns `None` when the advert has to be dropped.
fn extract_advert(advert: &Map<String, Value>, summary: &mut ExtractSummary) -> Option<Map<String, Value>> {
    let mut record: Map<String, Value> = advert
        .iter()
        .filter(|(key, _)| EXTRACTED_PROPERTIES.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let coordinates = match record.remove("coordinates") {
        Some(Value::String(s)) => s,
        Some(_) => {
            summary.malformed_coordinates += 1;
            return None;
        }
        None => {
            summary.without_coordinates += 1;
            return None;
        }
    };

    let parts: Vec<&str> = coordinates.split(',').map(str::trim).collect();
    let [lat, lon] = parts.as_slice() else {
        warn!(coordinates = %coordinates, "Dropping advert with malformed coordinates");
        summary.malformed_coordinates += 1;
        return None;
    };

    record.insert("lat".to_string(), Value::String(lat.to_string()));
    record.insert("lon".to_string(), Value::String(lon.to_string()));
    Some(record)
}

/// Extract loader records from a list of raw adverts.
pub fn extract_adverts(adverts: &[Value]) -> (Vec<Map<String, Value>>, ExtractSummary) {
    let mut summary = ExtractSummary::default();
    let mut records = Vec::new();

    for advert in adverts {
        summary.adverts_read += 1;
        let Some(object) = advert.as_object() else {
            debug!("Skipping advert that is not an object");
            continue;
        };
        if let Some(record) = extract_advert(object, &mut summary) {
            records.push(record);
        }
    }

    summary.records_written = records.len();
    (records, summary)
}

/// Extract every input dump into one output file.
pub fn extract_files(inputs: &[PathBuf], output: &Path) -> EstateResult<ExtractSummary> {
    let mut total = ExtractSummary::default();
    let mut all_records = Vec::new();

    for input in inputs {
        info!(path = %input.display(), "Extracting adverts");
        let content = std::fs::read_to_string(input)?;
        let adverts: Vec<Value> = serde_json::from_str(&content)?;

        let (records, summary) = extract_adverts(&adverts);
        total.adverts_read += summary.adverts_read;
        total.without_coordinates += summary.without_coordinates;
        total.malformed_coordinates += summary.malformed_coordinates;
        all_records.extend(records);
    }

    total.records_written = all_records.len();
    let json = serde_json::to_string(&all_records)?;
    std::fs::write(output, json)?;

    info!(
        read = total.adverts_read,
        written = total.records_written,
        output = %output.display(),
        "Extraction complete"
    );
    Ok(total)
}
