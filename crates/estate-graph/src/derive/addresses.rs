//! Address resolution.
//!
//! Every distinct coordinate pair is reverse-geocoded once, one request at a
//! time. A resolved label becomes an `Address` node linked from all
//! apartments at that pair; pairs without a label are skipped.

use anyhow::Result;
use async_trait::async_trait;
use neo4rs::Query;
use tracing::{debug, info, warn};

use estate_core::neighbors::{group_by_coordinates, CoordinateGroup};
use estate_core::EstateError;
use super::{located_apartments, DeriveResult};
use crate::geocode::{reverse_with_retry, GeocodeError, ReverseGeocoder, RetryPolicy};
use crate::GraphClient;

const GEOCODER_SERVICE: &str = "reverse-geocoder";

/// Destination for resolved addresses.
#[async_trait]
pub(crate) trait AddressSink: Send + Sync {
    async fn link(&self, group: &CoordinateGroup, label: &str) -> Result<()>;
}

/// Merge the address node for a group and link the group's apartments.
#[async_trait]
impl AddressSink for GraphClient {
    async fn link(&self, group: &CoordinateGroup, label: &str) -> Result<()> {
        let query = Query::new(
            "MERGE (ad:Address {name: $name})
             ON CREATE SET ad.lon = $lon, ad.lat = $lat
             WITH ad
             UNWIND $ids AS apartment_id
             MATCH (a:Apartment {id: apartment_id})
             MERGE (a)-[:LOCATED_AT_ADDRESS]->(ad)"
                .to_string(),
        )
        .param("name", label)
        .param("lon", group.lon)
        .param("lat", group.lat)
        .param("ids", group.ids.clone());

        self.execute(query).await
    }
}

/// Resolve addresses for every apartment coordinate pair.
///
/// Transient lookup failures are retried per `policy`; a pair whose retries
/// run out is skipped. The pass aborts when `max_consecutive_failures` pairs
/// in a row fail, or on the first permanent failure.
pub async fn resolve_addresses(
    client: &GraphClient,
    geocoder: &dyn ReverseGeocoder,
    policy: &RetryPolicy,
) -> Result<DeriveResult> {
    let located = located_apartments(client).await?;
    let groups = group_by_coordinates(&located);
    info!(pairs = groups.len(), "Resolving addresses");

    resolve_groups(&groups, geocoder, policy, client).await
}

/// Look up each group in order and hand resolved labels to `sink`.
pub(crate) async fn resolve_groups(
    groups: &[CoordinateGroup],
    geocoder: &dyn ReverseGeocoder,
    policy: &RetryPolicy,
    sink: &dyn AddressSink,
) -> Result<DeriveResult> {
    let mut result = DeriveResult::default();
    let mut consecutive_failures = 0u32;

    for group in groups {
        match reverse_with_retry(geocoder, group.lat, group.lon, policy).await {
            Ok(Some(label)) => {
                consecutive_failures = 0;
                sink.link(group, &label).await?;
                result.nodes_merged += 1;
                result.relationships_merged += group.ids.len();
                debug!(lon = group.lon, lat = group.lat, address = %label, "Linked address");
            }
            Ok(None) => {
                consecutive_failures = 0;
                result.skipped += 1;
                debug!(lon = group.lon, lat = group.lat, "No address for coordinates");
            }
            Err(GeocodeError::Transient(cause)) => {
                consecutive_failures += 1;
                result.skipped += 1;
                warn!(lon = group.lon, lat = group.lat, cause = %cause, "Skipping coordinates after retries");

                if consecutive_failures >= policy.max_consecutive_failures {
                    return Err(EstateError::unavailable(GEOCODER_SERVICE, cause).into());
                }
            }
            Err(GeocodeError::Permanent(cause)) => {
                return Err(EstateError::unavailable(GEOCODER_SERVICE, cause).into());
            }
            Err(GeocodeError::InvalidResponse(detail)) => {
                return Err(EstateError::invalid_response(GEOCODER_SERVICE, detail).into());
            }
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Answers per longitude; unknown longitudes fail transiently.
    struct ByLongitude(HashMap<u64, Result<Option<String>, GeocodeError>>);

    impl ByLongitude {
        fn new(answers: Vec<(f64, Result<Option<String>, GeocodeError>)>) -> Self {
            Self(answers.into_iter().map(|(lon, answer)| (lon.to_bits(), answer)).collect())
        }
    }

    #[async_trait]
    impl ReverseGeocoder for ByLongitude {
        async fn reverse(&self, _lat: f64, lon: f64) -> Result<Option<String>, GeocodeError> {
            self.0
                .get(&lon.to_bits())
                .cloned()
                .unwrap_or_else(|| Err(GeocodeError::Transient("HTTP 503".into())))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        links: Mutex<Vec<(String, Vec<String>)>>,
    }

    #[async_trait]
    impl AddressSink for RecordingSink {
        async fn link(&self, group: &CoordinateGroup, label: &str) -> Result<()> {
            self.links.lock().unwrap().push((label.to_string(), group.ids.clone()));
            Ok(())
        }
    }

    fn group(lon: f64, ids: &[&str]) -> CoordinateGroup {
        CoordinateGroup {
            lon,
            lat: 48.2,
            ids: ids.iter().map(|id| id.to_string()).collect(),
        }
    }

    fn policy(max_consecutive_failures: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries: 1,
            initial_backoff: Duration::from_millis(1),
            max_consecutive_failures,
        }
    }

    fn service_error(err: anyhow::Error) -> EstateError {
        err.downcast::<EstateError>().unwrap()
    }

    #[tokio::test]
    async fn test_unlabeled_and_exhausted_pairs_are_skipped() {
        let geocoder = ByLongitude::new(vec![
            (16.1, Ok(Some("Graben 1, Wien".into()))),
            (16.2, Ok(None)),
            (16.4, Ok(Some("Ring 2, Wien".into()))),
        ]);
        let groups = [
            group(16.1, &["A3", "A4"]),
            group(16.2, &["A5"]),
            group(16.3, &["A6"]),
            group(16.4, &["A7"]),
        ];
        let sink = RecordingSink::default();

        let result = resolve_groups(&groups, &geocoder, &policy(2), &sink).await.unwrap();

        assert_eq!(result.nodes_merged, 2);
        assert_eq!(result.relationships_merged, 3);
        assert_eq!(result.skipped, 2);
        let links = sink.links.lock().unwrap();
        assert_eq!(links[0], ("Graben 1, Wien".to_string(), vec!["A3".to_string(), "A4".to_string()]));
        assert_eq!(links[1].0, "Ring 2, Wien");
    }

    #[tokio::test]
    async fn test_consecutive_failures_abort() {
        let geocoder = ByLongitude::new(vec![(16.4, Ok(Some("Ring 2, Wien".into())))]);
        let groups = [group(16.1, &["A1"]), group(16.2, &["A2"]), group(16.4, &["A4"])];
        let sink = RecordingSink::default();

        let err = resolve_groups(&groups, &geocoder, &policy(2), &sink).await.unwrap_err();

        assert!(matches!(service_error(err), EstateError::ServiceUnavailable { .. }));
        assert!(sink.links.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_success_resets_failure_streak() {
        let geocoder = ByLongitude::new(vec![(16.2, Ok(Some("Graben 1, Wien".into())))]);
        let groups = [group(16.1, &["A1"]), group(16.2, &["A2"]), group(16.3, &["A3"])];
        let sink = RecordingSink::default();

        let result = resolve_groups(&groups, &geocoder, &policy(2), &sink).await.unwrap();

        assert_eq!(result.nodes_merged, 1);
        assert_eq!(result.skipped, 2);
    }

    #[tokio::test]
    async fn test_permanent_failure_aborts_immediately() {
        let geocoder = ByLongitude::new(vec![
            (16.1, Err(GeocodeError::Permanent("HTTP 403".into()))),
            (16.2, Ok(Some("Graben 1, Wien".into()))),
        ]);
        let groups = [group(16.1, &["A1"]), group(16.2, &["A2"])];
        let sink = RecordingSink::default();

        let err = resolve_groups(&groups, &geocoder, &policy(5), &sink).await.unwrap_err();

        assert!(matches!(service_error(err), EstateError::ServiceUnavailable { .. }));
        assert!(sink.links.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_response_aborts_immediately() {
        let geocoder = ByLongitude::new(vec![(16.1, Err(GeocodeError::InvalidResponse("not json".into())))]);
        let groups = [group(16.1, &["A1"]), group(16.2, &["A2"])];
        let sink = RecordingSink::default();

        let err = resolve_groups(&groups, &geocoder, &policy(5), &sink).await.unwrap_err();

        assert!(matches!(service_error(err), EstateError::InvalidResponse { .. }));
    }
}
