//! The tiered resolution cascade.
//!
//! Tier ordering is fixed: structured geocode, then shared-node
//! topology, then nearest-pair fallback. A tier runs only when every
//! earlier tier produced nothing, and every upstream failure inside a
//! tier is logged and absorbed.

use std::collections::BTreeSet;

use futures::join;
use patrol_map_geo::{haversine_meters, midpoint};
use patrol_map_streets::NormalizedPattern;

use crate::{
    GeoNode, IntersectError, ResolutionMethod, ResolvedIntersection, ResolverConfig, StreetQuery,
    nominatim, overpass,
};

/// Resolves street pairs to intersection coordinates.
///
/// Holds a shared HTTP client and the configuration for one target
/// municipality. Each [`resolve`](Self::resolve) call is independent;
/// there is no cross-call state.
pub struct IntersectionResolver {
    client: reqwest::Client,
    config: ResolverConfig,
}

impl IntersectionResolver {
    /// Creates a resolver with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`IntersectError`] if the client cannot be built.
    pub fn new(config: ResolverConfig) -> Result<Self, IntersectError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { client, config })
    }

    /// Creates a resolver around an existing HTTP client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client, config: ResolverConfig) -> Self {
        Self { client, config }
    }

    /// The configuration this resolver was built with.
    #[must_use]
    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolves the intersection of two streets.
    ///
    /// `city` overrides any city carried on the queries; when all are
    /// absent the configured area name is used. Returns `None` when
    /// every tier is exhausted — including when both names are empty,
    /// in which case no network request is made at all.
    pub async fn resolve(
        &self,
        street_a: &StreetQuery,
        street_b: &StreetQuery,
        city: Option<&str>,
    ) -> Option<ResolvedIntersection> {
        let name_a = street_a.name.trim();
        let name_b = street_b.name.trim();

        if name_a.is_empty() && name_b.is_empty() {
            log::debug!("both street names empty; nothing to resolve");
            return None;
        }

        let city = city
            .or(street_a.city.as_deref())
            .or(street_b.city.as_deref())
            .unwrap_or(&self.config.area_name);

        if let Some(found) = self.structured_tier(name_a, name_b, city).await {
            return Some(found);
        }

        // The topology tiers need a valid pattern for both names.
        let (Some(pattern_a), Some(pattern_b)) = (
            patrol_map_streets::normalize(name_a),
            patrol_map_streets::normalize(name_b),
        ) else {
            log::debug!("skipping topology tiers: street name normalized to empty");
            return None;
        };

        if let Some(found) = self.shared_node_tier(&pattern_a, &pattern_b).await {
            return Some(found);
        }

        if let Some(found) = self.nearest_pair_tier(&pattern_a, &pattern_b).await {
            return Some(found);
        }

        log::info!("no intersection found for '{name_a}' / '{name_b}' in {city}");
        None
    }

    /// Tier 1: combined-query Nominatim search.
    ///
    /// Tries both street orders with an `&` conjunction, the Spanish
    /// `y` variants when enabled, and finally a free-form query with
    /// the city folded in. First valid candidate wins.
    async fn structured_tier(
        &self,
        name_a: &str,
        name_b: &str,
        city: &str,
    ) -> Option<ResolvedIntersection> {
        let mut combos = vec![format!("{name_a} & {name_b}"), format!("{name_b} & {name_a}")];
        if self.config.spanish_conjunction {
            combos.push(format!("{name_a} y {name_b}"));
            combos.push(format!("{name_b} y {name_a}"));
        }

        for combo in &combos {
            match nominatim::search_street(&self.client, &self.config, combo, Some(city)).await {
                Ok(Some(position)) => {
                    log::debug!("structured geocode hit for '{combo}'");
                    return Some(ResolvedIntersection {
                        position,
                        method: ResolutionMethod::StructuredGeocode,
                        distance_meters: None,
                    });
                }
                Ok(None) => {}
                Err(e) => log::debug!("structured attempt '{combo}' failed: {e}"),
            }
        }

        let freeform = format!("{name_a} & {name_b}, {city}");
        match nominatim::search_freeform(&self.client, &self.config, &freeform).await {
            Ok(Some(position)) => Some(ResolvedIntersection {
                position,
                method: ResolutionMethod::StructuredGeocode,
                distance_meters: None,
            }),
            Ok(None) => None,
            Err(e) => {
                log::debug!("free-form attempt '{freeform}' failed: {e}");
                None
            }
        }
    }

    /// Tier 2: ask Overpass for a node shared by both way sets.
    ///
    /// Endpoints are tried strictly in order, each at most once per
    /// resolution; an empty or failed response advances to the next.
    async fn shared_node_tier(
        &self,
        pattern_a: &NormalizedPattern,
        pattern_b: &NormalizedPattern,
    ) -> Option<ResolvedIntersection> {
        let query = overpass::shared_node_query(&self.config, pattern_a.as_str(), pattern_b.as_str());

        for url in &self.config.overpass_urls {
            match overpass::run_query(&self.client, url, &query).await {
                Ok(resp) => {
                    if let Some(node) = resp.elements.iter().find_map(overpass::OverpassElement::as_node)
                    {
                        log::debug!("shared node {} via {url}", node.id);
                        return Some(ResolvedIntersection {
                            position: node.position,
                            method: ResolutionMethod::TopologySharedNode,
                            distance_meters: None,
                        });
                    }
                    log::debug!("no shared node from {url}");
                }
                Err(e) => log::debug!("overpass endpoint {url} failed: {e}"),
            }
        }

        None
    }

    /// Tier 3: fetch both node sets and accept the closest cross-pair
    /// under the proximity threshold.
    ///
    /// The two fetches go to the primary endpoint concurrently. Before
    /// the distance scan the node sets are re-checked for a shared id,
    /// since the independent fetches can surface one that the combined
    /// query missed on a flaky endpoint.
    async fn nearest_pair_tier(
        &self,
        pattern_a: &NormalizedPattern,
        pattern_b: &NormalizedPattern,
    ) -> Option<ResolvedIntersection> {
        let url = self.config.overpass_urls.first()?;
        let query_a = overpass::way_nodes_query(&self.config, pattern_a.as_str(), "w1");
        let query_b = overpass::way_nodes_query(&self.config, pattern_b.as_str(), "w2");

        let (resp_a, resp_b) = join!(
            overpass::run_query(&self.client, url, &query_a),
            overpass::run_query(&self.client, url, &query_b),
        );

        let nodes_a = match resp_a {
            Ok(resp) => overpass::nodes_of(&resp),
            Err(e) => {
                log::debug!("node-set fetch for first street failed: {e}");
                return None;
            }
        };
        let nodes_b = match resp_b {
            Ok(resp) => overpass::nodes_of(&resp),
            Err(e) => {
                log::debug!("node-set fetch for second street failed: {e}");
                return None;
            }
        };

        if nodes_a.is_empty() || nodes_b.is_empty() {
            return None;
        }

        if let Some(node) = shared_node(&nodes_a, &nodes_b) {
            log::debug!("shared node {} found during nearest-pair fetch", node.id);
            return Some(ResolvedIntersection {
                position: node.position,
                method: ResolutionMethod::TopologySharedNode,
                distance_meters: None,
            });
        }

        let (a, b, distance) = nearest_pair(&nodes_a, &nodes_b)?;
        if distance >= self.config.nearest_threshold_meters {
            log::debug!(
                "closest node pair is {distance:.1} m apart, above the {} m threshold",
                self.config.nearest_threshold_meters
            );
            return None;
        }

        Some(ResolvedIntersection {
            position: midpoint(a.position, b.position),
            method: ResolutionMethod::TopologyNearestPair,
            distance_meters: Some(distance),
        })
    }
}

/// Returns the first node of `b` whose id also appears in `a`.
fn shared_node(a: &[GeoNode], b: &[GeoNode]) -> Option<GeoNode> {
    let ids: BTreeSet<i64> = a.iter().map(|n| n.id).collect();
    b.iter().find(|n| ids.contains(&n.id)).copied()
}

/// Minimum-distance pair across the full cross-product.
fn nearest_pair(a: &[GeoNode], b: &[GeoNode]) -> Option<(GeoNode, GeoNode, f64)> {
    let mut best: Option<(GeoNode, GeoNode, f64)> = None;
    for na in a {
        for nb in b {
            let d = haversine_meters(na.position, nb.position);
            if best.is_none_or(|(_, _, bd)| d < bd) {
                best = Some((*na, *nb, d));
            }
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use patrol_map_geo::Coordinate;

    fn node(id: i64, lat: f64, lon: f64) -> GeoNode {
        GeoNode {
            id,
            position: Coordinate::new(lat, lon),
        }
    }

    #[test]
    fn shared_node_prefers_id_match() {
        let a = vec![node(1, -33.45, -70.75), node(2, -33.46, -70.74)];
        let b = vec![node(3, -33.40, -70.70), node(2, -33.46, -70.74)];
        let found = shared_node(&a, &b).unwrap();
        assert_eq!(found.id, 2);
    }

    #[test]
    fn shared_node_none_for_disjoint_sets() {
        let a = vec![node(1, -33.45, -70.75)];
        let b = vec![node(2, -33.46, -70.74)];
        assert!(shared_node(&a, &b).is_none());
    }

    #[test]
    fn nearest_pair_finds_minimum() {
        let a = vec![node(1, -33.45, -70.75), node(2, -33.50, -70.80)];
        let b = vec![node(3, -33.4501, -70.75), node(4, -33.60, -70.90)];
        let (na, nb, d) = nearest_pair(&a, &b).unwrap();
        assert_eq!((na.id, nb.id), (1, 3));
        assert!(d < 15.0, "got {d}");
    }

    #[test]
    fn nearest_pair_empty_input_is_none() {
        assert!(nearest_pair(&[], &[node(1, 0.0, 0.0)]).is_none());
        assert!(nearest_pair(&[node(1, 0.0, 0.0)], &[]).is_none());
    }
}
