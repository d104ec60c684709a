//! Overpass QL client for the topology tiers.
//!
//! Ways are matched inside the configured administrative area against
//! the full set of name-like tags (`name`, `alt_name`, `official_name`,
//! `name:es`) using the accent-tolerant patterns from
//! [`patrol_map_streets::normalize`]. Two query shapes are built here:
//! the shared-node query, which lets the Overpass server intersect the
//! node sets itself, and the per-street node-set query used by the
//! nearest-pair fallback.
//!
//! See <https://wiki.openstreetmap.org/wiki/Overpass_API/Overpass_QL>

use serde::Deserialize;

use patrol_map_geo::Coordinate;

use crate::{GeoNode, IntersectError, ResolverConfig};

/// Tag keys Overpass matches a street pattern against.
const NAME_TAG_FILTER: &str = r#"[~"^(name|alt_name|official_name|name:es)$"~"#;

/// A decoded Overpass response body.
#[derive(Debug, Deserialize)]
pub struct OverpassResponse {
    /// Flat list of returned elements; absent on some error bodies.
    #[serde(default)]
    pub elements: Vec<OverpassElement>,
}

/// One element of an Overpass response.
#[derive(Debug, Clone, Deserialize)]
pub struct OverpassElement {
    /// Element type: `"node"`, `"way"`, or `"relation"`.
    #[serde(rename = "type")]
    pub kind: String,
    /// OSM element id.
    pub id: i64,
    /// Latitude; present on nodes only.
    pub lat: Option<f64>,
    /// Longitude; present on nodes only.
    pub lon: Option<f64>,
}

impl OverpassElement {
    /// Converts the element to a [`GeoNode`] if it is a node with
    /// coordinates.
    #[must_use]
    pub fn as_node(&self) -> Option<GeoNode> {
        if self.kind != "node" {
            return None;
        }
        Some(GeoNode {
            id: self.id,
            position: Coordinate::new(self.lat?, self.lon?),
        })
    }
}

/// Extracts all coordinate-bearing nodes from a response.
#[must_use]
pub fn nodes_of(response: &OverpassResponse) -> Vec<GeoNode> {
    response
        .elements
        .iter()
        .filter_map(OverpassElement::as_node)
        .collect()
}

/// Builds the shared-node query: ways matching each pattern inside the
/// administrative area, then the nodes common to both way sets.
#[must_use]
pub fn shared_node_query(config: &ResolverConfig, pattern_a: &str, pattern_b: &str) -> String {
    let area = ql_string(&config.area_name);
    let a = ql_string(pattern_a);
    let b = ql_string(pattern_b);
    let timeout = config.overpass_timeout_secs;
    format!(
        "[out:json][timeout:{timeout}];\n\
         area[name~\"{area}\",i][boundary=\"administrative\"]->.a;\n\
         way(area.a)[\"highway\"]{NAME_TAG_FILTER}\"{a}\",i]->.w1;\n\
         way(area.a)[\"highway\"]{NAME_TAG_FILTER}\"{b}\",i]->.w2;\n\
         node(w.w1)->.n1;\n\
         node(w.w2)->.n2;\n\
         node.n1.n2;out qt;"
    )
}

/// Builds a query returning every node of the ways matching one
/// pattern. `set` distinguishes the two fallback fetches (`"w1"` /
/// `"w2"`).
#[must_use]
pub fn way_nodes_query(config: &ResolverConfig, pattern: &str, set: &str) -> String {
    let area = ql_string(&config.area_name);
    let p = ql_string(pattern);
    let timeout = config.overpass_timeout_secs;
    format!(
        "[out:json][timeout:{timeout}];\n\
         area[name~\"{area}\",i][boundary=\"administrative\"]->.a;\n\
         way(area.a)[\"highway\"]{NAME_TAG_FILTER}\"{p}\",i]->.{set};\n\
         node(w.{set});out;"
    )
}

/// Escapes a value for interpolation inside a QL double-quoted string.
fn ql_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Executes a QL query against one Overpass endpoint.
///
/// # Errors
///
/// Returns [`IntersectError`] on network failure, a non-success status,
/// or an unparseable body. The caller advances to the next endpoint or
/// tier on any of these.
pub async fn run_query(
    client: &reqwest::Client,
    url: &str,
    query: &str,
) -> Result<OverpassResponse, IntersectError> {
    let resp = client
        .post(url)
        .header("Content-Type", "text/plain;charset=UTF-8")
        .body(query.to_string())
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        return Err(IntersectError::UpstreamStatus {
            status: status.as_u16(),
        });
    }

    let body = resp.text().await?;
    serde_json::from_str(&body).map_err(|e| IntersectError::Parse {
        message: format!("Overpass body: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_elements() {
        let body = r#"{
            "elements": [
                { "type": "way", "id": 100 },
                { "type": "node", "id": 7, "lat": -33.45, "lon": -70.75 },
                { "type": "node", "id": 8 }
            ]
        }"#;
        let resp: OverpassResponse = serde_json::from_str(body).unwrap();
        let nodes = nodes_of(&resp);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].id, 7);
        assert!((nodes[0].position.lat - -33.45).abs() < 1e-9);
    }

    #[test]
    fn missing_elements_key_is_empty() {
        let resp: OverpassResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.elements.is_empty());
    }

    #[test]
    fn shared_node_query_carries_both_patterns() {
        let config = ResolverConfig::default();
        let ql = shared_node_query(&config, "^L[oóòöô] B[oóòöô]z[aáàäâ]$", "^S[uúùüû]r$");
        assert!(ql.contains("[timeout:25]"));
        assert!(ql.contains(r#"area[name~"Pudahuel",i]"#));
        assert!(ql.contains("L[oóòöô] B[oóòöô]z[aáàäâ]"));
        assert!(ql.contains("S[uúùüû]r"));
        assert!(ql.contains("node.n1.n2;out qt;"));
    }

    #[test]
    fn way_nodes_query_uses_requested_set() {
        let config = ResolverConfig::default();
        let ql = way_nodes_query(&config, "^El Tr[aáàäâ][nñ]q[uúùüû][eéèëê]$", "w2");
        assert!(ql.contains("->.w2;"));
        assert!(ql.contains("node(w.w2);out;"));
        assert!(!ql.contains("n1.n2"));
    }

    #[test]
    fn ql_string_escapes_quotes() {
        assert_eq!(ql_string(r#"a"b"#), r#"a\"b"#);
        assert_eq!(ql_string(r"a\b"), r"a\\b");
    }
}
