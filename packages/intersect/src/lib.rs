#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Street intersection resolution for the patrol map.
//!
//! Given two free-text street names (and an optional city), finds the
//! coordinate where they cross using a tiered cascade of open geocoding
//! and OSM topology queries:
//!
//! 1. **Structured combined query** — Nominatim search for `"A & B"`
//!    style expressions, constrained to the target city and viewbox.
//! 2. **Topology shared node** — Overpass query for a node belonging to
//!    both named way sets inside the administrative area, tried against
//!    an ordered list of redundant endpoints.
//! 3. **Nearest node pair** — when no shared node exists, the two way
//!    node sets are fetched independently and the closest cross-pair is
//!    accepted if it is within a configurable proximity threshold.
//!
//! Both upstream services are unreliable; every network failure or
//! malformed response is absorbed as "no result for that attempt" and
//! the cascade moves on. The only outcomes a caller ever sees are a
//! [`ResolvedIntersection`] or `None`.

pub mod config;
pub mod nominatim;
pub mod overpass;
pub mod resolver;

pub use config::{ResolverConfig, Viewbox};
pub use resolver::IntersectionResolver;

use patrol_map_geo::Coordinate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A free-text street lookup, as entered by a dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreetQuery {
    /// Raw street name; matching is case- and diacritic-insensitive.
    pub name: String,
    /// Optional city override for this lookup.
    pub city: Option<String>,
}

impl StreetQuery {
    /// Creates a query for a street name with no city override.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            city: None,
        }
    }
}

/// An OSM node extracted from an Overpass response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoNode {
    /// OSM node id.
    pub id: i64,
    /// Node coordinate.
    pub position: Coordinate,
}

/// Which cascade tier produced an intersection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResolutionMethod {
    /// Tier 1: Nominatim combined-query geocode.
    StructuredGeocode,
    /// Tier 2 (or the Tier 3 re-check): a node shared by both way sets.
    TopologySharedNode,
    /// Tier 3: midpoint of the closest cross-pair of nodes.
    TopologyNearestPair,
}

/// A resolved street intersection. Immutable once produced.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedIntersection {
    /// The intersection coordinate.
    #[serde(flatten)]
    pub position: Coordinate,
    /// Which tier produced the answer.
    pub method: ResolutionMethod,
    /// Node-pair separation in meters, for nearest-pair answers only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance_meters: Option<f64>,
}

/// Errors from individual upstream attempts.
///
/// These never escape [`IntersectionResolver::resolve`]; the cascade
/// logs them and treats the attempt as empty.
#[derive(Debug, Error)]
pub enum IntersectError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Upstream returned a non-success status.
    #[error("Upstream returned status {status}")]
    UpstreamStatus {
        /// HTTP status code.
        status: u16,
    },

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },
}
