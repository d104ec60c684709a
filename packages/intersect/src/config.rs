//! Resolver configuration with documented defaults.
//!
//! The historical call sites each hardcoded their own endpoint lists,
//! viewbox bounds, and distance thresholds (and had drifted apart on
//! the details). Everything tunable now lives here and is passed to
//! [`IntersectionResolver::new`](crate::IntersectionResolver::new).

use std::fmt;

/// Default Nominatim search endpoint.
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";

/// Default Overpass endpoints, in the order they are tried.
pub const DEFAULT_OVERPASS_URLS: &[&str] = &[
    "https://overpass-api.de/api/interpreter",
    "https://overpass.kumi.systems/api/interpreter",
];

/// Default administrative area the resolver is scoped to.
pub const DEFAULT_AREA_NAME: &str = "Pudahuel";

/// Approximate bounding box of the default area (lon/lat corners).
pub const DEFAULT_VIEWBOX: Viewbox = Viewbox {
    left: -70.84,
    top: -33.33,
    right: -70.65,
    bottom: -33.56,
};

/// A Nominatim viewbox constraint: `left,top,right,bottom` in decimal
/// degrees (longitudes first).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewbox {
    /// Western longitude.
    pub left: f64,
    /// Northern latitude.
    pub top: f64,
    /// Eastern longitude.
    pub right: f64,
    /// Southern latitude.
    pub bottom: f64,
}

impl fmt::Display for Viewbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{},{}", self.left, self.top, self.right, self.bottom)
    }
}

/// Tunable parameters for one [`IntersectionResolver`](crate::IntersectionResolver).
///
/// [`ResolverConfig::default`] targets the municipality the patrol app
/// serves; tests and other deployments override the endpoint fields.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Nominatim search endpoint.
    pub nominatim_url: String,
    /// Ordered Overpass endpoints; later entries are fallbacks.
    pub overpass_urls: Vec<String>,
    /// Administrative area name matched (case-insensitively) in
    /// Overpass `area` filters and used as the default city.
    pub area_name: String,
    /// ISO country code passed to Nominatim's `countrycodes` filter.
    pub country_code: String,
    /// `accept-language` value for Nominatim responses.
    pub language: String,
    /// Bounding box constraint for Nominatim, with `bounded=1`.
    pub viewbox: Option<Viewbox>,
    /// Nominatim result cap per attempt.
    pub result_limit: u32,
    /// Maximum node-pair separation in meters accepted by the
    /// nearest-pair fallback. Field deployments have used 25–30 m.
    pub nearest_threshold_meters: f64,
    /// Also try `"A y B"` conjunction variants in the structured tier.
    pub spanish_conjunction: bool,
    /// Overpass `[timeout:...]` directive, in seconds.
    pub overpass_timeout_secs: u32,
    /// User agent sent on every request. Nominatim's usage policy
    /// requires an identifying value.
    pub user_agent: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            nominatim_url: DEFAULT_NOMINATIM_URL.to_string(),
            overpass_urls: DEFAULT_OVERPASS_URLS
                .iter()
                .map(ToString::to_string)
                .collect(),
            area_name: DEFAULT_AREA_NAME.to_string(),
            country_code: "cl".to_string(),
            language: "es".to_string(),
            viewbox: Some(DEFAULT_VIEWBOX),
            result_limit: 6,
            nearest_threshold_meters: 30.0,
            spanish_conjunction: true,
            overpass_timeout_secs: 25,
            user_agent: "patrol-map/0.1 (municipal dispatch)".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn viewbox_formats_lon_lat_corners() {
        assert_eq!(DEFAULT_VIEWBOX.to_string(), "-70.84,-33.33,-70.65,-33.56");
    }

    #[test]
    fn default_endpoints_are_ordered() {
        let config = ResolverConfig::default();
        assert_eq!(config.overpass_urls.len(), 2);
        assert!(config.overpass_urls[0].contains("overpass-api.de"));
    }

    #[test]
    fn default_threshold_is_within_observed_range() {
        let config = ResolverConfig::default();
        assert!((25.0..=30.0).contains(&config.nearest_threshold_meters));
    }
}
