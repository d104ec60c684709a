//! Nominatim / OpenStreetMap search client for the structured tier.
//!
//! Nominatim has no intersection endpoint, but a combined free-text
//! expression like `"Av Lo Boza & Avenida El Abrazo"` sometimes resolves
//! directly when OSM carries the junction as an addressable feature.
//! Results are constrained to the configured country, city, and viewbox.
//!
//! The public instance enforces strict rate limits (1 request per
//! second); the resolver issues its attempts sequentially, which keeps
//! it under that ceiling in practice.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use patrol_map_geo::Coordinate;

use crate::{IntersectError, ResolverConfig};

/// Searches Nominatim with a combined expression in the structured
/// `street` parameter, optionally scoped to a city.
///
/// Returns `Ok(None)` for empty result sets and for non-success
/// statuses; the structured tier treats both the same way.
///
/// # Errors
///
/// Returns [`IntersectError`] if the HTTP request or response parsing
/// fails.
pub async fn search_street(
    client: &reqwest::Client,
    config: &ResolverConfig,
    street: &str,
    city: Option<&str>,
) -> Result<Option<Coordinate>, IntersectError> {
    search(client, config, ("street", street), city).await
}

/// Searches Nominatim with a free-form `q` expression.
///
/// Used for the final structured-tier attempt, where the city is folded
/// into the query text itself.
///
/// # Errors
///
/// Returns [`IntersectError`] if the HTTP request or response parsing
/// fails.
pub async fn search_freeform(
    client: &reqwest::Client,
    config: &ResolverConfig,
    query: &str,
) -> Result<Option<Coordinate>, IntersectError> {
    search(client, config, ("q", query), None).await
}

async fn search(
    client: &reqwest::Client,
    config: &ResolverConfig,
    query: (&str, &str),
    city: Option<&str>,
) -> Result<Option<Coordinate>, IntersectError> {
    let limit = config.result_limit.to_string();
    let mut req = client.get(&config.nominatim_url).query(&[
        query,
        ("format", "jsonv2"),
        ("addressdetails", "1"),
        ("namedetails", "1"),
        ("accept-language", config.language.as_str()),
        ("countrycodes", config.country_code.as_str()),
        ("limit", limit.as_str()),
    ]);

    if let Some(city) = city {
        req = req.query(&[("city", city)]);
    }

    if let Some(viewbox) = config.viewbox {
        req = req.query(&[("viewbox", viewbox.to_string()), ("bounded", "1".to_string())]);
    }

    let resp = req.send().await?;

    if !resp.status().is_success() {
        return Ok(None);
    }

    let body: serde_json::Value = resp.json().await?;
    Ok(first_candidate(&body))
}

/// Returns the first candidate in a Nominatim response with a valid
/// lat/lon pair.
///
/// Nominatim serializes coordinates as strings; older proxy layers have
/// been seen re-encoding them as numbers, so both forms are accepted.
/// Malformed bodies yield `None` rather than an error.
fn first_candidate(body: &serde_json::Value) -> Option<Coordinate> {
    body.as_array()?.iter().find_map(candidate_coordinate)
}

fn candidate_coordinate(candidate: &serde_json::Value) -> Option<Coordinate> {
    let lat = coordinate_field(&candidate["lat"])?;
    let lon = coordinate_field(&candidate["lon"])?;
    if lat.abs() > 90.0 || lon.abs() > 180.0 {
        return None;
    }
    Some(Coordinate::new(lat, lon))
}

fn coordinate_field(value: &serde_json::Value) -> Option<f64> {
    value
        .as_f64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_string_coordinates() {
        let body = serde_json::json!([{
            "lat": "-33.45",
            "lon": "-70.75",
            "display_name": "Av. Lo Boza, Pudahuel, Chile"
        }]);
        let coord = first_candidate(&body).unwrap();
        assert!((coord.lat - -33.45).abs() < 1e-9);
        assert!((coord.lon - -70.75).abs() < 1e-9);
    }

    #[test]
    fn parses_numeric_coordinates() {
        let body = serde_json::json!([{ "lat": -33.44, "lon": -70.76 }]);
        let coord = first_candidate(&body).unwrap();
        assert!((coord.lat - -33.44).abs() < 1e-9);
    }

    #[test]
    fn skips_invalid_candidates() {
        let body = serde_json::json!([
            { "lat": "not-a-number", "lon": "-70.75" },
            { "lat": "95.0", "lon": "-70.75" },
            { "lat": "-33.45", "lon": "-70.75" }
        ]);
        let coord = first_candidate(&body).unwrap();
        assert!((coord.lat - -33.45).abs() < 1e-9);
    }

    #[test]
    fn empty_result_set_is_none() {
        assert!(first_candidate(&serde_json::json!([])).is_none());
    }

    #[test]
    fn non_array_body_is_none() {
        let body = serde_json::json!({ "error": "Unable to geocode" });
        assert!(first_candidate(&body).is_none());
    }
}
