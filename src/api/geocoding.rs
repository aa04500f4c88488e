use async_trait::async_trait;
use serde::Deserialize;

use crate::{
    core::{config::GeocodingConfig, geo::LatLng},
    MapError, Result,
};

/// Free-text address lookup
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Candidate positions for `query`, best match first. May be empty.
    async fn geocode(&self, query: &str) -> Result<Vec<LatLng>>;
}

/// Geocoder backed by a Nominatim-compatible search endpoint
pub struct NominatimGeocoder {
    client: reqwest::Client,
    endpoint: String,
    limit: u32,
}

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

impl NominatimGeocoder {
    pub fn new(config: &GeocodingConfig) -> Self {
        Self {
            client: super::HTTP_CLIENT.clone(),
            endpoint: config.endpoint.clone(),
            limit: config.limit.max(1),
        }
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, query: &str) -> Result<Vec<LatLng>> {
        let limit = self.limit.to_string();
        let places: Vec<NominatimPlace> = self
            .client
            .get(&self.endpoint)
            .query(&[("q", query), ("format", "json"), ("limit", limit.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(places
            .into_iter()
            .filter_map(|place| {
                let lat = place.lat.parse::<f64>().ok()?;
                let lng = place.lon.parse::<f64>().ok()?;
                Some(LatLng::new(lat, lng)).filter(LatLng::is_valid)
            })
            .collect())
    }
}

/// Resolves `query` to the first valid candidate position
pub async fn search_address(geocoder: &dyn Geocoder, query: &str) -> Result<LatLng> {
    let query = query.trim();
    if query.is_empty() {
        return Err(MapError::NotFound("empty address query".into()));
    }
    geocoder
        .geocode(query)
        .await?
        .into_iter()
        .find(LatLng::is_valid)
        .ok_or_else(|| MapError::NotFound(format!("no location found for '{}'", query)))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedGeocoder(Vec<LatLng>);

    #[async_trait]
    impl Geocoder for FixedGeocoder {
        async fn geocode(&self, _query: &str) -> Result<Vec<LatLng>> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_first_candidate_wins() {
        let geocoder = FixedGeocoder(vec![LatLng::new(-12.0, -77.0), LatLng::new(-13.0, -72.0)]);
        let found = search_address(&geocoder, "Plaza de Armas").await.unwrap();
        assert_eq!(found, LatLng::new(-12.0, -77.0));
    }

    #[tokio::test]
    async fn test_not_found() {
        let geocoder = FixedGeocoder(vec![]);
        let err = search_address(&geocoder, "nowhere").await.unwrap_err();
        assert!(matches!(err, MapError::NotFound(_)));

        let err = search_address(&geocoder, "   ").await.unwrap_err();
        assert!(matches!(err, MapError::NotFound(_)));
    }
}
