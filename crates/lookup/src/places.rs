use anyhow::Result;
use reqwest::Client;
use safepoint_core::{Category, Coordinates, PlaceResult};
use serde::Deserialize;
use tracing::debug;

/// Seam for the external place-search provider.
pub trait PlaceSearch: Send + Sync {
    async fn find_nearest(
        &self,
        category: Category,
        origin: Coordinates,
    ) -> Result<Option<PlaceResult>>;
}

#[derive(Debug, Clone)]
pub struct PlacesConfig {
    pub base_url: String,
    pub api_key: String,
    pub lang: String,
}

/// Proximity-biased category search against the configured provider.
/// Asks for a single best match and trusts the provider's own ranking.
/// HTTP failures propagate; there is no retry policy for this lookup.
#[derive(Debug, Clone)]
pub struct PlaceLocator {
    client: Client,
    config: PlacesConfig,
}

impl PlaceLocator {
    pub fn new(client: Client, config: PlacesConfig) -> Self {
        Self { client, config }
    }
}

impl PlaceSearch for PlaceLocator {
    async fn find_nearest(
        &self,
        category: Category,
        origin: Coordinates,
    ) -> Result<Option<PlaceResult>> {
        let url = format!("{}/v2/places", self.config.base_url.trim_end_matches('/'));
        let bias = format!("proximity:{},{}", origin.longitude, origin.latitude);

        let response = self
            .client
            .get(url)
            .query(&[
                ("categories", category.search_code()),
                ("bias", bias.as_str()),
                ("limit", "1"),
                ("lang", self.config.lang.as_str()),
                ("apiKey", self.config.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("place search returned status {}", status.as_u16());
        }

        let body: PlacesResponse = response.json().await?;
        let place = top_place(body);
        debug!(category = category.label(), found = place.is_some(), "place lookup finished");

        Ok(place)
    }
}

#[derive(Debug, Deserialize)]
struct PlacesResponse {
    #[serde(default)]
    features: Vec<PlaceFeature>,
}

#[derive(Debug, Default, Deserialize)]
struct PlaceFeature {
    #[serde(default)]
    properties: PlaceProperties,
}

#[derive(Debug, Default, Deserialize)]
struct PlaceProperties {
    name: Option<String>,
    formatted: Option<String>,
    lon: Option<f64>,
    lat: Option<f64>,
}

fn top_place(response: PlacesResponse) -> Option<PlaceResult> {
    let properties = response.features.into_iter().next()?.properties;

    let address = properties.formatted.unwrap_or_default();
    let name = properties
        .name
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| address.clone());
    let coordinates = match (properties.lat, properties.lon) {
        (Some(lat), Some(lon)) => Some(Coordinates::new(lat, lon)),
        _ => None,
    };

    Some(PlaceResult {
        name,
        address,
        coordinates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(value: serde_json::Value) -> PlacesResponse {
        serde_json::from_value(value).expect("payload should deserialize")
    }

    #[test]
    fn zero_features_means_no_match() {
        assert!(top_place(parse(json!({ "features": [] }))).is_none());
        assert!(top_place(parse(json!({}))).is_none());
    }

    #[test]
    fn takes_the_top_ranked_feature() {
        let place = top_place(parse(json!({
            "features": [
                { "properties": { "name": "City Hospital", "formatted": "1 Main St", "lat": 12.9, "lon": 77.6 } },
                { "properties": { "name": "Farther Hospital", "formatted": "9 Far Rd", "lat": 13.2, "lon": 77.9 } }
            ]
        })))
        .expect("one match expected");

        assert_eq!(place.name, "City Hospital");
        assert_eq!(place.address, "1 Main St");
        let coordinates = place.coordinates.expect("coordinates expected");
        assert_eq!(coordinates.latitude, 12.9);
        assert_eq!(coordinates.longitude, 77.6);
    }

    #[test]
    fn missing_coordinates_stay_absent() {
        let place = top_place(parse(json!({
            "features": [
                { "properties": { "name": "Unmapped Clinic", "formatted": "Somewhere" } }
            ]
        })))
        .expect("one match expected");

        assert!(place.coordinates.is_none());
    }

    #[test]
    fn falls_back_to_address_when_name_is_blank() {
        let place = top_place(parse(json!({
            "features": [
                { "properties": { "name": "  ", "formatted": "24 High St", "lat": 1.0, "lon": 2.0 } }
            ]
        })))
        .expect("one match expected");

        assert_eq!(place.name, "24 High St");
    }
}
