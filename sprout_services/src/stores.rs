use async_trait::async_trait;
use serde::Deserialize;

use sprout_models::{
    settings::StoreSearchSettings,
    weather::{Coordinates, PlantStore},
};

use crate::{
    ServiceError,
    http::{build_client, ensure_success},
};

const SERVICE: &str = "Nominatim";
const SEARCH_TERM: &str = "plant store";

#[async_trait]
pub trait StoreLocator: Send + Sync + 'static {
    async fn nearby_stores(&self, around: Coordinates) -> Result<Vec<PlantStore>, ServiceError>;
}

#[derive(Deserialize)]
struct Place {
    #[serde(default)]
    display_name: String,
    lat: String,
    lon: String,
}

impl Place {
    fn into_store(self) -> Option<PlantStore> {
        let latitude = self.lat.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;
        let longitude = self.lon.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;

        Some(PlantStore {
            name: self.display_name,
            coordinates: Coordinates::new(latitude, longitude),
        })
    }
}

/// Plant stores around a point, searched through OpenStreetMap Nominatim.
pub struct NominatimClient {
    client: reqwest::Client,
    base_url: String,
    limit: u32,
}

impl NominatimClient {
    pub fn new(settings: &StoreSearchSettings) -> Result<Self, ServiceError> {
        Ok(Self {
            client: build_client()?,
            base_url: settings.base_url.trim_end_matches('/').to_owned(),
            limit: settings.limit,
        })
    }
}

#[async_trait]
impl StoreLocator for NominatimClient {
    async fn nearby_stores(&self, around: Coordinates) -> Result<Vec<PlantStore>, ServiceError> {
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[
                ("q", SEARCH_TERM.to_owned()),
                ("format", "json".to_owned()),
                ("limit", self.limit.to_string()),
                ("lat", around.latitude.to_string()),
                ("lon", around.longitude.to_string()),
            ])
            .send()
            .await?;

        let places: Vec<Place> = ensure_success(SERVICE, response).await?.json().await?;
        let total = places.len();
        let stores: Vec<_> = places.into_iter().filter_map(Place::into_store).collect();

        if stores.len() < total {
            log::debug!("[STORES] Skipped {} place(s) without coordinates", total - stores.len());
        }
        Ok(stores)
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn places_with_bad_coordinates_are_skipped() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/search")
                .query_param("q", "plant store")
                .query_param("format", "json")
                .query_param("limit", "10")
                .query_param("lat", "52.52")
                .query_param("lon", "13.405");
            then.status(200).json_body(json!([
                { "display_name": "Green Corner", "lat": "52.5201", "lon": "13.4049" },
                { "display_name": "Nowhere", "lat": "n/a", "lon": "13.4" },
                { "display_name": "Leaf & Co", "lat": "52.51", "lon": "13.39" }
            ]));
        });
        let client = NominatimClient::new(&StoreSearchSettings {
            base_url: server.base_url(),
            limit: 10,
        })
        .unwrap();

        let stores = client
            .nearby_stores(Coordinates::new(52.52, 13.405))
            .await
            .unwrap();

        mock.assert();
        let names: Vec<_> = stores.iter().map(|store| store.name.as_str()).collect();
        assert_eq!(names, vec!["Green Corner", "Leaf & Co"]);
        assert_eq!(stores[0].coordinates, Coordinates::new(52.5201, 13.4049));
    }
}
