use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use sprout_models::{
    identification::{Identification, PlantCandidate, WateringFrequency},
    settings::IdentificationSettings,
};

use crate::{
    ServiceError,
    http::{build_client, ensure_success},
};

const SERVICE: &str = "plant.id";
const UNKNOWN_NAME: &str = "Unknown Plant";
const UNKNOWN_COMMON_NAME: &str = "Indoor Plant";

#[async_trait]
pub trait PlantIdentification: Send + Sync + 'static {
    async fn identify(&self, image: &[u8]) -> Result<Identification, ServiceError>;
}

#[derive(Serialize)]
struct IdentifyRequest<'a> {
    api_key: &'a str,
    images: Vec<String>,
    modifiers: [&'static str; 2],
    plant_language: &'static str,
    plant_details: [&'static str; 2],
}

#[derive(Deserialize)]
struct IdentifyResponse {
    #[serde(default)]
    suggestions: Vec<Suggestion>,
}

#[derive(Deserialize)]
struct Suggestion {
    plant_name: Option<String>,
    #[serde(default)]
    probability: f64,
    #[serde(default)]
    plant_details: Option<PlantDetails>,
}

#[derive(Deserialize, Default)]
struct PlantDetails {
    #[serde(default)]
    common_names: Option<Vec<String>>,
    /// Usually a plain hint such as `frequent`; anything else counts as average.
    #[serde(default)]
    watering: Option<serde_json::Value>,
}

impl From<Suggestion> for PlantCandidate {
    fn from(value: Suggestion) -> Self {
        let details = value.plant_details.unwrap_or_default();
        let watering = details
            .watering
            .as_ref()
            .and_then(serde_json::Value::as_str)
            .map(WateringFrequency::from_hint)
            .unwrap_or_default();

        Self {
            name: value
                .plant_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| UNKNOWN_NAME.to_owned()),
            common_name: details
                .common_names
                .and_then(|names| names.into_iter().next())
                .unwrap_or_else(|| UNKNOWN_COMMON_NAME.to_owned()),
            watering,
            probability: value.probability,
        }
    }
}

/// Photo identification through the plant.id v2 API.
pub struct PlantIdClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    min_probability: f64,
}

impl PlantIdClient {
    pub fn new(settings: &IdentificationSettings) -> Result<Self, ServiceError> {
        Ok(Self {
            client: build_client()?,
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_owned(),
            min_probability: settings.min_probability,
        })
    }
}

#[async_trait]
impl PlantIdentification for PlantIdClient {
    async fn identify(&self, image: &[u8]) -> Result<Identification, ServiceError> {
        if image.is_empty() {
            return Err(ServiceError::MissingInput("image"));
        }

        let request = IdentifyRequest {
            api_key: &self.api_key,
            images: vec![STANDARD.encode(image)],
            modifiers: ["crops_fast", "similar_images"],
            plant_language: "en",
            plant_details: ["common_names", "watering"],
        };

        let response = self
            .client
            .post(format!("{}/v2/identify", self.base_url))
            .json(&request)
            .send()
            .await?;

        let body: IdentifyResponse = ensure_success(SERVICE, response).await?.json().await?;

        let Some(best) = body.suggestions.into_iter().next() else {
            log::info!("[IDENTIFY] No suggestions returned");
            return Ok(Identification::NoMatch);
        };

        if best.probability < self.min_probability {
            log::info!(
                "[IDENTIFY] Best suggestion below threshold: {:.3} < {:.3}",
                best.probability,
                self.min_probability
            );
            return Ok(Identification::NoMatch);
        }

        Ok(Identification::Match(best.into()))
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    fn client(server: &MockServer) -> PlantIdClient {
        PlantIdClient::new(&IdentificationSettings {
            api_key: "plant-key".to_owned(),
            base_url: server.base_url(),
            min_probability: 0.2,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn best_suggestion_is_returned() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v2/identify")
                .header("content-type", "application/json");
            then.status(200).json_body(json!({
                "suggestions": [
                    {
                        "plant_name": "Monstera deliciosa",
                        "probability": 0.93,
                        "plant_details": {
                            "common_names": ["Swiss cheese plant", "Split-leaf philodendron"],
                            "watering": "frequent"
                        }
                    },
                    { "plant_name": "Philodendron", "probability": 0.04 }
                ]
            }));
        });

        let identification = client(&server).identify(b"jpeg bytes").await.unwrap();

        mock.assert();
        assert_eq!(
            identification,
            Identification::Match(PlantCandidate {
                name: "Monstera deliciosa".to_owned(),
                common_name: "Swiss cheese plant".to_owned(),
                watering: WateringFrequency::Frequent,
                probability: 0.93,
            })
        );
    }

    #[tokio::test]
    async fn missing_details_fall_back_to_defaults() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v2/identify");
            then.status(200).json_body(json!({
                "suggestions": [{ "probability": 0.5, "plant_details": { "watering": { "min": 1, "max": 2 } } }]
            }));
        });

        let Identification::Match(candidate) = client(&server).identify(b"jpeg").await.unwrap()
        else {
            panic!("Expected a match");
        };

        assert_eq!(candidate.name, "Unknown Plant");
        assert_eq!(candidate.common_name, "Indoor Plant");
        assert_eq!(candidate.watering, WateringFrequency::Average);
    }

    #[tokio::test]
    async fn unlikely_or_empty_suggestions_are_no_match() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/v2/identify");
            then.status(200)
                .json_body(json!({ "suggestions": [{ "plant_name": "Weed", "probability": 0.05 }] }));
        });

        let identification = client(&server).identify(b"jpeg").await.unwrap();

        assert_eq!(identification, Identification::NoMatch);
    }

    #[tokio::test]
    async fn empty_image_is_rejected_without_a_request() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST).path("/v2/identify");
            then.status(200).json_body(json!({ "suggestions": [] }));
        });

        let result = client(&server).identify(&[]).await;

        assert!(matches!(result, Err(ServiceError::MissingInput("image"))));
        mock.assert_hits(0);
    }
}
