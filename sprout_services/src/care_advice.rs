use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use sprout_models::settings::CareAdviceSettings;

use crate::{
    ServiceError,
    http::{build_client, ensure_success},
};

const SERVICE: &str = "Gemini";
const NO_INSTRUCTIONS: &str = "No care instructions returned.";

#[async_trait]
pub trait CareInstructionGenerator: Send + Sync + 'static {
    /// Free-form care advice for `plant_type` at `temperature` °C.
    async fn generate_instructions(
        &self,
        plant_type: &str,
        temperature: f64,
    ) -> Result<String, ServiceError>;
}

fn prompt(plant_type: &str, temperature: f64) -> String {
    format!(
        "Give simple plant care instructions for a {plant_type} plant in {temperature}°C weather. \
Include advice on watering, sunlight, and humidity."
    )
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

impl GenerateResponse {
    fn into_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .next()?
            .content?
            .parts
            .into_iter()
            .next()?
            .text
            .filter(|text| !text.trim().is_empty())
    }
}

/// Text generation through the Gemini `generateContent` endpoint.
pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(settings: &CareAdviceSettings) -> Result<Self, ServiceError> {
        Ok(Self {
            client: build_client()?,
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_owned(),
            model: settings.model.clone(),
        })
    }
}

#[async_trait]
impl CareInstructionGenerator for GeminiClient {
    async fn generate_instructions(
        &self,
        plant_type: &str,
        temperature: f64,
    ) -> Result<String, ServiceError> {
        let plant_type = plant_type.trim();
        if plant_type.is_empty() {
            return Err(ServiceError::MissingInput("plant type"));
        }
        if !temperature.is_finite() {
            return Err(ServiceError::MissingInput("temperature"));
        }

        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt(plant_type, temperature)),
                }],
            }],
        };

        let response = self
            .client
            .post(format!(
                "{}/v1beta/models/{}:generateContent",
                self.base_url, self.model
            ))
            .query(&[("key", &self.api_key)])
            .json(&request)
            .send()
            .await?;

        let body: GenerateResponse = ensure_success(SERVICE, response).await?.json().await?;
        Ok(body
            .into_text()
            .unwrap_or_else(|| NO_INSTRUCTIONS.to_owned()))
    }
}
