use async_trait::async_trait;
use serde::Deserialize;

use sprout_models::{
    settings::WeatherSettings,
    weather::{Coordinates, WeatherReport},
};

use crate::{
    ServiceError,
    http::{build_client, ensure_success},
};

const SERVICE: &str = "OpenWeatherMap";

#[async_trait]
pub trait WeatherLookup: Send + Sync + 'static {
    async fn fetch_weather(&self, coordinates: Coordinates) -> Result<WeatherReport, ServiceError>;
}

#[derive(Deserialize)]
struct CurrentWeather {
    main: MainReadings,
    #[serde(default)]
    weather: Vec<Condition>,
}

#[derive(Deserialize)]
struct MainReadings {
    temp: f64,
    humidity: f64,
}

#[derive(Deserialize)]
struct Condition {
    description: String,
}

impl From<CurrentWeather> for WeatherReport {
    fn from(value: CurrentWeather) -> Self {
        Self {
            temperature: value.main.temp,
            humidity: value.main.humidity,
            condition: value
                .weather
                .into_iter()
                .next()
                .map(|condition| condition.description)
                .unwrap_or_default(),
        }
    }
}

/// Current conditions from the OpenWeatherMap API, in metric units.
pub struct OpenWeatherClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenWeatherClient {
    pub fn new(settings: &WeatherSettings) -> Result<Self, ServiceError> {
        Ok(Self {
            client: build_client()?,
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_owned(),
        })
    }
}

#[async_trait]
impl WeatherLookup for OpenWeatherClient {
    async fn fetch_weather(&self, coordinates: Coordinates) -> Result<WeatherReport, ServiceError> {
        let response = self
            .client
            .get(format!("{}/data/2.5/weather", self.base_url))
            .query(&[
                ("lat", coordinates.latitude.to_string()),
                ("lon", coordinates.longitude.to_string()),
                ("appid", self.api_key.clone()),
                ("units", "metric".to_owned()),
            ])
            .send()
            .await?;

        let weather: CurrentWeather = ensure_success(SERVICE, response).await?.json().await?;
        Ok(weather.into())
    }
}
