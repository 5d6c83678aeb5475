use serde::Deserialize;

use crate::sensor::TemperatureRange;

#[derive(Deserialize, Debug)]
pub struct TelegramSettings {
    pub token: String,
}

#[derive(Deserialize, Debug)]
pub struct DatabaseSettings {
    pub url: String,
}

#[derive(Deserialize, Debug)]
pub struct WeatherSettings {
    pub api_key: String,
    #[serde(default = "default_weather_url")]
    pub base_url: String,
}

#[derive(Deserialize, Debug)]
pub struct IdentificationSettings {
    pub api_key: String,
    #[serde(default = "default_identification_url")]
    pub base_url: String,
    #[serde(default = "default_min_probability")]
    pub min_probability: f64,
}

#[derive(Deserialize, Debug)]
pub struct CareAdviceSettings {
    pub api_key: String,
    #[serde(default = "default_care_advice_url")]
    pub base_url: String,
    #[serde(default = "default_care_advice_model")]
    pub model: String,
}

#[derive(Deserialize, Debug)]
pub struct StoreSearchSettings {
    #[serde(default = "default_store_search_url")]
    pub base_url: String,
    #[serde(default = "default_store_search_limit")]
    pub limit: u32,
}

impl Default for StoreSearchSettings {
    fn default() -> Self {
        Self {
            base_url: default_store_search_url(),
            limit: default_store_search_limit(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy)]
pub struct SensorSettings {
    #[serde(default = "default_sensor_interval")]
    pub interval_secs: u64,
    #[serde(default)]
    pub temperature: TemperatureRange,
}

impl Default for SensorSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_sensor_interval(),
            temperature: TemperatureRange::default(),
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct Settings {
    pub telegram: TelegramSettings,
    pub database: DatabaseSettings,
    pub weather: WeatherSettings,
    pub identification: IdentificationSettings,
    pub care_advice: CareAdviceSettings,
    #[serde(default)]
    pub store_search: StoreSearchSettings,
    #[serde(default)]
    pub sensor: SensorSettings,
}

fn default_weather_url() -> String {
    "https://api.openweathermap.org".to_owned()
}

fn default_identification_url() -> String {
    "https://api.plant.id".to_owned()
}

fn default_min_probability() -> f64 {
    0.1
}

fn default_care_advice_url() -> String {
    "https://generativelanguage.googleapis.com".to_owned()
}

fn default_care_advice_model() -> String {
    "gemini-1.5-flash".to_owned()
}

fn default_store_search_url() -> String {
    "https://nominatim.openstreetmap.org".to_owned()
}

fn default_store_search_limit() -> u32 {
    10
}

fn default_sensor_interval() -> u64 {
    5
}
