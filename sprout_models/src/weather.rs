use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WeatherReport {
    /// Degrees Celsius.
    pub temperature: f64,
    /// Relative humidity, percent.
    pub humidity: f64,
    pub condition: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CareTips {
    pub weather: WeatherReport,
    pub instructions: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlantStore {
    pub name: String,
    pub coordinates: Coordinates,
}
