use std::fmt;

use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub light_lux: f64,
    pub temperature: f64,
    pub humidity: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TemperatureRange {
    pub min: f64,
    pub max: f64,
}

impl Default for TemperatureRange {
    fn default() -> Self {
        Self {
            min: 20.0,
            max: 25.0,
        }
    }
}

impl TemperatureRange {
    pub fn check(&self, reading: &SensorReading) -> Option<SensorAlert> {
        if reading.temperature < self.min {
            Some(SensorAlert::TooCold(reading.temperature))
        } else if reading.temperature > self.max {
            Some(SensorAlert::TooHot(reading.temperature))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SensorAlert {
    TooCold(f64),
    TooHot(f64),
}

impl fmt::Display for SensorAlert {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorAlert::TooCold(temperature) => write!(
                f,
                "Low temperature alert: {temperature:.2}°C is too low. Move your plant to a warmer location."
            ),
            SensorAlert::TooHot(temperature) => write!(
                f,
                "High temperature alert: {temperature:.2}°C is too high. Move your plant to a cooler location."
            ),
        }
    }
}
