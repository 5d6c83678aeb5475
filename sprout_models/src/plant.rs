use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ValidationError;

pub type PlantId = String;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    #[default]
    Healthy,
    Unhealthy,
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy => f.write_str("healthy"),
            HealthStatus::Unhealthy => f.write_str("unhealthy"),
        }
    }
}

impl FromStr for HealthStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "healthy" => Ok(HealthStatus::Healthy),
            "unhealthy" => Ok(HealthStatus::Unhealthy),
            other => Err(ValidationError::invalid(
                "healthStatus",
                format!("unknown status `{other}`"),
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plant {
    #[serde(skip)]
    pub id: PlantId,
    pub name: String,
    #[serde(rename = "type")]
    pub plant_type: String,
    pub location: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub health_status: HealthStatus,
    #[serde(default)]
    pub needs_water: bool,
    pub date_added: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPlant {
    pub name: String,
    pub plant_type: String,
    pub location: String,
    pub notes: String,
    pub health_status: HealthStatus,
    pub needs_water: bool,
}

impl NewPlant {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("name", &self.name),
            ("type", &self.plant_type),
            ("location", &self.location),
        ];

        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingField(field));
            }
        }

        Ok(())
    }

    /// Builds the record that gets stored. The id is assigned by the store.
    pub fn into_plant(self, date_added: DateTime<Utc>) -> Result<Plant, ValidationError> {
        self.validate()?;

        Ok(Plant {
            id: PlantId::new(),
            name: self.name.trim().to_owned(),
            plant_type: self.plant_type.trim().to_owned(),
            location: self.location.trim().to_owned(),
            notes: self.notes.trim().to_owned(),
            health_status: self.health_status,
            needs_water: self.needs_water,
            date_added,
        })
    }
}
