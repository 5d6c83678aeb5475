use std::sync::Arc;

use sprout_models::weather::{CareTips, Coordinates};

use crate::{CareInstructionGenerator, ServiceError, WeatherLookup};

/// Weather-aware care tips: current conditions at the user's location feed
/// the instruction prompt.
pub struct CareAdvisor {
    weather: Arc<dyn WeatherLookup>,
    instructions: Arc<dyn CareInstructionGenerator>,
}

impl CareAdvisor {
    pub fn new(
        weather: Arc<dyn WeatherLookup>,
        instructions: Arc<dyn CareInstructionGenerator>,
    ) -> Self {
        Self {
            weather,
            instructions,
        }
    }

    pub async fn tips(
        &self,
        plant_type: &str,
        location: Coordinates,
    ) -> Result<CareTips, ServiceError> {
        if plant_type.trim().is_empty() {
            return Err(ServiceError::MissingInput("plant type"));
        }

        let weather = self.weather.fetch_weather(location).await?;
        log::info!(
            "[TIPS] {plant_type}: {:.1}°C, {}",
            weather.temperature,
            weather.condition
        );

        let instructions = self
            .instructions
            .generate_instructions(plant_type, weather.temperature)
            .await?;

        Ok(CareTips {
            weather,
            instructions,
        })
    }
}
