mod care_advice;
mod care_tips;
mod error;
mod http;
mod identification;
mod sensor;
mod stores;
mod weather;

pub use care_advice::{CareInstructionGenerator, GeminiClient};
pub use care_tips::CareAdvisor;
pub use error::ServiceError;
pub use identification::{PlantIdClient, PlantIdentification};
pub use sensor::{SensorMonitor, SensorSource, SimulatedSensor};
pub use stores::{NominatimClient, StoreLocator};
pub use weather::{OpenWeatherClient, WeatherLookup};
