use std::{collections::HashMap, sync::Arc};

use teloxide::types::ChatId;
use tokio::sync::Mutex;

use sprout_models::{plant::Plant, settings::SensorSettings, user::Session};
use sprout_scheduler::ReminderScheduler;
use sprout_services::{CareAdvisor, PlantIdentification, SensorMonitor, StoreLocator};
use sprout_storage::{CareLogStorage, PlantStorage, ReminderConfigStorage, UserStorage};

use crate::parsing::PlantNumber;

/// Everything the handlers need, shared across updates.
pub struct AppContext {
    pub users: Arc<UserStorage>,
    pub plants: PlantStorage,
    pub care_logs: CareLogStorage,
    pub reminder_configs: ReminderConfigStorage,
    pub scheduler: Arc<dyn ReminderScheduler>,
    pub advisor: CareAdvisor,
    pub identifier: Arc<dyn PlantIdentification>,
    pub stores: Arc<dyn StoreLocator>,
    pub sensor_settings: SensorSettings,
    pub monitors: Mutex<HashMap<ChatId, SensorMonitor>>,
}

impl AppContext {
    pub(crate) async fn plant_by_number(
        &self,
        session: &Session,
        number: PlantNumber,
    ) -> anyhow::Result<Option<Plant>> {
        let plants = self.plants.list(session.user_id()).await?;
        Ok(plants.into_iter().nth(number.index()))
    }
}
