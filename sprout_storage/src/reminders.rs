use std::sync::Arc;

use sprout_models::{plant::PlantId, reminder::StoredReminder, user::UserId};

use crate::document::{CollectionPath, DocumentStore, Query, StorageError, to_fields};

/// Reminder configs live at `users/{uid}/reminders/{plantId}`, one per plant.
pub struct ReminderConfigStorage {
    store: Arc<dyn DocumentStore>,
}

impl ReminderConfigStorage {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn save(&self, user_id: &UserId, reminder: &StoredReminder) -> Result<(), StorageError> {
        let path = CollectionPath::reminders(user_id).doc(reminder.plant_id.clone());
        self.store.set_record(&path, to_fields(reminder)?).await
    }

    pub async fn get(
        &self,
        user_id: &UserId,
        plant_id: &PlantId,
    ) -> Result<Option<StoredReminder>, StorageError> {
        let record = self
            .store
            .get_record(&CollectionPath::reminders(user_id).doc(plant_id.clone()))
            .await?;

        record.as_ref().map(|record| record.parse()).transpose()
    }

    pub async fn remove(&self, user_id: &UserId, plant_id: &PlantId) -> Result<(), StorageError> {
        self.store
            .delete_record(&CollectionPath::reminders(user_id).doc(plant_id.clone()))
            .await
    }

    pub async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<StoredReminder>, StorageError> {
        let records = self
            .store
            .query(&Query::collection(CollectionPath::reminders(user_id)))
            .await?;

        records.iter().map(|record| record.parse()).collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use sprout_models::reminder::{RepeatInterval, TimeOfDay};

    use super::*;
    use crate::SqliteDocumentStore;

    fn stored(plant_id: &str, hour: u32, days: u32) -> StoredReminder {
        StoredReminder {
            plant_id: plant_id.to_owned(),
            plant_name: "Calathea".to_owned(),
            time_of_day: TimeOfDay::new(hour, 0).unwrap(),
            repeat_interval: RepeatInterval::new(days).unwrap(),
            next_trigger: None,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn saving_again_replaces_the_config(pool: sqlx::SqlitePool) {
        let reminders = ReminderConfigStorage::new(Arc::new(SqliteDocumentStore::new(pool)));
        let user_id = "user-1".to_owned();

        reminders.save(&user_id, &stored("p1", 8, 1)).await.unwrap();
        reminders.save(&user_id, &stored("p2", 9, 3)).await.unwrap();
        reminders.save(&user_id, &stored("p1", 18, 7)).await.unwrap();

        let listed = reminders.list_for_user(&user_id).await.unwrap();
        assert_eq!(listed, vec![stored("p1", 18, 7), stored("p2", 9, 3)]);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn next_trigger_survives_a_round_trip(pool: sqlx::SqlitePool) {
        let reminders = ReminderConfigStorage::new(Arc::new(SqliteDocumentStore::new(pool)));
        let user_id = "user-1".to_owned();
        let next_trigger = Utc.with_ymd_and_hms(2025, 6, 8, 6, 0, 0).unwrap();
        let reminder = StoredReminder {
            next_trigger: Some(next_trigger),
            ..stored("p1", 8, 7)
        };

        reminders.save(&user_id, &reminder).await.unwrap();

        assert_eq!(
            reminders.get(&user_id, &"p1".to_owned()).await.unwrap(),
            Some(reminder)
        );
        assert_eq!(reminders.get(&user_id, &"p2".to_owned()).await.unwrap(), None);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn removed_config_is_gone(pool: sqlx::SqlitePool) {
        let reminders = ReminderConfigStorage::new(Arc::new(SqliteDocumentStore::new(pool)));
        let user_id = "user-1".to_owned();
        reminders.save(&user_id, &stored("p1", 8, 1)).await.unwrap();

        reminders.remove(&user_id, &"p1".to_owned()).await.unwrap();

        assert!(reminders.list_for_user(&user_id).await.unwrap().is_empty());
    }
}
