use std::sync::Arc;

use chrono::{DateTime, Utc};

use sprout_models::{
    plant::{NewPlant, Plant, PlantId},
    user::UserId,
};

use crate::{
    document::{CollectionPath, DocumentStore, Query, Record, StorageError, to_fields},
    subscription::TypedSubscription,
};

fn parse_plant(record: &Record) -> Result<Plant, StorageError> {
    let mut plant: Plant = record.parse()?;
    plant.id = record.id.clone();
    Ok(plant)
}

pub struct PlantStorage {
    store: Arc<dyn DocumentStore>,
}

impl PlantStorage {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Validates and stores a plant. Nothing is written if validation fails.
    pub async fn add(
        &self,
        user_id: &UserId,
        new_plant: NewPlant,
        now: DateTime<Utc>,
    ) -> Result<Plant, StorageError> {
        let mut plant = new_plant.into_plant(now)?;
        plant.id = self
            .store
            .add_record(&CollectionPath::plants(user_id), to_fields(&plant)?)
            .await?;

        log::info!("[PLANT] User {user_id} added plant {} ({})", plant.id, plant.name);
        Ok(plant)
    }

    pub async fn get(
        &self,
        user_id: &UserId,
        plant_id: &PlantId,
    ) -> Result<Option<Plant>, StorageError> {
        let record = self
            .store
            .get_record(&CollectionPath::plants(user_id).doc(plant_id.clone()))
            .await?;

        record.as_ref().map(parse_plant).transpose()
    }

    /// Plants in the order they were added.
    pub async fn list(&self, user_id: &UserId) -> Result<Vec<Plant>, StorageError> {
        let records = self
            .store
            .query(&Query::collection(CollectionPath::plants(user_id)))
            .await?;

        records.iter().map(parse_plant).collect()
    }

    pub async fn subscribe(
        &self,
        user_id: &UserId,
    ) -> Result<TypedSubscription<Plant>, StorageError> {
        let subscription = self
            .store
            .subscribe(Query::collection(CollectionPath::plants(user_id)))
            .await?;

        Ok(TypedSubscription::new(subscription, parse_plant))
    }

    /// Removes the plant together with its care logs and reminder config.
    pub async fn delete(&self, user_id: &UserId, plant_id: &PlantId) -> Result<(), StorageError> {
        self.store
            .delete_collection(&CollectionPath::care_logs(user_id, plant_id))
            .await?;
        self.store
            .delete_record(&CollectionPath::reminders(user_id).doc(plant_id.clone()))
            .await?;
        self.store
            .delete_record(&CollectionPath::plants(user_id).doc(plant_id.clone()))
            .await?;

        log::info!("[PLANT] User {user_id} deleted plant {plant_id}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use sprout_models::{
        ValidationError,
        care_log::{CareAction, NewCareLog},
        reminder::{RepeatInterval, StoredReminder, TimeOfDay},
    };

    use super::*;
    use crate::{CareLogStorage, ReminderConfigStorage, SqliteDocumentStore};

    fn new_plant(name: &str) -> NewPlant {
        NewPlant {
            name: name.to_owned(),
            plant_type: "Monstera deliciosa".to_owned(),
            location: "Bedroom".to_owned(),
            ..Default::default()
        }
    }

    fn user() -> UserId {
        "user-1".to_owned()
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn plants_are_listed_in_insertion_order(pool: sqlx::SqlitePool) {
        let plants = PlantStorage::new(Arc::new(SqliteDocumentStore::new(pool)));

        let first = plants.add(&user(), new_plant("Monty"), Utc::now()).await.unwrap();
        let second = plants.add(&user(), new_plant("Fern"), Utc::now()).await.unwrap();

        let listed = plants.list(&user()).await.unwrap();
        assert_eq!(listed, vec![first.clone(), second]);
        assert_eq!(plants.get(&user(), &first.id).await.unwrap(), Some(first));
        assert!(plants.list(&"someone-else".to_owned()).await.unwrap().is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn invalid_plant_is_not_stored(pool: sqlx::SqlitePool) {
        let plants = PlantStorage::new(Arc::new(SqliteDocumentStore::new(pool)));

        let result = plants
            .add(
                &user(),
                NewPlant {
                    plant_type: String::new(),
                    ..new_plant("Monty")
                },
                Utc::now(),
            )
            .await;

        assert!(matches!(
            result,
            Err(StorageError::Validation(ValidationError::MissingField("type")))
        ));
        assert!(plants.list(&user()).await.unwrap().is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn deleting_plant_removes_logs_and_reminder(pool: sqlx::SqlitePool) {
        let store: Arc<dyn DocumentStore> = Arc::new(SqliteDocumentStore::new(pool));
        let plants = PlantStorage::new(store.clone());
        let logs = CareLogStorage::new(store.clone());
        let reminders = ReminderConfigStorage::new(store);

        let plant = plants.add(&user(), new_plant("Monty"), Utc::now()).await.unwrap();
        logs.add(
            &user(),
            &plant.id,
            NewCareLog {
                action: CareAction::Watered,
                note: None,
            },
            Utc::now(),
        )
        .await
        .unwrap();
        reminders
            .save(
                &user(),
                &StoredReminder {
                    plant_id: plant.id.clone(),
                    plant_name: plant.name.clone(),
                    time_of_day: TimeOfDay::new(8, 0).unwrap(),
                    repeat_interval: RepeatInterval::WEEKLY,
                    next_trigger: None,
                },
            )
            .await
            .unwrap();

        plants.delete(&user(), &plant.id).await.unwrap();

        assert_eq!(plants.get(&user(), &plant.id).await.unwrap(), None);
        assert!(logs.list(&user(), &plant.id).await.unwrap().is_empty());
        assert!(reminders.list_for_user(&user()).await.unwrap().is_empty());
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn plant_subscription_follows_additions_and_deletions(pool: sqlx::SqlitePool) {
        let plants = PlantStorage::new(Arc::new(SqliteDocumentStore::new(pool)));
        let mut subscription = plants.subscribe(&user()).await.unwrap();
        assert!(subscription.next().await.unwrap().unwrap().is_empty());

        let plant = plants.add(&user(), new_plant("Monty"), Utc::now()).await.unwrap();
        let snapshot = subscription.next().await.unwrap().unwrap();
        assert_eq!(snapshot, vec![plant.clone()]);

        plants.delete(&user(), &plant.id).await.unwrap();
        assert!(subscription.next().await.unwrap().unwrap().is_empty());
    }
}
