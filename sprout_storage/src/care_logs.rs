use std::sync::Arc;

use chrono::{DateTime, Utc};

use sprout_models::{
    care_log::{CareLogEntry, NewCareLog},
    plant::PlantId,
    user::UserId,
};

use crate::{
    document::{CollectionPath, Direction, DocumentStore, Query, Record, StorageError, to_fields},
    subscription::TypedSubscription,
};

fn parse_entry(record: &Record) -> Result<CareLogEntry, StorageError> {
    let mut entry: CareLogEntry = record.parse()?;
    entry.id = record.id.clone();
    Ok(entry)
}

fn newest_first(user_id: &UserId, plant_id: &PlantId) -> Query {
    Query::collection(CollectionPath::care_logs(user_id, plant_id))
        .order_by("timestamp", Direction::Descending)
}

pub struct CareLogStorage {
    store: Arc<dyn DocumentStore>,
}

impl CareLogStorage {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn add(
        &self,
        user_id: &UserId,
        plant_id: &PlantId,
        new_log: NewCareLog,
        now: DateTime<Utc>,
    ) -> Result<CareLogEntry, StorageError> {
        let mut entry = new_log.into_entry(now);
        entry.id = self
            .store
            .add_record(
                &CollectionPath::care_logs(user_id, plant_id),
                to_fields(&entry)?,
            )
            .await?;

        log::info!("[CARE] {} logged for plant {plant_id}", entry.action);
        Ok(entry)
    }

    pub async fn list(
        &self,
        user_id: &UserId,
        plant_id: &PlantId,
    ) -> Result<Vec<CareLogEntry>, StorageError> {
        let records = self.store.query(&newest_first(user_id, plant_id)).await?;
        records.iter().map(parse_entry).collect()
    }

    pub async fn subscribe(
        &self,
        user_id: &UserId,
        plant_id: &PlantId,
    ) -> Result<TypedSubscription<CareLogEntry>, StorageError> {
        let subscription = self.store.subscribe(newest_first(user_id, plant_id)).await?;
        Ok(TypedSubscription::new(subscription, parse_entry))
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeDelta;
    use sprout_models::care_log::CareAction;

    use super::*;
    use crate::SqliteDocumentStore;

    fn ids() -> (UserId, PlantId) {
        ("user-1".to_owned(), "plant-1".to_owned())
    }

    fn log(action: CareAction, note: Option<&str>) -> NewCareLog {
        NewCareLog {
            action,
            note: note.map(str::to_owned),
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn logs_are_listed_newest_first(pool: sqlx::SqlitePool) {
        let logs = CareLogStorage::new(Arc::new(SqliteDocumentStore::new(pool)));
        let (user_id, plant_id) = ids();
        let start = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();

        logs.add(&user_id, &plant_id, log(CareAction::Fertilized, None), start + TimeDelta::hours(2))
            .await
            .unwrap();
        logs.add(&user_id, &plant_id, log(CareAction::Watered, Some("half a cup")), start)
            .await
            .unwrap();
        logs.add(&user_id, &plant_id, log(CareAction::Pruned, None), start + TimeDelta::days(1))
            .await
            .unwrap();

        let listed = logs.list(&user_id, &plant_id).await.unwrap();

        let actions: Vec<_> = listed.iter().map(|entry| entry.action).collect();
        assert_eq!(
            actions,
            vec![CareAction::Pruned, CareAction::Fertilized, CareAction::Watered]
        );
        assert_eq!(listed[2].note.as_deref(), Some("half a cup"));
        assert_eq!(listed[2].timestamp, start);
    }

    #[sqlx::test(migrations = "./migrations")]
    async fn subscription_sees_new_entries_on_top(pool: sqlx::SqlitePool) {
        let logs = CareLogStorage::new(Arc::new(SqliteDocumentStore::new(pool)));
        let (user_id, plant_id) = ids();
        let start = DateTime::from_timestamp_millis(1_700_000_000_000).unwrap();
        logs.add(&user_id, &plant_id, log(CareAction::Watered, None), start)
            .await
            .unwrap();

        let mut subscription = logs.subscribe(&user_id, &plant_id).await.unwrap();
        assert_eq!(subscription.next().await.unwrap().unwrap().len(), 1);

        let newest = logs
            .add(&user_id, &plant_id, log(CareAction::Pruned, None), start + TimeDelta::hours(1))
            .await
            .unwrap();

        let snapshot = subscription.next().await.unwrap().unwrap();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0], newest);

        subscription.unsubscribe();
    }
}
