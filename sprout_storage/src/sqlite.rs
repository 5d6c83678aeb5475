use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    document::{
        CollectionPath, Direction, DocumentPath, DocumentStore, Fields, Query, Record, RecordId,
        StorageError,
    },
    subscription::{Subscription, SubscriptionRegistry},
};

#[derive(Debug, sqlx::FromRow)]
struct DocumentRow {
    id: String,
    fields: String,
}

impl TryFrom<DocumentRow> for Record {
    type Error = StorageError;

    fn try_from(value: DocumentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id,
            fields: serde_json::from_str(&value.fields)?,
        })
    }
}

pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<(), StorageError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub struct SqliteDocumentStore {
    pool: sqlx::SqlitePool,
    subscriptions: Arc<SubscriptionRegistry>,
}

impl SqliteDocumentStore {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self {
            pool,
            subscriptions: Arc::new(SubscriptionRegistry::default()),
        }
    }

    async fn fetch(&self, query: &Query) -> Result<Vec<Record>, StorageError> {
        let rows = match &query.order_by {
            None => {
                sqlx::query_as::<_, DocumentRow>(
                    "SELECT id, fields FROM documents WHERE collection = ? ORDER BY seq",
                )
                .bind(query.collection.as_str())
                .fetch_all(&self.pool)
                .await?
            }
            Some(order_by) => {
                let direction = match order_by.direction {
                    Direction::Ascending => "ASC",
                    Direction::Descending => "DESC",
                };
                let sql = format!(
                    "SELECT id, fields FROM documents
WHERE collection = ?
ORDER BY json_extract(fields, ?) {direction}, seq"
                );

                sqlx::query_as::<_, DocumentRow>(&sql)
                    .bind(query.collection.as_str())
                    .bind(format!("$.{}", order_by.field))
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.into_iter().map(Record::try_from).collect()
    }

    /// Pushes a fresh snapshot to every subscriber of `collection`.
    async fn publish(&self, collection: &CollectionPath, nested: bool) {
        for (query, sender) in self.subscriptions.subscribers_of(collection, nested) {
            match self.fetch(&query).await {
                Ok(snapshot) => {
                    sender.send_replace(snapshot);
                }
                Err(err) => {
                    log::error!(
                        "[SUBSCRIBE] Failed to refresh snapshot of {}: {err}",
                        query.collection
                    );
                }
            }
        }
    }
}

#[async_trait]
impl DocumentStore for SqliteDocumentStore {
    async fn add_record(
        &self,
        collection: &CollectionPath,
        fields: Fields,
    ) -> Result<RecordId, StorageError> {
        let id = Uuid::new_v4().to_string();
        let fields = serde_json::to_string(&fields)?;

        sqlx::query("INSERT INTO documents (collection, id, fields) VALUES (?, ?, ?)")
            .bind(collection.as_str())
            .bind(&id)
            .bind(fields)
            .execute(&self.pool)
            .await?;

        log::debug!("[STORE] Added {collection}/{id}");
        self.publish(collection, false).await;
        Ok(id)
    }

    async fn set_record(&self, path: &DocumentPath, fields: Fields) -> Result<(), StorageError> {
        let fields = serde_json::to_string(&fields)?;

        sqlx::query(
            "INSERT INTO documents (collection, id, fields) VALUES (?, ?, ?)
ON CONFLICT (collection, id) DO UPDATE SET fields = excluded.fields",
        )
        .bind(path.collection.as_str())
        .bind(&path.id)
        .bind(fields)
        .execute(&self.pool)
        .await?;

        log::debug!("[STORE] Set {path}");
        self.publish(&path.collection, false).await;
        Ok(())
    }

    async fn get_record(&self, path: &DocumentPath) -> Result<Option<Record>, StorageError> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT id, fields FROM documents WHERE collection = ? AND id = ?",
        )
        .bind(path.collection.as_str())
        .bind(&path.id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Record::try_from).transpose()
    }

    async fn query(&self, query: &Query) -> Result<Vec<Record>, StorageError> {
        self.fetch(query).await
    }

    async fn delete_record(&self, path: &DocumentPath) -> Result<(), StorageError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = ? AND id = ?")
            .bind(path.collection.as_str())
            .bind(&path.id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() > 0 {
            log::debug!("[STORE] Deleted {path}");
            self.publish(&path.collection, false).await;
        }
        Ok(())
    }

    async fn delete_collection(&self, collection: &CollectionPath) -> Result<u64, StorageError> {
        let result =
            sqlx::query("DELETE FROM documents WHERE collection = ? OR instr(collection, ?) = 1")
                .bind(collection.as_str())
                .bind(format!("{collection}/"))
                .execute(&self.pool)
                .await?;

        let removed = result.rows_affected();
        if removed > 0 {
            log::debug!("[STORE] Deleted {removed} record(s) under {collection}");
            self.publish(collection, true).await;
        }
        Ok(removed)
    }

    async fn subscribe(&self, query: Query) -> Result<Subscription, StorageError> {
        let snapshot = self.fetch(&query).await?;
        Ok(self.subscriptions.register(query, snapshot))
    }
}
