use std::fmt;

use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use thiserror::Error;

use sprout_models::{ValidationError, plant::PlantId, user::UserId};

use crate::subscription::Subscription;

pub type RecordId = String;
pub type Fields = serde_json::Map<String, Value>;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("Malformed record: {0}")]
    Serde(#[from] serde_json::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Records must be JSON objects")]
    NotAnObject,
    #[error("Record {0} not found")]
    NotFound(DocumentPath),
}

/// Slash separated path of a collection, e.g. `users/{uid}/plants`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn users() -> Self {
        Self("users".to_owned())
    }

    pub fn plants(user_id: &UserId) -> Self {
        Self(format!("users/{user_id}/plants"))
    }

    pub fn care_logs(user_id: &UserId, plant_id: &PlantId) -> Self {
        Self(format!("users/{user_id}/plants/{plant_id}/logs"))
    }

    pub fn reminders(user_id: &UserId) -> Self {
        Self(format!("users/{user_id}/reminders"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn doc(&self, id: impl Into<RecordId>) -> DocumentPath {
        DocumentPath {
            collection: self.clone(),
            id: id.into(),
        }
    }

    /// True for this collection and every collection nested below it.
    pub fn contains(&self, other: &CollectionPath) -> bool {
        other.0 == self.0
            || other
                .0
                .strip_prefix(&self.0)
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPath {
    pub collection: CollectionPath,
    pub id: RecordId,
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub id: RecordId,
    pub fields: Fields,
}

impl Record {
    pub fn parse<T: DeserializeOwned>(&self) -> Result<T, StorageError> {
        Ok(serde_json::from_value(Value::Object(self.fields.clone()))?)
    }
}

pub fn to_fields<T: Serialize>(value: &T) -> Result<Fields, StorageError> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        _ => Err(StorageError::NotAnObject),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// All records of one collection, in insertion order unless ordered by a
/// field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub collection: CollectionPath,
    pub order_by: Option<OrderBy>,
}

impl Query {
    pub fn collection(collection: CollectionPath) -> Self {
        Self {
            collection,
            order_by: None,
        }
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Stores `fields` under a freshly generated id.
    async fn add_record(
        &self,
        collection: &CollectionPath,
        fields: Fields,
    ) -> Result<RecordId, StorageError>;

    /// Creates or replaces the record at `path`.
    async fn set_record(&self, path: &DocumentPath, fields: Fields) -> Result<(), StorageError>;

    async fn get_record(&self, path: &DocumentPath) -> Result<Option<Record>, StorageError>;

    async fn query(&self, query: &Query) -> Result<Vec<Record>, StorageError>;

    /// Deleting a missing record is not an error.
    async fn delete_record(&self, path: &DocumentPath) -> Result<(), StorageError>;

    /// Removes every record of the collection and of the collections nested
    /// below it. Returns the number of removed records.
    async fn delete_collection(&self, collection: &CollectionPath) -> Result<u64, StorageError>;

    /// Live view of `query`. The current snapshot is available right away and
    /// a new one follows every mutation of the collection.
    async fn subscribe(&self, query: Query) -> Result<Subscription, StorageError>;
}
