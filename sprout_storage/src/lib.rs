mod care_logs;
mod document;
mod plants;
mod reminders;
mod sqlite;
mod subscription;
mod users;

pub use care_logs::CareLogStorage;
pub use document::{
    CollectionPath, Direction, DocumentPath, DocumentStore, Fields, OrderBy, Query, Record,
    RecordId, StorageError, to_fields,
};
pub use plants::PlantStorage;
pub use reminders::ReminderConfigStorage;
pub use sqlite::{SqliteDocumentStore, run_migrations};
pub use subscription::{Subscription, TypedSubscription};
pub use users::{NewUser, UserStorage};
