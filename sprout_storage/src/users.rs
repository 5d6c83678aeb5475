use std::sync::Arc;

use sprout_models::{
    chrono_tz,
    user::{User, UserId},
    weather::Coordinates,
};

use crate::document::{CollectionPath, DocumentStore, Query, Record, StorageError, to_fields};

pub struct NewUser {
    pub timezone: chrono_tz::Tz,
    pub tg_chat_id: Option<i64>,
}

fn parse_user(record: &Record) -> Result<User, StorageError> {
    let mut user: User = record.parse()?;
    user.id = record.id.clone();
    Ok(user)
}

pub struct UserStorage {
    store: Arc<dyn DocumentStore>,
}

impl UserStorage {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, id: &UserId) -> Result<Option<User>, StorageError> {
        let record = self
            .store
            .get_record(&CollectionPath::users().doc(id.clone()))
            .await?;

        record.as_ref().map(parse_user).transpose()
    }

    pub async fn get_by_tg_chat(&self, chat_id: i64) -> Result<Option<User>, StorageError> {
        let users = self.list().await?;
        Ok(users
            .into_iter()
            .find(|user| user.tg_chat_id == Some(chat_id)))
    }

    pub async fn list(&self) -> Result<Vec<User>, StorageError> {
        let records = self
            .store
            .query(&Query::collection(CollectionPath::users()))
            .await?;

        records.iter().map(parse_user).collect()
    }

    pub async fn create(&self, new_user: NewUser) -> Result<User, StorageError> {
        let NewUser {
            timezone,
            tg_chat_id,
        } = new_user;

        let mut user = User {
            id: UserId::new(),
            timezone,
            tg_chat_id,
            location: None,
        };
        user.id = self
            .store
            .add_record(&CollectionPath::users(), to_fields(&user)?)
            .await?;

        log::info!("[USER] Created user {} for chat {:?}", user.id, tg_chat_id);
        Ok(user)
    }

    pub async fn update(&self, user: &User) -> Result<(), StorageError> {
        self.store
            .set_record(&CollectionPath::users().doc(user.id.clone()), to_fields(user)?)
            .await
    }

    pub async fn set_location(
        &self,
        id: &UserId,
        location: Coordinates,
    ) -> Result<User, StorageError> {
        let path = CollectionPath::users().doc(id.clone());
        let mut user = self
            .get(id)
            .await?
            .ok_or(StorageError::NotFound(path))?;

        user.location = Some(location);
        self.update(&user).await?;
        Ok(user)
    }
}
