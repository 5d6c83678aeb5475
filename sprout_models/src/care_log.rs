use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ValidationError;

pub type CareLogId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CareAction {
    Watered,
    Fertilized,
    Pruned,
}

impl CareAction {
    pub const ALL: [CareAction; 3] = [CareAction::Watered, CareAction::Fertilized, CareAction::Pruned];
}

impl fmt::Display for CareAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CareAction::Watered => "Watered",
            CareAction::Fertilized => "Fertilized",
            CareAction::Pruned => "Pruned",
        };
        f.write_str(text)
    }
}

impl FromStr for CareAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CareAction::ALL
            .into_iter()
            .find(|action| action.to_string().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::invalid("action", format!("unknown action `{s}`")))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CareLogEntry {
    #[serde(skip)]
    pub id: CareLogId,
    pub action: CareAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCareLog {
    pub action: CareAction,
    pub note: Option<String>,
}

impl NewCareLog {
    pub fn into_entry(self, timestamp: DateTime<Utc>) -> CareLogEntry {
        let note = self
            .note
            .map(|note| note.trim().to_owned())
            .filter(|note| !note.is_empty());

        CareLogEntry {
            id: CareLogId::new(),
            action: self.action,
            note,
            timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_parsing_ignores_case() {
        assert_eq!("watered".parse::<CareAction>(), Ok(CareAction::Watered));
        assert_eq!("PRUNED".parse::<CareAction>(), Ok(CareAction::Pruned));
        assert!("repotted".parse::<CareAction>().is_err());
    }

    #[test]
    fn entry_timestamp_is_stored_as_epoch_millis() {
        let timestamp = DateTime::from_timestamp_millis(1_717_171_717_000).unwrap();
        let entry = NewCareLog {
            action: CareAction::Fertilized,
            note: Some("  ".to_owned()),
        }
        .into_entry(timestamp);

        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["timestamp"], 1_717_171_717_000_i64);
        assert_eq!(value["action"], "Fertilized");
        assert!(value.get("note").is_none());
    }
}
