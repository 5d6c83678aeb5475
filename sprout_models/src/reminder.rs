use std::{fmt, num::NonZeroU32, str::FromStr};

use chrono::{DateTime, NaiveTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ValidationError, plant::PlantId, user::UserId};

/// Identifies a single pending one-shot schedule at the delivery side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScheduleHandle(Uuid);

impl ScheduleHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ScheduleHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScheduleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Wall-clock time of day with minute precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    pub fn from_time(inner: NaiveTime) -> Self {
        let normalized_time = inner
            .with_second(0)
            .and_then(|time| time.with_nanosecond(0))
            .expect("Will never fail.");
        Self(normalized_time)
    }

    pub fn time(&self) -> &NaiveTime {
        &self.0
    }

    pub fn into_time(self) -> NaiveTime {
        self.0
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl FromStr for TimeOfDay {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map(Self::from_time)
            .map_err(|_| ValidationError::invalid("timeOfDay", format!("expected HH:MM, got `{s}`")))
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

/// Number of days between two consecutive watering reminders, from 1 to
/// [`RepeatInterval::MAX_DAYS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct RepeatInterval(NonZeroU32);

impl RepeatInterval {
    pub const DAILY: Self = Self(NonZeroU32::MIN);
    pub const EVERY_THREE_DAYS: Self = Self(NonZeroU32::new(3).unwrap());
    pub const WEEKLY: Self = Self(NonZeroU32::new(7).unwrap());

    pub const MAX_DAYS: u32 = 365;

    pub fn new(days: u32) -> Result<Self, ValidationError> {
        if days > Self::MAX_DAYS {
            return Err(ValidationError::invalid(
                "repeatIntervalDays",
                format!("must be at most {}", Self::MAX_DAYS),
            ));
        }

        NonZeroU32::new(days)
            .map(Self)
            .ok_or_else(|| ValidationError::invalid("repeatIntervalDays", "must be at least 1"))
    }

    pub fn days(&self) -> u32 {
        self.0.get()
    }
}

impl Default for RepeatInterval {
    fn default() -> Self {
        Self::DAILY
    }
}

impl TryFrom<u32> for RepeatInterval {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<RepeatInterval> for u32 {
    fn from(value: RepeatInterval) -> Self {
        value.days()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderConfig {
    pub time_of_day: TimeOfDay,
    pub repeat_interval: RepeatInterval,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderState {
    Unarmed,
    Armed {
        next_trigger: DateTime<Utc>,
        handle: ScheduleHandle,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct WateringReminder {
    pub plant_id: PlantId,
    pub user_id: UserId,
    pub plant_name: String,
    pub timezone: chrono_tz::Tz,
    pub config: ReminderConfig,
    pub state: ReminderState,
}

impl WateringReminder {
    pub fn is_armed(&self) -> bool {
        matches!(self.state, ReminderState::Armed { .. })
    }

    pub fn next_trigger(&self) -> Option<DateTime<Utc>> {
        match self.state {
            ReminderState::Armed { next_trigger, .. } => Some(next_trigger),
            ReminderState::Unarmed => None,
        }
    }

    pub fn handle(&self) -> Option<ScheduleHandle> {
        match self.state {
            ReminderState::Armed { handle, .. } => Some(handle),
            ReminderState::Unarmed => None,
        }
    }
}

/// Reminder configuration as it is persisted, so armed reminders can be
/// restored after a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredReminder {
    pub plant_id: PlantId,
    pub plant_name: String,
    pub time_of_day: TimeOfDay,
    #[serde(rename = "repeatIntervalDays")]
    pub repeat_interval: RepeatInterval,
    /// Last known trigger of the chain. Restores keep the phase anchored on it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_trigger: Option<DateTime<Utc>>,
}

impl StoredReminder {
    pub fn from_reminder(reminder: &WateringReminder) -> Self {
        Self {
            plant_id: reminder.plant_id.clone(),
            plant_name: reminder.plant_name.clone(),
            time_of_day: reminder.config.time_of_day,
            repeat_interval: reminder.config.repeat_interval,
            next_trigger: reminder.next_trigger(),
        }
    }

    pub fn config(&self) -> ReminderConfig {
        ReminderConfig {
            time_of_day: self.time_of_day,
            repeat_interval: self.repeat_interval,
        }
    }
}
