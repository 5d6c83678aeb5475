use std::{fmt, str::FromStr};

use teloxide::types::CallbackQuery;
use thiserror::Error;

use sprout_models::{
    ValidationError,
    care_log::{CareAction, NewCareLog},
    plant::{NewPlant, PlantId},
    reminder::{ReminderConfig, RepeatInterval, TimeOfDay},
};

#[derive(Debug, Error, PartialEq, Eq)]
pub(crate) enum ArgsError {
    #[error("{0}")]
    Usage(&'static str),
    #[error("`{0}` is not a plant number from /plants")]
    PlantNumber(String),
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

const ADD_PLANT_USAGE: &str = "Usage: /addplant Name | Type | Location [| Notes]";
const REMIND_USAGE: &str = "Usage: /remind <plant number> <HH:MM> [every N days]";
const LOG_USAGE: &str = "Usage: /log <plant number> <watered|fertilized|pruned> [note]";
const PLANT_USAGE: &str = "Pass the plant number from /plants";

/// 1-based position of a plant in the /plants listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PlantNumber(usize);

impl PlantNumber {
    pub fn index(&self) -> usize {
        self.0 - 1
    }
}

impl fmt::Display for PlantNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PlantNumber {
    type Err = ArgsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().trim_start_matches('#');
        match s.parse::<usize>() {
            Ok(number) if number > 0 => Ok(Self(number)),
            _ => Err(ArgsError::PlantNumber(s.to_owned())),
        }
    }
}

pub(crate) fn parse_plant_number(args: &str) -> Result<PlantNumber, ArgsError> {
    let first = args
        .split_whitespace()
        .next()
        .ok_or(ArgsError::Usage(PLANT_USAGE))?;
    first.parse()
}

pub(crate) fn parse_new_plant(args: &str) -> Result<NewPlant, ArgsError> {
    let parts: Vec<&str> = args.split('|').map(str::trim).collect();
    let [name, plant_type, location, rest @ ..] = parts.as_slice() else {
        return Err(ArgsError::Usage(ADD_PLANT_USAGE));
    };

    let plant = NewPlant {
        name: (*name).to_owned(),
        plant_type: (*plant_type).to_owned(),
        location: (*location).to_owned(),
        notes: rest.join(" | "),
        ..Default::default()
    };
    plant.validate()?;

    Ok(plant)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RemindArgs {
    pub plant: PlantNumber,
    pub config: ReminderConfig,
}

pub(crate) fn parse_remind(args: &str) -> Result<RemindArgs, ArgsError> {
    let mut words = args.split_whitespace();
    let (Some(plant), Some(time)) = (words.next(), words.next()) else {
        return Err(ArgsError::Usage(REMIND_USAGE));
    };

    let plant = plant.parse()?;
    let time_of_day: TimeOfDay = time.parse()?;
    let repeat_interval = match words.next() {
        Some(days) => {
            let days = days
                .parse::<u32>()
                .map_err(|_| ValidationError::invalid("repeatInterval", format!("`{days}` is not a number of days")))?;
            RepeatInterval::new(days)?
        }
        None => RepeatInterval::default(),
    };

    if words.next().is_some() {
        return Err(ArgsError::Usage(REMIND_USAGE));
    }

    Ok(RemindArgs {
        plant,
        config: ReminderConfig {
            time_of_day,
            repeat_interval,
        },
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LogArgs {
    pub plant: PlantNumber,
    pub log: NewCareLog,
}

pub(crate) fn parse_log(args: &str) -> Result<LogArgs, ArgsError> {
    let args = args.trim();
    let mut parts = args.splitn(3, char::is_whitespace);
    let (Some(plant), Some(action)) = (parts.next(), parts.next()) else {
        return Err(ArgsError::Usage(LOG_USAGE));
    };

    let plant = plant.parse()?;
    let action: CareAction = action.parse()?;
    let note = parts
        .next()
        .map(str::trim)
        .filter(|note| !note.is_empty())
        .map(str::to_owned);

    Ok(LogArgs {
        plant,
        log: NewCareLog { action, note },
    })
}

/// Payload of inline keyboard buttons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CallbackAction {
    Watered(PlantId),
    AcknowledgeSensorAlert,
}

const WATERED_PREFIX: &str = "watered:";
const SENSOR_OK: &str = "sensor:ok";

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackAction::Watered(plant_id) => write!(f, "{WATERED_PREFIX}{plant_id}"),
            CallbackAction::AcknowledgeSensorAlert => f.write_str(SENSOR_OK),
        }
    }
}

impl FromStr for CallbackAction {
    type Err = ArgsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == SENSOR_OK {
            return Ok(CallbackAction::AcknowledgeSensorAlert);
        }

        match s.strip_prefix(WATERED_PREFIX) {
            Some(plant_id) if !plant_id.is_empty() => Ok(CallbackAction::Watered(plant_id.to_owned())),
            _ => Err(ArgsError::Usage("Unknown button")),
        }
    }
}

pub(crate) fn callback_action(query: CallbackQuery) -> Option<CallbackAction> {
    query.data.as_deref()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_plant_requires_three_parts() {
        let plant = parse_new_plant("Monty | Monstera | Living room | likes humidity").unwrap();

        assert_eq!(plant.name, "Monty");
        assert_eq!(plant.plant_type, "Monstera");
        assert_eq!(plant.location, "Living room");
        assert_eq!(plant.notes, "likes humidity");

        assert_eq!(
            parse_new_plant("Monty | Monstera"),
            Err(ArgsError::Usage(ADD_PLANT_USAGE))
        );
        assert_eq!(
            parse_new_plant("Monty |  | Kitchen"),
            Err(ArgsError::Invalid(ValidationError::MissingField("type")))
        );
    }

    #[test]
    fn remind_defaults_to_daily() {
        let args = parse_remind("2 07:30").unwrap();

        assert_eq!(args.plant.index(), 1);
        assert_eq!(args.config.time_of_day, TimeOfDay::new(7, 30).unwrap());
        assert_eq!(args.config.repeat_interval, RepeatInterval::DAILY);
    }

    #[test]
    fn remind_accepts_intervals_up_to_a_year() {
        let args = parse_remind("1 18:00 10").unwrap();
        assert_eq!(args.config.repeat_interval.days(), 10);

        assert!(matches!(parse_remind("1 18:00 0"), Err(ArgsError::Invalid(_))));
        assert_eq!(parse_remind("1 18:00 365").unwrap().config.repeat_interval.days(), 365);
        assert!(matches!(parse_remind("1 18:00 366"), Err(ArgsError::Invalid(_))));
        assert!(matches!(parse_remind("1 18:00 4294967295"), Err(ArgsError::Invalid(_))));
        assert!(matches!(parse_remind("1 25:00"), Err(ArgsError::Invalid(_))));
        assert!(matches!(parse_remind("0 08:00"), Err(ArgsError::PlantNumber(_))));
        assert_eq!(parse_remind("1"), Err(ArgsError::Usage(REMIND_USAGE)));
    }

    #[test]
    fn log_keeps_the_whole_note() {
        let args = parse_log("3 Fertilized  half dose, diluted").unwrap();

        assert_eq!(args.plant.index(), 2);
        assert_eq!(args.log.action, CareAction::Fertilized);
        assert_eq!(args.log.note.as_deref(), Some("half dose, diluted"));

        let args = parse_log("1 pruned").unwrap();
        assert_eq!(args.log.note, None);

        assert!(matches!(parse_log("1 repotted"), Err(ArgsError::Invalid(_))));
    }

    #[test]
    fn callback_data_round_trips() {
        let watered = CallbackAction::Watered("abc-123".to_owned());

        assert_eq!(watered.to_string().parse::<CallbackAction>(), Ok(watered));
        assert_eq!(
            "sensor:ok".parse::<CallbackAction>(),
            Ok(CallbackAction::AcknowledgeSensorAlert)
        );
        assert!("watered:".parse::<CallbackAction>().is_err());
    }
}
