use crate::reminder::RepeatInterval;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WateringFrequency {
    Frequent,
    #[default]
    Average,
    Minimum,
}

impl WateringFrequency {
    pub fn from_hint(hint: &str) -> Self {
        match hint.trim().to_lowercase().as_str() {
            "frequent" => WateringFrequency::Frequent,
            "minimum" => WateringFrequency::Minimum,
            _ => WateringFrequency::Average,
        }
    }

    pub fn suggested_interval(&self) -> RepeatInterval {
        match self {
            WateringFrequency::Frequent => RepeatInterval::DAILY,
            WateringFrequency::Average => RepeatInterval::EVERY_THREE_DAYS,
            WateringFrequency::Minimum => RepeatInterval::WEEKLY,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlantCandidate {
    pub name: String,
    pub common_name: String,
    pub watering: WateringFrequency,
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Identification {
    Match(PlantCandidate),
    NoMatch,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watering_hint_maps_to_interval() {
        assert_eq!(
            WateringFrequency::from_hint("frequent").suggested_interval(),
            RepeatInterval::DAILY
        );
        assert_eq!(
            WateringFrequency::from_hint("Minimum").suggested_interval(),
            RepeatInterval::WEEKLY
        );
        assert_eq!(
            WateringFrequency::from_hint("whatever").suggested_interval(),
            RepeatInterval::EVERY_THREE_DAYS
        );
    }
}
