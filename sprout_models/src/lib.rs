pub mod care_log;
pub mod identification;
pub mod plant;
pub mod reminder;
pub mod sensor;
pub mod settings;
pub mod user;
pub mod validation;
pub mod weather;

pub use chrono;
pub use chrono_tz;

pub use validation::ValidationError;
