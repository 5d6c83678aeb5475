mod timer_delivery;
mod watering_reminder_scheduler;

pub use timer_delivery::TimerNotificationDelivery;
pub use watering_reminder_scheduler::{WateringReminderScheduler, run_fired_events};

#[cfg(test)]
mod tests;
