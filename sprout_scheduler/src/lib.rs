pub mod delivery;
mod scheduler;
pub mod trigger;

pub use scheduler::{ArmRequest, ReminderScheduler, SchedulerError};
pub use trigger::{
    compute_catch_up_trigger, compute_initial_trigger, compute_next_trigger,
    compute_resumed_trigger,
};
