//! Базовые типы: время и журнал событий

mod event;
mod time;

pub use event::{AllocationEvent, EventLog};
pub use time::{Clock, Duration, SimTime};
