//! VaxiShare - распределение дефицитных доз вакцины между больницами
//! по выбираемым политикам с учетом голодания и метрик справедливости

pub mod api;
pub mod config;
pub mod core;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod resources;
pub mod starvation;

mod allocator;
pub use allocator::{Allocator, AllocatorSettings, SystemStatus};
pub use error::AllocError;

pub mod prelude {
    pub use crate::config::Config;
    pub use crate::core::{Clock, Duration, SimTime};
    pub use crate::policy::{Allocation, AllocationPolicy, NeedWeights};
    pub use crate::starvation::StarvationThresholds;
    pub use crate::{AllocError, Allocator, AllocatorSettings, SystemStatus};
}
