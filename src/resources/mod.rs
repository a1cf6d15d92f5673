//! Управление ресурсами: склад, больницы, очередь заявок

mod hospital;
mod inventory;
mod queue;

pub use hospital::{Hospital, HospitalId, HospitalRegistry, HospitalView};
pub use inventory::{InventorySnapshot, InventoryStore};
pub use queue::{PendingRequest, RequestQueue};
