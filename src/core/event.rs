//! Журнал событий распределения

use serde::Serialize;

use super::time::SimTime;
use crate::policy::AllocationPolicy;
use crate::resources::HospitalId;

/// Одна выдача доз больнице в рамках цикла
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllocationEvent {
    pub hospital_id: HospitalId,
    pub amount_allocated: u64,
    pub timestamp: SimTime,
    pub wait_time_at_allocation: f64,
    pub policy: AllocationPolicy,
}

/// Журнал только на добавление. Очищается лишь при сбросе метрик.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    events: Vec<AllocationEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, event: AllocationEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[AllocationEvent] {
        &self.events
    }

    pub(crate) fn clear(&mut self) {
        self.events.clear();
    }
}
