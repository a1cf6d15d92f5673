//! Метрики распределения: среднее ожидание и пропускная способность

use serde::Serialize;

use crate::core::{AllocationEvent, EventLog, SimTime};
use crate::resources::Hospital;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub average_wait_time: f64,
    pub throughput: f64,
    pub total_allocated: u64,
    pub cycles: u64,
    pub total_requests: u64,
}

/// Накопитель событий с момента старта или последнего сброса.
///
/// Пропускная способность считается по интервалу от эпохи до последнего
/// цикла, поэтому между изменениями состояния чтения дают одно и то же.
#[derive(Debug, Clone)]
pub struct MetricsAggregator {
    log: EventLog,
    epoch: SimTime,
    last_cycle_at: Option<SimTime>,
    total_allocated: u64,
    cycles: u64,
    total_requests: u64,
}

impl MetricsAggregator {
    pub fn new(epoch: SimTime) -> Self {
        Self {
            log: EventLog::new(),
            epoch,
            last_cycle_at: None,
            total_allocated: 0,
            cycles: 0,
            total_requests: 0,
        }
    }

    pub fn record_request(&mut self) {
        self.total_requests += 1;
    }

    pub fn record_cycle(&mut self, at: SimTime, events: impl IntoIterator<Item = AllocationEvent>) {
        for event in events {
            self.total_allocated = self.total_allocated.saturating_add(event.amount_allocated);
            self.log.append(event);
        }
        self.last_cycle_at = Some(at);
        self.cycles += 1;
    }

    pub fn reset(&mut self, now: SimTime) {
        self.log.clear();
        self.epoch = now;
        self.last_cycle_at = None;
        self.total_allocated = 0;
        self.cycles = 0;
        self.total_requests = 0;
    }

    pub fn events(&self) -> &[AllocationEvent] {
        self.log.events()
    }

    /// Среднее `waitTime` по больницам с открытыми заявками
    pub fn average_wait_time<'a>(&self, hospitals: impl IntoIterator<Item = &'a Hospital>) -> f64 {
        let (sum, count) = hospitals
            .into_iter()
            .filter(|h| h.has_pending())
            .fold((0.0, 0u64), |(sum, count), h| (sum + h.wait_time(), count + 1));
        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }

    /// Выданные дозы в секунду между эпохой и последним циклом
    pub fn throughput(&self) -> f64 {
        let Some(last_cycle_at) = self.last_cycle_at else {
            return 0.0;
        };
        let elapsed = last_cycle_at.since(self.epoch).as_seconds();
        if elapsed <= 0.0 {
            return 0.0;
        }
        self.total_allocated as f64 / elapsed
    }

    pub fn snapshot<'a>(&self, hospitals: impl IntoIterator<Item = &'a Hospital>) -> MetricsSnapshot {
        MetricsSnapshot {
            average_wait_time: self.average_wait_time(hospitals),
            throughput: self.throughput(),
            total_allocated: self.total_allocated,
            cycles: self.cycles,
            total_requests: self.total_requests,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::AllocationPolicy;

    fn event(hospital_id: u32, amount: u64) -> AllocationEvent {
        AllocationEvent {
            hospital_id,
            amount_allocated: amount,
            timestamp: SimTime::ZERO,
            wait_time_at_allocation: 1.0,
            policy: AllocationPolicy::Fifo,
        }
    }

    #[test]
    fn test_average_wait_ignores_idle_hospitals() {
        let metrics = MetricsAggregator::new(SimTime::ZERO);
        let mut busy = Hospital::new(1, "Busy", 1, 0);
        busy.add_request(10).unwrap();
        busy.age(1.0);
        busy.age(1.0);
        busy.age(1.0);
        let mut also_busy = Hospital::new(2, "Also busy", 1, 0);
        also_busy.add_request(10).unwrap();
        also_busy.age(1.0);
        let idle = Hospital::new(3, "Idle", 1, 0);

        assert_eq!(metrics.average_wait_time([&busy, &also_busy, &idle]), 2.0);
        assert_eq!(metrics.average_wait_time([&idle]), 0.0);
    }

    #[test]
    fn test_throughput_over_elapsed_time() {
        let mut metrics = MetricsAggregator::new(SimTime::new(10.0));
        assert_eq!(metrics.throughput(), 0.0);

        metrics.record_cycle(SimTime::new(15.0), [event(1, 100), event(2, 50)]);
        metrics.record_cycle(SimTime::new(20.0), [event(1, 50)]);
        assert_eq!(metrics.throughput(), 20.0);

        let snapshot = metrics.snapshot(std::iter::empty::<&Hospital>());
        assert_eq!(snapshot.total_allocated, 200);
        assert_eq!(snapshot.cycles, 2);
        assert_eq!(snapshot.throughput, 20.0);
    }

    #[test]
    fn test_cycle_at_epoch_has_no_throughput() {
        let mut metrics = MetricsAggregator::new(SimTime::new(3.0));
        metrics.record_cycle(SimTime::new(3.0), [event(1, 40)]);
        assert_eq!(metrics.throughput(), 0.0);
        assert_eq!(metrics.snapshot(std::iter::empty::<&Hospital>()).total_allocated, 40);
    }

    #[test]
    fn test_reset_moves_epoch() {
        let mut metrics = MetricsAggregator::new(SimTime::ZERO);
        metrics.record_request();
        metrics.record_cycle(SimTime::new(2.0), [event(1, 100)]);

        metrics.reset(SimTime::new(5.0));
        assert_eq!(metrics.throughput(), 0.0);
        metrics.record_cycle(SimTime::new(8.0), [event(1, 30)]);

        let snapshot = metrics.snapshot(std::iter::empty::<&Hospital>());
        assert_eq!(snapshot.total_allocated, 30);
        assert_eq!(snapshot.throughput, 10.0);
        assert_eq!(snapshot.total_requests, 0);
        assert_eq!(snapshot.cycles, 1);
        assert_eq!(metrics.events().len(), 1);
    }
}
