//! Координатор распределения доз
//!
//! Все состояние (склад, реестр больниц, очередь заявок, метрики) лежит под
//! одним `RwLock`. Цикл распределения держит блокировку на запись до конца,
//! поэтому циклы идут строго по одному, а читатели видят состояние либо до
//! цикла, либо после. Подача заявок, поставки и регистрация берут ту же
//! блокировку ненадолго.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::core::{AllocationEvent, Clock};
use crate::metrics::{MetricsAggregator, MetricsSnapshot};
use crate::policy::{Allocation, AllocationPolicy, Candidate, NeedWeights};
use crate::resources::{
    Hospital, HospitalId, HospitalRegistry, HospitalView, InventorySnapshot, InventoryStore,
    PendingRequest, RequestQueue,
};
use crate::starvation::{StarvationDetector, StarvationThresholds};
use crate::AllocError;

/// Ответ `/status`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub total_vaccines: u64,
    pub available_vaccines: u64,
    pub average_wait_time: f64,
    pub throughput: f64,
    pub has_starvation: bool,
}

/// Параметры аллокатора, не зависящие от транспорта
#[derive(Debug, Clone)]
pub struct AllocatorSettings {
    pub initial_vaccines: u64,
    pub starvation: StarvationThresholds,
    pub relief_units: u64,
    pub need_weights: NeedWeights,
}

impl Default for AllocatorSettings {
    fn default() -> Self {
        Self {
            initial_vaccines: 0,
            starvation: StarvationThresholds::default(),
            relief_units: 10,
            need_weights: NeedWeights::default(),
        }
    }
}

impl From<&Config> for AllocatorSettings {
    fn from(config: &Config) -> Self {
        Self {
            initial_vaccines: config.initial_vaccines,
            starvation: config.starvation,
            relief_units: config.relief_units,
            need_weights: config.need_weights,
        }
    }
}

struct AllocationState {
    inventory: InventoryStore,
    registry: HospitalRegistry,
    queue: RequestQueue,
    metrics: MetricsAggregator,
}

impl AllocationState {
    fn candidates(&self) -> Vec<Candidate> {
        self.queue
            .pending()
            .iter()
            .filter_map(|request| {
                let hospital = self.registry.get(request.hospital_id)?;
                Some(Candidate {
                    hospital_id: request.hospital_id,
                    outstanding: hospital.requested_vaccines(),
                    priority: hospital.priority(),
                    high_risk_population: hospital.high_risk_population(),
                    sequence: request.sequence,
                })
            })
            .collect()
    }

    fn conserved(&self) -> bool {
        self.registry
            .total_held()
            .checked_add(self.inventory.available())
            == Some(self.inventory.total())
    }
}

#[derive(Clone)]
pub struct Allocator {
    state: Arc<RwLock<AllocationState>>,
    clock: Clock,
    detector: StarvationDetector,
    need_weights: NeedWeights,
    relief_units: u64,
}

impl Allocator {
    pub fn new(settings: AllocatorSettings) -> Result<Self, AllocError> {
        Self::with_clock(settings, Clock::system())
    }

    pub fn with_clock(settings: AllocatorSettings, clock: Clock) -> Result<Self, AllocError> {
        let detector = StarvationDetector::new(settings.starvation)?;
        let state = AllocationState {
            inventory: InventoryStore::new(settings.initial_vaccines),
            registry: HospitalRegistry::new(),
            queue: RequestQueue::new(),
            metrics: MetricsAggregator::new(clock.now()),
        };

        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            clock,
            detector,
            need_weights: settings.need_weights,
            relief_units: settings.relief_units,
        })
    }

    /// Аллокатор с больницами из конфигурации
    pub async fn from_config(config: &Config) -> Result<Self, AllocError> {
        let allocator = Self::new(AllocatorSettings::from(config))?;
        for seed in &config.hospitals {
            allocator
                .register_hospital(
                    seed.id,
                    &seed.name,
                    seed.priority,
                    seed.high_risk_population,
                )
                .await?;
        }
        Ok(allocator)
    }

    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    pub async fn register_hospital(
        &self,
        id: HospitalId,
        name: &str,
        priority: i32,
        high_risk_population: u64,
    ) -> Result<(), AllocError> {
        let mut state = self.state.write().await;
        state
            .registry
            .register(Hospital::new(id, name, priority, high_risk_population))?;
        info!("Зарегистрирована больница {} ({}), приоритет {}", id, name, priority);
        Ok(())
    }

    /// Подать заявку или увеличить существующую
    pub async fn submit_request(
        &self,
        hospital_id: HospitalId,
        amount: u64,
    ) -> Result<PendingRequest, AllocError> {
        let mut state = self.state.write().await;
        let state = &mut *state;
        let now = self.clock.now();

        let request = state
            .queue
            .submit(&mut state.registry, hospital_id, amount, now)?;
        state.metrics.record_request();

        debug!(
            "Заявка больницы {}: +{} доз, всего ожидает {}",
            hospital_id, amount, request.amount
        );
        Ok(request)
    }

    pub async fn pending_for(&self, hospital_id: HospitalId) -> u64 {
        self.state.read().await.queue.pending_for(hospital_id)
    }

    pub async fn pending_requests(&self) -> Vec<PendingRequest> {
        self.state.read().await.queue.pending().to_vec()
    }

    pub async fn replenish(&self, amount: u64) -> Result<InventorySnapshot, AllocError> {
        let mut state = self.state.write().await;
        let snapshot = state.inventory.replenish(amount)?;
        debug_assert!(state.conserved(), "conservation violated by replenish");

        info!(
            "Поставка {} доз: всего {}, доступно {}",
            amount, snapshot.total_vaccines, snapshot.available_vaccines
        );
        Ok(snapshot)
    }

    /// Запустить цикл по имени политики. Неизвестное имя ничего не меняет.
    pub async fn allocate(&self, algorithm: &str) -> Result<Vec<Allocation>, AllocError> {
        let policy = algorithm.parse::<AllocationPolicy>().map_err(|e| {
            warn!("Отклонен цикл распределения: {}", e);
            e
        })?;
        self.run_cycle(policy).await
    }

    /// Один атомарный цикл распределения
    pub async fn run_cycle(&self, policy: AllocationPolicy) -> Result<Vec<Allocation>, AllocError> {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        let now = self.clock.now();

        let candidates = state.candidates();
        let available = state.inventory.available();

        // Голодание оцениваем по состоянию после старения этого цикла
        let mut aged: Vec<Hospital> = candidates
            .iter()
            .filter_map(|c| state.registry.get(c.hospital_id).cloned())
            .collect();
        for hospital in aged.iter_mut() {
            hospital.age(1.0);
        }

        // Сначала гарантированный минимум голодающим, затем политика делит остаток
        let mut plan = self.relieve_starvation(&candidates, &aged, available);
        let relieved: u64 = plan.iter().map(|a| a.amount).sum();
        let remaining_requests: Vec<Candidate> = candidates
            .iter()
            .filter_map(|c| {
                let granted = plan
                    .iter()
                    .find(|a| a.hospital_id == c.hospital_id)
                    .map_or(0, |a| a.amount);
                let outstanding = c.outstanding - granted;
                (outstanding > 0).then(|| Candidate {
                    outstanding,
                    ..c.clone()
                })
            })
            .collect();
        let policy_plan =
            policy.plan(&remaining_requests, available - relieved, &self.need_weights);
        merge(&mut plan, policy_plan);

        let total: u64 = plan.iter().map(|a| a.amount).sum();
        if let Some(missing) = plan
            .iter()
            .find(|a| !state.registry.contains(a.hospital_id))
        {
            return Err(AllocError::UnknownHospital(missing.hospital_id));
        }
        state.inventory.reserve(total)?;

        // Дальше ошибок быть не может: применяем план целиком.
        // Открытые заявки есть ровно у кандидатов, поэтому стареют только они.
        let mut events = Vec::with_capacity(plan.len());
        for hospital in state.registry.iter_mut() {
            hospital.age(1.0);
            let Some(allocation) = plan.iter().find(|a| a.hospital_id == hospital.id()) else {
                continue;
            };
            let wait_time_at_allocation = hospital.wait_time();
            let satisfied = hospital.receive(allocation.amount);
            state
                .queue
                .settle(allocation.hospital_id, hospital.requested_vaccines());

            debug!(
                "Больница {} получила {} доз (ожидание {}, закрыта: {})",
                allocation.hospital_id, allocation.amount, wait_time_at_allocation, satisfied
            );
            events.push(AllocationEvent {
                hospital_id: allocation.hospital_id,
                amount_allocated: allocation.amount,
                timestamp: now,
                wait_time_at_allocation,
                policy,
            });
        }
        // События в порядке плана
        events.sort_by_key(|e| plan.iter().position(|a| a.hospital_id == e.hospital_id));
        state.metrics.record_cycle(now, events);
        debug_assert!(state.conserved(), "conservation violated by allocation cycle");

        info!(
            "Цикл {} завершен: выдано {} доз {} больницам, осталось {}",
            policy,
            total,
            plan.len(),
            state.inventory.available()
        );
        Ok(plan)
    }

    /// Внеочередная выдача голодающим: по `relief_units` в порядке приоритета,
    /// пока на складе хватает на целую порцию
    fn relieve_starvation(
        &self,
        candidates: &[Candidate],
        aged: &[Hospital],
        mut remaining: u64,
    ) -> Vec<Allocation> {
        if self.relief_units == 0 {
            return Vec::new();
        }

        let mut starving: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| {
                aged.iter()
                    .any(|h| h.id() == c.hospital_id && self.detector.is_starved(h))
            })
            .collect();
        starving.sort_by(crate::policy::priority_order);

        let mut relief = Vec::new();
        for candidate in starving {
            if remaining < self.relief_units {
                break;
            }
            let amount = self.relief_units.min(candidate.outstanding);
            warn!(
                "Больница {} голодает, внеочередная выдача {} доз",
                candidate.hospital_id, amount
            );
            relief.push(Allocation {
                hospital_id: candidate.hospital_id,
                amount,
            });
            remaining -= amount;
        }
        relief
    }

    pub async fn inventory(&self) -> InventorySnapshot {
        self.state.read().await.inventory.snapshot()
    }

    pub async fn status(&self) -> SystemStatus {
        let state = self.state.read().await;
        let inventory = state.inventory.snapshot();

        SystemStatus {
            total_vaccines: inventory.total_vaccines,
            available_vaccines: inventory.available_vaccines,
            average_wait_time: state.metrics.average_wait_time(state.registry.iter()),
            throughput: state.metrics.throughput(),
            has_starvation: self.detector.has_starvation(state.registry.iter()),
        }
    }

    pub async fn hospitals(&self) -> Vec<HospitalView> {
        let state = self.state.read().await;
        state
            .registry
            .iter()
            .map(|h| {
                h.view(
                    self.detector.is_starved(h),
                    self.need_weights
                        .urgency(h.priority(), h.high_risk_population()),
                )
            })
            .collect()
    }

    pub async fn metrics(&self) -> MetricsSnapshot {
        let state = self.state.read().await;
        state.metrics.snapshot(state.registry.iter())
    }

    pub async fn reset_metrics(&self) {
        let mut state = self.state.write().await;
        let now = self.clock.now();
        state.metrics.reset(now);
        info!("Метрики сброшены в {}", now);
    }

    pub async fn events(&self) -> Vec<AllocationEvent> {
        self.state.read().await.metrics.events().to_vec()
    }
}

/// Сложить два плана, сохраняя одну запись на больницу
fn merge(plan: &mut Vec<Allocation>, extra: Vec<Allocation>) {
    for allocation in extra {
        match plan
            .iter_mut()
            .find(|a| a.hospital_id == allocation.hospital_id)
        {
            Some(existing) => existing.amount += allocation.amount,
            None => plan.push(allocation),
        }
    }
}
