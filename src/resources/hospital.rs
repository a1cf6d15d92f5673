//! Больницы и их реестр

use std::collections::BTreeMap;

use serde::Serialize;

use crate::AllocError;

pub type HospitalId = u32;

/// Больница-потребитель доз. Чем больше `priority`, тем срочнее.
#[derive(Debug, Clone, PartialEq)]
pub struct Hospital {
    id: HospitalId,
    name: String,
    priority: i32,
    current_vaccines: u64,
    requested_vaccines: u64,
    high_risk_population: u64,
    wait_time: f64, // циклы распределения с момента самой старой неудовлетворенной заявки
}

impl Hospital {
    pub fn new(
        id: HospitalId,
        name: impl Into<String>,
        priority: i32,
        high_risk_population: u64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            priority,
            current_vaccines: 0,
            requested_vaccines: 0,
            high_risk_population,
            wait_time: 0.0,
        }
    }

    pub fn id(&self) -> HospitalId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn current_vaccines(&self) -> u64 {
        self.current_vaccines
    }

    pub fn requested_vaccines(&self) -> u64 {
        self.requested_vaccines
    }

    pub fn high_risk_population(&self) -> u64 {
        self.high_risk_population
    }

    pub fn wait_time(&self) -> f64 {
        self.wait_time
    }

    pub fn has_pending(&self) -> bool {
        self.requested_vaccines > 0
    }

    /// Доля неудовлетворенного спроса: requested / max(1, current + requested)
    pub fn unmet_ratio(&self) -> f64 {
        let denominator = self
            .current_vaccines
            .saturating_add(self.requested_vaccines)
            .max(1);
        self.requested_vaccines as f64 / denominator as f64
    }

    /// Нехватка с поправкой на группу риска:
    /// `(requested - current) * highRiskPopulation / 1000`. Отрицательна,
    /// если больница уже получила больше, чем ждет.
    pub fn need(&self) -> f64 {
        let shortage = self.requested_vaccines as f64 - self.current_vaccines as f64;
        shortage * self.high_risk_population as f64 / 1000.0
    }

    pub(crate) fn add_request(&mut self, amount: u64) -> Result<(), AllocError> {
        self.requested_vaccines = self
            .requested_vaccines
            .checked_add(amount)
            .ok_or_else(|| AllocError::invalid("requested amount overflows"))?;
        Ok(())
    }

    pub(crate) fn age(&mut self, cycles: f64) {
        if self.has_pending() {
            self.wait_time += cycles;
        }
    }

    /// Зачислить дозы. Возвращает true, если заявка закрыта полностью.
    pub(crate) fn receive(&mut self, amount: u64) -> bool {
        let granted = amount.min(self.requested_vaccines);
        debug_assert_eq!(granted, amount, "allocation exceeds outstanding request");
        self.current_vaccines += granted;
        self.requested_vaccines -= granted;
        if self.requested_vaccines == 0 {
            self.wait_time = 0.0;
            true
        } else {
            false
        }
    }

    pub fn view(&self, is_starved: bool, urgency: i128) -> HospitalView {
        HospitalView {
            id: self.id,
            name: self.name.clone(),
            priority: self.priority,
            current_vaccines: self.current_vaccines,
            requested_vaccines: self.requested_vaccines,
            high_risk_population: self.high_risk_population,
            wait_time: self.wait_time,
            is_starved,
            need: self.need(),
            urgency,
        }
    }
}

/// Проекция больницы для внешних клиентов
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HospitalView {
    pub id: HospitalId,
    pub name: String,
    pub priority: i32,
    pub current_vaccines: u64,
    pub requested_vaccines: u64,
    pub high_risk_population: u64,
    pub wait_time: f64,
    pub is_starved: bool,
    pub need: f64,
    /// Балл срочности политики NEED_WEIGHTED
    pub urgency: i128,
}

#[derive(Debug, Default, Clone)]
pub struct HospitalRegistry {
    hospitals: BTreeMap<HospitalId, Hospital>,
}

impl HospitalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, hospital: Hospital) -> Result<(), AllocError> {
        if hospital.id == 0 {
            return Err(AllocError::invalid("hospital id must be positive"));
        }
        if hospital.name.trim().is_empty() {
            return Err(AllocError::invalid("hospital name must not be blank"));
        }
        if self.hospitals.contains_key(&hospital.id) {
            return Err(AllocError::DuplicateHospital(hospital.id));
        }
        self.hospitals.insert(hospital.id, hospital);
        Ok(())
    }

    pub fn get(&self, id: HospitalId) -> Option<&Hospital> {
        self.hospitals.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: HospitalId) -> Result<&mut Hospital, AllocError> {
        self.hospitals
            .get_mut(&id)
            .ok_or(AllocError::UnknownHospital(id))
    }

    pub fn contains(&self, id: HospitalId) -> bool {
        self.hospitals.contains_key(&id)
    }

    /// Больницы в порядке возрастания id
    pub fn iter(&self) -> impl Iterator<Item = &Hospital> {
        self.hospitals.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Hospital> {
        self.hospitals.values_mut()
    }

    pub fn len(&self) -> usize {
        self.hospitals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hospitals.is_empty()
    }

    /// Сумма доз на руках у всех больниц
    pub fn total_held(&self) -> u64 {
        self.hospitals.values().map(|h| h.current_vaccines).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_receive_resets_wait_only_when_fully_satisfied() {
        let mut hospital = Hospital::new(1, "City General Hospital", 3, 5000);
        hospital.add_request(100).unwrap();
        hospital.age(1.0);
        hospital.age(1.0);

        assert!(!hospital.receive(40));
        assert_eq!(hospital.wait_time(), 2.0);
        assert_eq!(hospital.requested_vaccines(), 60);

        assert!(hospital.receive(60));
        assert_eq!(hospital.wait_time(), 0.0);
        assert_eq!(hospital.current_vaccines(), 100);
    }

    #[test]
    fn test_age_skips_hospitals_without_requests() {
        let mut hospital = Hospital::new(2, "Rural Clinic", 1, 1000);
        hospital.age(1.0);
        assert_eq!(hospital.wait_time(), 0.0);
    }

    #[test]
    fn test_unmet_ratio() {
        let mut hospital = Hospital::new(3, "Regional Hospital", 4, 6000);
        assert_eq!(hospital.unmet_ratio(), 0.0);
        hospital.add_request(30).unwrap();
        assert_eq!(hospital.unmet_ratio(), 1.0);
        hospital.receive(10);
        assert_eq!(hospital.unmet_ratio(), 20.0 / 30.0);
    }

    #[test]
    fn test_need_tracks_shortage_and_risk() {
        let mut hospital = Hospital::new(4, "Regional Hospital", 4, 6000);
        hospital.add_request(100).unwrap();
        assert_eq!(hospital.need(), 600.0);

        hospital.receive(75);
        assert_eq!(hospital.need(), -300.0);
        assert_eq!(hospital.view(false, 46_000).need, -300.0);
        assert_eq!(hospital.view(false, 46_000).urgency, 46_000);
    }

    #[test]
    fn test_registry_rejects_duplicates_and_bad_records() {
        let mut registry = HospitalRegistry::new();
        registry
            .register(Hospital::new(1, "Metropolitan Medical", 5, 8000))
            .unwrap();

        assert!(matches!(
            registry.register(Hospital::new(1, "Copy", 1, 0)),
            Err(AllocError::DuplicateHospital(1))
        ));
        assert!(matches!(
            registry.register(Hospital::new(0, "Zero", 1, 0)),
            Err(AllocError::InvalidInput(_))
        ));
        assert!(matches!(
            registry.register(Hospital::new(7, "   ", 1, 0)),
            Err(AllocError::InvalidInput(_))
        ));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(1));
        assert!(!registry.contains(9));
        assert!(matches!(
            registry.get_mut(9),
            Err(AllocError::UnknownHospital(9))
        ));
    }
}
