//! Очередь заявок на дозы

use serde::Serialize;

use super::hospital::{HospitalId, HospitalRegistry};
use crate::core::SimTime;
use crate::AllocError;

/// Неудовлетворенная заявка больницы. На больницу не больше одной:
/// повторная подача увеличивает `amount`, но сохраняет исходные метки.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRequest {
    pub hospital_id: HospitalId,
    pub amount: u64,
    pub submitted_at: SimTime,
    pub sequence: u64,
}

#[derive(Debug, Default, Clone)]
pub struct RequestQueue {
    pending: Vec<PendingRequest>, // упорядочены по sequence
    next_sequence: u64,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(
        &mut self,
        registry: &mut HospitalRegistry,
        hospital_id: HospitalId,
        amount: u64,
        now: SimTime,
    ) -> Result<PendingRequest, AllocError> {
        if amount == 0 {
            return Err(AllocError::invalid("request amount must be positive"));
        }
        let hospital = registry.get_mut(hospital_id)?;
        hospital.add_request(amount)?;
        let outstanding = hospital.requested_vaccines();

        if let Some(existing) = self
            .pending
            .iter_mut()
            .find(|p| p.hospital_id == hospital_id)
        {
            existing.amount = outstanding;
            return Ok(existing.clone());
        }

        let request = PendingRequest {
            hospital_id,
            amount: outstanding,
            submitted_at: now,
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;
        self.pending.push(request.clone());
        Ok(request)
    }

    pub fn pending_for(&self, hospital_id: HospitalId) -> u64 {
        self.pending
            .iter()
            .find(|p| p.hospital_id == hospital_id)
            .map_or(0, |p| p.amount)
    }

    /// Заявки в порядке подачи
    pub fn pending(&self) -> &[PendingRequest] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Обновить остаток заявки после выдачи; нулевой остаток удаляет заявку
    pub(crate) fn settle(&mut self, hospital_id: HospitalId, remaining: u64) {
        if remaining == 0 {
            self.pending.retain(|p| p.hospital_id != hospital_id);
        } else if let Some(request) = self
            .pending
            .iter_mut()
            .find(|p| p.hospital_id == hospital_id)
        {
            request.amount = remaining;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::Hospital;

    fn registry() -> HospitalRegistry {
        let mut registry = HospitalRegistry::new();
        registry
            .register(Hospital::new(1, "City General Hospital", 3, 5000))
            .unwrap();
        registry
            .register(Hospital::new(2, "Community Health Center", 2, 2000))
            .unwrap();
        registry
    }

    #[test]
    fn test_resubmission_keeps_original_stamp() {
        let mut registry = registry();
        let mut queue = RequestQueue::new();

        queue
            .submit(&mut registry, 1, 100, SimTime::new(1.0))
            .unwrap();
        queue.submit(&mut registry, 2, 50, SimTime::new(2.0)).unwrap();
        let merged = queue
            .submit(&mut registry, 1, 25, SimTime::new(3.0))
            .unwrap();

        assert_eq!(merged.amount, 125);
        assert_eq!(merged.submitted_at, SimTime::new(1.0));
        assert_eq!(merged.sequence, 0);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.pending_for(1), 125);
        assert_eq!(registry.get(1).unwrap().requested_vaccines(), 125);
    }

    #[test]
    fn test_submit_rejects_unknown_hospital_and_zero_amount() {
        let mut registry = registry();
        let mut queue = RequestQueue::new();

        assert!(matches!(
            queue.submit(&mut registry, 42, 10, SimTime::ZERO),
            Err(AllocError::UnknownHospital(42))
        ));
        assert!(matches!(
            queue.submit(&mut registry, 1, 0, SimTime::ZERO),
            Err(AllocError::InvalidInput(_))
        ));
        assert!(queue.is_empty());
        assert_eq!(queue.pending_for(1), 0);
    }

    #[test]
    fn test_settle_removes_satisfied_requests() {
        let mut registry = registry();
        let mut queue = RequestQueue::new();
        queue.submit(&mut registry, 1, 10, SimTime::ZERO).unwrap();
        queue.submit(&mut registry, 2, 10, SimTime::ZERO).unwrap();

        queue.settle(1, 4);
        queue.settle(2, 0);

        assert_eq!(queue.pending_for(1), 4);
        assert_eq!(queue.pending_for(2), 0);
        assert_eq!(queue.len(), 1);
    }
}
