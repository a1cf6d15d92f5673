//! Склад доз

use serde::Serialize;

use crate::AllocError;

/// Согласованный срез склада
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventorySnapshot {
    pub total_vaccines: u64,
    pub available_vaccines: u64,
}

#[derive(Debug, Clone)]
pub struct InventoryStore {
    total: u64,
    available: u64,
}

impl InventoryStore {
    pub fn new(initial: u64) -> Self {
        Self {
            total: initial,
            available: initial,
        }
    }

    /// Поставка: увеличивает и общий, и доступный запас
    pub fn replenish(&mut self, amount: u64) -> Result<InventorySnapshot, AllocError> {
        if amount == 0 {
            return Err(AllocError::invalid("replenish amount must be positive"));
        }
        let total = self
            .total
            .checked_add(amount)
            .ok_or_else(|| AllocError::invalid("replenish amount overflows inventory"))?;
        let available = self
            .available
            .checked_add(amount)
            .ok_or_else(|| AllocError::invalid("replenish amount overflows inventory"))?;

        self.total = total;
        self.available = available;
        Ok(self.snapshot())
    }

    /// Списать `amount` доступных доз. При нехватке состояние не меняется.
    pub fn reserve(&mut self, amount: u64) -> Result<(), AllocError> {
        if amount > self.available {
            return Err(AllocError::InsufficientInventory {
                requested: amount,
                available: self.available,
            });
        }
        self.available -= amount;
        Ok(())
    }

    pub fn snapshot(&self) -> InventorySnapshot {
        InventorySnapshot {
            total_vaccines: self.total,
            available_vaccines: self.available,
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn available(&self) -> u64 {
        self.available
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_beyond_available_leaves_state_unchanged() {
        let mut inventory = InventoryStore::new(50);
        let err = inventory.reserve(51).unwrap_err();
        assert!(matches!(
            err,
            AllocError::InsufficientInventory {
                requested: 51,
                available: 50
            }
        ));
        assert_eq!(inventory.available(), 50);
        assert_eq!(inventory.total(), 50);

        inventory.reserve(50).unwrap();
        assert_eq!(inventory.available(), 0);
        assert_eq!(inventory.total(), 50);
    }

    #[test]
    fn test_replenish_grows_both_counters() {
        let mut inventory = InventoryStore::new(10);
        inventory.reserve(4).unwrap();
        let snapshot = inventory.replenish(100).unwrap();
        assert_eq!(
            snapshot,
            InventorySnapshot {
                total_vaccines: 110,
                available_vaccines: 106
            }
        );
    }

    #[test]
    fn test_replenish_rejects_zero_and_overflow() {
        let mut inventory = InventoryStore::new(u64::MAX - 1);
        assert!(matches!(inventory.replenish(0), Err(AllocError::InvalidInput(_))));
        assert!(matches!(inventory.replenish(2), Err(AllocError::InvalidInput(_))));
        assert_eq!(inventory.total(), u64::MAX - 1);
    }
}
