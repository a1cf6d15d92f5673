//! Обнаружение голодания
//!
//! Больница с открытой заявкой голодает, если ждет дольше порога или если
//! доля неудовлетворенного спроса выше порога. Признак не хранится, а
//! вычисляется заново при каждом чтении.

use serde::{Deserialize, Serialize};

use crate::resources::{Hospital, HospitalId};
use crate::AllocError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StarvationThresholds {
    /// Циклы ожидания
    pub wait_time: f64,
    /// requested / max(1, current + requested); доля не больше 1, поэтому
    /// значение 1.0 отключает этот критерий
    pub unmet_ratio: f64,
}

impl StarvationThresholds {
    pub fn validate(&self) -> Result<(), AllocError> {
        for (name, value) in [("wait_time", self.wait_time), ("unmet_ratio", self.unmet_ratio)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(AllocError::Config(format!(
                    "starvation threshold {} must be positive, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

impl Default for StarvationThresholds {
    fn default() -> Self {
        Self {
            wait_time: 10.0,
            unmet_ratio: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StarvationDetector {
    thresholds: StarvationThresholds,
}

impl StarvationDetector {
    pub fn new(thresholds: StarvationThresholds) -> Result<Self, AllocError> {
        thresholds.validate()?;
        Ok(Self { thresholds })
    }

    pub fn is_starved(&self, hospital: &Hospital) -> bool {
        hospital.has_pending()
            && (hospital.wait_time() > self.thresholds.wait_time
                || hospital.unmet_ratio() > self.thresholds.unmet_ratio)
    }

    pub fn has_starvation<'a>(&self, hospitals: impl IntoIterator<Item = &'a Hospital>) -> bool {
        hospitals.into_iter().any(|h| self.is_starved(h))
    }

    pub fn starved<'a>(
        &self,
        hospitals: impl IntoIterator<Item = &'a Hospital>,
    ) -> Vec<HospitalId> {
        hospitals
            .into_iter()
            .filter(|h| self.is_starved(h))
            .map(|h| h.id())
            .collect()
    }
}

impl Default for StarvationDetector {
    fn default() -> Self {
        Self {
            thresholds: StarvationThresholds::default(),
        }
    }
}
