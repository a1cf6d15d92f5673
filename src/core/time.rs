//! Время аллокатора: метки событий и часы

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use serde::{Deserialize, Serialize};

/// Момент времени в секундах от старта часов
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct SimTime(f64);

impl SimTime {
    pub const ZERO: SimTime = SimTime(0.0);

    pub fn new(seconds: f64) -> Self {
        SimTime(seconds.max(0.0))
    }

    pub fn as_seconds(&self) -> f64 {
        self.0
    }

    /// Сколько прошло с `earlier` (не меньше нуля)
    pub fn since(&self, earlier: SimTime) -> Duration {
        Duration::from_seconds((self.0 - earlier.0).max(0.0))
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:.3}s", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Duration(f64);

impl Duration {
    pub fn from_seconds(secs: f64) -> Self {
        Duration(secs.max(0.0))
    }

    pub fn as_seconds(&self) -> f64 {
        self.0
    }
}

/// Источник времени для меток заявок и расчета пропускной способности.
///
/// `System` считает реальные секунды с момента создания, `Manual` двигается
/// только через [`Clock::advance`] и нужен для воспроизводимых прогонов.
#[derive(Debug, Clone)]
pub enum Clock {
    System { origin: Instant },
    Manual(Arc<AtomicU64>),
}

impl Clock {
    pub fn system() -> Self {
        Clock::System {
            origin: Instant::now(),
        }
    }

    pub fn manual() -> Self {
        Clock::Manual(Arc::new(AtomicU64::new(0f64.to_bits())))
    }

    pub fn now(&self) -> SimTime {
        match self {
            Clock::System { origin } => SimTime::new(origin.elapsed().as_secs_f64()),
            Clock::Manual(bits) => SimTime::new(f64::from_bits(bits.load(Ordering::SeqCst))),
        }
    }

    /// Сдвинуть ручные часы. Для системных часов ничего не делает.
    pub fn advance(&self, by: Duration) {
        if let Clock::Manual(bits) = self {
            let _ = bits.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some((f64::from_bits(current) + by.as_seconds()).to_bits())
            });
        }
    }
}
