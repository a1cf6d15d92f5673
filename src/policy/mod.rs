//! Политики распределения доз
//!
//! Политика получает снимок заявок и доступный остаток и возвращает план
//! выдачи. План никогда не превышает остаток склада в сумме и остаток
//! заявки для каждой больницы. Сам план ничего не меняет: применяет его
//! [`crate::Allocator`] одной транзакцией.
//!
//! Направление приоритета: большее значение `priority` срочнее.

mod fair_share;

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::resources::HospitalId;
use crate::AllocError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationPolicy {
    /// В порядке подачи заявок
    Fifo,
    /// По убыванию приоритета, при равенстве в порядке подачи
    Priority,
    /// Пропорционально запрошенному, остаток от округления по приоритету
    FairShare,
    /// По баллу срочности из приоритета и группы риска
    NeedWeighted,
    /// Сначала самые маленькие заявки
    #[serde(rename = "SJF")]
    ShortestFirst,
}

impl AllocationPolicy {
    pub const ALL: [AllocationPolicy; 5] = [
        AllocationPolicy::Fifo,
        AllocationPolicy::Priority,
        AllocationPolicy::FairShare,
        AllocationPolicy::NeedWeighted,
        AllocationPolicy::ShortestFirst,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            AllocationPolicy::Fifo => "FIFO",
            AllocationPolicy::Priority => "PRIORITY",
            AllocationPolicy::FairShare => "FAIR_SHARE",
            AllocationPolicy::NeedWeighted => "NEED_WEIGHTED",
            AllocationPolicy::ShortestFirst => "SJF",
        }
    }

    /// Рассчитать план выдачи. `candidates` — заявки в порядке подачи.
    pub fn plan(
        &self,
        candidates: &[Candidate],
        available: u64,
        weights: &NeedWeights,
    ) -> Vec<Allocation> {
        match self {
            AllocationPolicy::FairShare => fair_share::plan(candidates, available),
            AllocationPolicy::Fifo => serve_in_order(by(candidates, fifo_order), available),
            AllocationPolicy::Priority => serve_in_order(by(candidates, priority_order), available),
            AllocationPolicy::NeedWeighted => serve_in_order(
                by(candidates, |a, b| need_order(weights, a, b)),
                available,
            ),
            AllocationPolicy::ShortestFirst => {
                serve_in_order(by(candidates, shortest_order), available)
            }
        }
    }
}

impl fmt::Display for AllocationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for AllocationPolicy {
    type Err = AllocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "FIFO" | "FCFS" => Ok(AllocationPolicy::Fifo),
            "PRIORITY" => Ok(AllocationPolicy::Priority),
            "FAIR_SHARE" | "FAIRSHARE" | "PROPORTIONAL" => Ok(AllocationPolicy::FairShare),
            "NEED_WEIGHTED" | "NEED" => Ok(AllocationPolicy::NeedWeighted),
            "SJF" | "SHORTEST_FIRST" => Ok(AllocationPolicy::ShortestFirst),
            _ => Err(AllocError::PolicyUnknown(s.to_string())),
        }
    }
}

/// Заявка в том виде, в котором ее видят политики
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub hospital_id: HospitalId,
    pub outstanding: u64,
    pub priority: i32,
    pub high_risk_population: u64,
    pub sequence: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub hospital_id: HospitalId,
    pub amount: u64,
}

/// Веса балла срочности:
/// `priority * priority_weight * 1000 + high_risk_population * population_weight`.
///
/// При весах по умолчанию (10 и 1) один уровень приоритета равен десяти
/// тысячам человек в группе риска.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NeedWeights {
    pub priority: u64,
    pub population: u64,
}

impl NeedWeights {
    pub fn urgency(&self, priority: i32, high_risk_population: u64) -> i128 {
        i128::from(priority) * i128::from(self.priority) * 1000
            + i128::from(high_risk_population) * i128::from(self.population)
    }
}

impl Default for NeedWeights {
    fn default() -> Self {
        Self {
            priority: 10,
            population: 1,
        }
    }
}

fn by<F>(candidates: &[Candidate], order: F) -> Vec<&Candidate>
where
    F: FnMut(&&Candidate, &&Candidate) -> Ordering,
{
    let mut sorted: Vec<&Candidate> = candidates.iter().collect();
    sorted.sort_by(order);
    sorted
}

fn fifo_order(a: &&Candidate, b: &&Candidate) -> Ordering {
    a.sequence.cmp(&b.sequence)
}

pub(crate) fn priority_order(a: &&Candidate, b: &&Candidate) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then_with(|| a.sequence.cmp(&b.sequence))
}

fn need_order(weights: &NeedWeights, a: &&Candidate, b: &&Candidate) -> Ordering {
    let score_a = weights.urgency(a.priority, a.high_risk_population);
    let score_b = weights.urgency(b.priority, b.high_risk_population);
    score_b
        .cmp(&score_a)
        .then_with(|| b.priority.cmp(&a.priority))
        .then_with(|| a.sequence.cmp(&b.sequence))
        .then_with(|| a.hospital_id.cmp(&b.hospital_id))
}

fn shortest_order(a: &&Candidate, b: &&Candidate) -> Ordering {
    a.outstanding
        .cmp(&b.outstanding)
        .then_with(|| a.sequence.cmp(&b.sequence))
}

/// Полная выдача по очереди; последняя заявка может получить частично
fn serve_in_order(order: Vec<&Candidate>, available: u64) -> Vec<Allocation> {
    let mut remaining = available;
    let mut plan = Vec::new();

    for candidate in order {
        if remaining == 0 {
            break;
        }
        let amount = candidate.outstanding.min(remaining);
        if amount > 0 {
            plan.push(Allocation {
                hospital_id: candidate.hospital_id,
                amount,
            });
            remaining -= amount;
        }
    }

    plan
}
