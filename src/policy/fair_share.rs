//! Пропорциональное распределение

use super::{priority_order, Allocation, Candidate};

/// Доля каждой больницы `floor(available * requested_i / sum(requested))`,
/// не больше ее заявки. Остаток от округления раздается по одной дозе в
/// порядке приоритета, пока не кончится или пока все заявки не закрыты.
pub(super) fn plan(candidates: &[Candidate], available: u64) -> Vec<Allocation> {
    let demand: u128 = candidates.iter().map(|c| u128::from(c.outstanding)).sum();
    if demand == 0 || available == 0 {
        return Vec::new();
    }
    let budget = u128::from(available).min(demand);

    let mut shares: Vec<u64> = candidates
        .iter()
        .map(|c| {
            let share = u128::from(available) * u128::from(c.outstanding) / demand;
            // share <= available, значит в u64 помещается
            (share as u64).min(c.outstanding)
        })
        .collect();

    let granted: u128 = shares.iter().map(|&s| u128::from(s)).sum();
    let mut remainder = budget - granted;

    // Остаток меньше числа заявок, так что хватает одного прохода
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    order.sort_by(|&a, &b| priority_order(&&candidates[a], &&candidates[b]));
    while remainder > 0 {
        let mut progressed = false;
        for &i in &order {
            if remainder == 0 {
                break;
            }
            if shares[i] < candidates[i].outstanding {
                shares[i] += 1;
                remainder -= 1;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }

    candidates
        .iter()
        .zip(shares)
        .filter(|(_, share)| *share > 0)
        .map(|(c, amount)| Allocation {
            hospital_id: c.hospital_id,
            amount,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: u32, outstanding: u64, priority: i32, sequence: u64) -> Candidate {
        Candidate {
            hospital_id: id,
            outstanding,
            priority,
            high_risk_population: 0,
            sequence,
        }
    }

    fn amounts(plan: &[Allocation]) -> Vec<(u32, u64)> {
        plan.iter().map(|a| (a.hospital_id, a.amount)).collect()
    }

    #[test]
    fn test_exact_proportional_split() {
        let candidates = vec![candidate(1, 100, 1, 0), candidate(2, 300, 1, 1)];
        assert_eq!(amounts(&plan(&candidates, 200)), vec![(1, 50), (2, 150)]);
    }

    #[test]
    fn test_remainder_goes_to_highest_priority_first() {
        // 10 * 1/3 = 3.33 у каждого, остаток 1
        let candidates = vec![
            candidate(1, 10, 1, 0),
            candidate(2, 10, 5, 1),
            candidate(3, 10, 3, 2),
        ];
        assert_eq!(
            amounts(&plan(&candidates, 10)),
            vec![(1, 3), (2, 4), (3, 3)]
        );

        // остаток 2: сначала приоритет 5, затем 3
        assert_eq!(
            amounts(&plan(&candidates, 11)),
            vec![(1, 3), (2, 4), (3, 4)]
        );
    }

    #[test]
    fn test_remainder_tie_uses_submission_order() {
        let candidates = vec![candidate(8, 1, 2, 4), candidate(9, 1, 2, 3)];
        assert_eq!(amounts(&plan(&candidates, 1)), vec![(9, 1)]);
    }

    #[test]
    fn test_surplus_caps_at_request() {
        let candidates = vec![candidate(1, 30, 1, 0), candidate(2, 70, 2, 1)];
        assert_eq!(
            amounts(&plan(&candidates, 1_000)),
            vec![(1, 30), (2, 70)]
        );
    }
}
