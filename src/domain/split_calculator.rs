//! Pure split computations.
//!
//! Each function turns an amount and strategy-specific input into part
//! drafts whose amounts sum to the amount exactly, or fails. Nothing here
//! touches sessions, locks or I/O.

use std::collections::{HashMap, HashSet};

use super::money::MoneyError;
use super::{Money, OrderItem, Seat, SeatId, SeatItemAssociation, SplitAdjustment};

/// Upper bound on the number of parts of one split.
pub const MAX_PARTS: usize = 100;

/// Label of the extra part holding unassigned items in a seat split.
pub const SHARED_ITEMS_PART_NAME: &str = "Shared items";

/// Errors produced by the calculator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SplitError {
    /// The request cannot describe a valid split.
    #[error("{0}")]
    Invalid(String),

    /// A supplied amount is not usable as a part.
    #[error("{0}")]
    InvalidAmount(String),

    /// The parts do not reconcile to the amount being split.
    #[error("parts sum to {got}, expected {expected}")]
    Mismatch {
        /// Amount the parts must add up to.
        expected: Money,
        /// What they actually add up to.
        got: Money,
    },

    /// Arithmetic failure in the money layer.
    #[error(transparent)]
    Money(#[from] MoneyError),
}

/// A part before ids are assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartDraft {
    /// Label.
    pub name: String,
    /// Amount due.
    pub amount: Money,
    /// Seat the part belongs to, for seat splits.
    pub seat_id: Option<SeatId>,
}

/// Result of a seat split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitPlan {
    /// Parts in seat order, with an optional trailing shared-items part.
    pub parts: Vec<PartDraft>,
    /// Corrective adjustment applied to the first seat, if any.
    pub adjustment: Option<SplitAdjustment>,
}

/// Input for [`seat_split`].
#[derive(Debug, Clone, Copy)]
pub struct SeatSplitInput<'a> {
    /// Amount the parts must reconcile to.
    pub total: Money,
    /// Seats included in the split, in any order.
    pub seats: &'a [Seat],
    /// Order line items.
    pub items: &'a [OrderItem],
    /// Every association at the table, including seats outside the split.
    pub associations: &'a [SeatItemAssociation],
    /// Spread unassigned units over the seats instead of a separate part.
    pub include_shared_items: bool,
}

fn default_name(index: usize) -> String {
    format!("Pessoa {}", index + 1)
}

fn label(names: &[String], index: usize) -> String {
    names
        .get(index)
        .map(|n| n.trim())
        .filter(|n| !n.is_empty())
        .map_or_else(|| default_name(index), str::to_string)
}

/// Divides `total` into `n` parts differing by at most one minor unit.
///
/// A `total` smaller than `n` minor units leaves the trailing parts at
/// zero.
///
/// # Errors
///
/// Returns [`SplitError::Invalid`] when `n < 2`, `n > MAX_PARTS`, or more
/// names than parts are given.
pub fn equal_split(total: Money, n: usize, names: &[String]) -> Result<Vec<PartDraft>, SplitError> {
    if n < 2 {
        return Err(SplitError::Invalid(format!(
            "an equal split needs at least 2 parts, got {n}"
        )));
    }
    if n > MAX_PARTS {
        return Err(SplitError::Invalid(format!(
            "an equal split allows at most {MAX_PARTS} parts, got {n}"
        )));
    }
    if names.len() > n {
        return Err(SplitError::Invalid(format!(
            "{} names given for {n} parts",
            names.len()
        )));
    }
    let shares = total.divide_evenly(n)?;
    Ok(shares
        .into_iter()
        .enumerate()
        .map(|(i, amount)| PartDraft {
            name: label(names, i),
            amount,
            seat_id: None,
        })
        .collect())
}

/// Validates caller-supplied `(name, amount)` pairs against `total`.
///
/// # Errors
///
/// Returns [`SplitError::Invalid`] for an empty or oversized list,
/// [`SplitError::InvalidAmount`] for non-positive parts, and
/// [`SplitError::Mismatch`] when the amounts do not sum to `total`.
pub fn custom_split(total: Money, parts: &[(String, Money)]) -> Result<Vec<PartDraft>, SplitError> {
    if parts.is_empty() {
        return Err(SplitError::Invalid(
            "a custom split needs at least one part".to_string(),
        ));
    }
    if parts.len() > MAX_PARTS {
        return Err(SplitError::Invalid(format!(
            "a custom split allows at most {MAX_PARTS} parts, got {}",
            parts.len()
        )));
    }

    let mut sum = Money::ZERO;
    for (name, amount) in parts {
        if !amount.is_positive() {
            return Err(SplitError::InvalidAmount(format!(
                "part {name:?} must be positive, got {amount}"
            )));
        }
        sum = sum
            .checked_add(*amount)
            .ok_or_else(|| SplitError::InvalidAmount("part amounts overflow".to_string()))?;
    }
    if sum != total {
        return Err(SplitError::Mismatch {
            expected: total,
            got: sum,
        });
    }

    let names: Vec<String> = parts.iter().map(|(n, _)| n.clone()).collect();
    Ok(parts
        .iter()
        .enumerate()
        .map(|(i, (_, amount))| PartDraft {
            name: label(&names, i),
            amount: *amount,
            seat_id: None,
        })
        .collect())
}

/// Computes one part per seat from item associations.
///
/// For every item, the associated units are allocated among the
/// associated seats in proportion to their association quantity; units
/// with no association are "shared". Each item's shared value is divided
/// evenly among the split's seats on its own, or all of it is collected
/// into a trailing shared-items part.
/// Seats are ordered by number (then id) and every remainder goes to the
/// earliest seats, so repeated computation is deterministic.
///
/// If the result differs from `total` by at most one minor unit per line
/// item, the difference is applied to the first seat and reported in
/// [`SplitPlan::adjustment`]. A larger difference (for instance items
/// attributed to seats outside the split) is a mismatch.
///
/// # Errors
///
/// Returns [`SplitError::Invalid`] for an empty or duplicated seat set, a
/// seat that would owe nothing, or an item or running sum that overflows;
/// [`SplitError::InvalidAmount`] for negative unit prices; and
/// [`SplitError::Mismatch`] when the seats cannot reconcile to `total`.
pub fn seat_split(input: SeatSplitInput<'_>) -> Result<SplitPlan, SplitError> {
    let mut seats: Vec<&Seat> = input.seats.iter().collect();
    if seats.is_empty() {
        return Err(SplitError::Invalid(
            "a seat split needs at least one seat".to_string(),
        ));
    }
    if seats.len() > MAX_PARTS {
        return Err(SplitError::Invalid(format!(
            "a seat split allows at most {MAX_PARTS} seats"
        )));
    }
    let unique: HashSet<SeatId> = seats.iter().map(|s| s.id).collect();
    if unique.len() != seats.len() {
        return Err(SplitError::Invalid("duplicate seat in split".to_string()));
    }
    seats.sort_by_key(|s| (s.number, s.id));

    let position: HashMap<SeatId, usize> =
        seats.iter().enumerate().map(|(i, s)| (s.id, i)).collect();
    let mut by_item: HashMap<&str, Vec<&SeatItemAssociation>> = HashMap::new();
    for assoc in input.associations.iter().filter(|a| a.quantity > 0) {
        by_item
            .entry(assoc.order_item_id.as_str())
            .or_default()
            .push(assoc);
    }

    let mut amounts = vec![Money::ZERO; seats.len()];
    let mut shared = Money::ZERO;

    for item in input.items {
        if item.unit_price.is_negative() {
            return Err(SplitError::InvalidAmount(format!(
                "item {:?} has a negative unit price",
                item.id
            )));
        }
        let value = item_value(item, item.quantity)?;

        let unshared = match by_item.get_mut(item.id.as_str()) {
            None => value,
            Some(assocs) => {
                assocs.sort_by_key(|a| {
                    (position.get(&a.seat_id).copied().unwrap_or(usize::MAX), a.seat_id)
                });
                let associated: u64 = assocs.iter().map(|a| u64::from(a.quantity)).sum();
                let covered_qty =
                    u32::try_from(associated.min(u64::from(item.quantity))).unwrap_or(item.quantity);
                let covered = item_value(item, covered_qty)?;

                if covered.is_positive() {
                    let weights: Vec<u64> = assocs.iter().map(|a| u64::from(a.quantity)).collect();
                    let shares = covered.allocate(&weights)?;
                    for (assoc, share) in assocs.iter().zip(shares) {
                        // Units attributed to seats outside the split stay
                        // unpaid here and surface as a mismatch below.
                        if let Some(slot) =
                            position.get(&assoc.seat_id).and_then(|i| amounts.get_mut(*i))
                        {
                            *slot = accumulate(*slot, share)?;
                        }
                    }
                }
                value - covered
            }
        };

        if !unshared.is_positive() {
            continue;
        }
        if input.include_shared_items {
            let shares = unshared.divide_evenly(seats.len())?;
            for (slot, share) in amounts.iter_mut().zip(shares) {
                *slot = accumulate(*slot, share)?;
            }
        } else {
            shared = accumulate(shared, unshared)?;
        }
    }

    let shared_part = shared.is_positive().then(|| PartDraft {
        name: SHARED_ITEMS_PART_NAME.to_string(),
        amount: shared,
        seat_id: None,
    });

    let computed = amounts.iter().try_fold(shared, |acc, a| accumulate(acc, *a))?;
    let delta = input.total - computed;
    let mut adjustment = None;
    if !delta.is_zero() {
        let tolerance = i64::try_from(input.items.len()).unwrap_or(i64::MAX);
        let (Some(first_seat), Some(first_amount)) = (seats.first(), amounts.first_mut()) else {
            return Err(SplitError::Invalid("seat split has no seats".to_string()));
        };
        let adjusted = *first_amount + delta;
        if delta.abs().minor_units() > tolerance || !adjusted.is_positive() {
            return Err(SplitError::Mismatch {
                expected: input.total,
                got: computed,
            });
        }
        tracing::warn!(
            seat_id = %first_seat.id,
            delta = %delta,
            expected = %input.total,
            computed = %computed,
            "seat split adjusted to reconcile with the bill"
        );
        *first_amount = adjusted;
        adjustment = Some(SplitAdjustment {
            seat_id: first_seat.id,
            delta,
        });
    }

    if let Some((seat, _)) = seats.iter().zip(&amounts).find(|(_, a)| !a.is_positive()) {
        return Err(SplitError::Invalid(format!(
            "seat {} ({}) has nothing to pay",
            seat.number, seat.name
        )));
    }

    let mut parts: Vec<PartDraft> = seats
        .iter()
        .zip(amounts)
        .map(|(seat, amount)| PartDraft {
            name: seat.name.clone(),
            amount,
            seat_id: Some(seat.id),
        })
        .collect();
    parts.extend(shared_part);

    Ok(SplitPlan { parts, adjustment })
}

fn accumulate(total: Money, amount: Money) -> Result<Money, SplitError> {
    total
        .checked_add(amount)
        .ok_or_else(|| SplitError::Invalid("seat split amounts overflow".to_string()))
}

fn item_value(item: &OrderItem, quantity: u32) -> Result<Money, SplitError> {
    item.unit_price
        .checked_mul(quantity)
        .ok_or_else(|| SplitError::Invalid(format!("item {:?} value overflows", item.id)))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::SeatStatus;
    use chrono::Utc;
    use proptest::prelude::*;

    fn m(minor: i64) -> Money {
        Money::from_minor(minor)
    }

    fn seat(number: u32) -> Seat {
        Seat {
            id: SeatId::new(),
            table_id: "t1".to_string(),
            number,
            name: format!("Seat {number}"),
            status: SeatStatus::Occupied,
            created_at: Utc::now(),
        }
    }

    fn item(id: &str, unit_price: i64, quantity: u32) -> OrderItem {
        OrderItem {
            id: id.to_string(),
            name: id.to_string(),
            unit_price: m(unit_price),
            quantity,
        }
    }

    fn assoc(seat: &Seat, item: &str, quantity: u32) -> SeatItemAssociation {
        SeatItemAssociation {
            seat_id: seat.id,
            order_item_id: item.to_string(),
            quantity,
        }
    }

    fn amounts(parts: &[PartDraft]) -> Vec<i64> {
        parts.iter().map(|p| p.amount.minor_units()).collect()
    }

    #[test]
    fn equal_split_of_one_hundred_into_three() {
        let Ok(parts) = equal_split(m(10_000), 3, &[]) else {
            panic!("split failed");
        };
        assert_eq!(amounts(&parts), [3_334, 3_333, 3_333]);
        let names: Vec<&str> = parts.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Pessoa 1", "Pessoa 2", "Pessoa 3"]);
    }

    #[test]
    fn equal_split_uses_given_names_and_defaults_blanks() {
        let names = vec!["Ana".to_string(), " ".to_string()];
        let Ok(parts) = equal_split(m(900), 3, &names) else {
            panic!("split failed");
        };
        let got: Vec<&str> = parts.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(got, ["Ana", "Pessoa 2", "Pessoa 3"]);
    }

    #[test]
    fn equal_split_rejects_fewer_than_two_parts() {
        assert!(matches!(equal_split(m(100), 1, &[]), Err(SplitError::Invalid(_))));
        assert!(matches!(equal_split(m(100), 0, &[]), Err(SplitError::Invalid(_))));
    }

    #[test]
    fn equal_split_of_tiny_balance_leaves_zero_parts() {
        let Ok(parts) = equal_split(m(1), 2, &[]) else {
            panic!("split failed");
        };
        assert_eq!(amounts(&parts), [1, 0]);
        let Ok(parts) = equal_split(m(2), 3, &[]) else {
            panic!("split failed");
        };
        assert_eq!(amounts(&parts), [1, 1, 0]);
    }

    #[test]
    fn custom_split_mismatch_reports_sum() {
        let parts = vec![("A".to_string(), m(4_000)), ("B".to_string(), m(4_000))];
        let result = custom_split(m(10_000), &parts);
        assert_eq!(
            result,
            Err(SplitError::Mismatch {
                expected: m(10_000),
                got: m(8_000)
            })
        );
    }

    #[test]
    fn custom_split_accepts_exact_sum() {
        let parts = vec![("A".to_string(), m(6_000)), ("B".to_string(), m(4_000))];
        let Ok(drafts) = custom_split(m(10_000), &parts) else {
            panic!("split failed");
        };
        assert_eq!(amounts(&drafts), [6_000, 4_000]);
    }

    #[test]
    fn custom_split_rejects_non_positive_parts() {
        let parts = vec![("A".to_string(), m(10_000)), ("B".to_string(), m(0))];
        assert!(matches!(
            custom_split(m(10_000), &parts),
            Err(SplitError::InvalidAmount(_))
        ));
        assert!(matches!(custom_split(m(10_000), &[]), Err(SplitError::Invalid(_))));
    }

    #[test]
    fn seat_split_exclusive_items() {
        let s1 = seat(1);
        let s2 = seat(2);
        let items = vec![item("burger", 3_000, 1), item("pizza", 2_000, 2)];
        let associations = vec![assoc(&s1, "burger", 1), assoc(&s2, "pizza", 2)];
        let Ok(plan) = seat_split(SeatSplitInput {
            total: m(7_000),
            seats: &[s2.clone(), s1.clone()],
            items: &items,
            associations: &associations,
            include_shared_items: true,
        }) else {
            panic!("split failed");
        };
        assert_eq!(amounts(&plan.parts), [3_000, 4_000]);
        assert_eq!(plan.parts.first().and_then(|p| p.seat_id), Some(s1.id));
        assert!(plan.adjustment.is_none());
    }

    #[test]
    fn seat_split_spreads_unassigned_items_in_seat_order() {
        let s1 = seat(1);
        let s2 = seat(2);
        let s3 = seat(3);
        let items = vec![item("water", 1_000, 1), item("a", 100, 1), item("b", 100, 1), item("c", 100, 1)];
        let associations = vec![assoc(&s1, "a", 1), assoc(&s2, "b", 1), assoc(&s3, "c", 1)];
        let Ok(plan) = seat_split(SeatSplitInput {
            total: m(1_300),
            seats: &[s3, s1, s2],
            items: &items,
            associations: &associations,
            include_shared_items: true,
        }) else {
            panic!("split failed");
        };
        assert_eq!(amounts(&plan.parts), [434, 433, 433]);
    }

    #[test]
    fn seat_split_divides_each_shared_item_on_its_own() {
        let s1 = seat(1);
        let s2 = seat(2);
        let items = vec![item("bread", 101, 1), item("olives", 101, 1)];
        let Ok(plan) = seat_split(SeatSplitInput {
            total: m(202),
            seats: &[s2, s1],
            items: &items,
            associations: &[],
            include_shared_items: true,
        }) else {
            panic!("split failed");
        };
        assert_eq!(amounts(&plan.parts), [102, 100]);
        assert!(plan.adjustment.is_none());
    }

    #[test]
    fn seat_split_rejects_overflowing_sums() {
        let s1 = seat(1);
        let huge = i64::MAX / 2 + 1;
        let items = vec![item("a", huge, 1), item("b", huge, 1)];
        let associations = vec![assoc(&s1, "a", 1), assoc(&s1, "b", 1)];
        let result = seat_split(SeatSplitInput {
            total: Money::MAX,
            seats: std::slice::from_ref(&s1),
            items: &items,
            associations: &associations,
            include_shared_items: true,
        });
        assert!(matches!(result, Err(SplitError::Invalid(_))));

        let result = seat_split(SeatSplitInput {
            total: Money::MAX,
            seats: &[s1],
            items: &items,
            associations: &[],
            include_shared_items: false,
        });
        assert!(matches!(result, Err(SplitError::Invalid(_))));
    }

    #[test]
    fn seat_split_can_keep_shared_items_apart() {
        let s1 = seat(1);
        let s2 = seat(2);
        let items = vec![item("water", 1_000, 1), item("a", 500, 1), item("b", 700, 1)];
        let associations = vec![assoc(&s1, "a", 1), assoc(&s2, "b", 1)];
        let Ok(plan) = seat_split(SeatSplitInput {
            total: m(2_200),
            seats: &[s1, s2],
            items: &items,
            associations: &associations,
            include_shared_items: false,
        }) else {
            panic!("split failed");
        };
        assert_eq!(amounts(&plan.parts), [500, 700, 1_000]);
        assert_eq!(
            plan.parts.last().map(|p| p.name.as_str()),
            Some(SHARED_ITEMS_PART_NAME)
        );
        assert_eq!(plan.parts.last().and_then(|p| p.seat_id), None);
    }

    #[test]
    fn seat_split_divides_item_shared_by_association() {
        let s1 = seat(1);
        let s2 = seat(2);
        let items = vec![item("pizza", 2_501, 1)];
        let associations = vec![assoc(&s2, "pizza", 1), assoc(&s1, "pizza", 1)];
        let Ok(plan) = seat_split(SeatSplitInput {
            total: m(2_501),
            seats: &[s1, s2],
            items: &items,
            associations: &associations,
            include_shared_items: true,
        }) else {
            panic!("split failed");
        };
        assert_eq!(amounts(&plan.parts), [1_251, 1_250]);
    }

    #[test]
    fn seat_split_partial_quantity_leaves_rest_shared() {
        let s1 = seat(1);
        let s2 = seat(2);
        let items = vec![item("beer", 800, 3)];
        let associations = vec![assoc(&s1, "beer", 2)];
        let Ok(plan) = seat_split(SeatSplitInput {
            total: m(2_400),
            seats: &[s1, s2],
            items: &items,
            associations: &associations,
            include_shared_items: true,
        }) else {
            panic!("split failed");
        };
        assert_eq!(amounts(&plan.parts), [2_000, 400]);
    }

    #[test]
    fn seat_split_corrects_small_residual_on_first_seat() {
        let s1 = seat(1);
        let s2 = seat(2);
        let items = vec![item("a", 1_000, 1), item("b", 1_000, 1)];
        let associations = vec![assoc(&s1, "a", 1), assoc(&s2, "b", 1)];
        let Ok(plan) = seat_split(SeatSplitInput {
            total: m(2_001),
            seats: &[s1.clone(), s2],
            items: &items,
            associations: &associations,
            include_shared_items: true,
        }) else {
            panic!("split failed");
        };
        assert_eq!(amounts(&plan.parts), [1_001, 1_000]);
        assert_eq!(
            plan.adjustment,
            Some(SplitAdjustment {
                seat_id: s1.id,
                delta: m(1)
            })
        );
    }

    #[test]
    fn seat_split_items_of_excluded_seats_mismatch() {
        let s1 = seat(1);
        let s2 = seat(2);
        let items = vec![item("a", 1_000, 1), item("b", 1_500, 1)];
        let associations = vec![assoc(&s1, "a", 1), assoc(&s2, "b", 1)];
        let result = seat_split(SeatSplitInput {
            total: m(2_500),
            seats: &[s1],
            items: &items,
            associations: &associations,
            include_shared_items: true,
        });
        assert_eq!(
            result,
            Err(SplitError::Mismatch {
                expected: m(2_500),
                got: m(1_000)
            })
        );
    }

    #[test]
    fn seat_split_rejects_empty_and_duplicate_seats() {
        let s1 = seat(1);
        let base = SeatSplitInput {
            total: m(100),
            seats: &[],
            items: &[],
            associations: &[],
            include_shared_items: true,
        };
        assert!(matches!(seat_split(base), Err(SplitError::Invalid(_))));

        let dup = [s1.clone(), s1];
        let result = seat_split(SeatSplitInput { seats: &dup, ..base });
        assert!(matches!(result, Err(SplitError::Invalid(_))));
    }

    #[test]
    fn seat_split_rejects_seat_with_nothing_to_pay() {
        let s1 = seat(1);
        let s2 = seat(2);
        let items = vec![item("a", 1_000, 1)];
        let associations = vec![assoc(&s1, "a", 1)];
        let result = seat_split(SeatSplitInput {
            total: m(1_000),
            seats: &[s1, s2],
            items: &items,
            associations: &associations,
            include_shared_items: true,
        });
        assert!(matches!(result, Err(SplitError::Invalid(_))));
    }

    proptest! {
        #[test]
        fn equal_split_reconciles(total in 0_i64..50_000_000, n in 2_usize..=20) {
            let Ok(parts) = equal_split(m(total), n, &[]) else {
                panic!("split failed");
            };
            prop_assert_eq!(parts.len(), n);
            prop_assert_eq!(parts.iter().map(|p| p.amount).sum::<Money>(), m(total));
        }

        #[test]
        fn seat_split_reconciles_when_everything_is_shared(
            prices in proptest::collection::vec((100_i64..10_000, 1_u32..5), 1..10),
            seat_count in 1_u32..6,
        ) {
            let seats: Vec<Seat> = (1..=seat_count).map(seat).collect();
            let items: Vec<OrderItem> = prices
                .iter()
                .enumerate()
                .map(|(i, (p, q))| item(&format!("i{i}"), *p, *q))
                .collect();
            let total: Money = items
                .iter()
                .map(|i| i.unit_price.checked_mul(i.quantity).unwrap_or_default())
                .sum();
            let Ok(plan) = seat_split(SeatSplitInput {
                total,
                seats: &seats,
                items: &items,
                associations: &[],
                include_shared_items: true,
            }) else {
                panic!("split failed");
            };
            prop_assert_eq!(plan.parts.iter().map(|p| p.amount).sum::<Money>(), total);
        }
    }
}
