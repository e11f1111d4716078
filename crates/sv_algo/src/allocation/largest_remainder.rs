//! Largest Remainder (LR) apportionment of a body's votes across its delegates.
//!
//! Contract:
//! - Every delegate has equal weight, so the Hare quota reduces to
//!   `floor(total / n)` per delegate and the remainder is `total % n`.
//! - Leftover votes go one each to the first `total % n` delegates in the
//!   caller's order. The caller supplies canonical roster order
//!   (`participant_order` ascending), so lower-ranked delegates win the
//!   remainder.
//! - `n == 0` yields an empty allocation; callers persist nothing for it.
//! - Postcondition: shares sum to `total` exactly.
//!
//! Determinism:
//! - No RNG or policy here; the input order is the only tie key.

use alloc::vec::Vec;

/// Apportion `total` votes across `ordered` delegates. Output keeps input order.
pub fn apportion<K: Clone>(total: u32, ordered: &[K]) -> Vec<(K, u32)> {
    if ordered.is_empty() {
        return Vec::new();
    }

    let (floor, leftovers) = floor_and_leftovers(total, ordered.len());
    let mut alloc: Vec<(K, u32)> = ordered.iter().map(|k| (k.clone(), floor)).collect();
    distribute_leftovers(leftovers, &mut alloc);

    debug_assert_eq!(total_of(&alloc), u64::from(total));
    alloc
}

/// Sum of an allocation (u64 so the check itself cannot overflow).
pub fn total_of<K>(alloc: &[(K, u32)]) -> u64 {
    alloc.iter().map(|(_, v)| u64::from(*v)).sum()
}

/// Integer-only floor share and leftover count for `n > 0` equal-weight delegates.
fn floor_and_leftovers(total: u32, n: usize) -> (u32, usize) {
    let n = n as u64;
    let total = u64::from(total);
    // floor <= total, so the narrowing is lossless; leftovers < n.
    ((total / n) as u32, (total % n) as usize)
}

/// Hand one extra vote to each of the first `leftovers` entries.
fn distribute_leftovers<K>(leftovers: usize, alloc: &mut [(K, u32)]) {
    for (_, votes) in alloc.iter_mut().take(leftovers) {
        *votes += 1;
    }
}
