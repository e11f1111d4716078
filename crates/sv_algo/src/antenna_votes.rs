//! Antenna vote weight from membership-list size.
//!
//! Contract:
//! - Only the statutory assembly (`agora`) weighs votes by membership; any
//!   other event type yields 0.
//! - Only `antenna` bodies carry weight; every other body type yields 0.
//! - No membership snapshot (`None`) yields 0. An empty snapshot (`Some(0)`)
//!   also yields 0: it is below the first bracket.
//! - Otherwise the count is mapped through `MEMBER_BRACKETS`; above the last
//!   bracket every further 250 members add one vote.
//!
//! Pure and deterministic; no I/O.

use sv_core::{BodyType, EventType};

/// `(upper bound inclusive, votes)`, ascending. Lower bound of each bracket is
/// the previous upper bound + 1; the first bracket starts at 1.
pub const MEMBER_BRACKETS: &[(u32, u32)] = &[
    (20, 1),
    (50, 2),
    (100, 3),
    (150, 4),
    (200, 5),
    (250, 6),
    (350, 7),
    (450, 8),
    (550, 9),
    (650, 10),
    (750, 11),
    (850, 12),
    (950, 13),
];

/// Open-ended tail: `TAIL_BASE + (count - TAIL_FROM) / TAIL_STEP`.
const TAIL_FROM: u32 = 950;
const TAIL_BASE: u32 = 14;
const TAIL_STEP: u32 = 250;

/// Votes for an antenna at the assembly given its member count.
pub fn votes_for_member_count(member_count: u32) -> u32 {
    if member_count == 0 {
        return 0;
    }
    for &(upper, votes) in MEMBER_BRACKETS {
        if member_count <= upper {
            return votes;
        }
    }
    TAIL_BASE + (member_count - TAIL_FROM) / TAIL_STEP
}

/// Full calculator: event/body gating, then the bracket table.
pub fn compute_antenna_votes(
    event_type: EventType,
    body_type: BodyType,
    member_count: Option<u32>,
) -> u32 {
    if !event_type.is_assembly() || !body_type.is_antenna() {
        return 0;
    }
    match member_count {
        Some(n) => votes_for_member_count(n),
        None => 0,
    }
}
