//! Determinism utilities: stable delegate roster ordering.
//!
//! The apportioner hands remainder votes to the *first* delegates it is given,
//! so roster order decides who gets them. Order is:
//! `participant_order` ascending (missing orders last), then `ApplicationId`
//! ascending. This makes the order total even when a body has two delegates
//! sharing a rank.

use core::cmp::Ordering;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::entities::Application;
use crate::ids::{ApplicationId, UserId};

/* -------------------------------------------------------------------------- */
/*                               Stable Ordering                              */
/* -------------------------------------------------------------------------- */

/// Provide a **total**, stable order for values that must sort canonically.
pub trait StableOrd {
    fn stable_cmp(&self, other: &Self) -> Ordering;
}

/// One eligible delegate as read from the application roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RosterEntry {
    pub application_id: ApplicationId,
    pub user_id: UserId,
    pub participant_order: Option<u32>,
}

impl From<&Application> for RosterEntry {
    fn from(app: &Application) -> Self {
        RosterEntry {
            application_id: app.id,
            user_id: app.user_id,
            participant_order: app.participant_order,
        }
    }
}

#[inline]
fn cmp_order_then_id(
    a_order: Option<u32>,
    a_id: ApplicationId,
    b_order: Option<u32>,
    b_id: ApplicationId,
) -> Ordering {
    // None sorts after every Some.
    let rank = |o: Option<u32>| o.map_or((1u8, 0u32), |v| (0u8, v));
    rank(a_order).cmp(&rank(b_order)).then_with(|| a_id.cmp(&b_id))
}

impl StableOrd for RosterEntry {
    #[inline]
    fn stable_cmp(&self, other: &Self) -> Ordering {
        cmp_order_then_id(
            self.participant_order,
            self.application_id,
            other.participant_order,
            other.application_id,
        )
    }
}

impl StableOrd for Application {
    #[inline]
    fn stable_cmp(&self, other: &Self) -> Ordering {
        cmp_order_then_id(self.participant_order, self.id, other.participant_order, other.id)
    }
}

/* -------------------------------------------------------------------------- */
/*                            Canonical sort helpers                           */
/* -------------------------------------------------------------------------- */

/// Sort a delegate roster **in place** into canonical order.
#[inline]
pub fn sort_roster_canonical<T: StableOrd>(xs: &mut [T]) {
    xs.sort_by(|a, b| a.stable_cmp(b));
}

/* ---------------------------------- Tests --------------------------------- */
