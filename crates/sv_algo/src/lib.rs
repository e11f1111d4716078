// crates/sv_algo/src/lib.rs
#![forbid(unsafe_code)]
#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub use sv_core::{BodyType, EventType};

// ----------------------------- Antenna weight (public surface) -----------------------

pub mod antenna_votes;

pub use antenna_votes::{compute_antenna_votes, votes_for_member_count, MEMBER_BRACKETS};

// ----------------------------- Allocation (public surface) ---------------------------

pub mod allocation {
    pub mod largest_remainder;

    // Pipeline-friendly alias.
    pub use largest_remainder::apportion as largest_remainder_apportion;
}

pub use allocation::largest_remainder::{apportion, total_of};
