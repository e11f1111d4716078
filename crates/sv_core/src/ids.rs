//! crates/sv_core/src/ids.rs
//! Row identifiers for events, bodies, applications, and users.
//! Positive integers only; parsing is strict (ASCII digits, no sign, no zero).

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Longest decimal rendering of an `i64`.
const MAX_ID_DIGITS: usize = 19;

/// Strict positive decimal: ^[1-9][0-9]{0,18}$ and fits in i64.
#[inline]
fn parse_positive_id(s: &str) -> Result<i64, CoreError> {
    let bs = s.as_bytes();
    if bs.is_empty() || bs.len() > MAX_ID_DIGITS {
        return Err(CoreError::InvalidId);
    }
    if bs[0] == b'0' || !bs.iter().all(u8::is_ascii_digit) {
        return Err(CoreError::InvalidId);
    }
    s.parse::<i64>().map_err(|_| CoreError::InvalidId)
}

macro_rules! int_id_newtype {
    ($(#[$m:meta])* $name:ident) => {
        $(#[$m])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        #[cfg_attr(feature = "serde", serde(try_from = "i64", into = "i64"))]
        pub struct $name(i64);

        impl $name {
            /// Wrap a raw id; rejects zero and negatives.
            #[inline]
            pub fn new(raw: i64) -> Result<Self, CoreError> {
                if raw > 0 { Ok(Self(raw)) } else { Err(CoreError::InvalidId) }
            }

            #[inline] pub fn get(self) -> i64 { self.0 }
        }

        impl fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
        }

        impl FromStr for $name {
            type Err = CoreError;
            #[inline]
            fn from_str(s: &str) -> Result<Self, Self::Err> { parse_positive_id(s).map(Self) }
        }

        impl TryFrom<i64> for $name {
            type Error = CoreError;
            #[inline]
            fn try_from(value: i64) -> Result<Self, Self::Error> { Self::new(value) }
        }

        impl From<$name> for i64 {
            #[inline]
            fn from(id: $name) -> i64 { id.0 }
        }
    }
}

int_id_newtype!(
    /// Event (statutory or planning meeting) row id.
    EventId
);
int_id_newtype!(
    /// Body (antenna, contact, working group, ...) id as known to the core service.
    BodyId
);
int_id_newtype!(
    /// Event application row id.
    ApplicationId
);
int_id_newtype!(
    /// Member/user id as known to the core service.
    UserId
);
