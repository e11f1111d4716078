//! Typed column decoding for rows read through rusqlite.
//!
//! Stored ids and tokens are re-validated on the way out so a hand-edited
//! database surfaces as a conversion error instead of a bogus domain value.

use std::str::FromStr;

use rusqlite::types::Type;
use rusqlite::Row;
use sv_core::CoreError;

fn conversion(idx: usize, ty: Type, e: CoreError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, ty, Box::new(e))
}

/// Positive integer id column.
pub fn id_at<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: TryFrom<i64, Error = CoreError>,
{
    let raw: i64 = row.get(idx)?;
    T::try_from(raw).map_err(|e| conversion(idx, Type::Integer, e))
}

/// Wire-token column (event/body/participant/distribution types).
pub fn token_at<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr<Err = CoreError>,
{
    let raw: String = row.get(idx)?;
    raw.parse().map_err(|e| conversion(idx, Type::Text, e))
}

/// Nullable wire-token column.
pub fn opt_token_at<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<T>>
where
    T: FromStr<Err = CoreError>,
{
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| s.parse().map_err(|e| conversion(idx, Type::Text, e)))
        .transpose()
}

/// Non-negative count column narrowed to u32.
pub fn u32_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<u32> {
    let raw: i64 = row.get(idx)?;
    u32::try_from(raw).map_err(|_| conversion(idx, Type::Integer, CoreError::DomainOutOfRange("u32")))
}

/// Nullable non-negative count column.
pub fn opt_u32_at(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<u32>> {
    let raw: Option<i64> = row.get(idx)?;
    raw.map(|v| {
        u32::try_from(v).map_err(|_| conversion(idx, Type::Integer, CoreError::DomainOutOfRange("u32")))
    })
    .transpose()
}
