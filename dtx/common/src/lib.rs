//! Tabular result model shared by the 2PC recovery crates.
//!
//! A [`result::QueryResult`] is what the query executor hands back: ordered rows of typed
//! column values. [`row::RowRef`] decodes single columns into strings, integers and
//! timestamps, failing with [`error::DecodeError`] when a value cannot be coerced.

pub mod error;
pub mod field;
pub mod result;
pub mod row;
pub mod time;
pub mod value;
