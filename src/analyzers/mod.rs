//! Summaries computed over saved update profiles.
//!
//! Restricts profiles to a time window, then reports the largest update,
//! average connections and time window per update, and connection totals
//! bucketed per day and per hour.

pub mod summary;
pub mod types;
pub mod utility;
