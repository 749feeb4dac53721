//! Per-update connection profiles.
//!
//! A profile counts the connections seen for one update and tracks the
//! earliest departure and latest arrival among them. Profiles are built by
//! folding records into a [`ProfileAccumulator`] and persisted as a flat JSON
//! object keyed by update identifier.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::path::Path;
use tracing::{debug, info};

use crate::record::Connection;

/// Profiles keyed by update identifier, in key order.
pub type ProfileMap<T> = BTreeMap<String, UpdateProfile<T>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProfile<T> {
    #[serde(rename = "cxCount", alias = "count")]
    pub count: u64,
    #[serde(rename = "minTime")]
    pub min_time: Option<T>,
    #[serde(rename = "maxTime")]
    pub max_time: Option<T>,
}

impl<T: Ord + Clone> UpdateProfile<T> {
    fn first<C: Connection<Time = T>>(record: &C) -> Self {
        UpdateProfile {
            count: 1,
            min_time: record.departure_time().cloned(),
            max_time: record.arrival_time().cloned(),
        }
    }

    fn observe<C: Connection<Time = T>>(&mut self, record: &C) {
        self.count += 1;

        if let Some(departure) = record.departure_time() {
            if self.min_time.as_ref().is_none_or(|min| departure < min) {
                self.min_time = Some(departure.clone());
            }
        }

        if let Some(arrival) = record.arrival_time() {
            if self.max_time.as_ref().is_none_or(|max| arrival > max) {
                self.max_time = Some(arrival.clone());
            }
        }
    }
}

impl<C: Connection> Connection for &C {
    type Time = C::Time;

    fn departure_time(&self) -> Option<&Self::Time> {
        (*self).departure_time()
    }

    fn arrival_time(&self) -> Option<&Self::Time> {
        (*self).arrival_time()
    }
}

/// Incremental fold of records into per-key profiles.
///
/// A missing timestamp never replaces one that is already known.
#[derive(Debug)]
pub struct ProfileAccumulator<T> {
    profiles: ProfileMap<T>,
}

impl<T> Default for ProfileAccumulator<T> {
    fn default() -> Self {
        Self {
            profiles: BTreeMap::new(),
        }
    }
}

impl<T: Ord + Clone> ProfileAccumulator<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe<C: Connection<Time = T>>(&mut self, key: String, record: &C) {
        match self.profiles.entry(key) {
            Entry::Vacant(entry) => {
                entry.insert(UpdateProfile::first(record));
            }
            Entry::Occupied(entry) => entry.into_mut().observe(record),
        }
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    pub fn finish(self) -> ProfileMap<T> {
        self.profiles
    }
}

/// Folds `records` into a profile per key returned by `key`.
pub fn aggregate_by_key<C, I, F>(records: I, mut key: F) -> ProfileMap<C::Time>
where
    C: Connection,
    I: IntoIterator<Item = C>,
    F: FnMut(&C) -> String,
{
    let mut acc = ProfileAccumulator::new();
    for record in records {
        acc.observe(key(&record), &record);
    }
    acc.finish()
}

/// Writes `profiles` to `path` as a flat JSON object, replacing any previous file.
pub async fn save_profiles<T: Serialize>(
    path: impl AsRef<Path>,
    profiles: &ProfileMap<T>,
) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let body = serde_json::to_vec(profiles)?;
    tokio::fs::write(path, body)
        .await
        .with_context(|| format!("failed to write profiles to {}", path.display()))?;

    info!(path = %path.display(), updates = profiles.len(), "Profiles saved");
    Ok(())
}

/// Loads a profile file written by [`save_profiles`].
pub async fn load_profiles(path: impl AsRef<Path>) -> Result<ProfileMap<String>> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read profiles from {}", path.display()))?;
    let profiles: ProfileMap<String> = serde_json::from_str(&content)
        .with_context(|| format!("invalid profile JSON in {}", path.display()))?;

    debug!(path = %path.display(), updates = profiles.len(), "Profiles loaded");
    Ok(profiles)
}
