//! The active user's data blob and the operations that read or rewrite it.

use chrono::{NaiveDate, Utc};
use ivf_core::{DailyMedicationStatus, TrackerConfig, TrackerData};
use ivf_meds::{DoseTarget, JourneySummary, Provenance, ReconciledDay, StatusAction};
use serde::{Deserialize, Serialize};

use crate::{KeyValueStore, StoreConfig, StoreError};

/// The day a user last had open, restored when they come back.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LastViewedDay {
    pub cycle_id: String,
    pub day_number: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Preferences {
    last_viewed_day: Option<LastViewedDay>,
}

/// Holds one user's [`TrackerData`] and writes it back after every change.
#[derive(Debug)]
pub struct TrackerStore<S> {
    backend: S,
    config: StoreConfig,
    user_id: Option<String>,
    data: TrackerData,
}

impl<S: KeyValueStore> TrackerStore<S> {
    pub fn new(backend: S, config: StoreConfig) -> Self {
        Self {
            backend,
            config,
            user_id: None,
            data: TrackerData::default(),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut S {
        &mut self.backend
    }

    pub fn into_backend(self) -> S {
        self.backend
    }

    pub fn active_user(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn data(&self) -> &TrackerData {
        &self.data
    }

    /// Replace the in-memory snapshot with `user_id`'s blob. Nothing of the
    /// previous user's data survives the swap.
    pub fn load_user(&mut self, user_id: &str) -> Result<(), StoreError> {
        let key = self.config.data_key(user_id);
        let data = match self.backend.get(&key)? {
            Some(value) => serde_json::from_value(value)?,
            None => TrackerData::default(),
        };
        self.data = data;
        self.user_id = Some(user_id.to_string());
        tracing::info!(
            user_id,
            cycles = self.data.cycles.len(),
            "loaded tracker data"
        );
        Ok(())
    }

    pub fn unload(&mut self) {
        self.user_id = None;
        self.data = TrackerData::default();
    }

    /// Read-modify-write of the snapshot. `change` runs on a copy; the copy is
    /// persisted and swapped in only when `change` succeeds.
    pub fn update<T, E>(
        &mut self,
        change: impl FnOnce(&mut TrackerData) -> Result<T, E>,
    ) -> Result<T, StoreError>
    where
        StoreError: From<E>,
    {
        let user_id = self.user_id.clone().ok_or(StoreError::NoActiveUser)?;
        let mut next = self.data.clone();
        let output = change(&mut next)?;
        self.backend
            .set(&self.config.data_key(&user_id), &serde_json::to_value(&next)?)?;
        self.data = next;
        Ok(output)
    }

    /// Status record for the day, created and persisted if it does not exist yet.
    pub fn ensure_day_status(
        &mut self,
        cycle_id: &str,
        day_number: u32,
        date: NaiveDate,
    ) -> Result<DailyMedicationStatus, StoreError> {
        if let Some(existing) = self.data.day_status(cycle_id, day_number) {
            return Ok(existing.clone());
        }
        let now = Utc::now();
        self.update(|data| {
            ivf_meds::ensure_day_status(data, cycle_id, day_number, date, now)
                .map(|status| status.clone())
        })
    }

    pub fn apply_status_action(
        &mut self,
        target: &DoseTarget,
        action: &StatusAction,
    ) -> Result<Provenance, StoreError> {
        let now = Utc::now();
        self.update(|data| ivf_meds::apply_status_action(data, target, action, now))
    }

    pub fn reconcile_day(
        &self,
        cycle_id: &str,
        day_number: u32,
        date: NaiveDate,
        config: &TrackerConfig,
    ) -> ReconciledDay {
        ivf_meds::reconcile_day(&self.data, cycle_id, day_number, date, config)
    }

    pub fn summary(&self) -> JourneySummary {
        ivf_meds::summarize(&self.data)
    }

    pub fn remember_day(&mut self, day: LastViewedDay) -> Result<(), StoreError> {
        let user_id = self.user_id.clone().ok_or(StoreError::NoActiveUser)?;
        let preferences = Preferences {
            last_viewed_day: Some(day),
        };
        self.backend.set(
            &self.config.preferences_key(&user_id),
            &serde_json::to_value(preferences)?,
        )
    }

    /// Last viewed day, or `None` when unset or unreadable.
    pub fn remembered_day(&self) -> Option<LastViewedDay> {
        let user_id = self.user_id.as_deref()?;
        let key = self.config.preferences_key(user_id);
        let value = match self.backend.get(&key) {
            Ok(value) => value?,
            Err(err) => {
                tracing::warn!(%err, %key, "ignoring unreadable preferences");
                return None;
            }
        };
        match serde_json::from_value::<Preferences>(value) {
            Ok(preferences) => preferences.last_viewed_day,
            Err(err) => {
                tracing::warn!(%err, %key, "ignoring malformed preferences");
                None
            }
        }
    }
}
