//! Merge scheduled, day-specific and legacy medications into a single day view.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use ivf_core::{
    ClockTime, DaySpecificMedication, LegacyMedication, MedicationStatusOverride,
    ScheduledMedication, TimeOfDay, TrackerConfig, TrackerData,
};
use serde::{Deserialize, Serialize};

/// Which record shape a reconciled entry came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Scheduled,
    DaySpecific,
    Legacy,
    Flat,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DoseStatus {
    Pending,
    Taken,
    Skipped,
}

/// One medication occurrence on a given day, with its status resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledMedication {
    pub id: String,
    pub provenance: Provenance,
    pub name: String,
    /// Dosage after applying the day's override, if any.
    pub dosage: String,
    pub scheduled_dosage: String,
    pub time: Option<String>,
    pub sort_minutes: u32,
    pub bucket: TimeOfDay,
    pub refrigerated: bool,
    pub is_trigger: bool,
    pub taken: bool,
    pub skipped: bool,
    pub taken_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl ReconciledMedication {
    pub fn status(&self) -> DoseStatus {
        if self.taken {
            DoseStatus::Taken
        } else if self.skipped {
            DoseStatus::Skipped
        } else {
            DoseStatus::Pending
        }
    }

    pub fn is_complete(&self) -> bool {
        self.taken || self.skipped
    }
}

/// Medications grouped under one display bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct MedicationGroup<'a> {
    pub bucket: TimeOfDay,
    pub medications: Vec<&'a ReconciledMedication>,
}

/// The complete medication list for a (cycle, day) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReconciledDay {
    pub cycle_id: String,
    pub day_number: u32,
    pub date: NaiveDate,
    pub medications: Vec<ReconciledMedication>,
    pub total: usize,
    /// Taken plus skipped.
    pub completed: usize,
    pub taken: usize,
    pub skipped: usize,
}

impl ReconciledDay {
    pub(crate) fn from_entries(
        cycle_id: &str,
        day_number: u32,
        date: NaiveDate,
        mut medications: Vec<ReconciledMedication>,
    ) -> Self {
        // Stable sort keeps provenance order for identical times.
        medications.sort_by_key(|entry| entry.sort_minutes);

        let taken = medications.iter().filter(|entry| entry.taken).count();
        let skipped = medications
            .iter()
            .filter(|entry| !entry.taken && entry.skipped)
            .count();

        Self {
            cycle_id: cycle_id.to_string(),
            day_number,
            date,
            total: medications.len(),
            completed: taken + skipped,
            taken,
            skipped,
            medications,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.medications.is_empty()
    }

    pub fn pending(&self) -> usize {
        self.total - self.completed
    }

    pub fn find(&self, medication_id: &str) -> Option<&ReconciledMedication> {
        self.medications.iter().find(|entry| entry.id == medication_id)
    }

    /// Non-empty buckets in display order for the configured policy.
    ///
    /// Buckets are recomputed from `sort_minutes`, so `config` need not be the
    /// one the day was reconciled with.
    pub fn grouped(&self, config: &TrackerConfig) -> Vec<MedicationGroup<'_>> {
        config
            .buckets()
            .iter()
            .filter_map(|bucket| {
                let medications: Vec<&ReconciledMedication> = self
                    .medications
                    .iter()
                    .filter(|entry| config.bucket_for(entry.sort_minutes) == *bucket)
                    .collect();
                (!medications.is_empty()).then_some(MedicationGroup {
                    bucket: *bucket,
                    medications,
                })
            })
            .collect()
    }
}

/// Build the day's medication list from every source that applies.
///
/// Unknown cycles and days with nothing scheduled produce an empty day rather
/// than an error. Legacy inline medications are only consulted when the cycle
/// has no schedule at all.
pub fn reconcile_day(
    data: &TrackerData,
    cycle_id: &str,
    day_number: u32,
    date: NaiveDate,
    config: &TrackerConfig,
) -> ReconciledDay {
    let Some(cycle) = data.cycle(cycle_id) else {
        tracing::debug!(cycle_id, "reconcile: unknown cycle");
        return ReconciledDay::from_entries(cycle_id, day_number, date, Vec::new());
    };
    if day_number == 0 {
        return ReconciledDay::from_entries(cycle_id, day_number, date, Vec::new());
    }

    let status = data.day_status(cycle_id, day_number);
    let mut seen: HashSet<&str> = HashSet::new();
    let mut entries = Vec::new();

    let schedule = data.schedule_for(cycle_id);
    if let Some(schedule) = schedule {
        for medication in schedule
            .medications
            .iter()
            .filter(|medication| medication.covers(day_number))
        {
            if !seen.insert(medication.id.as_str()) {
                continue;
            }
            let override_entry = status.and_then(|status| status.override_for(&medication.id));
            entries.push(from_scheduled(medication, override_entry, config));
        }
    }

    if let Some(status) = status {
        for medication in &status.day_specific_medications {
            if seen.insert(medication.id.as_str()) {
                entries.push(from_day_specific(medication, config));
            }
        }
    }

    if schedule.is_none() {
        if let Some(day) = cycle.day(day_number) {
            for medication in &day.medications {
                if seen.insert(medication.id.as_str()) {
                    entries.push(from_legacy(medication, config));
                }
            }
        }
    }

    tracing::debug!(
        cycle_id,
        day_number,
        has_schedule = schedule.is_some(),
        has_status = status.is_some(),
        count = entries.len(),
        "reconciled medication day"
    );

    ReconciledDay::from_entries(cycle_id, day_number, date, entries)
}

/// Display string and sort key for a medication's time.
pub(crate) fn time_fields(clock: Option<ClockTime>, raw: Option<&str>) -> (Option<String>, u32) {
    match clock {
        Some(clock) => (Some(clock.to_string()), clock.minutes()),
        None => {
            let text = raw
                .map(str::trim)
                .filter(|text| !text.is_empty())
                .map(str::to_string);
            (text, 0)
        }
    }
}

fn from_scheduled(
    medication: &ScheduledMedication,
    override_entry: Option<&MedicationStatusOverride>,
    config: &TrackerConfig,
) -> ReconciledMedication {
    let (time, sort_minutes) = time_fields(medication.clock_time(), medication.time.as_deref());
    let dosage = override_entry
        .and_then(|entry| entry.actual_dosage.clone())
        .unwrap_or_else(|| medication.dosage.clone());

    ReconciledMedication {
        id: medication.id.clone(),
        provenance: Provenance::Scheduled,
        name: medication.name.clone(),
        dosage,
        scheduled_dosage: medication.dosage.clone(),
        time,
        sort_minutes,
        bucket: config.bucket_for(sort_minutes),
        refrigerated: medication.refrigerated,
        is_trigger: medication.is_trigger,
        taken: override_entry.is_some_and(|entry| entry.taken),
        skipped: override_entry.is_some_and(|entry| entry.skipped),
        taken_at: override_entry.and_then(|entry| entry.taken_at),
        notes: override_entry
            .and_then(|entry| entry.notes.clone())
            .or_else(|| medication.notes.clone()),
    }
}

fn from_day_specific(
    medication: &DaySpecificMedication,
    config: &TrackerConfig,
) -> ReconciledMedication {
    let (time, sort_minutes) = time_fields(medication.clock_time(), medication.time.as_deref());
    ReconciledMedication {
        id: medication.id.clone(),
        provenance: Provenance::DaySpecific,
        name: medication.name.clone(),
        dosage: medication.dosage.clone(),
        scheduled_dosage: medication.dosage.clone(),
        time,
        sort_minutes,
        bucket: config.bucket_for(sort_minutes),
        refrigerated: medication.refrigerated,
        is_trigger: false,
        taken: medication.taken,
        skipped: medication.skipped,
        taken_at: medication.taken_at,
        notes: medication.notes.clone(),
    }
}

fn from_legacy(medication: &LegacyMedication, config: &TrackerConfig) -> ReconciledMedication {
    let (time, sort_minutes) = time_fields(medication.clock_time(), medication.time.as_deref());
    ReconciledMedication {
        id: medication.id.clone(),
        provenance: Provenance::Legacy,
        name: medication.name.clone(),
        dosage: medication.dosage.clone(),
        scheduled_dosage: medication.dosage.clone(),
        time,
        sort_minutes,
        bucket: config.bucket_for(sort_minutes),
        refrigerated: medication.refrigerated,
        is_trigger: false,
        taken: medication.taken,
        skipped: false,
        taken_at: None,
        notes: None,
    }
}
