//! Record what the user did with a dose against the record that owns it.
//!
//! Scheduled medications get a per-day override inside the day's
//! [`DailyMedicationStatus`]; day-specific medications carry their own flags;
//! legacy inline medications only know `taken`. Every write is an upsert keyed
//! by medication id, so repeating an action never duplicates records.

use chrono::{DateTime, NaiveDate, Utc};
use ivf_core::{
    DailyMedicationStatus, DaySpecificMedication, Medication, MedicationStatusOverride, Meridiem,
    TrackerData,
};
use serde::{Deserialize, Serialize};

use crate::{new_id, MutationError, Provenance};

/// A user action on one dose.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StatusAction {
    /// `at` backfills an earlier time; `None` means now.
    MarkTaken {
        #[serde(default)]
        at: Option<DateTime<Utc>>,
    },
    MarkSkipped,
    Reset,
    EditTakenTime {
        at: DateTime<Utc>,
    },
    /// `None` clears a dosage override.
    EditDosage {
        #[serde(default)]
        dosage: Option<String>,
    },
    SetNotes {
        #[serde(default)]
        notes: Option<String>,
    },
}

/// Addresses one medication on one cycle day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DoseTarget {
    pub cycle_id: String,
    pub day_number: u32,
    pub date: NaiveDate,
    pub medication_id: String,
}

/// Fields for a new one-off medication, or a replacement of an existing one's details.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct NewDaySpecificMedication {
    pub name: String,
    pub dosage: String,
    pub hour: Option<u8>,
    pub minute: Option<u8>,
    pub ampm: Option<Meridiem>,
    pub time: Option<String>,
    pub refrigerated: bool,
    pub notes: Option<String>,
}

/// Mutable view over the status fields shared by overrides, day-specific and flat records.
pub(crate) trait DoseRecord {
    fn taken(&mut self) -> &mut bool;
    fn skipped(&mut self) -> &mut bool;
    fn taken_at(&mut self) -> &mut Option<DateTime<Utc>>;
    fn notes(&mut self) -> &mut Option<String>;
    fn set_dosage(&mut self, dosage: Option<String>);
}

impl DoseRecord for MedicationStatusOverride {
    fn taken(&mut self) -> &mut bool {
        &mut self.taken
    }
    fn skipped(&mut self) -> &mut bool {
        &mut self.skipped
    }
    fn taken_at(&mut self) -> &mut Option<DateTime<Utc>> {
        &mut self.taken_at
    }
    fn notes(&mut self) -> &mut Option<String> {
        &mut self.notes
    }
    fn set_dosage(&mut self, dosage: Option<String>) {
        self.actual_dosage = dosage;
    }
}

impl DoseRecord for DaySpecificMedication {
    fn taken(&mut self) -> &mut bool {
        &mut self.taken
    }
    fn skipped(&mut self) -> &mut bool {
        &mut self.skipped
    }
    fn taken_at(&mut self) -> &mut Option<DateTime<Utc>> {
        &mut self.taken_at
    }
    fn notes(&mut self) -> &mut Option<String> {
        &mut self.notes
    }
    fn set_dosage(&mut self, dosage: Option<String>) {
        // One-off records have no separate scheduled dosage to fall back to.
        if let Some(dosage) = dosage {
            self.dosage = dosage;
        }
    }
}

impl DoseRecord for Medication {
    fn taken(&mut self) -> &mut bool {
        &mut self.taken
    }
    fn skipped(&mut self) -> &mut bool {
        &mut self.skipped
    }
    fn taken_at(&mut self) -> &mut Option<DateTime<Utc>> {
        &mut self.taken_at
    }
    fn notes(&mut self) -> &mut Option<String> {
        &mut self.notes
    }
    fn set_dosage(&mut self, dosage: Option<String>) {
        if let Some(dosage) = dosage {
            self.dosage = dosage;
        }
    }
}

pub(crate) fn apply_transition<R: DoseRecord>(
    record: &mut R,
    id: &str,
    action: &StatusAction,
    now: DateTime<Utc>,
) -> Result<(), MutationError> {
    match action {
        StatusAction::MarkTaken { at } => {
            *record.taken() = true;
            *record.skipped() = false;
            *record.taken_at() = Some(at.unwrap_or(now));
        }
        StatusAction::MarkSkipped => {
            *record.taken() = false;
            *record.skipped() = true;
            *record.taken_at() = None;
        }
        StatusAction::Reset => {
            *record.taken() = false;
            *record.skipped() = false;
            *record.taken_at() = None;
        }
        StatusAction::EditTakenTime { at } => {
            if !*record.taken() {
                return Err(MutationError::NotTaken(id.to_string()));
            }
            *record.taken_at() = Some(*at);
        }
        StatusAction::EditDosage { dosage } => record.set_dosage(non_blank(dosage.as_deref())),
        StatusAction::SetNotes { notes } => *record.notes() = non_blank(notes.as_deref()),
    }
    Ok(())
}

pub(crate) fn non_blank(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}

/// Return the day's status record, creating an empty one on first use.
pub fn ensure_day_status<'a>(
    data: &'a mut TrackerData,
    cycle_id: &str,
    day_number: u32,
    date: NaiveDate,
    now: DateTime<Utc>,
) -> Result<&'a mut DailyMedicationStatus, MutationError> {
    if day_number == 0 {
        return Err(MutationError::InvalidDayNumber);
    }
    if data.cycle(cycle_id).is_none() {
        return Err(MutationError::CycleNotFound(cycle_id.to_string()));
    }

    let position = data
        .daily_medication_statuses
        .iter()
        .position(|status| status.cycle_id == cycle_id && status.day_number == day_number);

    let index = match position {
        Some(index) => index,
        None => {
            tracing::debug!(cycle_id, day_number, "creating daily medication status");
            data.daily_medication_statuses.push(DailyMedicationStatus {
                id: new_id(),
                cycle_id: cycle_id.to_string(),
                day_number,
                date,
                medications: Vec::new(),
                day_specific_medications: Vec::new(),
                created_at: now,
                updated_at: now,
            });
            data.daily_medication_statuses.len() - 1
        }
    };

    Ok(&mut data.daily_medication_statuses[index])
}

/// Apply `action` to whichever record owns `target.medication_id` on that day.
///
/// Returns the provenance of the record that was changed.
pub fn apply_status_action(
    data: &mut TrackerData,
    target: &DoseTarget,
    action: &StatusAction,
    now: DateTime<Utc>,
) -> Result<Provenance, MutationError> {
    let DoseTarget {
        cycle_id,
        day_number,
        medication_id,
        ..
    } = target;
    let day_number = *day_number;

    if day_number == 0 {
        return Err(MutationError::InvalidDayNumber);
    }
    if data.cycle(cycle_id).is_none() {
        return Err(MutationError::CycleNotFound(cycle_id.clone()));
    }

    // Same precedence as reconciliation: scheduled, then day-specific, then legacy.
    let scheduled_here = data.schedule_for(cycle_id).map(|schedule| {
        schedule
            .medications
            .iter()
            .any(|medication| medication.id == *medication_id && medication.covers(day_number))
    });
    if scheduled_here == Some(true) {
        return apply_scheduled_action(data, target, action, now);
    }

    if let Some(status) = data.day_status_mut(cycle_id, day_number) {
        if let Some(medication) = status
            .day_specific_medications
            .iter_mut()
            .find(|medication| medication.id == *medication_id)
        {
            apply_transition(medication, medication_id, action, now)?;
            status.updated_at = now;
            tracing::info!(%cycle_id, day_number, %medication_id, ?action, "day-specific dose updated");
            return Ok(Provenance::DaySpecific);
        }
    }

    match scheduled_here {
        Some(_) => Err(MutationError::MedicationNotFound {
            medication_id: medication_id.clone(),
            day_number,
        }),
        None => apply_legacy_action(data, target, action),
    }
}

fn apply_scheduled_action(
    data: &mut TrackerData,
    target: &DoseTarget,
    action: &StatusAction,
    now: DateTime<Utc>,
) -> Result<Provenance, MutationError> {
    let DoseTarget {
        cycle_id,
        day_number,
        date,
        medication_id,
    } = target;
    let day_number = *day_number;

    // Work on a copy so a rejected action leaves no half-created status behind.
    let mut entry = data
        .day_status(cycle_id, day_number)
        .and_then(|status| status.override_for(medication_id))
        .cloned()
        .unwrap_or_else(|| MedicationStatusOverride::pending(medication_id.clone()));
    apply_transition(&mut entry, medication_id, action, now)?;

    let status = ensure_day_status(data, cycle_id, day_number, *date, now)?;
    match status
        .medications
        .iter_mut()
        .find(|existing| existing.medication_id == *medication_id)
    {
        Some(existing) => *existing = entry,
        None => status.medications.push(entry),
    }
    status.updated_at = now;
    tracing::info!(%cycle_id, day_number, %medication_id, ?action, "scheduled dose updated");
    Ok(Provenance::Scheduled)
}

fn apply_legacy_action(
    data: &mut TrackerData,
    target: &DoseTarget,
    action: &StatusAction,
) -> Result<Provenance, MutationError> {
    let not_found = || MutationError::MedicationNotFound {
        medication_id: target.medication_id.clone(),
        day_number: target.day_number,
    };

    let medication = data
        .cycle_mut(&target.cycle_id)
        .and_then(|cycle| cycle.day_mut(target.day_number))
        .and_then(|day| {
            day.medications
                .iter_mut()
                .find(|medication| medication.id == target.medication_id)
        })
        .ok_or_else(not_found)?;

    match action {
        StatusAction::MarkTaken { .. } => medication.taken = true,
        StatusAction::Reset => medication.taken = false,
        _ => {
            return Err(MutationError::UnsupportedForLegacy(
                target.medication_id.clone(),
            ))
        }
    }

    tracing::info!(
        cycle_id = %target.cycle_id,
        day_number = target.day_number,
        medication_id = %target.medication_id,
        ?action,
        "legacy dose updated"
    );
    Ok(Provenance::Legacy)
}

/// Add a one-off medication to a day and return its id.
pub fn add_day_specific_medication(
    data: &mut TrackerData,
    cycle_id: &str,
    day_number: u32,
    date: NaiveDate,
    medication: NewDaySpecificMedication,
    now: DateTime<Utc>,
) -> Result<String, MutationError> {
    let status = ensure_day_status(data, cycle_id, day_number, date, now)?;
    let id = new_id();
    status.day_specific_medications.push(DaySpecificMedication {
        id: id.clone(),
        name: medication.name,
        dosage: medication.dosage,
        hour: medication.hour,
        minute: medication.minute,
        ampm: medication.ampm,
        time: medication.time,
        refrigerated: medication.refrigerated,
        taken: false,
        skipped: false,
        taken_at: None,
        notes: medication.notes,
    });
    status.updated_at = now;
    tracing::info!(cycle_id, day_number, medication_id = %id, "day-specific medication added");
    Ok(id)
}

/// Replace the descriptive fields of a one-off medication, keeping its status.
pub fn update_day_specific_medication(
    data: &mut TrackerData,
    cycle_id: &str,
    day_number: u32,
    medication_id: &str,
    details: NewDaySpecificMedication,
    now: DateTime<Utc>,
) -> Result<(), MutationError> {
    let status = data
        .day_status_mut(cycle_id, day_number)
        .ok_or_else(|| day_medication_missing(medication_id, day_number))?;
    let medication = status
        .day_specific_medications
        .iter_mut()
        .find(|medication| medication.id == medication_id)
        .ok_or_else(|| day_medication_missing(medication_id, day_number))?;

    medication.name = details.name;
    medication.dosage = details.dosage;
    medication.hour = details.hour;
    medication.minute = details.minute;
    medication.ampm = details.ampm;
    medication.time = details.time;
    medication.refrigerated = details.refrigerated;
    medication.notes = details.notes;
    status.updated_at = now;
    Ok(())
}

/// Permanently remove a one-off medication from its day.
pub fn delete_day_specific_medication(
    data: &mut TrackerData,
    cycle_id: &str,
    day_number: u32,
    medication_id: &str,
    now: DateTime<Utc>,
) -> Result<DaySpecificMedication, MutationError> {
    let status = data
        .day_status_mut(cycle_id, day_number)
        .ok_or_else(|| day_medication_missing(medication_id, day_number))?;
    let index = status
        .day_specific_medications
        .iter()
        .position(|medication| medication.id == medication_id)
        .ok_or_else(|| day_medication_missing(medication_id, day_number))?;

    let removed = status.day_specific_medications.remove(index);
    status.updated_at = now;
    tracing::info!(cycle_id, day_number, medication_id, "day-specific medication deleted");
    Ok(removed)
}

fn day_medication_missing(medication_id: &str, day_number: u32) -> MutationError {
    MutationError::MedicationNotFound {
        medication_id: medication_id.to_string(),
        day_number,
    }
}
