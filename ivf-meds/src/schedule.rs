//! Editing the recurring medication schedule of a cycle.

use chrono::{DateTime, Utc};
use ivf_core::{MedicationSchedule, Meridiem, ScheduledMedication, TrackerData, MAX_CYCLE_DAYS};
use serde::{Deserialize, Serialize};

use crate::mutate::non_blank;
use crate::{new_id, MutationError};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct NewScheduledMedication {
    pub name: String,
    pub dosage: String,
    pub hour: Option<u8>,
    pub minute: Option<u8>,
    pub ampm: Option<Meridiem>,
    pub time: Option<String>,
    pub refrigerated: bool,
    pub is_trigger: bool,
    pub start_day: u32,
    pub end_day: u32,
    pub notes: Option<String>,
}

impl NewScheduledMedication {
    fn validate(&self) -> Result<(), MutationError> {
        if self.start_day == 0 || self.start_day > self.end_day || self.end_day > MAX_CYCLE_DAYS {
            return Err(MutationError::InvalidDayRange {
                start_day: self.start_day,
                end_day: self.end_day,
            });
        }
        Ok(())
    }

    fn into_scheduled(self, id: String) -> ScheduledMedication {
        ScheduledMedication {
            id,
            name: self.name,
            dosage: self.dosage,
            hour: self.hour,
            minute: self.minute,
            ampm: self.ampm,
            time: non_blank(self.time.as_deref()),
            refrigerated: self.refrigerated,
            is_trigger: self.is_trigger,
            start_day: self.start_day,
            end_day: self.end_day,
            notes: non_blank(self.notes.as_deref()),
        }
    }
}

/// Return the cycle's schedule, creating an empty one if the cycle has none yet.
pub fn ensure_schedule<'a>(
    data: &'a mut TrackerData,
    cycle_id: &str,
    now: DateTime<Utc>,
) -> Result<&'a mut MedicationSchedule, MutationError> {
    if data.cycle(cycle_id).is_none() {
        return Err(MutationError::CycleNotFound(cycle_id.to_string()));
    }

    let position = data
        .medication_schedules
        .iter()
        .position(|schedule| schedule.cycle_id == cycle_id);

    let index = match position {
        Some(index) => index,
        None => {
            tracing::info!(cycle_id, "creating medication schedule");
            data.medication_schedules.push(MedicationSchedule {
                id: new_id(),
                cycle_id: cycle_id.to_string(),
                medications: Vec::new(),
                created_at: now,
                updated_at: now,
            });
            data.medication_schedules.len() - 1
        }
    };

    Ok(&mut data.medication_schedules[index])
}

pub fn add_scheduled_medication(
    data: &mut TrackerData,
    cycle_id: &str,
    medication: NewScheduledMedication,
    now: DateTime<Utc>,
) -> Result<String, MutationError> {
    medication.validate()?;
    let schedule = ensure_schedule(data, cycle_id, now)?;
    let id = new_id();
    tracing::info!(
        cycle_id,
        medication_id = %id,
        name = %medication.name,
        start_day = medication.start_day,
        end_day = medication.end_day,
        "scheduled medication added"
    );
    schedule.medications.push(medication.into_scheduled(id.clone()));
    schedule.updated_at = now;
    Ok(id)
}

/// Replace a scheduled medication's details. Existing daily overrides keep pointing at it.
pub fn update_scheduled_medication(
    data: &mut TrackerData,
    cycle_id: &str,
    medication_id: &str,
    details: NewScheduledMedication,
    now: DateTime<Utc>,
) -> Result<(), MutationError> {
    details.validate()?;
    let schedule = data
        .schedule_for_mut(cycle_id)
        .ok_or_else(|| MutationError::CycleNotFound(cycle_id.to_string()))?;
    let existing = schedule
        .medications
        .iter_mut()
        .find(|medication| medication.id == medication_id)
        .ok_or_else(|| missing(medication_id, details.start_day))?;

    *existing = details.into_scheduled(medication_id.to_string());
    schedule.updated_at = now;
    tracing::info!(cycle_id, medication_id, "scheduled medication updated");
    Ok(())
}

pub fn remove_scheduled_medication(
    data: &mut TrackerData,
    cycle_id: &str,
    medication_id: &str,
    now: DateTime<Utc>,
) -> Result<ScheduledMedication, MutationError> {
    let schedule = data
        .schedule_for_mut(cycle_id)
        .ok_or_else(|| MutationError::CycleNotFound(cycle_id.to_string()))?;
    let index = schedule
        .medications
        .iter()
        .position(|medication| medication.id == medication_id)
        .ok_or_else(|| missing(medication_id, 0))?;

    let removed = schedule.medications.remove(index);
    schedule.updated_at = now;
    tracing::info!(cycle_id, medication_id, "scheduled medication removed");
    Ok(removed)
}

fn missing(medication_id: &str, day_number: u32) -> MutationError {
    MutationError::MedicationNotFound {
        medication_id: medication_id.to_string(),
        day_number,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile_day;
    use crate::test_support::*;
    use ivf_core::TrackerConfig;

    fn stims(start_day: u32, end_day: u32) -> NewScheduledMedication {
        NewScheduledMedication {
            name: "Gonal-F".to_string(),
            dosage: "225 IU".to_string(),
            hour: Some(8),
            minute: Some(0),
            ampm: Some(Meridiem::Pm),
            refrigerated: true,
            start_day,
            end_day,
            ..NewScheduledMedication::default()
        }
    }

    #[test]
    fn adding_creates_the_schedule_on_demand() {
        let mut data = data_with_cycle("c1");
        let id = add_scheduled_medication(&mut data, "c1", stims(1, 5), at(7, 0)).expect("add");

        assert_eq!(data.medication_schedules.len(), 1);
        let day = reconcile_day(&data, "c1", 5, date("2024-03-05"), &TrackerConfig::default());
        assert_eq!(day.medications[0].id, id);
        assert_eq!(day.medications[0].time.as_deref(), Some("8:00 PM"));

        add_scheduled_medication(&mut data, "c1", stims(6, 8), at(7, 5)).expect("second");
        assert_eq!(data.medication_schedules.len(), 1);
        assert_eq!(data.medication_schedules[0].medications.len(), 2);
        assert_eq!(data.medication_schedules[0].updated_at, at(7, 5));
    }

    #[test]
    fn inverted_or_zero_ranges_are_rejected() {
        let mut data = data_with_cycle("c1");
        assert_eq!(
            add_scheduled_medication(&mut data, "c1", stims(5, 3), at(7, 0)).unwrap_err(),
            MutationError::InvalidDayRange {
                start_day: 5,
                end_day: 3
            }
        );
        assert!(add_scheduled_medication(&mut data, "c1", stims(0, 3), at(7, 0)).is_err());
        assert_eq!(
            add_scheduled_medication(&mut data, "c1", stims(1, 3_000_000), at(7, 0)).unwrap_err(),
            MutationError::InvalidDayRange {
                start_day: 1,
                end_day: 3_000_000
            }
        );
        assert!(data.medication_schedules.is_empty());
    }

    #[test]
    fn unknown_cycle_is_rejected() {
        let mut data = TrackerData::default();
        assert_eq!(
            add_scheduled_medication(&mut data, "ghost", stims(1, 2), at(7, 0)).unwrap_err(),
            MutationError::CycleNotFound("ghost".to_string())
        );
    }

    #[test]
    fn update_and_remove() {
        let mut data = data_with_cycle("c1");
        let id = add_scheduled_medication(&mut data, "c1", stims(1, 5), at(7, 0)).expect("add");

        let mut lowered = stims(1, 7);
        lowered.dosage = "150 IU".to_string();
        update_scheduled_medication(&mut data, "c1", &id, lowered, at(8, 0)).expect("update");
        let day = reconcile_day(&data, "c1", 7, date("2024-03-07"), &TrackerConfig::default());
        assert_eq!(day.medications[0].dosage, "150 IU");

        let removed = remove_scheduled_medication(&mut data, "c1", &id, at(9, 0)).expect("remove");
        assert_eq!(removed.id, id);
        assert!(remove_scheduled_medication(&mut data, "c1", &id, at(9, 5)).is_err());
    }
}
