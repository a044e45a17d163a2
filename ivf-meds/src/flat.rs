//! The flat medication list: one [`Medication`] record per dose occurrence.

use chrono::{DateTime, NaiveDate, Utc};
use ivf_core::{
    ClockTime, Medication, MedicationKind, TrackerConfig, TrackerData, MAX_CYCLE_DAYS,
};

use crate::mutate::{apply_transition, non_blank};
use crate::reconcile::time_fields;
use crate::{new_id, MutationError, Provenance, ReconciledDay, ReconciledMedication, StatusAction};

/// Expand the cycle's schedule into flat records, one per medication per covered day.
///
/// Records that already exist for the same (day, name, time) are left alone, so
/// running this again after editing the schedule only adds the new occurrences.
/// Returns how many records were added.
pub fn materialize_schedule(data: &mut TrackerData, cycle_id: &str) -> Result<usize, MutationError> {
    if data.cycle(cycle_id).is_none() {
        return Err(MutationError::CycleNotFound(cycle_id.to_string()));
    }
    let Some(schedule) = data.schedule_for(cycle_id) else {
        return Ok(0);
    };

    let mut pending = Vec::new();
    for scheduled in &schedule.medications {
        let time = scheduled
            .clock_time()
            .map(|clock| clock.to_string())
            .or_else(|| non_blank(scheduled.time.as_deref()))
            .unwrap_or_default();

        // Inverted ranges yield an empty iterator.
        for day in scheduled.start_day.max(1)..=scheduled.end_day.min(MAX_CYCLE_DAYS) {
            let exists = data
                .medications
                .iter()
                .chain(pending.iter())
                .any(|existing: &Medication| {
                    existing.cycle_id == cycle_id
                        && existing.cycle_day == day
                        && existing.name == scheduled.name
                        && existing.time == time
                });
            if exists {
                continue;
            }
            pending.push(Medication {
                id: new_id(),
                cycle_id: cycle_id.to_string(),
                cycle_day: day,
                name: scheduled.name.clone(),
                dosage: scheduled.dosage.clone(),
                time: time.clone(),
                refrigerated: scheduled.refrigerated,
                kind: MedicationKind::Scheduled,
                taken: false,
                skipped: false,
                taken_at: None,
                notes: scheduled.notes.clone(),
            });
        }
    }

    let added = pending.len();
    data.medications.extend(pending);
    tracing::info!(cycle_id, added, "materialized medication schedule");
    Ok(added)
}

/// Add a single flat record that does not recur.
pub fn add_one_time_medication(
    data: &mut TrackerData,
    cycle_id: &str,
    cycle_day: u32,
    name: &str,
    dosage: &str,
    time: Option<ClockTime>,
    refrigerated: bool,
) -> Result<String, MutationError> {
    if cycle_day == 0 {
        return Err(MutationError::InvalidDayNumber);
    }
    if data.cycle(cycle_id).is_none() {
        return Err(MutationError::CycleNotFound(cycle_id.to_string()));
    }

    let id = new_id();
    data.medications.push(Medication {
        id: id.clone(),
        cycle_id: cycle_id.to_string(),
        cycle_day,
        name: name.to_string(),
        dosage: dosage.to_string(),
        time: time.map(|clock| clock.to_string()).unwrap_or_default(),
        refrigerated,
        kind: MedicationKind::OneTime,
        taken: false,
        skipped: false,
        taken_at: None,
        notes: None,
    });
    tracing::info!(cycle_id, cycle_day, medication_id = %id, "one-time medication added");
    Ok(id)
}

/// The flat records of one day in the same shape as [`reconcile_day`](crate::reconcile_day).
pub fn flat_day(
    data: &TrackerData,
    cycle_id: &str,
    cycle_day: u32,
    date: NaiveDate,
    config: &TrackerConfig,
) -> ReconciledDay {
    let entries = data
        .medications
        .iter()
        .filter(|medication| medication.cycle_id == cycle_id && medication.cycle_day == cycle_day)
        .map(|medication| {
            let (time, sort_minutes) =
                time_fields(medication.clock_time(), Some(medication.time.as_str()));
            ReconciledMedication {
                id: medication.id.clone(),
                provenance: Provenance::Flat,
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
        })
        .collect();

    ReconciledDay::from_entries(cycle_id, cycle_day, date, entries)
}

pub fn apply_flat_action(
    data: &mut TrackerData,
    medication_id: &str,
    action: &StatusAction,
    now: DateTime<Utc>,
) -> Result<(), MutationError> {
    let medication = data
        .medications
        .iter_mut()
        .find(|medication| medication.id == medication_id)
        .ok_or_else(|| MutationError::MedicationNotFound {
            medication_id: medication_id.to_string(),
            day_number: 0,
        })?;
    apply_transition(medication, medication_id, action, now)?;
    tracing::info!(medication_id, ?action, "flat medication updated");
    Ok(())
}

pub fn delete_flat_medication(
    data: &mut TrackerData,
    medication_id: &str,
) -> Result<Medication, MutationError> {
    let index = data
        .medications
        .iter()
        .position(|medication| medication.id == medication_id)
        .ok_or_else(|| MutationError::MedicationNotFound {
            medication_id: medication_id.to_string(),
            day_number: 0,
        })?;
    Ok(data.medications.remove(index))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    fn scheduled_cycle() -> TrackerData {
        let mut data = data_with_cycle("c1");
        data.medication_schedules.push(schedule(
            "c1",
            vec![
                scheduled("gonal", "Gonal-F", "225 IU", "8:00 PM", 1, 3),
                scheduled("cetro", "Cetrotide", "0.25 mg", "7:00 AM", 3, 4),
                scheduled("broken", "Typo", "1", "", 5, 2),
            ],
        ));
        data
    }

    #[test]
    fn materialize_is_idempotent() {
        let mut data = scheduled_cycle();
        assert_eq!(materialize_schedule(&mut data, "c1").expect("first"), 5);
        assert_eq!(materialize_schedule(&mut data, "c1").expect("second"), 0);
        assert_eq!(data.medications.len(), 5);
        assert!(data
            .medications
            .iter()
            .all(|medication| medication.kind == MedicationKind::Scheduled));
    }

    #[test]
    fn materialize_stops_at_the_cycle_horizon() {
        let mut data = data_with_cycle("c1");
        data.medication_schedules.push(schedule(
            "c1",
            vec![scheduled("typo", "Estrace", "2 mg", "8:00 AM", 1, u32::MAX)],
        ));
        let added = materialize_schedule(&mut data, "c1").expect("materialize");
        assert_eq!(added, MAX_CYCLE_DAYS as usize);
        assert_eq!(
            data.medications.iter().map(|m| m.cycle_day).max(),
            Some(MAX_CYCLE_DAYS)
        );
    }

    #[test]
    fn flat_day_sorts_and_counts() {
        let mut data = scheduled_cycle();
        materialize_schedule(&mut data, "c1").expect("materialize");
        let config = TrackerConfig::default();

        let day = flat_day(&data, "c1", 3, date("2024-03-03"), &config);
        let names: Vec<&str> = day.medications.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Cetrotide", "Gonal-F"]);
        assert!(day.medications.iter().all(|m| m.provenance == Provenance::Flat));

        let gonal = day.medications[1].id.clone();
        apply_flat_action(&mut data, &gonal, &StatusAction::MarkTaken { at: None }, at(20, 0))
            .expect("take");
        let day = flat_day(&data, "c1", 3, date("2024-03-03"), &config);
        assert_eq!(day.completed, 1);
        assert_eq!(day.medications[1].taken_at, Some(at(20, 0)));
    }

    #[test]
    fn one_time_medications_and_delete() {
        let mut data = data_with_cycle("c1");
        let id = add_one_time_medication(
            &mut data,
            "c1",
            12,
            "Ovidrel",
            "250 mcg",
            ClockTime::new(21, 30),
            true,
        )
        .expect("add");
        assert_eq!(data.medications[0].time, "9:30 PM");
        assert_eq!(data.medications[0].kind, MedicationKind::OneTime);

        assert!(apply_flat_action(
            &mut data,
            &id,
            &StatusAction::EditTakenTime { at: at(21, 0) },
            at(21, 5)
        )
        .is_err());

        let removed = delete_flat_medication(&mut data, &id).expect("delete");
        assert_eq!(removed.name, "Ovidrel");
        assert!(data.medications.is_empty());
    }
}
