use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use ivf_core::{
    Cycle, CycleDay, CycleGoal, CycleStatus, DailyMedicationStatus, DaySpecificMedication,
    LegacyMedication, MedicationSchedule, ScheduledMedication, TrackerData,
};

pub(crate) fn date(text: &str) -> NaiveDate {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").expect("valid date")
}

pub(crate) fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 3, hour, minute, 0)
        .single()
        .expect("valid timestamp")
}

pub(crate) fn cycle(id: &str, goal: CycleGoal, protocol: &str) -> Cycle {
    Cycle {
        id: id.to_string(),
        name: format!("Cycle {id}"),
        goal,
        protocol: protocol.to_string(),
        status: CycleStatus::Active,
        start_date: date("2024-03-01"),
        end_date: None,
        days: Vec::new(),
        outcome: None,
        costs: None,
        notes: None,
    }
}

pub(crate) fn data_with_cycle(id: &str) -> TrackerData {
    TrackerData {
        cycles: vec![cycle(id, CycleGoal::Retrieval, "antagonist")],
        ..TrackerData::default()
    }
}

pub(crate) fn schedule(cycle_id: &str, medications: Vec<ScheduledMedication>) -> MedicationSchedule {
    MedicationSchedule {
        id: format!("schedule-{cycle_id}"),
        cycle_id: cycle_id.to_string(),
        medications,
        created_at: at(6, 0),
        updated_at: at(6, 0),
    }
}

pub(crate) fn scheduled(
    id: &str,
    name: &str,
    dosage: &str,
    time: &str,
    start_day: u32,
    end_day: u32,
) -> ScheduledMedication {
    ScheduledMedication {
        id: id.to_string(),
        name: name.to_string(),
        dosage: dosage.to_string(),
        hour: None,
        minute: None,
        ampm: None,
        time: Some(time.to_string()),
        refrigerated: false,
        is_trigger: false,
        start_day,
        end_day,
        notes: None,
    }
}

pub(crate) fn day_status(cycle_id: &str, day_number: u32) -> DailyMedicationStatus {
    DailyMedicationStatus {
        id: format!("status-{cycle_id}-{day_number}"),
        cycle_id: cycle_id.to_string(),
        day_number,
        date: date("2024-03-01"),
        medications: Vec::new(),
        day_specific_medications: Vec::new(),
        created_at: at(6, 0),
        updated_at: at(6, 0),
    }
}

pub(crate) fn day_specific(id: &str, name: &str, dosage: &str, time: &str) -> DaySpecificMedication {
    DaySpecificMedication {
        id: id.to_string(),
        name: name.to_string(),
        dosage: dosage.to_string(),
        hour: None,
        minute: None,
        ampm: None,
        time: Some(time.to_string()),
        refrigerated: false,
        taken: false,
        skipped: false,
        taken_at: None,
        notes: None,
    }
}

pub(crate) fn legacy(id: &str, name: &str, dosage: &str, taken: bool) -> LegacyMedication {
    LegacyMedication {
        id: id.to_string(),
        name: name.to_string(),
        dosage: dosage.to_string(),
        time: None,
        taken,
        refrigerated: false,
    }
}

pub(crate) fn cycle_day(day_number: u32, day: &str, medications: Vec<LegacyMedication>) -> CycleDay {
    CycleDay {
        id: None,
        day_number,
        date: date(day),
        medications,
        clinic_visit: None,
        follicle_sizes: Vec::new(),
        bloodwork: Vec::new(),
        notes: None,
    }
}
