/// Rejected medication or schedule edits.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MutationError {
    #[error("Cycle {0} not found")]
    CycleNotFound(String),
    #[error("Medication {medication_id} does not apply to day {day_number}")]
    MedicationNotFound {
        medication_id: String,
        day_number: u32,
    },
    #[error("Medication {0} is not marked as taken")]
    NotTaken(String),
    #[error("Legacy medication {0} only supports taken/reset")]
    UnsupportedForLegacy(String),
    #[error("Invalid day range {start_day}..={end_day}")]
    InvalidDayRange { start_day: u32, end_day: u32 },
    #[error("Day numbers start at 1")]
    InvalidDayNumber,
}
