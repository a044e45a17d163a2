//! Medication view model for the IVF tracker.
//!
//! Every function here works on an in-memory [`TrackerData`](ivf_core::TrackerData)
//! snapshot: [`reconcile_day`] merges the scheduled, day-specific and legacy
//! medication shapes into one list, [`apply_status_action`] records what the user
//! did with a dose, and [`summarize`] rolls the cycles up for dashboards.

mod error;
mod flat;
mod mutate;
mod reconcile;
mod schedule;
mod summary;
#[cfg(test)]
mod test_support;

pub use error::MutationError;
pub use flat::{
    add_one_time_medication, apply_flat_action, delete_flat_medication, flat_day,
    materialize_schedule,
};
pub use mutate::{
    add_day_specific_medication, apply_status_action, delete_day_specific_medication,
    ensure_day_status, update_day_specific_medication, DoseTarget, NewDaySpecificMedication,
    StatusAction,
};
pub use reconcile::{
    reconcile_day, DoseStatus, MedicationGroup, Provenance, ReconciledDay, ReconciledMedication,
};
pub use schedule::{
    add_scheduled_medication, ensure_schedule, remove_scheduled_medication,
    update_scheduled_medication, NewScheduledMedication,
};
pub use summary::{
    compare_cycles, cycle_adherence, lab_rates, summarize, AdherenceSummary, CostSummary,
    CycleComparison, JourneySummary, LabRates, ProtocolTally, RetrievalTotals, TransferTotals,
};

pub(crate) fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
