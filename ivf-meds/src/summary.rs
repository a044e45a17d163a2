//! Cross-cycle rollups for the overview and comparison screens.

use std::collections::BTreeMap;

use ivf_core::{
    Cycle, CycleGoal, CycleStatus, PregnancyResult, TrackerConfig, TrackerData, MAX_CYCLE_DAYS,
};
use serde::{Deserialize, Serialize};

use crate::reconcile_day;

/// Embryology rates in percent. `None` when the denominator is zero.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct LabRates {
    pub maturity: Option<f64>,
    pub fertilization: Option<f64>,
    pub blastocyst: Option<f64>,
}

pub fn lab_rates(eggs_retrieved: u32, mature_eggs: u32, fertilized: u32, blastocysts: u32) -> LabRates {
    LabRates {
        maturity: percentage(mature_eggs, eggs_retrieved),
        fertilization: percentage(fertilized, mature_eggs),
        blastocyst: percentage(blastocysts, fertilized),
    }
}

fn percentage(numerator: u32, denominator: u32) -> Option<f64> {
    if denominator == 0 {
        return None;
    }
    Some(f64::from(numerator) / f64::from(denominator) * 100.0)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalTotals {
    pub cycles: usize,
    pub eggs_retrieved: u32,
    pub mature_eggs: u32,
    pub fertilized: u32,
    pub blastocysts: u32,
    pub euploid_blastocysts: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TransferTotals {
    pub transfers: usize,
    pub embryos_transferred: u32,
    pub positive: usize,
    pub live_births: usize,
    /// Positive results over transfers with a known result, in percent.
    pub success_rate: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct CostSummary {
    pub cycle_costs: f64,
    pub procedure_costs: f64,
    pub insurance_coverage: f64,
    pub net: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolTally {
    pub protocol: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct JourneySummary {
    pub total_cycles: usize,
    pub active_cycles: usize,
    pub completed_cycles: usize,
    pub cancelled_cycles: usize,
    pub retrieval: RetrievalTotals,
    pub rates: LabRates,
    pub transfer: TransferTotals,
    pub costs: CostSummary,
    pub retrieval_protocols: Vec<ProtocolTally>,
    pub transfer_protocols: Vec<ProtocolTally>,
    pub procedures: usize,
    pub natural_pregnancies: usize,
}

/// Recompute every dashboard number from the snapshot.
pub fn summarize(data: &TrackerData) -> JourneySummary {
    let mut summary = JourneySummary {
        total_cycles: data.cycles.len(),
        procedures: data.procedures.len(),
        natural_pregnancies: data.natural_pregnancies.len(),
        ..JourneySummary::default()
    };

    let mut known_results = 0usize;
    for cycle in &data.cycles {
        match cycle.status {
            CycleStatus::Active => summary.active_cycles += 1,
            CycleStatus::Completed => summary.completed_cycles += 1,
            CycleStatus::Cancelled => summary.cancelled_cycles += 1,
        }

        if let Some(costs) = &cycle.costs {
            summary.costs.cycle_costs += costs.gross();
            summary.costs.insurance_coverage += costs.insurance_coverage;
        }

        let Some(outcome) = &cycle.outcome else {
            continue;
        };
        match cycle.goal {
            CycleGoal::Retrieval => {
                let totals = &mut summary.retrieval;
                totals.cycles += 1;
                totals.eggs_retrieved += outcome.eggs_retrieved;
                totals.mature_eggs += outcome.mature_eggs;
                totals.fertilized += outcome.fertilized;
                totals.blastocysts += outcome.blastocysts;
                totals.euploid_blastocysts += outcome.euploid_blastocysts;
            }
            CycleGoal::Transfer => {
                if outcome.embryos_transferred == 0 && outcome.pregnancy_result.is_none() {
                    continue;
                }
                let totals = &mut summary.transfer;
                totals.transfers += 1;
                totals.embryos_transferred += outcome.embryos_transferred;
                if outcome.pregnancy_result.is_some() {
                    known_results += 1;
                }
                if outcome.pregnancy_result == Some(PregnancyResult::Positive) || outcome.live_birth {
                    totals.positive += 1;
                }
                if outcome.live_birth {
                    totals.live_births += 1;
                }
            }
        }
    }

    for procedure in &data.procedures {
        summary.costs.procedure_costs += procedure.cost.unwrap_or(0.0);
        summary.costs.insurance_coverage += procedure.insurance_coverage.unwrap_or(0.0);
    }
    summary.costs.net =
        summary.costs.cycle_costs + summary.costs.procedure_costs - summary.costs.insurance_coverage;

    let retrieval = &summary.retrieval;
    summary.rates = lab_rates(
        retrieval.eggs_retrieved,
        retrieval.mature_eggs,
        retrieval.fertilized,
        retrieval.blastocysts,
    );
    summary.transfer.success_rate = if known_results == 0 {
        None
    } else {
        Some(summary.transfer.positive as f64 / known_results as f64 * 100.0)
    };

    summary.retrieval_protocols = tally_protocols(&data.cycles, CycleGoal::Retrieval);
    summary.transfer_protocols = tally_protocols(&data.cycles, CycleGoal::Transfer);
    summary
}

/// Count cycles per protocol tag, most used first.
fn tally_protocols(cycles: &[Cycle], goal: CycleGoal) -> Vec<ProtocolTally> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for cycle in cycles.iter().filter(|cycle| cycle.goal == goal) {
        let protocol = cycle.protocol.trim();
        let key = if protocol.is_empty() {
            "unspecified".to_string()
        } else {
            protocol.to_string()
        };
        *counts.entry(key).or_default() += 1;
    }

    let mut tallies: Vec<ProtocolTally> = counts
        .into_iter()
        .map(|(protocol, count)| ProtocolTally { protocol, count })
        .collect();
    // BTreeMap order breaks ties alphabetically.
    tallies.sort_by(|a, b| b.count.cmp(&a.count));
    tallies
}

/// One row of the cycle comparison table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CycleComparison {
    pub cycle_id: String,
    pub name: String,
    pub goal: CycleGoal,
    pub protocol: String,
    pub status: CycleStatus,
    pub days_tracked: usize,
    /// Days with at least one reconciled medication.
    pub medication_days: usize,
    pub eggs_retrieved: Option<u32>,
    pub mature_eggs: Option<u32>,
    pub fertilized: Option<u32>,
    pub blastocysts: Option<u32>,
    pub euploid_blastocysts: Option<u32>,
    pub rates: LabRates,
    pub pregnancy_result: Option<PregnancyResult>,
    pub net_cost: Option<f64>,
}

pub fn compare_cycles(data: &TrackerData) -> Vec<CycleComparison> {
    let config = TrackerConfig::default();
    data.cycles
        .iter()
        .map(|cycle| {
            let outcome = cycle.outcome.as_ref();
            CycleComparison {
                cycle_id: cycle.id.clone(),
                name: cycle.name.clone(),
                goal: cycle.goal,
                protocol: cycle.protocol.clone(),
                status: cycle.status,
                days_tracked: cycle.days.len(),
                medication_days: medication_days(data, cycle, &config),
                eggs_retrieved: outcome.map(|o| o.eggs_retrieved),
                mature_eggs: outcome.map(|o| o.mature_eggs),
                fertilized: outcome.map(|o| o.fertilized),
                blastocysts: outcome.map(|o| o.blastocysts),
                euploid_blastocysts: outcome.map(|o| o.euploid_blastocysts),
                rates: outcome
                    .map(|o| lab_rates(o.eggs_retrieved, o.mature_eggs, o.fertilized, o.blastocysts))
                    .unwrap_or_default(),
                pregnancy_result: outcome.and_then(|o| o.pregnancy_result),
                net_cost: cycle.costs.as_ref().map(|costs| costs.net()),
            }
        })
        .collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct AdherenceSummary {
    pub days: u32,
    pub doses: usize,
    pub taken: usize,
    pub skipped: usize,
    pub pending: usize,
}

/// Dose counts over days `1..=through_day` of a cycle.
///
/// Without `through_day` the last day is the latest one any source knows about.
/// Either way it is capped at [`MAX_CYCLE_DAYS`].
pub fn cycle_adherence(
    data: &TrackerData,
    cycle_id: &str,
    through_day: Option<u32>,
    config: &TrackerConfig,
) -> Option<AdherenceSummary> {
    let cycle = data.cycle(cycle_id)?;
    let last_day = through_day
        .unwrap_or_else(|| last_known_day(data, cycle))
        .min(MAX_CYCLE_DAYS);

    let mut summary = AdherenceSummary {
        days: last_day,
        ..AdherenceSummary::default()
    };
    for day_number in 1..=last_day {
        let Some(date) = cycle.expected_date(day_number) else {
            break;
        };
        let day = reconcile_day(data, cycle_id, day_number, date, config);
        summary.doses += day.total;
        summary.taken += day.taken;
        summary.skipped += day.skipped;
        summary.pending += day.pending();
    }
    Some(summary)
}

fn medication_days(data: &TrackerData, cycle: &Cycle, config: &TrackerConfig) -> usize {
    (1..=last_known_day(data, cycle))
        .filter_map(|day_number| {
            let date = cycle.expected_date(day_number)?;
            Some(reconcile_day(data, &cycle.id, day_number, date, config))
        })
        .filter(|day| !day.is_empty())
        .count()
}

fn last_known_day(data: &TrackerData, cycle: &Cycle) -> u32 {
    let scheduled = data
        .schedule_for(&cycle.id)
        .into_iter()
        .flat_map(|schedule| schedule.medications.iter())
        .filter(|medication| medication.start_day <= medication.end_day)
        .map(|medication| medication.end_day);
    let tracked = cycle.days.iter().map(|day| day.day_number);
    let statuses = data
        .daily_medication_statuses
        .iter()
        .filter(|status| status.cycle_id == cycle.id)
        .map(|status| status.day_number);

    scheduled
        .chain(tracked)
        .chain(statuses)
        .max()
        .unwrap_or(0)
        .min(MAX_CYCLE_DAYS)
}
