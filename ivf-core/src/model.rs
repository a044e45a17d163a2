//! Các bản ghi được lưu trong blob JSON của từng người dùng.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::time::{resolve_clock_time, ClockTime, Meridiem};
use crate::TrackerError;

/// Mục tiêu của chu kỳ.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CycleGoal {
    Retrieval,
    Transfer,
}

/// Trạng thái vòng đời chu kỳ.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum CycleStatus {
    #[default]
    Active,
    Completed,
    Cancelled,
}

/// Kết quả thử thai sau chuyển phôi.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PregnancyResult {
    Positive,
    Negative,
    Chemical,
    Miscarriage,
}

/// Một chu kỳ điều trị.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cycle {
    pub id: String,
    pub name: String,
    pub goal: CycleGoal,
    /// Phác đồ tự do ("antagonist", "long lupron", "FET natural"...).
    #[serde(rename = "type", default)]
    pub protocol: String,
    #[serde(default)]
    pub status: CycleStatus,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub days: Vec<CycleDay>,
    #[serde(default)]
    pub outcome: Option<CycleOutcome>,
    #[serde(default)]
    pub costs: Option<CycleCosts>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Cycle {
    /// Ngày lịch tương ứng với số ngày chu kỳ (ngày 1 = `start_date`).
    pub fn expected_date(&self, day_number: u32) -> Option<NaiveDate> {
        if day_number == 0 {
            return None;
        }
        self.start_date
            .checked_add_signed(Duration::days(i64::from(day_number) - 1))
    }

    pub fn day(&self, day_number: u32) -> Option<&CycleDay> {
        self.days.iter().find(|day| day.day_number == day_number)
    }

    pub fn day_mut(&mut self, day_number: u32) -> Option<&mut CycleDay> {
        self.days.iter_mut().find(|day| day.day_number == day_number)
    }

    /// Các ngày có `date` lưu trữ lệch khỏi ngày suy ra từ `start_date`.
    pub fn inconsistent_days(&self) -> Vec<&CycleDay> {
        self.days
            .iter()
            .filter(|day| self.expected_date(day.day_number) != Some(day.date))
            .collect()
    }
}

/// Một ngày trong chu kỳ.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CycleDay {
    #[serde(default)]
    pub id: Option<String>,
    pub day_number: u32,
    pub date: NaiveDate,
    /// Danh sách thuốc nhúng trực tiếp của phiên bản cũ.
    #[serde(default)]
    pub medications: Vec<LegacyMedication>,
    #[serde(default)]
    pub clinic_visit: Option<ClinicVisit>,
    #[serde(default)]
    pub follicle_sizes: Vec<f64>,
    #[serde(default)]
    pub bloodwork: Vec<BloodworkResult>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LegacyMedication {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub taken: bool,
    #[serde(default)]
    pub refrigerated: bool,
}

impl LegacyMedication {
    pub fn clock_time(&self) -> Option<ClockTime> {
        resolve_clock_time(None, None, None, self.time.as_deref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ClinicVisit {
    #[serde(rename = "type")]
    pub visit_type: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BloodworkResult {
    pub test: String,
    pub value: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub reference_range: Option<String>,
}

/// Kết quả chọc hút/chuyển phôi của chu kỳ.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CycleOutcome {
    pub eggs_retrieved: u32,
    pub mature_eggs: u32,
    pub fertilized: u32,
    pub blastocysts: u32,
    pub euploid_blastocysts: u32,
    pub embryos_transferred: u32,
    pub pregnancy_result: Option<PregnancyResult>,
    pub live_birth: bool,
}

/// Chi phí của chu kỳ, đơn vị tiền tệ theo hồ sơ người dùng.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct CycleCosts {
    pub medication: f64,
    pub monitoring: f64,
    pub retrieval: f64,
    pub transfer: f64,
    pub genetic_testing: f64,
    pub other: f64,
    pub insurance_coverage: f64,
}

impl CycleCosts {
    pub fn gross(&self) -> f64 {
        self.medication
            + self.monitoring
            + self.retrieval
            + self.transfer
            + self.genetic_testing
            + self.other
    }

    pub fn net(&self) -> f64 {
        self.gross() - self.insurance_coverage
    }
}

/// Một thuốc lặp lại trong khoảng ngày `[start_day, end_day]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledMedication {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub hour: Option<u8>,
    #[serde(default)]
    pub minute: Option<u8>,
    #[serde(default)]
    pub ampm: Option<Meridiem>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub refrigerated: bool,
    #[serde(default)]
    pub is_trigger: bool,
    pub start_day: u32,
    pub end_day: u32,
    #[serde(default)]
    pub notes: Option<String>,
}

impl ScheduledMedication {
    /// Khoảng bao gồm hai đầu; khoảng ngược (`start_day > end_day`) không khớp ngày nào.
    pub fn covers(&self, day_number: u32) -> bool {
        self.start_day <= day_number && day_number <= self.end_day
    }

    pub fn clock_time(&self) -> Option<ClockTime> {
        resolve_clock_time(self.hour, self.minute, self.ampm, self.time.as_deref())
    }
}

/// Lịch dùng thuốc của một chu kỳ.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MedicationSchedule {
    pub id: String,
    pub cycle_id: String,
    #[serde(default)]
    pub medications: Vec<ScheduledMedication>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Ghi đè trạng thái của một thuốc theo lịch trong một ngày.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MedicationStatusOverride {
    pub medication_id: String,
    #[serde(default)]
    pub taken: bool,
    #[serde(default)]
    pub skipped: bool,
    #[serde(default)]
    pub taken_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub actual_dosage: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl MedicationStatusOverride {
    pub fn pending(medication_id: impl Into<String>) -> Self {
        Self {
            medication_id: medication_id.into(),
            taken: false,
            skipped: false,
            taken_at: None,
            actual_dosage: None,
            notes: None,
        }
    }
}

/// Thuốc chỉ dùng một lần trong một ngày cụ thể.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DaySpecificMedication {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub hour: Option<u8>,
    #[serde(default)]
    pub minute: Option<u8>,
    #[serde(default)]
    pub ampm: Option<Meridiem>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub refrigerated: bool,
    #[serde(default)]
    pub taken: bool,
    #[serde(default)]
    pub skipped: bool,
    #[serde(default)]
    pub taken_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl DaySpecificMedication {
    pub fn clock_time(&self) -> Option<ClockTime> {
        resolve_clock_time(self.hour, self.minute, self.ampm, self.time.as_deref())
    }
}

/// Trạng thái thuốc của một cặp (chu kỳ, ngày). Chỉ được tạo khi có thao tác đầu tiên.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyMedicationStatus {
    pub id: String,
    pub cycle_id: String,
    pub day_number: u32,
    pub date: NaiveDate,
    #[serde(default)]
    pub medications: Vec<MedicationStatusOverride>,
    #[serde(default)]
    pub day_specific_medications: Vec<DaySpecificMedication>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DailyMedicationStatus {
    pub fn override_for(&self, medication_id: &str) -> Option<&MedicationStatusOverride> {
        self.medications
            .iter()
            .find(|entry| entry.medication_id == medication_id)
    }
}

/// Nguồn gốc của bản ghi thuốc dạng phẳng.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum MedicationKind {
    Scheduled,
    OneTime,
}

/// Bản ghi thuốc phẳng: mỗi lần dùng là một bản ghi.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub id: String,
    pub cycle_id: String,
    pub cycle_day: u32,
    pub name: String,
    #[serde(default)]
    pub dosage: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub refrigerated: bool,
    #[serde(rename = "type")]
    pub kind: MedicationKind,
    #[serde(default)]
    pub taken: bool,
    #[serde(default)]
    pub skipped: bool,
    #[serde(default)]
    pub taken_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl Medication {
    pub fn clock_time(&self) -> Option<ClockTime> {
        ClockTime::parse(&self.time)
    }
}

/// Thủ thuật độc lập với chu kỳ (IUI, nội soi tử cung...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProcedureRecord {
    pub id: String,
    pub procedure_type: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub clinic: Option<String>,
    #[serde(default)]
    pub cost: Option<f64>,
    #[serde(default)]
    pub insurance_coverage: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NaturalPregnancy {
    pub id: String,
    pub conception_date: NaiveDate,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct UserProfile {
    pub display_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub clinic: Option<String>,
    pub doctor: Option<String>,
    pub currency: Option<String>,
}

/// Toàn bộ dữ liệu của một người dùng, tương ứng một blob JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackerData {
    pub cycles: Vec<Cycle>,
    pub procedures: Vec<ProcedureRecord>,
    pub natural_pregnancies: Vec<NaturalPregnancy>,
    pub medication_schedules: Vec<MedicationSchedule>,
    pub daily_medication_statuses: Vec<DailyMedicationStatus>,
    pub medications: Vec<Medication>,
    pub user_profile: Option<UserProfile>,
}

impl TrackerData {
    /// Đọc blob JSON; thiếu trường nào thì coi như rỗng.
    pub fn from_json_str(data: &str) -> Result<Self, TrackerError> {
        if data.trim().is_empty() {
            return Err(TrackerError::MissingData);
        }
        serde_json::from_str(data).map_err(|err| TrackerError::Parse(err.to_string()))
    }

    pub fn cycle(&self, cycle_id: &str) -> Option<&Cycle> {
        self.cycles.iter().find(|cycle| cycle.id == cycle_id)
    }

    pub fn cycle_mut(&mut self, cycle_id: &str) -> Option<&mut Cycle> {
        self.cycles.iter_mut().find(|cycle| cycle.id == cycle_id)
    }

    pub fn schedule_for(&self, cycle_id: &str) -> Option<&MedicationSchedule> {
        self.medication_schedules
            .iter()
            .find(|schedule| schedule.cycle_id == cycle_id)
    }

    pub fn schedule_for_mut(&mut self, cycle_id: &str) -> Option<&mut MedicationSchedule> {
        self.medication_schedules
            .iter_mut()
            .find(|schedule| schedule.cycle_id == cycle_id)
    }

    pub fn day_status(&self, cycle_id: &str, day_number: u32) -> Option<&DailyMedicationStatus> {
        self.daily_medication_statuses
            .iter()
            .find(|status| status.cycle_id == cycle_id && status.day_number == day_number)
    }

    pub fn day_status_mut(
        &mut self,
        cycle_id: &str,
        day_number: u32,
    ) -> Option<&mut DailyMedicationStatus> {
        self.daily_medication_statuses
            .iter_mut()
            .find(|status| status.cycle_id == cycle_id && status.day_number == day_number)
    }
}
