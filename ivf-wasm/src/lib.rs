//! Bridge WASM <-> JavaScript: JS giữ blob trong localStorage, Rust tính toán trên snapshot.

use chrono::{NaiveDate, Utc};
use ivf_core::{BucketPolicy, TrackerConfig, TrackerData};
use ivf_meds::{DoseTarget, MutationError, StatusAction};
use serde::Deserialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsTrackerConfig {
    #[serde(default)]
    bucket_policy: Option<BucketPolicy>,
    #[serde(default)]
    midday_minutes: Option<u32>,
    #[serde(default)]
    evening_minutes: Option<u32>,
}

impl From<JsTrackerConfig> for TrackerConfig {
    fn from(cfg: JsTrackerConfig) -> Self {
        let mut base = TrackerConfig::default();
        if let Some(policy) = cfg.bucket_policy {
            base.bucket_policy = policy;
        }
        if let Some(minutes) = cfg.midday_minutes {
            base.midday_minutes = minutes;
        }
        if let Some(minutes) = cfg.evening_minutes {
            base.evening_minutes = minutes;
        }
        base
    }
}

/// Danh sách thuốc hợp nhất của một ngày.
#[wasm_bindgen(js_name = reconcileDay)]
pub fn reconcile_day(
    snapshot: JsValue,
    cycle_id: String,
    day_number: u32,
    date: String,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    init();
    let data = read_snapshot(snapshot)?;
    let date = parse_date(&date)?;
    let cfg = read_config(config)?;

    let day = ivf_meds::reconcile_day(&data, &cycle_id, day_number, date, &cfg);
    to_value(&day).map_err(|err| JsValue::from_str(&format!("Không serialize ngày: {err}")))
}

/// Áp dụng thao tác (đã uống / bỏ qua / đặt lại...) và trả về snapshot mới để JS lưu.
#[wasm_bindgen(js_name = applyStatusAction)]
pub fn apply_status_action(
    snapshot: JsValue,
    target: JsValue,
    action: JsValue,
) -> Result<JsValue, JsValue> {
    init();
    let mut data = read_snapshot(snapshot)?;
    let target: DoseTarget = from_value(target)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được target: {err}")))?;
    let action: StatusAction = from_value(action)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được action: {err}")))?;

    ivf_meds::apply_status_action(&mut data, &target, &action, Utc::now())
        .map_err(format_mutation_error)?;
    write_snapshot(&data)
}

/// Tạo bản ghi trạng thái rỗng cho ngày nếu chưa có.
#[wasm_bindgen(js_name = ensureDayStatus)]
pub fn ensure_day_status(
    snapshot: JsValue,
    cycle_id: String,
    day_number: u32,
    date: String,
) -> Result<JsValue, JsValue> {
    init();
    let mut data = read_snapshot(snapshot)?;
    let date = parse_date(&date)?;
    ivf_meds::ensure_day_status(&mut data, &cycle_id, day_number, date, Utc::now())
        .map_err(format_mutation_error)?;
    write_snapshot(&data)
}

#[wasm_bindgen(js_name = summarizeJourney)]
pub fn summarize_journey(snapshot: JsValue) -> Result<JsValue, JsValue> {
    init();
    let data = read_snapshot(snapshot)?;
    to_value(&ivf_meds::summarize(&data))
        .map_err(|err| JsValue::from_str(&format!("Không serialize tổng hợp: {err}")))
}

#[wasm_bindgen(js_name = compareCycles)]
pub fn compare_cycles(snapshot: JsValue) -> Result<JsValue, JsValue> {
    init();
    let data = read_snapshot(snapshot)?;
    to_value(&ivf_meds::compare_cycles(&data))
        .map_err(|err| JsValue::from_str(&format!("Không serialize so sánh: {err}")))
}

fn init() {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();
}

fn read_snapshot(snapshot: JsValue) -> Result<TrackerData, JsValue> {
    from_value(snapshot)
        .map_err(|err| JsValue::from_str(&format!("Không đọc được dữ liệu: {err}")))
}

fn write_snapshot(data: &TrackerData) -> Result<JsValue, JsValue> {
    to_value(data).map_err(|err| JsValue::from_str(&format!("Không serialize dữ liệu: {err}")))
}

fn read_config(config: Option<JsValue>) -> Result<TrackerConfig, JsValue> {
    match config {
        Some(js_cfg) if !js_cfg.is_undefined() && !js_cfg.is_null() => {
            let cfg: JsTrackerConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("Không đọc được config: {err}")))?;
            Ok(TrackerConfig::from(cfg))
        }
        _ => Ok(TrackerConfig::default()),
    }
}

fn parse_date(date: &str) -> Result<NaiveDate, JsValue> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|err| JsValue::from_str(&format!("Ngày không hợp lệ {date}: {err}")))
}

fn format_mutation_error(err: MutationError) -> JsValue {
    JsValue::from_str(&format!("Medication error: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg: JsTrackerConfig =
            serde_json::from_str(r#"{"bucketPolicy":"three_buckets"}"#).expect("config");
        let merged = TrackerConfig::from(cfg);
        assert_eq!(merged.bucket_policy, BucketPolicy::ThreeBuckets);
        assert_eq!(merged.midday_minutes, TrackerConfig::default().midday_minutes);
        assert_eq!(merged.evening_minutes, TrackerConfig::default().evening_minutes);
    }
}
