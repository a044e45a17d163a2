//! Kiểu dữ liệu lõi cho nhật ký hành trình IVF: chu kỳ, thuốc, lịch dùng thuốc
//! và trạng thái theo ngày.

mod model;
mod time;

pub use model::*;
pub use time::{BucketPolicy, ClockTime, Meridiem, TimeOfDay};

use serde::{Deserialize, Serialize};

/// Số ngày tối đa của một chu kỳ; mọi vòng lặp theo ngày đều dừng ở đây.
pub const MAX_CYCLE_DAYS: u32 = 365;

/// Cấu hình hiển thị danh sách thuốc trong ngày.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TrackerConfig {
    /// Chia nhóm buổi sáng/tối (2 nhóm) hay sáng/chiều/tối (3 nhóm).
    pub bucket_policy: BucketPolicy,
    /// Mốc (phút tính từ nửa đêm) kết thúc buổi sáng.
    pub midday_minutes: u32,
    /// Mốc bắt đầu buổi tối, chỉ dùng với chính sách 3 nhóm.
    pub evening_minutes: u32,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            bucket_policy: BucketPolicy::TwoBuckets,
            midday_minutes: 12 * 60,
            evening_minutes: 17 * 60,
        }
    }
}

impl TrackerConfig {
    /// Xếp một mốc giờ (phút từ nửa đêm) vào nhóm hiển thị.
    pub fn bucket_for(&self, minutes: u32) -> TimeOfDay {
        if minutes < self.midday_minutes {
            return TimeOfDay::Morning;
        }
        match self.bucket_policy {
            BucketPolicy::TwoBuckets => TimeOfDay::Evening,
            BucketPolicy::ThreeBuckets if minutes < self.evening_minutes => TimeOfDay::Afternoon,
            BucketPolicy::ThreeBuckets => TimeOfDay::Evening,
        }
    }

    /// Các nhóm theo thứ tự hiển thị của chính sách hiện tại.
    pub fn buckets(&self) -> &'static [TimeOfDay] {
        match self.bucket_policy {
            BucketPolicy::TwoBuckets => &[TimeOfDay::Morning, TimeOfDay::Evening],
            BucketPolicy::ThreeBuckets => {
                &[TimeOfDay::Morning, TimeOfDay::Afternoon, TimeOfDay::Evening]
            }
        }
    }
}

/// Lỗi chung khi đọc dữ liệu hành trình.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("Dữ liệu đầu vào thiếu thông tin tối thiểu")]
    MissingData,
    #[error("Không đọc được dữ liệu: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_bucket_policy_splits_at_noon() {
        let config = TrackerConfig::default();
        assert_eq!(config.bucket_for(0), TimeOfDay::Morning);
        assert_eq!(config.bucket_for(11 * 60 + 59), TimeOfDay::Morning);
        assert_eq!(config.bucket_for(12 * 60), TimeOfDay::Evening);
        assert_eq!(config.bucket_for(15 * 60), TimeOfDay::Evening);
    }

    #[test]
    fn three_bucket_policy_has_afternoon() {
        let config = TrackerConfig {
            bucket_policy: BucketPolicy::ThreeBuckets,
            ..TrackerConfig::default()
        };
        assert_eq!(config.bucket_for(9 * 60), TimeOfDay::Morning);
        assert_eq!(config.bucket_for(12 * 60), TimeOfDay::Afternoon);
        assert_eq!(config.bucket_for(16 * 60 + 59), TimeOfDay::Afternoon);
        assert_eq!(config.bucket_for(17 * 60), TimeOfDay::Evening);
        assert_eq!(config.buckets().len(), 3);
    }

    #[test]
    fn config_deserializes_with_camel_case() {
        let config: TrackerConfig = serde_json::from_str(
            r#"{"bucketPolicy":"three_buckets","middayMinutes":660,"eveningMinutes":1080}"#,
        )
        .expect("config hợp lệ");
        assert_eq!(config.bucket_policy, BucketPolicy::ThreeBuckets);
        assert_eq!(config.bucket_for(700), TimeOfDay::Afternoon);
    }
}
