//! Đọc giờ dùng thuốc ở cả dạng 12 giờ ("8:00 PM") lẫn 24 giờ ("20:00").

use std::fmt;

use serde::{Deserialize, Serialize};

/// Buổi sáng/chiều theo đồng hồ 12 giờ.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Meridiem {
    #[serde(rename = "AM", alias = "am")]
    Am,
    #[serde(rename = "PM", alias = "pm")]
    Pm,
}

/// Nhóm hiển thị trong ngày.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

/// Chính sách chia nhóm giờ.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BucketPolicy {
    TwoBuckets,
    ThreeBuckets,
}

/// Giờ:phút đã chuẩn hóa về dạng 24 giờ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClockTime {
    hour: u8,
    minute: u8,
}

impl ClockTime {
    /// Tạo từ giờ 24h, trả về `None` nếu vượt giới hạn.
    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    /// Ghép từ các trường rời rạc. Có `meridiem` thì giờ phải nằm trong 1..=12.
    pub fn from_parts(hour: u8, minute: u8, meridiem: Option<Meridiem>) -> Option<Self> {
        match meridiem {
            None => Self::new(hour, minute),
            Some(_) if !(1..=12).contains(&hour) => None,
            Some(Meridiem::Am) => Self::new(hour % 12, minute),
            Some(Meridiem::Pm) => Self::new(hour % 12 + 12, minute),
        }
    }

    /// Đọc chuỗi giờ tự do: "8:00 PM", "8pm", "07:30", "8 AM".
    pub fn parse(text: &str) -> Option<Self> {
        let normalized = text.trim().to_uppercase();
        if normalized.is_empty() {
            return None;
        }

        let (body, meridiem) = if let Some(rest) = normalized.strip_suffix("AM") {
            (rest.trim_end(), Some(Meridiem::Am))
        } else if let Some(rest) = normalized.strip_suffix("PM") {
            (rest.trim_end(), Some(Meridiem::Pm))
        } else {
            (normalized.as_str(), None)
        };

        let (hour_part, minute_part) = match body.split_once(':') {
            Some((hour, minute)) => (hour.trim(), minute.trim()),
            None => (body.trim(), "0"),
        };

        let hour = hour_part.parse::<u8>().ok()?;
        let minute = minute_part.parse::<u8>().ok()?;
        Self::from_parts(hour, minute, meridiem)
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    /// Số phút tính từ nửa đêm, dùng làm khóa sắp xếp.
    pub fn minutes(&self) -> u32 {
        u32::from(self.hour) * 60 + u32::from(self.minute)
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (display_hour, suffix) = match self.hour {
            0 => (12, "AM"),
            h @ 1..=11 => (h, "AM"),
            12 => (12, "PM"),
            h => (h - 12, "PM"),
        };
        write!(f, "{display_hour}:{:02} {suffix}", self.minute)
    }
}

/// Chọn giờ từ trường có cấu trúc trước, rồi mới tới chuỗi tự do.
pub(crate) fn resolve_clock_time(
    hour: Option<u8>,
    minute: Option<u8>,
    meridiem: Option<Meridiem>,
    text: Option<&str>,
) -> Option<ClockTime> {
    if let Some(hour) = hour {
        if let Some(parsed) = ClockTime::from_parts(hour, minute.unwrap_or(0), meridiem) {
            return Some(parsed);
        }
    }
    text.and_then(ClockTime::parse)
}
