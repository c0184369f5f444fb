//! 时间类型模块
//!
//! - `Timestamp`: 请求时间戳，兼容服务端的多种时间格式
//! - `MonthKey`: 按月聚合统计时使用的 (年, 月) 键

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

// =========================================================
// Timestamp
// =========================================================

/// UTC 时间戳
///
/// 序列化为 RFC 3339 字符串；反序列化时额外接受
/// `YYYY-MM-DD HH:MM:SS`、`YYYY-MM-DD` 以及毫秒整数。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    #[inline]
    pub fn new(inner: DateTime<Utc>) -> Self {
        Self(inner)
    }

    #[inline]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    pub fn from_millis(ms: i64) -> Option<Self> {
        Utc.timestamp_millis_opt(ms).single().map(Self)
    }

    /// 解析服务端返回的时间字符串
    ///
    /// 返回 None 如果所有格式都无法匹配
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Some(Self(dt.with_timezone(&Utc)));
        }
        for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(Self(Utc.from_utc_datetime(&naive)));
            }
        }
        if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
            return date.and_hms_opt(0, 0, 0).map(|naive| Self(Utc.from_utc_datetime(&naive)));
        }
        s.parse::<i64>().ok().and_then(Self::from_millis)
    }

    pub fn month_key(&self) -> MonthKey {
        MonthKey {
            year: self.0.year(),
            month: self.0.month(),
        }
    }

    /// 表格展示格式：`dd/mm/yyyy`
    pub fn display_date(&self) -> String {
        self.0.format("%d/%m/%Y").to_string()
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(inner: DateTime<Utc>) -> Self {
        Self(inner)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Millis(i64),
            Text(String),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Millis(ms) => Timestamp::from_millis(ms),
            Repr::Text(text) => Timestamp::parse(&text),
        }
        .ok_or_else(|| serde::de::Error::custom("unrecognized timestamp"))
    }
}

// =========================================================
// MonthKey
// =========================================================

/// 月份键，`month` 取值 1..=12
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    pub year: i32,
    pub month: u32,
}

/// 图表横轴使用的月份缩写
pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "Mei", "Jun", "Jul", "Agu", "Sep", "Okt", "Nov", "Des",
];

impl MonthKey {
    pub fn label(&self) -> &'static str {
        MONTH_LABELS[(self.month.clamp(1, 12) - 1) as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_formats() {
        let rfc = Timestamp::parse("2024-03-05T10:00:00Z").unwrap();
        let mysql = Timestamp::parse("2024-03-05 10:00:00").unwrap();
        assert_eq!(rfc, mysql);
        assert_eq!(rfc.month_key(), MonthKey { year: 2024, month: 3 });

        let date_only = Timestamp::parse("2024-12-31").unwrap();
        assert_eq!(date_only.display_date(), "31/12/2024");
        assert!(Timestamp::parse("kemarin").is_none());
    }

    #[test]
    fn test_deserialize_millis_and_text() {
        let a: Timestamp = serde_json::from_str("1709632800000").unwrap();
        let b: Timestamp = serde_json::from_str("\"2024-03-05T10:00:00+00:00\"").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_month_label() {
        assert_eq!(MonthKey { year: 2024, month: 5 }.label(), "Mei");
    }
}
