//! 타임스탬프 형식 힌트와 변환
//!
//! 스키마의 타임스탬프 필드는 [`TimeFormat`]으로 원본 표현을 선언합니다.
//! 모든 결과는 UTC로 정규화됩니다.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::Value;

use super::coerce::{integral_f64, to_integer};

/// 타임스탬프 원본 표현 형식
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeFormat {
    /// RFC 3339 / ISO 8601 문자열 (`2021-01-01T00:00:00Z`)
    Rfc3339,
    /// Unix epoch 초 (정수 또는 소수, 숫자 또는 숫자 문자열)
    UnixSeconds,
    /// Unix epoch 밀리초
    UnixMillis,
    /// Unix epoch 나노초
    UnixNanos,
    /// strftime 레이아웃. 존(zone)이 없는 레이아웃은 UTC로 해석합니다.
    Strftime(String),
}

impl TimeFormat {
    /// strftime 레이아웃 형식을 생성합니다.
    pub fn strftime(layout: impl Into<String>) -> Self {
        Self::Strftime(layout.into())
    }

    /// JSON 값을 UTC 시각으로 변환합니다. 변환할 수 없으면 `None`.
    pub fn parse_value(&self, value: &Value) -> Option<DateTime<Utc>> {
        match value {
            Value::String(s) => self.parse_str(s),
            Value::Number(n) => match self {
                Self::UnixSeconds => n.as_f64().and_then(from_unix_seconds),
                Self::UnixMillis => to_integer(value).and_then(DateTime::from_timestamp_millis),
                Self::UnixNanos => to_integer(value).map(DateTime::from_timestamp_nanos),
                Self::Rfc3339 | Self::Strftime(_) => None,
            },
            _ => None,
        }
    }

    /// 문자열을 UTC 시각으로 변환합니다.
    pub fn parse_str(&self, s: &str) -> Option<DateTime<Utc>> {
        let s = s.trim();
        match self {
            Self::Rfc3339 => DateTime::parse_from_rfc3339(s)
                .ok()
                .map(|dt| dt.with_timezone(&Utc)),
            Self::UnixSeconds => s.parse::<f64>().ok().and_then(from_unix_seconds),
            Self::UnixMillis => parse_whole(s).and_then(DateTime::from_timestamp_millis),
            Self::UnixNanos => parse_whole(s).map(DateTime::from_timestamp_nanos),
            Self::Strftime(layout) => parse_with_layout(s, layout),
        }
    }
}

impl fmt::Display for TimeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rfc3339 => f.write_str("rfc3339"),
            Self::UnixSeconds => f.write_str("unix"),
            Self::UnixMillis => f.write_str("unix_ms"),
            Self::UnixNanos => f.write_str("unix_ns"),
            Self::Strftime(layout) => write!(f, "strftime:{layout}"),
        }
    }
}

fn from_unix_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = ((secs - whole) * 1e9).round() as u32;
    // 반올림으로 1초가 된 경우
    let (whole, nanos) = if nanos >= 1_000_000_000 {
        (whole + 1.0, 0)
    } else {
        (whole, nanos)
    };
    if whole < i64::MIN as f64 || whole > i64::MAX as f64 {
        return None;
    }
    DateTime::from_timestamp(whole as i64, nanos)
}

fn parse_with_layout(s: &str, layout: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_str(s, layout) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, layout) {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(s, layout)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// 정수 문자열, 또는 소수부가 0인 실수 문자열 (`"1609459200000.0"`)
fn parse_whole(s: &str) -> Option<i64> {
    s.parse::<i64>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().and_then(integral_f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn rfc3339_with_offset_is_converted_to_utc() {
        let ts = TimeFormat::Rfc3339
            .parse_str("2021-01-01T09:00:00+09:00")
            .unwrap();
        assert_eq!(ts, utc(2021, 1, 1, 0, 0, 0));
    }

    #[test]
    fn rfc3339_rejects_numbers() {
        assert!(TimeFormat::Rfc3339.parse_value(&json!(1609459200)).is_none());
    }

    #[test]
    fn unix_seconds_fractional() {
        let ts = TimeFormat::UnixSeconds
            .parse_value(&json!(1609459200.25))
            .unwrap();
        assert_eq!(ts.timestamp(), 1_609_459_200);
        assert_eq!(ts.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn unix_seconds_from_string() {
        let ts = TimeFormat::UnixSeconds.parse_str("1609459200").unwrap();
        assert_eq!(ts, utc(2021, 1, 1, 0, 0, 0));
    }

    #[test]
    fn unix_millis_and_nanos() {
        assert_eq!(
            TimeFormat::UnixMillis
                .parse_value(&json!(1609459200000_i64))
                .unwrap(),
            utc(2021, 1, 1, 0, 0, 0)
        );
        assert_eq!(
            TimeFormat::UnixNanos
                .parse_str("1609459200000000000")
                .unwrap(),
            utc(2021, 1, 1, 0, 0, 0)
        );
    }

    #[test]
    fn unix_millis_accepts_whole_floats() {
        let expected = utc(2021, 1, 1, 0, 0, 0);
        assert_eq!(
            TimeFormat::UnixMillis.parse_value(&json!(1609459200000.0)),
            Some(expected)
        );
        assert_eq!(
            TimeFormat::UnixMillis.parse_str("1609459200000.0"),
            Some(expected)
        );
        assert_eq!(TimeFormat::UnixMillis.parse_value(&json!(1609459200000.5)), None);
    }

    #[test]
    fn strftime_without_zone_is_utc() {
        let fmt = TimeFormat::strftime("%Y-%m-%d %H:%M:%S");
        assert_eq!(
            fmt.parse_str("2021-01-01 12:30:00").unwrap(),
            utc(2021, 1, 1, 12, 30, 0)
        );
    }

    #[test]
    fn strftime_date_only() {
        let fmt = TimeFormat::strftime("%Y-%m-%d");
        assert_eq!(fmt.parse_str("2019-05-10").unwrap(), utc(2019, 5, 10, 0, 0, 0));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(TimeFormat::Rfc3339.parse_str("yesterday").is_none());
        assert!(TimeFormat::UnixSeconds.parse_str("NaN").is_none());
        assert!(TimeFormat::UnixSeconds.parse_value(&json!(true)).is_none());
    }
}
