// Copyright (c) 2025-2026 Odalite Contributors.
// SPDX-License-Identifier: Apache-2.0
//
//! Constant values carried by expressions and their literal renderings
//!
//! Temporal values accept three shapes: a pre-formatted literal string, a
//! structured field record, or a native chrono value (decomposed first).
//! Missing structured fields uniformly default to 0.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, Timelike};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CompileError, CompileResult};

/// A constant value recorded into a trace or expression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    /// Pre-serialized text emitted verbatim, bypassing schema-based rendering
    Raw(String),
    Binary(Vec<u8>),
    Guid(Uuid),
    Date(DateValue),
    TimeOfDay(TimeValue),
    DateTimeOffset(DateTimeValue),
    Duration(DurationValue),
    Enum(EnumValue),
    List(Vec<Value>),
}

impl Value {
    /// Coarse kind tag used for warn-once bookkeeping and diagnostics
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Raw(_) => "raw",
            Value::Binary(_) => "binary",
            Value::Guid(_) => "guid",
            Value::Date(_) => "date",
            Value::TimeOfDay(_) => "time-of-day",
            Value::DateTimeOffset(_) => "date-time-offset",
            Value::Duration(_) => "duration",
            Value::Enum(_) => "enum",
            Value::List(_) => "list",
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Uuid> for Value {
    fn from(v: Uuid) -> Self {
        Value::Guid(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(DateValue::Native(v))
    }
}

impl From<NaiveTime> for Value {
    fn from(v: NaiveTime) -> Self {
        Value::TimeOfDay(TimeValue::Native(v))
    }
}

impl From<DateTime<FixedOffset>> for Value {
    fn from(v: DateTime<FixedOffset>) -> Self {
        Value::DateTimeOffset(DateTimeValue::Native(v))
    }
}

impl From<chrono::Duration> for Value {
    fn from(v: chrono::Duration) -> Self {
        Value::Duration(DurationValue::Millis(v.num_milliseconds()))
    }
}

/// Structured date record; missing fields default to 0 and fail validation
/// at render time (month/day 0 are not a date)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateParts {
    #[serde(default)]
    pub year: i64,
    #[serde(default)]
    pub month: i64,
    #[serde(default)]
    pub day: i64,
}

/// Structured time-of-day record; missing fields default to 0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimeParts {
    #[serde(default)]
    pub hour: i64,
    #[serde(default)]
    pub minute: i64,
    #[serde(default)]
    pub second: i64,
    #[serde(default)]
    pub millisecond: i64,
}

/// Structured date-time-offset record; missing fields default to 0 (UTC)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateTimeParts {
    #[serde(default)]
    pub date: DateParts,
    #[serde(default)]
    pub time: TimeParts,
    #[serde(default)]
    pub offset_minutes: i64,
}

/// Structured duration record; missing fields default to 0. All present
/// fields must share a sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DurationParts {
    #[serde(default)]
    pub days: i64,
    #[serde(default)]
    pub hours: i64,
    #[serde(default)]
    pub minutes: i64,
    #[serde(default)]
    pub seconds: i64,
    #[serde(default)]
    pub milliseconds: i64,
}

impl DurationParts {
    /// Decompose a millisecond magnitude by successive integer division.
    /// The sign is preserved across all fields.
    pub fn from_millis(total: i64) -> Self {
        let sign = if total < 0 { -1 } else { 1 };
        let mut rest = total.abs();
        let milliseconds = rest % 1000;
        rest /= 1000;
        let seconds = rest % 60;
        rest /= 60;
        let minutes = rest % 60;
        rest /= 60;
        let hours = rest % 24;
        rest /= 24;
        let days = rest;
        Self {
            days: sign * days,
            hours: sign * hours,
            minutes: sign * minutes,
            seconds: sign * seconds,
            milliseconds: sign * milliseconds,
        }
    }

    /// Negative iff any field is negative; rejects mixed-sign records
    fn is_negative(&self) -> CompileResult<bool> {
        let fields = [
            self.days,
            self.hours,
            self.minutes,
            self.seconds,
            self.milliseconds,
        ];
        let has_negative = fields.iter().any(|f| *f < 0);
        let has_positive = fields.iter().any(|f| *f > 0);
        if has_negative && has_positive {
            return Err(CompileError::InvalidStructuredValue(format!(
                "duration fields must share a sign, got {:?}",
                self
            )));
        }
        Ok(has_negative)
    }

    /// Fixed-component ISO 8601 duration body, e.g. `P2DT3H4M5.006S`.
    /// Fractional seconds render as 3-digit milliseconds and are omitted
    /// when zero.
    pub fn render(&self) -> CompileResult<String> {
        let negative = self.is_negative()?;
        let (d, h, m, s, ms) = (
            self.days.abs(),
            self.hours.abs(),
            self.minutes.abs(),
            self.seconds.abs(),
            self.milliseconds.abs(),
        );
        let seconds = if ms > 0 {
            format!("{}.{:03}S", s, ms)
        } else {
            format!("{}S", s)
        };
        Ok(format!(
            "{}P{}DT{}H{}M{}",
            if negative { "-" } else { "" },
            d,
            h,
            m,
            seconds
        ))
    }
}

/// A date constant: pre-formatted, structured, or native
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DateValue {
    Formatted(String),
    Parts(DateParts),
    Native(NaiveDate),
}

static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

impl DateValue {
    /// `yyyy-MM-dd` with a 4-digit zero-padded year
    pub fn render(&self) -> CompileResult<String> {
        match self {
            DateValue::Formatted(s) => {
                if DATE_RE.is_match(s) {
                    Ok(s.clone())
                } else {
                    Err(CompileError::InvalidStructuredValue(format!(
                        "'{}' is not a yyyy-MM-dd date literal",
                        s
                    )))
                }
            }
            DateValue::Parts(p) => {
                if p.year < 0 || p.month < 0 || p.day < 0 {
                    return Err(CompileError::InvalidStructuredValue(format!(
                        "date fields must be non-negative, got {:?}",
                        p
                    )));
                }
                Ok(format!("{:04}-{:02}-{:02}", p.year, p.month, p.day))
            }
            DateValue::Native(d) => Ok(format!(
                "{:04}-{:02}-{:02}",
                d.year(),
                d.month(),
                d.day()
            )),
        }
    }
}

/// A time-of-day constant: pre-formatted, structured, or native
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TimeValue {
    Formatted(String),
    Parts(TimeParts),
    Native(NaiveTime),
}

static TIME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}:\d{2}(:\d{2}(\.\d{1,3})?)?$").unwrap());

impl TimeValue {
    /// `HH:mm:ss` with 3-digit milliseconds when non-zero
    pub fn render(&self) -> CompileResult<String> {
        match self {
            TimeValue::Formatted(s) => {
                if TIME_RE.is_match(s) {
                    Ok(s.clone())
                } else {
                    Err(CompileError::InvalidStructuredValue(format!(
                        "'{}' is not an HH:mm:ss time literal",
                        s
                    )))
                }
            }
            TimeValue::Parts(p) => render_time_parts(p),
            TimeValue::Native(t) => render_time_parts(&TimeParts {
                hour: i64::from(t.hour()),
                minute: i64::from(t.minute()),
                second: i64::from(t.second()),
                millisecond: i64::from(t.nanosecond() / 1_000_000),
            }),
        }
    }
}

fn render_time_parts(p: &TimeParts) -> CompileResult<String> {
    if p.hour < 0 || p.minute < 0 || p.second < 0 || p.millisecond < 0 {
        return Err(CompileError::InvalidStructuredValue(format!(
            "time fields must be non-negative, got {:?}",
            p
        )));
    }
    let base = format!("{:02}:{:02}:{:02}", p.hour, p.minute, p.second);
    if p.millisecond > 0 {
        Ok(format!("{}.{:03}", base, p.millisecond))
    } else {
        Ok(base)
    }
}

/// A date-time-offset constant: pre-formatted, structured, or native
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DateTimeValue {
    Formatted(String),
    Parts(DateTimeParts),
    Native(DateTime<FixedOffset>),
}

static DATE_TIME_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}(:\d{2}(\.\d{1,3})?)?(Z|[+-]\d{2}:\d{2})$").unwrap()
});

impl DateTimeValue {
    /// `yyyy-MM-ddTHH:mm:ss` plus `Z` or a `+HH:MM`/`-HH:MM` offset
    pub fn render(&self) -> CompileResult<String> {
        match self {
            DateTimeValue::Formatted(s) => {
                if DATE_TIME_RE.is_match(s) {
                    Ok(s.clone())
                } else {
                    Err(CompileError::InvalidStructuredValue(format!(
                        "'{}' is not a date-time-offset literal",
                        s
                    )))
                }
            }
            DateTimeValue::Parts(p) => {
                let date = DateValue::Parts(p.date).render()?;
                let time = render_time_parts(&p.time)?;
                Ok(format!("{}T{}{}", date, time, render_offset(p.offset_minutes)))
            }
            DateTimeValue::Native(dt) => {
                let date = DateValue::Native(dt.date_naive()).render()?;
                let time = TimeValue::Native(dt.time()).render()?;
                let offset_minutes = i64::from(dt.offset().local_minus_utc()) / 60;
                Ok(format!("{}T{}{}", date, time, render_offset(offset_minutes)))
            }
        }
    }
}

fn render_offset(offset_minutes: i64) -> String {
    if offset_minutes == 0 {
        return "Z".to_string();
    }
    let sign = if offset_minutes < 0 { '-' } else { '+' };
    let abs = offset_minutes.abs();
    format!("{}{:02}:{:02}", sign, abs / 60, abs % 60)
}

/// A duration constant: pre-formatted, structured, or a millisecond magnitude
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DurationValue {
    Formatted(String),
    Parts(DurationParts),
    Millis(i64),
}

static DURATION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?P(\d+D)?(T(\d+H)?(\d+M)?(\d+(\.\d{1,3})?S)?)?$").unwrap());

impl DurationValue {
    /// ISO 8601 duration body without the `duration'...'` wrapper
    pub fn render(&self) -> CompileResult<String> {
        match self {
            DurationValue::Formatted(s) => {
                if DURATION_RE.is_match(s) {
                    Ok(s.clone())
                } else {
                    Err(CompileError::InvalidStructuredValue(format!(
                        "'{}' is not an ISO 8601 duration literal",
                        s
                    )))
                }
            }
            DurationValue::Parts(p) => p.render(),
            DurationValue::Millis(ms) => DurationParts::from_millis(*ms).render(),
        }
    }
}

/// An enum constant: a member name, or a numeric value reverse-looked-up
/// against the declared enum type at render time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EnumValue {
    Member(String),
    Numeric(i64),
}

const BASE64_ALPHABET: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Base64 rendering for `binary'...'` literals. Small enough to keep inline;
/// none of the stack's crates cover it.
pub fn base64_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(3) * 4);
    for chunk in bytes.chunks(3) {
        let b0 = chunk[0] as u32;
        let b1 = chunk.get(1).copied().unwrap_or(0) as u32;
        let b2 = chunk.get(2).copied().unwrap_or(0) as u32;
        let triple = (b0 << 16) | (b1 << 8) | b2;
        out.push(BASE64_ALPHABET[(triple >> 18) as usize & 0x3f] as char);
        out.push(BASE64_ALPHABET[(triple >> 12) as usize & 0x3f] as char);
        out.push(if chunk.len() > 1 {
            BASE64_ALPHABET[(triple >> 6) as usize & 0x3f] as char
        } else {
            '='
        });
        out.push(if chunk.len() > 2 {
            BASE64_ALPHABET[triple as usize & 0x3f] as char
        } else {
            '='
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_parts_render() {
        let parts = DurationParts {
            days: 2,
            hours: 3,
            minutes: 4,
            seconds: 5,
            milliseconds: 6,
        };
        assert_eq!(parts.render().unwrap(), "P2DT3H4M5.006S");
    }

    #[test]
    fn test_duration_millis_decomposition_matches_parts() {
        let millis = 2 * 86_400_000 + 3 * 3_600_000 + 4 * 60_000 + 5_000 + 6;
        assert_eq!(
            DurationValue::Millis(millis).render().unwrap(),
            "P2DT3H4M5.006S"
        );
    }

    #[test]
    fn test_negative_millis_preserves_sign_across_fields() {
        let parts = DurationParts::from_millis(-90_061_001);
        assert_eq!(parts.days, -1);
        assert_eq!(parts.hours, -1);
        assert_eq!(parts.minutes, -1);
        assert_eq!(parts.seconds, -1);
        assert_eq!(parts.milliseconds, -1);
        assert_eq!(parts.render().unwrap(), "-P1DT1H1M1.001S");
    }

    #[test]
    fn test_mixed_sign_duration_rejected() {
        let parts = DurationParts {
            days: 1,
            hours: -2,
            ..Default::default()
        };
        assert!(matches!(
            parts.render(),
            Err(CompileError::InvalidStructuredValue(_))
        ));
    }

    #[test]
    fn test_missing_structured_fields_default_to_zero() {
        let parts: DurationParts = serde_json::from_str(r#"{"days": 1}"#).unwrap();
        assert_eq!(parts.hours, 0);
        assert_eq!(parts.render().unwrap(), "P1DT0H0M0S");

        let time: TimeParts = serde_json::from_str(r#"{"hour": 9}"#).unwrap();
        assert_eq!(render_time_parts(&time).unwrap(), "09:00:00");
    }

    #[test]
    fn test_time_renders_zero_padded_with_millis() {
        let parts = TimeParts {
            hour: 7,
            minute: 8,
            second: 9,
            millisecond: 12,
        };
        assert_eq!(render_time_parts(&parts).unwrap(), "07:08:09.012");
    }

    #[test]
    fn test_date_time_offset_rendering() {
        let parts = DateTimeParts {
            date: DateParts {
                year: 2024,
                month: 3,
                day: 5,
            },
            time: TimeParts {
                hour: 6,
                minute: 7,
                second: 8,
                millisecond: 0,
            },
            offset_minutes: -150,
        };
        assert_eq!(
            DateTimeValue::Parts(parts).render().unwrap(),
            "2024-03-05T06:07:08-02:30"
        );
    }

    #[test]
    fn test_formatted_literals_are_validated() {
        assert!(DateValue::Formatted("2024-01-02".to_string()).render().is_ok());
        assert!(DateValue::Formatted("tomorrow".to_string()).render().is_err());
        assert!(DurationValue::Formatted("P1DT2H".to_string()).render().is_ok());
        assert!(DurationValue::Formatted("1 day".to_string()).render().is_err());
    }

    #[test]
    fn test_base64_encode() {
        assert_eq!(base64_encode(b""), "");
        assert_eq!(base64_encode(b"f"), "Zg==");
        assert_eq!(base64_encode(b"fo"), "Zm8=");
        assert_eq!(base64_encode(b"foo"), "Zm9v");
        assert_eq!(base64_encode(b"foobar"), "Zm9vYmFy");
    }
}
