//! Fixed-width ASCII field primitives.
//!
//! Every value in the 256-byte prelude and the per-signal arrays occupies an
//! exact byte width: left-justified and space-padded on write, trimmed on
//! read. Numeric parsing/formatting is locale-independent (`.` decimal
//! separator, no digit grouping) everywhere in this module.

use chrono::{Datelike, NaiveDate, NaiveTime};

use crate::error::EdfError;

/// Pads `value` on the right with ASCII spaces up to `width` bytes,
/// truncating if it is already longer. Truncation here is defensive only:
/// callers are expected to truncate on assignment (see `SignalAttributes`
/// setters and `FileHeader` string setters) so that by the time a field
/// reaches `pad_ascii` it already fits.
pub(crate) fn pad_ascii(value: &str, width: usize) -> String {
    if value.len() >= width {
        value[..width].to_string()
    } else {
        let mut padded = String::with_capacity(width);
        padded.push_str(value);
        padded.extend(std::iter::repeat_n(' ', width - value.len()));
        padded
    }
}

/// Truncates `value` to at most `width` bytes, used by setters that accept
/// arbitrary ASCII strings for fixed-width fields (label, transducer, ...).
pub fn truncate_ascii(value: &str, width: usize) -> String {
    if value.len() > width {
        value[..width].to_string()
    } else {
        value.to_string()
    }
}

pub fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| matches!(b, 0x20..=0x7E))
}

pub(crate) fn format_integer(
    value: i64,
    width: usize,
    field: &'static str,
) -> Result<String, EdfError> {
    let text = value.to_string();
    if text.len() > width {
        return Err(EdfError::format(
            field,
            0,
            format!("integer {value} does not fit in {width} bytes"),
        ));
    }
    Ok(pad_ascii(&text, width))
}

pub(crate) fn parse_integer(raw: &str, field: &'static str, offset: u64) -> Result<i64, EdfError> {
    let trimmed = raw.trim();
    trimmed
        .parse::<i64>()
        .map_err(|e| EdfError::format(field, offset, e.to_string()))
}

/// Formats a float with `.` as the decimal separator, no digit grouping,
/// capped at 8 fractional digits, trimming trailing zeros the way a
/// plain `{}` formatting of an `f64` already does.
pub(crate) fn format_float(
    value: f64,
    width: usize,
    field: &'static str,
) -> Result<String, EdfError> {
    let mut text = format!("{value}");
    if let Some(dot) = text.find('.') {
        let frac_len = text.len() - dot - 1;
        if frac_len > 8 {
            text = format!("{value:.8}");
        }
    }
    if text.len() > width {
        // Fall back to fewer fractional digits before giving up.
        for precision in (0..8).rev() {
            let candidate = format!("{value:.precision$}");
            if candidate.len() <= width {
                text = candidate;
                break;
            }
        }
    }
    if text.len() > width {
        return Err(EdfError::format(
            field,
            0,
            format!("float {value} does not fit in {width} bytes"),
        ));
    }
    Ok(pad_ascii(&text, width))
}

pub(crate) fn parse_float(raw: &str, field: &'static str, offset: u64) -> Result<f64, EdfError> {
    let trimmed = raw.trim();
    trimmed
        .parse::<f64>()
        .map_err(|e| EdfError::format(field, offset, e.to_string()))
}

/// `dd.MM.yy` + `HH.mm.ss` date-time pair, each half occupying 8 bytes.
/// Supports an opt-in alternate `MM.dd.yy` parsing mode for legacy corpora,
/// toggled per-field and defaulting off.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct DateTimeField {
    pub alternate_date_order: bool,
}

impl DateTimeField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_alternate_date_order(mut self, alternate: bool) -> Self {
        self.alternate_date_order = alternate;
        self
    }

    /// Formats the 2-digit-year date field. Years before 1985 or at/after
    /// 2085 cannot be represented in two digits and are written as the
    /// sentinel `"yy"`, mirroring the common real-world convention for this
    /// legacy field (the unambiguous start date lives in the
    /// `RecordingId`/`PatientId` subfields instead).
    pub fn format_date(&self, date: NaiveDate) -> String {
        let year = if date.year() >= 2085 || date.year() < 1985 {
            "yy".to_string()
        } else {
            format!("{:02}", date.year() % 100)
        };
        if self.alternate_date_order {
            format!("{:02}.{:02}.{}", date.month(), date.day(), year)
        } else {
            format!("{:02}.{:02}.{}", date.day(), date.month(), year)
        }
    }

    pub fn parse_date(&self, raw: &str, offset: u64) -> Result<NaiveDate, EdfError> {
        let parts: Vec<&str> = raw.trim().split('.').collect();
        if parts.len() != 3 {
            return Err(EdfError::format(
                "start_date",
                offset,
                "expected dd.MM.yy".to_string(),
            ));
        }
        let (day_part, month_part) = if self.alternate_date_order {
            (parts[1], parts[0])
        } else {
            (parts[0], parts[1])
        };

        let year = if parts[2] == "yy" {
            2100
        } else {
            let yy: u32 = parts[2]
                .parse()
                .map_err(|_| EdfError::format("start_date", offset, "non-numeric year"))?;
            if yy < 85 { 2000 + yy } else { 1900 + yy }
        };

        let day: u32 = day_part
            .parse()
            .map_err(|_| EdfError::format("start_date", offset, "non-numeric day"))?;
        let month: u32 = month_part
            .parse()
            .map_err(|_| EdfError::format("start_date", offset, "non-numeric month"))?;

        NaiveDate::from_ymd_opt(year as i32, month, day)
            .ok_or_else(|| EdfError::format("start_date", offset, "invalid calendar date"))
    }

    pub fn format_time(&self, time: NaiveTime) -> String {
        time.format("%H.%M.%S").to_string()
    }

    pub fn parse_time(&self, raw: &str, offset: u64) -> Result<NaiveTime, EdfError> {
        NaiveTime::parse_from_str(raw.trim(), "%H.%M.%S")
            .map_err(|e| EdfError::format("start_time", offset, e.to_string()))
    }
}
