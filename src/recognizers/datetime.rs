//! Date/time phrase recognizer.
//!
//! Understands numeric dates (`11/14/2018`, `14.11.18`), ISO dates
//! (`2018-11-14`), month-name dates (`November 14, 2018`, `14th of Nov 2018`),
//! month-year ranges (`November 2018`), relative days (`today`, `tomorrow`,
//! `yesterday`) and clock times (`9pm`, `17:30`), optionally joined
//! (`tomorrow at 5pm`).

use std::sync::LazyLock;

use chrono::{Months, NaiveDate, NaiveDateTime, NaiveTime};
use regex::{Captures, Regex};

use super::check_length;
use crate::error::RecognizerError;

const MONTHS: &str = "january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sept|sep|oct|nov|dec";

static ISO_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{4})-(\d{1,2})-(\d{1,2})\b").expect("valid ISO date regex")
});

static NUMERIC_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})([/\-.])(\d{1,2})([/\-.])(\d{4}|\d{2})\b")
        .expect("valid numeric date regex")
});

static MONTH_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b({MONTHS})\.?\s+(\d{{1,2}})(?:st|nd|rd|th)?,?\s+(\d{{4}})\b"
    ))
    .expect("valid month-first regex")
});

static DAY_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?\s+(?:of\s+)?({MONTHS})\.?,?\s+(\d{{4}})\b"
    ))
    .expect("valid day-first regex")
});

static MONTH_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b({MONTHS})\.?,?\s+(\d{{4}})\b")).expect("valid month-year regex")
});

static RELATIVE_DAY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(today|tomorrow|yesterday)\b").expect("valid relative day regex")
});

static TIME_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\s*(?:at\s+)?(\d{1,2})(?::(\d{2}))?\s*(am|pm)?\b")
        .expect("valid time suffix regex")
});

static MERIDIEM_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(\d{1,2})(?::(\d{2}))?\s*(am|pm)\b").expect("valid meridiem time regex")
});

static CLOCK_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2}):(\d{2})\b").expect("valid clock time regex")
});

/// What a resolution describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionKind {
    Date,
    DateTime,
    DateRange,
    Time,
}

/// One candidate interpretation of a recognized span.
///
/// Point values carry `value`; ranges carry `start` and `end`. Dates are
/// formatted `YYYY-MM-DD`, date-times `YYYY-MM-DD HH:MM:SS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeResolution {
    pub timex: String,
    pub kind: ResolutionKind,
    pub value: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

/// A recognized span of the input and its candidate resolutions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeModel {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub resolutions: Vec<DateTimeResolution>,
}

/// Recognizes date/time phrases in free text.
pub trait DateTimeRecognizer: Send + Sync {
    /// Recognize every date/time phrase in `input`.
    ///
    /// `reference` anchors relative phrases such as "tomorrow" or "9pm".
    fn recognize_date_time(
        &self,
        input: &str,
        reference: NaiveDateTime,
    ) -> Result<Vec<DateTimeModel>, RecognizerError>;
}

/// Pattern-based English date/time recognizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishDateTimeRecognizer;

impl EnglishDateTimeRecognizer {
    pub fn new() -> Self {
        Self
    }
}

impl DateTimeRecognizer for EnglishDateTimeRecognizer {
    fn recognize_date_time(
        &self,
        input: &str,
        reference: NaiveDateTime,
    ) -> Result<Vec<DateTimeModel>, RecognizerError> {
        check_length(input)?;

        let mut scan = Scan::new(input);
        let today = reference.date();

        for caps in ISO_DATE.captures_iter(input) {
            let date = ymd(&caps[1], &caps[2], &caps[3]);
            scan.push_date(&caps, date);
        }

        for caps in NUMERIC_DATE.captures_iter(input) {
            // Mixed separators ("1/2-2000") are not dates.
            if caps[2] != caps[4] {
                continue;
            }
            let year = expand_year(&caps[5]);
            // Month first, falling back to day first when the month slot
            // cannot be a month.
            let date = year.and_then(|y| {
                month_day(y, &caps[1], &caps[3]).or_else(|| month_day(y, &caps[3], &caps[1]))
            });
            scan.push_date(&caps, date);
        }

        for caps in MONTH_FIRST.captures_iter(input) {
            let date = named_date(&caps[3], &caps[1], &caps[2]);
            scan.push_date(&caps, date);
        }

        for caps in DAY_FIRST.captures_iter(input) {
            let date = named_date(&caps[3], &caps[2], &caps[1]);
            scan.push_date(&caps, date);
        }

        for caps in MONTH_YEAR.captures_iter(input) {
            let first = caps[2]
                .parse::<i32>()
                .ok()
                .zip(month_number(&caps[1]))
                .and_then(|(y, m)| NaiveDate::from_ymd_opt(y, m, 1));
            scan.push_month(&caps, first);
        }

        for caps in RELATIVE_DAY.captures_iter(input) {
            let date = match caps[1].to_ascii_lowercase().as_str() {
                "tomorrow" => today.succ_opt(),
                "yesterday" => today.pred_opt(),
                _ => Some(today),
            };
            scan.push_date(&caps, date);
        }

        for caps in MERIDIEM_TIME.captures_iter(input) {
            let time = clock(&caps[1], caps.get(2).map(|m| m.as_str()), Some(&caps[3]));
            scan.push_time(&caps, today, time);
        }

        for caps in CLOCK_TIME.captures_iter(input) {
            let time = clock(&caps[1], Some(&caps[2]), None);
            scan.push_time(&caps, today, time);
        }

        Ok(scan.finish())
    }
}

/// Accumulates non-overlapping recognized spans.
struct Scan<'a> {
    input: &'a str,
    found: Vec<DateTimeModel>,
}

impl<'a> Scan<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            found: Vec::new(),
        }
    }

    fn overlaps(&self, start: usize, end: usize) -> bool {
        self.found.iter().any(|m| start < m.end && m.start < end)
    }

    fn push_date(&mut self, caps: &Captures<'_>, date: Option<NaiveDate>) {
        let Some(date) = date else {
            return;
        };
        let Some(whole) = caps.get(0) else {
            return;
        };
        if self.overlaps(whole.start(), whole.end()) {
            return;
        }

        // A trailing clock time turns the date into a date-time.
        let input = self.input;
        let mut end = whole.end();
        let mut resolution = date_resolution(date);
        if let Some(suffix) = TIME_SUFFIX.captures(&input[end..]) {
            let has_minutes = suffix.get(2).is_some();
            let meridiem = suffix.get(3).map(|m| m.as_str());
            if has_minutes || meridiem.is_some() {
                if let Some(time) =
                    clock(&suffix[1], suffix.get(2).map(|m| m.as_str()), meridiem)
                {
                    end += suffix.get(0).map(|m| m.end()).unwrap_or(0);
                    resolution = date_time_resolution(date.and_time(time));
                }
            }
        }

        self.push(whole.start(), end, resolution);
    }

    fn push_month(&mut self, caps: &Captures<'_>, first: Option<NaiveDate>) {
        let Some(first) = first else {
            return;
        };
        let Some(whole) = caps.get(0) else {
            return;
        };
        if self.overlaps(whole.start(), whole.end()) {
            return;
        }
        let Some(next) = first.checked_add_months(Months::new(1)) else {
            return;
        };
        self.push(
            whole.start(),
            whole.end(),
            DateTimeResolution {
                timex: first.format("%Y-%m").to_string(),
                kind: ResolutionKind::DateRange,
                value: None,
                start: Some(first.format("%Y-%m-%d").to_string()),
                end: Some(next.format("%Y-%m-%d").to_string()),
            },
        );
    }

    fn push_time(&mut self, caps: &Captures<'_>, today: NaiveDate, time: Option<NaiveTime>) {
        let Some(time) = time else {
            return;
        };
        let Some(whole) = caps.get(0) else {
            return;
        };
        if self.overlaps(whole.start(), whole.end()) {
            return;
        }
        self.push(
            whole.start(),
            whole.end(),
            DateTimeResolution {
                timex: time.format("T%H:%M").to_string(),
                kind: ResolutionKind::Time,
                value: Some(today.and_time(time).format("%Y-%m-%d %H:%M:%S").to_string()),
                start: None,
                end: None,
            },
        );
    }

    fn push(&mut self, start: usize, end: usize, resolution: DateTimeResolution) {
        self.found.push(DateTimeModel {
            text: self.input[start..end].to_string(),
            start,
            end,
            resolutions: vec![resolution],
        });
    }

    fn finish(mut self) -> Vec<DateTimeModel> {
        self.found.sort_by_key(|m| m.start);
        self.found
    }
}

fn date_resolution(date: NaiveDate) -> DateTimeResolution {
    let formatted = date.format("%Y-%m-%d").to_string();
    DateTimeResolution {
        timex: formatted.clone(),
        kind: ResolutionKind::Date,
        value: Some(formatted),
        start: None,
        end: None,
    }
}

fn date_time_resolution(at: NaiveDateTime) -> DateTimeResolution {
    DateTimeResolution {
        timex: at.format("%Y-%m-%dT%H:%M").to_string(),
        kind: ResolutionKind::DateTime,
        value: Some(at.format("%Y-%m-%d %H:%M:%S").to_string()),
        start: None,
        end: None,
    }
}

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, day.parse().ok()?)
}

fn month_day(year: i32, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
}

fn named_date(year: &str, month_name: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year.parse().ok()?, month_number(month_name)?, day.parse().ok()?)
}

/// Two-digit years pivot at 50: `49` is 2049, `50` is 1950.
fn expand_year(raw: &str) -> Option<i32> {
    let year: i32 = raw.parse().ok()?;
    Some(match raw.len() {
        2 if year < 50 => 2000 + year,
        2 => 1900 + year,
        _ => year,
    })
}

fn month_number(name: &str) -> Option<u32> {
    let lower = name.to_ascii_lowercase();
    let month = match lower.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

fn clock(hour: &str, minute: Option<&str>, meridiem: Option<&str>) -> Option<NaiveTime> {
    let mut hour: u32 = hour.parse().ok()?;
    let minute: u32 = match minute {
        Some(m) => m.parse().ok()?,
        None => 0,
    };
    match meridiem.map(str::to_ascii_lowercase).as_deref() {
        Some("am") => {
            if hour == 0 || hour > 12 {
                return None;
            }
            if hour == 12 {
                hour = 0;
            }
        }
        Some("pm") => {
            if hour == 0 || hour > 12 {
                return None;
            }
            if hour < 12 {
                hour += 12;
            }
        }
        _ => {}
    }
    NaiveTime::from_hms_opt(hour, minute, 0)
}
