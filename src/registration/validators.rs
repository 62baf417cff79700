//! Field validators: free text in, typed value or user-facing message out.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::recognizers::{DateTimeModel, DateTimeRecognizer, NumberRecognizer};

pub const EMPTY_NAME_MESSAGE: &str = "Please enter a name that contains at least one character.";
pub const DATE_OF_BIRTH_MESSAGE: &str =
    "I'm sorry, please enter your date of birth as a date, for example 01/31/1990.";
pub const DATE_OF_BIRTH_ERROR_MESSAGE: &str =
    "I'm sorry, I could not interpret that as a date of birth. Please enter it as MM/DD/YYYY.";
pub const FUTURE_DATE_MESSAGE: &str = "I'm sorry, please enter a date at least an hour out.";
pub const FUTURE_DATE_ERROR_MESSAGE: &str = "I'm sorry, I could not interpret that as an appropriate date. Please enter a date at least an hour out.";
pub const AGE_RANGE_MESSAGE: &str = "Please enter an age between 18 and 120.";
pub const AGE_ERROR_MESSAGE: &str =
    "I'm sorry, I could not interpret that as an age. Please enter an age between 18 and 120.";

/// Youngest accepted age.
pub const MIN_AGE: i64 = 18;
/// Oldest accepted age.
pub const MAX_AGE: i64 = 120;

/// A rejected answer, carrying the message to send back to the user.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Accept any name with at least one non-whitespace character, trimmed.
pub fn validate_name(input: &str) -> Result<String, ValidationError> {
    let name = input.trim();
    if name.is_empty() {
        return Err(ValidationError::new(EMPTY_NAME_MESSAGE));
    }
    Ok(name.to_string())
}

/// Interpret `input` as a date of birth and format it as a short date.
pub fn validate_date_of_birth(
    recognizer: &dyn DateTimeRecognizer,
    input: &str,
    reference: NaiveDateTime,
) -> Result<String, ValidationError> {
    let models = recognizer
        .recognize_date_time(input, reference)
        .map_err(|e| {
            debug!(error = %e, "Date recognizer failed");
            ValidationError::new(DATE_OF_BIRTH_ERROR_MESSAGE)
        })?;

    candidates(&models)
        .next()
        .map(short_date)
        .ok_or_else(|| ValidationError::new(DATE_OF_BIRTH_MESSAGE))
}

/// Interpret `input` as a date at least an hour after `now`.
pub fn validate_date(
    recognizer: &dyn DateTimeRecognizer,
    input: &str,
    now: NaiveDateTime,
) -> Result<String, ValidationError> {
    let models = recognizer.recognize_date_time(input, now).map_err(|e| {
        debug!(error = %e, "Date recognizer failed");
        ValidationError::new(FUTURE_DATE_ERROR_MESSAGE)
    })?;

    let earliest = now + Duration::hours(1);
    candidates(&models)
        .find(|candidate| *candidate > earliest)
        .map(short_date)
        .ok_or_else(|| ValidationError::new(FUTURE_DATE_MESSAGE))
}

/// Interpret `input` as a whole-number age in `[MIN_AGE, MAX_AGE]`.
pub fn validate_age(recognizer: &dyn NumberRecognizer, input: &str) -> Result<i64, ValidationError> {
    let models = recognizer.recognize_number(input).map_err(|e| {
        debug!(error = %e, "Number recognizer failed");
        ValidationError::new(AGE_ERROR_MESSAGE)
    })?;

    models
        .iter()
        .filter_map(|m| m.value.parse::<i64>().ok())
        .find(|age| (MIN_AGE..=MAX_AGE).contains(age))
        .ok_or_else(|| ValidationError::new(AGE_RANGE_MESSAGE))
}

/// Format as the en-US short date pattern, `M/D/YYYY`.
pub fn short_date(at: NaiveDateTime) -> String {
    at.format("%-m/%-d/%Y").to_string()
}

/// Every parseable candidate, in recognizer order. A resolution's `value`
/// wins over its range `start`.
fn candidates(models: &[DateTimeModel]) -> impl Iterator<Item = NaiveDateTime> + '_ {
    models
        .iter()
        .flat_map(|m| m.resolutions.iter())
        .filter_map(|r| r.value.as_deref().or(r.start.as_deref()))
        .filter_map(parse_candidate)
}

fn parse_candidate(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
