//! Natural-language recognizers (English culture).
//!
//! Recognizers scan free text and return every span they could interpret,
//! each with one or more candidate resolutions. They never pick a winner;
//! callers iterate the candidates and apply their own acceptance rules.

pub mod datetime;
pub mod number;

pub use datetime::{
    DateTimeModel, DateTimeRecognizer, DateTimeResolution, EnglishDateTimeRecognizer,
    ResolutionKind,
};
pub use number::{EnglishNumberRecognizer, NumberModel, NumberRecognizer};

use crate::error::RecognizerError;

/// Longest input the recognizers will scan.
pub const MAX_INPUT_LENGTH: usize = 1024;

fn check_length(input: &str) -> Result<(), RecognizerError> {
    let length = input.chars().count();
    if length > MAX_INPUT_LENGTH {
        return Err(RecognizerError::InputTooLong {
            length,
            max: MAX_INPUT_LENGTH,
        });
    }
    Ok(())
}
