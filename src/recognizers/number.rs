//! Number recognizer for digits and English number words.
//!
//! Handles `12`, `-3`, `1,200`, `12.5`, `twelve`, `forty-two`, `a dozen`,
//! `one hundred and five`, `two thousand twenty`.

use std::sync::LazyLock;

use regex::Regex;

use super::check_length;
use crate::error::RecognizerError;

static DIGITS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-?\b\d+(?:,\d{3})*(?:\.\d+)?\b").expect("valid digit number regex")
});

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z]+").expect("valid word regex"));

/// A recognized number and its normalized value (`"12"`, `"-3"`, `"12.5"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberModel {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub value: String,
}

/// Recognizes numbers in free text.
pub trait NumberRecognizer: Send + Sync {
    /// Recognize every number in `input`, in order of appearance.
    fn recognize_number(&self, input: &str) -> Result<Vec<NumberModel>, RecognizerError>;
}

/// English number recognizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishNumberRecognizer;

impl EnglishNumberRecognizer {
    pub fn new() -> Self {
        Self
    }
}

impl NumberRecognizer for EnglishNumberRecognizer {
    fn recognize_number(&self, input: &str) -> Result<Vec<NumberModel>, RecognizerError> {
        check_length(input)?;

        let mut found = Vec::new();

        for m in DIGITS.find_iter(input) {
            let value = normalize_digits(m.as_str())?;
            found.push(NumberModel {
                text: m.as_str().to_string(),
                start: m.start(),
                end: m.end(),
                value,
            });
        }

        let words: Vec<(usize, usize, String)> = WORD
            .find_iter(input)
            .map(|m| (m.start(), m.end(), m.as_str().to_ascii_lowercase()))
            .collect();

        let mut i = 0;
        while i < words.len() {
            if !starts_number(&words, i) {
                i += 1;
                continue;
            }

            // Extend the run across number words joined by spaces, hyphens
            // or a bridging "and".
            let mut terms = vec![words[i].2.as_str()];
            let mut last = i;
            let mut j = i + 1;
            while j < words.len() && joined(input, words[j - 1].1, words[j].0) {
                let word = words[j].2.as_str();
                if word_value(word).is_some() {
                    terms.push(word);
                    last = j;
                    j += 1;
                } else if word == "and"
                    && j + 1 < words.len()
                    && word_value(&words[j + 1].2).is_some()
                    && joined(input, words[j].1, words[j + 1].0)
                {
                    j += 1;
                } else {
                    break;
                }
            }

            let (start, end) = (words[i].0, words[last].1);
            let text = &input[start..end];
            let value = evaluate(&terms).ok_or_else(|| RecognizerError::Overflow(text.to_string()))?;
            found.push(NumberModel {
                text: text.to_string(),
                start,
                end,
                value: value.to_string(),
            });
            i = last + 1;
        }

        found.sort_by_key(|m| m.start);
        Ok(found)
    }
}

/// What a number word contributes.
#[derive(Debug, Clone, Copy)]
enum Term {
    Unit(i64),
    Hundred,
    Dozen,
    Scale(i64),
}

fn word_value(word: &str) -> Option<Term> {
    let term = match word {
        "zero" => Term::Unit(0),
        "one" => Term::Unit(1),
        "two" => Term::Unit(2),
        "three" => Term::Unit(3),
        "four" => Term::Unit(4),
        "five" => Term::Unit(5),
        "six" => Term::Unit(6),
        "seven" => Term::Unit(7),
        "eight" => Term::Unit(8),
        "nine" => Term::Unit(9),
        "ten" => Term::Unit(10),
        "eleven" => Term::Unit(11),
        "twelve" => Term::Unit(12),
        "thirteen" => Term::Unit(13),
        "fourteen" => Term::Unit(14),
        "fifteen" => Term::Unit(15),
        "sixteen" => Term::Unit(16),
        "seventeen" => Term::Unit(17),
        "eighteen" => Term::Unit(18),
        "nineteen" => Term::Unit(19),
        "twenty" => Term::Unit(20),
        "thirty" => Term::Unit(30),
        "forty" => Term::Unit(40),
        "fifty" => Term::Unit(50),
        "sixty" => Term::Unit(60),
        "seventy" => Term::Unit(70),
        "eighty" => Term::Unit(80),
        "ninety" => Term::Unit(90),
        "hundred" => Term::Hundred,
        "dozen" => Term::Dozen,
        "thousand" => Term::Scale(1_000),
        "million" => Term::Scale(1_000_000),
        "billion" => Term::Scale(1_000_000_000),
        _ => return None,
    };
    Some(term)
}

/// "a" only counts when it quantifies a multiplier ("a dozen", "a hundred").
fn starts_number(words: &[(usize, usize, String)], i: usize) -> bool {
    let word = words[i].2.as_str();
    if word == "a" {
        return words.get(i + 1).is_some_and(|next| {
            matches!(
                word_value(&next.2),
                Some(Term::Hundred | Term::Dozen | Term::Scale(_))
            )
        });
    }
    word_value(word).is_some()
}

fn joined(input: &str, prev_end: usize, next_start: usize) -> bool {
    input[prev_end..next_start]
        .chars()
        .all(|c| c.is_whitespace() || c == '-')
}

fn evaluate(words: &[&str]) -> Option<i64> {
    let mut total: i64 = 0;
    let mut current: i64 = 0;
    for word in words {
        match (*word, word_value(word)) {
            ("a", _) => current = current.checked_add(1)?,
            (_, Some(Term::Unit(n))) => current = current.checked_add(n)?,
            (_, Some(Term::Hundred)) => current = current.max(1).checked_mul(100)?,
            (_, Some(Term::Dozen)) => current = current.max(1).checked_mul(12)?,
            (_, Some(Term::Scale(scale))) => {
                total = total.checked_add(current.max(1).checked_mul(scale)?)?;
                current = 0;
            }
            (_, None) => {}
        }
    }
    total.checked_add(current)
}

/// Strip separators and trailing zero decimals: `"1,200.50"` becomes `"1200.5"`.
fn normalize_digits(raw: &str) -> Result<String, RecognizerError> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    let (whole, fraction) = match cleaned.split_once('.') {
        Some((w, f)) => (w, f.trim_end_matches('0')),
        None => (cleaned.as_str(), ""),
    };
    let whole: i64 = whole
        .parse()
        .map_err(|_| RecognizerError::Overflow(raw.to_string()))?;
    if fraction.is_empty() {
        Ok(whole.to_string())
    } else if whole == 0 && cleaned.starts_with('-') {
        Ok(format!("-0.{fraction}"))
    } else {
        Ok(format!("{whole}.{fraction}"))
    }
}
