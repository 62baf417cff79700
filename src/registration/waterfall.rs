//! Full registration waterfall.
//!
//! The sequence suspends after every prompt. Its position is a persisted
//! cursor naming the step that consumes the next answer, plus a scratch map
//! of answers collected so far. Each call to [`continue_dialog`] runs
//! exactly one step.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::registration::model::{UserProfile, value_keys};
use crate::registration::prompts::{
    GENDER_CHOICES, choice_prompt, confirm_prompt, recognize_choice, recognize_confirm,
};

pub const GENDER_PROMPT: &str = "Please enter your gender.";
pub const USERNAME_PROMPT: &str = "Please enter your username.";
pub const KNOWN_AS_PROMPT: &str = "What are you KnownAs?";
pub const DATE_OF_BIRTH_PROMPT: &str = "Please enter your DateOfBirth (MM/DD/YYYY).";
pub const CITY_PROMPT: &str = "Please enter your City.";
pub const COUNTRY_PROMPT: &str = "Please enter your Country.";
pub const PASSWORD_PROMPT: &str = "Please enter your Password.";
pub const PASSWORD_ACK: &str = "I have got your password.";
pub const PASSWORD_MISSING: &str = "Please re-enter the password";
pub const CONFIRM_PROMPT: &str = "Is this ok?";
pub const DISCARDED_MESSAGE: &str = "Thanks. Your profile will not be kept.";

/// Steps of the waterfall, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WaterfallStep {
    Gender,
    UserName,
    KnownAs,
    NameConfirm,
    DateOfBirth,
    City,
    Country,
    Password,
    Summary,
}

impl WaterfallStep {
    /// The step after this one; `None` for the last.
    pub fn next(&self) -> Option<WaterfallStep> {
        use WaterfallStep::*;
        match self {
            Gender => Some(UserName),
            UserName => Some(KnownAs),
            KnownAs => Some(NameConfirm),
            NameConfirm => Some(DateOfBirth),
            DateOfBirth => Some(City),
            City => Some(Country),
            Country => Some(Password),
            Password => Some(Summary),
            Summary => None,
        }
    }
}

impl std::fmt::Display for WaterfallStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Gender => "gender",
            Self::UserName => "user_name",
            Self::KnownAs => "known_as",
            Self::NameConfirm => "name_confirm",
            Self::DateOfBirth => "date_of_birth",
            Self::City => "city",
            Self::Country => "country",
            Self::Password => "password",
            Self::Summary => "summary",
        };
        write!(f, "{s}")
    }
}

/// Persisted waterfall position, one per conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogState {
    /// Step that consumes the next answer. `None` when no sequence is active.
    pub cursor: Option<WaterfallStep>,
    /// Answers collected so far, keyed by [`value_keys`].
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

impl DialogState {
    pub fn is_active(&self) -> bool {
        self.cursor.is_some()
    }

    fn end(&mut self) {
        self.cursor = None;
        self.values.clear();
    }
}

/// How a finished sequence ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequenceEnd {
    /// The user confirmed; this profile should be stored and submitted.
    Commit(UserProfile),
    /// The user declined; nothing is kept.
    Discard,
}

/// Result of running one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOutcome {
    pub replies: Vec<String>,
    /// Set when this step finished the sequence.
    pub end: Option<SequenceEnd>,
}

enum Step {
    Advance(Vec<String>),
    Repeat(Vec<String>),
    Finish(Vec<String>, SequenceEnd),
}

/// Feed one answer into the waterfall, starting a sequence if none is active.
pub fn continue_dialog(state: &mut DialogState, answer: &str) -> StepOutcome {
    let step = state.cursor.unwrap_or(WaterfallStep::Gender);

    match run_step(step, &mut state.values, answer) {
        Step::Advance(replies) => {
            state.cursor = step.next();
            debug!(%step, next = ?state.cursor, "Waterfall advanced");
            StepOutcome { replies, end: None }
        }
        Step::Repeat(replies) => {
            state.cursor = Some(step);
            debug!(%step, "Waterfall re-prompted");
            StepOutcome { replies, end: None }
        }
        Step::Finish(replies, end) => {
            state.end();
            StepOutcome {
                replies,
                end: Some(end),
            }
        }
    }
}

fn run_step(step: WaterfallStep, values: &mut BTreeMap<String, String>, answer: &str) -> Step {
    match step {
        WaterfallStep::Gender => Step::Advance(vec![gender_prompt()]),
        WaterfallStep::UserName => match recognize_choice(answer, GENDER_CHOICES) {
            Some(gender) => {
                values.insert(value_keys::GENDER.to_string(), gender.to_string());
                Step::Advance(vec![USERNAME_PROMPT.to_string()])
            }
            None => Step::Repeat(vec![gender_prompt()]),
        },
        WaterfallStep::KnownAs => {
            keep(values, value_keys::USERNAME, answer);
            Step::Advance(vec![KNOWN_AS_PROMPT.to_string()])
        }
        WaterfallStep::NameConfirm => {
            keep(values, value_keys::KNOWN_AS, answer);
            Step::Advance(vec![
                format!("Thanks {answer}."),
                DATE_OF_BIRTH_PROMPT.to_string(),
            ])
        }
        WaterfallStep::DateOfBirth => {
            keep(values, value_keys::DATE_OF_BIRTH, answer);
            Step::Advance(vec![format!("Thanks {answer}."), CITY_PROMPT.to_string()])
        }
        WaterfallStep::City => {
            keep(values, value_keys::CITY, answer);
            Step::Advance(vec![COUNTRY_PROMPT.to_string()])
        }
        WaterfallStep::Country => {
            keep(values, value_keys::COUNTRY, answer);
            Step::Advance(vec![PASSWORD_PROMPT.to_string()])
        }
        WaterfallStep::Password => {
            keep(values, value_keys::PASSWORD, answer);
            let ack = if answer.trim().is_empty() {
                PASSWORD_MISSING
            } else {
                PASSWORD_ACK
            };
            Step::Advance(vec![ack.to_string(), confirm_prompt(CONFIRM_PROMPT)])
        }
        WaterfallStep::Summary => match recognize_confirm(answer) {
            Some(true) => {
                let profile = UserProfile::from_values(values);
                Step::Finish(vec![profile.summary()], SequenceEnd::Commit(profile))
            }
            Some(false) => Step::Finish(vec![DISCARDED_MESSAGE.to_string()], SequenceEnd::Discard),
            None => Step::Repeat(vec![confirm_prompt(CONFIRM_PROMPT)]),
        },
    }
}

fn keep(values: &mut BTreeMap<String, String>, key: &str, answer: &str) {
    values.insert(key.to_string(), answer.to_string());
}

fn gender_prompt() -> String {
    choice_prompt(GENDER_PROMPT, GENDER_CHOICES)
}
