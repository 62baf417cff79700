//! Quick registration flow: name, then date of birth.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::recognizers::DateTimeRecognizer;
use crate::registration::model::UserProfile;
use crate::registration::validators::{validate_date_of_birth, validate_name};

pub const START_MESSAGE: &str = "Let's get started. What is your name?";
pub const DATE_OF_BIRTH_PROMPT: &str = "DateOfBirth (MM/DD/YYYY)?";
pub const ALREADY_REGISTERED_MESSAGE: &str = "You have already registered!!!";

/// The question most recently put to the user.
///
/// Progresses linearly: None → Name → DateOfBirth → Registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Question {
    #[default]
    None,
    Name,
    DateOfBirth,
    /// A future-date question; no registration transition enters it.
    Date,
    Registered,
}

impl Question {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: Question) -> bool {
        use Question::*;
        matches!(
            (self, target),
            (None, Name) | (Date, Name) | (Name, DateOfBirth) | (DateOfBirth, Registered)
        )
    }

    /// Whether the flow is finished for this conversation.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Registered)
    }
}

impl std::fmt::Display for Question {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::None => "None",
            Self::Name => "Name",
            Self::DateOfBirth => "DateOfBirth",
            Self::Date => "Date",
            Self::Registered => "Registered",
        };
        write!(f, "{s}")
    }
}

/// Persisted quick-flow cursor, one per conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationFlow {
    #[serde(default)]
    pub last_question_asked: Question,
}

impl ConversationFlow {
    fn ask(&mut self, next: Question) {
        debug_assert!(
            self.last_question_asked.can_transition_to(next),
            "cannot move from {} to {}",
            self.last_question_asked,
            next
        );
        debug!(from = %self.last_question_asked, to = %next, "Quick flow advanced");
        self.last_question_asked = next;
    }
}

/// Run one quick-flow turn, returning the replies to send in order.
///
/// Invalid answers leave `flow` where it was. Completing the flow clears
/// `profile`, so only the conversation remembers the registration.
pub fn fill_out_user_profile(
    flow: &mut ConversationFlow,
    profile: &mut UserProfile,
    input: &str,
    dates: &dyn DateTimeRecognizer,
    reference: NaiveDateTime,
) -> Vec<String> {
    let input = input.trim();
    match flow.last_question_asked {
        Question::None | Question::Date => {
            flow.ask(Question::Name);
            vec![START_MESSAGE.to_string()]
        }
        Question::Name => match validate_name(input) {
            Ok(name) => {
                let greeting = format!("Hi {name}.");
                profile.user_name = Some(name);
                flow.ask(Question::DateOfBirth);
                vec![greeting, DATE_OF_BIRTH_PROMPT.to_string()]
            }
            Err(rejected) => vec![rejected.message],
        },
        Question::DateOfBirth => match validate_date_of_birth(dates, input, reference) {
            Ok(date_of_birth) => {
                let name = profile.user_name.as_deref().unwrap_or_default();
                let done = format!(
                    "Thanks for completing the registration {name}. I have your DateOfBirth as {date_of_birth}."
                );
                *profile = UserProfile::default();
                flow.ask(Question::Registered);
                vec![done]
            }
            Err(rejected) => vec![rejected.message],
        },
        Question::Registered => vec![ALREADY_REGISTERED_MESSAGE.to_string()],
    }
}
