//! Registration conversations.
//!
//! Two flows share one profile model:
//!
//! - the quick flow ([`flow`]) asks for a name and a date of birth, both
//!   validated;
//! - the full waterfall ([`waterfall`]) collects gender, username, display
//!   name, date of birth, city, country and password, confirms, and hands
//!   the profile to a [`RegistrationSubmitter`].

pub mod flow;
pub mod model;
pub mod prompts;
pub mod submitter;
pub mod validators;
pub mod waterfall;

pub use flow::{ConversationFlow, Question, fill_out_user_profile};
pub use model::{UserProfile, state_keys};
pub use submitter::{HttpRegistrationClient, RegistrationSubmitter};
pub use validators::ValidationError;
pub use waterfall::{DialogState, SequenceEnd, StepOutcome, WaterfallStep, continue_dialog};
