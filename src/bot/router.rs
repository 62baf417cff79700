//! Activity routing: message turns into the registration flow, member joins
//! into a welcome.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::bot::state;
use crate::bot::turn::TurnContext;
use crate::channels::{ActivityKind, ChannelAccount, IncomingMessage};
use crate::config::{BotConfig, FlowMode};
use crate::error::Result;
use crate::recognizers::DateTimeRecognizer;
use crate::registration::submitter::{failure_message, success_message};
use crate::registration::{
    ConversationFlow, DialogState, RegistrationSubmitter, SequenceEnd, UserProfile,
    continue_dialog, fill_out_user_profile, state_keys,
};
use crate::store::StateStore;

pub const WELCOME_MESSAGE: &str = "Hello and welcome to ConnectHub!";

/// Services the bot talks to.
#[derive(Clone)]
pub struct BotDeps {
    pub store: Arc<dyn StateStore>,
    pub dates: Arc<dyn DateTimeRecognizer>,
    pub submitter: Arc<dyn RegistrationSubmitter>,
}

/// The registration bot.
///
/// Stateless between turns apart from the turn locks; everything the
/// conversation needs lives in the state store.
pub struct ConnectHubBot {
    bot_id: String,
    flow: FlowMode,
    deps: BotDeps,
    turn_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ConnectHubBot {
    pub fn new(bot_id: impl Into<String>, flow: FlowMode, deps: BotDeps) -> Self {
        Self {
            bot_id: bot_id.into(),
            flow,
            deps,
            turn_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_config(config: &BotConfig, deps: BotDeps) -> Self {
        Self::new(config.bot_id.clone(), config.flow, deps)
    }

    pub fn flow(&self) -> FlowMode {
        self.flow
    }

    /// Key under which `msg`'s conversation state is stored.
    pub fn conversation_scope(&self, msg: &IncomingMessage) -> String {
        TurnContext::from_message(msg, &self.bot_id).conversation_scope()
    }

    /// Handle one inbound event and return the replies, in order.
    ///
    /// Message turns for the same conversation run one at a time.
    pub async fn on_turn(&self, msg: &IncomingMessage) -> Result<Vec<String>> {
        let ctx = TurnContext::from_message(msg, &self.bot_id);
        match &msg.kind {
            ActivityKind::Message => {
                let scope = ctx.conversation_scope();
                let lock = self.turn_lock(&scope).await;
                let result = {
                    let _turn = lock.lock().await;
                    self.on_message(&ctx).await
                };
                self.release_turn_lock(&scope, lock).await;
                result
            }
            ActivityKind::MembersAdded(members) => Ok(self.on_members_added(&ctx, members)),
        }
    }

    /// Run the configured registration flow for one message.
    pub async fn on_message(&self, ctx: &TurnContext) -> Result<Vec<String>> {
        let replies = match self.flow {
            FlowMode::Quick => self.run_quick_flow(ctx).await?,
            FlowMode::Full => self.run_registration_dialog(ctx).await?,
        };
        info!(
            channel = %ctx.channel,
            conversation = %ctx.conversation_id,
            replies = replies.len(),
            "Turn complete"
        );
        Ok(replies)
    }

    /// One welcome per added member, skipping the bot itself.
    pub fn on_members_added(&self, ctx: &TurnContext, members: &[ChannelAccount]) -> Vec<String> {
        members
            .iter()
            .filter(|m| m.id != ctx.bot_id)
            .map(|m| {
                debug!(member = %m.id, conversation = %ctx.conversation_id, "Welcoming member");
                WELCOME_MESSAGE.to_string()
            })
            .collect()
    }

    async fn run_quick_flow(&self, ctx: &TurnContext) -> Result<Vec<String>> {
        let store = self.deps.store.as_ref();
        let conversation = ctx.conversation_scope();
        let user = ctx.user_scope();

        let mut flow: ConversationFlow =
            state::load(store, &conversation, state_keys::CONVERSATION_FLOW).await?;
        let mut profile: UserProfile = state::load(store, &user, state_keys::USER_PROFILE).await?;

        let replies = fill_out_user_profile(
            &mut flow,
            &mut profile,
            &ctx.text,
            self.deps.dates.as_ref(),
            chrono::Local::now().naive_local(),
        );

        state::save(store, &conversation, state_keys::CONVERSATION_FLOW, &flow).await?;
        state::save(store, &user, state_keys::USER_PROFILE, &profile).await?;
        Ok(replies)
    }

    async fn run_registration_dialog(&self, ctx: &TurnContext) -> Result<Vec<String>> {
        let store = self.deps.store.as_ref();
        let conversation = ctx.conversation_scope();
        let user = ctx.user_scope();

        let mut dialog: DialogState =
            state::load(store, &conversation, state_keys::DIALOG_STATE).await?;
        let outcome = continue_dialog(&mut dialog, &ctx.text);
        let mut replies = outcome.replies;

        match outcome.end {
            Some(SequenceEnd::Commit(answers)) => {
                let mut profile: UserProfile =
                    state::load(store, &user, state_keys::USER_PROFILE).await?;
                profile.merge(answers);
                state::save(store, &user, state_keys::USER_PROFILE, &profile).await?;

                let reply = match self.deps.submitter.register(&profile).await {
                    Ok(registered) => success_message(&registered, &profile),
                    Err(e) => {
                        warn!(user = %ctx.user_id, error = %e, "Registration failed");
                        failure_message(&e)
                    }
                };
                replies.push(reply);
            }
            Some(SequenceEnd::Discard) => {
                info!(user = %ctx.user_id, "Registration declined, profile not kept");
            }
            None => {}
        }

        if dialog.is_active() {
            state::save(store, &conversation, state_keys::DIALOG_STATE, &dialog).await?;
        } else {
            store
                .delete_state(&conversation, state_keys::DIALOG_STATE)
                .await?;
        }
        Ok(replies)
    }

    async fn turn_lock(&self, scope: &str) -> Arc<Mutex<()>> {
        self.turn_locks
            .lock()
            .await
            .entry(scope.to_string())
            .or_default()
            .clone()
    }

    /// Drop the lock entry once no other turn holds or awaits it.
    async fn release_turn_lock(&self, scope: &str, lock: Arc<Mutex<()>>) {
        let mut locks = self.turn_locks.lock().await;
        // One reference in the map, one here.
        if Arc::strong_count(&lock) == 2
            && locks.get(scope).is_some_and(|held| Arc::ptr_eq(held, &lock))
        {
            locks.remove(scope);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use async_trait::async_trait;

    use super::*;
    use crate::error::RegistrationError;
    use crate::recognizers::EnglishDateTimeRecognizer;
    use crate::registration::flow::{ALREADY_REGISTERED_MESSAGE, START_MESSAGE};
    use crate::registration::waterfall::DISCARDED_MESSAGE;
    use crate::store::MemoryStore;

    /// Records submissions and answers with a canned result.
    struct FakeSubmitter {
        submitted: StdMutex<Vec<UserProfile>>,
        result: fn(&UserProfile) -> std::result::Result<UserProfile, RegistrationError>,
    }

    #[async_trait]
    impl RegistrationSubmitter for FakeSubmitter {
        async fn register(
            &self,
            profile: &UserProfile,
        ) -> std::result::Result<UserProfile, RegistrationError> {
            self.submitted.lock().unwrap().push(profile.clone());
            (self.result)(profile)
        }
    }

    fn accept(profile: &UserProfile) -> std::result::Result<UserProfile, RegistrationError> {
        Ok(UserProfile {
            user_name: profile.user_name.as_ref().map(|n| format!("{n}1")),
            ..Default::default()
        })
    }

    fn reject(_: &UserProfile) -> std::result::Result<UserProfile, RegistrationError> {
        Err(RegistrationError::Rejected {
            status: 409,
            body: "Username already exists".into(),
        })
    }

    fn test_bot(
        flow: FlowMode,
        result: fn(&UserProfile) -> std::result::Result<UserProfile, RegistrationError>,
    ) -> (ConnectHubBot, Arc<MemoryStore>, Arc<FakeSubmitter>) {
        let store = Arc::new(MemoryStore::new());
        let submitter = Arc::new(FakeSubmitter {
            submitted: StdMutex::new(Vec::new()),
            result,
        });
        let deps = BotDeps {
            store: store.clone(),
            dates: Arc::new(EnglishDateTimeRecognizer::new()),
            submitter: submitter.clone(),
        };
        (ConnectHubBot::new("bot", flow, deps), store, submitter)
    }

    async fn say(bot: &ConnectHubBot, text: &str) -> Vec<String> {
        bot.on_turn(&IncomingMessage::new("test", "u1", text))
            .await
            .unwrap()
    }

    const FULL_ANSWERS: [&str; 8] = [
        "hi",
        "Male",
        "bob",
        "Bobby",
        "01/01/1990",
        "Leeds",
        "UK",
        "hunter2",
    ];

    #[tokio::test]
    async fn welcomes_every_member_except_the_bot() {
        let (bot, _, _) = test_bot(FlowMode::Full, accept);
        let msg = IncomingMessage::members_added(
            "test",
            "c1",
            vec![
                ChannelAccount::new("bot"),
                ChannelAccount::new("u1"),
                ChannelAccount::new("u2"),
            ],
        );
        let replies = bot.on_turn(&msg).await.unwrap();
        assert_eq!(replies, vec![WELCOME_MESSAGE, WELCOME_MESSAGE]);
    }

    #[tokio::test]
    async fn bot_only_join_is_silent() {
        let (bot, _, _) = test_bot(FlowMode::Full, accept);
        let msg = IncomingMessage::members_added("test", "c1", vec![ChannelAccount::new("7")])
            .with_recipient("7");
        assert!(bot.on_turn(&msg).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn quick_flow_scenario() {
        let (bot, store, _) = test_bot(FlowMode::Quick, accept);

        assert_eq!(say(&bot, "hello").await, vec![START_MESSAGE]);
        assert_eq!(say(&bot, "Bob").await[0], "Hi Bob.");
        let saved: UserProfile = state::load(store.as_ref(), "test/users/u1", "UserProfile")
            .await
            .unwrap();
        assert_eq!(saved.user_name.as_deref(), Some("Bob"));

        let done = say(&bot, "01/01/1990").await;
        assert!(done[0].contains("Bob"));
        assert!(done[0].contains("1/1/1990"));

        assert_eq!(say(&bot, "again").await, vec![ALREADY_REGISTERED_MESSAGE]);
    }

    #[tokio::test]
    async fn full_flow_commits_and_submits() {
        let (bot, store, submitter) = test_bot(FlowMode::Full, accept);
        for answer in FULL_ANSWERS {
            say(&bot, answer).await;
        }
        let replies = say(&bot, "yes").await;

        assert_eq!(
            replies,
            vec![
                "I have your name as bob, DateOfBirth as 01/01/1990, city as Leeds, country as UK",
                "Registration complete. Your username is bob1 and your password is hunter2.",
            ]
        );

        let submitted = submitter.submitted.lock().unwrap().clone();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].gender.as_deref(), Some("Male"));

        let profile: UserProfile = state::load(store.as_ref(), "test/users/u1", "UserProfile")
            .await
            .unwrap();
        assert_eq!(profile.city.as_deref(), Some("Leeds"));

        assert!(store
            .read_state("test/conversations/u1", "DialogState")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn failed_submission_reports_body() {
        let (bot, _, _) = test_bot(FlowMode::Full, reject);
        for answer in FULL_ANSWERS {
            say(&bot, answer).await;
        }
        let replies = say(&bot, "yes").await;
        assert_eq!(replies[1], "Registration failed: Username already exists");
    }

    #[tokio::test]
    async fn declining_leaves_profile_unchanged() {
        let (bot, store, submitter) = test_bot(FlowMode::Full, accept);
        let existing = UserProfile {
            user_name: Some("old".into()),
            ..Default::default()
        };
        state::save(store.as_ref(), "test/users/u1", "UserProfile", &existing)
            .await
            .unwrap();

        for answer in FULL_ANSWERS {
            say(&bot, answer).await;
        }
        assert_eq!(say(&bot, "no").await, vec![DISCARDED_MESSAGE]);

        let profile: UserProfile = state::load(store.as_ref(), "test/users/u1", "UserProfile")
            .await
            .unwrap();
        assert_eq!(profile, existing);
        assert!(submitter.submitted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn conversations_progress_independently() {
        let (bot, _, _) = test_bot(FlowMode::Quick, accept);
        let a = |text: &str| IncomingMessage::new("test", "a", text);
        let b = |text: &str| IncomingMessage::new("test", "b", text);

        bot.on_turn(&a("hi")).await.unwrap();
        bot.on_turn(&a("Ann")).await.unwrap();
        let replies = bot.on_turn(&b("hi")).await.unwrap();
        assert_eq!(replies, vec![START_MESSAGE]);
    }

    #[tokio::test]
    async fn concurrent_turns_in_one_conversation_are_serialized() {
        let (bot, store, _) = test_bot(FlowMode::Quick, accept);
        let bot = Arc::new(bot);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let bot = bot.clone();
                tokio::spawn(async move {
                    bot.on_turn(&IncomingMessage::new("test", "u1", format!("msg {i}")))
                        .await
                        .unwrap()
                })
            })
            .collect();
        let mut starts = 0;
        for handle in handles {
            if handle.await.unwrap() == vec![START_MESSAGE] {
                starts += 1;
            }
        }
        // Exactly one turn saw the fresh conversation.
        assert_eq!(starts, 1);

        let flow: ConversationFlow =
            state::load(store.as_ref(), "test/conversations/u1", "ConversationFlow")
                .await
                .unwrap();
        assert_ne!(flow.last_question_asked, crate::registration::Question::None);
        assert!(bot.turn_locks.lock().await.is_empty());
    }

    #[tokio::test]
    async fn turn_locks_are_released_after_each_conversation() {
        let (bot, _, _) = test_bot(FlowMode::Quick, accept);
        for i in 0..50 {
            bot.on_turn(&IncomingMessage::new("test", format!("u{i}"), "hi"))
                .await
                .unwrap();
        }
        assert!(bot.turn_locks.lock().await.is_empty());
    }

    #[tokio::test]
    async fn waterfall_answers_are_kept_verbatim() {
        let (bot, _, submitter) = test_bot(FlowMode::Full, accept);
        for answer in &FULL_ANSWERS[..7] {
            say(&bot, answer).await;
        }
        say(&bot, " hunter2 ").await;
        say(&bot, "yes").await;

        let submitted = submitter.submitted.lock().unwrap().clone();
        assert_eq!(submitted[0].password.as_deref(), Some(" hunter2 "));
    }

    #[tokio::test]
    async fn quick_flow_trims_the_name() {
        let (bot, _, _) = test_bot(FlowMode::Quick, accept);
        say(&bot, "hi").await;
        assert_eq!(say(&bot, "  Bob  ").await[0], "Hi Bob.");
    }
}
