use poise::serenity_prelude::{GuildId, UserId};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::OnboardingConfig;
use crate::error::{BotError, Result};
use crate::gateway::SharedGateway;
use crate::messages;
use crate::onboarding::registry::{Reply, SessionInbox, SessionRegistry};
use crate::onboarding::selection::{parse_selection, selection_messages};
use crate::onboarding::session::{Session, Step};
use crate::onboarding::welcome::build_welcome;
use crate::onboarding::{MemberProfile, OnboardingEvent};
use crate::state::{Assignment, SharedPoolStore, WelcomeRef};

/// How a member's onboarding ended
#[derive(Debug)]
pub enum SessionOutcome {
    Completed(Assignment),
    Abandoned(BotError),
}

/// Routes gateway events to per-member sessions and owns the pool transactions
pub struct OnboardingManager {
    gateway: SharedGateway,
    store: SharedPoolStore,
    sessions: SessionRegistry,
    config: Arc<OnboardingConfig>,
}

impl OnboardingManager {
    pub fn new(
        gateway: SharedGateway,
        store: SharedPoolStore,
        config: Arc<OnboardingConfig>,
    ) -> Self {
        Self {
            gateway,
            store,
            sessions: SessionRegistry::new(config.inbox_capacity),
            config,
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn store(&self) -> &SharedPoolStore {
        &self.store
    }

    pub fn config(&self) -> &OnboardingConfig {
        &self.config
    }

    /// Single entry point for gateway events
    pub async fn handle_event(self: &Arc<Self>, event: OnboardingEvent) -> Result<()> {
        match event {
            OnboardingEvent::Joined(member) => {
                self.begin(member);
                Ok(())
            }
            OnboardingEvent::Left { guild_id, user_id } => {
                self.handle_departure(guild_id, user_id).await
            }
            OnboardingEvent::MessageReceived {
                author,
                direct,
                content,
            } => {
                if !direct {
                    return Ok(());
                }
                if !self.sessions.route(author, &content) {
                    debug!("Ignoring DM from {} (no onboarding session)", author);
                }
                Ok(())
            }
        }
    }

    /// Register a session for the member and drive it on its own task
    pub fn begin(self: &Arc<Self>, member: MemberProfile) -> JoinHandle<SessionOutcome> {
        info!(
            "Starting onboarding for {} ({}) in guild {}",
            member.display_name, member.user_id, member.guild_id
        );
        let inbox = self.sessions.register(member.user_id);
        let manager = Arc::clone(self);
        tokio::spawn(async move { manager.run_session(member, inbox).await })
    }

    async fn run_session(&self, member: MemberProfile, mut inbox: SessionInbox) -> SessionOutcome {
        let mut session = Session::new(member.user_id, self.config.prompts());
        let result = self.drive(&member, &mut session, &mut inbox).await;
        self.sessions.finish(&inbox);

        match result {
            Ok(assignment) => {
                info!(
                    "Onboarding finished for {} as '{}'",
                    member.display_name, assignment.character_name
                );
                SessionOutcome::Completed(assignment)
            }
            Err(e) => {
                session.abandon();
                debug!(
                    "Session for {} ended while {}",
                    session.member_id(),
                    session.state()
                );
                self.notify_abandoned(&member, &e).await;
                SessionOutcome::Abandoned(e)
            }
        }
    }

    async fn drive(
        &self,
        member: &MemberProfile,
        session: &mut Session,
        inbox: &mut SessionInbox,
    ) -> Result<Assignment> {
        let mut step = session.start();
        while let Step::Ask(question) = step {
            inbox.discard_stale();
            self.gateway
                .send_direct_message(member.user_id, &question)
                .await?;
            let answer = self.next_reply(inbox).await?;
            step = session.submit_answer(&answer)?;
        }

        let assignment = self.select_character(member, inbox).await?;
        session.complete()?;
        self.apply_side_effects(member, session, assignment).await
    }

    async fn next_reply(&self, inbox: &mut SessionInbox) -> Result<String> {
        match inbox.next_reply(self.config.answer_timeout()).await {
            Reply::Message(text) => Ok(text),
            Reply::Timeout => Err(BotError::AnswerTimeout {
                seconds: self.config.answer_timeout_secs,
            }),
            Reply::Closed => Err(BotError::SessionCancelled),
        }
    }

    /// Present the pool, read the member's pick and run the allocation transaction
    async fn select_character(
        &self,
        member: &MemberProfile,
        inbox: &mut SessionInbox,
    ) -> Result<Assignment> {
        let pool = self.store.snapshot().await?;
        if let Some(existing) = pool.find_assignment(member.user_id) {
            return Err(BotError::AlreadyAssigned {
                member_id: member.user_id.to_string(),
                character: existing.character_name.clone(),
            });
        }

        let presented = pool.sorted_available();
        if presented.is_empty() {
            return Err(BotError::PoolExhausted);
        }

        inbox.discard_stale();
        self.gateway
            .send_direct_message(member.user_id, &messages::selection_header())
            .await?;
        for chunk in selection_messages(&presented, self.config.message_limit) {
            self.gateway
                .send_direct_message(member.user_id, &chunk)
                .await?;
        }

        let reply = self.next_reply(inbox).await?;
        let chosen = parse_selection(&reply, &presented)?;

        // Departure purges the session before it releases under the guard, so
        // checking the generation inside the transaction orders the two.
        self.store
            .allocate(member.user_id, &member.display_name, &chosen.name, || {
                self.sessions.is_current(inbox)
            })
            .await
    }

    /// Nickname, confirmation and welcome post. None of these undo the allocation.
    async fn apply_side_effects(
        &self,
        member: &MemberProfile,
        session: &Session,
        mut assignment: Assignment,
    ) -> Result<Assignment> {
        match self
            .gateway
            .set_nickname(member.guild_id, member.user_id, &assignment.character_name)
            .await
        {
            Ok(()) => info!(
                "Nickname of {} set to '{}'",
                member.display_name, assignment.character_name
            ),
            Err(BotError::PermissionDenied { message }) => warn!(
                "Could not set nickname for {}: {}. Bot requires 'Manage Nicknames' permission and a higher role than the member.",
                member.display_name, message
            ),
            Err(e) => error!("Failed to set nickname for {}: {}", member.display_name, e),
        }

        if let Err(e) = self
            .gateway
            .send_direct_message(
                member.user_id,
                &messages::selection_confirmed(
                    &assignment.character_name,
                    &assignment.character_region,
                ),
            )
            .await
        {
            warn!("Failed to confirm selection to {}: {}", member.display_name, e);
        }

        assignment.welcome_message_ref = self.post_welcome(member, session, &assignment).await;
        Ok(assignment)
    }

    async fn post_welcome(
        &self,
        member: &MemberProfile,
        session: &Session,
        assignment: &Assignment,
    ) -> Option<WelcomeRef> {
        let channel_name = &self.config.welcome_channel;
        let channel_id = match self
            .gateway
            .find_channel_by_name(member.guild_id, channel_name)
            .await
        {
            Ok(Some(channel_id)) => channel_id,
            Ok(None) => {
                warn!(
                    "Welcome channel '{}' not found in guild {}",
                    channel_name, member.guild_id
                );
                return None;
            }
            Err(e) => {
                error!("Failed to look up welcome channel '{}': {}", channel_name, e);
                return None;
            }
        };

        let notice = build_welcome(member, assignment, session.answers(), &self.config);
        let message_id = match self.gateway.send_welcome(channel_id, &notice).await {
            Ok(message_id) => message_id,
            Err(e) => {
                error!("Failed to post welcome for {}: {}", member.display_name, e);
                return None;
            }
        };

        let welcome = WelcomeRef {
            channel_id,
            message_id,
        };
        match self.store.attach_welcome(member.user_id, welcome).await {
            Ok(true) => Some(welcome),
            Ok(false) => {
                // Member left between the claim and the post
                warn!(
                    "{} no longer holds '{}', retracting welcome post",
                    member.display_name, assignment.character_name
                );
                self.retract_welcome(welcome).await;
                None
            }
            Err(e) => {
                error!(
                    "Failed to record welcome post for {}: {}",
                    member.display_name, e
                );
                None
            }
        }
    }

    async fn notify_abandoned(&self, member: &MemberProfile, error: &BotError) {
        let notice = match error {
            BotError::SessionCancelled => {
                debug!("Onboarding cancelled for {}", member.display_name);
                return;
            }
            BotError::AnswerTimeout { .. } => {
                warn!("Timed out waiting for {}", member.display_name);
                messages::timeout_message()
            }
            BotError::InvalidSelection { input } => {
                info!("Invalid selection '{}' from {}", input, member.display_name);
                messages::invalid_selection_message(input)
            }
            BotError::PoolExhausted => {
                warn!("No characters available for {}", member.display_name);
                messages::pool_exhausted_message()
            }
            BotError::CharacterTaken { name } => {
                info!(
                    "'{}' was taken before {} could claim it",
                    name, member.display_name
                );
                messages::character_taken_message(name)
            }
            BotError::AlreadyAssigned { character, .. } => {
                warn!(
                    "{} rejoined while still holding '{}'",
                    member.display_name, character
                );
                messages::already_assigned_message(character)
            }
            e => {
                error!("Onboarding failed for {}: {}", member.display_name, e);
                messages::setup_error_message()
            }
        };

        if let Err(e) = self
            .gateway
            .send_direct_message(member.user_id, &notice)
            .await
        {
            debug!("Could not DM {}: {}", member.display_name, e);
        }
    }

    /// Return the member's character to the pool and retract their welcome post
    pub async fn handle_departure(&self, guild_id: GuildId, user_id: UserId) -> Result<()> {
        if self.sessions.purge(user_id) {
            info!("{} left guild {} during onboarding", user_id, guild_id);
        }

        let Some(assignment) = self.store.release(user_id).await? else {
            return Ok(());
        };

        if let Some(welcome) = assignment.welcome_message_ref {
            self.retract_welcome(welcome).await;
        }
        Ok(())
    }

    async fn retract_welcome(&self, welcome: WelcomeRef) {
        match self
            .gateway
            .delete_message(welcome.channel_id, welcome.message_id)
            .await
        {
            Ok(()) => info!("Deleted welcome post {}", welcome.message_id),
            Err(BotError::MessageNotFound) => {
                debug!("Welcome post {} was already deleted", welcome.message_id)
            }
            Err(BotError::PermissionDenied { message }) => warn!(
                "No permission to delete welcome post {}: {}",
                welcome.message_id, message
            ),
            Err(e) => error!(
                "Failed to delete welcome post {}: {}",
                welcome.message_id, e
            ),
        }
    }
}

/// Shared onboarding manager type
pub type SharedOnboardingManager = Arc<OnboardingManager>;

pub fn create_shared_onboarding_manager(
    gateway: SharedGateway,
    store: SharedPoolStore,
    config: Arc<OnboardingConfig>,
) -> SharedOnboardingManager {
    Arc::new(OnboardingManager::new(gateway, store, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Question;
    use crate::gateway::mock::{DeleteFailure, RecordingGateway};
    use crate::state::{create_shared_pool_store, Character, CharacterPool, PoolStore};
    use poise::serenity_prelude::{ChannelId, MessageId};

    const WELCOME_CHANNEL: u64 = 77;

    fn member(id: u64) -> MemberProfile {
        MemberProfile {
            user_id: UserId::new(id),
            guild_id: GuildId::new(500),
            display_name: format!("member{}", id),
            avatar_url: None,
        }
    }

    fn config(questions: &[&str], timeout_secs: u64) -> OnboardingConfig {
        OnboardingConfig {
            questions: questions
                .iter()
                .map(|q| Question::new(q, &q.trim_end_matches('?').to_uppercase(), true))
                .collect(),
            answer_timeout_secs: timeout_secs,
            ..Default::default()
        }
    }

    fn two_characters() -> CharacterPool {
        CharacterPool::new(vec![
            Character::new("Zed", "Ionia"),
            Character::new("Aatrox", "Ruin"),
        ])
    }

    struct Harness {
        _dir: tempfile::TempDir,
        gateway: Arc<RecordingGateway>,
        manager: SharedOnboardingManager,
    }

    impl Harness {
        async fn new(pool: CharacterPool, config: OnboardingConfig) -> Self {
            Self::with_gateway(
                pool,
                config,
                RecordingGateway::with_channel("welcome", WELCOME_CHANNEL),
            )
            .await
        }

        async fn with_gateway(
            pool: CharacterPool,
            config: OnboardingConfig,
            gateway: RecordingGateway,
        ) -> Self {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("characters.json");
            tokio::fs::write(&path, serde_json::to_string_pretty(&pool).unwrap())
                .await
                .unwrap();

            let gateway = Arc::new(gateway);
            let manager = create_shared_onboarding_manager(
                gateway.clone(),
                create_shared_pool_store(PoolStore::new(path)),
                Arc::new(config),
            );
            Self {
                _dir: dir,
                gateway,
                manager,
            }
        }

        async fn dm(&self, id: u64, text: &str) {
            self.manager
                .handle_event(OnboardingEvent::MessageReceived {
                    author: UserId::new(id),
                    direct: true,
                    content: text.to_string(),
                })
                .await
                .unwrap();
        }

        /// Wait until the bot has sent `count` DMs to the member
        async fn wait_for_dms(&self, id: u64, count: usize) {
            let waited = tokio::time::timeout(std::time::Duration::from_secs(5), async {
                while self.gateway.dms_to(UserId::new(id)).len() < count {
                    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                }
            })
            .await;
            assert!(waited.is_ok(), "expected {} DMs to member{}", count, id);
        }

        async fn leave(&self, id: u64) {
            self.manager
                .handle_event(OnboardingEvent::Left {
                    guild_id: GuildId::new(500),
                    user_id: UserId::new(id),
                })
                .await
                .unwrap();
        }

        async fn pool(&self) -> CharacterPool {
            self.manager.store().snapshot().await.unwrap()
        }
    }

    #[tokio::test]
    async fn test_join_answer_select_then_leave() {
        let h = Harness::new(two_characters(), config(&["age?", "nick?", "hobbies?"], 5)).await;

        let session = h.manager.begin(member(1));
        assert!(h.manager.sessions().is_active(UserId::new(1)));
        // Three questions, then the header and a single listing chunk
        for (sent, text) in [(1, "23"), (2, "kim"), (3, "chess"), (5, "1")] {
            h.wait_for_dms(1, sent).await;
            h.dm(1, text).await;
        }

        let SessionOutcome::Completed(assignment) = session.await.unwrap() else {
            panic!("onboarding did not complete");
        };
        assert_eq!(assignment.character_name, "Aatrox");
        assert!(!h.manager.sessions().is_active(UserId::new(1)));

        let dms = h.gateway.dms_to(UserId::new(1));
        assert_eq!(&dms[..3], &["age?", "nick?", "hobbies?"]);
        assert!(dms.contains(&"1. Aatrox (Ruin)\n2. Zed (Ionia)".to_string()));
        assert_eq!(
            h.gateway.nicknames.lock().get(&UserId::new(1)),
            Some(&"Aatrox".to_string())
        );

        let (channel_id, message_id, notice) = h.gateway.welcomes.lock()[0].clone();
        assert_eq!(channel_id, ChannelId::new(WELCOME_CHANNEL));
        assert_eq!(notice.field("AGE"), Some("23"));
        assert_eq!(notice.field("HOBBIES"), Some("chess"));
        assert_eq!(notice.field("Character"), Some("Aatrox"));

        let pool = h.pool().await;
        assert_eq!(pool.available, vec![Character::new("Zed", "Ionia")]);
        let held = pool.find_assignment(UserId::new(1)).unwrap();
        assert_eq!(held.character_region, "Ruin");
        assert_eq!(held.member_display_name, "member1");
        assert_eq!(
            held.welcome_message_ref,
            Some(WelcomeRef {
                channel_id,
                message_id
            })
        );

        h.leave(1).await;

        let pool = h.pool().await;
        assert!(pool.is_available("Aatrox"));
        assert!(pool.assigned.is_empty());
        assert_eq!(*h.gateway.deleted.lock(), vec![(channel_id, message_id)]);
    }

    #[tokio::test]
    async fn test_extra_answer_is_not_taken_as_selection() {
        let h = Harness::new(two_characters(), config(&["hobbies?"], 5)).await;

        let session = h.manager.begin(member(1));
        h.wait_for_dms(1, 1).await;
        h.dm(1, "chess").await;
        h.dm(1, "and music").await;

        h.wait_for_dms(1, 3).await;
        h.dm(1, "1").await;

        let SessionOutcome::Completed(assignment) = session.await.unwrap() else {
            panic!("onboarding did not complete");
        };
        assert_eq!(assignment.character_name, "Aatrox");
        let (_, _, notice) = h.gateway.welcomes.lock()[0].clone();
        assert_eq!(notice.field("HOBBIES"), Some("chess"));
    }

    #[tokio::test]
    async fn test_departure_during_claim_leaves_nothing_assigned() {
        let h = Harness::new(two_characters(), config(&[], 5)).await;
        let before = h.pool().await;

        let session = h.manager.begin(member(1));
        h.wait_for_dms(1, 2).await;

        // The claim queues behind the held guard, then the departure queues behind the claim
        let held = h.manager.store().hold().await;
        h.dm(1, "1").await;
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        let departure = tokio::spawn({
            let manager = h.manager.clone();
            async move {
                manager
                    .handle_event(OnboardingEvent::Left {
                        guild_id: GuildId::new(500),
                        user_id: UserId::new(1),
                    })
                    .await
            }
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        drop(held);

        departure.await.unwrap().unwrap();
        let outcome = session.await.unwrap();
        assert!(matches!(
            outcome,
            SessionOutcome::Abandoned(BotError::SessionCancelled)
        ));
        assert_eq!(h.pool().await, before);
        assert!(h.gateway.welcomes.lock().is_empty());
        assert!(h.gateway.nicknames.lock().is_empty());
    }

    #[tokio::test]
    async fn test_empty_pool_abandons_without_assignment() {
        let h = Harness::new(CharacterPool::default(), config(&[], 5)).await;

        let outcome = h.manager.begin(member(1)).await.unwrap();
        assert!(matches!(
            outcome,
            SessionOutcome::Abandoned(BotError::PoolExhausted)
        ));
        assert_eq!(
            h.gateway.dms_to(UserId::new(1)),
            vec![messages::pool_exhausted_message()]
        );
        assert!(h.pool().await.assigned.is_empty());
        assert!(h.manager.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_out_of_range_selection_leaves_pool_unchanged() {
        let h = Harness::new(two_characters(), config(&[], 5)).await;
        let before = h.pool().await;

        let session = h.manager.begin(member(1));
        h.dm(1, "99").await;

        let outcome = session.await.unwrap();
        assert!(matches!(
            outcome,
            SessionOutcome::Abandoned(BotError::InvalidSelection { ref input }) if input == "99"
        ));
        assert_eq!(h.pool().await, before);
        assert!(h.gateway.nicknames.lock().is_empty());
        assert!(h
            .gateway
            .dms_to(UserId::new(1))
            .contains(&messages::invalid_selection_message("99")));
    }

    #[tokio::test]
    async fn test_silent_member_times_out() {
        let h = Harness::new(two_characters(), config(&["age?"], 1)).await;
        let before = h.pool().await;

        let session = h.manager.begin(member(1));
        // Guild channel messages are not answers
        h.manager
            .handle_event(OnboardingEvent::MessageReceived {
                author: UserId::new(1),
                direct: false,
                content: "23".to_string(),
            })
            .await
            .unwrap();

        let outcome = session.await.unwrap();
        assert!(matches!(
            outcome,
            SessionOutcome::Abandoned(BotError::AnswerTimeout { seconds: 1 })
        ));
        assert_eq!(
            h.gateway.dms_to(UserId::new(1)),
            vec!["age?".to_string(), messages::timeout_message()]
        );
        assert!(!h.manager.sessions().is_active(UserId::new(1)));
        assert_eq!(h.pool().await, before);
    }

    #[tokio::test]
    async fn test_dm_without_session_is_ignored() {
        let h = Harness::new(two_characters(), config(&[], 5)).await;
        h.dm(9, "1").await;
        assert!(h.gateway.dms.lock().is_empty());
        assert!(h.pool().await.assigned.is_empty());
    }

    #[tokio::test]
    async fn test_race_for_last_character() {
        let pool = CharacterPool::new(vec![Character::new("Zed", "Ionia")]);
        let h = Harness::new(pool, config(&[], 5)).await;

        let first = h.manager.begin(member(1));
        let second = h.manager.begin(member(2));
        h.dm(1, "1").await;
        h.dm(2, "1").await;

        let outcomes = [first.await.unwrap(), second.await.unwrap()];
        let winners = outcomes
            .iter()
            .filter(|o| matches!(o, SessionOutcome::Completed(_)))
            .count();
        assert_eq!(winners, 1);
        assert!(outcomes.iter().any(|o| matches!(
            o,
            SessionOutcome::Abandoned(BotError::CharacterTaken { .. })
                | SessionOutcome::Abandoned(BotError::PoolExhausted)
        )));

        let pool = h.pool().await;
        assert!(pool.available.is_empty());
        assert_eq!(pool.assigned.len(), 1);
        assert_eq!(h.gateway.welcomes.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_leaving_mid_questionnaire_cancels_session() {
        let h = Harness::new(two_characters(), config(&["age?", "nick?"], 30)).await;

        let session = h.manager.begin(member(1));
        h.dm(1, "23").await;
        h.leave(1).await;

        let outcome = tokio::time::timeout(std::time::Duration::from_secs(5), session)
            .await
            .expect("session should end as soon as the member leaves")
            .unwrap();
        assert!(matches!(
            outcome,
            SessionOutcome::Abandoned(BotError::SessionCancelled)
        ));
        assert!(h.manager.sessions().is_empty());
        assert!(h.pool().await.assigned.is_empty());
    }

    #[tokio::test]
    async fn test_rejoin_while_holding_character() {
        let mut pool = two_characters();
        pool.allocate(UserId::new(1), "member1", "Zed").unwrap();
        let h = Harness::new(pool, config(&[], 5)).await;

        let outcome = h.manager.begin(member(1)).await.unwrap();
        assert!(matches!(
            outcome,
            SessionOutcome::Abandoned(BotError::AlreadyAssigned { ref character, .. }) if character == "Zed"
        ));
        assert!(h.pool().await.is_available("Aatrox"));
    }

    #[tokio::test]
    async fn test_side_effect_failures_do_not_undo_allocation() {
        // No welcome channel and no nickname permission
        let gateway = RecordingGateway::default();
        *gateway.deny_nicknames.lock() = true;
        let h = Harness::with_gateway(two_characters(), config(&[], 5), gateway).await;

        let session = h.manager.begin(member(1));
        h.dm(1, "2").await;

        let SessionOutcome::Completed(assignment) = session.await.unwrap() else {
            panic!("onboarding did not complete");
        };
        assert_eq!(assignment.character_name, "Zed");
        assert!(assignment.welcome_message_ref.is_none());
        assert!(h.gateway.welcomes.lock().is_empty());

        let pool = h.pool().await;
        assert!(!pool.is_available("Zed"));
        assert!(pool.find_assignment(UserId::new(1)).is_some());
    }

    #[tokio::test]
    async fn test_departure_releases_even_if_delete_fails() {
        for failure in [
            DeleteFailure::NotFound,
            DeleteFailure::Forbidden,
            DeleteFailure::Other,
        ] {
            let mut pool = two_characters();
            pool.allocate(UserId::new(1), "member1", "Zed").unwrap();
            pool.attach_welcome(
                UserId::new(1),
                WelcomeRef {
                    channel_id: ChannelId::new(WELCOME_CHANNEL),
                    message_id: MessageId::new(4),
                },
            );
            let gateway = RecordingGateway::default();
            *gateway.delete_failure.lock() = Some(failure);
            let h = Harness::with_gateway(pool, config(&[], 5), gateway).await;

            h.leave(1).await;

            let pool = h.pool().await;
            assert!(pool.is_available("Zed"), "{:?}", failure);
            assert!(pool.assigned.is_empty(), "{:?}", failure);
        }
    }

    #[tokio::test]
    async fn test_departure_without_assignment_is_noop() {
        let h = Harness::new(two_characters(), config(&[], 5)).await;
        let before = h.pool().await;

        h.leave(3).await;

        assert_eq!(h.pool().await, before);
        assert!(h.gateway.deleted.lock().is_empty());
    }

    #[tokio::test]
    async fn test_unreadable_store_abandons_with_setup_error() {
        let dir = tempfile::tempdir().unwrap();
        let gateway = Arc::new(RecordingGateway::default());
        let manager = create_shared_onboarding_manager(
            gateway.clone(),
            create_shared_pool_store(PoolStore::new(dir.path().join("missing.json"))),
            Arc::new(config(&[], 5)),
        );

        let outcome = manager.begin(member(1)).await.unwrap();
        let SessionOutcome::Abandoned(err) = outcome else {
            panic!("onboarding should not complete");
        };
        assert!(err.is_persistence());
        assert_eq!(
            gateway.dms_to(UserId::new(1)),
            vec![messages::setup_error_message()]
        );
    }
}
