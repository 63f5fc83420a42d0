//! Command handlers for the story room context.
//!
//! Each handler locks the addressed room, runs the aggregate, performs the
//! persistence the step needs, and publishes the raised events before
//! releasing the lock.

use std::sync::{Arc, PoisonError};

use awful_authors_core::error::DomainError;
use awful_authors_core::ids::{ConnectionId, PlayerId, RoomId};
use awful_authors_core::repository::StoryRecord;
use tracing::{debug, info, instrument, warn};

use super::registry::RoomRegistry;
use crate::domain::aggregates::{JoinResult, KeyOutcome, LeaveOutcome, RoomSession};
use crate::domain::commands::{
    ChangeLobbySetting, ConfigureGame, CreateRoom, Disconnect, JoinRoom, PlayAgain, PressKey,
    StartGame,
};
use crate::domain::settings::select_prompt;

/// Identifiers handed back to the creator of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomCreated {
    /// The new room.
    pub room_id: RoomId,
    /// The creator's seat.
    pub player_id: PlayerId,
}

fn ensure_member(session: &RoomSession, connection: ConnectionId) -> Result<(), DomainError> {
    if session.is_member(connection) {
        Ok(())
    } else {
        Err(DomainError::InvalidInput(format!(
            "connection has not joined room {}",
            session.id
        )))
    }
}

impl RoomRegistry {
    /// Handles `CreateRoom`: opens a room with the sender in the first seat.
    #[instrument(skip_all, fields(correlation_id = %command.correlation_id))]
    pub fn handle_create_room(&self, command: &CreateRoom) -> RoomCreated {
        let room_id = RoomId::new();
        let player_id = PlayerId::new();
        let mut session = RoomSession::create(
            room_id,
            player_id,
            command.nickname.clone(),
            command.connection_id,
            self.rules,
            command.correlation_id,
            self.clock.as_ref(),
        );
        self.publish(&mut session);
        self.insert_room(session);
        self.track(command.connection_id, room_id);
        info!(%room_id, %player_id, "room created");
        RoomCreated { room_id, player_id }
    }

    /// Handles `JoinRoom`: seats a newcomer, or recovers a seat and replays
    /// the room state to the reconnecting connection.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::RoomNotFound`, `DomainError::GameAlreadyStarted`
    /// or `DomainError::RoomFull`.
    #[instrument(skip_all, fields(correlation_id = %command.correlation_id, room_id = %command.room_id))]
    pub async fn handle_join_room(&self, command: &JoinRoom) -> Result<JoinResult, DomainError> {
        let mut entry = self.lock_room(command.room_id).await?;
        let result = entry.session.join(
            command.connection_id,
            command.nickname.clone(),
            command.player_id,
            command.correlation_id,
            self.clock.as_ref(),
        )?;
        self.track(command.connection_id, command.room_id);

        if result.needs_recovery {
            let record = self.load_record(&entry.session).await;
            entry.session.recover(
                command.connection_id,
                &record,
                command.correlation_id,
                self.clock.as_ref(),
            );
        }
        if result.rejoined {
            info!(player_id = %result.player_id, "player reconnected");
        } else {
            info!(player_id = %result.player_id, "player joined");
        }

        self.publish(&mut entry.session);
        Ok(result)
    }

    /// Handles `ChangeLobbySetting`: relays the edit to the other members.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::RoomNotFound`, or `DomainError::InvalidInput` if
    /// the sender is not in the room.
    #[instrument(skip_all, fields(correlation_id = %command.correlation_id, room_id = %command.room_id))]
    pub async fn handle_change_lobby_setting(
        &self,
        command: &ChangeLobbySetting,
    ) -> Result<(), DomainError> {
        let mut entry = self.lock_room(command.room_id).await?;
        ensure_member(&entry.session, command.connection_id)?;
        entry.session.relay_lobby_setting(
            command.connection_id,
            command.key.clone(),
            command.value.clone(),
            command.correlation_id,
            self.clock.as_ref(),
        );
        self.publish(&mut entry.session);
        Ok(())
    }

    /// Handles `ConfigureGame`: fixes the parameters, resolves the prompt,
    /// and resets the stored story.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::RoomNotFound`, `DomainError::InvalidInput` or
    /// `DomainError::InvalidPhase`.
    #[instrument(skip_all, fields(correlation_id = %command.correlation_id, room_id = %command.room_id))]
    pub async fn handle_configure_game(&self, command: &ConfigureGame) -> Result<(), DomainError> {
        let mut entry = self.lock_room(command.room_id).await?;
        ensure_member(&entry.session, command.connection_id)?;

        // Lock RNG only for the prompt pick, never across an await.
        let prompt = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            select_prompt(command.prompt_index, &mut *rng)
        };
        entry.session.configure(
            command.word_count,
            command.round_count,
            prompt,
            command.correlation_id,
            self.clock.as_ref(),
        )?;

        if let Err(err) = self
            .repository
            .save(&StoryRecord::empty(command.room_id))
            .await
        {
            warn!(error = %err, "failed to reset stored story");
            entry
                .session
                .warn_persistence(err.to_string(), command.correlation_id, self.clock.as_ref());
        }
        info!(
            word_count = command.word_count,
            round_count = command.round_count,
            "game configured"
        );

        self.publish(&mut entry.session);
        Ok(())
    }

    /// Handles `StartGame`: begins the first turn and arms its timer.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::RoomNotFound`, `DomainError::InvalidInput` or
    /// `DomainError::InvalidPhase`.
    #[instrument(skip_all, fields(correlation_id = %command.correlation_id, room_id = %command.room_id))]
    pub async fn handle_start_game(self: &Arc<Self>, command: &StartGame) -> Result<(), DomainError> {
        let mut entry = self.lock_room(command.room_id).await?;
        ensure_member(&entry.session, command.connection_id)?;
        let schedule = entry
            .session
            .start(command.correlation_id, self.clock.as_ref())?;
        info!(turn = %schedule.turn, deadline = %schedule.deadline, "game started");

        self.run_turn(&mut entry, schedule, command.correlation_id)
            .await;
        self.publish(&mut entry.session);
        Ok(())
    }

    /// Handles `PressKey`: applies the key and, if it met the quota, ends the
    /// turn ahead of its deadline.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::RoomNotFound` if the room does not exist.
    #[instrument(skip_all, fields(correlation_id = %command.correlation_id, room_id = %command.room_id))]
    pub async fn handle_press_key(self: &Arc<Self>, command: &PressKey) -> Result<(), DomainError> {
        let mut entry = self.lock_room(command.room_id).await?;
        let outcome = entry.session.apply_key(
            command.connection_id,
            command.key,
            command.correlation_id,
            self.clock.as_ref(),
        );
        match outcome {
            KeyOutcome::TurnCompleted(completion) => {
                Self::disarm_turn_timer(&mut entry);
                debug!(author = %completion.author, "quota met");
                self.settle_turns(&mut entry, completion, command.correlation_id)
                    .await;
            }
            KeyOutcome::Applied => {}
            KeyOutcome::Ignored => debug!("key ignored"),
        }
        self.publish(&mut entry.session);
        Ok(())
    }

    /// Handles `PlayAgain`: replaces the finished game with a fresh lobby
    /// holding only the presser and invites everyone else back.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::RoomNotFound`, or `DomainError::InvalidInput` if
    /// the sender is not in the room.
    #[instrument(skip_all, fields(correlation_id = %command.correlation_id, room_id = %command.room_id))]
    pub async fn handle_play_again(&self, command: &PlayAgain) -> Result<(), DomainError> {
        let mut entry = self.lock_room(command.room_id).await?;
        ensure_member(&entry.session, command.connection_id)?;
        Self::disarm_turn_timer(&mut entry);

        let fresh = entry.session.restart(
            command.player_id,
            command.nickname.clone(),
            command.connection_id,
            command.correlation_id,
            self.clock.as_ref(),
        );
        entry.session = fresh;

        if let Err(err) = self
            .repository
            .save(&StoryRecord::empty(command.room_id))
            .await
        {
            warn!(error = %err, "failed to reset stored story");
            entry
                .session
                .warn_persistence(err.to_string(), command.correlation_id, self.clock.as_ref());
        }
        info!(player_id = %command.player_id, "room reset for another game");

        self.publish(&mut entry.session);
        Ok(())
    }

    /// Handles `Disconnect`: removes the connection from every room it was
    /// in and tears down rooms left without connections.
    #[instrument(skip_all, fields(correlation_id = %command.correlation_id, connection_id = %command.connection_id))]
    pub async fn handle_disconnect(&self, command: &Disconnect) {
        for room_id in self.untrack_all(command.connection_id) {
            let Ok(mut entry) = self.lock_room(room_id).await else {
                continue;
            };
            let outcome = entry.session.leave(
                command.connection_id,
                command.correlation_id,
                self.clock.as_ref(),
            );
            match outcome {
                LeaveOutcome::RoomEmpty => {
                    Self::disarm_turn_timer(&mut entry);
                    entry.closed = true;
                    self.remove_room(room_id);
                    if let Err(err) = self.repository.delete(room_id).await {
                        warn!(%room_id, error = %err, "failed to delete stored story");
                    }
                    info!(%room_id, "room closed");
                }
                LeaveOutcome::SeatReleased(player_id) => {
                    debug!(%room_id, %player_id, "lobby seat released");
                    self.publish(&mut entry.session);
                }
                LeaveOutcome::Left | LeaveOutcome::NotMember => {
                    self.publish(&mut entry.session);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use awful_authors_core::clock::Clock;
    use awful_authors_core::error::DomainError;
    use awful_authors_core::ids::{ConnectionId, PlayerId, RoomId};
    use awful_authors_core::notifier::Notifier;
    use awful_authors_core::repository::{StoryRecord, StoryRepository};
    use awful_authors_core::rng::DeterministicRng;
    use awful_authors_test_support::{
        FailingStoryRepository, FixedClock, MockRng, RecordingNotifier, RecordingStoryRepository,
        RepositoryCall, SequenceRng, fixed_now,
    };
    use chrono::TimeDelta;
    use uuid::Uuid;

    use crate::application::registry::RoomRegistry;
    use crate::domain::aggregates::TurnToken;
    use crate::domain::commands::{
        ChangeLobbySetting, ConfigureGame, CreateRoom, Disconnect, JoinRoom, PlayAgain, PressKey,
        StartGame,
    };
    use crate::domain::keys::Keystroke;
    use crate::domain::settings::GameRules;

    struct Harness {
        registry: Arc<RoomRegistry>,
        notifier: Arc<RecordingNotifier>,
    }

    fn harness_with(
        rules: GameRules,
        repository: Arc<dyn StoryRepository>,
        rng: Arc<Mutex<dyn DeterministicRng + Send>>,
    ) -> Harness {
        let notifier = Arc::new(RecordingNotifier::new());
        let clock: Arc<dyn Clock> = Arc::new(FixedClock(fixed_now()));
        let registry = RoomRegistry::new(
            rules,
            clock,
            rng,
            repository,
            Arc::clone(&notifier) as Arc<dyn Notifier>,
        );
        Harness { registry, notifier }
    }

    fn harness(repository: Arc<dyn StoryRepository>) -> Harness {
        harness_with(
            GameRules::default(),
            repository,
            Arc::new(Mutex::new(MockRng)),
        )
    }

    impl Harness {
        fn create(&self, nickname: &str) -> (RoomId, ConnectionId) {
            let connection_id = ConnectionId::new();
            let created = self.registry.handle_create_room(&CreateRoom {
                correlation_id: Uuid::new_v4(),
                connection_id,
                nickname: nickname.to_owned(),
            });
            (created.room_id, connection_id)
        }

        async fn join(&self, room_id: RoomId, nickname: &str) -> ConnectionId {
            let connection_id = ConnectionId::new();
            self.registry
                .handle_join_room(&JoinRoom {
                    correlation_id: Uuid::new_v4(),
                    connection_id,
                    room_id,
                    nickname: nickname.to_owned(),
                    player_id: None,
                })
                .await
                .unwrap();
            connection_id
        }

        async fn configure(&self, room_id: RoomId, host: ConnectionId, words: u32, rounds: u32) {
            self.registry
                .handle_configure_game(&ConfigureGame {
                    correlation_id: Uuid::new_v4(),
                    connection_id: host,
                    room_id,
                    word_count: words,
                    round_count: rounds,
                    prompt_index: Some(0),
                })
                .await
                .unwrap();
        }

        async fn start(&self, room_id: RoomId, host: ConnectionId) {
            self.registry
                .handle_start_game(&StartGame {
                    correlation_id: Uuid::new_v4(),
                    connection_id: host,
                    room_id,
                })
                .await
                .unwrap();
        }

        async fn type_text(&self, room_id: RoomId, connection_id: ConnectionId, text: &str) {
            for c in text.chars() {
                self.registry
                    .handle_press_key(&PressKey {
                        correlation_id: Uuid::new_v4(),
                        connection_id,
                        room_id,
                        key: Keystroke::parse(&c.to_string()).unwrap(),
                    })
                    .await
                    .unwrap();
            }
        }

        /// Two seated players in a started game.
        async fn two_player_game(
            &self,
            words: u32,
            rounds: u32,
        ) -> (RoomId, ConnectionId, ConnectionId) {
            let (room_id, ann) = self.create("ann");
            let bob = self.join(room_id, "bob").await;
            self.configure(room_id, ann, words, rounds).await;
            self.start(room_id, ann).await;
            (room_id, ann, bob)
        }
    }

    // --- create / join ---

    #[tokio::test]
    async fn test_handle_create_room_registers_room_and_notifies_creator() {
        let h = harness(Arc::new(RecordingStoryRepository::new()));

        let (room_id, conn) = h.create("ann");

        assert_eq!(h.registry.room_count(), 1);
        assert_eq!(h.notifier.event_types_for(conn), vec!["room.joined"]);
        let payload = h.notifier.last_payload(conn, "room.joined").unwrap();
        assert_eq!(payload["room_id"], room_id.to_string());
        assert_eq!(payload["roster"], serde_json::json!(["ann"]));
    }

    #[tokio::test]
    async fn test_handle_join_room_unknown_room_returns_not_found() {
        let h = harness(Arc::new(RecordingStoryRepository::new()));
        let room_id = RoomId::new();

        let result = h
            .registry
            .handle_join_room(&JoinRoom {
                correlation_id: Uuid::new_v4(),
                connection_id: ConnectionId::new(),
                room_id,
                nickname: "bob".to_owned(),
                player_id: None,
            })
            .await;

        assert!(matches!(result, Err(DomainError::RoomNotFound(id)) if id == room_id));
    }

    #[tokio::test]
    async fn test_handle_join_room_notifies_existing_members() {
        let h = harness(Arc::new(RecordingStoryRepository::new()));
        let (room_id, ann) = h.create("ann");

        let bob = h.join(room_id, "bob").await;

        let roster = h.notifier.last_payload(ann, "room.lobby_roster_changed").unwrap();
        assert_eq!(roster["roster"], serde_json::json!(["ann", "bob"]));
        assert_eq!(h.notifier.event_types_for(bob), vec!["room.joined"]);
    }

    #[tokio::test]
    async fn test_handle_join_room_at_capacity_returns_room_full() {
        let rules = GameRules::new(2, TimeDelta::seconds(3)).unwrap();
        let h = harness_with(
            rules,
            Arc::new(RecordingStoryRepository::new()),
            Arc::new(Mutex::new(MockRng)),
        );
        let (room_id, _) = h.create("ann");
        h.join(room_id, "bob").await;

        let result = h
            .registry
            .handle_join_room(&JoinRoom {
                correlation_id: Uuid::new_v4(),
                connection_id: ConnectionId::new(),
                room_id,
                nickname: "cat".to_owned(),
                player_id: None,
            })
            .await;

        assert!(matches!(result, Err(DomainError::RoomFull(_))));
    }

    // --- lobby / configure / start ---

    #[tokio::test]
    async fn test_handle_change_lobby_setting_relays_to_others_only() {
        let h = harness(Arc::new(RecordingStoryRepository::new()));
        let (room_id, ann) = h.create("ann");
        let bob = h.join(room_id, "bob").await;
        h.notifier.clear();

        h.registry
            .handle_change_lobby_setting(&ChangeLobbySetting {
                correlation_id: Uuid::new_v4(),
                connection_id: ann,
                room_id,
                key: "rounds".to_owned(),
                value: serde_json::json!(5),
            })
            .await
            .unwrap();

        assert!(h.notifier.delivered_to(ann).is_empty());
        let payload = h.notifier.last_payload(bob, "room.lobby_setting_changed").unwrap();
        assert_eq!(payload, serde_json::json!({ "key": "rounds", "value": 5 }));
    }

    #[tokio::test]
    async fn test_handle_configure_game_resets_story_and_picks_random_prompt() {
        let repo = Arc::new(RecordingStoryRepository::new());
        let h = harness_with(
            GameRules::default(),
            Arc::clone(&repo) as Arc<dyn StoryRepository>,
            Arc::new(Mutex::new(SequenceRng::new(vec![2]))),
        );
        let (room_id, ann) = h.create("ann");

        h.registry
            .handle_configure_game(&ConfigureGame {
                correlation_id: Uuid::new_v4(),
                connection_id: ann,
                room_id,
                word_count: 2,
                round_count: 3,
                prompt_index: None,
            })
            .await
            .unwrap();

        let payload = h.notifier.last_payload(ann, "room.game_configured").unwrap();
        assert_eq!(payload["prompt"], "a faraway future");
        assert_eq!(payload["word_count"], 2);
        assert!(matches!(
            repo.calls().as_slice(),
            [RepositoryCall::Save(record)] if record.room_id == room_id && record.story.is_empty()
        ));
    }

    #[tokio::test]
    async fn test_handle_configure_game_from_stranger_returns_invalid_input() {
        let h = harness(Arc::new(RecordingStoryRepository::new()));
        let (room_id, _) = h.create("ann");

        let result = h
            .registry
            .handle_configure_game(&ConfigureGame {
                correlation_id: Uuid::new_v4(),
                connection_id: ConnectionId::new(),
                room_id,
                word_count: 2,
                round_count: 3,
                prompt_index: Some(1),
            })
            .await;

        assert!(matches!(result, Err(DomainError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_handle_start_game_before_configure_returns_invalid_phase() {
        let h = harness(Arc::new(RecordingStoryRepository::new()));
        let (room_id, ann) = h.create("ann");

        let result = h
            .registry
            .handle_start_game(&StartGame {
                correlation_id: Uuid::new_v4(),
                connection_id: ann,
                room_id,
            })
            .await;

        assert!(matches!(result, Err(DomainError::InvalidPhase(_))));
    }

    #[tokio::test]
    async fn test_handle_start_game_announces_first_turn() {
        let h = harness(Arc::new(RecordingStoryRepository::new()));

        let (room_id, ann, bob) = h.two_player_game(2, 1).await;

        let view = h.registry.get_room(room_id).await.unwrap();
        assert_eq!(view.phase, "playing");
        let started = h.notifier.last_payload(bob, "room.game_started").unwrap();
        assert_eq!(started["first_player_id"], view.player_ids[0].to_string());
        let turn = h.notifier.last_payload(ann, "room.turn_started").unwrap();
        assert_eq!(turn["quota"], 2);
    }

    // --- turns ---

    #[tokio::test]
    async fn test_full_game_by_keystrokes_persists_story_and_contribution() {
        let repo = Arc::new(RecordingStoryRepository::new());
        let h = harness(Arc::clone(&repo) as Arc<dyn StoryRepository>);
        let (room_id, ann, bob) = h.two_player_game(2, 1).await;

        h.type_text(room_id, ann, "hi yo ").await;
        h.type_text(room_id, bob, "ok go ").await;

        assert_eq!(repo.append_count(), 2);
        let record = repo.record(room_id).unwrap();
        assert_eq!(record.story, "hi yo ok go ");
        assert_eq!(record.contribution, "0011");
        for conn in [ann, bob] {
            let ended = h.notifier.last_payload(conn, "room.game_ended").unwrap();
            assert_eq!(ended["story"], "hi yo ok go ");
            assert_eq!(ended["contribution"], "0011");
            assert_eq!(ended["prompt"], "medieval times");
        }
        let view = h.registry.get_room(room_id).await.unwrap();
        assert_eq!(view.phase, "finished");
    }

    #[tokio::test]
    async fn test_keys_from_waiting_writer_change_nothing() {
        let h = harness(Arc::new(RecordingStoryRepository::new()));
        let (room_id, _ann, bob) = h.two_player_game(2, 1).await;
        h.notifier.clear();

        h.type_text(room_id, bob, "sneaky").await;

        assert!(h.notifier.deliveries().is_empty());
        let view = h.registry.get_room(room_id).await.unwrap();
        assert_eq!(view.current_round_story, "");
    }

    #[tokio::test(start_paused = true)]
    async fn test_turn_timer_expiry_advances_to_next_writer() {
        let repo = Arc::new(RecordingStoryRepository::new());
        let h = harness(Arc::clone(&repo) as Arc<dyn StoryRepository>);
        let (room_id, ann, bob) = h.two_player_game(2, 2).await;
        h.type_text(room_id, ann, "wor").await;

        tokio::time::sleep(Duration::from_millis(6_500)).await;

        let view = h.registry.get_room(room_id).await.unwrap();
        assert_eq!(view.active_player_id, Some(view.player_ids[1]));
        assert_eq!(view.word_limit, Some(3));
        assert!(view.pending_quota_adjustment);
        assert_eq!(
            repo.calls().last(),
            Some(&RepositoryCall::Append(room_id, "wor".to_owned(), String::new()))
        );
        let turn = h.notifier.last_payload(bob, "room.turn_started").unwrap();
        assert_eq!(turn["quota"], 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_quota_completion_disarms_previous_timer() {
        let repo = Arc::new(RecordingStoryRepository::new());
        let h = harness(Arc::clone(&repo) as Arc<dyn StoryRepository>);
        let (room_id, ann, bob) = h.two_player_game(2, 2).await;

        tokio::time::sleep(Duration::from_secs(3)).await;
        h.type_text(room_id, ann, "a b ").await;
        tokio::time::sleep(Duration::from_secs(4)).await;

        // Ann's original deadline has passed; only bob's fresh turn is running.
        let view = h.registry.get_room(room_id).await.unwrap();
        assert_eq!(view.active_player_id, Some(view.player_ids[1]));
        assert_eq!(repo.append_count(), 1);

        h.type_text(room_id, bob, "c").await;
        tokio::time::sleep(Duration::from_secs(3)).await;

        let view = h.registry.get_room(room_id).await.unwrap();
        assert_eq!(view.active_player_id, Some(view.player_ids[0]));
        assert_eq!(view.current_round, 1);
        assert_eq!(repo.append_count(), 2);
    }

    #[tokio::test]
    async fn test_stale_turn_expiry_is_ignored() {
        let repo = Arc::new(RecordingStoryRepository::new());
        let h = harness(Arc::clone(&repo) as Arc<dyn StoryRepository>);
        let (room_id, ann, _bob) = h.two_player_game(2, 2).await;
        h.type_text(room_id, ann, "ab").await;

        h.registry
            .handle_turn_expired(room_id, TurnToken::default())
            .await;

        let view = h.registry.get_room(room_id).await.unwrap();
        assert_eq!(view.active_player_id, Some(view.player_ids[0]));
        assert_eq!(view.current_round_story, "ab");
        assert_eq!(repo.append_count(), 0);
    }

    #[tokio::test]
    async fn test_zero_budget_turns_cascade_to_game_over() {
        let rules = GameRules::new(4, TimeDelta::zero()).unwrap();
        let h = harness_with(
            rules,
            Arc::new(RecordingStoryRepository::new()),
            Arc::new(Mutex::new(MockRng)),
        );

        let (room_id, ann, _bob) = h.two_player_game(1, 2).await;

        let types = h.notifier.event_types_for(ann);
        assert_eq!(
            types.iter().filter(|t| *t == "room.turn_started").count(),
            4
        );
        assert_eq!(
            types.iter().filter(|t| *t == "room.round_ended").count(),
            1
        );
        assert_eq!(types.last().map(String::as_str), Some("room.game_ended"));
        let view = h.registry.get_room(room_id).await.unwrap();
        assert_eq!(view.phase, "finished");
    }

    #[tokio::test]
    async fn test_persistence_failure_warns_and_game_continues() {
        let h = harness(Arc::new(FailingStoryRepository));
        let (room_id, ann, bob) = h.two_player_game(1, 1).await;

        h.type_text(room_id, ann, "hi ").await;
        h.type_text(room_id, bob, "yo ").await;

        let warning = h
            .notifier
            .last_payload(bob, "room.persistence_warning")
            .unwrap();
        assert!(warning["message"].as_str().unwrap().contains("connection refused"));
        let ended = h.notifier.last_payload(ann, "room.game_ended").unwrap();
        assert_eq!(ended["story"], "hi yo ");
        assert_eq!(ended["contribution"], "01");
    }

    // --- reconnection ---

    #[tokio::test]
    async fn test_rejoin_mid_game_receives_recovery_state() {
        let repo = Arc::new(RecordingStoryRepository::new());
        let h = harness(Arc::clone(&repo) as Arc<dyn StoryRepository>);
        let (room_id, ann, bob) = h.two_player_game(2, 2).await;
        h.type_text(room_id, ann, "hi yo ").await;
        h.type_text(room_id, bob, "ok").await;
        let bob_id = h.registry.get_room(room_id).await.unwrap().player_ids[1];
        h.registry
            .handle_disconnect(&Disconnect {
                correlation_id: Uuid::new_v4(),
                connection_id: bob,
            })
            .await;

        let reconnect = ConnectionId::new();
        let result = h
            .registry
            .handle_join_room(&JoinRoom {
                correlation_id: Uuid::new_v4(),
                connection_id: reconnect,
                room_id,
                nickname: "whoever".to_owned(),
                player_id: Some(bob_id),
            })
            .await
            .unwrap();

        assert!(result.rejoined);
        assert_eq!(
            h.notifier.event_types_for(reconnect),
            vec![
                "room.session_resumed",
                "room.joined",
                "room.game_configured",
                "room.game_started",
                "room.turn_started",
                "room.recovery_state",
            ]
        );
        let recovery = h
            .notifier
            .last_payload(reconnect, "room.recovery_state")
            .unwrap();
        assert_eq!(recovery["round"], 1);
        assert_eq!(recovery["story"], "hi yo ok");
    }

    #[tokio::test]
    async fn test_rejoin_with_inconsistent_stored_story_recovers_from_transcript() {
        let repo = Arc::new(RecordingStoryRepository::new());
        let h = harness(Arc::clone(&repo) as Arc<dyn StoryRepository>);
        let (room_id, ann, bob) = h.two_player_game(2, 2).await;
        repo.save(&StoryRecord {
            room_id,
            story: "junk".into(),
            contribution: "x?".into(),
        })
        .await
        .unwrap();
        h.type_text(room_id, ann, "hi yo ").await;
        h.type_text(room_id, bob, "ok").await;
        let bob_id = h.registry.get_room(room_id).await.unwrap().player_ids[1];
        h.registry
            .handle_disconnect(&Disconnect {
                correlation_id: Uuid::new_v4(),
                connection_id: bob,
            })
            .await;

        let reconnect = ConnectionId::new();
        h.registry
            .handle_join_room(&JoinRoom {
                correlation_id: Uuid::new_v4(),
                connection_id: reconnect,
                room_id,
                nickname: "bob".to_owned(),
                player_id: Some(bob_id),
            })
            .await
            .unwrap();

        assert_eq!(repo.record(room_id).unwrap().story, "junkhi yo ");
        let recovery = h
            .notifier
            .last_payload(reconnect, "room.recovery_state")
            .unwrap();
        assert_eq!(recovery["story"], "hi yo ok");
    }

    #[tokio::test]
    async fn test_rejoin_after_game_over_receives_results() {
        let h = harness(Arc::new(RecordingStoryRepository::new()));
        let (room_id, ann, bob) = h.two_player_game(1, 1).await;
        h.type_text(room_id, ann, "a ").await;
        h.type_text(room_id, bob, "b ").await;
        let ann_id = h.registry.get_room(room_id).await.unwrap().player_ids[0];

        let reconnect = ConnectionId::new();
        h.registry
            .handle_join_room(&JoinRoom {
                correlation_id: Uuid::new_v4(),
                connection_id: reconnect,
                room_id,
                nickname: "ann".to_owned(),
                player_id: Some(ann_id),
            })
            .await
            .unwrap();

        let types = h.notifier.event_types_for(reconnect);
        assert_eq!(types.last().map(String::as_str), Some("room.game_ended"));
        assert!(!types.iter().any(|t| t == "room.turn_started"));
    }

    // --- teardown / play again ---

    #[tokio::test]
    async fn test_disconnect_in_lobby_releases_seat() {
        let h = harness(Arc::new(RecordingStoryRepository::new()));
        let (room_id, ann) = h.create("ann");
        let bob = h.join(room_id, "bob").await;

        h.registry
            .handle_disconnect(&Disconnect {
                correlation_id: Uuid::new_v4(),
                connection_id: bob,
            })
            .await;

        let roster = h.notifier.last_payload(ann, "room.lobby_roster_changed").unwrap();
        assert_eq!(roster["roster"], serde_json::json!(["ann"]));
        let view = h.registry.get_room(room_id).await.unwrap();
        assert_eq!(view.roster, vec!["ann"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_disconnect_tears_down_room() {
        let repo = Arc::new(RecordingStoryRepository::new());
        let h = harness(Arc::clone(&repo) as Arc<dyn StoryRepository>);
        let (room_id, ann, bob) = h.two_player_game(2, 2).await;

        for conn in [ann, bob] {
            h.registry
                .handle_disconnect(&Disconnect {
                    correlation_id: Uuid::new_v4(),
                    connection_id: conn,
                })
                .await;
        }
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert_eq!(h.registry.room_count(), 0);
        assert!(matches!(
            h.registry.get_room(room_id).await,
            Err(DomainError::RoomNotFound(_))
        ));
        assert_eq!(repo.calls().last(), Some(&RepositoryCall::Delete(room_id)));
        assert_eq!(repo.append_count(), 0);
    }

    #[tokio::test]
    async fn test_handle_play_again_resets_room_around_presser() {
        let repo = Arc::new(RecordingStoryRepository::new());
        let h = harness(Arc::clone(&repo) as Arc<dyn StoryRepository>);
        let (room_id, ann, bob) = h.two_player_game(1, 1).await;
        h.type_text(room_id, ann, "a ").await;
        h.type_text(room_id, bob, "b ").await;
        let bob_id = h.registry.get_room(room_id).await.unwrap().player_ids[1];
        h.notifier.clear();

        h.registry
            .handle_play_again(&PlayAgain {
                correlation_id: Uuid::new_v4(),
                connection_id: bob,
                room_id,
                player_id: bob_id,
                nickname: "bob".to_owned(),
            })
            .await
            .unwrap();

        assert_eq!(
            h.notifier.event_types_for(bob),
            vec!["room.game_reset", "room.joined"]
        );
        assert_eq!(
            h.notifier.event_types_for(ann),
            vec!["room.game_reset", "room.room_recreated"]
        );
        let view = h.registry.get_room(room_id).await.unwrap();
        assert_eq!(view.phase, "lobby");
        assert_eq!(view.roster, vec!["bob"]);
        assert_eq!(view.player_ids, vec![bob_id]);
        assert_eq!(repo.record(room_id).unwrap().story, "");

        // The other member can take a fresh seat in the reset lobby.
        h.registry
            .handle_join_room(&JoinRoom {
                correlation_id: Uuid::new_v4(),
                connection_id: ann,
                room_id,
                nickname: "ann".to_owned(),
                player_id: Some(PlayerId::new()),
            })
            .await
            .unwrap();
        let view = h.registry.get_room(room_id).await.unwrap();
        assert_eq!(view.roster, vec!["bob", "ann"]);
    }
}
