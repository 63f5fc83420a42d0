//! Aggregate root for the story room context.

use std::fmt;

use awful_authors_core::aggregate::AggregateRoot;
use awful_authors_core::clock::Clock;
use awful_authors_core::error::DomainError;
use awful_authors_core::event::EventMetadata;
use awful_authors_core::ids::{ConnectionId, PlayerId, RoomId};
use awful_authors_core::repository::StoryRecord;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::contribution::{ContributionStream, PlayerIndex};
use super::events::{
    Audience, GameConfigured, GameEnded, GameReset, GameStarted, JoinedRoom, KeyApplied,
    LobbyRosterChanged, LobbySettingChanged, PersistenceWarning, RecoveryState, RoomEvent,
    RoomEventKind, RoomRecreated, RoundEnded, SessionResumed, TurnStarted,
};
use super::keys::{self, ERASE, Keystroke, WORD_BOUNDARY};
use super::settings::{GameRules, ROUND_COUNT_RANGE, WORD_COUNT_RANGE};

/// A seat in the room, in join order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Player {
    /// Stable seat identifier.
    pub id: PlayerId,
    /// Display name.
    pub nickname: String,
    /// Characters typed in the current turn.
    pub char_count: u32,
    /// Word boundaries typed in the current turn.
    pub space_count: u32,
}

impl Player {
    fn new(id: PlayerId, nickname: String) -> Self {
        Self {
            id,
            nickname,
            char_count: 0,
            space_count: 0,
        }
    }

    fn reset_turn_counters(&mut self) {
        self.char_count = 0;
        self.space_count = 0;
    }
}

/// Room lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Accepting players.
    Lobby,
    /// Parameters fixed, waiting for the start.
    Configured,
    /// Turns are being written.
    Playing,
    /// All rounds written.
    Finished,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lobby => "lobby",
            Self::Configured => "configured",
            Self::Playing => "playing",
            Self::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// Identifies one turn. Expiries carrying an older token are stale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TurnToken(u64);

impl TurnToken {
    fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for TurnToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A turn waiting for its deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnSchedule {
    /// The turn to expire.
    pub turn: TurnToken,
    /// When it expires.
    pub deadline: DateTime<Utc>,
}

/// What follows a completed turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextTurn {
    /// Another writer's turn has begun.
    Scheduled(TurnSchedule),
    /// That was the last turn of the last round.
    GameOver,
}

/// The result of completing a turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnCompletion {
    /// The writer whose turn ended.
    pub author: PlayerIndex,
    /// The text written during the turn.
    pub fragment: String,
    /// Author tags for the words the turn completed.
    pub contribution: ContributionStream,
    /// What happens next.
    pub next: NextTurn,
}

/// Whether a join claims an existing seat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    /// A newcomer.
    New,
    /// A known seat reconnecting.
    Rejoin(PlayerId),
}

/// The result of a successful join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JoinResult {
    /// The seat bound to the connection.
    pub player_id: PlayerId,
    /// Whether an existing seat was recovered.
    pub rejoined: bool,
    /// Whether the caller must replay the stored story to the connection.
    pub needs_recovery: bool,
}

/// The result of a connection leaving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The connection was not in the room.
    NotMember,
    /// The last connection left; the room should be torn down.
    RoomEmpty,
    /// A lobby seat was given up.
    SeatReleased(PlayerId),
    /// The connection left; seats are kept for reconnection.
    Left,
}

/// The result of a keystroke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The key had no effect.
    Ignored,
    /// The key changed the round buffer.
    Applied,
    /// The key met the quota and ended the turn.
    TurnCompleted(TurnCompletion),
}

/// The aggregate root for a story room.
#[derive(Debug)]
pub struct RoomSession {
    /// Aggregate identifier, also the shareable room code.
    pub id: RoomId,
    /// Events raised so far.
    pub(crate) version: i64,
    rules: GameRules,
    /// Seats in join order, which is also turn order.
    pub(crate) players: Vec<Player>,
    /// Live connections and the seat each is bound to.
    connections: Vec<(ConnectionId, Option<PlayerId>)>,
    /// Current per-turn word quota, including any grace word.
    pub(crate) word_limit: Option<u32>,
    round_limit: Option<u32>,
    prompt: String,
    /// Completed rounds.
    pub(crate) current_round: u32,
    /// Active writer; `None` until play starts.
    pub(crate) current_player_index: Option<usize>,
    /// Text typed in the current turn.
    pub(crate) current_round_story: String,
    /// Whether the quota carries a grace word to take back next turn.
    pub(crate) pending_quota_adjustment: bool,
    /// Whether the story text ends inside a word.
    story_tail_open: bool,
    game_over: bool,
    deadline: Option<DateTime<Utc>>,
    turn: TurnToken,
    transcript_story: String,
    transcript_contribution: ContributionStream,
    uncommitted_events: Vec<RoomEvent>,
}

impl RoomSession {
    fn empty(id: RoomId, rules: GameRules) -> Self {
        Self {
            id,
            version: 0,
            rules,
            players: Vec::new(),
            connections: Vec::new(),
            word_limit: None,
            round_limit: None,
            prompt: String::new(),
            current_round: 0,
            current_player_index: None,
            current_round_story: String::new(),
            pending_quota_adjustment: false,
            story_tail_open: false,
            game_over: false,
            deadline: None,
            turn: TurnToken::default(),
            transcript_story: String::new(),
            transcript_contribution: ContributionStream::default(),
            uncommitted_events: Vec::new(),
        }
    }

    /// Creates a room with `host` in the first seat, producing a
    /// `JoinedRoom` event for the host's connection.
    #[must_use]
    pub fn create(
        id: RoomId,
        host: PlayerId,
        nickname: String,
        connection: ConnectionId,
        rules: GameRules,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Self {
        let mut room = Self::empty(id, rules);
        room.players.push(Player::new(host, nickname));
        room.connections.push((connection, Some(host)));
        room.raise_joined(connection, host, correlation_id, clock);
        room
    }

    /// Starts a fresh game in the same room with the presser as the only
    /// seat. Every live connection stays in the room; the others must
    /// join again to take a seat.
    #[must_use]
    pub fn restart(
        &self,
        player_id: PlayerId,
        nickname: String,
        connection: ConnectionId,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Self {
        let mut room = Self::empty(self.id, self.rules);
        room.version = self.version;
        room.turn = self.turn;
        room.players.push(Player::new(player_id, nickname));
        room.connections = self.connections.iter().map(|(c, _)| (*c, None)).collect();
        room.bind(connection, player_id);

        room.raise(
            Audience::Room,
            RoomEventKind::GameReset(GameReset { room_id: room.id }),
            correlation_id,
            clock,
        );
        room.raise_joined(connection, player_id, correlation_id, clock);
        room.raise(
            Audience::RoomExcept(connection),
            RoomEventKind::RoomRecreated(RoomRecreated { room_id: room.id }),
            correlation_id,
            clock,
        );
        room
    }

    // --- queries ---

    /// Current lifecycle phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        if self.game_over {
            Phase::Finished
        } else if self.current_player_index.is_some() {
            Phase::Playing
        } else if self.word_limit.is_some() {
            Phase::Configured
        } else {
            Phase::Lobby
        }
    }

    /// Rules this room was created with.
    #[must_use]
    pub fn rules(&self) -> GameRules {
        self.rules
    }

    /// Seats in turn order.
    #[must_use]
    pub fn players(&self) -> &[Player] {
        &self.players
    }

    /// Nicknames in turn order.
    #[must_use]
    pub fn roster(&self) -> Vec<String> {
        self.players.iter().map(|p| p.nickname.clone()).collect()
    }

    /// Seat identifiers in turn order.
    #[must_use]
    pub fn player_ids(&self) -> Vec<PlayerId> {
        self.players.iter().map(|p| p.id).collect()
    }

    /// Current per-turn quota.
    #[must_use]
    pub fn word_limit(&self) -> Option<u32> {
        self.word_limit
    }

    /// Rounds to play.
    #[must_use]
    pub fn round_limit(&self) -> Option<u32> {
        self.round_limit
    }

    /// The configured prompt.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Completed rounds.
    #[must_use]
    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    /// Text typed in the current turn.
    #[must_use]
    pub fn current_round_story(&self) -> &str {
        &self.current_round_story
    }

    /// Whether the quota currently includes a grace word.
    #[must_use]
    pub fn pending_quota_adjustment(&self) -> bool {
        self.pending_quota_adjustment
    }

    /// Whether all rounds have been written.
    #[must_use]
    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    /// Deadline of the running turn.
    #[must_use]
    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    /// Token of the most recently started turn.
    #[must_use]
    pub fn current_turn(&self) -> TurnToken {
        self.turn
    }

    /// The writer holding the running turn.
    #[must_use]
    pub fn active_player_id(&self) -> Option<PlayerId> {
        if self.game_over {
            return None;
        }
        self.current_player_index
            .and_then(|i| self.players.get(i))
            .map(|p| p.id)
    }

    /// Live connections in the room.
    #[must_use]
    pub fn connection_ids(&self) -> Vec<ConnectionId> {
        self.connections.iter().map(|(c, _)| *c).collect()
    }

    /// Whether `connection` is in the room.
    #[must_use]
    pub fn is_member(&self, connection: ConnectionId) -> bool {
        self.connections.iter().any(|(c, _)| *c == connection)
    }

    /// The seat `connection` is bound to.
    #[must_use]
    pub fn player_for(&self, connection: ConnectionId) -> Option<PlayerId> {
        self.connections
            .iter()
            .find(|(c, _)| *c == connection)
            .and_then(|(_, p)| *p)
    }

    /// The story as written so far in this process, used when the stored
    /// record cannot be read or does not hold together.
    #[must_use]
    pub fn transcript(&self) -> StoryRecord {
        StoryRecord {
            room_id: self.id,
            story: self.transcript_story.clone(),
            contribution: self.transcript_contribution.encode(),
        }
    }

    /// Resolves the connections an audience refers to.
    #[must_use]
    pub fn recipients(&self, audience: Audience) -> Vec<ConnectionId> {
        match audience {
            Audience::Room => self.connection_ids(),
            Audience::RoomExcept(excluded) => self
                .connections
                .iter()
                .map(|(c, _)| *c)
                .filter(|c| *c != excluded)
                .collect(),
            Audience::Connection(connection) => vec![connection],
        }
    }

    // --- membership ---

    /// Whether a join claims an existing seat.
    #[must_use]
    pub fn resolve_identity(&self, claimed: Option<PlayerId>) -> Identity {
        match claimed {
            Some(id) if self.players.iter().any(|p| p.id == id) => Identity::Rejoin(id),
            _ => Identity::New,
        }
    }

    /// Seats a newcomer or recovers a known seat for `connection`.
    ///
    /// A connection already seated here keeps its seat whatever it claims.
    /// A rejoin replays the room state to the connection; when play has
    /// begun the caller must follow up with [`Self::recover`].
    ///
    /// # Errors
    ///
    /// Returns `DomainError::GameAlreadyStarted` if a newcomer joins a
    /// configured room, or `DomainError::RoomFull` at capacity.
    pub fn join(
        &mut self,
        connection: ConnectionId,
        nickname: String,
        claimed: Option<PlayerId>,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<JoinResult, DomainError> {
        let identity = match self.player_for(connection) {
            Some(seated) => Identity::Rejoin(seated),
            None => self.resolve_identity(claimed),
        };
        match identity {
            Identity::Rejoin(player_id) => {
                self.bind(connection, player_id);
                let nickname = self
                    .players
                    .iter()
                    .find(|p| p.id == player_id)
                    .map(|p| p.nickname.clone())
                    .unwrap_or_default();
                self.raise(
                    Audience::Connection(connection),
                    RoomEventKind::SessionResumed(SessionResumed { nickname }),
                    correlation_id,
                    clock,
                );
                self.raise_joined(connection, player_id, correlation_id, clock);
                self.replay_progress(connection, correlation_id, clock);
                Ok(JoinResult {
                    player_id,
                    rejoined: true,
                    needs_recovery: self.current_player_index.is_some(),
                })
            }
            Identity::New => {
                if self.word_limit.is_some() {
                    return Err(DomainError::GameAlreadyStarted(self.id));
                }
                if self.players.len() >= self.rules.max_players() {
                    return Err(DomainError::RoomFull(self.id));
                }
                let player_id = PlayerId::new();
                self.players.push(Player::new(player_id, nickname));
                self.bind(connection, player_id);
                self.raise(
                    Audience::RoomExcept(connection),
                    RoomEventKind::LobbyRosterChanged(LobbyRosterChanged {
                        roster: self.roster(),
                    }),
                    correlation_id,
                    clock,
                );
                self.raise_joined(connection, player_id, correlation_id, clock);
                Ok(JoinResult {
                    player_id,
                    rejoined: false,
                    needs_recovery: false,
                })
            }
        }
    }

    /// Sends the stored story to a reconnected connection: the final
    /// results if the game is over, otherwise the story so far with the
    /// current round's text appended.
    pub fn recover(
        &mut self,
        connection: ConnectionId,
        record: &StoryRecord,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) {
        if self.game_over {
            self.raise_game_ended(Audience::Connection(connection), record, correlation_id, clock);
            return;
        }
        let kind = RoomEventKind::RecoveryState(RecoveryState {
            round: self.current_round + 1,
            story: format!("{}{}", record.story, self.current_round_story),
        });
        self.raise(Audience::Connection(connection), kind, correlation_id, clock);
    }

    /// Removes `connection` from the room. In the lobby its seat is given
    /// up as well; once a game is configured seats are kept.
    pub fn leave(
        &mut self,
        connection: ConnectionId,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> LeaveOutcome {
        let Some(position) = self.connections.iter().position(|(c, _)| *c == connection) else {
            return LeaveOutcome::NotMember;
        };
        let (_, seat) = self.connections.remove(position);
        if self.connections.is_empty() {
            return LeaveOutcome::RoomEmpty;
        }
        if self.word_limit.is_some() {
            return LeaveOutcome::Left;
        }
        let Some(player_id) = seat else {
            return LeaveOutcome::Left;
        };
        if self.connections.iter().any(|(_, p)| *p == Some(player_id)) {
            return LeaveOutcome::Left;
        }

        self.players.retain(|p| p.id != player_id);
        self.raise(
            Audience::Room,
            RoomEventKind::LobbyRosterChanged(LobbyRosterChanged {
                roster: self.roster(),
            }),
            correlation_id,
            clock,
        );
        LeaveOutcome::SeatReleased(player_id)
    }

    /// Relays a lobby setting edit to every other member.
    pub fn relay_lobby_setting(
        &mut self,
        connection: ConnectionId,
        key: String,
        value: serde_json::Value,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) {
        self.raise(
            Audience::RoomExcept(connection),
            RoomEventKind::LobbySettingChanged(LobbySettingChanged { key, value }),
            correlation_id,
            clock,
        );
    }

    // --- game flow ---

    /// Fixes the game parameters, producing a `GameConfigured` event.
    ///
    /// Configuring again before the start replaces the previous values.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidInput` for counts outside their ranges,
    /// or `DomainError::InvalidPhase` once play has started.
    pub fn configure(
        &mut self,
        word_count: u32,
        round_count: u32,
        prompt: String,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<(), DomainError> {
        if !WORD_COUNT_RANGE.contains(&word_count) || !ROUND_COUNT_RANGE.contains(&round_count) {
            return Err(DomainError::InvalidInput(format!(
                "word count must be 1-10 and round count 1-100, got {word_count} and {round_count}"
            )));
        }
        if self.current_player_index.is_some() {
            return Err(DomainError::InvalidPhase(
                "the game is already in progress".to_owned(),
            ));
        }

        self.word_limit = Some(word_count);
        self.round_limit = Some(round_count);
        self.prompt = prompt;
        self.current_round = 0;
        self.current_round_story.clear();
        self.pending_quota_adjustment = false;
        self.story_tail_open = false;
        self.transcript_story.clear();
        self.transcript_contribution = ContributionStream::default();

        let kind = self.game_configured(false);
        self.raise(Audience::Room, kind, correlation_id, clock);
        Ok(())
    }

    /// Begins play with the first seat's turn.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPhase` unless the room is configured
    /// and not yet started.
    pub fn start(
        &mut self,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<TurnSchedule, DomainError> {
        let Some(quota) = self.word_limit else {
            return Err(DomainError::InvalidPhase(
                "the game has not been configured".to_owned(),
            ));
        };
        if self.current_player_index.is_some() {
            return Err(DomainError::InvalidPhase(
                "the game has already started".to_owned(),
            ));
        }
        let Some(first) = self.players.first().map(|p| p.id) else {
            return Err(DomainError::InvalidPhase(
                "the room has no players".to_owned(),
            ));
        };

        self.current_player_index = Some(0);
        self.raise(
            Audience::Room,
            RoomEventKind::GameStarted(GameStarted {
                first_player_id: first,
            }),
            correlation_id,
            clock,
        );
        Ok(self.begin_turn(quota, correlation_id, clock))
    }

    /// Applies a keystroke from `connection`. Keys from anyone other than
    /// the active writer, or outside a running turn, are ignored.
    pub fn apply_key(
        &mut self,
        connection: ConnectionId,
        key: Keystroke,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> KeyOutcome {
        if self.game_over {
            return KeyOutcome::Ignored;
        }
        let (Some(index), Some(quota)) = (self.current_player_index, self.word_limit) else {
            return KeyOutcome::Ignored;
        };
        let Some(active) = self.players.get(index).map(|p| p.id) else {
            return KeyOutcome::Ignored;
        };
        if self.player_for(connection) != Some(active) {
            return KeyOutcome::Ignored;
        }

        let buffer = &mut self.current_round_story;
        let writer = &mut self.players[index];
        let shown = match key {
            Keystroke::Char(c) => {
                buffer.push(c);
                writer.char_count += 1;
                Some(c)
            }
            Keystroke::WordBoundary => {
                if buffer.ends_with(WORD_BOUNDARY) {
                    None
                } else {
                    buffer.push(WORD_BOUNDARY);
                    writer.char_count += 1;
                    writer.space_count += 1;
                    Some(WORD_BOUNDARY)
                }
            }
            Keystroke::ForcedLine => {
                buffer.push(WORD_BOUNDARY);
                writer.char_count += 1;
                writer.space_count += quota;
                Some(WORD_BOUNDARY)
            }
            Keystroke::Erase => {
                if writer.char_count == 0 {
                    None
                } else {
                    buffer.pop().map(|removed| {
                        if removed == WORD_BOUNDARY {
                            writer.space_count = writer.space_count.saturating_sub(1);
                        }
                        writer.char_count -= 1;
                        ERASE
                    })
                }
            }
        };
        let quota_met = writer.space_count >= quota;

        let Some(shown) = shown else {
            return KeyOutcome::Ignored;
        };
        self.raise(
            Audience::Room,
            RoomEventKind::KeyApplied(KeyApplied { key: shown }),
            correlation_id,
            clock,
        );

        if quota_met {
            return self
                .complete_turn(correlation_id, clock)
                .map_or(KeyOutcome::Applied, KeyOutcome::TurnCompleted);
        }
        KeyOutcome::Applied
    }

    /// Ends the turn whose deadline passed. Returns `None` if `turn` is no
    /// longer the running turn, so a repeated or late expiry is a no-op.
    pub fn expire_turn(
        &mut self,
        turn: TurnToken,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Option<TurnCompletion> {
        if turn != self.turn || self.deadline.is_none() {
            return None;
        }
        self.complete_turn(correlation_id, clock)
    }

    /// Ends the running turn: credits the completed words to the writer,
    /// settles the grace word, advances to the next writer and round, and
    /// either starts the next turn or finishes the game.
    ///
    /// A word left open by the previous turn is credited to whoever closes
    /// it: when this fragment opens with a word boundary, the carried word
    /// counts as one of this writer's words. Every completed story word thus
    /// gets exactly one tag.
    ///
    /// The caller persists `fragment` and `contribution` from the result.
    ///
    /// # Panics
    ///
    /// Panics if the active seat index has no tag, which room capacity
    /// rules out.
    pub fn complete_turn(
        &mut self,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Option<TurnCompletion> {
        if self.game_over {
            return None;
        }
        let (Some(index), Some(round_limit)) = (self.current_player_index, self.round_limit)
        else {
            return None;
        };
        let author = PlayerIndex::new(index).expect("room capacity keeps seat indices taggable");

        if let Some(writer) = self.players.get_mut(index) {
            writer.reset_turn_counters();
        }
        self.deadline = None;

        let fragment = std::mem::take(&mut self.current_round_story);
        let mut words = keys::completed_words(&fragment);
        if self.story_tail_open && fragment.starts_with(keys::is_word_boundary) {
            words += 1;
        }
        let mut contribution = ContributionStream::default();
        contribution.record(author, words);
        self.transcript_story.push_str(&fragment);
        self.transcript_contribution.extend(&contribution);

        if self.pending_quota_adjustment {
            self.word_limit = self.word_limit.map(|w| w.saturating_sub(1));
            self.pending_quota_adjustment = false;
        }
        if !fragment.is_empty() {
            self.story_tail_open = !fragment.ends_with(keys::is_word_boundary);
        }
        // The open word finishes next turn and counts toward that quota.
        if self.story_tail_open {
            self.word_limit = self.word_limit.map(|w| w + 1);
            self.pending_quota_adjustment = true;
        }

        let next_index = index + 1;
        if next_index >= self.players.len() {
            self.current_player_index = Some(0);
            self.current_round += 1;
            if self.current_round < round_limit {
                let kind = RoomEventKind::RoundEnded(RoundEnded {
                    next_round: self.current_round + 1,
                });
                self.raise(Audience::Room, kind, correlation_id, clock);
            }
        } else {
            self.current_player_index = Some(next_index);
        }

        let next = if self.current_round >= round_limit {
            self.game_over = true;
            NextTurn::GameOver
        } else {
            let quota = self.word_limit.unwrap_or_default();
            NextTurn::Scheduled(self.begin_turn(quota, correlation_id, clock))
        };

        Some(TurnCompletion {
            author,
            fragment,
            contribution,
            next,
        })
    }

    /// Announces the final results to the whole room.
    pub fn announce_game_over(
        &mut self,
        record: &StoryRecord,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) {
        self.raise_game_ended(Audience::Room, record, correlation_id, clock);
    }

    /// Tells the room a durable write failed.
    pub fn warn_persistence(&mut self, message: String, correlation_id: Uuid, clock: &dyn Clock) {
        self.raise(
            Audience::Room,
            RoomEventKind::PersistenceWarning(PersistenceWarning { message }),
            correlation_id,
            clock,
        );
    }

    // --- internals ---

    fn bind(&mut self, connection: ConnectionId, player_id: PlayerId) {
        match self.connections.iter_mut().find(|(c, _)| *c == connection) {
            Some((_, seat)) => *seat = Some(player_id),
            None => self.connections.push((connection, Some(player_id))),
        }
    }

    fn begin_turn(&mut self, quota: u32, correlation_id: Uuid, clock: &dyn Clock) -> TurnSchedule {
        self.turn = self.turn.next();
        let deadline = clock
            .now()
            .checked_add_signed(self.rules.turn_budget(quota))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.deadline = Some(deadline);
        if let Some(player_id) = self.active_player_id() {
            let kind = RoomEventKind::TurnStarted(TurnStarted {
                player_id,
                quota,
                deadline,
            });
            self.raise(Audience::Room, kind, correlation_id, clock);
        }
        TurnSchedule {
            turn: self.turn,
            deadline,
        }
    }

    fn replay_progress(&mut self, connection: ConnectionId, correlation_id: Uuid, clock: &dyn Clock) {
        if self.word_limit.is_none() {
            return;
        }
        let audience = Audience::Connection(connection);
        let kind = self.game_configured(true);
        self.raise(audience, kind, correlation_id, clock);

        let (Some(player_id), Some(quota), Some(deadline)) =
            (self.active_player_id(), self.word_limit, self.deadline)
        else {
            return;
        };
        self.raise(
            audience,
            RoomEventKind::GameStarted(GameStarted {
                first_player_id: player_id,
            }),
            correlation_id,
            clock,
        );
        self.raise(
            audience,
            RoomEventKind::TurnStarted(TurnStarted {
                player_id,
                quota,
                deadline,
            }),
            correlation_id,
            clock,
        );
    }

    fn game_configured(&self, is_rejoin: bool) -> RoomEventKind {
        RoomEventKind::GameConfigured(GameConfigured {
            word_count: self.word_limit.unwrap_or_default(),
            round_count: self.round_limit.unwrap_or_default(),
            prompt: self.prompt.clone(),
            roster: self.roster(),
            player_ids: self.player_ids(),
            is_rejoin,
        })
    }

    fn raise_joined(
        &mut self,
        connection: ConnectionId,
        player_id: PlayerId,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) {
        let kind = RoomEventKind::JoinedRoom(JoinedRoom {
            player_id,
            room_id: self.id,
            roster: self.roster(),
            prompt_count: self.rules.prompt_count(),
        });
        self.raise(Audience::Connection(connection), kind, correlation_id, clock);
    }

    fn raise_game_ended(
        &mut self,
        audience: Audience,
        record: &StoryRecord,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) {
        let kind = RoomEventKind::GameEnded(GameEnded {
            story: record.story.clone(),
            prompt: self.prompt.clone(),
            roster: self.roster(),
            contribution: record.contribution.clone(),
        });
        self.raise(audience, kind, correlation_id, clock);
    }

    fn raise(
        &mut self,
        audience: Audience,
        kind: RoomEventKind,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) {
        self.version += 1;
        let event = RoomEvent {
            metadata: EventMetadata {
                event_id: Uuid::new_v4(),
                event_type: kind.event_type().to_owned(),
                room_id: self.id,
                sequence_number: self.version,
                correlation_id,
                occurred_at: clock.now(),
            },
            audience,
            kind,
        };
        self.uncommitted_events.push(event);
    }
}

impl AggregateRoot for RoomSession {
    type Event = RoomEvent;

    fn aggregate_id(&self) -> RoomId {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn take_uncommitted_events(&mut self) -> Vec<Self::Event> {
        std::mem::take(&mut self.uncommitted_events)
    }
}
