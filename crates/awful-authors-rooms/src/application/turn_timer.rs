//! Deadline-driven turn rotation.
//!
//! Every running turn has at most one armed timer. Arming a new one, a
//! quota-completing keystroke, play-again and room teardown all disarm the
//! previous timer, and each expiry carries the token of the turn it was
//! armed for so a late expiry is ignored by the aggregate.

use std::sync::Arc;

use awful_authors_core::ids::RoomId;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::registry::{RoomEntry, RoomRegistry};
use crate::domain::aggregates::{NextTurn, RoomSession, TurnCompletion, TurnSchedule, TurnToken};

/// Handle to an armed turn timer.
#[derive(Debug)]
pub struct TurnTimer {
    turn: TurnToken,
    handle: AbortHandle,
}

impl TurnTimer {
    /// The turn this timer will expire.
    #[must_use]
    pub fn turn(&self) -> TurnToken {
        self.turn
    }

    /// Disarms the timer. Harmless if it already fired.
    pub fn cancel(self) {
        self.handle.abort();
    }
}

impl RoomRegistry {
    /// Arms a timer for `schedule`, replacing any timer already armed.
    /// Returns `false` without arming when the deadline has already passed.
    pub(crate) fn arm_turn_timer(
        self: &Arc<Self>,
        entry: &mut RoomEntry,
        schedule: TurnSchedule,
    ) -> bool {
        Self::disarm_turn_timer(entry);
        let Some(delay) = self.clock.remaining_until(schedule.deadline) else {
            return false;
        };
        let registry = Arc::clone(self);
        let room_id = entry.session.id;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            registry.handle_turn_expired(room_id, schedule.turn).await;
        })
        .abort_handle();
        entry.timer = Some(TurnTimer {
            turn: schedule.turn,
            handle,
        });
        true
    }

    pub(crate) fn disarm_turn_timer(entry: &mut RoomEntry) {
        if let Some(timer) = entry.timer.take() {
            timer.cancel();
        }
    }

    /// Runs a freshly started turn: arms its timer, or completes it on the
    /// spot if its budget is already spent.
    pub(crate) async fn run_turn(
        self: &Arc<Self>,
        entry: &mut RoomEntry,
        schedule: TurnSchedule,
        correlation_id: Uuid,
    ) {
        if self.arm_turn_timer(entry, schedule) {
            return;
        }
        let clock = Arc::clone(&self.clock);
        if let Some(completion) =
            entry
                .session
                .expire_turn(schedule.turn, correlation_id, clock.as_ref())
        {
            self.settle_turns(entry, completion, correlation_id).await;
        }
    }

    /// Persists a completed turn and carries play forward until a turn is
    /// left waiting on its timer or the game ends.
    pub(crate) async fn settle_turns(
        self: &Arc<Self>,
        entry: &mut RoomEntry,
        mut completion: TurnCompletion,
        correlation_id: Uuid,
    ) {
        let clock = Arc::clone(&self.clock);
        loop {
            self.persist_turn(&mut entry.session, &completion, correlation_id)
                .await;
            match completion.next {
                NextTurn::GameOver => {
                    Self::disarm_turn_timer(entry);
                    let record = self.load_record(&entry.session).await;
                    entry
                        .session
                        .announce_game_over(&record, correlation_id, clock.as_ref());
                    info!(room_id = %entry.session.id, "game over");
                    return;
                }
                NextTurn::Scheduled(schedule) => {
                    if self.arm_turn_timer(entry, schedule) {
                        return;
                    }
                    match entry
                        .session
                        .expire_turn(schedule.turn, correlation_id, clock.as_ref())
                    {
                        Some(next) => completion = next,
                        None => return,
                    }
                }
            }
        }
    }

    async fn persist_turn(
        &self,
        session: &mut RoomSession,
        completion: &TurnCompletion,
        correlation_id: Uuid,
    ) {
        if completion.fragment.is_empty() && completion.contribution.is_empty() {
            return;
        }
        let tags = completion.contribution.encode();
        if let Err(err) = self
            .repository
            .append(session.id, &completion.fragment, &tags)
            .await
        {
            warn!(room_id = %session.id, error = %err, "failed to persist turn; continuing");
            session.warn_persistence(err.to_string(), correlation_id, self.clock.as_ref());
        }
    }

    /// Completes the turn a timer was armed for. Stale or repeated expiries
    /// and expiries for rooms that are gone are ignored.
    #[tracing::instrument(skip(self))]
    pub async fn handle_turn_expired(self: &Arc<Self>, room_id: RoomId, turn: TurnToken) {
        let correlation_id = Uuid::new_v4();
        let Ok(mut entry) = self.lock_room(room_id).await else {
            debug!("turn expired for a room that is gone");
            return;
        };
        // This task is the armed timer; drop its handle instead of aborting it.
        if entry.timer.as_ref().is_some_and(|t| t.turn() == turn) {
            entry.timer = None;
        }
        let clock = Arc::clone(&self.clock);
        let Some(completion) = entry
            .session
            .expire_turn(turn, correlation_id, clock.as_ref())
        else {
            debug!("stale turn expiry ignored");
            return;
        };
        info!(author = %completion.author, "turn expired");
        self.settle_turns(&mut entry, completion, correlation_id).await;
        self.publish(&mut entry.session);
    }
}
