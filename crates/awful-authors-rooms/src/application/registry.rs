//! The process-wide set of live rooms.
//!
//! Each room sits behind its own async mutex so that commands, timer
//! expiries and disconnects for one room run one at a time while different
//! rooms proceed independently. The map itself is only locked briefly to
//! look a room up, never across an await.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use awful_authors_core::aggregate::AggregateRoot;
use awful_authors_core::clock::Clock;
use awful_authors_core::error::DomainError;
use awful_authors_core::ids::{ConnectionId, RoomId};
use awful_authors_core::notifier::Notifier;
use awful_authors_core::repository::{StoryRecord, StoryRepository};
use awful_authors_core::rng::DeterministicRng;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::warn;

use super::turn_timer::TurnTimer;
use crate::domain::aggregates::RoomSession;
use crate::domain::contribution::ContributionStream;
use crate::domain::keys::completed_words;
use crate::domain::settings::GameRules;

/// A room and the timer driving its running turn.
#[derive(Debug)]
pub(crate) struct RoomEntry {
    pub(crate) session: RoomSession,
    pub(crate) timer: Option<TurnTimer>,
    /// Set once the room has been torn down; late lookups treat it as gone.
    pub(crate) closed: bool,
}

type SharedEntry = Arc<AsyncMutex<RoomEntry>>;

/// Owns every live room and the services rooms need.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<RoomId, SharedEntry>>,
    memberships: Mutex<HashMap<ConnectionId, HashSet<RoomId>>>,
    pub(crate) rules: GameRules,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) rng: Arc<Mutex<dyn DeterministicRng + Send>>,
    pub(crate) repository: Arc<dyn StoryRepository>,
    notifier: Arc<dyn Notifier>,
}

impl std::fmt::Debug for RoomRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomRegistry")
            .field("rules", &self.rules)
            .field("rooms", &self.room_count())
            .finish_non_exhaustive()
    }
}

impl RoomRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new(
        rules: GameRules,
        clock: Arc<dyn Clock>,
        rng: Arc<Mutex<dyn DeterministicRng + Send>>,
        repository: Arc<dyn StoryRepository>,
        notifier: Arc<dyn Notifier>,
    ) -> Arc<Self> {
        Arc::new(Self {
            rooms: RwLock::new(HashMap::new()),
            memberships: Mutex::new(HashMap::new()),
            rules,
            clock,
            rng,
            repository,
            notifier,
        })
    }

    /// Rules new rooms are created with.
    #[must_use]
    pub fn rules(&self) -> GameRules {
        self.rules
    }

    /// Number of live rooms.
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub(crate) fn insert_room(&self, session: RoomSession) {
        let id = session.id;
        let entry = Arc::new(AsyncMutex::new(RoomEntry {
            session,
            timer: None,
            closed: false,
        }));
        self.rooms
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, entry);
    }

    pub(crate) fn remove_room(&self, room_id: RoomId) {
        self.rooms
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&room_id);
    }

    /// Locks a live room.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::RoomNotFound` if the room does not exist or was
    /// torn down while the caller waited for the lock.
    pub(crate) async fn lock_room(
        &self,
        room_id: RoomId,
    ) -> Result<OwnedMutexGuard<RoomEntry>, DomainError> {
        let entry = self
            .rooms
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&room_id)
            .cloned()
            .ok_or(DomainError::RoomNotFound(room_id))?;
        let guard = entry.lock_owned().await;
        if guard.closed {
            return Err(DomainError::RoomNotFound(room_id));
        }
        Ok(guard)
    }

    pub(crate) fn track(&self, connection: ConnectionId, room_id: RoomId) {
        self.memberships
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(connection)
            .or_default()
            .insert(room_id);
    }

    pub(crate) fn untrack_all(&self, connection: ConnectionId) -> Vec<RoomId> {
        self.memberships
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&connection)
            .map(|rooms| rooms.into_iter().collect())
            .unwrap_or_default()
    }

    /// Hands every pending event to the notifier, resolving audiences
    /// against the room's current connections.
    pub(crate) fn publish(&self, session: &mut RoomSession) {
        for event in session.take_uncommitted_events() {
            for recipient in session.recipients(event.audience) {
                self.notifier.notify(recipient, &event);
            }
        }
    }

    /// Reads the stored story, falling back to the in-memory transcript when
    /// the store is unavailable, has no record, or holds a record whose tags
    /// do not match its words.
    pub(crate) async fn load_record(&self, session: &RoomSession) -> StoryRecord {
        match self.repository.load(session.id).await {
            Ok(Some(record)) => match check_record(&record) {
                Ok(()) => record,
                Err(err) => {
                    warn!(
                        room_id = %session.id,
                        error = %err,
                        "stored story is inconsistent; using in-memory transcript"
                    );
                    session.transcript()
                }
            },
            Ok(None) => {
                warn!(room_id = %session.id, "no stored story; using in-memory transcript");
                session.transcript()
            }
            Err(err) => {
                warn!(room_id = %session.id, error = %err, "story load failed; using in-memory transcript");
                session.transcript()
            }
        }
    }
}

/// A stored record must carry one valid tag per completed word.
fn check_record(record: &StoryRecord) -> Result<(), DomainError> {
    let tags = ContributionStream::parse(&record.contribution)?;
    let words = completed_words(&record.story);
    if tags.len() == words {
        Ok(())
    } else {
        Err(DomainError::InvalidInput(format!(
            "{} contribution tags for {words} words",
            tags.len()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(story: &str, contribution: &str) -> StoryRecord {
        StoryRecord {
            room_id: RoomId::new(),
            story: story.into(),
            contribution: contribution.into(),
        }
    }

    #[test]
    fn test_check_record_accepts_one_tag_per_completed_word() {
        assert!(check_record(&record("hi yo ok", "00")).is_ok());
        assert!(check_record(&record("", "")).is_ok());
    }

    #[test]
    fn test_check_record_rejects_tag_count_mismatch() {
        let err = check_record(&record("hi yo ", "011")).unwrap_err();

        assert!(
            matches!(err, DomainError::InvalidInput(msg) if msg.contains("3 contribution tags for 2 words"))
        );
    }

    #[test]
    fn test_check_record_rejects_bad_tag() {
        assert!(check_record(&record("hi ", "x")).is_err());
    }
}
