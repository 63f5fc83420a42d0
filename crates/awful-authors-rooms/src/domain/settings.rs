//! Room capacity, turn budget, configuration ranges and the prompt catalog.

use awful_authors_core::error::DomainError;
use awful_authors_core::rng::DeterministicRng;
use chrono::TimeDelta;

/// Default number of seats per room.
pub const DEFAULT_MAX_PLAYERS: usize = 8;

/// Hard ceiling on seats; contribution tags are single decimal digits.
pub const MAX_PLAYERS_CEILING: usize = 10;

/// Default time allotted per quota word.
pub const DEFAULT_TIME_PER_WORD_MS: i64 = 3000;

/// Accepted range for the per-turn word quota.
pub const WORD_COUNT_RANGE: std::ops::RangeInclusive<u32> = 1..=10;

/// Largest quota a turn can carry: the configured maximum plus a grace word.
pub const MAX_TURN_QUOTA: u32 = *WORD_COUNT_RANGE.end() + 1;

/// Longest accepted time per quota word (one hour).
pub const MAX_TIME_PER_WORD_MS: i64 = 3_600_000;

/// Accepted range for the number of rounds.
pub const ROUND_COUNT_RANGE: std::ops::RangeInclusive<u32> = 1..=100;

/// Story prompts a host can pick from, by index.
pub const STORY_PROMPTS: [&str; 21] = [
    "medieval times",
    "the near future",
    "a faraway future",
    "prehistory",
    "a dangerous discovery",
    "a disturbing discovery",
    "an ancient promise",
    "a forgotten promise",
    "a lost memory",
    "loyal to a fault",
    "freedom?",
    "true courage",
    "your greatest enemy",
    "a letter never sent",
    "the wrong suspect",
    "a second chance",
    "the one that got away",
    "an unknown land",
    "a fantastical land",
    "a cold land",
    "best... enemies?",
];

/// Server-wide rules every room is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameRules {
    max_players: usize,
    time_per_word: TimeDelta,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            max_players: DEFAULT_MAX_PLAYERS,
            time_per_word: TimeDelta::milliseconds(DEFAULT_TIME_PER_WORD_MS),
        }
    }
}

impl GameRules {
    /// Builds rules from operator settings.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidInput` if `max_players` is outside
    /// `2..=10`, or `time_per_word` is negative or longer than one hour.
    pub fn new(max_players: usize, time_per_word: TimeDelta) -> Result<Self, DomainError> {
        if !(2..=MAX_PLAYERS_CEILING).contains(&max_players) {
            return Err(DomainError::InvalidInput(format!(
                "max players must be between 2 and {MAX_PLAYERS_CEILING}, got {max_players}"
            )));
        }
        if time_per_word < TimeDelta::zero() {
            return Err(DomainError::InvalidInput(
                "time per word must not be negative".to_owned(),
            ));
        }
        let longest_turn =
            time_per_word.checked_mul(i32::try_from(MAX_TURN_QUOTA).unwrap_or(i32::MAX));
        if time_per_word > TimeDelta::milliseconds(MAX_TIME_PER_WORD_MS) || longest_turn.is_none()
        {
            return Err(DomainError::InvalidInput(format!(
                "time per word must be at most {MAX_TIME_PER_WORD_MS} ms, got {} ms",
                time_per_word.num_milliseconds()
            )));
        }
        Ok(Self {
            max_players,
            time_per_word,
        })
    }

    /// Maximum seats per room.
    #[must_use]
    pub fn max_players(&self) -> usize {
        self.max_players
    }

    /// Time allotted per quota word.
    #[must_use]
    pub fn time_per_word(&self) -> TimeDelta {
        self.time_per_word
    }

    /// Length of a turn for the given word quota, saturating at
    /// `TimeDelta::MAX`.
    #[must_use]
    pub fn turn_budget(&self, quota: u32) -> TimeDelta {
        self.time_per_word
            .checked_mul(i32::try_from(quota).unwrap_or(i32::MAX))
            .unwrap_or(TimeDelta::MAX)
    }

    /// Number of prompts offered to hosts.
    #[must_use]
    pub fn prompt_count(&self) -> usize {
        STORY_PROMPTS.len()
    }
}

/// Checks a host's word and round counts against the accepted ranges.
///
/// # Errors
///
/// Returns `DomainError::InvalidInput` naming the offending field.
pub fn validate_game_settings(word_count: i64, round_count: i64) -> Result<(u32, u32), DomainError> {
    let words = u32::try_from(word_count)
        .ok()
        .filter(|n| WORD_COUNT_RANGE.contains(n))
        .ok_or_else(|| {
            DomainError::InvalidInput(format!("word count must be 1-10, got {word_count}"))
        })?;
    let rounds = u32::try_from(round_count)
        .ok()
        .filter(|n| ROUND_COUNT_RANGE.contains(n))
        .ok_or_else(|| {
            DomainError::InvalidInput(format!("round count must be 1-100, got {round_count}"))
        })?;
    Ok((words, rounds))
}

/// Resolves a host's prompt choice.
///
/// `None` picks a prompt at random. An index outside the catalog yields an
/// empty prompt rather than an error.
#[must_use]
pub fn select_prompt(index: Option<i64>, rng: &mut dyn DeterministicRng) -> String {
    let index = match index {
        Some(index) => usize::try_from(index).ok(),
        None => {
            let last = u32::try_from(STORY_PROMPTS.len() - 1).unwrap_or(u32::MAX);
            usize::try_from(rng.next_u32_range(0, last)).ok()
        }
    };
    index
        .and_then(|i| STORY_PROMPTS.get(i))
        .map(|prompt| (*prompt).to_owned())
        .unwrap_or_default()
}
