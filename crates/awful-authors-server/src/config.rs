//! Server configuration from the environment.

use std::net::SocketAddr;

use awful_authors_rooms::domain::settings::{
    DEFAULT_MAX_PLAYERS, DEFAULT_TIME_PER_WORD_MS, GameRules,
};
use chrono::TimeDelta;

use crate::error::AppError;

/// Settings read once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// PostgreSQL URL; stories are kept in memory when unset.
    pub database_url: Option<String>,
    /// Seats per room.
    pub max_players: usize,
    /// Time allotted per quota word.
    pub time_per_word: TimeDelta,
    /// OTLP collector endpoint; span export is off when unset.
    pub otlp_endpoint: Option<String>,
}

impl Config {
    /// Reads the process environment.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`, treating empty values as unset.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if a variable is present but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = var("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = match var("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| AppError::Config(format!("PORT must be a valid u16: {e}")))?,
            None => 3000,
        };
        let max_players = match var("MAX_PLAYERS") {
            Some(raw) => raw
                .parse()
                .map_err(|e| AppError::Config(format!("MAX_PLAYERS must be a number: {e}")))?,
            None => DEFAULT_MAX_PLAYERS,
        };
        let time_per_word_ms: i64 = match var("TIME_PER_WORD_MS") {
            Some(raw) => raw.parse().map_err(|e| {
                AppError::Config(format!("TIME_PER_WORD_MS must be a number: {e}"))
            })?,
            None => DEFAULT_TIME_PER_WORD_MS,
        };
        let time_per_word = TimeDelta::try_milliseconds(time_per_word_ms).ok_or_else(|| {
            AppError::Config(format!("TIME_PER_WORD_MS out of range: {time_per_word_ms}"))
        })?;

        let config = Self {
            host,
            port,
            database_url: var("DATABASE_URL"),
            max_players,
            time_per_word,
            otlp_endpoint: var("OTEL_EXPORTER_OTLP_ENDPOINT"),
        };
        config.rules()?;
        Ok(config)
    }

    /// Room rules derived from these settings.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the limits are out of range.
    pub fn rules(&self) -> Result<GameRules, AppError> {
        GameRules::new(self.max_players, self.time_per_word)
            .map_err(|e| AppError::Config(e.to_string()))
    }

    /// Address to listen on.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `host` and `port` do not form an address.
    pub fn bind_addr(&self) -> Result<SocketAddr, AppError> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| AppError::Config(format!("invalid HOST:PORT combination: {e}")))
    }
}
