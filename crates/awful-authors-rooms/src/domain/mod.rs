//! Domain model for story rooms.

pub mod aggregates;
pub mod commands;
pub mod contribution;
pub mod events;
pub mod keys;
pub mod settings;
