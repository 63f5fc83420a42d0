//! Awful Authors Core: shared domain abstractions.
//!
//! This crate defines the identifiers, traits and error types that the room
//! context, the story store and the server all depend on. It contains no
//! infrastructure code.

pub mod aggregate;
pub mod clock;
pub mod command;
pub mod error;
pub mod event;
pub mod ids;
pub mod notifier;
pub mod repository;
pub mod rng;
