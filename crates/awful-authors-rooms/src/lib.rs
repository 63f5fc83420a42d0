//! Awful Authors: story room bounded context.
//!
//! Responsible for room lifecycle, the keystroke stream that builds the
//! shared story, deadline-driven turn rotation, round and game termination,
//! and reconnection recovery.

pub mod application;
pub mod domain;
