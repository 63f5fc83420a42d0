//! Application services: the room registry, its command handlers, the turn
//! timer, and read-only queries.

pub mod command_handlers;
pub mod query_handlers;
pub mod registry;
pub mod turn_timer;
