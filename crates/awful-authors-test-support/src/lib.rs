//! Shared test mocks and utilities for the Awful Authors story server.

mod clock;
mod notifier;
mod repository;
mod rng;

pub use clock::{FixedClock, fixed_now};
pub use notifier::{Delivery, RecordingNotifier};
pub use repository::{FailingStoryRepository, RecordingStoryRepository, RepositoryCall};
pub use rng::{MockRng, SequenceRng};
