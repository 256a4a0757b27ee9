//! Mission playback for the minic commander.
//!
//! [`PlaybackScheduler`] loads, begins, times and destroys missions through
//! the console client and rotates through the catalog when a mission's time
//! is up.

pub mod error;
pub mod scheduler;
pub mod state;

pub use error::{PlaybackError, PlaybackResult};
pub use scheduler::{Completion, PlaybackScheduler, Wake};
pub use state::{time_left_str, PlaybackEvent, PlaybackStage, PlaybackState, PlaybackStatus};
