//! Audio playback facade
//!
//! Entirely simulated transport state - track position, volume, shuffle and
//! repeat flags - with no decoder or streaming behind it. The facade also
//! owns the single audio output route handed to it by the connection
//! controller.

pub mod library;
pub mod playback;

pub use playback::{PlaybackService, PlaybackSnapshot};
