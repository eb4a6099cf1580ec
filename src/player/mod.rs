//! Playback: one audio session at a time, per-song button states and
//! drag-to-seek progress bars.

pub mod controller;
pub mod media;
pub mod progress;
pub mod rodio_media;
pub mod state;

pub use controller::PlaybackController;
pub use progress::ProgressView;
pub use rodio_media::RodioBackend;
pub use state::ButtonState;
