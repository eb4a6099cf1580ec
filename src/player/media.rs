//! Media handle abstraction used by the playback controller.
//!
//! A backend opens a handle immediately and reports load readiness (or
//! failure) later through a channel. Each open is tagged with a generation
//! number so the controller can drop messages from sessions it has already
//! replaced.

use std::sync::mpsc::Sender;
use std::time::Duration;

use anyhow::Result;

pub type Generation = u64;

#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// The stream is decoded and can start playing.
    Ready { duration: Option<Duration> },
    /// Loading or playback failed.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MediaMessage {
    pub generation: Generation,
    pub event: MediaEvent,
}

pub type MediaSender = Sender<MediaMessage>;

pub trait MediaHandle {
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
    fn is_paused(&self) -> bool;
    /// Elapsed playback position.
    fn position(&self) -> Duration;
    /// Total length if the decoder knows it.
    fn duration(&self) -> Option<Duration>;
    fn seek_to(&mut self, position: Duration) -> Result<()>;
    /// True once a loaded stream has played to its end.
    fn is_finished(&self) -> bool;
    /// Put a finished stream back at the start, paused, without fetching it again.
    fn rewind(&mut self) -> Result<()>;
}

pub trait MediaBackend {
    type Handle: MediaHandle;

    /// Start loading `stream_url`. The returned handle is not playable until
    /// a `Ready` message with the same generation has been sent on `events`.
    fn open(
        &mut self,
        stream_url: &str,
        events: MediaSender,
        generation: Generation,
    ) -> Result<Self::Handle>;
}
