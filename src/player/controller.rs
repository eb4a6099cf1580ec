use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use anyhow::{ensure, Result};
use log::{debug, info, warn};

use crate::api::play_url;
use crate::core::actions::UserError;
use crate::core::notice::Notice;
use crate::player::media::{
    Generation, MediaBackend, MediaEvent, MediaHandle, MediaMessage, MediaSender,
};
use crate::player::progress::{clamp_fraction, DragState, ProgressView};
use crate::player::state::{ButtonEvent, ButtonState};

struct Session<H> {
    id: String,
    handle: H,
    generation: Generation,
    known_duration: Option<Duration>,
    reported_duration: Option<Duration>,
}

impl<H: MediaHandle> Session<H> {
    fn duration(&self) -> Option<Duration> {
        self.handle
            .duration()
            .or(self.reported_duration)
            .or(self.known_duration)
    }
}

/// 单一音频会话的播放控制器。
///
/// 同一时间最多一个歌曲是 "current"。切换到新歌时，旧歌的按钮先被同步置为
/// 暂停，然后才开始加载新歌。媒体事件通过通道送达，由 [`poll`](Self::poll)
/// 在 UI 线程上统一处理。
pub struct PlaybackController<B: MediaBackend> {
    backend: B,
    base_url: String,
    current: Option<Session<B::Handle>>,
    pending: Option<Session<B::Handle>>,
    buttons: HashMap<String, ButtonState>,
    loading: HashSet<String>,
    drag: Option<DragState>,
    next_generation: Generation,
    events_tx: MediaSender,
    events_rx: Receiver<MediaMessage>,
    notices: Vec<Notice>,
}

impl<B: MediaBackend> PlaybackController<B> {
    pub fn new(backend: B, base_url: impl Into<String>) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            backend,
            base_url: base_url.into(),
            current: None,
            pending: None,
            buttons: HashMap::new(),
            loading: HashSet::new(),
            drag: None,
            next_generation: 1,
            events_tx,
            events_rx,
            notices: Vec::new(),
        }
    }

    /// 播放/暂停切换。
    ///
    /// 对当前歌曲：在播放与暂停之间翻转。对其他歌曲：若已在加载中则忽略；
    /// 否则暂停旧会话并开始加载新的流。
    pub fn toggle(&mut self, url: &str, id: &str, known_duration: Option<Duration>) {
        if self.current_id() == Some(id) {
            self.flip_current();
            return;
        }
        if self.loading.contains(id) {
            debug!("toggle {}: load already in flight", id);
            return;
        }

        self.retire_current();
        self.abandon_pending();

        let generation = self.next_generation;
        self.next_generation += 1;

        self.transition(id, ButtonEvent::Load);
        self.loading.insert(id.to_string());

        match self.open_stream(url, generation) {
            Ok(handle) => {
                self.pending = Some(Session {
                    id: id.to_string(),
                    handle,
                    generation,
                    known_duration,
                    reported_duration: None,
                });
            }
            Err(e) => self.fail(id, &format!("{:#}", e)),
        }
    }

    /// Seek the current session to `fraction` (0..=1) of its length.
    /// Returns false when `id` is not current or the length is unknown.
    pub fn seek(&mut self, id: &str, fraction: f64) -> bool {
        let Some(session) = self.current.as_mut().filter(|s| s.id == id) else {
            debug!("seek on non-current {} ignored", id);
            return false;
        };
        let Some(duration) = session.duration() else {
            debug!("seek on {} ignored: length unknown", id);
            return false;
        };

        let target = duration.mul_f64(clamp_fraction(fraction));
        match session.handle.seek_to(target) {
            Ok(()) => {
                debug!("seek {} to {:?}", id, target);
                true
            }
            Err(e) => {
                warn!("seek {} failed: {:#}", id, e);
                false
            }
        }
    }

    /// Drain media messages, then run one time tick on the current session.
    pub fn poll(&mut self) {
        while let Ok(message) = self.events_rx.try_recv() {
            self.handle_message(message);
        }
        self.tick();
    }

    /// Begin a drag on `id`'s progress bar. Ignored while another drag is active.
    pub fn pointer_down(&mut self, id: &str, fraction: f64) -> bool {
        if self.drag.is_some() {
            return false;
        }
        self.drag = Some(DragState {
            id: id.to_string(),
            fraction: clamp_fraction(fraction),
        });
        true
    }

    /// Update the drag preview. No seek happens until pointer-up.
    pub fn pointer_move(&mut self, fraction: f64) {
        if let Some(drag) = self.drag.as_mut() {
            drag.fraction = clamp_fraction(fraction);
        }
    }

    /// End the drag, seeking to `fraction` if the dragged song is still current.
    pub fn pointer_up(&mut self, fraction: f64) -> bool {
        let Some(drag) = self.drag.take() else {
            return false;
        };
        if self.current_id() != Some(drag.id.as_str()) {
            debug!("drag on {} ended after session switch", drag.id);
            return false;
        }
        self.seek(&drag.id, fraction)
    }

    /// Drop an in-progress drag without seeking. Used when the bar it belongs
    /// to disappears and will never deliver its pointer-up.
    pub fn cancel_drag(&mut self) {
        if let Some(drag) = self.drag.take() {
            debug!("drag on {} cancelled", drag.id);
        }
    }

    pub fn dragging(&self) -> Option<&DragState> {
        self.drag.as_ref()
    }

    /// Progress to render for `id`: drag preview, live session, or zero.
    ///
    /// `fallback` is used as the length when the song is not current.
    pub fn progress(&self, id: &str, fallback: Option<Duration>) -> ProgressView {
        let session = self.current.as_ref().filter(|s| s.id == id);
        let duration = session.and_then(|s| s.duration()).or(fallback);

        if let Some(drag) = self.drag.as_ref().filter(|d| d.id == id) {
            return ProgressView::at_fraction(drag.fraction, duration);
        }

        match session {
            Some(s) => ProgressView::new(s.handle.position(), duration),
            None => ProgressView::zero(duration),
        }
    }

    pub fn elapsed(&self, id: &str) -> Option<Duration> {
        self.current
            .as_ref()
            .filter(|s| s.id == id)
            .map(|s| s.handle.position())
    }

    pub fn button(&self, id: &str) -> ButtonState {
        self.buttons.get(id).copied().unwrap_or_default()
    }

    pub fn current_id(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.id.as_str())
    }

    pub fn is_loading(&self, id: &str) -> bool {
        self.loading.contains(id)
    }

    /// True while a session is loading or loaded; the frontend keeps ticking then.
    pub fn is_active(&self) -> bool {
        self.current.is_some() || self.pending.is_some()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Stop everything and drop queued media messages.
    pub fn shutdown(&mut self) {
        self.retire_current();
        self.abandon_pending();
        self.drag = None;
        while self.events_rx.try_recv().is_ok() {}
    }

    fn open_stream(&mut self, url: &str, generation: Generation) -> Result<B::Handle> {
        ensure!(!url.trim().is_empty(), "empty stream url");
        let stream_url = play_url(&self.base_url, url)?;
        info!("loading generation {} from {}", generation, stream_url);
        self.backend
            .open(&stream_url, self.events_tx.clone(), generation)
    }

    fn flip_current(&mut self) {
        let Some(session) = self.current.as_mut() else {
            return;
        };
        let id = session.id.clone();

        if session.handle.is_paused() {
            if let Err(e) = session.handle.play() {
                self.current = None;
                self.fail(&id, &format!("{:#}", e));
                return;
            }
            self.transition(&id, ButtonEvent::Resume);
        } else {
            session.handle.pause();
            self.transition(&id, ButtonEvent::Pause);
        }
    }

    fn retire_current(&mut self) {
        if let Some(mut session) = self.current.take() {
            session.handle.pause();
            self.transition(&session.id, ButtonEvent::Retire);
        }
    }

    fn abandon_pending(&mut self) {
        if let Some(mut session) = self.pending.take() {
            debug!("abandoning load of {}", session.id);
            session.handle.pause();
            self.loading.remove(&session.id);
            self.transition(&session.id, ButtonEvent::Retire);
        }
    }

    fn handle_message(&mut self, message: MediaMessage) {
        let is_pending = self
            .pending
            .as_ref()
            .is_some_and(|s| s.generation == message.generation);
        if is_pending {
            if let Some(session) = self.pending.take() {
                self.finish_load(session, message.event);
            }
            return;
        }

        let is_current = self
            .current
            .as_ref()
            .is_some_and(|s| s.generation == message.generation);
        match message.event {
            MediaEvent::Failed(reason) if is_current => {
                if let Some(session) = self.current.take() {
                    self.fail(&session.id, &reason);
                }
            }
            _ => debug!("dropping stale media message (generation {})", message.generation),
        }
    }

    fn finish_load(&mut self, mut session: Session<B::Handle>, event: MediaEvent) {
        self.loading.remove(&session.id);

        match event {
            MediaEvent::Ready { duration } => {
                session.reported_duration = duration;
                if let Err(e) = session.handle.play() {
                    self.fail(&session.id, &format!("{:#}", e));
                    return;
                }
                info!("playing {}", session.id);
                self.transition(&session.id, ButtonEvent::Ready);
                self.current = Some(session);
            }
            MediaEvent::Failed(reason) => self.fail(&session.id, &reason),
        }
    }

    fn tick(&mut self) {
        let Some(session) = self.current.as_ref() else {
            return;
        };
        let id = session.id.clone();
        let finished = session.handle.is_finished();
        let paused = session.handle.is_paused();

        if finished {
            info!("{} finished", id);
            if let Some(session) = self.current.as_mut() {
                session.handle.pause();
                if let Err(e) = session.handle.rewind() {
                    // Not replayable in place; the next toggle loads it again.
                    warn!("cannot rewind {}: {:#}", id, e);
                    self.current = None;
                }
            }
            self.transition(&id, ButtonEvent::Ended);
            return;
        }

        // Follow pauses/resumes that did not come from toggle().
        match (self.button(&id), paused) {
            (ButtonState::Playing, true) => self.transition(&id, ButtonEvent::Pause),
            (ButtonState::Paused, false) => self.transition(&id, ButtonEvent::Resume),
            _ => {}
        }
    }

    fn fail(&mut self, id: &str, reason: &str) {
        warn!("playback of {} failed: {}", id, reason);
        self.loading.remove(id);
        self.transition(id, ButtonEvent::Fail);
        self.notices.push(Notice::from(UserError::PlaybackFailed));
    }

    fn transition(&mut self, id: &str, event: ButtonEvent) {
        let state = self.button(id);
        match state.on(event) {
            Some(next) => {
                debug!("{}: {:?} -> {:?} on {:?}", id, state, next, event);
                self.buttons.insert(id.to_string(), next);
            }
            None => debug!("{}: {:?} ignored in {:?}", id, event, state),
        }
    }
}

impl<B: MediaBackend> Drop for PlaybackController<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use anyhow::{bail, Result};

    use super::*;
    use crate::core::notice::NoticeKind;

    #[derive(Debug, Default)]
    struct FakeMedia {
        paused: bool,
        position: Duration,
        duration: Option<Duration>,
        finished: bool,
        fail_play: bool,
        fail_rewind: bool,
        seeks: Vec<Duration>,
        rewinds: usize,
    }

    struct FakeHandle(Rc<RefCell<FakeMedia>>);

    impl MediaHandle for FakeHandle {
        fn play(&mut self) -> Result<()> {
            let mut m = self.0.borrow_mut();
            if m.fail_play {
                bail!("device lost");
            }
            m.paused = false;
            Ok(())
        }

        fn pause(&mut self) {
            self.0.borrow_mut().paused = true;
        }

        fn is_paused(&self) -> bool {
            self.0.borrow().paused
        }

        fn position(&self) -> Duration {
            self.0.borrow().position
        }

        fn duration(&self) -> Option<Duration> {
            self.0.borrow().duration
        }

        fn seek_to(&mut self, position: Duration) -> Result<()> {
            let mut m = self.0.borrow_mut();
            m.position = position;
            m.seeks.push(position);
            Ok(())
        }

        fn is_finished(&self) -> bool {
            self.0.borrow().finished
        }

        fn rewind(&mut self) -> Result<()> {
            let mut m = self.0.borrow_mut();
            if m.fail_rewind {
                bail!("source gone");
            }
            m.position = Duration::ZERO;
            m.finished = false;
            m.rewinds += 1;
            Ok(())
        }
    }

    struct Opened {
        url: String,
        generation: Generation,
        events: MediaSender,
        media: Rc<RefCell<FakeMedia>>,
    }

    #[derive(Clone, Default)]
    struct FakeBackend {
        opened: Rc<RefCell<Vec<Opened>>>,
    }

    impl FakeBackend {
        fn media(&self, index: usize) -> Rc<RefCell<FakeMedia>> {
            self.opened.borrow()[index].media.clone()
        }

        fn send(&self, index: usize, event: MediaEvent) {
            let opened = self.opened.borrow();
            let o = &opened[index];
            o.events
                .send(MediaMessage {
                    generation: o.generation,
                    event,
                })
                .unwrap();
        }

        fn ready(&self, index: usize) {
            self.send(index, MediaEvent::Ready { duration: None });
        }
    }

    impl MediaBackend for FakeBackend {
        type Handle = FakeHandle;

        fn open(
            &mut self,
            stream_url: &str,
            events: MediaSender,
            generation: Generation,
        ) -> Result<FakeHandle> {
            let media = Rc::new(RefCell::new(FakeMedia {
                paused: true,
                ..Default::default()
            }));
            self.opened.borrow_mut().push(Opened {
                url: stream_url.to_string(),
                generation,
                events,
                media: media.clone(),
            });
            Ok(FakeHandle(media))
        }
    }

    fn controller() -> (PlaybackController<FakeBackend>, FakeBackend) {
        let backend = FakeBackend::default();
        let ctl = PlaybackController::new(backend.clone(), "http://backend");
        (ctl, backend)
    }

    fn secs(s: u64) -> Option<Duration> {
        Some(Duration::from_secs(s))
    }

    #[test]
    fn test_toggle_new_id_loads_then_plays() {
        let (mut ctl, backend) = controller();

        ctl.toggle("https://cdn/a.mp3", "a", secs(180));
        assert_eq!(ctl.button("a"), ButtonState::Loading);
        assert!(ctl.is_loading("a"));
        assert_eq!(ctl.current_id(), None);
        assert_eq!(
            backend.opened.borrow()[0].url,
            "http://backend/api/play?url=https%3A%2F%2Fcdn%2Fa.mp3"
        );

        backend.ready(0);
        ctl.poll();

        assert_eq!(ctl.button("a"), ButtonState::Playing);
        assert_eq!(ctl.current_id(), Some("a"));
        assert!(!ctl.is_loading("a"));
        assert!(!backend.media(0).borrow().paused);
    }

    #[test]
    fn test_switching_songs_pauses_previous() {
        let (mut ctl, backend) = controller();
        ctl.toggle("https://cdn/a.mp3", "a", secs(180));
        backend.ready(0);
        ctl.poll();

        ctl.toggle("https://cdn/b.mp3", "b", secs(200));
        // Old button is paused before the new load completes.
        assert_eq!(ctl.button("a"), ButtonState::Paused);
        assert!(backend.media(0).borrow().paused);
        assert_eq!(ctl.button("b"), ButtonState::Loading);

        backend.ready(1);
        ctl.poll();

        assert_eq!(ctl.button("a"), ButtonState::Paused);
        assert_eq!(ctl.button("b"), ButtonState::Playing);
        assert_eq!(ctl.current_id(), Some("b"));
    }

    #[test]
    fn test_toggle_same_id_alternates() {
        let (mut ctl, backend) = controller();
        ctl.toggle("https://cdn/a.mp3", "a", secs(180));
        backend.ready(0);
        ctl.poll();

        let expected = [
            ButtonState::Paused,
            ButtonState::Playing,
            ButtonState::Paused,
            ButtonState::Playing,
        ];
        for state in expected {
            ctl.toggle("https://cdn/a.mp3", "a", secs(180));
            ctl.poll();
            assert_eq!(ctl.button("a"), state);
        }
        assert_eq!(backend.opened.borrow().len(), 1);
    }

    #[test]
    fn test_duplicate_load_rejected() {
        let (mut ctl, backend) = controller();
        ctl.toggle("https://cdn/a.mp3", "a", None);
        ctl.toggle("https://cdn/a.mp3", "a", None);
        assert_eq!(backend.opened.borrow().len(), 1);
        assert_eq!(ctl.button("a"), ButtonState::Loading);
    }

    #[test]
    fn test_superseded_load_is_abandoned() {
        let (mut ctl, backend) = controller();
        ctl.toggle("https://cdn/a.mp3", "a", None);
        ctl.toggle("https://cdn/b.mp3", "b", None);

        assert_eq!(ctl.button("a"), ButtonState::Idle);
        assert!(!ctl.is_loading("a"));

        // A late readiness signal from the abandoned stream changes nothing.
        backend.ready(0);
        backend.ready(1);
        ctl.poll();

        assert_eq!(ctl.button("a"), ButtonState::Idle);
        assert!(backend.media(0).borrow().paused);
        assert_eq!(ctl.current_id(), Some("b"));
    }

    #[test]
    fn test_seek_halfway_updates_label() {
        let (mut ctl, backend) = controller();
        ctl.toggle("https://cdn/123.mp3", "123", secs(180));
        backend.ready(0);
        ctl.poll();

        assert!(ctl.seek("123", 0.5));
        assert_eq!(ctl.elapsed("123"), secs(90));

        let view = ctl.progress("123", None);
        assert_eq!(view.label, "01:30 / 03:00");
        assert_eq!(view.percent, 50.0);
    }

    #[test]
    fn test_seek_prefers_decoder_duration() {
        let (mut ctl, backend) = controller();
        ctl.toggle("https://cdn/a.mp3", "a", secs(180));
        backend.send(0, MediaEvent::Ready { duration: secs(200) });
        ctl.poll();

        ctl.seek("a", 0.25);
        assert_eq!(ctl.elapsed("a"), secs(50));
    }

    #[test]
    fn test_seek_non_current_is_noop() {
        let (mut ctl, backend) = controller();
        ctl.toggle("https://cdn/a.mp3", "a", secs(180));
        backend.ready(0);
        ctl.poll();

        assert!(!ctl.seek("b", 0.5));
        assert!(backend.media(0).borrow().seeks.is_empty());
        assert_eq!(ctl.elapsed("a"), secs(0));
        assert_eq!(ctl.button("a"), ButtonState::Playing);
    }

    #[test]
    fn test_error_only_affects_failing_id() {
        let (mut ctl, backend) = controller();
        ctl.toggle("https://cdn/a.mp3", "a", None);
        backend.ready(0);
        ctl.poll();
        ctl.toggle("https://cdn/b.mp3", "b", None);
        backend.ready(1);
        ctl.poll();

        ctl.toggle("https://cdn/x.mp3", "x", None);
        backend.send(2, MediaEvent::Failed("404".to_string()));
        ctl.poll();

        assert_eq!(ctl.button("x"), ButtonState::Error);
        assert_eq!(ctl.button("a"), ButtonState::Paused);
        assert_eq!(ctl.button("b"), ButtonState::Paused);
        assert!(!ctl.is_loading("x"));

        let notices = ctl.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, NoticeKind::Error);
        assert_eq!(notices[0].message, "播放失败，请稍后重试");
        assert!(ctl.take_notices().is_empty());
    }

    #[test]
    fn test_error_is_retryable() {
        let (mut ctl, backend) = controller();
        ctl.toggle("https://cdn/x.mp3", "x", None);
        backend.send(0, MediaEvent::Failed("reset".to_string()));
        ctl.poll();
        assert_eq!(ctl.button("x"), ButtonState::Error);

        ctl.toggle("https://cdn/x.mp3", "x", None);
        assert_eq!(ctl.button("x"), ButtonState::Loading);
        backend.ready(1);
        ctl.poll();
        assert_eq!(ctl.button("x"), ButtonState::Playing);
    }

    #[test]
    fn test_failure_during_playback() {
        let (mut ctl, backend) = controller();
        ctl.toggle("https://cdn/a.mp3", "a", None);
        backend.ready(0);
        ctl.poll();

        backend.send(0, MediaEvent::Failed("decoder".to_string()));
        ctl.poll();

        assert_eq!(ctl.button("a"), ButtonState::Error);
        assert_eq!(ctl.current_id(), None);
    }

    #[test]
    fn test_play_failure_on_ready_marks_error() {
        let (mut ctl, backend) = controller();
        ctl.toggle("https://cdn/a.mp3", "a", None);
        backend.media(0).borrow_mut().fail_play = true;
        backend.ready(0);
        ctl.poll();

        assert_eq!(ctl.button("a"), ButtonState::Error);
        assert_eq!(ctl.current_id(), None);
    }

    #[test]
    fn test_empty_url_fails_without_opening() {
        let (mut ctl, backend) = controller();
        ctl.toggle("", "a", None);
        assert!(backend.opened.borrow().is_empty());
        assert_eq!(ctl.button("a"), ButtonState::Error);
        assert!(!ctl.is_loading("a"));
        assert_eq!(ctl.take_notices().len(), 1);
    }

    #[test]
    fn test_ended_pauses_and_resets_progress() {
        let (mut ctl, backend) = controller();
        ctl.toggle("https://cdn/a.mp3", "a", secs(180));
        backend.ready(0);
        ctl.poll();
        backend.media(0).borrow_mut().position = Duration::from_secs(180);

        backend.media(0).borrow_mut().finished = true;
        ctl.poll();

        assert_eq!(ctl.button("a"), ButtonState::Paused);
        assert_eq!(ctl.current_id(), Some("a"));
        assert_eq!(backend.media(0).borrow().rewinds, 1);
        assert!(backend.media(0).borrow().paused);
        let view = ctl.progress("a", secs(180));
        assert_eq!(view.percent, 0.0);
        assert_eq!(view.label, "00:00 / 03:00");

        // Still the current session: seeking and replay work without a reload.
        assert!(ctl.seek("a", 0.5));
        assert_eq!(ctl.elapsed("a"), secs(90));
        ctl.toggle("https://cdn/a.mp3", "a", secs(180));
        ctl.poll();
        assert_eq!(ctl.button("a"), ButtonState::Playing);
        assert_eq!(backend.opened.borrow().len(), 1);
    }

    #[test]
    fn test_ended_without_rewind_reloads_on_toggle() {
        let (mut ctl, backend) = controller();
        ctl.toggle("https://cdn/a.mp3", "a", secs(180));
        backend.ready(0);
        ctl.poll();

        {
            let media = backend.media(0);
            let mut m = media.borrow_mut();
            m.fail_rewind = true;
            m.finished = true;
        }
        ctl.poll();

        assert_eq!(ctl.button("a"), ButtonState::Paused);
        assert_eq!(ctl.current_id(), None);
        assert_eq!(ctl.progress("a", secs(180)).percent, 0.0);

        ctl.toggle("https://cdn/a.mp3", "a", secs(180));
        assert_eq!(ctl.button("a"), ButtonState::Loading);
        assert_eq!(backend.opened.borrow().len(), 2);
    }

    #[test]
    fn test_native_pause_and_resume_followed() {
        let (mut ctl, backend) = controller();
        ctl.toggle("https://cdn/a.mp3", "a", None);
        backend.ready(0);
        ctl.poll();

        backend.media(0).borrow_mut().paused = true;
        ctl.poll();
        assert_eq!(ctl.button("a"), ButtonState::Paused);

        backend.media(0).borrow_mut().paused = false;
        ctl.poll();
        assert_eq!(ctl.button("a"), ButtonState::Playing);
    }

    #[test]
    fn test_drag_previews_then_commits_on_release() {
        let (mut ctl, backend) = controller();
        ctl.toggle("https://cdn/a.mp3", "a", secs(100));
        backend.ready(0);
        ctl.poll();

        assert!(ctl.pointer_down("a", 0.1));
        ctl.pointer_move(0.4);
        let preview = ctl.progress("a", None);
        assert_eq!(preview.percent, 40.0);
        assert_eq!(preview.label, "00:40 / 01:40");
        assert!(backend.media(0).borrow().seeks.is_empty());

        ctl.pointer_move(1.5);
        assert_eq!(ctl.progress("a", None).percent, 100.0);

        // The release coordinate wins over the last move.
        assert!(ctl.pointer_up(0.6));
        assert_eq!(ctl.elapsed("a"), secs(60));
        assert!(ctl.dragging().is_none());
    }

    #[test]
    fn test_second_drag_ignored_until_release() {
        let (mut ctl, _backend) = controller();
        assert!(ctl.pointer_down("a", 0.2));
        assert!(!ctl.pointer_down("b", 0.8));
        assert_eq!(ctl.dragging().unwrap().id, "a");

        ctl.pointer_up(0.2);
        assert!(ctl.pointer_down("b", 0.8));
    }

    #[test]
    fn test_cancelled_drag_frees_the_pointer() {
        let (mut ctl, backend) = controller();
        ctl.toggle("https://cdn/a.mp3", "a", secs(100));
        backend.ready(0);
        ctl.poll();

        // The bar for "old-card" vanished mid-drag and never reports pointer-up.
        assert!(ctl.pointer_down("old-card", 0.3));
        ctl.toggle("https://cdn/b.mp3", "b", secs(100));
        backend.ready(1);
        ctl.poll();
        assert!(!ctl.pointer_down("b", 0.5));

        ctl.cancel_drag();
        assert!(ctl.dragging().is_none());
        assert!(ctl.pointer_down("b", 0.5));
        assert!(ctl.pointer_up(0.5));
        assert_eq!(ctl.elapsed("b"), secs(50));
        assert!(backend.media(0).borrow().seeks.is_empty());
    }

    #[test]
    fn test_drag_commit_after_session_switch_is_dropped() {
        let (mut ctl, backend) = controller();
        ctl.toggle("https://cdn/a.mp3", "a", secs(100));
        backend.ready(0);
        ctl.poll();

        ctl.pointer_down("a", 0.3);
        ctl.toggle("https://cdn/b.mp3", "b", secs(100));
        backend.ready(1);
        ctl.poll();

        assert!(!ctl.pointer_up(0.9));
        assert!(backend.media(0).borrow().seeks.is_empty());
        assert!(backend.media(1).borrow().seeks.is_empty());
    }

    #[test]
    fn test_progress_for_idle_song_uses_fallback_length() {
        let (ctl, _backend) = controller();
        let view = ctl.progress("never-played", secs(125));
        assert_eq!(view.label, "00:00 / 02:05");
        assert_eq!(view.percent, 0.0);
    }

    #[test]
    fn test_shutdown_stops_current() {
        let (mut ctl, backend) = controller();
        ctl.toggle("https://cdn/a.mp3", "a", None);
        backend.ready(0);
        ctl.poll();
        ctl.toggle("https://cdn/b.mp3", "b", None);

        assert!(ctl.is_active());
        ctl.shutdown();
        assert!(!ctl.is_active());
        assert_eq!(ctl.current_id(), None);
        assert!(!ctl.is_loading("b"));
        assert!(backend.media(0).borrow().paused);
        assert!(backend.media(1).borrow().paused);
    }
}
