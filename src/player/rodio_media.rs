//! `rodio` implementation of the media backend.
//!
//! The stream is fetched in full on a worker thread, decoded, and appended to
//! a paused `Sink`. Readiness is reported through the controller's channel.
//! The fetched bytes stay with the handle so a finished track can be decoded
//! again for replay.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, ensure, Context, Result};
use log::{debug, warn};
use rodio::{Decoder, OutputStream, OutputStreamBuilder, Sink, Source};

use crate::player::media::{
    Generation, MediaBackend, MediaEvent, MediaHandle, MediaMessage, MediaSender,
};

pub struct RodioBackend {
    client: reqwest::blocking::Client,
    // Opened on first use so a machine without audio output can still search.
    stream: Option<OutputStream>,
}

impl RodioBackend {
    pub fn new() -> Result<Self> {
        // No timeout: long lossless streams take a while.
        let client = reqwest::blocking::Client::builder()
            .timeout(None)
            .build()
            .context("HTTP 客户端创建失败")?;
        Ok(Self {
            client,
            stream: None,
        })
    }

    fn output(&mut self) -> Result<&OutputStream> {
        if self.stream.is_none() {
            let mut stream =
                OutputStreamBuilder::open_default_stream().context("没有可用的音频输出设备")?;
            // rodio logs to stderr when the stream is dropped.
            stream.log_on_drop(false);
            self.stream = Some(stream);
        }
        self.stream
            .as_ref()
            .ok_or_else(|| anyhow!("audio output not initialized"))
    }
}

impl MediaBackend for RodioBackend {
    type Handle = RodioHandle;

    fn open(
        &mut self,
        stream_url: &str,
        events: MediaSender,
        generation: Generation,
    ) -> Result<RodioHandle> {
        let sink = Arc::new(Sink::connect_new(self.output()?.mixer()));
        sink.pause();

        let handle = RodioHandle {
            sink: sink.clone(),
            ready: Arc::new(AtomicBool::new(false)),
            rewound: false,
            duration: Arc::new(Mutex::new(None)),
            bytes: Arc::new(Mutex::new(None)),
        };

        let client = self.client.clone();
        let url = stream_url.to_string();
        let ready = handle.ready.clone();
        let duration = handle.duration.clone();
        let kept = handle.bytes.clone();

        thread::spawn(move || {
            let event = match fetch(&client, &url).and_then(|bytes| {
                let source = decode(&bytes)?;
                Ok((bytes, source))
            }) {
                Ok((bytes, source)) => {
                    let total = source.total_duration();
                    if let Ok(mut d) = duration.lock() {
                        *d = total;
                    }
                    if let Ok(mut b) = kept.lock() {
                        *b = Some(bytes);
                    }
                    sink.append(source);
                    ready.store(true, Ordering::SeqCst);
                    debug!("generation {} ready ({:?})", generation, total);
                    MediaEvent::Ready { duration: total }
                }
                Err(e) => {
                    warn!("generation {} failed to load: {:#}", generation, e);
                    MediaEvent::Failed(format!("{:#}", e))
                }
            };
            // The controller may be gone already.
            let _ = events.send(MediaMessage { generation, event });
        });

        Ok(handle)
    }
}

type AudioBytes = Arc<[u8]>;

fn fetch(client: &reqwest::blocking::Client, url: &str) -> Result<AudioBytes> {
    let bytes = client
        .get(url)
        .send()
        .context("音频流请求失败")?
        .error_for_status()
        .context("音频流请求被拒绝")?
        .bytes()
        .context("音频流读取失败")?
        .to_vec();
    ensure!(!bytes.is_empty(), "音频流为空");
    Ok(AudioBytes::from(bytes))
}

fn decode(bytes: &AudioBytes) -> Result<Decoder<Cursor<AudioBytes>>> {
    Decoder::new(Cursor::new(bytes.clone())).context("音频解码失败")
}

pub struct RodioHandle {
    sink: Arc<Sink>,
    ready: Arc<AtomicBool>,
    // `get_pos` lags behind a freshly appended source until the mixer pulls it.
    rewound: bool,
    duration: Arc<Mutex<Option<Duration>>>,
    bytes: Arc<Mutex<Option<AudioBytes>>>,
}

impl RodioHandle {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

impl MediaHandle for RodioHandle {
    fn play(&mut self) -> Result<()> {
        ensure!(self.is_ready(), "stream not loaded yet");
        self.rewound = false;
        self.sink.play();
        Ok(())
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn is_paused(&self) -> bool {
        self.sink.is_paused()
    }

    fn position(&self) -> Duration {
        if self.rewound {
            Duration::ZERO
        } else {
            self.sink.get_pos()
        }
    }

    fn duration(&self) -> Option<Duration> {
        self.duration.lock().ok().and_then(|d| *d)
    }

    fn seek_to(&mut self, position: Duration) -> Result<()> {
        ensure!(self.is_ready(), "stream not loaded yet");
        self.sink
            .try_seek(position)
            .map_err(|e| anyhow!("seek failed: {}", e))?;
        self.rewound = false;
        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.is_ready() && self.sink.empty()
    }

    fn rewind(&mut self) -> Result<()> {
        let bytes = self
            .bytes
            .lock()
            .map_err(|_| anyhow!("audio buffer poisoned"))?
            .clone()
            .ok_or_else(|| anyhow!("stream not loaded yet"))?;

        self.sink.pause();
        self.sink.clear();
        self.sink.append(decode(&bytes)?);
        // clear() leaves the sink paused; keep it that way until play().
        self.sink.pause();
        self.rewound = true;
        debug!("rewound stream ({} bytes)", bytes.len());
        Ok(())
    }
}

impl Drop for RodioHandle {
    fn drop(&mut self) {
        self.sink.stop();
    }
}
