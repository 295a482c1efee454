/// Native adapter on top of rodio
///
/// Each handle owns a paused `Sink` with the decoded sound already queued, so
/// `play` starts immediately. Sound bytes are read once per path and shared
/// between handles.
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Sender};
use parking_lot::Mutex;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};

use super::{AudioBackend, AudioHandle, EndedCallback, Platform};
use crate::error::SoundError;

/// Sound file bytes shared between every handle of the same path
#[derive(Clone)]
struct SharedBytes(Arc<Vec<u8>>);

impl AsRef<[u8]> for SharedBytes {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

pub struct NativeBackend {
    stream_handle: OutputStreamHandle,
    files: Mutex<HashMap<PathBuf, SharedBytes>>,
    // Dropping this ends the thread that keeps the output stream alive
    _shutdown: Sender<()>,
}

impl NativeBackend {
    /// Open the default output device.
    ///
    /// `OutputStream` cannot leave the thread that created it, so it lives on
    /// a dedicated thread until the backend is dropped.
    pub fn open() -> Result<Self, SoundError> {
        let (ready_tx, ready_rx) = bounded::<Result<OutputStreamHandle, String>>(1);
        let (shutdown_tx, shutdown_rx) = bounded::<()>(0);

        thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || match OutputStream::try_default() {
                Ok((stream, handle)) => {
                    let _ = ready_tx.send(Ok(handle));
                    // Blocks until the backend drops its sender
                    let _ = shutdown_rx.recv();
                    drop(stream);
                    tracing::debug!("Audio output stream closed");
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e.to_string()));
                }
            })
            .map_err(|e| SoundError::OutputUnavailable(e.to_string()))?;

        let stream_handle = ready_rx
            .recv()
            .map_err(|e| SoundError::OutputUnavailable(e.to_string()))?
            .map_err(SoundError::OutputUnavailable)?;

        tracing::info!("Opened native audio output");

        Ok(Self {
            stream_handle,
            files: Mutex::new(HashMap::new()),
            _shutdown: shutdown_tx,
        })
    }

    fn read_bytes(&self, path: &Path) -> Result<SharedBytes, SoundError> {
        if let Some(bytes) = self.files.lock().get(path) {
            return Ok(bytes.clone());
        }

        let data = std::fs::read(path).map_err(|e| SoundError::LoadFailed {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        tracing::debug!("Read audio file {} ({} bytes)", path.display(), data.len());

        let bytes = SharedBytes(Arc::new(data));
        self.files.lock().insert(path.to_path_buf(), bytes.clone());
        Ok(bytes)
    }
}

impl AudioBackend for NativeBackend {
    fn platform(&self) -> Platform {
        Platform::Native
    }

    fn create(&self, path: &Path) -> Result<Box<dyn AudioHandle>, SoundError> {
        let data = self.read_bytes(path)?;
        let handle = NativeHandle::new(path, self.stream_handle.clone(), data)?;
        Ok(Box::new(handle))
    }
}

/// One rodio sink bound to one sound file
pub struct NativeHandle {
    path: PathBuf,
    stream_handle: OutputStreamHandle,
    data: SharedBytes,
    sink: Arc<Sink>,
    volume: f32,
    started: bool,
    armed: Option<Arc<AtomicBool>>,
}

impl NativeHandle {
    fn new(
        path: &Path,
        stream_handle: OutputStreamHandle,
        data: SharedBytes,
    ) -> Result<Self, SoundError> {
        let sink = Self::queued_sink(path, &stream_handle, &data)?;
        Ok(Self {
            path: path.to_path_buf(),
            stream_handle,
            data,
            sink: Arc::new(sink),
            volume: 1.0,
            started: false,
            armed: None,
        })
    }

    /// Fresh paused sink with the whole sound queued
    fn queued_sink(
        path: &Path,
        stream_handle: &OutputStreamHandle,
        data: &SharedBytes,
    ) -> Result<Sink, SoundError> {
        let load_failed = |reason: String| SoundError::LoadFailed {
            path: path.display().to_string(),
            reason,
        };

        let decoder =
            Decoder::new(Cursor::new(data.clone())).map_err(|e| load_failed(e.to_string()))?;
        let sink = Sink::try_new(stream_handle).map_err(|e| load_failed(e.to_string()))?;
        sink.pause();
        sink.append(decoder);
        Ok(sink)
    }

    fn disarm(&mut self) {
        if let Some(armed) = self.armed.take() {
            armed.store(false, Ordering::SeqCst);
        }
    }
}

impl AudioHandle for NativeHandle {
    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        self.sink.set_volume(self.volume);
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn rewind(&mut self) -> Result<(), SoundError> {
        if !self.started && !self.sink.empty() {
            return Ok(());
        }

        // Played or stopped: queue the sound again on a new sink
        self.disarm();
        self.sink.stop();
        let sink = Self::queued_sink(&self.path, &self.stream_handle, &self.data)?;
        sink.set_volume(self.volume);
        self.sink = Arc::new(sink);
        self.started = false;
        Ok(())
    }

    fn play(&mut self) -> Result<(), SoundError> {
        if self.sink.empty() {
            self.rewind()?;
        }
        self.sink.play();
        self.started = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SoundError> {
        self.disarm();
        self.sink.stop();
        Ok(())
    }

    fn on_ended(&mut self, callback: EndedCallback) {
        self.disarm();
        let armed = Arc::new(AtomicBool::new(true));
        self.armed = Some(Arc::clone(&armed));

        let sink = Arc::clone(&self.sink);
        let spawned = thread::Builder::new()
            .name("audio-end-watch".to_string())
            .spawn(move || {
                sink.sleep_until_end();
                if armed.swap(false, Ordering::SeqCst) {
                    callback();
                }
            });
        if let Err(e) = spawned {
            tracing::warn!("Failed to watch end of {}: {}", self.path.display(), e);
        }
    }

    fn release(&mut self) {
        self.disarm();
        self.sink.stop();
    }
}
