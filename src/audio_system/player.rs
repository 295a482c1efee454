/// Playback worker
///
/// Play requests are executed on one background thread, fed through a
/// channel. End-of-playback notifications from the platform come back
/// through the same channel, so every instance registration and every return
/// to the pool happens in request order on that one thread.
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use parking_lot::Mutex;

use super::backend::AudioHandle;
use super::instance::{AudioInstance, InstanceId};
use super::manager::Shared;
use super::source::SoundType;
use crate::error::SoundError;
use crate::messaging::Event;

/// An admitted play request
#[derive(Debug, Clone)]
pub(crate) struct PlayRequest {
    pub sound: SoundType,
    pub path: PathBuf,
    pub volume: f32,
    /// Stop epoch at admission time
    pub epoch: u64,
}

enum Job {
    Play(PlayRequest),
    Ended {
        sound: SoundType,
        instance: InstanceId,
    },
    Flush(Sender<()>),
    Shutdown,
}

pub(crate) struct PlaybackWorker {
    jobs: Sender<Job>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl PlaybackWorker {
    /// Start the worker thread
    pub(crate) fn spawn(shared: Arc<Shared>) -> Self {
        let (tx, rx) = unbounded();
        let callbacks = tx.clone();

        let thread = thread::Builder::new()
            .name("sound-playback".to_string())
            .spawn(move || run(shared, rx, callbacks));

        let thread = match thread {
            Ok(handle) => Some(handle),
            Err(e) => {
                tracing::error!("Failed to start playback worker: {}", e);
                None
            }
        };

        Self {
            jobs: tx,
            thread: Mutex::new(thread),
        }
    }

    pub(crate) fn submit(&self, request: PlayRequest) -> Result<(), SoundError> {
        if self.thread.lock().is_none() {
            return Err(SoundError::WorkerStopped);
        }
        self.jobs
            .send(Job::Play(request))
            .map_err(|_| SoundError::WorkerStopped)
    }

    /// Block until every job queued before this call has been processed
    pub(crate) fn flush(&self) {
        if self.thread.lock().is_none() {
            return;
        }
        let (done_tx, done_rx) = bounded(1);
        if self.jobs.send(Job::Flush(done_tx)).is_ok() {
            let _ = done_rx.recv();
        }
    }

    /// Stop the worker thread and wait for it to exit
    pub(crate) fn shutdown(&self) {
        let Some(handle) = self.thread.lock().take() else {
            return;
        };
        let _ = self.jobs.send(Job::Shutdown);
        if handle.join().is_err() {
            tracing::error!("Playback worker panicked");
        }
    }
}

fn run(shared: Arc<Shared>, jobs: Receiver<Job>, callbacks: Sender<Job>) {
    tracing::debug!("Playback worker started");

    while let Ok(job) = jobs.recv() {
        match job {
            Job::Play(request) => execute(&shared, &callbacks, request),
            Job::Ended { sound, instance } => finish(&shared, sound, &instance),
            Job::Flush(done) => {
                let _ = done.send(());
            }
            Job::Shutdown => break,
        }
    }

    tracing::debug!("Playback worker stopped");
}

/// Run one admitted request through to a registered instance
fn execute(shared: &Shared, callbacks: &Sender<Job>, request: PlayRequest) {
    let outcome = start_playback(shared, &request);

    let mut tables = shared.tables.lock();
    tables.pending = tables.pending.saturating_sub(1);

    let mut handle = match outcome {
        Ok(handle) => handle,
        Err(e) => {
            drop(tables);
            tracing::error!("Giving up on sound {}: {}", request.sound, e);
            shared.bus.publish(Event::SoundDropped {
                sound: request.sound,
                reason: e.to_string(),
            });
            return;
        }
    };

    if tables.stop_epoch != request.epoch {
        // Everything was stopped while this request was in flight
        let _ = handle.stop();
        if tables.files.contains_key(&request.sound) {
            tables.handles.insert_pooled(request.sound, handle);
        } else {
            handle.release();
        }
        tracing::debug!("Discarded sound {} stopped before it registered", request.sound);
        return;
    }

    let mut instance = AudioInstance::playing(request.sound, handle, request.volume);
    let id = instance.id.clone();
    let sound = request.sound;

    let ended = callbacks.clone();
    let ended_id = id.clone();
    instance.handle.on_ended(Box::new(move || {
        let _ = ended.send(Job::Ended {
            sound,
            instance: ended_id,
        });
    }));

    tables.handles.insert_live(instance);
    let live = tables.handles.live_count();
    drop(tables);

    tracing::debug!("Playing sound {} ({}, {} live)", sound, id, live);
    shared.bus.publish(Event::SoundStarted {
        sound,
        instance: id,
    });
}

/// Acquire a handle and start it, with one retry on a fresh handle
fn start_playback(
    shared: &Shared,
    request: &PlayRequest,
) -> Result<Box<dyn AudioHandle>, SoundError> {
    let pooled = shared.tables.lock().handles.take_pooled(request.sound);

    let first = match pooled {
        Some(handle) => start_handle(handle, request),
        None => shared
            .backend
            .create(&request.path)
            .and_then(|handle| start_handle(handle, request)),
    };

    first.or_else(|first| {
        tracing::warn!(
            "Playback of {} failed, retrying with a fresh handle: {}",
            request.sound,
            first
        );
        shared
            .backend
            .create(&request.path)
            .and_then(|handle| start_handle(handle, request))
            .map_err(|second| SoundError::FallbackFailed {
                sound: request.sound,
                first: Box::new(first),
                second: Box::new(second),
            })
    })
}

fn start_handle(
    mut handle: Box<dyn AudioHandle>,
    request: &PlayRequest,
) -> Result<Box<dyn AudioHandle>, SoundError> {
    handle.set_volume(request.volume);
    let started = handle.rewind().and_then(|()| handle.play());
    match started {
        Ok(()) => Ok(handle),
        Err(e) => {
            handle.release();
            Err(SoundError::PlaybackFailed {
                sound: request.sound,
                reason: e.to_string(),
            })
        }
    }
}

fn finish(shared: &Shared, sound: SoundType, instance: &InstanceId) {
    let finished = shared.tables.lock().handles.finish(instance);
    match finished {
        Some(_) => {
            tracing::debug!("Sound {} finished ({})", sound, instance);
            shared.bus.publish(Event::SoundFinished {
                sound,
                instance: instance.clone(),
            });
        }
        None => tracing::debug!("Ignoring end of {} ({}): no longer live", sound, instance),
    }
}
