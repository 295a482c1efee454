//! Scripted adapter for unit tests: handles only finish when the test says so.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use super::{AudioBackend, AudioHandle, EndedCallback, Platform};
use crate::error::SoundError;

#[derive(Default)]
struct Script {
    created: usize,
    plays: usize,
    stops: usize,
    failing_paths: HashSet<PathBuf>,
    failing_creates: usize,
    failing_plays: usize,
    failing_stops: usize,
    volumes: Vec<f32>,
    waiting: Vec<(usize, EndedCallback)>,
}

#[derive(Clone, Default)]
pub(crate) struct ScriptedBackend {
    script: Arc<Mutex<Script>>,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_path(&self, path: impl Into<PathBuf>) {
        self.script.lock().failing_paths.insert(path.into());
    }

    pub(crate) fn fail_next_creates(&self, count: usize) {
        self.script.lock().failing_creates = count;
    }

    pub(crate) fn fail_next_plays(&self, count: usize) {
        self.script.lock().failing_plays = count;
    }

    pub(crate) fn fail_next_stops(&self, count: usize) {
        self.script.lock().failing_stops = count;
    }

    pub(crate) fn created(&self) -> usize {
        self.script.lock().created
    }

    pub(crate) fn plays(&self) -> usize {
        self.script.lock().plays
    }

    pub(crate) fn stops(&self) -> usize {
        self.script.lock().stops
    }

    pub(crate) fn last_volume(&self) -> Option<f32> {
        self.script.lock().volumes.last().copied()
    }

    /// Finish every playing handle, returning how many callbacks fired
    pub(crate) fn finish_all(&self) -> usize {
        let waiting = std::mem::take(&mut self.script.lock().waiting);
        let count = waiting.len();
        for (_, callback) in waiting {
            callback();
        }
        count
    }
}

impl AudioBackend for ScriptedBackend {
    fn platform(&self) -> Platform {
        Platform::Headless
    }

    fn create(&self, path: &Path) -> Result<Box<dyn AudioHandle>, SoundError> {
        let mut script = self.script.lock();
        if script.failing_creates > 0 || script.failing_paths.contains(path) {
            script.failing_creates = script.failing_creates.saturating_sub(1);
            return Err(SoundError::LoadFailed {
                path: path.display().to_string(),
                reason: "scripted failure".to_string(),
            });
        }
        script.created += 1;
        Ok(Box::new(ScriptedHandle {
            id: script.created,
            volume: 1.0,
            script: Arc::clone(&self.script),
        }))
    }
}

struct ScriptedHandle {
    id: usize,
    volume: f32,
    script: Arc<Mutex<Script>>,
}

impl AudioHandle for ScriptedHandle {
    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
        self.script.lock().volumes.push(volume);
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn rewind(&mut self) -> Result<(), SoundError> {
        Ok(())
    }

    fn play(&mut self) -> Result<(), SoundError> {
        let mut script = self.script.lock();
        if script.failing_plays > 0 {
            script.failing_plays -= 1;
            return Err(SoundError::OutputUnavailable("scripted play failure".to_string()));
        }
        script.plays += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SoundError> {
        let mut script = self.script.lock();
        script.stops += 1;
        let id = self.id;
        script.waiting.retain(|(handle, _)| *handle != id);
        if script.failing_stops > 0 {
            script.failing_stops -= 1;
            return Err(SoundError::OutputUnavailable("scripted stop failure".to_string()));
        }
        Ok(())
    }

    fn on_ended(&mut self, callback: EndedCallback) {
        self.script.lock().waiting.push((self.id, callback));
    }
}
