//! Shared fixtures for integration tests

use std::path::Path;
use std::sync::Arc;

use bubble_sound::audio_system::backend::EndedCallback;
use bubble_sound::audio_system::{AudioBackend, AudioHandle, Platform};
use bubble_sound::SoundError;
use parking_lot::Mutex;

#[derive(Default)]
struct Output {
    created: usize,
    next_id: usize,
    playing: Vec<(usize, EndedCallback)>,
}

/// Backend whose sounds play until `end_all` is called
#[derive(Clone, Default)]
pub struct ManualBackend {
    output: Arc<Mutex<Output>>,
}

impl ManualBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self) -> usize {
        self.output.lock().created
    }

    /// End every playing sound
    pub fn end_all(&self) -> usize {
        let playing = std::mem::take(&mut self.output.lock().playing);
        let count = playing.len();
        for (_, callback) in playing {
            callback();
        }
        count
    }
}

impl AudioBackend for ManualBackend {
    fn platform(&self) -> Platform {
        Platform::Headless
    }

    fn create(&self, _path: &Path) -> Result<Box<dyn AudioHandle>, SoundError> {
        let mut output = self.output.lock();
        output.created += 1;
        output.next_id += 1;
        Ok(Box::new(ManualHandle {
            id: output.next_id,
            volume: 1.0,
            output: Arc::clone(&self.output),
        }))
    }
}

struct ManualHandle {
    id: usize,
    volume: f32,
    output: Arc<Mutex<Output>>,
}

impl AudioHandle for ManualHandle {
    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn rewind(&mut self) -> Result<(), SoundError> {
        Ok(())
    }

    fn play(&mut self) -> Result<(), SoundError> {
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SoundError> {
        let id = self.id;
        self.output.lock().playing.retain(|(handle, _)| *handle != id);
        Ok(())
    }

    fn on_ended(&mut self, callback: EndedCallback) {
        self.output.lock().playing.push((self.id, callback));
    }
}

/// Write an empty file for every sound type into `dir`
pub fn write_sound_files(dir: &Path) {
    for sound in bubble_sound::SoundType::ALL {
        std::fs::write(sound.file_path(dir), b"").expect("write sound file");
    }
}
