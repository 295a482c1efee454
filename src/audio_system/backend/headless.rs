/// Silent adapter for machines without an output device
///
/// Files are still checked for existence so load failures behave the same as
/// on the native adapter. Playback completes as soon as it starts.
use std::path::Path;

use super::{AudioBackend, AudioHandle, EndedCallback, Platform};
use crate::error::SoundError;

#[derive(Debug, Default)]
pub struct HeadlessBackend;

impl HeadlessBackend {
    pub fn new() -> Self {
        Self
    }
}

impl AudioBackend for HeadlessBackend {
    fn platform(&self) -> Platform {
        Platform::Headless
    }

    fn create(&self, path: &Path) -> Result<Box<dyn AudioHandle>, SoundError> {
        if !path.is_file() {
            return Err(SoundError::LoadFailed {
                path: path.display().to_string(),
                reason: "file not found".to_string(),
            });
        }
        Ok(Box::new(HeadlessHandle::default()))
    }
}

#[derive(Default)]
pub struct HeadlessHandle {
    volume: f32,
    finished: bool,
    on_ended: Option<EndedCallback>,
}

impl AudioHandle for HeadlessHandle {
    fn set_volume(&mut self, volume: f32) {
        self.volume = volume;
    }

    fn volume(&self) -> f32 {
        self.volume
    }

    fn rewind(&mut self) -> Result<(), SoundError> {
        self.finished = false;
        Ok(())
    }

    fn play(&mut self) -> Result<(), SoundError> {
        self.finished = true;
        if let Some(callback) = self.on_ended.take() {
            callback();
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<(), SoundError> {
        self.on_ended = None;
        Ok(())
    }

    fn on_ended(&mut self, callback: EndedCallback) {
        if self.finished {
            callback();
        } else {
            self.on_ended = Some(callback);
        }
    }
}
