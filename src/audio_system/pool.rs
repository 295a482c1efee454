/// Handle table
///
/// Every handle the manager holds sits in exactly one slot, either idle in
/// the pool or owned by a live instance. Moving between the two replaces the
/// slot in place, so a handle can never be in both.
use std::collections::HashMap;

use super::backend::AudioHandle;
use super::instance::{AudioInstance, AudioState, InstanceId};
use super::source::SoundType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleId(u64);

pub enum HandleSlot {
    Pooled {
        sound: SoundType,
        handle: Box<dyn AudioHandle>,
    },
    Live(AudioInstance),
}

impl HandleSlot {
    pub fn sound(&self) -> SoundType {
        match self {
            HandleSlot::Pooled { sound, .. } => *sound,
            HandleSlot::Live(instance) => instance.sound,
        }
    }
}

/// Result of a forced stop
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StopReport {
    /// Stopped cleanly and returned to the pool
    pub repooled: usize,
    /// Stop failed, handle released and dropped
    pub released: usize,
}

#[derive(Default)]
pub struct HandleTable {
    slots: HashMap<HandleId, HandleSlot>,
    /// Idle handles per sound, most recently returned last
    idle: HashMap<SoundType, Vec<HandleId>>,
    live: HashMap<InstanceId, HandleId>,
    next_id: u64,
}

impl HandleTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate_id(&mut self) -> HandleId {
        let id = HandleId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Put an idle handle in the pool
    pub fn insert_pooled(&mut self, sound: SoundType, handle: Box<dyn AudioHandle>) -> HandleId {
        let id = self.allocate_id();
        self.slots.insert(id, HandleSlot::Pooled { sound, handle });
        self.idle.entry(sound).or_default().push(id);
        id
    }

    /// Take the most recently pooled handle for `sound` out of the table
    pub fn take_pooled(&mut self, sound: SoundType) -> Option<Box<dyn AudioHandle>> {
        let id = self.idle.get_mut(&sound)?.pop()?;
        match self.slots.remove(&id) {
            Some(HandleSlot::Pooled { handle, .. }) => Some(handle),
            Some(slot @ HandleSlot::Live(_)) => {
                // Index out of sync; keep the live slot where it was
                self.slots.insert(id, slot);
                None
            }
            None => None,
        }
    }

    /// Register a started playback
    pub fn insert_live(&mut self, instance: AudioInstance) -> HandleId {
        let id = self.allocate_id();
        self.live.insert(instance.id.clone(), id);
        self.slots.insert(id, HandleSlot::Live(instance));
        id
    }

    /// Natural end of playback: the instance's handle goes back to the pool.
    ///
    /// Returns the sound type, or `None` if the instance is no longer live.
    pub fn finish(&mut self, instance_id: &InstanceId) -> Option<SoundType> {
        let id = self.live.remove(instance_id)?;
        let slot = self.slots.remove(&id)?;
        let sound = slot.sound();
        let handle = match slot {
            HandleSlot::Live(instance) => instance.handle,
            HandleSlot::Pooled { handle, .. } => handle,
        };
        self.slots.insert(id, HandleSlot::Pooled { sound, handle });
        self.idle.entry(sound).or_default().push(id);
        Some(sound)
    }

    /// Forced stop of every live instance.
    ///
    /// A failing stop does not prevent stopping the rest. Cleanly stopped
    /// handles return to the pool; handles whose stop failed are released.
    pub fn stop_all(&mut self) -> StopReport {
        let mut report = StopReport::default();

        for (instance_id, id) in std::mem::take(&mut self.live) {
            let Some(HandleSlot::Live(mut instance)) = self.slots.remove(&id) else {
                continue;
            };

            match instance.handle.stop() {
                Ok(()) => {
                    instance.state = AudioState::Idle;
                    let sound = instance.sound;
                    self.slots.insert(
                        id,
                        HandleSlot::Pooled {
                            sound,
                            handle: instance.handle,
                        },
                    );
                    self.idle.entry(sound).or_default().push(id);
                    report.repooled += 1;
                }
                Err(e) => {
                    tracing::warn!("Failed to stop sound {} ({}): {}", instance.sound, instance_id, e);
                    instance.handle.release();
                    report.released += 1;
                }
            }
        }

        report
    }

    /// Remove every handle, live or pooled, for teardown
    pub fn drain(&mut self) -> Vec<Box<dyn AudioHandle>> {
        self.idle.clear();
        self.live.clear();
        self.slots
            .drain()
            .map(|(_, slot)| match slot {
                HandleSlot::Pooled { handle, .. } => handle,
                HandleSlot::Live(instance) => instance.handle,
            })
            .collect()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn pooled_count(&self, sound: SoundType) -> usize {
        self.idle.get(&sound).map(Vec::len).unwrap_or(0)
    }

    pub fn total_pooled(&self) -> usize {
        self.idle.values().map(Vec::len).sum()
    }

    pub fn is_live(&self, instance_id: &InstanceId) -> bool {
        self.live.contains_key(instance_id)
    }

    /// Sound types of the live instances
    pub fn live_sounds(&self) -> Vec<SoundType> {
        self.live
            .values()
            .filter_map(|id| self.slots.get(id))
            .map(HandleSlot::sound)
            .collect()
    }
}
