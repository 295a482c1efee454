/// Sound effect types
///
/// Defines the fixed set of effect categories and their static playback config.
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Sound effect categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SoundType {
    /// Bubble popping
    BubblePop,

    /// Achievement unlocked
    Achievement,

    /// Level up
    LevelUp,

    /// Countdown finished
    CountdownComplete,

    /// Button/UI click
    UiClick,

    /// Generic reward
    Reward,
}

impl SoundType {
    /// Every sound type, in catalog order
    pub const ALL: [SoundType; 6] = [
        SoundType::BubblePop,
        SoundType::Achievement,
        SoundType::LevelUp,
        SoundType::CountdownComplete,
        SoundType::UiClick,
        SoundType::Reward,
    ];

    /// Stable kebab-case name, also used as the file stem
    pub fn as_str(&self) -> &'static str {
        match self {
            SoundType::BubblePop => "bubble-pop",
            SoundType::Achievement => "achievement",
            SoundType::LevelUp => "level-up",
            SoundType::CountdownComplete => "countdown-complete",
            SoundType::UiClick => "ui-click",
            SoundType::Reward => "reward",
        }
    }

    /// File name of this sound inside the sounds directory
    pub fn file_name(&self) -> String {
        format!("{}.mp3", self.as_str())
    }

    /// Full path of this sound under `sounds_dir`
    pub fn file_path(&self, sounds_dir: &Path) -> PathBuf {
        sounds_dir.join(self.file_name())
    }
}

impl fmt::Display for SoundType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when parsing a name that is not a known sound type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSoundName(pub String);

impl fmt::Display for UnknownSoundName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown sound type: {}", self.0)
    }
}

impl std::error::Error for UnknownSoundName {}

impl FromStr for SoundType {
    type Err = UnknownSoundName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SoundType::ALL
            .iter()
            .copied()
            .find(|sound| sound.as_str() == s)
            .ok_or_else(|| UnknownSoundName(s.to_string()))
    }
}

/// Static per-type playback configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoundConfig {
    #[serde(rename = "type")]
    pub sound: SoundType,

    /// Default volume (0.0-1.0) when the caller gives no override
    pub volume: f32,

    #[serde(rename = "loop", default)]
    pub looping: bool,

    /// Load this sound during init when preloading is enabled
    #[serde(default)]
    pub preload: bool,
}

impl SoundConfig {
    const fn new(sound: SoundType, volume: f32, preload: bool) -> Self {
        Self {
            sound,
            volume,
            looping: false,
            preload,
        }
    }

    /// The built-in catalog, one entry per sound type
    pub fn defaults() -> Vec<SoundConfig> {
        vec![
            SoundConfig::new(SoundType::BubblePop, 0.8, true),
            SoundConfig::new(SoundType::Achievement, 0.9, true),
            SoundConfig::new(SoundType::LevelUp, 1.0, true),
            SoundConfig::new(SoundType::CountdownComplete, 0.7, true),
            SoundConfig::new(SoundType::UiClick, 0.5, false),
            SoundConfig::new(SoundType::Reward, 0.8, true),
        ]
    }
}

/// Dynamic load state of one sound file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFileInfo {
    pub path: PathBuf,
    pub loaded: bool,
    pub error: Option<String>,
}

impl AudioFileInfo {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            loaded: false,
            error: None,
        }
    }
}
