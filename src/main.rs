use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use bubble_sound::audio_system::{select_backend, SoundManager, SoundType};
use bubble_sound::config::AppConfig;
use bubble_sound::diagnostics::AudioSystemTester;
use bubble_sound::error::AppResult;
use bubble_sound::messaging::{Event, EventBus, Topic};
use bubble_sound::storage::{JsonFileStore, KeyValueStore};
use sysinfo::System;

const LOG_TARGET_STARTUP: &str = "bubble_sound::startup";

/// Longest a single `play` waits for its sound to end
const PLAY_TIMEOUT: Duration = Duration::from_secs(30);

fn initialize_tracing() {
    use tracing_appender::rolling;
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    // Get log directory in user config folder
    let log_dir = dirs::config_dir()
        .map(|dir| dir.join("BubbleSound").join("logs"))
        .unwrap_or_else(|| std::path::PathBuf::from("logs"));

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory: {}", e);
    }

    // Create file appender with daily rotation
    let file_appender = rolling::daily(&log_dir, "bubble-sound.log");

    // Configure filter (info level by default)
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true);

    // In debug builds, also log to the console (stderr keeps stdout clean for JSON)
    #[cfg(debug_assertions)]
    {
        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .with(console_layer)
            .init();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(filter)
            .with(file_layer)
            .init();
    }
}

fn log_runtime_environment() {
    let version = env!("CARGO_PKG_VERSION");
    let os_name = System::long_os_version()
        .or_else(System::name)
        .unwrap_or_else(|| "Unknown OS".to_string());
    let kernel = System::kernel_version().unwrap_or_else(|| "Unknown Kernel".to_string());

    tracing::info!(target: LOG_TARGET_STARTUP, "Starting Bubble Sound v{} ({})", version, std::env::consts::ARCH);
    tracing::info!(target: LOG_TARGET_STARTUP, "Operating System: {} (kernel {})", os_name, kernel);
}

enum Command {
    Diagnostics,
    Play { sound: SoundType, volume: Option<f32> },
    Status,
}

fn parse_args(args: &[String]) -> AppResult<Command> {
    match args.first().map(String::as_str) {
        Some("--test") => Ok(Command::Diagnostics),
        Some("status") | None => Ok(Command::Status),
        Some("play") => {
            let name = args.get(1).context("usage: bubble-sound play <sound> [volume]")?;
            let sound = name
                .parse::<SoundType>()
                .with_context(|| format!("unknown sound '{}'", name))?;
            let volume = args
                .get(2)
                .map(|v| v.parse::<f32>())
                .transpose()
                .context("volume must be a number between 0 and 1")?;
            Ok(Command::Play { sound, volume })
        }
        Some(other) => bail!("unknown command '{}' (expected --test, play or status)", other),
    }
}

fn main() -> AppResult<()> {
    initialize_tracing();
    log_runtime_environment();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_args(&args)?;

    let config = AppConfig::load_default().context("failed to load configuration")?;
    let store_path = JsonFileStore::default_path().context("no user config directory")?;
    let store: Arc<dyn KeyValueStore> = Arc::new(JsonFileStore::new(store_path));

    let backend = select_backend(config.backend).context("failed to open audio output")?;
    let manager = SoundManager::new(backend, store.clone(), EventBus::new(), config.manager_options());

    match command {
        Command::Diagnostics => {
            let tester = AudioSystemTester::new(manager.clone()).with_store(store);
            let summary = tester.run_full_test();
            println!("{}", serde_json::to_string_pretty(&summary)?);
            for advice in tester.platform_optimizations() {
                tracing::info!("{}", advice);
            }
            if !summary.success {
                bail!("sound diagnostics failed");
            }
        }
        Command::Play { sound, volume } => {
            manager.init().context("failed to initialize sound manager")?;
            let (events, _) = manager.bus().subscribe_topic(Topic::Playback);

            manager
                .try_play_sound(sound, volume)
                .with_context(|| format!("cannot play {}", sound))?;

            loop {
                match events.recv_timeout(PLAY_TIMEOUT) {
                    Ok(Event::SoundFinished { sound: ended, .. }) if ended == sound => break,
                    Ok(Event::SoundDropped { sound: dropped, reason }) if dropped == sound => {
                        bail!("playback of {} failed: {}", sound, reason)
                    }
                    Ok(_) => continue,
                    Err(_) => {
                        tracing::warn!("Timed out waiting for {} to finish", sound);
                        break;
                    }
                }
            }
        }
        Command::Status => {
            manager.init().context("failed to initialize sound manager")?;
            println!("{}", serde_json::to_string_pretty(&manager.get_sound_status())?);
        }
    }

    manager.destroy();
    Ok(())
}
