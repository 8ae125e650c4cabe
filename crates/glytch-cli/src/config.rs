//! Configuration vault – reads/writes `~/.glytch/config.toml`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use glytch_runtime::resolver::PLACEHOLDER_LOCATION;
use glytch_runtime::{EngineSettings, PipelineConfig};

/// Speech locale passed through to the console speaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ta,
}

impl Language {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Some(Language::En),
            "ta" | "tamil" => Some(Language::Ta),
            _ => None,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Language::En => write!(f, "en"),
            Language::Ta => write!(f, "ta"),
        }
    }
}

/// Persisted user configuration stored in `~/.glytch/config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Where the wristband stream is read from: `tcp://host:port`, `stdin`,
    /// or a filesystem path such as `/dev/rfcomm0`.
    #[serde(default = "default_device")]
    pub device: String,

    /// Seconds without data before the connection counts as lost; 0 waits
    /// forever.
    #[serde(default)]
    pub read_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub reconnect: bool,

    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,

    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Emotion samples kept; values above 30 are clamped to 30.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Shown in settings and status; device falls escalate regardless.
    #[serde(default = "default_true")]
    pub fall_detection_enabled: bool,

    #[serde(default = "default_true")]
    pub emotion_detection_enabled: bool,

    /// Copy every dispatched caregiver log line into the event log.
    #[serde(default = "default_true")]
    pub mirror_intent_log: bool,

    #[serde(default)]
    pub language: Language,

    /// Location text appended to the emergency SMS.
    #[serde(default = "default_location")]
    pub emergency_location: String,
}

fn default_device() -> String {
    "tcp://127.0.0.1:7777".to_string()
}
fn default_true() -> bool {
    true
}
fn default_reconnect_delay() -> u64 {
    5
}
fn default_channel_capacity() -> usize {
    glytch_runtime::pipeline::DEFAULT_CHANNEL_CAPACITY
}
fn default_history_capacity() -> usize {
    glytch_memory::EMOTION_HISTORY_CAPACITY
}
fn default_location() -> String {
    PLACEHOLDER_LOCATION.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            device: default_device(),
            read_timeout_secs: 0,
            reconnect: true,
            reconnect_delay_secs: default_reconnect_delay(),
            channel_capacity: default_channel_capacity(),
            history_capacity: default_history_capacity(),
            fall_detection_enabled: true,
            emotion_detection_enabled: true,
            mirror_intent_log: true,
            language: Language::default(),
            emergency_location: default_location(),
        }
    }
}

impl Config {
    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            history_capacity: self.history_capacity,
            fall_detection: self.fall_detection_enabled,
            emotion_detection: self.emotion_detection_enabled,
            mirror_intent_log: self.mirror_intent_log,
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            channel_capacity: self.channel_capacity,
            read_timeout: (self.read_timeout_secs > 0)
                .then(|| Duration::from_secs(self.read_timeout_secs)),
        }
    }

    pub fn reconnect_delay(&self) -> Option<Duration> {
        self.reconnect
            .then(|| Duration::from_secs(self.reconnect_delay_secs))
    }
}

/// Return the path to `~/.glytch/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".glytch").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `GLYTCH_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `GLYTCH_DEVICE` | `device` |
/// | `GLYTCH_READ_TIMEOUT_SECS` | `read_timeout_secs` |
/// | `GLYTCH_LANGUAGE` | `language` |
/// | `GLYTCH_EMERGENCY_LOCATION` | `emergency_location` |
pub fn apply_env_overrides(cfg: &mut Config) {
    apply_overrides(cfg, |key| std::env::var(key).ok());
}

/// Invalid numbers and unknown languages are ignored.
pub(crate) fn apply_overrides(cfg: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("GLYTCH_DEVICE") {
        cfg.device = v;
    }
    if let Some(v) = lookup("GLYTCH_READ_TIMEOUT_SECS")
        && let Ok(secs) = v.trim().parse::<u64>()
    {
        cfg.read_timeout_secs = secs;
    }
    if let Some(v) = lookup("GLYTCH_LANGUAGE")
        && let Some(language) = Language::parse(&v)
    {
        cfg.language = language;
    }
    if let Some(v) = lookup("GLYTCH_EMERGENCY_LOCATION") {
        cfg.emergency_location = v;
    }
}

/// Save the config to disk, creating `~/.glytch/` if necessary.
pub fn save(cfg: &Config) -> Result<(), String> {
    save_to(cfg, &config_path())
}

pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    #[cfg(unix)]
    {
        use std::io::Write;
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| f.write_all(raw.as_bytes()))
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}
