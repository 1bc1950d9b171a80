use std::path::PathBuf;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::time::Duration;

/// Tracker settings, persisted as settings.json.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    pub character_name: String,
    pub server_name: String,
    pub base_directory: PathBuf,
    /// Relative to `base_directory`
    pub logs_directory: PathBuf,
    /// Minutes without a new line before a stall warning
    pub heartbeat_minutes: f64,
    /// Replay `test_log_file` from the start instead of tailing the live log
    #[serde(default)]
    pub test_mode: bool,
    #[serde(default = "default_test_log_file")]
    pub test_log_file: String,
    #[serde(default = "default_guild_tag")]
    pub guild_tag: String,
    /// JSON reference data (targets, items, tradeskills, roster, taunts)
    pub reference_store: PathBuf,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

fn default_test_log_file() -> String {
    "test_fights.txt".to_string()
}

fn default_guild_tag() -> String {
    "<Legacy of Ik>".to_string()
}

fn default_poll_interval() -> u64 {
    100
}

impl Default for Settings {
    fn default() -> Self {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());

        let base_directory = PathBuf::from(home).join("EverQuest");

        Self {
            character_name: "Unknown".to_string(),
            server_name: "project1999".to_string(),
            reference_store: base_directory.join("ik_reference.json"),
            base_directory,
            logs_directory: PathBuf::from("Logs"),
            heartbeat_minutes: 15.0,
            test_mode: false,
            test_log_file: default_test_log_file(),
            guild_tag: default_guild_tag(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

impl Settings {
    /// `{base}/{logs}/eqlog_{character}_{server}.txt`
    pub fn log_path(&self) -> PathBuf {
        self.base_directory
            .join(&self.logs_directory)
            .join(format!("eqlog_{}_{}.txt", self.character_name, self.server_name))
    }

    /// The file to parse plus whether to start at its end.
    pub fn log_source(&self) -> (PathBuf, bool) {
        if self.test_mode {
            let path = self
                .base_directory
                .join(&self.logs_directory)
                .join(&self.test_log_file);
            (path, false)
        } else {
            (self.log_path(), true)
        }
    }

    pub fn heartbeat_threshold(&self) -> Duration {
        // Out-of-range values from a hand-edited file saturate instead of panicking
        Duration::try_from_secs_f64(self.heartbeat_minutes.max(0.0) * 60.0).unwrap_or(Duration::MAX)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    pub fn new(app_config_dir: PathBuf) -> Self {
        Self {
            config_path: app_config_dir.join("settings.json"),
        }
    }

    /// Use an explicit settings file instead of `<dir>/settings.json`.
    pub fn with_file(config_path: PathBuf) -> Self {
        Self { config_path }
    }

    pub fn load(&self) -> Settings {
        if self.config_path.exists() {
            match fs::read_to_string(&self.config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(settings) => return settings,
                    Err(e) => log::warn!("Ignoring malformed {:?}: {}", self.config_path, e),
                },
                Err(e) => log::warn!("Could not read {:?}: {}", self.config_path, e),
            }
        }
        Settings::default()
    }

    pub fn save(&self, settings: &Settings) -> io::Result<()> {
        // Ensure directory exists
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.config_path, content)
    }
}
