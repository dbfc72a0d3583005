//! Configuration management for rozelle
//!
//! Stores settings in ~/.config/rozelle/config.json

use crate::sandbox::{CommandEngine, DEFAULT_TIMEOUT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

const ENGINE_ENV: &str = "ROZELLE_ENGINE";
const TIMEOUT_ENV: &str = "ROZELLE_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Interpreter that executes assembled programs (reads them from stdin)
    #[serde(default = "default_engine_program")]
    pub engine_program: String,
    #[serde(default = "default_engine_args")]
    pub engine_args: Vec<String>,
    /// Wall-clock limit for one run of an attempt
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_engine_program() -> String {
    "python3".to_string()
}

fn default_engine_args() -> Vec<String> {
    vec!["-I".to_string(), "-".to_string()]
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine_program: default_engine_program(),
            engine_args: default_engine_args(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Config {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("rozelle"))
    }

    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.json"))
    }

    /// Load config from disk (or defaults), then apply environment overrides
    pub fn load() -> Self {
        let mut config = Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default();
        config.apply_env(|key| std::env::var(key).ok());
        config
    }

    /// Load config from `path`, falling back to defaults when it is missing
    /// or corrupt. A corrupt file is kept aside as `config.json.corrupt`.
    pub fn load_from(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(err) => {
                preserve_corrupt_config(path, &content);
                warn!(
                    path = %path.display(),
                    error = %err,
                    "config file was corrupted; a backup was saved and defaults were loaded"
                );
                Self::default()
            }
        }
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(program) = var(ENGINE_ENV).filter(|p| !p.trim().is_empty()) {
            self.engine_program = program;
        }
        if let Some(raw) = var(TIMEOUT_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => self.timeout_secs = secs,
                _ => warn!(value = %raw, "ignoring invalid {}", TIMEOUT_ENV),
            }
        }
    }

    /// Save config to disk
    pub fn save(&self) -> Result<(), String> {
        let dir = Self::config_dir()
            .ok_or_else(|| "Could not determine config directory".to_string())?;
        self.save_to(&dir.join("config.json"))
    }

    pub fn save_to(&self, path: &Path) -> Result<(), String> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .map_err(|e| format!("Failed to create config directory: {}", e))?;
        }
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;
        write_config_atomic(path, &content).map_err(|e| format!("Failed to write config: {}", e))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }

    pub fn engine(&self) -> CommandEngine {
        CommandEngine::new(self.engine_program.clone(), self.engine_args.clone())
            .with_env("PYTHONIOENCODING", "utf-8")
    }

    /// Get the config file location for display
    pub fn config_location() -> String {
        Self::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "~/.config/rozelle/config.json".to_string())
    }
}

fn preserve_corrupt_config(path: &Path, content: &str) {
    let corrupt_path = path.with_extension("json.corrupt");
    if fs::rename(path, &corrupt_path).is_err() {
        let _ = fs::write(&corrupt_path, content);
    }
}

fn write_config_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    let tmp_path = path.with_extension("tmp");
    let mut file = fs::File::create(&tmp_path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }
    Ok(())
}
