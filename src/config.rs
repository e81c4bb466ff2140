use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{alarm::Sound, lifecycle::Delays, store::User};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("couldn't find a home directory for the config")]
    NoHome,
    #[error("couldn't access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("couldn't parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("couldn't serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// how often and how long the client waits, all in seconds
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    pub tick_secs: u64,
    pub startup_check_secs: u64,
    pub snooze_rering_secs: u64,
    pub grace_secs: u64,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            tick_secs: 60,
            startup_check_secs: 2,
            snooze_rering_secs: 3,
            grace_secs: 2,
        }
    }
}

impl Timing {
    #[must_use]
    pub const fn tick(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }

    #[must_use]
    pub const fn startup_check(&self) -> Duration {
        Duration::from_secs(self.startup_check_secs)
    }

    #[must_use]
    pub const fn delays(&self) -> Delays {
        Delays {
            rering: Duration::from_secs(self.snooze_rering_secs),
            grace: Duration::from_secs(self.grace_secs),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    pub api_url: String,
    /// 0 to 100
    #[serde(default = "default_volume")]
    pub volume: f32,
    #[serde(default)]
    pub timing: Timing,
    /// whoever logged in last, gone after logout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

const fn default_volume() -> f32 {
    70.0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:3001/api".to_string(),
            volume: default_volume(),
            timing: Timing::default(),
            user: None,
        }
    }
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// reads the config at `path`, a missing file gives the defaults
    ///
    /// # Errors
    /// if the file exists but can't be read or parsed
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let config = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&config)?)
    }

    /// # Errors
    /// if the config can't be serialized or written
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let config = toml::to_string(self)?;
        let io = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io)?;
        }
        std::fs::write(path, config).map_err(io)
    }

    fn project_dirs() -> Result<directories::ProjectDirs, ConfigError> {
        directories::ProjectDirs::from("", "", "wakey").ok_or(ConfigError::NoHome)
    }

    /// # Errors
    /// if there is no home directory
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let mut path = Self::project_dirs()?.config_dir().to_path_buf();
        path.push("config.toml");
        Ok(path)
    }

    /// # Errors
    /// if there is no home directory
    pub fn sounds_path() -> Result<PathBuf, ConfigError> {
        let mut path = Self::project_dirs()?.data_dir().to_path_buf();
        path.push("sounds");
        Ok(path)
    }

    /// # Errors
    /// if there is no home directory
    pub fn is_config_present() -> Result<bool, ConfigError> {
        Ok(Self::config_path()?.exists())
    }

    /// where the file for `sound` is expected inside `sounds_dir`
    #[must_use]
    pub fn sound_file(sounds_dir: &Path, sound: Sound) -> PathBuf {
        sounds_dir.join(sound.file_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.timing.tick(), Duration::from_secs(60));
    }

    #[test]
    fn saves_and_loads_logged_in_user() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::new();
        config.user = Some(User {
            id: 4,
            username: "bob".to_string(),
        });
        config.timing.grace_secs = 5;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.timing.delays().grace, Duration::from_secs(5));
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "api_url = \"http://wakey.test/api\"\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.api_url, "http://wakey.test/api");
        assert!((config.volume - 70.0).abs() < f32::EPSILON);
        assert_eq!(config.user, None);
    }

    #[test]
    fn broken_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "api_url = ").unwrap();
        assert!(matches!(Config::load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn sound_files_live_in_sounds_dir() {
        assert_eq!(
            Config::sound_file(Path::new("/s"), Sound::GetShitDone),
            PathBuf::from("/s/getshitdone.mp3")
        );
    }
}
