//! Configuration Vault – reads/writes `~/.mindclaw/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use mindclaw_runtime::SkillSettings;
use mindclaw_types::{DEFAULT_ROBOT_STATE, PersistentAttributes};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or saving the config file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config at {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Failed to write config at {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Persisted settings stored in `~/.mindclaw/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP port of the skill webhook.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Where persistent attributes live: a SQLite file path, or `:memory:`.
    #[serde(default = "default_bucket")]
    pub persistence_bucket: String,

    /// `robot.state` reported for users with no stored record.
    #[serde(default = "default_robot_state")]
    pub default_robot_state: String,

    /// Refuse requests whose application id differs from this one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill_id: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("persistence_bucket", &self.persistence_bucket)
            .field("default_robot_state", &self.default_robot_state)
            .field(
                "skill_id",
                match &self.skill_id {
                    Some(id) => id as &dyn std::fmt::Debug,
                    None => &"<not set>",
                },
            )
            .finish()
    }
}

fn default_port() -> u16 {
    mindclaw_server::DEFAULT_PORT
}
fn default_bucket() -> String {
    "mindclaw-attributes.db".to_string()
}
fn default_robot_state() -> String {
    DEFAULT_ROBOT_STATE.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            persistence_bucket: default_bucket(),
            default_robot_state: default_robot_state(),
            skill_id: None,
        }
    }
}

impl Config {
    /// Skill construction settings derived from this config.
    pub fn skill_settings(&self) -> SkillSettings {
        SkillSettings {
            default_attributes: PersistentAttributes::with_state(&self.default_robot_state),
            skill_id: self.skill_id.clone(),
        }
    }
}

/// Return the path to `~/.mindclaw/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".mindclaw").join("config.toml")
}

/// The config the process should run with: file contents (or defaults when
/// there is no file) with `MINDCLAW_*` overrides applied.
pub fn effective() -> Result<Config, ConfigError> {
    let mut cfg = load_from(&config_path())?.unwrap_or_default();
    apply_env_overrides(&mut cfg);
    Ok(cfg)
}

/// Load the config from a specific path.  Returns `None` if it does not exist.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(toml::from_str(&raw)?))
}

/// Apply `MINDCLAW_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `MINDCLAW_PORT` | `port` |
/// | `MINDCLAW_PERSISTENCE_BUCKET` | `persistence_bucket` |
/// | `MINDCLAW_DEFAULT_STATE` | `default_robot_state` |
/// | `MINDCLAW_SKILL_ID` | `skill_id` |
pub fn apply_env_overrides(cfg: &mut Config) {
    if let Ok(v) = std::env::var("MINDCLAW_PORT")
        && let Ok(port) = v.parse::<u16>()
    {
        cfg.port = port;
    }
    if let Ok(v) = std::env::var("MINDCLAW_PERSISTENCE_BUCKET")
        && !v.is_empty()
    {
        cfg.persistence_bucket = v;
    }
    if let Ok(v) = std::env::var("MINDCLAW_DEFAULT_STATE")
        && !v.is_empty()
    {
        cfg.default_robot_state = v;
    }
    if let Ok(v) = std::env::var("MINDCLAW_SKILL_ID") {
        cfg.skill_id = if v.is_empty() { None } else { Some(v) };
    }
}

/// Save the config to `~/.mindclaw/config.toml`, creating the directory.
pub fn save(cfg: &Config) -> Result<(), ConfigError> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
        // Owner-only directory (rwx------) on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700)).map_err(write_err)?;
        }
    }
    let raw = toml::to_string_pretty(cfg)?;
    // Owner-only file (rw-------) on Unix.
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
            .map_err(write_err)?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw).map_err(write_err)?;
    Ok(())
}
