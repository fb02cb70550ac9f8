//! Townwatch configuration.
//!
//! Loaded from `~/.townwatch/config.toml`. Every key is optional; a missing
//! file means defaults.
//!
//! ```toml
//! town-root = "/home/me/gt"
//! gt-program = "gt"
//! bd-program = "bd"
//!
//! [timeouts]
//! fast-secs = 5
//! status-secs = 10
//! mail-secs = 15
//! provision-secs = 60
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::invoke::Timeouts;

/// Environment variable that overrides the configured town root.
pub const TOWN_ENV: &str = "TOWNWATCH_TOWN";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not determine home directory")]
    NoHome,

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{field} is empty in {path}")]
    Empty { field: &'static str, path: PathBuf },
}

pub type Result<T> = core::result::Result<T, ConfigError>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// The town directory `gt` and `bd` run in. Defaults to `~/gt`.
    pub town_root: Option<PathBuf>,

    /// Program name or path for the town CLI.
    pub gt_program: String,

    /// Program name or path for the beads CLI.
    pub bd_program: String,

    pub timeouts: Timeouts,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            town_root: None,
            gt_program: "gt".to_string(),
            bd_program: "bd".to_string(),
            timeouts: Timeouts::default(),
        }
    }
}

impl Config {
    /// Load config from `~/.townwatch/config.toml`.
    pub fn load() -> Result<Self> {
        let path = Self::path().ok_or(ConfigError::NoHome)?;
        Self::load_from(&path)
    }

    /// Load config from a specific file. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        for (field, value) in [
            ("gt-program", &config.gt_program),
            ("bd-program", &config.bd_program),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Empty {
                    field,
                    path: path.to_path_buf(),
                });
            }
        }

        Ok(config)
    }

    /// The config file path: `~/.townwatch/config.toml`.
    pub fn path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".townwatch").join("config.toml"))
    }

    /// Settle the town root: `flag`, then `env`, then the file, then `~/gt`.
    pub fn resolve_town_root(&mut self, flag: Option<PathBuf>, env: Option<PathBuf>) -> Result<()> {
        let root = match flag.or(env).or_else(|| self.town_root.take()) {
            Some(root) => root,
            None => dirs::home_dir().ok_or(ConfigError::NoHome)?.join("gt"),
        };
        self.town_root = Some(root);
        Ok(())
    }

    /// The resolved town root. Falls back to `gt` relative to the current
    /// directory if [`Config::resolve_town_root`] was never called.
    pub fn town_root(&self) -> &Path {
        self.town_root.as_deref().unwrap_or(Path::new("gt"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn write(dir: &TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn missing_file_is_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write(
            &dir,
            "town-root = \"/srv/town\"\n\n[timeouts]\nmail-secs = 30\n",
        );
        let config = Config::load_from(&path).unwrap();

        assert_eq!(config.town_root, Some(PathBuf::from("/srv/town")));
        assert_eq!(config.gt_program, "gt");
        assert_eq!(config.timeouts.mail_secs, 30);
        assert_eq!(config.timeouts.status_secs, 10);
    }

    #[test]
    fn invalid_toml_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "town-root = [");
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn empty_program_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "gt-program = \"  \"\n");
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Empty {
                field: "gt-program",
                ..
            })
        ));
    }

    #[test]
    fn town_root_resolution_order() {
        let mut config = Config {
            town_root: Some(PathBuf::from("/from/file")),
            ..Config::default()
        };
        config
            .resolve_town_root(Some("/from/flag".into()), Some("/from/env".into()))
            .unwrap();
        assert_eq!(config.town_root(), Path::new("/from/flag"));

        let mut config = Config {
            town_root: Some(PathBuf::from("/from/file")),
            ..Config::default()
        };
        config
            .resolve_town_root(None, Some("/from/env".into()))
            .unwrap();
        assert_eq!(config.town_root(), Path::new("/from/env"));

        let mut config = Config {
            town_root: Some(PathBuf::from("/from/file")),
            ..Config::default()
        };
        config.resolve_town_root(None, None).unwrap();
        assert_eq!(config.town_root(), Path::new("/from/file"));
    }
}
