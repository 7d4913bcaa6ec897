//! Configuration model for the mount compiler.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{MountError, Result};

/// Root configuration injected into the volume constructor and policy helpers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Host directory under which component data directories live.
    pub apps_root: PathBuf,
    /// Prefix applied to identifiers by the bundled naming transform.
    pub name_prefix: String,
    /// Application owners whose components restart `always`.
    pub owner_allow_list: BTreeSet<String>,
    /// Whether structured bind mounts are emitted instead of `source:target` strings.
    pub modern_mounts: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            apps_root: PathBuf::from(crate::constants::DEFAULT_APPS_ROOT),
            name_prefix: crate::constants::DEFAULT_NAME_PREFIX.to_owned(),
            owner_allow_list: BTreeSet::new(),
            modern_mounts: true,
        }
    }
}

impl CompilerConfig {
    /// Parses a configuration from YAML text. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or the resulting values are invalid.
    pub fn from_yaml_str(input: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a YAML configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not parse.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| MountError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Returns true if `owner` is on the restart allow-list.
    pub fn is_allowed_owner(&self, owner: &str) -> bool {
        self.owner_allow_list.contains(owner)
    }

    fn validate(&self) -> Result<()> {
        if !self.apps_root.is_absolute() {
            return Err(MountError::Config {
                message: format!(
                    "apps_root must be an absolute path, got \"{}\"",
                    self.apps_root.display()
                ),
            });
        }
        Ok(())
    }
}
