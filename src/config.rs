//! Host configuration.
//!
//! Built-in defaults, optionally overridden by a TOML file:
//!
//! ```toml
//! browser = "chrome"           # picks the default manifest location
//! scope = "user"
//! # manifest_path = "{HOME}/.config/google-chrome/NativeMessagingHosts/com.hackclub.odot.json"
//! downstream_path = "{HOME}/.odot-tracker-data.json"
//! max_message_size = 67108864
//!
//! [host]
//! name = "com.hackclub.odot"
//! description = "Odot"
//! path = "/opt/odot/odot-host"
//! allowed_origins = ["chrome-extension://knldjmfmopnpolahpmmgbagdohdnhkik/"]
//! ```
//!
//! Path values may use `{VAR}` environment placeholders.

use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::host::{NmError, Result, MAX_FROM_BROWSER};
use crate::install::manifest::HostManifest;
use crate::install::paths::{self, Scope};

pub const DEFAULT_HOST_NAME: &str = "com.hackclub.odot";
pub const DEFAULT_DESCRIPTION: &str = "Odot";
pub const DEFAULT_ALLOWED_ORIGIN: &str = "chrome-extension://knldjmfmopnpolahpmmgbagdohdnhkik/";
pub const DEFAULT_BROWSER: &str = "chrome";

#[cfg(not(windows))]
pub const DEFAULT_DOWNSTREAM_PATH: &str = "{HOME}/.odot-tracker-data.json";
#[cfg(windows)]
pub const DEFAULT_DOWNSTREAM_PATH: &str = r"{USERPROFILE}\.odot-tracker-data.json";

/// Everything a [`Channel`](crate::channel::Channel) needs; no ambient paths.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub manifest_path: PathBuf,
    pub downstream_path: PathBuf,
    pub host: HostManifest,
    /// Largest inbound payload accepted, capped at [`MAX_FROM_BROWSER`].
    pub max_message_size: usize,
}

impl ChannelConfig {
    pub fn new(
        manifest_path: impl Into<PathBuf>,
        downstream_path: impl Into<PathBuf>,
        host: HostManifest,
    ) -> Self {
        Self {
            manifest_path: manifest_path.into(),
            downstream_path: downstream_path.into(),
            host,
            max_message_size: MAX_FROM_BROWSER,
        }
    }

    pub fn with_max_message_size(mut self, max_message_size: usize) -> Self {
        self.max_message_size = max_message_size;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.host.validate()?;
        if self.max_message_size == 0 || self.max_message_size > MAX_FROM_BROWSER {
            return Err(NmError::InvalidConfig(format!(
                "max_message_size must be between 1 and {MAX_FROM_BROWSER}"
            )));
        }
        if self.manifest_path.as_os_str().is_empty() {
            return Err(NmError::InvalidConfig("manifest_path must not be empty".into()));
        }
        if self.downstream_path.as_os_str().is_empty() {
            return Err(NmError::InvalidConfig(
                "downstream_path must not be empty".into(),
            ));
        }
        Ok(())
    }

    /// Resolve the configuration: defaults, then `file` (if any), then `overrides`.
    pub fn load(file: Option<&Path>, overrides: Overrides) -> Result<Self> {
        match file {
            Some(path) => ConfigFile::read(path)?.resolve(overrides),
            None => ConfigFile::default().resolve(overrides),
        }
    }
}

/// Values given on the command line. Taken literally, no placeholder expansion.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub manifest_path: Option<PathBuf>,
    pub downstream_path: Option<PathBuf>,
}

/// On-disk form of the configuration. Every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub browser: Option<String>,
    pub scope: Option<Scope>,
    pub manifest_path: Option<String>,
    pub downstream_path: Option<String>,
    pub max_message_size: Option<usize>,
    #[serde(default)]
    pub host: HostSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostSection {
    pub name: Option<String>,
    pub description: Option<String>,
    pub path: Option<String>,
    pub allowed_origins: Option<Vec<String>>,
}

impl ConfigFile {
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| NmError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &text)
    }

    /// `origin` only labels parse errors.
    pub fn parse(origin: &Path, text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|source| NmError::ConfigParse {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn resolve(self, overrides: Overrides) -> Result<ChannelConfig> {
        let host_path = match self.host.path {
            Some(p) => paths::expand_template(&p)?,
            None => env::current_exe()?,
        };
        let host = HostManifest::new(
            self.host
                .name
                .unwrap_or_else(|| DEFAULT_HOST_NAME.to_string()),
            self.host
                .description
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            host_path,
            self.host
                .allowed_origins
                .unwrap_or_else(|| vec![DEFAULT_ALLOWED_ORIGIN.to_string()]),
        );

        let manifest_path = match (overrides.manifest_path, self.manifest_path) {
            (Some(p), _) => p,
            (None, Some(p)) => paths::expand_template(&p)?,
            (None, None) => paths::manifest_path(
                self.browser.as_deref().unwrap_or(DEFAULT_BROWSER),
                self.scope.unwrap_or_default(),
                &host.name,
            )?,
        };
        let downstream_path = match overrides.downstream_path {
            Some(p) => p,
            None => paths::expand_template(
                self.downstream_path
                    .as_deref()
                    .unwrap_or(DEFAULT_DOWNSTREAM_PATH),
            )?,
        };

        let config = ChannelConfig {
            manifest_path,
            downstream_path,
            host,
            max_message_size: self.max_message_size.unwrap_or(MAX_FROM_BROWSER),
        };
        config.validate()?;
        Ok(config)
    }
}
