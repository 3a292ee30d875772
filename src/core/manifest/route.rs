use serde::{Deserialize, Serialize};

use crate::core::error::{LauncherError, LauncherResult};

/// Caller-chosen network target and preferred archive for one launch attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RouteSpec {
    pub address: String,
    pub port: u16,
    /// Relative path of the archive the caller would like to run.
    #[serde(default)]
    pub preferred_archive: Option<String>,
    /// Version override that wins over the manifest version.
    #[serde(default)]
    pub version: Option<String>,
}

impl RouteSpec {
    pub fn new(address: impl Into<String>, port: u16) -> LauncherResult<Self> {
        let route = Self {
            address: address.into(),
            port,
            preferred_archive: None,
            version: None,
        };
        route.validate()?;
        Ok(route)
    }

    pub fn with_preferred_archive(mut self, archive: impl Into<String>) -> Self {
        self.preferred_archive = Some(archive.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn validate(&self) -> LauncherResult<()> {
        if self.port == 0 {
            return Err(LauncherError::launch_configuration(
                format!("route port for {} must be within 1-65535", self.address),
                Vec::new(),
            ));
        }
        Ok(())
    }

    /// The preferred archive, ignoring blank values.
    pub fn preferred_archive(&self) -> Option<&str> {
        self.preferred_archive
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    /// The route version override, ignoring blank values.
    pub fn version(&self) -> Option<&str> {
        self.version
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}
