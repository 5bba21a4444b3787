/*
 * SPDX-FileCopyrightText: Copyright (c) 2026 Arsenal Project contributors. All rights reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Where the registration client will try to reach the arsenal API.
/// DNS should define this in all environments.
const DEFAULT_API_SERVER: &str = "https://arsenal";

/// Modern facter lives under the puppetlabs prefix; `facter` on PATH is the
/// legacy fallback. See [`crate::facter::default_facter_path`].
pub const MODERN_FACTER_PATH: &str = "/opt/puppetlabs/bin/facter";

const DEFAULT_DMIDECODE_PATH: &str = "/usr/sbin/dmidecode";
const DEFAULT_VIRSH_PATH: &str = "virsh";

/// Describes the format of the configuration file used by the registration
/// tooling on arsenal managed hosts.
///
/// This is what we READ from /etc/arsenal/client.toml. In prod most of the
/// fields will default. We only implement Serialize for unit tests.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default, rename = "arsenal-system")]
    pub arsenal_system: ArsenalSystemConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

impl ClientConfig {
    /// Loads the client configuration file in toml format from the given path
    pub fn load_from(path: &Path) -> Result<Self, std::io::Error> {
        let data = std::fs::read_to_string(path)?;

        toml::from_str(&data).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Invalid ClientConfig toml data: {e}"),
            )
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ArsenalSystemConfig {
    #[serde(default = "default_api_server")]
    pub api_server: String,
}

// Called if no `[arsenal-system]` is provided at all.
// The serde defaults above are called if one or more fields are missing.
impl Default for ArsenalSystemConfig {
    fn default() -> Self {
        Self {
            api_server: default_api_server(),
        }
    }
}

fn default_api_server() -> String {
    DEFAULT_API_SERVER.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ToolsConfig {
    /// Override the facter binary. When unset the modern puppetlabs path is
    /// preferred if it exists, otherwise `facter` on PATH.
    pub facter: Option<PathBuf>,
    #[serde(default = "default_dmidecode")]
    pub dmidecode: PathBuf,
    #[serde(default = "default_virsh")]
    pub virsh: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            facter: None,
            dmidecode: default_dmidecode(),
            virsh: default_virsh(),
        }
    }
}

fn default_dmidecode() -> PathBuf {
    PathBuf::from(DEFAULT_DMIDECODE_PATH)
}

fn default_virsh() -> PathBuf {
    PathBuf::from(DEFAULT_VIRSH_PATH)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TimeoutConfig {
    /// Ceiling for short probe tools (dmidecode, virsh). A broken UUID tool
    /// must not hang registration; on expiry the probe is treated as
    /// unavailable and identity resolution falls through to the MAC address.
    #[serde(default = "default_subprocess_timeout_secs")]
    pub subprocess_timeout_secs: u64,

    /// Facter walks the whole system and can be slow on large hosts.
    #[serde(default = "default_facter_timeout_secs")]
    pub facter_timeout_secs: u64,

    /// Per-request timeout for the registration PUT.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,

    /// How many times to retry the registration PUT before giving up.
    #[serde(default = "default_register_retries")]
    pub register_retries: u32,

    /// Fixed delay between registration retries.
    #[serde(default = "default_register_retry_secs")]
    pub register_retry_secs: u64,
}

impl TimeoutConfig {
    pub fn subprocess_timeout(&self) -> Duration {
        Duration::from_secs(self.subprocess_timeout_secs)
    }

    pub fn facter_timeout(&self) -> Duration {
        Duration::from_secs(self.facter_timeout_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn register_retry_delay(&self) -> Duration {
        Duration::from_secs(self.register_retry_secs)
    }
}

fn default_subprocess_timeout_secs() -> u64 {
    5
}

fn default_facter_timeout_secs() -> u64 {
    60
}

fn default_http_timeout_secs() -> u64 {
    30
}

fn default_register_retries() -> u32 {
    3
}

fn default_register_retry_secs() -> u64 {
    5
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            subprocess_timeout_secs: default_subprocess_timeout_secs(),
            facter_timeout_secs: default_facter_timeout_secs(),
            http_timeout_secs: default_http_timeout_secs(),
            register_retries: default_register_retries(),
            register_retry_secs: default_register_retry_secs(),
        }
    }
}
