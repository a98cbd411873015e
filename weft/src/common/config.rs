/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::time::Duration;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};

/// Configuration for the Weft runtime
///
/// Loaded from `config.toml` in the XDG configuration directory for `weft`.
/// Every section and every key is optional; missing values take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeftConfig {
    /// Timeout configuration
    pub timeouts: TimeoutConfig,
    /// Publish pipeline configuration
    pub dispatch: DispatchConfig,
    /// Join primitive configuration
    pub joins: JoinsConfig,
    /// Default values configuration
    pub defaults: DefaultsConfig,
}

/// Timeout-related configuration values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Bound on `BoardHandle::shutdown` waiting for in-flight tasks, in milliseconds
    pub shutdown_timeout_ms: u64,
}

/// Publish pipeline switches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Emit one trace record per top-level publish
    pub emit_trace_records: bool,
    /// Count an interceptor that fails as a `DoNotPublish` vote
    pub failed_interceptor_vetoes: bool,
}

/// Join primitive defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JoinsConfig {
    /// Whether a new `Aggregator` terminates the sibling domains of a completed fan-out
    pub terminate_fanout_on_aggregate: bool,
}

/// Default configuration values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    /// Root segment of the board's own agent id
    pub board_name: String,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_ms: 30_000,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            emit_trace_records: true,
            failed_interceptor_vetoes: true,
        }
    }
}

impl Default for JoinsConfig {
    fn default() -> Self {
        Self {
            terminate_fanout_on_aggregate: true,
        }
    }
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            board_name: "board".to_string(),
        }
    }
}

impl WeftConfig {
    /// Convert the shutdown timeout to a Duration
    #[must_use]
    pub const fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.shutdown_timeout_ms)
    }

    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns the `toml` deserialization error for malformed input.
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load configuration from XDG-compliant locations
    ///
    /// Looks for `config.toml` under the `weft` prefix of the XDG configuration
    /// directories (`$XDG_CONFIG_HOME/weft/config.toml`, then the system
    /// directories). A missing file yields the defaults; an unreadable or
    /// malformed one is logged and also yields the defaults.
    #[must_use]
    pub fn load() -> Self {
        use tracing::{error, info};

        let xdg_dirs = match xdg::BaseDirectories::with_prefix("weft") {
            Ok(dirs) => dirs,
            Err(e) => {
                error!("Failed to initialize XDG directories: {}", e);
                return Self::default();
            }
        };

        let Some(path) = xdg_dirs.find_config_file("config.toml") else {
            info!("No configuration file found, using defaults");
            return Self::default();
        };

        info!("Loading configuration from: {}", path.display());
        match std::fs::read_to_string(&path) {
            Ok(config_str) => match Self::from_toml(&config_str) {
                Ok(config) => {
                    info!("Successfully loaded configuration");
                    config
                }
                Err(e) => {
                    error!("Failed to parse configuration file {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                error!("Failed to read configuration file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}

lazy_static! {
    /// Global configuration instance loaded from XDG-compliant locations
    pub static ref CONFIG: WeftConfig = WeftConfig::load();
}
