// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Engine configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Settings the engine is constructed with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Package name; the data reference file is `<package_name>_data`.
    pub package_name: String,
    /// Version written into the preferences; a mismatch clears them.
    pub version: String,
    /// Directories searched, in order, for the data reference file.
    pub data_search_path: Vec<PathBuf>,
    /// Preferences file.
    pub prefs_file: PathBuf,
    /// Capacity of the thread table, main thread included.
    pub max_threads: usize,
    /// Minimum duration of a main thread iteration, in milliseconds.
    pub main_timer_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let package_name = "gale".to_string();
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            data_search_path: default_search_path(&package_name),
            prefs_file: default_prefs_file(&package_name),
            max_threads: 10,
            main_timer_ms: 0,
            package_name,
        }
    }
}

fn default_search_path(package_name: &str) -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from("data"),
        PathBuf::from(format!("/usr/local/share/{package_name}")),
        PathBuf::from(format!("/usr/share/{package_name}")),
    ];
    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join("data"));
        paths.push(cwd);
    }
    paths
}

#[cfg(windows)]
fn default_prefs_file(package_name: &str) -> PathBuf {
    match std::env::var_os("APPDATA").filter(|v| !v.is_empty()) {
        Some(appdata) => PathBuf::from(appdata).join(format!("{package_name}.sav")),
        None => PathBuf::from(format!("{package_name}.sav")),
    }
}

#[cfg(not(windows))]
fn default_prefs_file(package_name: &str) -> PathBuf {
    match std::env::var_os("HOME").map(PathBuf::from) {
        Some(home) if home.is_absolute() => home.join(format!(".{package_name}")),
        _ => {
            log::error!("Incorrect or unset environment variable 'HOME'.");
            PathBuf::from(format!(".{package_name}"))
        }
    }
}

impl EngineConfig {
    /// Load the configuration from a JSON string. Missing fields take their
    /// default value.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        serde_json::from_str(json).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Load the configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, CoreError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&content)
    }

    /// Save the configuration to a JSON file.
    pub fn to_file(&self, path: &Path) -> Result<(), CoreError> {
        let json =
            serde_json::to_string_pretty(self).map_err(|e| CoreError::Config(e.to_string()))?;
        std::fs::write(path, json)
            .map_err(|e| CoreError::Config(format!("{}: {e}", path.display())))
    }

    /// Name of the data reference file.
    pub fn data_file_name(&self) -> String {
        format!("{}_data", self.package_name)
    }
}
