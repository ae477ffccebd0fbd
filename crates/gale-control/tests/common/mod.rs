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

//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use gale_control::{CoreEngine, EngineConfig};
use gale_telemetry::ShellLevel;

/// A configuration isolated from the host: no data directory and a
/// preferences file inside `dir`.
pub fn isolated_config(dir: &Path) -> EngineConfig {
    EngineConfig {
        version: "1.0".to_owned(),
        data_search_path: Vec::new(),
        prefs_file: dir.join("prefs"),
        ..EngineConfig::default()
    }
}

/// Every message printed on the shell channel.
#[derive(Clone, Default)]
pub struct Captured(Arc<Mutex<Vec<(ShellLevel, String)>>>);

impl Captured {
    /// Shows every level and records what is printed.
    pub fn install(engine: &CoreEngine) -> Self {
        let captured = Self::default();
        let sink = captured.clone();
        engine.shell().set_level(ShellLevel::HardDebug);
        engine
            .shell()
            .set_print_callback(move |level, msg| sink.0.lock().unwrap().push((level, msg.to_owned())));
        captured
    }

    pub fn lines(&self) -> Vec<(ShellLevel, String)> {
        self.0.lock().unwrap().clone()
    }

    pub fn contains(&self, level: ShellLevel, needle: &str) -> bool {
        self.lines()
            .iter()
            .any(|(l, msg)| *l == level && msg.contains(needle))
    }

    pub fn user_lines(&self) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(l, _)| *l == ShellLevel::User)
            .map(|(_, msg)| msg)
            .collect()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }
}

/// Polls `condition` until it holds or `timeout` elapses.
pub fn wait_until<F: FnMut() -> bool>(timeout: Duration, mut condition: F) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    condition()
}
