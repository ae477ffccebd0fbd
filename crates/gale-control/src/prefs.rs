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

//! Persistent per-module preferences.
//!
//! The preferences file holds one array: a sub-array per module with a
//! preferences callback, plus the `versionnumber` of the program that wrote
//! it. A file written by another version is cleared on load.

use std::path::{Path, PathBuf};

use gale_core::{Reader, Var, VarValidator};
use gale_telemetry::ShellLevel;

use crate::engine::CoreEngine;
use crate::error::CoreError;

const VERSION_FIELD: &str = "versionnumber";

#[derive(Debug)]
pub(crate) struct Preferences {
    file: Option<PathBuf>,
    root: Var,
}

impl Preferences {
    pub(crate) fn new() -> Self {
        Self {
            file: None,
            root: Var::array(),
        }
    }
}

fn empty_section(name: &str) -> Var {
    let mut section = Var::array();
    section.set_name(name);
    section
}

impl CoreEngine {
    /// Loads the preferences from `path` and hands every module its
    /// section. Only the first call has an effect; it returns `true`.
    ///
    /// A missing or unreadable file falls back to empty sections.
    pub fn bind_preferences(&self, path: &Path) -> bool {
        {
            let mut prefs = self.prefs();
            if prefs.file.is_some() {
                return false;
            }
            prefs.file = Some(path.to_path_buf());
        }

        let mut root = Var::array();
        match Reader::from_file(path) {
            Ok(mut reader) => {
                // Parse errors are reported; the validator repairs the rest.
                let _ = root.read(&mut reader, self);
            }
            Err(_) => self.shell_print(
                ShellLevel::Info,
                &format!(
                    "Can't open preferences file '{}', using default instead.",
                    path.display()
                ),
            ),
        }

        let callbacks = self.modules().collect(|c| c.prefs.clone());
        let mut validator = VarValidator::new();
        for (_, name, _) in &callbacks {
            validator.declare_array(name);
        }
        validator.declare_string(VERSION_FIELD, "current");
        validator.validate(&mut root, self);

        let version = self.config().version.as_str();
        let stored = root.child_by_name(VERSION_FIELD).and_then(Var::as_str);
        if stored != Some(version) {
            self.shell_print(
                ShellLevel::Info,
                "Preferences version doesn't match current one, clearing.",
            );
            for (_, name, _) in &callbacks {
                if let Some(section) = root.child_by_name_mut(name) {
                    section.set_array();
                }
            }
        }
        if let Some(field) = root.child_by_name_mut(VERSION_FIELD) {
            field.set_string(version);
        }
        self.prefs().root = root;

        for (_, name, callback) in callbacks {
            let mut section = self
                .prefs()
                .root
                .child_by_name(&name)
                .cloned()
                .unwrap_or_else(|| empty_section(&name));
            callback(self, &mut section);
            if let Some(slot) = self.prefs().root.child_by_name_mut(&name) {
                slot.assign(&section);
            }
        }
        self.shell_print(
            ShellLevel::Info,
            &format!("Preferences loaded from file '{}'.", path.display()),
        );
        true
    }

    /// A copy of the whole preferences tree.
    pub fn preferences(&self) -> Result<Var, CoreError> {
        let prefs = self.prefs();
        if prefs.file.is_none() {
            drop(prefs);
            return Err(self.fail(CoreError::PrefsNotBound));
        }
        Ok(prefs.root.clone())
    }

    /// Writes the preferences to the bound file, if any.
    pub(crate) fn save_preferences(&self) -> Result<(), CoreError> {
        let (file, root) = {
            let prefs = self.prefs();
            match &prefs.file {
                Some(file) => (file.clone(), prefs.root.clone()),
                None => return Ok(()),
            }
        };
        match root.save_to_file(&file) {
            Ok(()) => {
                self.shell_print(
                    ShellLevel::Info,
                    &format!("Preferences saved to file '{}'", file.display()),
                );
                Ok(())
            }
            Err(e) => {
                self.shell_print(
                    ShellLevel::Error,
                    &format!("Can't write preferences file '{}' !", file.display()),
                );
                Err(e.into())
            }
        }
    }
}
