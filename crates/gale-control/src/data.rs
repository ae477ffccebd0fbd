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

//! Data directory and mod loading.
//!
//! The data directory is the first directory of the search path holding the
//! `<package>_data` reference file, which lists the available mods. A mod is
//! a sub-directory whose `mod_def` file holds one section per module with a
//! data callback.

use std::path::PathBuf;

use gale_core::{Reader, Var, VarError, VarValidator};
use gale_telemetry::ShellLevel;

use crate::engine::CoreEngine;
use crate::error::CoreError;
use crate::module::CoreEvent;

const MOD_DEFINITION: &str = "mod_def";

#[derive(Debug, Default)]
pub(crate) struct DataPaths {
    data_dir: Option<PathBuf>,
    mod_path: PathBuf,
    mods: Vec<String>,
    current: Option<String>,
}

impl CoreEngine {
    /// Searches the data directory and reads the mod list.
    pub(crate) fn locate_data(&self) {
        let file_name = self.config().data_file_name();
        let found = self
            .config()
            .data_search_path
            .iter()
            .find(|dir| dir.join(&file_name).is_file())
            .cloned();
        let Some(dir) = found else {
            self.shell_print(
                ShellLevel::Error,
                &CoreError::NoDataDir(file_name).to_string(),
            );
            return;
        };
        self.shell_print(
            ShellLevel::Info,
            &format!(" -> Datas found in: {}", dir.display()),
        );

        let list_path = dir.join(&file_name);
        let mut list = Var::new();
        if let Ok(mut reader) = Reader::from_file(&list_path) {
            let _ = list.read(&mut reader, self);
        }
        let mods = match list.as_array() {
            Some(array) => array
                .iter()
                .filter_map(Var::as_str)
                .map(str::to_owned)
                .collect(),
            None => {
                self.shell_print(
                    ShellLevel::Error,
                    &format!("Can't open global data file '{}'.", list_path.display()),
                );
                Vec::new()
            }
        };

        let mut data = self.data();
        data.data_dir = Some(dir);
        data.mods = mods;
    }

    /// Loads the mod `name`: its definition is validated, then each module
    /// with a data callback receives its section between
    /// [`CoreEvent::DataLoading`] and [`CoreEvent::DataLoaded`].
    ///
    /// On failure the previously loaded mod stays active.
    pub fn load_data(&self, name: &str) -> Result<(), CoreError> {
        let (data_dir, listed, old_path) = {
            let data = self.data();
            (
                data.data_dir.clone(),
                data.mods.iter().any(|m| m == name),
                data.mod_path.clone(),
            )
        };
        let Some(data_dir) = data_dir else {
            return Err(self.fail(CoreError::NoDataDir(self.config().data_file_name())));
        };
        if !listed {
            return Err(self.fail(CoreError::ModNotFound(name.to_owned())));
        }

        let mod_path = data_dir.join(name);
        self.data().mod_path = mod_path.clone();
        self.shell_print(
            ShellLevel::Info,
            &format!("Start loading mod: {}", mod_path.display()),
        );
        self.shell().push_context(&format!("In mod: {name}"));

        let mut definition = Var::array();
        if let Err(VarError::FileOpen(_)) = definition.read_file(self, MOD_DEFINITION) {
            let error = self.fail(CoreError::ModDefinition);
            self.shell().pop_context();
            self.data().mod_path = old_path;
            return Err(error);
        }

        let callbacks = self.modules().collect(|c| c.data.clone());
        let mut validator = VarValidator::new();
        for (_, module, _) in &callbacks {
            validator.declare_array(module);
        }
        validator.validate(&mut definition, self);

        self.dispatch_event(CoreEvent::DataLoading);
        for (_, module, callback) in callbacks {
            self.shell_print(
                ShellLevel::Info,
                &format!("Sending datas to '{module}' module."),
            );
            callback(self, definition.child_by_name(&module));
        }
        self.dispatch_event(CoreEvent::DataLoaded);

        self.data().current = Some(name.to_owned());
        self.shell().pop_context();
        Ok(())
    }

    /// Resolves `path` against the directory of the active mod.
    pub fn find_data(&self, path: &str) -> PathBuf {
        self.data().mod_path.join(path)
    }

    /// The data directory, if one was found.
    pub fn data_dir(&self) -> Option<PathBuf> {
        self.data().data_dir.clone()
    }

    /// Mods listed in the data reference file.
    pub fn mods(&self) -> Vec<String> {
        self.data().mods.clone()
    }

    /// The last mod loaded successfully.
    pub fn current_mod(&self) -> Option<String> {
        self.data().current.clone()
    }
}
