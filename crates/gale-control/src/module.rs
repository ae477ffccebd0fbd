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

//! Modules and the callbacks they plug into the engine.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use gale_core::{NameIndex, Var, VarType};

use crate::engine::CoreEngine;
use crate::error::CoreError;
use crate::ids::{FunctionId, ModuleId, ResourceId, ThreadId};
use crate::shell::{ShellCall, ShellFunction};

/// Engine-wide events, delivered from the main thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreEvent {
    /// Preferences are bound; the main loop is about to run.
    Ready,
    /// A mod starts loading.
    DataLoading,
    /// Every data callback got its part of the mod.
    DataLoaded,
    /// The engine paused.
    Pause,
    /// The engine resumed.
    Resume,
}

/// Receives [`CoreEvent`]s.
pub type EventCallback = Arc<dyn Fn(&CoreEngine, CoreEvent) + Send + Sync>;
/// Receives the module's part of a mod definition, `None` if absent.
pub type DataCallback = Arc<dyn Fn(&CoreEngine, Option<&Var>) + Send + Sync>;
/// Executes the module's shell functions; demuxes on [`ShellCall::function`].
pub type ShellCallback = Arc<dyn Fn(&CoreEngine, &mut ShellCall) + Send + Sync>;
/// Receives the module's preferences array, which it may modify.
pub type PrefsCallback = Arc<dyn Fn(&CoreEngine, &mut Var) + Send + Sync>;
/// Receives a copy of a watched resource value.
pub type ResourceCallback = Arc<dyn Fn(&CoreEngine, ResourceId, &Var) + Send + Sync>;
/// Runs one iteration on a thread the module owns or has a slot in.
pub type ThreadCallback = Arc<dyn Fn(&CoreEngine, ThreadId, Duration) + Send + Sync>;

/// The set of optional callbacks a module registers with.
#[derive(Clone, Default)]
pub struct ModuleCallbacks {
    pub(crate) event: Option<EventCallback>,
    pub(crate) data: Option<DataCallback>,
    pub(crate) shell: Option<ShellCallback>,
    pub(crate) prefs: Option<PrefsCallback>,
    pub(crate) resource: Option<ResourceCallback>,
    pub(crate) thread: Option<ThreadCallback>,
}

impl ModuleCallbacks {
    /// No callback at all.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the event callback.
    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&CoreEngine, CoreEvent) + Send + Sync + 'static,
    {
        self.event = Some(Arc::new(f));
        self
    }

    /// Sets the data callback.
    pub fn on_data<F>(mut self, f: F) -> Self
    where
        F: Fn(&CoreEngine, Option<&Var>) + Send + Sync + 'static,
    {
        self.data = Some(Arc::new(f));
        self
    }

    /// Sets the shell callback.
    pub fn on_shell<F>(mut self, f: F) -> Self
    where
        F: Fn(&CoreEngine, &mut ShellCall) + Send + Sync + 'static,
    {
        self.shell = Some(Arc::new(f));
        self
    }

    /// Sets the preferences callback.
    pub fn on_prefs<F>(mut self, f: F) -> Self
    where
        F: Fn(&CoreEngine, &mut Var) + Send + Sync + 'static,
    {
        self.prefs = Some(Arc::new(f));
        self
    }

    /// Sets the resource callback.
    pub fn on_resource<F>(mut self, f: F) -> Self
    where
        F: Fn(&CoreEngine, ResourceId, &Var) + Send + Sync + 'static,
    {
        self.resource = Some(Arc::new(f));
        self
    }

    /// Sets the thread callback.
    pub fn on_thread<F>(mut self, f: F) -> Self
    where
        F: Fn(&CoreEngine, ThreadId, Duration) + Send + Sync + 'static,
    {
        self.thread = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for ModuleCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleCallbacks")
            .field("event", &self.event.is_some())
            .field("data", &self.data.is_some())
            .field("shell", &self.shell.is_some())
            .field("prefs", &self.prefs.is_some())
            .field("resource", &self.resource.is_some())
            .field("thread", &self.thread.is_some())
            .finish()
    }
}

/// A declared module and its shell functions.
#[derive(Debug)]
pub(crate) struct Module {
    pub(crate) id: ModuleId,
    pub(crate) name: String,
    pub(crate) callbacks: ModuleCallbacks,
    pub(crate) functions: Vec<ShellFunction>,
    function_index: NameIndex,
}

impl Module {
    pub(crate) fn find_function(&self, name: &str) -> Option<&ShellFunction> {
        self.function_index
            .lookup(name)
            .and_then(|i| self.functions.get(i))
    }

    /// Functions sorted by name.
    pub(crate) fn sorted_functions(&self) -> impl Iterator<Item = &ShellFunction> {
        self.function_index
            .iter()
            .filter_map(|key| self.functions.get(key.index))
    }
}

/// Table of declared modules, indexed by name.
#[derive(Debug)]
pub(crate) struct ModuleRegistry {
    modules: Vec<Module>,
    index: NameIndex,
}

impl ModuleRegistry {
    pub(crate) fn new() -> Self {
        Self {
            modules: Vec::new(),
            index: NameIndex::name_index(),
        }
    }

    pub(crate) fn declare(
        &mut self,
        name: &str,
        callbacks: ModuleCallbacks,
    ) -> Result<ModuleId, CoreError> {
        if self.index.lookup(name).is_some() {
            return Err(CoreError::ModuleExists(name.to_owned()));
        }
        let id = ModuleId(self.modules.len());
        self.modules.push(Module {
            id,
            name: name.to_owned(),
            callbacks,
            functions: Vec::new(),
            function_index: NameIndex::name_index(),
        });
        self.index
            .rebuild(self.modules.iter().map(|m| m.name.as_str()));
        Ok(id)
    }

    pub(crate) fn declare_function(
        &mut self,
        module: ModuleId,
        name: &str,
        ret: VarType,
        params: &[VarType],
    ) -> Result<FunctionId, CoreError> {
        let module = self
            .modules
            .get_mut(module.index())
            .ok_or(CoreError::UnknownModule(module.index()))?;
        if module.function_index.lookup(name).is_some() {
            return Err(CoreError::FunctionExists {
                module: module.name.clone(),
                function: name.to_owned(),
            });
        }
        let id = FunctionId(module.functions.len());
        module.functions.push(ShellFunction {
            name: name.to_owned(),
            id,
            ret,
            params: params.to_vec(),
        });
        module
            .function_index
            .rebuild(module.functions.iter().map(|f| f.name.as_str()));
        Ok(id)
    }

    pub(crate) fn get(&self, id: ModuleId) -> Option<&Module> {
        self.modules.get(id.index())
    }

    pub(crate) fn find(&self, name: &str) -> Option<&Module> {
        self.index.lookup(name).and_then(|i| self.modules.get(i))
    }

    pub(crate) fn iter(&self) -> std::slice::Iter<'_, Module> {
        self.modules.iter()
    }

    pub(crate) fn len(&self) -> usize {
        self.modules.len()
    }

    /// Name of a module for diagnostics.
    pub(crate) fn name_of(&self, id: ModuleId) -> String {
        self.get(id)
            .map_or_else(|| format!("unknown({id})"), |m| m.name.clone())
    }

    /// Resolves `[module.]function`. A bare name is searched in every module,
    /// in declaration order; the first match wins.
    pub(crate) fn resolve(
        &self,
        module: Option<&str>,
        function: &str,
    ) -> Result<(&Module, &ShellFunction), CoreError> {
        match module {
            Some(module_name) => {
                let module = self
                    .find(module_name)
                    .ok_or_else(|| CoreError::ModuleNotFound(module_name.to_owned()))?;
                let func = module.find_function(function).ok_or_else(|| {
                    CoreError::FunctionNotInModule {
                        module: module_name.to_owned(),
                        function: function.to_owned(),
                    }
                })?;
                Ok((module, func))
            }
            None => self
                .modules
                .iter()
                .find_map(|m| m.find_function(function).map(|f| (m, f)))
                .ok_or_else(|| CoreError::FunctionNotFound(function.to_owned())),
        }
    }

    /// Collects `(module, callback)` pairs selected by `pick`, in declaration
    /// order, so they can be invoked once the registry lock is released.
    pub(crate) fn collect<T, F>(&self, pick: F) -> Vec<(ModuleId, String, T)>
    where
        F: Fn(&ModuleCallbacks) -> Option<T>,
    {
        self.modules
            .iter()
            .filter_map(|m| pick(&m.callbacks).map(|cb| (m.id, m.name.clone(), cb)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_module_is_rejected() {
        let mut registry = ModuleRegistry::new();
        assert_eq!(registry.declare("a", ModuleCallbacks::new()).unwrap(), ModuleId(0));
        assert!(matches!(
            registry.declare("a", ModuleCallbacks::new()),
            Err(CoreError::ModuleExists(_))
        ));
        assert_eq!(registry.declare("A", ModuleCallbacks::new()).unwrap(), ModuleId(1));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn sorted_lookup_matches_declaration_table() {
        let mut registry = ModuleRegistry::new();
        let names = ["world", "gui", "sound", "graphics", "core", "shell", "aaa"];
        for name in names {
            registry.declare(name, ModuleCallbacks::new()).unwrap();
        }
        for (i, name) in names.iter().enumerate() {
            assert_eq!(registry.find(name).map(|m| m.id), Some(ModuleId(i)));
        }
        assert!(registry.find("missing").is_none());
    }

    #[test]
    fn functions_are_per_module() {
        let mut registry = ModuleRegistry::new();
        let a = registry.declare("a", ModuleCallbacks::new()).unwrap();
        let b = registry.declare("b", ModuleCallbacks::new()).unwrap();
        registry.declare_function(a, "zeta", VarType::Void, &[]).unwrap();
        registry
            .declare_function(a, "run", VarType::Int, &[VarType::Int])
            .unwrap();
        assert_eq!(
            registry.declare_function(b, "run", VarType::Void, &[]).unwrap(),
            FunctionId(0)
        );
        assert!(matches!(
            registry.declare_function(a, "run", VarType::Void, &[]),
            Err(CoreError::FunctionExists { .. })
        ));
        assert!(matches!(
            registry.declare_function(ModuleId(9), "x", VarType::Void, &[]),
            Err(CoreError::UnknownModule(9))
        ));

        let (module, func) = registry.resolve(None, "run").unwrap();
        assert_eq!((module.id, func.id), (a, FunctionId(1)));
        let (module, func) = registry.resolve(Some("b"), "run").unwrap();
        assert_eq!((module.id, func.id), (b, FunctionId(0)));
        assert!(matches!(
            registry.resolve(Some("b"), "zeta"),
            Err(CoreError::FunctionNotInModule { .. })
        ));
        assert!(matches!(
            registry.resolve(Some("c"), "zeta"),
            Err(CoreError::ModuleNotFound(_))
        ));

        let sorted: Vec<&str> = registry
            .get(a)
            .unwrap()
            .sorted_functions()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(sorted, ["run", "zeta"]);
    }
}
