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

//! The engine context object.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak,
};
use std::time::Duration;

use gale_core::{Reader, Var, VarEnv, VarError};
use gale_telemetry::{ShellChannel, ShellLevel};

use crate::completion::{CompletionCursor, CompletionList};
use crate::config::EngineConfig;
use crate::data::DataPaths;
use crate::error::CoreError;
use crate::ids::ModuleId;
use crate::module::{CoreEvent, ModuleCallbacks, ModuleRegistry};
use crate::prefs::Preferences;
use crate::resource::ResourceRegistry;
use crate::scheduler::{CoreState, Scheduler};

/// The built-in `shell` module.
pub const SHELL_MODULE: ModuleId = ModuleId(0);
/// The built-in `core` module, owner of the main thread.
pub const CORE_MODULE: ModuleId = ModuleId(1);

type Translator = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Everything a running engine owns: modules, resources, threads,
/// preferences and the shell channel.
///
/// Created with [`CoreEngine::new`], shared as an `Arc` between the threads
/// it spawns.
pub struct CoreEngine {
    this: Weak<CoreEngine>,
    config: EngineConfig,
    shell: ShellChannel,
    modules: RwLock<ModuleRegistry>,
    resources: RwLock<ResourceRegistry>,
    pub(crate) scheduler: Scheduler,
    completion: Mutex<CompletionList>,
    prefs: Mutex<Preferences>,
    data: Mutex<DataPaths>,
    state: Mutex<CoreState>,
    started: AtomicBool,
    translator: RwLock<Option<Translator>>,
}

impl fmt::Debug for CoreEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreEngine")
            .field("package", &self.config.package_name)
            .field("modules", &self.modules().len())
            .field("threads", &self.scheduler.len())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl CoreEngine {
    /// Builds an engine: declares the built-in modules, locates the data
    /// directory and sets up the main thread.
    ///
    /// # Panics
    ///
    /// If the built-in modules cannot be declared.
    pub fn new(config: EngineConfig) -> Arc<Self> {
        let main_timer = Duration::from_millis(config.main_timer_ms);
        let engine = Arc::new_cyclic(|this| Self {
            this: this.clone(),
            scheduler: Scheduler::new(CORE_MODULE, main_timer, config.max_threads),
            config,
            shell: ShellChannel::new(),
            modules: RwLock::new(ModuleRegistry::new()),
            resources: RwLock::new(ResourceRegistry::new()),
            completion: Mutex::new(CompletionList::new()),
            prefs: Mutex::new(Preferences::new()),
            data: Mutex::new(DataPaths::default()),
            state: Mutex::new(CoreState::Running),
            started: AtomicBool::new(false),
            translator: RwLock::new(None),
        });
        engine.declare_builtins();
        engine.locate_data();
        engine
    }

    /// Declares a module. Names are unique and case-sensitive.
    pub fn declare_module(
        &self,
        name: &str,
        callbacks: ModuleCallbacks,
    ) -> Result<ModuleId, CoreError> {
        let declared = self.modules_mut().declare(name, callbacks);
        match declared {
            Ok(id) => {
                self.completion().add(name);
                self.shell_print(ShellLevel::Debug, &format!("Module '{name}' declared ({id})."));
                Ok(id)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Looks a module up by name.
    pub fn module_id(&self, name: &str) -> Option<ModuleId> {
        self.modules().find(name).map(|m| m.id)
    }

    /// Name of a declared module.
    pub fn module_name(&self, id: ModuleId) -> Option<String> {
        self.modules().get(id).map(|m| m.name.clone())
    }

    /// Configuration the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The shell logging channel.
    pub fn shell(&self) -> &ShellChannel {
        &self.shell
    }

    /// Sets the table used to translate `&"..."` strings.
    pub fn set_translator<F>(&self, translator: F)
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        *self
            .translator
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(translator));
    }

    /// Completes `prefix` against every declared name.
    pub fn complete(&self, prefix: &str) -> CompletionCursor {
        self.completion().query(prefix)
    }

    /// Delivers `event` to every event callback, in declaration order.
    pub fn dispatch_event(&self, event: CoreEvent) {
        let callbacks = self.modules().collect(|c| c.event.clone());
        for (_, _, callback) in callbacks {
            callback(self, event);
        }
    }

    /// Binds preferences, fires [`CoreEvent::Ready`] and runs the main thread
    /// on the calling thread. Returns once every thread is dead.
    pub fn start(&self) -> Result<(), CoreError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(self.fail(CoreError::AlreadyStarted));
        }
        let prefs_file = self.config.prefs_file.clone();
        self.bind_preferences(&prefs_file);
        self.dispatch_event(CoreEvent::Ready);
        self.run_main_thread();
        Ok(())
    }

    /// Asks every thread, the main one included, to terminate.
    pub fn stop(&self) {
        self.term_all_threads();
    }

    /// Requests a global pause, delivered by the main thread.
    pub fn pause(&self) {
        let mut state = self.lock_state();
        if *state == CoreState::Running {
            *state = CoreState::WillPause;
        }
    }

    /// Requests a global resume, delivered by the main thread.
    pub fn resume(&self) {
        let mut state = self.lock_state();
        if *state == CoreState::Paused {
            *state = CoreState::WillResume;
        }
    }

    /// Current global state.
    pub fn state(&self) -> CoreState {
        *self.lock_state()
    }

    /// Terminates every thread, waits until the workers are dead, then saves
    /// preferences to the bound file.
    pub fn shutdown(&self) -> Result<(), CoreError> {
        self.stop_all_threads();
        self.save_preferences()
    }

    pub(crate) fn advance_state(&self) -> Option<CoreEvent> {
        let mut state = self.lock_state();
        let (next, event) = state.step();
        *state = next;
        event
    }

    pub(crate) fn arc(&self) -> Option<Arc<Self>> {
        self.this.upgrade()
    }

    fn lock_state(&self) -> MutexGuard<'_, CoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn modules(&self) -> RwLockReadGuard<'_, ModuleRegistry> {
        self.modules.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn modules_mut(&self) -> RwLockWriteGuard<'_, ModuleRegistry> {
        self.modules.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn resources(&self) -> RwLockReadGuard<'_, ResourceRegistry> {
        self.resources.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn resources_mut(&self) -> RwLockWriteGuard<'_, ResourceRegistry> {
        self.resources.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn completion(&self) -> MutexGuard<'_, CompletionList> {
        self.completion.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn prefs(&self) -> MutexGuard<'_, Preferences> {
        self.prefs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn data(&self) -> MutexGuard<'_, DataPaths> {
        self.data.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn shell_print(&self, level: ShellLevel, msg: &str) {
        self.shell.print(level, msg);
    }

    /// Reports `error` on the shell channel unless the parser already did.
    pub(crate) fn fail(&self, error: CoreError) -> CoreError {
        if !error.is_reported() {
            self.shell.print(ShellLevel::Error, &error.to_string());
        }
        error
    }
}

impl VarEnv for CoreEngine {
    fn translate(&self, text: &str) -> String {
        let translator = self
            .translator
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match translator {
            Some(translate) => translate(text),
            None => text.to_owned(),
        }
    }

    fn exec_call(&self, reader: &mut Reader) -> Result<Var, VarError> {
        self.exec_from_reader(reader)
            .map_err(|e| VarError::Call(e.to_string()))
    }

    fn resolve_path(&self, path: &str) -> PathBuf {
        self.find_data(path)
    }

    fn report(&self, level: log::Level, msg: &str) {
        self.shell.print(ShellLevel::from(level), msg);
    }

    fn push_context(&self, msg: &str) {
        self.shell.push_context(msg);
    }

    fn pop_context(&self) {
        self.shell.pop_context();
    }
}
