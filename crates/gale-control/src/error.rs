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

//! Error type of the engine.

use gale_core::{VarError, VarType};
use thiserror::Error;

use crate::ids::ThreadId;

/// Failures of engine operations. Every one of them is also printed on the
/// shell channel at error level when it occurs.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A module with this name already exists.
    #[error("Core module '{0}' already declared.")]
    ModuleExists(String),
    /// A module id that was never handed out.
    #[error("Unknown module {0}.")]
    UnknownModule(usize),
    /// No module with this name.
    #[error("Module '{0}' not found.")]
    ModuleNotFound(String),
    /// The module already declares a function with this name.
    #[error("Trying to declare an already existing function \"{function}\" for {module} module.")]
    FunctionExists {
        /// Owning module.
        module: String,
        /// Function name.
        function: String,
    },
    /// A bare function name matched no module.
    #[error("Function '{0}' not found in any module.")]
    FunctionNotFound(String),
    /// The qualified function does not exist in its module.
    #[error("Function '{function}' not found in module '{module}'.")]
    FunctionNotInModule {
        /// Module searched.
        module: String,
        /// Function name.
        function: String,
    },
    /// The command does not start with a function name.
    #[error("{0}")]
    BadCommand(String),
    /// The module declares functions but has no shell callback.
    #[error("Module '{0}' has no shell callback set.")]
    NoShellCallback(String),
    /// More arguments than parameters.
    #[error("Too many parameters for function '{0}'.")]
    TooManyParameters(String),
    /// Fewer arguments than parameters.
    #[error("Too few parameters for function '{0}'.")]
    TooFewParameters(String),
    /// An argument does not have the parameter type.
    #[error("Parameter number {position} of wrong type for function '{prototype}'.")]
    ParameterType {
        /// One-based argument position.
        position: usize,
        /// Prototype of the called function.
        prototype: String,
    },
    /// The command ended inside the argument list.
    #[error("Unexpected end of stream after {0} parameter(s).")]
    UnexpectedEnd(usize),
    /// Garbage after an argument.
    #[error("Expected ',' or ')' after {0} parameter(s).")]
    ExpectedSeparator(usize),
    /// The resource is already claimed by another declaration.
    #[error("Module '{module}' tried to declare an already existing resource '{resource}', declared by module '{owner}'.")]
    ResourceExists {
        /// Requesting module.
        module: String,
        /// Resource name.
        resource: String,
        /// Current owner.
        owner: String,
    },
    /// The resource id is unknown, or names a resource nobody claimed yet.
    #[error("Module '{module}' used the not declared resource {resource}.")]
    UnknownResource {
        /// Requesting module.
        module: String,
        /// Resource id.
        resource: usize,
    },
    /// The requester may not write this resource.
    #[error("Module '{module}' tried to change the read-only resource '{resource}'.")]
    ResourceReadOnly {
        /// Requesting module.
        module: String,
        /// Resource name.
        resource: String,
    },
    /// A write would change the type of the resource.
    #[error("Module '{module}' tried to change the type of resource '{resource}' ({expected} expected, {found} given).")]
    ResourceType {
        /// Requesting module.
        module: String,
        /// Resource name.
        resource: String,
        /// Declared type.
        expected: VarType,
        /// Given type.
        found: VarType,
    },
    /// The module has no resource callback.
    #[error("Module '{0}' has no resource callback set.")]
    NoResourceCallback(String),
    /// Thread table is full.
    #[error("Max number of core threads reached ({0}).")]
    TooManyThreads(usize),
    /// The module has no thread callback.
    #[error("Module '{0}' has no thread callback set.")]
    NoThreadCallback(String),
    /// A thread with this name already exists.
    #[error("Module '{module}' tried to declare the already existing thread '{thread}'.")]
    ThreadExists {
        /// Requesting module.
        module: String,
        /// Thread name.
        thread: String,
    },
    /// The thread id is unknown.
    #[error("Module '{module}' tried to {action} the unknown thread {thread}.")]
    UnknownThread {
        /// Requesting module.
        module: String,
        /// Attempted operation.
        action: &'static str,
        /// Thread id.
        thread: ThreadId,
    },
    /// The requester does not own the thread.
    #[error("Module '{module}' tried to {action} the not owned thread '{thread}'.")]
    NotThreadOwner {
        /// Requesting module.
        module: String,
        /// Attempted operation.
        action: &'static str,
        /// Thread name.
        thread: String,
    },
    /// The operation is not allowed on the main thread.
    #[error("Main thread asked to {0}!")]
    MainThread(&'static str),
    /// The thread is already dead.
    #[error("Module '{module}' tried to {action} the dead thread '{thread}'.")]
    DeadThread {
        /// Requesting module.
        module: String,
        /// Attempted operation.
        action: &'static str,
        /// Thread name.
        thread: String,
    },
    /// The thread is private to another module.
    #[error("Module '{module}' tried to require a slot in the private thread '{thread}'.")]
    PrivateThread {
        /// Requesting module.
        module: String,
        /// Thread name.
        thread: String,
    },
    /// The native thread could not be spawned.
    #[error("Can't spawn thread '{thread}': {source}")]
    Spawn {
        /// Thread name.
        thread: String,
        /// OS failure.
        source: std::io::Error,
    },
    /// [`CoreEngine::start`](crate::CoreEngine::start) was already called.
    #[error("Core engine already started.")]
    AlreadyStarted,
    /// No data directory was found at initialisation.
    #[error("Data reference file '{0}' not found.")]
    NoDataDir(String),
    /// The mod is not listed in the global data file.
    #[error("Mod '{0}' not found.")]
    ModNotFound(String),
    /// The `mod_def` file of the mod is missing.
    #[error("Mod's definition file not found.")]
    ModDefinition,
    /// The preferences have not been bound yet.
    #[error("No preferences file bound.")]
    PrefsNotBound,
    /// Typed variable failure, already reported by the parser.
    #[error(transparent)]
    Var(#[from] VarError),
    /// Configuration could not be read or written.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl CoreError {
    /// Returns `true` for failures already reported when they were detected.
    pub(crate) fn is_reported(&self) -> bool {
        matches!(self, CoreError::Var(_))
    }
}
