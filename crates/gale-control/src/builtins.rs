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

//! The `shell` and `core` modules every engine declares.

use gale_core::{Var, VarType};
use gale_telemetry::ShellLevel;

use crate::engine::{CoreEngine, CORE_MODULE, SHELL_MODULE};
use crate::ids::{FunctionId, ModuleId};
use crate::module::ModuleCallbacks;
use crate::shell::ShellCall;

/// Functions of the `shell` module, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
enum ShellBuiltin {
    Quit,
    Print,
    Cat,
    SetLevel,
}

impl ShellBuiltin {
    const ALL: [Self; 4] = [Self::Quit, Self::Print, Self::Cat, Self::SetLevel];

    fn signature(self) -> (&'static str, VarType, &'static [VarType]) {
        match self {
            Self::Quit => ("quit", VarType::Void, &[]),
            Self::Print => ("print", VarType::Void, &[VarType::String]),
            Self::Cat => ("cat", VarType::String, &[VarType::String, VarType::String]),
            Self::SetLevel => ("setlevel", VarType::Void, &[VarType::Int]),
        }
    }
}

/// Functions of the `core` module, in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
enum CoreBuiltin {
    LsMod,
    LsFunc,
    LsRes,
    EchoRes,
    Pause,
    Resume,
}

impl CoreBuiltin {
    const ALL: [Self; 6] = [
        Self::LsMod,
        Self::LsFunc,
        Self::LsRes,
        Self::EchoRes,
        Self::Pause,
        Self::Resume,
    ];

    fn signature(self) -> (&'static str, VarType, &'static [VarType]) {
        match self {
            Self::LsMod => ("lsmod", VarType::Void, &[]),
            Self::LsFunc => ("lsfunc", VarType::Void, &[VarType::String]),
            Self::LsRes => ("lsres", VarType::Void, &[]),
            Self::EchoRes => ("echores", VarType::Void, &[VarType::String]),
            Self::Pause => ("pause", VarType::Void, &[]),
            Self::Resume => ("resume", VarType::Void, &[]),
        }
    }
}

impl CoreEngine {
    pub(crate) fn declare_builtins(&self) {
        self.declare_builtin_module(
            "shell",
            SHELL_MODULE,
            ModuleCallbacks::new().on_shell(shell_command),
            &ShellBuiltin::ALL.map(ShellBuiltin::signature),
        );
        self.declare_builtin_module(
            "core",
            CORE_MODULE,
            ModuleCallbacks::new().on_shell(core_command),
            &CoreBuiltin::ALL.map(CoreBuiltin::signature),
        );
    }

    fn declare_builtin_module(
        &self,
        name: &str,
        expected: ModuleId,
        callbacks: ModuleCallbacks,
        functions: &[(&'static str, VarType, &'static [VarType])],
    ) {
        match self.declare_module(name, callbacks) {
            Ok(id) if id == expected => {}
            _ => panic!("Can't declare the built-in '{name}' module."),
        }
        for (index, &(function, ret, params)) in functions.iter().enumerate() {
            match self.declare_shell_function(expected, function, ret, params) {
                Ok(id) if id == FunctionId(index) => {}
                _ => panic!("Can't declare the built-in function '{name}.{function}'."),
            }
        }
    }
}

fn shell_command(engine: &CoreEngine, call: &mut ShellCall) {
    let Some(&builtin) = ShellBuiltin::ALL.get(call.function.index()) else {
        return;
    };
    match builtin {
        ShellBuiltin::Quit => engine.stop(),
        ShellBuiltin::Print => {
            if let Some(text) = call.str_arg(0) {
                engine.shell().print(ShellLevel::User, text);
            }
        }
        ShellBuiltin::Cat => {
            let joined = format!(
                "{}{}",
                call.str_arg(0).unwrap_or_default(),
                call.str_arg(1).unwrap_or_default()
            );
            call.ret = Var::from(joined);
        }
        ShellBuiltin::SetLevel => {
            if let Some(level) = call.int_arg(0) {
                engine.shell().set_level(ShellLevel::clamped(level));
            }
        }
    }
}

fn core_command(engine: &CoreEngine, call: &mut ShellCall) {
    let Some(&builtin) = CoreBuiltin::ALL.get(call.function.index()) else {
        return;
    };
    let user = |msg: &str| engine.shell().print(ShellLevel::User, msg);
    match builtin {
        CoreBuiltin::LsMod => {
            let names: Vec<String> = engine.modules().iter().map(|m| m.name.clone()).collect();
            user("Declared modules:");
            for name in names {
                user(&format!(" {name}"));
            }
        }
        CoreBuiltin::LsFunc => {
            let module = call.str_arg(0).unwrap_or_default();
            let prototypes: Option<Vec<String>> = engine
                .modules()
                .find(module)
                .map(|m| m.sorted_functions().map(|f| f.prototype()).collect());
            match prototypes {
                Some(prototypes) => {
                    user(&format!("Declared functions for {module} module:"));
                    for prototype in prototypes {
                        user(&format!(" {prototype}"));
                    }
                }
                None => engine
                    .shell()
                    .print(ShellLevel::Error, &format!("Module {module} not found.")),
            }
        }
        CoreBuiltin::LsRes => {
            let names: Vec<String> = engine.resources().iter().map(|r| r.name.clone()).collect();
            user("Declared resources:");
            for name in names {
                user(&format!(" {name}"));
            }
        }
        CoreBuiltin::EchoRes => {
            let name = call.str_arg(0).unwrap_or_default();
            match engine.resource_id(name).and_then(|id| engine.resource_value(id)) {
                Some(value) => user(value.image()),
                None => engine
                    .shell()
                    .print(ShellLevel::Error, &format!("Ressource '{name}' not found.")),
            }
        }
        CoreBuiltin::Pause => engine.pause(),
        CoreBuiltin::Resume => engine.resume(),
    }
}
