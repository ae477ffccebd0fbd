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

//! Shell function declaration and dispatch.
//!
//! A command is `[module.]function[(arg, ...)]`, each argument being a typed
//! variable expression. Arguments must match the declared parameter types
//! exactly; the call then goes to the single shell callback of the owning
//! module.

use gale_core::{Int, Reader, Token, Var, VarType};
use gale_telemetry::ShellLevel;

use crate::engine::CoreEngine;
use crate::error::CoreError;
use crate::ids::{FunctionId, ModuleId};

/// A declared shell function.
#[derive(Debug, Clone, PartialEq)]
pub struct ShellFunction {
    /// Name, unique within the module.
    pub name: String,
    /// Position in the module's declaration order.
    pub id: FunctionId,
    /// Declared return type.
    pub ret: VarType,
    /// Declared parameter types.
    pub params: Vec<VarType>,
}

impl ShellFunction {
    /// Renders `ret name(param,param)`.
    pub fn prototype(&self) -> String {
        let params: Vec<&str> = self.params.iter().map(|t| t.name()).collect();
        format!("{} {}({})", self.ret, self.name, params.join(","))
    }
}

/// A call in progress, handed to the module's shell callback.
#[derive(Debug, Clone)]
pub struct ShellCall {
    /// Module owning the function.
    pub module: ModuleId,
    /// Called function.
    pub function: FunctionId,
    /// Name of the called function.
    pub name: String,
    /// Arguments, typed as declared.
    pub args: Vec<Var>,
    /// Return slot, Void until the callback sets it.
    pub ret: Var,
}

impl ShellCall {
    /// Integer argument at `pos`.
    pub fn int_arg(&self, pos: usize) -> Option<Int> {
        self.args.get(pos).and_then(Var::as_int)
    }

    /// String argument at `pos`.
    pub fn str_arg(&self, pos: usize) -> Option<&str> {
        self.args.get(pos).and_then(Var::as_str)
    }
}

impl CoreEngine {
    /// Declares a shell function for `module`.
    pub fn declare_shell_function(
        &self,
        module: ModuleId,
        name: &str,
        ret: VarType,
        params: &[VarType],
    ) -> Result<FunctionId, CoreError> {
        let declared = self
            .modules_mut()
            .declare_function(module, name, ret, params);
        match declared {
            Ok(id) => {
                self.completion().add(name);
                Ok(id)
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    /// Executes a function call given as text.
    pub fn shell_exec(&self, command: &str) -> Result<Var, CoreError> {
        self.exec_from_reader(&mut Reader::new(command))
    }

    /// Evaluates a full value expression, typically a command typed in a
    /// console. A non-Void result is printed for the user.
    pub fn shell_exec_command(&self, command: &str) -> Result<Var, CoreError> {
        let mut result = Var::new();
        result.read(&mut Reader::new(command), self)?;
        if result.var_type() != VarType::Void {
            self.shell_print(
                ShellLevel::User,
                &format!("Shell execution returned: {}", result.image()),
            );
        }
        Ok(result)
    }

    /// Executes the call starting at the current token of `reader`.
    pub fn exec_from_reader(&self, reader: &mut Reader) -> Result<Var, CoreError> {
        self.dispatch(reader).map_err(|e| self.fail(e))
    }

    fn dispatch(&self, reader: &mut Reader) -> Result<Var, CoreError> {
        let Token::Ident(first) = reader.current().clone() else {
            return Err(CoreError::BadCommand(
                "Asked shell to execute a badly formatted command.".to_owned(),
            ));
        };
        reader.forward();

        let (module_name, function_name) = if reader.is_char('.') {
            let Token::Ident(function) = reader.forward().clone() else {
                return Err(CoreError::BadCommand(format!(
                    "Didn't find a function name after prefix '{first}.'"
                )));
            };
            reader.forward();
            (Some(first), function)
        } else {
            (None, first)
        };

        let (module, function, callback) = {
            let modules = self.modules();
            let (module, function) = modules.resolve(module_name.as_deref(), &function_name)?;
            let callback = module
                .callbacks
                .shell
                .clone()
                .ok_or_else(|| CoreError::NoShellCallback(module.name.clone()))?;
            (module.id, function.clone(), callback)
        };

        let args = self.read_arguments(reader, &function)?;
        let mut call = ShellCall {
            module,
            function: function.id,
            name: function.name.clone(),
            args,
            ret: Var::new(),
        };
        callback(self, &mut call);

        if call.ret.var_type() != function.ret {
            self.shell_print(
                ShellLevel::Info,
                &format!(
                    "Function '{}' returned a {} value.",
                    function.prototype(),
                    call.ret.var_type()
                ),
            );
        }
        Ok(call.ret)
    }

    fn read_arguments(
        &self,
        reader: &mut Reader,
        function: &ShellFunction,
    ) -> Result<Vec<Var>, CoreError> {
        let mut args: Vec<Var> = Vec::with_capacity(function.params.len());

        if reader.is_char('(') {
            reader.forward();
            if reader.is_char(')') {
                reader.forward();
            } else {
                loop {
                    let Some(&expected) = function.params.get(args.len()) else {
                        return Err(CoreError::TooManyParameters(function.prototype()));
                    };
                    let mut arg = Var::new();
                    arg.read(reader, self)?;
                    if arg.var_type() != expected {
                        return Err(CoreError::ParameterType {
                            position: args.len() + 1,
                            prototype: function.prototype(),
                        });
                    }
                    args.push(arg);

                    match reader.current() {
                        Token::End => return Err(CoreError::UnexpectedEnd(args.len())),
                        Token::Char(')') => {
                            reader.forward();
                            break;
                        }
                        Token::Char(',') => {
                            reader.forward();
                        }
                        _ => return Err(CoreError::ExpectedSeparator(args.len())),
                    }
                }
            }
        }

        if args.len() < function.params.len() {
            return Err(CoreError::TooFewParameters(function.prototype()));
        }
        Ok(args)
    }
}
