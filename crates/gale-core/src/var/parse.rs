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

//! Parsing variables from a token stream.
//!
//! ```text
//! var   := ('#' IDENT '=')? value
//! value := STRING | INT | FLOAT | '[' (var (',' var)*)? ']' | '@' STRING | call | <empty>
//! ```
//!
//! An empty value, right before `,`, `]` or the end of the stream, is Void.
//! An array whose only child is an unnamed Void renders as `[]` and reads
//! back empty; any other Void children survive the trip (`[1,]`, `[,]`).
//!
//! A string starting with `&` goes through [`VarEnv::translate`]; a call is
//! handed to [`VarEnv::exec_call`].

use crate::env::VarEnv;
use crate::error::VarError;
use crate::reader::{Reader, Token};

use super::Var;

fn syntax(env: &dyn VarEnv, msg: String) -> VarError {
    env.report(log::Level::Error, &msg);
    VarError::Syntax(msg)
}

impl Var {
    /// Parses a variable from `text`.
    pub fn parse(text: &str, env: &dyn VarEnv) -> Result<Var, VarError> {
        let mut var = Var::new();
        var.read(&mut Reader::new(text), env)?;
        Ok(var)
    }

    /// Reads a variable from the current position of `reader`.
    ///
    /// The name is taken from a leading `#name=` and cleared otherwise. On
    /// error the diagnostic is reported through `env` and the variable is
    /// left Void; the reader stays where the error was detected.
    pub fn read(&mut self, reader: &mut Reader, env: &dyn VarEnv) -> Result<(), VarError> {
        let result = self.read_named(reader, env);
        if result.is_err() {
            self.set_void();
        }
        result
    }

    fn read_named(&mut self, reader: &mut Reader, env: &dyn VarEnv) -> Result<(), VarError> {
        if !reader.is_char('#') {
            self.set_name("");
            return self.read_value(reader, env);
        }

        let Token::Ident(name) = reader.forward().clone() else {
            self.set_name("");
            return Err(syntax(env, "Didn't find a variable name after '#'.".to_owned()));
        };
        self.set_name(name);

        if !reader.forward().eq(&Token::Char('=')) {
            return Err(syntax(
                env,
                format!("Don't have a '=' symbol for '{}' variable.", self.name()),
            ));
        }
        reader.forward();
        self.read_value(reader, env)
    }

    fn read_value(&mut self, reader: &mut Reader, env: &dyn VarEnv) -> Result<(), VarError> {
        match reader.current().clone() {
            Token::Str(s) => {
                let value = if s.starts_with('&') {
                    env.translate(&s[1..])
                } else {
                    s
                };
                self.set_string(value);
                reader.forward();
            }
            Token::Int(v) => {
                self.set_int(v);
                reader.forward();
            }
            Token::Float(v) => {
                self.set_float(v);
                reader.forward();
            }
            Token::Char('[') => self.read_array(reader, env)?,
            Token::Char('@') => {
                let Token::Str(path) = reader.forward().clone() else {
                    return Err(syntax(
                        env,
                        format!("Wrong link format for variable '{}'.", self.name()),
                    ));
                };
                self.set_link(path);
                reader.forward();
            }
            Token::Char(',') | Token::Char(']') | Token::End => self.set_void(),
            Token::Ident(_) => {
                let result = env.exec_call(reader)?;
                self.assign(&result);
            }
            Token::Malformed(literal) => {
                reader.forward();
                return Err(syntax(
                    env,
                    format!(
                        "Wrong value format for variable '{}': bad number '{literal}'.",
                        self.name()
                    ),
                ));
            }
            _ => {
                return Err(syntax(
                    env,
                    format!("Wrong value format for variable '{}'.", self.name()),
                ))
            }
        }
        Ok(())
    }

    fn read_array(&mut self, reader: &mut Reader, env: &dyn VarEnv) -> Result<(), VarError> {
        self.set_array();
        reader.forward();

        while !reader.is_char(']') {
            let mut child = Var::new();
            // A bad child is already reported and stays in the array as Void.
            let _ = child.read(reader, env);
            if let Err(e) = self.insert(child) {
                env.report(log::Level::Error, &e.to_string());
            }

            match reader.current() {
                Token::Char(',') => {
                    // `,]` closes on an empty, Void, last child.
                    if reader.forward() == &Token::Char(']') {
                        self.push_void_child(env);
                    }
                }
                Token::Char(']') => {}
                Token::End => {
                    return Err(syntax(
                        env,
                        format!(
                            "End of stream encountered while expecting ']' for variable '{}'.",
                            self.name()
                        ),
                    ))
                }
                _ => {
                    return Err(syntax(
                        env,
                        format!(
                            "Unexpected token encountered while expecting ']' for variable '{}'.",
                            self.name()
                        ),
                    ))
                }
            }
        }
        reader.forward();
        Ok(())
    }

    fn push_void_child(&mut self, env: &dyn VarEnv) {
        if let Err(e) = self.insert(Var::new()) {
            env.report(log::Level::Error, &e.to_string());
        }
    }
}
