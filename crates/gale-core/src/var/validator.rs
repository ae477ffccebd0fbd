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

//! Shape checking of configuration arrays.

use log::Level;

use crate::env::VarEnv;

use super::{Float, Int, Var};

/// Describes the named fields an array variable must hold, with their
/// default values.
#[derive(Debug, Clone)]
pub struct VarValidator {
    fields: Var,
}

impl Default for VarValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl VarValidator {
    /// Creates a validator with no field.
    pub fn new() -> Self {
        Self {
            fields: Var::array(),
        }
    }

    /// Declares an integer field.
    pub fn declare_int(&mut self, name: &str, default: Int) -> &mut Self {
        self.declare(Var::named(name, default))
    }

    /// Declares a float field.
    pub fn declare_float(&mut self, name: &str, default: Float) -> &mut Self {
        self.declare(Var::named(name, default))
    }

    /// Declares a string field.
    pub fn declare_string(&mut self, name: &str, default: &str) -> &mut Self {
        self.declare(Var::named(name, default))
    }

    /// Declares an array field, empty by default.
    pub fn declare_array(&mut self, name: &str) -> &mut Self {
        let mut field = Var::array();
        field.set_name(name);
        self.declare(field)
    }

    fn declare(&mut self, field: Var) -> &mut Self {
        if field.name().is_empty() {
            log::error!("Can't declare a validator field without a name.");
        } else if let Err(e) = self.fields.insert(field) {
            log::error!("VarValidator: {e}");
        }
        self
    }

    /// Brings `var` to the declared shape.
    ///
    /// Links are resolved, a non-array becomes an empty array, unnamed and
    /// undeclared fields are dropped, missing fields are added with their
    /// default and wrongly typed fields are replaced by their default. Each
    /// correction is reported through `env`.
    pub fn validate(&self, var: &mut Var, env: &dyn VarEnv) {
        env.push_context(&format!("In VarValidator for: {}", var.name()));

        if var.resolve_link(env).is_err() || var.as_array().is_none() {
            env.report(Level::Error, "Variable not of array type. Converted to array.");
            var.set_array();
        }

        if let Some(array) = var.as_array_mut() {
            for pos in 0..array.len() {
                if let Some(child) = array.get_mut(pos) {
                    // Reading a file keeps the name of the variable.
                    if child.resolve_link(env).is_err() {
                        child.set_void();
                    }
                }
            }

            for child in array.iter() {
                if child.name().is_empty() {
                    env.report(
                        Level::Error,
                        &format!("Unnamed variable found: {}", child.image()),
                    );
                }
            }
            array.remove_unnamed();

            let unexpected: Vec<String> = array
                .iter()
                .filter(|child| self.fields.child_by_name(child.name()).is_none())
                .map(|child| child.name().to_owned())
                .collect();
            for name in unexpected {
                if let Some(child) = array.remove(&name) {
                    env.report(
                        Level::Error,
                        &format!("Unexpected variable found: {}", child.image()),
                    );
                }
            }
        }

        for field in self.fields.as_array().into_iter().flatten() {
            match var.child_by_name_mut(field.name()) {
                None => {
                    env.report(
                        Level::Error,
                        &format!("Expected variable not found: {}", field.image()),
                    );
                    if let Err(e) = var.add_copy(field) {
                        env.report(Level::Error, &e.to_string());
                    }
                }
                Some(current) if current.var_type() != field.var_type() => {
                    env.report(
                        Level::Error,
                        &format!(
                            "Incorrect type for variable in named array: {}",
                            current.image()
                        ),
                    );
                    env.report(Level::Error, &format!(" Replaced by: {}", field.image()));
                    current.assign(field);
                }
                Some(_) => {}
            }
        }

        env.pop_context();
    }
}
