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

//! Canonical textual form of a variable.

use super::{Float, Var, VarValue};

pub(super) fn render(var: &Var) -> String {
    let mut out = String::new();
    if !var.name().is_empty() {
        out.push('#');
        out.push_str(var.name());
        out.push('=');
    }
    match var.value() {
        VarValue::Void => {}
        VarValue::Int(v) => out.push_str(&v.to_string()),
        VarValue::Float(v) => push_float(&mut out, *v),
        VarValue::Str(s) => push_quoted(&mut out, s),
        VarValue::Array(array) => {
            out.push('[');
            for (i, child) in array.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(child.image());
            }
            out.push(']');
        }
        VarValue::Link(path) => {
            out.push('@');
            push_quoted(&mut out, path);
        }
    }
    out
}

// Display never uses an exponent, a fractional part keeps the float a float.
fn push_float(out: &mut String, v: Float) {
    let text = v.to_string();
    out.push_str(&text);
    if !text.contains('.') {
        out.push_str(".0");
    }
}

fn push_quoted(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            other => out.push(other),
        }
    }
    out.push('"');
}
