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

//! The typed variable: a named, tagged value used for configuration,
//! resources and shell call parameters.
//!
//! Arrays keep their named children sorted by name at the front of the
//! storage and their unnamed children after them, in append order.

mod image;
mod parse;
mod validator;

pub use validator::VarValidator;

use std::fmt;
use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use crate::env::VarEnv;
use crate::error::VarError;
use crate::reader::Reader;

/// Integer payload.
pub type Int = i32;
/// Floating point payload.
pub type Float = f32;

/// Kind of a [`Var`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarType {
    /// No value.
    Void,
    /// An [`Int`].
    Int,
    /// A [`Float`].
    Float,
    /// A string.
    String,
    /// A list of variables.
    Array,
    /// A data-relative path whose file content gives the actual value.
    Link,
}

impl VarType {
    /// Every type, in declaration order.
    pub const ALL: [VarType; 6] = [
        VarType::Void,
        VarType::Int,
        VarType::Float,
        VarType::String,
        VarType::Array,
        VarType::Link,
    ];

    /// The keyword naming this type in function prototypes.
    pub fn name(self) -> &'static str {
        match self {
            VarType::Void => "void",
            VarType::Int => "int",
            VarType::Float => "float",
            VarType::String => "string",
            VarType::Array => "array",
            VarType::Link => "link",
        }
    }

    /// Parses a type keyword.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }
}

impl fmt::Display for VarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Payload of a [`Var`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum VarValue {
    /// No value.
    #[default]
    Void,
    /// Integer value.
    Int(Int),
    /// Float value.
    Float(Float),
    /// String value.
    Str(String),
    /// Array of variables.
    Array(VarArray),
    /// Unresolved link to a data file.
    Link(String),
}

impl VarValue {
    /// The type tag of this value.
    pub fn var_type(&self) -> VarType {
        match self {
            VarValue::Void => VarType::Void,
            VarValue::Int(_) => VarType::Int,
            VarValue::Float(_) => VarType::Float,
            VarValue::Str(_) => VarType::String,
            VarValue::Array(_) => VarType::Array,
            VarValue::Link(_) => VarType::Link,
        }
    }

    /// The default value of a type.
    pub fn default_of(var_type: VarType) -> Self {
        match var_type {
            VarType::Void => VarValue::Void,
            VarType::Int => VarValue::Int(0),
            VarType::Float => VarValue::Float(0.0),
            VarType::String => VarValue::Str(String::new()),
            VarType::Array => VarValue::Array(VarArray::default()),
            VarType::Link => VarValue::Link(String::new()),
        }
    }
}

/// Children of an array variable.
///
/// Named children come first, sorted by name; unnamed children follow in
/// insertion order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VarArray {
    items: Vec<Var>,
    named: usize,
}

impl VarArray {
    /// Number of children.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if there is no child.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Child at `pos` (named children first).
    pub fn get(&self, pos: usize) -> Option<&Var> {
        self.items.get(pos)
    }

    /// Mutable child at `pos`. The child's name must not be changed.
    pub fn get_mut(&mut self, pos: usize) -> Option<&mut Var> {
        self.items.get_mut(pos)
    }

    /// Iterates over the children, named ones first.
    pub fn iter(&self) -> std::slice::Iter<'_, Var> {
        self.items.iter()
    }

    /// The named children, sorted by name.
    pub fn named(&self) -> &[Var] {
        &self.items[..self.named]
    }

    /// Number of unnamed children.
    pub fn unnamed_len(&self) -> usize {
        self.items.len() - self.named
    }

    fn search(&self, name: &str) -> Result<usize, usize> {
        let named = &self.items[..self.named];
        let pos = named.partition_point(|v| v.name.as_str() < name);
        match named.get(pos) {
            Some(v) if v.name == name => Ok(pos),
            _ => Err(pos),
        }
    }

    /// Finds a named child by dichotomy over the named region.
    pub fn find(&self, name: &str) -> Option<&Var> {
        self.search(name).ok().map(|pos| &self.items[pos])
    }

    /// Finds a named child mutably. The child's name must not be changed.
    pub fn find_mut(&mut self, name: &str) -> Option<&mut Var> {
        self.search(name).ok().map(move |pos| &mut self.items[pos])
    }

    /// Inserts a child: named children at their sorted place, unnamed ones
    /// at the end.
    pub fn insert(&mut self, child: Var) -> Result<usize, VarError> {
        if child.name.is_empty() {
            self.items.push(child);
            return Ok(self.items.len() - 1);
        }
        match self.search(&child.name) {
            Ok(_) => Err(VarError::DuplicateName(child.name)),
            Err(pos) => {
                self.items.insert(pos, child);
                self.named += 1;
                Ok(pos)
            }
        }
    }

    /// Removes the named child `name`.
    pub fn remove(&mut self, name: &str) -> Option<Var> {
        let pos = self.search(name).ok()?;
        self.named -= 1;
        Some(self.items.remove(pos))
    }

    /// Drops every unnamed child.
    pub fn remove_unnamed(&mut self) {
        self.items.truncate(self.named);
    }

    /// Removes every child.
    pub fn clear(&mut self) {
        self.items.clear();
        self.named = 0;
    }
}

impl<'a> IntoIterator for &'a VarArray {
    type Item = &'a Var;
    type IntoIter = std::slice::Iter<'a, Var>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// A named, typed value.
///
/// Cloning is a deep copy. The textual image is computed on demand and
/// cached until the next mutation.
///
/// A string value starting with `&` does not survive an image round trip:
/// reading it back treats the `&` as the translation marker, strips it and
/// translates the rest. Callers storing such text must not rely on
/// [`Var::parse`] to restore it.
#[derive(Debug, Clone, Default)]
pub struct Var {
    name: String,
    value: VarValue,
    image: OnceLock<String>,
}

impl PartialEq for Var {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.value == other.value
    }
}

impl Var {
    /// Creates an unnamed Void variable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a named variable holding `value`.
    pub fn named(name: impl Into<String>, value: impl Into<VarValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            image: OnceLock::new(),
        }
    }

    /// Creates an empty array variable.
    pub fn array() -> Self {
        Self::from(VarValue::Array(VarArray::default()))
    }

    /// The variable name, empty for unnamed variables.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the variable.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.touch();
    }

    /// The type of the held value.
    pub fn var_type(&self) -> VarType {
        self.value.var_type()
    }

    /// The held value.
    pub fn value(&self) -> &VarValue {
        &self.value
    }

    /// The held value, mutably. Drops the cached image.
    pub fn value_mut(&mut self) -> &mut VarValue {
        self.touch();
        &mut self.value
    }

    /// Replaces the value by the default of `var_type`.
    pub fn set_type(&mut self, var_type: VarType) {
        self.set(VarValue::default_of(var_type));
    }

    /// Replaces the value.
    pub fn set(&mut self, value: impl Into<VarValue>) {
        self.value = value.into();
        self.touch();
    }

    /// Makes the variable Void.
    pub fn set_void(&mut self) {
        self.set(VarValue::Void);
    }

    /// Sets an integer value.
    pub fn set_int(&mut self, value: Int) {
        self.set(VarValue::Int(value));
    }

    /// Sets a float value.
    pub fn set_float(&mut self, value: Float) {
        self.set(VarValue::Float(value));
    }

    /// Sets a string value.
    pub fn set_string(&mut self, value: impl Into<String>) {
        self.set(VarValue::Str(value.into()));
    }

    /// Makes the variable an empty array.
    pub fn set_array(&mut self) {
        self.set_type(VarType::Array);
    }

    /// Sets an unresolved link.
    pub fn set_link(&mut self, path: impl Into<String>) {
        self.set(VarValue::Link(path.into()));
    }

    /// Copies type and value of `other`; the name is kept.
    pub fn assign(&mut self, other: &Var) {
        self.set(other.value.clone());
    }

    /// Inserts `child` into this array, turning the variable into an empty
    /// array first if it holds anything else.
    pub fn insert(&mut self, child: Var) -> Result<usize, VarError> {
        self.touch();
        match &mut self.value {
            VarValue::Array(array) => array.insert(child),
            other => {
                let mut array = VarArray::default();
                let pos = array.insert(child);
                *other = VarValue::Array(array);
                pos
            }
        }
    }

    /// Inserts a deep copy of `child`.
    pub fn add_copy(&mut self, child: &Var) -> Result<usize, VarError> {
        self.insert(child.clone())
    }

    /// The array payload, if any.
    pub fn as_array(&self) -> Option<&VarArray> {
        match &self.value {
            VarValue::Array(array) => Some(array),
            _ => None,
        }
    }

    /// The array payload mutably. Drops the cached image.
    pub fn as_array_mut(&mut self) -> Option<&mut VarArray> {
        self.touch();
        match &mut self.value {
            VarValue::Array(array) => Some(array),
            _ => None,
        }
    }

    /// Number of children; 0 for non-arrays.
    pub fn array_len(&self) -> usize {
        self.as_array().map_or(0, VarArray::len)
    }

    /// Child at `pos`.
    pub fn child(&self, pos: usize) -> Option<&Var> {
        self.as_array().and_then(|array| array.get(pos))
    }

    /// Named child lookup by dichotomy.
    ///
    /// Only the named region is searched, which requires every named child
    /// to have been inserted through [`Var::insert`] (or parsing).
    pub fn child_by_name(&self, name: &str) -> Option<&Var> {
        self.as_array().and_then(|array| array.find(name))
    }

    /// Named child lookup, mutable.
    pub fn child_by_name_mut(&mut self, name: &str) -> Option<&mut Var> {
        self.as_array_mut().and_then(|array| array.find_mut(name))
    }

    /// Drops the unnamed children of an array.
    pub fn remove_unnamed(&mut self) {
        if let Some(array) = self.as_array_mut() {
            array.remove_unnamed();
        }
    }

    /// The integer payload.
    pub fn as_int(&self) -> Option<Int> {
        match self.value {
            VarValue::Int(v) => Some(v),
            _ => None,
        }
    }

    /// The float payload.
    pub fn as_float(&self) -> Option<Float> {
        match self.value {
            VarValue::Float(v) => Some(v),
            _ => None,
        }
    }

    /// The string payload.
    pub fn as_str(&self) -> Option<&str> {
        match &self.value {
            VarValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// The link path, while unresolved.
    pub fn as_link(&self) -> Option<&str> {
        match &self.value {
            VarValue::Link(s) => Some(s),
            _ => None,
        }
    }

    /// Canonical textual form, cached.
    pub fn image(&self) -> &str {
        self.image.get_or_init(|| image::render(self))
    }

    /// Replaces a link by the value read from its target file.
    /// Does nothing for other types.
    pub fn resolve_link(&mut self, env: &dyn VarEnv) -> Result<(), VarError> {
        let Some(path) = self.as_link().map(str::to_owned) else {
            return Ok(());
        };
        self.read_file(env, &path)
    }

    /// Parses the content of the data file `path` into this variable,
    /// keeping its current name.
    ///
    /// A file that cannot be opened is returned as [`VarError::FileOpen`]
    /// without being reported, and leaves the variable untouched.
    pub fn read_file(&mut self, env: &dyn VarEnv, path: &str) -> Result<(), VarError> {
        if path.is_empty() {
            env.report(log::Level::Error, "Try to read a file with void path.");
            return Err(VarError::FileOpen(path.into()));
        }
        let resolved = env.resolve_path(path);
        let mut reader = Reader::from_file(&resolved)?;
        let name = std::mem::take(&mut self.name);
        let result = self.read(&mut reader, env);
        self.set_name(name);
        result
    }

    /// Writes the image of this array, followed by a newline, to `path`.
    pub fn save_to_file(&self, path: &Path) -> Result<(), VarError> {
        if self.var_type() != VarType::Array {
            return Err(VarError::NotAnArray(self.name.clone()));
        }
        fs::write(path, format!("{}\n", self.image()))
            .map_err(|_| VarError::FileWrite(path.to_path_buf()))
    }

    fn touch(&mut self) {
        self.image.take();
    }
}

impl fmt::Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.image())
    }
}

impl From<VarValue> for Var {
    fn from(value: VarValue) -> Self {
        Self {
            name: String::new(),
            value,
            image: OnceLock::new(),
        }
    }
}

impl From<Int> for VarValue {
    fn from(v: Int) -> Self {
        VarValue::Int(v)
    }
}

impl From<Float> for VarValue {
    fn from(v: Float) -> Self {
        VarValue::Float(v)
    }
}

impl From<&str> for VarValue {
    fn from(v: &str) -> Self {
        VarValue::Str(v.to_owned())
    }
}

impl From<String> for VarValue {
    fn from(v: String) -> Self {
        VarValue::Str(v)
    }
}

impl From<VarArray> for VarValue {
    fn from(v: VarArray) -> Self {
        VarValue::Array(v)
    }
}

impl From<Int> for Var {
    fn from(v: Int) -> Self {
        Var::from(VarValue::Int(v))
    }
}

impl From<Float> for Var {
    fn from(v: Float) -> Self {
        Var::from(VarValue::Float(v))
    }
}

impl From<&str> for Var {
    fn from(v: &str) -> Self {
        Var::from(VarValue::from(v))
    }
}

impl From<String> for Var {
    fn from(v: String) -> Self {
        Var::from(VarValue::Str(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::StandaloneEnv;
    use std::io::Write;

    #[test]
    fn named_children_sort_before_unnamed() {
        let mut var = Var::new();
        var.insert(Var::from(1)).unwrap();
        var.insert(Var::named("b", 2)).unwrap();
        var.insert(Var::from("x")).unwrap();
        var.insert(Var::named("a", 3)).unwrap();

        let names: Vec<&str> = var.as_array().unwrap().iter().map(Var::name).collect();
        assert_eq!(names, ["a", "b", "", ""]);
        assert_eq!(var.child(2).and_then(Var::as_int), Some(1));
        assert_eq!(var.child_by_name("b").and_then(Var::as_int), Some(2));
        assert!(var.child_by_name("c").is_none());
    }

    #[test]
    fn duplicate_name_is_rejected() {
        let mut var = Var::array();
        var.insert(Var::named("a", 1)).unwrap();
        assert_eq!(
            var.insert(Var::named("a", 2)),
            Err(VarError::DuplicateName("a".into()))
        );
        assert_eq!(var.array_len(), 1);
        assert_eq!(var.child_by_name("a").and_then(Var::as_int), Some(1));
    }

    #[test]
    fn insert_promotes_to_array() {
        let mut var = Var::named("n", 5);
        var.insert(Var::from(1)).unwrap();
        assert_eq!(var.var_type(), VarType::Array);
        assert_eq!(var.array_len(), 1);
        assert_eq!(var.name(), "n");
    }

    #[test]
    fn clone_is_deep_and_assign_keeps_name() {
        let mut src = Var::named("src", VarValue::Void);
        src.insert(Var::named("k", "v")).unwrap();
        let mut copy = src.clone();
        copy.child_by_name_mut("k").unwrap().set_string("changed");
        assert_eq!(src.child_by_name("k").and_then(Var::as_str), Some("v"));

        let mut dest = Var::named("dest", 1);
        dest.assign(&src);
        assert_eq!(dest.name(), "dest");
        assert_eq!(dest.value(), src.value());
    }

    #[test]
    fn set_type_resets_to_default() {
        let mut var = Var::from("text");
        var.set_type(VarType::Int);
        assert_eq!(var.as_int(), Some(0));
        var.set_type(VarType::Array);
        assert_eq!(var.array_len(), 0);
        assert_eq!(VarType::from_name("link"), Some(VarType::Link));
        assert_eq!(VarType::from_name("bool"), None);
    }

    #[test]
    fn image_is_invalidated_on_mutation() {
        let mut var = Var::named("x", 1);
        assert_eq!(var.image(), "#x=1");
        var.set_int(2);
        assert_eq!(var.image(), "#x=2");
        var.child_by_name_mut("nothing");
        var.set_name("y");
        assert_eq!(var.to_string(), "#y=2");
    }

    #[test]
    fn remove_unnamed_keeps_named() {
        let mut var = Var::array();
        var.insert(Var::from(1)).unwrap();
        var.insert(Var::named("a", 1)).unwrap();
        var.insert(Var::from(2)).unwrap();
        var.remove_unnamed();
        assert_eq!(var.image(), "[#a=1]");
    }

    #[test]
    fn link_resolution_reads_file_and_keeps_name() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[1, \"two\"]").unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let mut var = Var::named("data", VarValue::Link(path));
        var.resolve_link(&StandaloneEnv).unwrap();
        assert_eq!(var.image(), "#data=[1,\"two\"]");

        // Already resolved: no-op.
        var.resolve_link(&StandaloneEnv).unwrap();
        assert_eq!(var.array_len(), 2);
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let mut var = Var::named("v", 3);
        assert!(var.read_file(&StandaloneEnv, &missing.to_string_lossy()).is_err());
        assert_eq!(var.as_int(), Some(3));
    }

    #[test]
    fn save_then_read_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved");
        let mut var = Var::array();
        var.insert(Var::named("f", 0.5f32)).unwrap();
        var.save_to_file(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[#f=0.5]\n");

        let mut back = Var::named("back", VarValue::Void);
        back.read_file(&StandaloneEnv, &path.to_string_lossy()).unwrap();
        assert_eq!(back.name(), "back");
        assert_eq!(back.child_by_name("f").and_then(Var::as_float), Some(0.5));

        assert!(Var::from(1).save_to_file(&path).is_err());
    }
}
