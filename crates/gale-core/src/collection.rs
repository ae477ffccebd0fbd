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

//! A growable, optionally sorted array with pluggable comparison and release hooks.
//!
//! [`DynArray`] backs every name-indexed table of the engine (modules, shell
//! functions, resources, completion names). When a comparator is attached the
//! array can be kept sorted through [`DynArray::insert_sorted`] and searched
//! by dichotomy through [`DynArray::find_sorted_by`].

use std::cmp::Ordering;
use std::fmt;

/// Comparison hook used to order the elements of a sorted [`DynArray`].
pub type CompareFn<T> = fn(&T, &T) -> Ordering;

/// Release hook invoked with every element leaving a [`DynArray`].
pub type ReleaseFn<T> = fn(T);

/// A growable array of elements with optional ordering and release callbacks.
pub struct DynArray<T> {
    items: Vec<T>,
    cmp: Option<CompareFn<T>>,
    release: Option<ReleaseFn<T>>,
}

impl<T> DynArray<T> {
    /// Creates an empty, unordered array.
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            cmp: None,
            release: None,
        }
    }

    /// Creates an empty array ordered by `cmp`.
    pub fn with_comparator(cmp: CompareFn<T>) -> Self {
        Self {
            items: Vec::new(),
            cmp: Some(cmp),
            release: None,
        }
    }

    /// Attaches a release hook, called for every element removed, cleared or
    /// still present when the array is dropped.
    pub fn with_release(mut self, release: ReleaseFn<T>) -> Self {
        self.release = Some(release);
        self
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the array holds no element.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Returns the element at `pos`.
    pub fn get(&self, pos: usize) -> Option<&T> {
        self.items.get(pos)
    }

    /// Returns the element at `pos` mutably.
    ///
    /// Changing the sort key of an element breaks the ordering until
    /// [`sort`](Self::sort) is called again.
    pub fn get_mut(&mut self, pos: usize) -> Option<&mut T> {
        self.items.get_mut(pos)
    }

    /// Iterates over the elements in storage order.
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    /// Returns the elements as a slice.
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Appends an element at the end.
    pub fn append(&mut self, item: T) {
        self.items.push(item);
    }

    /// Inserts an element at the front.
    pub fn prepend(&mut self, item: T) {
        self.items.insert(0, item);
    }

    /// Inserts an element at `pos`, clamped to the current length.
    pub fn insert(&mut self, pos: usize, item: T) {
        let pos = pos.min(self.items.len());
        self.items.insert(pos, item);
    }

    /// Inserts an element at its sorted position and returns that position.
    ///
    /// The element goes before any existing element comparing equal to it.
    /// Without a comparator the element is appended.
    pub fn insert_sorted(&mut self, item: T) -> usize {
        match self.cmp {
            Some(cmp) => {
                let pos = self.items.partition_point(|e| cmp(e, &item) == Ordering::Less);
                self.items.insert(pos, item);
                pos
            }
            None => {
                log::warn!("DynArray: insert_sorted called without comparator, appending.");
                self.items.push(item);
                self.items.len() - 1
            }
        }
    }

    /// Looks up `item` by dichotomy using the attached comparator.
    ///
    /// Returns `Ok(pos)` of the first equal element, or `Err(pos)` with the
    /// position where it would be inserted.
    pub fn search_sorted(&self, item: &T) -> Result<usize, usize> {
        let Some(cmp) = self.cmp else {
            return Err(self.items.len());
        };
        let pos = self.items.partition_point(|e| cmp(e, item) == Ordering::Less);
        match self.items.get(pos) {
            Some(e) if cmp(e, item) == Ordering::Equal => Ok(pos),
            _ => Err(pos),
        }
    }

    /// Looks up an element by dichotomy with a probe returning how an element
    /// orders relative to the searched key.
    ///
    /// The array must be sorted consistently with `probe`.
    pub fn find_sorted_by<F>(&self, mut probe: F) -> Option<usize>
    where
        F: FnMut(&T) -> Ordering,
    {
        let pos = self.items.partition_point(|e| probe(e) == Ordering::Less);
        match self.items.get(pos) {
            Some(e) if probe(e) == Ordering::Equal => Some(pos),
            _ => None,
        }
    }

    /// Linear search for the first element matching `pred`.
    pub fn find<P>(&self, pred: P) -> Option<usize>
    where
        P: FnMut(&T) -> bool,
    {
        self.items.iter().position(pred)
    }

    /// Removes the element at `pos` and hands it back without releasing it.
    pub fn take(&mut self, pos: usize) -> Option<T> {
        (pos < self.items.len()).then(|| self.items.remove(pos))
    }

    /// Removes and releases the element at `pos`. Returns `false` if out of range.
    pub fn remove(&mut self, pos: usize) -> bool {
        match self.take(pos) {
            Some(item) => {
                self.release_one(item);
                true
            }
            None => false,
        }
    }

    /// Removes and releases the elements in `start..end`, clamped to the length.
    pub fn remove_range(&mut self, start: usize, end: usize) {
        let end = end.min(self.items.len());
        if start >= end {
            return;
        }
        let removed: Vec<T> = self.items.drain(start..end).collect();
        for item in removed {
            self.release_one(item);
        }
    }

    /// Removes and releases every element.
    pub fn clear(&mut self) {
        let removed: Vec<T> = self.items.drain(..).collect();
        for item in removed {
            self.release_one(item);
        }
    }

    /// Sorts the elements with the attached comparator (stable).
    pub fn sort(&mut self) {
        if let Some(cmp) = self.cmp {
            self.items.sort_by(cmp);
        }
    }

    /// Calls `f` on every element in storage order.
    pub fn for_each<F>(&self, f: F)
    where
        F: FnMut(&T),
    {
        self.items.iter().for_each(f);
    }

    fn release_one(&self, item: T) {
        match self.release {
            Some(release) => release(item),
            None => drop(item),
        }
    }
}

impl<T> Default for DynArray<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for DynArray<T> {
    fn drop(&mut self) {
        if let Some(release) = self.release {
            for item in self.items.drain(..) {
                release(item);
            }
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for DynArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynArray")
            .field("items", &self.items)
            .field("sorted", &self.cmp.is_some())
            .finish()
    }
}

impl<'a, T> IntoIterator for &'a DynArray<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Entry of a name-sorted lookup table: a name and the position of the
/// record it designates in its owning table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameKey {
    /// Lookup key.
    pub name: String,
    /// Position of the designated record.
    pub index: usize,
}

fn cmp_name_key(a: &NameKey, b: &NameKey) -> Ordering {
    a.name.cmp(&b.name)
}

/// A name-sorted index over records stored elsewhere.
pub type NameIndex = DynArray<NameKey>;

impl DynArray<NameKey> {
    /// Creates an empty index sorted by name (case-sensitive, byte order).
    pub fn name_index() -> Self {
        Self::with_comparator(cmp_name_key)
    }

    /// Inserts `name` designating record `index` at its sorted place.
    pub fn insert_name(&mut self, name: &str, index: usize) {
        self.insert_sorted(NameKey {
            name: name.to_owned(),
            index,
        });
    }

    /// Rebuilds the whole index from the names of a record table.
    pub fn rebuild<'a, I>(&mut self, names: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.clear();
        for (index, name) in names.into_iter().enumerate() {
            self.insert_name(name, index);
        }
    }

    /// Finds the record index registered under `name`.
    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.find_sorted_by(|key| key.name.as_str().cmp(name))
            .and_then(|pos| self.get(pos))
            .map(|key| key.index)
    }
}
