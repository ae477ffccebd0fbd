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

//! Name completion over everything declared in the engine.

use gale_core::DynArray;

/// Sorted set of completable names.
#[derive(Debug)]
pub struct CompletionList {
    names: DynArray<String>,
}

impl Default for CompletionList {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionList {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self {
            names: DynArray::with_comparator(<String as Ord>::cmp),
        }
    }

    /// Adds a name, ignoring duplicates.
    pub fn add(&mut self, name: &str) {
        if let Err(pos) = self.names.search_sorted(&name.to_owned()) {
            self.names.insert(pos, name.to_owned());
        }
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True when nothing was added.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Every name starting with `prefix`, in order.
    pub fn query(&self, prefix: &str) -> CompletionCursor {
        let start = self.names.as_slice().partition_point(|n| n.as_str() < prefix);
        let results = self.names.as_slice()[start..]
            .iter()
            .take_while(|n| n.starts_with(prefix))
            .cloned()
            .collect();
        CompletionCursor { results, pos: 0 }
    }
}

/// Results of a [`CompletionList::query`], walked one at a time.
#[derive(Debug, Clone, Default)]
pub struct CompletionCursor {
    results: Vec<String>,
    pos: usize,
}

impl CompletionCursor {
    /// All matches.
    pub fn results(&self) -> &[String] {
        &self.results
    }

    /// Next match. Once exhausted, returns `None`, or wraps around to the
    /// first match when `cycle` is set.
    pub fn next_result(&mut self, cycle: bool) -> Option<&str> {
        if self.results.is_empty() {
            return None;
        }
        if self.pos >= self.results.len() {
            if !cycle {
                return None;
            }
            self.pos = 0;
        }
        self.pos += 1;
        Some(self.results[self.pos - 1].as_str())
    }
}
