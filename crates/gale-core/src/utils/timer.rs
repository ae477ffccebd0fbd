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

//! Frame timing for cooperative loops.

use std::time::{Duration, Instant};

/// Measures the time between successive iterations of a loop.
#[derive(Debug, Clone)]
pub struct Stopwatch {
    last: Instant,
}

impl Stopwatch {
    /// Creates a new Stopwatch started now.
    #[inline]
    pub fn new() -> Self {
        Self {
            last: Instant::now(),
        }
    }

    /// Returns the time elapsed since the last lap (or creation).
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.last.elapsed()
    }

    /// Instant at which `period` will be over.
    #[inline]
    pub fn deadline(&self, period: Duration) -> Instant {
        self.last + period
    }

    /// Closes the current lap and returns its duration.
    /// ## Returns
    /// The time elapsed since the previous lap.
    pub fn lap(&mut self) -> Duration {
        let now = Instant::now();
        let lap = now.duration_since(self.last);
        self.last = now;
        lap
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}
