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

//! Identifiers handed out by the engine.
//!
//! Every identifier is a dense ordinal assigned at declaration time and never
//! reused during a run.

use std::fmt;

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub usize);

        impl $name {
            /// The position of the designated record in its table.
            #[inline]
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Identifies a declared module.
    ModuleId
);
define_id!(
    /// Identifies a shell function within its module.
    FunctionId
);
define_id!(
    /// Identifies a resource.
    ResourceId
);
define_id!(
    /// Identifies a scheduler thread.
    ThreadId
);

/// The main thread, driven by [`CoreEngine::start`](crate::CoreEngine::start).
pub const MAIN_THREAD: ThreadId = ThreadId(0);
