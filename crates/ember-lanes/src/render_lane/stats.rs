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

use std::fmt;

/// Counters describing how well geometry was batched.
///
/// The cache accumulates them until [`reset`](Self::reset) is called,
/// typically once per frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchStats {
    /// Draw calls accepted by the device.
    pub draw_calls: u64,
    /// Non-empty batches flushed, whether or not the draw succeeded.
    pub flushes: u64,
    /// Submissions appended to a batch already bound to their skin.
    pub skin_hits: u64,
    /// Submissions that had to flush and rebind the fullest batch.
    pub evictions: u64,
    /// Times vertex streams or skin state were rebound on the device.
    pub state_rebinds: u64,
    /// Draw calls rejected by the device.
    pub failed_draws: u64,
}

impl BatchStats {
    /// Zeroes every counter.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Display for BatchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "draws: {}, flushes: {}, skin hits: {}, evictions: {}, rebinds: {}, failed: {}",
            self.draw_calls,
            self.flushes,
            self.skin_hits,
            self.evictions,
            self.state_rebinds,
            self.failed_draws
        )
    }
}
