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

//! Rendering lane - draw call batching.
//!
//! Geometry submitted every frame goes through the [`VertexCacheManager`],
//! which routes it into a [`VertexBatch`] by skin and flushes batches to the
//! device when they fill up, when their skin changes, or when the caller
//! forces it. Pre-baked geometry lives in the [`StaticBufferStore`].

mod cache_manager;
mod config;
mod state;
mod stats;
mod static_buffer;
mod submit;
mod vertex_batch;

pub use cache_manager::*;
pub use config::*;
pub use state::*;
pub use stats::*;
pub use static_buffer::*;
pub use vertex_batch::*;
