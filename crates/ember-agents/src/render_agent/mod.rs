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

//! The agent of the rendering subsystem.
//!
//! [`RenderAgent`] owns the device, the skin registry and the vertex cache. It
//! is the only way render state changes, so every change can flush geometry
//! queued under the old state first, and it releases every device resource
//! exactly once when dropped.

mod agent;
mod config;

pub use agent::*;
pub use config::*;
