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

//! Defines data structures for creating, describing and writing device buffers.

use bitflags::bitflags;
use std::borrow::Cow;

bitflags! {
    /// A set of flags describing the allowed usages of a [`BufferId`].
    ///
    /// The device uses them to pick a memory pool and to validate binding calls.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct BufferUsage: u32 {
        /// The buffer can be bound as a vertex stream.
        const VERTEX = 1 << 0;
        /// The buffer can be bound as an index buffer.
        const INDEX = 1 << 1;
        /// The CPU only writes, never reads back.
        const WRITE_ONLY = 1 << 2;
        /// The buffer is rewritten frequently (discard / no-overwrite locks).
        const DYNAMIC = 1 << 3;
    }
}

/// A descriptor used to create a [`BufferId`].
#[derive(Debug, Clone)]
pub struct BufferDescriptor<'a> {
    /// An optional debug label for the buffer.
    pub label: Option<Cow<'a, str>>,
    /// The total size of the buffer in bytes.
    pub size: u64,
    /// A bitmask of [`BufferUsage`] flags describing how the buffer will be used.
    pub usage: BufferUsage,
}

/// An opaque handle to a device buffer.
///
/// Returned by [`RenderDevice::create_buffer`](crate::renderer::RenderDevice::create_buffer)
/// and used to reference the buffer in all subsequent operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(pub usize);

/// How a write lock treats the data already in the locked region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockHint {
    /// No promise is made. The device may have to wait for in-flight draws.
    #[default]
    None,
    /// The previous contents are thrown away and the device may hand out fresh memory.
    Discard,
    /// The caller promises not to touch any region already submitted for drawing.
    NoOverwrite,
}

/// Size in bytes of one index. Indices are always 16-bit.
pub const INDEX_SIZE: usize = std::mem::size_of::<u16>();
