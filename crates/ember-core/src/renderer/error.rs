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

//! Defines the hierarchy of error types for the rendering subsystem.
//!
//! [`ResourceError`] is what a [`RenderDevice`](crate::renderer::RenderDevice)
//! reports. [`RenderError`] is what the skin registry, the batching cache and
//! the static buffer store report to their callers.

use thiserror::Error;

/// An error related to the creation or use of a device resource (buffers, textures).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResourceError {
    /// A resource could not be found.
    #[error("Resource not found with ID.")]
    NotFound,
    /// The handle or ID used to reference a resource is invalid.
    #[error("Invalid resource handle or ID.")]
    InvalidHandle,
    /// The device ran out of memory for the requested allocation.
    #[error("Device out of memory.")]
    OutOfMemory,
    /// The device refused write access to a buffer.
    #[error("Buffer lock refused by the device.")]
    LockFailed,
    /// An attempt was made to access a resource out of its bounds.
    #[error("Resource access out of bounds.")]
    OutOfBounds,
    /// An error originating from the specific device implementation.
    #[error("Backend-specific resource error: {0}")]
    BackendError(String),
}

/// The kind of identifier an [`RenderError::InvalidId`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdKind {
    /// A skin identifier.
    Skin,
    /// A material identifier.
    Material,
    /// A static buffer identifier.
    StaticBuffer,
    /// A vertex layout with no pool configured.
    VertexLayout,
}

impl std::fmt::Display for IdKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IdKind::Skin => "skin",
            IdKind::Material => "material",
            IdKind::StaticBuffer => "static buffer",
            IdKind::VertexLayout => "vertex layout",
        };
        f.write_str(name)
    }
}

/// Coarse error codes, one per failure category of the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad skin, buffer or vertex layout identifier.
    InvalidId,
    /// A malformed argument.
    InvalidParameter,
    /// Data exceeds a fixed capacity.
    BufferTooSmall,
    /// Pool growth or device allocation failure.
    OutOfMemory,
    /// The device refused write access.
    BufferLock,
    /// The device failed to create a buffer.
    CreateBuffer,
    /// The device rejected a draw submission.
    Draw,
    /// A file or record does not exist.
    NotFound,
    /// Any other failure.
    Failed,
}

/// The top-level error type for the batching renderer.
#[derive(Debug, Error)]
pub enum RenderError {
    /// A skin, buffer or vertex layout identifier is out of range or unknown.
    #[error("Invalid {kind} id: {id}")]
    InvalidId {
        /// What the identifier was supposed to reference.
        kind: IdKind,
        /// The offending raw identifier.
        id: u32,
    },
    /// An argument was malformed.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// The submitted data exceeds a fixed capacity.
    #[error("Buffer too small: requested {requested}, capacity {capacity}")]
    BufferTooSmall {
        /// The number of elements that was requested.
        requested: usize,
        /// The fixed capacity that was exceeded.
        capacity: usize,
    },
    /// A pool or the device could not grow.
    #[error("Out of memory: {0}")]
    OutOfMemory(String),
    /// Write access to a device buffer was refused.
    #[error("Failed to lock buffer: {0}")]
    BufferLock(#[source] ResourceError),
    /// The device failed to allocate a buffer.
    #[error("Failed to create buffer: {0}")]
    BufferCreation(#[source] ResourceError),
    /// The device rejected a draw call.
    #[error("Draw call failed: {0}")]
    Draw(#[source] ResourceError),
    /// A file or record was not found.
    #[error("Not found: {0}")]
    NotFound(String),
    /// A texture could not be decoded or processed.
    #[error("Texture error: {0}")]
    Texture(String),
    /// Any other device failure.
    #[error("Device error: {0}")]
    Backend(#[from] ResourceError),
}

impl RenderError {
    /// Returns the coarse [`ErrorKind`] of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            RenderError::InvalidId { .. } => ErrorKind::InvalidId,
            RenderError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            RenderError::BufferTooSmall { .. } => ErrorKind::BufferTooSmall,
            RenderError::OutOfMemory(_) => ErrorKind::OutOfMemory,
            RenderError::BufferLock(_) => ErrorKind::BufferLock,
            RenderError::BufferCreation(ResourceError::OutOfMemory) => ErrorKind::OutOfMemory,
            RenderError::BufferCreation(_) => ErrorKind::CreateBuffer,
            RenderError::Draw(_) => ErrorKind::Draw,
            RenderError::NotFound(_) => ErrorKind::NotFound,
            RenderError::Texture(_) | RenderError::Backend(_) => ErrorKind::Failed,
        }
    }

    /// Builds an [`RenderError::InvalidId`]. Identifiers that do not fit `u32` are reported as `u32::MAX`.
    pub fn invalid_id(kind: IdKind, id: impl TryInto<u32>) -> Self {
        RenderError::InvalidId {
            kind,
            id: id.try_into().unwrap_or(u32::MAX),
        }
    }
}

/// Shorthand for results returned by the renderer.
pub type RenderResult<T> = Result<T, RenderError>;
