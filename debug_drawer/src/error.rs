//! Error types.

use thiserror::Error;

use crate::device::BufferHandle;
use crate::primitives::PrimitiveKind;
use crate::shader::{DebugMesh, ShaderPermutation};

/// Failure reported by a [`DebugDrawDevice`](crate::DebugDrawDevice) or
/// [`DebugDrawResources`](crate::DebugDrawResources) implementation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("Failed to create buffer: {0}")]
    BufferCreationFailed(String),
    #[error("Unknown buffer {0:?}")]
    UnknownBuffer(BufferHandle),
    #[error("Failed to map buffer: {0}")]
    MapFailed(String),
    #[error("Failed to load mesh {0:?}")]
    MeshLoadFailed(DebugMesh),
    #[error("Failed to load program {}", .0.label())]
    ProgramLoadFailed(ShaderPermutation),
}

/// Debug draw renderer error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DebugDrawError {
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error("{0:?} primitives have no index output")]
    UnsupportedOutput(PrimitiveKind),
    #[error("Mapped buffer holds {available} bytes, {required} required")]
    BufferTooSmall { required: usize, available: usize },
}

pub type DeviceResult<T> = Result<T, DeviceError>;
pub type DebugDrawResult<T> = Result<T, DebugDrawError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::ShaderOutput;
    use crate::shader::ShaderKind;

    #[test]
    fn test_messages() {
        let err = DebugDrawError::from(DeviceError::ProgramLoadFailed(ShaderPermutation::new(
            ShaderKind::Grid,
            ShaderOutput::Index,
        )));
        assert_eq!(err.to_string(), "Failed to load program debug_grid_index");

        let err = DebugDrawError::UnsupportedOutput(PrimitiveKind::String);
        assert_eq!(err.to_string(), "String primitives have no index output");
    }
}
