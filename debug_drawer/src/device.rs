//! Graphics device and resource manager seams.
//!
//! The renderer only talks to the GPU through [`DebugDrawDevice`] and loads
//! its meshes and programs once through [`DebugDrawResources`]. All calls are
//! made from the render thread.

use crate::error::DeviceResult;
use crate::options::RenderState;
use crate::shader::{DebugMesh, ShaderPermutation};

/// Handle to a GPU buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferHandle(pub u64);

/// Handle to a compiled shader program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramHandle(pub u64);

/// Index range of one submesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubmeshRange {
    pub first_index: u32,
    pub index_count: u32,
    pub base_vertex: i32,
}

/// A loaded mesh and its submeshes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MeshHandle {
    pub id: u64,
    pub submeshes: Vec<SubmeshRange>,
}

impl MeshHandle {
    /// The submesh debug primitives are drawn with.
    pub fn primary(&self) -> Option<SubmeshRange> {
        self.submeshes.first().copied()
    }
}

/// How a mapped buffer's previous contents are treated.
///
/// Every batch rewrites its instance buffer from the start, so previous
/// contents are always discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapMode {
    WriteDiscard,
}

/// Descriptor for creating a per-instance data buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct InstanceBufferDescriptor {
    /// Debug label for the buffer.
    pub label: Option<String>,
    /// Size of one element in bytes.
    pub element_size: usize,
    /// Number of elements.
    pub capacity: usize,
    /// Buffer is rewritten every frame.
    pub dynamic: bool,
}

impl InstanceBufferDescriptor {
    pub fn new(element_size: usize, capacity: usize) -> Self {
        Self {
            label: None,
            element_size,
            capacity,
            dynamic: true,
        }
    }

    /// Set the debug label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_dynamic(mut self, dynamic: bool) -> Self {
        self.dynamic = dynamic;
        self
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.element_size * self.capacity
    }
}

/// Graphics device operations the batch renderer issues.
pub trait DebugDrawDevice {
    fn create_instance_buffer(
        &mut self,
        descriptor: &InstanceBufferDescriptor,
    ) -> DeviceResult<BufferHandle>;

    fn destroy_buffer(&mut self, buffer: BufferHandle);

    /// Map `buffer` for CPU writes. The slice covers the whole buffer.
    fn map_buffer(&mut self, buffer: BufferHandle, mode: MapMode) -> DeviceResult<&mut [u8]>;

    fn unmap_buffer(&mut self, buffer: BufferHandle);

    fn bind_program(&mut self, program: ProgramHandle);

    fn bind_mesh(&mut self, mesh: &MeshHandle);

    fn bind_instance_buffer(&mut self, buffer: BufferHandle);

    /// Bind rasterizer fill mode and depth test.
    fn set_render_state(&mut self, state: RenderState);

    /// Issue one indexed, instanced draw. Never called with zero instances.
    fn draw_indexed_instanced(&mut self, submesh: SubmeshRange, instance_count: u32);
}

/// Resource manager used once when the renderer is created.
pub trait DebugDrawResources {
    fn load_mesh(&mut self, mesh: DebugMesh) -> DeviceResult<MeshHandle>;

    /// Load or compile the program for `permutation` with its
    /// [`defines`](ShaderPermutation::defines).
    fn load_program(&mut self, permutation: &ShaderPermutation) -> DeviceResult<ProgramHandle>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_builder() {
        let descriptor = InstanceBufferDescriptor::new(96, 10)
            .with_label("instances")
            .with_dynamic(false);
        assert_eq!(descriptor.label.as_deref(), Some("instances"));
        assert_eq!(descriptor.size(), 960);
        assert!(!descriptor.dynamic);
    }

    #[test]
    fn test_primary_submesh() {
        let range = SubmeshRange {
            first_index: 6,
            index_count: 36,
            base_vertex: 0,
        };
        let mesh = MeshHandle {
            id: 1,
            submeshes: vec![range],
        };
        assert_eq!(mesh.primary(), Some(range));
        assert_eq!(
            MeshHandle {
                id: 2,
                submeshes: Vec::new()
            }
            .primary(),
            None
        );
    }
}
