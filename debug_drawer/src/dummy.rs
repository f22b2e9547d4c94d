//! Recording device for testing and development.
//!
//! [`DummyDevice`] doesn't touch a GPU. It keeps instance buffers in host
//! memory and records every draw call together with the decoded instances,
//! so the renderer can be verified without hardware.

use std::collections::HashMap;

use crate::device::{
    BufferHandle, DebugDrawDevice, DebugDrawResources, InstanceBufferDescriptor, MapMode,
    MeshHandle, ProgramHandle, SubmeshRange,
};
use crate::error::{DeviceError, DeviceResult};
use crate::options::RenderState;
use crate::shader::{DebugMesh, ShaderPermutation};
use crate::vertex::InstanceData;

/// One recorded draw call.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    pub program: ProgramHandle,
    pub mesh: u64,
    pub submesh: SubmeshRange,
    pub state: RenderState,
    pub instance_buffer: BufferHandle,
    pub instance_count: u32,
    /// Instances read back from the bound buffer at draw time.
    pub instances: Vec<InstanceData>,
}

#[derive(Debug)]
struct DummyBuffer {
    label: Option<String>,
    data: Vec<u8>,
}

/// Dummy graphics device.
#[derive(Debug, Default)]
pub struct DummyDevice {
    next_buffer: u64,
    buffers: HashMap<BufferHandle, DummyBuffer>,
    mapped: Option<BufferHandle>,
    program: Option<ProgramHandle>,
    mesh: Option<u64>,
    instance_buffer: Option<BufferHandle>,
    state: Option<RenderState>,
    draws: Vec<DrawRecord>,
    buffers_created: usize,
    buffers_destroyed: usize,
    map_count: usize,
    fail_buffer_creation: bool,
}

impl DummyDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the device name.
    pub fn name(&self) -> &'static str {
        "Dummy Debug Draw Device"
    }

    /// Make every following buffer creation fail.
    pub fn set_fail_buffer_creation(&mut self, fail: bool) {
        self.fail_buffer_creation = fail;
    }

    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    /// Forget recorded draws, keeping buffers and counters.
    pub fn clear_draws(&mut self) {
        self.draws.clear();
    }

    pub fn buffers_created(&self) -> usize {
        self.buffers_created
    }

    pub fn buffers_destroyed(&self) -> usize {
        self.buffers_destroyed
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn map_count(&self) -> usize {
        self.map_count
    }

    pub fn buffer_label(&self, buffer: BufferHandle) -> Option<&str> {
        self.buffers.get(&buffer)?.label.as_deref()
    }
}

impl DebugDrawDevice for DummyDevice {
    fn create_instance_buffer(
        &mut self,
        descriptor: &InstanceBufferDescriptor,
    ) -> DeviceResult<BufferHandle> {
        if self.fail_buffer_creation {
            return Err(DeviceError::BufferCreationFailed(format!(
                "{:?} rejected by dummy device",
                descriptor.label
            )));
        }
        log::trace!(
            "DummyDevice: creating buffer {:?} (size: {})",
            descriptor.label,
            descriptor.size()
        );
        self.next_buffer += 1;
        let handle = BufferHandle(self.next_buffer);
        self.buffers.insert(
            handle,
            DummyBuffer {
                label: descriptor.label.clone(),
                data: vec![0; descriptor.size()],
            },
        );
        self.buffers_created += 1;
        Ok(handle)
    }

    fn destroy_buffer(&mut self, buffer: BufferHandle) {
        if self.buffers.remove(&buffer).is_some() {
            self.buffers_destroyed += 1;
        } else {
            log::warn!("DummyDevice: destroying unknown buffer {:?}", buffer);
        }
    }

    fn map_buffer(&mut self, buffer: BufferHandle, _mode: MapMode) -> DeviceResult<&mut [u8]> {
        if let Some(mapped) = self.mapped {
            return Err(DeviceError::MapFailed(format!(
                "{mapped:?} is still mapped"
            )));
        }
        let storage = self
            .buffers
            .get_mut(&buffer)
            .ok_or(DeviceError::UnknownBuffer(buffer))?;
        self.mapped = Some(buffer);
        self.map_count += 1;
        Ok(storage.data.as_mut_slice())
    }

    fn unmap_buffer(&mut self, buffer: BufferHandle) {
        if self.mapped == Some(buffer) {
            self.mapped = None;
        } else {
            log::warn!("DummyDevice: unmapping {:?} which is not mapped", buffer);
        }
    }

    fn bind_program(&mut self, program: ProgramHandle) {
        self.program = Some(program);
    }

    fn bind_mesh(&mut self, mesh: &MeshHandle) {
        self.mesh = Some(mesh.id);
    }

    fn bind_instance_buffer(&mut self, buffer: BufferHandle) {
        self.instance_buffer = Some(buffer);
    }

    fn set_render_state(&mut self, state: RenderState) {
        self.state = Some(state);
    }

    fn draw_indexed_instanced(&mut self, submesh: SubmeshRange, instance_count: u32) {
        assert!(instance_count > 0, "zero-instance draw call");
        assert!(self.mapped.is_none(), "draw while an instance buffer is mapped");
        let (Some(program), Some(mesh), Some(instance_buffer), Some(state)) =
            (self.program, self.mesh, self.instance_buffer, self.state)
        else {
            panic!("draw call without program, mesh, instance buffer and render state bound");
        };
        let instances = self
            .buffers
            .get(&instance_buffer)
            .map(|buffer| {
                buffer
                    .data
                    .chunks_exact(InstanceData::STRIDE)
                    .take(instance_count as usize)
                    .map(bytemuck::pod_read_unaligned::<InstanceData>)
                    .collect()
            })
            .unwrap_or_default();
        self.draws.push(DrawRecord {
            program,
            mesh,
            submesh,
            state,
            instance_buffer,
            instance_count,
            instances,
        });
    }
}

/// Dummy resource manager handing out sequential handles.
#[derive(Debug, Default)]
pub struct DummyResources {
    meshes: HashMap<DebugMesh, u64>,
    programs: HashMap<ShaderPermutation, ProgramHandle>,
    next_id: u64,
}

impl DummyResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mesh_id(&self, mesh: DebugMesh) -> Option<u64> {
        self.meshes.get(&mesh).copied()
    }

    pub fn program(&self, permutation: &ShaderPermutation) -> Option<ProgramHandle> {
        self.programs.get(permutation).copied()
    }

    pub fn loaded_meshes(&self) -> usize {
        self.meshes.len()
    }

    pub fn loaded_programs(&self) -> usize {
        self.programs.len()
    }
}

/// Index count of the unit mesh the dummy pretends to load.
fn index_count(mesh: DebugMesh) -> u32 {
    match mesh {
        DebugMesh::Line => 2,
        DebugMesh::Point | DebugMesh::Quad | DebugMesh::Glyph => 6,
        DebugMesh::Sphere => 960,
        DebugMesh::Cross => 6,
        DebugMesh::Circle => 64,
        DebugMesh::Arrow => 48,
        DebugMesh::Triangle => 3,
        DebugMesh::Cube => 36,
    }
}

impl DebugDrawResources for DummyResources {
    fn load_mesh(&mut self, mesh: DebugMesh) -> DeviceResult<MeshHandle> {
        self.next_id += 1;
        let id = self.next_id;
        self.meshes.insert(mesh, id);
        log::trace!("DummyResources: mesh {:?} -> {}", mesh, id);
        Ok(MeshHandle {
            id,
            submeshes: vec![SubmeshRange {
                first_index: 0,
                index_count: index_count(mesh),
                base_vertex: 0,
            }],
        })
    }

    fn load_program(&mut self, permutation: &ShaderPermutation) -> DeviceResult<ProgramHandle> {
        self.next_id += 1;
        let handle = ProgramHandle(self.next_id);
        self.programs.insert(*permutation, handle);
        log::trace!(
            "DummyResources: program {} {:?} -> {:?}",
            permutation.label(),
            permutation.defines(),
            handle
        );
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Bucket;

    #[test]
    fn test_map_is_exclusive() {
        let mut device = DummyDevice::new();
        let a = device
            .create_instance_buffer(&InstanceBufferDescriptor::new(4, 4))
            .unwrap();
        let b = device
            .create_instance_buffer(&InstanceBufferDescriptor::new(4, 4))
            .unwrap();
        assert_eq!(device.map_buffer(a, MapMode::WriteDiscard).unwrap().len(), 16);
        assert!(matches!(
            device.map_buffer(b, MapMode::WriteDiscard),
            Err(DeviceError::MapFailed(_))
        ));
        device.unmap_buffer(a);
        assert!(device.map_buffer(b, MapMode::WriteDiscard).is_ok());
    }

    #[test]
    fn test_unknown_buffer() {
        let mut device = DummyDevice::new();
        let err = device
            .map_buffer(BufferHandle(99), MapMode::WriteDiscard)
            .unwrap_err();
        assert_eq!(err, DeviceError::UnknownBuffer(BufferHandle(99)));
    }

    #[test]
    #[should_panic(expected = "zero-instance")]
    fn test_zero_instance_draw_panics() {
        let mut device = DummyDevice::new();
        device.draw_indexed_instanced(
            SubmeshRange {
                first_index: 0,
                index_count: 3,
                base_vertex: 0,
            },
            0,
        );
    }

    #[test]
    fn test_records_draw() {
        let mut device = DummyDevice::new();
        let buffer = device
            .create_instance_buffer(
                &InstanceBufferDescriptor::new(InstanceData::STRIDE, 2).with_label("test"),
            )
            .unwrap();
        assert_eq!(device.buffer_label(buffer), Some("test"));

        let mut instance: InstanceData = bytemuck::Zeroable::zeroed();
        instance.picking_id = 5;
        device.map_buffer(buffer, MapMode::WriteDiscard).unwrap()[..InstanceData::STRIDE]
            .copy_from_slice(bytemuck::bytes_of(&instance));
        device.unmap_buffer(buffer);

        let mut resources = DummyResources::new();
        let mesh = resources.load_mesh(DebugMesh::Cube).unwrap();
        device.bind_mesh(&mesh);
        device.bind_program(ProgramHandle(1));
        device.bind_instance_buffer(buffer);
        device.set_render_state(Bucket::SolidDepth.render_state());
        device.draw_indexed_instanced(mesh.submeshes[0], 1);

        let draw = &device.draws()[0];
        assert_eq!(draw.mesh, mesh.id);
        assert_eq!(draw.submesh.index_count, 36);
        assert_eq!(draw.instances, vec![instance]);
    }
}
