use std::collections::HashMap;
use std::iter::Peekable;

use crate::config::RendererConfig;
use crate::deck::Deck;
use crate::device::{
    BufferHandle, DebugDrawDevice, DebugDrawResources, InstanceBufferDescriptor, MapMode,
    MeshHandle, ProgramHandle, SubmeshRange,
};
use crate::drawer::DebugDrawer;
use crate::error::{DebugDrawError, DebugDrawResult, DeviceError};
use crate::options::Bucket;
use crate::output::ShaderOutput;
use crate::partition::BucketPartition;
use crate::primitives::{
    DebugAabb, DebugArrow, DebugCircle, DebugCross, DebugGrid, DebugLine, DebugOobb, DebugPoint,
    DebugRectangle, DebugSphere, DebugString, DebugTriangle, InstancedPrimitive, Primitive,
    PrimitiveKind,
};
use crate::shader::{DebugMesh, ShaderKind, ShaderPermutation};
use crate::vertex::InstanceData;

/// Counters for one render pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub draw_calls: usize,
    pub instances: usize,
    /// Over-sized instance buffers created and destroyed during the pass.
    pub temporary_buffers: usize,
    /// Primitives removed by the duration sweep.
    pub expired: usize,
}

#[derive(Debug, Clone, Copy)]
struct PooledBuffer {
    handle: BufferHandle,
    capacity: usize,
}

/// Batches queued debug primitives into instanced draw calls.
///
/// Create once at initialization; meshes and programs for every
/// [`ShaderPermutation`] are loaded up front. Each frame, call
/// [`render`](Self::render) for extra passes (e.g. picking) and
/// [`draw_all`](Self::draw_all) for the last pass, which also advances
/// primitive lifetimes.
///
/// Per primitive type the queue is partitioned into the four [`Bucket`]s and
/// each non-empty bucket becomes one draw call. Text and grids expand into a
/// variable number of instances and stream through a dynamic buffer, split
/// into several draw calls when they exceed
/// [`RendererConfig::dynamic_batch_limit`].
pub struct DebugDrawRenderer {
    config: RendererConfig,
    meshes: Vec<MeshHandle>,
    programs: HashMap<ShaderPermutation, ProgramHandle>,
    small_buffer: PooledBuffer,
    large_buffer: PooledBuffer,
    dynamic_buffer: PooledBuffer,
    partition: BucketPartition,
}

impl DebugDrawRenderer {
    /// Load meshes and programs and create the pooled instance buffers.
    ///
    /// # Panics
    ///
    /// Panics if `config.dynamic_batch_limit` is zero.
    pub fn new<D, R>(device: &mut D, resources: &mut R, config: RendererConfig) -> DebugDrawResult<Self>
    where
        D: DebugDrawDevice + ?Sized,
        R: DebugDrawResources + ?Sized,
    {
        assert!(config.dynamic_batch_limit > 0, "dynamic batch limit must be non-zero");

        let mut meshes = Vec::with_capacity(DebugMesh::ALL.len());
        for mesh in DebugMesh::ALL {
            let handle = resources.load_mesh(mesh)?;
            if handle.primary().is_none() {
                return Err(DeviceError::MeshLoadFailed(mesh).into());
            }
            meshes.push(handle);
        }

        let mut programs = HashMap::new();
        for permutation in ShaderPermutation::all() {
            programs.insert(permutation, resources.load_program(&permutation)?);
        }

        let small_buffer = create_pooled(device, config.small_buffer_instances, "debug_draw_small_instances")?;
        let large_buffer = create_pooled(device, config.large_buffer_instances, "debug_draw_large_instances")?;
        let dynamic_buffer = create_pooled(device, config.dynamic_batch_limit, "debug_draw_dynamic_instances")?;

        log::debug!(
            "DebugDrawRenderer: {} meshes, {} programs, instance buffers {}/{}/{}",
            meshes.len(),
            programs.len(),
            small_buffer.capacity,
            large_buffer.capacity,
            dynamic_buffer.capacity
        );

        Ok(Self {
            config,
            meshes,
            programs,
            small_buffer,
            large_buffer,
            dynamic_buffer,
            partition: BucketPartition::new(),
        })
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    /// Flush `drawer` and draw everything it has queued.
    ///
    /// Lifetimes are left untouched. Text has no index output and is skipped
    /// in [`ShaderOutput::Index`] passes.
    pub fn render<D>(
        &mut self,
        device: &mut D,
        drawer: &DebugDrawer,
        mode: ShaderOutput,
    ) -> DebugDrawResult<RenderStats>
    where
        D: DebugDrawDevice + ?Sized,
    {
        drawer.flush_all();
        let mut stats = RenderStats::default();

        self.render_queue::<DebugLine, D>(device, drawer, mode, &mut stats)?;
        self.render_queue::<DebugSphere, D>(device, drawer, mode, &mut stats)?;
        self.render_queue::<DebugPoint, D>(device, drawer, mode, &mut stats)?;
        self.render_queue::<DebugRectangle, D>(device, drawer, mode, &mut stats)?;
        self.render_queue::<DebugCross, D>(device, drawer, mode, &mut stats)?;
        self.render_queue::<DebugCircle, D>(device, drawer, mode, &mut stats)?;
        self.render_queue::<DebugArrow, D>(device, drawer, mode, &mut stats)?;
        self.render_queue::<DebugTriangle, D>(device, drawer, mode, &mut stats)?;
        self.render_queue::<DebugAabb, D>(device, drawer, mode, &mut stats)?;
        self.render_queue::<DebugOobb, D>(device, drawer, mode, &mut stats)?;

        match mode {
            ShaderOutput::Color => drawer.with_deck::<DebugString, _>(|deck| {
                self.draw_string_source(device, deck.len(), |i| deck.get_flat(i), &mut stats)
            })?,
            ShaderOutput::Index => {
                log::trace!("DebugDrawRenderer: skipping text in index pass");
            }
        }
        drawer.with_deck::<DebugGrid, _>(|deck| {
            self.draw_grid_source(device, mode, deck.len(), |i| deck.get_flat(i), &mut stats)
        })?;

        Ok(stats)
    }

    /// [`render`](Self::render), then sweep expired primitives by `dt`.
    pub fn draw_all<D>(
        &mut self,
        device: &mut D,
        drawer: &DebugDrawer,
        mode: ShaderOutput,
        dt: f32,
    ) -> DebugDrawResult<RenderStats>
    where
        D: DebugDrawDevice + ?Sized,
    {
        let mut stats = self.render(device, drawer, mode)?;
        stats.expired = drawer.sweep_expired(dt);
        Ok(stats)
    }

    /// Draw `items` right away without queueing them.
    pub fn draw_immediate<P, D>(
        &mut self,
        device: &mut D,
        items: &[P],
        mode: ShaderOutput,
    ) -> DebugDrawResult<RenderStats>
    where
        P: InstancedPrimitive,
        D: DebugDrawDevice + ?Sized,
    {
        let mut stats = RenderStats::default();
        self.draw_instanced(device, mode, items.len(), |i| items.get(i), &mut stats)?;
        Ok(stats)
    }

    /// Draw text right away. Text only supports [`ShaderOutput::Color`].
    pub fn draw_strings<D>(
        &mut self,
        device: &mut D,
        strings: &[DebugString],
        mode: ShaderOutput,
    ) -> DebugDrawResult<RenderStats>
    where
        D: DebugDrawDevice + ?Sized,
    {
        if mode == ShaderOutput::Index {
            return Err(DebugDrawError::UnsupportedOutput(PrimitiveKind::String));
        }
        let mut stats = RenderStats::default();
        self.draw_string_source(device, strings.len(), |i| strings.get(i), &mut stats)?;
        Ok(stats)
    }

    /// Draw grids right away.
    pub fn draw_grids<D>(
        &mut self,
        device: &mut D,
        grids: &[DebugGrid],
        mode: ShaderOutput,
    ) -> DebugDrawResult<RenderStats>
    where
        D: DebugDrawDevice + ?Sized,
    {
        let mut stats = RenderStats::default();
        self.draw_grid_source(device, mode, grids.len(), |i| grids.get(i), &mut stats)?;
        Ok(stats)
    }

    /// Release the pooled instance buffers.
    pub fn destroy<D: DebugDrawDevice + ?Sized>(self, device: &mut D) {
        for buffer in [self.small_buffer, self.large_buffer, self.dynamic_buffer] {
            device.destroy_buffer(buffer.handle);
        }
    }

    fn render_queue<P, D>(
        &mut self,
        device: &mut D,
        drawer: &DebugDrawer,
        mode: ShaderOutput,
        stats: &mut RenderStats,
    ) -> DebugDrawResult<()>
    where
        P: InstancedPrimitive,
        D: DebugDrawDevice + ?Sized,
    {
        drawer.with_deck::<P, _>(|deck: &Deck<P>| {
            self.draw_instanced(device, mode, deck.len(), |i| deck.get_flat(i), stats)
        })
    }

    fn draw_string_source<'a, D, F>(
        &mut self,
        device: &mut D,
        total: usize,
        element: F,
        stats: &mut RenderStats,
    ) -> DebugDrawResult<()>
    where
        D: DebugDrawDevice + ?Sized,
        F: Fn(usize) -> Option<&'a DebugString>,
    {
        self.draw_expanded(
            device,
            ShaderOutput::Color,
            total,
            element,
            ShaderKind::Text,
            DebugMesh::Glyph,
            |string: &'a DebugString| string.glyph_instances(),
            stats,
        )
    }

    fn draw_grid_source<'a, D, F>(
        &mut self,
        device: &mut D,
        mode: ShaderOutput,
        total: usize,
        element: F,
        stats: &mut RenderStats,
    ) -> DebugDrawResult<()>
    where
        D: DebugDrawDevice + ?Sized,
        F: Fn(usize) -> Option<&'a DebugGrid>,
    {
        self.draw_expanded(
            device,
            mode,
            total,
            element,
            ShaderKind::Grid,
            DebugMesh::Cube,
            move |grid: &'a DebugGrid| grid.cell_instances(mode),
            stats,
        )
    }

    /// Draw one instance per element, one draw call per non-empty bucket.
    fn draw_instanced<'a, P, D, F>(
        &mut self,
        device: &mut D,
        mode: ShaderOutput,
        total: usize,
        element: F,
        stats: &mut RenderStats,
    ) -> DebugDrawResult<()>
    where
        P: InstancedPrimitive,
        D: DebugDrawDevice + ?Sized,
        F: Fn(usize) -> Option<&'a P>,
    {
        if total == 0 {
            return Ok(());
        }
        self.partition.rebuild(
            total,
            (0..total).map(|i| element(i).and_then(|item| item.bucket_for(mode))),
        );
        let max_count = self.partition.max_count();
        if max_count == 0 {
            return Ok(());
        }

        let program = self.program(P::SHADER, mode, P::KIND)?;
        let submesh = self.bind_mesh(device, P::MESH);
        device.bind_program(program);

        let (buffer, temporary) = self.acquire_buffer(device, max_count, stats)?;
        let result = self.draw_buckets(device, buffer, submesh, mode, &element, stats);
        if temporary {
            device.destroy_buffer(buffer);
        }
        result
    }

    fn draw_buckets<'a, P, D, F>(
        &self,
        device: &mut D,
        buffer: BufferHandle,
        submesh: SubmeshRange,
        mode: ShaderOutput,
        element: &F,
        stats: &mut RenderStats,
    ) -> DebugDrawResult<()>
    where
        P: InstancedPrimitive,
        D: DebugDrawDevice + ?Sized,
        F: Fn(usize) -> Option<&'a P>,
    {
        for bucket in Bucket::ALL {
            let indices = self.partition.indices(bucket);
            if indices.is_empty() {
                continue;
            }
            let mut instances = indices
                .iter()
                .filter_map(|&i| element(i as usize))
                .filter_map(|item| item.instance(mode));
            let written = write_instances(device, buffer, &mut instances, indices.len())?;
            if written == 0 {
                continue;
            }
            device.bind_instance_buffer(buffer);
            device.set_render_state(bucket.render_state());
            device.draw_indexed_instanced(submesh, written as u32);
            stats.draw_calls += 1;
            stats.instances += written;
        }
        Ok(())
    }

    /// Draw elements that expand into a lazily produced instance sequence.
    ///
    /// Each bucket's sequence is streamed through the dynamic buffer, at most
    /// `dynamic_batch_limit` instances per draw call.
    #[allow(clippy::too_many_arguments)]
    fn draw_expanded<'a, P, D, F, E, I>(
        &mut self,
        device: &mut D,
        mode: ShaderOutput,
        total: usize,
        element: F,
        kind: ShaderKind,
        mesh: DebugMesh,
        expand: E,
        stats: &mut RenderStats,
    ) -> DebugDrawResult<()>
    where
        P: Primitive,
        D: DebugDrawDevice + ?Sized,
        F: Fn(usize) -> Option<&'a P>,
        E: Fn(&'a P) -> I,
        I: Iterator<Item = InstanceData>,
    {
        if total == 0 {
            return Ok(());
        }
        self.partition.rebuild(
            total,
            (0..total).map(|i| element(i).and_then(|item| item.bucket_for(mode))),
        );
        if self.partition.max_count() == 0 {
            return Ok(());
        }

        let program = self.program(kind, mode, P::KIND)?;
        let submesh = self.bind_mesh(device, mesh);
        device.bind_program(program);

        let buffer = self.dynamic_buffer.handle;
        let limit = self.dynamic_buffer.capacity;
        for bucket in Bucket::ALL {
            let indices = self.partition.indices(bucket);
            if indices.is_empty() {
                continue;
            }
            let mut instances: Peekable<_> = indices
                .iter()
                .filter_map(|&i| element(i as usize))
                .flat_map(&expand)
                .peekable();

            let mut state_bound = false;
            while instances.peek().is_some() {
                let written = write_instances(device, buffer, &mut instances, limit)?;
                if !state_bound {
                    device.bind_instance_buffer(buffer);
                    device.set_render_state(bucket.render_state());
                    state_bound = true;
                }
                device.draw_indexed_instanced(submesh, written as u32);
                stats.draw_calls += 1;
                stats.instances += written;
            }
        }
        Ok(())
    }

    fn program(
        &self,
        kind: ShaderKind,
        mode: ShaderOutput,
        primitive: PrimitiveKind,
    ) -> DebugDrawResult<ProgramHandle> {
        self.programs
            .get(&ShaderPermutation::new(kind, mode))
            .copied()
            .ok_or(DebugDrawError::UnsupportedOutput(primitive))
    }

    fn bind_mesh<D: DebugDrawDevice + ?Sized>(&self, device: &mut D, mesh: DebugMesh) -> SubmeshRange {
        let handle = &self.meshes[mesh as usize];
        device.bind_mesh(handle);
        // Checked non-empty when loaded.
        handle.primary().unwrap_or(SubmeshRange {
            first_index: 0,
            index_count: 0,
            base_vertex: 0,
        })
    }

    /// Pick the smallest pooled buffer holding `count` instances, or create a
    /// temporary one.
    fn acquire_buffer<D: DebugDrawDevice + ?Sized>(
        &self,
        device: &mut D,
        count: usize,
        stats: &mut RenderStats,
    ) -> DebugDrawResult<(BufferHandle, bool)> {
        for pooled in [self.small_buffer, self.large_buffer] {
            if count <= pooled.capacity {
                return Ok((pooled.handle, false));
            }
        }
        let descriptor = InstanceBufferDescriptor::new(InstanceData::STRIDE, count)
            .with_label("debug_draw_temporary_instances");
        let handle = device.create_instance_buffer(&descriptor)?;
        stats.temporary_buffers += 1;
        log::trace!("DebugDrawRenderer: temporary buffer for {} instances", count);
        Ok((handle, true))
    }
}

impl std::fmt::Debug for DebugDrawRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugDrawRenderer")
            .field("config", &self.config)
            .field("programs", &self.programs.len())
            .finish()
    }
}

fn create_pooled<D: DebugDrawDevice + ?Sized>(
    device: &mut D,
    capacity: usize,
    label: &str,
) -> DebugDrawResult<PooledBuffer> {
    let descriptor = InstanceBufferDescriptor::new(InstanceData::STRIDE, capacity).with_label(label);
    let handle = device.create_instance_buffer(&descriptor)?;
    Ok(PooledBuffer { handle, capacity })
}

/// Map `buffer` and write up to `limit` instances from `instances`.
///
/// Returns the number written. The buffer is unmapped on every path.
fn write_instances<D, I>(
    device: &mut D,
    buffer: BufferHandle,
    instances: &mut I,
    limit: usize,
) -> DebugDrawResult<usize>
where
    D: DebugDrawDevice + ?Sized,
    I: Iterator<Item = InstanceData>,
{
    let bytes = device.map_buffer(buffer, MapMode::WriteDiscard)?;
    let result = fill_instances(bytes, instances, limit);
    device.unmap_buffer(buffer);
    result
}

fn fill_instances<I>(bytes: &mut [u8], instances: &mut I, limit: usize) -> DebugDrawResult<usize>
where
    I: Iterator<Item = InstanceData>,
{
    let available = bytes.len();
    let mut written = 0;
    for instance in instances.take(limit) {
        let offset = written * InstanceData::STRIDE;
        let end = offset + InstanceData::STRIDE;
        if end > available {
            return Err(DebugDrawError::BufferTooSmall {
                required: end,
                available,
            });
        }
        bytes[offset..end].copy_from_slice(bytemuck::bytes_of(&instance));
        written += 1;
    }
    Ok(written)
}
