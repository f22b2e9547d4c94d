//! Debug geometry drawing for RedLilium Engine.
//!
//! Accumulates debug primitives (lines, spheres, boxes, arrows, text, grids
//! and more) from many producer threads, batches them by render state and
//! issues instanced draw calls through a small device abstraction.
//!
//! # Architecture
//!
//! - [`DebugDrawer`]: thread-safe accumulator. Each primitive type has a
//!   shared chunked [`Deck`] behind its own lock, and each producer thread
//!   has fixed-capacity staging buffers that flush into it
//! - [`ThreadContext`]: a producer thread's handle to the drawer
//! - [`DebugDraw`]: shape-level helpers, implemented by both of the above
//! - [`DebugDrawRenderer`]: partitions each queue into the four [`Bucket`]s
//!   and draws one instanced call per non-empty bucket
//! - [`RedirectSession`]: forwards what one drawer queues into another, e.g.
//!   game-view debug draws into an editor viewport
//!
//! # Usage
//!
//! ```ignore
//! // Setup (once)
//! let drawer = Arc::new(DebugDrawer::new(DebugDrawerConfig::new().with_thread_count(4)));
//! let mut renderer = DebugDrawRenderer::new(&mut device, &mut resources, RendererConfig::default())?;
//!
//! // On worker thread `i` (can run in parallel):
//! let ctx = drawer.thread(i);
//! ctx.draw_line(Vec3::ZERO, Vec3::ONE, colors::RED);
//! ctx.draw_aabb(Vec3::splat(-1.0), Vec3::ONE, colors::GREEN);
//!
//! // On the render thread, once workers are done:
//! renderer.render(&mut device, &drawer, ShaderOutput::Index)?; // picking pass
//! renderer.draw_all(&mut device, &drawer, ShaderOutput::Color, dt)?;
//! ```

mod allocator;
mod config;
mod deck;
mod device;
mod draw_api;
mod drawer;
#[cfg(any(test, feature = "dummy"))]
pub mod dummy;
mod error;
mod options;
mod output;
mod partition;
pub mod primitives;
mod queues;
mod redirect;
mod renderer;
mod shader;
mod staging;
mod vertex;

pub use allocator::{AllocationToken, AllocatorStats, DrawAllocator};
pub use config::{DebugDrawerConfig, RendererConfig};
pub use deck::{Deck, DeckIndex, MAX_CHUNK_SHIFT};
pub use device::{
    BufferHandle, DebugDrawDevice, DebugDrawResources, InstanceBufferDescriptor, MapMode,
    MeshHandle, ProgramHandle, SubmeshRange,
};
pub use draw_api::DebugDraw;
pub use drawer::{DebugDrawer, ThreadContext};
pub use error::{DebugDrawError, DebugDrawResult, DeviceError, DeviceResult};
pub use options::{Bucket, DrawOptions, FillMode, RenderState, NO_PICKING};
pub use output::{colors, Color, Output, ShaderOutput};
pub use partition::BucketPartition;
pub use primitives::{
    DebugAabb, DebugArrow, DebugCircle, DebugCross, DebugGrid, DebugLine, DebugOobb, DebugPoint,
    DebugRectangle, DebugSphere, DebugString, DebugTriangle, GridCells, InstancedPrimitive,
    Primitive, PrimitiveKind, ResidencyFn, TrackedText, MAX_TEXT_LENGTH,
};
pub use redirect::{RedirectSession, ThreadRedirectSession};
pub use renderer::{DebugDrawRenderer, RenderStats};
pub use shader::{DebugMesh, ShaderKind, ShaderPermutation};
pub use staging::StagingBuffer;
pub use vertex::InstanceData;
