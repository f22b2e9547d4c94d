//! Debug primitive records.
//!
//! Every primitive carries its geometry, an [`Output`] and [`DrawOptions`].
//! The shared batching code is generic over [`Primitive`]; primitives drawn
//! as one instance of a unit mesh also implement [`InstancedPrimitive`].
//! Text and grids expand into many instances and take the dynamic draw path.

mod grid;
mod shapes;
mod text;

pub use grid::{DebugGrid, GridCells, ResidencyFn};
pub use shapes::{
    DebugAabb, DebugArrow, DebugCircle, DebugCross, DebugLine, DebugOobb, DebugPoint,
    DebugRectangle, DebugSphere, DebugTriangle,
};
pub use text::{DebugString, TrackedText, MAX_TEXT_LENGTH};

use glam::Mat4;

use crate::options::{Bucket, DrawOptions};
use crate::output::{Color, Output, ShaderOutput};
use crate::shader::{DebugMesh, ShaderKind};
use crate::vertex::InstanceData;

/// Primitive type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Line,
    Sphere,
    Point,
    Rectangle,
    Cross,
    Circle,
    Arrow,
    Triangle,
    Aabb,
    Oobb,
    String,
    Grid,
}

impl PrimitiveKind {
    pub const COUNT: usize = 12;

    pub const ALL: [PrimitiveKind; Self::COUNT] = [
        PrimitiveKind::Line,
        PrimitiveKind::Sphere,
        PrimitiveKind::Point,
        PrimitiveKind::Rectangle,
        PrimitiveKind::Cross,
        PrimitiveKind::Circle,
        PrimitiveKind::Arrow,
        PrimitiveKind::Triangle,
        PrimitiveKind::Aabb,
        PrimitiveKind::Oobb,
        PrimitiveKind::String,
        PrimitiveKind::Grid,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }
}

pub(crate) mod sealed {
    use crate::queues::{PrimitiveQueues, ThreadStaging, TypedQueue};
    use crate::staging::StagingBuffer;

    /// Locates a primitive type's shared queue and per-thread staging buffer.
    pub trait Stored: Sized {
        fn queue(queues: &PrimitiveQueues) -> &TypedQueue<Self>;
        fn staging(slot: &mut ThreadStaging) -> &mut StagingBuffer<Self>;
    }
}

/// A debug draw record of one shape type.
pub trait Primitive: sealed::Stored + Clone + Send + Sync + 'static {
    const KIND: PrimitiveKind;

    fn options(&self) -> &DrawOptions;
    fn options_mut(&mut self) -> &mut DrawOptions;
    fn output(&self) -> &Output;
    fn output_mut(&mut self) -> &mut Output;

    /// Render-state bucket this element is drawn in.
    #[inline]
    fn bucket(&self) -> Bucket {
        self.options().bucket()
    }

    /// Bucket in a pass of the given output mode, or `None` when the element
    /// writes nothing in that mode.
    fn bucket_for(&self, mode: ShaderOutput) -> Option<Bucket> {
        match mode {
            ShaderOutput::Color => Some(self.bucket()),
            ShaderOutput::Index => self
                .output()
                .picking_id(self.options())
                .map(|_| self.bucket()),
        }
    }

    fn with_options(mut self, options: DrawOptions) -> Self {
        *self.options_mut() = options;
        self
    }

    fn with_color(mut self, color: Color) -> Self {
        *self.output_mut() = Output::Color(color);
        self
    }

    fn with_picking_id(mut self, id: u32) -> Self {
        *self.output_mut() = Output::PickingId(id);
        self
    }

    fn with_duration(mut self, duration: f32) -> Self {
        self.options_mut().duration = duration;
        self
    }
}

/// A primitive drawn as exactly one instance of a unit mesh.
pub trait InstancedPrimitive: Primitive {
    const MESH: DebugMesh;
    const SHADER: ShaderKind = ShaderKind::Shape;

    /// Model matrix mapping [`Self::MESH`] onto this primitive.
    fn transform(&self) -> Mat4;

    fn instance(&self, mode: ShaderOutput) -> Option<InstanceData> {
        InstanceData::new(self.transform(), self.output(), self.options(), mode)
    }
}

/// Implements [`Primitive`] for a record with `output` and `options` fields.
macro_rules! impl_primitive {
    ($ty:ty, $kind:ident, $field:ident) => {
        impl $crate::primitives::sealed::Stored for $ty {
            fn queue(
                queues: &$crate::queues::PrimitiveQueues,
            ) -> &$crate::queues::TypedQueue<Self> {
                &queues.$field
            }

            fn staging(
                slot: &mut $crate::queues::ThreadStaging,
            ) -> &mut $crate::staging::StagingBuffer<Self> {
                &mut slot.$field
            }
        }

        impl $crate::primitives::Primitive for $ty {
            const KIND: $crate::primitives::PrimitiveKind =
                $crate::primitives::PrimitiveKind::$kind;

            fn options(&self) -> &$crate::options::DrawOptions {
                &self.options
            }

            fn options_mut(&mut self) -> &mut $crate::options::DrawOptions {
                &mut self.options
            }

            fn output(&self) -> &$crate::output::Output {
                &self.output
            }

            fn output_mut(&mut self) -> &mut $crate::output::Output {
                &mut self.output
            }
        }
    };
}

pub(crate) use impl_primitive;
