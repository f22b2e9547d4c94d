use glam::Mat4;

use crate::options::{DrawOptions, NO_PICKING};
use crate::output::{Output, ShaderOutput};

/// Per-instance record uploaded for every drawn primitive.
///
/// `transform` places the primitive's unit mesh in world space. In color
/// output mode `color` is filled and `picking_id` is [`NO_PICKING`]; in index
/// output mode `picking_id` is filled and `color` is zero. `glyph` is the
/// character code for text instances and zero otherwise.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceData {
    /// Column-major 4x4 model matrix.
    pub transform: [[f32; 4]; 4],
    pub color: [f32; 4],
    pub picking_id: u32,
    pub glyph: u32,
    pub _padding: [u32; 2],
}

impl InstanceData {
    /// Size of one record in bytes.
    pub const STRIDE: usize = std::mem::size_of::<InstanceData>();

    /// Build the record for `mode`.
    ///
    /// Returns `None` in index mode when the primitive carries no picking id.
    pub fn new(
        transform: Mat4,
        output: &Output,
        options: &DrawOptions,
        mode: ShaderOutput,
    ) -> Option<Self> {
        let (color, picking_id) = match mode {
            ShaderOutput::Color => (output.color(), NO_PICKING),
            ShaderOutput::Index => ([0.0; 4], output.picking_id(options)?),
        };
        Some(Self {
            transform: transform.to_cols_array_2d(),
            color,
            picking_id,
            glyph: 0,
            _padding: [0; 2],
        })
    }

    pub fn with_glyph(mut self, glyph: u32) -> Self {
        self.glyph = glyph;
        self
    }

    pub fn transform(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.transform)
    }
}
