//! What a primitive writes: a color, or a picking id for selection buffers.

use crate::options::{DrawOptions, NO_PICKING};

/// Linear RGBA color.
pub type Color = [f32; 4];

/// Common colors.
pub mod colors {
    use super::Color;

    pub const WHITE: Color = [1.0, 1.0, 1.0, 1.0];
    pub const RED: Color = [1.0, 0.0, 0.0, 1.0];
    pub const GREEN: Color = [0.0, 1.0, 0.0, 1.0];
    pub const BLUE: Color = [0.0, 0.0, 1.0, 1.0];
    pub const YELLOW: Color = [1.0, 1.0, 0.0, 1.0];
}

/// Render target a pass writes to.
///
/// Selects the shader permutation and the per-instance payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderOutput {
    /// Per-instance color.
    Color,
    /// Per-instance picking id, for selection rendering.
    Index,
}

impl ShaderOutput {
    pub const ALL: [ShaderOutput; 2] = [ShaderOutput::Color, ShaderOutput::Index];
}

/// Per-primitive output payload.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Output {
    Color(Color),
    PickingId(u32),
}

impl Output {
    /// Color written in [`ShaderOutput::Color`] mode.
    ///
    /// A picking-only primitive still renders in color passes, in white.
    pub fn color(&self) -> Color {
        match self {
            Output::Color(color) => *color,
            Output::PickingId(_) => colors::WHITE,
        }
    }

    /// Picking id written in [`ShaderOutput::Index`] mode.
    ///
    /// Falls back to the options' `instance_thickness`; `None` when neither
    /// carries an id, in which case the element is left out of picking passes.
    pub fn picking_id(&self, options: &DrawOptions) -> Option<u32> {
        let id = match self {
            Output::PickingId(id) => *id,
            Output::Color(_) => options.instance_thickness,
        };
        (id != NO_PICKING).then_some(id)
    }
}

impl Default for Output {
    fn default() -> Self {
        Output::Color(colors::WHITE)
    }
}

impl From<Color> for Output {
    fn from(color: Color) -> Self {
        Output::Color(color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_picking_id_prefers_tagged_variant() {
        let options = DrawOptions::new().with_picking_id(3);
        assert_eq!(Output::PickingId(9).picking_id(&options), Some(9));
        assert_eq!(Output::Color(colors::RED).picking_id(&options), Some(3));
    }

    #[test]
    fn test_no_picking_sentinel() {
        let options = DrawOptions::new();
        assert_eq!(Output::Color(colors::RED).picking_id(&options), None);
        assert_eq!(Output::PickingId(NO_PICKING).picking_id(&options), None);
    }

    #[test]
    fn test_color_of_picking_output() {
        assert_eq!(Output::PickingId(1).color(), colors::WHITE);
        assert_eq!(Output::from(colors::BLUE).color(), colors::BLUE);
    }
}
