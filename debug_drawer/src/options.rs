//! Per-primitive draw options and the render-state buckets they map to.

/// Picking id sentinel meaning "this element writes no picking output".
pub const NO_PICKING: u32 = u32::MAX;

/// Options shared by every debug primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawOptions {
    /// Rasterize with wireframe fill instead of solid.
    pub wireframe: bool,
    /// Draw on top of the scene, ignoring the depth buffer.
    pub ignore_depth: bool,
    /// Remaining lifetime in seconds. The element is removed by the duration
    /// sweep once this reaches zero or below.
    pub duration: f32,
    /// Picking id written in index output mode, or [`NO_PICKING`].
    pub instance_thickness: u32,
}

impl DrawOptions {
    /// Solid, depth-tested, single-frame options.
    pub const fn new() -> Self {
        Self {
            wireframe: false,
            ignore_depth: false,
            duration: 0.0,
            instance_thickness: NO_PICKING,
        }
    }

    /// Wireframe, depth-tested, single-frame options.
    pub const fn wireframe() -> Self {
        Self {
            wireframe: true,
            ..Self::new()
        }
    }

    /// Set the wireframe flag.
    pub fn with_wireframe(mut self, wireframe: bool) -> Self {
        self.wireframe = wireframe;
        self
    }

    /// Set the depth-ignore flag.
    pub fn with_ignore_depth(mut self, ignore_depth: bool) -> Self {
        self.ignore_depth = ignore_depth;
        self
    }

    /// Keep the element alive for `duration` seconds.
    pub fn with_duration(mut self, duration: f32) -> Self {
        self.duration = duration;
        self
    }

    /// Set the picking id used in index output mode.
    pub fn with_picking_id(mut self, id: u32) -> Self {
        self.instance_thickness = id;
        self
    }

    /// Classify these options into a render-state bucket.
    #[inline]
    pub fn bucket(&self) -> Bucket {
        Bucket::classify(self)
    }
}

impl Default for DrawOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// One of the four render-state groups elements are batched into.
///
/// The discriminant is `ignore_depth | (!wireframe << 1)`, which is also the
/// fixed order buckets are drawn in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Bucket {
    WireframeDepth = 0,
    WireframeNoDepth = 1,
    SolidDepth = 2,
    SolidNoDepth = 3,
}

impl Bucket {
    /// Number of buckets.
    pub const COUNT: usize = 4;

    /// All buckets in draw order.
    pub const ALL: [Bucket; Self::COUNT] = [
        Bucket::WireframeDepth,
        Bucket::WireframeNoDepth,
        Bucket::SolidDepth,
        Bucket::SolidNoDepth,
    ];

    /// Map a draw-option pair to its bucket.
    #[inline]
    pub fn classify(options: &DrawOptions) -> Bucket {
        let bits = (options.ignore_depth as u8) | ((!options.wireframe as u8) << 1);
        Self::ALL[bits as usize]
    }

    /// Position of this bucket in [`Bucket::ALL`].
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Rasterizer state implied by this bucket.
    pub fn render_state(self) -> RenderState {
        let fill = match self {
            Bucket::WireframeDepth | Bucket::WireframeNoDepth => FillMode::Wireframe,
            Bucket::SolidDepth | Bucket::SolidNoDepth => FillMode::Solid,
        };
        let depth_test = matches!(self, Bucket::WireframeDepth | Bucket::SolidDepth);
        RenderState { fill, depth_test }
    }
}

/// Rasterizer fill mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FillMode {
    Wireframe,
    Solid,
}

/// Pipeline state bound before each bucket's draw call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderState {
    pub fill: FillMode,
    pub depth_test: bool,
}
