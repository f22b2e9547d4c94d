//! Shader permutations and the unit meshes primitives are instanced from.

use crate::output::ShaderOutput;

/// Family of debug draw shaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderKind {
    /// Instanced unit meshes (lines, spheres, boxes, ...).
    Shape,
    /// Instanced glyph quads.
    Text,
    /// Instanced grid cells.
    Grid,
}

impl ShaderKind {
    pub const ALL: [ShaderKind; 3] = [ShaderKind::Shape, ShaderKind::Text, ShaderKind::Grid];

    pub fn name(self) -> &'static str {
        match self {
            ShaderKind::Shape => "debug_shape",
            ShaderKind::Text => "debug_text",
            ShaderKind::Grid => "debug_grid",
        }
    }
}

/// A compiled program variant: shader family plus output mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShaderPermutation {
    pub kind: ShaderKind,
    pub output: ShaderOutput,
}

impl ShaderPermutation {
    pub fn new(kind: ShaderKind, output: ShaderOutput) -> Self {
        Self { kind, output }
    }

    /// Whether this permutation exists. Text has no index-output variant.
    pub fn is_supported(&self) -> bool {
        !matches!(
            (self.kind, self.output),
            (ShaderKind::Text, ShaderOutput::Index)
        )
    }

    /// Preprocessor defines the resource manager compiles this variant with.
    pub fn defines(&self) -> &'static [&'static str] {
        match self.output {
            ShaderOutput::Color => &["OUTPUT_COLOR"],
            ShaderOutput::Index => &["OUTPUT_INDEX"],
        }
    }

    pub fn label(&self) -> String {
        let suffix = match self.output {
            ShaderOutput::Color => "color",
            ShaderOutput::Index => "index",
        };
        format!("{}_{}", self.kind.name(), suffix)
    }

    /// Every supported permutation.
    pub fn all() -> impl Iterator<Item = ShaderPermutation> {
        ShaderKind::ALL
            .into_iter()
            .flat_map(|kind| ShaderOutput::ALL.into_iter().map(move |o| Self::new(kind, o)))
            .filter(ShaderPermutation::is_supported)
    }
}

/// Unit meshes loaded at initialization.
///
/// Each primitive's instance transform maps the matching unit mesh into
/// world space:
/// - `Line`: segment from the origin to `+X`
/// - `Point`, `Sphere`: centered at the origin, radius 1
/// - `Quad`, `Circle`: in the XY plane, extent 1, facing `+Z`
/// - `Cross`: three axis segments from -1 to 1
/// - `Arrow`: shaft from the origin to `+Z` with a head of width 1
/// - `Triangle`: vertices `(0,0,0)`, `(1,0,0)`, `(0,1,0)`
/// - `Cube`: from -1 to 1 on every axis
/// - `Glyph`: one glyph quad of size 1, glyph selected per instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DebugMesh {
    Line,
    Point,
    Sphere,
    Quad,
    Cross,
    Circle,
    Arrow,
    Triangle,
    Cube,
    Glyph,
}

impl DebugMesh {
    pub const ALL: [DebugMesh; 10] = [
        DebugMesh::Line,
        DebugMesh::Point,
        DebugMesh::Sphere,
        DebugMesh::Quad,
        DebugMesh::Cross,
        DebugMesh::Circle,
        DebugMesh::Arrow,
        DebugMesh::Triangle,
        DebugMesh::Cube,
        DebugMesh::Glyph,
    ];
}
