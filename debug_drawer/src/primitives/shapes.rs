//! Fixed-size shapes, each drawn as one instance of a unit mesh.

use glam::{Mat4, Quat, Vec2, Vec3, Vec4};

use super::{impl_primitive, InstancedPrimitive};
use crate::options::DrawOptions;
use crate::output::Output;
use crate::shader::DebugMesh;

/// Rotation taking `+Z` onto `direction`; identity for a zero direction.
fn rotation_to(direction: Vec3) -> Quat {
    match direction.try_normalize() {
        Some(dir) => Quat::from_rotation_arc(Vec3::Z, dir),
        None => Quat::IDENTITY,
    }
}

/// A line segment.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugLine {
    pub start: Vec3,
    pub end: Vec3,
    pub output: Output,
    pub options: DrawOptions,
}

impl DebugLine {
    pub fn new(start: Vec3, end: Vec3) -> Self {
        Self {
            start,
            end,
            output: Output::default(),
            options: DrawOptions::wireframe(),
        }
    }
}

impl_primitive!(DebugLine, Line, lines);

impl InstancedPrimitive for DebugLine {
    const MESH: DebugMesh = DebugMesh::Line;

    fn transform(&self) -> Mat4 {
        Mat4::from_cols(
            (self.end - self.start).extend(0.0),
            Vec4::ZERO,
            Vec4::ZERO,
            self.start.extend(1.0),
        )
    }
}

/// A screen-facing point marker.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugPoint {
    pub position: Vec3,
    pub size: f32,
    pub output: Output,
    pub options: DrawOptions,
}

impl DebugPoint {
    pub fn new(position: Vec3, size: f32) -> Self {
        Self {
            position,
            size,
            output: Output::default(),
            options: DrawOptions::new(),
        }
    }
}

impl_primitive!(DebugPoint, Point, points);

impl InstancedPrimitive for DebugPoint {
    const MESH: DebugMesh = DebugMesh::Point;

    fn transform(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(Vec3::splat(self.size), Quat::IDENTITY, self.position)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DebugSphere {
    pub center: Vec3,
    pub radius: f32,
    pub output: Output,
    pub options: DrawOptions,
}

impl DebugSphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self {
            center,
            radius,
            output: Output::default(),
            options: DrawOptions::new(),
        }
    }
}

impl_primitive!(DebugSphere, Sphere, spheres);

impl InstancedPrimitive for DebugSphere {
    const MESH: DebugMesh = DebugMesh::Sphere;

    fn transform(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(Vec3::splat(self.radius), Quat::IDENTITY, self.center)
    }
}

/// An oriented rectangle. Its local XY plane is rotated by `rotation`.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugRectangle {
    pub center: Vec3,
    pub half_extents: Vec2,
    pub rotation: Quat,
    pub output: Output,
    pub options: DrawOptions,
}

impl DebugRectangle {
    pub fn new(center: Vec3, half_extents: Vec2, rotation: Quat) -> Self {
        Self {
            center,
            half_extents,
            rotation,
            output: Output::default(),
            options: DrawOptions::new(),
        }
    }
}

impl_primitive!(DebugRectangle, Rectangle, rectangles);

impl InstancedPrimitive for DebugRectangle {
    const MESH: DebugMesh = DebugMesh::Quad;

    fn transform(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            self.half_extents.extend(1.0),
            self.rotation,
            self.center,
        )
    }
}

/// A cross marker made of three axis-aligned segments of length `size`.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugCross {
    pub center: Vec3,
    pub size: f32,
    pub output: Output,
    pub options: DrawOptions,
}

impl DebugCross {
    pub fn new(center: Vec3, size: f32) -> Self {
        Self {
            center,
            size,
            output: Output::default(),
            options: DrawOptions::wireframe(),
        }
    }
}

impl_primitive!(DebugCross, Cross, crosses);

impl InstancedPrimitive for DebugCross {
    const MESH: DebugMesh = DebugMesh::Cross;

    fn transform(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.size * 0.5),
            Quat::IDENTITY,
            self.center,
        )
    }
}

/// A circle in the plane perpendicular to `normal`.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugCircle {
    pub center: Vec3,
    pub radius: f32,
    pub normal: Vec3,
    pub output: Output,
    pub options: DrawOptions,
}

impl DebugCircle {
    pub fn new(center: Vec3, radius: f32, normal: Vec3) -> Self {
        Self {
            center,
            radius,
            normal,
            output: Output::default(),
            options: DrawOptions::wireframe(),
        }
    }
}

impl_primitive!(DebugCircle, Circle, circles);

impl InstancedPrimitive for DebugCircle {
    const MESH: DebugMesh = DebugMesh::Circle;

    fn transform(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::new(self.radius, self.radius, 1.0),
            rotation_to(self.normal),
            self.center,
        )
    }
}

/// An arrow from `from` to `to` with a head `head_size` wide.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugArrow {
    pub from: Vec3,
    pub to: Vec3,
    pub head_size: f32,
    pub output: Output,
    pub options: DrawOptions,
}

impl DebugArrow {
    pub fn new(from: Vec3, to: Vec3, head_size: f32) -> Self {
        Self {
            from,
            to,
            head_size,
            output: Output::default(),
            options: DrawOptions::new(),
        }
    }
}

impl_primitive!(DebugArrow, Arrow, arrows);

impl InstancedPrimitive for DebugArrow {
    const MESH: DebugMesh = DebugMesh::Arrow;

    fn transform(&self) -> Mat4 {
        let direction = self.to - self.from;
        Mat4::from_scale_rotation_translation(
            Vec3::new(self.head_size, self.head_size, direction.length()),
            rotation_to(direction),
            self.from,
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DebugTriangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
    pub output: Output,
    pub options: DrawOptions,
}

impl DebugTriangle {
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self {
            a,
            b,
            c,
            output: Output::default(),
            options: DrawOptions::new(),
        }
    }
}

impl_primitive!(DebugTriangle, Triangle, triangles);

impl InstancedPrimitive for DebugTriangle {
    const MESH: DebugMesh = DebugMesh::Triangle;

    fn transform(&self) -> Mat4 {
        let ab = self.b - self.a;
        let ac = self.c - self.a;
        Mat4::from_cols(
            ab.extend(0.0),
            ac.extend(0.0),
            ab.cross(ac).normalize_or_zero().extend(0.0),
            self.a.extend(1.0),
        )
    }
}

/// An axis-aligned box between two corners.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugAabb {
    pub min: Vec3,
    pub max: Vec3,
    pub output: Output,
    pub options: DrawOptions,
}

impl DebugAabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min,
            max,
            output: Output::default(),
            options: DrawOptions::wireframe(),
        }
    }
}

impl_primitive!(DebugAabb, Aabb, aabbs);

impl InstancedPrimitive for DebugAabb {
    const MESH: DebugMesh = DebugMesh::Cube;

    fn transform(&self) -> Mat4 {
        let center = (self.min + self.max) * 0.5;
        let half_extents = (self.max - self.min) * 0.5;
        Mat4::from_scale_rotation_translation(half_extents, Quat::IDENTITY, center)
    }
}

/// An oriented box.
#[derive(Debug, Clone, PartialEq)]
pub struct DebugOobb {
    pub center: Vec3,
    pub half_extents: Vec3,
    pub rotation: Quat,
    pub output: Output,
    pub options: DrawOptions,
}

impl DebugOobb {
    pub fn new(center: Vec3, half_extents: Vec3, rotation: Quat) -> Self {
        Self {
            center,
            half_extents,
            rotation,
            output: Output::default(),
            options: DrawOptions::wireframe(),
        }
    }
}

impl_primitive!(DebugOobb, Oobb, oobbs);

impl InstancedPrimitive for DebugOobb {
    const MESH: DebugMesh = DebugMesh::Cube;

    fn transform(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.half_extents, self.rotation, self.center)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Bucket;
    use crate::output::{colors, ShaderOutput};
    use crate::primitives::Primitive;

    fn assert_close(a: Vec3, b: Vec3) {
        assert!(a.abs_diff_eq(b, 1e-5), "{a:?} != {b:?}");
    }

    #[test]
    fn test_line_maps_unit_segment() {
        let line = DebugLine::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(4.0, 6.0, 3.0));
        let m = line.transform();
        assert_close(m.transform_point3(Vec3::ZERO), line.start);
        assert_close(m.transform_point3(Vec3::X), line.end);
    }

    #[test]
    fn test_triangle_maps_unit_triangle() {
        let tri = DebugTriangle::new(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 3.0));
        let m = tri.transform();
        assert_close(m.transform_point3(Vec3::ZERO), tri.a);
        assert_close(m.transform_point3(Vec3::X), tri.b);
        assert_close(m.transform_point3(Vec3::Y), tri.c);
    }

    #[test]
    fn test_aabb_maps_unit_cube() {
        let aabb = DebugAabb::new(Vec3::new(-1.0, 0.0, 2.0), Vec3::new(3.0, 2.0, 4.0));
        let m = aabb.transform();
        assert_close(m.transform_point3(Vec3::splat(-1.0)), aabb.min);
        assert_close(m.transform_point3(Vec3::ONE), aabb.max);
    }

    #[test]
    fn test_arrow_tip_reaches_target() {
        let arrow = DebugArrow::new(Vec3::new(1.0, 1.0, 1.0), Vec3::new(1.0, 5.0, 1.0), 0.2);
        let m = arrow.transform();
        assert_close(m.transform_point3(Vec3::ZERO), arrow.from);
        assert_close(m.transform_point3(Vec3::Z), arrow.to);
    }

    #[test]
    fn test_zero_length_arrow_is_finite() {
        let arrow = DebugArrow::new(Vec3::ONE, Vec3::ONE, 0.2);
        assert!(arrow.transform().is_finite());
    }

    #[test]
    fn test_circle_faces_normal() {
        let circle = DebugCircle::new(Vec3::ZERO, 2.0, Vec3::X);
        let m = circle.transform();
        assert_close(m.transform_vector3(Vec3::Z), Vec3::X);
        assert!((m.transform_point3(Vec3::X).length() - 2.0).abs() < 1e-5);
    }

    #[test]
    fn test_cross_uses_half_size() {
        let cross = DebugCross::new(Vec3::ZERO, 4.0);
        assert_close(cross.transform().transform_point3(Vec3::X), Vec3::new(2.0, 0.0, 0.0));
    }

    #[test]
    fn test_builders() {
        let sphere = DebugSphere::new(Vec3::ZERO, 1.0)
            .with_options(DrawOptions::wireframe().with_ignore_depth(true))
            .with_color(colors::GREEN)
            .with_duration(2.0);
        assert_eq!(sphere.bucket(), Bucket::WireframeNoDepth);
        assert_eq!(sphere.options.duration, 2.0);

        let instance = sphere.instance(ShaderOutput::Color).unwrap();
        assert_eq!(instance.color, colors::GREEN);
        assert!(sphere.bucket_for(ShaderOutput::Index).is_none());

        let picked = sphere.with_picking_id(5);
        assert_eq!(picked.bucket_for(ShaderOutput::Index), Some(Bucket::WireframeNoDepth));
        assert_eq!(picked.instance(ShaderOutput::Index).unwrap().picking_id, 5);
    }
}
