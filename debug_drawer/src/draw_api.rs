use std::sync::Arc;

use glam::{Quat, UVec3, Vec2, Vec3};

use crate::allocator::DrawAllocator;
use crate::drawer::{DebugDrawer, ThreadContext};
use crate::output::{colors, Color};
use crate::primitives::{
    DebugAabb, DebugArrow, DebugCircle, DebugCross, DebugGrid, DebugLine, DebugOobb, DebugPoint,
    DebugRectangle, DebugSphere, DebugString, DebugTriangle, Primitive,
};

/// Shape-level drawing helpers.
///
/// Implemented by [`DebugDrawer`] (queues directly) and [`ThreadContext`]
/// (stages in the producer thread's buffers). Every helper uses the shape's
/// default options; build the primitive and [`submit`](Self::submit) it to
/// set wireframe, depth, duration or picking.
pub trait DebugDraw {
    /// Queue an arbitrary primitive.
    fn submit<P: Primitive>(&self, primitive: P);

    /// Allocator that tracks text and cell storage of submitted primitives.
    fn allocator(&self) -> &Arc<DrawAllocator>;

    /// Draw a single line segment.
    fn draw_line(&self, start: Vec3, end: Vec3, color: Color) {
        self.submit(DebugLine::new(start, end).with_color(color));
    }

    fn draw_point(&self, position: Vec3, size: f32, color: Color) {
        self.submit(DebugPoint::new(position, size).with_color(color));
    }

    fn draw_sphere(&self, center: Vec3, radius: f32, color: Color) {
        self.submit(DebugSphere::new(center, radius).with_color(color));
    }

    fn draw_rectangle(&self, center: Vec3, half_extents: Vec2, rotation: Quat, color: Color) {
        self.submit(DebugRectangle::new(center, half_extents, rotation).with_color(color));
    }

    /// Draw a cross marker at a point.
    fn draw_cross(&self, center: Vec3, size: f32, color: Color) {
        self.submit(DebugCross::new(center, size).with_color(color));
    }

    /// Draw a circle in the plane with the given normal.
    fn draw_circle(&self, center: Vec3, radius: f32, normal: Vec3, color: Color) {
        self.submit(DebugCircle::new(center, radius, normal).with_color(color));
    }

    fn draw_arrow(&self, from: Vec3, to: Vec3, head_size: f32, color: Color) {
        self.submit(DebugArrow::new(from, to, head_size).with_color(color));
    }

    fn draw_triangle(&self, a: Vec3, b: Vec3, c: Vec3, color: Color) {
        self.submit(DebugTriangle::new(a, b, c).with_color(color));
    }

    /// Draw an axis-aligned bounding box from min to max corners.
    fn draw_aabb(&self, min: Vec3, max: Vec3, color: Color) {
        self.submit(DebugAabb::new(min, max).with_color(color));
    }

    /// Draw an oriented box given center, half-extents and rotation.
    fn draw_box(&self, center: Vec3, half_extents: Vec3, rotation: Quat, color: Color) {
        self.submit(DebugOobb::new(center, half_extents, rotation).with_color(color));
    }

    /// Draw world-space text.
    ///
    /// # Panics
    ///
    /// Panics if `text` is longer than
    /// [`MAX_TEXT_LENGTH`](crate::MAX_TEXT_LENGTH) characters.
    fn draw_text(&self, position: Vec3, text: &str, size: f32, color: Color) {
        let string = DebugString::new(position, text, size, self.allocator());
        self.submit(string.with_color(color));
    }

    /// Draw every cell of a `dims` grid.
    fn draw_grid(&self, origin: Vec3, cell_size: Vec3, dims: UVec3, color: Color) {
        self.submit(DebugGrid::new(origin, cell_size, dims).with_color(color));
    }

    /// Draw a ray from origin in a direction with a given length.
    fn draw_ray(&self, origin: Vec3, direction: Vec3, length: f32, color: Color) {
        self.draw_line(origin, origin + direction * length, color);
    }

    /// Draw coordinate axes gizmo (R=X, G=Y, B=Z).
    fn draw_axes(&self, center: Vec3, size: f32) {
        self.draw_ray(center, Vec3::X, size, colors::RED);
        self.draw_ray(center, Vec3::Y, size, colors::GREEN);
        self.draw_ray(center, Vec3::Z, size, colors::BLUE);
    }

    /// Draw a wireframe frustum from 8 corners.
    ///
    /// Corner order: near plane `[TL, TR, BR, BL]`, far plane `[TL, TR, BR, BL]`.
    fn draw_frustum(&self, corners: &[Vec3; 8], color: Color) {
        for i in 0..4 {
            let next = (i + 1) % 4;
            // Near face, far face, connecting edge
            self.draw_line(corners[i], corners[next], color);
            self.draw_line(corners[i + 4], corners[next + 4], color);
            self.draw_line(corners[i], corners[i + 4], color);
        }
    }
}

impl DebugDraw for DebugDrawer {
    fn submit<P: Primitive>(&self, primitive: P) {
        self.add(primitive);
    }

    fn allocator(&self) -> &Arc<DrawAllocator> {
        DebugDrawer::allocator(self)
    }
}

impl DebugDraw for ThreadContext<'_> {
    fn submit<P: Primitive>(&self, primitive: P) {
        self.add(primitive);
    }

    fn allocator(&self) -> &Arc<DrawAllocator> {
        self.drawer().allocator()
    }
}
