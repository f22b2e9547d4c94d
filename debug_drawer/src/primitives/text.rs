use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};

use super::impl_primitive;
use crate::allocator::{AllocationToken, DrawAllocator};
use crate::options::DrawOptions;
use crate::output::{Output, ShaderOutput};
use crate::vertex::InstanceData;

/// Longest text a [`DebugString`] accepts, in characters.
pub const MAX_TEXT_LENGTH: usize = 10_000;

/// Horizontal advance per glyph, relative to the glyph size.
const GLYPH_ADVANCE: f32 = 0.6;
/// Vertical advance per line, relative to the glyph size.
const LINE_HEIGHT: f32 = 1.2;

/// Heap text owned by a string primitive, tracked by the [`DrawAllocator`].
#[derive(Clone)]
pub struct TrackedText {
    text: Box<str>,
    _token: AllocationToken,
}

impl TrackedText {
    /// Copy `text` into a new tracked allocation.
    ///
    /// # Panics
    ///
    /// Panics if `text` is longer than [`MAX_TEXT_LENGTH`] characters.
    pub fn new(text: &str, allocator: &Arc<DrawAllocator>) -> Self {
        let length = text.chars().count();
        assert!(
            length <= MAX_TEXT_LENGTH,
            "debug text of {length} characters exceeds the {MAX_TEXT_LENGTH} character limit"
        );
        Self {
            text: text.into(),
            _token: allocator.track(text.len()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

impl std::fmt::Debug for TrackedText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.text, f)
    }
}

/// World-space text, drawn one glyph instance per visible character.
#[derive(Debug, Clone)]
pub struct DebugString {
    /// Position of the first glyph's origin.
    pub position: Vec3,
    /// Glyph height in world units.
    pub size: f32,
    pub text: TrackedText,
    pub output: Output,
    pub options: DrawOptions,
}

impl DebugString {
    /// # Panics
    ///
    /// Panics if `text` is longer than [`MAX_TEXT_LENGTH`] characters.
    pub fn new(position: Vec3, text: &str, size: f32, allocator: &Arc<DrawAllocator>) -> Self {
        Self {
            position,
            size,
            text: TrackedText::new(text, allocator),
            output: Output::default(),
            options: DrawOptions::new().with_ignore_depth(true),
        }
    }

    /// Number of glyph instances this string draws.
    pub fn glyph_count(&self) -> usize {
        self.text
            .as_str()
            .chars()
            .filter(|c| !c.is_whitespace())
            .count()
    }

    /// Lay the text out left to right, top to bottom, yielding one color
    /// instance per visible glyph.
    pub fn glyph_instances(&self) -> impl Iterator<Item = InstanceData> + '_ {
        let mut column = 0u32;
        let mut line = 0u32;
        self.text.as_str().chars().filter_map(move |c| {
            if c == '\n' {
                line += 1;
                column = 0;
                return None;
            }
            let offset = Vec3::new(
                column as f32 * GLYPH_ADVANCE,
                -(line as f32) * LINE_HEIGHT,
                0.0,
            ) * self.size;
            column += 1;
            if c.is_whitespace() {
                return None;
            }
            let transform = Mat4::from_scale_rotation_translation(
                Vec3::splat(self.size),
                Quat::IDENTITY,
                self.position + offset,
            );
            InstanceData::new(transform, &self.output, &self.options, ShaderOutput::Color)
                .map(|instance| instance.with_glyph(c as u32))
        })
    }
}

impl_primitive!(DebugString, String, strings);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_is_tracked() {
        let allocator = DrawAllocator::new();
        let text = DebugString::new(Vec3::ZERO, "hello", 1.0, &allocator);
        assert_eq!(allocator.stats().live_bytes, 5);

        let copy = text.clone();
        assert_eq!(allocator.stats().live_allocations, 2);

        drop(text);
        drop(copy);
        assert_eq!(allocator.stats().live_allocations, 0);
    }

    #[test]
    fn test_glyph_layout() {
        let allocator = DrawAllocator::new();
        let text = DebugString::new(Vec3::ZERO, "ab c\nd", 2.0, &allocator);
        assert_eq!(text.glyph_count(), 4);

        let glyphs: Vec<_> = text.glyph_instances().collect();
        assert_eq!(glyphs.len(), 4);
        assert_eq!(glyphs[0].glyph, 'a' as u32);
        assert_eq!(glyphs[2].glyph, 'c' as u32);

        let origin = |g: &InstanceData| g.transform().transform_point3(Vec3::ZERO);
        assert!(origin(&glyphs[1]).abs_diff_eq(Vec3::new(1.2, 0.0, 0.0), 1e-5));
        assert!(origin(&glyphs[2]).abs_diff_eq(Vec3::new(3.6, 0.0, 0.0), 1e-5));
        assert!(origin(&glyphs[3]).abs_diff_eq(Vec3::new(0.0, -2.4, 0.0), 1e-5));
    }

    #[test]
    fn test_max_length_accepted() {
        let allocator = DrawAllocator::new();
        let text = "x".repeat(MAX_TEXT_LENGTH);
        let string = DebugString::new(Vec3::ZERO, &text, 1.0, &allocator);
        assert_eq!(string.glyph_count(), MAX_TEXT_LENGTH);
    }

    #[test]
    #[should_panic(expected = "character limit")]
    fn test_oversized_text_panics() {
        let allocator = DrawAllocator::new();
        let text = "x".repeat(MAX_TEXT_LENGTH + 1);
        let _ = DebugString::new(Vec3::ZERO, &text, 1.0, &allocator);
    }
}
