//! End-to-end frame tests for the debug drawer.
//!
//! Producers queue primitives, the render thread flushes and draws them
//! against the recording [`DummyDevice`], then sweeps lifetimes.
//!
//! ```bash
//! cargo test -p redlilium-debug-drawer --test frame_flow
//! ```

#![cfg(feature = "dummy")]

use std::sync::Arc;

use glam::{Quat, UVec3, Vec2, Vec3};
use rstest::rstest;

use redlilium_debug_drawer::dummy::{DummyDevice, DummyResources};
use redlilium_debug_drawer::{
    colors, Bucket, DebugAabb, DebugArrow, DebugCircle, DebugCross, DebugDraw, DebugDrawRenderer,
    DebugDrawer, DebugDrawerConfig, DebugGrid, DebugLine, DebugOobb, DebugPoint, DebugRectangle,
    DebugSphere, DebugString, DebugTriangle, DrawOptions, Primitive, RendererConfig, ShaderOutput,
};

struct Frame {
    device: DummyDevice,
    renderer: DebugDrawRenderer,
}

impl Frame {
    fn new(config: RendererConfig) -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut device = DummyDevice::new();
        let renderer = DebugDrawRenderer::new(&mut device, &mut DummyResources::new(), config)
            .expect("renderer creation");
        Self { device, renderer }
    }
}

fn drawer(threads: usize, capacity: usize) -> DebugDrawer {
    DebugDrawer::new(
        DebugDrawerConfig::new()
            .with_thread_count(threads)
            .with_thread_buffer_capacity(capacity)
            .with_chunk_shift(3),
    )
}

// ============================================================================
// Classification
// ============================================================================

#[rstest]
#[case::wireframe_depth(true, false, Bucket::WireframeDepth)]
#[case::wireframe_no_depth(true, true, Bucket::WireframeNoDepth)]
#[case::solid_depth(false, false, Bucket::SolidDepth)]
#[case::solid_no_depth(false, true, Bucket::SolidNoDepth)]
fn test_every_option_pair_draws_in_its_bucket(
    #[case] wireframe: bool,
    #[case] ignore_depth: bool,
    #[case] bucket: Bucket,
) {
    let mut frame = Frame::new(RendererConfig::default());
    let drawer = drawer(1, 8);
    let options = DrawOptions::new()
        .with_wireframe(wireframe)
        .with_ignore_depth(ignore_depth);
    drawer.add(DebugSphere::new(Vec3::ZERO, 1.0).with_options(options));

    frame
        .renderer
        .render(&mut frame.device, &drawer, ShaderOutput::Color)
        .unwrap();
    let draws = frame.device.draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].state, bucket.render_state());
}

// ============================================================================
// Every primitive type reaches the device
// ============================================================================

#[rstest]
#[case::color(ShaderOutput::Color, 12)]
#[case::index(ShaderOutput::Index, 11)]
fn test_every_primitive_type_is_drawn(#[case] mode: ShaderOutput, #[case] expected_draws: usize) {
    let mut frame = Frame::new(RendererConfig::default());
    let drawer = drawer(1, 8);
    let allocator = Arc::clone(drawer.allocator());
    let picked = DrawOptions::new().with_picking_id(1);

    drawer.add(DebugLine::new(Vec3::ZERO, Vec3::X).with_options(picked));
    drawer.add(DebugSphere::new(Vec3::ZERO, 1.0).with_options(picked));
    drawer.add(DebugPoint::new(Vec3::ZERO, 0.1).with_options(picked));
    drawer.add(DebugRectangle::new(Vec3::ZERO, Vec2::ONE, Quat::IDENTITY).with_options(picked));
    drawer.add(DebugCross::new(Vec3::ZERO, 1.0).with_options(picked));
    drawer.add(DebugCircle::new(Vec3::ZERO, 1.0, Vec3::Y).with_options(picked));
    drawer.add(DebugArrow::new(Vec3::ZERO, Vec3::Z, 0.2).with_options(picked));
    drawer.add(DebugTriangle::new(Vec3::ZERO, Vec3::X, Vec3::Y).with_options(picked));
    drawer.add(DebugAabb::new(Vec3::ZERO, Vec3::ONE).with_options(picked));
    drawer.add(DebugOobb::new(Vec3::ZERO, Vec3::ONE, Quat::IDENTITY).with_options(picked));
    drawer.add(DebugString::new(Vec3::ZERO, "hi", 1.0, &allocator).with_options(picked));
    drawer.add(DebugGrid::new(Vec3::ZERO, Vec3::ONE, UVec3::ONE).with_options(picked));

    let stats = frame
        .renderer
        .render(&mut frame.device, &drawer, mode)
        .unwrap();
    assert_eq!(stats.draw_calls, expected_draws);
    assert_eq!(frame.device.draws().len(), expected_draws);
    assert!(frame
        .device
        .draws()
        .iter()
        .all(|draw| draw.instance_count > 0));
}

// ============================================================================
// Multi-threaded producers
// ============================================================================

#[rstest]
#[case::single_thread(1, 4)]
#[case::many_threads(8, 4)]
#[case::large_buffers(4, 1024)]
fn test_concurrent_frame(#[case] threads: usize, #[case] capacity: usize) {
    const PER_THREAD: usize = 250;
    let mut frame = Frame::new(RendererConfig::default());
    let drawer = &drawer(threads, capacity);

    std::thread::scope(|scope| {
        for thread in 0..threads {
            scope.spawn(move || {
                let ctx = drawer.thread(thread);
                for i in 0..PER_THREAD {
                    let x = (thread * PER_THREAD + i) as f32;
                    ctx.draw_cross(Vec3::new(x, 0.0, 0.0), 0.5, colors::YELLOW);
                }
            });
        }
    });

    let stats = frame
        .renderer
        .draw_all(&mut frame.device, drawer, ShaderOutput::Color, 1.0 / 60.0)
        .unwrap();
    assert_eq!(stats.instances, threads * PER_THREAD);
    assert_eq!(stats.expired, threads * PER_THREAD);
    assert!(drawer.is_empty());

    // Every producer's elements arrive exactly once.
    let mut xs: Vec<u32> = frame.device.draws()[0]
        .instances
        .iter()
        .map(|i| i.transform().transform_point3(Vec3::ZERO).x as u32)
        .collect();
    xs.sort_unstable();
    assert_eq!(xs, (0..(threads * PER_THREAD) as u32).collect::<Vec<_>>());
}

// ============================================================================
// Lifetimes
// ============================================================================

#[rstest]
#[case::single_frame(0.0, 1)]
#[case::two_frames(1.5, 2)]
#[case::five_frames(4.5, 5)]
fn test_primitive_lives_for_its_duration(#[case] duration: f32, #[case] frames: usize) {
    let mut frame = Frame::new(RendererConfig::default());
    let drawer = drawer(1, 8);
    drawer.add(DebugArrow::new(Vec3::ZERO, Vec3::Y, 0.1).with_duration(duration));

    let mut drawn = 0;
    for _ in 0..10 {
        let stats = frame
            .renderer
            .draw_all(&mut frame.device, &drawer, ShaderOutput::Color, 1.0)
            .unwrap();
        drawn += stats.instances;
    }
    assert_eq!(drawn, frames);
}

#[test]
fn test_text_memory_is_released() {
    let mut frame = Frame::new(RendererConfig::default());
    let drawer = drawer(2, 4);
    let allocator = Arc::clone(drawer.allocator());

    for thread in 0..2 {
        let ctx = drawer.thread(thread);
        for i in 0..10 {
            ctx.draw_text(Vec3::ZERO, &format!("label {i}"), 0.2, colors::WHITE);
        }
    }
    frame
        .renderer
        .draw_all(&mut frame.device, &drawer, ShaderOutput::Color, 1.0)
        .unwrap();

    // Only deck chunks remain.
    let stats = allocator.stats();
    let chunks = drawer.with_deck::<DebugString, _>(|deck| deck.chunk_count());
    assert_eq!(stats.live_allocations, chunks);
}

// ============================================================================
// Redirect
// ============================================================================

#[test]
fn test_redirected_frame_renders_in_target() {
    let mut frame = Frame::new(RendererConfig::default());
    let game = drawer(2, 4);
    let editor = Arc::new(drawer(2, 4));
    game.set_redirect_target(Some(Arc::clone(&editor)));

    game.draw_sphere(Vec3::ZERO, 1.0, colors::RED);
    let session = game.begin_redirect();
    game.thread(0).draw_sphere(Vec3::X, 1.0, colors::GREEN);
    game.draw_sphere(Vec3::Y, 1.0, colors::BLUE);
    game.end_redirect(session);

    let game_stats = frame
        .renderer
        .render(&mut frame.device, &game, ShaderOutput::Color)
        .unwrap();
    let editor_stats = frame
        .renderer
        .render(&mut frame.device, &editor, ShaderOutput::Color)
        .unwrap();
    assert_eq!(game_stats.instances, 1);
    assert_eq!(editor_stats.instances, 2);
}

// ============================================================================
// Residency grids
// ============================================================================

#[rstest]
#[case::lazy(false)]
#[case::extracted(true)]
fn test_resident_grid_cells(#[case] extract: bool) {
    let mut frame = Frame::new(RendererConfig::new().with_dynamic_batch_limit(16));
    let drawer = drawer(1, 8);
    let mut grid = DebugGrid::new(Vec3::ZERO, Vec3::ONE, UVec3::splat(8))
        .with_residency(|cell| (cell.x + cell.y + cell.z) % 2 == 0);
    if extract {
        grid.extract_resident_cells(drawer.allocator());
    }
    drawer.add(grid);

    let stats = frame
        .renderer
        .render(&mut frame.device, &drawer, ShaderOutput::Color)
        .unwrap();
    assert_eq!(stats.instances, 256);
    assert_eq!(stats.draw_calls, 16);
}
