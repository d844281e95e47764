mod common;

use std::cell::Cell;
use std::rc::Rc;

use nabu_bridge::{FrameOutcome, GuestLayer, LayerConfig, LayerState, SkipReason};
use nabu_script::ScriptRuntime;
use nabu_script::rquickjs::Function;

const FILL_SCRIPT: &str = r#"
var frames = 0;
function render_frame() {
    frames += 1;
    return gpu.clear(gpu.view(), 0.2, 0.4, 0.8, 1.0);
}
"#;

#[test]
fn script_fill_reaches_the_surface() -> anyhow::Result<()> {
    let _lock = common::lock_gpu();
    let Some(gpu) = common::gpu("script_fill_reaches_the_surface", 128, 96) else {
        return Ok(());
    };
    let runtime = ScriptRuntime::with_source(FILL_SCRIPT)?;
    let mut layer = GuestLayer::new(LayerConfig::default().with_label("script"), runtime);

    common::tick(&mut layer, &gpu);
    common::tick(&mut layer, &gpu);
    assert_eq!(common::tick(&mut layer, &gpu), FrameOutcome::Composited);
    assert_eq!(layer.state(), LayerState::Live);

    common::assert_all_near(&gpu.read_pixels()?, [51, 102, 204, 255]);
    Ok(())
}

#[test]
fn script_sees_target_size_and_handles() -> anyhow::Result<()> {
    let _lock = common::lock_gpu();
    let Some(gpu) = common::gpu("script_sees_target_size_and_handles", 40, 30) else {
        return Ok(());
    };
    let runtime = ScriptRuntime::with_source(
        r#"
        function render_frame() {
            const [w, h] = gpu.size();
            if (w !== 40 || h !== 30) throw new Error(`size ${w}x${h}`);
            if (!gpu.device() || !gpu.queue() || !gpu.texture() || !gpu.view()) {
                throw new Error("missing handle");
            }
            return gpu.clear(gpu.view(), 0, 0, 0, 1);
        }
        "#,
    )?;
    let mut layer = GuestLayer::new(LayerConfig::default(), runtime);

    let outcomes: Vec<_> = (0..3).map(|_| common::tick(&mut layer, &gpu)).collect();
    assert_eq!(outcomes[2], FrameOutcome::Composited);
    Ok(())
}

#[test]
fn script_exception_is_retried() {
    let _lock = common::lock_gpu();
    let Some(gpu) = common::gpu("script_exception_is_retried", 32, 32) else {
        return;
    };
    let runtime = ScriptRuntime::with_source(
        r#"
        var calls = 0;
        function render_frame() {
            calls += 1;
            if (calls === 2) throw new Error("flaky");
            return gpu.clear(gpu.view(), 1, 1, 1, 1);
        }
        "#,
    )
    .expect("script loads");
    let mut layer = GuestLayer::new(LayerConfig::default(), runtime);

    for _ in 0..3 {
        common::tick(&mut layer, &gpu);
    }
    assert_eq!(
        common::tick(&mut layer, &gpu),
        FrameOutcome::Skipped(SkipReason::GuestFailed)
    );
    assert_eq!(layer.state(), LayerState::Live);
    assert_eq!(common::tick(&mut layer, &gpu), FrameOutcome::Composited);
}

#[test]
fn stale_view_handle_fails_the_frame() {
    let _lock = common::lock_gpu();
    let Some(mut gpu) = common::gpu("stale_view_handle_fails_the_frame", 64, 64) else {
        return;
    };
    // Caches the view handle from the first frame and never refreshes it.
    let runtime = ScriptRuntime::with_source(
        r#"
        var cached = 0;
        function render_frame() {
            if (!cached) cached = gpu.view();
            return gpu.clear(cached, 0, 1, 0, 1);
        }
        "#,
    )
    .expect("script loads");
    let mut layer = GuestLayer::new(LayerConfig::default(), runtime);
    for _ in 0..3 {
        common::tick(&mut layer, &gpu);
    }

    gpu.resize(128, 128);
    assert_eq!(
        common::tick(&mut layer, &gpu),
        FrameOutcome::Skipped(SkipReason::Resized)
    );
    // Rebinding succeeds, but the cached number names the destroyed view.
    assert_eq!(
        common::tick(&mut layer, &gpu),
        FrameOutcome::Skipped(SkipReason::GuestFailed)
    );
}

#[test]
fn dispose_runs_script_cleanup() -> anyhow::Result<()> {
    let _lock = common::lock_gpu();
    let Some(gpu) = common::gpu("dispose_runs_script_cleanup", 32, 32) else {
        return Ok(());
    };
    let runtime = ScriptRuntime::with_source(
        r#"
        function render_frame() { return gpu.clear(gpu.view(), 0, 0, 1, 1); }
        function cleanup() {
            globalThis.render_frame = undefined;
            report_cleanup(gpu.ready());
        }
        "#,
    )?;

    // `Some(ready)` once the script's cleanup ran, with the handle state it saw.
    let cleanup_saw = Rc::new(Cell::new(None));
    let report = cleanup_saw.clone();
    runtime.context().with(|ctx| {
        ctx.globals().set(
            "report_cleanup",
            Function::new(ctx.clone(), move |ready: bool| report.set(Some(ready)))?,
        )
    })?;

    let mut layer = GuestLayer::new(LayerConfig::default(), runtime);
    for _ in 0..3 {
        common::tick(&mut layer, &gpu);
    }
    assert_eq!(cleanup_saw.get(), None);

    let steps = layer.dispose();
    assert_eq!(steps.len(), 7);
    // Guest references are released before the handles are revoked.
    assert_eq!(cleanup_saw.get(), Some(true));
    assert_eq!(common::tick(&mut layer, &gpu), FrameOutcome::Disposed);
    Ok(())
}
