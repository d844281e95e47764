use anyhow::{Context, Result};
use nabu_bridge::{FrameOutcome, GuestLayer, HostCtx, LayerConfig};
use nabu_engine::device::{HostGpu, HostInit};
use nabu_engine::logging::{LoggingConfig, init_logging};
use nabu_script::ScriptRuntime;

const FRAMES: u32 = 120;
const RESIZE_AT: u32 = 60;
const RESIZED: (u32, u32) = (1280, 720);

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    // Optional first argument: path to a guest script.
    let source = match std::env::args().nth(1) {
        Some(path) => {
            std::fs::read_to_string(&path).with_context(|| format!("reading script {path}"))?
        }
        None => include_str!("../scripts/pulse.js").to_string(),
    };

    let mut gpu = HostGpu::headless(HostInit::default())?;
    let runtime = ScriptRuntime::with_source(&source).context("loading guest script")?;
    let mut layer = GuestLayer::new(LayerConfig::default().with_label("pulse"), runtime);

    let mut composited = 0u32;
    let mut skipped = 0u32;

    for frame_index in 0..FRAMES {
        if frame_index == RESIZE_AT {
            gpu.resize(RESIZED.0, RESIZED.1);
        }

        let frame = gpu.begin_frame();
        let ctx = HostCtx::new(gpu.device(), gpu.queue(), gpu.surface_format(), gpu.size())
            .with_instance(gpu.instance())
            .with_adapter(gpu.adapter());

        match layer.tick(&ctx, &frame.view) {
            FrameOutcome::Composited => composited += 1,
            FrameOutcome::Skipped(reason) => {
                skipped += 1;
                log::debug!("frame {frame_index}: skipped ({reason:?})");
            }
            FrameOutcome::Inert | FrameOutcome::Disposed => {
                anyhow::bail!("layer stopped at frame {frame_index}: {:?}", layer.state())
            }
        }
        gpu.submit(frame);
    }

    let pixels = gpu.read_pixels()?;
    let (width, height) = gpu.size();
    let center = pixels
        .get((height / 2 * width + width / 2) as usize)
        .copied()
        .unwrap_or_default();

    let steps = layer.dispose();

    println!();
    println!("  nabu studio");
    println!("  surface     {width}x{height}");
    println!("  frames      {composited} composited, {skipped} skipped");
    println!("  center px   {center:?}");
    println!("  teardown    {steps:?}");
    println!();
    Ok(())
}
