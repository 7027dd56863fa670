use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;

use vellum_engine::backend::DEFAULT_FRAME_RING_SIZE;
use vellum_engine::coords::{Alignment, Fit, Mat2D, Rect, Size, Vec2};
use vellum_engine::core::BridgeConfig;
use vellum_engine::headless::{HeadlessHost, ShapeArtboard};
use vellum_engine::host::GraphicsApi;
use vellum_engine::logging::{init_logging, LoggingConfig};
use vellum_engine::paint::{Color, LinearGradient, Paint};
use vellum_engine::registry::Drawable;
use vellum_engine::scene::{Canvas, CanvasNode, MultiInstance, Player};
use vellum_engine::time::FrameClock;
use vellum_engine::vector::Path;

/// Renders a demo scene through the bridge on a software host and writes the
/// last frame to a PNG.
#[derive(Debug, Parser)]
#[command(name = "vellum-studio", version)]
struct Args {
    /// Graphics API the host reports: vulkan, d3d12, metal or opengl.
    #[arg(long, default_value = "vulkan", value_parser = parse_api)]
    api: GraphicsApi,

    #[arg(long, default_value_t = 512)]
    width: u32,

    #[arg(long, default_value_t = 512)]
    height: u32,

    /// Frames to render before writing the output.
    #[arg(long, default_value_t = 60)]
    frames: u32,

    /// Simulated frame rate driving animation time.
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Frames recorded ahead of GPU completion.
    #[arg(long, default_value_t = DEFAULT_FRAME_RING_SIZE)]
    ring_size: usize,

    #[arg(short, long, default_value = "vellum.png")]
    output: PathBuf,

    /// Raise log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_api(name: &str) -> Result<GraphicsApi, String> {
    let name = name.to_ascii_lowercase();
    let name = if name == "opengl" { "opengl3" } else { name.as_str() };
    GraphicsApi::from_driver_name(name).ok_or_else(|| format!("unknown graphics api `{name}`"))
}

fn badge(color: u32) -> ShapeArtboard {
    ShapeArtboard::new(Rect::new(0.0, 0.0, 64.0, 64.0))
        .with_shape(Path::rect(Rect::new(8.0, 8.0, 48.0, 48.0)), Paint::argb(color))
        .with_spin(std::f32::consts::FRAC_PI_2)
}

fn demo_canvas(size: Vec2) -> Canvas {
    let canvas = Canvas::new(size);

    let backdrop = ShapeArtboard::new(Rect::new(0.0, 0.0, 100.0, 100.0))
        .with_shape(
            Path::rect(Rect::new(0.0, 0.0, 100.0, 100.0)),
            Paint::LinearGradient(LinearGradient::between(
                Vec2::new(0.0, 0.0),
                Vec2::new(0.0, 100.0),
                Color::from_srgb_u8(24, 28, 48, 255),
                Color::from_srgb_u8(64, 96, 160, 255),
            )),
        )
        .with_shape(Path::ellipse(Rect::new(25.0, 25.0, 50.0, 50.0)), Paint::argb(0xFFF2_C14E));
    let player = Player::new(backdrop, size).with_fit(Fit::Fill);
    canvas.add(Arc::new(player));

    let framed = Player::new(badge(0xFFE0_5A47), Vec2::new(size.x / 3.0, size.y / 3.0))
        .with_fit(Fit::Contain)
        .with_alignment(Alignment::CENTER);
    canvas.add(Arc::new(framed));

    let row = (0..4)
        .map(|i| Mat2D::from_translate(16.0 + i as f32 * 80.0, size.y - 96.0))
        .collect();
    let badges: Arc<dyn CanvasNode> = Arc::new(MultiInstance::new(badge(0xFF4E_C2F2), row));
    canvas.add(badges);

    canvas
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(LoggingConfig::from_verbosity(args.verbose));

    let size = Size::new(
        i32::try_from(args.width).context("width out of range")?,
        i32::try_from(args.height).context("height out of range")?,
    );

    let host = HeadlessHost::new(args.api);
    let mut bridge = host.bridge(BridgeConfig::default().with_frame_ring_size(args.ring_size));
    if !bridge.initialize() {
        bail!("no {} backend could be initialized", args.api);
    }

    let mut target = bridge.new_texture_target();
    if !target.resize(size) {
        bail!("failed to allocate a {}x{} render target", args.width, args.height);
    }

    let canvas = Arc::new(demo_canvas(Vec2::new(args.width as f32, args.height as f32)));
    let drawable: Arc<dyn Drawable> = canvas.clone();
    let _registration = bridge.registry().register(&drawable);

    let mut clock = FrameClock::fixed_rate(args.fps);
    let mut rendered = 0u32;
    for _ in 0..args.frames {
        let time = clock.tick();
        canvas.advance(time.dt);
        if bridge
            .render_registered(target.texture_rid(), args.width, args.height)
            .is_rendered()
        {
            rendered += 1;
        }
    }
    log::info!("rendered {rendered}/{} frames on {}", args.frames, args.api);

    let frame = bridge
        .host()
        .texture_get_image(target.texture_rid())
        .context("render target has no readable content")?;
    image::save_buffer(&args.output, &frame.data, frame.width, frame.height, image::ExtendedColorType::Rgba8)
        .with_context(|| format!("failed to write {}", args.output.display()))?;
    log::info!("wrote {}", args.output.display());

    let errors = host.gpu().validation_errors();
    if !errors.is_empty() {
        for e in &errors {
            log::warn!("gpu validation: {e}");
        }
        bail!("{} gpu validation errors", errors.len());
    }
    Ok(())
}
