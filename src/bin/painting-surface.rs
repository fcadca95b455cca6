use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use painting_surface::{
    AlphaType, BackendContext, BezPath, Bitmap, BitmapFormat, ContextSettings, Image, IntSize,
    Origin, PlatformSurfaceHandle, Point, Rect, Rgba8Premul, SoftwareContext, Surface, Vec2,
};

#[derive(Parser, Debug)]
#[command(name = "painting-surface", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a test pattern through a backend and write it as a PNG.
    Frame(FrameArgs),
    /// Print the resolved context settings and the backend they select.
    Probe(ProbeArgs),
}

#[derive(Parser, Debug)]
struct FrameArgs {
    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Surface width in pixels.
    #[arg(long, default_value_t = 256)]
    width: u32,

    /// Surface height in pixels.
    #[arg(long, default_value_t = 256)]
    height: u32,

    /// Backend to use; overrides the settings file and `PAINTING_SURFACE_BACKEND`.
    #[arg(long, value_enum)]
    backend: Option<BackendArg>,

    /// Context settings JSON.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Render into a shared texture imported by handle instead of a context-allocated target.
    #[arg(long)]
    import: bool,

    /// Row origin of the imported texture.
    #[arg(long, value_enum, default_value_t = OriginArg::TopLeft)]
    origin: OriginArg,
}

#[derive(Parser, Debug)]
struct ProbeArgs {
    /// Backend to use; overrides the settings file and `PAINTING_SURFACE_BACKEND`.
    #[arg(long, value_enum)]
    backend: Option<BackendArg>,

    /// Context settings JSON.
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendArg {
    Cpu,
    Software,
    Gpu,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OriginArg {
    TopLeft,
    BottomLeft,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Frame(args) => cmd_frame(args),
        Command::Probe(args) => cmd_probe(args),
    }
}

fn resolve_settings(
    path: Option<&PathBuf>,
    backend: Option<BackendArg>,
) -> anyhow::Result<ContextSettings> {
    let mut settings = match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("read settings '{}'", path.display()))?;
            ContextSettings::from_json(&json)?
        }
        None => ContextSettings::default(),
    }
    .with_env_overrides()?;

    if let Some(backend) = backend {
        settings.backend = match backend {
            BackendArg::Cpu => painting_surface::BackendChoice::Cpu,
            BackendArg::Software => painting_surface::BackendChoice::Software,
            BackendArg::Gpu => painting_surface::BackendChoice::Gpu,
        };
    }
    Ok(settings)
}

fn cmd_probe(args: ProbeArgs) -> anyhow::Result<()> {
    let settings = resolve_settings(args.settings.as_ref(), args.backend)?;
    println!("{}", serde_json::to_string_pretty(&settings)?);
    match painting_surface::create_context(&settings)? {
        Some(ctx) => println!("context: {}", ctx.name()),
        None => println!("context: none (cpu bitmap)"),
    }
    Ok(())
}

fn cmd_frame(args: FrameArgs) -> anyhow::Result<()> {
    let settings = resolve_settings(args.settings.as_ref(), args.backend)?;
    let size = IntSize::new(args.width, args.height);

    let mut surface = if args.import {
        let origin = match args.origin {
            OriginArg::TopLeft => Origin::TopLeft,
            OriginArg::BottomLeft => Origin::BottomLeft,
        };
        let (context, handle) = shared_texture(&settings, size)?;
        Surface::create_from_platform_handle(handle, context, origin)?
    } else {
        let context = painting_surface::create_context(&settings)?;
        Surface::create_with_size(
            context,
            size,
            BitmapFormat::Bgra8888,
            AlphaType::Premultiplied,
        )?
    };
    surface.set_on_flush(|| tracing::info!("frame presented"));

    surface.notify_content_will_change();
    paint_test_pattern(&mut surface)?;
    surface.flush();

    let out = Bitmap::new(BitmapFormat::Rgba8888, AlphaType::Unpremultiplied, size)?;
    surface.read_into_bitmap(&out)?;

    if let Some(parent) = args.out.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    image::save_buffer_with_format(
        &args.out,
        &out.pixels(),
        size.width,
        size.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!(
        "wrote {} ({:?} surface, {})",
        args.out.display(),
        surface.backend_kind(),
        surface.context().map_or("no context", |c| c.name())
    );
    Ok(())
}

/// Allocate a shareable texture on the selected context and return its handle.
fn shared_texture(
    settings: &ContextSettings,
    size: IntSize,
) -> anyhow::Result<(Arc<dyn BackendContext>, PlatformSurfaceHandle)> {
    match settings.backend {
        painting_surface::BackendChoice::Cpu => {
            anyhow::bail!("--import needs a context; use --backend software or gpu")
        }
        painting_surface::BackendChoice::Software => {
            let ctx = Arc::new(SoftwareContext::new());
            let (handle, _pixels) = ctx.create_shared_texture(size)?;
            Ok((ctx as Arc<dyn BackendContext>, handle))
        }
        #[cfg(feature = "gpu")]
        painting_surface::BackendChoice::Gpu => {
            let ctx = Arc::new(painting_surface::WgpuContext::new(settings)?);
            let handle = ctx.create_shared_texture(size)?;
            Ok((ctx as Arc<dyn BackendContext>, handle))
        }
        #[cfg(not(feature = "gpu"))]
        painting_surface::BackendChoice::Gpu => {
            anyhow::bail!("the gpu backend needs the `gpu` feature")
        }
    }
}

fn paint_test_pattern(surface: &mut Surface) -> anyhow::Result<()> {
    let size = surface.size();
    let (w, h) = (f64::from(size.width), f64::from(size.height));
    let badge = gradient_badge(IntSize::new(32, 32))?;

    let mut circle = BezPath::new();
    let r = w.min(h) * 0.25;
    let (cx, cy) = (w * 0.5, h * 0.5);
    circle.move_to((cx + r, cy));
    for i in 1..=64 {
        let t = f64::from(i) / 64.0 * std::f64::consts::TAU;
        circle.line_to((cx + r * t.cos(), cy + r * t.sin()));
    }
    circle.close_path();

    let mut diagonal = BezPath::new();
    diagonal.move_to((0.0, 0.0));
    diagonal.line_to((w, h));

    let mut canvas = surface.canvas();
    canvas
        .clear(Rgba8Premul::from_straight_rgba(18, 20, 28, 255))
        .fill_rect(
            Rect::new(0.0, 0.0, w * 0.5, h * 0.125),
            Rgba8Premul::from_straight_rgba(230, 60, 60, 255),
        )
        .fill_path(&circle, Rgba8Premul::from_straight_rgba(60, 160, 230, 200))
        .stroke_path(&diagonal, 3.0, Rgba8Premul::from_straight_rgba(250, 250, 250, 255))
        .save()
        .translate(Vec2::new(w - 40.0, h - 40.0))
        .draw_image(&badge, Point::ORIGIN, 0.8)
        .restore();
    canvas.finish()?;
    Ok(())
}

fn gradient_badge(size: IntSize) -> anyhow::Result<Image> {
    let mut data = Vec::with_capacity(size.area() * 4);
    for y in 0..size.height {
        for x in 0..size.width {
            let r = (x * 255 / size.width.max(1)) as u8;
            let g = (y * 255 / size.height.max(1)) as u8;
            data.extend_from_slice(&Rgba8Premul::from_straight_rgba(r, g, 200, 255).to_array());
        }
    }
    Ok(Image::from_rgba8_premul(size, data)?)
}
