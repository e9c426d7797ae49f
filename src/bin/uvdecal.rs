use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};

use uvdecal::{
    Customizer, CustomizerOpts, DecalTransform, InMemoryTextureSink, PngTextureSink, Rgb8,
    TextureSink, TransformPatch, Upload, decode_upload,
};

#[derive(Parser, Debug)]
#[command(name = "uvdecal", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the garment texture (fill color plus decals) at the template's size.
    Texture(TextureArgs),
    /// Render the editor preview (template plus decals and selection outline).
    Preview(PreviewArgs),
}

#[derive(Parser, Debug)]
struct SceneArgs {
    /// UV template image; its size is the texture size.
    #[arg(long)]
    template: PathBuf,

    /// Decal layer as `PATH[@x,y,scale,rotation]`, bottom first. Repeatable.
    #[arg(long = "layer")]
    layers: Vec<LayerSpec>,

    /// Garment fill color (`#rrggbb`); overrides the config's default fill.
    #[arg(long)]
    fill: Option<Rgb8>,

    /// Customizer options JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct TextureArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Parser, Debug)]
struct PreviewArgs {
    #[command(flatten)]
    scene: SceneArgs,

    /// Layer to select (0-based); defaults to the last layer.
    #[arg(long)]
    select: Option<usize>,

    /// Container width the preview is fitted into.
    #[arg(long)]
    width: u32,

    /// Container height the preview is fitted into.
    #[arg(long)]
    height: u32,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

#[derive(Clone, Debug)]
struct LayerSpec {
    path: PathBuf,
    transform: DecalTransform,
}

impl FromStr for LayerSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Only a four-field suffix is read as parameters, so `logo@2x.png` stays a path.
        let split = s
            .rsplit_once('@')
            .filter(|(_, params)| params.split(',').count() == 4);
        let Some((path, params)) = split else {
            return Ok(Self {
                path: PathBuf::from(s),
                transform: DecalTransform::default(),
            });
        };
        let nums = params
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| format!("invalid layer params '{params}': {e}"))?;
        let [x, y, scale, rotation] = nums.as_slice() else {
            return Err(format!(
                "layer params must be x,y,scale,rotation, got '{params}'"
            ));
        };
        Ok(Self {
            path: PathBuf::from(path),
            transform: DecalTransform::new(*x, *y, *scale, *rotation),
        })
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(tracing::Level::INFO)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Texture(args) => cmd_texture(args),
        Command::Preview(args) => cmd_preview(args),
    }
}

fn cmd_texture(args: TextureArgs) -> anyhow::Result<()> {
    let session = build_session(&args.scene)?;
    let update = session
        .sink()
        .latest()
        .cloned()
        .context("no texture was rendered")?;

    let mut sink = PngTextureSink::new(&args.out);
    sink.bind(update)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn cmd_preview(args: PreviewArgs) -> anyhow::Result<()> {
    let mut session = build_session(&args.scene)?;
    if let Some(index) = args.select {
        anyhow::ensure!(
            index < session.layers().len(),
            "--select {index} out of range ({} layers)",
            session.layers().len()
        );
        session.select(index)?;
    }
    session.resize_preview(f64::from(args.width), f64::from(args.height))?;
    let preview = session.last_preview().context("no preview was rendered")?;

    write_png(preview.to_rgba_image()?, &args.out)?;
    eprintln!("wrote {}", args.out.display());
    Ok(())
}

fn build_session(scene: &SceneArgs) -> anyhow::Result<Customizer<InMemoryTextureSink>> {
    let mut opts = match &scene.config {
        Some(path) => CustomizerOpts::from_path(path)?,
        None => CustomizerOpts::default(),
    };
    if let Some(fill) = scene.fill {
        opts.default_fill = fill;
    }

    let template = decode_upload(&Upload::from_path(&scene.template)?)
        .with_context(|| format!("load template '{}'", scene.template.display()))?;

    let mut session = Customizer::new(opts, InMemoryTextureSink::new());
    session.load_template(Arc::new(template))?;
    session.mark_model_ready()?;
    for layer in &scene.layers {
        let upload = Upload::from_path(&layer.path)?;
        session
            .upload(&upload)
            .with_context(|| format!("add layer '{}'", layer.path.display()))?;
        session.apply_patch(&TransformPatch::all(layer.transform))?;
    }
    Ok(session)
}

fn write_png(img: image::RgbaImage, out: &Path) -> anyhow::Result<()> {
    if let Some(parent) = out.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    img.save(out)
        .with_context(|| format!("write png '{}'", out.display()))
}
