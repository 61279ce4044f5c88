use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use inkcloud::adaptive::{self, LayoutConfig, LayoutStats, SizedWord};
use inkcloud::color::ColorScheme;
use inkcloud::export;
use inkcloud::mask::{self, BuiltinShape, LuminancePolarity, MaskImage, SelectionMode, ShapeSpec};
use inkcloud::place::Placement;
use inkcloud::raster::{FontdueRenderer, SpriteCache};
use inkcloud::wordlist;

#[derive(Parser, Debug)]
#[command(author, version, about = "Generate a word-cloud layout from a word list", long_about = None)]
struct Cli {
    /// Word list file: one `word` or `word,weight` entry per line
    #[arg(value_name = "WORDS_FILE")]
    words_file: Utf8PathBuf,

    /// TTF/OTF font file used for rasterization
    #[arg(long)]
    font: Utf8PathBuf,

    #[arg(long, default_value_t = 800)]
    width: u32,

    #[arg(long, default_value_t = 600)]
    height: u32,

    /// Built-in shape: circle, rounded-rect, star or heart. No mask when
    /// neither this nor --mask-image is given.
    #[arg(long)]
    shape: Option<String>,

    /// Shape inset from the canvas edge, in pixels
    #[arg(long, default_value_t = 8)]
    margin: u32,

    /// Positive erodes the allowed region, negative dilates it
    #[arg(long, default_value_t = 0)]
    shape_padding: i32,

    /// Image whose pixels define the allowed region
    #[arg(long)]
    mask_image: Option<Utf8PathBuf>,

    /// Image classification: alpha, dark or light
    #[arg(long, default_value = "alpha")]
    mask_mode: String,

    #[arg(long, default_value_t = 128)]
    mask_threshold: u8,

    #[arg(long, default_value_t = 14.0)]
    min_font: f32,

    #[arg(long, default_value_t = 96.0)]
    max_font: f32,

    /// Ink spacing between words, in pixels
    #[arg(long, default_value_t = 1)]
    word_padding: u32,

    /// Disable shrink-retry and coverage fill: one attempt per word
    #[arg(long)]
    no_adaptive: bool,

    /// Coverage target in [0, 1]; 0 disables the fill phase
    #[arg(long, default_value_t = 0.0)]
    target_coverage: f32,

    /// Size compression exponent in [0.3, 1.0]
    #[arg(long, default_value_t = 0.6)]
    nonlinear_power: f32,

    /// RNG seed for reproducible layouts; omitted means OS entropy
    #[arg(long)]
    seed: Option<u64>,

    /// Color scheme: ocean, sunset, forest or monochrome
    #[arg(long, default_value = "ocean")]
    colors: String,

    /// Emit sampled allowed-region points in the JSON output
    #[arg(long)]
    debug_mask: bool,

    /// Write placements and stats as JSON
    #[arg(long)]
    json: Option<Utf8PathBuf>,

    /// Write an SVG rendering
    #[arg(long)]
    svg: Option<Utf8PathBuf>,

    /// Write a PNG debug rendering of the exact collision-tested ink
    #[arg(long)]
    png: Option<Utf8PathBuf>,
}

#[derive(Serialize)]
struct JsonOutput<'a> {
    stats: LayoutStats,
    placements: &'a [Placement],
    #[serde(skip_serializing_if = "Option::is_none")]
    debug_points: Option<&'a [(u32, u32)]>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let input = std::fs::read_to_string(&cli.words_file)
        .with_context(|| format!("Read {}", cli.words_file))?;
    let words = wordlist::parse_word_list(&input);
    if words.is_empty() {
        println!("0/0 words placed (empty word list)");
        return Ok(());
    }

    let font_data =
        std::fs::read(&cli.font).with_context(|| format!("Read font {}", cli.font))?;
    let renderer = FontdueRenderer::from_bytes(&font_data)
        .with_context(|| format!("Load font {}", cli.font))?;

    let allowed = build_allowed_mask(&cli)?;

    let sizes = wordlist::base_sizes(&words, cli.min_font, cli.max_font);
    let sized: Vec<SizedWord> = words
        .iter()
        .zip(sizes)
        .map(|(w, base_size)| SizedWord {
            text: w.text.clone(),
            weight: w.weight,
            base_size,
        })
        .collect();

    let mut config = LayoutConfig::new(cli.width, cli.height);
    config.word_padding = cli.word_padding;
    config.adaptive_enabled = !cli.no_adaptive;
    config.target_coverage = cli.target_coverage;
    config.nonlinear_power = cli.nonlinear_power.clamp(0.3, 1.0);
    config.scheme = ColorScheme::from_name(&cli.colors);
    config.debug_mask = cli.debug_mask;

    let mut cache = SpriteCache::default();
    let mut rng = match cli.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_os_rng(),
    };

    let result = adaptive::generate_layout(
        &sized,
        &renderer,
        &mut cache,
        &mut rng,
        allowed.as_ref(),
        &config,
    )?;

    println!(
        "{}/{} words placed, coverage {:.1}%",
        result.stats.placed_count,
        result.stats.total_count,
        result.stats.coverage_ratio * 100.0
    );

    if let Some(path) = &cli.json {
        let out = JsonOutput {
            stats: result.stats,
            placements: &result.placements,
            debug_points: result.debug_points.as_deref(),
        };
        std::fs::write(path, serde_json::to_string_pretty(&out)?)
            .with_context(|| format!("Write {}", path))?;
    }
    if let Some(path) = &cli.svg {
        let svg = export::to_svg(
            &result.placements,
            cli.width,
            cli.height,
            Some("#ffffff"),
            "sans-serif",
        );
        std::fs::write(path, svg).with_context(|| format!("Write {}", path))?;
    }
    if let Some(path) = &cli.png {
        export::to_png(&result.placements, cli.width, cli.height)
            .save(path.as_std_path())
            .with_context(|| format!("Write {}", path))?;
    }
    Ok(())
}

/// Build the allowed mask from the CLI flags: an image takes precedence over
/// a built-in shape; neither means the whole canvas is allowed.
fn build_allowed_mask(cli: &Cli) -> Result<Option<inkcloud::grid::Grid>> {
    if let Some(path) = &cli.mask_image {
        let img = image::open(path.as_std_path())
            .with_context(|| format!("Decode mask image {}", path))?
            .to_rgba8();
        let (w, h) = img.dimensions();
        let mask_image = MaskImage::new(w, h, img.into_raw())?;
        let mode = match cli.mask_mode.to_ascii_lowercase().as_str() {
            "dark" => SelectionMode::Luminance {
                threshold: cli.mask_threshold,
                polarity: LuminancePolarity::DarkInside,
            },
            "light" => SelectionMode::Luminance {
                threshold: cli.mask_threshold,
                polarity: LuminancePolarity::LightInside,
            },
            _ => SelectionMode::Alpha {
                threshold: cli.mask_threshold,
            },
        };
        let spec = ShapeSpec::Image {
            image: mask_image,
            mode,
            shape_padding: cli.shape_padding,
        };
        return Ok(Some(mask::build_mask(cli.width, cli.height, &spec)));
    }
    if let Some(name) = &cli.shape {
        let spec = ShapeSpec::Builtin {
            shape: BuiltinShape::from_name(name),
            margin: cli.margin,
            shape_padding: cli.shape_padding,
        };
        return Ok(Some(mask::build_mask(cli.width, cli.height, &spec)));
    }
    Ok(None)
}
