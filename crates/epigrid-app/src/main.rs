use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use epigrid_app::{FrameRange, ParamOverrides, SeriesFile, load_config, replay};
use epigrid_core::{Fractions, LayoutConfig, LayoutMode};
use epigrid_render::render_png_offscreen;
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "epigrid",
    version,
    about = "Render epidemic compartment series as pseudo-spatial grids"
)]
struct Cli {
    /// JSON layout configuration (grid size, palette, hybrid tuning).
    #[arg(long, env = "EPIGRID_CONFIG")]
    config: Option<PathBuf>,

    /// Grid side length in cells; overrides the config file.
    #[arg(long, env = "EPIGRID_GRID_SIZE")]
    grid_size: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Clone, Default)]
struct LayoutArgs {
    /// Seed string; overrides the seed bundled in the series file.
    #[arg(long)]
    seed: Option<String>,
    /// Layout mode: wave, proportional, cluster or hybrid.
    #[arg(long)]
    mode: Option<LayoutMode>,
    /// Hybrid gate distance in [0, 1].
    #[arg(long)]
    d0: Option<f64>,
    /// Hybrid blend sharpness (>= 1).
    #[arg(long)]
    p: Option<f64>,
    /// Hybrid noise blur passes.
    #[arg(long)]
    blur_passes: Option<u32>,
}

impl From<LayoutArgs> for ParamOverrides {
    fn from(args: LayoutArgs) -> Self {
        Self {
            seed: args.seed,
            mode: args.mode,
            d0: args.d0,
            p: args.p,
            blur_passes: args.blur_passes,
        }
    }
}

#[derive(Args, Debug, Clone)]
struct RangeArgs {
    /// First series index to replay.
    #[arg(long, default_value_t = 0)]
    start: usize,
    /// Exclusive end index; defaults to the series length.
    #[arg(long)]
    end: Option<usize>,
    /// Replay every Nth index.
    #[arg(long, default_value_t = 1)]
    every: usize,
}

impl From<RangeArgs> for FrameRange {
    fn from(args: RangeArgs) -> Self {
        Self {
            start: args.start,
            end: args.end,
            every: args.every,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a series file into PNG frames and a frame log.
    Render {
        /// Series JSON (bare `{t, S, I, ...}` or `{params, series}`).
        #[arg(long)]
        series: PathBuf,
        /// Output directory for frames and `frames.json`.
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 400)]
        width: u32,
        #[arg(long, default_value_t = 400)]
        height: u32,
        #[command(flatten)]
        layout: LayoutArgs,
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Print per-frame band sizes as JSON without writing images.
    Sizes {
        #[arg(long)]
        series: PathBuf,
        #[command(flatten)]
        layout: LayoutArgs,
        #[command(flatten)]
        range: RangeArgs,
    },
    /// Paint a single frame from inline proportions.
    Frame {
        /// Proportions JSON, e.g. `{"S":0.7,"I":0.2,"R":0.1}`.
        #[arg(long)]
        proportions: String,
        /// Output PNG path.
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 400)]
        width: u32,
        #[arg(long, default_value_t = 400)]
        height: u32,
        #[command(flatten)]
        layout: LayoutArgs,
    },
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    match cli.command {
        Command::Render {
            series,
            out,
            width,
            height,
            layout,
            range,
        } => {
            let file = SeriesFile::load(&series)?;
            let params = ParamOverrides::from(layout).apply(file.params(), &config);
            let summary = replay(
                config,
                params,
                file.into_series(),
                range.into(),
                (width, height),
                Some(&out),
            )?;
            info!(frames = summary.pngs.len(), out = %out.display(), "rendered frames");
        }
        Command::Sizes {
            series,
            layout,
            range,
        } => {
            let file = SeriesFile::load(&series)?;
            let params = ParamOverrides::from(layout).apply(file.params(), &config);
            let size = config.grid_size;
            let summary = replay(
                config,
                params,
                file.into_series(),
                range.into(),
                (size, size),
                None,
            )?;
            let json =
                serde_json::to_string_pretty(&summary.log).context("failed to encode frame log")?;
            println!("{json}");
        }
        Command::Frame {
            proportions,
            out,
            width,
            height,
            layout,
        } => {
            let fractions: Fractions =
                serde_json::from_str(&proportions).context("failed to parse --proportions")?;
            let params = ParamOverrides::from(layout).apply(None, &config);
            let png = render_png_offscreen(&config, params, fractions, width, height)
                .context("failed to render frame")?;
            fs::write(&out, png).with_context(|| format!("failed to write {}", out.display()))?;
            info!(out = %out.display(), "rendered frame");
        }
    }

    Ok(())
}

fn resolve_config(cli: &Cli) -> Result<LayoutConfig> {
    let mut config = load_config(cli.config.as_deref())?;
    if let Some(size) = cli.grid_size {
        config.grid_size = size;
    }
    config.validate().context("invalid layout configuration")?;
    Ok(config)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();
}
