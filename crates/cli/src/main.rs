//! handflood CLI - HAND flood extent mapping

mod config;
mod naming;
mod pipeline;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use handflood_algorithms::flood::flood_extent;
use handflood_algorithms::hydrology::{
    flow_accumulation, flow_direction, flow_distance, priority_flood, stream_network,
    stream_threshold, FlowDistanceKind, FlowDistanceParams, PriorityFloodParams,
    StreamNetworkParams,
};
use handflood_core::io::{read_geotiff, write_geojson, write_geotiff, GeoTiffOptions};
use handflood_core::{Raster, RasterElement};

use config::RunArgs;
use pipeline::StageReporter;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "handflood")]
#[command(author, version, about = "Height Above Nearest Drainage flood mapping", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full HAND pipeline: clip, fill, route, HAND, flood polygons
    Run(RunArgs),
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Individual hydrology steps
    Hydrology {
        #[command(subcommand)]
        algorithm: HydrologyCommands,
    },
    /// Flood extent from a HAND raster
    Flood {
        #[command(subcommand)]
        algorithm: FloodCommands,
    },
}

// ─── Hydrology subcommands ──────────────────────────────────────────────

#[derive(Subcommand)]
enum HydrologyCommands {
    /// Fill depressions in a DEM (Priority-Flood)
    Fill {
        /// Input DEM file
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Elevation increment across filled areas (0 = flat fill)
        #[arg(long, default_value = "0.00001")]
        epsilon: f64,
    },
    /// D8 flow direction from a filled DEM
    FlowDirection {
        /// Input DEM file
        input: PathBuf,
        /// Output file (D8 codes: 1=E, 2=NE, 3=N ... 8=SE, 0=none)
        output: PathBuf,
    },
    /// Flow accumulation from a flow direction raster
    FlowAccumulation {
        /// Input flow direction raster (D8 codes)
        input: PathBuf,
        /// Output file (upstream cell count)
        output: PathBuf,
    },
    /// Stream network by thresholding flow accumulation
    StreamNetwork {
        /// Input flow accumulation raster
        input: PathBuf,
        /// Output file (1 = stream)
        output: PathBuf,
        /// Threshold as a fraction of the maximum accumulation (0-1]
        #[arg(short, long, default_value = "0.01")]
        fraction: f64,
    },
    /// Distance from every cell to the stream it drains to
    FlowDistance {
        /// Filled DEM
        dem: PathBuf,
        /// Flow direction raster
        flow_dir: PathBuf,
        /// Stream network raster
        streams: PathBuf,
        /// Output file
        output: PathBuf,
        /// Measure the along-path length instead of the vertical drop
        #[arg(long)]
        horizontal: bool,
    },
}

// ─── Flood subcommands ──────────────────────────────────────────────────

#[derive(Subcommand)]
enum FloodCommands {
    /// Flood extent raster (1 where HAND <= depth)
    Extent {
        /// Input HAND raster
        input: PathBuf,
        /// Output file
        output: PathBuf,
        /// Water level above the drainage network (m)
        #[arg(short, long)]
        depth: f64,
    },
    /// Smoothed flood extent polygons as GeoJSON
    Polygons {
        /// Input HAND raster
        input: PathBuf,
        /// Output GeoJSON file
        output: PathBuf,
        /// Water level above the drainage network (m)
        #[arg(short, long)]
        depth: f64,
        /// Chaikin smoothing passes
        #[arg(long, default_value = "2")]
        smooth: usize,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Drives one spinner per pipeline stage
#[derive(Default)]
struct SpinnerReporter {
    current: RefCell<Option<ProgressBar>>,
}

impl StageReporter for SpinnerReporter {
    fn start(&self, stage: &str) {
        *self.current.borrow_mut() = Some(spinner(&format!("{}...", stage)));
    }

    fn finish(&self, _stage: &str) {
        if let Some(pb) = self.current.borrow_mut().take() {
            pb.finish_and_clear();
        }
    }
}

fn read_raster<T: RasterElement>(path: &Path) -> Result<Raster<T>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<T> = read_geotiff(path, None)
        .with_context(|| format!("Failed to read raster {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input: {} x {}", raster.cols(), raster.rows());
    Ok(raster)
}

fn read_dem(path: &Path) -> Result<Raster<f64>> {
    Ok(read_raster::<f64>(path)?.nodata_to_nan())
}

fn write_result<T: RasterElement>(raster: &Raster<T>, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geotiff(raster, path, Some(GeoTiffOptions::default()))
        .context("Failed to write output")?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

/// Area is in map units squared, which are degrees for geographic DEMs
fn level_line(level: &pipeline::LevelSummary) -> String {
    format!(
        "  {:>4} m: {:>6} polygons, {:.1} square units -> {}",
        level.depth,
        level.polygons,
        level.area,
        level.path.display()
    )
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;
    execute(cli.command)
}

fn execute(command: Commands) -> Result<()> {
    match command {
        // ── Pipeline ─────────────────────────────────────────────────
        Commands::Run(args) => {
            let mut config = args.into_config()?;
            config.validate()?;

            let summary = pipeline::run(&config, &SpinnerReporter::default())?;

            println!("Region: {}  DEM: {}", summary.region, summary.dem.describe());
            println!("Stream threshold: {} cells", summary.stream_threshold);
            for level in &summary.levels {
                println!("{}", level_line(level));
            }
            println!("{} files written in {:.2?}", summary.written.len(), summary.elapsed);
        }

        // ── Info ─────────────────────────────────────────────────────
        Commands::Info { input } => {
            let raster = read_raster::<f64>(&input)?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len().max(1) as f64
            );
        }

        // ── Hydrology ────────────────────────────────────────────────
        Commands::Hydrology { algorithm } => match algorithm {
            HydrologyCommands::Fill {
                input,
                output,
                epsilon,
            } => {
                let dem = read_dem(&input)?;
                let start = Instant::now();
                let result = priority_flood(&dem, PriorityFloodParams { epsilon })
                    .context("Failed to fill depressions")?;
                let elapsed = start.elapsed();
                write_result(&result, &output)?;
                done("Filled DEM", &output, elapsed);
            }

            HydrologyCommands::FlowDirection { input, output } => {
                let dem = read_dem(&input)?;
                let start = Instant::now();
                let result =
                    flow_direction(&dem).context("Failed to calculate flow direction")?;
                let elapsed = start.elapsed();
                write_result(&result, &output)?;
                done("Flow direction", &output, elapsed);
            }

            HydrologyCommands::FlowAccumulation { input, output } => {
                let flow_dir = read_raster::<u8>(&input)?;
                let start = Instant::now();
                let result = flow_accumulation(&flow_dir)
                    .context("Failed to calculate flow accumulation")?;
                let elapsed = start.elapsed();
                write_result(&result, &output)?;
                done("Flow accumulation", &output, elapsed);
            }

            HydrologyCommands::StreamNetwork {
                input,
                output,
                fraction,
            } => {
                let flow_acc = read_dem(&input)?;
                let start = Instant::now();
                let max = flow_acc.statistics().max.unwrap_or(0.0);
                let threshold = stream_threshold(max, fraction)?;
                info!("Stream threshold: {}", threshold);
                let result = stream_network(&flow_acc, StreamNetworkParams { threshold })
                    .context("Failed to extract stream network")?;
                let elapsed = start.elapsed();
                write_result(&result, &output)?;
                done("Stream network", &output, elapsed);
            }

            HydrologyCommands::FlowDistance {
                dem,
                flow_dir,
                streams,
                output,
                horizontal,
            } => {
                let dem = read_dem(&dem)?;
                let flow_dir = read_raster::<u8>(&flow_dir)?;
                let streams = read_raster::<u8>(&streams)?;
                let kind = if horizontal {
                    FlowDistanceKind::Horizontal
                } else {
                    FlowDistanceKind::Vertical
                };
                let start = Instant::now();
                let result = flow_distance(&dem, &flow_dir, &streams, FlowDistanceParams { kind })
                    .context("Failed to calculate flow distance")?;
                let elapsed = start.elapsed();
                write_result(&result, &output)?;
                done("Flow distance", &output, elapsed);
            }
        },

        // ── Flood ────────────────────────────────────────────────────
        Commands::Flood { algorithm } => match algorithm {
            FloodCommands::Extent {
                input,
                output,
                depth,
            } => {
                let hand = read_dem(&input)?;
                let start = Instant::now();
                let result = flood_extent(&hand, depth).context("Failed to compute flood extent")?;
                let elapsed = start.elapsed();
                write_result(&result, &output)?;
                done("Flood extent", &output, elapsed);
            }

            FloodCommands::Polygons {
                input,
                output,
                depth,
                smooth,
            } => {
                let hand = read_dem(&input)?;
                let start = Instant::now();
                let extent = flood_extent(&hand, depth).context("Failed to compute flood extent")?;
                let collection = pipeline::flood_features(&extent, depth, smooth)?;
                let elapsed = start.elapsed();
                info!("{} polygons", collection.len());
                write_geojson(&collection, &output).context("Failed to write output")?;
                done("Flood polygons", &output, elapsed);
            }
        },
    }

    Ok(())
}
