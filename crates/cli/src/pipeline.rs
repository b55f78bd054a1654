//! The HAND flood-extent pipeline
//!
//! DEM → extract by mask → fill → D8 flow direction → flow accumulation →
//! stream network → vertical flow distance (HAND) → per flood level:
//! extent → polygons → smoothing → GeoJSON.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use handflood_algorithms::flood::{flood_depth, flood_extent, FloodLevel};
use handflood_algorithms::hydrology::{
    flow_accumulation_masked, flow_direction, flow_distance, priority_flood, stream_network,
    stream_threshold, FlowDistanceKind, FlowDistanceParams, PriorityFloodParams,
    StreamNetworkParams,
};
use handflood_algorithms::mask::extract_by_mask;
use handflood_algorithms::vector::{area, polygonize, smooth_polygon, PolygonizeParams, SmoothParams};
use handflood_core::io::{read_geojson_polygons, read_geotiff, write_geojson, write_geotiff};
use handflood_core::vector::{Feature, FeatureCollection};
use handflood_core::{Raster, RasterElement};
use tracing::{debug, info, warn};

use crate::config::PipelineConfig;
use crate::naming::{region_code, DemSource, OutputNames};

/// Receives stage boundaries, e.g. to drive progress spinners
pub trait StageReporter {
    fn start(&self, stage: &str);
    fn finish(&self, stage: &str);
}

/// Reporter that ignores everything
pub struct SilentReporter;

impl StageReporter for SilentReporter {
    fn start(&self, _stage: &str) {}
    fn finish(&self, _stage: &str) {}
}

/// Result of one flood level
#[derive(Debug, Clone)]
pub struct LevelSummary {
    pub depth: f64,
    pub polygons: usize,
    /// Total polygon area in map units squared
    pub area: f64,
    pub path: PathBuf,
}

/// What a pipeline run produced
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub region: String,
    pub dem: DemSource,
    pub stream_threshold: f64,
    pub levels: Vec<LevelSummary>,
    /// Every file written, in order
    pub written: Vec<PathBuf>,
    pub elapsed: Duration,
}

fn stage<T>(reporter: &dyn StageReporter, name: &str, f: impl FnOnce() -> Result<T>) -> Result<T> {
    reporter.start(name);
    let start = Instant::now();
    let result = f();
    reporter.finish(name);
    debug!("{} took {:.2?}", name, start.elapsed());
    result
}

fn save<T: RasterElement>(raster: &Raster<T>, path: &Path, written: &mut Vec<PathBuf>) -> Result<()> {
    write_geotiff(raster, path, None)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Saved to {}", path.display());
    written.push(path.to_path_buf());
    Ok(())
}

/// Run the whole pipeline for a validated configuration.
pub fn run(config: &PipelineConfig, reporter: &dyn StageReporter) -> Result<RunSummary> {
    let started = Instant::now();
    let mut written = Vec::new();

    let region = region_code(&config.mask)?;
    let dem_source = DemSource::detect(&config.dem);
    info!("Region code: {}", region);
    info!("Using {}", dem_source.describe());
    let names = OutputNames::new(&config.output_dir, region.clone(), dem_source.clone());

    // Clip
    let clipped = stage(reporter, "Clipping DEM", || {
        let dem: Raster<f64> = read_geotiff(&config.dem, None)
            .with_context(|| format!("Failed to read DEM {}", config.dem.display()))?;
        let dem = dem.nodata_to_nan();
        info!("DEM: {} x {}, cell size {}", dem.cols(), dem.rows(), dem.cell_size());

        let mask = read_geojson_polygons(&config.mask)
            .with_context(|| format!("Failed to read mask {}", config.mask.display()))?;
        info!("Clipping {}", region);
        extract_by_mask(&dem, &mask).context("Failed to extract DEM by mask")
    })?;
    info!("Clipped DEM: {} x {}", clipped.cols(), clipped.rows());
    if config.save_clipped_dem {
        save(&clipped, &names.clipped_dem(), &mut written)?;
    }

    // Condition and route
    let filled = stage(reporter, "Filling DEM", || {
        priority_flood(&clipped, PriorityFloodParams { epsilon: config.fill_epsilon })
            .context("Failed to fill depressions")
    })?;
    drop(clipped);

    let flow_dir = stage(reporter, "Determining flow direction", || {
        flow_direction(&filled).context("Failed to compute flow direction")
    })?;

    let flow_acc = stage(reporter, "Determining flow accumulation", || {
        flow_accumulation_masked(&flow_dir, &filled).context("Failed to compute flow accumulation")
    })?;
    if config.save_stream_network {
        info!("Exporting flow accumulation raster");
        save(&flow_acc, &names.debug_flow_accumulation(), &mut written)?;
    }

    // Drainage network
    let max_acc = flow_acc.statistics().max.unwrap_or(0.0);
    let threshold = stream_threshold(max_acc, config.stream_fraction)?;
    info!("Maximum flow accumulation {}, stream threshold {}", max_acc, threshold);

    let streams = stage(reporter, "Creating stream network", || {
        stream_network(&flow_acc, StreamNetworkParams { threshold })
            .context("Failed to extract stream network")
    })?;
    drop(flow_acc);
    if config.save_stream_network {
        info!("Exporting stream network raster");
        save(&streams, &names.debug_stream_network(), &mut written)?;
    }

    let hand = stage(reporter, "Computing flow distance", || {
        flow_distance(
            &filled,
            &flow_dir,
            &streams,
            FlowDistanceParams { kind: FlowDistanceKind::Vertical },
        )
        .context("Failed to compute flow distance")
    })?;
    drop((filled, flow_dir, streams));
    if config.save_hand {
        save(&hand, &names.hand_raster(), &mut written)?;
    }

    // Flood levels
    let mut levels = Vec::with_capacity(config.depths.len());
    for &depth in &config.depths {
        let level = FloodLevel::new(depth);
        let label = format!("{} meter HAND model", level.label().replace('_', "."));

        let summary = stage(reporter, &label, || {
            flood_level(&hand, level, config, &names, &mut written)
        })?;
        info!(
            "{} m: {} polygons, {:.1} square units",
            depth, summary.polygons, summary.area
        );
        levels.push(summary);
    }

    let elapsed = started.elapsed();
    info!("Total time = {:.2?}", elapsed);

    Ok(RunSummary {
        region,
        dem: dem_source,
        stream_threshold: threshold,
        levels,
        written,
        elapsed,
    })
}

/// Polygonize a flood extent into smoothed, attributed features.
///
/// Every feature carries `gridcode` = 1, `FloodValue` = `depth` and `area`
/// measured on the smoothed geometry, in map units squared.
pub fn flood_features(
    extent: &Raster<u8>,
    depth: f64,
    smooth_iterations: usize,
) -> Result<FeatureCollection> {
    let polygons = polygonize(extent, PolygonizeParams { value: 1 })
        .context("Failed to polygonize flood extent")?;

    let smooth = SmoothParams { iterations: smooth_iterations };
    Ok(polygons
        .iter()
        .map(|polygon| {
            let smoothed = smooth_polygon(polygon, smooth.clone());
            let polygon_area = area(&smoothed);
            Feature::new(smoothed)
                .with_property("gridcode", 1i64)
                .with_property("FloodValue", depth)
                .with_property("area", polygon_area)
        })
        .collect())
}

fn flood_level(
    hand: &Raster<f64>,
    level: FloodLevel,
    config: &PipelineConfig,
    names: &OutputNames,
    written: &mut Vec<PathBuf>,
) -> Result<LevelSummary> {
    let depth = level.depth;

    debug!("Identifying flood extent at {} m", depth);
    let extent = flood_extent(hand, depth)?;

    debug!("Converting flood extent to polygons");
    let collection = flood_features(&extent, depth, config.smooth_iterations)?;

    if collection.is_empty() {
        warn!("No cells flooded at {} m, writing an empty collection", depth);
    }
    let total_area: f64 = collection
        .iter()
        .filter_map(|f| f.get_property("area").and_then(|a| a.as_f64()))
        .sum();

    let path = names.flood_polygons(&level);
    write_geojson(&collection, &path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("Saved to {}", path.display());
    written.push(path.clone());

    if config.save_depth_rasters {
        debug!("Calculating flood depth");
        let depth_raster = flood_depth(hand, depth)?;
        save(&depth_raster, &names.flood_depth_raster(&level), written)?;
    }

    Ok(LevelSummary {
        depth,
        polygons: collection.len(),
        area: total_area,
        path,
    })
}
