//! Pipeline configuration
//!
//! Settings come from an optional JSON file; command line flags given
//! explicitly override what the file says.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, ensure, Context, Result};
use clap::Args;
use handflood_algorithms::flood::{FloodLevel, DEFAULT_FLOOD_DEPTHS};
use serde::{Deserialize, Serialize};

/// Everything one pipeline run needs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Elevation raster (GeoTIFF)
    pub dem: PathBuf,
    /// Region boundary (GeoJSON polygons)
    pub mask: PathBuf,
    /// Directory receiving all products
    pub output_dir: PathBuf,
    /// Fraction of the maximum flow accumulation defining a stream
    pub stream_fraction: f64,
    /// Also write flow accumulation and stream network rasters
    pub save_stream_network: bool,
    /// Also write the DEM clipped to the mask
    pub save_clipped_dem: bool,
    /// Also write the HAND raster
    pub save_hand: bool,
    /// Also write a water depth raster per flood level
    pub save_depth_rasters: bool,
    /// Flood levels in meters above the drainage network
    pub depths: Vec<f64>,
    /// Chaikin passes applied to the flood polygons
    pub smooth_iterations: usize,
    /// Elevation increment enforced across filled depressions
    pub fill_epsilon: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dem: PathBuf::new(),
            mask: PathBuf::new(),
            output_dir: PathBuf::from("."),
            stream_fraction: 0.01,
            save_stream_network: false,
            save_clipped_dem: false,
            save_hand: false,
            save_depth_rasters: false,
            depths: DEFAULT_FLOOD_DEPTHS.to_vec(),
            smooth_iterations: 2,
            fill_epsilon: 1e-5,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file. Missing keys take defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config {}", path.display()))
    }

    /// Check the configuration and prepare the output directory.
    ///
    /// Depths are sorted ascending; depths that would share an output file
    /// name (same one-decimal label) are rejected.
    pub fn validate(&mut self) -> Result<()> {
        ensure!(self.dem.is_file(), "DEM not found: {}", self.dem.display());
        ensure!(self.mask.is_file(), "Mask not found: {}", self.mask.display());

        ensure!(
            self.stream_fraction > 0.0 && self.stream_fraction <= 1.0,
            "stream_fraction must be in (0, 1], got {}",
            self.stream_fraction
        );
        ensure!(
            self.fill_epsilon.is_finite() && self.fill_epsilon >= 0.0,
            "fill_epsilon must be finite and >= 0, got {}",
            self.fill_epsilon
        );

        ensure!(!self.depths.is_empty(), "At least one flood depth is required");
        if let Some(bad) = self.depths.iter().find(|d| !d.is_finite() || **d < 0.0) {
            bail!("Flood depths must be finite and >= 0, got {}", bad);
        }
        self.depths.sort_by(|a, b| a.total_cmp(b));
        // Each level's output file is named after its label, so labels
        // must be unique, not just the depths
        if let Some(pair) = self
            .depths
            .windows(2)
            .find(|w| FloodLevel::new(w[0]).label() == FloodLevel::new(w[1]).label())
        {
            bail!(
                "Flood depths {} and {} share the output label {}",
                pair[0],
                pair[1],
                FloodLevel::new(pair[0]).label()
            );
        }

        fs::create_dir_all(&self.output_dir).with_context(|| {
            format!("Failed to create output directory {}", self.output_dir.display())
        })?;

        Ok(())
    }
}

/// Arguments of the `run` subcommand
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// JSON configuration file; flags below override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Input DEM (GeoTIFF)
    #[arg(long)]
    pub dem: Option<PathBuf>,
    /// Region boundary polygon (GeoJSON); the first three letters of the
    /// file name become the region code
    #[arg(long)]
    pub mask: Option<PathBuf>,
    /// Output directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Fraction of the maximum flow accumulation that defines a stream (0-1]
    #[arg(short = 't', long)]
    pub stream_fraction: Option<f64>,
    /// Flood depths in meters, comma separated
    #[arg(short, long, value_delimiter = ',')]
    pub depths: Option<Vec<f64>>,
    /// Chaikin smoothing passes for flood polygons
    #[arg(long)]
    pub smooth_iterations: Option<usize>,
    /// Elevation increment across filled depressions
    #[arg(long)]
    pub fill_epsilon: Option<f64>,
    /// Write flow accumulation and stream network rasters
    #[arg(long)]
    pub save_stream_network: bool,
    /// Write the DEM clipped to the mask
    #[arg(long)]
    pub save_clipped_dem: bool,
    /// Write the HAND raster
    #[arg(long)]
    pub save_hand: bool,
    /// Write a water depth raster for every flood level
    #[arg(long)]
    pub save_depth_rasters: bool,
}

impl RunArgs {
    /// Resolve the final configuration: file (or defaults), then flags.
    pub fn into_config(self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(dem) = self.dem {
            config.dem = dem;
        }
        if let Some(mask) = self.mask {
            config.mask = mask;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(fraction) = self.stream_fraction {
            config.stream_fraction = fraction;
        }
        if let Some(depths) = self.depths {
            config.depths = depths;
        }
        if let Some(iterations) = self.smooth_iterations {
            config.smooth_iterations = iterations;
        }
        if let Some(epsilon) = self.fill_epsilon {
            config.fill_epsilon = epsilon;
        }

        config.save_stream_network |= self.save_stream_network;
        config.save_clipped_dem |= self.save_clipped_dem;
        config.save_hand |= self.save_hand;
        config.save_depth_rasters |= self.save_depth_rasters;

        if config.dem.as_os_str().is_empty() || config.mask.as_os_str().is_empty() {
            bail!("Both a DEM and a mask are required (--dem/--mask or a config file)");
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn inputs(dir: &Path) -> PipelineConfig {
        let dem = dir.join("srtm.tif");
        let mask = dir.join("hti.geojson");
        fs::write(&dem, b"").unwrap();
        fs::write(&mask, b"").unwrap();
        PipelineConfig {
            dem,
            mask,
            output_dir: dir.join("out"),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.stream_fraction, 0.01);
        assert_eq!(config.depths, vec![0.5, 1.0, 1.5, 2.0]);
        assert_eq!(config.smooth_iterations, 2);
        assert!(!config.save_stream_network);
    }

    #[test]
    fn test_from_file_fills_missing_keys() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"dem": "a.tif", "mask": "b.geojson", "depths": [1.0, 3.0]}}"#).unwrap();

        let config = PipelineConfig::from_file(file.path()).unwrap();
        assert_eq!(config.dem, PathBuf::from("a.tif"));
        assert_eq!(config.depths, vec![1.0, 3.0]);
        assert_eq!(config.stream_fraction, 0.01);
    }

    #[test]
    fn test_flags_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"dem": "a.tif", "mask": "b.geojson", "stream_fraction": 0.005, "save_hand": true}}"#
        )
        .unwrap();

        let args = RunArgs {
            config: Some(file.path().to_path_buf()),
            dem: Some(PathBuf::from("other.tif")),
            stream_fraction: Some(0.003),
            save_depth_rasters: true,
            ..Default::default()
        };
        let config = args.into_config().unwrap();

        assert_eq!(config.dem, PathBuf::from("other.tif"));
        assert_eq!(config.mask, PathBuf::from("b.geojson"));
        assert_eq!(config.stream_fraction, 0.003);
        assert!(config.save_hand);
        assert!(config.save_depth_rasters);
    }

    #[test]
    fn test_missing_inputs_rejected() {
        assert!(RunArgs::default().into_config().is_err());
    }

    #[test]
    fn test_validate_sorts_depths_and_creates_output_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = inputs(dir.path());
        config.depths = vec![2.0, 0.5, 1.0];

        config.validate().unwrap();
        assert_eq!(config.depths, vec![0.5, 1.0, 2.0]);
        assert!(config.output_dir.is_dir());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let dir = tempfile::tempdir().unwrap();

        let mut config = inputs(dir.path());
        config.stream_fraction = 0.0;
        assert!(config.validate().is_err());

        let mut config = inputs(dir.path());
        config.depths = vec![1.0, 0.5, 1.0];
        assert!(config.validate().is_err());

        let mut config = inputs(dir.path());
        config.depths = vec![];
        assert!(config.validate().is_err());

        let mut config = inputs(dir.path());
        config.depths = vec![-1.0];
        assert!(config.validate().is_err());

        let mut config = inputs(dir.path());
        config.dem = dir.path().join("missing.tif");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_depths_sharing_a_label() {
        let dir = tempfile::tempdir().unwrap();

        let mut config = inputs(dir.path());
        config.depths = vec![0.5, 0.54];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("0_5"), "{}", err);

        let mut config = inputs(dir.path());
        config.depths = vec![0.2, 1.0, 0.24];
        assert!(config.validate().is_err());

        let mut config = inputs(dir.path());
        config.depths = vec![0.5, 0.6, 1.5];
        config.validate().unwrap();
        assert!(config.validate().is_err());
    }
}
