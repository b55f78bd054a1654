//! Region and DEM identification from input file names, and the names of
//! every product the pipeline writes.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use handflood_algorithms::flood::FloodLevel;

/// Upper-cased last path component. Both `/` and `\` separate components,
/// so Windows paths are handled on every platform.
fn file_name_upper(path: &Path) -> String {
    let text = path.to_string_lossy();
    text.rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .to_uppercase()
}

/// Region code: the first three characters of the mask's file name,
/// upper-cased (ISO 3166 alpha-3 by convention, e.g. `hti_border.geojson`
/// → `HTI`).
pub fn region_code(mask_path: &Path) -> Result<String> {
    let name = file_name_upper(mask_path);
    if name.is_empty() {
        bail!("Cannot derive a region code from {}", mask_path.display());
    }
    Ok(name.chars().take(3).collect())
}

/// Elevation model family, recognised from keywords in the file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DemSource {
    Srtm,
    Copernicus,
    WorldDem,
    /// Unrecognised; keeps the first four characters of the file name
    Unknown(String),
}

impl DemSource {
    pub fn detect(dem_path: &Path) -> Self {
        let name = file_name_upper(dem_path);
        if name.contains("SRTM") {
            DemSource::Srtm
        } else if name.contains("COP") {
            DemSource::Copernicus
        } else if name.contains("WORLD") {
            DemSource::WorldDem
        } else {
            DemSource::Unknown(name.chars().take(4).collect())
        }
    }

    /// Short form used in output file names
    pub fn tag(&self) -> &str {
        match self {
            DemSource::Srtm => "SRTM",
            DemSource::Copernicus => "COP",
            DemSource::WorldDem => "WORLDDEM",
            DemSource::Unknown(prefix) => prefix,
        }
    }

    /// Human readable label for logs
    pub fn describe(&self) -> String {
        match self {
            DemSource::Srtm => "SRTM".to_string(),
            DemSource::Copernicus => "COPERNICUS".to_string(),
            DemSource::WorldDem => "WORLDDEM".to_string(),
            DemSource::Unknown(prefix) => format!("UNKNOWN DEM {}", prefix),
        }
    }
}

impl fmt::Display for DemSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Output paths for one region / DEM combination
#[derive(Debug, Clone)]
pub struct OutputNames {
    pub dir: PathBuf,
    pub region: String,
    pub dem: DemSource,
}

impl OutputNames {
    pub fn new(dir: impl Into<PathBuf>, region: impl Into<String>, dem: DemSource) -> Self {
        Self {
            dir: dir.into(),
            region: region.into(),
            dem,
        }
    }

    fn path(&self, name: String) -> PathBuf {
        self.dir.join(name)
    }

    /// `{REGION}_HAND_{label}m_{DEM}.geojson`
    pub fn flood_polygons(&self, level: &FloodLevel) -> PathBuf {
        self.path(format!("{}_HAND_{}m_{}.geojson", self.region, level.label(), self.dem))
    }

    /// `{REGION}_HAND_{label}M_{DEM}.tif`
    pub fn flood_depth_raster(&self, level: &FloodLevel) -> PathBuf {
        self.path(format!("{}_HAND_{}M_{}.tif", self.region, level.label(), self.dem))
    }

    /// `{REGION}_{DEM}.tif`
    pub fn clipped_dem(&self) -> PathBuf {
        self.path(format!("{}_{}.tif", self.region, self.dem))
    }

    /// `{REGION}_HAND_{DEM}.tif`
    pub fn hand_raster(&self) -> PathBuf {
        self.path(format!("{}_HAND_{}.tif", self.region, self.dem))
    }

    pub fn debug_flow_accumulation(&self) -> PathBuf {
        self.path(format!("DEBUG_{}_{}_FLOWACCUMULATION.tif", self.region, self.dem))
    }

    pub fn debug_stream_network(&self) -> PathBuf {
        self.path(format!("DEBUG_{}_{}_STREAMNETWORK.tif", self.region, self.dem))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_region_code() {
        assert_eq!(region_code(Path::new("/data/hti_border.geojson")).unwrap(), "HTI");
        assert_eq!(region_code(Path::new(r"C:\GIS\Borders\dom.shp")).unwrap(), "DOM");
        assert_eq!(region_code(Path::new("ab")).unwrap(), "AB");
        assert!(region_code(Path::new("")).is_err());
        assert!(region_code(Path::new("/data/")).is_err());
    }

    #[test]
    fn test_dem_source_detection() {
        assert_eq!(DemSource::detect(Path::new("n18_w073_srtm_1arc.tif")), DemSource::Srtm);
        assert_eq!(DemSource::detect(Path::new("Copernicus_DSM_30.tif")), DemSource::Copernicus);
        assert_eq!(DemSource::detect(Path::new("tandem_worlddem.tif")), DemSource::WorldDem);
        assert_eq!(
            DemSource::detect(Path::new("/x/alos_palsar.tif")),
            DemSource::Unknown("ALOS".into())
        );
    }

    #[test]
    fn test_dem_source_keyword_precedence() {
        // SRTM wins over COP, COP over WORLD
        assert_eq!(DemSource::detect(Path::new("srtm_cop.tif")), DemSource::Srtm);
        assert_eq!(DemSource::detect(Path::new("world_cop.tif")), DemSource::Copernicus);
    }

    #[test]
    fn test_dem_source_labels() {
        assert_eq!(DemSource::WorldDem.tag(), "WORLDDEM");
        assert_eq!(DemSource::Copernicus.describe(), "COPERNICUS");
        assert_eq!(DemSource::Unknown("ALOS".into()).describe(), "UNKNOWN DEM ALOS");
    }

    #[test]
    fn test_output_names() {
        let names = OutputNames::new("/out", "HTI", DemSource::Srtm);
        let level = FloodLevel::new(0.5);

        assert_eq!(names.flood_polygons(&level), Path::new("/out/HTI_HAND_0_5m_SRTM.geojson"));
        assert_eq!(names.flood_depth_raster(&level), Path::new("/out/HTI_HAND_0_5M_SRTM.tif"));
        assert_eq!(names.clipped_dem(), Path::new("/out/HTI_SRTM.tif"));
        assert_eq!(names.hand_raster(), Path::new("/out/HTI_HAND_SRTM.tif"));
        assert_eq!(
            names.debug_flow_accumulation(),
            Path::new("/out/DEBUG_HTI_SRTM_FLOWACCUMULATION.tif")
        );
        assert_eq!(
            names.debug_stream_network(),
            Path::new("/out/DEBUG_HTI_SRTM_STREAMNETWORK.tif")
        );
        assert_eq!(
            names.flood_polygons(&FloodLevel::new(2.0)),
            Path::new("/out/HTI_HAND_2_0m_SRTM.geojson")
        );
    }
}
