//! Native GeoTIFF reading/writing
//!
//! Uses the `tiff` crate. Georeferencing is carried by the
//! ModelPixelScale / ModelTiepoint tags (north-up grids only) and the
//! no-data value by the GDAL_NODATA ASCII tag, which is what GDAL, QGIS and
//! most DEM distributions use.

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;

// The decoder parses these codes into named tags, so lookups must use
// the named variants. Unknown(n) only matches unregistered codes.
const MODEL_PIXEL_SCALE: Tag = Tag::ModelPixelScaleTag;
const MODEL_TIEPOINT: Tag = Tag::ModelTiepointTag;
const GDAL_NODATA: Tag = Tag::GdalNodata;
const GEO_KEY_DIRECTORY: u16 = 34735;

/// Options for writing GeoTIFF files
#[derive(Debug, Clone)]
pub struct GeoTiffOptions {
    /// Write the raster's no-data value as a GDAL_NODATA tag
    pub write_nodata: bool,
}

impl Default for GeoTiffOptions {
    fn default() -> Self {
        Self { write_nodata: true }
    }
}

/// Read a GeoTIFF file into a Raster
///
/// `band` is 1-indexed and only matters for pixel-interleaved
/// multi-band files; defaults to 1.
pub fn read_geotiff<T, P>(path: P, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::open(path.as_ref())?;
    decode_geotiff(BufReader::new(file), band)
}

/// Read a GeoTIFF from an in-memory buffer into a Raster
pub fn read_geotiff_from_buffer<T>(data: &[u8], band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
{
    decode_geotiff(Cursor::new(data), band)
}

macro_rules! cast_buffer {
    ($buf:expr) => {
        $buf.iter()
            .map(|&v| num_traits::cast(v).unwrap_or(T::default_nodata()))
            .collect::<Vec<T>>()
    };
}

/// Decode a GeoTIFF from any `Read + Seek` source
fn decode_geotiff<T, R>(reader: R, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    R: std::io::Read + std::io::Seek,
{
    let mut decoder = Decoder::new(reader)
        .map_err(|e| Error::Other(format!("TIFF decode error: {}", e)))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(|e| Error::Other(format!("Cannot read dimensions: {}", e)))?;

    let rows = height as usize;
    let cols = width as usize;

    let result = decoder
        .read_image()
        .map_err(|e| Error::Other(format!("Cannot read image data: {}", e)))?;

    let samples: Vec<T> = match result {
        DecodingResult::F32(buf) => cast_buffer!(buf),
        DecodingResult::F64(buf) => cast_buffer!(buf),
        DecodingResult::U8(buf) => cast_buffer!(buf),
        DecodingResult::U16(buf) => cast_buffer!(buf),
        DecodingResult::U32(buf) => cast_buffer!(buf),
        DecodingResult::I8(buf) => cast_buffer!(buf),
        DecodingResult::I16(buf) => cast_buffer!(buf),
        DecodingResult::I32(buf) => cast_buffer!(buf),
        _ => return Err(Error::UnsupportedDataType("Unsupported TIFF pixel format".to_string())),
    };

    let data = select_band(samples, rows * cols, band)?;
    let mut raster = Raster::from_vec(data, rows, cols)?;

    if let Some(transform) = read_geotransform(&mut decoder) {
        raster.set_transform(transform);
    }
    if let Some(nodata) = read_nodata::<T, R>(&mut decoder) {
        raster.set_nodata(Some(nodata));
    }

    Ok(raster)
}

/// Pick one band out of pixel-interleaved samples
fn select_band<T: Copy>(samples: Vec<T>, cells: usize, band: Option<usize>) -> Result<Vec<T>> {
    if cells == 0 || samples.len() % cells != 0 {
        return Err(Error::Other(format!(
            "Sample count {} does not match {} cells",
            samples.len(),
            cells
        )));
    }

    let bands = samples.len() / cells;
    let band = band.unwrap_or(1);
    if band == 0 || band > bands {
        return Err(Error::invalid_param(
            "band",
            band,
            format!("file has {} band(s)", bands),
        ));
    }

    if bands == 1 {
        return Ok(samples);
    }
    Ok(samples.into_iter().skip(band - 1).step_by(bands).collect())
}

/// Read the GeoTransform from ModelPixelScale + ModelTiepoint
fn read_geotransform<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(MODEL_PIXEL_SCALE).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(MODEL_TIEPOINT).ok()?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }

    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];

    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

/// Read the GDAL_NODATA tag, if present and representable in `T`
fn read_nodata<T, R>(decoder: &mut Decoder<R>) -> Option<T>
where
    T: RasterElement,
    R: std::io::Read + std::io::Seek,
{
    let text = decoder.get_tag_ascii_string(GDAL_NODATA).ok()?;
    parse_nodata(&text)
}

fn parse_nodata<T: RasterElement>(text: &str) -> Option<T> {
    let text = text.trim_end_matches('\0').trim();
    let value: f64 = if text.eq_ignore_ascii_case("nan") {
        f64::NAN
    } else {
        text.parse().ok()?
    };
    if value.is_nan() && !T::is_float() {
        return None;
    }
    num_traits::cast(value)
}

/// Write a Raster to a GeoTIFF file as 32-bit float
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, options: Option<GeoTiffOptions>) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    encode_geotiff(raster, BufWriter::new(file), options.unwrap_or_default())
}

/// Write a Raster to an in-memory GeoTIFF buffer
pub fn write_geotiff_to_buffer<T>(raster: &Raster<T>, options: Option<GeoTiffOptions>) -> Result<Vec<u8>>
where
    T: RasterElement,
{
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf), options.unwrap_or_default())?;
    Ok(buf)
}

/// Encode a Raster as GeoTIFF into any `Write + Seek` sink
fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W, options: GeoTiffOptions) -> Result<()>
where
    T: RasterElement,
    W: std::io::Write + std::io::Seek,
{
    let mut encoder = TiffEncoder::new(writer)
        .map_err(|e| Error::Other(format!("TIFF encoder error: {}", e)))?;

    let (rows, cols) = raster.shape();

    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
        .collect();

    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(|e| Error::Other(format!("Cannot create TIFF image: {}", e)))?;

    let gt = raster.transform();

    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(MODEL_PIXEL_SCALE, &scale[..])
        .map_err(|e| Error::Other(format!("Cannot write scale tag: {}", e)))?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(MODEL_TIEPOINT, &tiepoint[..])
        .map_err(|e| Error::Other(format!("Cannot write tiepoint tag: {}", e)))?;

    // Minimal key directory: GTModelTypeGeoKey = Projected,
    // GTRasterTypeGeoKey = PixelIsArea.
    let geokeys: [u16; 12] = [
        1, 1, 0, 2,
        1024, 0, 1, 1,
        1025, 0, 1, 1,
    ];
    image
        .encoder()
        .write_tag(Tag::Unknown(GEO_KEY_DIRECTORY), &geokeys[..])
        .map_err(|e| Error::Other(format!("Cannot write geokey tag: {}", e)))?;

    if options.write_nodata {
        if let Some(nodata) = raster.nodata().and_then(|nd| nd.to_f64()) {
            let text = if nodata.is_nan() {
                "nan".to_string()
            } else {
                nodata.to_string()
            };
            image
                .encoder()
                .write_tag(GDAL_NODATA, text.as_str())
                .map_err(|e| Error::Other(format!("Cannot write nodata tag: {}", e)))?;
        }
    }

    image
        .write_data(&data)
        .map_err(|e| Error::Other(format!("Cannot write image data: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample_dem() -> Raster<f64> {
        let mut dem = Raster::from_vec(
            vec![10.0, 11.0, 12.0, f64::NAN, 14.0, 15.0],
            2,
            3,
        )
        .unwrap();
        dem.set_transform(GeoTransform::new(500_000.0, 4_000_000.0, 30.0, -30.0));
        dem.set_nodata(Some(f64::NAN));
        dem
    }

    #[test]
    fn test_buffer_keeps_values_transform_and_nodata() {
        let dem = sample_dem();
        let bytes = write_geotiff_to_buffer(&dem, None).unwrap();
        let back: Raster<f64> = read_geotiff_from_buffer(&bytes, None).unwrap();

        assert_eq!(back.shape(), (2, 3));
        assert_eq!(back.get(0, 2).unwrap(), 12.0);
        assert!(back.get(1, 0).unwrap().is_nan());
        assert_eq!(back.transform(), dem.transform());
        assert!(back.nodata().is_some_and(|nd| nd.is_nan()));
    }

    #[test]
    fn test_file_with_sentinel_nodata() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dem.tif");

        let mut dem = Raster::from_vec(vec![1.0, -9999.0, 3.0, 4.0], 2, 2).unwrap();
        dem.set_nodata(Some(-9999.0));
        write_geotiff(&dem, &path, None).unwrap();

        let back: Raster<f64> = read_geotiff(&path, None).unwrap();
        assert_eq!(back.nodata(), Some(-9999.0));
        assert!(back.is_nodata_at(0, 1).unwrap());
    }

    #[test]
    fn test_georeferenced_file_reads_back_origin_and_sentinel() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("srtm.tif");

        let mut dem = Raster::from_vec(vec![5.0, -9999.0, 7.0, 8.0], 2, 2).unwrap();
        dem.set_transform(GeoTransform::new(1000.0, 2000.0, 10.0, -10.0));
        dem.set_nodata(Some(-9999.0));
        write_geotiff(&dem, &path, None).unwrap();

        let back: Raster<f64> = read_geotiff(&path, None).unwrap();
        let gt = back.transform();
        assert_eq!((gt.origin_x, gt.origin_y), (1000.0, 2000.0));
        assert_eq!((gt.pixel_width, gt.pixel_height), (10.0, -10.0));
        assert_eq!(back.bounds(), dem.bounds());
        assert_eq!(back.nodata(), Some(-9999.0));

        let clean = back.nodata_to_nan();
        assert!(clean.get(0, 1).unwrap().is_nan());
        assert_eq!(clean.statistics().min, Some(5.0));
    }

    #[test]
    fn test_nodata_tag_can_be_skipped() {
        let dem = sample_dem();
        let bytes = write_geotiff_to_buffer(&dem, Some(GeoTiffOptions { write_nodata: false })).unwrap();
        let back: Raster<f64> = read_geotiff_from_buffer(&bytes, None).unwrap();
        assert_eq!(back.nodata().map(|v| v.is_nan()), None);
    }

    #[test]
    fn test_parse_nodata() {
        assert_eq!(parse_nodata::<f64>("-32768\0"), Some(-32768.0));
        assert!(parse_nodata::<f64>("nan").is_some_and(|v| v.is_nan()));
        assert_eq!(parse_nodata::<u8>("nan"), None);
        assert_eq!(parse_nodata::<u8>("0"), Some(0));
        assert_eq!(parse_nodata::<f64>("bogus"), None);
    }

    #[test]
    fn test_select_band() {
        let interleaved = vec![1, 10, 2, 20, 3, 30];
        assert_eq!(select_band(interleaved.clone(), 3, Some(2)).unwrap(), vec![10, 20, 30]);
        assert_eq!(select_band(interleaved.clone(), 3, None).unwrap(), vec![1, 2, 3]);
        assert!(select_band(interleaved, 3, Some(3)).is_err());
    }
}
