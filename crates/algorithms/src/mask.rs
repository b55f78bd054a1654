//! Extract by mask
//!
//! Crops a raster to the bounding rectangle of a polygon mask and sets
//! every cell whose centre lies outside the mask to NaN.
//!
//! Inside/outside is decided per row with a scanline: the row's centre
//! line is intersected with every ring edge and a cell centre is inside
//! when an odd number of crossings lies to its left (even-odd rule), so
//! holes and multi-part masks come out right without a separate pass.
//! Rotated transforms are not supported.

use geo::{BoundingRect, Coord, LineString, MultiPolygon};
use handflood_core::raster::Raster;
use handflood_core::{Error, Result};
use tracing::debug;

use crate::maybe_rayon::*;

/// Extract the cells of `dem` covered by `mask`.
///
/// The output extent is the intersection of the raster with the mask's
/// bounding rectangle, snapped outward to whole cells. Cells outside the
/// mask and source nodata cells become NaN; the output nodata is NaN.
///
/// # Errors
/// - [`Error::InvalidParameter`] if the mask has no usable polygon
/// - [`Error::Algorithm`] if the mask does not overlap the raster
pub fn extract_by_mask(dem: &Raster<f64>, mask: &MultiPolygon<f64>) -> Result<Raster<f64>> {
    let rings: Vec<&LineString<f64>> = mask
        .iter()
        .flat_map(|poly| std::iter::once(poly.exterior()).chain(poly.interiors()))
        .filter(|ring| ring.0.len() >= 4)
        .collect();

    let bbox = match mask.bounding_rect() {
        Some(rect) if !rings.is_empty() => rect,
        _ => {
            return Err(Error::invalid_param(
                "mask",
                format!("{} polygons", mask.0.len()),
                "mask contains no polygon with at least 3 vertices",
            ));
        }
    };

    let (rows, cols) = dem.shape();
    let transform = dem.transform();

    let (c0, r0) = transform.geo_to_pixel(bbox.min().x, bbox.max().y);
    let (c1, r1) = transform.geo_to_pixel(bbox.max().x, bbox.min().y);

    let col_start = c0.min(c1).floor().max(0.0);
    let col_end = c0.max(c1).ceil().min(cols as f64);
    let row_start = r0.min(r1).floor().max(0.0);
    let row_end = r0.max(r1).ceil().min(rows as f64);

    if !(col_start < col_end && row_start < row_end) {
        return Err(Error::Algorithm(format!(
            "mask extent ({:.3}, {:.3}, {:.3}, {:.3}) does not overlap the raster",
            bbox.min().x,
            bbox.min().y,
            bbox.max().x,
            bbox.max().y
        )));
    }

    let (row_off, col_off) = (row_start as usize, col_start as usize);
    let (out_rows, out_cols) = (row_end as usize - row_off, col_end as usize - col_off);
    debug!(
        row_off,
        col_off,
        rows = out_rows,
        cols = out_cols,
        "Cropping raster to mask extent"
    );

    let mut output = dem.window(row_off, col_off, out_rows, out_cols)?;
    let win_transform = *output.transform();

    let row_values: Vec<Vec<f64>> = (0..out_rows)
        .into_par_iter()
        .map(|row| {
            let y = win_transform.pixel_to_geo(0, row).1;
            let crossings = scanline_crossings(&rings, y);

            (0..out_cols)
                .map(|col| {
                    let v = unsafe { output.get_unchecked(row, col) };
                    let x = win_transform.pixel_to_geo(col, row).0;
                    let left = crossings.partition_point(|&cx| cx < x);
                    if left % 2 == 1 && !dem.is_nodata(v) {
                        v
                    } else {
                        f64::NAN
                    }
                })
                .collect()
        })
        .collect();

    for (row, values) in row_values.into_iter().enumerate() {
        for (col, v) in values.into_iter().enumerate() {
            output.set(row, col, v)?;
        }
    }
    output.set_nodata(Some(f64::NAN));

    Ok(output)
}

/// Sorted x positions where the horizontal line at `y` crosses ring edges
fn scanline_crossings(rings: &[&LineString<f64>], y: f64) -> Vec<f64> {
    let mut xs = Vec::new();

    for ring in rings {
        for line in ring.lines() {
            let (a, b): (Coord<f64>, Coord<f64>) = (line.start, line.end);
            // Half-open test so a vertex on the scanline is counted once
            if (a.y > y) != (b.y > y) {
                xs.push(a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y));
            }
        }
    }

    xs.sort_by(|a, b| a.total_cmp(b));
    xs
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Polygon};
    use handflood_core::GeoTransform;

    /// 10x10 raster covering (0,0)-(10,10), value = row * 10 + col
    fn grid() -> Raster<f64> {
        let data: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let mut r = Raster::from_vec(data, 10, 10).unwrap();
        r.set_transform(GeoTransform::new(0.0, 10.0, 1.0, -1.0));
        r
    }

    fn square(x0: f64, y0: f64, x1: f64, y1: f64) -> Polygon<f64> {
        polygon![(x: x0, y: y0), (x: x1, y: y0), (x: x1, y: y1), (x: x0, y: y1), (x: x0, y: y0)]
    }

    #[test]
    fn test_crops_to_mask_extent() {
        let mask = MultiPolygon(vec![square(2.0, 2.0, 6.0, 6.0)]);
        let out = extract_by_mask(&grid(), &mask).unwrap();

        assert_eq!(out.shape(), (4, 4));
        // Top-left cell of the window is source (row 4, col 2)
        assert_eq!(out.get(0, 0).unwrap(), 42.0);
        assert!(out.data().iter().all(|v| !v.is_nan()));
        assert_eq!(out.pixel_to_geo(0, 0), (2.5, 5.5));
    }

    #[test]
    fn test_snaps_outward_to_whole_cells() {
        let mask = MultiPolygon(vec![square(2.4, 2.4, 5.6, 5.6)]);
        let out = extract_by_mask(&grid(), &mask).unwrap();
        assert_eq!(out.shape(), (4, 4));
    }

    #[test]
    fn test_outside_triangle_is_nan() {
        // Right triangle with the hypotenuse from (0,10) to (10,0)
        let tri = polygon![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0), (x: 0.0, y: 10.0), (x: 0.0, y: 0.0)];
        let out = extract_by_mask(&grid(), &MultiPolygon(vec![tri])).unwrap();

        assert_eq!(out.shape(), (10, 10));
        assert!(out.get(0, 9).unwrap().is_nan(), "Top-right is outside");
        assert_eq!(out.get(9, 0).unwrap(), 90.0, "Bottom-left is inside");
        assert!(out.nodata().unwrap().is_nan());
    }

    #[test]
    fn test_hole_is_excluded() {
        let outer = square(0.0, 0.0, 10.0, 10.0);
        let hole = square(4.0, 4.0, 6.0, 6.0);
        let with_hole = Polygon::new(outer.exterior().clone(), vec![hole.exterior().clone()]);

        let out = extract_by_mask(&grid(), &MultiPolygon(vec![with_hole])).unwrap();
        assert!(out.get(4, 4).unwrap().is_nan());
        assert!(out.get(5, 5).unwrap().is_nan());
        assert_eq!(out.get(3, 3).unwrap(), 33.0);
    }

    #[test]
    fn test_source_nodata_stays_nodata() {
        let mut dem = grid();
        dem.set(5, 5, -9999.0).unwrap();
        dem.set_nodata(Some(-9999.0));

        let mask = MultiPolygon(vec![square(0.0, 0.0, 10.0, 10.0)]);
        let out = extract_by_mask(&dem, &mask).unwrap();
        assert!(out.get(5, 5).unwrap().is_nan());
        assert_eq!(out.get(5, 6).unwrap(), 56.0);
    }

    #[test]
    fn test_mask_larger_than_raster() {
        let mask = MultiPolygon(vec![square(-50.0, -50.0, 50.0, 50.0)]);
        let out = extract_by_mask(&grid(), &mask).unwrap();
        assert_eq!(out.shape(), (10, 10));
    }

    #[test]
    fn test_no_overlap_is_error() {
        let mask = MultiPolygon(vec![square(20.0, 20.0, 30.0, 30.0)]);
        let result = extract_by_mask(&grid(), &mask);
        assert!(matches!(result, Err(Error::Algorithm(_))));
    }

    #[test]
    fn test_empty_mask_is_error() {
        let result = extract_by_mask(&grid(), &MultiPolygon(vec![]));
        assert!(matches!(result, Err(Error::InvalidParameter { .. })));
    }
}
