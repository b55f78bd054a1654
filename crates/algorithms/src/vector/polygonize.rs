//! Raster to polygon conversion
//!
//! Cells holding the target value are grouped into 4-connected regions.
//! Every region is outlined by tracing its cell edges: each cell edge that
//! borders a cell outside the region becomes a directed boundary edge with
//! the region on its right (in grid coordinates, y pointing down), and the
//! edges are chained into closed rings. Where two region cells touch only
//! at a corner the trace turns right, staying with the cell it came from,
//! so diagonal contacts never merge rings.
//!
//! In grid coordinates the outer ring of a region has positive shoelace
//! area and every hole ring negative. Vertices along straight runs of edges
//! are merged. The output polygons are oriented with counter-clockwise
//! exteriors in map coordinates.

use std::collections::HashMap;

use geo::orient::{Direction, Orient};
use geo::{Coord, LineString, Polygon};
use handflood_core::raster::{GeoTransform, Raster};
use handflood_core::{Error, Result};

/// Parameters for polygonization
#[derive(Debug, Clone)]
pub struct PolygonizeParams {
    /// Cell value that forms the polygons
    pub value: u8,
}

impl Default for PolygonizeParams {
    fn default() -> Self {
        Self { value: 1 }
    }
}

/// Grid corner: (x, y) = (column, row) of the cell corner
type Vertex = (usize, usize);

#[derive(Debug, Clone, Copy)]
struct Edge {
    from: Vertex,
    to: Vertex,
}

impl Edge {
    fn direction(&self) -> (isize, isize) {
        (
            self.to.0 as isize - self.from.0 as isize,
            self.to.1 as isize - self.from.1 as isize,
        )
    }
}

/// Preference of turning from `heading` onto `next`: right, straight, left
fn turn_rank(heading: (isize, isize), next: (isize, isize)) -> u8 {
    let right = (-heading.1, heading.0);
    let left = (heading.1, -heading.0);
    if next == right {
        0
    } else if next == heading {
        1
    } else if next == left {
        2
    } else {
        3
    }
}

/// Convert the cells of `raster` equal to `params.value` into polygons.
///
/// One polygon per 4-connected region, in row-major order of each
/// region's first cell. Coordinates are map coordinates of cell corners.
pub fn polygonize(raster: &Raster<u8>, params: PolygonizeParams) -> Result<Vec<Polygon<f64>>> {
    let (rows, cols) = raster.shape();
    let value = params.value;
    let inside = |row: usize, col: usize| unsafe { raster.get_unchecked(row, col) } == value;

    let mut seen = vec![false; rows * cols];
    let mut polygons = Vec::new();

    for start_row in 0..rows {
        for start_col in 0..cols {
            if seen[start_row * cols + start_col] || !inside(start_row, start_col) {
                continue;
            }

            // Flood the 4-connected region
            let mut cells = Vec::new();
            let mut stack = vec![(start_row, start_col)];
            seen[start_row * cols + start_col] = true;

            while let Some((row, col)) = stack.pop() {
                cells.push((row, col));

                let mut visit = |r: usize, c: usize| {
                    if !seen[r * cols + c] && inside(r, c) {
                        seen[r * cols + c] = true;
                        stack.push((r, c));
                    }
                };
                if row > 0 {
                    visit(row - 1, col);
                }
                if row + 1 < rows {
                    visit(row + 1, col);
                }
                if col > 0 {
                    visit(row, col - 1);
                }
                if col + 1 < cols {
                    visit(row, col + 1);
                }
            }

            // Row-major order puts the region's top-left cell first, whose
            // top edge always lies on the outer ring
            cells.sort_unstable();

            let edges = boundary_edges(&cells, rows, cols, &inside);
            let rings = trace_rings(&edges)?;
            polygons.push(assemble(rings, raster.transform())?);
        }
    }

    Ok(polygons)
}

/// Directed boundary edges of a region, region on the right
fn boundary_edges(
    cells: &[(usize, usize)],
    rows: usize,
    cols: usize,
    inside: &impl Fn(usize, usize) -> bool,
) -> Vec<Edge> {
    let mut edges = Vec::with_capacity(cells.len() * 2);

    for &(r, c) in cells {
        if r == 0 || !inside(r - 1, c) {
            edges.push(Edge { from: (c, r), to: (c + 1, r) });
        }
        if c + 1 == cols || !inside(r, c + 1) {
            edges.push(Edge { from: (c + 1, r), to: (c + 1, r + 1) });
        }
        if r + 1 == rows || !inside(r + 1, c) {
            edges.push(Edge { from: (c + 1, r + 1), to: (c, r + 1) });
        }
        if c == 0 || !inside(r, c - 1) {
            edges.push(Edge { from: (c, r + 1), to: (c, r) });
        }
    }

    edges
}

/// Chain directed edges into closed rings of grid vertices (not repeated
/// at the end).
fn trace_rings(edges: &[Edge]) -> Result<Vec<Vec<Vertex>>> {
    let mut outgoing: HashMap<Vertex, Vec<usize>> = HashMap::with_capacity(edges.len());
    for (idx, edge) in edges.iter().enumerate() {
        outgoing.entry(edge.from).or_default().push(idx);
    }

    let mut used = vec![false; edges.len()];
    let mut rings = Vec::new();

    for start in 0..edges.len() {
        if used[start] {
            continue;
        }
        used[start] = true;

        let mut ring = vec![edges[start].from];
        let mut current = start;

        loop {
            let heading = edges[current].direction();
            let vertex = edges[current].to;

            let next = outgoing
                .get(&vertex)
                .into_iter()
                .flatten()
                .copied()
                .filter(|&idx| !used[idx] || idx == start)
                .min_by_key(|&idx| turn_rank(heading, edges[idx].direction()))
                .ok_or_else(|| {
                    Error::Algorithm(format!("open boundary at grid vertex {:?}", vertex))
                })?;

            if next == start {
                break;
            }
            used[next] = true;
            ring.push(vertex);
            current = next;
        }

        rings.push(merge_collinear(&ring));
    }

    Ok(rings)
}

/// Drop vertices where the ring continues straight on
fn merge_collinear(ring: &[Vertex]) -> Vec<Vertex> {
    let n = ring.len();
    let step = |a: Vertex, b: Vertex| {
        (
            (b.0 as isize - a.0 as isize).signum(),
            (b.1 as isize - a.1 as isize).signum(),
        )
    };

    (0..n)
        .filter(|&i| {
            let prev = ring[(i + n - 1) % n];
            let next = ring[(i + 1) % n];
            step(prev, ring[i]) != step(ring[i], next)
        })
        .map(|i| ring[i])
        .collect()
}

/// Twice the signed shoelace area in grid coordinates
fn signed_area2(ring: &[Vertex]) -> i64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let (x0, y0) = ring[i];
            let (x1, y1) = ring[(i + 1) % n];
            x0 as i64 * y1 as i64 - x1 as i64 * y0 as i64
        })
        .sum()
}

fn to_map(ring: &[Vertex], transform: &GeoTransform) -> LineString<f64> {
    let mut coords: Vec<Coord<f64>> = ring
        .iter()
        .map(|&(x, y)| {
            let (gx, gy) = transform.pixel_to_geo_f(x as f64, y as f64);
            Coord { x: gx, y: gy }
        })
        .collect();
    if let Some(&first) = coords.first() {
        coords.push(first);
    }
    LineString::new(coords)
}

fn assemble(rings: Vec<Vec<Vertex>>, transform: &GeoTransform) -> Result<Polygon<f64>> {
    let mut exterior = None;
    let mut interiors = Vec::new();

    for ring in rings {
        if signed_area2(&ring) > 0 {
            if exterior.is_some() {
                return Err(Error::Algorithm(
                    "region traced to more than one outer ring".into(),
                ));
            }
            exterior = Some(to_map(&ring, transform));
        } else {
            interiors.push(to_map(&ring, transform));
        }
    }

    let exterior =
        exterior.ok_or_else(|| Error::Algorithm("region has no outer ring".into()))?;
    Ok(Polygon::new(exterior, interiors).orient(Direction::Default))
}
