//! Region properties of labeled objects.
//!
//! Measurements are taken per label on the label's bounding-box crop, with
//! every pixel of another label treated as background:
//!
//! - **Holes** are 4-connected background components of the crop that do not
//!   reach its border, which is the dual connectivity of 8-connected objects.
//! - **Filled area** is the object area plus the area of its holes.
//! - **Euler number** is `components - holes`.
//! - **Perimeter** weights each boundary pixel by the configuration of its
//!   boundary neighbors (1 for straight runs, √2 for diagonal steps,
//!   (1 + √2) / 2 for corners).
//! - **Minor axis length** is that of the ellipse with the same second
//!   central moments as the object.

use std::collections::VecDeque;
use std::f64::consts::SQRT_2;

use super::labels::{Connectivity, LabelMap};

// =============================================================================
// Bounding Box
// =============================================================================

/// Half-open pixel bounding box in `(row, col)` convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min_row: u32,
    pub min_col: u32,
    /// One past the last row
    pub max_row: u32,
    /// One past the last column
    pub max_col: u32,
}

impl BoundingBox {
    pub fn width(&self) -> u32 {
        self.max_col - self.min_col
    }

    pub fn height(&self) -> u32 {
        self.max_row - self.min_row
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }
}

// =============================================================================
// Region Properties
// =============================================================================

/// Measurements of one labeled object.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionProps {
    /// Label of the object in the source map
    pub label: u32,

    /// Tight bounding box
    pub bbox: BoundingBox,

    /// Number of pixels carrying the label
    pub area: u64,

    /// Area with interior holes counted as part of the object
    pub filled_area: u64,

    /// Boundary length in pixels
    pub perimeter: f64,

    /// Length of the minor axis of the equivalent ellipse
    pub minor_axis_length: f64,

    /// Connected components minus holes; `< 1` means the object has a hole
    pub euler_number: i64,

    /// Center of mass as `(row, col)`
    pub centroid: (f64, f64),
}

impl RegionProps {
    /// True if the object encloses at least one hole.
    pub fn has_hole(&self) -> bool {
        self.euler_number < 1
    }
}

/// Per-label running sums gathered in the first pass.
#[derive(Clone)]
struct Accumulator {
    count: u64,
    min_row: u32,
    min_col: u32,
    max_row: u32,
    max_col: u32,
    sum_r: f64,
    sum_c: f64,
    sum_rr: f64,
    sum_cc: f64,
    sum_rc: f64,
}

impl Default for Accumulator {
    fn default() -> Self {
        Self {
            count: 0,
            min_row: u32::MAX,
            min_col: u32::MAX,
            max_row: 0,
            max_col: 0,
            sum_r: 0.0,
            sum_c: 0.0,
            sum_rr: 0.0,
            sum_cc: 0.0,
            sum_rc: 0.0,
        }
    }
}

/// Compute the properties of every label present in the map, ordered by label.
pub fn region_props(labels: &LabelMap) -> Vec<RegionProps> {
    let (width, height) = labels.dimensions();
    let mut acc = vec![Accumulator::default(); labels.max_label() as usize + 1];

    for y in 0..height {
        for x in 0..width {
            let l = labels.get(x, y);
            if l == 0 {
                continue;
            }
            let a = &mut acc[l as usize];
            let (r, c) = (y as f64, x as f64);
            a.count += 1;
            a.min_row = a.min_row.min(y);
            a.min_col = a.min_col.min(x);
            a.max_row = a.max_row.max(y + 1);
            a.max_col = a.max_col.max(x + 1);
            a.sum_r += r;
            a.sum_c += c;
            a.sum_rr += r * r;
            a.sum_cc += c * c;
            a.sum_rc += r * c;
        }
    }

    acc.iter()
        .enumerate()
        .filter(|(l, a)| *l > 0 && a.count > 0)
        .map(|(l, a)| measure(labels, l as u32, a))
        .collect()
}

fn measure(labels: &LabelMap, label: u32, a: &Accumulator) -> RegionProps {
    let bbox = BoundingBox {
        min_row: a.min_row,
        min_col: a.min_col,
        max_row: a.max_row,
        max_col: a.max_col,
    };
    let crop = Crop::new(labels, label, &bbox);
    let topology = crop.topology();

    let n = a.count as f64;
    let mean_r = a.sum_r / n;
    let mean_c = a.sum_c / n;
    let var_r = a.sum_rr / n - mean_r * mean_r;
    let var_c = a.sum_cc / n - mean_c * mean_c;
    let cov = a.sum_rc / n - mean_r * mean_c;

    RegionProps {
        label,
        bbox,
        area: a.count,
        filled_area: a.count + topology.hole_pixels,
        perimeter: crop.perimeter(),
        minor_axis_length: minor_axis(var_r, var_c, cov),
        euler_number: topology.components as i64 - topology.holes as i64,
        centroid: (mean_r, mean_c),
    }
}

/// Minor axis of the ellipse with the given second central moments.
fn minor_axis(var_r: f64, var_c: f64, cov: f64) -> f64 {
    let half_sum = (var_r + var_c) / 2.0;
    let spread = (((var_r - var_c) / 2.0).powi(2) + cov * cov).sqrt();
    4.0 * (half_sum - spread).max(0.0).sqrt()
}

// =============================================================================
// Bounding-box crop
// =============================================================================

struct Topology {
    components: u64,
    holes: u64,
    hole_pixels: u64,
}

/// Binary crop of one label, padded by one background pixel on every side.
struct Crop {
    width: usize,
    height: usize,
    pixels: Vec<bool>,
}

impl Crop {
    fn new(labels: &LabelMap, label: u32, bbox: &BoundingBox) -> Self {
        let width = bbox.width() as usize + 2;
        let height = bbox.height() as usize + 2;
        let mut pixels = vec![false; width * height];
        for y in bbox.min_row..bbox.max_row {
            for x in bbox.min_col..bbox.max_col {
                if labels.get(x, y) == label {
                    let cy = (y - bbox.min_row) as usize + 1;
                    let cx = (x - bbox.min_col) as usize + 1;
                    pixels[cy * width + cx] = true;
                }
            }
        }
        Self {
            width,
            height,
            pixels,
        }
    }

    #[inline]
    fn at(&self, x: i64, y: i64) -> bool {
        x >= 0
            && y >= 0
            && (x as usize) < self.width
            && (y as usize) < self.height
            && self.pixels[y as usize * self.width + x as usize]
    }

    /// Flood every not-yet-visited component of pixels equal to `value`,
    /// returning their sizes.
    fn components(&self, value: bool, connectivity: Connectivity, visited: &mut [bool]) -> Vec<u64> {
        let mut sizes = Vec::new();
        let mut queue = VecDeque::new();
        for start in 0..self.pixels.len() {
            if visited[start] || self.pixels[start] != value {
                continue;
            }
            visited[start] = true;
            queue.push_back(start);
            let mut size = 0u64;
            while let Some(idx) = queue.pop_front() {
                size += 1;
                let (x, y) = ((idx % self.width) as i64, (idx / self.width) as i64);
                for &(dx, dy) in connectivity.offsets() {
                    let (nx, ny) = (x + dx, y + dy);
                    if nx < 0 || ny < 0 || nx as usize >= self.width || ny as usize >= self.height {
                        continue;
                    }
                    let n = ny as usize * self.width + nx as usize;
                    if !visited[n] && self.pixels[n] == value {
                        visited[n] = true;
                        queue.push_back(n);
                    }
                }
            }
            sizes.push(size);
        }
        sizes
    }

    fn topology(&self) -> Topology {
        let mut visited = vec![false; self.pixels.len()];
        let components = self.components(true, Connectivity::Eight, &mut visited).len() as u64;

        // The padding guarantees pixel 0 belongs to the outer background
        let mut background_visited = vec![false; self.pixels.len()];
        self.flood_outer(&mut background_visited);
        let holes = self.components(false, Connectivity::Four, &mut background_visited);

        Topology {
            components,
            holes: holes.len() as u64,
            hole_pixels: holes.iter().sum(),
        }
    }

    /// Mark the background component touching the padded border.
    fn flood_outer(&self, visited: &mut [bool]) {
        let mut queue = VecDeque::from([0usize]);
        visited[0] = true;
        while let Some(idx) = queue.pop_front() {
            let (x, y) = ((idx % self.width) as i64, (idx / self.width) as i64);
            for &(dx, dy) in Connectivity::Four.offsets() {
                let (nx, ny) = (x + dx, y + dy);
                if nx < 0 || ny < 0 || nx as usize >= self.width || ny as usize >= self.height {
                    continue;
                }
                let n = ny as usize * self.width + nx as usize;
                if !visited[n] && !self.pixels[n] {
                    visited[n] = true;
                    queue.push_back(n);
                }
            }
        }
    }

    /// Weighted boundary length.
    fn perimeter(&self) -> f64 {
        let w = self.width as i64;
        let h = self.height as i64;

        // Boundary pixels: object pixels with a 4-neighbor outside the object
        let mut border = vec![false; self.pixels.len()];
        for y in 0..h {
            for x in 0..w {
                if self.at(x, y) {
                    border[(y * w + x) as usize] = Connectivity::Four
                        .offsets()
                        .iter()
                        .any(|&(dx, dy)| !self.at(x + dx, y + dy));
                }
            }
        }

        let is_border = |x: i64, y: i64| x >= 0 && y >= 0 && x < w && y < h && border[(y * w + x) as usize];

        let mut total = 0.0;
        for y in 0..h {
            for x in 0..w {
                if !is_border(x, y) {
                    continue;
                }
                let edges = [(0, -1), (-1, 0), (1, 0), (0, 1)]
                    .iter()
                    .filter(|&&(dx, dy)| is_border(x + dx, y + dy))
                    .count();
                let diagonals = [(-1, -1), (1, -1), (-1, 1), (1, 1)]
                    .iter()
                    .filter(|&&(dx, dy)| is_border(x + dx, y + dy))
                    .count();
                total += perimeter_weight(1 + 2 * edges + 10 * diagonals);
            }
        }
        total
    }
}

/// Contribution of a boundary pixel given its neighborhood code
/// `1 + 2 * (edge neighbors) + 10 * (diagonal neighbors)`.
fn perimeter_weight(code: usize) -> f64 {
    match code {
        5 | 7 | 15 | 17 | 25 | 27 => 1.0,
        21 | 33 => SQRT_2,
        13 | 23 => (1.0 + SQRT_2) / 2.0,
        _ => 0.0,
    }
}

// =============================================================================
// Tests
// =============================================================================
