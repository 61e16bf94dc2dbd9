//! Cell vertex placement: centroid of the iso-crossings on the 12 cell edges.

use glam::Vec3A;

/// Corner positions within the unit cell.
/// Corner i = (x=bit0, y=bit1, z=bit2).
pub const CORNER_POSITIONS: [Vec3A; 8] = [
  Vec3A::new(0.0, 0.0, 0.0),
  Vec3A::new(1.0, 0.0, 0.0),
  Vec3A::new(0.0, 1.0, 0.0),
  Vec3A::new(1.0, 1.0, 0.0),
  Vec3A::new(0.0, 0.0, 1.0),
  Vec3A::new(1.0, 0.0, 1.0),
  Vec3A::new(0.0, 1.0, 1.0),
  Vec3A::new(1.0, 1.0, 1.0),
];

/// The 12 cell edges as corner pairs: 4 along X, 4 along Y, 4 along Z.
pub const CELL_EDGES: [[usize; 2]; 12] = [
  [0, 1],
  [2, 3],
  [4, 5],
  [6, 7],
  [0, 2],
  [1, 3],
  [4, 6],
  [5, 7],
  [0, 4],
  [1, 5],
  [2, 6],
  [3, 7],
];

/// Bit `i` set when corner `i` is inside (`value < iso`).
#[inline]
pub fn inside_mask(corners: &[f32; 8], iso: f32) -> u8 {
  corners
    .iter()
    .enumerate()
    .fold(0u8, |mask, (i, &v)| if v < iso { mask | (1 << i) } else { mask })
}

/// `true` when the cell straddles the iso-surface.
#[inline]
pub fn is_surface_cell(mask: u8) -> bool {
  mask != 0 && mask != 0xFF
}

/// Vertex offset within the unit cell for the given corner values.
///
/// Crossings on each edge are linearly interpolated:
/// `t = (s0 - iso) / (s0 - s1)`. Cells without a crossing return the centre.
#[inline]
pub fn cell_vertex_offset(corners: &[f32; 8], iso: f32) -> Vec3A {
  let mut sum = Vec3A::ZERO;
  let mut count = 0u32;

  for &[c0, c1] in &CELL_EDGES {
    let s0 = corners[c0] - iso;
    let s1 = corners[c1] - iso;
    if (s0 < 0.0) == (s1 < 0.0) {
      continue;
    }
    let denom = s0 - s1;
    let t = if denom.abs() > f32::EPSILON {
      (s0 / denom).clamp(0.0, 1.0)
    } else {
      0.5
    };
    let p0 = CORNER_POSITIONS[c0];
    sum += p0 + t * (CORNER_POSITIONS[c1] - p0);
    count += 1;
  }

  if count == 0 {
    return Vec3A::splat(0.5);
  }
  sum / count as f32
}

#[cfg(test)]
#[path = "vertex_calc_test.rs"]
mod vertex_calc_test;
