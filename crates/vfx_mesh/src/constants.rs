//! Grid layout constants and index math for runtime-sized cubic volumes.
//!
//! # Memory Layout
//!
//! ```text
//! Volume memory layout (row-major, Z innermost):
//!
//! Address:  0       1       ...  res-1     res     ...
//! Content: [0,0,0] [0,0,1]  ...  [0,0,r-1] [0,1,0] ...
//!          └────────── Z ──────────────┘
//!
//! index = (x * res + y) * res + z
//! ```
//!
//! # Voxels and cells
//!
//! ```text
//!   voxel (i,j,k)  = one sample, located at the texel centre
//!   cell  (i,j,k)  = cube spanned by voxels (i..=i+1, j..=j+1, k..=k+1)
//!
//!   res voxels per axis  ->  res - 1 cells per axis
//! ```
//!
//! # Coordinate System
//!
//! ```text
//! Cell corner indices (binary: ZYX):
//!   0 = (0,0,0)    4 = (0,0,1)
//!   1 = (1,0,0)    5 = (1,0,1)
//!   2 = (0,1,0)    6 = (0,1,1)
//!   3 = (1,1,0)    7 = (1,1,1)
//! ```

/// Smallest grid resolution a definition may request.
pub const GRID_RESOLUTION_MIN: u32 = 32;
/// Largest grid resolution a definition may request.
pub const GRID_RESOLUTION_MAX: u32 = 192;
/// Default grid resolution for all generators.
pub const GRID_RESOLUTION_DEFAULT: u32 = 96;

/// Narrower resolution range accepted by the splat generators.
pub const SPLAT_RESOLUTION_MIN: u32 = 64;
pub const SPLAT_RESOLUTION_MAX: u32 = 160;

/// Minimum extent of any bounds axis and minimum far distance.
pub const MIN_EXTENT: f32 = 0.01;

/// Maximum number of depth views packed into one dispatch.
pub const MAX_DEPTH_VIEWS: usize = 6;

/// Lookup-table sentinel for "this cell claimed no vertex".
pub const NO_VERTEX: u32 = u32::MAX;

/// Indices emitted per quad (two triangles).
pub const INDICES_PER_QUAD: usize = 6;

/// Largest vertex count addressable by 16-bit indices.
pub const MAX_U16_VERTICES: usize = u16::MAX as usize;

/// Thread group size of 1D kernels.
pub const THREADS_1D: usize = 256;
/// Thread group edge of 3D kernels (8x8x8 groups).
pub const THREADS_3D: usize = 8;

/// Corner offsets for a unit cube.
/// Order matches corner index bits: corner i = (x=bit0, y=bit1, z=bit2)
pub const CORNER_OFFSETS: [[u32; 3]; 8] = [
  [0, 0, 0], // 0
  [1, 0, 0], // 1
  [0, 1, 0], // 2
  [1, 1, 0], // 3
  [0, 0, 1], // 4
  [1, 0, 1], // 5
  [0, 1, 1], // 6
  [1, 1, 1], // 7
];

/// Convert 3D coordinates to a linear index in a cube of edge `res`.
#[inline(always)]
pub const fn coord_to_index(x: u32, y: u32, z: u32, res: u32) -> usize {
  ((x as usize * res as usize) + y as usize) * res as usize + z as usize
}

/// Convert a linear index back to 3D coordinates in a cube of edge `res`.
#[inline(always)]
pub const fn index_to_coord(index: usize, res: u32) -> [u32; 3] {
  let res = res as usize;
  let z = index % res;
  let y = (index / res) % res;
  let x = index / (res * res);
  [x as u32, y as u32, z as u32]
}

/// Number of cells along one axis of a grid with `res` voxels.
#[inline(always)]
pub const fn cell_resolution(res: u32) -> u32 {
  if res > 1 {
    res - 1
  } else {
    1
  }
}

/// Total voxel count of a cube with edge `res`.
#[inline(always)]
pub const fn voxel_count(res: u32) -> usize {
  let res = res as usize;
  res * res * res
}

#[cfg(test)]
#[path = "constants_test.rs"]
mod constants_test;
