//! The three mesher kernels.
//!
//! ```text
//!   ClearCells            1D over cells   cell_vertex[i] = NO_VERTEX
//!   BuildSurfaceVertices  3D over cells   one vertex per surface cell
//!   BuildSurfaceIndices   3D over cells   one quad per sign-changing edge
//! ```
//!
//! Quads are emitted for the three edges leaving a cell's min corner. The
//! four cells sharing the edge along `axis` at `pos` are
//!
//! ```text
//!        v
//!        ▲
//!   c ───┼─── a        a = pos
//!   │    │    │        b = pos - u - v
//!  ─┼────●────┼─▶ u    c = pos - u
//!   │    │    │        d = pos - v
//!   b ───┼─── d
//! ```
//!
//! with `u = (axis + 1) % 3`, `v = (axis + 2) % 3`. The quad is split along its
//! shorter diagonal and wound so that the right-hand normal faces the
//! positive side of the field.

use glam::{UVec3, Vec3, Vec4};

use super::buffers::{MeshBuffers, INDEX_COUNTER, VERTEX_COUNTER};
use super::gradient::surface_normal;
use super::vertex_calc::{cell_vertex_offset, inside_mask, is_surface_cell};
use crate::compute::{dispatch_1d, dispatch_cube, ColorTexture, VolumeTexture};
use crate::constants::{coord_to_index, CORNER_OFFSETS, INDICES_PER_QUAD, NO_VERTEX};
use crate::definition::VolumeDefinition;

/// Per-dispatch constants.
#[derive(Clone, Copy, Debug)]
pub struct MeshParams {
  pub cell_resolution: u32,
  pub iso: f32,
  pub bounds_min: Vec3,
  pub voxel_extent: Vec3,
}

impl MeshParams {
  pub fn new(definition: &VolumeDefinition) -> Self {
    Self {
      cell_resolution: definition.cell_resolution(),
      iso: definition.normalized_iso(),
      bounds_min: definition.bounds_min(),
      voxel_extent: definition.voxel_extent(),
    }
  }

  /// Continuous voxel coordinates to volume-local position.
  #[inline]
  pub fn voxel_to_local(&self, p: Vec3) -> Vec3 {
    self.bounds_min + (p + 0.5) * self.voxel_extent
  }

  #[inline]
  fn cell_index(&self, x: u32, y: u32, z: u32) -> usize {
    coord_to_index(x, y, z, self.cell_resolution)
  }
}

#[inline]
fn load_corners(texture: &VolumeTexture, x: u32, y: u32, z: u32) -> [f32; 8] {
  CORNER_OFFSETS.map(|[dx, dy, dz]| texture.load(x + dx, y + dy, z + dz))
}

/// `ClearCells`: reset the lookup and the counters.
pub fn clear_cells(buffers: &MeshBuffers) {
  buffers.reset_counters();
  let lookup = &buffers.cell_vertex;
  dispatch_1d(lookup.len(), |i| lookup.store(i, NO_VERTEX));
}

/// `BuildSurfaceVertices`.
pub fn build_surface_vertices(
  buffers: &MeshBuffers,
  params: &MeshParams,
  texture: &VolumeTexture,
  color: Option<&ColorTexture>,
) {
  let capacity = buffers.vertex_capacity();
  dispatch_cube(params.cell_resolution, |[x, y, z]| {
    let corners = load_corners(texture, x, y, z);
    if !is_surface_cell(inside_mask(&corners, params.iso)) {
      return;
    }

    let id = buffers.counters.fetch_add(VERTEX_COUNTER, 1) as usize;
    if id >= capacity {
      return;
    }

    let p = UVec3::new(x, y, z).as_vec3() + Vec3::from(cell_vertex_offset(&corners, params.iso));
    let position = params.voxel_to_local(p);
    let normal = surface_normal(texture, p, &corners, params.voxel_extent);
    let vertex_color = buffers
      .has_colors()
      .then(|| color.map_or(Vec4::ONE, |c| c.sample_trilinear(p)));

    buffers.write_vertex(id, position, normal, vertex_color);
    buffers.cell_vertex.store(params.cell_index(x, y, z), id as u32);
  });
}

/// Triangle order for the quad `(a, b, c, d)`.
#[inline]
pub(crate) fn quad_indices(quad: [u32; 4], split_ab: bool, flip: bool) -> [u32; 6] {
  let [a, b, c, d] = quad;
  match (split_ab, flip) {
    (true, false) => [a, b, d, a, c, b],
    (true, true) => [a, d, b, a, b, c],
    (false, false) => [c, b, d, c, d, a],
    (false, true) => [c, d, b, c, a, d],
  }
}

/// `BuildSurfaceIndices`.
pub fn build_surface_indices(buffers: &MeshBuffers, params: &MeshParams, texture: &VolumeTexture) {
  let capacity = buffers.index_capacity();
  dispatch_cube(params.cell_resolution, |[x, y, z]| {
    let pos = [x, y, z];
    let inside0 = texture.load(x, y, z) < params.iso;

    for axis in 0..3 {
      let mut far_corner = pos;
      far_corner[axis] += 1;
      let inside1 = texture.load(far_corner[0], far_corner[1], far_corner[2]) < params.iso;
      if inside0 == inside1 {
        continue;
      }

      let u = (axis + 1) % 3;
      let v = (axis + 2) % 3;
      if pos[u] == 0 || pos[v] == 0 {
        continue;
      }

      let mut pos_b = pos;
      pos_b[u] -= 1;
      pos_b[v] -= 1;
      let mut pos_c = pos;
      pos_c[u] -= 1;
      let mut pos_d = pos;
      pos_d[v] -= 1;

      let quad = [pos, pos_b, pos_c, pos_d]
        .map(|[cx, cy, cz]| buffers.cell_vertex.load(params.cell_index(cx, cy, cz)));
      if quad.contains(&NO_VERTEX) {
        continue;
      }

      let [a, b, c, d] = quad.map(|id| buffers.position(id as usize));
      let split_ab = a.distance_squared(b) < c.distance_squared(d);
      let indices = quad_indices(quad, split_ab, !inside0);

      let base = buffers.counters.fetch_add(INDEX_COUNTER, INDICES_PER_QUAD as u32) as usize;
      if base + INDICES_PER_QUAD > capacity {
        continue;
      }
      for (i, index) in indices.into_iter().enumerate() {
        buffers.indices.store(base + i, index);
      }
    }
  });
}

#[cfg(test)]
#[path = "kernels_test.rs"]
mod kernels_test;
