//! Fixed-capacity mesh arenas written by the mesher kernels.
//!
//! ```text
//!   cell_vertex  [cell_count]       cell -> vertex id, NO_VERTEX when empty
//!   counters     [2]                (vertex_count, index_count)
//!   positions    [cell_count * 3]   volume-local xyz
//!   normals      [cell_count * 3]
//!   colors       [cell_count * 4]   optional rgba
//!   indices      [cell_count * 6]
//! ```
//!
//! Kernels claim slots with an atomic increment-and-fetch on the counters;
//! a claim past capacity is dropped, so counters may exceed capacity and are
//! clamped on readback.

use glam::{Vec3, Vec4};

use crate::compute::{FloatBuffer, U32Buffer};
use crate::constants::{INDICES_PER_QUAD, NO_VERTEX};
use crate::error::{SdfError, SdfResult};

pub(crate) const VERTEX_COUNTER: usize = 0;
pub(crate) const INDEX_COUNTER: usize = 1;

pub struct MeshBuffers {
  pub(crate) cell_vertex: U32Buffer,
  pub(crate) counters: U32Buffer,
  pub(crate) positions: FloatBuffer,
  pub(crate) normals: FloatBuffer,
  pub(crate) colors: Option<FloatBuffer>,
  pub(crate) indices: U32Buffer,
  cell_count: usize,
}

impl MeshBuffers {
  /// Allocate arenas for `cell_count` cells.
  pub fn allocate(cell_count: usize, with_colors: bool) -> SdfResult<Self> {
    let scaled = |factor: usize, what: &'static str| {
      cell_count
        .checked_mul(factor)
        .ok_or(SdfError::ResourceExhausted {
          what,
          requested: usize::MAX,
        })
    };
    Ok(Self {
      cell_vertex: U32Buffer::new(cell_count, NO_VERTEX, "cell vertex lookup")?,
      counters: U32Buffer::new(2, 0, "mesh counters")?,
      positions: FloatBuffer::new(scaled(3, "vertex positions")?, "vertex positions")?,
      normals: FloatBuffer::new(scaled(3, "vertex normals")?, "vertex normals")?,
      colors: if with_colors {
        Some(FloatBuffer::new(scaled(4, "vertex colors")?, "vertex colors")?)
      } else {
        None
      },
      indices: U32Buffer::new(scaled(INDICES_PER_QUAD, "indices")?, 0, "indices")?,
      cell_count,
    })
  }

  #[inline]
  pub fn cell_count(&self) -> usize {
    self.cell_count
  }

  #[inline]
  pub fn vertex_capacity(&self) -> usize {
    self.cell_count
  }

  #[inline]
  pub fn index_capacity(&self) -> usize {
    self.indices.len()
  }

  #[inline]
  pub fn has_colors(&self) -> bool {
    self.colors.is_some()
  }

  pub(crate) fn reset_counters(&self) {
    self.counters.fill(0);
  }

  /// Raw `(vertex_count, index_count)` as written by the kernels.
  pub fn read_counters(&self) -> (u32, u32) {
    (
      self.counters.load(VERTEX_COUNTER),
      self.counters.load(INDEX_COUNTER),
    )
  }

  /// Counters clamped to capacity.
  pub fn clamped_counts(&self) -> (usize, usize) {
    let (vertices, indices) = self.read_counters();
    (
      (vertices as usize).min(self.vertex_capacity()),
      (indices as usize).min(self.index_capacity()),
    )
  }

  /// Vertex id claimed by a cell, if any.
  pub fn cell_vertex(&self, cell: usize) -> Option<u32> {
    let id = self.cell_vertex.load(cell);
    (id != NO_VERTEX).then_some(id)
  }

  pub(crate) fn write_vertex(&self, id: usize, position: Vec3, normal: Vec3, color: Option<Vec4>) {
    let b = id * 3;
    for (i, v) in position.to_array().into_iter().enumerate() {
      self.positions.store(b + i, v);
    }
    for (i, v) in normal.to_array().into_iter().enumerate() {
      self.normals.store(b + i, v);
    }
    if let (Some(colors), Some(color)) = (&self.colors, color) {
      for (i, v) in color.to_array().into_iter().enumerate() {
        colors.store(id * 4 + i, v);
      }
    }
  }

  #[inline]
  pub fn position(&self, id: usize) -> Vec3 {
    let b = id * 3;
    Vec3::new(
      self.positions.load(b),
      self.positions.load(b + 1),
      self.positions.load(b + 2),
    )
  }

  pub fn read_positions(&self, count: usize) -> Vec<Vec3> {
    read_vec3(&self.positions, count.min(self.vertex_capacity()))
  }

  pub fn read_normals(&self, count: usize) -> Vec<Vec3> {
    read_vec3(&self.normals, count.min(self.vertex_capacity()))
  }

  pub fn read_colors(&self, count: usize) -> Option<Vec<Vec4>> {
    let colors = self.colors.as_ref()?;
    let raw = colors.read_prefix(count.min(self.vertex_capacity()) * 4);
    Some(raw.chunks_exact(4).map(Vec4::from_slice).collect())
  }

  pub fn read_indices(&self, count: usize) -> Vec<u32> {
    self.indices.read_prefix(count.min(self.index_capacity()))
  }
}

fn read_vec3(buffer: &FloatBuffer, count: usize) -> Vec<Vec3> {
  buffer
    .read_prefix(count * 3)
    .chunks_exact(3)
    .map(Vec3::from_slice)
    .collect()
}
