//! On-demand mesh capture: read the live arenas back and compact them into a
//! standalone mesh.
//!
//! ```text
//!   counters ─▶ clamp to capacity, index_count rounded down to 3
//!   indices  ─▶ first-seen remap ─▶ used vertices only
//!   ≤ 65535 used vertices ─▶ 16-bit indices, else 32-bit
//! ```

use glam::{Vec3, Vec4};

use crate::constants::MAX_U16_VERTICES;
use crate::error::CaptureError;
use crate::mesher::{DualContouringMesher, MeshBuffers};
use crate::types::MinMaxAABB;

/// Index buffer in the narrowest format that fits.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MeshIndices {
  U16(Vec<u16>),
  U32(Vec<u32>),
}

impl MeshIndices {
  pub fn len(&self) -> usize {
    match self {
      MeshIndices::U16(v) => v.len(),
      MeshIndices::U32(v) => v.len(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn get(&self, i: usize) -> Option<u32> {
    match self {
      MeshIndices::U16(v) => v.get(i).map(|&x| x as u32),
      MeshIndices::U32(v) => v.get(i).copied(),
    }
  }

  pub fn iter(&self) -> impl Iterator<Item = u32> + '_ {
    (0..self.len()).filter_map(move |i| self.get(i))
  }

  pub fn is_u16(&self) -> bool {
    matches!(self, MeshIndices::U16(_))
  }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CaptureStats {
  /// Vertex count read back, clamped to capacity.
  pub raw_vertex_count: usize,
  /// Index count read back, clamped and rounded down to whole triangles.
  pub raw_index_count: usize,
  /// Vertices referenced by at least one index.
  pub used_vertex_count: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CapturedMesh {
  pub positions: Vec<Vec3>,
  pub normals: Vec<Vec3>,
  pub colors: Option<Vec<Vec4>>,
  pub indices: MeshIndices,
  /// Bounds of the kept positions; zero-sized at the origin when empty.
  pub bounds: MinMaxAABB,
  pub stats: CaptureStats,
}

impl CapturedMesh {
  pub fn triangle_count(&self) -> usize {
    self.indices.len() / 3
  }
}

/// Capture the mesher's visible mesh. A hidden mesh captures as empty even
/// though the arenas still hold the previous remesh.
pub fn capture(mesher: &DualContouringMesher) -> Result<CapturedMesh, CaptureError> {
  let buffers = mesher.buffers().ok_or(CaptureError::NoResources)?;
  let (vertex_count, index_count) = mesher.visible_counts();
  capture_prefix(buffers, vertex_count, index_count)
}

/// Capture straight from mesh arenas, trusting their counters.
pub fn capture_buffers(buffers: &MeshBuffers) -> Result<CapturedMesh, CaptureError> {
  let (vertex_count, index_count) = buffers.clamped_counts();
  capture_prefix(buffers, vertex_count, index_count)
}

fn capture_prefix(
  buffers: &MeshBuffers,
  vertex_count: usize,
  index_count: usize,
) -> Result<CapturedMesh, CaptureError> {
  let _span = tracing::info_span!("capture").entered();

  let positions = buffers.read_positions(vertex_count);
  let normals = buffers.read_normals(vertex_count);
  let colors = buffers.read_colors(vertex_count);
  let indices = buffers.read_indices(index_count);

  let mesh = compact_mesh(&positions, &normals, colors.as_deref(), &indices)?;
  tracing::debug!(
    raw_vertices = mesh.stats.raw_vertex_count,
    raw_indices = mesh.stats.raw_index_count,
    used_vertices = mesh.stats.used_vertex_count,
    "captured mesh"
  );
  Ok(mesh)
}

/// Keep only referenced vertices, renumbered in first-seen order. A trailing
/// partial triangle is dropped.
pub fn compact_mesh(
  positions: &[Vec3],
  normals: &[Vec3],
  colors: Option<&[Vec4]>,
  indices: &[u32],
) -> Result<CapturedMesh, CaptureError> {
  let vertex_count = positions.len();
  let indices = &indices[..indices.len() - indices.len() % 3];
  let raw_index_count = indices.len();
  let mut remap = vec![u32::MAX; vertex_count];
  let mut order: Vec<usize> = Vec::new();
  let mut compacted = Vec::with_capacity(indices.len());

  for &index in indices {
    let slot = remap
      .get_mut(index as usize)
      .ok_or(CaptureError::IndexOutOfRange {
        index,
        vertex_count,
      })?;
    if *slot == u32::MAX {
      *slot = order.len() as u32;
      order.push(index as usize);
    }
    compacted.push(*slot);
  }

  let mut bounds = MinMaxAABB::empty();
  let kept_positions: Vec<Vec3> = order.iter().map(|&i| positions[i]).collect();
  for p in &kept_positions {
    bounds.encapsulate(p.to_array());
  }
  if !bounds.is_valid() {
    bounds = MinMaxAABB::new([0.0; 3], [0.0; 3]);
  }

  let used_vertex_count = order.len();
  let indices = if used_vertex_count <= MAX_U16_VERTICES {
    MeshIndices::U16(compacted.into_iter().map(|i| i as u16).collect())
  } else {
    MeshIndices::U32(compacted)
  };

  Ok(CapturedMesh {
    positions: kept_positions,
    normals: order
      .iter()
      .map(|&i| normals.get(i).copied().unwrap_or(Vec3::Y))
      .collect(),
    colors: colors.map(|c| {
      order
        .iter()
        .map(|&i| c.get(i).copied().unwrap_or(Vec4::ONE))
        .collect()
    }),
    indices,
    bounds,
    stats: CaptureStats {
      raw_vertex_count: vertex_count,
      raw_index_count,
      used_vertex_count,
    },
  })
}

#[cfg(test)]
#[path = "capture_test.rs"]
mod capture_test;
