//! Live mesh handles and the renderer-side slots they are published to.

use std::ops::Range;
use std::sync::{Arc, RwLock};

use glam::Mat4;

use super::buffers::MeshBuffers;
use crate::types::MinMaxAABB;

/// View of the mesher's buffers with the visible submesh range.
///
/// The mesher rewrites the buffers in place on every remesh; a handle reads
/// whatever the last remesh produced.
#[derive(Clone)]
pub struct LiveMesh {
  buffers: Arc<MeshBuffers>,
  vertex_count: usize,
  index_count: usize,
  bounds: MinMaxAABB,
  local_to_world: Mat4,
}

impl LiveMesh {
  pub(crate) fn new(
    buffers: Arc<MeshBuffers>,
    vertex_count: usize,
    index_count: usize,
    bounds: MinMaxAABB,
    local_to_world: Mat4,
  ) -> Self {
    Self {
      buffers,
      vertex_count,
      index_count,
      bounds,
      local_to_world,
    }
  }

  pub fn buffers(&self) -> &MeshBuffers {
    &self.buffers
  }

  pub(crate) fn buffers_arc(&self) -> &Arc<MeshBuffers> {
    &self.buffers
  }

  #[inline]
  pub fn vertex_count(&self) -> usize {
    self.vertex_count
  }

  #[inline]
  pub fn index_count(&self) -> usize {
    self.index_count
  }

  #[inline]
  pub fn triangle_count(&self) -> usize {
    self.index_count / 3
  }

  /// Visible index range of the submesh.
  pub fn index_range(&self) -> Range<usize> {
    0..self.index_count
  }

  pub fn has_geometry(&self) -> bool {
    self.index_count > 0
  }

  /// Bounds in volume-local space.
  pub fn bounds(&self) -> MinMaxAABB {
    self.bounds
  }

  pub fn local_to_world(&self) -> Mat4 {
    self.local_to_world
  }

  pub fn shares_buffers_with(&self, other: &LiveMesh) -> bool {
    Arc::ptr_eq(&self.buffers, &other.buffers)
  }
}

#[derive(Default)]
struct TargetSlot {
  mesh: Option<LiveMesh>,
  enabled: bool,
}

/// A renderer-side slot. Clones refer to the same slot.
#[derive(Clone, Default)]
pub struct MeshTarget {
  slot: Arc<RwLock<TargetSlot>>,
}

impl MeshTarget {
  pub fn new() -> Self {
    Self::default()
  }

  /// Attach a mesh; the target is enabled only when it has geometry.
  pub fn attach(&self, mesh: Option<LiveMesh>) {
    if let Ok(mut slot) = self.slot.write() {
      slot.enabled = mesh.as_ref().is_some_and(LiveMesh::has_geometry);
      slot.mesh = mesh;
    }
  }

  pub fn detach(&self) {
    self.attach(None);
  }

  pub fn is_enabled(&self) -> bool {
    self.slot.read().map(|s| s.enabled).unwrap_or(false)
  }

  pub fn mesh(&self) -> Option<LiveMesh> {
    self.slot.read().ok().and_then(|s| s.mesh.clone())
  }
}
