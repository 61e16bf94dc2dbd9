//! Dual-contouring mesher.
//!
//! Extracts the iso-surface of a [`VolumeSource`] into fixed-capacity mesh
//! arenas, one vertex per surface cell.
//!
//! # Processing Pipeline
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        INPUT                                    │
//! │  texture: R32F res³        - normalized distances               │
//! │  color:   RGBA32F res³     - optional                           │
//! │  definition                - iso, bounds, cell resolution       │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    ClearCells                                   │
//! │  cell -> vertex lookup = NO_VERTEX, counters = 0                │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    BuildSurfaceVertices                         │
//! │  For each cell straddling the iso-surface:                      │
//! │    claim a vertex id (atomic), drop when past capacity          │
//! │    position = centroid of edge crossings                        │
//! │    normal   = central difference, corner gradient, +Y           │
//! │    color    = trilinear sample                                  │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    BuildSurfaceIndices                          │
//! │  For each of the 3 edges leaving the cell's min corner:         │
//! │    sign change -> quad over the 4 cells sharing the edge        │
//! │    split along the shorter diagonal, claim 6 indices            │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    Readback                                     │
//! │  counters -> clamp to capacity -> visible submesh range         │
//! │  publish LiveMesh to every MeshTarget                           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod buffers;
pub mod gradient;
pub mod kernels;
pub mod target;
pub mod vertex_calc;

use std::sync::Arc;

use glam::Vec3;

pub use buffers::MeshBuffers;
pub use target::{LiveMesh, MeshTarget};

use crate::definition::VolumeDefinition;
use crate::diagnostics::WarnOnce;
use crate::error::{NotReadyReason, SdfError, SdfResult};
use crate::types::MinMaxAABB;
use crate::volume::{TickContext, VolumeSource};
use kernels::MeshParams;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MesherSettings {
  /// Allocate and fill the per-vertex color arena.
  pub write_colors: bool,
  pub update_while_inactive: bool,
}

impl Default for MesherSettings {
  fn default() -> Self {
    Self {
      write_colors: true,
      update_while_inactive: true,
    }
  }
}

impl MesherSettings {
  pub fn with_colors(mut self, write_colors: bool) -> Self {
    self.write_colors = write_colors;
    self
  }
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct MeshKey {
  version: u32,
  definition: VolumeDefinition,
  write_colors: bool,
}

/// Result of one mesher tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MeshUpdate {
  /// Kernels ran this tick.
  pub remeshed: bool,
  pub vertex_count: usize,
  pub index_count: usize,
}

/// Turns a volume source into a live triangle mesh.
pub struct DualContouringMesher {
  pub settings: MesherSettings,
  source: Option<Box<dyn VolumeSource>>,
  buffers: Option<Arc<MeshBuffers>>,
  live: Option<LiveMesh>,
  targets: Vec<MeshTarget>,
  last_key: Option<MeshKey>,
  warn: WarnOnce,
}

impl DualContouringMesher {
  pub fn new(source: Box<dyn VolumeSource>) -> Self {
    Self {
      source: Some(source),
      ..Self::unconnected()
    }
  }

  /// Mesher without a source; publishes an empty mesh until one is set.
  pub fn unconnected() -> Self {
    Self {
      settings: MesherSettings::default(),
      source: None,
      buffers: None,
      live: None,
      targets: Vec::new(),
      last_key: None,
      warn: WarnOnce::new(),
    }
  }

  pub fn with_settings(mut self, settings: MesherSettings) -> Self {
    self.settings = settings;
    self
  }

  pub fn with_target(mut self, target: MeshTarget) -> Self {
    self.targets.push(target);
    self
  }

  pub fn add_target(&mut self, target: MeshTarget) {
    target.attach(self.live.clone());
    self.targets.push(target);
  }

  pub fn targets(&self) -> &[MeshTarget] {
    &self.targets
  }

  pub fn set_source(&mut self, source: Box<dyn VolumeSource>) {
    self.source = Some(source);
    self.last_key = None;
  }

  pub fn source(&self) -> Option<&dyn VolumeSource> {
    self.source.as_deref()
  }

  pub fn source_mut(&mut self) -> Option<&mut (dyn VolumeSource + 'static)> {
    self.source.as_deref_mut()
  }

  /// The arenas of the last remesh, if allocated.
  pub fn buffers(&self) -> Option<&MeshBuffers> {
    self.buffers.as_deref()
  }

  pub fn live_mesh(&self) -> Option<&LiveMesh> {
    self.live.as_ref()
  }

  /// Visible `(vertex_count, index_count)`.
  pub fn visible_counts(&self) -> (usize, usize) {
    self
      .live
      .as_ref()
      .map_or((0, 0), |m| (m.vertex_count(), m.index_count()))
  }

  pub fn release(&mut self) {
    self.buffers = None;
    self.live = None;
    self.last_key = None;
    self.publish();
  }

  fn publish(&self) {
    for target in &self.targets {
      target.attach(self.live.clone());
    }
  }

  /// Drop the visible range to zero while keeping the arenas.
  fn publish_empty(&mut self, reason: NotReadyReason) {
    if self.live.as_ref().is_some_and(LiveMesh::has_geometry) {
      tracing::debug!(error = %SdfError::NotReady(reason), "mesher source");
    }
    self.last_key = None;
    self.live = self.live.take().map(|live| {
      LiveMesh::new(
        Arc::clone(live.buffers_arc()),
        0,
        0,
        live.bounds(),
        live.local_to_world(),
      )
    });
    self.publish();
  }

  fn ensure_resources(&mut self, cell_count: usize) -> SdfResult<()> {
    let with_colors = self.settings.write_colors;
    if self
      .buffers
      .as_ref()
      .is_some_and(|b| b.cell_count() == cell_count && b.has_colors() == with_colors)
    {
      return Ok(());
    }
    self.buffers = None;
    self.live = None;
    self.last_key = None;
    tracing::debug!(cell_count, with_colors, "allocating mesh buffers");
    self.buffers = Some(Arc::new(MeshBuffers::allocate(cell_count, with_colors)?));
    Ok(())
  }

  /// Remesh when the source changed; always republish to targets.
  pub fn update(&mut self, ctx: &TickContext) -> MeshUpdate {
    let Some(source) = self.source.as_mut() else {
      self.publish_empty(NotReadyReason::MissingInput);
      return MeshUpdate::default();
    };
    source.update(ctx);
    if !ctx.should_update(self.settings.update_while_inactive) {
      return self.current_update(false);
    }

    let version = source.version();
    let Some(volume) = source.try_get_volume() else {
      self.publish_empty(NotReadyReason::UpstreamNotReady);
      return MeshUpdate::default();
    };
    if !volume.is_valid() {
      self.warn.warn("mesher-invalid-volume", || {
        "mesher source returned a volume whose textures do not match its definition".to_string()
      });
      self.publish_empty(NotReadyReason::UpstreamNotReady);
      return MeshUpdate::default();
    }

    let definition = volume.definition;
    if let Err(err) = self.ensure_resources(definition.cell_count()) {
      self.release();
      self.warn.warn("mesher-allocation", || format!("mesher: {err}"));
      return MeshUpdate::default();
    }

    let key = MeshKey {
      version,
      definition,
      write_colors: self.settings.write_colors,
    };
    if self.live.is_some() && self.last_key == Some(key) {
      return self.current_update(false);
    }

    let Some(buffers) = self.buffers.clone() else {
      return MeshUpdate::default();
    };
    let params = MeshParams::new(&definition);
    {
      let _span = tracing::info_span!("dual_contouring", cells = definition.cell_count()).entered();
      kernels::clear_cells(&buffers);
      kernels::build_surface_vertices(&buffers, &params, &volume.texture, volume.color.as_deref());
      kernels::build_surface_indices(&buffers, &params, &volume.texture);
    }

    let (raw_vertices, raw_indices) = buffers.read_counters();
    let (vertex_count, index_count) = buffers.clamped_counts();
    if raw_indices as usize > index_count || raw_vertices as usize > vertex_count {
      self.warn.warn("mesher-capacity", || {
        format!(
          "mesh arenas overflowed: {raw_vertices} vertices / {raw_indices} indices requested, \
           {vertex_count} / {index_count} kept"
        )
      });
    }

    let bounds = MinMaxAABB::centered(definition.bounds_size() + Vec3::ONE);
    self.live = Some(LiveMesh::new(
      buffers,
      vertex_count,
      index_count,
      bounds,
      definition.local_to_world(),
    ));
    self.last_key = Some(key);
    self.publish();
    tracing::debug!(vertex_count, index_count, "remeshed");

    self.current_update(true)
  }

  fn current_update(&self, remeshed: bool) -> MeshUpdate {
    let (vertex_count, index_count) = self.visible_counts();
    MeshUpdate {
      remeshed,
      vertex_count,
      index_count,
    }
  }
}
