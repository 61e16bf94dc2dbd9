//! Test utilities shared by stage tests.
//!
//! Provides analytic volume sources that can be switched between ready and
//! not-ready, and helpers to build definitions for small grids.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use glam::{UVec3, Vec3, Vec4};

use crate::compute::{dispatch_cube, ColorTexture, VolumeTexture};
use crate::definition::{DefinitionSettings, VolumeDefinition, FULL_RESOLUTION_RANGE};
use crate::types::Transform;
use crate::volume::{TickContext, Version, Volume, VolumeSource};

// =============================================================================
// Definitions
// =============================================================================

/// Definition of a cube of `bounds` centred on the origin.
pub fn cube_definition(resolution: u32, bounds: f32) -> VolumeDefinition {
  DefinitionSettings::default()
    .with_grid_resolution(resolution)
    .with_bounds_size(Vec3::splat(bounds))
    .build(&Transform::IDENTITY, &FULL_RESOLUTION_RANGE)
}

/// Fill a fresh volume from a world-space distance function.
pub fn volume_from_fn(
  definition: VolumeDefinition,
  color: Option<Vec4>,
  f: impl Fn(Vec3) -> f32 + Sync + Send,
) -> Volume {
  let res = definition.grid_resolution();
  let texture = Arc::new(VolumeTexture::new(res, "test volume").unwrap());
  let scale = definition.distance_scale();
  let far = definition.normalized_sdf_far();
  dispatch_cube(res, |[x, y, z]| {
    let world = definition.voxel_to_world(UVec3::new(x, y, z));
    texture.store(x, y, z, (f(world) * scale).min(far));
  });
  let color = color.map(|c| {
    let texture = ColorTexture::new(res, "test color").unwrap();
    dispatch_cube(res, |[x, y, z]| texture.store(x, y, z, c));
    Arc::new(texture)
  });
  Volume::new(definition, texture, color)
}

// =============================================================================
// Mock Volume Sources
// =============================================================================

struct StaticState {
  volume: Volume,
  ready: bool,
  version: Version,
}

/// A source serving a fixed volume. Clones share state, so a test can keep a
/// handle after boxing the source into a stage.
#[derive(Clone)]
pub struct StaticSource {
  state: Arc<RwLock<StaticState>>,
  updates: Arc<AtomicUsize>,
}

impl StaticSource {
  pub fn new(volume: Volume) -> Self {
    Self {
      state: Arc::new(RwLock::new(StaticState {
        volume,
        ready: true,
        version: Version::new(1),
      })),
      updates: Arc::new(AtomicUsize::new(0)),
    }
  }

  /// Sphere of `radius` at `center`, world units.
  pub fn sphere(definition: VolumeDefinition, center: Vec3, radius: f32) -> Self {
    Self::new(volume_from_fn(definition, Some(Vec4::ONE), move |p| {
      (p - center).length() - radius
    }))
  }

  /// Axis-aligned box of half extents `half` at `center`.
  pub fn cuboid(definition: VolumeDefinition, center: Vec3, half: Vec3) -> Self {
    Self::new(volume_from_fn(definition, Some(Vec4::ONE), move |p| {
      let q = (p - center).abs() - half;
      q.max(Vec3::ZERO).length() + q.max_element().min(0.0)
    }))
  }

  /// Everything at the far clamp.
  pub fn far(definition: VolumeDefinition) -> Self {
    Self::new(volume_from_fn(definition, Some(Vec4::ONE), |_| f32::MAX))
  }

  pub fn set_ready(&self, ready: bool) {
    if let Ok(mut state) = self.state.write() {
      state.ready = ready;
    }
  }

  /// Pretend the volume changed.
  pub fn touch(&self) {
    if let Ok(mut state) = self.state.write() {
      state.version.bump();
    }
  }

  pub fn update_count(&self) -> usize {
    self.updates.load(Ordering::Relaxed)
  }

  pub fn volume(&self) -> Volume {
    self.state.read().unwrap().volume.clone()
  }
}

impl VolumeSource for StaticSource {
  fn update(&mut self, _ctx: &TickContext) {
    self.updates.fetch_add(1, Ordering::Relaxed);
  }

  fn try_get_volume(&self) -> Option<Volume> {
    let state = self.state.read().ok()?;
    state.ready.then(|| state.volume.clone())
  }

  fn version(&self) -> u32 {
    self.state.read().map(|s| s.version.get()).unwrap_or(0)
  }

  fn label(&self) -> &str {
    "static"
  }
}

/// Voxel nearest to a world point.
pub fn voxel_at(definition: &VolumeDefinition, world: Vec3) -> UVec3 {
  let local = definition.world_to_local_point(world);
  let res = definition.grid_resolution() as f32 - 1.0;
  definition
    .local_to_voxel(local)
    .round()
    .clamp(Vec3::ZERO, Vec3::splat(res))
    .as_uvec3()
}

/// Field value at the voxel nearest to a world point.
pub fn value_at(volume: &Volume, world: Vec3) -> f32 {
  let v = voxel_at(&volume.definition, world);
  volume.texture.load(v.x, v.y, v.z)
}
