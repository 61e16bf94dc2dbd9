//! Volume definitions: grid resolution, bounds, iso threshold and far clamp.
//!
//! ```text
//!   local space (centred on bounds_center, axes of the owner transform)
//!
//!   -size/2                                            +size/2
//!     ├──────┬──────┬──────┬─── ... ───┬──────┬──────┤
//!     │  v0  │  v1  │  v2  │           │ vN-2 │ vN-1 │     N = grid_resolution
//!     └──────┴──────┴──────┴─── ... ───┴──────┴──────┘
//!        ▲ voxel i sits at -size/2 + (i + 0.5) * size / N
//! ```
//!
//! Field values are stored in normalized units: world distance multiplied by
//! `distance_scale = 1 / max(bounds_size)`. The iso threshold and far clamp
//! are authored in world units and normalized on use.

use std::ops::RangeInclusive;
use std::sync::{Arc, RwLock};

use glam::{Mat4, UVec3, Vec3};

use crate::constants::{
  cell_resolution, GRID_RESOLUTION_DEFAULT, GRID_RESOLUTION_MAX, GRID_RESOLUTION_MIN, MIN_EXTENT,
};
use crate::diagnostics::WarnOnce;
use crate::types::Transform;

/// Resolution range accepted by a generator.
pub type ResolutionRange = RangeInclusive<u32>;

/// Full resolution range of standalone definitions.
pub const FULL_RESOLUTION_RANGE: ResolutionRange = GRID_RESOLUTION_MIN..=GRID_RESOLUTION_MAX;

/// `1 / max(bounds_size)`, or `1` for degenerate bounds.
#[inline]
pub fn compute_distance_scale(bounds_size: Vec3) -> f32 {
  let max_dimension = bounds_size.max_element();
  if max_dimension > 0.0 {
    1.0 / max_dimension
  } else {
    1.0
  }
}

/// Immutable-per-tick description of a volume grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VolumeDefinition {
  grid_resolution: u32,
  bounds_size: Vec3,
  bounds_center: Vec3,
  iso_value: f32,
  sdf_far: f32,
  distance_scale: f32,
  local_to_world: Mat4,
  world_to_local: Mat4,
}

impl VolumeDefinition {
  /// Build a definition placed by `local_to_world`. The bounds centre is the
  /// translation of the transform.
  pub fn new(
    grid_resolution: u32,
    bounds_size: Vec3,
    iso_value: f32,
    sdf_far: f32,
    local_to_world: Mat4,
  ) -> Self {
    Self {
      grid_resolution,
      bounds_size,
      bounds_center: local_to_world.w_axis.truncate(),
      iso_value,
      sdf_far,
      distance_scale: compute_distance_scale(bounds_size),
      local_to_world,
      world_to_local: local_to_world.inverse(),
    }
  }

  #[inline]
  pub fn grid_resolution(&self) -> u32 {
    self.grid_resolution
  }

  #[inline]
  pub fn bounds_size(&self) -> Vec3 {
    self.bounds_size
  }

  #[inline]
  pub fn bounds_center(&self) -> Vec3 {
    self.bounds_center
  }

  #[inline]
  pub fn iso_value(&self) -> f32 {
    self.iso_value
  }

  #[inline]
  pub fn sdf_far(&self) -> f32 {
    self.sdf_far
  }

  #[inline]
  pub fn distance_scale(&self) -> f32 {
    self.distance_scale
  }

  #[inline]
  pub fn local_to_world(&self) -> Mat4 {
    self.local_to_world
  }

  #[inline]
  pub fn world_to_local(&self) -> Mat4 {
    self.world_to_local
  }

  pub fn bounds_min(&self) -> Vec3 {
    self.bounds_center - self.bounds_size * 0.5
  }

  pub fn cell_resolution(&self) -> u32 {
    cell_resolution(self.grid_resolution)
  }

  pub fn cell_count(&self) -> usize {
    let cells = self.cell_resolution() as usize;
    cells * cells * cells
  }

  pub fn voxel_size(&self) -> f32 {
    self.bounds_size.x / self.grid_resolution.max(1) as f32
  }

  /// Per-axis voxel extent in local space.
  pub fn voxel_extent(&self) -> Vec3 {
    self.bounds_size / self.grid_resolution.max(1) as f32
  }

  /// Far clamp in stored (normalized) units; also the clear value.
  pub fn normalized_sdf_far(&self) -> f32 {
    self.sdf_far * self.distance_scale
  }

  pub fn normalized_voxel_size(&self) -> f32 {
    self.voxel_size() * self.distance_scale
  }

  /// Iso threshold in stored units.
  pub fn normalized_iso(&self) -> f32 {
    self.iso_value * self.distance_scale
  }

  /// Local-space centre of voxel `(x, y, z)`.
  #[inline]
  pub fn voxel_to_local(&self, voxel: UVec3) -> Vec3 {
    -self.bounds_size * 0.5 + (voxel.as_vec3() + 0.5) * self.voxel_extent()
  }

  /// Continuous voxel coordinates of a local-space point (voxel `i` at `i`).
  #[inline]
  pub fn local_to_voxel(&self, local: Vec3) -> Vec3 {
    (local + self.bounds_size * 0.5) / self.voxel_extent() - 0.5
  }

  #[inline]
  pub fn world_to_local_point(&self, world: Vec3) -> Vec3 {
    self.world_to_local.transform_point3(world)
  }

  #[inline]
  pub fn voxel_to_world(&self, voxel: UVec3) -> Vec3 {
    self.local_to_world.transform_point3(self.voxel_to_local(voxel))
  }
}

/// Authored definition values, before placement.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DefinitionSettings {
  pub grid_resolution: u32,
  pub bounds_size: Vec3,
  pub iso_value: f32,
  pub sdf_far: f32,
}

impl Default for DefinitionSettings {
  fn default() -> Self {
    Self {
      grid_resolution: GRID_RESOLUTION_DEFAULT,
      bounds_size: Vec3::splat(6.0),
      iso_value: 0.0,
      sdf_far: 5.0,
    }
  }
}

impl DefinitionSettings {
  pub fn with_grid_resolution(mut self, grid_resolution: u32) -> Self {
    self.grid_resolution = grid_resolution;
    self
  }

  pub fn with_bounds_size(mut self, bounds_size: Vec3) -> Self {
    self.bounds_size = bounds_size;
    self
  }

  pub fn with_iso_value(mut self, iso_value: f32) -> Self {
    self.iso_value = iso_value;
    self
  }

  pub fn with_sdf_far(mut self, sdf_far: f32) -> Self {
    self.sdf_far = sdf_far;
    self
  }

  /// Clamp every value into its safe range.
  pub fn sanitized(&self, range: &ResolutionRange) -> Self {
    let bounds_size = if self.bounds_size.is_finite() {
      self.bounds_size.max(Vec3::splat(MIN_EXTENT))
    } else {
      Vec3::splat(MIN_EXTENT)
    };
    let sdf_far = if self.sdf_far.is_finite() {
      self.sdf_far.max(MIN_EXTENT)
    } else {
      MIN_EXTENT
    };
    Self {
      grid_resolution: self.grid_resolution.clamp(*range.start(), *range.end()),
      bounds_size,
      iso_value: if self.iso_value.is_finite() {
        self.iso_value
      } else {
        0.0
      },
      sdf_far,
    }
  }

  /// Sanitize and place with `transform`.
  pub fn build(&self, transform: &Transform, range: &ResolutionRange) -> VolumeDefinition {
    let s = self.sanitized(range);
    VolumeDefinition::new(
      s.grid_resolution,
      s.bounds_size,
      s.iso_value,
      s.sdf_far,
      transform.to_matrix(),
    )
  }
}

/// Standalone definition author. Produces a definition but no volume.
#[derive(Clone, Debug)]
pub struct DefinitionSource {
  pub settings: DefinitionSettings,
  pub transform: Transform,
  /// A disabled source reports no definition.
  pub enabled: bool,
}

impl Default for DefinitionSource {
  fn default() -> Self {
    Self::new(DefinitionSettings::default(), Transform::IDENTITY)
  }
}

impl DefinitionSource {
  pub fn new(settings: DefinitionSettings, transform: Transform) -> Self {
    Self {
      settings,
      transform,
      enabled: true,
    }
  }

  pub fn try_get_definition(&self) -> Option<VolumeDefinition> {
    if !self.enabled || self.settings.grid_resolution == 0 {
      return None;
    }
    if self.settings.bounds_size.length_squared() <= 0.0 {
      return None;
    }
    Some(self.settings.build(&self.transform, &FULL_RESOLUTION_RANGE))
  }
}

/// Cloneable handle to a [`DefinitionSource`] shared between generators.
#[derive(Clone, Debug)]
pub struct SharedDefinition(Arc<RwLock<DefinitionSource>>);

impl SharedDefinition {
  pub fn new(source: DefinitionSource) -> Self {
    Self(Arc::new(RwLock::new(source)))
  }

  /// Mutate the shared source. Returns false when the lock is poisoned.
  pub fn update(&self, f: impl FnOnce(&mut DefinitionSource)) -> bool {
    match self.0.write() {
      Ok(mut source) => {
        f(&mut source);
        true
      }
      Err(_) => false,
    }
  }

  pub fn try_get_definition(&self) -> Option<VolumeDefinition> {
    self.0.read().ok()?.try_get_definition()
  }
}

/// How a generator obtains its definition each tick.
///
/// The shared definition wins when present and available. Otherwise the
/// local settings are used, with a one-time warning when a shared definition
/// was requested but could not be read.
#[derive(Clone, Debug, Default)]
pub struct DefinitionBinding {
  pub local: DefinitionSettings,
  pub transform: Transform,
  pub shared: Option<SharedDefinition>,
}

impl DefinitionBinding {
  pub fn local(local: DefinitionSettings, transform: Transform) -> Self {
    Self {
      local,
      transform,
      shared: None,
    }
  }

  pub fn with_shared(mut self, shared: SharedDefinition) -> Self {
    self.shared = Some(shared);
    self
  }

  /// Resolve the definition for this tick, clamped to `range`.
  pub fn resolve(&self, range: &ResolutionRange, warn: &mut WarnOnce) -> VolumeDefinition {
    const KEY: &str = "shared-definition-unavailable";
    if let Some(shared) = &self.shared {
      if let Some(definition) = shared.try_get_definition() {
        warn.clear(KEY);
        let resolution = definition.grid_resolution();
        if range.contains(&resolution) {
          return definition;
        }
        return VolumeDefinition::new(
          resolution.clamp(*range.start(), *range.end()),
          definition.bounds_size(),
          definition.iso_value(),
          definition.sdf_far(),
          definition.local_to_world(),
        );
      }
      warn.warn(KEY, || {
        "shared definition is unavailable, falling back to local settings".to_string()
      });
    }
    self.local.build(&self.transform, range)
  }
}

#[cfg(test)]
#[path = "definition_test.rs"]
mod definition_test;
