//! Shared splat kernels for the particle and strip generators.
//!
//! # Stamp profile
//!
//! ```text
//!   distance from the point (or segment axis), in multiples of radius r
//!
//!   0 ───── r ──────── sdf_radius·r ─────────── sdf_fade·r ──▶
//!   │  d - r (exact)   │  d - r blended toward far  │  untouched (far)
//!
//!   0 ─── color_radius·r ────── color_fade·r ──▶
//!   │  weight 1        │  1 → 0 smoothstep   │  weight 0
//! ```
//!
//! Distances are combined with an atomic min (or a CAS smooth-min when the
//! generator asks for smooth unions). Color is accumulated as `rgba * w`
//! together with `w` and optionally normalized in a separate pass.

use std::sync::Arc;

use glam::{Mat4, UVec3, Vec3, Vec4};

use super::feed::PointFeed;
use crate::compute::{dispatch_1d, ColorTexture, VolumeTexture};
use crate::constants::voxel_count;
use crate::definition::VolumeDefinition;
use crate::diagnostics::WarnOnce;
use crate::error::SdfResult;
use crate::types::{ColorBlendMode, Particle};
use crate::volume::{Version, Volume};

/// Radius multipliers shared by the splat generators.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SplatSettings {
  /// Exact-distance band, in particle radii. Range [1, 3].
  pub sdf_radius_multiplier: f32,
  /// Outer edge of the blend toward far, in particle radii.
  pub sdf_fade_multiplier: f32,
  /// Full-weight color band, in particle radii. Range [0.5, 3].
  pub color_radius_multiplier: f32,
  /// Outer edge of the color falloff, in particle radii.
  pub color_fade_multiplier: f32,
  pub color_blend_mode: ColorBlendMode,
}

impl Default for SplatSettings {
  fn default() -> Self {
    Self {
      sdf_radius_multiplier: 2.0,
      sdf_fade_multiplier: 3.0,
      color_radius_multiplier: 1.0,
      color_fade_multiplier: 1.5,
      color_blend_mode: ColorBlendMode::Normalized,
    }
  }
}

impl SplatSettings {
  pub fn with_sdf_radius(mut self, radius: f32, fade: f32) -> Self {
    self.sdf_radius_multiplier = radius;
    self.sdf_fade_multiplier = fade;
    self
  }

  pub fn with_color_radius(mut self, radius: f32, fade: f32) -> Self {
    self.color_radius_multiplier = radius;
    self.color_fade_multiplier = fade;
    self
  }

  pub fn with_color_blend_mode(mut self, mode: ColorBlendMode) -> Self {
    self.color_blend_mode = mode;
    self
  }

  /// Clamp multipliers into range; fades always exceed their radius.
  pub fn sanitized(&self) -> Self {
    let finite = |v: f32, fallback: f32| if v.is_finite() { v } else { fallback };
    let sdf_radius = finite(self.sdf_radius_multiplier, 2.0).clamp(1.0, 3.0);
    let color_radius = finite(self.color_radius_multiplier, 1.0).clamp(0.5, 3.0);
    Self {
      sdf_radius_multiplier: sdf_radius,
      sdf_fade_multiplier: finite(self.sdf_fade_multiplier, 3.0).max(sdf_radius + 0.01),
      color_radius_multiplier: color_radius,
      color_fade_multiplier: finite(self.color_fade_multiplier, 1.5).max(color_radius + 0.01),
      color_blend_mode: self.color_blend_mode,
    }
  }
}

#[inline]
pub(crate) fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
  if edge1 <= edge0 {
    return if x < edge0 { 0.0 } else { 1.0 };
  }
  let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
  t * t * (3.0 - 2.0 * t)
}

/// How a stamp merges into the field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Combine {
  Min,
  /// Smooth-min with blend width `k` in normalized units.
  SmoothMin(f32),
}

/// Per-dispatch constants derived from the definition.
#[derive(Clone, Copy, Debug)]
pub struct SplatParams {
  pub resolution: u32,
  pub distance_scale: f32,
  pub far: f32,
  pub local_to_world: Mat4,
  pub world_to_local: Mat4,
  /// Upper bound of how much world_to_local stretches a world length.
  pub local_stretch: f32,
  pub definition: VolumeDefinition,
  pub settings: SplatSettings,
  pub combine: Combine,
}

impl SplatParams {
  pub fn new(definition: &VolumeDefinition, settings: SplatSettings, combine: Combine) -> Self {
    let w2l = definition.world_to_local();
    let local_stretch = w2l
      .x_axis
      .truncate()
      .length()
      .max(w2l.y_axis.truncate().length())
      .max(w2l.z_axis.truncate().length());
    Self {
      resolution: definition.grid_resolution(),
      distance_scale: definition.distance_scale(),
      far: definition.normalized_sdf_far(),
      local_to_world: definition.local_to_world(),
      world_to_local: w2l,
      local_stretch,
      definition: *definition,
      settings,
      combine,
    }
  }

  /// Inclusive voxel range covering a world-space sphere, or `None` when it
  /// misses the grid.
  fn voxel_range(&self, lo_world: Vec3, hi_world: Vec3, reach: f32) -> Option<(UVec3, UVec3)> {
    let mut lo = Vec3::splat(f32::INFINITY);
    let mut hi = Vec3::splat(f32::NEG_INFINITY);
    let reach_local = reach * self.local_stretch;
    for world in [lo_world, hi_world] {
      let local = self.world_to_local.transform_point3(world);
      let v_lo = self.definition.local_to_voxel(local - reach_local);
      let v_hi = self.definition.local_to_voxel(local + reach_local);
      lo = lo.min(v_lo.min(v_hi));
      hi = hi.max(v_lo.max(v_hi));
    }
    let max = (self.resolution - 1) as f32;
    if hi.x < 0.0 || hi.y < 0.0 || hi.z < 0.0 || lo.x > max || lo.y > max || lo.z > max {
      return None;
    }
    let lo = lo.ceil().clamp(Vec3::ZERO, Vec3::splat(max));
    let hi = hi.floor().clamp(Vec3::ZERO, Vec3::splat(max));
    Some((lo.as_uvec3(), hi.as_uvec3()))
  }
}

/// A capsule between two weighted points; a sphere when both ends match.
#[derive(Clone, Copy, Debug)]
pub struct Stamp {
  pub a: Vec3,
  pub b: Vec3,
  pub radius_a: f32,
  pub radius_b: f32,
  pub color_a: Vec4,
  pub color_b: Vec4,
}

impl Stamp {
  pub fn sphere(center: Vec3, radius: f32, color: Vec4) -> Self {
    Self {
      a: center,
      b: center,
      radius_a: radius,
      radius_b: radius,
      color_a: color,
      color_b: color,
    }
  }

  pub fn segment(a: Vec3, radius_a: f32, color_a: Vec4, b: Vec3, radius_b: f32, color_b: Vec4) -> Self {
    Self {
      a,
      b,
      radius_a,
      radius_b,
      color_a,
      color_b,
    }
  }

  /// `(distance to axis, parameter along the axis)`.
  #[inline]
  fn axis_distance(&self, p: Vec3) -> (f32, f32) {
    let ab = self.b - self.a;
    let len_sq = ab.length_squared();
    let t = if len_sq > 1e-12 {
      ((p - self.a).dot(ab) / len_sq).clamp(0.0, 1.0)
    } else {
      0.0
    };
    ((p - (self.a + ab * t)).length(), t)
  }
}

/// Textures written by the splat kernels.
pub struct SplatTargets {
  pub sdf: Arc<VolumeTexture>,
  pub color: Arc<ColorTexture>,
  weight: VolumeTexture,
}

impl SplatTargets {
  pub fn allocate(resolution: u32) -> SdfResult<Self> {
    Ok(Self {
      sdf: Arc::new(VolumeTexture::new(resolution, "splat sdf volume")?),
      color: Arc::new(ColorTexture::new(resolution, "splat color volume")?),
      weight: VolumeTexture::new(resolution, "splat color weight")?,
    })
  }

  pub fn resolution(&self) -> u32 {
    self.sdf.resolution()
  }

  /// `ClearSdf`: field to far, color and weight to zero.
  pub fn clear(&self, far: f32) {
    let count = voxel_count(self.resolution());
    dispatch_1d(count, |voxel| {
      self.sdf.texels().store(voxel, far);
      self.color.store_index(voxel, Vec4::ZERO);
      self.weight.texels().store(voxel, 0.0);
    });
  }

  /// Stamp one capsule. Called from inside a 1D dispatch.
  pub fn stamp(&self, params: &SplatParams, stamp: &Stamp) {
    let settings = &params.settings;
    let max_radius = stamp.radius_a.max(stamp.radius_b);
    if max_radius <= 0.0 {
      return;
    }
    let reach = max_radius * settings.sdf_fade_multiplier.max(settings.color_fade_multiplier);
    let Some((lo, hi)) = params.voxel_range(stamp.a.min(stamp.b), stamp.a.max(stamp.b), reach) else {
      return;
    };

    for x in lo.x..=hi.x {
      for y in lo.y..=hi.y {
        for z in lo.z..=hi.z {
          let voxel = UVec3::new(x, y, z);
          let world = params
            .local_to_world
            .transform_point3(params.definition.voxel_to_local(voxel));
          let (axis, t) = stamp.axis_distance(world);
          let radius = stamp.radius_a + (stamp.radius_b - stamp.radius_a) * t;
          if radius <= 0.0 {
            continue;
          }

          let sdf_band = settings.sdf_radius_multiplier * radius;
          let fade_band = settings.sdf_fade_multiplier * radius;
          if axis <= fade_band {
            let exact = (axis - radius) * params.distance_scale;
            let value = if axis <= sdf_band {
              exact
            } else {
              let f = smoothstep(sdf_band, fade_band, axis);
              exact + (params.far - exact) * f
            };
            let value = value.min(params.far);
            let index = self.sdf.index(x, y, z);
            match params.combine {
              Combine::Min => self.sdf.texels().atomic_min(index, value),
              Combine::SmoothMin(k) => self.sdf.texels().atomic_smooth_min(index, value, k),
            }
          }

          let color_fade = settings.color_fade_multiplier * radius;
          if axis <= color_fade {
            let w = 1.0 - smoothstep(settings.color_radius_multiplier * radius, color_fade, axis);
            if w > 0.0 {
              let rgba = stamp.color_a.lerp(stamp.color_b, t);
              self.color.atomic_add(x, y, z, rgba * w);
              self.weight.texels().atomic_add(self.weight.index(x, y, z), w);
            }
          }
        }
      }
    }
  }

  /// `NormalizeColorVolume`: divide by weight; zero-weight voxels stay zero.
  pub fn normalize_color(&self) {
    let count = voxel_count(self.resolution());
    dispatch_1d(count, |voxel| {
      let w = self.weight.texels().load(voxel);
      let color = if w > 0.0 {
        self.color.load_index(voxel) / w
      } else {
        Vec4::ZERO
      };
      self.color.store_index(voxel, color);
    });
  }

  /// Accumulated color weight at a voxel.
  pub fn weight_at(&self, x: u32, y: u32, z: u32) -> f32 {
    self.weight.load(x, y, z)
  }
}

/// Inputs that decide whether a recompute is needed.
#[derive(Clone, Copy, Debug, PartialEq)]
struct SplatKey {
  revision: u64,
  layout: (usize, usize),
  definition: VolumeDefinition,
  settings: SplatSettings,
  combine: Combine,
}

/// Resource and change tracking shared by the splat generators.
pub struct SplatCore {
  label: &'static str,
  targets: Option<SplatTargets>,
  definition: Option<VolumeDefinition>,
  /// Generator-owned copy of the feed, reset after every stamp pass.
  scratch: Vec<Particle>,
  last_key: Option<SplatKey>,
  version: Version,
  pub(crate) warn: WarnOnce,
}

impl SplatCore {
  pub fn new(label: &'static str) -> Self {
    Self {
      label,
      targets: None,
      definition: None,
      scratch: Vec::new(),
      last_key: None,
      version: Version::default(),
      warn: WarnOnce::new(),
    }
  }

  fn ensure_resources(&mut self, definition: &VolumeDefinition) -> SdfResult<()> {
    let resolution = definition.grid_resolution();
    if self
      .targets
      .as_ref()
      .is_some_and(|t| t.resolution() == resolution)
    {
      return Ok(());
    }
    // Release before allocating the replacement.
    self.targets = None;
    self.definition = None;
    self.last_key = None;
    tracing::debug!(generator = self.label, resolution, "allocating splat volumes");
    self.targets = Some(SplatTargets::allocate(resolution)?);
    Ok(())
  }

  /// Drop every resource; the generator reports not-ready until the next
  /// successful update.
  pub fn release(&mut self) {
    self.targets = None;
    self.definition = None;
    self.last_key = None;
    self.scratch = Vec::new();
  }

  /// Clear, stamp every feed slot with `kernel`, normalize and reset the
  /// scratch buffer. Skipped entirely when nothing changed since the last
  /// recompute.
  pub fn update<K>(
    &mut self,
    feed: &PointFeed,
    definition: VolumeDefinition,
    settings: SplatSettings,
    combine: Combine,
    kernel: K,
  ) where
    K: Fn(&SplatTargets, &SplatParams, &[Particle], usize, usize) + Sync,
  {
    if let Err(err) = self.ensure_resources(&definition) {
      self.release();
      self.warn.warn(format!("{}-allocation", self.label), || {
        format!("{}: {err}; volume disabled until resources fit", self.label)
      });
      return;
    }

    let layout = feed.layout();
    let key = SplatKey {
      revision: feed.revision(),
      layout,
      definition,
      settings,
      combine,
    };
    if self.definition.is_some() && self.last_key == Some(key) {
      return;
    }

    let Some(targets) = &self.targets else {
      return;
    };
    let _span = tracing::info_span!("splat", generator = self.label).entered();

    let params = SplatParams::new(&definition, settings, combine);
    targets.clear(params.far);

    let upload = feed.upload(&mut self.scratch);
    let scratch = &self.scratch;
    let per_strip = upload.points_per_strip;
    dispatch_1d(scratch.len(), |i| kernel(targets, &params, scratch, per_strip, i));

    if settings.color_blend_mode == ColorBlendMode::Normalized {
      targets.normalize_color();
    }
    self.scratch.fill(Particle::DEAD);

    self.definition = Some(definition);
    self.last_key = Some(SplatKey {
      revision: upload.revision,
      layout: upload.layout(),
      ..key
    });
    self.version.bump();
  }

  pub fn volume(&self) -> Option<Volume> {
    let targets = self.targets.as_ref()?;
    let definition = self.definition?;
    let volume = Volume::new(definition, targets.sdf.clone(), Some(targets.color.clone()));
    volume.is_valid_with_color().then_some(volume)
  }

  #[inline]
  pub fn version(&self) -> u32 {
    self.version.get()
  }

  /// Scratch slots currently holding a live point (zero between ticks).
  pub fn live_scratch_points(&self) -> usize {
    self.scratch.iter().filter(|p| p.is_alive()).count()
  }
}

#[cfg(test)]
#[path = "splat_test.rs"]
mod splat_test;
