//! Strip-splat generator: capsule stamps along polylines.
//!
//! ```text
//!   strip s, slots s*P .. s*P + P - 1
//!
//!   ●━━━━●━━━━●    ○    ●━━━━●        ● alive   ○ dead
//!   i    i+1  i+2       i+4  i+5
//!
//!   invocation i stamps the segment (i, i+1) when both are alive,
//!   or a sphere when i has no alive neighbour in its strip
//! ```

use super::feed::StripFeed;
use super::splat::{Combine, SplatCore, SplatSettings, Stamp};
use crate::constants::{SPLAT_RESOLUTION_MAX, SPLAT_RESOLUTION_MIN};
use crate::definition::{DefinitionBinding, DefinitionSettings, ResolutionRange, SharedDefinition};
use crate::types::{Particle, Transform};
use crate::volume::{TickContext, Volume, VolumeSource};

pub const STRIP_COUNT_MIN: usize = 1;
pub const STRIP_COUNT_MAX: usize = 512;
pub const POINTS_PER_STRIP_MIN: usize = 2;
pub const POINTS_PER_STRIP_MAX: usize = 4096;

const RESOLUTION_RANGE: ResolutionRange = SPLAT_RESOLUTION_MIN..=SPLAT_RESOLUTION_MAX;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StripSplatSettings {
  /// Range [1, 512].
  pub strip_count: usize,
  /// Range [2, 4096].
  pub points_per_strip: usize,
  pub splat: SplatSettings,
  /// Smooth-union width in voxels where segment stamps overlap. Range [0, 3];
  /// zero is a hard min.
  pub smooth_union_strength: f32,
  pub update_while_inactive: bool,
}

impl Default for StripSplatSettings {
  fn default() -> Self {
    Self {
      strip_count: 128,
      points_per_strip: 1024,
      splat: SplatSettings::default(),
      smooth_union_strength: 0.25,
      update_while_inactive: true,
    }
  }
}

impl StripSplatSettings {
  pub fn with_layout(mut self, strip_count: usize, points_per_strip: usize) -> Self {
    self.strip_count = strip_count;
    self.points_per_strip = points_per_strip;
    self
  }

  pub fn with_smooth_union_strength(mut self, strength: f32) -> Self {
    self.smooth_union_strength = strength;
    self
  }

  pub fn with_splat(mut self, splat: SplatSettings) -> Self {
    self.splat = splat;
    self
  }

  /// `(strip_count, points_per_strip)` clamped into range.
  pub fn layout(&self) -> (usize, usize) {
    (
      self.strip_count.clamp(STRIP_COUNT_MIN, STRIP_COUNT_MAX),
      self
        .points_per_strip
        .clamp(POINTS_PER_STRIP_MIN, POINTS_PER_STRIP_MAX),
    )
  }

  fn smooth_strength(&self) -> f32 {
    if self.smooth_union_strength.is_finite() {
      self.smooth_union_strength.clamp(0.0, 3.0)
    } else {
      0.0
    }
  }
}

/// Synthesizes a volume from a [`StripFeed`] of polylines.
pub struct StripSplatGenerator {
  pub settings: StripSplatSettings,
  pub binding: DefinitionBinding,
  feed: StripFeed,
  core: SplatCore,
}

impl StripSplatGenerator {
  pub fn new(definition: DefinitionSettings, transform: Transform, feed: StripFeed) -> Self {
    let generator = Self {
      settings: StripSplatSettings::default(),
      binding: DefinitionBinding::local(definition, transform),
      feed,
      core: SplatCore::new("strip-splat"),
    };
    generator.declare_capacity();
    generator
  }

  pub fn with_settings(mut self, settings: StripSplatSettings) -> Self {
    self.settings = settings;
    self.declare_capacity();
    self
  }

  pub fn with_shared_definition(mut self, shared: SharedDefinition) -> Self {
    self.binding.shared = Some(shared);
    self
  }

  pub fn feed(&self) -> &StripFeed {
    &self.feed
  }

  /// Total point capacity, `strip_count * points_per_strip`.
  pub fn point_capacity(&self) -> usize {
    let (strips, per_strip) = self.settings.layout();
    strips * per_strip
  }

  fn declare_capacity(&self) {
    let (strips, per_strip) = self.settings.layout();
    if self.feed.set_layout(strips, per_strip) {
      tracing::debug!(strips, per_strip, "strip feed resized");
    }
  }

  pub fn pending_scratch_points(&self) -> usize {
    self.core.live_scratch_points()
  }

  pub fn release(&mut self) {
    self.core.release();
  }
}

/// The stamp invocation `i` is responsible for, if any.
/// Out-of-range neighbours count as dead.
pub(crate) fn strip_stamp(points: &[Particle], per_strip: usize, i: usize) -> Option<Stamp> {
  let point = points.get(i)?;
  if !point.is_alive() || per_strip == 0 {
    return None;
  }
  let slot = i % per_strip;
  let next = (slot + 1 < per_strip)
    .then(|| points.get(i + 1))
    .flatten()
    .filter(|p| p.is_alive());
  if let Some(next) = next {
    return Some(Stamp::segment(
      point.position,
      point.radius,
      point.color,
      next.position,
      next.radius,
      next.color,
    ));
  }
  let has_prev = slot > 0 && points[i - 1].is_alive();
  if has_prev {
    // Covered by the previous segment.
    return None;
  }
  Some(Stamp::sphere(point.position, point.radius, point.color))
}

impl VolumeSource for StripSplatGenerator {
  fn update(&mut self, ctx: &TickContext) {
    if !ctx.should_update(self.settings.update_while_inactive) {
      return;
    }
    self.declare_capacity();
    let definition = self.binding.resolve(&RESOLUTION_RANGE, &mut self.core.warn);
    let splat = self.settings.splat.sanitized();
    let k = self.settings.smooth_strength() * definition.normalized_voxel_size();
    let combine = if k > 0.0 {
      Combine::SmoothMin(k)
    } else {
      Combine::Min
    };

    self.core.update(
      &self.feed,
      definition,
      splat,
      combine,
      |targets, params, points, per_strip, i| {
        if let Some(stamp) = strip_stamp(points, per_strip, i) {
          targets.stamp(params, &stamp);
        }
      },
    );
  }

  fn try_get_volume(&self) -> Option<Volume> {
    self.core.volume()
  }

  fn version(&self) -> u32 {
    self.core.version()
  }

  fn label(&self) -> &str {
    "strip-splat"
  }
}

#[cfg(test)]
#[path = "strip_test.rs"]
mod strip_test;
