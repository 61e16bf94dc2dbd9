//! Particle-splat generator: one sphere stamp per live particle.

use super::feed::ParticleFeed;
use super::splat::{Combine, SplatCore, SplatSettings, Stamp};
use crate::constants::{SPLAT_RESOLUTION_MAX, SPLAT_RESOLUTION_MIN};
use crate::definition::{DefinitionBinding, DefinitionSettings, ResolutionRange, SharedDefinition};
use crate::types::Transform;
use crate::volume::{TickContext, Volume, VolumeSource};

pub const PARTICLE_COUNT_MIN: usize = 512;
pub const PARTICLE_COUNT_MAX: usize = 20_000;
pub const PARTICLE_COUNT_DEFAULT: usize = 8192;

const RESOLUTION_RANGE: ResolutionRange = SPLAT_RESOLUTION_MIN..=SPLAT_RESOLUTION_MAX;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleSplatSettings {
  /// Feed capacity. Range [512, 20000].
  pub particle_count: usize,
  pub splat: SplatSettings,
  pub update_while_inactive: bool,
}

impl Default for ParticleSplatSettings {
  fn default() -> Self {
    Self {
      particle_count: PARTICLE_COUNT_DEFAULT,
      splat: SplatSettings::default(),
      update_while_inactive: true,
    }
  }
}

impl ParticleSplatSettings {
  pub fn with_particle_count(mut self, particle_count: usize) -> Self {
    self.particle_count = particle_count;
    self
  }

  pub fn with_splat(mut self, splat: SplatSettings) -> Self {
    self.splat = splat;
    self
  }
}

/// Synthesizes a volume from a [`ParticleFeed`].
pub struct ParticleSplatGenerator {
  pub settings: ParticleSplatSettings,
  pub binding: DefinitionBinding,
  feed: ParticleFeed,
  core: SplatCore,
}

impl ParticleSplatGenerator {
  pub fn new(definition: DefinitionSettings, transform: Transform, feed: ParticleFeed) -> Self {
    let generator = Self {
      settings: ParticleSplatSettings::default(),
      binding: DefinitionBinding::local(definition, transform),
      feed,
      core: SplatCore::new("particle-splat"),
    };
    generator.declare_capacity();
    generator
  }

  pub fn with_settings(mut self, settings: ParticleSplatSettings) -> Self {
    self.settings = settings;
    self.declare_capacity();
    self
  }

  pub fn with_shared_definition(mut self, shared: SharedDefinition) -> Self {
    self.binding.shared = Some(shared);
    self
  }

  pub fn feed(&self) -> &ParticleFeed {
    &self.feed
  }

  pub fn particle_capacity(&self) -> usize {
    self
      .settings
      .particle_count
      .clamp(PARTICLE_COUNT_MIN, PARTICLE_COUNT_MAX)
  }

  /// Push the configured capacity to the producer side of the feed.
  fn declare_capacity(&self) {
    if self.feed.set_capacity(self.particle_capacity()) {
      tracing::debug!(capacity = self.particle_capacity(), "particle feed resized");
    }
  }

  /// Live scratch points left over after the last stamp pass.
  pub fn pending_scratch_points(&self) -> usize {
    self.core.live_scratch_points()
  }

  /// Release all volumes (for example when the owner is disabled).
  pub fn release(&mut self) {
    self.core.release();
  }
}

impl VolumeSource for ParticleSplatGenerator {
  fn update(&mut self, ctx: &TickContext) {
    if !ctx.should_update(self.settings.update_while_inactive) {
      return;
    }
    self.declare_capacity();
    let definition = self.binding.resolve(&RESOLUTION_RANGE, &mut self.core.warn);
    let splat = self.settings.splat.sanitized();

    self
      .core
      .update(&self.feed, definition, splat, Combine::Min, |targets, params, points, _, i| {
        let particle = &points[i];
        if particle.is_alive() {
          targets.stamp(
            params,
            &Stamp::sphere(particle.position, particle.radius, particle.color),
          );
        }
      });
  }

  fn try_get_volume(&self) -> Option<Volume> {
    self.core.volume()
  }

  fn version(&self) -> u32 {
    self.core.version()
  }

  fn label(&self) -> &str {
    "particle-splat"
  }
}

#[cfg(test)]
#[path = "particle_test.rs"]
mod particle_test;
