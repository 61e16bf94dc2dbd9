//! Realized volumes and the `VolumeSource` contract.
//!
//! ```text
//!   ┌─────────────┐  try_get_volume()   ┌──────────────┐
//!   │ VolumeSource│ ──────────────────▶ │ consumer     │
//!   │  version()  │                     │ (operator,   │
//!   │  update()   │ ◀── update(ctx) ─── │  mesher)     │
//!   └─────────────┘                     └──────────────┘
//! ```
//!
//! A consumer calls `update` on its upstream first, then `try_get_volume`,
//! and compares `version` with the last version it consumed.

use std::sync::Arc;

use crate::compute::{ColorTexture, VolumeTexture};
use crate::definition::VolumeDefinition;

/// One realized distance field plus optional color, with its definition.
///
/// Textures are shared handles: cloning a `Volume` is cheap and the owning
/// stage rewrites the same textures in place on its next recompute.
#[derive(Clone)]
pub struct Volume {
  pub definition: VolumeDefinition,
  pub texture: Arc<VolumeTexture>,
  pub color: Option<Arc<ColorTexture>>,
}

impl Volume {
  pub fn new(
    definition: VolumeDefinition,
    texture: Arc<VolumeTexture>,
    color: Option<Arc<ColorTexture>>,
  ) -> Self {
    Self {
      definition,
      texture,
      color,
    }
  }

  /// Texture sizes agree with the definition.
  pub fn is_valid(&self) -> bool {
    let res = self.definition.grid_resolution();
    self.texture.resolution() == res
      && self
        .color
        .as_ref()
        .map_or(true, |color| color.resolution() == res)
  }

  /// Like [`Volume::is_valid`] but also requires a color texture.
  pub fn is_valid_with_color(&self) -> bool {
    self.color.is_some() && self.is_valid()
  }

  #[inline]
  pub fn grid_resolution(&self) -> u32 {
    self.definition.grid_resolution()
  }

  #[inline]
  pub fn cell_resolution(&self) -> u32 {
    self.definition.cell_resolution()
  }

  #[inline]
  pub fn cell_count(&self) -> usize {
    self.definition.cell_count()
  }

  /// Both volumes view the same texture storage.
  pub fn shares_texture_with(&self, other: &Volume) -> bool {
    Arc::ptr_eq(&self.texture, &other.texture)
  }
}

impl std::fmt::Debug for Volume {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Volume")
      .field("grid_resolution", &self.grid_resolution())
      .field("bounds_size", &self.definition.bounds_size())
      .field("has_color", &self.color.is_some())
      .finish()
  }
}

/// Per-tick information handed down the source tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickContext {
  /// The host application is running (as opposed to paused or editing).
  pub active: bool,
  /// Monotonic tick number.
  pub frame: u64,
}

impl TickContext {
  pub fn active(frame: u64) -> Self {
    Self {
      active: true,
      frame,
    }
  }

  pub fn inactive(frame: u64) -> Self {
    Self {
      active: false,
      frame,
    }
  }

  /// Whether a stage with the given policy runs this tick.
  #[inline]
  pub fn should_update(&self, update_while_inactive: bool) -> bool {
    self.active || update_while_inactive
  }
}

impl Default for TickContext {
  fn default() -> Self {
    Self::active(0)
  }
}

/// Polymorphic producer of a [`Volume`].
pub trait VolumeSource: Send {
  /// Run this tick's work, updating upstream sources first.
  fn update(&mut self, ctx: &TickContext);

  /// The volume produced by the last update, if any. Repeated calls without
  /// an intervening update return the same volume.
  fn try_get_volume(&self) -> Option<Volume>;

  /// Opaque change token; advances exactly when the output changed.
  fn version(&self) -> u32;

  /// Short label for logs.
  fn label(&self) -> &str {
    "volume-source"
  }
}

impl<S: VolumeSource + ?Sized> VolumeSource for Box<S> {
  fn update(&mut self, ctx: &TickContext) {
    (**self).update(ctx)
  }

  fn try_get_volume(&self) -> Option<Volume> {
    (**self).try_get_volume()
  }

  fn version(&self) -> u32 {
    (**self).version()
  }

  fn label(&self) -> &str {
    (**self).label()
  }
}

/// Wrapping `u32` version counter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Version(u32);

impl Version {
  pub fn new(value: u32) -> Self {
    Self(value)
  }

  #[inline]
  pub fn get(&self) -> u32 {
    self.0
  }

  /// Advance by one, wrapping silently on overflow.
  #[inline]
  pub fn bump(&mut self) -> u32 {
    self.0 = self.0.wrapping_add(1);
    self.0
  }
}

#[cfg(test)]
#[path = "volume_test.rs"]
mod volume_test;
