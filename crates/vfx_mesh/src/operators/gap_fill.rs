//! Gap-fill operator: propagates distances into voxels left at the far clamp.
//!
//! ```text
//!   stride 1 ─▶ stride 2 ─▶ stride 4 ─▶ ... while stride < res
//!
//!   unknown voxel v (v >= far):
//!     v' = min over known n in 26-neighbourhood at `stride`
//!            of max(n, 0) + |offset| * normalized_voxel_size
//!     clamped just below far so later passes treat it as known
//! ```
//!
//! Known voxels are copied through unchanged. Color passes through.

use std::sync::Arc;

use crate::compute::{dispatch_cube, ColorTexture, VolumeTexture};
use crate::definition::VolumeDefinition;
use crate::diagnostics::WarnOnce;
use crate::error::{NotReadyReason, SdfError, SdfResult};
use crate::volume::{TickContext, Version, Volume, VolumeSource};

/// Filled values are clamped to `far * FILL_CLAMP`.
const FILL_CLAMP: f32 = 0.9999;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GapFillSettings {
  pub update_while_inactive: bool,
}

impl Default for GapFillSettings {
  fn default() -> Self {
    Self {
      update_while_inactive: true,
    }
  }
}

/// Strides of the propagation passes for a grid of `resolution`.
pub fn pass_strides(resolution: u32) -> impl Iterator<Item = u32> {
  std::iter::successors(Some(1u32), |s| s.checked_mul(2)).take_while(move |&s| s < resolution)
}

/// One `FillSdfFar` pass from `src` into `dst`.
pub(crate) fn fill_pass(
  src: &VolumeTexture,
  dst: &VolumeTexture,
  stride: u32,
  far: f32,
  voxel_size: f32,
) {
  let res = src.resolution() as i32;
  let s = stride as i32;
  dispatch_cube(src.resolution(), |[x, y, z]| {
    let value = src.load(x, y, z);
    if value < far {
      dst.store(x, y, z, value);
      return;
    }
    let mut best = far;
    for dx in -1..=1i32 {
      for dy in -1..=1i32 {
        for dz in -1..=1i32 {
          let (nx, ny, nz) = (x as i32 + dx * s, y as i32 + dy * s, z as i32 + dz * s);
          if nx < 0 || ny < 0 || nz < 0 || nx >= res || ny >= res || nz >= res {
            continue;
          }
          let neighbour = src.load(nx as u32, ny as u32, nz as u32);
          if neighbour >= far {
            continue;
          }
          let offset = ((dx * dx + dy * dy + dz * dz) as f32).sqrt() * stride as f32;
          best = best.min(neighbour.max(0.0) + offset * voxel_size);
        }
      }
    }
    let filled = if best < far {
      best.min(far * FILL_CLAMP)
    } else {
      far
    };
    dst.store(x, y, z, filled);
  });
}

struct FillTargets {
  working: Arc<VolumeTexture>,
  scratch: VolumeTexture,
}

/// Fills the far region of an upstream volume.
pub struct GapFillOperator {
  pub settings: GapFillSettings,
  source: Option<Box<dyn VolumeSource>>,
  targets: Option<FillTargets>,
  definition: Option<VolumeDefinition>,
  color: Option<Arc<ColorTexture>>,
  /// `(upstream version, resolution)` of the last refill.
  last_upstream: Option<(u32, u32)>,
  version: Version,
  warn: WarnOnce,
}

impl GapFillOperator {
  pub fn new(source: Box<dyn VolumeSource>) -> Self {
    Self {
      source: Some(source),
      ..Self::unconnected()
    }
  }

  /// Operator without input; reports not-ready until a source is set.
  pub fn unconnected() -> Self {
    Self {
      settings: GapFillSettings::default(),
      source: None,
      targets: None,
      definition: None,
      color: None,
      last_upstream: None,
      version: Version::default(),
      warn: WarnOnce::new(),
    }
  }

  pub fn with_settings(mut self, settings: GapFillSettings) -> Self {
    self.settings = settings;
    self
  }

  pub fn set_source(&mut self, source: Box<dyn VolumeSource>) {
    self.source = Some(source);
    self.last_upstream = None;
  }

  pub fn source(&self) -> Option<&dyn VolumeSource> {
    self.source.as_deref()
  }

  pub fn release(&mut self) {
    self.targets = None;
    self.definition = None;
    self.color = None;
    self.last_upstream = None;
  }

  fn not_ready(&mut self, reason: NotReadyReason) {
    if self.definition.take().is_some() {
      tracing::debug!(error = %SdfError::NotReady(reason), "gap fill");
    }
    self.color = None;
    self.last_upstream = None;
  }

  fn ensure_resources(&mut self, resolution: u32) -> SdfResult<()> {
    if self
      .targets
      .as_ref()
      .is_some_and(|t| t.working.resolution() == resolution)
    {
      return Ok(());
    }
    self.targets = None;
    self.last_upstream = None;
    self.targets = Some(FillTargets {
      working: Arc::new(VolumeTexture::new(resolution, "gap fill working")?),
      scratch: VolumeTexture::new(resolution, "gap fill scratch")?,
    });
    Ok(())
  }
}

impl VolumeSource for GapFillOperator {
  fn update(&mut self, ctx: &TickContext) {
    let Some(source) = self.source.as_mut() else {
      self.not_ready(NotReadyReason::MissingInput);
      return;
    };
    source.update(ctx);
    if !ctx.should_update(self.settings.update_while_inactive) {
      return;
    }

    let upstream_version = source.version();
    let Some(input) = source.try_get_volume() else {
      self.not_ready(NotReadyReason::UpstreamNotReady);
      return;
    };
    let definition = input.definition;
    let resolution = definition.grid_resolution();

    if let Err(err) = self.ensure_resources(resolution) {
      self.release();
      self.warn.warn("gap-fill-allocation", || format!("gap fill: {err}"));
      return;
    }
    if self.definition.is_some() && self.last_upstream == Some((upstream_version, resolution)) {
      return;
    }
    let Some(targets) = &self.targets else {
      return;
    };

    let far = definition.normalized_sdf_far();
    let voxel_size = definition.normalized_voxel_size();
    let _span = tracing::info_span!("gap_fill", resolution).entered();

    let working: &VolumeTexture = &targets.working;
    working.copy_from(&input.texture);
    let mut src = working;
    let mut dst = &targets.scratch;
    for stride in pass_strides(resolution) {
      fill_pass(src, dst, stride, far, voxel_size);
      std::mem::swap(&mut src, &mut dst);
    }
    if !std::ptr::eq(src, working) {
      working.copy_from(src);
    }

    self.definition = Some(definition);
    self.color = input.color;
    self.last_upstream = Some((upstream_version, resolution));
    self.version.bump();
  }

  fn try_get_volume(&self) -> Option<Volume> {
    let definition = self.definition?;
    let targets = self.targets.as_ref()?;
    let volume = Volume::new(definition, targets.working.clone(), self.color.clone());
    volume.is_valid().then_some(volume)
  }

  fn version(&self) -> u32 {
    self.version.get()
  }

  fn label(&self) -> &str {
    "gap-fill"
  }
}

#[cfg(test)]
#[path = "gap_fill_test.rs"]
mod gap_fill_test;
