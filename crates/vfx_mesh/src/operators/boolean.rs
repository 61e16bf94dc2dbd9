//! Boolean combiner: folds an ordered list of sources with a smooth CSG
//! operator.
//!
//! ```text
//!   ready[0] ──copy──▶ accumulator
//!   ready[1] ──blend── accumulator ─▶ scratch
//!   ready[2] ──blend── scratch ─────▶ accumulator
//!   ...                               (copy back if the result is in scratch)
//! ```
//!
//! Operators use `k = β * normalized_voxel_size` of the first ready source:
//! union `smin(a, b, k)`, intersection `smax(a, b, k)`, difference
//! `smax(a, 2·iso - b, k)`. A zero `k` is a hard min/max. Difference also
//! lifts voxels more than one voxel inside the subtrahend to at least `far`,
//! so `A - A` leaves nothing behind at any iso value.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use smallvec::SmallVec;

use crate::compute::{dispatch_cube, smooth_max, smooth_min, ColorTexture, VolumeTexture};
use crate::definition::VolumeDefinition;
use crate::diagnostics::WarnOnce;
use crate::error::{NotReadyReason, SdfError, SdfResult};
use crate::volume::{TickContext, Version, Volume, VolumeSource};

pub const BLEND_VOXELS_MIN: f32 = 0.0;
pub const BLEND_VOXELS_MAX: f32 = 20.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BooleanOp {
  #[default]
  Union,
  Intersection,
  /// First ready source minus every following one.
  Difference,
}

impl BooleanOp {
  /// Blend at iso 0 without excision.
  #[inline]
  pub fn apply(self, a: f32, b: f32, k: f32) -> f32 {
    self.apply_at(a, b, &BlendParams::unexcised(k))
  }

  #[inline]
  pub fn apply_at(self, a: f32, b: f32, params: &BlendParams) -> f32 {
    let k = params.k;
    match self {
      BooleanOp::Union => smooth_min(a, b, k),
      BooleanOp::Intersection => smooth_max(a, b, k),
      BooleanOp::Difference => {
        let cut = smooth_max(a, 2.0 * params.iso - b, k);
        if b < params.iso - params.band {
          cut.max(params.far)
        } else {
          cut
        }
      }
    }
  }
}

/// Per-blend constants in normalized distance units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BlendParams {
  /// Smoothing width.
  pub k: f32,
  pub iso: f32,
  pub far: f32,
  /// Depth inside the subtrahend past which difference excises to `far`.
  pub band: f32,
}

impl BlendParams {
  pub fn new(definition: &VolumeDefinition, blend_voxels: f32) -> Self {
    let voxel = definition.normalized_voxel_size();
    Self {
      k: blend_voxels * voxel,
      iso: definition.normalized_iso(),
      far: definition.normalized_sdf_far(),
      band: voxel,
    }
  }

  fn unexcised(k: f32) -> Self {
    Self {
      k,
      iso: 0.0,
      far: f32::INFINITY,
      band: f32::INFINITY,
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BooleanSettings {
  pub operation: BooleanOp,
  /// Blend width β in voxels. Range [0, 20].
  pub blend_voxels: f32,
  pub update_while_inactive: bool,
}

impl Default for BooleanSettings {
  fn default() -> Self {
    Self {
      operation: BooleanOp::Union,
      blend_voxels: 4.0,
      update_while_inactive: true,
    }
  }
}

impl BooleanSettings {
  pub fn with_operation(mut self, operation: BooleanOp) -> Self {
    self.operation = operation;
    self
  }

  pub fn with_blend_voxels(mut self, blend_voxels: f32) -> Self {
    self.blend_voxels = blend_voxels;
    self
  }

  fn blend(&self) -> f32 {
    if self.blend_voxels.is_finite() {
      self.blend_voxels.clamp(BLEND_VOXELS_MIN, BLEND_VOXELS_MAX)
    } else {
      BLEND_VOXELS_MIN
    }
  }
}

struct BlendTargets {
  accumulator: Arc<VolumeTexture>,
  scratch: VolumeTexture,
}

impl BlendTargets {
  fn allocate(resolution: u32) -> SdfResult<Self> {
    Ok(Self {
      accumulator: Arc::new(VolumeTexture::new(resolution, "boolean accumulator")?),
      scratch: VolumeTexture::new(resolution, "boolean scratch")?,
    })
  }

  fn resolution(&self) -> u32 {
    self.accumulator.resolution()
  }
}

/// Combines an ordered list of sources into one volume.
pub struct BooleanCombiner {
  pub settings: BooleanSettings,
  sources: Vec<Box<dyn VolumeSource>>,
  targets: Option<BlendTargets>,
  definition: Option<VolumeDefinition>,
  color: Option<Arc<ColorTexture>>,
  last_key: Option<u64>,
  version: Version,
  warn: WarnOnce,
}

impl BooleanCombiner {
  pub fn new(sources: Vec<Box<dyn VolumeSource>>) -> Self {
    Self {
      settings: BooleanSettings::default(),
      sources,
      targets: None,
      definition: None,
      color: None,
      last_key: None,
      version: Version::default(),
      warn: WarnOnce::new(),
    }
  }

  pub fn with_settings(mut self, settings: BooleanSettings) -> Self {
    self.settings = settings;
    self
  }

  pub fn push_source(&mut self, source: Box<dyn VolumeSource>) {
    self.sources.push(source);
  }

  pub fn sources(&self) -> &[Box<dyn VolumeSource>] {
    &self.sources
  }

  pub fn sources_mut(&mut self) -> &mut [Box<dyn VolumeSource>] {
    &mut self.sources
  }

  pub fn release(&mut self) {
    self.targets = None;
    self.definition = None;
    self.color = None;
    self.last_key = None;
  }

  fn not_ready(&mut self, reason: NotReadyReason) {
    if self.definition.take().is_some() {
      tracing::debug!(error = %SdfError::NotReady(reason), "boolean combiner");
    }
    self.color = None;
    self.last_key = None;
  }

  fn ensure_resources(&mut self, resolution: u32) -> SdfResult<()> {
    if self
      .targets
      .as_ref()
      .is_some_and(|t| t.resolution() == resolution)
    {
      return Ok(());
    }
    self.targets = None;
    self.last_key = None;
    self.targets = Some(BlendTargets::allocate(resolution)?);
    Ok(())
  }

  /// Ready sources sharing the first ready source's resolution, in order.
  fn collect_ready(&mut self) -> SmallVec<[(usize, u32, Volume); 4]> {
    let mut ready: SmallVec<[(usize, u32, Volume); 4]> = SmallVec::new();
    for (index, source) in self.sources.iter().enumerate() {
      let Some(volume) = source.try_get_volume() else {
        continue;
      };
      let key = format!("boolean-resolution-mismatch-{index}");
      if let Some((_, _, first)) = ready.first() {
        let expected = first.grid_resolution();
        let actual = volume.grid_resolution();
        if actual != expected {
          self.warn.warn(key, || {
            format!(
              "boolean source {index} ({}) has resolution {actual}, expected {expected}; skipped",
              source.label()
            )
          });
          continue;
        }
      }
      self.warn.clear(&key);
      ready.push((index, source.version(), volume));
    }
    ready
  }

  fn cache_key(&self, ready: &[(usize, u32, Volume)]) -> u64 {
    let mut hasher = DefaultHasher::new();
    for (index, version, _) in ready {
      index.hash(&mut hasher);
      version.hash(&mut hasher);
    }
    self.settings.operation.hash(&mut hasher);
    self.settings.blend().to_bits().hash(&mut hasher);
    hasher.finish()
  }
}

impl VolumeSource for BooleanCombiner {
  fn update(&mut self, ctx: &TickContext) {
    for source in &mut self.sources {
      source.update(ctx);
    }
    if !ctx.should_update(self.settings.update_while_inactive) {
      return;
    }

    let ready = self.collect_ready();
    let Some((_, _, first)) = ready.first() else {
      self.not_ready(NotReadyReason::NoReadySources);
      return;
    };
    let definition = first.definition;
    let color = first.color.clone();

    if let Err(err) = self.ensure_resources(definition.grid_resolution()) {
      self.release();
      self.warn.warn("boolean-allocation", || format!("boolean combiner: {err}"));
      return;
    }

    let key = self.cache_key(&ready);
    if self.definition.is_some() && self.last_key == Some(key) {
      return;
    }

    let Some(targets) = &self.targets else {
      return;
    };
    let _span = tracing::info_span!("boolean", sources = ready.len()).entered();

    let op = self.settings.operation;
    let params = BlendParams::new(&definition, self.settings.blend());
    let accumulator: &VolumeTexture = &targets.accumulator;
    accumulator.copy_from(&first.texture);

    let mut src = accumulator;
    let mut dst = &targets.scratch;
    for (_, _, volume) in ready.iter().skip(1) {
      let b = &volume.texture;
      dispatch_cube(definition.grid_resolution(), |[x, y, z]| {
        dst.store(x, y, z, op.apply_at(src.load(x, y, z), b.load(x, y, z), &params));
      });
      std::mem::swap(&mut src, &mut dst);
    }
    if !std::ptr::eq(src, accumulator) {
      accumulator.copy_from(src);
    }

    self.definition = Some(definition);
    self.color = color;
    self.last_key = Some(key);
    self.version.bump();
  }

  fn try_get_volume(&self) -> Option<Volume> {
    let definition = self.definition?;
    let targets = self.targets.as_ref()?;
    let volume = Volume::new(definition, targets.accumulator.clone(), self.color.clone());
    volume.is_valid().then_some(volume)
  }

  fn version(&self) -> u32 {
    self.version.get()
  }

  fn label(&self) -> &str {
    "boolean"
  }
}

#[cfg(test)]
#[path = "boolean_test.rs"]
mod boolean_test;
