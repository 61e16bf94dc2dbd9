//! Depth-reprojection generator.
//!
//! Rebuilds a volume from up to [`MAX_DEPTH_VIEWS`] orthographic depth
//! images. Every voxel is projected into every packed view:
//!
//! ```text
//!              right ─▶
//!        ┌───────────────────┐  ▲ up          z = dot(p - origin, forward)
//!        │  depth image      │  │             u = dot(p - origin, right) / w + 0.5
//!        │  (0 near, 1 far)  │  │             v = dot(p - origin, up)    / h + 0.5
//!        └───────────────────┘
//!              │ forward
//!              ▼
//!        surface s = near + depth * (far - near)
//!        signed distance = s - z   (positive in front of the surface)
//! ```
//!
//! Views combine with `min`. Voxels more than `thickness` behind a view's
//! surface get no contribution from that view, and voxels no view covers
//! stay at the far clamp.
//!
//! Unused parameter slots are zero-filled and bound to the generator's own
//! fallback image (1x1, value 1.0 = nothing hit) so the kernel never reads an
//! unbound resource.

use std::sync::Arc;

use glam::{UVec3, Vec2, Vec3, Vec4};

use crate::compute::{dispatch_cube, ColorTexture, DepthImage, VolumeTexture};
use crate::constants::{GRID_RESOLUTION_MAX, GRID_RESOLUTION_MIN, MAX_DEPTH_VIEWS, MIN_EXTENT};
use crate::definition::{
  DefinitionBinding, DefinitionSettings, ResolutionRange, SharedDefinition, VolumeDefinition,
};
use crate::diagnostics::WarnOnce;
use crate::error::{NotReadyReason, SdfError, SdfResult};
use crate::types::Transform;
use crate::volume::{TickContext, Version, Volume, VolumeSource};

const RESOLUTION_RANGE: ResolutionRange = GRID_RESOLUTION_MIN..=GRID_RESOLUTION_MAX;

/// Minimum |dot(forward, axis)| for a view to count as axis aligned.
pub const AXIS_ALIGNMENT_THRESHOLD: f32 = 0.999;

/// One packed view descriptor, as consumed by the bake kernel.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct DepthViewData {
  pub origin: Vec3,
  pub right: Vec3,
  pub up: Vec3,
  pub forward: Vec3,
  pub size: Vec2,
  pub near: f32,
  pub far: f32,
}

impl DepthViewData {
  fn from_transform(transform: &Transform, size: Vec2, near: f32, far: f32) -> Self {
    Self {
      origin: transform.translation,
      right: transform.right().normalize_or_zero(),
      up: transform.up().normalize_or_zero(),
      forward: transform.forward().normalize_or_zero(),
      size,
      near,
      far,
    }
  }

  /// `(u, v, z)` of a world point in this view.
  #[inline]
  pub fn project(&self, world: Vec3) -> Vec3 {
    let rel = world - self.origin;
    Vec3::new(
      rel.dot(self.right) / self.size.x + 0.5,
      rel.dot(self.up) / self.size.y + 0.5,
      rel.dot(self.forward),
    )
  }

  /// Snap the basis to the nearest principal axes; `None` when forward is
  /// not within [`AXIS_ALIGNMENT_THRESHOLD`] of an axis.
  pub fn snapped_to_axis(&self) -> Option<Self> {
    let forward = snap_axis(self.forward)?;
    let right = dominant_axis(self.right);
    let up = dominant_axis(self.up);
    if right.dot(forward).abs() > 0.5 || up.dot(forward).abs() > 0.5 || right.dot(up).abs() > 0.5 {
      return None;
    }
    Some(Self {
      forward,
      right,
      up,
      ..*self
    })
  }
}

fn dominant_axis(v: Vec3) -> Vec3 {
  let a = v.abs();
  if a.x >= a.y && a.x >= a.z {
    Vec3::X * v.x.signum()
  } else if a.y >= a.z {
    Vec3::Y * v.y.signum()
  } else {
    Vec3::Z * v.z.signum()
  }
}

fn snap_axis(v: Vec3) -> Option<Vec3> {
  let axis = dominant_axis(v);
  (v.dot(axis) >= AXIS_ALIGNMENT_THRESHOLD).then_some(axis)
}

/// Result of asking a capture device to render.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureOutcome {
  /// The target holds a new image.
  Updated,
  /// The target still holds the previous image.
  Unchanged,
  /// The device could not render this tick.
  Unavailable,
}

/// Placement and projection of a capture camera.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CaptureCamera {
  pub transform: Transform,
  pub near: f32,
  pub far: f32,
  /// Half-height of an orthographic camera; `None` for perspective cameras.
  pub orthographic_size: Option<f32>,
  pub aspect: f32,
}

impl CaptureCamera {
  /// Physical view size: the override when both axes are positive, else the
  /// orthographic extents. Perspective cameras without override have none.
  pub fn view_size(&self, size_override: Option<Vec2>) -> Vec2 {
    if let Some(size) = size_override.filter(|s| s.x > 0.0 && s.y > 0.0) {
      return size;
    }
    match self.orthographic_size {
      Some(half_height) => {
        let height = half_height * 2.0;
        Vec2::new(height * self.aspect, height)
      }
      None => Vec2::ZERO,
    }
  }
}

/// External device that renders normalized depth into a generator-owned
/// off-screen target.
pub trait DepthCapture: Send {
  /// Current camera, or `None` when the device is gone.
  fn camera(&self) -> Option<CaptureCamera>;

  /// Render the view into `target` (already sized to the configured
  /// resolution).
  fn render(&mut self, view: &DepthViewData, target: &mut DepthImage) -> CaptureOutcome;
}

/// Where a view's depth image comes from.
pub enum DepthViewSource {
  /// A supplied image and placement.
  Manual {
    image: Option<Arc<DepthImage>>,
    transform: Transform,
    size: Vec2,
    near: f32,
    far: f32,
  },
  /// A capture device rendering into an owned target of `resolution`.
  Capture {
    device: Box<dyn DepthCapture>,
    resolution: [u32; 2],
    size_override: Option<Vec2>,
  },
}

/// One configured depth view.
pub struct DepthView {
  pub enabled: bool,
  pub source: DepthViewSource,
}

impl DepthView {
  pub fn manual(image: DepthImage, transform: Transform, size: Vec2, near: f32, far: f32) -> Self {
    Self {
      enabled: true,
      source: DepthViewSource::Manual {
        image: Some(Arc::new(image)),
        transform,
        size,
        near,
        far,
      },
    }
  }

  pub fn capture(device: Box<dyn DepthCapture>, resolution: [u32; 2]) -> Self {
    Self {
      enabled: true,
      source: DepthViewSource::Capture {
        device,
        resolution,
        size_override: None,
      },
    }
  }
}

/// Projection variant.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ProjectionMode {
  /// Single view snapped to a principal axis; misaligned views are rejected.
  AxisAligned,
  /// Up to six arbitrarily oriented views.
  #[default]
  Oriented,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthReprojectionSettings {
  pub projection: ProjectionMode,
  /// Depth of the band behind each observed surface that counts as inside,
  /// in voxels.
  pub surface_thickness_voxels: f32,
  pub update_while_inactive: bool,
}

impl Default for DepthReprojectionSettings {
  fn default() -> Self {
    Self {
      projection: ProjectionMode::Oriented,
      surface_thickness_voxels: 4.0,
      update_while_inactive: true,
    }
  }
}

/// Which image a packed slot samples.
enum SlotImage {
  Manual(Arc<DepthImage>),
  Capture(usize),
}

#[derive(Clone, Copy, Debug, PartialEq)]
struct DepthKey {
  definition: VolumeDefinition,
  settings: DepthReprojectionSettings,
  input_revision: u64,
  packed: [DepthViewData; MAX_DEPTH_VIEWS],
  count: usize,
}

/// Synthesizes a volume from depth images.
pub struct DepthReprojectionGenerator {
  pub settings: DepthReprojectionSettings,
  pub binding: DefinitionBinding,
  views: Vec<DepthView>,
  input_revision: u64,
  fallback: DepthImage,
  capture_targets: Vec<Option<DepthImage>>,
  packed: [DepthViewData; MAX_DEPTH_VIEWS],
  sdf: Option<Arc<VolumeTexture>>,
  color: Option<Arc<ColorTexture>>,
  definition: Option<VolumeDefinition>,
  last_key: Option<DepthKey>,
  version: Version,
  warn: WarnOnce,
}

impl DepthReprojectionGenerator {
  /// `fallback` is bound to every unused view slot for the generator's
  /// lifetime.
  pub fn new(definition: DefinitionSettings, transform: Transform, fallback: DepthImage) -> Self {
    Self {
      settings: DepthReprojectionSettings::default(),
      binding: DefinitionBinding::local(definition, transform),
      views: Vec::new(),
      input_revision: 0,
      fallback,
      capture_targets: (0..MAX_DEPTH_VIEWS).map(|_| None).collect(),
      packed: [DepthViewData::default(); MAX_DEPTH_VIEWS],
      sdf: None,
      color: None,
      definition: None,
      last_key: None,
      version: Version::default(),
      warn: WarnOnce::new(),
    }
  }

  /// Default definition for depth volumes: 96³ over a 3 unit cube.
  pub fn default_definition() -> DefinitionSettings {
    DefinitionSettings::default().with_bounds_size(Vec3::splat(3.0))
  }

  pub fn with_settings(mut self, settings: DepthReprojectionSettings) -> Self {
    self.settings = settings;
    self
  }

  pub fn with_shared_definition(mut self, shared: SharedDefinition) -> Self {
    self.binding.shared = Some(shared);
    self
  }

  pub fn with_views(mut self, views: Vec<DepthView>) -> Self {
    self.set_views(views);
    self
  }

  pub fn set_views(&mut self, views: Vec<DepthView>) {
    self.views = views;
    self.input_revision += 1;
  }

  pub fn push_view(&mut self, view: DepthView) {
    self.views.push(view);
    self.input_revision += 1;
  }

  /// Mutable access to a view; marks the inputs as changed.
  pub fn view_mut(&mut self, index: usize) -> Option<&mut DepthView> {
    self.input_revision += 1;
    self.views.get_mut(index)
  }

  pub fn views(&self) -> &[DepthView] {
    &self.views
  }

  /// The packed view parameter block of the last bake.
  pub fn packed_views(&self) -> &[DepthViewData; MAX_DEPTH_VIEWS] {
    &self.packed
  }

  /// Capture targets currently allocated.
  pub fn capture_target_count(&self) -> usize {
    self.capture_targets.iter().filter(|t| t.is_some()).count()
  }

  pub fn fallback(&self) -> &DepthImage {
    &self.fallback
  }

  pub fn release(&mut self) {
    self.sdf = None;
    self.color = None;
    self.definition = None;
    self.last_key = None;
    self.capture_targets.iter_mut().for_each(|t| *t = None);
  }

  fn ensure_resources(&mut self, resolution: u32) -> SdfResult<()> {
    if self.sdf.as_ref().is_some_and(|t| t.resolution() == resolution)
      && self.color.as_ref().is_some_and(|t| t.resolution() == resolution)
    {
      return Ok(());
    }
    self.sdf = None;
    self.color = None;
    self.last_key = None;
    self.sdf = Some(Arc::new(VolumeTexture::new(resolution, "depth sdf volume")?));
    self.color = Some(Arc::new(ColorTexture::new(resolution, "depth color volume")?));
    Ok(())
  }

  /// Build the packed parameter block; returns the slot images and whether
  /// any capture produced a new image.
  fn populate_views(&mut self) -> (Vec<SlotImage>, bool) {
    let max_views = match self.settings.projection {
      ProjectionMode::AxisAligned => 1,
      ProjectionMode::Oriented => MAX_DEPTH_VIEWS,
    };
    let mut images = Vec::with_capacity(max_views);
    let mut captured = false;
    let mut count = 0;

    for (index, view) in self.views.iter_mut().enumerate() {
      if count >= max_views {
        break;
      }
      if !view.enabled {
        continue;
      }

      let (data, image) = match &mut view.source {
        DepthViewSource::Manual {
          image,
          transform,
          size,
          near,
          far,
        } => {
          let Some(image) = image.as_ref().filter(|i| !i.is_empty()) else {
            continue;
          };
          let size = size.max(Vec2::splat(MIN_EXTENT));
          let near = near.max(0.0);
          let far = far.max(near + MIN_EXTENT);
          (
            DepthViewData::from_transform(transform, size, near, far),
            SlotImage::Manual(image.clone()),
          )
        }
        DepthViewSource::Capture {
          device,
          resolution,
          size_override,
        } => {
          let Some(camera) = device.camera() else {
            continue;
          };
          let size = camera.view_size(*size_override);
          if size.x <= 0.0 || size.y <= 0.0 || camera.far <= camera.near {
            self.warn.warn(format!("depth-view-{index}-degenerate"), || {
              format!("depth view {index}: capture camera has no usable orthographic extent")
            });
            continue;
          }
          let data = DepthViewData::from_transform(&camera.transform, size, camera.near, camera.far);

          let [w, h] = (*resolution).map(|v| v.max(1));
          let slot = count;
          let target = &mut self.capture_targets[slot];
          if target.as_ref().map(|t| t.size()) != Some([w, h]) {
            *target = match DepthImage::new(w, h, 1.0) {
              Ok(image) => Some(image),
              Err(err) => {
                self.warn.warn(format!("depth-view-{index}-target"), || {
                  format!("depth view {index}: {err}")
                });
                None
              }
            };
            captured = true;
          }
          let Some(target) = target.as_mut() else {
            continue;
          };
          match device.render(&data, target) {
            CaptureOutcome::Updated => captured = true,
            CaptureOutcome::Unchanged => {}
            CaptureOutcome::Unavailable => continue,
          }
          (data, SlotImage::Capture(slot))
        }
      };

      let data = match self.settings.projection {
        ProjectionMode::Oriented => data,
        ProjectionMode::AxisAligned => match data.snapped_to_axis() {
          Some(snapped) => snapped,
          None => {
            self.warn.warn(format!("depth-view-{index}-misaligned"), || {
              format!(
                "depth view {index}: forward {:?} is not aligned to a principal axis",
                data.forward
              )
            });
            continue;
          }
        },
      };

      self.packed[count] = data;
      images.push(image);
      count += 1;
    }

    for slot in count..MAX_DEPTH_VIEWS {
      self.packed[slot] = DepthViewData::default();
      if self.capture_targets[slot].take().is_some() {
        tracing::debug!(slot, "released depth capture target");
      }
    }
    // Capture targets of slots now fed by manual views are released too.
    for (slot, image) in images.iter().enumerate() {
      if matches!(image, SlotImage::Manual(_)) {
        self.capture_targets[slot] = None;
      }
    }

    (images, captured)
  }

  fn bake(&self, definition: &VolumeDefinition, images: &[SlotImage]) {
    let (Some(sdf), Some(color)) = (&self.sdf, &self.color) else {
      return;
    };

    let mut bound: [&DepthImage; MAX_DEPTH_VIEWS] = [&self.fallback; MAX_DEPTH_VIEWS];
    for (slot, image) in images.iter().enumerate() {
      bound[slot] = match image {
        SlotImage::Manual(image) => &**image,
        SlotImage::Capture(target) => self.capture_targets[*target]
          .as_ref()
          .unwrap_or(&self.fallback),
      };
    }

    let views = &self.packed[..images.len()];
    let far = definition.normalized_sdf_far();
    let scale = definition.distance_scale();
    let thickness = self.settings.surface_thickness_voxels.max(0.0) * definition.voxel_size();

    dispatch_cube(definition.grid_resolution(), |[x, y, z]| {
      let world = definition.voxel_to_world(UVec3::new(x, y, z));
      let mut best = far;
      for (view, image) in views.iter().zip(bound.iter()) {
        let p = view.project(world);
        if p.x < 0.0 || p.x > 1.0 || p.y < 0.0 || p.y > 1.0 || p.z < view.near || p.z > view.far {
          continue;
        }
        let depth = image.sample_bilinear(p.x, p.y);
        if depth >= 1.0 {
          continue;
        }
        let surface = view.near + depth.max(0.0) * (view.far - view.near);
        let signed = surface - p.z;
        if signed < -thickness {
          continue;
        }
        best = best.min(signed * scale);
      }
      let value = best.clamp(-far, far);
      sdf.store(x, y, z, value);
      let c = if value < far { Vec4::ONE } else { Vec4::ZERO };
      color.store(x, y, z, c);
    });
  }
}

impl VolumeSource for DepthReprojectionGenerator {
  fn update(&mut self, ctx: &TickContext) {
    if !ctx.should_update(self.settings.update_while_inactive) {
      return;
    }
    let definition = self.binding.resolve(&RESOLUTION_RANGE, &mut self.warn);

    if let Err(err) = self.ensure_resources(definition.grid_resolution()) {
      self.release();
      self.warn.warn("depth-allocation", || format!("depth generator: {err}"));
      return;
    }

    let (images, captured) = self.populate_views();
    if images.is_empty() {
      if self.definition.take().is_some() {
        tracing::debug!(error = %SdfError::NotReady(NotReadyReason::NoActiveViews), "depth generator");
      }
      self.last_key = None;
      return;
    }

    let key = DepthKey {
      definition,
      settings: self.settings,
      input_revision: self.input_revision,
      packed: self.packed,
      count: images.len(),
    };
    if !captured && self.definition.is_some() && self.last_key == Some(key) {
      return;
    }

    let _span = tracing::info_span!("depth_bake", views = images.len()).entered();
    self.bake(&definition, &images);
    self.definition = Some(definition);
    self.last_key = Some(key);
    self.version.bump();
  }

  fn try_get_volume(&self) -> Option<Volume> {
    let definition = self.definition?;
    let volume = Volume::new(definition, self.sdf.clone()?, Some(self.color.clone()?));
    volume.is_valid_with_color().then_some(volume)
  }

  fn version(&self) -> u32 {
    self.version.get()
  }

  fn label(&self) -> &str {
    "depth-reprojection"
  }
}

#[cfg(test)]
#[path = "depth_test.rs"]
mod depth_test;
