use std::sync::atomic::{AtomicUsize, Ordering};

use glam::{Quat, UVec3, Vec2, Vec3};

use super::*;

fn definition() -> DefinitionSettings {
  DefinitionSettings::default()
    .with_grid_resolution(32)
    .with_bounds_size(Vec3::splat(3.0))
}

/// View behind the volume looking down +Z, covering it completely.
fn front_transform() -> Transform {
  Transform::from_translation(Vec3::new(0.0, 0.0, -1.5))
}

fn flat_view(depth: f32) -> DepthView {
  DepthView::manual(
    DepthImage::from_fn(16, 16, |_, _| depth),
    front_transform(),
    Vec2::splat(3.0),
    0.0,
    3.0,
  )
}

fn generator(views: Vec<DepthView>) -> DepthReprojectionGenerator {
  DepthReprojectionGenerator::new(definition(), Transform::IDENTITY, DepthImage::fallback())
    .with_views(views)
}

fn value_at(volume: &Volume, world: Vec3) -> f32 {
  let v: UVec3 = volume.definition.local_to_voxel(world).round().as_uvec3();
  volume.texture.load(v.x, v.y, v.z)
}

struct FlatCapture {
  depth: f32,
  renders: std::sync::Arc<AtomicUsize>,
}

impl DepthCapture for FlatCapture {
  fn camera(&self) -> Option<CaptureCamera> {
    Some(CaptureCamera {
      transform: front_transform(),
      near: 0.0,
      far: 3.0,
      orthographic_size: Some(1.5),
      aspect: 1.0,
    })
  }

  fn render(&mut self, _view: &DepthViewData, target: &mut DepthImage) -> CaptureOutcome {
    let first = self.renders.fetch_add(1, Ordering::Relaxed) == 0;
    target.fill(self.depth);
    if first {
      CaptureOutcome::Updated
    } else {
      CaptureOutcome::Unchanged
    }
  }
}

#[test]
fn test_no_views_is_not_ready() {
  let mut generator = generator(Vec::new());
  generator.update(&TickContext::default());
  assert!(generator.try_get_volume().is_none());
  assert_eq!(generator.version(), 0);
}

#[test]
fn test_flat_depth_produces_surface_band() {
  let mut generator = generator(vec![flat_view(0.5)]);
  generator.update(&TickContext::default());
  let volume = generator.try_get_volume().expect("volume after bake");
  let far = volume.definition.normalized_sdf_far();

  // Surface sits at world z = 0.
  assert!(value_at(&volume, Vec3::new(0.0, 0.0, -0.5)) > 0.0);
  assert!(value_at(&volume, Vec3::new(0.0, 0.0, 0.1)) < 0.0);
  // Deeper than the thickness band: no information.
  assert_eq!(value_at(&volume, Vec3::new(0.0, 0.0, 1.0)), far);
  assert_eq!(generator.version(), 1);
}

#[test]
fn test_band_is_colored_white() {
  let mut generator = generator(vec![flat_view(0.5)]);
  generator.update(&TickContext::default());
  let volume = generator.try_get_volume().unwrap();
  let color = volume.color.as_ref().unwrap();

  let inside: UVec3 = volume
    .definition
    .local_to_voxel(Vec3::new(0.0, 0.0, 0.1))
    .round()
    .as_uvec3();
  assert_eq!(color.load(inside.x, inside.y, inside.z), glam::Vec4::ONE);
  let deep: UVec3 = volume
    .definition
    .local_to_voxel(Vec3::new(0.0, 0.0, 1.2))
    .round()
    .as_uvec3();
  assert_eq!(color.load(deep.x, deep.y, deep.z), glam::Vec4::ZERO);
}

#[test]
fn test_hit_nothing_stays_far() {
  let mut generator = generator(vec![flat_view(1.0)]);
  generator.update(&TickContext::default());
  let volume = generator.try_get_volume().unwrap();
  let far = volume.definition.normalized_sdf_far();
  assert!(volume.texture.read_all().iter().all(|&v| v == far));
}

#[test]
fn test_unchanged_views_take_fast_path() {
  let mut generator = generator(vec![flat_view(0.5)]);
  let ctx = TickContext::default();
  generator.update(&ctx);
  generator.update(&ctx);
  assert_eq!(generator.version(), 1);

  if let Some(view) = generator.view_mut(0) {
    if let DepthViewSource::Manual { far, .. } = &mut view.source {
      *far = 4.0;
    }
  }
  generator.update(&ctx);
  assert_eq!(generator.version(), 2);
}

#[test]
fn test_disabled_view_drops_volume() {
  let mut generator = generator(vec![flat_view(0.5)]);
  generator.update(&TickContext::default());
  assert!(generator.try_get_volume().is_some());

  if let Some(view) = generator.view_mut(0) {
    view.enabled = false;
  }
  generator.update(&TickContext::default());
  assert!(generator.try_get_volume().is_none());
  assert_eq!(generator.version(), 1);
}

#[test]
fn test_manual_view_parameters_are_sanitized() {
  let view = DepthView::manual(
    DepthImage::from_fn(4, 4, |_, _| 0.5),
    front_transform(),
    Vec2::ZERO,
    -2.0,
    -1.0,
  );
  let mut generator = generator(vec![view]);
  generator.update(&TickContext::default());
  let packed = generator.packed_views()[0];
  assert_eq!(packed.size, Vec2::splat(MIN_EXTENT));
  assert_eq!(packed.near, 0.0);
  assert_eq!(packed.far, MIN_EXTENT);
}

#[test]
fn test_at_most_six_views_are_packed() {
  let views = (0..8).map(|_| flat_view(0.5)).collect();
  let mut generator = generator(views);
  generator.update(&TickContext::default());
  assert!(generator
    .packed_views()
    .iter()
    .all(|view| view.forward == Vec3::Z));
}

#[test]
fn test_unused_slots_are_zeroed() {
  let mut generator = generator(vec![flat_view(0.5), flat_view(0.25)]);
  generator.update(&TickContext::default());
  let packed = generator.packed_views();
  assert_eq!(packed[1].forward, Vec3::Z);
  assert_eq!(packed[2], DepthViewData::default());
  assert_eq!(packed[5], DepthViewData::default());
}

#[test]
fn test_views_combine_by_min() {
  // The nearer surface wins in front of both.
  let mut both = generator(vec![flat_view(0.5), flat_view(0.25)]);
  both.update(&TickContext::default());
  let mut single = generator(vec![flat_view(0.25)]);
  single.update(&TickContext::default());

  let probe = Vec3::new(0.0, 0.0, -1.0);
  let a = value_at(&both.try_get_volume().unwrap(), probe);
  let b = value_at(&single.try_get_volume().unwrap(), probe);
  assert_eq!(a, b);
}

#[test]
fn test_axis_aligned_rejects_oblique_views() {
  let oblique = DepthView::manual(
    DepthImage::from_fn(4, 4, |_, _| 0.5),
    front_transform().with_rotation(Quat::from_rotation_y(0.6)),
    Vec2::splat(3.0),
    0.0,
    3.0,
  );
  let mut generator = generator(vec![oblique]).with_settings(DepthReprojectionSettings {
    projection: ProjectionMode::AxisAligned,
    ..Default::default()
  });
  generator.update(&TickContext::default());
  assert!(generator.try_get_volume().is_none());
  assert!(generator.warn.has_reported("depth-view-0-misaligned"));
}

#[test]
fn test_axis_aligned_snaps_nearly_aligned_views() {
  let nearly = DepthView::manual(
    DepthImage::from_fn(4, 4, |_, _| 0.5),
    front_transform().with_rotation(Quat::from_rotation_y(0.01)),
    Vec2::splat(3.0),
    0.0,
    3.0,
  );
  let mut generator = generator(vec![nearly, flat_view(0.5)]).with_settings(
    DepthReprojectionSettings {
      projection: ProjectionMode::AxisAligned,
      ..Default::default()
    },
  );
  generator.update(&TickContext::default());
  assert!(generator.try_get_volume().is_some());
  let packed = generator.packed_views();
  assert_eq!(packed[0].forward, Vec3::Z);
  assert_eq!(packed[0].right, Vec3::X);
  // Single view only.
  assert_eq!(packed[1], DepthViewData::default());
}

#[test]
fn test_capture_view_renders_into_owned_target() {
  let renders = std::sync::Arc::new(AtomicUsize::new(0));
  let device = FlatCapture {
    depth: 0.5,
    renders: renders.clone(),
  };
  let mut generator = generator(vec![DepthView::capture(Box::new(device), [8, 8])]);
  let ctx = TickContext::default();
  generator.update(&ctx);
  assert_eq!(generator.capture_target_count(), 1);
  assert_eq!(generator.packed_views()[0].size, Vec2::splat(3.0));
  let volume = generator.try_get_volume().unwrap();
  assert!(value_at(&volume, Vec3::new(0.0, 0.0, 0.1)) < 0.0);

  // Unchanged capture keeps the previous bake.
  generator.update(&ctx);
  assert_eq!(renders.load(Ordering::Relaxed), 2);
  assert_eq!(generator.version(), 1);

  generator.set_views(Vec::new());
  generator.update(&ctx);
  assert_eq!(generator.capture_target_count(), 0);
  assert!(generator.try_get_volume().is_none());
}

#[test]
fn test_capture_camera_view_size() {
  let camera = CaptureCamera {
    transform: Transform::IDENTITY,
    near: 0.1,
    far: 10.0,
    orthographic_size: Some(2.0),
    aspect: 1.5,
  };
  assert_eq!(camera.view_size(None), Vec2::new(6.0, 4.0));
  assert_eq!(camera.view_size(Some(Vec2::new(1.0, 2.0))), Vec2::new(1.0, 2.0));
  // A non-positive override falls back to the orthographic size.
  assert_eq!(camera.view_size(Some(Vec2::new(0.0, 2.0))), Vec2::new(6.0, 4.0));

  let perspective = CaptureCamera {
    orthographic_size: None,
    ..camera
  };
  assert_eq!(perspective.view_size(None), Vec2::ZERO);
}
