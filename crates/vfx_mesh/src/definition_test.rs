use glam::{Quat, UVec3, Vec3};

use super::*;
use crate::constants::{SPLAT_RESOLUTION_MAX, SPLAT_RESOLUTION_MIN};

const SPLAT_RANGE: ResolutionRange = SPLAT_RESOLUTION_MIN..=SPLAT_RESOLUTION_MAX;

#[test]
fn test_distance_scale_uses_largest_axis() {
  for size in [
    Vec3::new(4.0, 4.0, 4.0),
    Vec3::new(1.0, 8.0, 2.0),
    Vec3::new(0.5, 0.25, 3.0),
  ] {
    let def = VolumeDefinition::new(64, size, 0.0, 5.0, Mat4::IDENTITY);
    assert_eq!(def.distance_scale(), 1.0 / size.max_element());
    assert!(def.distance_scale() > 0.0);
  }
}

#[test]
fn test_distance_scale_degenerate_bounds() {
  assert_eq!(compute_distance_scale(Vec3::ZERO), 1.0);
  assert_eq!(compute_distance_scale(Vec3::splat(-2.0)), 1.0);
}

#[test]
fn test_derived_quantities() {
  let def = VolumeDefinition::new(
    64,
    Vec3::splat(4.0),
    0.1,
    5.0,
    Transform::from_translation(Vec3::new(1.0, 0.0, 0.0)).to_matrix(),
  );
  assert_eq!(def.cell_resolution(), 63);
  assert_eq!(def.cell_count(), 63 * 63 * 63);
  assert_eq!(def.voxel_size(), 4.0 / 64.0);
  assert_eq!(def.bounds_center(), Vec3::new(1.0, 0.0, 0.0));
  assert_eq!(def.bounds_min(), Vec3::new(-1.0, -2.0, -2.0));
  assert!((def.normalized_sdf_far() - 1.25).abs() < 1e-6);
  assert!((def.normalized_iso() - 0.025).abs() < 1e-6);
  assert!((def.normalized_voxel_size() - 1.0 / 64.0).abs() < 1e-7);
}

#[test]
fn test_transforms_are_inverse() {
  let transform = Transform::from_translation(Vec3::new(3.0, -1.0, 2.0))
    .with_rotation(Quat::from_rotation_z(0.7))
    .with_scale(Vec3::new(1.0, 2.0, 0.5));
  let def = VolumeDefinition::new(32, Vec3::ONE, 0.0, 1.0, transform.to_matrix());
  let product = def.local_to_world() * def.world_to_local();
  assert!(product.abs_diff_eq(Mat4::IDENTITY, 1e-5));
}

#[test]
fn test_voxel_centres_and_back() {
  let def = VolumeDefinition::new(4, Vec3::splat(4.0), 0.0, 1.0, Mat4::IDENTITY);
  assert_eq!(def.voxel_to_local(UVec3::ZERO), Vec3::splat(-1.5));
  assert_eq!(def.voxel_to_local(UVec3::splat(3)), Vec3::splat(1.5));
  let back = def.local_to_voxel(Vec3::new(-1.5, 0.5, 1.5));
  assert!((back - Vec3::new(0.0, 2.0, 3.0)).length() < 1e-6);
}

#[test]
fn test_sanitize_clamps_out_of_range_values() {
  let settings = DefinitionSettings::default()
    .with_grid_resolution(1000)
    .with_bounds_size(Vec3::new(-1.0, 0.0, 2.0))
    .with_sdf_far(-3.0);
  let sane = settings.sanitized(&SPLAT_RANGE);
  assert_eq!(sane.grid_resolution, SPLAT_RESOLUTION_MAX);
  assert_eq!(sane.bounds_size, Vec3::new(0.01, 0.01, 2.0));
  assert_eq!(sane.sdf_far, 0.01);

  let low = DefinitionSettings::default().with_grid_resolution(8);
  assert_eq!(low.sanitized(&FULL_RESOLUTION_RANGE).grid_resolution, 32);
}

#[test]
fn test_binding_prefers_shared_definition() {
  let shared = SharedDefinition::new(DefinitionSource::new(
    DefinitionSettings::default()
      .with_grid_resolution(80)
      .with_bounds_size(Vec3::splat(2.0)),
    Transform::IDENTITY,
  ));
  let binding = DefinitionBinding::local(DefinitionSettings::default(), Transform::IDENTITY)
    .with_shared(shared.clone());
  let mut warn = WarnOnce::new();

  let def = binding.resolve(&SPLAT_RANGE, &mut warn);
  assert_eq!(def.grid_resolution(), 80);
  assert_eq!(def.bounds_size(), Vec3::splat(2.0));
  assert!(warn.is_empty());

  // Shared resolution outside the generator range is clamped.
  shared.update(|source| source.settings.grid_resolution = 192);
  assert_eq!(binding.resolve(&SPLAT_RANGE, &mut warn).grid_resolution(), 160);
}

#[test]
fn test_binding_falls_back_to_local_with_single_warning() {
  let shared = SharedDefinition::new(DefinitionSource::default());
  shared.update(|source| source.enabled = false);
  let local = DefinitionSettings::default().with_grid_resolution(64);
  let binding = DefinitionBinding::local(local, Transform::IDENTITY).with_shared(shared.clone());
  let mut warn = WarnOnce::new();

  assert_eq!(binding.resolve(&SPLAT_RANGE, &mut warn).grid_resolution(), 64);
  assert_eq!(warn.len(), 1);
  binding.resolve(&SPLAT_RANGE, &mut warn);
  assert_eq!(warn.len(), 1);

  // Recovery re-arms the warning.
  shared.update(|source| source.enabled = true);
  assert_eq!(binding.resolve(&SPLAT_RANGE, &mut warn).grid_resolution(), 96);
  assert!(warn.is_empty());
}
