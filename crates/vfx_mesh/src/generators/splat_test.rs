use glam::{Mat4, UVec3, Vec3, Vec4};

use super::*;

fn definition() -> VolumeDefinition {
  VolumeDefinition::new(64, Vec3::splat(4.0), 0.0, 5.0, Mat4::IDENTITY)
}

fn nearest_voxel(def: &VolumeDefinition, world: Vec3) -> UVec3 {
  def.local_to_voxel(world).round().as_uvec3()
}

#[test]
fn test_settings_sanitize_keeps_fade_beyond_radius() {
  let s = SplatSettings::default()
    .with_sdf_radius(5.0, 1.0)
    .with_color_radius(0.1, 0.0)
    .sanitized();
  assert_eq!(s.sdf_radius_multiplier, 3.0);
  assert!((s.sdf_fade_multiplier - 3.01).abs() < 1e-6);
  assert_eq!(s.color_radius_multiplier, 0.5);
  assert!((s.color_fade_multiplier - 0.51).abs() < 1e-6);
}

#[test]
fn test_smoothstep_edges() {
  assert_eq!(smoothstep(1.0, 2.0, 0.5), 0.0);
  assert_eq!(smoothstep(1.0, 2.0, 2.5), 1.0);
  assert!((smoothstep(1.0, 2.0, 1.5) - 0.5).abs() < 1e-6);
}

#[test]
fn test_sphere_stamp_writes_signed_distance() {
  let def = definition();
  let targets = SplatTargets::allocate(64).unwrap();
  let params = SplatParams::new(&def, SplatSettings::default(), Combine::Min);
  targets.clear(params.far);

  let stamp = Stamp::sphere(Vec3::ZERO, 0.2, Vec4::new(1.0, 0.5, 0.25, 1.0));
  targets.stamp(&params, &stamp);

  let centre = nearest_voxel(&def, Vec3::ZERO);
  let world = def.voxel_to_world(centre);
  let expected = (world.length() - 0.2) * def.distance_scale();
  let stored = targets.sdf.load(centre.x, centre.y, centre.z);
  assert!((stored - expected).abs() < 1e-5);
  assert!(stored < 0.0);

  // Untouched corner keeps the clear value.
  assert_eq!(targets.sdf.load(0, 0, 0), def.normalized_sdf_far());
}

#[test]
fn test_fade_band_stays_between_exact_and_far() {
  let def = definition();
  let targets = SplatTargets::allocate(64).unwrap();
  let params = SplatParams::new(&def, SplatSettings::default(), Combine::Min);
  targets.clear(params.far);
  targets.stamp(&params, &Stamp::sphere(Vec3::ZERO, 0.2, Vec4::ONE));

  // 2.5 radii out along +X: inside the fade band.
  let voxel = nearest_voxel(&def, Vec3::new(0.5, 0.0, 0.0));
  let world = def.voxel_to_world(voxel);
  let exact = (world.length() - 0.2) * def.distance_scale();
  let stored = targets.sdf.load(voxel.x, voxel.y, voxel.z);
  assert!(stored >= exact - 1e-6);
  assert!(stored <= def.normalized_sdf_far());
}

#[test]
fn test_normalized_color_matches_input() {
  let def = definition();
  let targets = SplatTargets::allocate(64).unwrap();
  let params = SplatParams::new(&def, SplatSettings::default(), Combine::Min);
  targets.clear(params.far);
  let color = Vec4::new(0.2, 0.4, 0.6, 1.0);
  targets.stamp(&params, &Stamp::sphere(Vec3::ZERO, 0.2, color));
  targets.stamp(&params, &Stamp::sphere(Vec3::new(0.01, 0.0, 0.0), 0.2, color));
  targets.normalize_color();

  let centre = nearest_voxel(&def, Vec3::ZERO);
  let c = targets.color.load(centre.x, centre.y, centre.z);
  assert!((c - color).abs().max_element() < 1e-5);
  // Zero weight voxels are left unset.
  assert_eq!(targets.color.load(0, 0, 0), Vec4::ZERO);
}

#[test]
fn test_stamp_outside_grid_is_ignored() {
  let def = definition();
  let targets = SplatTargets::allocate(64).unwrap();
  let params = SplatParams::new(&def, SplatSettings::default(), Combine::Min);
  targets.clear(params.far);
  targets.stamp(&params, &Stamp::sphere(Vec3::splat(50.0), 0.2, Vec4::ONE));
  let far = def.normalized_sdf_far();
  assert!(targets.sdf.read_all().iter().all(|&v| v == far));
}

#[test]
fn test_segment_covers_midpoint() {
  let def = definition();
  let targets = SplatTargets::allocate(64).unwrap();
  let params = SplatParams::new(&def, SplatSettings::default(), Combine::Min);
  targets.clear(params.far);
  let stamp = Stamp::segment(
    Vec3::new(-1.0, 0.0, 0.0),
    0.1,
    Vec4::ONE,
    Vec3::new(1.0, 0.0, 0.0),
    0.1,
    Vec4::ONE,
  );
  targets.stamp(&params, &stamp);
  let mid = nearest_voxel(&def, Vec3::ZERO);
  assert!(targets.sdf.load(mid.x, mid.y, mid.z) < 0.0);
}
