use glam::{UVec3, Vec3};

use super::*;

fn p(x: f32) -> Particle {
  Particle::new(Vec3::new(x, 0.0, 0.0), 0.1)
}

fn generator(layout: (usize, usize)) -> StripSplatGenerator {
  StripSplatGenerator::new(
    DefinitionSettings::default()
      .with_grid_resolution(64)
      .with_bounds_size(Vec3::splat(4.0)),
    Transform::IDENTITY,
    StripFeed::new(),
  )
  .with_settings(StripSplatSettings::default().with_layout(layout.0, layout.1))
}

fn value_at(volume: &Volume, world: Vec3) -> f32 {
  let v: UVec3 = volume.definition.local_to_voxel(world).round().as_uvec3();
  volume.texture.load(v.x, v.y, v.z)
}

#[test]
fn test_strip_stamp_assignment() {
  let points = [p(0.0), p(1.0), Particle::DEAD, p(3.0), p(4.0), p(5.0)];
  // Two strips of three slots: [0, 1, dead] and [3, 4, 5].
  assert!(matches!(strip_stamp(&points, 3, 0), Some(s) if s.b.x == 1.0));
  // Last alive point of a strip is covered by the previous segment.
  assert!(strip_stamp(&points, 3, 1).is_none());
  assert!(strip_stamp(&points, 3, 2).is_none());
  // Segments never cross the strip boundary.
  assert!(matches!(strip_stamp(&points, 3, 3), Some(s) if s.b.x == 4.0));
  assert!(strip_stamp(&points, 3, 5).is_none());
}

#[test]
fn test_strip_stamp_tolerates_short_buffers() {
  // Layout says four per strip but only two slots were copied.
  let points = [p(0.0), p(1.0)];
  assert!(matches!(strip_stamp(&points, 4, 0), Some(s) if s.b.x == 1.0));
  assert!(strip_stamp(&points, 4, 1).is_none());
  assert!(strip_stamp(&points, 4, 2).is_none());

  let lone = [p(0.0)];
  assert!(matches!(strip_stamp(&lone, 4, 0), Some(s) if s.b == s.a));
}

#[test]
fn test_isolated_point_is_sphere() {
  let points = [Particle::DEAD, p(2.0), Particle::DEAD];
  let stamp = strip_stamp(&points, 3, 1).unwrap();
  assert_eq!(stamp.a, stamp.b);
}

#[test]
fn test_layout_is_declared_to_feed() {
  let generator = generator((600, 1));
  assert_eq!(generator.feed().layout(), (STRIP_COUNT_MAX, POINTS_PER_STRIP_MIN));
  assert_eq!(generator.point_capacity(), STRIP_COUNT_MAX * POINTS_PER_STRIP_MIN);
}

#[test]
fn test_segments_fill_between_points() {
  let mut generator = generator((2, 4));
  generator
    .feed()
    .set_strip(0, &[p(-1.0), p(-0.5), p(0.0), p(0.5)]);
  generator.update(&TickContext::default());
  let volume = generator.try_get_volume().unwrap();

  assert!(value_at(&volume, Vec3::new(-0.75, 0.0, 0.0)) < 0.0);
  assert!(value_at(&volume, Vec3::new(0.25, 0.0, 0.0)) < 0.0);
  // Beyond the last point the strip ends.
  assert!(value_at(&volume, Vec3::new(1.0, 0.0, 0.0)) > 0.0);
  assert_eq!(generator.pending_scratch_points(), 0);
}

#[test]
fn test_separate_strips_are_not_bridged() {
  let mut generator = generator((2, 2));
  generator.feed().set_strip(0, &[p(-1.0), p(-0.8)]);
  generator.feed().set_strip(1, &[p(0.8), p(1.0)]);
  generator.update(&TickContext::default());
  let volume = generator.try_get_volume().unwrap();
  assert!(value_at(&volume, Vec3::ZERO) > 0.0);
  assert!(value_at(&volume, Vec3::new(-0.9, 0.0, 0.0)) < 0.0);
  assert!(value_at(&volume, Vec3::new(0.9, 0.0, 0.0)) < 0.0);
}

#[test]
fn test_smooth_union_deepens_joints() {
  let points = [p(-0.5), p(0.0), p(0.5)];

  let mut hard = generator((1, 3));
  hard.settings.smooth_union_strength = 0.0;
  hard.feed().set_strip(0, &points);
  hard.update(&TickContext::default());

  let mut smooth = generator((1, 3));
  smooth.settings.smooth_union_strength = 3.0;
  smooth.feed().set_strip(0, &points);
  smooth.update(&TickContext::default());

  let joint = Vec3::new(0.0, 0.0, 0.0);
  let hard_value = value_at(&hard.try_get_volume().unwrap(), joint);
  let smooth_value = value_at(&smooth.try_get_volume().unwrap(), joint);
  assert!(smooth_value < hard_value);
}
