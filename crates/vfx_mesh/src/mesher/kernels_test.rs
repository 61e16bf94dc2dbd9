use glam::{Vec3, Vec4};

use super::*;
use crate::constants::cell_resolution;

fn plane_volume(res: u32, level: f32) -> VolumeTexture {
  let texture = VolumeTexture::new(res, "plane").unwrap();
  dispatch_cube(res, |[x, y, z]| texture.store(x, y, z, z as f32 - level));
  texture
}

fn unit_params(res: u32) -> MeshParams {
  MeshParams {
    cell_resolution: cell_resolution(res),
    iso: 0.0,
    bounds_min: Vec3::ZERO,
    voxel_extent: Vec3::ONE,
  }
}

fn run(texture: &VolumeTexture, params: &MeshParams, color: Option<&ColorTexture>) -> MeshBuffers {
  let cells = params.cell_resolution as usize;
  let buffers = MeshBuffers::allocate(cells * cells * cells, true).unwrap();
  clear_cells(&buffers);
  build_surface_vertices(&buffers, params, texture, color);
  build_surface_indices(&buffers, params, texture);
  buffers
}

#[test]
fn test_quad_indices_table() {
  let q = [0, 1, 2, 3];
  assert_eq!(quad_indices(q, true, false), [0, 1, 3, 0, 2, 1]);
  assert_eq!(quad_indices(q, true, true), [0, 3, 1, 0, 1, 2]);
  assert_eq!(quad_indices(q, false, false), [2, 1, 3, 2, 3, 0]);
  assert_eq!(quad_indices(q, false, true), [2, 3, 1, 2, 0, 3]);
}

#[test]
fn test_plane_counts() {
  let texture = plane_volume(8, 3.5);
  let buffers = run(&texture, &unit_params(8), None);
  // One layer of 7x7 surface cells, 6x6 interior quads.
  assert_eq!(buffers.read_counters(), (49, 216));
}

#[test]
fn test_plane_vertices_sit_on_the_surface() {
  let texture = plane_volume(8, 3.5);
  let buffers = run(&texture, &unit_params(8), None);
  let positions = buffers.read_positions(49);
  let normals = buffers.read_normals(49);
  // Voxel z = 3.5 maps to local 4.0 with the half-voxel centre offset.
  assert!(positions.iter().all(|p| (p.z - 4.0).abs() < 1e-5));
  assert!(normals.iter().all(|n| (*n - Vec3::Z).length() < 1e-5));
}

#[test]
fn test_plane_triangles_face_positive_side() {
  let texture = plane_volume(8, 3.5);
  let buffers = run(&texture, &unit_params(8), None);
  let positions = buffers.read_positions(49);
  for tri in buffers.read_indices(216).chunks_exact(3) {
    let [a, b, c] = [0, 1, 2].map(|i| positions[tri[i] as usize]);
    let n = (b - a).cross(c - a);
    assert!(n.z > 0.0, "triangle {tri:?} faces {n:?}");
  }
}

#[test]
fn test_flipped_plane_flips_winding() {
  let texture = VolumeTexture::new(8, "plane").unwrap();
  dispatch_cube(8, |[x, y, z]| texture.store(x, y, z, 3.5 - z as f32));
  let buffers = run(&texture, &unit_params(8), None);
  let positions = buffers.read_positions(49);
  for tri in buffers.read_indices(216).chunks_exact(3) {
    let [a, b, c] = [0, 1, 2].map(|i| positions[tri[i] as usize]);
    assert!((b - a).cross(c - a).z < 0.0);
  }
}

#[test]
fn test_sphere_is_closed_and_outward() {
  let res = 24;
  let texture = VolumeTexture::new(res, "sphere").unwrap();
  let center = Vec3::splat((res - 1) as f32 * 0.5);
  dispatch_cube(res, |[x, y, z]| {
    let p = Vec3::new(x as f32, y as f32, z as f32);
    texture.store(x, y, z, (p - center).length() - 7.0);
  });
  let buffers = run(&texture, &unit_params(res), None);
  let (vertex_count, index_count) = buffers.clamped_counts();
  assert!(vertex_count > 0);
  assert_eq!(index_count % 6, 0);

  let positions = buffers.read_positions(vertex_count);
  let indices = buffers.read_indices(index_count);
  assert!(indices.iter().all(|&i| (i as usize) < vertex_count));

  // Positions are offset by half a voxel from voxel coordinates.
  let centre_local = center + 0.5;
  let outward = indices
    .chunks_exact(3)
    .filter(|tri| {
      let [a, b, c] = [0, 1, 2].map(|i| positions[tri[i] as usize]);
      let centroid = (a + b + c) / 3.0;
      (b - a).cross(c - a).dot(centroid - centre_local) > 0.0
    })
    .count();
  let triangles = indices.len() / 3;
  assert!(outward * 100 >= triangles * 98, "{outward} of {triangles} outward");
}

#[test]
fn test_every_surface_cell_claims_a_vertex() {
  let texture = plane_volume(8, 3.5);
  let params = unit_params(8);
  let buffers = run(&texture, &params, None);
  for x in 0..7 {
    for y in 0..7 {
      for z in 0..7 {
        let claimed = buffers.cell_vertex(coord_to_index(x, y, z, 7)).is_some();
        assert_eq!(claimed, z == 3, "cell ({x}, {y}, {z})");
      }
    }
  }
}

#[test]
fn test_vertex_colors_sample_the_color_volume() {
  let texture = plane_volume(8, 3.5);
  let color = ColorTexture::new(8, "color").unwrap();
  dispatch_cube(8, |[x, y, z]| color.store(x, y, z, Vec4::new(1.0, 0.5, 0.25, 1.0)));
  let buffers = run(&texture, &unit_params(8), Some(&color));
  let colors = buffers.read_colors(49).unwrap();
  assert!(colors
    .iter()
    .all(|c| (*c - Vec4::new(1.0, 0.5, 0.25, 1.0)).length() < 1e-5));
}

#[test]
fn test_missing_color_volume_writes_white() {
  let texture = plane_volume(8, 3.5);
  let buffers = run(&texture, &unit_params(8), None);
  assert!(buffers.read_colors(49).unwrap().iter().all(|c| *c == Vec4::ONE));
}
