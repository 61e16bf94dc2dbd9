//! Surface normals from the field gradient.
//!
//! The primary estimate is a central difference of the trilinearly sampled
//! field around the vertex. When that degenerates (flat plateaus, clamped
//! borders) the 8-corner gradient of the cell is used, then `+Y`.

use glam::{Vec3, Vec3A};

use crate::compute::VolumeTexture;

/// Squared gradient length below which an estimate is rejected.
const DEGENERATE_LEN_SQ: f32 = 1e-12;

/// Gradient of a cell from its 8 corner values.
///
/// ```text
/// 0: (0,0,0)  4: (0,0,1)
/// 1: (1,0,0)  5: (1,0,1)
/// 2: (0,1,0)  6: (0,1,1)
/// 3: (1,1,0)  7: (1,1,1)
/// ```
#[inline]
pub fn corner_gradient(corners: &[f32; 8]) -> Vec3A {
  let gx = (corners[1] + corners[3] + corners[5] + corners[7])
    - (corners[0] + corners[2] + corners[4] + corners[6]);
  let gy = (corners[2] + corners[3] + corners[6] + corners[7])
    - (corners[0] + corners[1] + corners[4] + corners[5]);
  let gz = (corners[4] + corners[5] + corners[6] + corners[7])
    - (corners[0] + corners[1] + corners[2] + corners[3]);
  Vec3A::new(gx, gy, gz)
}

/// Central-difference gradient at `p` (voxel coordinates), one voxel apart.
#[inline]
pub fn central_difference(texture: &VolumeTexture, p: Vec3) -> Vec3A {
  let dx = texture.sample_trilinear(p + Vec3::X * 0.5) - texture.sample_trilinear(p - Vec3::X * 0.5);
  let dy = texture.sample_trilinear(p + Vec3::Y * 0.5) - texture.sample_trilinear(p - Vec3::Y * 0.5);
  let dz = texture.sample_trilinear(p + Vec3::Z * 0.5) - texture.sample_trilinear(p - Vec3::Z * 0.5);
  Vec3A::new(dx, dy, dz)
}

/// Unit normal at `p`. `voxel_extent` converts the voxel-space gradient to
/// local space for non-cubic bounds.
pub fn surface_normal(
  texture: &VolumeTexture,
  p: Vec3,
  corners: &[f32; 8],
  voxel_extent: Vec3,
) -> Vec3 {
  let to_local = Vec3A::from(voxel_extent.recip());
  [central_difference(texture, p), corner_gradient(corners)]
    .into_iter()
    .map(|g| g * to_local)
    .find(|g| g.length_squared() > DEGENERATE_LEN_SQ && g.is_finite())
    .map_or(Vec3::Y, |g| Vec3::from(g.normalize()))
}

#[cfg(test)]
#[path = "gradient_test.rs"]
mod gradient_test;
