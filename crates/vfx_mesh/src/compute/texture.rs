//! Cubic 3D textures: one scalar channel (distance, weight) or four color
//! channels per voxel.

use glam::{Vec3, Vec4};

use super::buffer::FloatBuffer;
use crate::constants::{coord_to_index, voxel_count};
use crate::error::{SdfError, SdfResult};

fn check_resolution(resolution: u32, what: &'static str) -> SdfResult<()> {
  if resolution == 0 {
    return Err(SdfError::ConfigurationInvalid(format!(
      "{what}: resolution must be at least 1"
    )));
  }
  Ok(())
}

/// Single-channel `R32F` 3D texture with `resolution³` voxels.
pub struct VolumeTexture {
  resolution: u32,
  texels: FloatBuffer,
}

impl VolumeTexture {
  pub fn new(resolution: u32, what: &'static str) -> SdfResult<Self> {
    check_resolution(resolution, what)?;
    Ok(Self {
      resolution,
      texels: FloatBuffer::new(voxel_count(resolution), what)?,
    })
  }

  /// Voxels along one axis (the texture width).
  #[inline]
  pub fn resolution(&self) -> u32 {
    self.resolution
  }

  #[inline]
  pub fn texels(&self) -> &FloatBuffer {
    &self.texels
  }

  #[inline]
  pub fn index(&self, x: u32, y: u32, z: u32) -> usize {
    coord_to_index(x, y, z, self.resolution)
  }

  #[inline]
  pub fn load(&self, x: u32, y: u32, z: u32) -> f32 {
    self.texels.load(self.index(x, y, z))
  }

  /// Load with coordinates clamped to the texture edge.
  #[inline]
  pub fn load_clamped(&self, x: i32, y: i32, z: i32) -> f32 {
    let max = self.resolution as i32 - 1;
    self.load(
      x.clamp(0, max) as u32,
      y.clamp(0, max) as u32,
      z.clamp(0, max) as u32,
    )
  }

  #[inline]
  pub fn store(&self, x: u32, y: u32, z: u32, value: f32) {
    self.texels.store(self.index(x, y, z), value);
  }

  pub fn fill(&self, value: f32) {
    self.texels.fill(value);
  }

  /// Copy another texture of the same resolution.
  pub fn copy_from(&self, other: &VolumeTexture) {
    self.texels.copy_from(&other.texels);
  }

  /// Trilinear sample at continuous voxel coordinates (voxel `i` sits at `i`).
  pub fn sample_trilinear(&self, p: Vec3) -> f32 {
    let max = (self.resolution.max(1) - 1) as f32;
    let p = p.clamp(Vec3::ZERO, Vec3::splat(max));
    let base = p.floor();
    let t = p - base;
    let [x0, y0, z0] = [base.x as i32, base.y as i32, base.z as i32];

    let c000 = self.load_clamped(x0, y0, z0);
    let c100 = self.load_clamped(x0 + 1, y0, z0);
    let c010 = self.load_clamped(x0, y0 + 1, z0);
    let c110 = self.load_clamped(x0 + 1, y0 + 1, z0);
    let c001 = self.load_clamped(x0, y0, z0 + 1);
    let c101 = self.load_clamped(x0 + 1, y0, z0 + 1);
    let c011 = self.load_clamped(x0, y0 + 1, z0 + 1);
    let c111 = self.load_clamped(x0 + 1, y0 + 1, z0 + 1);

    let x00 = lerp(c000, c100, t.x);
    let x10 = lerp(c010, c110, t.x);
    let x01 = lerp(c001, c101, t.x);
    let x11 = lerp(c011, c111, t.x);
    lerp(lerp(x00, x10, t.y), lerp(x01, x11, t.y), t.z)
  }

  /// Read back every voxel (test and capture helper).
  pub fn read_all(&self) -> Vec<f32> {
    self.texels.read_prefix(self.texels.len())
  }
}

/// Four-channel `RGBA32F` 3D texture.
pub struct ColorTexture {
  resolution: u32,
  texels: FloatBuffer,
}

impl ColorTexture {
  pub fn new(resolution: u32, what: &'static str) -> SdfResult<Self> {
    check_resolution(resolution, what)?;
    let count = voxel_count(resolution)
      .checked_mul(4)
      .unwrap_or(usize::MAX);
    Ok(Self {
      resolution,
      texels: FloatBuffer::new(count, what)?,
    })
  }

  #[inline]
  pub fn resolution(&self) -> u32 {
    self.resolution
  }

  #[inline]
  fn base(&self, x: u32, y: u32, z: u32) -> usize {
    coord_to_index(x, y, z, self.resolution) * 4
  }

  #[inline]
  pub fn load(&self, x: u32, y: u32, z: u32) -> Vec4 {
    self.load_index(coord_to_index(x, y, z, self.resolution))
  }

  #[inline]
  pub fn load_index(&self, voxel: usize) -> Vec4 {
    let b = voxel * 4;
    Vec4::new(
      self.texels.load(b),
      self.texels.load(b + 1),
      self.texels.load(b + 2),
      self.texels.load(b + 3),
    )
  }

  #[inline]
  pub fn store(&self, x: u32, y: u32, z: u32, value: Vec4) {
    self.store_index(coord_to_index(x, y, z, self.resolution), value);
  }

  #[inline]
  pub fn store_index(&self, voxel: usize, value: Vec4) {
    let b = voxel * 4;
    for (i, channel) in value.to_array().into_iter().enumerate() {
      self.texels.store(b + i, channel);
    }
  }

  /// Accumulate `value` into the voxel channel-wise.
  #[inline]
  pub fn atomic_add(&self, x: u32, y: u32, z: u32, value: Vec4) {
    let b = self.base(x, y, z);
    for (i, channel) in value.to_array().into_iter().enumerate() {
      self.texels.atomic_add(b + i, channel);
    }
  }

  pub fn fill(&self, value: f32) {
    self.texels.fill(value);
  }

  pub fn copy_from(&self, other: &ColorTexture) {
    self.texels.copy_from(&other.texels);
  }

  /// Trilinear sample at continuous voxel coordinates.
  pub fn sample_trilinear(&self, p: Vec3) -> Vec4 {
    let max = (self.resolution.max(1) - 1) as f32;
    let p = p.clamp(Vec3::ZERO, Vec3::splat(max));
    let base = p.floor();
    let t = p - base;
    let max_i = self.resolution.max(1) - 1;
    let x0 = base.x as u32;
    let y0 = base.y as u32;
    let z0 = base.z as u32;
    let x1 = (x0 + 1).min(max_i);
    let y1 = (y0 + 1).min(max_i);
    let z1 = (z0 + 1).min(max_i);

    let x00 = self.load(x0, y0, z0).lerp(self.load(x1, y0, z0), t.x);
    let x10 = self.load(x0, y1, z0).lerp(self.load(x1, y1, z0), t.x);
    let x01 = self.load(x0, y0, z1).lerp(self.load(x1, y0, z1), t.x);
    let x11 = self.load(x0, y1, z1).lerp(self.load(x1, y1, z1), t.x);
    x00.lerp(x10, t.y).lerp(x01.lerp(x11, t.y), t.z)
  }
}

#[inline(always)]
pub(crate) fn lerp(a: f32, b: f32, t: f32) -> f32 {
  a + (b - a) * t
}

#[cfg(test)]
#[path = "texture_test.rs"]
mod texture_test;
