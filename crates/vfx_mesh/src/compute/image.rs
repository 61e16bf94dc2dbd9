//! 2D single-channel depth images.

use crate::error::{SdfError, SdfResult};

/// Normalized depth image: `0.0` at the near plane, `1.0` at the far plane
/// (or nothing hit).
#[derive(Clone, Debug, PartialEq)]
pub struct DepthImage {
  width: u32,
  height: u32,
  texels: Vec<f32>,
}

impl DepthImage {
  /// Allocate a `width x height` image filled with `value`.
  pub fn new(width: u32, height: u32, value: f32) -> SdfResult<Self> {
    let len = width as usize * height as usize;
    let mut texels = Vec::new();
    texels
      .try_reserve_exact(len)
      .map_err(|_| SdfError::ResourceExhausted {
        what: "depth image",
        requested: len,
      })?;
    texels.resize(len, value);
    Ok(Self {
      width,
      height,
      texels,
    })
  }

  /// Build an image from a per-texel function of `(x, y)`.
  pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> f32) -> Self {
    let mut texels = Vec::with_capacity(width as usize * height as usize);
    for y in 0..height {
      for x in 0..width {
        texels.push(f(x, y));
      }
    }
    Self {
      width,
      height,
      texels,
    }
  }

  /// The neutral 1x1 "always far" image bound to unused view slots.
  pub fn fallback() -> Self {
    Self {
      width: 1,
      height: 1,
      texels: vec![1.0],
    }
  }

  #[inline]
  pub fn width(&self) -> u32 {
    self.width
  }

  #[inline]
  pub fn height(&self) -> u32 {
    self.height
  }

  #[inline]
  pub fn size(&self) -> [u32; 2] {
    [self.width, self.height]
  }

  pub fn is_empty(&self) -> bool {
    self.texels.is_empty()
  }

  #[inline]
  pub fn get(&self, x: u32, y: u32) -> f32 {
    self.texels[y as usize * self.width as usize + x as usize]
  }

  #[inline]
  pub fn set(&mut self, x: u32, y: u32, value: f32) {
    let w = self.width as usize;
    self.texels[y as usize * w + x as usize] = value;
  }

  pub fn fill(&mut self, value: f32) {
    self.texels.fill(value);
  }

  /// Bilinear sample with clamp-to-edge addressing; `u`, `v` in `[0, 1]`.
  pub fn sample_bilinear(&self, u: f32, v: f32) -> f32 {
    if self.texels.is_empty() {
      return 1.0;
    }
    let fx = (u * self.width as f32 - 0.5).clamp(0.0, (self.width - 1) as f32);
    let fy = (v * self.height as f32 - 0.5).clamp(0.0, (self.height - 1) as f32);
    let x0 = fx.floor() as u32;
    let y0 = fy.floor() as u32;
    let x1 = (x0 + 1).min(self.width - 1);
    let y1 = (y0 + 1).min(self.height - 1);
    let tx = fx - x0 as f32;
    let ty = fy - y0 as f32;

    let top = self.get(x0, y0) + (self.get(x1, y0) - self.get(x0, y0)) * tx;
    let bottom = self.get(x0, y1) + (self.get(x1, y1) - self.get(x0, y1)) * tx;
    top + (bottom - top) * ty
  }
}

#[cfg(test)]
#[path = "image_test.rs"]
mod image_test;
