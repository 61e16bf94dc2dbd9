//! Fixed-capacity storage buffers shared by kernel invocations.
//!
//! Every element is an `AtomicU32`. Float buffers store `f32` bit patterns so
//! kernels can combine writes with compare-and-swap loops the same way GPU
//! atomics on `R32_UINT` views do. All accesses are `Relaxed`: a dispatch
//! returns only once every invocation finished, which orders all writes of
//! one kernel before the reads of the next.

use std::sync::atomic::{AtomicU32, Ordering};

use rayon::prelude::*;

use crate::error::{SdfError, SdfResult};

/// Allocate `len` atomics initialised to `init`, reporting failure instead
/// of aborting.
pub fn try_alloc_atomic(len: usize, init: u32, what: &'static str) -> SdfResult<Box<[AtomicU32]>> {
  let exhausted = || SdfError::ResourceExhausted {
    what,
    requested: len,
  };
  if len.checked_mul(std::mem::size_of::<AtomicU32>()).is_none() {
    return Err(exhausted());
  }
  let mut data: Vec<AtomicU32> = Vec::new();
  data.try_reserve_exact(len).map_err(|_| exhausted())?;
  data.resize_with(len, || AtomicU32::new(init));
  Ok(data.into_boxed_slice())
}

/// Polynomial smooth minimum. `k <= 0` degenerates to `min`.
#[inline]
pub fn smooth_min(a: f32, b: f32, k: f32) -> f32 {
  if k <= 0.0 {
    return a.min(b);
  }
  let h = (0.5 + 0.5 * (b - a) / k).clamp(0.0, 1.0);
  b + (a - b) * h - k * h * (1.0 - h)
}

/// Polynomial smooth maximum. `k <= 0` degenerates to `max`.
#[inline]
pub fn smooth_max(a: f32, b: f32, k: f32) -> f32 {
  -smooth_min(-a, -b, k)
}

/// Buffer of `f32` values.
pub struct FloatBuffer {
  data: Box<[AtomicU32]>,
}

impl FloatBuffer {
  pub fn new(len: usize, what: &'static str) -> SdfResult<Self> {
    Ok(Self {
      data: try_alloc_atomic(len, 0.0f32.to_bits(), what)?,
    })
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.data.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  #[inline]
  pub fn load(&self, index: usize) -> f32 {
    f32::from_bits(self.data[index].load(Ordering::Relaxed))
  }

  #[inline]
  pub fn store(&self, index: usize, value: f32) {
    self.data[index].store(value.to_bits(), Ordering::Relaxed);
  }

  /// Keep the smaller of the stored value and `value`.
  #[inline]
  pub fn atomic_min(&self, index: usize, value: f32) {
    let _ = self.data[index].fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
      (value < f32::from_bits(current)).then_some(value.to_bits())
    });
  }

  #[inline]
  pub fn atomic_add(&self, index: usize, value: f32) {
    let _ = self.data[index].fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
      Some((f32::from_bits(current) + value).to_bits())
    });
  }

  /// Merge `value` into the stored value with [`smooth_min`].
  #[inline]
  pub fn atomic_smooth_min(&self, index: usize, value: f32, k: f32) {
    if k <= 0.0 {
      self.atomic_min(index, value);
      return;
    }
    let _ = self.data[index].fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
      Some(smooth_min(f32::from_bits(current), value, k).to_bits())
    });
  }

  /// Set every element to `value`.
  pub fn fill(&self, value: f32) {
    let bits = value.to_bits();
    self
      .data
      .par_iter()
      .for_each(|cell| cell.store(bits, Ordering::Relaxed));
  }

  /// Copy `other` into `self`. Lengths must match.
  pub fn copy_from(&self, other: &FloatBuffer) {
    debug_assert_eq!(self.len(), other.len());
    self
      .data
      .par_iter()
      .zip(other.data.par_iter())
      .for_each(|(dst, src)| dst.store(src.load(Ordering::Relaxed), Ordering::Relaxed));
  }

  /// Read back `len` leading elements.
  pub fn read_prefix(&self, len: usize) -> Vec<f32> {
    self.data[..len.min(self.len())]
      .iter()
      .map(|cell| f32::from_bits(cell.load(Ordering::Relaxed)))
      .collect()
  }
}

/// Buffer of `u32` values.
pub struct U32Buffer {
  data: Box<[AtomicU32]>,
}

impl U32Buffer {
  pub fn new(len: usize, init: u32, what: &'static str) -> SdfResult<Self> {
    Ok(Self {
      data: try_alloc_atomic(len, init, what)?,
    })
  }

  #[inline]
  pub fn len(&self) -> usize {
    self.data.len()
  }

  #[inline]
  pub fn is_empty(&self) -> bool {
    self.data.is_empty()
  }

  #[inline]
  pub fn load(&self, index: usize) -> u32 {
    self.data[index].load(Ordering::Relaxed)
  }

  #[inline]
  pub fn store(&self, index: usize, value: u32) {
    self.data[index].store(value, Ordering::Relaxed);
  }

  /// Increment-and-fetch: returns the value before the addition.
  #[inline]
  pub fn fetch_add(&self, index: usize, value: u32) -> u32 {
    self.data[index].fetch_add(value, Ordering::Relaxed)
  }

  pub fn fill(&self, value: u32) {
    self
      .data
      .par_iter()
      .for_each(|cell| cell.store(value, Ordering::Relaxed));
  }

  pub fn read_prefix(&self, len: usize) -> Vec<u32> {
    self.data[..len.min(self.len())]
      .iter()
      .map(|cell| cell.load(Ordering::Relaxed))
      .collect()
  }
}

#[cfg(test)]
#[path = "buffer_test.rs"]
mod buffer_test;
