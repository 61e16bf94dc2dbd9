//! Kernel dispatch over rayon.
//!
//! ```text
//! dispatch_1d(n)          groups of THREADS_1D invocations, ids 0..n
//! dispatch_3d([x, y, z])  groups of 8x8x8 invocations, ids clipped to size
//! ```
//!
//! A dispatch returns once every invocation has finished, so consecutive
//! dispatches issued from one thread execute in issue order.

use rayon::prelude::*;

use crate::constants::{THREADS_1D, THREADS_3D};

/// Run `kernel` once per id in `0..count`.
pub fn dispatch_1d<K>(count: usize, kernel: K)
where
  K: Fn(usize) + Sync + Send,
{
  if count == 0 {
    return;
  }
  (0..count)
    .into_par_iter()
    .with_min_len(THREADS_1D)
    .for_each(kernel);
}

/// Run `kernel` once per id inside the `size` box.
pub fn dispatch_3d<K>(size: [u32; 3], kernel: K)
where
  K: Fn([u32; 3]) + Sync + Send,
{
  if size.contains(&0) {
    return;
  }
  let group = THREADS_3D as u32;
  let groups = size.map(|s| s.div_ceil(group));
  let group_count = groups[0] as usize * groups[1] as usize * groups[2] as usize;

  (0..group_count).into_par_iter().for_each(|g| {
    let gz = (g % groups[2] as usize) as u32;
    let gy = ((g / groups[2] as usize) % groups[1] as usize) as u32;
    let gx = (g / (groups[1] as usize * groups[2] as usize)) as u32;

    for lx in 0..group {
      let x = gx * group + lx;
      if x >= size[0] {
        break;
      }
      for ly in 0..group {
        let y = gy * group + ly;
        if y >= size[1] {
          break;
        }
        for lz in 0..group {
          let z = gz * group + lz;
          if z >= size[2] {
            break;
          }
          kernel([x, y, z]);
        }
      }
    }
  });
}

/// Run `kernel` over a cube of edge `edge`.
#[inline]
pub fn dispatch_cube<K>(edge: u32, kernel: K)
where
  K: Fn([u32; 3]) + Sync + Send,
{
  dispatch_3d([edge; 3], kernel);
}

#[cfg(test)]
#[path = "dispatch_test.rs"]
mod dispatch_test;
