//! Externally owned point feeds.
//!
//! A producer (particle system, simulation, file replay) writes points into
//! a feed; a splat generator reads them once per recompute. The generator
//! owns the capacity: it calls [`PointFeed::set_layout`] whenever its
//! configured count changes and the producer observes the new capacity
//! through [`PointFeed::capacity`].
//!
//! Every write bumps a revision so the generator can skip ticks where
//! nothing changed.

use std::sync::{Arc, RwLock};

use crate::types::Particle;

#[derive(Debug, Default)]
struct FeedState {
  points: Vec<Particle>,
  strip_count: usize,
  points_per_strip: usize,
  revision: u64,
}

impl FeedState {
  fn capacity(&self) -> usize {
    self.strip_count * self.points_per_strip
  }
}

/// What one [`PointFeed::upload`] copied: the revision and the layout the
/// copied points follow.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FeedUpload {
  pub revision: u64,
  pub strip_count: usize,
  pub points_per_strip: usize,
}

impl FeedUpload {
  pub fn layout(&self) -> (usize, usize) {
    (self.strip_count, self.points_per_strip)
  }
}

/// Shared handle to a fixed-capacity point buffer.
///
/// Particle feeds use a single "strip" holding every slot; strip feeds lay
/// out `strip_count` runs of `points_per_strip` consecutive slots.
#[derive(Clone, Debug, Default)]
pub struct PointFeed {
  inner: Arc<RwLock<FeedState>>,
}

/// Feed of independent particles.
pub type ParticleFeed = PointFeed;
/// Feed of polylines.
pub type StripFeed = PointFeed;

impl PointFeed {
  pub fn new() -> Self {
    Self::default()
  }

  /// Current capacity in slots.
  pub fn capacity(&self) -> usize {
    self.inner.read().map(|s| s.capacity()).unwrap_or(0)
  }

  /// `(strip_count, points_per_strip)`.
  pub fn layout(&self) -> (usize, usize) {
    self
      .inner
      .read()
      .map(|s| (s.strip_count, s.points_per_strip))
      .unwrap_or((0, 0))
  }

  pub fn revision(&self) -> u64 {
    self.inner.read().map(|s| s.revision).unwrap_or(0)
  }

  /// Declare the capacity. Existing points are kept where they still fit in
  /// their strip; new slots start dead. Returns true when the layout changed.
  pub fn set_layout(&self, strip_count: usize, points_per_strip: usize) -> bool {
    let Ok(mut state) = self.inner.write() else {
      return false;
    };
    if state.strip_count == strip_count && state.points_per_strip == points_per_strip {
      return false;
    }
    let mut points = vec![Particle::DEAD; strip_count * points_per_strip];
    if state.points_per_strip > 0 {
      let keep_strips = state.strip_count.min(strip_count);
      let keep_points = state.points_per_strip.min(points_per_strip);
      for strip in 0..keep_strips {
        let src = strip * state.points_per_strip;
        let dst = strip * points_per_strip;
        points[dst..dst + keep_points].copy_from_slice(&state.points[src..src + keep_points]);
      }
    }
    state.points = points;
    state.strip_count = strip_count;
    state.points_per_strip = points_per_strip;
    state.revision += 1;
    true
  }

  /// Declare a flat capacity (one strip holding every slot).
  pub fn set_capacity(&self, capacity: usize) -> bool {
    self.set_layout(1, capacity)
  }

  /// Mutate every slot in place.
  pub fn write(&self, f: impl FnOnce(&mut [Particle])) {
    if let Ok(mut state) = self.inner.write() {
      f(&mut state.points);
      state.revision += 1;
    }
  }

  /// Replace the contents with `points`; extra points are dropped and unused
  /// slots are marked dead. Returns how many points were stored.
  pub fn set_points(&self, points: &[Particle]) -> usize {
    let mut stored = 0;
    self.write(|slots| {
      stored = points.len().min(slots.len());
      slots[..stored].copy_from_slice(&points[..stored]);
      slots[stored..].fill(Particle::DEAD);
    });
    stored
  }

  /// Replace one strip; returns how many points were stored.
  pub fn set_strip(&self, strip: usize, points: &[Particle]) -> usize {
    let (strip_count, per_strip) = self.layout();
    if strip >= strip_count {
      return 0;
    }
    let mut stored = 0;
    self.write(|slots| {
      let run = &mut slots[strip * per_strip..(strip + 1) * per_strip];
      stored = points.len().min(per_strip);
      run[..stored].copy_from_slice(&points[..stored]);
      run[stored..].fill(Particle::DEAD);
    });
    stored
  }

  /// Mark every slot dead.
  pub fn clear(&self) {
    self.write(|slots| slots.fill(Particle::DEAD));
  }

  /// Copy the feed into `scratch` (resized to the capacity). The returned
  /// layout is read under the same lock as the points, so it always matches
  /// `scratch` even if the feed is relaid out concurrently.
  pub fn upload(&self, scratch: &mut Vec<Particle>) -> FeedUpload {
    scratch.clear();
    match self.inner.read() {
      Ok(state) => {
        scratch.extend_from_slice(&state.points);
        FeedUpload {
          revision: state.revision,
          strip_count: state.strip_count,
          points_per_strip: state.points_per_strip,
        }
      }
      Err(_) => FeedUpload::default(),
    }
  }

  /// Number of alive slots.
  pub fn alive_count(&self) -> usize {
    self
      .inner
      .read()
      .map(|s| s.points.iter().filter(|p| p.is_alive()).count())
      .unwrap_or(0)
  }
}

#[cfg(test)]
#[path = "feed_test.rs"]
mod feed_test;
