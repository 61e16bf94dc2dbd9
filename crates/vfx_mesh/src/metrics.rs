//! Pipeline metrics: tick timings and triangle counts.
//!
//! Feature-gated and runtime-toggled; recording is a no-op unless the crate
//! is built with `--features metrics` and [`COLLECT_METRICS`] is set.

use std::collections::VecDeque;
#[cfg(feature = "metrics")]
use std::sync::atomic::Ordering;
use std::sync::atomic::AtomicBool;

/// Runtime toggle for metrics collection.
pub static COLLECT_METRICS: AtomicBool = AtomicBool::new(true);

/// Check if metrics collection is enabled (both compile-time and runtime).
#[inline]
pub fn is_enabled() -> bool {
  #[cfg(feature = "metrics")]
  {
    COLLECT_METRICS.load(Ordering::Relaxed)
  }
  #[cfg(not(feature = "metrics"))]
  {
    false
  }
}

/// Fixed-size window of the most recent values.
#[derive(Debug, Clone)]
pub struct RollingWindow<T> {
  buffer: VecDeque<T>,
  capacity: usize,
}

impl<T> RollingWindow<T> {
  pub fn new(capacity: usize) -> Self {
    Self {
      buffer: VecDeque::with_capacity(capacity),
      capacity: capacity.max(1),
    }
  }

  /// Push a value, evicting the oldest at capacity.
  pub fn push(&mut self, value: T) {
    if self.buffer.len() >= self.capacity {
      self.buffer.pop_front();
    }
    self.buffer.push_back(value);
  }

  pub fn len(&self) -> usize {
    self.buffer.len()
  }

  pub fn is_empty(&self) -> bool {
    self.buffer.is_empty()
  }

  pub fn clear(&mut self) {
    self.buffer.clear();
  }

  /// Oldest to newest.
  pub fn iter(&self) -> impl Iterator<Item = &T> {
    self.buffer.iter()
  }

  pub fn last(&self) -> Option<&T> {
    self.buffer.back()
  }
}

impl RollingWindow<u64> {
  pub fn sum(&self) -> u64 {
    self.buffer.iter().sum()
  }

  pub fn average(&self) -> f64 {
    if self.buffer.is_empty() {
      0.0
    } else {
      self.sum() as f64 / self.buffer.len() as f64
    }
  }

  pub fn min_max(&self) -> Option<(u64, u64)> {
    let min = self.buffer.iter().min()?;
    let max = self.buffer.iter().max()?;
    Some((*min, *max))
  }
}

impl Default for RollingWindow<u64> {
  fn default() -> Self {
    Self::new(128)
  }
}

/// Per-pipeline statistics updated every tick.
#[derive(Debug, Clone, Default)]
pub struct PipelineMetrics {
  /// Whole-tick durations in microseconds.
  pub tick_timings: RollingWindow<u64>,
  /// Durations of ticks that remeshed, in microseconds.
  pub remesh_timings: RollingWindow<u64>,
  /// Visible triangles after each tick.
  pub triangle_counts: RollingWindow<u64>,
  pub last_tick_us: u64,
  pub ticks: u64,
  pub remeshes: u64,
}

impl PipelineMetrics {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn record_tick(&mut self, elapsed_us: u64, remeshed: bool, triangles: usize) {
    if !is_enabled() {
      return;
    }
    self.ticks += 1;
    self.last_tick_us = elapsed_us;
    self.tick_timings.push(elapsed_us);
    self.triangle_counts.push(triangles as u64);
    if remeshed {
      self.remeshes += 1;
      self.remesh_timings.push(elapsed_us);
    }
  }

  pub fn avg_tick_us(&self) -> f64 {
    self.tick_timings.average()
  }

  pub fn avg_remesh_us(&self) -> f64 {
    self.remesh_timings.average()
  }

  /// Reset windows; cumulative counters are kept.
  pub fn reset(&mut self) {
    self.tick_timings.clear();
    self.remesh_timings.clear();
    self.triangle_counts.clear();
    self.last_tick_us = 0;
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_rolling_window() {
    let mut window = RollingWindow::new(3);
    assert!(window.is_empty());
    assert_eq!(window.min_max(), None);

    window.push(10u64);
    window.push(20);
    window.push(30);
    assert_eq!(window.sum(), 60);
    assert_eq!(window.average(), 20.0);

    window.push(40);
    assert_eq!(window.len(), 3);
    assert_eq!(window.sum(), 90);
    assert_eq!(window.last(), Some(&40));
    assert_eq!(window.min_max(), Some((20, 40)));
  }

  #[cfg(feature = "metrics")]
  #[test]
  fn test_tick_recording() {
    let mut metrics = PipelineMetrics::new();
    metrics.record_tick(1000, true, 10);
    metrics.record_tick(3000, false, 10);

    assert_eq!(metrics.ticks, 2);
    assert_eq!(metrics.remeshes, 1);
    assert_eq!(metrics.avg_tick_us(), 2000.0);
    assert_eq!(metrics.avg_remesh_us(), 1000.0);
    assert_eq!(metrics.last_tick_us, 3000);

    metrics.reset();
    assert!(metrics.tick_timings.is_empty());
    assert_eq!(metrics.ticks, 2);
  }

  #[cfg(not(feature = "metrics"))]
  #[test]
  fn test_recording_is_disabled_without_feature() {
    let mut metrics = PipelineMetrics::new();
    metrics.record_tick(1000, true, 10);
    assert_eq!(metrics.ticks, 0);
    assert!(!is_enabled());
  }
}
