//! Tick driver for a mesher and the source graph behind it.
//!
//! The host calls [`Pipeline::tick`] once per frame. Each tick pulls the
//! graph (sources update before their consumers), remeshes when anything
//! upstream changed and records timing.

use web_time::Instant;

use crate::capture::{self, CapturedMesh};
use crate::error::CaptureError;
use crate::mesher::{DualContouringMesher, MeshTarget};
use crate::metrics::PipelineMetrics;
use crate::volume::TickContext;

/// Summary of one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TickStats {
  pub frame: u64,
  pub remeshed: bool,
  pub vertex_count: usize,
  pub index_count: usize,
  pub elapsed_us: u64,
}

impl TickStats {
  pub fn triangle_count(&self) -> usize {
    self.index_count / 3
  }
}

pub struct Pipeline {
  mesher: DualContouringMesher,
  frame: u64,
  active: bool,
  metrics: PipelineMetrics,
}

impl Pipeline {
  pub fn new(mesher: DualContouringMesher) -> Self {
    Self {
      mesher,
      frame: 0,
      active: true,
      metrics: PipelineMetrics::new(),
    }
  }

  /// Start in the inactive (paused/editing) state.
  pub fn inactive(mut self) -> Self {
    self.active = false;
    self
  }

  pub fn set_active(&mut self, active: bool) {
    self.active = active;
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Number of ticks run so far.
  pub fn frame(&self) -> u64 {
    self.frame
  }

  pub fn mesher(&self) -> &DualContouringMesher {
    &self.mesher
  }

  pub fn mesher_mut(&mut self) -> &mut DualContouringMesher {
    &mut self.mesher
  }

  pub fn add_target(&mut self, target: MeshTarget) {
    self.mesher.add_target(target);
  }

  pub fn metrics(&self) -> &PipelineMetrics {
    &self.metrics
  }

  pub fn tick(&mut self) -> TickStats {
    let ctx = TickContext {
      active: self.active,
      frame: self.frame,
    };
    let _span = tracing::info_span!("tick", frame = self.frame).entered();
    let start = Instant::now();
    let update = self.mesher.update(&ctx);
    let elapsed_us = start.elapsed().as_micros() as u64;

    let stats = TickStats {
      frame: self.frame,
      remeshed: update.remeshed,
      vertex_count: update.vertex_count,
      index_count: update.index_count,
      elapsed_us,
    };
    self.frame += 1;
    self
      .metrics
      .record_tick(elapsed_us, stats.remeshed, stats.triangle_count());
    if stats.remeshed {
      tracing::debug!(
        vertices = stats.vertex_count,
        triangles = stats.triangle_count(),
        elapsed_us,
        "tick remeshed"
      );
    }
    stats
  }

  /// Run `count` ticks, returning the last one's stats.
  pub fn run(&mut self, count: u64) -> Option<TickStats> {
    (0..count).map(|_| self.tick()).last()
  }

  /// Compact copy of the current mesh.
  pub fn capture(&self) -> Result<CapturedMesh, CaptureError> {
    capture::capture(&self.mesher)
  }

  /// Drop mesher arenas; the next tick reallocates them.
  pub fn release(&mut self) {
    self.mesher.release();
  }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod pipeline_test;
