//! vfx_mesh - Live SDF volumes and dual-contouring meshes for effects
//!
//! This crate turns loosely structured effect data (particles, polylines,
//! depth images) into signed distance volumes every frame and extracts a
//! triangle mesh from them. Stages form a pull graph: each stage updates its
//! inputs, skips work when nothing upstream changed and publishes a
//! [`Volume`] tagged with a version.
//!
//! # Features
//!
//! - **Splat generators**: particles and strips stamped into a dense grid
//!   with fixed-capacity external feeds
//! - **Depth reprojection**: up to six depth views fused into a thin
//!   surface band, from authored images or live capture devices
//! - **Operators**: smooth boolean combination of any number of sources and
//!   jump-flood style gap filling
//! - **Dual contouring**: one vertex per surface cell, quads split along the
//!   shorter diagonal, fixed-capacity arenas shared with render targets
//! - **Capture**: compact copies of the live mesh with 16/32-bit indices
//!
//! # Example
//!
//! ```ignore
//! use vfx_mesh::{DualContouringMesher, ParticleFeed, ParticleSplatGenerator, Pipeline};
//!
//! let feed = ParticleFeed::new();
//! let generator = ParticleSplatGenerator::new(Default::default(), Default::default(), feed.clone());
//! feed.set_points(&[Particle::new(Vec3::ZERO, 0.2)]);
//!
//! let mut pipeline = Pipeline::new(DualContouringMesher::new(Box::new(generator)));
//! let stats = pipeline.tick();
//! println!("{} triangles", stats.triangle_count());
//! ```

pub mod constants;
pub mod diagnostics;
pub mod error;
pub mod types;

pub use constants::{coord_to_index, index_to_coord, CORNER_OFFSETS};
pub use error::{CaptureError, NotReadyReason, SdfError, SdfResult};
pub use types::{ColorBlendMode, MinMaxAABB, Particle, Transform};

// Atomic storage and parallel dispatch standing in for GPU resources
pub mod compute;
pub use compute::{ColorTexture, DepthImage, VolumeTexture};

// Volume definitions and the source contract
pub mod definition;
pub mod volume;
pub use definition::{DefinitionSettings, DefinitionSource, VolumeDefinition};
pub use volume::{TickContext, Volume, VolumeSource};

pub mod generators;
pub use generators::{
  DepthReprojectionGenerator, DepthView, ParticleFeed, ParticleSplatGenerator, StripFeed,
  StripSplatGenerator,
};

pub mod operators;
pub use operators::{BooleanCombiner, BooleanOp, GapFillOperator};

pub mod mesher;
pub use mesher::{DualContouringMesher, LiveMesh, MeshTarget};

pub mod capture;
pub use capture::{CapturedMesh, MeshIndices};

pub mod metrics;

pub mod pipeline;
pub use pipeline::{Pipeline, TickStats};

#[cfg(test)]
pub mod test_utils;
