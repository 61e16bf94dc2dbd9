//! Compute device layer.
//!
//! Kernels are plain per-invocation closures dispatched over rayon. Storage
//! is atomic-backed so invocations only ever need `&` access, mirroring how
//! compute shaders address bound buffers and `RWTexture3D`s.
//!
//! ```text
//! ┌──────────────┐   dispatch_1d / dispatch_3d   ┌────────────────────────┐
//! │  host stage  │ ────────────────────────────▶ │ kernel(id) x N (rayon) │
//! └──────────────┘                               └────────────────────────┘
//!        ▲                                                 │
//!        │ read_prefix (readback = sync point)             ▼
//!        └──────────────── FloatBuffer / U32Buffer / VolumeTexture / ColorTexture
//! ```

pub mod buffer;
pub mod dispatch;
pub mod image;
pub mod texture;

pub use buffer::{smooth_max, smooth_min, try_alloc_atomic, FloatBuffer, U32Buffer};
pub use dispatch::{dispatch_1d, dispatch_3d, dispatch_cube};
pub use image::DepthImage;
pub use texture::{ColorTexture, VolumeTexture};
