//! Volume generators: stages that synthesize a field from external inputs.
//!
//! ```text
//!   ParticleFeed ─▶ ParticleSplatGenerator ─┐
//!   StripFeed    ─▶ StripSplatGenerator    ─┼─▶ Volume
//!   DepthView*   ─▶ DepthReprojectionGenerator ┘
//! ```

pub mod depth;
pub mod feed;
pub mod particle;
pub mod splat;
pub mod strip;

pub use depth::{
  CaptureCamera, CaptureOutcome, DepthCapture, DepthReprojectionGenerator,
  DepthReprojectionSettings, DepthView, DepthViewData, DepthViewSource, ProjectionMode,
};
pub use feed::{FeedUpload, ParticleFeed, PointFeed, StripFeed};
pub use particle::{ParticleSplatGenerator, ParticleSplatSettings};
pub use splat::SplatSettings;
pub use strip::{StripSplatGenerator, StripSplatSettings};
