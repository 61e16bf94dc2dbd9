//! Error types for volume synthesis and mesh capture.
//!
//! Stage internals return [`SdfResult`]; the public per-tick `update` entry
//! points never fail. A stage that hits an error logs it, drops its volume for
//! the tick and lets downstream stages degrade to "no contribution".

use std::fmt;

use thiserror::Error;

/// Why a stage has no volume this tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NotReadyReason {
  /// The stage has not run a successful update yet.
  NotUpdated,
  /// No input is wired to the stage.
  MissingInput,
  /// The single upstream source produced no volume.
  UpstreamNotReady,
  /// None of the combined sources produced a volume.
  NoReadySources,
  /// No depth view is usable this tick.
  NoActiveViews,
}

impl fmt::Display for NotReadyReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let text = match self {
      NotReadyReason::NotUpdated => "not updated yet",
      NotReadyReason::MissingInput => "missing input",
      NotReadyReason::UpstreamNotReady => "upstream source not ready",
      NotReadyReason::NoReadySources => "no ready sources",
      NotReadyReason::NoActiveViews => "no active depth views",
    };
    f.write_str(text)
  }
}

/// Errors raised while synthesizing a volume or sizing mesher resources.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SdfError {
  /// The stage cannot produce a volume this tick. Always recoverable.
  #[error("not ready: {0}")]
  NotReady(NotReadyReason),

  /// A setting is out of range and has no safe default.
  #[error("invalid configuration: {0}")]
  ConfigurationInvalid(String),

  /// A buffer or texture could not be allocated at the requested size.
  #[error("could not allocate {what} with {requested} elements")]
  ResourceExhausted { what: &'static str, requested: usize },
}

/// A specialized Result type for volume stages.
pub type SdfResult<T> = std::result::Result<T, SdfError>;

/// Errors returned by mesh capture.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
  /// The mesher never allocated its buffers.
  #[error("mesher has no allocated resources")]
  NoResources,

  /// A captured index points past the captured vertex range.
  #[error("index {index} references a vertex outside of {vertex_count} captured vertices")]
  IndexOutOfRange { index: u32, vertex_count: usize },
}
