//! One-time diagnostics.
//!
//! Configuration problems are re-detected every tick; each stage keeps a
//! [`WarnOnce`] so the log sees a given problem once per stage instead of
//! once per frame.

use std::collections::HashSet;

/// Remembers which diagnostic keys a stage has already reported.
#[derive(Debug, Default)]
pub struct WarnOnce {
  reported: HashSet<String>,
}

impl WarnOnce {
  pub fn new() -> Self {
    Self::default()
  }

  /// Emit `message` as a `warn!` event the first time `key` is seen.
  /// Returns true when the warning was emitted.
  pub fn warn(&mut self, key: impl Into<String>, message: impl FnOnce() -> String) -> bool {
    let key = key.into();
    if self.reported.contains(&key) {
      return false;
    }
    tracing::warn!(diagnostic = %key, "{}", message());
    self.reported.insert(key);
    true
  }

  /// Forget `key` so the next occurrence is reported again.
  pub fn clear(&mut self, key: &str) {
    self.reported.remove(key);
  }

  pub fn has_reported(&self, key: &str) -> bool {
    self.reported.contains(key)
  }

  pub fn len(&self) -> usize {
    self.reported.len()
  }

  pub fn is_empty(&self) -> bool {
    self.reported.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_warns_once_per_key() {
    let mut warn = WarnOnce::new();
    assert!(warn.warn("view-0", || "not axis aligned".into()));
    assert!(!warn.warn("view-0", || "not axis aligned".into()));
    assert!(warn.warn("view-1", || "not axis aligned".into()));
    assert_eq!(warn.len(), 2);
  }

  #[test]
  fn test_clear_rearms_key() {
    let mut warn = WarnOnce::new();
    warn.warn("shared-definition", || "missing".into());
    warn.clear("shared-definition");
    assert!(!warn.has_reported("shared-definition"));
    assert!(warn.warn("shared-definition", || "missing".into()));
  }
}
