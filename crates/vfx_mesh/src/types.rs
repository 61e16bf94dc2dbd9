//! Core data types shared by generators, operators and the mesher.

use glam::{Mat4, Quat, Vec3, Vec4};

/// How splat generators resolve accumulated color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorBlendMode {
  /// Divide accumulated color by accumulated weight.
  #[default]
  Normalized,
  /// Keep the raw weighted sum.
  Accumulated,
}

/// One splat input point.
///
/// A slot with `radius <= 0` is dead and never contributes. Feeds are sized
/// to a fixed capacity, so dead slots are how a producer shrinks its output.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
  /// World-space position.
  pub position: Vec3,
  /// World-space radius.
  pub radius: f32,
  /// Straight RGBA color.
  pub color: Vec4,
}

impl Particle {
  pub const DEAD: Particle = Particle {
    position: Vec3::ZERO,
    radius: 0.0,
    color: Vec4::ZERO,
  };

  pub fn new(position: Vec3, radius: f32) -> Self {
    Self {
      position,
      radius,
      color: Vec4::ONE,
    }
  }

  pub fn with_color(mut self, color: Vec4) -> Self {
    self.color = color;
    self
  }

  #[inline]
  pub fn is_alive(&self) -> bool {
    self.radius > 0.0 && self.position.is_finite()
  }
}

impl Default for Particle {
  fn default() -> Self {
    Self::DEAD
  }
}

/// Rigid placement of a volume or depth view in the world.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
  pub translation: Vec3,
  pub rotation: Quat,
  pub scale: Vec3,
}

impl Transform {
  pub const IDENTITY: Transform = Transform {
    translation: Vec3::ZERO,
    rotation: Quat::IDENTITY,
    scale: Vec3::ONE,
  };

  pub fn from_translation(translation: Vec3) -> Self {
    Self {
      translation,
      ..Self::IDENTITY
    }
  }

  pub fn with_rotation(mut self, rotation: Quat) -> Self {
    self.rotation = rotation;
    self
  }

  pub fn with_scale(mut self, scale: Vec3) -> Self {
    self.scale = scale;
    self
  }

  pub fn to_matrix(&self) -> Mat4 {
    Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
  }

  #[inline]
  pub fn right(&self) -> Vec3 {
    self.rotation * Vec3::X
  }

  #[inline]
  pub fn up(&self) -> Vec3 {
    self.rotation * Vec3::Y
  }

  /// Viewing direction (+Z).
  #[inline]
  pub fn forward(&self) -> Vec3 {
    self.rotation * Vec3::Z
  }
}

impl Default for Transform {
  fn default() -> Self {
    Self::IDENTITY
  }
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MinMaxAABB {
  pub min: [f32; 3],
  pub max: [f32; 3],
}

impl MinMaxAABB {
  /// Create AABB with inverted extents (ready for encapsulation).
  pub fn empty() -> Self {
    Self {
      min: [f32::INFINITY; 3],
      max: [f32::NEG_INFINITY; 3],
    }
  }

  /// Create AABB from min/max corners.
  pub fn new(min: [f32; 3], max: [f32; 3]) -> Self {
    Self { min, max }
  }

  /// Box centred on the origin with the given full size.
  pub fn centered(size: Vec3) -> Self {
    let half = size * 0.5;
    Self::new((-half).to_array(), half.to_array())
  }

  /// Expand AABB to include a point.
  #[inline]
  pub fn encapsulate(&mut self, point: [f32; 3]) {
    for i in 0..3 {
      self.min[i] = self.min[i].min(point[i]);
      self.max[i] = self.max[i].max(point[i]);
    }
  }

  /// Check if AABB is valid (min <= max on all axes).
  pub fn is_valid(&self) -> bool {
    self.min[0] <= self.max[0] && self.min[1] <= self.max[1] && self.min[2] <= self.max[2]
  }

  pub fn size(&self) -> [f32; 3] {
    if !self.is_valid() {
      return [0.0; 3];
    }
    [
      self.max[0] - self.min[0],
      self.max[1] - self.min[1],
      self.max[2] - self.min[2],
    ]
  }
}

impl Default for MinMaxAABB {
  fn default() -> Self {
    Self::empty()
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
