//! Scene configuration for the headless driver.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use vfx_mesh::constants::MAX_DEPTH_VIEWS;

/// Root scene configuration.
#[derive(Debug, Deserialize)]
pub struct Config {
	/// Ticks to run when `--ticks` is not given.
	#[serde(default = "default_ticks")]
	pub ticks: u64,
	#[serde(default)]
	pub volume: VolumeConfig,
	#[serde(default)]
	pub mesher: MesherConfig,
	/// How multiple sources are combined.
	#[serde(default)]
	pub combine: CombineConfig,
	/// Fill far regions of the combined volume before meshing.
	#[serde(default)]
	pub gap_fill: bool,
	pub sources: Vec<SourceConfig>,
}

/// Definition shared by every source.
#[derive(Debug, Deserialize)]
pub struct VolumeConfig {
	#[serde(default = "default_resolution")]
	pub resolution: u32,
	#[serde(default = "default_bounds")]
	pub bounds: [f32; 3],
	#[serde(default)]
	pub iso: f32,
	#[serde(default = "default_sdf_far")]
	pub sdf_far: f32,
	/// Volume centre in world space.
	#[serde(default)]
	pub translation: [f32; 3],
}

impl Default for VolumeConfig {
	fn default() -> Self {
		Self {
			resolution: default_resolution(),
			bounds: default_bounds(),
			iso: 0.0,
			sdf_far: default_sdf_far(),
			translation: [0.0; 3],
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct MesherConfig {
	#[serde(default = "default_true")]
	pub write_colors: bool,
}

impl Default for MesherConfig {
	fn default() -> Self {
		Self { write_colors: true }
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
	#[default]
	Union,
	Intersection,
	Difference,
}

#[derive(Debug, Deserialize)]
pub struct CombineConfig {
	#[serde(default)]
	pub operation: Operation,
	/// Blend width in voxels.
	#[serde(default = "default_blend_voxels")]
	pub blend_voxels: f32,
}

impl Default for CombineConfig {
	fn default() -> Self {
		Self {
			operation: Operation::Union,
			blend_voxels: default_blend_voxels(),
		}
	}
}

/// One volume source.
#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
	/// Independent particles.
	Particles { points: Vec<PointConfig> },
	/// Polylines, one list of points per strip.
	Strips {
		strips: Vec<Vec<PointConfig>>,
		#[serde(default)]
		smooth_union_strength: Option<f32>,
	},
	/// Constant-depth authored view looking down +Z from `position`.
	Depth {
		/// Normalized depth in [0, 1]; 1 means nothing was hit.
		depth: f32,
		#[serde(default = "default_image_size")]
		image_size: [u32; 2],
		position: [f32; 3],
		size: [f32; 2],
		#[serde(default)]
		near: f32,
		far: f32,
	},
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PointConfig {
	pub position: [f32; 3],
	pub radius: f32,
	#[serde(default = "default_color")]
	pub color: [f32; 4],
}

fn default_ticks() -> u64 {
	1
}

fn default_resolution() -> u32 {
	96
}

fn default_bounds() -> [f32; 3] {
	[6.0; 3]
}

fn default_sdf_far() -> f32 {
	5.0
}

fn default_true() -> bool {
	true
}

fn default_blend_voxels() -> f32 {
	4.0
}

fn default_image_size() -> [u32; 2] {
	[64, 64]
}

fn default_color() -> [f32; 4] {
	[1.0; 4]
}

impl Config {
	/// Load configuration from a TOML file.
	pub fn load(path: &Path) -> Result<Self> {
		let content = std::fs::read_to_string(path)
			.with_context(|| format!("Failed to read config file: {}", path.display()))?;
		Self::parse(&content)
	}

	/// Parse and validate TOML text.
	pub fn parse(content: &str) -> Result<Self> {
		let config: Config = toml::from_str(content).with_context(|| "Failed to parse config TOML")?;

		if config.sources.is_empty() {
			anyhow::bail!("Config must have at least one source");
		}
		if config.ticks == 0 {
			anyhow::bail!("ticks must be at least 1");
		}
		if config.volume.bounds.iter().any(|&b| !(b > 0.0)) {
			anyhow::bail!("volume bounds must be positive, got {:?}", config.volume.bounds);
		}
		if !(config.volume.sdf_far > 0.0) {
			anyhow::bail!("sdf_far must be positive, got {}", config.volume.sdf_far);
		}
		let depth_sources = config
			.sources
			.iter()
			.filter(|s| matches!(s, SourceConfig::Depth { .. }))
			.count();
		if depth_sources > MAX_DEPTH_VIEWS {
			anyhow::bail!(
				"Maximum {} depth sources supported, found {}",
				MAX_DEPTH_VIEWS,
				depth_sources
			);
		}
		for (i, source) in config.sources.iter().enumerate() {
			source
				.validate()
				.with_context(|| format!("Invalid source #{i} ({})", source.kind()))?;
		}

		Ok(config)
	}
}

impl SourceConfig {
	pub fn kind(&self) -> &'static str {
		match self {
			SourceConfig::Particles { .. } => "particles",
			SourceConfig::Strips { .. } => "strips",
			SourceConfig::Depth { .. } => "depth",
		}
	}

	fn validate(&self) -> Result<()> {
		match self {
			SourceConfig::Particles { points } => validate_points(points),
			SourceConfig::Strips { strips, .. } => {
				if strips.is_empty() {
					anyhow::bail!("at least one strip is required");
				}
				strips.iter().try_for_each(|strip| validate_points(strip))
			}
			SourceConfig::Depth {
				depth,
				image_size,
				near,
				far,
				..
			} => {
				if !(0.0..=1.0).contains(depth) {
					anyhow::bail!("depth must be in [0, 1], got {depth}");
				}
				if image_size.contains(&0) {
					anyhow::bail!("image_size must be non-zero, got {image_size:?}");
				}
				if far <= near {
					anyhow::bail!("far ({far}) must be greater than near ({near})");
				}
				Ok(())
			}
		}
	}
}

fn validate_points(points: &[PointConfig]) -> Result<()> {
	if let Some(point) = points.iter().find(|p| !(p.radius > 0.0)) {
		anyhow::bail!("point radius must be positive, got {}", point.radius);
	}
	Ok(())
}
