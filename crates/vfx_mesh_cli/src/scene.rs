//! Builds the source graph and pipeline described by a [`Config`].

use glam::{Vec2, Vec3, Vec4};
use vfx_mesh::generators::{ParticleSplatSettings, StripSplatSettings};
use vfx_mesh::mesher::MesherSettings;
use vfx_mesh::operators::BooleanSettings;
use vfx_mesh::{
	BooleanCombiner, BooleanOp, DefinitionSettings, DepthImage, DepthReprojectionGenerator,
	DepthView, DualContouringMesher, GapFillOperator, Particle, ParticleFeed,
	ParticleSplatGenerator, Pipeline, StripFeed, StripSplatGenerator, Transform, VolumeSource,
};

use crate::config::{Config, Operation, PointConfig, SourceConfig};

fn to_particle(point: &PointConfig) -> Particle {
	Particle::new(Vec3::from(point.position), point.radius).with_color(Vec4::from(point.color))
}

fn definition_settings(config: &Config) -> DefinitionSettings {
	DefinitionSettings::default()
		.with_grid_resolution(config.volume.resolution)
		.with_bounds_size(Vec3::from(config.volume.bounds))
		.with_iso_value(config.volume.iso)
		.with_sdf_far(config.volume.sdf_far)
}

fn boolean_op(operation: Operation) -> BooleanOp {
	match operation {
		Operation::Union => BooleanOp::Union,
		Operation::Intersection => BooleanOp::Intersection,
		Operation::Difference => BooleanOp::Difference,
	}
}

/// Splat sources become one generator each; every depth source becomes a
/// view of a single reprojection generator.
pub fn build_sources(config: &Config) -> Vec<Box<dyn VolumeSource>> {
	let definition = definition_settings(config);
	let transform = Transform::from_translation(Vec3::from(config.volume.translation));
	let mut sources: Vec<Box<dyn VolumeSource>> = Vec::new();
	let mut views = Vec::new();

	for source in &config.sources {
		match source {
			SourceConfig::Particles { points } => {
				let generator = ParticleSplatGenerator::new(definition, transform, ParticleFeed::new())
					.with_settings(ParticleSplatSettings::default().with_particle_count(points.len()));
				let particles: Vec<Particle> = points.iter().map(to_particle).collect();
				let stored = generator.feed().set_points(&particles);
				if stored < particles.len() {
					tracing::warn!(stored, requested = particles.len(), "particle feed truncated");
				}
				sources.push(Box::new(generator));
			}
			SourceConfig::Strips {
				strips,
				smooth_union_strength,
			} => {
				let per_strip = strips.iter().map(Vec::len).max().unwrap_or(0);
				let mut settings = StripSplatSettings::default().with_layout(strips.len(), per_strip);
				if let Some(strength) = smooth_union_strength {
					settings = settings.with_smooth_union_strength(*strength);
				}
				sources.push(Box::new(strip_generator(definition, transform, settings, strips)));
			}
			SourceConfig::Depth {
				depth,
				image_size,
				position,
				size,
				near,
				far,
			} => {
				let depth = *depth;
				views.push(DepthView::manual(
					DepthImage::from_fn(image_size[0], image_size[1], |_, _| depth),
					Transform::from_translation(Vec3::from(*position)),
					Vec2::from(*size),
					*near,
					*far,
				));
			}
		}
	}

	if !views.is_empty() {
		let generator =
			DepthReprojectionGenerator::new(definition, transform, DepthImage::fallback())
				.with_views(views);
		sources.push(Box::new(generator));
	}
	sources
}

fn strip_generator(
	definition: DefinitionSettings,
	transform: Transform,
	settings: StripSplatSettings,
	strips: &[Vec<PointConfig>],
) -> StripSplatGenerator {
	let generator =
		StripSplatGenerator::new(definition, transform, StripFeed::new()).with_settings(settings);
	for (i, strip) in strips.iter().enumerate() {
		let points: Vec<Particle> = strip.iter().map(to_particle).collect();
		generator.feed().set_strip(i, &points);
	}
	generator
}

/// Single sources feed the mesher directly; several are combined first.
pub fn build_pipeline(config: &Config) -> Pipeline {
	let mut sources = build_sources(config);
	let source: Box<dyn VolumeSource> = if sources.len() == 1 {
		sources.remove(0)
	} else {
		let settings = BooleanSettings::default()
			.with_operation(boolean_op(config.combine.operation))
			.with_blend_voxels(config.combine.blend_voxels);
		Box::new(BooleanCombiner::new(sources).with_settings(settings))
	};
	let source: Box<dyn VolumeSource> = if config.gap_fill {
		Box::new(GapFillOperator::new(source))
	} else {
		source
	};

	let settings = MesherSettings::default().with_colors(config.mesher.write_colors);
	Pipeline::new(DualContouringMesher::new(source).with_settings(settings))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn depth_sources_share_one_generator() {
		let config = Config::parse(
			r#"
			[[sources]]
			kind = "particles"
			points = [{ position = [0.0, 0.0, 0.0], radius = 0.3 }]

			[[sources]]
			kind = "depth"
			depth = 0.5
			position = [0.0, 0.0, -3.0]
			size = [6.0, 6.0]
			far = 6.0

			[[sources]]
			kind = "depth"
			depth = 1.0
			position = [0.0, 0.0, -3.0]
			size = [6.0, 6.0]
			far = 6.0
			"#,
		)
		.unwrap();
		let labels: Vec<String> = build_sources(&config)
			.iter()
			.map(|s| s.label().to_string())
			.collect();
		assert_eq!(labels, ["particle-splat", "depth-reprojection"]);
	}

	#[test]
	fn particle_scene_produces_triangles() {
		let config = Config::parse(
			r#"
			[volume]
			resolution = 64
			bounds = [4.0, 4.0, 4.0]

			[[sources]]
			kind = "particles"
			points = [{ position = [0.0, 0.0, 0.0], radius = 0.3 }]
			"#,
		)
		.unwrap();
		let mut pipeline = build_pipeline(&config);
		let stats = pipeline.tick();
		assert!(stats.remeshed);
		assert!(stats.triangle_count() > 0);
	}
}
