//! Headless vfx_mesh driver.
//!
//! Loads a TOML scene, runs the pipeline for a number of ticks and reports
//! mesh statistics. With `--capture` the final mesh is compacted and its
//! statistics reported as well.

mod config;
mod scene;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use config::Config;

/// Headless driver for vfx_mesh scenes.
#[derive(Parser, Debug)]
#[command(name = "vfx_mesh")]
#[command(about = "Runs a vfx_mesh scene and reports mesh statistics")]
struct Args {
	/// Path to scene configuration TOML file.
	#[arg(short, long)]
	config: PathBuf,

	/// Ticks to run (default: from the config).
	#[arg(short, long)]
	ticks: Option<u64>,

	/// Log at debug level unless RUST_LOG is set.
	#[arg(short, long)]
	verbose: bool,

	/// Capture and report the final mesh.
	#[arg(long)]
	capture: bool,
}

fn init_tracing(verbose: bool) {
	let default_level = if verbose { "debug" } else { "info" };
	let filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
	tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> Result<()> {
	let args = Args::parse();
	init_tracing(args.verbose);

	tracing::info!("Loading config from: {}", args.config.display());
	let config = Config::load(&args.config)?;
	let ticks = args.ticks.unwrap_or(config.ticks);

	let mut pipeline = scene::build_pipeline(&config);
	tracing::info!(
		sources = config.sources.len(),
		resolution = config.volume.resolution,
		ticks,
		"Running scene"
	);

	for _ in 0..ticks {
		let stats = pipeline.tick();
		tracing::info!(
			frame = stats.frame,
			remeshed = stats.remeshed,
			vertices = stats.vertex_count,
			triangles = stats.triangle_count(),
			elapsed_us = stats.elapsed_us,
			"tick"
		);
	}

	let metrics = pipeline.metrics();
	if metrics.ticks > 0 {
		tracing::info!(
			avg_tick_us = metrics.avg_tick_us(),
			avg_remesh_us = metrics.avg_remesh_us(),
			remeshes = metrics.remeshes,
			"timings"
		);
	}

	if args.capture {
		let mesh = pipeline.capture().context("Capturing mesh")?;
		tracing::info!(
			vertices = mesh.positions.len(),
			triangles = mesh.triangle_count(),
			raw_vertices = mesh.stats.raw_vertex_count,
			u16_indices = mesh.indices.is_u16(),
			bounds_min = ?mesh.bounds.min,
			bounds_max = ?mesh.bounds.max,
			"captured mesh"
		);
	}

	Ok(())
}
