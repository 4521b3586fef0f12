mod config;
mod pipeline;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use config::PipelineConfig;
use log::info;
use spincrate_algorithms::{parse_ranges, ChunkSpec, OrientedPointSelector};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "spincrate")]
#[command(version, about = "Spin image descriptors for 3D point clouds", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Split a point cloud into chunks and compute one spin image per chunk
    ///
    /// Writes chunk_<k>_spin.csv and chunk_<k>_spin.png for every chunk and a
    /// figure.png overview into the output directory.
    ///
    /// Examples:
    ///     spincrate run scan.pcd -o out                         # original chunks
    ///     spincrate run scan.pcd -o out --chunks 4 --centroid   # 4 equal chunks
    ///     spincrate run scan.xyz -o out --ranges 0..1000,1000..3000
    #[command(verbatim_doc_comment)]
    Run {
        /// Input point cloud (.pcd, .xyz, .txt)
        input: PathBuf,

        /// Directory receiving the CSV and PNG outputs
        #[arg(short, long)]
        output_dir: PathBuf,

        /// Split into this many contiguous chunks of near-equal size
        #[arg(long, conflicts_with = "ranges")]
        chunks: Option<usize>,

        /// Explicit index ranges, e.g. 0..2500,2500..5000
        #[arg(long)]
        ranges: Option<String>,

        /// Index of the oriented point within each chunk
        #[arg(long, conflicts_with = "centroid")]
        point_index: Option<usize>,

        /// Use the chunk point closest to the chunk centroid as oriented point
        #[arg(long)]
        centroid: bool,

        #[command(flatten)]
        params: ParamArgs,
    },
    /// Print the spin image correlation of two points of a cloud
    Compare {
        /// Input point cloud (.pcd, .xyz, .txt)
        input: PathBuf,

        /// Index of the first oriented point
        index_a: usize,

        /// Index of the second oriented point
        index_b: usize,

        #[command(flatten)]
        params: ParamArgs,
    },
}

/// Flags shared by all subcommands, applied on top of the config file
#[derive(Args)]
struct ParamArgs {
    /// JSON pipeline configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Spin image bin edge length
    #[arg(long)]
    bin_size: Option<f32>,

    /// Spin image bins per axis
    #[arg(long)]
    resolution: Option<usize>,

    /// Support angle in degrees
    #[arg(long)]
    support_angle: Option<f32>,

    /// Support radius in world units
    #[arg(long, conflicts_with = "no_support_radius")]
    support_radius: Option<f32>,

    /// Let points at any distance contribute
    #[arg(long)]
    no_support_radius: bool,

    /// Normal estimation search radius
    #[arg(long)]
    normal_radius: Option<f32>,

    /// Normal estimation neighbour cap
    #[arg(long)]
    max_nn: Option<usize>,

    /// Camera location normals are oriented towards, as x,y,z
    #[arg(long, value_parser = parse_camera, allow_hyphen_values = true)]
    camera: Option<[f32; 3]>,

    /// Estimate normals even when the input file stores them
    #[arg(long)]
    estimate_normals: bool,
}

impl ParamArgs {
    fn load_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::load(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(bin_size) = self.bin_size {
            config.spin_image.bin_size = bin_size;
        }
        if let Some(resolution) = self.resolution {
            config.spin_image.resolution = resolution;
        }
        if let Some(angle) = self.support_angle {
            config.spin_image.support_angle_deg = angle;
        }
        if let Some(radius) = self.support_radius {
            config.spin_image.support_radius = Some(radius);
        }
        if self.no_support_radius {
            config.spin_image.support_radius = None;
        }
        if let Some(radius) = self.normal_radius {
            config.normals.radius = radius;
        }
        if let Some(max_nn) = self.max_nn {
            config.normals.max_nn = max_nn;
        }
        if let Some(camera) = self.camera {
            config.camera = camera;
        }
        if self.estimate_normals {
            config.use_file_normals = false;
        }
        Ok(config)
    }
}

fn parse_camera(text: &str) -> std::result::Result<[f32; 3], String> {
    let values = text
        .split(',')
        .map(|v| v.trim().parse::<f32>().map_err(|_| format!("invalid coordinate '{}'", v)))
        .collect::<std::result::Result<Vec<f32>, String>>()?;
    match values.as_slice() {
        [x, y, z] => Ok([*x, *y, *z]),
        _ => Err(format!("expected x,y,z, got {} values", values.len())),
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run {
            input,
            output_dir,
            chunks,
            ranges,
            point_index,
            centroid,
            params,
        } => {
            let mut config = params.load_config()?;
            if let Some(count) = chunks {
                config.chunks = ChunkSpec::Count(count);
            }
            if let Some(ranges) = ranges {
                config.chunks = ChunkSpec::Ranges(parse_ranges(&ranges).context("Invalid --ranges")?);
            }
            if let Some(idx) = point_index {
                config.oriented_point = OrientedPointSelector::Index(idx);
            }
            if centroid {
                config.oriented_point = OrientedPointSelector::Centroid;
            }
            config.validate()?;

            let cloud = pipeline::load_oriented_cloud(&input, &config)?;
            let summaries = pipeline::run_chunks(&cloud, &config, &output_dir)?;
            for summary in &summaries {
                info!(
                    "chunk {}: {} points, oriented point {}, spin image weight {:.2} -> {}",
                    summary.chunk,
                    summary.points,
                    summary.oriented_index,
                    summary.spin_image.total_weight(),
                    summary.csv_path.display()
                );
            }
            println!(
                "Wrote {} spin images and figure.png to {}",
                summaries.len(),
                output_dir.display()
            );
        }
        Commands::Compare {
            input,
            index_a,
            index_b,
            params,
        } => {
            let config = params.load_config()?;
            config.validate()?;

            let correlation = pipeline::compare(&input, index_a, index_b, &config)?;
            println!("{:.6}", correlation);
        }
    }

    Ok(())
}
