//! # mdframe CLI
//!
//! A command-line tool for inspecting chunked molecular dynamics output.
//!
//! ## Usage
//!
//! ```bash
//! # Summarize a simulation's metadata and on-disk chunk files
//! mdframe inspect prelim.toml
//!
//! # Parse one data kind and print a per-timestep summary
//! mdframe frames prelim.toml trajectory --chunks 0,1
//! mdframe frames prelim.toml trajectory --format tensor
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use std::path::{Path, PathBuf};

use mdframe::ingest::{DataKind, IngestConfig, Simulation, TrajectoryFormat, TrajectoryOutput};
use mdframe::metadata::SimulationMetadata;

/// mdframe - Chunked Molecular Dynamics Ingestion
#[derive(Parser)]
#[command(name = "mdframe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Data kind selector for the `frames` subcommand.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum KindArg {
    /// Atomic trajectory dump
    Trajectory,
    /// Bond-order dump
    Bonds,
    /// Chemical species census
    Species,
    /// Thermodynamic log
    Thermo,
}

impl From<KindArg> for DataKind {
    fn from(arg: KindArg) -> Self {
        match arg {
            KindArg::Trajectory => DataKind::Trajectory,
            KindArg::Bonds => DataKind::Bonds,
            KindArg::Species => DataKind::Species,
            KindArg::Thermo => DataKind::Thermo,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a simulation's metadata and resolved chunk files
    Inspect {
        /// Simulation metadata TOML file
        #[arg(value_name = "METADATA")]
        metadata: PathBuf,
    },

    /// Parse one data kind and print a per-timestep summary
    Frames {
        /// Simulation metadata TOML file
        #[arg(value_name = "METADATA")]
        metadata: PathBuf,

        /// Which data kind to read
        #[arg(value_name = "KIND")]
        kind: KindArg,

        /// Comma-separated chunk indices (default: all chunks)
        #[arg(short, long, value_delimiter = ',')]
        chunks: Option<Vec<usize>>,

        /// Trajectory output projection: "frames" or "tensor"
        #[arg(short, long, default_value = "frames")]
        format: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Inspect { metadata } => inspect(&metadata),
        Commands::Frames {
            metadata,
            kind,
            chunks,
            format,
        } => frames(&metadata, kind.into(), chunks, &format),
    }
}

fn open(metadata: &Path, chunks: Option<Vec<usize>>) -> Result<Simulation> {
    let meta = SimulationMetadata::load(metadata)
        .with_context(|| format!("failed to load metadata from {}", metadata.display()))?;
    Ok(Simulation::with_config(
        meta,
        IngestConfig {
            chunks,
            ..IngestConfig::default()
        },
    ))
}

fn inspect(metadata: &Path) -> Result<()> {
    let sim = open(metadata, None)?;
    let meta = sim.metadata();

    println!("Simulation:  {}", meta.sim_id);
    if let Some(desc) = &meta.sim_desc {
        println!("Description: {desc}");
    }
    println!("Data path:   {}", meta.data_path.display());
    println!(
        "Partition:   {} chunk(s) x {} steps, {} fs/step",
        meta.partition.n_chunks, meta.partition.chunk_size, meta.partition.step_size
    );
    println!("Atoms:       {}", meta.sim_box.n_atoms);
    println!(
        "Intervals:   trajectory={} bonds={} species={} thermo={}",
        meta.output.trajectory, meta.output.bonds, meta.output.species, meta.output.thermo
    );

    println!();
    println!("Chunk files:");
    for kind in [
        DataKind::Trajectory,
        DataKind::Bonds,
        DataKind::Species,
        DataKind::Thermo,
    ] {
        match sim.chunk_paths(kind) {
            Ok(paths) => println!("  {kind:?}: {} file(s) resolved", paths.len()),
            Err(err) => println!("  {kind:?}: {err}"),
        }
    }
    Ok(())
}

fn frames(
    metadata: &Path,
    kind: DataKind,
    chunks: Option<Vec<usize>>,
    format: &str,
) -> Result<()> {
    let sim = open(metadata, chunks)?;
    info!("reading {kind:?} for {}", sim.metadata().sim_id);

    match kind {
        DataKind::Trajectory => {
            let format: TrajectoryFormat = format
                .parse()
                .with_context(|| format!("unsupported trajectory format `{format}`"))?;
            match sim.read_trajectory_as(format)? {
                TrajectoryOutput::Frames(frames) => {
                    println!("{} trajectory frame(s)", frames.len());
                    for frame in &frames {
                        let n_atoms = frame.atoms.as_ref().map_or(0, |a| a.n_atoms());
                        println!("  step {:>10}: {n_atoms} atoms", frame.timestep);
                    }
                }
                TrajectoryOutput::Tensor(tensor) => {
                    println!(
                        "tensor: {} step(s) x {} atom(s), positions {:?}",
                        tensor.n_steps(),
                        tensor.n_atoms(),
                        tensor.positions().shape()
                    );
                }
            }
        }
        DataKind::Bonds => {
            let frames = sim.read_bonds()?;
            println!("{} bond frame(s)", frames.len());
            for frame in &frames {
                println!("  step {:>10}: {} bond(s)", frame.timestep, frame.bonds.nnz());
            }
        }
        DataKind::Species => {
            let frames = sim.read_species()?;
            println!("{} species frame(s)", frames.len());
            for frame in &frames {
                println!(
                    "  step {:>10}: {} molecule(s), {} species",
                    frame.timestep, frame.no_moles, frame.no_species
                );
            }
        }
        DataKind::Thermo => {
            let thermo = sim.read_thermo()?;
            println!(
                "{} thermo row(s), columns: {}",
                thermo.len(),
                thermo.columns().join(", ")
            );
        }
    }
    Ok(())
}
