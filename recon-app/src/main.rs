//! Recon
//!
//! Command-line entry point for the offline RGBD reconstruction system.
//!
//! Stages (any subset, always run in this order):
//! 1. `--make`: make fragments from the RGBD sequence
//! 2. `--register`: register all fragments to detect loop closure
//! 3. `--refine`: refine rough registrations
//! 4. `--integrate`: integrate the whole RGBD sequence into the final mesh

mod logging;

use clap::{CommandFactory, Parser};
use recon_pipeline::{ReconstructionSystem, RunRequest, StageFlags};
use std::path::PathBuf;

/// Recon - offline RGBD scene reconstruction
#[derive(Parser, Debug)]
#[command(name = "recon")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the config file
    config: PathBuf,

    /// Step 1) make fragments from RGBD sequence
    #[arg(long)]
    make: bool,

    /// Step 2) register all fragments to detect loop closure
    #[arg(long)]
    register: bool,

    /// Step 3) refine rough registrations
    #[arg(long)]
    refine: bool,

    /// Step 4) integrate the whole RGBD sequence to make final mesh
    #[arg(long)]
    integrate: bool,

    /// Turn on debug mode
    #[arg(long = "debug_mode")]
    debug_mode: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Send spans to Tracy (requires the `tracy` feature)
    #[arg(long)]
    tracy: bool,
}

impl Args {
    fn stage_flags(&self) -> StageFlags {
        StageFlags {
            make: self.make,
            register: self.register,
            refine: self.refine,
            integrate: self.integrate,
        }
    }
}

fn main() {
    let args = Args::parse();

    let flags = args.stage_flags();
    if flags.is_empty() {
        eprintln!("{}", Args::command().render_help());
        std::process::exit(1);
    }

    logging::init(&logging::LoggingConfig {
        level: args.log_level.clone(),
        enable_tracy: args.tracy,
    });

    let request = RunRequest {
        config_path: args.config,
        flags,
        debug_mode: args.debug_mode,
    };
    let mut stdout = std::io::stdout().lock();
    if let Err(e) = ReconstructionSystem::new().run(&request, &mut stdout) {
        eprintln!("Reconstruction error: {}", e);
        std::process::exit(1);
    }
}
