//! The reconstruction system: one run from config file to timing report.
//!
//! A run moves through
//! `Idle → ConfigLoaded → DatasetReady → Validated → stages → Reported`.
//! Any error ends the run at the step that raised it; nothing is retried.

use crate::dispatch::{DispatchError, Dispatcher, StageTable};
use crate::report::{ConfigReport, TimingReport};
use crate::stage::{StageFlags, StageKind};
use crate::timing::StageTiming;
use recon_capture::{CommandDecoder, ExtractionError, Materialization, RgbdDecoder, materialize};
use recon_data::{ConfigError, DatasetLayoutError, FrameFolder, RunConfig, validate_dataset};
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("No stage selected: pass at least one of --make, --register, --refine, --integrate")]
    NoStageSelected,

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Frame extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Dataset layout error: {0}")]
    Layout(#[from] DatasetLayoutError),

    #[error("{0}")]
    Stage(#[from] DispatchError),

    #[error("Failed to write run report: {0}")]
    Report(#[source] std::io::Error),
}

/// What to run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub config_path: PathBuf,
    pub flags: StageFlags,
    pub debug_mode: bool,
}

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Configuration exactly as the stages saw it.
    pub config: RunConfig,
    pub materialization: Materialization,
    pub frames: FrameFolder,
    pub timing: StageTiming,
}

/// Orchestrator for one reconstruction run.
///
/// Collaborators default to external programs named in the run
/// configuration; `with_decoder` / `with_stages` replace them.
#[derive(Default)]
pub struct ReconstructionSystem {
    decoder: Option<Box<dyn RgbdDecoder>>,
    stages: Option<StageTable>,
}

impl ReconstructionSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `decoder` instead of the configured `rgbd_decoder` program.
    pub fn with_decoder(mut self, decoder: impl RgbdDecoder + 'static) -> Self {
        self.decoder = Some(Box::new(decoder));
        self
    }

    /// Use `stages` instead of the configured `stage_commands`.
    pub fn with_stages(mut self, stages: StageTable) -> Self {
        self.stages = Some(stages);
        self
    }

    /// Execute one run, writing the configuration and timing tables to `out`.
    ///
    /// The timing table is written even when a stage fails; stages after the
    /// failed one show zero.
    pub fn run<W: Write>(&self, request: &RunRequest, out: &mut W) -> Result<RunSummary, SystemError> {
        if request.flags.is_empty() {
            return Err(SystemError::NoStageSelected);
        }

        let mut config = RunConfig::from_path(&request.config_path)?;
        config.debug_mode = request.debug_mode;
        info!("Loaded configuration {}", request.config_path.display());

        let command_decoder;
        let decoder: &dyn RgbdDecoder = match &self.decoder {
            Some(decoder) => decoder.as_ref(),
            None => {
                command_decoder = CommandDecoder::from_config(&config);
                &command_decoder
            }
        };
        let materialization = materialize(&mut config, decoder)?;

        let frames = validate_dataset(&config)?;

        write!(out, "{}", ConfigReport(&config)).map_err(SystemError::Report)?;

        let command_stages;
        let table = match &self.stages {
            Some(table) => table,
            None => {
                command_stages = StageTable::from_config(&config);
                &command_stages
            }
        };
        let enabled: Vec<&str> = request.flags.enabled().map(StageKind::name).collect();
        info!("Dispatching stages: {}", enabled.join(", "));
        let dispatched = Dispatcher::new(table).dispatch(&config, request.flags);

        let timing = match &dispatched {
            Ok(timing) => *timing,
            Err(err) => err.timing,
        };
        let reported = write!(out, "{}", TimingReport(&timing)).and_then(|()| out.flush());
        let timing = dispatched?;
        reported.map_err(SystemError::Report)?;

        if request.flags.integrate {
            let mesh = config.scene_mesh_path();
            if mesh.is_file() {
                info!("Scene mesh written to {}", mesh.display());
            }
        }

        Ok(RunSummary {
            config,
            materialization,
            frames,
            timing,
        })
    }
}
