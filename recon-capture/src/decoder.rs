//! Recording decoder trait and the external-program implementation.

use recon_data::RunConfig;
use std::path::{Path, PathBuf};
use std::process::Command;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur while extracting frames from a recording.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("No RGBD decoder configured (set `rgbd_decoder`) to extract {0}")]
    DecoderNotConfigured(PathBuf),

    #[error("Failed to launch decoder `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Decoder failed on {recording} ({status})")]
    DecoderFailed { recording: PathBuf, status: String },

    #[error("Failed to decode {recording}: {reason}")]
    Decode { recording: PathBuf, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Something that can demux an RGBD recording into a frame folder.
///
/// Implementations write `depth/`, `color/` and `intrinsic.json` under
/// `frames_folder`. The folder itself already exists when this is called.
pub trait RgbdDecoder {
    fn save_frames(&self, recording: &Path, frames_folder: &Path) -> Result<(), ExtractionError>;
}

/// Runs `<program> [args..] <recording> <frames_folder>`.
#[derive(Debug, Clone, Default)]
pub struct CommandDecoder {
    command: Vec<String>,
}

impl CommandDecoder {
    /// Create a decoder from a program and its leading arguments.
    pub fn new<I, S>(command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            command: command.into_iter().map(Into::into).collect(),
        }
    }

    /// Use the `rgbd_decoder` entry of a run configuration.
    pub fn from_config(config: &RunConfig) -> Self {
        Self::new(config.rgbd_decoder.iter().cloned())
    }
}

impl RgbdDecoder for CommandDecoder {
    fn save_frames(&self, recording: &Path, frames_folder: &Path) -> Result<(), ExtractionError> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(ExtractionError::DecoderNotConfigured(recording.to_path_buf()));
        };

        info!("Running decoder `{}` on {}", program, recording.display());
        let status = Command::new(program)
            .args(args)
            .arg(recording)
            .arg(frames_folder)
            .status()
            .map_err(|source| ExtractionError::Spawn {
                program: program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(ExtractionError::DecoderFailed {
                recording: recording.to_path_buf(),
                status: status.to_string(),
            });
        }
        debug!("Decoder finished: {}", status);
        Ok(())
    }
}
