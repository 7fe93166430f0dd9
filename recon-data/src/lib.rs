//! Recon Data Crate
//!
//! On-disk contracts shared by every part of the reconstruction pipeline:
//! the run configuration document, the camera intrinsic file and the
//! frame-folder layout that all stages read from.
//! This crate does no pipeline scheduling; see `recon-pipeline` for that.

pub mod config;
pub mod intrinsic;
pub mod layout;

pub use config::{ConfigError, GlobalRegistration, IcpMethod, RunConfig, StageCommands};
pub use intrinsic::{CameraIntrinsic, IntrinsicError};
pub use layout::{
    DatasetLayoutError, FrameFolder, INTRINSIC_FILE, RECORDING_EXTENSION, recording_frames_folder,
    validate_dataset,
};
