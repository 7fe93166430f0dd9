//! Frame-folder layout shared by the decoder and every pipeline stage.
//!
//! A frame folder looks like:
//!
//! ```text
//! <dataset>/
//!     color/000000.jpg ...   (also accepted: image/, rgb/)
//!     depth/000000.png ...
//!     intrinsic.json         (present for extracted recordings)
//! ```

use crate::config::RunConfig;
use crate::intrinsic::{CameraIntrinsic, IntrinsicError};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Extension of raw RGBD recordings that must be extracted before use.
pub const RECORDING_EXTENSION: &str = "bag";
/// Calibration file written next to the extracted frames.
pub const INTRINSIC_FILE: &str = "intrinsic.json";

const DEPTH_FOLDER: &str = "depth";
const COLOR_FOLDERS: [&str; 3] = ["image", "rgb", "color"];
const FRAME_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Errors raised when a dataset does not match the frame-folder layout.
#[derive(Debug, Error)]
pub enum DatasetLayoutError {
    #[error("Dataset path {0} does not exist")]
    MissingDataset(PathBuf),

    #[error("Dataset path {0} is not a directory")]
    NotADirectory(PathBuf),

    #[error("No color folder (image/, rgb/ or color/) in {0}")]
    MissingColorFolder(PathBuf),

    #[error("Depth folder {0} does not exist")]
    MissingDepthFolder(PathBuf),

    #[error("No frames in {0}")]
    EmptyFrameFolder(PathBuf),

    #[error("Frame {path} is not a readable image: {source}")]
    UnreadableFrame {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Intrinsic file {0} does not exist")]
    MissingIntrinsic(PathBuf),

    #[error("Intrinsic file {path} is invalid: {source}")]
    InvalidIntrinsic {
        path: PathBuf,
        #[source]
        source: IntrinsicError,
    },

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Folder that frames extracted from `recording` are written to:
/// `<parent of recording>/<recording file name without extension>`.
pub fn recording_frames_folder(recording: &Path) -> PathBuf {
    let stem = recording.file_stem().unwrap_or_default();
    match recording.parent() {
        Some(parent) => parent.join(stem),
        None => PathBuf::from(stem),
    }
}

/// A validated frame folder.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameFolder {
    pub root: PathBuf,
    pub color_dir: PathBuf,
    pub depth_dir: PathBuf,
    /// Color frames sorted by file name.
    pub color_frames: Vec<PathBuf>,
    /// Depth frames sorted by file name.
    pub depth_frames: Vec<PathBuf>,
    /// First color frame resolution.
    pub color_resolution: (u32, u32),
}

impl FrameFolder {
    /// Check `root` against the frame-folder layout.
    ///
    /// Both frame directories must exist and hold at least one frame, and the
    /// first frame of each must decode as an image header.
    #[tracing::instrument(skip_all, fields(root = %root.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self, DatasetLayoutError> {
        let root = root.as_ref();
        if !root.exists() {
            return Err(DatasetLayoutError::MissingDataset(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(DatasetLayoutError::NotADirectory(root.to_path_buf()));
        }

        let color_dir = COLOR_FOLDERS
            .iter()
            .map(|name| root.join(name))
            .find(|dir| dir.is_dir())
            .ok_or_else(|| DatasetLayoutError::MissingColorFolder(root.to_path_buf()))?;
        let depth_dir = root.join(DEPTH_FOLDER);
        if !depth_dir.is_dir() {
            return Err(DatasetLayoutError::MissingDepthFolder(depth_dir));
        }

        let color_frames = list_frames(&color_dir)?;
        let depth_frames = list_frames(&depth_dir)?;
        let color_resolution = probe_frame(&color_frames[0])?;
        let depth_resolution = probe_frame(&depth_frames[0])?;

        if color_frames.len() != depth_frames.len() {
            warn!(
                "Frame count mismatch: {} color vs {} depth",
                color_frames.len(),
                depth_frames.len()
            );
        }
        if color_resolution != depth_resolution {
            warn!(
                "Color frames are {}x{} but depth frames are {}x{}",
                color_resolution.0, color_resolution.1, depth_resolution.0, depth_resolution.1
            );
        }

        debug!(
            "Frame folder: {} color, {} depth frames",
            color_frames.len(),
            depth_frames.len()
        );
        Ok(Self {
            root: root.to_path_buf(),
            color_dir,
            depth_dir,
            color_frames,
            depth_frames,
            color_resolution,
        })
    }

    /// Number of usable RGBD pairs.
    pub fn frame_count(&self) -> usize {
        self.color_frames.len().min(self.depth_frames.len())
    }
}

fn list_frames(dir: &Path) -> Result<Vec<PathBuf>, DatasetLayoutError> {
    let io_err = |source| DatasetLayoutError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut frames = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let is_frame = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()));
        if is_frame && path.is_file() {
            frames.push(path);
        }
    }
    if frames.is_empty() {
        return Err(DatasetLayoutError::EmptyFrameFolder(dir.to_path_buf()));
    }
    frames.sort();
    Ok(frames)
}

fn probe_frame(path: &Path) -> Result<(u32, u32), DatasetLayoutError> {
    image::image_dimensions(path).map_err(|source| DatasetLayoutError::UnreadableFrame {
        path: path.to_path_buf(),
        source,
    })
}

/// Validate the dataset a run configuration points at.
///
/// Runs once, after any recording has been materialized and before the
/// first stage is dispatched.
pub fn validate_dataset(config: &RunConfig) -> Result<FrameFolder, DatasetLayoutError> {
    let folder = FrameFolder::open(&config.path_dataset)?;

    if let Some(path) = &config.path_intrinsic {
        if !path.is_file() {
            return Err(DatasetLayoutError::MissingIntrinsic(path.clone()));
        }
        let intrinsic = CameraIntrinsic::from_path(path).map_err(|source| {
            DatasetLayoutError::InvalidIntrinsic {
                path: path.clone(),
                source,
            }
        })?;
        let center = intrinsic.principal_point();
        debug!("Principal point ({:.2}, {:.2})", center.x, center.y);
        if intrinsic.resolution() != folder.color_resolution {
            warn!(
                "Intrinsic resolution {}x{} differs from color frames {}x{}",
                intrinsic.width,
                intrinsic.height,
                folder.color_resolution.0,
                folder.color_resolution.1
            );
        }
    }

    info!(
        "Dataset {} holds {} RGBD frames",
        folder.root.display(),
        folder.frame_count()
    );
    Ok(folder)
}
