//! Run configuration for the reconstruction pipeline.
//!
//! A [`RunConfig`] is loaded once from a JSON document, every stage option the
//! document omits is filled with its default, and the result is validated
//! before any dataset work starts. Keys the orchestrator does not know about
//! are kept in [`RunConfig::extra`] and handed to the stages untouched.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors raised while loading a run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// ICP variant used by the registration stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IcpMethod {
    PointToPoint,
    PointToPlane,
    Color,
    Generalized,
}

/// Global registration algorithm used between fragments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GlobalRegistration {
    Ransac,
    Fgr,
}

/// External programs implementing each pipeline stage.
///
/// Every entry is a program followed by its leading arguments; an empty
/// vector means the stage has no command configured.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageCommands {
    pub make: Vec<String>,
    pub register: Vec<String>,
    pub refine: Vec<String>,
    pub integrate: Vec<String>,
}

/// Fully-resolved configuration shared by every pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Frame folder (or raw `.bag` recording before materialization).
    pub path_dataset: PathBuf,
    /// Camera intrinsic file. Set when a recording is materialized.
    #[serde(
        default,
        deserialize_with = "empty_path_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub path_intrinsic: Option<PathBuf>,
    /// Always overwritten from the command line after loading. A document
    /// value that is not a boolean reads as `false`.
    #[serde(default, deserialize_with = "lenient_bool")]
    pub debug_mode: bool,

    #[serde(default = "defaults::depth_map_type")]
    pub depth_map_type: String,
    #[serde(default = "defaults::n_frames_per_fragment")]
    pub n_frames_per_fragment: u32,
    #[serde(default = "defaults::n_keyframes_per_n_frame")]
    pub n_keyframes_per_n_frame: u32,
    #[serde(default = "defaults::depth_min")]
    pub depth_min: f64,
    #[serde(default = "defaults::depth_max")]
    pub depth_max: f64,
    #[serde(default = "defaults::voxel_size")]
    pub voxel_size: f64,
    #[serde(default = "defaults::depth_diff_max")]
    pub depth_diff_max: f64,
    #[serde(default = "defaults::depth_scale")]
    pub depth_scale: f64,
    #[serde(default = "defaults::preference_loop_closure_odometry")]
    pub preference_loop_closure_odometry: f64,
    #[serde(default = "defaults::preference_loop_closure_registration")]
    pub preference_loop_closure_registration: f64,
    #[serde(default = "defaults::tsdf_cubic_size")]
    pub tsdf_cubic_size: f64,
    #[serde(default = "defaults::icp_method")]
    pub icp_method: IcpMethod,
    #[serde(default = "defaults::global_registration")]
    pub global_registration: GlobalRegistration,
    #[serde(
        rename = "python_multi_threading",
        alias = "multi_threading",
        default = "defaults::multi_threading"
    )]
    pub multi_threading: bool,

    #[serde(default = "defaults::folder_fragment")]
    pub folder_fragment: String,
    #[serde(default = "defaults::template_fragment_posegraph")]
    pub template_fragment_posegraph: String,
    #[serde(default = "defaults::template_fragment_posegraph_optimized")]
    pub template_fragment_posegraph_optimized: String,
    #[serde(default = "defaults::template_fragment_pointcloud")]
    pub template_fragment_pointcloud: String,
    #[serde(default = "defaults::folder_scene")]
    pub folder_scene: String,
    #[serde(default = "defaults::template_global_posegraph")]
    pub template_global_posegraph: String,
    #[serde(default = "defaults::template_global_posegraph_optimized")]
    pub template_global_posegraph_optimized: String,
    #[serde(default = "defaults::template_refined_posegraph")]
    pub template_refined_posegraph: String,
    #[serde(default = "defaults::template_refined_posegraph_optimized")]
    pub template_refined_posegraph_optimized: String,
    #[serde(default = "defaults::template_global_mesh")]
    pub template_global_mesh: String,
    #[serde(default = "defaults::template_global_traj")]
    pub template_global_traj: String,

    /// Recording decoder program and leading arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rgbd_decoder: Vec<String>,
    #[serde(default)]
    pub stage_commands: StageCommands,

    /// Stage options the orchestrator does not interpret.
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

fn empty_path_as_none<'de, D>(deserializer: D) -> Result<Option<PathBuf>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<PathBuf>::deserialize(deserializer)?;
    Ok(raw.filter(|path| !path.as_os_str().is_empty()))
}

fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(JsonValue::deserialize(deserializer)?.as_bool().unwrap_or(false))
}

mod defaults {
    use super::{GlobalRegistration, IcpMethod};

    pub fn depth_map_type() -> String {
        "redwood".to_string()
    }
    pub fn n_frames_per_fragment() -> u32 {
        100
    }
    pub fn n_keyframes_per_n_frame() -> u32 {
        5
    }
    pub fn depth_min() -> f64 {
        0.3
    }
    pub fn depth_max() -> f64 {
        3.0
    }
    pub fn voxel_size() -> f64 {
        0.05
    }
    pub fn depth_diff_max() -> f64 {
        0.07
    }
    pub fn depth_scale() -> f64 {
        1000.0
    }
    pub fn preference_loop_closure_odometry() -> f64 {
        0.1
    }
    pub fn preference_loop_closure_registration() -> f64 {
        5.0
    }
    pub fn tsdf_cubic_size() -> f64 {
        3.0
    }
    pub fn icp_method() -> IcpMethod {
        IcpMethod::Color
    }
    pub fn global_registration() -> GlobalRegistration {
        GlobalRegistration::Ransac
    }
    pub fn multi_threading() -> bool {
        true
    }
    pub fn folder_fragment() -> String {
        "fragments/".to_string()
    }
    pub fn template_fragment_posegraph() -> String {
        "fragments/fragment_%03d.json".to_string()
    }
    pub fn template_fragment_posegraph_optimized() -> String {
        "fragments/fragment_optimized_%03d.json".to_string()
    }
    pub fn template_fragment_pointcloud() -> String {
        "fragments/fragment_%03d.ply".to_string()
    }
    pub fn folder_scene() -> String {
        "scene/".to_string()
    }
    pub fn template_global_posegraph() -> String {
        "scene/global_registration.json".to_string()
    }
    pub fn template_global_posegraph_optimized() -> String {
        "scene/global_registration_optimized.json".to_string()
    }
    pub fn template_refined_posegraph() -> String {
        "scene/refined_registration.json".to_string()
    }
    pub fn template_refined_posegraph_optimized() -> String {
        "scene/refined_registration_optimized.json".to_string()
    }
    pub fn template_global_mesh() -> String {
        "scene/integrated.ply".to_string()
    }
    pub fn template_global_traj() -> String {
        "scene/trajectory.log".to_string()
    }
}

impl RunConfig {
    /// Create a configuration for `path_dataset` with every option at its default.
    pub fn new(path_dataset: impl Into<PathBuf>) -> Self {
        Self {
            path_dataset: path_dataset.into(),
            path_intrinsic: None,
            debug_mode: false,
            depth_map_type: defaults::depth_map_type(),
            n_frames_per_fragment: defaults::n_frames_per_fragment(),
            n_keyframes_per_n_frame: defaults::n_keyframes_per_n_frame(),
            depth_min: defaults::depth_min(),
            depth_max: defaults::depth_max(),
            voxel_size: defaults::voxel_size(),
            depth_diff_max: defaults::depth_diff_max(),
            depth_scale: defaults::depth_scale(),
            preference_loop_closure_odometry: defaults::preference_loop_closure_odometry(),
            preference_loop_closure_registration: defaults::preference_loop_closure_registration(),
            tsdf_cubic_size: defaults::tsdf_cubic_size(),
            icp_method: defaults::icp_method(),
            global_registration: defaults::global_registration(),
            multi_threading: defaults::multi_threading(),
            folder_fragment: defaults::folder_fragment(),
            template_fragment_posegraph: defaults::template_fragment_posegraph(),
            template_fragment_posegraph_optimized: defaults::template_fragment_posegraph_optimized(),
            template_fragment_pointcloud: defaults::template_fragment_pointcloud(),
            folder_scene: defaults::folder_scene(),
            template_global_posegraph: defaults::template_global_posegraph(),
            template_global_posegraph_optimized: defaults::template_global_posegraph_optimized(),
            template_refined_posegraph: defaults::template_refined_posegraph(),
            template_refined_posegraph_optimized: defaults::template_refined_posegraph_optimized(),
            template_global_mesh: defaults::template_global_mesh(),
            template_global_traj: defaults::template_global_traj(),
            rgbd_decoder: Vec::new(),
            stage_commands: StageCommands::default(),
            extra: Map::new(),
        }
    }

    /// Load, default-fill and validate a configuration document.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Parse a configuration document from a JSON string.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = serde_json::from_str(text)?;
        config.validate()?;
        debug!(
            "Config parsed: dataset {}, {} pass-through option(s)",
            config.path_dataset.display(),
            config.extra.len()
        );
        Ok(config)
    }

    /// Check the cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path_dataset.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("path_dataset must not be empty".into()));
        }
        if self.depth_min < 0.0 || self.depth_min >= self.depth_max {
            return Err(ConfigError::Invalid(format!(
                "depth range [{}, {}] is empty or negative",
                self.depth_min, self.depth_max
            )));
        }
        let positive = [
            ("voxel_size", self.voxel_size),
            ("depth_scale", self.depth_scale),
            ("tsdf_cubic_size", self.tsdf_cubic_size),
        ];
        for (key, value) in positive {
            if value.is_nan() || value <= 0.0 {
                return Err(ConfigError::Invalid(format!("{key} must be positive, got {value}")));
            }
        }
        if self.n_frames_per_fragment == 0 {
            return Err(ConfigError::Invalid("n_frames_per_fragment must be at least 1".into()));
        }
        if self.n_keyframes_per_n_frame == 0 {
            return Err(ConfigError::Invalid(
                "n_keyframes_per_n_frame must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Where the integrate stage writes the final scene mesh.
    pub fn scene_mesh_path(&self) -> PathBuf {
        self.path_dataset.join(&self.template_global_mesh)
    }
}
