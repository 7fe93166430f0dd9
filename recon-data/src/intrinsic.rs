//! Pinhole camera intrinsic file (`intrinsic.json`).

use glam::{DMat3, DVec2};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum IntrinsicError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid intrinsic: {0}")]
    Invalid(String),
}

// On-disk layout. The matrix is stored column-major.
#[derive(Deserialize, Debug)]
struct IntrinsicFile {
    width: u32,
    height: u32,
    intrinsic_matrix: Vec<f64>,
    #[serde(default)]
    depth_scale: Option<f64>,
}

/// Camera calibration for the frames of one dataset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraIntrinsic {
    /// Image width in pixels.
    pub width: u32,
    /// Image height in pixels.
    pub height: u32,
    /// 3x3 projection matrix `[fx 0 cx; 0 fy cy; 0 0 1]`.
    pub matrix: DMat3,
    /// Depth units per meter, when the recording stored one.
    pub depth_scale: Option<f64>,
}

impl CameraIntrinsic {
    /// Load an intrinsic file from disk.
    #[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, IntrinsicError> {
        let reader = BufReader::new(File::open(path)?);
        let raw: IntrinsicFile = serde_json::from_reader(reader)?;
        Self::from_raw(raw)
    }

    /// Parse an intrinsic document from a JSON string.
    pub fn from_json_str(text: &str) -> Result<Self, IntrinsicError> {
        Self::from_raw(serde_json::from_str(text)?)
    }

    fn from_raw(raw: IntrinsicFile) -> Result<Self, IntrinsicError> {
        let cols: [f64; 9] = raw.intrinsic_matrix.as_slice().try_into().map_err(|_| {
            IntrinsicError::Invalid(format!(
                "intrinsic_matrix needs 9 entries, got {}",
                raw.intrinsic_matrix.len()
            ))
        })?;
        if raw.width == 0 || raw.height == 0 {
            return Err(IntrinsicError::Invalid(format!(
                "resolution {}x{} is empty",
                raw.width, raw.height
            )));
        }

        let intrinsic = Self {
            width: raw.width,
            height: raw.height,
            matrix: DMat3::from_cols_array(&cols),
            depth_scale: raw.depth_scale,
        };
        let focal = intrinsic.focal_length();
        if focal.x <= 0.0 || focal.y <= 0.0 {
            return Err(IntrinsicError::Invalid(format!(
                "focal length ({}, {}) must be positive",
                focal.x, focal.y
            )));
        }

        debug!(
            "Intrinsic {}x{}, focal ({:.2}, {:.2})",
            intrinsic.width, intrinsic.height, focal.x, focal.y
        );
        Ok(intrinsic)
    }

    /// Focal length `(fx, fy)` in pixels.
    pub fn focal_length(&self) -> DVec2 {
        DVec2::new(self.matrix.x_axis.x, self.matrix.y_axis.y)
    }

    /// Principal point `(cx, cy)` in pixels.
    pub fn principal_point(&self) -> DVec2 {
        DVec2::new(self.matrix.z_axis.x, self.matrix.z_axis.y)
    }

    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIMESENSE: &str = r#"{
        "width": 640,
        "height": 480,
        "intrinsic_matrix": [525.0, 0.0, 0.0, 0.0, 525.0, 0.0, 319.5, 239.5, 1.0]
    }"#;

    #[test]
    fn test_parse_column_major_matrix() {
        let intrinsic = CameraIntrinsic::from_json_str(PRIMESENSE).unwrap();
        assert_eq!(intrinsic.resolution(), (640, 480));
        assert_eq!(intrinsic.focal_length(), DVec2::new(525.0, 525.0));
        assert_eq!(intrinsic.principal_point(), DVec2::new(319.5, 239.5));
        assert_eq!(intrinsic.depth_scale, None);
    }

    #[test]
    fn test_depth_scale_is_optional() {
        let intrinsic = CameraIntrinsic::from_json_str(
            r#"{"width": 4, "height": 4, "depth_scale": 1000.0,
                "intrinsic_matrix": [2, 0, 0, 0, 2, 0, 2, 2, 1]}"#,
        )
        .unwrap();
        assert_eq!(intrinsic.depth_scale, Some(1000.0));
    }

    #[test]
    fn test_wrong_matrix_size() {
        let err = CameraIntrinsic::from_json_str(
            r#"{"width": 4, "height": 4, "intrinsic_matrix": [1, 0, 0, 1]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, IntrinsicError::Invalid(_)));
    }

    #[test]
    fn test_zero_focal_length() {
        let err = CameraIntrinsic::from_json_str(
            r#"{"width": 4, "height": 4, "intrinsic_matrix": [0, 0, 0, 0, 0, 0, 2, 2, 1]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, IntrinsicError::Invalid(_)));
    }

    #[test]
    fn test_missing_fields() {
        let err = CameraIntrinsic::from_json_str(r#"{"width": 4}"#).unwrap_err();
        assert!(matches!(err, IntrinsicError::Json(_)));
    }
}
