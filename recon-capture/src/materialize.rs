//! Dataset materialization: raw recording in, frame folder out.

use crate::decoder::{ExtractionError, RgbdDecoder};
use recon_data::{INTRINSIC_FILE, RECORDING_EXTENSION, RunConfig, recording_frames_folder};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// What [`materialize`] did with the dataset path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Materialization {
    /// Not a raw recording; the configuration is untouched.
    PassThrough,
    /// `intrinsic.json` was already present, extraction skipped.
    Reused { frames_folder: PathBuf },
    /// The decoder extracted the recording into `frames_folder`.
    Extracted { frames_folder: PathBuf },
}

/// True for an existing file with the raw-recording extension.
pub fn is_raw_recording(path: &Path) -> bool {
    path.is_file() && path.extension().is_some_and(|ext| ext == RECORDING_EXTENSION)
}

/// Make sure `config.path_dataset` names a frame folder.
///
/// A raw recording is extracted next to itself into
/// `<parent>/<recording name without extension>`, unless that folder already
/// holds an `intrinsic.json`, in which case the earlier extraction is reused
/// as-is. Its completeness is not checked. Either way `path_dataset` and
/// `path_intrinsic` are rewritten to the folder. Anything else passes through
/// and is left for the layout validator.
#[tracing::instrument(skip_all, fields(dataset = %config.path_dataset.display()))]
pub fn materialize<D>(config: &mut RunConfig, decoder: &D) -> Result<Materialization, ExtractionError>
where
    D: RgbdDecoder + ?Sized,
{
    let recording = config.path_dataset.clone();
    if !is_raw_recording(&recording) {
        return Ok(Materialization::PassThrough);
    }

    let frames_folder = recording_frames_folder(&recording);
    let path_intrinsic = frames_folder.join(INTRINSIC_FILE);

    let outcome = if path_intrinsic.is_file() {
        warn!(
            "Skipping frame extraction for {} since files are present",
            recording.display()
        );
        Materialization::Reused {
            frames_folder: frames_folder.clone(),
        }
    } else {
        info!("Extracting frames from RGBD video file {}", recording.display());
        fs::create_dir_all(&frames_folder)?;
        decoder.save_frames(&recording, &frames_folder)?;
        Materialization::Extracted {
            frames_folder: frames_folder.clone(),
        }
    };

    config.path_dataset = frames_folder;
    config.path_intrinsic = Some(path_intrinsic);
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use tempfile::TempDir;

    /// Records every call and writes a minimal extraction.
    #[derive(Default)]
    struct RecordingDecoder {
        calls: RefCell<Vec<(PathBuf, PathBuf)>>,
    }

    impl RgbdDecoder for RecordingDecoder {
        fn save_frames(&self, recording: &Path, frames_folder: &Path) -> Result<(), ExtractionError> {
            self.calls
                .borrow_mut()
                .push((recording.to_path_buf(), frames_folder.to_path_buf()));
            fs::create_dir_all(frames_folder.join("color"))?;
            fs::create_dir_all(frames_folder.join("depth"))?;
            fs::write(frames_folder.join(INTRINSIC_FILE), "{}")?;
            Ok(())
        }
    }

    struct BrokenDecoder;

    impl RgbdDecoder for BrokenDecoder {
        fn save_frames(&self, recording: &Path, _: &Path) -> Result<(), ExtractionError> {
            Err(ExtractionError::Decode {
                recording: recording.to_path_buf(),
                reason: "truncated container".into(),
            })
        }
    }

    #[test]
    fn test_folder_passes_through() {
        let dir = TempDir::new().unwrap();
        let mut config = RunConfig::new(dir.path());
        let decoder = RecordingDecoder::default();

        let outcome = materialize(&mut config, &decoder).unwrap();
        assert_eq!(outcome, Materialization::PassThrough);
        assert_eq!(config.path_dataset, dir.path());
        assert_eq!(config.path_intrinsic, None);
        assert!(decoder.calls.borrow().is_empty());
    }

    #[test]
    fn test_nonexistent_bag_passes_through() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.bag");
        let mut config = RunConfig::new(&missing);
        let decoder = RecordingDecoder::default();

        assert_eq!(materialize(&mut config, &decoder).unwrap(), Materialization::PassThrough);
        assert_eq!(config.path_dataset, missing);
    }

    #[test]
    fn test_other_extension_passes_through() {
        let dir = TempDir::new().unwrap();
        let video = dir.path().join("rec.mkv");
        fs::write(&video, b"raw").unwrap();
        let mut config = RunConfig::new(&video);

        let outcome = materialize(&mut config, &RecordingDecoder::default()).unwrap();
        assert_eq!(outcome, Materialization::PassThrough);
        assert_eq!(config.path_dataset, video);
    }

    #[test]
    fn test_recording_is_extracted_once() {
        let dir = TempDir::new().unwrap();
        let recording = dir.path().join("rec.bag");
        fs::write(&recording, b"raw").unwrap();
        let mut config = RunConfig::new(&recording);
        let decoder = RecordingDecoder::default();

        let outcome = materialize(&mut config, &decoder).unwrap();
        let frames_folder = dir.path().join("rec");
        assert_eq!(
            outcome,
            Materialization::Extracted {
                frames_folder: frames_folder.clone()
            }
        );
        assert_eq!(
            *decoder.calls.borrow(),
            vec![(recording.clone(), frames_folder.clone())]
        );
        assert_eq!(config.path_dataset, frames_folder);
        assert_eq!(config.path_intrinsic, Some(frames_folder.join(INTRINSIC_FILE)));
    }

    #[test]
    fn test_existing_extraction_is_reused() {
        let dir = TempDir::new().unwrap();
        let recording = dir.path().join("rec.bag");
        fs::write(&recording, b"raw").unwrap();
        let frames_folder = dir.path().join("rec");
        fs::create_dir_all(&frames_folder).unwrap();
        fs::write(frames_folder.join(INTRINSIC_FILE), "{}").unwrap();

        let mut config = RunConfig::new(&recording);
        let decoder = RecordingDecoder::default();
        let outcome = materialize(&mut config, &decoder).unwrap();

        assert!(matches!(outcome, Materialization::Reused { .. }));
        assert!(decoder.calls.borrow().is_empty());
        assert_eq!(config.path_dataset, frames_folder);
        assert_eq!(config.path_intrinsic, Some(frames_folder.join(INTRINSIC_FILE)));
    }

    #[test]
    fn test_second_run_reuses_first_extraction() {
        let dir = TempDir::new().unwrap();
        let recording = dir.path().join("rec.bag");
        fs::write(&recording, b"raw").unwrap();
        let decoder = RecordingDecoder::default();

        let mut first = RunConfig::new(&recording);
        materialize(&mut first, &decoder).unwrap();
        let mut second = RunConfig::new(&recording);
        let outcome = materialize(&mut second, &decoder).unwrap();

        assert!(matches!(outcome, Materialization::Reused { .. }));
        assert_eq!(decoder.calls.borrow().len(), 1);
        assert_eq!(first.path_dataset, second.path_dataset);
    }

    #[test]
    fn test_decoder_failure_propagates() {
        let dir = TempDir::new().unwrap();
        let recording = dir.path().join("rec.bag");
        fs::write(&recording, b"raw").unwrap();
        let mut config = RunConfig::new(&recording);

        let err = materialize(&mut config, &BrokenDecoder).unwrap_err();
        assert!(matches!(err, ExtractionError::Decode { .. }));
        assert_eq!(config.path_dataset, recording);
        assert_eq!(config.path_intrinsic, None);
    }
}
