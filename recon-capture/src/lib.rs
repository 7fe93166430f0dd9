//! Recon Capture - raw RGBD recording extraction
//!
//! Turns a raw depth-camera recording into the frame-folder layout that the
//! pipeline stages consume:
//!
//! - [`RgbdDecoder`]: the seam to whatever demuxes a recording
//! - [`CommandDecoder`]: runs an external decoder program
//! - [`materialize`]: decides whether extraction is needed and rewrites the
//!   run configuration to point at the extracted frames
//!
//! ## Example
//!
//! ```ignore
//! use recon_capture::{materialize, CommandDecoder};
//!
//! let decoder = CommandDecoder::from_config(&config);
//! materialize(&mut config, &decoder)?;
//! ```

mod decoder;
mod materialize;

pub use decoder::{CommandDecoder, ExtractionError, RgbdDecoder};
pub use materialize::{Materialization, is_raw_recording, materialize};
