//! Recon Pipeline Crate
//!
//! Drives the offline RGBD reconstruction system. The four stages
//! (make fragments, register fragments, refine registration, integrate
//! scene) are opaque collaborators behind [`PipelineStage`]; this crate owns
//! the contract around them:
//!
//! - [`stage`]: stage identities, flags and the stage trait
//! - [`dispatch`]: the fixed-order stage table and dispatcher
//! - [`command`]: stages implemented as external programs
//! - [`timing`] / [`report`]: per-stage wall-clock timing and console tables
//! - [`system`]: config → dataset → validation → dispatch → report

pub mod command;
pub mod dispatch;
pub mod report;
pub mod stage;
pub mod system;
pub mod timing;

pub use command::CommandStage;
pub use dispatch::{DispatchError, Dispatcher, StageTable};
pub use report::{ConfigReport, TimingReport};
pub use stage::{PipelineStage, StageError, StageFlags, StageKind};
pub use system::{ReconstructionSystem, RunRequest, RunSummary, SystemError};
pub use timing::{StageTiming, format_duration};
