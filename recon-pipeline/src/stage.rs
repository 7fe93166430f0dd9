//! Stage identities, selection flags and the stage trait.

use recon_data::RunConfig;
use std::fmt;
use thiserror::Error;

/// One of the four reconstruction stages.
///
/// The declaration order is the dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StageKind {
    Make,
    Register,
    Refine,
    Integrate,
}

impl StageKind {
    /// Every stage, in the order they always run.
    pub const ALL: [StageKind; 4] = [
        StageKind::Make,
        StageKind::Register,
        StageKind::Refine,
        StageKind::Integrate,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    /// Short name, as used for CLI flags and config keys.
    pub const fn name(self) -> &'static str {
        match self {
            StageKind::Make => "make",
            StageKind::Register => "register",
            StageKind::Refine => "refine",
            StageKind::Integrate => "integrate",
        }
    }

    /// Label used in the timing report.
    pub const fn description(self) -> &'static str {
        match self {
            StageKind::Make => "Making fragments",
            StageKind::Register => "Register fragments",
            StageKind::Refine => "Refine registration",
            StageKind::Integrate => "Integrate frames",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which stages a run should execute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageFlags {
    pub make: bool,
    pub register: bool,
    pub refine: bool,
    pub integrate: bool,
}

impl StageFlags {
    /// Every stage enabled.
    pub fn all() -> Self {
        Self {
            make: true,
            register: true,
            refine: true,
            integrate: true,
        }
    }

    /// Exactly the given stages enabled.
    pub fn only(kinds: &[StageKind]) -> Self {
        let mut flags = Self::default();
        for kind in kinds {
            flags.set(*kind, true);
        }
        flags
    }

    pub fn set(&mut self, kind: StageKind, enabled: bool) {
        match kind {
            StageKind::Make => self.make = enabled,
            StageKind::Register => self.register = enabled,
            StageKind::Refine => self.refine = enabled,
            StageKind::Integrate => self.integrate = enabled,
        }
    }

    pub fn is_enabled(&self, kind: StageKind) -> bool {
        match kind {
            StageKind::Make => self.make,
            StageKind::Register => self.register,
            StageKind::Refine => self.refine,
            StageKind::Integrate => self.integrate,
        }
    }

    /// True when no stage is selected. Such a run is rejected up front.
    pub fn is_empty(&self) -> bool {
        !StageKind::ALL.iter().any(|kind| self.is_enabled(*kind))
    }

    /// Enabled stages in dispatch order.
    pub fn enabled(&self) -> impl Iterator<Item = StageKind> + '_ {
        StageKind::ALL
            .into_iter()
            .filter(|kind| self.is_enabled(*kind))
    }
}

/// Errors raised by a stage while it runs.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("No command configured for stage `{0}` (set `stage_commands.{0}`)")]
    NotConfigured(StageKind),

    #[error("Failed to launch `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("`{program}` exited with {status}")]
    Failed { program: String, status: String },

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl From<String> for StageError {
    fn from(message: String) -> Self {
        StageError::Other(message)
    }
}

impl From<&str> for StageError {
    fn from(message: &str) -> Self {
        StageError::Other(message.to_string())
    }
}

/// A reconstruction stage.
///
/// Stages share the run configuration read-only and hand their results to
/// later stages through files under the dataset folder, so any stage can be
/// re-run on its own against artifacts from an earlier run. A stage checks
/// its own inputs; the dispatcher only guarantees ordering.
pub trait PipelineStage {
    fn run(&self, config: &RunConfig) -> Result<(), StageError>;
}

impl<F> PipelineStage for F
where
    F: Fn(&RunConfig) -> Result<(), StageError>,
{
    fn run(&self, config: &RunConfig) -> Result<(), StageError> {
        self(config)
    }
}
