//! Fixed-order stage table and the dispatcher that walks it.

use crate::command::CommandStage;
use crate::stage::{PipelineStage, StageError, StageFlags, StageKind};
use crate::timing::{StageTiming, format_duration};
use recon_data::RunConfig;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, info_span};

/// One stage per [`StageKind`], stored in dispatch order.
///
/// The constructor is positional, so a table cannot hold the stages in any
/// other order.
pub struct StageTable {
    stages: [Box<dyn PipelineStage>; 4],
}

impl StageTable {
    pub fn new(
        make: Box<dyn PipelineStage>,
        register: Box<dyn PipelineStage>,
        refine: Box<dyn PipelineStage>,
        integrate: Box<dyn PipelineStage>,
    ) -> Self {
        Self {
            stages: [make, register, refine, integrate],
        }
    }

    /// External-program stages from the `stage_commands` of a configuration.
    pub fn from_config(config: &RunConfig) -> Self {
        let [make, register, refine, integrate] =
            StageKind::ALL.map(|kind| -> Box<dyn PipelineStage> {
                Box::new(CommandStage::from_config(kind, config))
            });
        Self::new(make, register, refine, integrate)
    }

    /// `(kind, stage)` pairs in dispatch order.
    pub fn iter(&self) -> impl Iterator<Item = (StageKind, &dyn PipelineStage)> + '_ {
        StageKind::ALL
            .into_iter()
            .zip(self.stages.iter().map(|stage| -> &dyn PipelineStage { stage.as_ref() }))
    }
}

/// A stage failed; later stages were not run.
#[derive(Debug, Error)]
#[error("Stage `{stage}` failed: {source}")]
pub struct DispatchError {
    pub stage: StageKind,
    /// Timing up to and including the failed stage.
    pub timing: StageTiming,
    #[source]
    pub source: StageError,
}

/// Runs the enabled stages of a table, one at a time, in table order.
pub struct Dispatcher<'a> {
    table: &'a StageTable,
}

impl<'a> Dispatcher<'a> {
    pub fn new(table: &'a StageTable) -> Self {
        Self { table }
    }

    /// Run every stage enabled in `flags` against `config`.
    ///
    /// The first failure stops the run. Files a failed stage already wrote
    /// are left in place.
    pub fn dispatch(
        &self,
        config: &RunConfig,
        flags: StageFlags,
    ) -> Result<StageTiming, DispatchError> {
        let mut timing = StageTiming::new();

        for (kind, stage) in self.table.iter() {
            if !flags.is_enabled(kind) {
                debug!("Skipping stage {}", kind);
                continue;
            }

            let _span = info_span!("stage", name = kind.name()).entered();
            info!("{}", kind.description());
            let start = Instant::now();
            let result = stage.run(config);
            timing.record(kind, start.elapsed());

            if let Err(source) = result {
                error!("Stage {} failed after {}", kind, format_duration(timing.get(kind)));
                return Err(DispatchError {
                    stage: kind,
                    timing,
                    source,
                });
            }
            info!("Stage {} done in {}", kind, format_duration(timing.get(kind)));
        }

        Ok(timing)
    }
}
