//! Stages backed by external programs.
//!
//! The program receives the resolved run configuration as JSON on stdin and
//! the stage name in the `RECON_STAGE` environment variable. A zero exit
//! status means the stage succeeded.

use crate::stage::{PipelineStage, StageError, StageKind};
use recon_data::RunConfig;
use std::io::{ErrorKind, Write};
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// Environment variable naming the stage a program is run for.
pub const STAGE_ENV: &str = "RECON_STAGE";

#[derive(Debug, Clone)]
pub struct CommandStage {
    kind: StageKind,
    command: Vec<String>,
}

impl CommandStage {
    pub fn new(kind: StageKind, command: Vec<String>) -> Self {
        Self { kind, command }
    }

    /// Take the command for `kind` from `stage_commands`.
    pub fn from_config(kind: StageKind, config: &RunConfig) -> Self {
        let commands = &config.stage_commands;
        let command = match kind {
            StageKind::Make => &commands.make,
            StageKind::Register => &commands.register,
            StageKind::Refine => &commands.refine,
            StageKind::Integrate => &commands.integrate,
        };
        Self::new(kind, command.clone())
    }
}

impl PipelineStage for CommandStage {
    fn run(&self, config: &RunConfig) -> Result<(), StageError> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(StageError::NotConfigured(self.kind));
        };
        let payload = serde_json::to_vec(config)?;

        debug!("Launching `{}` for stage {}", program, self.kind);
        let mut child = Command::new(program)
            .args(args)
            .env(STAGE_ENV, self.kind.name())
            .stdin(Stdio::piped())
            .spawn()
            .map_err(|source| StageError::Spawn {
                program: program.clone(),
                source,
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            // A program that never reads its config closes the pipe early.
            match stdin.write_all(&payload) {
                Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                    warn!("`{}` did not read its configuration", program);
                }
                other => other?,
            }
        }

        let status = child.wait()?;
        if !status.success() {
            return Err(StageError::Failed {
                program: program.clone(),
                status: status.to_string(),
            });
        }
        Ok(())
    }
}
