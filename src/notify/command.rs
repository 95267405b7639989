use super::OutcomeObserver;
use crate::error::{AppError, Result};
use crate::item::MediaItem;
use crate::pipeline::ProcessingOutcome;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;

/// Runs a user command for every terminal outcome.
///
/// The command receives `DROPFLOW_OUTCOME` (success, quarantined, failed),
/// `DROPFLOW_ITEM` (item path) and `DROPFLOW_DETAIL` (destination or reason).
pub struct CommandNotifier {
    program: String,
    args: Vec<String>,
}

impl CommandNotifier {
    /// `None` when `command` is empty
    pub fn new(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }

    fn build_command(&self, item: &MediaItem, outcome: &ProcessingOutcome) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .env("DROPFLOW_OUTCOME", outcome.label())
            .env("DROPFLOW_ITEM", item.path.as_os_str())
            .env("DROPFLOW_DETAIL", outcome.detail())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        cmd
    }

    /// Start the command without waiting for it
    pub fn spawn(&self, item: &MediaItem, outcome: &ProcessingOutcome) -> Result<Child> {
        Ok(self.build_command(item, outcome).spawn()?)
    }
}

fn check_exit(program: &str, status: ExitStatus) -> Result<()> {
    if status.success() {
        Ok(())
    } else {
        Err(AppError::CommandFailed {
            command: program.to_string(),
            exit_code: status.code().unwrap_or(-1),
        })
    }
}

impl OutcomeObserver for CommandNotifier {
    fn on_outcome(&self, item: &MediaItem, outcome: &ProcessingOutcome) {
        // The child is running once spawn returns and outlives this process
        let mut child = match self.spawn(item, outcome) {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!("Failed to run notify command {}: {}", self.program, e);
                return;
            }
        };

        let program = self.program.clone();
        let reaper = thread::Builder::new()
            .name("notify-reaper".to_string())
            .spawn(move || {
                let checked = child
                    .wait()
                    .map_err(AppError::from)
                    .and_then(|status| check_exit(&program, status));
                if let Err(e) = checked {
                    tracing::warn!("Notify command failed: {}", e);
                }
            });
        if let Err(e) = reaper {
            tracing::warn!("Failed to start notify reaper: {}", e);
        }
    }
}
