//! Execution of actions through the privileged configuration shell

use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;

use crate::config::ExecutorConfig;
use crate::dispatch::Action;
use crate::error::ExecError;

/// Applies actions to the host and persists the resulting configuration
pub trait ActionExecutor: Send + Sync {
    /// Run one fully substituted action
    fn run(&self, action: &Action) -> Result<(), ExecError>;

    /// Write the running configuration to the shell's persistent store
    fn persist(&self) -> Result<(), ExecError>;
}

/// Build the executor selected by the configuration
pub fn from_config(config: &ExecutorConfig) -> Arc<dyn ActionExecutor> {
    if config.dry_run {
        Arc::new(DryRunExecutor)
    } else {
        Arc::new(VtyshExecutor::new(config.vtysh_path.clone()))
    }
}

/// Runs actions as `vtysh -e "<action>"`
#[derive(Debug, Clone)]
pub struct VtyshExecutor {
    path: PathBuf,
}

impl VtyshExecutor {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn exec(&self, line: &str, shown: &str) -> Result<(), ExecError> {
        let output = Command::new(&self.path)
            .arg("-e")
            .arg(line)
            .output()
            .map_err(|source| ExecError::Spawn {
                program: self.path.display().to_string(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stdout.trim().is_empty() {
            tracing::debug!("vtysh [{}] stdout: {}", shown, stdout.trim_end());
        }
        if !stderr.trim().is_empty() {
            tracing::debug!("vtysh [{}] stderr: {}", shown, stderr.trim_end());
        }

        if !output.status.success() {
            return Err(ExecError::ExitStatus {
                command: shown.to_string(),
                code: output.status.code(),
            });
        }
        Ok(())
    }
}

impl ActionExecutor for VtyshExecutor {
    fn run(&self, action: &Action) -> Result<(), ExecError> {
        self.exec(action.command(), &action.redacted())
    }

    fn persist(&self) -> Result<(), ExecError> {
        self.exec("write", "write")
    }
}

/// Logs actions without touching the host
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunExecutor;

impl ActionExecutor for DryRunExecutor {
    fn run(&self, action: &Action) -> Result<(), ExecError> {
        tracing::info!("Dry run: vtysh -e \"{}\"", action);
        Ok(())
    }

    fn persist(&self) -> Result<(), ExecError> {
        tracing::info!("Dry run: vtysh -e \"write\"");
        Ok(())
    }
}
