//! Name-Server Control
//!
//! Reload, status and restart of the local name server. The engine never
//! depends on these; the HTTP layer calls them on request (and after
//! mutations when `auto_reload` is set).

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::NameServerCommands;

/// Errors from running a name-server command
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("No command configured")]
    EmptyCommand,

    #[error("Failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command exited with {status}: {output}")]
    CommandFailed { status: String, output: String },
}

/// Operations on the name server serving the zone
///
/// Each call returns the command output on success.
#[async_trait]
pub trait NameServerControl: Send + Sync {
    async fn reload(&self) -> Result<String, ControlError>;
    async fn status(&self) -> Result<String, ControlError>;
    async fn restart(&self) -> Result<String, ControlError>;
}

/// Runs the configured commands on the local system
pub struct SystemControl {
    commands: NameServerCommands,
}

impl SystemControl {
    pub fn new(commands: NameServerCommands) -> Self {
        Self { commands }
    }

    async fn run(argv: &[String]) -> Result<String, ControlError> {
        let (program, args) = argv.split_first().ok_or(ControlError::EmptyCommand)?;
        debug!("Running {:?}", argv);

        let output = Command::new(program)
            .args(args)
            .output()
            .await
            .map_err(|source| ControlError::Spawn {
                program: program.clone(),
                source,
            })?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        if !output.status.success() {
            return Err(ControlError::CommandFailed {
                status: output.status.to_string(),
                output: combined,
            });
        }

        Ok(combined)
    }
}

#[async_trait]
impl NameServerControl for SystemControl {
    async fn reload(&self) -> Result<String, ControlError> {
        let output = Self::run(&self.commands.reload_command).await?;
        info!("🔄 Name server reloaded");
        Ok(output)
    }

    async fn status(&self) -> Result<String, ControlError> {
        Self::run(&self.commands.status_command).await
    }

    async fn restart(&self) -> Result<String, ControlError> {
        let output = Self::run(&self.commands.restart_command).await?;
        info!("🔁 Name server restarted");
        Ok(output)
    }
}
