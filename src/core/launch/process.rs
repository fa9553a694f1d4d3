// ─── Server Process ───
// Child process handle used by the supervisor. The console is inherited so
// the operator talks to the server directly.

use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::{Child, Command};
use tracing::{debug, info};

use crate::core::error::{StarterError, StarterResult};

use super::task::LaunchPlan;

/// How a server run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
}

impl ProcessExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// A running server.
#[async_trait]
pub trait ServerProcess: Send {
    /// Wait for the process to end. Must be safe to drop mid-wait and call
    /// again.
    async fn wait(&mut self) -> StarterResult<ProcessExit>;

    /// Ask the process to shut down gracefully.
    async fn terminate(&mut self) -> StarterResult<()>;
}

/// Starts server processes from a [`LaunchPlan`].
#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    async fn launch(&self, plan: &LaunchPlan) -> StarterResult<Box<dyn ServerProcess>>;
}

/// Spawns real child processes with inherited stdio.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

#[async_trait]
impl ProcessLauncher for SystemLauncher {
    async fn launch(&self, plan: &LaunchPlan) -> StarterResult<Box<dyn ServerProcess>> {
        let mut cmd = Command::new(&plan.program);
        cmd.args(&plan.args)
            .current_dir(&plan.working_dir)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        info!("Launching server with Java: {}", plan.program);
        debug!("Command: {:?}", cmd);

        let child = cmd
            .spawn()
            .map_err(|e| StarterError::Process(format!("cannot start {}: {e}", plan.program)))?;

        Ok(Box::new(ChildProcess { child }))
    }
}

struct ChildProcess {
    child: Child,
}

#[async_trait]
impl ServerProcess for ChildProcess {
    async fn wait(&mut self) -> StarterResult<ProcessExit> {
        let status = self
            .child
            .wait()
            .await
            .map_err(|e| StarterError::Process(format!("failed while waiting for server: {e}")))?;
        Ok(ProcessExit {
            code: status.code(),
        })
    }

    async fn terminate(&mut self) -> StarterResult<()> {
        let Some(pid) = self.child.id() else {
            // Already reaped.
            return Ok(());
        };
        terminate_pid(&mut self.child, pid).await
    }
}

#[cfg(not(target_os = "windows"))]
async fn terminate_pid(_child: &mut Child, pid: u32) -> StarterResult<()> {
    let status = Command::new("kill")
        .args(["-15", &pid.to_string()])
        .status()
        .await
        .map_err(|e| StarterError::Process(format!("cannot send SIGTERM to {pid}: {e}")))?;

    if !status.success() {
        return Err(StarterError::Process(format!(
            "kill -15 {pid} returned code {:?}",
            status.code()
        )));
    }
    Ok(())
}

#[cfg(target_os = "windows")]
async fn terminate_pid(child: &mut Child, pid: u32) -> StarterResult<()> {
    child
        .start_kill()
        .map_err(|e| StarterError::Process(format!("cannot stop process {pid}: {e}")))
}
