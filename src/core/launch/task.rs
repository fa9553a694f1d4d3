// ─── Launch Task ───
// Builds the server command line from the launch config and the installed
// versions. Spawning happens in `process`.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::core::config::LaunchConfig;
use crate::core::error::{StarterError, StarterResult};
use crate::core::state::InstallState;

use super::template::{substitute, Versions};

const DEFAULT_JAVA: &str = "java";

/// Fully resolved server command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchPlan {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

impl LaunchPlan {
    /// Shell-escaped form of the command, for logs.
    pub fn command_line(&self) -> String {
        format_command_for_logs(&self.program, &self.args)
    }
}

/// Assemble the command that starts the server.
///
/// The start file is the `start_file` template filled with the installed
/// versions. With `spongefix` set no start file is appended and `java_args`
/// must carry the full `-jar` invocation.
pub fn build_launch_plan(
    launch: &LaunchConfig,
    state: &InstallState,
    base_path: &Path,
) -> StarterResult<LaunchPlan> {
    let working_dir = absolute(base_path)?;

    let program = if launch.forced_java_path.trim().is_empty() {
        DEFAULT_JAVA.to_string()
    } else {
        launch.forced_java_path.clone()
    };

    // ── JVM Arguments ──
    let mut args: Vec<String> = launch
        .java_args
        .iter()
        .filter(|arg| !arg.trim().is_empty())
        .cloned()
        .collect();

    let max_ram = launch.max_ram.trim();
    if !max_ram.is_empty() && !args.iter().any(|arg| arg.starts_with("-Xmx")) {
        args.push(format!("-Xmx{}", max_ram));
    }

    // ── Start File ──
    if launch.spongefix {
        info!("Sponge fix enabled, launching with java_args only");
    } else {
        let start_file = substitute(
            &launch.start_file,
            Versions {
                mc_version: &state.runtime_version,
                loader_version: &state.loader_version,
            },
        );
        if start_file.trim().is_empty() {
            return Err(StarterError::Config(
                "launch.start_file is empty, nothing to launch".into(),
            ));
        }

        let start_path = working_dir.join(&start_file);
        if !start_path.exists() {
            debug!("Start file {:?} does not exist yet", start_path);
        }
        args.push("-jar".to_string());
        args.push(start_path.to_string_lossy().to_string());
    }

    let plan = LaunchPlan {
        program,
        args,
        working_dir,
    };
    debug!("Command (copy/paste): {}", plan.command_line());
    Ok(plan)
}

fn absolute(path: &Path) -> StarterResult<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|e| StarterError::io(path, e))?;
    Ok(cwd.join(path))
}

fn format_command_for_logs(program: &str, args: &[String]) -> String {
    let program = shell_escape(program);
    let args = args
        .iter()
        .map(|arg| shell_escape(arg))
        .collect::<Vec<_>>()
        .join(" ");

    if args.is_empty() {
        program
    } else {
        format!("{} {}", program, args)
    }
}

fn shell_escape(raw: &str) -> String {
    if raw.is_empty() {
        return "\"\"".to_string();
    }

    if raw.chars().all(|ch| {
        ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.' | '/' | ':' | '\\' | '=')
    }) {
        return raw.to_string();
    }

    format!("\"{}\"", raw.replace('"', "\\\""))
}
