pub mod process;
pub mod restart;
pub mod signals;
pub mod supervisor;
pub mod task;
pub mod template;

pub use process::{ProcessExit, ProcessLauncher, ServerProcess, SystemLauncher};
pub use restart::{RestartDecision, RestartHistory};
pub use signals::{listen_for_shutdown, ShutdownSignal, ShutdownTrigger};
pub use supervisor::{Supervisor, SupervisorExit};
pub use task::{build_launch_plan, LaunchPlan};
pub use template::{substitute, Versions};
