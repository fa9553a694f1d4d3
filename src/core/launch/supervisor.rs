// ─── Process Supervisor ───
// Runs the server, restarts it after it exits, and gives up when it keeps
// crashing inside the configured window.

use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::core::error::{StarterError, StarterResult};

use super::process::{ProcessExit, ProcessLauncher};
use super::restart::{RestartDecision, RestartHistory};
use super::signals::ShutdownSignal;
use super::task::LaunchPlan;

pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(10);
pub const DEFAULT_RESTART_DELAY: Duration = Duration::from_secs(10);

/// Why the supervisor returned without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorExit {
    /// The server exited and auto restart is off.
    Finished(ProcessExit),
    /// A shutdown signal was received.
    ShutdownRequested,
}

enum RunOutcome {
    Exited(ProcessExit),
    Failed(StarterError),
    Signaled,
}

pub struct Supervisor<'a> {
    plan: LaunchPlan,
    launcher: &'a dyn ProcessLauncher,
    auto_restart: bool,
    history: RestartHistory,
    grace_period: Duration,
    restart_delay: Duration,
}

impl<'a> Supervisor<'a> {
    pub fn new(
        plan: LaunchPlan,
        launcher: &'a dyn ProcessLauncher,
        auto_restart: bool,
        crash_limit: usize,
        crash_window: Duration,
    ) -> Self {
        Self {
            plan,
            launcher,
            auto_restart,
            history: RestartHistory::new(crash_limit, crash_window),
            grace_period: DEFAULT_GRACE_PERIOD,
            restart_delay: DEFAULT_RESTART_DELAY,
        }
    }

    pub fn with_timing(mut self, grace_period: Duration, restart_delay: Duration) -> Self {
        self.grace_period = grace_period;
        self.restart_delay = restart_delay;
        self
    }

    /// Keep the server running until it exits for good.
    ///
    /// Returns `CrashLimit` when more than `crash_limit` runs started inside
    /// the crash window. A failed spawn counts as a crash.
    pub async fn run(&mut self, mut shutdown: ShutdownSignal) -> StarterResult<SupervisorExit> {
        let mut attempt: usize = 0;

        loop {
            if shutdown.is_triggered() {
                return Ok(SupervisorExit::ShutdownRequested);
            }

            attempt += 1;
            info!("Starting server (try {})", attempt);
            let started = Instant::now();

            let exit = match self.run_once(&mut shutdown).await {
                RunOutcome::Signaled => return Ok(SupervisorExit::ShutdownRequested),
                RunOutcome::Exited(exit) => {
                    if exit.success() {
                        info!("Server stopped (code 0)");
                    } else {
                        warn!("Server exited with code {:?}", exit.code);
                    }
                    Some(exit)
                }
                RunOutcome::Failed(e) => {
                    error!("Server could not be run: {}", e);
                    None
                }
            };

            if !self.auto_restart {
                return match exit {
                    Some(exit) => Ok(SupervisorExit::Finished(exit)),
                    None => Err(StarterError::Process(
                        "server failed to start and auto restart is disabled".into(),
                    )),
                };
            }

            let window = format_window(self.history.window());
            match self.history.record(started, Instant::now()) {
                RestartDecision::Stop { recent } => {
                    error!(
                        "Server crashed {} times in the last {}, not restarting",
                        recent, window
                    );
                    return Err(StarterError::CrashLimit {
                        count: recent,
                        window,
                    });
                }
                RestartDecision::Restart { recent } => {
                    warn!("Server stopped {} times in the last {}", recent, window);
                }
            }

            info!(
                "Restarting in {} seconds, press Ctrl+C to cancel",
                self.restart_delay.as_secs()
            );
            tokio::select! {
                _ = tokio::time::sleep(self.restart_delay) => {}
                _ = shutdown.triggered() => {
                    info!("Restart cancelled");
                    return Ok(SupervisorExit::ShutdownRequested);
                }
            }
        }
    }

    async fn run_once(&self, shutdown: &mut ShutdownSignal) -> RunOutcome {
        let mut process = match self.launcher.launch(&self.plan).await {
            Ok(process) => process,
            Err(e) => return RunOutcome::Failed(e),
        };

        let finished = tokio::select! {
            result = process.wait() => Some(result),
            _ = shutdown.triggered() => None,
        };

        match finished {
            Some(Ok(exit)) => return RunOutcome::Exited(exit),
            Some(Err(e)) => return RunOutcome::Failed(e),
            None => {}
        }

        info!(
            "Stopping server, waiting up to {}s for it to exit",
            self.grace_period.as_secs()
        );
        if let Err(e) = process.terminate().await {
            warn!("Cannot forward shutdown to server: {}", e);
        }

        match tokio::time::timeout(self.grace_period, process.wait()).await {
            Ok(Ok(exit)) => info!("Server stopped (code {:?})", exit.code),
            Ok(Err(e)) => warn!("Lost track of server while stopping: {}", e),
            Err(_) => warn!(
                "Server did not stop within {}s, leaving it behind",
                self.grace_period.as_secs()
            ),
        }

        RunOutcome::Signaled
    }
}

fn format_window(window: Duration) -> String {
    let secs = window.as_secs();
    if secs >= 3600 && secs % 3600 == 0 {
        format!("{}h", secs / 3600)
    } else if secs >= 60 && secs % 60 == 0 {
        format!("{}m", secs / 60)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", window.as_millis())
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::core::launch::process::ServerProcess;

    #[derive(Clone, Copy)]
    enum Behavior {
        /// Exit by itself with this code.
        Exit(i32),
        /// Run until terminated.
        Serve,
        /// Ignore terminate requests.
        Stubborn,
        /// Fail to spawn.
        Broken,
    }

    struct FakeProcess {
        behavior: Behavior,
        terminations: Arc<AtomicUsize>,
        stop: Arc<Notify>,
    }

    #[async_trait]
    impl ServerProcess for FakeProcess {
        async fn wait(&mut self) -> StarterResult<ProcessExit> {
            match self.behavior {
                Behavior::Exit(code) => Ok(ProcessExit { code: Some(code) }),
                Behavior::Serve => {
                    self.stop.notified().await;
                    Ok(ProcessExit { code: Some(143) })
                }
                _ => std::future::pending().await,
            }
        }

        async fn terminate(&mut self) -> StarterResult<()> {
            self.terminations.fetch_add(1, Ordering::SeqCst);
            self.stop.notify_one();
            Ok(())
        }
    }

    struct FakeLauncher {
        behavior: Behavior,
        launches: AtomicUsize,
        terminations: Arc<AtomicUsize>,
    }

    impl FakeLauncher {
        fn new(behavior: Behavior) -> Self {
            Self {
                behavior,
                launches: AtomicUsize::new(0),
                terminations: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn launches(&self) -> usize {
            self.launches.load(Ordering::SeqCst)
        }

        fn terminations(&self) -> usize {
            self.terminations.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ProcessLauncher for FakeLauncher {
        async fn launch(&self, _plan: &LaunchPlan) -> StarterResult<Box<dyn ServerProcess>> {
            self.launches.fetch_add(1, Ordering::SeqCst);
            if let Behavior::Broken = self.behavior {
                return Err(StarterError::Process("no java".into()));
            }
            Ok(Box::new(FakeProcess {
                behavior: self.behavior,
                terminations: self.terminations.clone(),
                stop: Arc::new(Notify::new()),
            }))
        }
    }

    fn plan() -> LaunchPlan {
        LaunchPlan {
            program: "java".into(),
            args: vec!["-jar".into(), "server.jar".into()],
            working_dir: PathBuf::from("/srv"),
        }
    }

    fn supervisor(launcher: &FakeLauncher, auto_restart: bool, limit: usize) -> Supervisor<'_> {
        Supervisor::new(plan(), launcher, auto_restart, limit, Duration::from_secs(60))
            .with_timing(Duration::from_millis(50), Duration::from_millis(1))
    }

    #[tokio::test]
    async fn without_auto_restart_runs_once() {
        let launcher = FakeLauncher::new(Behavior::Exit(1));
        let (_trigger, shutdown) = ShutdownSignal::channel();

        let exit = supervisor(&launcher, false, 10).run(shutdown).await.unwrap();

        assert_eq!(exit, SupervisorExit::Finished(ProcessExit { code: Some(1) }));
        assert_eq!(launcher.launches(), 1);
    }

    #[tokio::test]
    async fn crash_loop_stops_after_limit() {
        let launcher = FakeLauncher::new(Behavior::Exit(1));
        let (_trigger, shutdown) = ShutdownSignal::channel();

        let err = supervisor(&launcher, true, 2).run(shutdown).await.unwrap_err();

        assert!(matches!(err, StarterError::CrashLimit { count: 3, .. }));
        assert_eq!(launcher.launches(), 3);
    }

    #[tokio::test]
    async fn spawn_failures_count_as_crashes() {
        let launcher = FakeLauncher::new(Behavior::Broken);
        let (_trigger, shutdown) = ShutdownSignal::channel();

        let err = supervisor(&launcher, true, 1).run(shutdown).await.unwrap_err();

        assert!(matches!(err, StarterError::CrashLimit { count: 2, .. }));
        assert_eq!(launcher.launches(), 2);
    }

    #[tokio::test]
    async fn signal_is_forwarded_once_and_suppresses_restart() {
        let launcher = FakeLauncher::new(Behavior::Serve);
        let (trigger, shutdown) = ShutdownSignal::channel();

        let run = async { supervisor(&launcher, true, 100).run(shutdown).await };
        let fire = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.trigger();
        };
        let (result, ()) = tokio::join!(run, fire);

        assert_eq!(result.unwrap(), SupervisorExit::ShutdownRequested);
        assert_eq!(launcher.launches(), 1);
        assert_eq!(launcher.terminations(), 1);
    }

    #[tokio::test]
    async fn unresponsive_server_is_abandoned_after_grace_period() {
        let launcher = FakeLauncher::new(Behavior::Stubborn);
        let (trigger, shutdown) = ShutdownSignal::channel();

        let run = async { supervisor(&launcher, true, 100).run(shutdown).await };
        let fire = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.trigger();
        };
        let (result, ()) = tokio::time::timeout(Duration::from_secs(5), async {
            tokio::join!(run, fire)
        })
        .await
        .unwrap();

        assert_eq!(result.unwrap(), SupervisorExit::ShutdownRequested);
        assert_eq!(launcher.terminations(), 1);
    }

    #[tokio::test]
    async fn signal_during_backoff_cancels_restart() {
        let launcher = FakeLauncher::new(Behavior::Exit(1));
        let (trigger, shutdown) = ShutdownSignal::channel();

        let mut supervisor = Supervisor::new(plan(), &launcher, true, 100, Duration::from_secs(60))
            .with_timing(Duration::from_millis(50), Duration::from_secs(30));
        let run = async { supervisor.run(shutdown).await };
        let fire = async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.trigger();
        };
        let (result, ()) = tokio::time::timeout(Duration::from_secs(5), async {
            tokio::join!(run, fire)
        })
        .await
        .unwrap();

        assert_eq!(result.unwrap(), SupervisorExit::ShutdownRequested);
        assert_eq!(launcher.launches(), 1);
        assert_eq!(launcher.terminations(), 0);
    }

    #[test]
    fn window_is_formatted_in_largest_whole_unit() {
        assert_eq!(format_window(Duration::from_secs(3600)), "1h");
        assert_eq!(format_window(Duration::from_secs(600)), "10m");
        assert_eq!(format_window(Duration::from_secs(90)), "90s");
        assert_eq!(format_window(Duration::from_millis(500)), "500ms");
    }
}
