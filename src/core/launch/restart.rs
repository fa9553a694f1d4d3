use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Whether another launch is allowed after a process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartDecision {
    Restart { recent: usize },
    Stop { recent: usize },
}

/// Start times of recent server runs, pruned to a trailing window.
///
/// The server may be restarted while at most `limit` starts fall inside the
/// window; one more than that stops the supervisor.
#[derive(Debug, Clone)]
pub struct RestartHistory {
    starts: VecDeque<Instant>,
    limit: usize,
    window: Duration,
}

impl RestartHistory {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            starts: VecDeque::new(),
            limit,
            window,
        }
    }

    /// Record a finished run that started at `started` and decide, as of
    /// `now`, whether to launch again.
    pub fn record(&mut self, started: Instant, now: Instant) -> RestartDecision {
        self.starts.push_back(started);
        self.prune(now);

        let recent = self.starts.len();
        if recent > self.limit {
            RestartDecision::Stop { recent }
        } else {
            RestartDecision::Restart { recent }
        }
    }

    pub fn recent(&self) -> usize {
        self.starts.len()
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    fn prune(&mut self, now: Instant) {
        let window = self.window;
        self.starts
            .retain(|start| now.saturating_duration_since(*start) < window);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(base: Instant, secs: u64) -> Instant {
        base + Duration::from_secs(secs)
    }

    #[test]
    fn old_starts_fall_out_of_the_window() {
        let base = Instant::now();
        let mut history = RestartHistory::new(3, Duration::from_secs(60));

        assert_eq!(
            history.record(at(base, 0), at(base, 0)),
            RestartDecision::Restart { recent: 1 }
        );
        assert_eq!(
            history.record(at(base, 10), at(base, 10)),
            RestartDecision::Restart { recent: 2 }
        );
        assert_eq!(
            history.record(at(base, 20), at(base, 20)),
            RestartDecision::Restart { recent: 3 }
        );
        // t=0 (and t=10, exactly 60s old) are pruned, so the loop goes on.
        assert!(matches!(
            history.record(at(base, 70), at(base, 70)),
            RestartDecision::Restart { .. }
        ));
        assert!(history.recent() <= 3);
    }

    #[test]
    fn too_many_starts_inside_the_window_stop() {
        let base = Instant::now();
        let mut history = RestartHistory::new(3, Duration::from_secs(60));

        for secs in [0, 5, 10] {
            assert!(matches!(
                history.record(at(base, secs), at(base, secs + 1)),
                RestartDecision::Restart { .. }
            ));
        }
        assert_eq!(
            history.record(at(base, 15), at(base, 16)),
            RestartDecision::Stop { recent: 4 }
        );
    }

    #[test]
    fn long_runs_do_not_count_as_crash_loops() {
        let base = Instant::now();
        let mut history = RestartHistory::new(1, Duration::from_secs(60));

        assert!(matches!(
            history.record(at(base, 0), at(base, 3600)),
            RestartDecision::Restart { recent: 0 }
        ));
        assert!(matches!(
            history.record(at(base, 3610), at(base, 7200)),
            RestartDecision::Restart { recent: 0 }
        ));
    }
}
