use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};

use crate::app::AppSnapshot;
use crate::errors::WaitError;
use crate::logger::EventLogger;
use crate::metrics::wait_finished;
use crate::store::SnapshotSource;

/// Floor of the tick period, keeps a zero timeout from arming a zero-period timer
pub const MIN_TICK_PERIOD: Duration = Duration::from_millis(1);

pub const PROGRESS_STEP: &str = "appruntime";
pub const PROGRESS_STATUS: &str = "running";

/// How a wait reacts to a tick on which the condition still does not hold
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PollMode {
    /// Keep re-checking on every tick until the condition holds, the deadline passes or the wait is cancelled
    Converge,
    /// Re-check once on the first tick, then report success whether or not the condition holds.
    /// Callers get no guarantee of convergence in this mode.
    SingleCheck,
}

impl Default for PollMode {
    fn default() -> Self {
        PollMode::Converge
    }
}

impl FromStr for PollMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "converge" => Ok(PollMode::Converge),
            "single_check" => Ok(PollMode::SingleCheck),
            other => Err(format!("unknown poll mode '{}'", other)),
        }
    }
}

/// Condition a wait blocks on
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WaitTarget {
    Ready,
    Stopped,
    Upgraded,
}

impl WaitTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            WaitTarget::Ready => "ready",
            WaitTarget::Stopped => "stopped",
            WaitTarget::Upgraded => "upgraded",
        }
    }

    /// Whether the condition holds for the given snapshot.
    ///
    /// An absent snapshot is never ready, but counts as stopped and as upgraded.
    pub fn is_satisfied(&self, snapshot: Option<&AppSnapshot>) -> bool {
        match self {
            WaitTarget::Ready => snapshot.map_or(false, AppSnapshot::is_ready),
            WaitTarget::Stopped => snapshot.map_or(true, AppSnapshot::is_closed),
            WaitTarget::Upgraded => snapshot.map_or(true, AppSnapshot::is_upgrade_complete),
        }
    }
}

impl fmt::Display for WaitTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WaitTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ready" => Ok(WaitTarget::Ready),
            "stopped" => Ok(WaitTarget::Stopped),
            "upgraded" => Ok(WaitTarget::Upgraded),
            other => Err(format!("unknown wait target '{}'", other)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outcome {
    Satisfied,
    Released,
}

impl Outcome {
    fn as_str(&self) -> &'static str {
        match self {
            Outcome::Satisfied => "satisfied",
            Outcome::Released => "released",
        }
    }
}

fn error_outcome(err: &WaitError) -> &'static str {
    match err {
        WaitError::TimedOut => "timed_out",
        WaitError::Cancelled => "cancelled",
    }
}

/// Interval between re-checks for a given timeout
pub fn tick_period(timeout: Duration) -> Duration {
    (timeout / 10).max(MIN_TICK_PERIOD)
}

/// Resolves once the caller asked to cancel: the value turned `true` or the sender went away
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow_and_update() {
            return;
        }
        if cancel.changed().await.is_err() {
            return;
        }
    }
}

fn log_progress(snapshot: Option<&AppSnapshot>, logger: &dyn EventLogger) {
    let (count, ready) = snapshot.map_or((0, 0), |snapshot| (snapshot.pod_count(), snapshot.ready_replicas()));
    let message = format!(
        "current instance(count:{} ready:{} notready:{})",
        count,
        ready,
        count.saturating_sub(ready)
    );
    let mut fields = BTreeMap::new();
    fields.insert("step", PROGRESS_STEP);
    fields.insert("status", PROGRESS_STATUS);
    logger.info(&message, &fields);
}

/// Blocks start, stop and upgrade operations until the cluster converges.
///
/// Every wait first checks its condition and returns at once if it already holds.
/// Otherwise it re-reads the snapshot source on a tick of `timeout / 10` until one of
/// cancellation, the deadline or a satisfied tick ends it. When several of them are
/// ready at the same time they win in that order. Each unsatisfied tick logs a
/// progress record. Timers live on the caller's task and are dropped on return.
#[derive(Clone, Copy, Debug, Default)]
pub struct WaitCoordinator {
    mode: PollMode,
}

impl WaitCoordinator {
    pub fn new(mode: PollMode) -> Self {
        WaitCoordinator { mode }
    }

    pub fn mode(&self) -> PollMode {
        self.mode
    }

    /// Wait until the workload's ready replicas reach the desired count.
    ///
    /// Expects a known service: an absent snapshot is treated as not ready, so the wait
    /// only ends by deadline or cancellation.
    pub async fn wait_ready<S: SnapshotSource + ?Sized>(
        &self,
        source: &S,
        timeout: Duration,
        logger: &dyn EventLogger,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<(), WaitError> {
        self.wait_for(WaitTarget::Ready, source, timeout, logger, cancel).await
    }

    /// Wait until the workload controller and all pods are gone. An absent snapshot succeeds at once.
    pub async fn wait_stopped<S: SnapshotSource + ?Sized>(
        &self,
        source: &S,
        timeout: Duration,
        logger: &dyn EventLogger,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<(), WaitError> {
        self.wait_for(WaitTarget::Stopped, source, timeout, logger, cancel).await
    }

    /// Wait until every pod runs the deploy version and the workload is ready.
    /// An absent snapshot succeeds at once.
    pub async fn wait_upgraded<S: SnapshotSource + ?Sized>(
        &self,
        source: &S,
        timeout: Duration,
        logger: &dyn EventLogger,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<(), WaitError> {
        self.wait_for(WaitTarget::Upgraded, source, timeout, logger, cancel).await
    }

    pub async fn wait_for<S: SnapshotSource + ?Sized>(
        &self,
        target: WaitTarget,
        source: &S,
        timeout: Duration,
        logger: &dyn EventLogger,
        cancel: &mut watch::Receiver<bool>,
    ) -> Result<(), WaitError> {
        if target.is_satisfied(source.load().as_deref()) {
            wait_finished(target.as_str(), Outcome::Satisfied.as_str());
            return Ok(());
        }

        let period = tick_period(timeout);
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let deadline = sleep(timeout);
        tokio::pin!(deadline);

        let result = loop {
            tokio::select! {
                biased;
                _ = cancelled(cancel) => break Err(WaitError::Cancelled),
                _ = &mut deadline => break Err(WaitError::TimedOut),
                _ = ticker.tick() => {
                    let snapshot = source.load();
                    if target.is_satisfied(snapshot.as_deref()) {
                        break Ok(Outcome::Satisfied);
                    }
                    log_progress(snapshot.as_deref(), logger);
                    if self.mode == PollMode::SingleCheck {
                        break Ok(Outcome::Released);
                    }
                }
            }
        };

        match result {
            Ok(outcome) => {
                debug!("Wait {} finished: {}", target, outcome.as_str());
                wait_finished(target.as_str(), outcome.as_str());
                Ok(())
            }
            Err(err) => {
                debug!("Wait {} failed: {}", target, err);
                wait_finished(target.as_str(), error_outcome(&err));
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_period() {
        assert_eq!(tick_period(Duration::from_secs(10)), Duration::from_secs(1));
        assert_eq!(tick_period(Duration::from_millis(5)), MIN_TICK_PERIOD);
        assert_eq!(tick_period(Duration::from_secs(0)), MIN_TICK_PERIOD);
    }

    #[test]
    fn test_absent_snapshot_targets() {
        assert!(!WaitTarget::Ready.is_satisfied(None));
        assert!(WaitTarget::Stopped.is_satisfied(None));
        assert!(WaitTarget::Upgraded.is_satisfied(None));
    }

    #[test]
    fn test_parse_mode_and_target() {
        assert_eq!("single_check".parse::<PollMode>(), Ok(PollMode::SingleCheck));
        assert_eq!("converge".parse::<PollMode>(), Ok(PollMode::Converge));
        assert!("loop".parse::<PollMode>().is_err());
        assert_eq!("upgraded".parse::<WaitTarget>(), Ok(WaitTarget::Upgraded));
        assert!("running".parse::<WaitTarget>().is_err());
    }

    #[test]
    fn test_cancelled_when_sender_dropped() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);
        tokio_test::block_on(cancelled(&mut rx));
    }
}
