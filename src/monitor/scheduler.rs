//! Per-machine refresh loop and the state it feeds.
//!
//! Selecting a machine spawns one task that fetches immediately, then again
//! every interval. Results travel back to the UI thread as [`MonitorEvent`]s
//! tagged with a generation number; [`MonitorState`] drops any event whose
//! generation is not the current one, so a response for an abandoned
//! selection can never land on the machine now on screen.
//!
//! The task only ever has one fetch outstanding. It stops when its
//! [`MonitorHandle`] is stopped or dropped, whichever comes first.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::alerts::AlertDetector;
use crate::error::{FetchError, MonitorError};
use crate::models::{AlertReport, Reading};

use super::ReadingSource;

// ── Events ───────────────────────────────────────────────────────

/// What one refresh cycle produced.
#[derive(Debug)]
pub enum CycleOutcome {
    /// A fetch was issued.
    Started,
    /// The fetch succeeded; `report` is the alert pass over that reading.
    Fetched {
        reading: Reading,
        report: Result<AlertReport, MonitorError>,
    },
    Failed(FetchError),
}

#[derive(Debug)]
pub struct MonitorEvent {
    pub generation: u64,
    pub entity: String,
    pub outcome: CycleOutcome,
}

enum Command {
    RefreshNow,
    Stop,
}

// ── Scheduler ────────────────────────────────────────────────────

/// Spawns refresh loops. Holds everything a loop needs except the machine id.
pub struct RefreshScheduler<S: ReadingSource> {
    source: Arc<S>,
    detector: AlertDetector,
    interval: Duration,
    recent_count: usize,
    events: mpsc::UnboundedSender<MonitorEvent>,
}

impl<S: ReadingSource> RefreshScheduler<S> {
    /// Returns the scheduler and the receiving end the UI drains each frame.
    pub fn new(
        source: Arc<S>,
        detector: AlertDetector,
        interval: Duration,
        recent_count: usize,
    ) -> (Self, mpsc::UnboundedReceiver<MonitorEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            source,
            detector,
            interval,
            recent_count,
            events,
        };
        (scheduler, rx)
    }

    /// Start monitoring `entity`. Must be called inside a tokio runtime.
    pub fn start(&self, entity: &str, generation: u64) -> MonitorHandle {
        let (commands, command_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run_loop(
            Arc::clone(&self.source),
            self.detector.clone(),
            entity.to_string(),
            self.recent_count,
            self.interval,
            generation,
            self.events.clone(),
            command_rx,
        ));
        info!(entity, generation, interval_secs = self.interval.as_secs(), "monitoring started");
        MonitorHandle { commands, task }
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_loop<S: ReadingSource>(
    source: Arc<S>,
    detector: AlertDetector,
    entity: String,
    recent_count: usize,
    interval: Duration,
    generation: u64,
    events: mpsc::UnboundedSender<MonitorEvent>,
    mut commands: mpsc::UnboundedReceiver<Command>,
) {
    let send = |outcome: CycleOutcome| {
        events
            .send(MonitorEvent {
                generation,
                entity: entity.clone(),
                outcome,
            })
            .is_ok()
    };

    loop {
        if !send(CycleOutcome::Started) {
            break;
        }

        let fetch = source.fetch_latest_reading(&entity, recent_count);
        tokio::pin!(fetch);

        // A refresh request while a fetch is outstanding is a no-op.
        let result = loop {
            tokio::select! {
                r = &mut fetch => break Some(r),
                cmd = commands.recv() => match cmd {
                    Some(Command::RefreshNow) => {}
                    Some(Command::Stop) | None => break None,
                },
            }
        };
        let Some(result) = result else { break };

        let outcome = match result {
            Ok(reading) => {
                let report = detector.report(&reading);
                if let Err(ref e) = report {
                    warn!(entity = %entity, "alert pass aborted: {}", e);
                }
                CycleOutcome::Fetched { reading, report }
            }
            Err(e) => {
                warn!(entity = %entity, "fetch failed: {}", e);
                CycleOutcome::Failed(e)
            }
        };
        if !send(outcome) {
            break;
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            cmd = commands.recv() => match cmd {
                Some(Command::RefreshNow) => debug!(entity = %entity, "manual refresh"),
                Some(Command::Stop) | None => break,
            },
        }
    }

    debug!(entity = %entity, generation, "refresh loop exited");
}

// ── Handle ───────────────────────────────────────────────────────

/// Owning handle for one refresh loop. Dropping it stops the loop.
pub struct MonitorHandle {
    commands: mpsc::UnboundedSender<Command>,
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Skip the remaining wait and fetch now.
    pub fn refresh_now(&self) {
        let _ = self.commands.send(Command::RefreshNow);
    }

    /// Stop the loop. Any fetch still in flight is abandoned.
    pub fn stop(self) {
        drop(self);
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Stop);
        self.task.abort();
    }
}

// ── State ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No machine selected.
    Idle,
    Loading,
    Ready,
    /// Last fetch failed; previous data is still shown.
    Error,
}

/// What the Monitor tab shows for the selected machine.
pub struct MonitorState {
    phase: Phase,
    entity: Option<String>,
    generation: u64,
    handle: Option<MonitorHandle>,
    reading: Option<Reading>,
    report: Option<AlertReport>,
    /// Transient notice for the last failure, cleared on success.
    last_error: Option<String>,
    /// The backend has no rows for this machine yet.
    no_data: bool,
    last_updated: Option<Instant>,
}

impl Default for MonitorState {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorState {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            entity: None,
            generation: 0,
            handle: None,
            reading: None,
            report: None,
            last_error: None,
            no_data: false,
            last_updated: None,
        }
    }

    /// Switch monitoring to `entity`. The previous loop is stopped and its
    /// outstanding results are invalidated.
    pub fn select<S: ReadingSource>(&mut self, scheduler: &RefreshScheduler<S>, entity: &str) {
        self.stop_current();
        if self.entity.as_deref() != Some(entity) {
            self.reading = None;
            self.report = None;
            self.last_updated = None;
        }
        self.generation += 1;
        self.entity = Some(entity.to_string());
        self.phase = Phase::Loading;
        self.last_error = None;
        self.no_data = false;
        self.handle = Some(scheduler.start(entity, self.generation));
    }

    /// Stop monitoring and return to `Idle`.
    pub fn deselect(&mut self) {
        self.stop_current();
        self.generation += 1;
        self.entity = None;
        self.phase = Phase::Idle;
        self.reading = None;
        self.report = None;
        self.last_error = None;
        self.no_data = false;
        self.last_updated = None;
    }

    fn stop_current(&mut self) {
        if let Some(handle) = self.handle.take() {
            if let Some(entity) = &self.entity {
                info!(entity = %entity, generation = self.generation, "monitoring stopped");
            }
            handle.stop();
        }
    }

    pub fn refresh_now(&self) {
        if let Some(handle) = &self.handle {
            handle.refresh_now();
        }
    }

    /// Apply one event. Returns `false` if it was stale and ignored.
    pub fn apply(&mut self, event: MonitorEvent) -> bool {
        if event.generation != self.generation || self.entity.as_deref() != Some(&event.entity) {
            debug!(
                entity = %event.entity,
                generation = event.generation,
                current = self.generation,
                "discarding stale monitor event"
            );
            return false;
        }

        match event.outcome {
            CycleOutcome::Started => {
                self.phase = Phase::Loading;
            }
            CycleOutcome::Fetched { reading, report } => {
                self.last_error = match report {
                    Ok(report) => {
                        self.report = Some(report);
                        None
                    }
                    // previous cycle's alerts stay up
                    Err(e) => Some(e.to_string()),
                };
                self.reading = Some(reading);
                self.no_data = false;
                self.phase = Phase::Ready;
                self.last_updated = Some(Instant::now());
            }
            // the backend has nothing for this machine any more
            CycleOutcome::Failed(FetchError::NotFound(_)) => {
                self.no_data = true;
                self.reading = None;
                self.report = None;
                self.last_error = None;
                self.last_updated = None;
                self.phase = Phase::Error;
            }
            CycleOutcome::Failed(e) => {
                self.last_error = Some(e.to_string());
                self.phase = Phase::Error;
            }
        }
        true
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn entity(&self) -> Option<&str> {
        self.entity.as_deref()
    }

    pub fn reading(&self) -> Option<&Reading> {
        self.reading.as_ref()
    }

    pub fn report(&self) -> Option<&AlertReport> {
        self.report.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn no_data(&self) -> bool {
        self.no_data
    }

    pub fn last_updated(&self) -> Option<Instant> {
        self.last_updated
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChannelRegistry, Severity};
    use std::collections::VecDeque;
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Scripted source: pops one result per fetch, then repeats `fallback`.
    struct FakeSource {
        calls: AtomicUsize,
        delay: Duration,
        script: Mutex<VecDeque<Result<f64, FetchError>>>,
        fallback: f64,
    }

    impl FakeSource {
        fn new(delay: Duration, script: Vec<Result<f64, FetchError>>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay,
                script: Mutex::new(script.into()),
                fallback: 300.0,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ReadingSource for FakeSource {
        fn fetch_entity_list(&self) -> impl Future<Output = Result<Vec<String>, FetchError>> + Send {
            async { Ok(vec!["Feed Mill 1".to_string(), "Feed Mill 2".to_string()]) }
        }

        fn fetch_latest_reading(
            &self,
            entity: &str,
            _recent_count: usize,
        ) -> impl Future<Output = Result<Reading, FetchError>> + Send {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(self.fallback));
            let entity = entity.to_string();
            let delay = self.delay;
            async move {
                tokio::time::sleep(delay).await;
                next.map(|v| Reading::new(&entity, "2025-10-01T08:00:00").with("CurrentMotor", v))
            }
        }
    }

    fn scheduler(
        source: Arc<FakeSource>,
        interval_secs: u64,
    ) -> (RefreshScheduler<FakeSource>, mpsc::UnboundedReceiver<MonitorEvent>) {
        let detector = AlertDetector::new(Arc::new(ChannelRegistry::feed_mill()));
        RefreshScheduler::new(source, detector, Duration::from_secs(interval_secs), 10)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<MonitorEvent>, state: &mut MonitorState) -> (usize, usize) {
        let (mut applied, mut stale) = (0, 0);
        while let Ok(ev) = rx.try_recv() {
            if state.apply(ev) {
                applied += 1;
            } else {
                stale += 1;
            }
        }
        (applied, stale)
    }

    async fn settle(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    fn current_motor(state: &MonitorState) -> Option<f64> {
        state.reading().and_then(|r| r.get("CurrentMotor"))
    }

    // ── Cycle timing ─────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn fetches_immediately_then_every_interval() {
        let source = FakeSource::new(Duration::ZERO, vec![]);
        let (sched, mut rx) = scheduler(source.clone(), 5);
        let mut state = MonitorState::new();
        assert_eq!(state.phase(), Phase::Idle);

        state.select(&sched, "Feed Mill 1");
        assert_eq!(state.phase(), Phase::Loading);
        settle(1).await;
        assert_eq!(source.calls(), 1);
        drain(&mut rx, &mut state);
        assert_eq!(state.phase(), Phase::Ready);
        assert_eq!(current_motor(&state), Some(300.0));

        settle(5_000).await;
        assert_eq!(source.calls(), 2);
        settle(5_000).await;
        assert_eq!(source.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_now_skips_the_wait() {
        let source = FakeSource::new(Duration::ZERO, vec![]);
        let (sched, mut rx) = scheduler(source.clone(), 30);
        let mut state = MonitorState::new();
        state.select(&sched, "Feed Mill 1");
        settle(1).await;
        assert_eq!(source.calls(), 1);

        state.refresh_now();
        settle(1).await;
        assert_eq!(source.calls(), 2);
        drain(&mut rx, &mut state);
        assert_eq!(state.phase(), Phase::Ready);
    }

    #[tokio::test(start_paused = true)]
    async fn only_one_fetch_in_flight() {
        let source = FakeSource::new(Duration::from_secs(3), vec![]);
        let (sched, _rx) = scheduler(source.clone(), 1);
        let mut state = MonitorState::new();
        state.select(&sched, "Feed Mill 1");
        settle(500).await;
        state.refresh_now();
        state.refresh_now();
        settle(1_000).await;
        assert_eq!(source.calls(), 1);
    }

    // ── Failure handling ─────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn failure_keeps_previous_data_and_retries() {
        let source = FakeSource::new(
            Duration::ZERO,
            vec![Ok(300.0), Err(FetchError::Network("connection refused".into())), Ok(305.0)],
        );
        let (sched, mut rx) = scheduler(source.clone(), 5);
        let mut state = MonitorState::new();
        state.select(&sched, "Feed Mill 1");

        settle(1).await;
        drain(&mut rx, &mut state);
        assert_eq!(current_motor(&state), Some(300.0));

        settle(5_000).await;
        drain(&mut rx, &mut state);
        assert_eq!(state.phase(), Phase::Error);
        assert_eq!(current_motor(&state), Some(300.0));
        assert!(state.last_error().unwrap().contains("connection refused"));

        settle(5_000).await;
        drain(&mut rx, &mut state);
        assert_eq!(state.phase(), Phase::Ready);
        assert_eq!(current_motor(&state), Some(305.0));
        assert!(state.last_error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_is_no_data_not_all_normal() {
        let source = FakeSource::new(
            Duration::ZERO,
            vec![Err(FetchError::NotFound("Feed Mill 4".into()))],
        );
        let (sched, mut rx) = scheduler(source, 5);
        let mut state = MonitorState::new();
        state.select(&sched, "Feed Mill 4");
        settle(1).await;
        drain(&mut rx, &mut state);
        assert!(state.no_data());
        assert!(state.report().is_none());
        assert!(state.reading().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn not_found_after_data_replaces_old_reading_and_error() {
        let source = FakeSource::new(
            Duration::ZERO,
            vec![
                Ok(300.0),
                Err(FetchError::Network("connection reset".into())),
                Err(FetchError::NotFound("Feed Mill 1".into())),
            ],
        );
        let (sched, mut rx) = scheduler(source, 5);
        let mut state = MonitorState::new();
        state.select(&sched, "Feed Mill 1");
        settle(1).await;
        drain(&mut rx, &mut state);
        assert_eq!(current_motor(&state), Some(300.0));

        settle(5_000).await;
        drain(&mut rx, &mut state);
        assert!(state.last_error().is_some());

        settle(5_000).await;
        drain(&mut rx, &mut state);
        assert!(state.no_data());
        assert!(state.last_error().is_none());
        assert!(state.reading().is_none());
        assert!(state.report().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn alert_pass_error_keeps_previous_alerts() {
        let source = FakeSource::new(Duration::ZERO, vec![Ok(230.0), Ok(f64::NAN)]);
        let (sched, mut rx) = scheduler(source, 5);
        let mut state = MonitorState::new();
        state.select(&sched, "Feed Mill 1");

        settle(1).await;
        drain(&mut rx, &mut state);
        assert_eq!(state.report().unwrap().overall, Severity::Danger);

        settle(5_000).await;
        drain(&mut rx, &mut state);
        let report = state.report().unwrap();
        assert_eq!(report.alerts.len(), 1);
        assert!(report.alerts[0].message.contains("230"));
        assert!(state.last_error().unwrap().contains("CurrentMotor"));
    }

    // ── Stale responses and teardown ─────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn switching_machines_discards_stale_results() {
        let source = FakeSource::new(Duration::from_secs(3), vec![Ok(250.0), Ok(310.0)]);
        let (sched, mut rx) = scheduler(source.clone(), 5);
        let mut state = MonitorState::new();

        state.select(&sched, "Feed Mill 1");
        settle(1_000).await;
        // Feed Mill 1 is still fetching; switch away
        state.select(&sched, "Feed Mill 2");
        settle(10_000).await;

        let (applied, stale) = drain(&mut rx, &mut state);
        assert!(applied > 0);
        assert_eq!(stale, 1); // the Started event queued for Feed Mill 1
        assert_eq!(state.entity(), Some("Feed Mill 2"));
        assert_eq!(state.reading().unwrap().entity, "Feed Mill 2");
        assert_eq!(current_motor(&state), Some(310.0));
    }

    #[tokio::test(start_paused = true)]
    async fn late_event_from_previous_generation_is_ignored() {
        let source = FakeSource::new(Duration::ZERO, vec![]);
        let (sched, _rx) = scheduler(source, 5);
        let mut state = MonitorState::new();
        state.select(&sched, "Feed Mill 1");
        state.select(&sched, "Feed Mill 1");

        let stale = MonitorEvent {
            generation: 1,
            entity: "Feed Mill 1".into(),
            outcome: CycleOutcome::Fetched {
                reading: Reading::new("Feed Mill 1", "old").with("CurrentMotor", 999.0),
                report: Ok(AlertReport::from_alerts(vec![])),
            },
        };
        assert!(!state.apply(stale));
        assert!(state.reading().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn deselect_mid_fetch_stops_everything() {
        let source = FakeSource::new(Duration::from_secs(3), vec![]);
        let (sched, mut rx) = scheduler(source.clone(), 5);
        let mut state = MonitorState::new();
        state.select(&sched, "Feed Mill 1");
        settle(1_000).await;

        state.deselect();
        settle(60_000).await;

        assert_eq!(source.calls(), 1);
        let (applied, _) = drain(&mut rx, &mut state);
        assert_eq!(applied, 0);
        assert_eq!(state.phase(), Phase::Idle);
        assert!(state.reading().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_state_tears_down_loop() {
        let source = FakeSource::new(Duration::from_secs(3), vec![]);
        let (sched, mut rx) = scheduler(source.clone(), 5);
        let mut state = MonitorState::new();
        state.select(&sched, "Feed Mill 1");
        settle(1_000).await;
        drop(state);
        settle(60_000).await;

        assert_eq!(source.calls(), 1);
        let mut fetched = 0;
        while let Ok(ev) = rx.try_recv() {
            if matches!(ev.outcome, CycleOutcome::Fetched { .. }) {
                fetched += 1;
            }
        }
        assert_eq!(fetched, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn handle_stop_finishes_task() {
        let source = FakeSource::new(Duration::ZERO, vec![]);
        let (sched, _rx) = scheduler(source.clone(), 5);
        let handle = sched.start("Feed Mill 1", 1);
        settle(1).await;
        assert!(!handle.is_finished());
        handle.stop();
        settle(20_000).await;
        assert_eq!(source.calls(), 1);
    }
}
