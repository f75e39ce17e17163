//! Migration Engine
//!
//! Walks the candidate strategies for a request in priority order until one
//! succeeds.
//!
//! # Guarantees
//!
//! 1. Strategies run strictly one after another, never concurrently
//! 2. The first successful strategy ends the run; later candidates are never touched
//! 3. Every attempt releases what it provisioned before the next one starts
//! 4. Cancellation is terminal and reported apart from exhaustion

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::context::{AttemptContext, ClusterSet};
use super::strategy::{Applicability, Strategy, StrategyRegistry};
use crate::domain::events::MigrationEvent;
use crate::domain::ports::{EventPublisher, Request};
use crate::error::{Error, FailureKind, Result};

// =============================================================================
// Configuration
// =============================================================================

/// Bounds and pacing shared by every attempt.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long a provisioned pod or service may take to become usable
    pub readiness_timeout: Duration,

    /// How long the transfer itself may run
    pub transfer_timeout: Duration,

    /// Interval between status polls
    pub poll_interval: Duration,

    /// rsync invocations inside the transfer pod before giving up
    pub transfer_retries: u32,

    /// Pause between rsync invocations
    pub retry_delay: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            readiness_timeout: Duration::from_secs(5 * 60),
            transfer_timeout: Duration::from_secs(24 * 60 * 60),
            poll_interval: Duration::from_secs(2),
            transfer_retries: 10,
            retry_delay: Duration::from_secs(5),
        }
    }
}

// =============================================================================
// Attempt Results
// =============================================================================

/// How a single candidate ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Succeeded,
    NotApplicable { reason: String },
    Failed { kind: FailureKind, message: String },
}

/// Record of one candidate strategy, in attempt order.
#[derive(Debug, Clone, Serialize)]
pub struct AttemptResult {
    pub strategy: String,
    pub outcome: AttemptOutcome,
    pub elapsed: Duration,

    /// Objects that could not be removed; never masks the outcome
    pub teardown_failures: Vec<String>,
}

impl AttemptResult {
    pub fn new(strategy: impl Into<String>, outcome: AttemptOutcome, elapsed: Duration) -> Self {
        Self {
            strategy: strategy.into(),
            outcome,
            elapsed,
            teardown_failures: Vec::new(),
        }
    }

    fn failed(strategy: &str, error: &Error, elapsed: Duration) -> Self {
        Self::new(
            strategy,
            AttemptOutcome::Failed {
                kind: error.kind(),
                message: error.to_string(),
            },
            elapsed,
        )
    }

    fn with_teardown_failures(mut self, failures: Vec<String>) -> Self {
        self.teardown_failures = failures;
        self
    }

    pub fn is_success(&self) -> bool {
        self.outcome == AttemptOutcome::Succeeded
    }
}

impl std::fmt::Display for AttemptResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.outcome {
            AttemptOutcome::Succeeded => write!(f, "{}: succeeded", self.strategy)?,
            AttemptOutcome::NotApplicable { reason } => {
                write!(f, "{}: not applicable ({})", self.strategy, reason)?
            }
            AttemptOutcome::Failed { kind, message } => {
                write!(f, "{}: failed [{}] {}", self.strategy, kind, message)?
            }
        }
        if !self.teardown_failures.is_empty() {
            write!(f, " (cleanup: {})", self.teardown_failures.join(", "))?;
        }
        Ok(())
    }
}

// =============================================================================
// Run State Machine
// =============================================================================

/// Engine states for a single request. Indices refer to candidate positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunState {
    Pending,
    Evaluating(usize),
    Applicable(usize),
    NotApplicable(usize),
    Executing(usize),
    Failed(usize),
    Succeeded,
    ExhaustedFailed,
    Cancelled,
    ConfigurationError,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RunState::Succeeded
                | RunState::ExhaustedFailed
                | RunState::Cancelled
                | RunState::ConfigurationError
        )
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Pending => write!(f, "Pending"),
            RunState::Evaluating(i) => write!(f, "Evaluating({})", i),
            RunState::Applicable(i) => write!(f, "Applicable({})", i),
            RunState::NotApplicable(i) => write!(f, "NotApplicable({})", i),
            RunState::Executing(i) => write!(f, "Executing({})", i),
            RunState::Failed(i) => write!(f, "Failed({})", i),
            RunState::Succeeded => write!(f, "Succeeded"),
            RunState::ExhaustedFailed => write!(f, "ExhaustedFailed"),
            RunState::Cancelled => write!(f, "Cancelled"),
            RunState::ConfigurationError => write!(f, "ConfigurationError"),
        }
    }
}

/// A step in the run
#[derive(Debug, Clone, Serialize)]
pub struct RunStep {
    pub state: RunState,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    pub duration_ms: u64,
}

/// Step log of a run.
#[derive(Debug)]
struct RunTracker {
    state: RunState,
    started_at: DateTime<Utc>,
    steps: Vec<RunStep>,
}

impl RunTracker {
    fn new() -> Self {
        Self {
            state: RunState::Pending,
            started_at: Utc::now(),
            steps: Vec::new(),
        }
    }

    /// Record a state transition
    fn transition(&mut self, state: RunState, message: &str) {
        let now = Utc::now();
        let last_step_time = self
            .steps
            .last()
            .map(|s| s.timestamp)
            .unwrap_or(self.started_at);
        let duration_ms = (now - last_step_time).num_milliseconds().max(0) as u64;

        debug!(from = %self.state, to = %state, "{}", message);
        self.state = state;
        self.steps.push(RunStep {
            state,
            timestamp: now,
            message: message.to_string(),
            duration_ms,
        });
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct MigrationReport {
    /// Strategy that completed the migration
    pub strategy: String,

    /// Every candidate that was looked at, in order; the last one succeeded
    pub attempts: Vec<AttemptResult>,

    /// State-machine log
    pub steps: Vec<RunStep>,

    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration: Duration,
}

// =============================================================================
// Engine
// =============================================================================

/// Runs requests against a fixed strategy registry.
pub struct Engine {
    registry: StrategyRegistry,
    config: EngineConfig,
    publisher: Arc<dyn EventPublisher>,
}

impl Engine {
    pub fn new(
        registry: StrategyRegistry,
        config: EngineConfig,
        publisher: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            registry,
            config,
            publisher,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    /// Migrate `request`, trying candidates until one succeeds.
    ///
    /// Fails with [`Error::Configuration`] before touching any cluster when the
    /// candidate list is invalid, [`Error::MigrationCancelled`] when `cancel`
    /// fires, and [`Error::Exhausted`] when no candidate succeeded.
    #[instrument(skip_all, fields(source = %request.source, destination = %request.destination))]
    pub async fn run(
        &self,
        request: &Request,
        clusters: &ClusterSet,
        cancel: &CancellationToken,
    ) -> Result<MigrationReport> {
        let mut tracker = RunTracker::new();

        let candidates = match self.registry.resolve(&request.strategies) {
            Ok(candidates) => candidates,
            Err(e) => {
                tracker.transition(RunState::ConfigurationError, &e.to_string());
                return Err(e);
            }
        };

        let names: Vec<String> = candidates.iter().map(|s| s.name().to_string()).collect();
        info!("Candidate strategies: {}", names.join(", "));
        self.emit(MigrationEvent::CandidatesResolved {
            strategies: names,
            timestamp: Utc::now(),
        })
        .await;

        let mut attempts: Vec<AttemptResult> = Vec::with_capacity(candidates.len());

        for (position, strategy) in candidates.iter().enumerate() {
            if cancel.is_cancelled() {
                tracker.transition(RunState::Cancelled, "Cancelled before next candidate");
                return Err(Error::MigrationCancelled { attempts });
            }

            let result = self
                .attempt(position, strategy.as_ref(), request, clusters, cancel, &mut tracker)
                .await;
            let succeeded = result.is_success();
            let cancelled = matches!(
                result.outcome,
                AttemptOutcome::Failed {
                    kind: FailureKind::Cancelled,
                    ..
                }
            );
            attempts.push(result);

            if succeeded {
                tracker.transition(RunState::Succeeded, "Migration completed");
                let finished_at = Utc::now();
                let report = MigrationReport {
                    strategy: strategy.name().to_string(),
                    attempts,
                    steps: tracker.steps,
                    started_at: tracker.started_at,
                    finished_at,
                    duration: (finished_at - tracker.started_at)
                        .to_std()
                        .unwrap_or(Duration::ZERO),
                };
                info!(
                    "Migration completed with {} in {:?}",
                    report.strategy, report.duration
                );
                return Ok(report);
            }

            if cancelled || cancel.is_cancelled() {
                tracker.transition(RunState::Cancelled, "Cancelled during attempt");
                return Err(Error::MigrationCancelled { attempts });
            }
        }

        tracker.transition(RunState::ExhaustedFailed, "No strategy succeeded");
        Err(Error::Exhausted { attempts })
    }

    /// Evaluate one candidate and, if applicable, execute it.
    async fn attempt(
        &self,
        position: usize,
        strategy: &dyn Strategy,
        request: &Request,
        clusters: &ClusterSet,
        cancel: &CancellationToken,
        tracker: &mut RunTracker,
    ) -> AttemptResult {
        let name = strategy.name();
        let started = Instant::now();

        tracker.transition(RunState::Evaluating(position), &format!("Evaluating {}", name));
        self.emit(MigrationEvent::EvaluationStarted {
            strategy: name.to_string(),
            position,
            timestamp: Utc::now(),
        })
        .await;

        let ctx = AttemptContext::new(request, clusters, &self.config, cancel);

        match strategy.applicable(&ctx).await {
            Ok(Applicability::Applicable) => {}
            Ok(Applicability::NotApplicable(reason)) => {
                info!("Strategy {} is not applicable: {}", name, reason);
                tracker.transition(RunState::NotApplicable(position), &reason);
                self.emit(MigrationEvent::ApplicabilityDetermined {
                    strategy: name.to_string(),
                    applicable: false,
                    reason: Some(reason.clone()),
                    timestamp: Utc::now(),
                })
                .await;
                return AttemptResult::new(
                    name,
                    AttemptOutcome::NotApplicable { reason },
                    started.elapsed(),
                );
            }
            Err(e) => {
                warn!("Applicability check for {} failed: {}", name, e);
                tracker.transition(RunState::Failed(position), &e.to_string());
                self.emit(MigrationEvent::ApplicabilityDetermined {
                    strategy: name.to_string(),
                    applicable: false,
                    reason: Some(e.to_string()),
                    timestamp: Utc::now(),
                })
                .await;
                return AttemptResult::failed(name, &e, started.elapsed());
            }
        }

        tracker.transition(RunState::Applicable(position), &format!("{} is applicable", name));
        self.emit(MigrationEvent::ApplicabilityDetermined {
            strategy: name.to_string(),
            applicable: true,
            reason: None,
            timestamp: Utc::now(),
        })
        .await;

        tracker.transition(
            RunState::Executing(position),
            &format!("Executing {} (attempt {})", name, ctx.attempt_id()),
        );
        self.emit(MigrationEvent::ExecutionStarted {
            strategy: name.to_string(),
            attempt_id: ctx.attempt_id().to_string(),
            timestamp: Utc::now(),
        })
        .await;

        let outcome = strategy.execute(&ctx).await;
        let teardown_failures = ctx.take_teardown_failures();
        for failure in &teardown_failures {
            warn!("Cleanup after {} incomplete: {}", name, failure);
        }
        let elapsed = started.elapsed();

        self.emit(MigrationEvent::ExecutionFinished {
            strategy: name.to_string(),
            attempt_id: ctx.attempt_id().to_string(),
            succeeded: outcome.is_ok(),
            error: outcome.as_ref().err().map(|e| e.to_string()),
            teardown_failures: teardown_failures.clone(),
            duration_ms: elapsed.as_millis() as u64,
            timestamp: Utc::now(),
        })
        .await;

        match outcome {
            Ok(()) => AttemptResult::new(name, AttemptOutcome::Succeeded, elapsed)
                .with_teardown_failures(teardown_failures),
            Err(e) => {
                warn!("Strategy {} failed: {}", name, e);
                tracker.transition(RunState::Failed(position), &e.to_string());
                AttemptResult::failed(name, &e, elapsed).with_teardown_failures(teardown_failures)
            }
        }
    }

    async fn emit(&self, event: MigrationEvent) {
        if let Err(e) = self.publisher.publish(event).await {
            warn!("Failed to publish event: {}", e);
        }
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("registry", &self.registry)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::adapters::InMemoryEventCollector;
    use crate::domain::ports::{ClusterAccess, TransferOptions, VolumeLocator};
    use assert_matches::assert_matches;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    // =========================================================================
    // Fake Strategies
    // =========================================================================

    #[derive(Debug, Clone, Copy)]
    pub(crate) enum Behavior {
        NotApplicable,
        Succeed,
        Fail,
        ProbeError,
        CancelDuringExecute,
    }

    pub(crate) struct FakeStrategy {
        name: &'static str,
        behavior: Behavior,
        log: Arc<Mutex<Vec<&'static str>>>,
        pub evaluations: AtomicUsize,
        pub executions: AtomicUsize,
    }

    impl FakeStrategy {
        pub(crate) fn new(
            name: &'static str,
            behavior: Behavior,
            log: &Arc<Mutex<Vec<&'static str>>>,
        ) -> Arc<Self> {
            Arc::new(Self {
                name,
                behavior,
                log: log.clone(),
                evaluations: AtomicUsize::new(0),
                executions: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Strategy for FakeStrategy {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn applicable(&self, _ctx: &AttemptContext<'_>) -> Result<Applicability> {
            self.evaluations.fetch_add(1, Ordering::SeqCst);
            self.log.lock().push(self.name);
            match self.behavior {
                Behavior::NotApplicable => Ok(Applicability::not("fake says no")),
                Behavior::ProbeError => Err(Error::ClaimNotFound {
                    namespace: "apps".into(),
                    name: "data".into(),
                }),
                _ => Ok(Applicability::Applicable),
            }
        }

        async fn execute(&self, ctx: &AttemptContext<'_>) -> Result<()> {
            self.executions.fetch_add(1, Ordering::SeqCst);
            match self.behavior {
                Behavior::Succeed => Ok(()),
                Behavior::CancelDuringExecute => {
                    ctx.cancel.cancel();
                    Err(Error::Cancelled)
                }
                _ => Err(Error::TransferFailed {
                    pod: "pv-migrate-x-rsync".into(),
                    reason: "exit code 23".into(),
                }),
            }
        }
    }

    pub(crate) fn request(strategies: &[&str]) -> Request {
        let access = ClusterAccess::new(None, Some("kind".into()));
        Request::new(
            VolumeLocator::new(access.clone(), "apps", "old"),
            VolumeLocator::new(access, "apps", "new"),
            TransferOptions::default(),
        )
        .with_strategies(strategies.iter().copied())
    }

    pub(crate) fn engine(strategies: Vec<Arc<dyn Strategy>>) -> (Engine, Arc<InMemoryEventCollector>) {
        let events = Arc::new(InMemoryEventCollector::new());
        let registry = StrategyRegistry::new(strategies).unwrap();
        (
            Engine::new(registry, EngineConfig::default(), events.clone()),
            events,
        )
    }

    // =========================================================================
    // EngineConfig Tests
    // =========================================================================

    #[test]
    fn test_engine_config_default() {
        let config = EngineConfig::default();

        assert_eq!(config.readiness_timeout, Duration::from_secs(300));
        assert_eq!(config.transfer_timeout, Duration::from_secs(86_400));
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.transfer_retries, 10);
        assert_eq!(config.retry_delay, Duration::from_secs(5));
    }

    // =========================================================================
    // RunState / AttemptResult Tests
    // =========================================================================

    #[test]
    fn test_run_state_display_and_terminals() {
        assert_eq!(RunState::Evaluating(2).to_string(), "Evaluating(2)");
        assert_eq!(RunState::ExhaustedFailed.to_string(), "ExhaustedFailed");
        assert!(RunState::Succeeded.is_terminal());
        assert!(RunState::ConfigurationError.is_terminal());
        assert!(!RunState::Failed(0).is_terminal());
    }

    #[test]
    fn test_attempt_result_display() {
        let result = AttemptResult::new(
            "rsync-in-cluster",
            AttemptOutcome::Failed {
                kind: FailureKind::ReadinessTimeout,
                message: "pod did not become ready".into(),
            },
            Duration::from_secs(1),
        )
        .with_teardown_failures(vec!["pod apps/x".into()]);

        let text = result.to_string();
        assert!(text.starts_with("rsync-in-cluster: failed [ReadinessTimeout]"));
        assert!(text.contains("cleanup: pod apps/x"));
    }

    #[test]
    fn test_run_tracker_records_steps() {
        let mut tracker = RunTracker::new();
        tracker.transition(RunState::Evaluating(0), "a");
        tracker.transition(RunState::NotApplicable(0), "b");

        assert_eq!(tracker.state, RunState::NotApplicable(0));
        assert_eq!(tracker.steps.len(), 2);
        assert_eq!(tracker.steps[1].message, "b");
    }

    // =========================================================================
    // Engine Tests
    // =========================================================================

    #[tokio::test]
    async fn test_default_order_and_short_circuit() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = FakeStrategy::new("a", Behavior::NotApplicable, &log);
        let b = FakeStrategy::new("b", Behavior::Succeed, &log);
        let c = FakeStrategy::new("c", Behavior::Succeed, &log);
        let (engine, _) = engine(vec![a.clone(), b.clone(), c.clone()]);

        let report = engine
            .run(&request(&[]), &ClusterSet::new(), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.strategy, "b");
        assert_eq!(report.attempts.len(), 2);
        assert!(report.attempts[1].is_success());
        assert_eq!(*log.lock(), vec!["a", "b"]);
        assert_eq!(a.executions.load(Ordering::SeqCst), 0);
        assert_eq!(c.evaluations.load(Ordering::SeqCst), 0);
        assert_eq!(c.executions.load(Ordering::SeqCst), 0);
        assert_eq!(report.steps.last().unwrap().state, RunState::Succeeded);
    }

    #[tokio::test]
    async fn test_override_order_is_respected() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = FakeStrategy::new("a", Behavior::Fail, &log);
        let b = FakeStrategy::new("b", Behavior::NotApplicable, &log);
        let c = FakeStrategy::new("c", Behavior::Fail, &log);
        let (engine, _) = engine(vec![a.clone(), b, c]);

        let err = engine
            .run(&request(&["c", "b"]), &ClusterSet::new(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_matches!(err, Error::Exhausted { .. });
        assert_eq!(*log.lock(), vec!["c", "b"]);
        assert_eq!(a.evaluations.load(Ordering::SeqCst), 0);

        let names: Vec<_> = err.attempts().iter().map(|a| a.strategy.as_str()).collect();
        assert_eq!(names, vec!["c", "b"]);
    }

    #[tokio::test]
    async fn test_unknown_override_fails_before_any_attempt() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = FakeStrategy::new("a", Behavior::Succeed, &log);
        let (engine, events) = engine(vec![a.clone()]);

        let err = engine
            .run(&request(&["a", "zz"]), &ClusterSet::new(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(err.is_configuration());
        assert_eq!(a.evaluations.load(Ordering::SeqCst), 0);
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_exhausted_records_every_outcome_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (engine, _) = engine(vec![
            FakeStrategy::new("a", Behavior::NotApplicable, &log),
            FakeStrategy::new("b", Behavior::ProbeError, &log),
            FakeStrategy::new("c", Behavior::Fail, &log),
        ]);

        let err = engine
            .run(&request(&[]), &ClusterSet::new(), &CancellationToken::new())
            .await
            .unwrap_err();

        let attempts = err.attempts();
        assert_eq!(attempts.len(), 3);
        assert_matches!(attempts[0].outcome, AttemptOutcome::NotApplicable { .. });
        assert_matches!(
            attempts[1].outcome,
            AttemptOutcome::Failed {
                kind: FailureKind::Cluster,
                ..
            }
        );
        assert_matches!(
            attempts[2].outcome,
            AttemptOutcome::Failed {
                kind: FailureKind::TransferFailed,
                ..
            }
        );
    }

    #[tokio::test]
    async fn test_cancellation_is_terminal() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = FakeStrategy::new("a", Behavior::CancelDuringExecute, &log);
        let b = FakeStrategy::new("b", Behavior::Succeed, &log);
        let (engine, _) = engine(vec![a, b.clone()]);

        let err = engine
            .run(&request(&[]), &ClusterSet::new(), &CancellationToken::new())
            .await
            .unwrap_err();

        assert_matches!(err, Error::MigrationCancelled { .. });
        assert!(err.is_cancelled());
        assert_eq!(err.attempts().len(), 1);
        assert_eq!(b.evaluations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = FakeStrategy::new("a", Behavior::Succeed, &log);
        let (engine, _) = engine(vec![a.clone()]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = engine
            .run(&request(&[]), &ClusterSet::new(), &cancel)
            .await
            .unwrap_err();

        assert!(err.is_cancelled());
        assert!(err.attempts().is_empty());
        assert_eq!(a.evaluations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_events_follow_phases() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (engine, events) = engine(vec![
            FakeStrategy::new("a", Behavior::NotApplicable, &log),
            FakeStrategy::new("b", Behavior::Succeed, &log),
        ]);

        engine
            .run(&request(&[]), &ClusterSet::new(), &CancellationToken::new())
            .await
            .unwrap();

        let types: Vec<_> = events.events().iter().map(|e| e.event_type()).collect();
        assert_eq!(
            types,
            vec![
                "CandidatesResolved",
                "EvaluationStarted",
                "ApplicabilityDetermined",
                "EvaluationStarted",
                "ApplicabilityDetermined",
                "ExecutionStarted",
                "ExecutionFinished",
            ]
        );
        assert_matches!(
            events.events_of_type("ExecutionFinished")[0],
            MigrationEvent::ExecutionFinished { succeeded: true, .. }
        );
    }
}
