//! Event Publisher Adapter
//!
//! Implements the `EventPublisher` port: a tracing-backed publisher for the
//! command line and an in-memory collector for tests.

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::domain::events::MigrationEvent;
use crate::domain::ports::EventPublisher;
use crate::error::Result;

/// Reports engine progress through `tracing`.
///
/// Candidate resolution, execution starts and finishes are logged at info.
/// Per-strategy evaluation chatter is kept at debug unless `verbose` is set.
/// Failed executions and leftover resources are logged as warnings.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingEventPublisher {
    verbose: bool,
}

impl LoggingEventPublisher {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }
}

/// One-line description of an event for humans.
pub fn summarize_event(event: &MigrationEvent) -> String {
    match event {
        MigrationEvent::CandidatesResolved { strategies, .. } => {
            format!("Trying strategies in order: {}", strategies.join(", "))
        }
        MigrationEvent::EvaluationStarted {
            strategy, position, ..
        } => format!("Evaluating {} (candidate #{})", strategy, position + 1),
        MigrationEvent::ApplicabilityDetermined {
            strategy,
            applicable: true,
            ..
        } => format!("{} is applicable", strategy),
        MigrationEvent::ApplicabilityDetermined {
            strategy, reason, ..
        } => format!(
            "{} is not applicable: {}",
            strategy,
            reason.as_deref().unwrap_or("no reason given")
        ),
        MigrationEvent::ExecutionStarted {
            strategy,
            attempt_id,
            ..
        } => format!("Running {} (attempt {})", strategy, attempt_id),
        MigrationEvent::ExecutionFinished {
            strategy,
            succeeded: true,
            duration_ms,
            ..
        } => format!("{} finished in {} ms", strategy, duration_ms),
        MigrationEvent::ExecutionFinished {
            strategy,
            error,
            duration_ms,
            ..
        } => format!(
            "{} failed after {} ms: {}",
            strategy,
            duration_ms,
            error.as_deref().unwrap_or("unknown error")
        ),
    }
}

#[async_trait]
impl EventPublisher for LoggingEventPublisher {
    async fn publish(&self, event: MigrationEvent) -> Result<()> {
        let event_type = event.event_type();
        let strategy = event.strategy().unwrap_or("-");
        let message = summarize_event(&event);

        match &event {
            MigrationEvent::ExecutionFinished {
                succeeded,
                teardown_failures,
                ..
            } => {
                if *succeeded {
                    info!(event_type, strategy, "{}", message);
                } else {
                    warn!(event_type, strategy, "{}", message);
                }
                for leftover in teardown_failures {
                    warn!(event_type, strategy, "Leftover resource: {}", leftover);
                }
            }
            MigrationEvent::EvaluationStarted { .. }
            | MigrationEvent::ApplicabilityDetermined { .. } => {
                if self.verbose {
                    info!(event_type, strategy, "{}", message);
                } else {
                    debug!(event_type, strategy, "{}", message);
                }
            }
            _ => info!(event_type, strategy, "{}", message),
        }

        Ok(())
    }
}

/// In-memory event collector for testing.
#[derive(Debug, Default)]
pub struct InMemoryEventCollector {
    events: parking_lot::RwLock<Vec<MigrationEvent>>,
}

impl InMemoryEventCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all collected events.
    pub fn events(&self) -> Vec<MigrationEvent> {
        self.events.read().clone()
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Get events of a specific type.
    pub fn events_of_type(&self, event_type: &str) -> Vec<MigrationEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type() == event_type)
            .cloned()
            .collect()
    }

    /// Events concerning one strategy, in publication order.
    pub fn events_for(&self, strategy: &str) -> Vec<MigrationEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.strategy() == Some(strategy))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventCollector {
    async fn publish(&self, event: MigrationEvent) -> Result<()> {
        self.events.write().push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn evaluation(strategy: &str, position: usize) -> MigrationEvent {
        MigrationEvent::EvaluationStarted {
            strategy: strategy.to_string(),
            position,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_logging_publisher() {
        let publisher = LoggingEventPublisher::new(false);

        // Should not panic
        publisher.publish(evaluation("mount-both", 0)).await.unwrap();
        publisher
            .publish(MigrationEvent::ExecutionFinished {
                strategy: "rsync-in-cluster".to_string(),
                attempt_id: "abcd1234".to_string(),
                succeeded: false,
                error: Some("boom".to_string()),
                teardown_failures: vec!["pod/apps/pv-migrate-abcd1234-rsync".to_string()],
                duration_ms: 12,
                timestamp: Utc::now(),
            })
            .await
            .unwrap();
    }

    #[test]
    fn test_summarize_event() {
        assert_eq!(
            summarize_event(&evaluation("mount-both", 0)),
            "Evaluating mount-both (candidate #1)"
        );

        let skipped = MigrationEvent::ApplicabilityDetermined {
            strategy: "mount-both".to_string(),
            applicable: false,
            reason: Some("different namespaces".to_string()),
            timestamp: Utc::now(),
        };
        assert_eq!(
            summarize_event(&skipped),
            "mount-both is not applicable: different namespaces"
        );

        let failed = MigrationEvent::ExecutionFinished {
            strategy: "rsync-cross-cluster".to_string(),
            attempt_id: "abcd1234".to_string(),
            succeeded: false,
            error: Some("exit code 23".to_string()),
            teardown_failures: Vec::new(),
            duration_ms: 40,
            timestamp: Utc::now(),
        };
        assert_eq!(
            summarize_event(&failed),
            "rsync-cross-cluster failed after 40 ms: exit code 23"
        );
    }

    #[tokio::test]
    async fn test_in_memory_collector() {
        let collector = InMemoryEventCollector::new();

        assert!(collector.is_empty());

        collector.publish(evaluation("mount-both", 0)).await.unwrap();
        collector
            .publish(evaluation("rsync-in-cluster", 1))
            .await
            .unwrap();

        assert_eq!(collector.len(), 2);
        assert_eq!(collector.events_of_type("EvaluationStarted").len(), 2);
        assert_eq!(collector.events_for("rsync-in-cluster").len(), 1);
    }
}
