//! Migration Events
//!
//! One event per phase transition of the engine. Events are immutable records
//! handed to an [`EventPublisher`](super::ports::EventPublisher); the engine
//! never writes to the console itself.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Event emitted while a request is being processed.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum MigrationEvent {
    /// The engine resolved its candidate list.
    CandidatesResolved {
        strategies: Vec<String>,
        timestamp: DateTime<Utc>,
    },

    /// A strategy is about to be evaluated.
    EvaluationStarted {
        strategy: String,
        position: usize,
        timestamp: DateTime<Utc>,
    },

    /// A strategy answered the applicability check.
    ApplicabilityDetermined {
        strategy: String,
        applicable: bool,
        reason: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// A strategy started executing.
    ExecutionStarted {
        strategy: String,
        attempt_id: String,
        timestamp: DateTime<Utc>,
    },

    /// A strategy finished executing.
    ExecutionFinished {
        strategy: String,
        attempt_id: String,
        succeeded: bool,
        error: Option<String>,
        teardown_failures: Vec<String>,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },
}

impl MigrationEvent {
    /// Get the event type as a string.
    pub fn event_type(&self) -> &'static str {
        match self {
            MigrationEvent::CandidatesResolved { .. } => "CandidatesResolved",
            MigrationEvent::EvaluationStarted { .. } => "EvaluationStarted",
            MigrationEvent::ApplicabilityDetermined { .. } => "ApplicabilityDetermined",
            MigrationEvent::ExecutionStarted { .. } => "ExecutionStarted",
            MigrationEvent::ExecutionFinished { .. } => "ExecutionFinished",
        }
    }

    /// Strategy the event refers to, if any.
    pub fn strategy(&self) -> Option<&str> {
        match self {
            MigrationEvent::CandidatesResolved { .. } => None,
            MigrationEvent::EvaluationStarted { strategy, .. }
            | MigrationEvent::ApplicabilityDetermined { strategy, .. }
            | MigrationEvent::ExecutionStarted { strategy, .. }
            | MigrationEvent::ExecutionFinished { strategy, .. } => Some(strategy),
        }
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            MigrationEvent::CandidatesResolved { timestamp, .. }
            | MigrationEvent::EvaluationStarted { timestamp, .. }
            | MigrationEvent::ApplicabilityDetermined { timestamp, .. }
            | MigrationEvent::ExecutionStarted { timestamp, .. }
            | MigrationEvent::ExecutionFinished { timestamp, .. } => *timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_and_strategy() {
        let event = MigrationEvent::ApplicabilityDetermined {
            strategy: "mount-both".to_string(),
            applicable: false,
            reason: Some("different namespaces".to_string()),
            timestamp: Utc::now(),
        };
        assert_eq!(event.event_type(), "ApplicabilityDetermined");
        assert_eq!(event.strategy(), Some("mount-both"));
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = MigrationEvent::ExecutionStarted {
            strategy: "rsync-in-cluster".to_string(),
            attempt_id: "ab12cd34".to_string(),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"ExecutionStarted\""));
        assert!(json.contains("\"attempt_id\":\"ab12cd34\""));
    }
}
