//! Infrastructure Adapters
//!
//! Adapter implementations for the domain ports.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Domain Layer                              │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │                    Ports (Traits)                           │ │
//! │  │          ClusterApi          │       EventPublisher         │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//!                               │
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Adapters (This Module)                       │
//! │  ┌────────────────────────────────────────────────────────────┐ │
//! │  │ KubeCluster │ KubeConnector │ LoggingEventPublisher        │ │
//! │  │ InMemoryEventCollector                                     │ │
//! │  └────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use pv_migrate::adapters::KubeConnector;
//! use pv_migrate::domain::ClusterAccess;
//!
//! let mut connector = KubeConnector::new();
//! let source = connector.locate(&ClusterAccess::default(), None, "data").await?;
//! let clusters = connector.into_cluster_set();
//! ```

mod event_publisher;
mod kubernetes;

pub use event_publisher::{summarize_event, InMemoryEventCollector, LoggingEventPublisher};
pub use kubernetes::{
    claim_users_of, ingress_of, pinned_node_of, pod_state_of, KubeCluster, KubeConnector,
};
