//! pv-migrate - Migrate the contents of Kubernetes PersistentVolumeClaims
//!
//! Copies data from one claim into another, within a namespace, across
//! namespaces, or across clusters, by trying transfer strategies in priority
//! order until one succeeds.
//!
//! # Architecture
//!
//! ```text
//! Request → Engine → Strategy (applicable? → execute) → ClusterApi
//!              │                     │
//!              └── EventPublisher    └── EphemeralResources (always released)
//! ```
//!
//! # Strategies
//!
//! - `mount-both` - one pod mounts both claims, local rsync
//! - `rsync-in-cluster` - sshd relay behind a ClusterIP service
//! - `rsync-cross-cluster` - sshd relay behind a LoadBalancer service
//!
//! # Modules
//!
//! - [`adapters`] - kube-rs cluster adapter and event publishers
//! - [`domain`] - Request model, ports and events
//! - [`error`] - Error types
//! - [`migrator`] - Engine, strategies and ephemeral resource handling

pub mod adapters;
pub mod domain;
pub mod error;
pub mod migrator;

// Re-export commonly used types
pub use domain::{ClusterAccess, Request, TransferOptions, VolumeLocator};
pub use error::{Error, Result};
pub use migrator::{Engine, EngineConfig, MigrationReport, StrategyRegistry};
