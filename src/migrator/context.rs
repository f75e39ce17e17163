//! Per-request and per-attempt context handed to strategies.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use super::engine::EngineConfig;
use crate::domain::ports::{ClusterAccess, ClusterApi, Request};
use crate::error::{Error, Result};

/// Resolved cluster handles, one per distinct [`ClusterAccess`].
#[derive(Clone, Default)]
pub struct ClusterSet {
    clusters: HashMap<ClusterAccess, Arc<dyn ClusterApi>>,
}

impl ClusterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the handle serving `access`, replacing any previous one.
    pub fn insert(&mut self, access: ClusterAccess, cluster: Arc<dyn ClusterApi>) {
        self.clusters.insert(access, cluster);
    }

    pub fn with(mut self, access: ClusterAccess, cluster: Arc<dyn ClusterApi>) -> Self {
        self.insert(access, cluster);
        self
    }

    pub fn get(&self, access: &ClusterAccess) -> Result<Arc<dyn ClusterApi>> {
        self.clusters
            .get(access)
            .cloned()
            .ok_or_else(|| Error::Configuration(format!("no cluster client for {}", access)))
    }

    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }
}

impl std::fmt::Debug for ClusterSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterSet")
            .field("clusters", &self.clusters.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Everything one strategy attempt may touch.
///
/// Created by the engine for every candidate; dropped when the attempt ends.
pub struct AttemptContext<'a> {
    pub request: &'a Request,
    pub clusters: &'a ClusterSet,
    pub config: &'a EngineConfig,
    pub cancel: &'a CancellationToken,
    attempt_id: String,
    teardown_failures: Mutex<Vec<String>>,
}

impl<'a> AttemptContext<'a> {
    pub fn new(
        request: &'a Request,
        clusters: &'a ClusterSet,
        config: &'a EngineConfig,
        cancel: &'a CancellationToken,
    ) -> Self {
        let attempt_id = uuid::Uuid::new_v4().simple().to_string()[..8].to_string();
        Self {
            request,
            clusters,
            config,
            cancel,
            attempt_id,
            teardown_failures: Mutex::new(Vec::new()),
        }
    }

    /// Short random id shared by every resource of this attempt.
    pub fn attempt_id(&self) -> &str {
        &self.attempt_id
    }

    /// Name for an ephemeral object playing `role` in this attempt.
    pub fn resource_name(&self, role: &str) -> String {
        format!("pv-migrate-{}-{}", self.attempt_id, role)
    }

    pub fn source_cluster(&self) -> Result<Arc<dyn ClusterApi>> {
        self.clusters.get(&self.request.source.access)
    }

    pub fn destination_cluster(&self) -> Result<Arc<dyn ClusterApi>> {
        self.clusters.get(&self.request.destination.access)
    }

    pub fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }

    pub fn record_teardown_failure(&self, failure: String) {
        self.teardown_failures.lock().push(failure);
    }

    pub fn take_teardown_failures(&self) -> Vec<String> {
        std::mem::take(&mut *self.teardown_failures.lock())
    }
}
