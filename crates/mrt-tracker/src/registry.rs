//! ---
//! mrt_section: "07-resilience-fault-tolerance"
//! mrt_subsection: "module"
//! mrt_type: "source"
//! mrt_scope: "code"
//! mrt_description: "Mission resilience scoring, alerting, and reporting."
//! mrt_version: "v0.1.0"
//! mrt_owner: "tbd"
//! ---
use std::collections::HashMap;
use std::sync::Arc;

use mrt_common::TrackerConfig;
use mrt_msg::MessageBus;
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::error::Result;
use crate::metrics::TrackerMetrics;
use crate::mirror::EventMirror;
use crate::tracker::MissionTracker;

pub(crate) type TrackerMap = Mutex<HashMap<String, Arc<MissionTracker>>>;

/// Builds the mirror of a newly created tracker from its mission id.
pub type MirrorFactory = Arc<dyn Fn(&str) -> Result<Arc<dyn EventMirror>> + Send + Sync>;

/// Caller-owned map of live trackers, one per mission id. Every tracker it
/// creates shares the registry's bus and metrics.
pub struct TrackerRegistry {
    trackers: Arc<TrackerMap>,
    bus: Option<MessageBus>,
    metrics: Option<TrackerMetrics>,
    mirror_factory: Option<MirrorFactory>,
}

impl TrackerRegistry {
    pub fn new(bus: Option<MessageBus>, metrics: Option<TrackerMetrics>) -> Self {
        Self {
            trackers: Arc::new(Mutex::new(HashMap::new())),
            bus,
            metrics,
            mirror_factory: None,
        }
    }

    pub fn with_mirror_factory(mut self, factory: MirrorFactory) -> Self {
        self.mirror_factory = Some(factory);
        self
    }

    /// Return the tracker of `config.mission_id`, creating it on first use.
    /// The config of an existing tracker is left untouched.
    pub fn get_or_create(&self, config: TrackerConfig) -> Result<Arc<MissionTracker>> {
        let mut trackers = self.trackers.lock();
        if let Some(existing) = trackers.get(&config.mission_id) {
            return Ok(existing.clone());
        }
        let mirror = match &self.mirror_factory {
            Some(factory) => Some(factory(&config.mission_id)?),
            None => None,
        };
        let mission_id = config.mission_id.clone();
        let tracker = Arc::new(
            MissionTracker::new(config, self.bus.clone(), self.metrics.clone(), mirror)?
                .registered_in(Arc::downgrade(&self.trackers)),
        );
        trackers.insert(mission_id.clone(), tracker.clone());
        debug!(target: "mrt::registry", mission = %mission_id, "tracker registered");
        Ok(tracker)
    }

    pub fn get(&self, mission_id: &str) -> Option<Arc<MissionTracker>> {
        self.trackers.lock().get(mission_id).cloned()
    }

    /// Deregister and clean up a mission. Returns false when it was unknown.
    pub async fn cleanup(&self, mission_id: &str) -> bool {
        let registered = self.get(mission_id);
        match registered {
            Some(tracker) => {
                tracker.cleanup().await;
                info!(target: "mrt::registry", mission = %mission_id, "tracker deregistered");
                true
            }
            None => false,
        }
    }

    pub async fn cleanup_all(&self) {
        let registered: Vec<_> = self.trackers.lock().values().cloned().collect();
        for tracker in registered {
            tracker.cleanup().await;
        }
    }

    pub fn mission_ids(&self) -> Vec<String> {
        let mut ids: Vec<_> = self.trackers.lock().keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.trackers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.lock().is_empty()
    }
}

impl Default for TrackerRegistry {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl std::fmt::Debug for TrackerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackerRegistry")
            .field("missions", &self.mission_ids())
            .finish_non_exhaustive()
    }
}
