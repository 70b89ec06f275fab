//! One synchronization run: select, resolve, normalize, group, cache

use std::sync::Arc;

use nmsync_client::MonitoringApi;
use tracing::{debug, info, instrument};

use crate::cache::{CacheManager, CacheOutcome, CacheStore};
use crate::config::Settings;
use crate::error::SyncError;
use crate::filter::{GroupSelector, HostSelector};
use crate::normalize::FieldNormalizer;
use crate::populate::{InventorySink, PopulateSummary, Populator};
use crate::resolver::DeviceResolver;
use crate::snapshot::{Fingerprint, Snapshot, SnapshotBuilder};

/// Drives a synchronization run against a monitoring API
pub struct Synchronizer {
    resolver: DeviceResolver,
    api: Arc<dyn MonitoringApi>,
    settings: Settings,
}

impl Synchronizer {
    pub fn new(api: Arc<dyn MonitoringApi>, settings: Settings) -> Self {
        Self {
            resolver: DeviceResolver::new(Arc::clone(&api)),
            api,
            settings,
        }
    }

    /// Settings this run was created with
    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Fetch and assemble a fresh snapshot
    ///
    /// Groups and devices are processed one at a time; the first failed
    /// request aborts the whole build.
    ///
    /// # Errors
    /// Returns [`SyncError::Client`] carrying the upstream message verbatim.
    #[instrument(skip(self))]
    pub async fn build_snapshot(&self) -> Result<Snapshot, SyncError> {
        let settings = &self.settings;
        let group_filter = settings.group_patterns.sources().to_vec();
        let host_filter = settings.host_patterns.sources().to_vec();

        let groups = self.api.list_groups().await?;
        let selected = GroupSelector::new(settings.group_patterns.clone()).select(&groups);
        info!(
            available = groups.len(),
            selected = selected.len(),
            "selected device groups"
        );

        let hosts = HostSelector::new(settings.host_patterns.clone());
        let normalizer =
            FieldNormalizer::new(settings.mapping.clone(), &group_filter, &host_filter);
        let mut builder =
            SnapshotBuilder::new(group_filter, host_filter, settings.group_by.clone())
                .with_namespace(settings.mapping.namespace());

        for group in &selected {
            for member in self.resolver.devices_of(group).await? {
                let device = self.resolver.resolve(member).await?;
                if !hosts.matches(&device) {
                    debug!(
                        device_id = member.device_id,
                        name = device.display_name(),
                        "host filter rejected device"
                    );
                    continue;
                }
                builder.add(&group.name, &device, normalizer.normalize(&device));
            }
        }

        let snapshot = builder.finish();
        info!(
            groups = snapshot.inventory().len(),
            devices = snapshot.device_count(),
            "snapshot built"
        );
        Ok(snapshot)
    }

    /// Reuse a cached snapshot when valid, otherwise build and persist one
    ///
    /// # Errors
    /// Returns an error only when a rebuild was needed and failed.
    pub async fn run(
        &self,
        store: Option<&dyn CacheStore>,
        key: &str,
    ) -> Result<CacheOutcome, SyncError> {
        let manager = CacheManager::new(store, self.settings.cache.clone());
        let expected = Fingerprint {
            group_name_filter: self.settings.group_patterns.sources(),
            host_name_filter: self.settings.host_patterns.sources(),
            namespace: self.settings.mapping.namespace(),
        };
        let outcome = manager
            .resolve(key, &expected, || self.build_snapshot())
            .await?;
        debug!(transitions = ?outcome.transitions, "cache resolution finished");
        Ok(outcome)
    }

    /// Emit `snapshot` into `sink` under the configured policy
    pub fn populate(&self, snapshot: &Snapshot, sink: &mut dyn InventorySink) -> PopulateSummary {
        Populator::new(self.settings.mapping.clone(), self.settings.disabled).populate(snapshot, sink)
    }
}

impl std::fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synchronizer")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
