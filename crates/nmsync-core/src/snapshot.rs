//! Filter-tagged inventory snapshots

use indexmap::IndexMap;
use nmsync_api::RemoteDevice;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::normalize::{DEFAULT_NAMESPACE, NormalizedDevice};

/// Group name to member devices, in insertion order
pub type GroupInventory = IndexMap<String, Vec<NormalizedDevice>>;

/// Inputs that must be unchanged for a cached snapshot to be reused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint<'a> {
    pub group_name_filter: &'a [String],
    pub host_name_filter: &'a [String],
    /// Prefix of the namespaced keys in the inventory
    pub namespace: &'a str,
}

/// Result of one synchronization pass, tagged with the filters that produced it
///
/// This is the unit stored in the cache. Filters and namespace are fixed at
/// creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    group_name_filter: Vec<String>,
    host_name_filter: Vec<String>,
    namespace: String,
    inventory: GroupInventory,
}

impl Snapshot {
    /// Create an empty snapshot for the given filters under the default namespace
    pub fn new(group_name_filter: Vec<String>, host_name_filter: Vec<String>) -> Self {
        Self {
            group_name_filter,
            host_name_filter,
            namespace: DEFAULT_NAMESPACE.to_string(),
            inventory: GroupInventory::new(),
        }
    }

    /// Set the namespace the inventory keys were produced under
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Group filters that produced this snapshot
    #[must_use]
    pub fn group_name_filter(&self) -> &[String] {
        &self.group_name_filter
    }

    /// Host filters that produced this snapshot
    #[must_use]
    pub fn host_name_filter(&self) -> &[String] {
        &self.host_name_filter
    }

    /// Namespace of the prefixed keys
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Grouped devices
    #[must_use]
    pub fn inventory(&self) -> &GroupInventory {
        &self.inventory
    }

    /// Fingerprint this snapshot was produced under
    #[must_use]
    pub fn fingerprint(&self) -> Fingerprint<'_> {
        Fingerprint {
            group_name_filter: &self.group_name_filter,
            host_name_filter: &self.host_name_filter,
            namespace: &self.namespace,
        }
    }

    /// Exact, order-sensitive comparison of both filter lists and the namespace
    #[must_use]
    pub fn matches(&self, expected: &Fingerprint<'_>) -> bool {
        self.fingerprint() == *expected
    }

    /// Total number of device entries across groups
    #[must_use]
    pub fn device_count(&self) -> usize {
        self.inventory.values().map(Vec::len).sum()
    }
}

/// Assembles a [`Snapshot`] one device at a time
#[derive(Debug)]
pub struct SnapshotBuilder {
    group_by: Option<String>,
    snapshot: Snapshot,
}

impl SnapshotBuilder {
    /// Start a snapshot
    ///
    /// With `group_by` set, devices are grouped by the value of that raw
    /// field instead of by the remote group they were resolved from.
    pub fn new(
        group_name_filter: Vec<String>,
        host_name_filter: Vec<String>,
        group_by: Option<String>,
    ) -> Self {
        Self {
            group_by,
            snapshot: Snapshot::new(group_name_filter, host_name_filter),
        }
    }

    /// Record the namespace the added devices were normalized under
    #[must_use]
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.snapshot.namespace = namespace.into();
        self
    }

    /// Add a device resolved from `remote_group`
    pub fn add(&mut self, remote_group: &str, raw: &RemoteDevice, device: NormalizedDevice) {
        let key = match &self.group_by {
            Some(field) => group_key(raw.get(field)).unwrap_or_else(|| {
                warn!(
                    field = %field,
                    device_id = ?raw.device_id(),
                    group = remote_group,
                    "group_by field missing, keeping remote group"
                );
                remote_group.to_string()
            }),
            None => remote_group.to_string(),
        };
        self.snapshot.inventory.entry(key).or_default().push(device);
    }

    /// Finish the snapshot
    #[must_use]
    pub fn finish(self) -> Snapshot {
        self.snapshot
    }
}

fn group_key(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
