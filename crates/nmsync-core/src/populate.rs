//! Emission of snapshots into an inventory sink

use indexmap::IndexMap;
use nmsync_api::{Fields, RemoteDevice};
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::normalize::{DisabledPolicy, FieldMapping, PLATFORM_KEY};
use crate::snapshot::Snapshot;

/// Receiver of groups, hosts and host variables
pub trait InventorySink {
    fn add_group(&mut self, group: &str);
    fn add_host(&mut self, group: &str, host: &str);
    fn set_variable(&mut self, host: &str, key: &str, value: Value);
}

/// Counts from one populate pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PopulateSummary {
    pub groups: usize,
    pub hosts: usize,
    /// Devices dropped by the disabled policy
    pub excluded: usize,
    /// Devices without a usable hostname
    pub unnamed: usize,
}

/// Walks a snapshot and feeds an [`InventorySink`]
#[derive(Debug, Clone, Default)]
pub struct Populator {
    mapping: FieldMapping,
    policy: DisabledPolicy,
}

impl Populator {
    pub fn new(mapping: FieldMapping, policy: DisabledPolicy) -> Self {
        Self { mapping, policy }
    }

    /// Register every group and every included device of `snapshot`
    pub fn populate(&self, snapshot: &Snapshot, sink: &mut dyn InventorySink) -> PopulateSummary {
        let disabled_key = self.mapping.namespaced(RemoteDevice::DISABLED);
        let mut summary = PopulateSummary::default();

        for (group, devices) in snapshot.inventory() {
            info!(group = %group, devices = devices.len(), "processing group");
            sink.add_group(group);
            summary.groups += 1;

            for device in devices {
                let Some(hostname) = self.mapping.inventory_hostname(device) else {
                    warn!(group = %group, "device has neither display name nor address, skipping");
                    summary.unnamed += 1;
                    continue;
                };

                if !self.policy.includes(device.get(&disabled_key)) {
                    debug!(host = %hostname, "skipping disabled host");
                    summary.excluded += 1;
                    continue;
                }

                debug!(host = %hostname, group = %group, "adding host");
                sink.add_host(group, &hostname);
                summary.hosts += 1;

                for (key, value) in device.iter() {
                    let key = self.mapping.rename(key);
                    let value = if key == PLATFORM_KEY {
                        self.mapping.alias_platform(value).into_owned()
                    } else {
                        value.clone()
                    };
                    sink.set_variable(&hostname, key, value);
                }
            }
        }

        summary
    }
}

/// Dynamic-inventory JSON document
///
/// Renders as `{"_meta": {"hostvars": ..}, "all": {"hosts": .., "children": ..}, <group>: {"hosts": ..}}`.
#[derive(Debug, Clone, Default)]
pub struct JsonInventory {
    groups: IndexMap<String, Vec<String>>,
    hostvars: IndexMap<String, Fields>,
}

impl JsonInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Variables of one host; an empty object for unknown hosts
    #[must_use]
    pub fn host_vars(&self, host: &str) -> Value {
        Value::Object(self.hostvars.get(host).cloned().unwrap_or_default())
    }

    /// Hosts registered under a group
    #[must_use]
    pub fn group_hosts(&self, group: &str) -> Option<&[String]> {
        self.groups.get(group).map(Vec::as_slice)
    }

    /// Render the full document
    #[must_use]
    pub fn to_value(&self) -> Value {
        let hostvars: Fields = self
            .hostvars
            .iter()
            .map(|(host, vars)| (host.clone(), Value::Object(vars.clone())))
            .collect();
        let all_hosts: Vec<&String> = self.hostvars.keys().collect();
        let children: Vec<&String> = self
            .groups
            .keys()
            .filter(|g| !is_reserved(g))
            .collect();

        let mut root = Fields::new();
        root.insert("_meta".to_string(), json!({ "hostvars": hostvars }));
        root.insert(
            "all".to_string(),
            json!({ "hosts": all_hosts, "children": children }),
        );
        for (group, hosts) in &self.groups {
            if is_reserved(group) {
                continue;
            }
            root.insert(group.clone(), json!({ "hosts": hosts }));
        }
        Value::Object(root)
    }
}

fn is_reserved(group: &str) -> bool {
    group == "all" || group == "_meta"
}

impl InventorySink for JsonInventory {
    fn add_group(&mut self, group: &str) {
        self.groups.entry(group.to_string()).or_default();
    }

    fn add_host(&mut self, group: &str, host: &str) {
        let hosts = self.groups.entry(group.to_string()).or_default();
        if !hosts.iter().any(|h| h == host) {
            hosts.push(host.to_string());
        }
        self.hostvars.entry(host.to_string()).or_default();
    }

    fn set_variable(&mut self, host: &str, key: &str, value: Value) {
        self.hostvars
            .entry(host.to_string())
            .or_default()
            .insert(key.to_string(), value);
    }
}
