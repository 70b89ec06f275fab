//! Field normalization into the inventory vocabulary

use std::borrow::Cow;
use std::collections::BTreeMap;

use nmsync_api::{Fields, RemoteDevice};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Default prefix for remote-origin field names
pub const DEFAULT_NAMESPACE: &str = "libre_";
/// Connection address variable
pub const ADDRESS_KEY: &str = "ansible_host";
/// Platform variable
pub const PLATFORM_KEY: &str = "ansible_network_os";
/// Group filters active when the device was fetched
pub const GROUP_FILTER_KEY: &str = "inventory_group_name_regex_filter";
/// Host filters active when the device was fetched
pub const HOST_FILTER_KEY: &str = "inventory_host_name_regex_filter";

const PLATFORM_ALIASES: [(&str, &str); 3] = [("asa", "asa"), ("ios", "ios"), ("iosxe", "ios")];

/// Rename and alias tables used by the normalizer and the populator
///
/// Built once from configuration and shared read-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMapping {
    namespace: String,
    renames: BTreeMap<String, String>,
    platform_aliases: BTreeMap<String, String>,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self::new(DEFAULT_NAMESPACE)
    }
}

impl FieldMapping {
    /// Create the standard tables with the given namespace prefix
    pub fn new(namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        let mut renames = BTreeMap::new();
        for (raw, target) in [
            (RemoteDevice::ADDRESS, ADDRESS_KEY),
            (RemoteDevice::PLATFORM, PLATFORM_KEY),
        ] {
            renames.insert(raw.to_string(), target.to_string());
            renames.insert(format!("{namespace}{raw}"), target.to_string());
        }

        let platform_aliases = PLATFORM_ALIASES
            .iter()
            .map(|(from, to)| ((*from).to_string(), (*to).to_string()))
            .collect();

        Self {
            namespace,
            renames,
            platform_aliases,
        }
    }

    /// Add or replace a platform alias
    #[must_use]
    pub fn with_platform_alias(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.platform_aliases.insert(from.into(), to.into());
        self
    }

    /// Namespace prefix
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Prefixed name of a raw field, ignoring the rename table
    #[must_use]
    pub fn namespaced(&self, raw: &str) -> String {
        format!("{}{raw}", self.namespace)
    }

    /// Output name of a raw field
    #[must_use]
    pub fn target_key(&self, raw: &str) -> String {
        self.renames
            .get(raw)
            .cloned()
            .unwrap_or_else(|| self.namespaced(raw))
    }

    /// Apply the rename table to an already-normalized key
    #[must_use]
    pub fn rename<'a>(&'a self, key: &'a str) -> &'a str {
        self.renames.get(key).map_or(key, String::as_str)
    }

    /// Map a platform value through the alias table
    ///
    /// Unknown platforms and non-string values pass through unchanged.
    #[must_use]
    pub fn alias_platform<'a>(&self, value: &'a Value) -> Cow<'a, Value> {
        match value {
            Value::String(platform) => match self.platform_aliases.get(platform) {
                Some(alias) => Cow::Owned(Value::String(alias.clone())),
                None => Cow::Borrowed(value),
            },
            _ => Cow::Borrowed(value),
        }
    }

    /// Inventory hostname of a normalized device
    ///
    /// A non-empty display name is transliterated to ASCII; otherwise the
    /// connection address is used. Returns `None` when neither is usable.
    #[must_use]
    pub fn inventory_hostname(&self, device: &NormalizedDevice) -> Option<String> {
        let display = device.get(&self.namespaced(RemoteDevice::DISPLAY_NAME));
        if let Some(Value::String(name)) = display
            && !name.is_empty()
        {
            return Some(deunicode::deunicode(name));
        }

        match device.get(&self.target_key(RemoteDevice::ADDRESS))? {
            Value::String(addr) if !addr.is_empty() => Some(addr.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// A device record in the inventory vocabulary
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedDevice(Fields);

impl NormalizedDevice {
    /// Look up a normalized field
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Iterate fields in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Number of fields
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check for an empty record
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Fields> for NormalizedDevice {
    fn from(fields: Fields) -> Self {
        Self(fields)
    }
}

/// Renames raw device fields and tags them with the active filters
#[derive(Debug, Clone)]
pub struct FieldNormalizer {
    mapping: FieldMapping,
    group_filter: Value,
    host_filter: Value,
}

impl FieldNormalizer {
    /// Create a normalizer for one synchronization pass
    pub fn new(mapping: FieldMapping, group_filters: &[String], host_filters: &[String]) -> Self {
        Self {
            mapping,
            group_filter: Value::from(group_filters.to_vec()),
            host_filter: Value::from(host_filters.to_vec()),
        }
    }

    /// Tables in use
    #[must_use]
    pub fn mapping(&self) -> &FieldMapping {
        &self.mapping
    }

    /// Normalize one raw device
    #[must_use]
    pub fn normalize(&self, device: &RemoteDevice) -> NormalizedDevice {
        let mut fields = Fields::new();
        for (key, value) in device.iter() {
            let target = self.mapping.target_key(key);
            let value = if target == PLATFORM_KEY {
                self.mapping.alias_platform(value).into_owned()
            } else {
                value.clone()
            };
            fields.insert(target, value);
        }
        fields.insert(GROUP_FILTER_KEY.to_string(), self.group_filter.clone());
        fields.insert(HOST_FILTER_KEY.to_string(), self.host_filter.clone());
        NormalizedDevice(fields)
    }
}

/// Inclusion rule for devices flagged as disabled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisabledPolicy {
    /// Drop devices whose disabled flag is a positive integer
    pub exclude_disabled: bool,
}

impl Default for DisabledPolicy {
    fn default() -> Self {
        Self {
            exclude_disabled: true,
        }
    }
}

impl DisabledPolicy {
    /// Decide inclusion from a raw disabled flag value
    #[must_use]
    pub fn includes(&self, disabled: Option<&Value>) -> bool {
        !(self.exclude_disabled && disabled_level(disabled) > 0)
    }
}

/// Integer reading of a disabled flag; null and unparseable values read as 0
fn disabled_level(value: Option<&Value>) -> i64 {
    match value {
        Some(Value::Number(n)) => n
            .as_i64()
            .unwrap_or_else(|| i64::from(n.as_f64().is_some_and(|f| f >= 1.0))),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        Some(Value::Bool(flag)) => i64::from(*flag),
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn device(value: Value) -> RemoteDevice {
        serde_json::from_value(value).unwrap()
    }

    fn router() -> RemoteDevice {
        device(json!({
            "device_id": 12,
            "hostname": "10.0.0.5",
            "sysName": "core-1",
            "disabled": 0,
            "os": "iosxe",
            "location": "Zürich"
        }))
    }

    #[test]
    fn test_keys_are_namespaced_or_renamed() {
        let normalizer = FieldNormalizer::new(FieldMapping::default(), &[], &[]);
        let normalized = normalizer.normalize(&router());

        let keys: Vec<&str> = normalized.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(
            keys,
            [
                "libre_device_id",
                "ansible_host",
                "libre_sysName",
                "libre_disabled",
                "ansible_network_os",
                "libre_location",
                GROUP_FILTER_KEY,
                HOST_FILTER_KEY,
            ]
        );
        assert_eq!(normalized.get("ansible_host"), Some(&json!("10.0.0.5")));
    }

    #[test]
    fn test_platform_alias() {
        let normalizer = FieldNormalizer::new(FieldMapping::default(), &[], &[]);
        let normalized = normalizer.normalize(&router());
        assert_eq!(normalized.get(PLATFORM_KEY), Some(&json!("ios")));
    }

    #[test]
    fn test_unknown_platform_passes_through() {
        let mapping = FieldMapping::default();
        assert_eq!(
            mapping.alias_platform(&json!("junos")).into_owned(),
            json!("junos")
        );
        assert_eq!(mapping.alias_platform(&json!(null)).into_owned(), json!(null));
    }

    #[test]
    fn test_alias_is_idempotent() {
        let mapping = FieldMapping::default();
        let once = mapping.alias_platform(&json!("iosxe")).into_owned();
        let twice = mapping.alias_platform(&once).into_owned();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_custom_platform_alias() {
        let mapping = FieldMapping::default().with_platform_alias("nxos", "nxos");
        let normalizer = FieldNormalizer::new(mapping, &[], &[]);
        let mut raw = router().fields().clone();
        raw.insert("os".to_string(), json!("nxos"));
        let normalized = normalizer.normalize(&RemoteDevice::from_fields(raw).unwrap());
        assert_eq!(normalized.get(PLATFORM_KEY), Some(&json!("nxos")));
    }

    #[test]
    fn test_filters_attached() {
        let groups = vec!["^core-.*".to_string()];
        let hosts = vec!["rtr".to_string(), "sw".to_string()];
        let normalizer = FieldNormalizer::new(FieldMapping::default(), &groups, &hosts);
        let normalized = normalizer.normalize(&router());
        assert_eq!(normalized.get(GROUP_FILTER_KEY), Some(&json!(["^core-.*"])));
        assert_eq!(normalized.get(HOST_FILTER_KEY), Some(&json!(["rtr", "sw"])));
    }

    #[test]
    fn test_custom_namespace() {
        let normalizer = FieldNormalizer::new(FieldMapping::new("nms_"), &[], &[]);
        let normalized = normalizer.normalize(&router());
        assert!(normalized.get("nms_sysName").is_some());
        assert!(normalized.get("libre_sysName").is_none());
    }

    #[test]
    fn test_hostname_from_display_name() {
        let mapping = FieldMapping::default();
        let normalizer = FieldNormalizer::new(mapping.clone(), &[], &[]);
        let normalized = normalizer.normalize(&router());
        assert_eq!(mapping.inventory_hostname(&normalized).as_deref(), Some("core-1"));
    }

    #[test]
    fn test_hostname_is_transliterated() {
        let mapping = FieldMapping::default();
        let normalizer = FieldNormalizer::new(mapping.clone(), &[], &[]);
        let normalized = normalizer.normalize(&device(json!({
            "device_id": 3,
            "hostname": "10.0.0.9",
            "sysName": "Zürich-sw1",
            "disabled": 0,
            "os": "ios"
        })));
        assert_eq!(
            mapping.inventory_hostname(&normalized).as_deref(),
            Some("Zurich-sw1")
        );
    }

    #[test]
    fn test_hostname_falls_back_to_address() {
        let mapping = FieldMapping::default();
        let normalizer = FieldNormalizer::new(mapping.clone(), &[], &[]);

        let empty = normalizer.normalize(&device(json!({
            "device_id": 1,
            "sysName": "",
            "hostname": "10.0.0.5",
            "disabled": 0,
            "os": "ios"
        })));
        assert_eq!(mapping.inventory_hostname(&empty).as_deref(), Some("10.0.0.5"));

        let null = normalizer.normalize(&device(json!({
            "device_id": 2,
            "sysName": null,
            "hostname": "10.0.0.6",
            "disabled": 0,
            "os": "ios"
        })));
        assert_eq!(mapping.inventory_hostname(&null).as_deref(), Some("10.0.0.6"));
    }

    #[test]
    fn test_hostname_unusable() {
        let mapping = FieldMapping::default();
        let normalizer = FieldNormalizer::new(mapping.clone(), &[], &[]);
        let normalized = normalizer.normalize(&device(json!({
            "device_id": 2,
            "sysName": "",
            "hostname": null,
            "disabled": 0,
            "os": "ios"
        })));
        assert_eq!(mapping.inventory_hostname(&normalized), None);
    }

    #[test]
    fn test_rename_prefixed_spellings() {
        let mapping = FieldMapping::default();
        assert_eq!(mapping.rename("libre_hostname"), ADDRESS_KEY);
        assert_eq!(mapping.rename("libre_os"), PLATFORM_KEY);
        assert_eq!(mapping.rename(ADDRESS_KEY), ADDRESS_KEY);
        assert_eq!(mapping.rename("libre_sysName"), "libre_sysName");
    }

    #[test]
    fn test_disabled_zero_always_included() {
        for exclude_disabled in [true, false] {
            let policy = DisabledPolicy { exclude_disabled };
            assert!(policy.includes(Some(&json!(0))));
            assert!(policy.includes(Some(&json!("0"))));
        }
    }

    #[test]
    fn test_disabled_positive_excluded() {
        let policy = DisabledPolicy::default();
        assert!(!policy.includes(Some(&json!(1))));
        assert!(!policy.includes(Some(&json!("1"))));
        assert!(!policy.includes(Some(&json!(true))));
    }

    #[test]
    fn test_disabled_kept_when_flag_off() {
        let policy = DisabledPolicy {
            exclude_disabled: false,
        };
        assert!(policy.includes(Some(&json!(1))));
    }

    #[test]
    fn test_disabled_null_or_garbage_included() {
        let policy = DisabledPolicy::default();
        assert!(policy.includes(None));
        assert!(policy.includes(Some(&json!(null))));
        assert!(policy.includes(Some(&json!("yes"))));
        assert!(policy.includes(Some(&json!(-1))));
    }
}
