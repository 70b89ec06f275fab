//! Records returned by the monitoring service

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Ordered mapping of raw field names to scalar values
pub type Fields = serde_json::Map<String, Value>;

/// A device group as listed by `GET /devicegroups`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteGroup {
    /// Group name, also used as the path segment for member lookups
    pub name: String,
    /// Names of nested groups, when the service reports them
    #[serde(default)]
    pub children: Vec<String>,
}

impl RemoteGroup {
    /// Create a group without children
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
        }
    }
}

/// Reference to a group member, as returned by `GET /devicegroups/{name}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRef {
    /// Remote device identifier; numeric strings are accepted
    #[serde(deserialize_with = "deserialize_device_id")]
    pub device_id: u64,
}

/// Read a device identifier given as a number or a numeric string
#[must_use]
pub fn parse_device_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn deserialize_device_id<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    parse_device_id(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid device_id: {value}")))
}

/// A required field was absent from a device record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("device record missing required field `{0}`")]
pub struct MissingField(pub &'static str);

/// Full raw attribute set of one device
///
/// Field order is preserved as received. Construction checks that the
/// fields listed in [`RemoteDevice::REQUIRED_FIELDS`] are present; their
/// values may still be `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Fields", into = "Fields")]
pub struct RemoteDevice {
    fields: Fields,
}

impl RemoteDevice {
    /// Unique identifier field
    pub const ID: &'static str = "device_id";
    /// Display name field, used for host filtering and inventory naming
    pub const DISPLAY_NAME: &'static str = "sysName";
    /// Primary address field
    pub const ADDRESS: &'static str = "hostname";
    /// Disabled flag field
    pub const DISABLED: &'static str = "disabled";
    /// Platform identifier field
    pub const PLATFORM: &'static str = "os";

    /// Fields every device record must carry
    pub const REQUIRED_FIELDS: [&'static str; 5] = [
        Self::ID,
        Self::DISPLAY_NAME,
        Self::ADDRESS,
        Self::DISABLED,
        Self::PLATFORM,
    ];

    /// Validate and wrap a raw field map
    ///
    /// # Errors
    /// Returns the first required field that is missing.
    pub fn from_fields(fields: Fields) -> Result<Self, MissingField> {
        if let Some(missing) = Self::REQUIRED_FIELDS
            .iter()
            .find(|key| !fields.contains_key(**key))
        {
            return Err(MissingField(*missing));
        }
        Ok(Self { fields })
    }

    /// Look up a raw field
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Remote identifier, if numeric
    #[must_use]
    pub fn device_id(&self) -> Option<u64> {
        parse_device_id(self.fields.get(Self::ID)?)
    }

    /// Display name, or the empty string when null
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.fields
            .get(Self::DISPLAY_NAME)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Raw disabled flag
    #[must_use]
    pub fn disabled(&self) -> Option<&Value> {
        self.fields.get(Self::DISABLED)
    }

    /// Iterate fields in received order
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Borrow the underlying field map
    #[must_use]
    pub fn fields(&self) -> &Fields {
        &self.fields
    }
}

impl TryFrom<Fields> for RemoteDevice {
    type Error = MissingField;

    fn try_from(fields: Fields) -> Result<Self, Self::Error> {
        Self::from_fields(fields)
    }
}

impl From<RemoteDevice> for Fields {
    fn from(device: RemoteDevice) -> Self {
        device.fields
    }
}
