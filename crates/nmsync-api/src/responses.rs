//! Response envelopes for the monitoring API

use serde::{Deserialize, Serialize};

use crate::types::{DeviceRef, Fields, RemoteGroup};

/// Error message the service returns for a group without members
pub const EMPTY_GROUP_SENTINEL: &str = "No devices found in group";

/// Application-level status carried in every response body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiStatus {
    Ok,
    Error,
    #[serde(other)]
    Unknown,
}

/// Status fields common to every response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub status: ApiStatus,
    #[serde(default)]
    pub message: Option<String>,
}

/// Body of `GET /devicegroups`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupsResponse {
    #[serde(default)]
    pub groups: Vec<RemoteGroup>,
}

/// Body of `GET /devicegroups/{name}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupMembersResponse {
    #[serde(default)]
    pub devices: Vec<DeviceRef>,
}

/// Body of `GET /devices/{id}`
///
/// Records are kept raw here; the client validates them into
/// [`RemoteDevice`](crate::RemoteDevice) so a missing field is reported by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceResponse {
    #[serde(default)]
    pub devices: Vec<Fields>,
}

/// Classified outcome of a single API read
#[derive(Debug, Clone, PartialEq)]
pub enum Reply<T> {
    /// The service reported success
    Data(T),
    /// The service reported the empty-group condition
    Empty,
    /// The service reported any other error
    Error(String),
}

impl<T> Reply<T> {
    /// Transform the payload of a successful reply
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Reply<U> {
        match self {
            Reply::Data(data) => Reply::Data(f(data)),
            Reply::Empty => Reply::Empty,
            Reply::Error(message) => Reply::Error(message),
        }
    }

    /// Check for the empty variant
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Reply::Empty)
    }
}

impl Envelope {
    /// Classify the envelope of a decoded body
    ///
    /// Anything other than an explicit `"error"` status counts as success.
    #[must_use]
    pub fn classify(&self) -> Reply<()> {
        match self.status {
            ApiStatus::Error => {
                let message = self.message.clone().unwrap_or_default();
                if message.contains(EMPTY_GROUP_SENTINEL) {
                    Reply::Empty
                } else {
                    Reply::Error(message)
                }
            }
            ApiStatus::Ok | ApiStatus::Unknown => Reply::Data(()),
        }
    }
}
