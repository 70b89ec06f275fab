//! Monitoring API trait

use async_trait::async_trait;
use nmsync_api::{DeviceRef, RemoteDevice, RemoteGroup};

use crate::error::Result;

/// Read-only view of the monitoring service used by the sync engine
#[async_trait]
pub trait MonitoringApi: Send + Sync {
    /// List every device group
    async fn list_groups(&self) -> Result<Vec<RemoteGroup>>;

    /// List the members of a group; a group without members yields an empty list
    async fn group_members(&self, group: &str) -> Result<Vec<DeviceRef>>;

    /// Fetch the full record of one device
    async fn device(&self, device_id: u64) -> Result<RemoteDevice>;
}
