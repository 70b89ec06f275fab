//! Expansion of groups into device records

use std::sync::Arc;

use nmsync_api::{DeviceRef, RemoteDevice, RemoteGroup};
use nmsync_client::{ClientError, MonitoringApi};
use tracing::{debug, instrument};

/// Resolves group members into full device records, one request per device
#[derive(Clone)]
pub struct DeviceResolver {
    api: Arc<dyn MonitoringApi>,
}

impl DeviceResolver {
    pub fn new(api: Arc<dyn MonitoringApi>) -> Self {
        Self { api }
    }

    /// List the members of a group
    ///
    /// # Errors
    /// Returns an error if the service rejects the request; a group without
    /// members yields an empty list.
    #[instrument(skip(self, group), fields(group = %group.name))]
    pub async fn devices_of(&self, group: &RemoteGroup) -> Result<Vec<DeviceRef>, ClientError> {
        let members = self.api.group_members(&group.name).await?;
        debug!(count = members.len(), "resolved group members");
        Ok(members)
    }

    /// Fetch the full record of a member
    ///
    /// # Errors
    /// Returns an error if the request fails or the record is malformed.
    pub async fn resolve(&self, device: DeviceRef) -> Result<RemoteDevice, ClientError> {
        self.api.device(device.device_id).await
    }
}

impl std::fmt::Debug for DeviceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceResolver").finish_non_exhaustive()
    }
}
