//! nmsync-api: Shared wire types
//!
//! Contains the records and response envelopes returned by the monitoring
//! service, shared by the HTTP client and the synchronization engine.

pub mod responses;
pub mod types;

pub use responses::{
    ApiStatus, DeviceResponse, EMPTY_GROUP_SENTINEL, Envelope, GroupMembersResponse,
    GroupsResponse, Reply,
};
pub use types::{DeviceRef, Fields, MissingField, RemoteDevice, RemoteGroup, parse_device_id};
