//! nmsync-client: HTTP client for the monitoring service
//!
//! Issues authenticated reads against the monitoring API and classifies
//! every response as data, the empty-group condition, or an error.
//!
//! # Example
//!
//! ```no_run
//! use nmsync_client::{ClientConfig, HttpClient, MonitoringApi};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new(ClientConfig::new(
//!     "https://nms.example.net/api/v0",
//!     "secret-token",
//! ))?;
//!
//! for group in client.list_groups().await? {
//!     let members = client.group_members(&group.name).await?;
//!     println!("{}: {} devices", group.name, members.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod http;
pub mod traits;

pub use error::{ClientError, Result};
pub use http::{AUTH_HEADER, ClientConfig, HttpClient};
pub use traits::MonitoringApi;
