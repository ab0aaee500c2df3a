//! Instance group provider for GitLab runner autoscaling on IONOS Cloud.
//!
//! This crate keeps a pool of IONOS servers in sync with the capacity an
//! autoscaling host asks for. The host drives a small lifecycle contract
//! ([`InstanceGroup`]): grow the pool, shrink it, sweep current instance
//! states, and resolve connection details for a single instance. The provider
//! translates those calls into Cloud API requests and enforces what the API
//! does not: consistent naming and ownership of the pool's servers, a
//! monotone per-run instance index, and the mapping between IONOS VM states
//! and the host's lifecycle vocabulary.
//!
//! # Example
//!
//! ```rust,ignore
//! use fleeting_ionos::{InstanceGroup, InstanceGroupConfig, IonosInstanceGroup, Settings};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = InstanceGroupConfig::from_file("group.json")?;
//!     let group = IonosInstanceGroup::new(config, Settings::default())?;
//!
//!     let info = group.init().await?;
//!     println!("managing {} (max {})", info.id, info.max_size);
//!
//!     let (created, err) = group.increase(&CancellationToken::new(), 3).await;
//!     println!("created {created} instances, error: {err:?}");
//!     Ok(())
//! }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod compute;
pub mod config;
pub mod group;
pub mod keys;
pub mod provider;
pub mod state;

pub use config::{InstanceGroupConfig, ServerSpec, ServerType};
pub use group::IonosInstanceGroup;
pub use provider::{
    ConnectInfo, ConnectorConfig, InstanceGroup, ProviderError, ProviderInfo, Settings,
};
pub use state::InstanceState;
