//! IONOS Cloud API surface used by the instance group.

mod client;
pub mod models;

pub use client::{Auth, ComputeClient};
