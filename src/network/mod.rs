//! Network layer - REST calls and report uploads
//!
//! The Network actor receives commands and sends back responses.

pub mod actor;
pub mod client;
pub mod upload;

pub use actor::NetworkActor;
pub use client::ApiClient;
