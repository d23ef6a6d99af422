//! # SecDash TUI
//!
//! A terminal client for the security KPI dashboard API.
//!
//! ## Features
//! - Sign in, sign up, persistent session with transparent token refresh
//! - Operational, Managerial and Strategic KPI dashboards
//! - KPI and tool management (superusers)
//! - Report upload wizard with processing status polling
//! - Uploaded files list and admin panel for users, roles and permissions
//!
//! ## Architecture
//! Actor-based with channels:
//! - UI Layer (Ratatui) - synchronous
//! - App Layer (State machine)
//! - Network Layer (Tokio runtime)

pub mod app;
pub mod config;
pub mod constants;
pub mod dashboard;
pub mod error;
pub mod messages;
pub mod models;
pub mod network;
pub mod storage;
pub mod toast;
pub mod ui;

// Re-export commonly used types
pub use app::{AppActor, AppState};
pub use config::{AppConfig, Cli};
pub use error::{ApiError, ApiResult};
pub use messages::{NetworkCommand, NetworkResponse, RenderState, UiEvent};
pub use network::{ApiClient, NetworkActor};
pub use storage::TokenStore;
