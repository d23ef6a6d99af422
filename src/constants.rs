//! Application constants
//!
//! Centralized location for magic strings and configuration defaults.

use std::time::Duration;

/// Default base URL of the dashboard REST API
pub const DEFAULT_API_URL: &str = "http://localhost:8000";

/// Application name
pub const APP_NAME: &str = "SecDash";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the per-user config directory under $HOME
pub const CONFIG_DIR_NAME: &str = ".secdash";

/// Default request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

// Upload-and-poll timing

/// Delay between two file status checks
pub const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Status checks before processing is declared failed
pub const MAX_POLL_ATTEMPTS: u32 = 30;

/// How long the cosmetic "calculating" phase is shown
pub const CALCULATING_HOLD: Duration = Duration::from_secs(2);

/// Synthetic upload progress timer
pub const PROGRESS_TICK: Duration = Duration::from_millis(200);
pub const PROGRESS_STEP: u8 = 10;

/// Upload progress never passes this until the server answers
pub const PROGRESS_CAP: u8 = 90;

// Toasts

pub const TOAST_LIFETIME: Duration = Duration::from_secs(4);
pub const MAX_TOASTS: usize = 4;

/// Detail string the backend returns for unverified accounts
pub const EMAIL_NOT_VERIFIED_DETAIL: &str = "Please verify your email before logging in.";
