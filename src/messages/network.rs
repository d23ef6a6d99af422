//! Network messages - communication between App and Network layers

use std::path::PathBuf;

use crate::models::{
    AdminUser, DashboardStats, FileRecord, Kpi, KpiDraft, Permission, Role, Tool, ToolDraft,
    UserProfile,
};
use crate::network::upload::UploadEvent;

/// Commands sent from App layer to Network layer
#[derive(Debug, Clone)]
pub enum NetworkCommand {
    // Session
    RestoreSession,
    Login { email: String, password: String },
    Signup { email: String, username: String, password: String },
    Logout,
    /// Which level dashboard the user gets
    LoadUserRole(i64),

    // Sources view: KPIs, tools and stats in one go
    LoadSources,
    SaveKpi { id: Option<i64>, draft: KpiDraft },
    DeleteKpi(i64),
    SaveTool { id: Option<i64>, draft: ToolDraft },
    DeleteTool(i64),

    // Upload wizard
    LoadUploadTools,
    LoadFiles,
    StartUpload { id: u64, tool_id: i64, path: PathBuf },
    CancelUpload(u64),

    // Admin
    LoadAdmin,
    DeleteUser(i64),
    AssignRole { user_id: i64, role_id: i64 },
    SetUserPermission { user_id: i64, permission_id: i64, granted: bool },
    LoadRolePermissions(i64),
    SetRolePermission { role_id: i64, permission_id: i64, granted: bool },

    /// Shutdown the network actor
    Shutdown,
}

/// Responses sent from Network layer to App layer
#[derive(Debug, Clone)]
pub enum NetworkResponse {
    // Session
    SessionRestored(Option<UserProfile>),
    LoggedIn(UserProfile),
    /// Role name of the signed-in user; `None` when unassigned or unavailable
    UserRoleLoaded(Option<String>),
    LoginFailed { message: String, email_not_verified: bool },
    SignedUp,
    /// Refresh failed somewhere; tokens are gone
    SessionExpired,

    // Data
    SourcesLoaded {
        kpis: Vec<Kpi>,
        tools: Vec<Tool>,
        stats: Option<DashboardStats>,
    },
    UploadToolsLoaded(Vec<Tool>),
    /// Tool catalogue could not be fetched; the wizard falls back to defaults
    UploadToolsUnavailable(String),
    FilesLoaded(Vec<FileRecord>),
    AdminLoaded {
        users: Vec<AdminUser>,
        roles: Vec<Role>,
        permissions: Vec<Permission>,
    },
    RolePermissionsLoaded { role_id: i64, permissions: Vec<Permission> },

    /// A mutation succeeded; `message` goes into a toast
    Saved { message: String, reload: ReloadTarget },

    Upload { id: u64, event: UploadEvent },

    /// Any failed request; `message` goes into an error toast
    Failed { message: String },
}

/// Which view to refresh after a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadTarget {
    Sources,
    Admin,
    RolePermissions(i64),
}
