//! App state - pure data structure with no I/O logic

use std::time::Duration;

use crate::app::forms::{ConfirmDialog, FormDialog, Picker};
use crate::app::upload::UploadWizard;
use crate::messages::ui_events::{InputContext, ModalKind, Screen, View};
use crate::messages::RenderState;
use crate::models::{AdminUser, DashboardStats, FileRecord, Kpi, KpiLevel, Permission, Role, Tool, UserProfile};
use crate::toast::Toasts;

#[derive(Clone, Debug, Default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    /// 0 = email, 1 = password
    pub focus: usize,
    pub error: Option<String>,
    pub email_not_verified: bool,
    pub submitting: bool,
}

impl LoginForm {
    pub const FIELDS: usize = 2;

    pub fn field_mut(&mut self) -> &mut String {
        match self.focus {
            0 => &mut self.email,
            _ => &mut self.password,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SignupForm {
    pub email: String,
    pub username: String,
    pub password: String,
    /// 0 = email, 1 = username, 2 = password
    pub focus: usize,
    pub error: Option<String>,
    pub submitting: bool,
}

impl SignupForm {
    pub const FIELDS: usize = 3;

    pub fn field_mut(&mut self) -> &mut String {
        match self.focus {
            0 => &mut self.email,
            1 => &mut self.username,
            _ => &mut self.password,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SourcesPane {
    #[default]
    Kpis,
    Tools,
}

#[derive(Clone, Debug, Default)]
pub struct SourcesState {
    pub kpis: Vec<Kpi>,
    pub tools: Vec<Tool>,
    pub stats: Option<DashboardStats>,
    /// None shows every level
    pub level_filter: Option<KpiLevel>,
    pub pane: SourcesPane,
    pub selected_kpi: usize,
    pub selected_tool: usize,
    pub loading: bool,
}

impl SourcesState {
    pub fn filtered_kpis(&self) -> Vec<&Kpi> {
        self.kpis
            .iter()
            .filter(|k| self.level_filter.map_or(true, |level| level.matches(&k.level)))
            .collect()
    }

    pub fn selected_kpi(&self) -> Option<&Kpi> {
        self.filtered_kpis().get(self.selected_kpi).copied()
    }

    pub fn selected_tool(&self) -> Option<&Tool> {
        self.tools.get(self.selected_tool)
    }
}

#[derive(Clone, Debug, Default)]
pub struct FilesState {
    pub files: Vec<FileRecord>,
    pub selected: usize,
    pub loading: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AdminPane {
    #[default]
    Users,
    Roles,
}

/// Summary cards on top of the admin panel
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UserCounts {
    pub total: usize,
    pub admins: usize,
    pub active: usize,
    pub verified: usize,
}

#[derive(Clone, Debug, Default)]
pub struct AdminState {
    pub users: Vec<AdminUser>,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
    pub pane: AdminPane,
    pub selected_user: usize,
    pub selected_role: usize,
    pub loading: bool,
}

impl AdminState {
    pub fn counts(&self) -> UserCounts {
        UserCounts {
            total: self.users.len(),
            admins: self.users.iter().filter(|u| u.is_superuser).count(),
            active: self.users.iter().filter(|u| u.is_active).count(),
            verified: self.users.iter().filter(|u| u.is_verified).count(),
        }
    }

    pub fn selected_user(&self) -> Option<&AdminUser> {
        self.users.get(self.selected_user)
    }

    pub fn selected_role(&self) -> Option<&Role> {
        self.roles.get(self.selected_role)
    }
}

/// At most one dialog is open over the dashboard
#[derive(Clone, Debug, Default)]
pub enum Modal {
    #[default]
    None,
    Help,
    Upload(UploadWizard),
    Form(FormDialog),
    Confirm(ConfirmDialog),
    Picker(Picker),
}

impl Modal {
    pub fn kind(&self) -> ModalKind {
        match self {
            Modal::None => ModalKind::None,
            Modal::Help => ModalKind::Help,
            Modal::Upload(_) => ModalKind::Upload,
            Modal::Form(_) => ModalKind::Form,
            Modal::Confirm(_) => ModalKind::Confirm,
            Modal::Picker(_) => ModalKind::Picker,
        }
    }
}

/// Main application state - pure data, no I/O
pub struct AppState {
    pub screen: Screen,
    pub view: View,
    pub user: Option<UserProfile>,
    /// Role name from the API; picks the level dashboard
    pub role: Option<String>,

    // Auth screens
    pub login: LoginForm,
    pub signup: SignupForm,

    // Views
    pub sources: SourcesState,
    pub files: FilesState,
    pub admin: AdminState,

    // Dialogs and notifications
    pub modal: Modal,
    pub toasts: Toasts,

    pub next_request_id: u64,
}

impl AppState {
    pub fn new(toast_lifetime: Duration) -> Self {
        AppState {
            screen: Screen::Starting,
            view: View::Operational,
            user: None,
            role: None,
            login: LoginForm::default(),
            signup: SignupForm::default(),
            sources: SourcesState::default(),
            files: FilesState::default(),
            admin: AdminState::default(),
            modal: Modal::None,
            toasts: Toasts::new(toast_lifetime),
            next_request_id: 1,
        }
    }

    /// Generate a unique request ID
    pub fn next_id(&mut self) -> u64 {
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }

    /// Superusers manage KPIs, tools and users
    pub fn can_manage(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.is_superuser)
    }

    pub fn role_level(&self) -> Option<KpiLevel> {
        self.role.as_deref().and_then(KpiLevel::for_role)
    }

    pub fn visible_views(&self) -> Vec<View> {
        View::visible(self.can_manage(), self.role_level())
    }

    /// First view after sign-in: the role's dashboard when there is one
    pub fn home_view(&self) -> View {
        match self.role_level() {
            Some(level) => View::for_level(level),
            None if self.can_manage() => View::Operational,
            None => View::Sources,
        }
    }

    pub fn input_context(&self) -> InputContext {
        InputContext {
            screen: self.screen,
            view: self.view,
            modal: self.modal.kind(),
            is_superuser: self.can_manage(),
        }
    }

    /// Convert state to RenderState for UI
    pub fn to_render_state(&self) -> RenderState {
        RenderState {
            ctx: self.input_context(),
            views: self.visible_views(),
            user: self.user.clone(),
            role: self.role.clone(),
            login: self.login.clone(),
            signup: self.signup.clone(),
            sources: self.sources.clone(),
            files: self.files.clone(),
            admin: self.admin.clone(),
            modal: self.modal.clone(),
            toasts: self
                .toasts
                .iter()
                .map(|t| (t.kind, t.message.clone()))
                .collect(),
        }
    }
}
