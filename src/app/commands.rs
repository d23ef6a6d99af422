//! Command handlers - business logic for processing UI events

use crate::app::forms::{ConfirmAction, ConfirmDialog, FormDialog, Picker, PickerItem, PickerKind};
use crate::app::state::{
    AdminPane, AdminState, FilesState, LoginForm, Modal, SignupForm, SourcesPane, SourcesState,
};
use crate::app::upload::{UploadWizard, WizardStep};
use crate::app::AppState;
use crate::messages::network::ReloadTarget;
use crate::messages::ui_events::{Screen, View};
use crate::messages::{NetworkCommand, NetworkResponse};
use crate::models::{KpiLevel, Permission};
use crate::network::upload::UploadEvent;

impl AppState {
    // ========================
    // Navigation
    // ========================

    pub fn next_view(&mut self) -> Option<NetworkCommand> {
        let views = self.visible_views();
        let i = views.iter().position(|v| *v == self.view).unwrap_or(0);
        self.switch_view(views[(i + 1) % views.len()])
    }

    pub fn prev_view(&mut self) -> Option<NetworkCommand> {
        let views = self.visible_views();
        let i = views.iter().position(|v| *v == self.view).unwrap_or(0);
        self.switch_view(views[(i + views.len() - 1) % views.len()])
    }

    /// Select by sidebar position, counting only visible entries
    pub fn select_view(&mut self, index: usize) -> Option<NetworkCommand> {
        let view = *self.visible_views().get(index)?;
        self.switch_view(view)
    }

    fn switch_view(&mut self, view: View) -> Option<NetworkCommand> {
        if !self.visible_views().contains(&view) {
            return None;
        }
        if self.view == view {
            return None;
        }
        self.view = view;
        self.reload()
    }

    /// Fetch whatever the current view shows
    pub fn reload(&mut self) -> Option<NetworkCommand> {
        match self.view {
            View::Sources => {
                self.sources.loading = true;
                Some(NetworkCommand::LoadSources)
            }
            View::Files if self.can_manage() => {
                self.files.loading = true;
                Some(NetworkCommand::LoadFiles)
            }
            View::Admin if self.can_manage() => {
                self.admin.loading = true;
                Some(NetworkCommand::LoadAdmin)
            }
            _ => None,
        }
    }

    pub fn move_up(&mut self) {
        match &mut self.modal {
            Modal::Upload(wizard) => wizard.move_up(),
            Modal::Picker(picker) => picker.move_up(),
            Modal::None => {
                let selected = match (self.view, self.sources.pane, self.admin.pane) {
                    (View::Sources, SourcesPane::Kpis, _) => &mut self.sources.selected_kpi,
                    (View::Sources, SourcesPane::Tools, _) => &mut self.sources.selected_tool,
                    (View::Files, _, _) => &mut self.files.selected,
                    (View::Admin, _, AdminPane::Users) => &mut self.admin.selected_user,
                    (View::Admin, _, AdminPane::Roles) => &mut self.admin.selected_role,
                    _ => return,
                };
                *selected = selected.saturating_sub(1);
            }
            _ => {}
        }
    }

    pub fn move_down(&mut self) {
        match &mut self.modal {
            Modal::Upload(wizard) => wizard.move_down(),
            Modal::Picker(picker) => picker.move_down(),
            Modal::None => {
                let kpi_count = self.sources.filtered_kpis().len();
                let (selected, len) = match (self.view, self.sources.pane, self.admin.pane) {
                    (View::Sources, SourcesPane::Kpis, _) => (&mut self.sources.selected_kpi, kpi_count),
                    (View::Sources, SourcesPane::Tools, _) => {
                        (&mut self.sources.selected_tool, self.sources.tools.len())
                    }
                    (View::Files, _, _) => (&mut self.files.selected, self.files.files.len()),
                    (View::Admin, _, AdminPane::Users) => {
                        (&mut self.admin.selected_user, self.admin.users.len())
                    }
                    (View::Admin, _, AdminPane::Roles) => {
                        (&mut self.admin.selected_role, self.admin.roles.len())
                    }
                    _ => return,
                };
                if *selected + 1 < len {
                    *selected += 1;
                }
            }
            _ => {}
        }
    }

    pub fn next_pane(&mut self) {
        match self.view {
            View::Sources => {
                self.sources.pane = match self.sources.pane {
                    SourcesPane::Kpis => SourcesPane::Tools,
                    SourcesPane::Tools => SourcesPane::Kpis,
                }
            }
            View::Admin => {
                self.admin.pane = match self.admin.pane {
                    AdminPane::Users => AdminPane::Roles,
                    AdminPane::Roles => AdminPane::Users,
                }
            }
            _ => {}
        }
    }

    // ========================
    // Text input
    // ========================

    pub fn enter_char(&mut self, c: char) {
        match self.screen {
            Screen::Login => self.login.field_mut().push(c),
            Screen::Signup => self.signup.field_mut().push(c),
            Screen::Dashboard => match &mut self.modal {
                Modal::Upload(wizard) => wizard.input_char(c),
                Modal::Form(form) => form.input_char(c),
                _ => {}
            },
            Screen::Starting => {}
        }
    }

    pub fn delete_char(&mut self) {
        match self.screen {
            Screen::Login => {
                self.login.field_mut().pop();
            }
            Screen::Signup => {
                self.signup.field_mut().pop();
            }
            Screen::Dashboard => match &mut self.modal {
                Modal::Upload(wizard) => wizard.backspace(),
                Modal::Form(form) => form.backspace(),
                _ => {}
            },
            Screen::Starting => {}
        }
    }

    pub fn next_field(&mut self) {
        match self.screen {
            Screen::Login => self.login.focus = (self.login.focus + 1) % LoginForm::FIELDS,
            Screen::Signup => self.signup.focus = (self.signup.focus + 1) % SignupForm::FIELDS,
            Screen::Dashboard => {
                if let Modal::Form(form) = &mut self.modal {
                    form.next_field();
                }
            }
            Screen::Starting => {}
        }
    }

    pub fn prev_field(&mut self) {
        match self.screen {
            Screen::Login => {
                self.login.focus = (self.login.focus + LoginForm::FIELDS - 1) % LoginForm::FIELDS
            }
            Screen::Signup => {
                self.signup.focus = (self.signup.focus + SignupForm::FIELDS - 1) % SignupForm::FIELDS
            }
            Screen::Dashboard => {
                if let Modal::Form(form) = &mut self.modal {
                    form.prev_field();
                }
            }
            Screen::Starting => {}
        }
    }

    /// Enter: sign in, sign up, or confirm the open dialog
    pub fn submit(&mut self) -> Option<NetworkCommand> {
        match self.screen {
            Screen::Login => self.submit_login(),
            Screen::Signup => self.submit_signup(),
            Screen::Dashboard => self.submit_modal(),
            Screen::Starting => None,
        }
    }

    fn submit_login(&mut self) -> Option<NetworkCommand> {
        let login = &mut self.login;
        if login.submitting {
            return None;
        }
        if login.email.trim().is_empty() || login.password.is_empty() {
            login.error = Some(String::from("Email and password are required"));
            return None;
        }
        login.error = None;
        login.email_not_verified = false;
        login.submitting = true;
        Some(NetworkCommand::Login {
            email: login.email.trim().to_string(),
            password: login.password.clone(),
        })
    }

    fn submit_signup(&mut self) -> Option<NetworkCommand> {
        let signup = &mut self.signup;
        if signup.submitting {
            return None;
        }
        if signup.email.trim().is_empty()
            || signup.username.trim().is_empty()
            || signup.password.is_empty()
        {
            signup.error = Some(String::from("All fields are required"));
            return None;
        }
        signup.error = None;
        signup.submitting = true;
        Some(NetworkCommand::Signup {
            email: signup.email.trim().to_string(),
            username: signup.username.trim().to_string(),
            password: signup.password.clone(),
        })
    }

    fn submit_modal(&mut self) -> Option<NetworkCommand> {
        match &mut self.modal {
            Modal::Upload(wizard) => match wizard.step {
                WizardStep::SelectTool => {
                    wizard.choose_tool();
                    None
                }
                WizardStep::SelectFile => {
                    let id = self.next_request_id;
                    let cmd = wizard.begin_upload(id);
                    if cmd.is_some() {
                        self.next_request_id += 1;
                    }
                    cmd
                }
                WizardStep::Processing => None,
                WizardStep::Complete => {
                    self.modal = Modal::None;
                    None
                }
            },
            Modal::Form(form) => form.submit(),
            Modal::Confirm(confirm) => {
                let cmd = confirm.action.command();
                self.modal = Modal::None;
                Some(cmd)
            }
            Modal::Picker(picker) => {
                let cmd = picker.activate();
                if matches!(picker.kind, PickerKind::AssignRole { .. }) && cmd.is_some() {
                    self.modal = Modal::None;
                }
                cmd
            }
            Modal::None | Modal::Help => None,
        }
    }

    /// Esc: close the open dialog; a running upload is cancelled
    pub fn cancel(&mut self) -> Option<NetworkCommand> {
        match std::mem::take(&mut self.modal) {
            Modal::Upload(mut wizard) => wizard.close(),
            _ => None,
        }
    }

    // ========================
    // Auth
    // ========================

    pub fn show_signup(&mut self) {
        self.signup = SignupForm::default();
        self.screen = Screen::Signup;
    }

    pub fn show_login(&mut self) {
        self.login.error = None;
        self.login.submitting = false;
        self.screen = Screen::Login;
    }

    /// Any running upload is cancelled before the tokens are dropped
    pub fn logout(&mut self) -> Vec<NetworkCommand> {
        tracing::info!("Signing out");
        let cancel = self.end_session();
        self.toasts.info("Signed out");
        cancel.into_iter().chain([NetworkCommand::Logout]).collect()
    }

    /// Drop everything tied to the signed-in user
    fn end_session(&mut self) -> Option<NetworkCommand> {
        let cancel = self.cancel();
        self.user = None;
        self.role = None;
        self.view = View::Operational;
        self.sources = SourcesState::default();
        self.files = FilesState::default();
        self.admin = AdminState::default();
        self.login = LoginForm {
            email: std::mem::take(&mut self.login.email),
            ..LoginForm::default()
        };
        self.screen = Screen::Login;
        cancel
    }

    // ========================
    // Sources and admin actions
    // ========================

    pub fn cycle_level_filter(&mut self) {
        self.sources.level_filter = match self.sources.level_filter {
            None => Some(KpiLevel::Operational),
            Some(KpiLevel::Strategic) => None,
            Some(level) => Some(level.next()),
        };
        self.sources.selected_kpi = 0;
    }

    pub fn new_item(&mut self) {
        if !self.can_manage() || self.view != View::Sources {
            return;
        }
        self.modal = Modal::Form(match self.sources.pane {
            SourcesPane::Kpis => FormDialog::kpi(None),
            SourcesPane::Tools => FormDialog::tool(None),
        });
    }

    pub fn edit_item(&mut self) {
        if !self.can_manage() || self.view != View::Sources {
            return;
        }
        let form = match self.sources.pane {
            SourcesPane::Kpis => self.sources.selected_kpi().map(|k| FormDialog::kpi(Some(k))),
            SourcesPane::Tools => self.sources.selected_tool().map(|t| FormDialog::tool(Some(t))),
        };
        if let Some(form) = form {
            self.modal = Modal::Form(form);
        }
    }

    pub fn delete_item(&mut self) {
        if !self.can_manage() {
            return;
        }
        let confirm = match (self.view, self.sources.pane) {
            (View::Sources, SourcesPane::Kpis) => self.sources.selected_kpi().map(|k| ConfirmDialog {
                action: ConfirmAction::DeleteKpi(k.id),
                subject: k.name.clone(),
            }),
            (View::Sources, SourcesPane::Tools) => {
                self.sources.selected_tool().map(|t| ConfirmDialog {
                    action: ConfirmAction::DeleteTool(t.id),
                    subject: t.name.clone(),
                })
            }
            (View::Admin, _) if self.admin.pane == AdminPane::Users => {
                self.admin.selected_user().map(|u| ConfirmDialog {
                    action: ConfirmAction::DeleteUser(u.id),
                    subject: u.email.clone(),
                })
            }
            _ => None,
        };
        if let Some(confirm) = confirm {
            self.modal = Modal::Confirm(confirm);
        }
    }

    pub fn assign_role(&mut self) {
        if !self.can_manage() || self.view != View::Admin {
            return;
        }
        let Some(user) = self.admin.selected_user() else {
            return;
        };
        let current = user.role.as_ref().map(|r| r.id);
        let items = self
            .admin
            .roles
            .iter()
            .map(|r| PickerItem {
                id: r.id,
                label: r.name.clone(),
                checked: Some(r.id) == current,
            })
            .collect();
        let picker = Picker::new(
            PickerKind::AssignRole { user_id: user.id },
            format!(" Role for {} ", user.username),
            items,
        );
        self.modal = Modal::Picker(picker);
    }

    pub fn edit_user_permissions(&mut self) {
        if !self.can_manage() || self.view != View::Admin {
            return;
        }
        let Some(user) = self.admin.selected_user() else {
            return;
        };
        let items = permission_items(&self.admin.permissions, |id| user.has_permission(id));
        let picker = Picker::new(
            PickerKind::UserPermissions { user_id: user.id },
            format!(" Permissions for {} ", user.username),
            items,
        );
        self.modal = Modal::Picker(picker);
    }

    pub fn edit_role_permissions(&mut self) -> Option<NetworkCommand> {
        if !self.can_manage() || self.view != View::Admin {
            return None;
        }
        let role = self.admin.selected_role()?;
        let role_id = role.id;
        let mut picker = Picker::new(
            PickerKind::RolePermissions { role_id },
            format!(" Permissions of role {} ", role.name),
            Vec::new(),
        );
        picker.loading = true;
        self.modal = Modal::Picker(picker);
        Some(NetworkCommand::LoadRolePermissions(role_id))
    }

    // ========================
    // Upload wizard
    // ========================

    pub fn open_upload(&mut self) -> Option<NetworkCommand> {
        if !matches!(self.modal, Modal::None) {
            return None;
        }
        self.modal = Modal::Upload(UploadWizard::new());
        Some(NetworkCommand::LoadUploadTools)
    }

    pub fn cycle_category(&mut self) {
        if let Modal::Upload(wizard) = &mut self.modal {
            wizard.cycle_category();
        }
    }

    pub fn step_back(&mut self) {
        if let Modal::Upload(wizard) = &mut self.modal {
            wizard.step_back();
        }
    }

    pub fn retry_upload(&mut self) -> Option<NetworkCommand> {
        let id = self.next_request_id;
        let Modal::Upload(wizard) = &mut self.modal else {
            return None;
        };
        let cmd = wizard.retry(id);
        if cmd.is_some() {
            self.next_request_id += 1;
        }
        cmd
    }

    // ========================
    // Popups
    // ========================

    pub fn toggle_help(&mut self) {
        self.modal = match self.modal {
            Modal::None => Modal::Help,
            Modal::Help => Modal::None,
            _ => return,
        };
    }

    pub fn close_help(&mut self) {
        if matches!(self.modal, Modal::Help) {
            self.modal = Modal::None;
        }
    }

    /// Expire toasts; returns true if a redraw is needed
    pub fn tick(&mut self) -> bool {
        self.toasts.expire(std::time::Instant::now())
    }

    // ========================
    // Network responses
    // ========================

    /// Apply a response; returns follow-up commands (reloads, cancels)
    pub fn handle_response(&mut self, response: NetworkResponse) -> Vec<NetworkCommand> {
        match response {
            // The dashboard opens once the role is known
            NetworkResponse::SessionRestored(Some(user)) | NetworkResponse::LoggedIn(user) => {
                tracing::info!(user = %user.username, superuser = user.is_superuser, "Signed in");
                let user_id = user.id;
                self.login = LoginForm::default();
                self.user = Some(user);
                self.role = None;
                self.screen = Screen::Starting;
                return vec![NetworkCommand::LoadUserRole(user_id)];
            }
            NetworkResponse::UserRoleLoaded(role) => {
                if self.user.is_none() || self.screen != Screen::Starting {
                    return Vec::new();
                }
                tracing::info!(role = role.as_deref().unwrap_or("none"), "Role loaded");
                self.role = role;
                self.view = self.home_view();
                self.screen = Screen::Dashboard;
                return self.reload().into_iter().collect();
            }
            NetworkResponse::SessionRestored(None) => {
                self.screen = Screen::Login;
            }
            NetworkResponse::LoginFailed { message, email_not_verified } => {
                self.login.submitting = false;
                self.login.email_not_verified = email_not_verified;
                self.login.error = Some(message);
            }
            NetworkResponse::SignedUp => {
                let email = std::mem::take(&mut self.signup.email);
                self.signup = SignupForm::default();
                self.login = LoginForm {
                    email,
                    focus: 1,
                    ..LoginForm::default()
                };
                self.screen = Screen::Login;
                self.toasts
                    .success("Account created. Check your inbox to verify your email.");
            }
            NetworkResponse::SessionExpired => {
                return self.expire_session();
            }

            NetworkResponse::SourcesLoaded { kpis, tools, stats } => {
                self.sources.kpis = kpis;
                self.sources.tools = tools;
                self.sources.stats = stats;
                self.sources.loading = false;
                let kpi_count = self.sources.filtered_kpis().len();
                self.sources.selected_kpi = clamp(self.sources.selected_kpi, kpi_count);
                self.sources.selected_tool = clamp(self.sources.selected_tool, self.sources.tools.len());
            }
            NetworkResponse::UploadToolsLoaded(tools) => {
                if let Modal::Upload(wizard) = &mut self.modal {
                    wizard.set_tools(tools);
                }
            }
            NetworkResponse::UploadToolsUnavailable(message) => {
                tracing::warn!(%message, "Using the built-in tool list");
                if let Modal::Upload(wizard) = &mut self.modal {
                    wizard.use_fallback_tools();
                }
            }
            NetworkResponse::FilesLoaded(files) => {
                self.files.selected = clamp(self.files.selected, files.len());
                self.files.files = files;
                self.files.loading = false;
            }
            NetworkResponse::AdminLoaded { users, roles, permissions } => {
                self.admin.selected_user = clamp(self.admin.selected_user, users.len());
                self.admin.selected_role = clamp(self.admin.selected_role, roles.len());
                self.admin.users = users;
                self.admin.roles = roles;
                self.admin.permissions = permissions;
                self.admin.loading = false;
                self.refresh_user_picker();
            }
            NetworkResponse::RolePermissionsLoaded { role_id, permissions: granted } => {
                if let Modal::Picker(picker) = &mut self.modal {
                    if picker.kind == (PickerKind::RolePermissions { role_id }) {
                        let selected = picker.selected;
                        picker.items = permission_items(&self.admin.permissions, |id| {
                            granted.iter().any(|p| p.id == id)
                        });
                        picker.selected = clamp(selected, picker.items.len());
                        picker.loading = false;
                    }
                }
            }

            NetworkResponse::Saved { message, reload } => {
                self.toasts.success(message);
                if matches!(self.modal, Modal::Form(_)) {
                    self.modal = Modal::None;
                }
                let cmd = match reload {
                    ReloadTarget::Sources => {
                        self.sources.loading = true;
                        NetworkCommand::LoadSources
                    }
                    ReloadTarget::Admin => {
                        self.admin.loading = true;
                        NetworkCommand::LoadAdmin
                    }
                    ReloadTarget::RolePermissions(role_id) => {
                        NetworkCommand::LoadRolePermissions(role_id)
                    }
                };
                return vec![cmd];
            }

            NetworkResponse::Upload { id, event } => {
                if let UploadEvent::Failed { session_expired: true, .. } = event {
                    return self.expire_session();
                }
                let Modal::Upload(wizard) = &mut self.modal else {
                    return Vec::new();
                };
                let finished = matches!(event, UploadEvent::Complete(_));
                if wizard.apply(id, event) && finished {
                    self.toasts.success("File processed successfully");
                    if self.view == View::Files {
                        return self.reload().into_iter().collect();
                    }
                }
            }

            NetworkResponse::Failed { message } => {
                self.login.submitting = false;
                self.signup.submitting = false;
                if self.screen == Screen::Signup {
                    self.signup.error = Some(message.clone());
                }
                self.sources.loading = false;
                self.files.loading = false;
                self.admin.loading = false;
                let resync = match &mut self.modal {
                    Modal::Form(form) => {
                        form.saving = false;
                        form.error = Some(message.clone());
                        None
                    }
                    // The picker flipped its checkbox before the request went out
                    Modal::Picker(picker) => {
                        picker.loading = false;
                        Some(match picker.kind {
                            PickerKind::RolePermissions { role_id } => {
                                NetworkCommand::LoadRolePermissions(role_id)
                            }
                            _ => NetworkCommand::LoadAdmin,
                        })
                    }
                    _ => None,
                };
                self.toasts.error(message);
                return resync.into_iter().collect();
            }
        }
        Vec::new()
    }

    fn expire_session(&mut self) -> Vec<NetworkCommand> {
        if self.user.is_none() {
            return Vec::new();
        }
        tracing::warn!("Session expired, returning to login");
        let cancel = self.end_session();
        self.toasts.error("Session expired. Please sign in again.");
        cancel.into_iter().collect()
    }

    fn refresh_user_picker(&mut self) {
        let Modal::Picker(picker) = &mut self.modal else {
            return;
        };
        let PickerKind::UserPermissions { user_id } = picker.kind else {
            return;
        };
        let Some(user) = self.admin.users.iter().find(|u| u.id == user_id) else {
            self.modal = Modal::None;
            return;
        };
        for item in &mut picker.items {
            item.checked = user.has_permission(item.id);
        }
    }
}

fn permission_items(permissions: &[Permission], granted: impl Fn(i64) -> bool) -> Vec<PickerItem> {
    permissions
        .iter()
        .map(|p| PickerItem {
            id: p.id,
            label: p.name.clone(),
            checked: granted(p.id),
        })
        .collect()
}

fn clamp(selected: usize, len: usize) -> usize {
    selected.min(len.saturating_sub(1))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::models::{FileRecord, FileStatus, Kpi, UserProfile};

    fn user(is_superuser: bool) -> UserProfile {
        UserProfile {
            id: 1,
            email: "ana@example.com".into(),
            username: "ana".into(),
            is_active: true,
            is_superuser,
            created_at: None,
            updated_at: None,
        }
    }

    fn signed_in_as(is_superuser: bool, role: Option<&str>) -> AppState {
        let mut state = AppState::new(Duration::from_secs(4));
        state.handle_response(NetworkResponse::LoggedIn(user(is_superuser)));
        state.handle_response(NetworkResponse::UserRoleLoaded(role.map(String::from)));
        state
    }

    fn signed_in(is_superuser: bool) -> AppState {
        signed_in_as(is_superuser, Some("Viewer"))
    }

    fn kpi(id: i64, level: &str) -> Kpi {
        serde_json::from_value(serde_json::json!({
            "id": id, "name": format!("kpi {}", id), "level": level, "type": "ratio",
            "target": "90", "frequency": "daily"
        }))
        .unwrap()
    }

    #[test]
    fn test_regular_user_cannot_edit_or_reach_admin() {
        let mut state = signed_in(false);
        assert_eq!(state.visible_views(), vec![View::Operational, View::Sources]);
        assert!(state.select_view(4).is_none());
        assert!(state.switch_view(View::Admin).is_none());
        assert_eq!(state.view, View::Operational);

        assert!(matches!(state.select_view(1), Some(NetworkCommand::LoadSources)));
        state.handle_response(NetworkResponse::SourcesLoaded {
            kpis: vec![kpi(1, "operational")],
            tools: Vec::new(),
            stats: None,
        });
        state.new_item();
        state.edit_item();
        state.delete_item();
        assert!(matches!(state.modal, Modal::None));
    }

    #[test]
    fn test_superuser_delete_goes_through_confirmation() {
        let mut state = signed_in(true);
        state.select_view(3);
        state.handle_response(NetworkResponse::SourcesLoaded {
            kpis: vec![kpi(1, "operational"), kpi(2, "strategic")],
            tools: Vec::new(),
            stats: None,
        });
        state.move_down();
        state.delete_item();
        assert!(matches!(state.modal, Modal::Confirm(_)));
        assert!(matches!(state.submit(), Some(NetworkCommand::DeleteKpi(2))));
        assert!(matches!(state.modal, Modal::None));

        let follow_up = state.handle_response(NetworkResponse::Saved {
            message: "KPI deleted successfully".into(),
            reload: ReloadTarget::Sources,
        });
        assert!(matches!(follow_up.as_slice(), [NetworkCommand::LoadSources]));
        assert_eq!(state.toasts.len(), 1);
    }

    #[test]
    fn test_dashboard_follows_the_users_role() {
        let mut state = AppState::new(Duration::from_secs(4));
        let follow_up = state.handle_response(NetworkResponse::LoggedIn(user(false)));
        assert!(matches!(follow_up.as_slice(), [NetworkCommand::LoadUserRole(1)]));
        // Nothing is shown until the role is known
        assert_eq!(state.screen, Screen::Starting);

        state.handle_response(NetworkResponse::UserRoleLoaded(Some("Strategic".into())));
        assert_eq!(state.screen, Screen::Dashboard);
        assert_eq!(state.view, View::Strategic);
        assert_eq!(state.visible_views(), vec![View::Strategic, View::Sources]);
        assert!(state.switch_view(View::Operational).is_none());
        assert!(state.switch_view(View::Managerial).is_none());
        state.next_view();
        state.next_view();
        assert_eq!(state.view, View::Strategic);

        let state = signed_in_as(false, Some("Managerial"));
        assert_eq!(state.view, View::Managerial);
        let state = signed_in_as(false, Some("viewer"));
        assert_eq!(state.view, View::Operational);
    }

    #[test]
    fn test_role_without_dashboard_lands_on_sources() {
        let mut state = AppState::new(Duration::from_secs(4));
        state.handle_response(NetworkResponse::LoggedIn(user(false)));
        let follow_up = state.handle_response(NetworkResponse::UserRoleLoaded(None));
        assert_eq!(state.view, View::Sources);
        assert!(matches!(follow_up.as_slice(), [NetworkCommand::LoadSources]));
        assert_eq!(state.visible_views(), vec![View::Sources]);

        // Superusers keep every level and start on their own
        let state = signed_in_as(true, Some("Managerial"));
        assert_eq!(state.view, View::Managerial);
        assert_eq!(state.visible_views().len(), 6);
        let state = signed_in_as(true, None);
        assert_eq!(state.view, View::Operational);
    }

    #[test]
    fn test_late_role_after_logout_is_ignored() {
        let mut state = AppState::new(Duration::from_secs(4));
        state.handle_response(NetworkResponse::LoggedIn(user(false)));
        state.logout();
        state.handle_response(NetworkResponse::UserRoleLoaded(Some("Strategic".into())));
        assert_eq!(state.screen, Screen::Login);
        assert!(state.role.is_none());
    }

    #[test]
    fn test_logout_cancels_running_upload() {
        let mut state = signed_in(true);
        state.open_upload();
        state.handle_response(NetworkResponse::UploadToolsLoaded(crate::app::upload::fallback_tools()));
        state.submit();
        state.enter_char('x');
        let Some(NetworkCommand::StartUpload { id, .. }) = state.submit() else {
            panic!("upload not started")
        };

        let cmds = state.logout();
        assert!(matches!(
            cmds.as_slice(),
            [NetworkCommand::CancelUpload(i), NetworkCommand::Logout] if *i == id
        ));
        assert_eq!(state.screen, Screen::Login);
        assert!(matches!(state.logout().as_slice(), [NetworkCommand::Logout]));
    }

    #[test]
    fn test_level_filter_cycles_back_to_all() {
        let mut state = signed_in(false);
        state.handle_response(NetworkResponse::SourcesLoaded {
            kpis: vec![kpi(1, "Operational"), kpi(2, "managerial"), kpi(3, "managerial")],
            tools: Vec::new(),
            stats: None,
        });
        state.cycle_level_filter();
        assert_eq!(state.sources.filtered_kpis().len(), 1);
        state.cycle_level_filter();
        assert_eq!(state.sources.filtered_kpis().len(), 2);
        state.cycle_level_filter();
        state.cycle_level_filter();
        assert_eq!(state.sources.level_filter, None);
        assert_eq!(state.sources.filtered_kpis().len(), 3);
    }

    #[test]
    fn test_upload_submit_is_noop_without_file() {
        let mut state = signed_in(true);
        assert!(matches!(state.open_upload(), Some(NetworkCommand::LoadUploadTools)));
        state.handle_response(NetworkResponse::UploadToolsUnavailable("down".into()));
        assert!(state.submit().is_none());
        let Modal::Upload(wizard) = &state.modal else { panic!("wizard closed") };
        assert_eq!(wizard.step, WizardStep::SelectFile);

        assert!(state.submit().is_none());
        for c in "/tmp/scan.nessus".chars() {
            state.enter_char(c);
        }
        assert!(matches!(state.submit(), Some(NetworkCommand::StartUpload { tool_id: 1, .. })));
    }

    #[test]
    fn test_closing_wizard_cancels_upload() {
        let mut state = signed_in(true);
        state.open_upload();
        state.handle_response(NetworkResponse::UploadToolsLoaded(crate::app::upload::fallback_tools()));
        state.submit();
        for c in "scan.csv".chars() {
            state.enter_char(c);
        }
        let Some(NetworkCommand::StartUpload { id, .. }) = state.submit() else {
            panic!("upload not started")
        };
        assert!(matches!(state.cancel(), Some(NetworkCommand::CancelUpload(i)) if i == id));

        // Late events from the cancelled upload change nothing
        let follow_up = state.handle_response(NetworkResponse::Upload {
            id,
            event: UploadEvent::Progress(50),
        });
        assert!(follow_up.is_empty());
        assert!(matches!(state.modal, Modal::None));
    }

    #[test]
    fn test_session_expiry_returns_to_login() {
        let mut state = signed_in(true);
        state.open_upload();
        state.handle_response(NetworkResponse::UploadToolsLoaded(crate::app::upload::fallback_tools()));
        state.submit();
        state.enter_char('x');
        state.submit();

        let follow_up = state.handle_response(NetworkResponse::SessionExpired);
        assert!(matches!(follow_up.as_slice(), [NetworkCommand::CancelUpload(_)]));
        assert_eq!(state.screen, Screen::Login);
        assert!(state.user.is_none());
        assert!(matches!(state.modal, Modal::None));
    }

    #[test]
    fn test_completed_upload_reloads_files_view() {
        let mut state = signed_in(true);
        state.select_view(4);
        state.open_upload();
        state.handle_response(NetworkResponse::UploadToolsLoaded(crate::app::upload::fallback_tools()));
        state.submit();
        state.enter_char('x');
        let Some(NetworkCommand::StartUpload { id, .. }) = state.submit() else {
            panic!("upload not started")
        };
        let record = FileRecord {
            id: 3,
            filename: "x".into(),
            file_type: None,
            size: None,
            status: FileStatus::Processed,
            created_at: None,
        };
        let follow_up = state.handle_response(NetworkResponse::Upload {
            id,
            event: UploadEvent::Complete(record),
        });
        assert!(matches!(follow_up.as_slice(), [NetworkCommand::LoadFiles]));
        state.submit();
        assert!(matches!(state.modal, Modal::None));
    }

    #[test]
    fn test_unverified_login_is_flagged() {
        let mut state = AppState::new(Duration::from_secs(4));
        state.handle_response(NetworkResponse::SessionRestored(None));
        assert_eq!(state.screen, Screen::Login);
        assert!(state.submit().is_none());

        for c in "ana@example.com".chars() {
            state.enter_char(c);
        }
        state.next_field();
        state.enter_char('p');
        assert!(matches!(state.submit(), Some(NetworkCommand::Login { .. })));
        assert!(state.submit().is_none());

        state.handle_response(NetworkResponse::LoginFailed {
            message: crate::constants::EMAIL_NOT_VERIFIED_DETAIL.into(),
            email_not_verified: true,
        });
        assert!(state.login.email_not_verified);
        assert!(!state.login.submitting);
    }

    #[test]
    fn test_signup_returns_to_login_with_email() {
        let mut state = AppState::new(Duration::from_secs(4));
        state.show_signup();
        for c in "new@example.com".chars() {
            state.enter_char(c);
        }
        state.next_field();
        state.enter_char('n');
        state.next_field();
        state.enter_char('p');
        assert!(matches!(state.submit(), Some(NetworkCommand::Signup { .. })));
        state.handle_response(NetworkResponse::SignedUp);
        assert_eq!(state.screen, Screen::Login);
        assert_eq!(state.login.email, "new@example.com");
    }

    #[test]
    fn test_failed_permission_toggle_resyncs() {
        let mut state = signed_in(true);
        state.select_view(5);
        state.handle_response(NetworkResponse::AdminLoaded {
            users: vec![serde_json::from_value(serde_json::json!({
                "id": 4, "email": "bo@example.com", "username": "bo",
                "permissions": [{"id": 9, "name": "files:read"}]
            }))
            .unwrap()],
            roles: Vec::new(),
            permissions: vec![serde_json::from_value(serde_json::json!({"id": 9, "name": "files:read"}))
                .unwrap()],
        });
        state.edit_user_permissions();
        assert!(matches!(
            state.submit(),
            Some(NetworkCommand::SetUserPermission { user_id: 4, permission_id: 9, granted: false })
        ));

        let follow_up =
            state.handle_response(NetworkResponse::Failed { message: "Failed to update permissions".into() });
        assert!(matches!(follow_up.as_slice(), [NetworkCommand::LoadAdmin]));
        assert_eq!(state.admin.counts().total, 1);
    }
}
