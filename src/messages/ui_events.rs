//! UI events - messages from UI layer to App layer

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::models::KpiLevel;

/// Top-level screen
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Screen {
    /// Checking the stored session at start-up
    #[default]
    Starting,
    Login,
    Signup,
    Dashboard,
}

/// Sidebar entries
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum View {
    #[default]
    Operational,
    Managerial,
    Strategic,
    Sources,
    Files,
    Admin,
}

impl View {
    pub const ALL: [View; 6] = [
        View::Operational,
        View::Managerial,
        View::Strategic,
        View::Sources,
        View::Files,
        View::Admin,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            View::Operational => "Operational",
            View::Managerial => "Managerial",
            View::Strategic => "Strategic",
            View::Sources => "Sources",
            View::Files => "Files",
            View::Admin => "Admin",
        }
    }

    /// Files and Admin are for superusers only
    pub fn requires_superuser(&self) -> bool {
        matches!(self, View::Files | View::Admin)
    }

    pub fn level(&self) -> Option<KpiLevel> {
        match self {
            View::Operational => Some(KpiLevel::Operational),
            View::Managerial => Some(KpiLevel::Managerial),
            View::Strategic => Some(KpiLevel::Strategic),
            _ => None,
        }
    }

    pub fn for_level(level: KpiLevel) -> View {
        match level {
            KpiLevel::Operational => View::Operational,
            KpiLevel::Managerial => View::Managerial,
            KpiLevel::Strategic => View::Strategic,
        }
    }

    /// Superusers see everything. Everyone else sees the level dashboard of
    /// their role, if it has one, and Sources.
    pub fn visible(is_superuser: bool, role_level: Option<KpiLevel>) -> Vec<View> {
        View::ALL
            .into_iter()
            .filter(|v| match v.level() {
                Some(level) => is_superuser || role_level == Some(level),
                None => is_superuser || !v.requires_superuser(),
            })
            .collect()
    }
}

/// Which modal is open, as far as key mapping cares
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum ModalKind {
    #[default]
    None,
    Upload,
    Form,
    Confirm,
    Picker,
    Help,
}

/// Everything key mapping needs to know about the current UI
#[derive(Clone, Copy, Debug, Default)]
pub struct InputContext {
    pub screen: Screen,
    pub view: View,
    pub modal: ModalKind,
    pub is_superuser: bool,
}

/// Events generated from user input in the UI layer
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    // Navigation
    NextView,
    PrevView,
    SelectView(usize),
    MoveUp,
    MoveDown,
    NextPane,

    // Text input (login, forms, wizard)
    CharInput(char),
    Backspace,
    NextField,
    PrevField,
    Submit,
    Cancel,

    // Auth
    ShowSignup,
    ShowLogin,
    Logout,

    // Sources / admin actions
    Reload,
    CycleLevelFilter,
    NewItem,
    EditItem,
    DeleteItem,

    // Upload wizard
    OpenUpload,
    CycleCategory,
    StepBack,
    RetryUpload,

    // Admin dialogs
    AssignRole,
    EditUserPermissions,
    EditRolePermissions,

    // Popups
    ToggleHelp,
    CloseHelp,

    // System
    Quit,
}

/// Convert a key event to a UiEvent based on current UI context
pub fn key_to_ui_event(key: KeyEvent, ctx: InputContext) -> Option<UiEvent> {
    use crossterm::event::KeyEventKind;

    if key.kind != KeyEventKind::Press {
        return None;
    }

    // Global Ctrl shortcuts
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return match key.code {
            KeyCode::Char('c') => Some(UiEvent::Quit),
            KeyCode::Char('n') if ctx.screen == Screen::Login => Some(UiEvent::ShowSignup),
            _ => None,
        };
    }

    match ctx.screen {
        Screen::Starting => match key.code {
            KeyCode::Char('q') => Some(UiEvent::Quit),
            _ => None,
        },
        Screen::Login | Screen::Signup => handle_auth_keys(key, ctx.screen),
        Screen::Dashboard => match ctx.modal {
            ModalKind::None => handle_dashboard_keys(key, ctx),
            ModalKind::Help => Some(UiEvent::CloseHelp),
            ModalKind::Upload => handle_upload_keys(key),
            ModalKind::Form => handle_form_keys(key),
            ModalKind::Confirm => match key.code {
                KeyCode::Char('y') | KeyCode::Enter => Some(UiEvent::Submit),
                KeyCode::Char('n') | KeyCode::Esc => Some(UiEvent::Cancel),
                _ => None,
            },
            ModalKind::Picker => match key.code {
                KeyCode::Up => Some(UiEvent::MoveUp),
                KeyCode::Down => Some(UiEvent::MoveDown),
                KeyCode::Char(' ') | KeyCode::Enter => Some(UiEvent::Submit),
                KeyCode::Esc | KeyCode::Char('q') => Some(UiEvent::Cancel),
                _ => None,
            },
        },
    }
}

fn handle_auth_keys(key: KeyEvent, screen: Screen) -> Option<UiEvent> {
    match key.code {
        KeyCode::Esc if screen == Screen::Signup => Some(UiEvent::ShowLogin),
        KeyCode::Tab | KeyCode::Down => Some(UiEvent::NextField),
        KeyCode::BackTab | KeyCode::Up => Some(UiEvent::PrevField),
        KeyCode::Enter => Some(UiEvent::Submit),
        KeyCode::Backspace => Some(UiEvent::Backspace),
        KeyCode::Char(c) => Some(UiEvent::CharInput(c)),
        _ => None,
    }
}

fn handle_dashboard_keys(key: KeyEvent, ctx: InputContext) -> Option<UiEvent> {
    let manage = ctx.is_superuser;
    match key.code {
        KeyCode::Char('q') => Some(UiEvent::Quit),
        KeyCode::Char('?') => Some(UiEvent::ToggleHelp),
        KeyCode::Char('L') => Some(UiEvent::Logout),
        KeyCode::Right => Some(UiEvent::NextView),
        KeyCode::Left => Some(UiEvent::PrevView),
        KeyCode::Char(c @ '1'..='6') => Some(UiEvent::SelectView(c as usize - '1' as usize)),
        KeyCode::Up | KeyCode::Char('k') => Some(UiEvent::MoveUp),
        KeyCode::Down | KeyCode::Char('j') => Some(UiEvent::MoveDown),
        KeyCode::Char('u') => Some(UiEvent::OpenUpload),
        KeyCode::Char('r') => Some(UiEvent::Reload),
        _ => match ctx.view {
            View::Sources => match key.code {
                KeyCode::Tab => Some(UiEvent::NextPane),
                KeyCode::Char('l') => Some(UiEvent::CycleLevelFilter),
                KeyCode::Char('n') if manage => Some(UiEvent::NewItem),
                KeyCode::Char('e') | KeyCode::Enter if manage => Some(UiEvent::EditItem),
                KeyCode::Char('d') if manage => Some(UiEvent::DeleteItem),
                _ => None,
            },
            View::Admin if manage => match key.code {
                KeyCode::Tab => Some(UiEvent::NextPane),
                KeyCode::Char('a') => Some(UiEvent::AssignRole),
                KeyCode::Char('p') => Some(UiEvent::EditUserPermissions),
                KeyCode::Char('o') => Some(UiEvent::EditRolePermissions),
                KeyCode::Char('d') => Some(UiEvent::DeleteItem),
                _ => None,
            },
            _ => None,
        },
    }
}

/// The wizard owns every printable key: they go to the search box or the
/// file path, depending on the step
fn handle_upload_keys(key: KeyEvent) -> Option<UiEvent> {
    match key.code {
        KeyCode::Esc => Some(UiEvent::Cancel),
        KeyCode::Enter => Some(UiEvent::Submit),
        KeyCode::Up => Some(UiEvent::MoveUp),
        KeyCode::Down => Some(UiEvent::MoveDown),
        KeyCode::Tab => Some(UiEvent::CycleCategory),
        KeyCode::BackTab => Some(UiEvent::StepBack),
        KeyCode::F(5) => Some(UiEvent::RetryUpload),
        KeyCode::Backspace => Some(UiEvent::Backspace),
        KeyCode::Char(c) => Some(UiEvent::CharInput(c)),
        _ => None,
    }
}

fn handle_form_keys(key: KeyEvent) -> Option<UiEvent> {
    match key.code {
        KeyCode::Esc => Some(UiEvent::Cancel),
        KeyCode::Enter => Some(UiEvent::Submit),
        KeyCode::Tab | KeyCode::Down => Some(UiEvent::NextField),
        KeyCode::BackTab | KeyCode::Up => Some(UiEvent::PrevField),
        KeyCode::Backspace => Some(UiEvent::Backspace),
        KeyCode::Char(c) => Some(UiEvent::CharInput(c)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn dashboard(view: View, is_superuser: bool) -> InputContext {
        InputContext {
            screen: Screen::Dashboard,
            view,
            modal: ModalKind::None,
            is_superuser,
        }
    }

    #[test]
    fn test_edit_keys_are_inert_for_regular_users() {
        let ctx = dashboard(View::Sources, false);
        for code in [KeyCode::Char('n'), KeyCode::Char('e'), KeyCode::Enter, KeyCode::Char('d')] {
            assert_eq!(key_to_ui_event(press(code), ctx), None);
        }
        assert_eq!(key_to_ui_event(press(KeyCode::Char('l')), ctx), Some(UiEvent::CycleLevelFilter));

        let ctx = dashboard(View::Sources, true);
        assert_eq!(key_to_ui_event(press(KeyCode::Char('d')), ctx), Some(UiEvent::DeleteItem));
    }

    #[test]
    fn test_admin_actions_need_superuser() {
        assert_eq!(key_to_ui_event(press(KeyCode::Char('p')), dashboard(View::Admin, false)), None);
        assert_eq!(
            key_to_ui_event(press(KeyCode::Char('p')), dashboard(View::Admin, true)),
            Some(UiEvent::EditUserPermissions)
        );
    }

    #[test]
    fn test_wizard_captures_letters() {
        let ctx = InputContext {
            modal: ModalKind::Upload,
            ..dashboard(View::Files, true)
        };
        assert_eq!(key_to_ui_event(press(KeyCode::Char('q')), ctx), Some(UiEvent::CharInput('q')));
        assert_eq!(key_to_ui_event(press(KeyCode::Esc), ctx), Some(UiEvent::Cancel));
    }

    #[test]
    fn test_ctrl_c_always_quits() {
        let ctx = InputContext {
            screen: Screen::Login,
            ..Default::default()
        };
        let key = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(key_to_ui_event(key, ctx), Some(UiEvent::Quit));
    }

    #[test]
    fn test_hidden_views() {
        let strategic = View::visible(false, Some(KpiLevel::Strategic));
        assert_eq!(strategic, vec![View::Strategic, View::Sources]);
        assert_eq!(View::visible(false, None), vec![View::Sources]);
        assert_eq!(View::visible(true, None).len(), 6);
        assert_eq!(View::visible(true, Some(KpiLevel::Managerial)).len(), 6);
    }
}
