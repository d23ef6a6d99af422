//! Render state - data structure sent from App layer to UI for rendering

use crate::app::state::{AdminState, FilesState, LoginForm, Modal, SignupForm, SourcesState};
use crate::messages::ui_events::{InputContext, View};
use crate::models::UserProfile;
use crate::toast::ToastKind;

/// Complete state needed by the UI to render
#[derive(Debug, Clone, Default)]
pub struct RenderState {
    /// Screen, view, open modal and role, also used for key mapping
    pub ctx: InputContext,
    /// Sidebar entries the user may see
    pub views: Vec<View>,
    pub user: Option<UserProfile>,
    pub role: Option<String>,

    // Auth screens
    pub login: LoginForm,
    pub signup: SignupForm,

    // Views
    pub sources: SourcesState,
    pub files: FilesState,
    pub admin: AdminState,

    pub modal: Modal,
    pub toasts: Vec<(ToastKind, String)>,
}
