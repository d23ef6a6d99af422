//! App actor - message loop processing UI events and network responses

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::app::state::AppState;
use crate::messages::{NetworkCommand, NetworkResponse, RenderState, UiEvent};

/// How often toasts are checked for expiry
const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// App actor that processes UI events and network responses
pub struct AppActor {
    state: AppState,
    network_tx: mpsc::UnboundedSender<NetworkCommand>,
    render_tx: mpsc::UnboundedSender<RenderState>,
}

impl AppActor {
    pub fn new(
        network_tx: mpsc::UnboundedSender<NetworkCommand>,
        render_tx: mpsc::UnboundedSender<RenderState>,
        toast_lifetime: Duration,
    ) -> Self {
        AppActor {
            state: AppState::new(toast_lifetime),
            network_tx,
            render_tx,
        }
    }

    /// Run the actor message loop
    pub async fn run(
        mut self,
        mut ui_rx: mpsc::UnboundedReceiver<UiEvent>,
        mut net_rx: mpsc::UnboundedReceiver<NetworkResponse>,
    ) {
        // Send initial render state
        let _ = self.render_tx.send(self.state.to_render_state());
        self.send(NetworkCommand::RestoreSession);

        let mut ticker = tokio::time::interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                Some(event) = ui_rx.recv() => {
                    if self.handle_ui_event(event) {
                        // Quit signal received
                        let _ = self.network_tx.send(NetworkCommand::Shutdown);
                        break;
                    }
                    let _ = self.render_tx.send(self.state.to_render_state());
                }
                Some(response) = net_rx.recv() => {
                    for cmd in self.state.handle_response(response) {
                        self.send(cmd);
                    }
                    let _ = self.render_tx.send(self.state.to_render_state());
                }
                _ = ticker.tick() => {
                    if self.state.tick() {
                        let _ = self.render_tx.send(self.state.to_render_state());
                    }
                }
                else => break,
            }
        }
    }

    fn send(&self, cmd: NetworkCommand) {
        let _ = self.network_tx.send(cmd);
    }

    fn send_opt(&self, cmd: Option<NetworkCommand>) {
        if let Some(cmd) = cmd {
            self.send(cmd);
        }
    }

    /// Handle a UI event, returns true if quit was requested
    fn handle_ui_event(&mut self, event: UiEvent) -> bool {
        match event {
            // Navigation
            UiEvent::NextView => {
                let cmd = self.state.next_view();
                self.send_opt(cmd);
            }
            UiEvent::PrevView => {
                let cmd = self.state.prev_view();
                self.send_opt(cmd);
            }
            UiEvent::SelectView(index) => {
                let cmd = self.state.select_view(index);
                self.send_opt(cmd);
            }
            UiEvent::MoveUp => self.state.move_up(),
            UiEvent::MoveDown => self.state.move_down(),
            UiEvent::NextPane => self.state.next_pane(),

            // Text input
            UiEvent::CharInput(c) => self.state.enter_char(c),
            UiEvent::Backspace => self.state.delete_char(),
            UiEvent::NextField => self.state.next_field(),
            UiEvent::PrevField => self.state.prev_field(),
            UiEvent::Submit => {
                let cmd = self.state.submit();
                self.send_opt(cmd);
            }
            UiEvent::Cancel => {
                let cmd = self.state.cancel();
                self.send_opt(cmd);
            }

            // Auth
            UiEvent::ShowSignup => self.state.show_signup(),
            UiEvent::ShowLogin => self.state.show_login(),
            UiEvent::Logout => {
                for cmd in self.state.logout() {
                    self.send(cmd);
                }
            }

            // Sources / admin
            UiEvent::Reload => {
                let cmd = self.state.reload();
                self.send_opt(cmd);
            }
            UiEvent::CycleLevelFilter => self.state.cycle_level_filter(),
            UiEvent::NewItem => self.state.new_item(),
            UiEvent::EditItem => self.state.edit_item(),
            UiEvent::DeleteItem => self.state.delete_item(),
            UiEvent::AssignRole => self.state.assign_role(),
            UiEvent::EditUserPermissions => self.state.edit_user_permissions(),
            UiEvent::EditRolePermissions => {
                let cmd = self.state.edit_role_permissions();
                self.send_opt(cmd);
            }

            // Upload wizard
            UiEvent::OpenUpload => {
                let cmd = self.state.open_upload();
                self.send_opt(cmd);
            }
            UiEvent::CycleCategory => self.state.cycle_category(),
            UiEvent::StepBack => self.state.step_back(),
            UiEvent::RetryUpload => {
                let cmd = self.state.retry_upload();
                self.send_opt(cmd);
            }

            // Popups
            UiEvent::ToggleHelp => self.state.toggle_help(),
            UiEvent::CloseHelp => self.state.close_help(),

            // System
            UiEvent::Quit => return true,
        }

        false
    }
}
