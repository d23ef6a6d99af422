//! Network actor - runs API calls and report uploads in the Tokio runtime

use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;

use crate::error::{ApiError, ApiResult};
use crate::messages::network::ReloadTarget;
use crate::messages::{NetworkCommand, NetworkResponse};
use crate::network::client::{ApiClient, ReportFile};
use crate::network::upload::{run_upload, PollPolicy, UploadEvent};

/// Network actor that processes API commands
pub struct NetworkActor {
    client: ApiClient,
    policy: PollPolicy,
    response_tx: mpsc::UnboundedSender<NetworkResponse>,
    /// Finished tasks yield the upload id they were running, if any
    active_requests: JoinSet<Option<u64>>,
    uploads: HashMap<u64, oneshot::Sender<()>>,
}

impl NetworkActor {
    pub fn new(
        client: ApiClient,
        policy: PollPolicy,
        response_tx: mpsc::UnboundedSender<NetworkResponse>,
    ) -> Self {
        NetworkActor {
            client,
            policy,
            response_tx,
            active_requests: JoinSet::new(),
            uploads: HashMap::new(),
        }
    }

    /// Run the network actor message loop
    pub async fn run(mut self, mut cmd_rx: mpsc::UnboundedReceiver<NetworkCommand>) {
        loop {
            tokio::select! {
                biased;

                cmd = cmd_rx.recv() => {
                    match cmd {
                        Some(NetworkCommand::Shutdown) | None => {
                            // Dropping the cancel senders stops every upload
                            for (id, _) in self.uploads.drain() {
                                tracing::info!(id, "Cancelling upload on shutdown");
                            }
                            self.active_requests.abort_all();
                            break;
                        }
                        Some(cmd) => self.handle(cmd),
                    }
                }

                Some(result) = self.active_requests.join_next() => {
                    match result {
                        Ok(Some(upload_id)) => {
                            self.uploads.remove(&upload_id);
                        }
                        Ok(None) => {}
                        Err(e) => tracing::error!(error = %e, "Request task died"),
                    }
                }
            }
        }
    }

    /// Spawn a request task; `work` returns the response to send back
    fn spawn<F, Fut>(&mut self, fallback: &'static str, work: F)
    where
        F: FnOnce(ApiClient) -> Fut,
        Fut: Future<Output = ApiResult<NetworkResponse>> + Send + 'static,
    {
        let response_tx = self.response_tx.clone();
        let fut = work(self.client.clone());
        self.active_requests.spawn(async move {
            let response = match fut.await {
                Ok(response) => response,
                Err(e) => error_response(e, fallback),
            };
            let _ = response_tx.send(response);
            None
        });
    }

    fn handle(&mut self, cmd: NetworkCommand) {
        match cmd {
            NetworkCommand::RestoreSession => {
                self.spawn("Failed to restore session", |client| async move {
                    if !client.has_session().await {
                        return Ok(NetworkResponse::SessionRestored(None));
                    }
                    match client.profile().await {
                        Ok(profile) => Ok(NetworkResponse::SessionRestored(Some(profile))),
                        Err(e) => {
                            tracing::info!(error = %e, "Stored session is no longer valid");
                            client.logout().await;
                            Ok(NetworkResponse::SessionRestored(None))
                        }
                    }
                });
            }

            NetworkCommand::Login { email, password } => {
                self.spawn("Login failed", |client| async move {
                    tracing::info!(email = %email, "Signing in");
                    if let Err(e) = client.login(&email, &password).await {
                        let message = e.user_message("Login failed");
                        let email_not_verified = e.status() == Some(403)
                            && message == crate::constants::EMAIL_NOT_VERIFIED_DETAIL;
                        return Ok(NetworkResponse::LoginFailed { message, email_not_verified });
                    }
                    Ok(NetworkResponse::LoggedIn(client.profile().await?))
                });
            }

            NetworkCommand::LoadUserRole(user_id) => {
                self.spawn("Failed to fetch role", |client| async move {
                    match client.user_role(user_id).await {
                        Ok(role) => Ok(NetworkResponse::UserRoleLoaded(role.map(|r| r.name))),
                        Err(e) if e.is_session_expired() => Err(e),
                        Err(e) => {
                            tracing::warn!(user_id, error = %e, "Role unavailable");
                            Ok(NetworkResponse::UserRoleLoaded(None))
                        }
                    }
                });
            }

            NetworkCommand::Signup { email, username, password } => {
                self.spawn("Signup failed", |client| async move {
                    client.signup(&email, &username, &password).await?;
                    tracing::info!(email = %email, "Account created");
                    Ok(NetworkResponse::SignedUp)
                });
            }

            NetworkCommand::Logout => {
                let client = self.client.clone();
                self.active_requests.spawn(async move {
                    client.logout().await;
                    None
                });
            }

            NetworkCommand::LoadSources => {
                self.spawn("Failed to fetch dashboard data", |client| async move {
                    let (kpis, tools, stats) =
                        tokio::join!(client.list_kpis(), client.list_tools(), client.stats());
                    // Stats are admin-only; their absence does not fail the view
                    let stats = stats
                        .map_err(|e| tracing::debug!(error = %e, "Stats unavailable"))
                        .ok();
                    Ok(NetworkResponse::SourcesLoaded { kpis: kpis?, tools: tools?, stats })
                });
            }

            NetworkCommand::SaveKpi { id, draft } => {
                self.spawn("Error saving KPI", |client| async move {
                    let message = match id {
                        Some(id) => {
                            client.update_kpi(id, &draft).await?;
                            "KPI updated successfully"
                        }
                        None => {
                            client.create_kpi(&draft).await?;
                            "KPI created successfully"
                        }
                    };
                    Ok(saved(message, ReloadTarget::Sources))
                });
            }

            NetworkCommand::DeleteKpi(id) => {
                self.spawn("Failed to delete KPI", |client| async move {
                    client.delete_kpi(id).await?;
                    Ok(saved("KPI deleted successfully", ReloadTarget::Sources))
                });
            }

            NetworkCommand::SaveTool { id, draft } => {
                self.spawn("Error saving tool", |client| async move {
                    let message = match id {
                        Some(id) => {
                            client.update_tool(id, &draft).await?;
                            "Tool updated successfully"
                        }
                        None => {
                            client.create_tool(&draft).await?;
                            "Tool created successfully"
                        }
                    };
                    Ok(saved(message, ReloadTarget::Sources))
                });
            }

            NetworkCommand::DeleteTool(id) => {
                self.spawn("Failed to delete tool", |client| async move {
                    client.delete_tool(id).await?;
                    Ok(saved("Tool deleted successfully", ReloadTarget::Sources))
                });
            }

            NetworkCommand::LoadUploadTools => {
                self.spawn("Failed to fetch tools", |client| async move {
                    match client.list_tools().await {
                        Ok(tools) => Ok(NetworkResponse::UploadToolsLoaded(tools)),
                        Err(e) if e.is_session_expired() => Err(e),
                        Err(e) => Ok(NetworkResponse::UploadToolsUnavailable(
                            e.user_message("Failed to fetch tools"),
                        )),
                    }
                });
            }

            NetworkCommand::LoadFiles => {
                self.spawn("Failed to fetch files", |client| async move {
                    Ok(NetworkResponse::FilesLoaded(client.list_files().await?))
                });
            }

            NetworkCommand::StartUpload { id, tool_id, path } => {
                // Every attempt, retries included, gets a fresh id from the app
                let (cancel_tx, cancel_rx) = oneshot::channel();
                self.uploads.insert(id, cancel_tx);

                let client = self.client.clone();
                let policy = self.policy;
                let response_tx = self.response_tx.clone();
                self.active_requests.spawn(async move {
                    let file = match ReportFile::read(&path).await {
                        Ok(file) => file,
                        Err(e) => {
                            let _ = response_tx.send(NetworkResponse::Upload {
                                id,
                                event: UploadEvent::Failed {
                                    message: format!("Cannot read {}: {}", path.display(), e),
                                    session_expired: false,
                                },
                            });
                            return Some(id);
                        }
                    };

                    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
                    let forward = {
                        let response_tx = response_tx.clone();
                        async move {
                            while let Some(event) = event_rx.recv().await {
                                let _ = response_tx.send(NetworkResponse::Upload { id, event });
                            }
                        }
                    };
                    let upload = AssertUnwindSafe(run_upload(
                        &client, tool_id, file, policy, event_tx, cancel_rx,
                    ))
                    .catch_unwind();
                    let (outcome, _) = tokio::join!(upload, forward);
                    match outcome {
                        Ok(outcome) => tracing::info!(id, ?outcome, "Upload task finished"),
                        Err(_) => {
                            // The wizard would otherwise wait on this id forever
                            tracing::error!(id, "Upload task panicked");
                            let _ = response_tx.send(NetworkResponse::Upload {
                                id,
                                event: UploadEvent::Failed {
                                    message: String::from("Upload failed unexpectedly"),
                                    session_expired: false,
                                },
                            });
                        }
                    }
                    Some(id)
                });
            }

            NetworkCommand::CancelUpload(id) => {
                if let Some(cancel_tx) = self.uploads.remove(&id) {
                    tracing::info!(id, "Cancelling upload");
                    let _ = cancel_tx.send(());
                }
            }

            NetworkCommand::LoadAdmin => {
                self.spawn("Failed to fetch users", |client| async move {
                    let (users, roles, permissions) = tokio::join!(
                        client.list_users(),
                        client.list_roles(),
                        client.list_permissions()
                    );
                    Ok(NetworkResponse::AdminLoaded {
                        users: users?,
                        roles: roles?,
                        permissions: permissions?,
                    })
                });
            }

            NetworkCommand::DeleteUser(user_id) => {
                self.spawn("Failed to delete user", |client| async move {
                    client.delete_user(user_id).await?;
                    Ok(saved("User deleted successfully", ReloadTarget::Admin))
                });
            }

            NetworkCommand::AssignRole { user_id, role_id } => {
                self.spawn("Failed to update role", |client| async move {
                    client.assign_role(user_id, role_id).await?;
                    Ok(saved("Role updated successfully", ReloadTarget::Admin))
                });
            }

            NetworkCommand::SetUserPermission { user_id, permission_id, granted } => {
                self.spawn("Failed to update permissions", |client| async move {
                    if granted {
                        client.add_user_permission(user_id, permission_id).await?;
                    } else {
                        client.remove_user_permission(user_id, permission_id).await?;
                    }
                    Ok(saved("Permissions updated", ReloadTarget::Admin))
                });
            }

            NetworkCommand::LoadRolePermissions(role_id) => {
                self.spawn("Failed to fetch role permissions", |client| async move {
                    let permissions = client.role_permissions(role_id).await?;
                    Ok(NetworkResponse::RolePermissionsLoaded { role_id, permissions })
                });
            }

            NetworkCommand::SetRolePermission { role_id, permission_id, granted } => {
                self.spawn("Failed to update role permissions", |client| async move {
                    if granted {
                        client.add_role_permissions(role_id, &[permission_id]).await?;
                    } else {
                        client.remove_role_permissions(role_id, &[permission_id]).await?;
                    }
                    Ok(saved("Role permissions updated", ReloadTarget::RolePermissions(role_id)))
                });
            }

            NetworkCommand::Shutdown => {}
        }
    }
}

fn saved(message: &str, reload: ReloadTarget) -> NetworkResponse {
    NetworkResponse::Saved {
        message: message.to_string(),
        reload,
    }
}

fn error_response(e: ApiError, fallback: &str) -> NetworkResponse {
    if e.is_session_expired() {
        tracing::warn!("Session expired");
        return NetworkResponse::SessionExpired;
    }
    tracing::warn!(error = %e, "{}", fallback);
    NetworkResponse::Failed {
        message: e.user_message(fallback),
    }
}

#[cfg(test)]
#[path = "tests/actor_tests.rs"]
mod tests;
