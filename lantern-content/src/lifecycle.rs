//! UI Lifecycle Manager.
//!
//! Keeps exactly one control surface attached next to the host's input area.
//! The host re-renders its DOM at will; a pass runs on page load and on every
//! mutation batch that removed nodes, and is a no-op when the surface is
//! still there.
use std::sync::{Arc, Mutex, MutexGuard};

use lantern_common::{LanternError, Result, SlashCommands, UserConfigSource};
use lantern_drivers::{HostElement, HostPage, MutationRecord, SurfaceSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiState {
    Unmounted,
    Mounting,
    Mounted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    PageLoaded,
    HostRemovedNodes,
}

/// What one injection pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    /// Another pass was already running.
    Busy,
    /// The mutation batch only added nodes.
    NotRemoval,
    /// No input area; a stray surface was removed if `removed_stray`.
    NoInput { removed_stray: bool },
    AlreadyMounted,
    Mounted,
    /// The surface could not be built; the error was shown on the page.
    MountFailed,
}

pub struct UiLifecycle {
    host: Arc<dyn HostPage>,
    config: Arc<dyn UserConfigSource>,
    commands: SlashCommands,
    state: Mutex<UiState>,
}

/// Holds `Mounting`; whatever the pass does not settle falls back to `Unmounted`.
struct PassGuard<'a> {
    state: &'a Mutex<UiState>,
    settled: Option<UiState>,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        let next = self.settled.unwrap_or(UiState::Unmounted);
        *lock(self.state) = next;
    }
}

fn lock(state: &Mutex<UiState>) -> MutexGuard<'_, UiState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn toolbar_error_message(err: &LanternError) -> String {
    let detail = match err {
        LanternError::Injection(msg) => msg.clone(),
        other => other.to_string(),
    };
    format!("Error loading Lantern toolbar: {detail}. Please reload the page (F5).")
}

impl UiLifecycle {
    pub fn new(
        host: Arc<dyn HostPage>,
        config: Arc<dyn UserConfigSource>,
        commands: SlashCommands,
    ) -> Self {
        Self {
            host,
            config,
            commands,
            state: Mutex::new(UiState::Unmounted),
        }
    }

    pub fn state(&self) -> UiState {
        *lock(&self.state)
    }

    pub async fn on_event(&self, event: LifecycleEvent) -> Result<PassOutcome> {
        tracing::trace!(trigger = ?event, "ui.lifecycle.event");
        self.inject().await
    }

    /// React to one mutation batch. Pure additions never trigger a pass.
    pub async fn on_mutations(&self, records: &[MutationRecord]) -> Result<PassOutcome> {
        if !records.iter().any(|r| r.removed_nodes > 0) {
            return Ok(PassOutcome::NotRemoval);
        }
        self.on_event(LifecycleEvent::HostRemovedNodes).await
    }

    fn begin_pass(&self) -> Option<PassGuard<'_>> {
        let mut state = lock(&self.state);
        if *state == UiState::Mounting {
            return None;
        }
        *state = UiState::Mounting;
        Some(PassGuard {
            state: &self.state,
            settled: None,
        })
    }

    /// One injection pass. Host failures come back as `Err` with the state
    /// reset, so the next removal tries again.
    pub async fn inject(&self) -> Result<PassOutcome> {
        let Some(mut pass) = self.begin_pass() else {
            tracing::debug!("ui.inject.busy");
            return Ok(PassOutcome::Busy);
        };

        let text_area = self.host.text_area().await?;
        let toolbar = self.host.toolbar().await?;

        let Some(text_area) = text_area else {
            let removed_stray = match toolbar {
                Some(stray) => {
                    self.host.remove(&stray).await?;
                    true
                }
                None => false,
            };
            tracing::debug!(removed_stray, "ui.inject.no_input");
            pass.settled = Some(UiState::Unmounted);
            return Ok(PassOutcome::NoInput { removed_stray });
        };

        if toolbar.is_some() {
            pass.settled = Some(UiState::Mounted);
            return Ok(PassOutcome::AlreadyMounted);
        }

        tracing::info!("ui.inject.start");
        let submit = self.host.submit_button().await?;
        self.host
            .attach_listeners(submit.as_ref(), &text_area)
            .await?;

        let mounted = self.render_toolbar(&text_area).await?;
        self.host
            .mount_command_menu(&text_area, &self.commands)
            .await?;
        if let Some(footer) = self.host.footer().await? {
            self.host.pad_footer(&footer).await?;
        }

        if mounted {
            tracing::info!("ui.inject.mounted");
            pass.settled = Some(UiState::Mounted);
            Ok(PassOutcome::Mounted)
        } else {
            pass.settled = Some(UiState::Unmounted);
            Ok(PassOutcome::MountFailed)
        }
    }

    /// Mount the surface; a failure here is reported on the page, not returned.
    async fn render_toolbar(&self, text_area: &HostElement) -> Result<bool> {
        let cfg = self.config.user_config().await?;
        let spec = SurfaceSpec::from_config(&cfg);
        match self.host.mount_surface(text_area, &spec).await {
            Ok(()) => Ok(true),
            Err(e) => {
                let err = LanternError::Injection(e.to_string());
                tracing::warn!(error = %err, "ui.inject.failed");
                self.host.show_error(&toolbar_error_message(&err)).await?;
                Ok(false)
            }
        }
    }
}
