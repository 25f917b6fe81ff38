//! Scriptable in-memory chat page.
//!
//! Every DOM side effect is recorded in [`MemoryState`] so callers can assert
//! on exactly what happened. Events are injected with [`MemoryHost::emit`].
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use lantern_common::SlashCommands;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::host::{
    ElementRole, EventId, HostElement, HostEvent, HostPage, MutationRecord, SubmitEvent,
    Subscription, SurfaceSpec, Trigger,
};

/// Everything the page currently contains plus a log of what was done to it.
#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub root_present: bool,
    pub text_area_present: bool,
    pub submit_present: bool,
    pub footer_present: bool,
    pub value: String,
    /// Number of `is_disabled` polls that still report the button disabled.
    pub disabled_polls: usize,
    pub surface: Option<SurfaceSpec>,
    pub surface_mounts: usize,
    pub menu_mounts: usize,
    pub listener_attachments: usize,
    pub footer_padded: bool,
    pub writes: Vec<String>,
    pub input_events: usize,
    pub focus_calls: usize,
    pub disabled_checks: usize,
    /// Value of the text area at each simulated submit-button click.
    pub submitted: Vec<String>,
    pub suppressed: Vec<EventId>,
    pub busy: bool,
    pub busy_history: Vec<bool>,
    pub errors: Vec<String>,
    pub fail_next_mount: Option<String>,
    pub observing: bool,
}

impl MemoryState {
    pub fn toolbar_mounted(&self) -> bool {
        self.surface.is_some()
    }
}

#[derive(Clone, Default)]
pub struct MemoryHost {
    state: Arc<Mutex<MemoryState>>,
    events: Arc<Mutex<Option<mpsc::Sender<HostEvent>>>>,
    next_event: Arc<Mutex<u64>>,
}

impl MemoryHost {
    /// A composable chat page: root, text area, submit button and footer present.
    pub fn chat_page() -> Self {
        let host = Self::default();
        {
            let mut s = host.lock();
            s.root_present = true;
            s.text_area_present = true;
            s.submit_present = true;
            s.footer_present = true;
        }
        host
    }

    /// A page without any input area (e.g. a settings sub-page).
    pub fn blank_page() -> Self {
        let host = Self::default();
        host.lock().root_present = true;
        host
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn snapshot(&self) -> MemoryState {
        self.lock().clone()
    }

    /// Apply an arbitrary change to the page.
    pub fn update(&self, f: impl FnOnce(&mut MemoryState)) {
        f(&mut self.lock());
    }

    pub fn type_text(&self, text: &str) {
        self.lock().value = text.to_string();
    }

    /// The host discards its input region and whatever Lantern mounted in it.
    pub fn tear_down_input(&self) {
        let mut s = self.lock();
        s.text_area_present = false;
        s.submit_present = false;
        s.surface = None;
    }

    /// The host rebuilds its input region from scratch.
    pub fn rebuild_input(&self) {
        let mut s = self.lock();
        s.text_area_present = true;
        s.submit_present = true;
        s.surface = None;
    }

    pub fn fail_next_mount(&self, message: &str) {
        self.lock().fail_next_mount = Some(message.to_string());
    }

    /// Push an event into the observed feed. Fails when nothing is observing.
    pub async fn emit(&self, event: HostEvent) -> Result<()> {
        let tx = self
            .events
            .lock()
            .map_err(|_| anyhow!("event slot poisoned"))?
            .clone()
            .ok_or_else(|| anyhow!("no observer attached"))?;
        tx.send(event)
            .await
            .map_err(|_| anyhow!("observer queue closed"))
    }

    /// Emit a submit event with a fresh id and return that id.
    pub async fn submit(&self, trigger: Trigger) -> Result<EventId> {
        let id = {
            let mut next = self
                .next_event
                .lock()
                .map_err(|_| anyhow!("event counter poisoned"))?;
            *next += 1;
            EventId(*next)
        };
        self.emit(HostEvent::Submit(SubmitEvent { id, trigger }))
            .await?;
        Ok(id)
    }

    pub async fn remove_nodes(&self, count: usize) -> Result<()> {
        self.emit(HostEvent::Mutations {
            records: vec![MutationRecord::removal(count)],
        })
        .await
    }

    fn present(&self, role: ElementRole) -> Option<HostElement> {
        let s = self.lock();
        let here = match role {
            ElementRole::Root => s.root_present,
            ElementRole::TextArea => s.text_area_present,
            ElementRole::SubmitButton => s.submit_present,
            ElementRole::Footer => s.footer_present,
            ElementRole::Toolbar => s.surface.is_some(),
        };
        here.then(|| HostElement::new(role, format!("memory:{role:?}")))
    }

    fn require(&self, el: &HostElement) -> Result<()> {
        if self.present(el.role).is_none() {
            bail!("{:?} is no longer attached", el.role);
        }
        Ok(())
    }
}

#[async_trait]
impl HostPage for MemoryHost {
    async fn root_element(&self) -> Result<Option<HostElement>> {
        Ok(self.present(ElementRole::Root))
    }

    async fn text_area(&self) -> Result<Option<HostElement>> {
        Ok(self.present(ElementRole::TextArea))
    }

    async fn submit_button(&self) -> Result<Option<HostElement>> {
        Ok(self.present(ElementRole::SubmitButton))
    }

    async fn footer(&self) -> Result<Option<HostElement>> {
        Ok(self.present(ElementRole::Footer))
    }

    async fn toolbar(&self) -> Result<Option<HostElement>> {
        Ok(self.present(ElementRole::Toolbar))
    }

    async fn read_value(&self, el: &HostElement) -> Result<String> {
        self.require(el)?;
        Ok(self.lock().value.clone())
    }

    async fn write_value(&self, el: &HostElement, value: &str) -> Result<()> {
        self.require(el)?;
        let mut s = self.lock();
        s.value = value.to_string();
        s.writes.push(value.to_string());
        Ok(())
    }

    async fn dispatch_input(&self, el: &HostElement) -> Result<()> {
        self.require(el)?;
        self.lock().input_events += 1;
        Ok(())
    }

    async fn focus(&self, el: &HostElement) -> Result<()> {
        self.require(el)?;
        self.lock().focus_calls += 1;
        Ok(())
    }

    async fn is_disabled(&self, el: &HostElement) -> Result<bool> {
        self.require(el)?;
        let mut s = self.lock();
        s.disabled_checks += 1;
        if s.disabled_polls > 0 {
            s.disabled_polls -= 1;
            return Ok(true);
        }
        Ok(false)
    }

    async fn click(&self, el: &HostElement) -> Result<()> {
        self.require(el)?;
        let mut s = self.lock();
        if el.role == ElementRole::SubmitButton {
            let sent = s.value.clone();
            s.submitted.push(sent);
        }
        Ok(())
    }

    async fn remove(&self, el: &HostElement) -> Result<()> {
        let mut s = self.lock();
        match el.role {
            ElementRole::Toolbar => s.surface = None,
            ElementRole::TextArea => s.text_area_present = false,
            ElementRole::SubmitButton => s.submit_present = false,
            ElementRole::Footer => s.footer_present = false,
            ElementRole::Root => s.root_present = false,
        }
        Ok(())
    }

    async fn attach_listeners(
        &self,
        _submit: Option<&HostElement>,
        text_area: &HostElement,
    ) -> Result<()> {
        self.require(text_area)?;
        self.lock().listener_attachments += 1;
        Ok(())
    }

    async fn mount_surface(&self, text_area: &HostElement, spec: &SurfaceSpec) -> Result<()> {
        self.require(text_area)?;
        let mut s = self.lock();
        if let Some(message) = s.fail_next_mount.take() {
            bail!(message);
        }
        s.surface = Some(spec.clone());
        s.surface_mounts += 1;
        Ok(())
    }

    async fn mount_command_menu(
        &self,
        text_area: &HostElement,
        _commands: &SlashCommands,
    ) -> Result<()> {
        self.require(text_area)?;
        self.lock().menu_mounts += 1;
        Ok(())
    }

    async fn pad_footer(&self, footer: &HostElement) -> Result<()> {
        self.require(footer)?;
        self.lock().footer_padded = true;
        Ok(())
    }

    async fn show_error(&self, message: &str) -> Result<()> {
        self.lock().errors.push(message.to_string());
        Ok(())
    }

    async fn suppress_default(&self, id: EventId) -> Result<()> {
        self.lock().suppressed.push(id);
        Ok(())
    }

    async fn set_busy(&self, busy: bool) -> Result<()> {
        let mut s = self.lock();
        s.busy = busy;
        s.busy_history.push(busy);
        Ok(())
    }

    async fn observe(
        &self,
        root: &HostElement,
        events: mpsc::Sender<HostEvent>,
    ) -> Result<Subscription> {
        self.require(root)?;
        let cancel = CancellationToken::new();
        *self
            .events
            .lock()
            .map_err(|_| anyhow!("event slot poisoned"))? = Some(events);
        self.lock().observing = true;

        let slot = self.events.clone();
        let state = self.state.clone();
        let watch = cancel.clone();
        let task = tokio::spawn(async move {
            watch.cancelled().await;
            if let Ok(mut slot) = slot.lock() {
                slot.take();
            }
            if let Ok(mut s) = state.lock() {
                s.observing = false;
            }
        });
        Ok(Subscription::new(cancel, Some(task)))
    }
}
