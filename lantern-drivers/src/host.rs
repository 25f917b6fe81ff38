//! The [`HostPage`] seam and the event vocabulary it produces.
use async_trait::async_trait;
use lantern_common::{SlashCommands, TimeRange, UserConfig};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// What a located element is to Lantern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementRole {
    Root,
    TextArea,
    SubmitButton,
    Footer,
    Toolbar,
}

/// Handle to a host element. `key` is whatever the host needs to find it again.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HostElement {
    pub role: ElementRole,
    pub key: String,
}

impl HostElement {
    pub fn new(role: ElementRole, key: impl Into<String>) -> Self {
        Self {
            role,
            key: key.into(),
        }
    }
}

/// Identifies one submit event so its default action can be suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub u64);

/// What the user did to request a submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Trigger {
    Click,
    Key {
        key: String,
        #[serde(default)]
        shift: bool,
        /// Input-method composition in progress.
        #[serde(default)]
        composing: bool,
    },
}

impl Trigger {
    pub fn enter() -> Self {
        Trigger::Key {
            key: "Enter".to_string(),
            shift: false,
            composing: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitEvent {
    pub id: EventId,
    pub trigger: Trigger,
}

/// One DOM mutation, reduced to what the lifecycle reacts to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationRecord {
    #[serde(default)]
    pub removed_nodes: usize,
    #[serde(default)]
    pub added_nodes: usize,
}

impl MutationRecord {
    pub fn removal(count: usize) -> Self {
        Self {
            removed_nodes: count,
            added_nodes: 0,
        }
    }

    pub fn addition(count: usize) -> Self {
        Self {
            removed_nodes: 0,
            added_nodes: count,
        }
    }
}

/// Events delivered by a host into the content script's bounded queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HostEvent {
    PageLoaded,
    Mutations { records: Vec<MutationRecord> },
    Submit(SubmitEvent),
    Unloaded,
}

/// State the control surface renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SurfaceSpec {
    pub web_access: bool,
    pub num_web_results: usize,
    pub time_period: TimeRange,
    pub region: String,
}

impl SurfaceSpec {
    pub fn from_config(cfg: &UserConfig) -> Self {
        Self {
            web_access: cfg.web_access,
            num_web_results: cfg.num_web_results,
            time_period: cfg.time_period,
            region: cfg.region.clone(),
        }
    }
}

/// A live event feed. Dropping or disconnecting it stops delivery.
pub struct Subscription {
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn new(cancel: CancellationToken, task: Option<JoinHandle<()>>) -> Self {
        Self { cancel, task }
    }

    /// A subscription with no background task; delivery stops once cancelled.
    pub fn detached(cancel: CancellationToken) -> Self {
        Self { cancel, task: None }
    }

    pub fn is_connected(&self) -> bool {
        !self.cancel.is_cancelled()
    }

    pub async fn disconnect(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// The chat page, as seen by the content script.
///
/// Locators return `Ok(None)` when an element is absent; callers treat that
/// as "host not ready". Errors are reserved for a broken host connection.
#[async_trait]
pub trait HostPage: Send + Sync {
    async fn root_element(&self) -> anyhow::Result<Option<HostElement>>;
    async fn text_area(&self) -> anyhow::Result<Option<HostElement>>;
    async fn submit_button(&self) -> anyhow::Result<Option<HostElement>>;
    async fn footer(&self) -> anyhow::Result<Option<HostElement>>;
    /// The mounted control surface, if any.
    async fn toolbar(&self) -> anyhow::Result<Option<HostElement>>;

    async fn read_value(&self, el: &HostElement) -> anyhow::Result<String>;
    async fn write_value(&self, el: &HostElement, value: &str) -> anyhow::Result<()>;
    /// Fire a bubbling `input` event so the host's own state picks up the value.
    async fn dispatch_input(&self, el: &HostElement) -> anyhow::Result<()>;
    async fn focus(&self, el: &HostElement) -> anyhow::Result<()>;
    async fn is_disabled(&self, el: &HostElement) -> anyhow::Result<bool>;
    async fn click(&self, el: &HostElement) -> anyhow::Result<()>;
    async fn remove(&self, el: &HostElement) -> anyhow::Result<()>;

    /// Route clicks on `submit` and key presses on `text_area` into the event feed.
    async fn attach_listeners(
        &self,
        submit: Option<&HostElement>,
        text_area: &HostElement,
    ) -> anyhow::Result<()>;
    /// Build the isolated rendering boundary next to `text_area` and render the toolbar.
    async fn mount_surface(&self, text_area: &HostElement, spec: &SurfaceSpec)
    -> anyhow::Result<()>;
    async fn mount_command_menu(
        &self,
        text_area: &HostElement,
        commands: &SlashCommands,
    ) -> anyhow::Result<()>;
    /// The one host-owned style change: bottom padding on the footer's last child.
    async fn pad_footer(&self, footer: &HostElement) -> anyhow::Result<()>;
    /// Dismissible on-page error notification.
    async fn show_error(&self, message: &str) -> anyhow::Result<()>;

    /// Stop the host's default handling of an accepted submit event.
    async fn suppress_default(&self, id: EventId) -> anyhow::Result<()>;
    /// Mirror of the in-flight flag for hosts that gate events page-side.
    async fn set_busy(&self, busy: bool) -> anyhow::Result<()>;

    /// Deliver mutations under `root` (and submit events) into `events`.
    async fn observe(
        &self,
        root: &HostElement,
        events: mpsc::Sender<HostEvent>,
    ) -> anyhow::Result<Subscription>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bridge_events_deserialize() {
        let ev: HostEvent = serde_json::from_value(json!({
            "type": "submit",
            "id": 7,
            "trigger": {"kind": "key", "key": "Enter", "shift": false, "composing": true}
        }))
        .unwrap();
        assert_eq!(
            ev,
            HostEvent::Submit(SubmitEvent {
                id: EventId(7),
                trigger: Trigger::Key {
                    key: "Enter".into(),
                    shift: false,
                    composing: true
                }
            })
        );

        let ev: HostEvent = serde_json::from_value(json!({
            "type": "mutations",
            "records": [{"removed_nodes": 2}, {"added_nodes": 1}]
        }))
        .unwrap();
        assert_eq!(
            ev,
            HostEvent::Mutations {
                records: vec![MutationRecord::removal(2), MutationRecord::addition(1)]
            }
        );
    }

    #[tokio::test]
    async fn disconnect_cancels_and_joins() {
        let cancel = CancellationToken::new();
        let child = cancel.clone();
        let task = tokio::spawn(async move { child.cancelled().await });
        let sub = Subscription::new(cancel.clone(), Some(task));
        assert!(sub.is_connected());
        sub.disconnect().await;
        assert!(cancel.is_cancelled());
    }
}
