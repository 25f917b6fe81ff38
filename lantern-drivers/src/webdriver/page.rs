use std::time::Duration;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use fantoccini::Client;
use lantern_common::SlashCommands;
use lantern_config::SelectorConfig;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::scripts::{BridgeScripts, SURFACE_CLASS, SURFACE_SELECTOR};
use crate::host::{
    ElementRole, EventId, HostElement, HostEvent, HostPage, Subscription, SurfaceSpec,
};

const BRIDGE_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A live chat page driven over WebDriver. Element keys are CSS selectors.
#[derive(Clone)]
pub struct WebDriverHost {
    client: Client,
    selectors: SelectorConfig,
    poll_interval: Duration,
}

impl WebDriverHost {
    pub fn new(client: Client, selectors: SelectorConfig) -> Self {
        Self {
            client,
            selectors,
            poll_interval: BRIDGE_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn selectors_json(&self) -> Value {
        json!({
            "root": self.selectors.root,
            "text_area": self.selectors.text_area,
            "submit_button": self.selectors.submit_button,
            "footer": self.selectors.footer,
        })
    }

    pub async fn install_bridge(&self) -> Result<()> {
        let fresh = self
            .client
            .execute(BridgeScripts::install(), vec![self.selectors_json()])
            .await
            .context("failed to install page bridge")?;
        tracing::debug!(fresh = fresh.as_bool().unwrap_or(false), "bridge.installed");
        Ok(())
    }

    async fn run(&self, script: &str, args: Vec<Value>) -> Result<Value> {
        Ok(self.client.execute(script, args).await?)
    }

    async fn locate(&self, role: ElementRole, selector: &str) -> Result<Option<HostElement>> {
        let found = self
            .run(BridgeScripts::exists(), vec![json!(selector)])
            .await?
            .as_bool()
            .unwrap_or(false);
        Ok(found.then(|| HostElement::new(role, selector)))
    }

    async fn on_element(&self, script: &str, el: &HostElement) -> Result<Value> {
        self.run(script, vec![json!(el.key)]).await
    }
}

#[async_trait]
impl HostPage for WebDriverHost {
    async fn root_element(&self) -> Result<Option<HostElement>> {
        self.locate(ElementRole::Root, &self.selectors.root).await
    }

    async fn text_area(&self) -> Result<Option<HostElement>> {
        self.locate(ElementRole::TextArea, &self.selectors.text_area)
            .await
    }

    async fn submit_button(&self) -> Result<Option<HostElement>> {
        self.locate(ElementRole::SubmitButton, &self.selectors.submit_button)
            .await
    }

    async fn footer(&self) -> Result<Option<HostElement>> {
        self.locate(ElementRole::Footer, &self.selectors.footer).await
    }

    async fn toolbar(&self) -> Result<Option<HostElement>> {
        self.locate(ElementRole::Toolbar, SURFACE_SELECTOR).await
    }

    async fn read_value(&self, el: &HostElement) -> Result<String> {
        let v = self.on_element(BridgeScripts::read_value(), el).await?;
        Ok(v.as_str().unwrap_or_default().to_string())
    }

    async fn write_value(&self, el: &HostElement, value: &str) -> Result<()> {
        self.run(BridgeScripts::write_value(), vec![json!(el.key), json!(value)])
            .await?;
        Ok(())
    }

    async fn dispatch_input(&self, el: &HostElement) -> Result<()> {
        self.on_element(BridgeScripts::dispatch_input(), el).await?;
        Ok(())
    }

    async fn focus(&self, el: &HostElement) -> Result<()> {
        self.on_element(BridgeScripts::focus(), el).await?;
        Ok(())
    }

    async fn is_disabled(&self, el: &HostElement) -> Result<bool> {
        let v = self.on_element(BridgeScripts::is_disabled(), el).await?;
        Ok(v.as_bool().unwrap_or(false))
    }

    async fn click(&self, el: &HostElement) -> Result<()> {
        self.on_element(BridgeScripts::click(), el).await?;
        Ok(())
    }

    async fn remove(&self, el: &HostElement) -> Result<()> {
        self.on_element(BridgeScripts::remove(), el).await?;
        Ok(())
    }

    async fn attach_listeners(
        &self,
        submit: Option<&HostElement>,
        text_area: &HostElement,
    ) -> Result<()> {
        self.install_bridge().await?;
        let submit_key = submit.map_or(Value::Null, |el| json!(el.key));
        self.run(
            BridgeScripts::attach_listeners(),
            vec![submit_key, json!(text_area.key)],
        )
        .await?;
        Ok(())
    }

    async fn mount_surface(&self, text_area: &HostElement, spec: &SurfaceSpec) -> Result<()> {
        self.run(
            BridgeScripts::mount_surface(),
            vec![
                json!(text_area.key),
                json!(SURFACE_CLASS),
                serde_json::to_value(spec)?,
            ],
        )
        .await
        .context("failed to build the control surface")?;
        Ok(())
    }

    async fn mount_command_menu(
        &self,
        text_area: &HostElement,
        commands: &SlashCommands,
    ) -> Result<()> {
        self.run(
            BridgeScripts::mount_command_menu(),
            vec![json!(text_area.key), serde_json::to_value(commands)?],
        )
        .await?;
        Ok(())
    }

    async fn pad_footer(&self, footer: &HostElement) -> Result<()> {
        self.on_element(BridgeScripts::pad_footer(), footer).await?;
        Ok(())
    }

    async fn show_error(&self, message: &str) -> Result<()> {
        self.run(BridgeScripts::show_error(), vec![json!(message), json!(10_000)])
            .await?;
        Ok(())
    }

    /// The page-side gate already prevented the default action.
    async fn suppress_default(&self, id: EventId) -> Result<()> {
        tracing::trace!(id = id.0, "bridge.suppressed");
        Ok(())
    }

    async fn set_busy(&self, busy: bool) -> Result<()> {
        self.run(BridgeScripts::set_busy(), vec![json!(busy)]).await?;
        Ok(())
    }

    async fn observe(
        &self,
        root: &HostElement,
        events: mpsc::Sender<HostEvent>,
    ) -> Result<Subscription> {
        self.install_bridge().await?;
        self.run(BridgeScripts::observe(), vec![json!(root.key)])
            .await
            .context("failed to start mutation observer")?;

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let host = self.clone();
        let root_key = root.key.clone();
        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        if let Err(e) = host.run(BridgeScripts::disconnect(), vec![]).await {
                            tracing::debug!(error = %e, "bridge.disconnect_failed");
                        }
                        break;
                    }
                    _ = tokio::time::sleep(host.poll_interval) => {
                        match host.poll_once(&root_key).await {
                            Ok(batch) => {
                                for ev in batch {
                                    if events.send(ev).await.is_err() {
                                        return;
                                    }
                                }
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "bridge.poll_failed");
                            }
                        }
                    }
                }
            }
        });
        Ok(Subscription::new(cancel, Some(task)))
    }
}

impl WebDriverHost {
    /// Drain the bridge queue. A missing bridge means the document was
    /// replaced: reinstall, re-observe and report a fresh page load.
    async fn poll_once(&self, root_key: &str) -> Result<Vec<HostEvent>> {
        let drained = self.run(BridgeScripts::drain(), vec![]).await?;
        if drained.is_null() {
            self.install_bridge().await?;
            self.run(BridgeScripts::observe(), vec![json!(root_key)])
                .await?;
            tracing::info!("bridge.reinstalled");
            return Ok(vec![HostEvent::PageLoaded]);
        }
        let batch: Vec<HostEvent> =
            serde_json::from_value(drained).context("malformed bridge event")?;
        Ok(batch)
    }
}
