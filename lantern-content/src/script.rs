//! The content-script event loop.
use std::sync::Arc;

use lantern_common::{LanternError, Result, SlashCommands, UserConfigSource};
use lantern_drivers::{HostEvent, HostPage};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::interceptor::{Dispatch, SubmitInterceptor};
use crate::lifecycle::{LifecycleEvent, PassOutcome, UiLifecycle};
use crate::processor::{Augmenter, QueryProcessor, SubmitTiming};

pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Wires the lifecycle and the interceptor to one host page.
pub struct ContentScript {
    host: Arc<dyn HostPage>,
    lifecycle: Arc<UiLifecycle>,
    interceptor: Arc<SubmitInterceptor>,
    queue_capacity: usize,
}

impl ContentScript {
    pub fn new(
        host: Arc<dyn HostPage>,
        lifecycle: Arc<UiLifecycle>,
        interceptor: Arc<SubmitInterceptor>,
    ) -> Self {
        Self {
            host,
            lifecycle,
            interceptor,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }

    /// Build the lifecycle, processor and interceptor around one host.
    pub fn assemble(
        host: Arc<dyn HostPage>,
        config: Arc<dyn UserConfigSource>,
        augmenter: Augmenter,
        commands: SlashCommands,
        timing: SubmitTiming,
    ) -> Self {
        let lifecycle = UiLifecycle::new(host.clone(), config.clone(), commands.clone());
        let processor = QueryProcessor::new(host.clone(), config, augmenter).with_timing(timing);
        let interceptor = SubmitInterceptor::new(host.clone(), processor, commands);
        Self::new(host, Arc::new(lifecycle), Arc::new(interceptor))
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    pub fn lifecycle(&self) -> &Arc<UiLifecycle> {
        &self.lifecycle
    }

    pub fn interceptor(&self) -> &Arc<SubmitInterceptor> {
        &self.interceptor
    }

    /// Run until `cancel` fires, the host unloads, or the feed closes.
    ///
    /// Submissions already in flight are allowed to finish before returning.
    pub async fn run(&self, cancel: CancellationToken) -> Result<()> {
        let (tx, mut rx) = mpsc::channel(self.queue_capacity);

        self.report_pass(self.lifecycle.on_event(LifecycleEvent::PageLoaded).await)
            .await;

        let root = self
            .host
            .root_element()
            .await?
            .ok_or_else(|| LanternError::Host(anyhow::anyhow!("chat root element not found")))?;
        let subscription = self.host.observe(&root, tx).await?;
        tracing::info!("script.observing");

        let mut submissions: JoinSet<Result<Dispatch>> = JoinSet::new();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("script.cancelled");
                    break;
                }
                Some(joined) = submissions.join_next(), if !submissions.is_empty() => {
                    self.report_submission(joined).await;
                }
                event = rx.recv() => match event {
                    None => break,
                    Some(HostEvent::PageLoaded) => {
                        self.report_pass(self.lifecycle.on_event(LifecycleEvent::PageLoaded).await)
                            .await;
                    }
                    Some(HostEvent::Mutations { records }) => {
                        self.report_pass(self.lifecycle.on_mutations(&records).await)
                            .await;
                    }
                    Some(HostEvent::Submit(submit)) => {
                        let interceptor = self.interceptor.clone();
                        submissions.spawn(async move { interceptor.dispatch(submit).await });
                    }
                    Some(HostEvent::Unloaded) => {
                        tracing::info!("script.unloaded");
                        break;
                    }
                },
            }
        }

        subscription.disconnect().await;
        while let Some(joined) = submissions.join_next().await {
            self.report_submission(joined).await;
        }
        Ok(())
    }

    async fn report_pass(&self, outcome: Result<PassOutcome>) {
        match outcome {
            Ok(outcome) => {
                tracing::debug!(outcome = ?outcome, "ui.inject.outcome");
            }
            Err(e) => self.surface_error(&e).await,
        }
    }

    async fn report_submission(&self, joined: std::result::Result<Result<Dispatch>, tokio::task::JoinError>) {
        match joined {
            Ok(Ok(dispatch)) => {
                tracing::debug!(outcome = ?dispatch, "submit.outcome");
            }
            Ok(Err(e)) => self.surface_error(&e).await,
            Err(e) => {
                tracing::error!(error = %e, "submit.task_failed");
            }
        }
    }

    /// Last stop for errors: show them on the page, never propagate.
    async fn surface_error(&self, err: &LanternError) {
        tracing::warn!(error = %err, "script.error");
        if let Err(e) = self.host.show_error(&err.to_string()).await {
            tracing::error!(error = %e, "script.error_banner_failed");
        }
    }
}
