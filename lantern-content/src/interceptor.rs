//! Submit Interceptor: separates real submit intent from noise and runs the
//! Query Processor before the host sees the submission.
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use lantern_common::{Result, SlashCommands};
use lantern_drivers::{HostPage, SubmitEvent, Trigger};

use crate::processor::QueryProcessor;

/// Why a submit event was left to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// Shift+Enter: a literal newline.
    NewlineModifier,
    /// Enter pressed while an input method is composing.
    Composing,
    /// A key other than Enter.
    NotSubmitKey,
    /// Another query is still being processed.
    InFlight,
    NoInput,
    EmptyText,
    /// The text is a prefix of a slash command: menu navigation.
    PartialCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Ignored(IgnoreReason),
    Handled,
    Failed,
}

/// Decide from the trigger alone whether an event may be a submit.
///
/// ```
/// use lantern_content::interceptor::{IgnoreReason, classify};
/// use lantern_drivers::Trigger;
///
/// assert_eq!(classify(&Trigger::enter(), false), Ok(()));
/// assert_eq!(classify(&Trigger::Click, true), Err(IgnoreReason::InFlight));
/// let newline = Trigger::Key { key: "Enter".into(), shift: true, composing: false };
/// assert_eq!(classify(&newline, false), Err(IgnoreReason::NewlineModifier));
/// ```
pub fn classify(trigger: &Trigger, in_flight: bool) -> std::result::Result<(), IgnoreReason> {
    match trigger {
        Trigger::Key { key, .. } if key != "Enter" => Err(IgnoreReason::NotSubmitKey),
        Trigger::Key { shift: true, .. } => Err(IgnoreReason::NewlineModifier),
        Trigger::Key { composing: true, .. } => Err(IgnoreReason::Composing),
        _ if in_flight => Err(IgnoreReason::InFlight),
        _ => Ok(()),
    }
}

/// Clears the in-flight flag however the guarded section ends.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SubmitInterceptor {
    host: Arc<dyn HostPage>,
    processor: QueryProcessor,
    commands: SlashCommands,
    in_flight: AtomicBool,
}

impl SubmitInterceptor {
    pub fn new(host: Arc<dyn HostPage>, processor: QueryProcessor, commands: SlashCommands) -> Self {
        Self {
            host,
            processor,
            commands,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_processing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Handle one submit event end to end. Failures are shown on the page and
    /// reported as [`Dispatch::Failed`]; only host breakage is returned as `Err`.
    ///
    /// The page may have raised its busy flag when it queued `event`. Every
    /// exit that did not run the pipeline lowers it again, unless another
    /// submission still owns it.
    pub async fn dispatch(&self, event: SubmitEvent) -> Result<Dispatch> {
        let outcome = self.screen_and_process(&event).await;
        if !matches!(outcome, Ok(Dispatch::Handled | Dispatch::Failed)) && !self.is_processing() {
            if let Err(e) = self.host.set_busy(false).await {
                tracing::warn!(id = event.id.0, error = %e, "submit.release_failed");
            }
        }
        outcome
    }

    async fn screen_and_process(&self, event: &SubmitEvent) -> Result<Dispatch> {
        let Some(text_area) = self.host.text_area().await? else {
            return Ok(Dispatch::Ignored(IgnoreReason::NoInput));
        };
        if let Err(reason) = classify(&event.trigger, self.is_processing()) {
            return Ok(self.ignored(event, reason));
        }

        let query = self.host.read_value(&text_area).await?.trim().to_string();
        if query.is_empty() {
            return Ok(self.ignored(event, IgnoreReason::EmptyText));
        }
        if self.commands.is_partial_command(&query) {
            return Ok(self.ignored(event, IgnoreReason::PartialCommand));
        }

        // Re-checked here: reading the text suspended us.
        let Some(guard) = InFlight::acquire(&self.in_flight) else {
            return Ok(self.ignored(event, IgnoreReason::InFlight));
        };

        let outcome = self.process(event, &query).await;
        drop(guard);
        self.host.set_busy(false).await?;
        if let Some(text_area) = self.host.text_area().await? {
            self.host.dispatch_input(&text_area).await?;
        }
        outcome
    }

    async fn process(&self, event: &SubmitEvent, query: &str) -> Result<Dispatch> {
        self.host.suppress_default(event.id).await?;
        self.host.set_busy(true).await?;
        tracing::info!(id = event.id.0, "submit.accepted");

        match self.processor.handle_submit(query).await {
            Ok(()) => Ok(Dispatch::Handled),
            Err(e) => {
                tracing::warn!(error = %e, "submit.failed");
                self.host.show_error(&e.to_string()).await?;
                Ok(Dispatch::Failed)
            }
        }
    }

    fn ignored(&self, event: &SubmitEvent, reason: IgnoreReason) -> Dispatch {
        tracing::debug!(id = event.id.0, reason = ?reason, "submit.ignored");
        Dispatch::Ignored(reason)
    }
}
