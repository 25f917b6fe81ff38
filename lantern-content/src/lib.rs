//! The content script: everything Lantern does inside the chat page.
//!
//! - [`lifecycle::UiLifecycle`]: keeps one control surface mounted despite
//!   host re-renders
//! - [`interceptor::SubmitInterceptor`]: turns raw submit events into at most
//!   one in-flight augmentation
//! - [`processor::QueryProcessor`]: search or page extraction, prompt
//!   compilation, resubmission
//! - [`prompt`]: the prompt template
//! - [`script::ContentScript`]: the event loop tying them to a
//!   [`lantern_drivers::HostPage`]
pub mod interceptor;
pub mod lifecycle;
pub mod processor;
pub mod prompt;
pub mod script;

pub use interceptor::{Dispatch, IgnoreReason, SubmitInterceptor};
pub use lifecycle::{LifecycleEvent, PassOutcome, UiLifecycle, UiState};
pub use processor::{Augmenter, QueryProcessor, SubmitTiming};
pub use prompt::{PromptCompiler, TemplatePrompt};
pub use script::ContentScript;
