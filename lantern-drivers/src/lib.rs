//! Host-page layer: the DOM locator and every DOM side effect Lantern performs.
//!
//! - [`host::HostPage`]: element lookups, element operations, surface
//!   mounting, error banners and the mutation/submit event feed
//! - [`webdriver::WebDriverHost`]: a live chat page driven over WebDriver
//! - [`memory::MemoryHost`]: a scriptable in-memory page that records side effects
pub mod host;
pub mod memory;
pub mod webdriver;

pub use host::{
    ElementRole, EventId, HostElement, HostEvent, HostPage, MutationRecord, SubmitEvent,
    Subscription, SurfaceSpec, Trigger,
};
