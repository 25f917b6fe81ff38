//! Search Result Retriever.
//!
//! The content-script side ([`Retriever`]) never fetches anything itself. It
//! talks to a privileged worker over a [`SideChannel`] using the
//! `get_search_results` / `get_webpage_text` message protocol, then turns
//! result-page markup into ranked [`lantern_common::SearchResult`]s.
//!
//! - [`channel`]: protocol payloads and the transport trait
//! - [`background`]: the privileged worker actor and its channel adapter
//! - [`parse`]: result-page scraping and redirect-URL unwrapping
//! - [`extract`]: readable-text extraction for a single page
pub mod background;
pub mod channel;
pub mod extract;
pub mod parse;
mod retriever;

pub use background::{ActorChannel, BackgroundActor, BackgroundMsg};
pub use channel::{ChannelRequest, ChannelResponse, SideChannel};
pub use parse::{parse_results, unwrap_redirect_url};
pub use retriever::Retriever;
