//! Common types and utilities shared across Lantern crates.
//!
//! This crate defines the search data model exchanged between the content
//! script and the privileged side-channel, the read-only user configuration,
//! the slash-command registry, observability helpers, and the shared error
//! type. It stays dependency-light so every other crate can depend on it.
//!
//! # Overview
//!
//! - [`SearchRequest`], [`SearchResponse`], [`SearchResult`], [`PageText`]:
//!   payloads of the side-channel protocol
//! - [`UserConfig`] and [`UserConfigSource`]: configuration consumed read-only
//! - [`SlashCommands`]: ordered registry used for command-menu prefix matching
//! - [`observability`]: centralised tracing/logging initialisation
//! - [`LanternError`] and [`Result`]: shared error handling
//!
//! # Examples
//!
//! ```rust
//! use lantern_common::{SearchRequest, TimeRange, UserConfig};
//!
//! let cfg = UserConfig::default();
//! let req = SearchRequest::from_config("weather", &cfg);
//! assert_eq!(req.timerange, TimeRange::Any);
//! assert_eq!(cfg.num_web_results, 3);
//! ```
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod observability;

/// Search-engine time window, serialized as the engine's single-letter code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeRange {
    #[default]
    #[serde(rename = "")]
    Any,
    #[serde(rename = "d")]
    Day,
    #[serde(rename = "w")]
    Week,
    #[serde(rename = "m")]
    Month,
    #[serde(rename = "y")]
    Year,
}

impl TimeRange {
    /// Code sent to the search engine (`""` means no restriction).
    pub fn code(self) -> &'static str {
        match self {
            TimeRange::Any => "",
            TimeRange::Day => "d",
            TimeRange::Week => "w",
            TimeRange::Month => "m",
            TimeRange::Year => "y",
        }
    }
}

/// A structured web search, constructed once per query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub timerange: TimeRange,
    pub region: String,
}

impl SearchRequest {
    /// Build the request for `query` using the user's time range and region.
    pub fn from_config(query: impl Into<String>, cfg: &UserConfig) -> Self {
        Self {
            query: query.into(),
            timerange: cfg.time_period,
            region: cfg.region.clone(),
        }
    }
}

/// Raw engine response relayed by the side-channel.
///
/// `url` is the final URL reached after redirects; it decides whether the
/// markup is a results page or a destination page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub status: u16,
    pub html: String,
    pub url: String,
}

/// One ranked result. Order in a result sequence is the relevance ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResult {
    pub title: String,
    pub body: String,
    pub url: String,
}

/// Title and readable text extracted from a single web page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageText {
    pub title: String,
    pub body: String,
}

/// User preferences owned by the options UI. The core only ever reads them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Master switch for augmentation; when off the text is submitted unchanged.
    pub web_access: bool,
    /// Organic results requested per search (a featured panel comes on top).
    pub num_web_results: usize,
    pub time_period: TimeRange,
    pub region: String,
    pub language: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            web_access: true,
            num_web_results: 3,
            time_period: TimeRange::Any,
            region: "wt-wt".to_string(),
            language: "en".to_string(),
        }
    }
}

/// Asynchronous, read-only access to the current [`UserConfig`].
#[async_trait]
pub trait UserConfigSource: Send + Sync {
    async fn user_config(&self) -> Result<UserConfig>;
}

/// A fixed configuration is its own source.
#[async_trait]
impl UserConfigSource for UserConfig {
    async fn user_config(&self) -> Result<UserConfig> {
        Ok(self.clone())
    }
}

/// Entry of the slash-command menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashCommand {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Text the command menu writes into the input when the command is picked.
    #[serde(default)]
    pub insert: String,
}

/// Ordered slash-command registry, consumed read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlashCommands(Vec<SlashCommand>);

impl Default for SlashCommands {
    fn default() -> Self {
        Self(vec![SlashCommand {
            name: "/page".to_string(),
            description: "Read the text of a web page: /page <url>".to_string(),
            insert: "page:".to_string(),
        }])
    }
}

impl SlashCommands {
    pub fn new(commands: Vec<SlashCommand>) -> Self {
        Self(commands)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SlashCommand> {
        self.0.iter()
    }

    pub fn names(&self) -> Vec<String> {
        self.0.iter().map(|c| c.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when `text` is a prefix of some command name no longer than it.
    ///
    /// Such input means the user is navigating the command menu, not
    /// submitting. Matching is case-sensitive.
    ///
    /// ```
    /// use lantern_common::SlashCommands;
    ///
    /// let commands = SlashCommands::default();
    /// assert!(commands.is_partial_command("/pa"));
    /// assert!(commands.is_partial_command("/page"));
    /// assert!(!commands.is_partial_command("/page https://example.com"));
    /// assert!(!commands.is_partial_command("/PA"));
    /// ```
    pub fn is_partial_command(&self, text: &str) -> bool {
        self.0
            .iter()
            .any(|c| c.name.starts_with(text) && text.len() <= c.name.len())
    }
}

/// Error types used across the Lantern workspace.
#[derive(thiserror::Error, Debug)]
pub enum LanternError {
    /// Network or status failure while fetching search results or a page.
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// The side-channel could not deliver a request or its reply.
    #[error("Side-channel error: {0}")]
    Channel(String),

    /// The side-channel replied with a payload of the wrong shape.
    #[error("Malformed side-channel response: expected {expected}")]
    MalformedResponse { expected: &'static str },

    /// The isolated rendering boundary could not be built.
    #[error("Injection error: {0}")]
    Injection(String),

    /// The host's submit control never became enabled.
    #[error("Submit button stayed disabled for {0:?}")]
    SubmitTimeout(Duration),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A host-page operation failed.
    #[error("Host page error: {0}")]
    Host(#[from] anyhow::Error),
}

/// Convenient alias for results that use [`LanternError`].
pub type Result<T> = std::result::Result<T, LanternError>;
