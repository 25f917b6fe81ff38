//! Side-channel message protocol.
//!
//! Requests are tagged by `type`, exactly as they travel between contexts:
//!
//! ```
//! use lantern_common::{SearchRequest, TimeRange};
//! use lantern_web::ChannelRequest;
//!
//! let req = ChannelRequest::GetSearchResults {
//!     search: SearchRequest {
//!         query: "weather".into(),
//!         timerange: TimeRange::Week,
//!         region: "us".into(),
//!     },
//! };
//! let v = serde_json::to_value(&req).unwrap();
//! assert_eq!(v["type"], "get_search_results");
//! assert_eq!(v["search"]["timerange"], "w");
//! ```
use async_trait::async_trait;
use lantern_common::{LanternError, PageText, Result, SearchRequest, SearchResponse};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelRequest {
    GetSearchResults { search: SearchRequest },
    /// `html` may be empty, in which case the worker fetches `url` itself.
    GetWebpageText { url: String, html: String },
}

impl ChannelRequest {
    pub fn kind(&self) -> &'static str {
        match self {
            ChannelRequest::GetSearchResults { .. } => "get_search_results",
            ChannelRequest::GetWebpageText { .. } => "get_webpage_text",
        }
    }
}

/// Reply payloads. Untagged: the shape identifies the variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelResponse {
    Search(SearchResponse),
    PageText(PageText),
}

impl ChannelResponse {
    pub fn into_search(self) -> Result<SearchResponse> {
        match self {
            ChannelResponse::Search(resp) => Ok(resp),
            ChannelResponse::PageText(_) => Err(LanternError::MalformedResponse {
                expected: "search response",
            }),
        }
    }

    pub fn into_page_text(self) -> Result<PageText> {
        match self {
            ChannelResponse::PageText(page) => Ok(page),
            ChannelResponse::Search(_) => Err(LanternError::MalformedResponse {
                expected: "webpage text",
            }),
        }
    }
}

/// Transport to the privileged context.
#[async_trait]
pub trait SideChannel: Send + Sync {
    async fn request(&self, req: ChannelRequest) -> Result<ChannelResponse>;
}
