use std::sync::Arc;

use lantern_common::{LanternError, Result, SearchRequest, SearchResult};

use crate::channel::{ChannelRequest, SideChannel};
use crate::parse::parse_results;

/// Content-script half of the retriever.
#[derive(Clone)]
pub struct Retriever {
    channel: Arc<dyn SideChannel>,
    engine_base: String,
}

impl Retriever {
    /// `engine_base` identifies result pages: a final URL starting with it is
    /// parsed as results, anything else is treated as a redirect to a page.
    pub fn new(channel: Arc<dyn SideChannel>, engine_base: impl Into<String>) -> Self {
        Self {
            channel,
            engine_base: engine_base.into(),
        }
    }

    pub fn engine_base(&self) -> &str {
        &self.engine_base
    }

    /// Run `search` and return up to `limit` organic results plus any featured panel.
    pub async fn web_search(&self, search: &SearchRequest, limit: usize) -> Result<Vec<SearchResult>> {
        let response = self
            .channel
            .request(ChannelRequest::GetSearchResults {
                search: search.clone(),
            })
            .await?
            .into_search()?;

        if !(200..300).contains(&response.status) {
            return Err(LanternError::Retrieval(format!(
                "Failed to fetch: {}",
                response.status
            )));
        }

        if response.url.starts_with(&self.engine_base) {
            let results = parse_results(&response.html, limit);
            tracing::info!(query = %search.query, results = results.len(), "web.search.parsed");
            return Ok(results);
        }

        tracing::info!(
            query = %search.query,
            resolved_url = %response.url,
            "web.search.redirected",
        );
        let page = self
            .channel
            .request(ChannelRequest::GetWebpageText {
                url: response.url.clone(),
                html: response.html,
            })
            .await?
            .into_page_text()?;

        Ok(vec![SearchResult {
            title: page.title,
            body: page.body,
            url: response.url,
        }])
    }

    /// Extract one page's text, bypassing the search engine.
    pub async fn extract_page(&self, url: &str) -> Result<Vec<SearchResult>> {
        tracing::info!(url = %url, "web.page.extract");
        let page = self
            .channel
            .request(ChannelRequest::GetWebpageText {
                url: url.to_string(),
                html: String::new(),
            })
            .await?
            .into_page_text()?;

        Ok(vec![SearchResult {
            title: page.title,
            body: page.body,
            url: url.to_string(),
        }])
    }
}
