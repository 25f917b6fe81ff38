//! Query Processor: picks the augmentation strategy, drives retrieval and
//! hands the compiled prompt to the host page.
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use lantern_common::{LanternError, Result, SearchRequest, SearchResult, UserConfig, UserConfigSource};
use lantern_config::SubmitConfig;
use lantern_drivers::{HostElement, HostPage};
use lantern_web::Retriever;
use regex::Regex;

use crate::prompt::PromptCompiler;

static PAGE_DIRECTIVE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"page:(\S+)").ok());

/// The URL of a `page:<url>` directive anywhere in `query`.
///
/// ```
/// use lantern_content::processor::page_directive;
///
/// assert_eq!(page_directive("summarize page:https://example.com/a please"), Some("https://example.com/a"));
/// assert_eq!(page_directive("page: nothing"), None);
/// assert_eq!(page_directive("weather"), None);
/// ```
pub fn page_directive(query: &str) -> Option<&str> {
    PAGE_DIRECTIVE
        .as_ref()?
        .captures(query)?
        .get(1)
        .map(|m| m.as_str())
}

/// Host-independent half of the pipeline: retrieval and prompt compilation.
#[derive(Clone)]
pub struct Augmenter {
    retriever: Retriever,
    prompt: Arc<dyn PromptCompiler>,
}

impl Augmenter {
    pub fn new(retriever: Retriever, prompt: Arc<dyn PromptCompiler>) -> Self {
        Self { retriever, prompt }
    }

    /// Results for `query`, or `None` when the prompt never shows them.
    pub async fn retrieve(&self, query: &str, cfg: &UserConfig) -> Result<Option<Vec<SearchResult>>> {
        if !self.prompt.references_web_results() {
            tracing::debug!("query.retrieval_skipped");
            return Ok(None);
        }

        let results = match page_directive(query) {
            Some(url) => self.retriever.extract_page(url).await?,
            None => {
                let search = SearchRequest::from_config(query, cfg);
                self.retriever.web_search(&search, cfg.num_web_results).await?
            }
        };
        Ok(Some(results))
    }

    /// Final text to submit. With web access off this is `query` itself.
    pub async fn augment(&self, query: &str, cfg: &UserConfig) -> Result<String> {
        if !cfg.web_access {
            return Ok(query.to_string());
        }
        let results = self.retrieve(query, cfg).await?;
        Ok(self.prompt.compile(results.as_deref(), query))
    }
}

/// Pacing of the simulated submit click.
#[derive(Debug, Clone, Copy)]
pub struct SubmitTiming {
    pub poll_interval: Duration,
    pub enable_timeout: Duration,
    pub settle_delay: Duration,
}

impl Default for SubmitTiming {
    fn default() -> Self {
        Self::from_config(&SubmitConfig::default())
    }
}

impl SubmitTiming {
    pub fn from_config(cfg: &SubmitConfig) -> Self {
        Self {
            poll_interval: cfg.poll_interval(),
            enable_timeout: cfg.enable_timeout(),
            settle_delay: cfg.settle_delay(),
        }
    }
}

/// Runs one accepted submission against the host page.
pub struct QueryProcessor {
    host: Arc<dyn HostPage>,
    config: Arc<dyn UserConfigSource>,
    augmenter: Augmenter,
    timing: SubmitTiming,
}

impl QueryProcessor {
    pub fn new(
        host: Arc<dyn HostPage>,
        config: Arc<dyn UserConfigSource>,
        augmenter: Augmenter,
    ) -> Self {
        Self {
            host,
            config,
            augmenter,
            timing: SubmitTiming::default(),
        }
    }

    pub fn with_timing(mut self, timing: SubmitTiming) -> Self {
        self.timing = timing;
        self
    }

    /// Rewrite the input with the augmented prompt and submit it.
    ///
    /// Errors leave the original text in the input area.
    pub async fn handle_submit(&self, query: &str) -> Result<()> {
        let Some(text_area) = self.host.text_area().await? else {
            return Ok(());
        };
        let cfg = self.config.user_config().await?;

        if !cfg.web_access {
            tracing::info!("query.direct_submit");
            return self.click_submit(&text_area).await;
        }

        tracing::info!(
            page_directive = page_directive(query).is_some(),
            num_web_results = cfg.num_web_results,
            "query.augment.start",
        );
        let compiled = self.augmenter.augment(query, &cfg).await?;

        self.host.write_value(&text_area, &compiled).await?;
        self.host.dispatch_input(&text_area).await?;
        tracing::info!(prompt_len = compiled.len(), "query.augment.done");
        self.click_submit(&text_area).await
    }

    /// Focus the input, wait for the submit control to enable, click it.
    async fn click_submit(&self, text_area: &HostElement) -> Result<()> {
        self.host.focus(text_area).await?;

        let Some(button) = self.host.submit_button().await? else {
            tracing::warn!("query.submit.missing_button");
            return Ok(());
        };

        let wait = async {
            while self.host.is_disabled(&button).await? {
                tokio::time::sleep(self.timing.poll_interval).await;
            }
            Ok::<_, LanternError>(())
        };
        match tokio::time::timeout(self.timing.enable_timeout, wait).await {
            Ok(polled) => polled?,
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.timing.enable_timeout.as_millis() as u64,
                    "query.submit.timeout",
                );
                return Err(LanternError::SubmitTimeout(self.timing.enable_timeout));
            }
        }

        self.host.click(&button).await?;
        tokio::time::sleep(self.timing.settle_delay).await;
        Ok(())
    }
}
