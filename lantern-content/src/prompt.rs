//! Prompt compilation: results plus the original query into the text that is
//! finally submitted.
use chrono::{Local, NaiveDate};
use lantern_common::SearchResult;
use lantern_config::PromptConfig;

pub const WEB_RESULTS_PLACEHOLDER: &str = "{web_results}";
pub const QUERY_PLACEHOLDER: &str = "{query}";
pub const DATE_PLACEHOLDER: &str = "{current_date}";

pub const DEFAULT_TEMPLATE: &str = "Web search results:

{web_results}
Current date: {current_date}

Instructions: Using the provided web search results, write a comprehensive reply to the given query. Make sure to cite results using [[number](URL)] notation after the reference. If the provided search results refer to multiple subjects with the same name, write separate answers for each subject.
Query: {query}";

pub trait PromptCompiler: Send + Sync {
    /// Whether compiling needs any results at all. When false the retrieval
    /// step is skipped.
    fn references_web_results(&self) -> bool;

    /// `results` is `None` when nothing was fetched.
    fn compile(&self, results: Option<&[SearchResult]>, query: &str) -> String;
}

/// Placeholder substitution over a fixed template.
///
/// ```
/// use lantern_common::SearchResult;
/// use lantern_content::prompt::{PromptCompiler, TemplatePrompt};
///
/// let prompt = TemplatePrompt::new("{web_results}\n\nQ: {query}");
/// let results = vec![SearchResult {
///     title: "Forecast".into(),
///     body: "Sunny all week".into(),
///     url: "https://weather.example".into(),
/// }];
/// assert_eq!(
///     prompt.compile(Some(&results), "weather"),
///     "[1] \"Sunny all week\"\nURL: https://weather.example\n\nQ: weather"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct TemplatePrompt {
    template: String,
    date: Option<NaiveDate>,
}

impl Default for TemplatePrompt {
    fn default() -> Self {
        Self::new(DEFAULT_TEMPLATE)
    }
}

impl TemplatePrompt {
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            date: None,
        }
    }

    pub fn from_config(cfg: &PromptConfig) -> Self {
        cfg.template
            .as_deref()
            .map(Self::new)
            .unwrap_or_default()
    }

    /// Pin `{current_date}` instead of reading the local clock.
    pub fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    fn current_date(&self) -> String {
        let date = self.date.unwrap_or_else(|| Local::now().date_naive());
        date.format("%-m/%-d/%Y").to_string()
    }
}

fn render_results(results: &[SearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| format!("[{}] \"{}\"\nURL: {}", i + 1, r.body, r.url))
        .collect::<Vec<_>>()
        .join("\n\n")
}

impl PromptCompiler for TemplatePrompt {
    fn references_web_results(&self) -> bool {
        self.template.contains(WEB_RESULTS_PLACEHOLDER)
    }

    fn compile(&self, results: Option<&[SearchResult]>, query: &str) -> String {
        let web_results = results.map(render_results).unwrap_or_default();
        // Query last so user text containing placeholders is left alone.
        self.template
            .replace(WEB_RESULTS_PLACEHOLDER, &web_results)
            .replace(DATE_PLACEHOLDER, &self.current_date())
            .replace(QUERY_PLACEHOLDER, query)
    }
}
