#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use lantern_common::{LanternError, PageText, SearchResponse, SlashCommands, UserConfig, UserConfigSource};
use lantern_content::{Augmenter, PromptCompiler, QueryProcessor, SubmitInterceptor, SubmitTiming, TemplatePrompt};
use lantern_drivers::memory::MemoryHost;
use lantern_web::{ChannelRequest, ChannelResponse, Retriever, SideChannel};

pub const ENGINE: &str = "https://sg.search.yahoo.com/search";

/// Replays canned replies, optionally after a delay, and records requests.
pub struct Scripted {
    replies: Mutex<Vec<ChannelResponse>>,
    seen: Mutex<Vec<ChannelRequest>>,
    delay: Duration,
}

impl Scripted {
    pub fn new(mut replies: Vec<ChannelResponse>) -> Arc<Self> {
        replies.reverse();
        Arc::new(Self {
            replies: Mutex::new(replies),
            seen: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
        })
    }

    pub fn slow(mut replies: Vec<ChannelResponse>, delay: Duration) -> Arc<Self> {
        replies.reverse();
        Arc::new(Self {
            replies: Mutex::new(replies),
            seen: Mutex::new(Vec::new()),
            delay,
        })
    }

    pub fn seen(&self) -> Vec<ChannelRequest> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl SideChannel for Scripted {
    async fn request(&self, req: ChannelRequest) -> lantern_common::Result<ChannelResponse> {
        self.seen.lock().unwrap().push(req);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.replies
            .lock()
            .unwrap()
            .pop()
            .ok_or_else(|| LanternError::Channel("no scripted reply".into()))
    }
}

/// A config source that takes a while to answer.
pub struct SlowConfig(pub UserConfig, pub Duration);

#[async_trait]
impl UserConfigSource for SlowConfig {
    async fn user_config(&self) -> lantern_common::Result<UserConfig> {
        tokio::time::sleep(self.1).await;
        Ok(self.0.clone())
    }
}

pub fn results_page() -> ChannelResponse {
    ChannelResponse::Search(SearchResponse {
        status: 200,
        html: r#"<html><body>
            <div class="dd algo algo-sr Sr">
              <h3 class="title"><a aria-label="Forecast" href="https://r.search.yahoo.com/RU=https%3a%2f%2fweather.example%2ftoday/RK=2">Forecast</a></h3>
              <div class="compText"><p>Sunny all week</p></div>
            </div>
        </body></html>"#
            .into(),
        url: format!("{ENGINE}?q=weather"),
    })
}

pub fn status_page(status: u16) -> ChannelResponse {
    ChannelResponse::Search(SearchResponse {
        status,
        html: String::new(),
        url: format!("{ENGINE}?q=weather"),
    })
}

pub fn page_text(title: &str, body: &str) -> ChannelResponse {
    ChannelResponse::PageText(PageText {
        title: title.into(),
        body: body.into(),
    })
}

pub fn fast_timing() -> SubmitTiming {
    SubmitTiming {
        poll_interval: Duration::from_millis(1),
        enable_timeout: Duration::from_secs(2),
        settle_delay: Duration::ZERO,
    }
}

pub fn augmenter(channel: Arc<Scripted>, prompt: Arc<dyn PromptCompiler>) -> Augmenter {
    Augmenter::new(Retriever::new(channel, ENGINE), prompt)
}

pub fn stock_prompt() -> Arc<dyn PromptCompiler> {
    Arc::new(TemplatePrompt::default())
}

pub fn interceptor(
    host: &MemoryHost,
    cfg: UserConfig,
    channel: Arc<Scripted>,
    prompt: Arc<dyn PromptCompiler>,
    timing: SubmitTiming,
) -> SubmitInterceptor {
    let host: Arc<MemoryHost> = Arc::new(host.clone());
    let processor = QueryProcessor::new(host.clone(), Arc::new(cfg), augmenter(channel, prompt))
        .with_timing(timing);
    SubmitInterceptor::new(host, processor, SlashCommands::default())
}

/// Poll `cond` until it holds or two seconds pass.
pub async fn eventually(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    cond()
}
