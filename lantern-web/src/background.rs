//! Privileged side of the channel: the only place Lantern performs network I/O.
//!
//! [`BackgroundActor`] serves [`ChannelRequest`]s one at a time from its
//! mailbox; [`ActorChannel`] is the content-script view of that mailbox.
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use lantern_actors::{Actor, Addr, Context};
use lantern_common::{LanternError, SearchRequest, SearchResponse};
use lantern_http::{HttpClient, HttpError, RequestOpts};
use tokio::sync::oneshot;

use crate::channel::{ChannelRequest, ChannelResponse, SideChannel};
use crate::extract::extract_page_text;

pub struct BackgroundMsg {
    pub request: ChannelRequest,
    pub reply: oneshot::Sender<lantern_common::Result<ChannelResponse>>,
}

pub struct BackgroundActor {
    client: HttpClient,
}

impl BackgroundActor {
    /// `engine_base` is the results endpoint, e.g. `https://sg.search.yahoo.com/search`.
    pub fn new(engine_base: &str) -> Result<Self, HttpError> {
        Ok(Self {
            client: HttpClient::new(engine_base)?,
        })
    }

    pub fn with_client(client: HttpClient) -> Self {
        Self { client }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = self.client.with_timeout(timeout);
        self
    }

    pub fn with_retries(mut self, retries: usize) -> Self {
        self.client = self.client.with_retries(retries);
        self
    }

    async fn search(&self, search: &SearchRequest) -> lantern_common::Result<SearchResponse> {
        tracing::info!(
            query = %search.query,
            timerange = search.timerange.code(),
            region = %search.region,
            "web.search.start",
        );
        let opts = RequestOpts::default()
            .with_query("q", search.query.as_str())
            .with_query("btf", search.timerange.code())
            .with_query("nojs", "1")
            .with_query("ei", "UTF-8");
        let page = self.client.get_text("", opts).await.map_err(fetch_error)?;

        tracing::info!(
            status = page.status,
            final_url = %page.final_url,
            html_len = page.body.len(),
            "web.search.done",
        );
        Ok(SearchResponse {
            status: page.status,
            html: page.body,
            url: page.final_url,
        })
    }

    async fn webpage_text(&self, url: &str, html: String) -> lantern_common::Result<ChannelResponse> {
        let html = if html.is_empty() {
            tracing::info!(url = %url, "web.page.fetch");
            self.client
                .get_text(url, RequestOpts::default().absolute())
                .await
                .map_err(fetch_error)?
                .body
        } else {
            html
        };
        let page = extract_page_text(&html);
        tracing::debug!(
            url = %url,
            title = %page.title,
            body_len = page.body.len(),
            "web.page.extracted",
        );
        Ok(ChannelResponse::PageText(page))
    }

    async fn serve(&self, request: ChannelRequest) -> lantern_common::Result<ChannelResponse> {
        match request {
            ChannelRequest::GetSearchResults { search } => {
                self.search(&search).await.map(ChannelResponse::Search)
            }
            ChannelRequest::GetWebpageText { url, html } => self.webpage_text(&url, html).await,
        }
    }
}

fn fetch_error(err: HttpError) -> LanternError {
    match err.status() {
        Some(status) => LanternError::Retrieval(format!("Failed to fetch: {status}")),
        None => LanternError::Retrieval(err.to_string()),
    }
}

#[async_trait]
impl Actor for BackgroundActor {
    type Msg = BackgroundMsg;

    async fn handle(&mut self, msg: Self::Msg, _ctx: &mut Context<Self>) -> Result<()> {
        let BackgroundMsg { request, reply } = msg;
        let kind = request.kind();
        let outcome = self.serve(request).await;
        if let Err(e) = &outcome {
            tracing::warn!(kind, error = %e, "web.channel.failed");
        }
        if reply.send(outcome).is_err() {
            tracing::debug!(kind, "web.channel.reply_dropped");
        }
        Ok(())
    }
}

/// [`SideChannel`] over a [`BackgroundActor`] mailbox.
#[derive(Clone)]
pub struct ActorChannel {
    addr: Addr<BackgroundActor>,
}

impl ActorChannel {
    pub fn new(addr: Addr<BackgroundActor>) -> Self {
        Self { addr }
    }
}

#[async_trait]
impl SideChannel for ActorChannel {
    async fn request(&self, req: ChannelRequest) -> lantern_common::Result<ChannelResponse> {
        self.addr
            .ask(|reply| BackgroundMsg {
                request: req,
                reply,
            })
            .await
            .map_err(|e| LanternError::Channel(e.to_string()))?
    }
}
