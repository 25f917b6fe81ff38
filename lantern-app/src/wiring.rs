use std::sync::Arc;

use anyhow::Result;
use lantern_actors::ActorSystem;
use lantern_common::UserConfigSource;
use lantern_config::LanternConfig;
use lantern_content::{Augmenter, ContentScript, SubmitTiming, TemplatePrompt};
use lantern_drivers::webdriver::BrowserSession;
use lantern_web::{ActorChannel, BackgroundActor, Retriever};
use tokio_util::sync::CancellationToken;

const SIDE_CHANNEL_MAILBOX: usize = 64;

/// Start the privileged worker and return the retriever that talks to it.
pub fn start_side_channel(cfg: &LanternConfig) -> Result<(ActorSystem, Retriever)> {
    let mut system = ActorSystem::new();
    let worker = BackgroundActor::new(&cfg.search.base_url)?
        .with_timeout(cfg.search.timeout())
        .with_retries(cfg.search.max_retries as usize);
    let addr = system.spawn(worker, SIDE_CHANNEL_MAILBOX);
    let retriever = Retriever::new(Arc::new(ActorChannel::new(addr)), cfg.search.base_url.clone());
    Ok((system, retriever))
}

fn augmenter(cfg: &LanternConfig, retriever: Retriever) -> Augmenter {
    Augmenter::new(retriever, Arc::new(TemplatePrompt::from_config(&cfg.prompt)))
}

/// Config, retrieval and compilation without a host page.
pub async fn search(cfg: &LanternConfig, query: &str) -> Result<String> {
    let (system, retriever) = start_side_channel(cfg)?;
    let outcome = augmenter(cfg, retriever).augment(query, &cfg.user).await;
    system.graceful_shutdown().await?;
    Ok(outcome?)
}

/// Drive a live chat page until `unload` fires or the page goes away.
pub async fn attach(
    cfg: LanternConfig,
    user: Arc<dyn UserConfigSource>,
    headless: bool,
    unload: CancellationToken,
) -> Result<()> {
    let mut host_cfg = cfg.host.clone();
    host_cfg.headless |= headless;

    let (system, retriever) = start_side_channel(&cfg)?;
    let session = BrowserSession::connect(host_cfg).await?;
    let host = Arc::new(session.open_chat().await?);

    let script = ContentScript::assemble(
        host,
        user,
        augmenter(&cfg, retriever),
        cfg.commands.clone(),
        SubmitTiming::from_config(&cfg.submit),
    );
    let outcome = script.run(unload).await;

    system.graceful_shutdown().await?;
    session.close().await?;
    Ok(outcome?)
}
