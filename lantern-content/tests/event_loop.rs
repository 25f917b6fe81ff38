mod common;

use std::sync::Arc;

use common::*;
use lantern_common::{LanternError, SlashCommands, UserConfig};
use lantern_content::ContentScript;
use lantern_drivers::memory::MemoryHost;
use lantern_drivers::{HostEvent, MutationRecord, Trigger};
use tokio_util::sync::CancellationToken;

fn script(host: &MemoryHost, cfg: UserConfig) -> Arc<ContentScript> {
    Arc::new(ContentScript::assemble(
        Arc::new(host.clone()),
        Arc::new(cfg),
        augmenter(Scripted::new(vec![]), stock_prompt()),
        SlashCommands::default(),
        fast_timing(),
    ))
}

#[tokio::test]
async fn loop_keeps_the_surface_alive_and_handles_submits() {
    let host = MemoryHost::chat_page();
    let cfg = UserConfig {
        web_access: false,
        ..UserConfig::default()
    };
    let script = script(&host, cfg);
    let cancel = CancellationToken::new();
    let running = tokio::spawn({
        let script = script.clone();
        let cancel = cancel.clone();
        async move { script.run(cancel).await }
    });

    assert!(eventually(|| host.snapshot().observing).await);
    assert_eq!(host.snapshot().surface_mounts, 1);

    // Host throws its input region away and rebuilds it.
    host.tear_down_input();
    host.remove_nodes(4).await.unwrap();
    host.rebuild_input();
    host.remove_nodes(1).await.unwrap();
    assert!(eventually(|| host.snapshot().surface_mounts == 2).await);

    // Additions alone never remount.
    host.emit(HostEvent::Mutations {
        records: vec![MutationRecord::addition(2)],
    })
    .await
    .unwrap();

    host.type_text("hello");
    host.submit(Trigger::Click).await.unwrap();
    assert!(eventually(|| host.snapshot().submitted == vec!["hello".to_string()]).await);

    cancel.cancel();
    running.await.unwrap().unwrap();

    let page = host.snapshot();
    assert!(!page.observing);
    assert_eq!(page.surface_mounts, 2);
    assert!(page.errors.is_empty());
}

#[tokio::test]
async fn unload_stops_the_loop() {
    let host = MemoryHost::chat_page();
    let script = script(&host, UserConfig::default());
    let running = tokio::spawn({
        let script = script.clone();
        async move { script.run(CancellationToken::new()).await }
    });

    assert!(eventually(|| host.snapshot().observing).await);
    host.emit(HostEvent::Unloaded).await.unwrap();
    running.await.unwrap().unwrap();
    assert!(!host.snapshot().observing);
}

#[tokio::test]
async fn missing_root_is_an_error() {
    let host = MemoryHost::default();
    let script = script(&host, UserConfig::default());
    let err = script.run(CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, LanternError::Host(_)));
}
