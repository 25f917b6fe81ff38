use std::sync::Arc;

use lantern_actors::{ActorHandle, spawn_actor};
use lantern_common::{LanternError, SearchRequest, TimeRange};
use lantern_web::{ActorChannel, BackgroundActor, ChannelRequest, ChannelResponse, Retriever, SideChannel};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const RESULTS_PAGE: &str = r#"<html><body>
<div class="algo-sr"><h3 class="title"><a aria-label="Tokio" href="https://r.search.yahoo.com/RU=https%3a%2f%2ftokio.rs%2f/RK=2">Tokio</a></h3><div class="compText"><p>An asynchronous runtime.</p></div></div>
<div class="algo-sr"><h3 class="title"><a aria-label="Docs" href="https://r.search.yahoo.com/RU=https%3a%2f%2fdocs.rs%2ftokio/RK=2">Docs</a></h3><div class="compText"><p>API docs.</p></div></div>
</body></html>"#;

fn request(query: &str) -> SearchRequest {
    SearchRequest {
        query: query.into(),
        timerange: TimeRange::Day,
        region: "wt-wt".into(),
    }
}

#[tokio::test]
async fn search_round_trip_through_worker() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .and(query_param("q", "tokio"))
        .and(query_param("btf", "d"))
        .and(query_param("nojs", "1"))
        .and(query_param("ei", "UTF-8"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RESULTS_PAGE))
        .expect(1)
        .mount(&server)
        .await;

    let engine = format!("{}/search", server.uri());
    let ActorHandle { addr, task } = spawn_actor(BackgroundActor::new(&engine).unwrap(), 8);
    let retriever = Retriever::new(Arc::new(ActorChannel::new(addr.clone())), engine);

    let results = retriever.web_search(&request("tokio"), 1).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].title, "Tokio");
    assert_eq!(results[0].url, "https://tokio.rs/");
    assert_eq!(results[0].body, "An asynchronous runtime.");

    drop(retriever);
    drop(addr);
    task.abort();
}

#[tokio::test]
async fn engine_redirect_is_extracted_as_single_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", format!("{}/answer", server.uri()).as_str()),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/answer"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<html><head><title>Answer</title></head><body><article><p>42</p></article></body></html>",
        ))
        .mount(&server)
        .await;

    let engine = format!("{}/search", server.uri());
    let ActorHandle { addr, task } = spawn_actor(BackgroundActor::new(&engine).unwrap(), 8);
    let retriever = Retriever::new(Arc::new(ActorChannel::new(addr)), engine);

    let results = retriever.web_search(&request("meaning"), 3).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].title, "Answer");
    assert_eq!(results[0].body, "42");
    assert_eq!(results[0].url, format!("{}/answer", server.uri()));
    task.abort();
}

#[tokio::test]
async fn webpage_text_fetches_when_markup_is_missing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/post"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<title>Post</title><main><p>Body text.</p></main>",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let ActorHandle { addr, task } =
        spawn_actor(BackgroundActor::new("https://sg.search.yahoo.com/search").unwrap(), 8);
    let channel = ActorChannel::new(addr);

    let reply = channel
        .request(ChannelRequest::GetWebpageText {
            url: format!("{}/post", server.uri()),
            html: String::new(),
        })
        .await
        .unwrap();
    let page = reply.into_page_text().unwrap();
    assert_eq!(page.title, "Post");
    assert_eq!(page.body, "Body text.");
    task.abort();
}

#[tokio::test]
async fn failed_fetch_reports_status_and_keeps_worker_alive() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let engine = format!("{}/search", server.uri());
    let ActorHandle { addr, task } = spawn_actor(BackgroundActor::new(&engine).unwrap(), 8);
    let channel = ActorChannel::new(addr);

    for _ in 0..2 {
        let err = channel
            .request(ChannelRequest::GetSearchResults {
                search: request("missing"),
            })
            .await
            .unwrap_err();
        assert!(
            matches!(&err, LanternError::Retrieval(msg) if msg == "Failed to fetch: 404 Not Found"),
            "unexpected error: {err}"
        );
    }
    assert!(!matches!(
        channel
            .request(ChannelRequest::GetWebpageText {
                url: "https://example.com".into(),
                html: "<p>inline</p>".into(),
            })
            .await,
        Ok(ChannelResponse::Search(_))
    ));
    task.abort();
}
