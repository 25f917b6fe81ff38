mod common;

use std::sync::Arc;
use std::time::Duration;

use common::*;
use lantern_common::{SearchRequest, TimeRange, UserConfig};
use lantern_content::{Dispatch, IgnoreReason, SubmitTiming, TemplatePrompt};
use lantern_drivers::memory::MemoryHost;
use lantern_drivers::{EventId, SubmitEvent, Trigger};
use lantern_web::ChannelRequest;

fn click(id: u64) -> SubmitEvent {
    SubmitEvent {
        id: EventId(id),
        trigger: Trigger::Click,
    }
}

fn enter(id: u64) -> SubmitEvent {
    SubmitEvent {
        id: EventId(id),
        trigger: Trigger::enter(),
    }
}

fn weekly_us() -> UserConfig {
    UserConfig {
        web_access: true,
        num_web_results: 3,
        time_period: TimeRange::Week,
        region: "us".into(),
        ..UserConfig::default()
    }
}

#[tokio::test]
async fn web_access_off_submits_the_original_text() {
    let host = MemoryHost::chat_page();
    host.type_text("  hello there ");
    let channel = Scripted::new(vec![]);
    let cfg = UserConfig {
        web_access: false,
        ..UserConfig::default()
    };
    let interceptor = interceptor(&host, cfg, channel.clone(), stock_prompt(), fast_timing());

    assert_eq!(interceptor.dispatch(click(1)).await.unwrap(), Dispatch::Handled);

    let page = host.snapshot();
    assert_eq!(page.submitted, vec!["  hello there "]);
    assert!(page.writes.is_empty());
    assert!(channel.seen().is_empty());
    assert_eq!(page.suppressed, vec![EventId(1)]);
}

#[tokio::test]
async fn search_request_carries_the_user_settings_verbatim() {
    let host = MemoryHost::chat_page();
    host.type_text("weather");
    let channel = Scripted::new(vec![results_page()]);
    let interceptor = interceptor(&host, weekly_us(), channel.clone(), stock_prompt(), fast_timing());

    assert_eq!(interceptor.dispatch(enter(1)).await.unwrap(), Dispatch::Handled);

    assert_eq!(
        channel.seen(),
        vec![ChannelRequest::GetSearchResults {
            search: SearchRequest {
                query: "weather".into(),
                timerange: TimeRange::Week,
                region: "us".into(),
            }
        }]
    );
    let page = host.snapshot();
    assert_eq!(page.submitted.len(), 1);
    let sent = &page.submitted[0];
    assert!(sent.contains("[1] \"Sunny all week\"\nURL: https://weather.example/today"));
    assert!(sent.ends_with("Query: weather"));
    assert_eq!(page.writes, vec![sent.clone()]);
    // One input event after the rewrite, one after processing.
    assert_eq!(page.input_events, 2);
    assert_eq!(page.busy_history, vec![true, false]);
}

#[tokio::test]
async fn page_directive_extracts_and_never_searches() {
    let host = MemoryHost::chat_page();
    host.type_text("summarize page:https://example.com/a");
    let channel = Scripted::new(vec![page_text("A", "Article body")]);
    let interceptor = interceptor(&host, weekly_us(), channel.clone(), stock_prompt(), fast_timing());

    assert_eq!(interceptor.dispatch(click(1)).await.unwrap(), Dispatch::Handled);

    assert_eq!(
        channel.seen(),
        vec![ChannelRequest::GetWebpageText {
            url: "https://example.com/a".into(),
            html: String::new(),
        }]
    );
    let sent = &host.snapshot().submitted[0];
    assert!(sent.contains("[1] \"Article body\"\nURL: https://example.com/a"));
}

#[tokio::test]
async fn retrieval_failure_is_shown_and_the_text_stays() {
    let host = MemoryHost::chat_page();
    host.type_text("weather");
    let channel = Scripted::new(vec![status_page(503)]);
    let interceptor = interceptor(&host, weekly_us(), channel, stock_prompt(), fast_timing());

    assert_eq!(interceptor.dispatch(click(1)).await.unwrap(), Dispatch::Failed);

    let page = host.snapshot();
    assert_eq!(page.errors.len(), 1);
    assert!(page.errors[0].contains("Failed to fetch: 503"), "{:?}", page.errors);
    assert!(page.submitted.is_empty());
    assert_eq!(page.value, "weather");
    assert!(!page.busy);
    assert!(!interceptor.is_processing());
}

#[tokio::test]
async fn rapid_double_submit_runs_the_pipeline_once() {
    let host = MemoryHost::chat_page();
    host.type_text("weather");
    let channel = Scripted::slow(vec![results_page()], Duration::from_millis(50));
    let interceptor = interceptor(&host, weekly_us(), channel.clone(), stock_prompt(), fast_timing());

    let (first, second) = tokio::join!(interceptor.dispatch(click(1)), interceptor.dispatch(enter(2)));

    assert_eq!(first.unwrap(), Dispatch::Handled);
    assert_eq!(second.unwrap(), Dispatch::Ignored(IgnoreReason::InFlight));
    assert_eq!(channel.seen().len(), 1);
    let page = host.snapshot();
    assert_eq!(page.submitted.len(), 1);
    // The ignored second event must not lower the flag the first one holds.
    assert_eq!(page.busy_history, vec![true, false]);
}

#[tokio::test]
async fn noise_is_left_to_the_host() {
    let host = MemoryHost::chat_page();
    let channel = Scripted::new(vec![]);
    let interceptor = interceptor(&host, weekly_us(), channel.clone(), stock_prompt(), fast_timing());

    host.type_text("/pa");
    assert_eq!(
        interceptor.dispatch(enter(1)).await.unwrap(),
        Dispatch::Ignored(IgnoreReason::PartialCommand)
    );

    host.type_text("   ");
    assert_eq!(
        interceptor.dispatch(click(2)).await.unwrap(),
        Dispatch::Ignored(IgnoreReason::EmptyText)
    );

    host.type_text("weather");
    let newline = SubmitEvent {
        id: EventId(3),
        trigger: Trigger::Key {
            key: "Enter".into(),
            shift: true,
            composing: false,
        },
    };
    assert_eq!(
        interceptor.dispatch(newline).await.unwrap(),
        Dispatch::Ignored(IgnoreReason::NewlineModifier)
    );

    let page = host.snapshot();
    assert!(page.suppressed.is_empty());
    assert!(!page.busy_history.contains(&true));
    assert!(channel.seen().is_empty());
}

#[tokio::test]
async fn ignored_submit_lowers_the_page_busy_flag() {
    let host = MemoryHost::chat_page();
    let channel = Scripted::new(vec![]);
    let interceptor = interceptor(&host, weekly_us(), channel.clone(), stock_prompt(), fast_timing());

    // The page queued an Enter, then the text was cleared before it drained.
    host.update(|s| s.busy = true);
    host.type_text("   ");
    assert_eq!(
        interceptor.dispatch(enter(1)).await.unwrap(),
        Dispatch::Ignored(IgnoreReason::EmptyText)
    );
    assert!(!host.snapshot().busy);

    host.update(|s| s.busy = true);
    host.type_text("/pa");
    assert_eq!(
        interceptor.dispatch(enter(2)).await.unwrap(),
        Dispatch::Ignored(IgnoreReason::PartialCommand)
    );
    assert!(!host.snapshot().busy);

    host.update(|s| s.busy = true);
    host.tear_down_input();
    assert_eq!(
        interceptor.dispatch(click(3)).await.unwrap(),
        Dispatch::Ignored(IgnoreReason::NoInput)
    );

    let page = host.snapshot();
    assert!(!page.busy);
    assert!(page.suppressed.is_empty());
    assert!(channel.seen().is_empty());
}

#[tokio::test]
async fn template_without_results_skips_retrieval() {
    let host = MemoryHost::chat_page();
    host.type_text("weather");
    let channel = Scripted::new(vec![]);
    let prompt = Arc::new(TemplatePrompt::new("Answer briefly: {query}"));
    let interceptor = interceptor(&host, weekly_us(), channel.clone(), prompt, fast_timing());

    assert_eq!(interceptor.dispatch(click(1)).await.unwrap(), Dispatch::Handled);
    assert!(channel.seen().is_empty());
    assert_eq!(host.snapshot().submitted, vec!["Answer briefly: weather"]);
}

#[tokio::test]
async fn submit_waits_for_the_button_to_enable() {
    let host = MemoryHost::chat_page();
    host.type_text("hello");
    host.update(|s| s.disabled_polls = 3);
    let cfg = UserConfig {
        web_access: false,
        ..UserConfig::default()
    };
    let interceptor = interceptor(&host, cfg, Scripted::new(vec![]), stock_prompt(), fast_timing());

    assert_eq!(interceptor.dispatch(click(1)).await.unwrap(), Dispatch::Handled);

    let page = host.snapshot();
    assert_eq!(page.disabled_checks, 4);
    assert_eq!(page.focus_calls, 1);
    assert_eq!(page.submitted, vec!["hello"]);
}

#[tokio::test]
async fn button_that_never_enables_times_out() {
    let host = MemoryHost::chat_page();
    host.type_text("hello");
    host.update(|s| s.disabled_polls = usize::MAX);
    let cfg = UserConfig {
        web_access: false,
        ..UserConfig::default()
    };
    let timing = SubmitTiming {
        enable_timeout: Duration::from_millis(30),
        ..fast_timing()
    };
    let interceptor = interceptor(&host, cfg, Scripted::new(vec![]), stock_prompt(), timing);

    assert_eq!(interceptor.dispatch(click(1)).await.unwrap(), Dispatch::Failed);

    let page = host.snapshot();
    assert!(page.submitted.is_empty());
    assert!(page.errors[0].starts_with("Submit button stayed disabled"), "{:?}", page.errors);
    assert!(!interceptor.is_processing());
}

#[tokio::test]
async fn missing_input_area_is_ignored() {
    let host = MemoryHost::blank_page();
    let interceptor = interceptor(&host, weekly_us(), Scripted::new(vec![]), stock_prompt(), fast_timing());
    assert_eq!(
        interceptor.dispatch(click(1)).await.unwrap(),
        Dispatch::Ignored(IgnoreReason::NoInput)
    );
}
