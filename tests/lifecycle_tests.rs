mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use common::{lesson, FakeApi};
use fluency::api::{Lesson, LessonApi, LessonDetail, LessonSnapshot, LessonStatus, TranscriptSegment};
use fluency::lifecycle::{
    Affordance, CommandOutcome, LessonFilter, LifecycleTracker, PracticeState, ALL_CATEGORIES,
};

const POLL: Duration = Duration::from_secs(3);
const LINGER: Duration = Duration::from_secs(1);

fn library() -> FakeApi {
    FakeApi::with_lessons(vec![
        (
            "daily_life",
            vec![
                lesson("dl1", "Ordering Coffee", LessonStatus::Ready),
                lesson("dl2", "Small Talk at Work", LessonStatus::NotStarted),
            ],
        ),
        (
            "science",
            vec![
                lesson("sc1", "Why Do We Sleep?", LessonStatus::Transcribing),
                lesson("sc2", "Sleep and Memory", LessonStatus::Ready),
            ],
        ),
        ("custom", vec![lesson("cu1", "My Video", LessonStatus::NotStarted)]),
    ])
}

fn tracker(api: Arc<FakeApi>) -> LifecycleTracker {
    LifecycleTracker::new(api, POLL, LINGER)
}

fn ids(groups: &[(&str, Vec<&Lesson>)]) -> Vec<String> {
    groups
        .iter()
        .flat_map(|(_, lessons)| lessons.iter().map(|l| l.id.clone()))
        .collect()
}

#[test]
fn categories_partition_the_snapshot() {
    let snapshot = LessonSnapshot::new(vec![
        (
            "science".to_string(),
            vec![lesson("a", "A", LessonStatus::Ready)],
        ),
        (
            "business".to_string(),
            vec![
                lesson("b", "B", LessonStatus::Ready),
                // Already listed under science
                lesson("a", "A again", LessonStatus::Ready),
            ],
        ),
        (
            "science".to_string(),
            vec![lesson("c", "C", LessonStatus::Ready)],
        ),
    ]);

    let all = ids(&LessonFilter::new(Some(ALL_CATEGORIES.to_string()), "").apply(&snapshot));
    assert_eq!(all.len(), snapshot.len());

    let mut seen = HashSet::new();
    for category in snapshot.categories() {
        let filter = LessonFilter::new(Some(category.to_string()), "");
        for id in ids(&filter.apply(&snapshot)) {
            assert!(seen.insert(id), "lesson listed in two categories");
        }
    }
    assert_eq!(seen.len(), all.len());
    assert_eq!(snapshot.categories().collect::<Vec<_>>(), ["science", "business"]);
}

#[test]
fn longer_queries_never_match_more() {
    let snapshot = tokio_test::block_on(library().list_lessons()).expect("fake snapshot");

    let mut previous = usize::MAX;
    for query in ["", "s", "sl", "sle", "sleep", "sleep and"] {
        let count = ids(&LessonFilter::new(None, query).apply(&snapshot)).len();
        assert!(count <= previous, "query {:?} matched more", query);
        previous = count;
    }
    assert_eq!(previous, 1);
}

#[tokio::test]
async fn blank_add_issues_no_request() {
    let api = Arc::new(library());
    let tracker = tracker(api.clone());

    assert_eq!(tracker.request_add("   ", "custom").await, CommandOutcome::Skipped);
    assert_eq!(FakeApi::calls(&api.add_calls), 0);
    assert_eq!(FakeApi::calls(&api.list_calls), 0);
}

#[tokio::test]
async fn accepted_add_refreshes_the_snapshot() {
    let api = Arc::new(library());
    let tracker = tracker(api.clone());

    let outcome = tracker
        .request_add(" https://youtu.be/abc ", "custom")
        .await;
    assert!(outcome.is_accepted());
    assert_eq!(FakeApi::calls(&api.list_calls), 1);

    let snapshot = tracker.store().current().expect("snapshot after add");
    let (category, added) = snapshot.find("custom_1").expect("new lesson listed");
    assert_eq!(category, "custom");
    assert_eq!(added.url.as_deref(), Some("https://youtu.be/abc"));
}

#[tokio::test]
async fn rejected_add_surfaces_backend_detail() {
    let api = Arc::new(library());
    api.reject_adds("Invalid YouTube URL");
    let tracker = tracker(api.clone());

    let outcome = tracker.request_add("https://example.com", "custom").await;
    assert_eq!(
        outcome,
        CommandOutcome::Failed("Invalid YouTube URL".to_string())
    );
    assert_eq!(FakeApi::calls(&api.list_calls), 0);
}

#[tokio::test]
async fn unreachable_server_fails_the_add() {
    let api = Arc::new(library().failing_add());
    let tracker = tracker(api.clone());

    let outcome = tracker.request_add("https://youtu.be/abc", "custom").await;
    assert_eq!(
        outcome,
        CommandOutcome::Failed("Failed to connect to server.".to_string())
    );
    assert_eq!(FakeApi::calls(&api.add_calls), 1);
    assert_eq!(FakeApi::calls(&api.list_calls), 0);
}

#[tokio::test]
async fn toggling_done_twice_is_idempotent() {
    let api = Arc::new(library());
    let tracker = tracker(api.clone());
    let snapshot = tracker.refresh().await.expect("initial snapshot");
    assert_eq!(tracker.progress(&snapshot).done, 0);

    for _ in 0..2 {
        assert!(tracker.toggle_done("dl1", true).await.is_accepted());
    }

    assert!(tracker.is_done("dl1"));
    assert_eq!(FakeApi::calls(&api.done_calls), 2);

    let snapshot = tracker.store().current().expect("snapshot");
    assert_eq!(tracker.progress(&snapshot).done, 1);
    assert!(snapshot.find("dl1").map(|(_, l)| l.done).unwrap_or(false));
}

#[tokio::test]
async fn unready_lessons_cannot_be_completed() {
    let api = Arc::new(library());
    let tracker = tracker(api.clone());
    tracker.refresh().await;

    let outcome = tracker.toggle_done("sc1", true).await;
    assert!(matches!(outcome, CommandOutcome::Failed(_)));
    assert_eq!(FakeApi::calls(&api.done_calls), 0);
    assert!(!tracker.is_done("sc1"));
}

#[tokio::test]
async fn failed_done_keeps_the_optimistic_flag() {
    let api = Arc::new(library().failing_done());
    let tracker = tracker(api.clone());
    tracker.refresh().await;

    let outcome = tracker.toggle_done("dl1", true).await;
    assert_eq!(
        outcome,
        CommandOutcome::Failed("Failed to save progress.".to_string())
    );
    assert_eq!(FakeApi::calls(&api.done_calls), 1);

    // The snapshot was refreshed and still says not done
    assert_eq!(FakeApi::calls(&api.list_calls), 2);
    let snapshot = tracker.store().current().expect("snapshot");
    assert!(!snapshot.find("dl1").map(|(_, l)| l.done).unwrap_or(true));

    assert!(tracker.is_done("dl1"));
    assert_eq!(tracker.progress(&snapshot).done, 1);
}

#[tokio::test(start_paused = true)]
async fn older_toggle_does_not_clobber_newer_one() {
    let api = Arc::new(library().with_delay(Duration::from_millis(200)));
    let tracker = Arc::new(tracker(api.clone()));
    tracker.refresh().await;

    let mark = {
        let tracker = tracker.clone();
        tokio::spawn(async move { tracker.toggle_done("dl1", true).await })
    };
    tokio::task::yield_now().await;
    assert!(tracker.is_done("dl1"));

    tokio::time::sleep(Duration::from_millis(100)).await;
    let unmark = {
        let tracker = tracker.clone();
        tokio::spawn(async move { tracker.toggle_done("dl1", false).await })
    };
    tokio::task::yield_now().await;
    assert!(!tracker.is_done("dl1"));

    // The first request lands with the server saying done
    assert!(mark.await.expect("mark task").is_accepted());
    let snapshot = tracker.store().current().expect("snapshot");
    assert!(snapshot.find("dl1").map(|(_, l)| l.done).unwrap_or(false));
    assert!(!tracker.is_done("dl1"));

    assert!(unmark.await.expect("unmark task").is_accepted());
    assert!(!tracker.is_done("dl1"));
    let snapshot = tracker.store().current().expect("snapshot");
    assert_eq!(tracker.progress(&snapshot).done, 0);
}

#[tokio::test(start_paused = true)]
async fn detail_polls_until_ready() {
    let api = Arc::new(library());
    let mut ready = LessonDetail::with_status(LessonStatus::Ready);
    ready.video_url = Some("/videos/sc1.mp4".to_string());
    ready.transcript = Some(vec![
        TranscriptSegment::new(0, 0.0, 2.5, "Why do we sleep?"),
        TranscriptSegment::new(1, 2.5, 6.0, "Nobody is quite sure."),
    ]);
    api.script_details(vec![
        LessonDetail::with_status(LessonStatus::Downloading),
        LessonDetail::with_status(LessonStatus::Transcribing),
        ready,
    ]);

    let tracker = tracker(api.clone());
    let stream = tracker.watch_lesson("science", "sc1");

    match stream.finished().await {
        PracticeState::Ready {
            video_url,
            transcript,
        } => {
            assert_eq!(video_url.as_deref(), Some("/videos/sc1.mp4"));
            assert_eq!(transcript.len(), 2);
        }
        other => panic!("expected ready, got {:?}", other),
    }
    assert_eq!(FakeApi::calls(&api.detail_calls), 3);

    tokio::time::sleep(POLL * 5).await;
    assert_eq!(FakeApi::calls(&api.detail_calls), 3);
}

#[tokio::test(start_paused = true)]
async fn detail_failure_stops_polling() {
    let api = Arc::new(library());
    api.script_details(vec![LessonDetail::with_status(LessonStatus::Downloading)]);
    api.then_drop_connection();
    let tracker = tracker(api.clone());

    let state = tracker.watch_lesson("science", "sc1").finished().await;
    assert_eq!(state, PracticeState::Processing(LessonStatus::Downloading));
    assert_eq!(FakeApi::calls(&api.detail_calls), 2);

    tokio::time::sleep(POLL * 10).await;
    assert_eq!(FakeApi::calls(&api.detail_calls), 2);
}

#[tokio::test(start_paused = true)]
async fn detail_failure_before_any_response_is_not_ready() {
    let api = Arc::new(library());
    api.then_drop_connection();
    let tracker = tracker(api.clone());

    let state = tracker.watch_lesson("science", "sc1").finished().await;
    assert_eq!(state, PracticeState::NotReady);
    assert_eq!(FakeApi::calls(&api.detail_calls), 1);
}

#[tokio::test(start_paused = true)]
async fn detail_of_unstarted_lesson_is_not_ready() {
    let api = Arc::new(library());
    api.script_details(vec![LessonDetail::with_status(LessonStatus::NotStarted)]);
    let tracker = tracker(api.clone());

    let state = tracker.watch_lesson("daily_life", "dl2").finished().await;
    assert_eq!(state, PracticeState::NotReady);
    assert_eq!(FakeApi::calls(&api.detail_calls), 1);
}

#[tokio::test(start_paused = true)]
async fn starting_indicator_lingers_after_the_request() {
    let api = Arc::new(library().with_delay(Duration::from_millis(200)));
    let tracker = Arc::new(tracker(api.clone()));
    tracker.refresh().await;

    let task = {
        let tracker = tracker.clone();
        tokio::spawn(async move { tracker.request_start("daily_life", "dl2").await })
    };
    tokio::task::yield_now().await;

    // In flight: shown as busy even though the snapshot still says not started
    assert!(tracker.is_starting("dl2"));
    let snapshot = tracker.store().current().expect("snapshot");
    let board = tracker.board(&snapshot, &LessonFilter::new(Some("daily_life".to_string()), ""));
    let card = board[0].1.iter().find(|c| c.lesson.id == "dl2").expect("card");
    assert_eq!(card.lesson.status, LessonStatus::NotStarted);
    assert_eq!(card.affordance(), Affordance::Busy);

    let outcome = task.await.expect("start task");
    assert!(outcome.is_accepted());
    assert_eq!(tracker.status("dl2"), Some(LessonStatus::Downloading));

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(tracker.is_starting("dl2"));

    tokio::time::sleep(Duration::from_millis(600)).await;
    assert!(!tracker.is_starting("dl2"));
}

#[tokio::test(start_paused = true)]
async fn failed_start_still_clears_the_indicator() {
    let api = Arc::new(library().failing_start());
    let tracker = tracker(api.clone());

    let outcome = tracker.request_start("custom", "cu1").await;
    assert_eq!(
        outcome,
        CommandOutcome::Failed("Failed to start download.".to_string())
    );
    assert!(tracker.is_starting("cu1"));

    tokio::time::sleep(LINGER + Duration::from_millis(1)).await;
    assert!(!tracker.is_starting("cu1"));
}

#[tokio::test(start_paused = true)]
async fn polling_follows_subscriptions() {
    let api = Arc::new(library());
    let tracker = tracker(api.clone());
    let store = tracker.store().clone();
    assert_eq!(store.key(), "/api/lessons");

    let mut first = tracker.subscribe();
    let snapshot = first.changed().await.expect("first poll");
    assert_eq!(snapshot.len(), 5);

    let second = tracker.subscribe();
    assert_eq!(store.subscriber_count(), 2);
    assert!(second.current().is_some());

    tokio::time::sleep(POLL + Duration::from_millis(10)).await;
    assert_eq!(FakeApi::calls(&api.list_calls), 2);

    drop(first);
    assert_eq!(store.subscriber_count(), 1);
    assert!(store.current().is_some());

    drop(second);
    assert_eq!(store.subscriber_count(), 0);
    assert!(store.current().is_none());

    let calls = FakeApi::calls(&api.list_calls);
    tokio::time::sleep(POLL * 4).await;
    assert_eq!(FakeApi::calls(&api.list_calls), calls);
}
