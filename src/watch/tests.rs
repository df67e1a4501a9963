use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};

use super::debouncer::{ChangeKind, Debouncer, is_temp_file};
use super::{Change, Trigger, WatchBinding, WatchHandle, matched_changes};
use crate::asset::Globs;
use crate::reload::{ReloadChannel, ReloadEvent, ReloadKind};

const WINDOW: Duration = Duration::from_millis(200);

fn make_event(paths: Vec<&str>, kind: notify::EventKind) -> notify::Event {
    notify::Event {
        kind,
        paths: paths.into_iter().map(PathBuf::from).collect(),
        attrs: Default::default(),
    }
}

fn modify_kind() -> notify::EventKind {
    notify::EventKind::Modify(notify::event::ModifyKind::Data(
        notify::event::DataChange::Any,
    ))
}

fn counting(counter: Arc<AtomicUsize>) -> Trigger {
    Arc::new(move || {
        let counter = Arc::clone(&counter);
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
        }
        .boxed()
    })
}

/// Records (start, end) of every run; each run takes `duration`.
fn timed(runs: Arc<Mutex<Vec<(Instant, Instant)>>>, duration: Duration) -> Trigger {
    Arc::new(move || {
        let runs = Arc::clone(&runs);
        async move {
            let start = Instant::now();
            sleep(duration).await;
            runs.lock().push((start, Instant::now()));
        }
        .boxed()
    })
}

fn binding(trigger: Trigger) -> (mpsc::UnboundedSender<Change>, WatchHandle) {
    let (tx, rx) = mpsc::unbounded_channel();
    let binding = WatchBinding::new(
        "test",
        "/site/src",
        Globs::new(&["**/*.scss"]).unwrap(),
        WINDOW,
        trigger,
    );
    (tx, binding.spawn(rx, None))
}

/// Publishes a copy of `event` on every run.
fn publishing(channel: &ReloadChannel, event: ReloadEvent) -> Trigger {
    let channel = channel.clone();
    Arc::new(move || {
        let (channel, event) = (channel.clone(), event.clone());
        async move {
            channel.broadcast(event);
        }
        .boxed()
    })
}

/// A binding under `/site/src` fed through the same filter as the
/// filesystem listener.
struct Fed {
    tx: mpsc::UnboundedSender<Change>,
    globs: Globs,
    handle: WatchHandle,
}

fn fed(name: &str, patterns: &[&str], trigger: Trigger) -> Fed {
    let (tx, rx) = mpsc::unbounded_channel();
    let globs = Globs::new(patterns).unwrap();
    let binding = WatchBinding::new(name, "/site/src", globs.clone(), WINDOW, trigger);
    Fed {
        tx,
        globs,
        handle: binding.spawn(rx, None),
    }
}

/// Deliver one filesystem event to every binding, like separate listeners would.
fn deliver(bindings: &[&Fed], paths: Vec<&str>) {
    let event = make_event(paths, modify_kind());
    let roots = vec![PathBuf::from("/site/src")];
    for binding in bindings {
        for change in matched_changes(&event, &roots, &binding.globs) {
            binding.tx.send(change).unwrap();
        }
    }
}

fn change(path: &str) -> Change {
    (PathBuf::from(path), ChangeKind::Modified)
}

// ============================================================================
// debouncer
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_debouncer_empty() {
    let debouncer = Debouncer::new(WINDOW);
    assert!(!debouncer.is_ready());
    assert!(!debouncer.has_pending());
}

#[tokio::test(start_paused = true)]
async fn test_debouncer_waits_for_quiet_window() {
    let mut debouncer = Debouncer::new(WINDOW);
    debouncer.add(PathBuf::from("a.scss"), ChangeKind::Modified);

    sleep(Duration::from_millis(150)).await;
    assert!(debouncer.take_if_ready().is_none());
    // A new event restarts the window
    debouncer.add(PathBuf::from("b.scss"), ChangeKind::Modified);
    sleep(Duration::from_millis(150)).await;
    assert!(debouncer.take_if_ready().is_none());
    assert!(debouncer.sleep_duration() <= Duration::from_millis(50));

    sleep(Duration::from_millis(50)).await;
    let batch = debouncer.take_if_ready().unwrap();
    // Sorted by path
    assert_eq!(
        batch,
        vec![
            (PathBuf::from("a.scss"), ChangeKind::Modified),
            (PathBuf::from("b.scss"), ChangeKind::Modified),
        ]
    );
    assert!(!debouncer.has_pending());
}

#[tokio::test(start_paused = true)]
async fn test_debouncer_dedup_rules() {
    let mut debouncer = Debouncer::new(WINDOW);

    debouncer.add(PathBuf::from("a"), ChangeKind::Modified);
    debouncer.add(PathBuf::from("a"), ChangeKind::Modified);
    debouncer.add(PathBuf::from("b"), ChangeKind::Modified);
    debouncer.add(PathBuf::from("b"), ChangeKind::Removed);
    debouncer.add(PathBuf::from("c"), ChangeKind::Created);
    debouncer.add(PathBuf::from("c"), ChangeKind::Removed);
    debouncer.add(PathBuf::from("d"), ChangeKind::Removed);
    debouncer.add(PathBuf::from("d"), ChangeKind::Created);

    assert_eq!(debouncer.changes.len(), 3);
    assert_eq!(debouncer.changes[&PathBuf::from("a")], ChangeKind::Modified);
    assert_eq!(debouncer.changes[&PathBuf::from("b")], ChangeKind::Removed);
    assert_eq!(debouncer.changes[&PathBuf::from("d")], ChangeKind::Created);
}

#[test]
fn test_is_temp_file() {
    assert!(is_temp_file(&PathBuf::from("/src/main.scss~")));
    assert!(is_temp_file(&PathBuf::from("/src/.main.scss.swp")));
    assert!(is_temp_file(&PathBuf::from("/src/index.html.bak")));
    assert!(!is_temp_file(&PathBuf::from("/src/index.html")));
}

// ============================================================================
// event filtering
// ============================================================================

#[test]
fn test_matched_changes_filters_by_glob() {
    let roots = vec![PathBuf::from("/site/src")];
    let globs = Globs::new(&["assets/styles/*.scss"]).unwrap();
    let event = make_event(
        vec![
            "/site/src/assets/styles/main.scss",
            "/site/src/assets/scripts/main.js",
            "/elsewhere/assets/styles/x.scss",
        ],
        modify_kind(),
    );

    let changes = matched_changes(&event, &roots, &globs);
    assert_eq!(
        changes,
        vec![(PathBuf::from("assets/styles/main.scss"), ChangeKind::Modified)]
    );
}

#[test]
fn test_metadata_events_ignored() {
    let roots = vec![PathBuf::from("/site/src")];
    let globs = Globs::new(&["**"]).unwrap();
    let event = make_event(
        vec!["/site/src/index.html"],
        notify::EventKind::Modify(notify::event::ModifyKind::Metadata(
            notify::event::MetadataKind::WriteTime,
        )),
    );
    assert!(matched_changes(&event, &roots, &globs).is_empty());
}

#[test]
fn test_overlapping_bindings_both_match() {
    // Two bindings whose globs overlap each see the same change, so both
    // trigger. There is no deduplication across bindings.
    let roots = vec![PathBuf::from("/site/src")];
    let pages = Globs::new(&["*.html"]).unwrap();
    let everything = Globs::new(&["**"]).unwrap();
    let event = make_event(vec!["/site/src/index.html"], modify_kind());

    assert_eq!(matched_changes(&event, &roots, &pages).len(), 1);
    assert_eq!(matched_changes(&event, &roots, &everything).len(), 1);
}

// ============================================================================
// binding loop
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_burst_triggers_once() {
    let counter = Arc::new(AtomicUsize::new(0));
    let (tx, handle) = binding(counting(Arc::clone(&counter)));

    for _ in 0..10 {
        tx.send(change("assets/styles/main.scss")).unwrap();
        sleep(Duration::from_millis(50)).await;
    }
    sleep(Duration::from_secs(1)).await;

    assert_eq!(counter.load(Ordering::SeqCst), 1);
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_separate_bursts_trigger_separately() {
    let counter = Arc::new(AtomicUsize::new(0));
    let (tx, handle) = binding(counting(Arc::clone(&counter)));

    tx.send(change("a.scss")).unwrap();
    sleep(Duration::from_secs(1)).await;
    tx.send(change("a.scss")).unwrap();
    sleep(Duration::from_secs(1)).await;

    assert_eq!(counter.load(Ordering::SeqCst), 2);
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_changes_during_run_queue_one_rerun() {
    let runs = Arc::new(Mutex::new(Vec::new()));
    let (tx, handle) = binding(timed(Arc::clone(&runs), Duration::from_millis(500)));

    tx.send(change("a.scss")).unwrap();
    // Past the window: first run in flight until t=700ms
    sleep(Duration::from_millis(300)).await;
    for path in ["a.scss", "b.scss", "a.scss"] {
        tx.send(change(path)).unwrap();
        sleep(Duration::from_millis(50)).await;
    }
    sleep(Duration::from_secs(3)).await;

    let runs = runs.lock().clone();
    assert_eq!(runs.len(), 2);
    // Never concurrent: the rerun starts after the first ends
    assert!(runs[1].0 >= runs[0].1);
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_stop_cancels_pending_run() {
    let counter = Arc::new(AtomicUsize::new(0));
    let (tx, handle) = binding(counting(Arc::clone(&counter)));

    tx.send(change("a.scss")).unwrap();
    sleep(Duration::from_millis(50)).await;
    handle.stop().await;
    sleep(Duration::from_secs(1)).await;

    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stop_waits_for_inflight_run() {
    let runs = Arc::new(Mutex::new(Vec::new()));
    let (tx, handle) = binding(timed(Arc::clone(&runs), Duration::from_millis(500)));

    tx.send(change("a.scss")).unwrap();
    sleep(Duration::from_millis(300)).await;
    // Queued behind the in-flight run, then cancelled by stop
    tx.send(change("b.scss")).unwrap();
    sleep(Duration::from_millis(10)).await;

    handle.stop().await;
    assert_eq!(runs.lock().len(), 1);

    sleep(Duration::from_secs(1)).await;
    assert_eq!(runs.lock().len(), 1);
}

#[tokio::test]
async fn test_filesystem_change_triggers() {
    let dir = tempfile::TempDir::new().unwrap();
    let src = dir.path().join("src");
    std::fs::create_dir_all(&src).unwrap();

    let counter = Arc::new(AtomicUsize::new(0));
    let handle = WatchBinding::new(
        "page",
        &src,
        Globs::new(&["*.html"]).unwrap(),
        Duration::from_millis(50),
        counting(Arc::clone(&counter)),
    )
    .watch()
    .unwrap();

    std::fs::write(src.join("index.html"), "<p>hi</p>").unwrap();
    for _ in 0..100 {
        if counter.load(Ordering::SeqCst) > 0 {
            break;
        }
        sleep(Duration::from_millis(50)).await;
    }

    assert!(counter.load(Ordering::SeqCst) >= 1);
    handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_overlapping_bindings_each_trigger() {
    let pages_runs = Arc::new(AtomicUsize::new(0));
    let all_runs = Arc::new(AtomicUsize::new(0));
    let pages = fed("page", &["*.html"], counting(Arc::clone(&pages_runs)));
    let everything = fed("public", &["**"], counting(Arc::clone(&all_runs)));

    deliver(&[&pages, &everything], vec!["/site/src/index.html"]);
    sleep(Duration::from_secs(1)).await;

    // Same file, two bindings, two runs
    assert_eq!(pages_runs.load(Ordering::SeqCst), 1);
    assert_eq!(all_runs.load(Ordering::SeqCst), 1);

    // A file only one of them matches
    deliver(&[&pages, &everything], vec!["/site/src/robots.txt"]);
    sleep(Duration::from_secs(1)).await;
    assert_eq!(pages_runs.load(Ordering::SeqCst), 1);
    assert_eq!(all_runs.load(Ordering::SeqCst), 2);

    pages.handle.stop().await;
    everything.handle.stop().await;
}

#[tokio::test(start_paused = true)]
async fn test_style_and_page_changes_emit_separate_events() {
    let channel = ReloadChannel::new();
    let mut rx = channel.subscribe();
    let styles = fed(
        "style",
        &["assets/styles/*.scss"],
        publishing(&channel, ReloadEvent::styles(vec!["/assets/styles/main.css".into()])),
    );
    let pages = fed("page", &["*.html"], publishing(&channel, ReloadEvent::full()));

    // Both land inside one debounce window
    deliver(&[&styles, &pages], vec!["/site/src/assets/styles/main.scss"]);
    sleep(Duration::from_millis(50)).await;
    deliver(&[&styles, &pages], vec!["/site/src/index.html"]);
    sleep(Duration::from_secs(1)).await;

    let mut kinds = vec![rx.try_recv().unwrap().kind, rx.try_recv().unwrap().kind];
    assert!(rx.try_recv().is_err());
    kinds.sort_by_key(|k| *k == ReloadKind::StyleInject);
    assert_eq!(kinds, [ReloadKind::FullReload, ReloadKind::StyleInject]);

    styles.handle.stop().await;
    pages.handle.stop().await;
}
