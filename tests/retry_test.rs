mod common;

use common::{config_with_trigger, FakeExecutor};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use vigil::config::FlappingConfig;
use vigil::process::{ProcessHandle, ProcessManager, ProcessState};

fn retry_trigger(retry_times: Option<u32>) -> FlappingConfig {
    FlappingConfig {
        times: 2,
        within_secs: 3,
        retry_in_secs: Some(5),
        retry_times,
    }
}

/// Crash twice in quick succession; the second crash lands inside the
/// window and trips the trigger.
async fn crash_into_flapping(handle: &ProcessHandle) {
    handle.report_crash(Instant::now()).unwrap();
    sleep(Duration::from_millis(1100)).await;
    assert_eq!(handle.current_state().await.unwrap(), ProcessState::Up);

    handle.report_crash(Instant::now()).unwrap();
    assert_eq!(
        handle.current_state().await.unwrap(),
        ProcessState::Unmonitored
    );
}

const ATTEMPT_PAIR: [ProcessState; 6] = [
    ProcessState::Starting,
    ProcessState::Up,
    ProcessState::Down,
    ProcessState::Starting,
    ProcessState::Up,
    ProcessState::Down,
];

#[tokio::test(start_paused = true)]
async fn test_unlimited_retries_keep_coming() {
    let manager = ProcessManager::new();
    let handle = manager
        .add(
            config_with_trigger("web", retry_trigger(None)),
            FakeExecutor::new(),
        )
        .await
        .unwrap();

    handle.start().unwrap();
    assert_eq!(handle.current_state().await.unwrap(), ProcessState::Up);

    crash_into_flapping(&handle).await;
    assert_eq!(handle.active_watcher_names().await.unwrap(), vec!["restore"]);

    // The retry fires after the configured delay and starts over
    sleep(Duration::from_millis(5100)).await;
    assert_eq!(handle.current_state().await.unwrap(), ProcessState::Up);

    crash_into_flapping(&handle).await;

    let mut history = handle.history().await.unwrap();

    // Two start attempts before the first verdict
    let states: Vec<_> = history.drain_front(6).iter().map(|t| t.state).collect();
    assert_eq!(states, ATTEMPT_PAIR);
    let flap1 = history.pop_front().unwrap();
    assert_eq!(flap1.state, ProcessState::Unmonitored);
    assert_eq!(flap1.reason.as_deref(), Some("flapping"));

    // The retry buys two more attempts before the second verdict
    let states: Vec<_> = history.drain_front(6).iter().map(|t| t.state).collect();
    assert_eq!(states, ATTEMPT_PAIR);
    let flap2 = history.pop_front().unwrap();
    assert_eq!(flap2.state, ProcessState::Unmonitored);
    assert_eq!(flap2.reason.as_deref(), Some("flapping"));

    // Consecutive verdicts are spaced by at least the retry delay
    assert!(flap2.at.duration_since(flap1.at) >= Duration::from_secs(5));

    // No retry cap: the next attempt is already booked
    assert!(history.is_empty());
    assert_eq!(handle.active_watcher_names().await.unwrap(), vec!["restore"]);
}

#[tokio::test(start_paused = true)]
async fn test_retry_budget_of_one_ends_after_two_verdicts() {
    let manager = ProcessManager::new();
    let handle = manager
        .add(
            config_with_trigger("web", retry_trigger(Some(1))),
            FakeExecutor::new(),
        )
        .await
        .unwrap();

    handle.start().unwrap();
    assert_eq!(handle.current_state().await.unwrap(), ProcessState::Up);

    crash_into_flapping(&handle).await;

    sleep(Duration::from_millis(5100)).await;
    assert_eq!(handle.current_state().await.unwrap(), ProcessState::Up);

    crash_into_flapping(&handle).await;

    // The budget is spent: no retry watcher this time
    assert!(handle.active_watcher_names().await.unwrap().is_empty());

    let mut history = handle.history().await.unwrap();
    let states: Vec<_> = history.drain_front(6).iter().map(|t| t.state).collect();
    assert_eq!(states, ATTEMPT_PAIR);
    let flap1 = history.pop_front().unwrap();
    assert_eq!(flap1.reason.as_deref(), Some("flapping"));

    let states: Vec<_> = history.drain_front(6).iter().map(|t| t.state).collect();
    assert_eq!(states, ATTEMPT_PAIR);
    let flap2 = history.pop_front().unwrap();
    assert_eq!(flap2.reason.as_deref(), Some("flapping"));

    assert!(flap2.at.duration_since(flap1.at) >= Duration::from_secs(5));

    // Nothing follows the second verdict
    assert!(history.is_empty());

    sleep(Duration::from_secs(30)).await;
    assert_eq!(
        handle.current_state().await.unwrap(),
        ProcessState::Unmonitored
    );
    assert_eq!(handle.history().await.unwrap().len(), 14);
}

#[tokio::test(start_paused = true)]
async fn test_retry_budget_of_two_allows_one_more_round() {
    let manager = ProcessManager::new();
    let handle = manager
        .add(
            config_with_trigger("web", retry_trigger(Some(2))),
            FakeExecutor::new(),
        )
        .await
        .unwrap();

    handle.start().unwrap();
    assert_eq!(handle.current_state().await.unwrap(), ProcessState::Up);

    crash_into_flapping(&handle).await;

    // Both granted retries fire and end in a fresh verdict
    for _ in 0..2 {
        sleep(Duration::from_millis(5100)).await;
        assert_eq!(handle.current_state().await.unwrap(), ProcessState::Up);
        crash_into_flapping(&handle).await;
    }

    assert!(handle.active_watcher_names().await.unwrap().is_empty());

    let history = handle.history().await.unwrap();
    let verdicts = history
        .iter()
        .filter(|t| t.reason.as_deref() == Some("flapping"))
        .count();
    assert_eq!(verdicts, 3);

    // Permanently unmonitored from here on
    sleep(Duration::from_secs(60)).await;
    assert_eq!(
        handle.current_state().await.unwrap(),
        ProcessState::Unmonitored
    );
    assert_eq!(handle.history().await.unwrap().len(), 21);
}

#[tokio::test(start_paused = true)]
async fn test_user_unmonitor_cancels_pending_retry() {
    let manager = ProcessManager::new();
    let handle = manager
        .add(
            config_with_trigger("web", retry_trigger(None)),
            FakeExecutor::new(),
        )
        .await
        .unwrap();

    handle.start().unwrap();
    assert_eq!(handle.current_state().await.unwrap(), ProcessState::Up);

    crash_into_flapping(&handle).await;
    assert_eq!(handle.active_watcher_names().await.unwrap(), vec!["restore"]);

    handle.unmonitor().unwrap();
    assert!(handle.active_watcher_names().await.unwrap().is_empty());

    // Past the retry deadline: nothing fires
    sleep(Duration::from_secs(9)).await;
    assert_eq!(
        handle.current_state().await.unwrap(),
        ProcessState::Unmonitored
    );

    let mut history = handle.history().await.unwrap();
    let states: Vec<_> = history.drain_front(6).iter().map(|t| t.state).collect();
    assert_eq!(states, ATTEMPT_PAIR);

    let flap = history.pop_front().unwrap();
    assert_eq!(flap.state, ProcessState::Unmonitored);
    assert_eq!(flap.reason.as_deref(), Some("flapping"));

    let unm = history.pop_front().unwrap();
    assert_eq!(unm.state, ProcessState::Unmonitored);
    assert_eq!(unm.reason.as_deref(), Some("unmonitor by user"));

    assert!(history.is_empty());
}
