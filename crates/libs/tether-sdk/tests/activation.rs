mod support;

use std::sync::Arc;
use std::time::Duration;
use support::{settle, MockBridge};
use tether_sdk::{command, Client, Notice, Outcome, ProfileKind, ProfileSet};

fn set(current: Option<&str>, items: Vec<(&str, ProfileKind)>, chain: Vec<&str>) -> ProfileSet {
    ProfileSet {
        current: current.map(str::to_string),
        items: items.into_iter().map(|(uid, kind)| MockBridge::entry(uid, kind)).collect(),
        chain: chain.into_iter().map(str::to_string).collect(),
    }
}

#[tokio::test]
async fn selecting_the_current_profile_is_a_silent_noop() {
    let mock = MockBridge::new(set(Some("r1"), vec![("r1", ProfileKind::Remote)], vec![]));
    let client = Client::new(Arc::clone(&mock));
    client.store().profiles().await.unwrap();
    let fetches_before = mock.calls(command::GET_PROFILES);
    let mut notices = client.notices();

    let outcome = client.coordinator().select_current("r1", false).await;

    assert_eq!(outcome, Outcome::Noop);
    assert_eq!(mock.calls(command::PATCH_PROFILES), 0);
    assert_eq!(mock.calls(command::GET_PROFILES), fetches_before);
    assert!(notices.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn forced_select_patches_refreshes_and_reconciles_exactly_once() {
    let mock = MockBridge::new(set(None, vec![("r1", ProfileKind::Remote)], vec![]));
    let client = Client::new(Arc::clone(&mock));
    let mut notices = client.notices();

    let outcome = client.coordinator().select_current("r1", true).await;

    assert_eq!(outcome, Outcome::Applied);
    assert_eq!(mock.calls(command::PATCH_PROFILES), 1);
    assert_eq!(
        mock.last_args(command::PATCH_PROFILES).unwrap(),
        serde_json::json!({ "current": "r1" })
    );
    assert_eq!(mock.calls(command::GET_RUNTIME_LOGS), 1);
    assert_eq!(mock.calls(command::CLOSE_ALL_CONNECTIONS), 1);
    assert_eq!(notices.recv().await.unwrap(), Notice::success("Refreshed proxy configuration"));
    assert_eq!(mock.profiles().current.as_deref(), Some("r1"));

    // The re-composition request fires once, 2 s after the patch, not before.
    settle().await;
    assert_eq!(mock.calls(command::ENHANCE_PROFILES), 0);
    tokio::time::advance(Duration::from_millis(1999)).await;
    settle().await;
    assert_eq!(mock.calls(command::ENHANCE_PROFILES), 0);
    tokio::time::advance(Duration::from_millis(1)).await;
    settle().await;
    assert_eq!(mock.calls(command::ENHANCE_PROFILES), 1);
    tokio::time::advance(Duration::from_secs(60)).await;
    settle().await;
    assert_eq!(mock.calls(command::ENHANCE_PROFILES), 1);
}

#[tokio::test]
async fn enhancement_profiles_cannot_become_current() {
    let mock = MockBridge::new(set(None, vec![("m1", ProfileKind::Merge)], vec![]));
    let client = Client::new(Arc::clone(&mock));
    let mut notices = client.notices();

    let outcome = client.coordinator().select_current("m1", true).await;

    assert_eq!(outcome, Outcome::Failed);
    assert_eq!(mock.calls(command::PATCH_PROFILES), 0);
    assert_eq!(mock.profiles().current, None);
    let notice = notices.recv().await.unwrap();
    assert!(notice.message.contains("m1"), "unexpected notice: {}", notice.message);
}

#[tokio::test]
async fn enable_is_idempotent_and_skips_the_second_patch() {
    let mock = MockBridge::new(set(
        Some("r1"),
        vec![("r1", ProfileKind::Remote), ("m1", ProfileKind::Merge)],
        vec![],
    ));
    let client = Client::new(Arc::clone(&mock));

    assert_eq!(client.coordinator().enable_chain("m1").await, Outcome::Applied);
    assert_eq!(mock.calls(command::PATCH_PROFILES), 1);
    assert_eq!(mock.profiles().chain, ["m1"]);

    assert_eq!(client.coordinator().enable_chain("m1").await, Outcome::Noop);
    assert_eq!(mock.calls(command::PATCH_PROFILES), 1);
    assert_eq!(mock.profiles().chain, ["m1"]);
}

#[tokio::test]
async fn disable_of_an_absent_entry_issues_no_patch() {
    let mock = MockBridge::new(set(
        Some("r1"),
        vec![("r1", ProfileKind::Remote), ("m1", ProfileKind::Merge)],
        vec![],
    ));
    let client = Client::new(Arc::clone(&mock));

    assert_eq!(client.coordinator().disable_chain("m1").await, Outcome::Noop);
    assert_eq!(mock.calls(command::PATCH_PROFILES), 0);
    assert!(mock.profiles().chain.is_empty());
}

#[tokio::test]
async fn move_front_then_end_rotates_a_two_entry_chain() {
    let mock = MockBridge::new(set(
        Some("r1"),
        vec![
            ("r1", ProfileKind::Remote),
            ("a", ProfileKind::Merge),
            ("b", ProfileKind::Script),
        ],
        vec!["a", "b"],
    ));
    let client = Client::new(Arc::clone(&mock));

    assert_eq!(client.coordinator().move_to_front("a").await, Outcome::Applied);
    assert_eq!(mock.profiles().chain, ["a", "b"]);

    assert_eq!(client.coordinator().move_to_end("a").await, Outcome::Applied);
    assert_eq!(mock.profiles().chain, ["b", "a"]);
}

#[tokio::test]
async fn move_of_an_absent_entry_is_a_noop() {
    let mock = MockBridge::new(set(
        Some("r1"),
        vec![("r1", ProfileKind::Remote), ("a", ProfileKind::Merge)],
        vec![],
    ));
    let client = Client::new(Arc::clone(&mock));

    assert_eq!(client.coordinator().move_to_front("a").await, Outcome::Noop);
    assert_eq!(client.coordinator().move_to_end("a").await, Outcome::Noop);
    assert_eq!(mock.calls(command::PATCH_PROFILES), 0);
}

#[tokio::test]
async fn delete_disables_first_then_removes_the_entry() {
    let mock = MockBridge::new(set(
        Some("r1"),
        vec![("r1", ProfileKind::Remote), ("m1", ProfileKind::Merge)],
        vec!["m1"],
    ));
    let client = Client::new(Arc::clone(&mock));

    assert_eq!(client.coordinator().delete_entry("m1").await, Outcome::Applied);

    let recorded = mock.recorded();
    let order: Vec<&str> = recorded
        .iter()
        .map(|(name, _)| name.as_str())
        .filter(|name| matches!(*name, "patch_profiles" | "delete_profile"))
        .collect();
    assert_eq!(order, ["patch_profiles", "delete_profile"]);
    assert!(mock.profiles().chain.is_empty());
    assert!(mock.profiles().entry("m1").is_none());
}

#[tokio::test]
async fn failed_delete_leaves_the_entry_disabled_but_present() {
    let mock = MockBridge::new(set(
        Some("r1"),
        vec![("r1", ProfileKind::Remote), ("m1", ProfileKind::Merge)],
        vec!["m1"],
    ));
    mock.fail(command::DELETE_PROFILE, "not_found", "already gone");
    let client = Client::new(Arc::clone(&mock));
    let mut notices = client.notices();

    assert_eq!(client.coordinator().delete_entry("m1").await, Outcome::Failed);

    assert!(mock.profiles().chain.is_empty());
    assert!(mock.profiles().entry("m1").is_some());
    let notice = notices.recv().await.unwrap();
    assert!(notice.message.contains("already gone"));
}

#[tokio::test]
async fn overlapping_selects_are_dropped_not_queued() {
    let mock = MockBridge::new(set(
        None,
        vec![("r1", ProfileKind::Remote), ("r2", ProfileKind::Remote)],
        vec![],
    ));
    let client = Arc::new(Client::new(Arc::clone(&mock)));
    let release = mock.hold(command::PATCH_PROFILES);

    let first = {
        let client = Arc::clone(&client);
        tokio::spawn(async move { client.coordinator().select_current("r1", true).await })
    };
    while mock.calls(command::PATCH_PROFILES) == 0 {
        tokio::task::yield_now().await;
    }

    assert_eq!(client.coordinator().select_current("r2", true).await, Outcome::Dropped);

    release.add_permits(1);
    assert_eq!(first.await.unwrap(), Outcome::Applied);
    assert_eq!(mock.profiles().current.as_deref(), Some("r1"));
}

#[tokio::test(start_paused = true)]
async fn import_adopts_the_first_remote_when_nothing_is_selected() {
    let mock = MockBridge::new(set(None, vec![("r1", ProfileKind::Remote)], vec![]));
    let client = Client::new(Arc::clone(&mock));
    let mut notices = client.notices();

    let outcome = client.coordinator().import("https://example.net/sub.yaml").await;

    assert_eq!(outcome, Outcome::Applied);
    assert_eq!(mock.calls(command::IMPORT_PROFILE), 1);
    assert_eq!(
        mock.last_args(command::IMPORT_PROFILE).unwrap(),
        serde_json::json!({ "locator": "https://example.net/sub.yaml" })
    );
    assert_eq!(mock.profiles().current.as_deref(), Some("r1"));
    // Adoption patches the selection but does not drop connections.
    assert_eq!(mock.calls(command::CLOSE_ALL_CONNECTIONS), 0);
    assert_eq!(notices.recv().await.unwrap(), Notice::success("Imported profile"));

    settle().await;
    tokio::time::advance(Duration::from_millis(2000)).await;
    settle().await;
    assert_eq!(mock.calls(command::ENHANCE_PROFILES), 1);
}

#[tokio::test]
async fn failed_import_surfaces_a_notice_and_changes_nothing() {
    let mock = MockBridge::new(set(None, vec![], vec![]));
    mock.fail(command::IMPORT_PROFILE, "import_error", "unreachable source");
    let client = Client::new(Arc::clone(&mock));
    let mut notices = client.notices();

    assert_eq!(client.coordinator().import("not-a-url").await, Outcome::Failed);
    assert_eq!(mock.calls(command::PATCH_PROFILES), 0);
    let notice = notices.recv().await.unwrap();
    assert!(notice.message.contains("unreachable source"));
}
