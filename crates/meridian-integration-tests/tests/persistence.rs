//! Integration test: aggregation backed by the SQLite store.

use meridian_db::SqliteStore;
use meridian_integration_tests::*;
use meridian_oracle::{Clock, ObservationStore};
use meridian_types::Observation;

#[test]
fn aggregate_is_committed_to_sqlite() {
    let store = SqliteStore::open_memory().expect("open store");
    let harness = Harness::builder()
        .general(2)
        .build_with_store(store)
        .expect("harness");
    harness.general[0].dev_set_observation(GRT, Observation::new(ONE, ONE, ONE, T0));
    harness.general[1].dev_set_observation(
        GRT,
        Observation::new(2 * ONE, 1_000 * ONE, 2_000 * ONE, T0),
    );
    let timestamp = harness.clock.advance(10);

    harness.oracle.update(&GRT).expect("update");

    let stored = harness.oracle.store().get(&GRT).expect("read back");
    assert_eq!(
        stored,
        Observation::new(1_999_000_999_000_999_000, 1_001 * ONE, 2_001 * ONE, timestamp)
    );
    assert_eq!(harness.oracle.store().tokens().expect("tokens"), vec![GRT]);
    assert_eq!(harness.oracle.needs_update(&GRT), Ok(false));
}

#[test]
fn observations_survive_reopen() {
    let path = std::env::temp_dir().join(format!(
        "meridian-it-{}-{}",
        std::process::id(),
        meridian_db::DB_FILE_NAME
    ));
    let _ = std::fs::remove_file(&path);

    let timestamp = {
        let store = SqliteStore::open(&path).expect("create store");
        let harness = Harness::builder()
            .build_with_store(store)
            .expect("harness");
        harness.general[0].dev_set_observation(GRT, Observation::new(ONE, u128::MAX, ONE, T0));
        harness.oracle.update(&GRT).expect("update");
        harness.clock.now()
    };

    let reopened = SqliteStore::open(&path).expect("reopen store");
    assert_eq!(
        reopened.get(&GRT).expect("read back"),
        Observation::new(ONE, u128::MAX, ONE, timestamp)
    );
    assert!(reopened.get(&BAT).expect("absent token").is_empty());

    drop(reopened);
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn sqlite_store_serves_concurrent_blocking_updates() {
    let store = SqliteStore::open_memory().expect("open store");
    let harness = std::sync::Arc::new(
        Harness::builder()
            .general(1)
            .build_with_store(store)
            .expect("harness"),
    );
    for token in [GRT, BAT] {
        harness.general[0].dev_set_observation(token, Observation::new(ONE, ONE, ONE, T0));
    }

    let tasks: Vec<_> = [GRT, BAT, GRT, BAT]
        .into_iter()
        .map(|token| {
            let harness = std::sync::Arc::clone(&harness);
            tokio::task::spawn_blocking(move || harness.oracle.update(&token))
        })
        .collect();
    for task in tasks {
        task.await.expect("join").expect("update");
    }

    let mut tokens = harness.oracle.store().tokens().expect("tokens");
    tokens.sort();
    let mut expected = vec![GRT, BAT];
    expected.sort();
    assert_eq!(tokens, expected);
}
