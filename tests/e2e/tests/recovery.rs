//! Durability and recovery scenarios: WAL replay across restarts, peer
//! quorum restore, replica catch-up

use serial_test::serial;
use std::collections::HashMap;
use std::time::Duration;
use tempfile::TempDir;
use vigil_core::{unix_now, CaseResult, IncidentPayload};
use vigil_e2e_tests::{spawn_cluster, spawn_node, ClusterOptions};

fn incident(from: &str, pid: u32) -> IncidentPayload {
    IncidentPayload {
        from: from.into(),
        process: "stress".into(),
        pid,
        cpu: 88.0,
        time: unix_now(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn wal_replay_preserves_penalties_across_restart() {
    let mut options = ClusterOptions::default();
    options.coordinator.vote_timeout = Duration::from_millis(300);

    let dir = TempDir::new().unwrap();
    // Lone node with unreachable peers: every case dies in the window.
    let mut endpoints = HashMap::new();
    for peer in ["node2", "node3"] {
        endpoints.insert(peer.to_string(), "http://127.0.0.1:9".to_string());
    }

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let node = spawn_node(
        "node1",
        vec!["node2".into(), "node3".into()],
        dir.path(),
        endpoints.clone(),
        listener,
        &options,
        None,
    )
    .await;

    let result = node.coordinator.run_case(incident("node1", 55)).await;
    assert_eq!(result, Some(CaseResult::Rejected));
    let (trust_before, strikes_before) = {
        let state = node.ctx.read();
        (state.trust_of("node1"), state.strikes["node1"])
    };
    assert!((trust_before - 0.968).abs() < 1e-9);
    assert_eq!(strikes_before, 1);

    // Crash without a checkpoint flush: only the WAL carries the case.
    drop(node);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let reborn = spawn_node(
        "node1",
        vec!["node2".into(), "node3".into()],
        dir.path(),
        endpoints,
        listener,
        &options,
        None,
    )
    .await;

    let state = reborn.ctx.read();
    assert!((state.trust_of("node1") - trust_before).abs() < 1e-9);
    assert_eq!(state.strikes["node1"], strikes_before);
    assert_eq!(state.events.back().unwrap().result, CaseResult::Rejected);
    assert!(state.pending_cases.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn amnesiac_node_restores_from_peer_quorum() {
    let cluster = spawn_cluster(&["node1", "node2", "node3"], ClusterOptions::default()).await;

    // node2 and node3 share an evolved, identical view of the fabric.
    for peer in ["node2", "node3"] {
        let node = cluster.node(peer);
        let mut state = node.ctx.write();
        state.trust.insert("node1".into(), 1.3);
        state.trust.insert("node2".into(), 1.1);
        state.trust.insert("node3".into(), 0.9);
        state.reputation.record_success("node1");
    }

    // node1 is factory fresh (default trust, empty ledger) and even
    // self-quarantined from a previous life.
    let node1 = cluster.node("node1");
    {
        let mut state = node1.ctx.write();
        state.quarantine.get_mut("node1").unwrap().active = true;
    }

    node1.recovery.tick().await;

    let state = node1.ctx.read();
    assert_eq!(state.trust_of("node1"), 1.3);
    assert_eq!(state.trust_of("node3"), 0.9);
    assert!(!state.reputation.is_empty());
    assert!(!state.is_quarantined("node1"));
    assert!(!node1.ctx.recovery_mode());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn healthy_node_is_left_alone_by_recovery() {
    let cluster = spawn_cluster(&["node1", "node2", "node3"], ClusterOptions::default()).await;
    let node1 = cluster.node("node1");

    // Evolved local state: not amnesiac.
    {
        let mut state = node1.ctx.write();
        state.trust.insert("node2".into(), 1.4);
        state.reputation.record_success("node2");
    }
    let before = node1.ctx.read().trust_of("node2");

    node1.recovery.tick().await;
    assert_eq!(node1.ctx.read().trust_of("node2"), before);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn partitioned_replica_catches_up_by_version() {
    let cluster = spawn_cluster(&["node1", "node2", "node3"], ClusterOptions::default()).await;
    let node1 = cluster.node("node1");
    let node3 = cluster.node("node3");

    // node1 evolves while node3 is "partitioned": higher trust values
    // and a version bumped by repeated checkpoints.
    {
        let mut state = node1.ctx.write();
        state.trust.insert("node2".into(), 1.6);
        state.trust.insert("node3".into(), 1.2);
        state.reputation.record_success("node2");
    }
    for _ in 0..3 {
        node1.durability.checkpoint_now();
    }
    let remote_version = node1.ctx.read().version;

    // node3 holds one locally higher entry that the merge must keep.
    {
        let mut state = node3.ctx.write();
        state.trust.insert("node3".into(), 1.7);
    }

    node3.sync.tick().await;

    let state = node3.ctx.read();
    assert_eq!(state.trust_of("node2"), 1.6);
    assert_eq!(state.trust_of("node3"), 1.7);
    assert!(state.version >= remote_version);
    assert_eq!(state.reputation.records()["node2"].success, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn controller_restore_endpoint_replaces_state() {
    let cluster = spawn_cluster(&["node1", "node2", "node3"], ClusterOptions::default()).await;
    let node1 = cluster.node("node1");

    let snap = {
        let mut donor = vigil_core::NodeState::default();
        donor.trust.insert("node1".into(), 1.9);
        donor.trust.insert("node2".into(), 0.5);
        donor.reputation.record_false("node2");
        donor.version = 30;
        donor.snapshot("controller")
    };

    let http = reqwest::Client::new();
    let resp: serde_json::Value = http
        .post(node1.url("/state/restore"))
        .json(&snap)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resp["status"], "restored");

    let state = node1.ctx.read();
    assert_eq!(state.trust_of("node1"), 1.9);
    assert_eq!(state.trust_of("node2"), 0.5);
    assert_eq!(state.reputation.records()["node2"].false_calls, 1);
    assert!(state.version > 30);
}
