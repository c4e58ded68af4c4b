//! Quarantine promotion, release and governance over HTTP

use serial_test::serial;
use std::time::Duration;
use vigil_core::{unix_now, CaseResult, IncidentPayload};
use vigil_e2e_tests::{spawn_cluster, ClusterOptions};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn repeated_false_alerts_promote_to_quarantine() {
    let cluster = spawn_cluster(&["node1", "node2", "node3"], ClusterOptions::default()).await;
    let node2 = cluster.node("node2");

    // node3 keeps announcing outcomes that turn out to be false alarms.
    let http = reqwest::Client::new();
    for i in 0..3 {
        let resp = http
            .post(node2.url("/alert"))
            .json(&serde_json::json!({
                "case_id": format!("case-{i}"),
                "node": "node3",
                "result": "rejected",
                "process": "stress",
            }))
            .send()
            .await
            .unwrap();
        assert!(resp.status().is_success());
    }

    let state = node2.ctx.read();
    assert_eq!(state.strikes["node3"], 3);
    assert!(state.is_quarantined("node3"));
    let q = &state.quarantine["node3"];
    assert!(q.until > unix_now());

    // Quarantined yes-votes carry no weight.
    let mut votes = std::collections::HashMap::new();
    votes.insert("node3".to_string(), true);
    drop(state);
    assert_eq!(node2.trust.weighted_vote_sum(&votes), 0.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn quarantine_release_restores_participation() {
    let mut options = ClusterOptions::default();
    options.trust.quarantine_secs = 0.2;
    let cluster = spawn_cluster(&["node1", "node2", "node3"], options).await;
    let node1 = cluster.node("node1");

    for _ in 0..3 {
        node1.trust.record_alert_outcome("node2", CaseResult::Rejected);
    }
    assert!(node1.ctx.read().is_quarantined("node2"));

    tokio::time::sleep(Duration::from_millis(300)).await;
    node1.trust.watchdog_tick();

    let state = node1.ctx.read();
    assert!(!state.is_quarantined("node2"));
    assert_eq!(state.strikes["node2"], 0);
    drop(state);

    // Votes from node2 count again once it has a confirmed success to
    // its name (accuracy was zeroed by the three false alarms).
    node1.trust.record_alert_outcome("node2", CaseResult::Terminated);
    let mut votes = std::collections::HashMap::new();
    votes.insert("node2".to_string(), true);
    assert!(node1.trust.weighted_vote_sum(&votes) > 0.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn governance_penalty_lands_through_the_pipeline() {
    let cluster = spawn_cluster(&["node1", "node2", "node3"], ClusterOptions::default()).await;
    let node1 = cluster.node("node1");

    let http = reqwest::Client::new();
    let resp = http
        .post(node1.url("/governance/penalize"))
        .json(&serde_json::json!({"node": "node2", "penalty": 0.15}))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());

    // Raw -0.15 clamps to -0.08 and blends: 0.4 * 0.92 + 0.6 * 1.0.
    let trust = node1.ctx.read().trust_of("node2");
    assert!((trust - 0.968).abs() < 1e-9);

    // Self-penalties are refused.
    http.post(node1.url("/governance/penalize"))
        .json(&serde_json::json!({"node": "node1", "penalty": 0.5}))
        .send()
        .await
        .unwrap();
    assert_eq!(node1.ctx.read().trust_of("node1"), 1.0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn quarantined_proposer_refuses_locally() {
    let cluster = spawn_cluster(&["node1", "node2", "node3"], ClusterOptions::default()).await;
    let node1 = cluster.node("node1");

    node1.trust.governance_quarantine("node1", 60.0);
    assert!(node1.ctx.is_self_quarantined());

    let result = node1
        .coordinator
        .run_case(IncidentPayload {
            from: "node1".into(),
            process: "stress".into(),
            pid: 1,
            cpu: 99.0,
            time: unix_now(),
        })
        .await;
    assert_eq!(result, None);
    assert!(node1.ctx.read().pending_cases.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn reputation_endpoint_serves_accuracy() {
    let cluster = spawn_cluster(&["node1", "node2", "node3"], ClusterOptions::default()).await;
    let node1 = cluster.node("node1");

    node1.trust.record_alert_outcome("node2", CaseResult::Terminated);
    node1.trust.record_alert_outcome("node2", CaseResult::Terminated);
    node1.trust.record_alert_outcome("node2", CaseResult::Rejected);

    let http = reqwest::Client::new();
    let rep: serde_json::Value = http
        .get(node1.url("/reputation"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    let engine = &rep["engine"]["node2"];
    assert_eq!(engine["total"], 3);
    assert_eq!(engine["success"], 2);
    assert_eq!(engine["false"], 1);
    assert_eq!(engine["accuracy"], 0.667);
    assert!(rep["node_stats"]["node2"]["last_activity"].as_f64().unwrap() > 0.0);
}
