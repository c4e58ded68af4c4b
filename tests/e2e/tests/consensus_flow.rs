//! End-to-end consensus scenarios over real loopback HTTP

use serial_test::serial;
use std::time::Duration;
use vigil_core::{unix_now, CaseResult, IncidentPayload, ProcessSample};
use vigil_e2e_tests::{attack_profile, spawn_cluster, wait_for, ClusterOptions};

fn incident(from: &str, pid: u32) -> IncidentPayload {
    IncidentPayload {
        from: from.into(),
        process: "cryptominer".into(),
        pid,
        cpu: 93.0,
        time: unix_now(),
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn happy_path_consensus_terminates_and_rewards() {
    let cluster = spawn_cluster(&["node1", "node2", "node3"], ClusterOptions::default()).await;
    let node1 = cluster.node("node1");

    let result = node1.coordinator.run_case(incident("node1", 4242)).await;
    assert_eq!(result, Some(CaseResult::Terminated));
    assert_eq!(node1.scanner.kills(), vec![4242]);

    // The proposer's event log carries the terminated verdict with the
    // full weighted sum of three trusting voters.
    {
        let state = node1.ctx.read();
        let event = state.events.back().unwrap();
        assert_eq!(event.result, CaseResult::Terminated);
        assert!(event.weighted >= 2.0);
        assert!(state.pending_cases.is_empty());
    }

    // Peers processed the alert synchronously before acknowledging it:
    // one EMA step of reward for the proposer on both.
    for peer in ["node2", "node3"] {
        let state = cluster.node(peer).ctx.read();
        assert!(
            (state.trust_of("node1") - 1.024).abs() < 1e-9,
            "{peer} should have rewarded node1"
        );
        assert_eq!(state.reputation.records()["node1"].success, 1);
        assert_eq!(state.strikes["node1"], 0);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn silent_peers_mean_rejection_and_self_penalty() {
    let mut options = ClusterOptions::default();
    options.coordinator.vote_timeout = Duration::from_millis(400);
    for peer in ["node2", "node3"] {
        options
            .attack
            .insert(peer.into(), attack_profile(|p| p.skip_vote_prob = 1.0));
    }

    let cluster = spawn_cluster(&["node1", "node2", "node3"], options).await;
    let node1 = cluster.node("node1");

    let result = node1.coordinator.run_case(incident("node1", 777)).await;
    assert_eq!(result, Some(CaseResult::Rejected));
    assert!(node1.scanner.kills().is_empty());

    {
        let state = node1.ctx.read();
        assert_eq!(state.strikes["node1"], 1);
        assert!((state.trust_of("node1") - 0.968).abs() < 1e-9);
        assert_eq!(state.events.back().unwrap().result, CaseResult::Rejected);
    }

    // No alert went out: peers still see the proposer untouched.
    for peer in ["node2", "node3"] {
        let state = cluster.node(peer).ctx.read();
        assert_eq!(state.trust_of("node1"), 1.0);
        assert!(state.reputation.is_empty());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn flipped_votes_do_not_reach_quorum() {
    let mut options = ClusterOptions::default();
    options.coordinator.vote_timeout = Duration::from_millis(500);
    for peer in ["node2", "node3"] {
        options
            .attack
            .insert(peer.into(), attack_profile(|p| p.vote_flip_prob = 1.0));
    }

    let cluster = spawn_cluster(&["node1", "node2", "node3"], options).await;
    let node1 = cluster.node("node1");

    let result = node1.coordinator.run_case(incident("node1", 8080)).await;
    assert_eq!(result, Some(CaseResult::Rejected));
    assert!(node1.scanner.kills().is_empty());

    // The no-votes arrived and were tallied as activity.
    let state = node1.ctx.read();
    assert!(state.stats.get("node2").map_or(0, |a| a.votes) >= 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn detector_drives_a_full_round() {
    let cluster = spawn_cluster(&["node1", "node2", "node3"], ClusterOptions::default()).await;
    let node1 = cluster.node("node1");

    node1.scanner.set_samples(vec![
        ProcessSample {
            pid: 31337,
            name: "cryptominer".into(),
            cpu: 95.0,
        },
        ProcessSample {
            pid: 31338,
            name: "apt-get".into(),
            cpu: 99.0,
        },
        ProcessSample {
            pid: 31339,
            name: "idle-daemon".into(),
            cpu: 1.0,
        },
    ]);

    node1.detector.scan_once().await;

    // Only the hot, non-whitelisted process was remediated.
    assert_eq!(node1.scanner.kills(), vec![31337]);
    assert_eq!(
        node1.ctx.read().events.back().unwrap().process,
        "cryptominer"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn self_quarantined_peer_acknowledges_but_does_not_vote() {
    let cluster = spawn_cluster(&["node1", "node2", "node3"], ClusterOptions::default()).await;
    let node1 = cluster.node("node1");
    let node2 = cluster.node("node2");

    // Governance orders node2 into quarantine; node2 self-applies it.
    let http = reqwest::Client::new();
    let resp = http
        .post(node2.url("/governance/quarantine"))
        .json(&serde_json::json!({"node": "node2", "duration": 60.0}))
        .send()
        .await
        .unwrap();
    assert!(resp.status().is_success());
    assert!(node2.ctx.is_self_quarantined());

    // A proposal still reaches quorum through node3 alone.
    let result = node1.coordinator.run_case(incident("node1", 5151)).await;
    assert_eq!(result, Some(CaseResult::Terminated));

    // node2 never voted.
    let state = node1.ctx.read();
    assert_eq!(state.stats.get("node2").map_or(0, |a| a.votes), 0);
    assert!(state.stats.get("node3").map_or(0, |a| a.votes) >= 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn status_endpoint_reflects_consensus_state() {
    let cluster = spawn_cluster(&["node1", "node2", "node3"], ClusterOptions::default()).await;
    let node1 = cluster.node("node1");

    node1.coordinator.run_case(incident("node1", 99)).await;

    let http = reqwest::Client::new();
    let status: serde_json::Value = http
        .get(node1.url("/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(status["node"], "node1");
    assert_eq!(status["active_cases"], 0);
    assert!(status["adaptive_quorum"].as_f64().unwrap() >= 1.5);

    let events: Vec<serde_json::Value> = http
        .get(node1.url("/events"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["result"], "terminated");

    // Replica peers eventually see the proposer's version move, which is
    // what the sync loop keys on.
    assert!(
        wait_for(Duration::from_secs(2), || {
            node1.ctx.read().version >= 1
        })
        .await
    );
}
