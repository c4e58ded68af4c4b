//! In-process cluster harness for end-to-end scenarios
//!
//! Spawns whole fabric nodes inside one test process: real axum servers
//! on loopback ephemeral ports, real HTTP between them, scripted process
//! scanners, and per-node temp directories for the durability layer.
//! Timing configs are shrunk so a full consensus round fits in a couple
//! of seconds.

use async_trait::async_trait;
use parking_lot::Mutex;
use prometheus::Registry;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::task::JoinHandle;
use vigil_api::AppState;
use vigil_consensus::{Coordinator, CoordinatorConfig, Detector, DetectorConfig};
use vigil_core::{
    AttackProfile, Journal, KillOutcome, NodeContext, ProcessSample, ProcessScanner,
};
use vigil_durability::{
    Durability, DurabilityConfig, RecoveryConfig, ReplicaSync, SelfRecovery, SyncConfig,
};
use vigil_net::{PeerClient, PeerClientConfig};
use vigil_trust::{TrustConfig, TrustEngine};

/// Scanner whose observations and kill outcomes are scripted by tests.
pub struct ScriptedScanner {
    samples: Mutex<Vec<ProcessSample>>,
    kills: Mutex<Vec<u32>>,
    outcome: Mutex<KillOutcome>,
}

impl Default for ScriptedScanner {
    fn default() -> Self {
        Self {
            samples: Mutex::new(Vec::new()),
            kills: Mutex::new(Vec::new()),
            outcome: Mutex::new(KillOutcome::Killed),
        }
    }
}

impl ScriptedScanner {
    pub fn set_samples(&self, samples: Vec<ProcessSample>) {
        *self.samples.lock() = samples;
    }

    pub fn set_outcome(&self, outcome: KillOutcome) {
        *self.outcome.lock() = outcome;
    }

    pub fn kills(&self) -> Vec<u32> {
        self.kills.lock().clone()
    }
}

#[async_trait]
impl ProcessScanner for ScriptedScanner {
    async fn sample(&self) -> Vec<ProcessSample> {
        self.samples.lock().clone()
    }

    async fn kill(&self, pid: u32) -> KillOutcome {
        self.kills.lock().push(pid);
        *self.outcome.lock()
    }
}

/// Per-cluster tuning. The defaults make a consensus round take well
/// under two seconds while keeping the production ratios.
#[derive(Clone)]
pub struct ClusterOptions {
    pub trust: TrustConfig,
    pub coordinator: CoordinatorConfig,
    pub recovery: RecoveryConfig,
    pub sync: SyncConfig,
    /// Attack profiles keyed by node name.
    pub attack: HashMap<String, AttackProfile>,
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            trust: TrustConfig {
                cooldown_secs: 0.0,
                ..Default::default()
            },
            coordinator: CoordinatorConfig {
                vote_timeout: Duration::from_millis(1200),
                poll_interval: Duration::from_millis(50),
            },
            recovery: RecoveryConfig {
                bootstrap_grace_secs: 0.0,
                attempt_cooldown_secs: 0.0,
                ..Default::default()
            },
            sync: SyncConfig::default(),
            attack: HashMap::new(),
        }
    }
}

/// A quiet attack profile with exactly one misbehavior dialed in.
pub fn attack_profile(tweak: impl FnOnce(&mut AttackProfile)) -> AttackProfile {
    let mut profile = AttackProfile {
        vote_flip_prob: 0.0,
        false_alert_prob: 0.0,
        skip_vote_prob: 0.0,
        delay_vote_prob: 0.0,
        delay_seconds: 0.0,
        false_propose_prob: 0.0,
    };
    tweak(&mut profile);
    profile
}

pub struct TestNode {
    pub name: String,
    pub ctx: Arc<NodeContext>,
    pub trust: Arc<TrustEngine>,
    pub durability: Arc<Durability>,
    pub coordinator: Arc<Coordinator>,
    pub detector: Arc<Detector>,
    pub recovery: Arc<SelfRecovery>,
    pub sync: Arc<ReplicaSync>,
    pub scanner: Arc<ScriptedScanner>,
    pub client: Arc<PeerClient>,
    pub base_url: String,
    server: JoinHandle<()>,
    _data_dir: Option<TempDir>,
}

impl TestNode {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestNode {
    fn drop(&mut self) {
        self.server.abort();
    }
}

pub struct Cluster {
    pub nodes: Vec<TestNode>,
}

impl Cluster {
    pub fn node(&self, name: &str) -> &TestNode {
        self.nodes
            .iter()
            .find(|n| n.name == name)
            .unwrap_or_else(|| panic!("no node named {name}"))
    }
}

/// Spawn one node over a pre-bound listener and an explicit data dir.
/// Used directly by restart scenarios; everything else goes through
/// [`spawn_cluster`].
#[allow(clippy::too_many_arguments)]
pub async fn spawn_node(
    name: &str,
    peers: Vec<String>,
    data_dir: &Path,
    endpoints: HashMap<String, String>,
    listener: tokio::net::TcpListener,
    options: &ClusterOptions,
    keep_dir: Option<TempDir>,
) -> TestNode {
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let ctx = Arc::new(NodeContext::new(name.to_string(), peers));
    let durability = Arc::new(Durability::new(
        ctx.clone(),
        DurabilityConfig {
            vote_timeout_secs: options.coordinator.vote_timeout.as_secs_f64(),
            ..DurabilityConfig::in_dir(data_dir)
        },
    ));
    durability.startup();
    let journal: Arc<dyn Journal> = durability.clone();

    let registry = Arc::new(Registry::new());
    let trust = Arc::new(
        TrustEngine::new(ctx.clone(), journal.clone(), options.trust.clone(), &registry).unwrap(),
    );

    let client = Arc::new(
        PeerClient::new(PeerClientConfig {
            timeout: Duration::from_millis(500),
            endpoints,
            ..Default::default()
        })
        .unwrap(),
    );

    let scanner = Arc::new(ScriptedScanner::default());
    let coordinator = Arc::new(
        Coordinator::new(
            ctx.clone(),
            trust.clone(),
            journal,
            client.clone(),
            scanner.clone(),
            options.coordinator.clone(),
            &registry,
        )
        .unwrap(),
    );

    let attack = options.attack.get(name).cloned();
    let detector = Arc::new(Detector::new(
        ctx.clone(),
        scanner.clone(),
        coordinator.clone(),
        DetectorConfig {
            attack: attack.clone(),
            ..Default::default()
        },
    ));

    let recovery = Arc::new(SelfRecovery::new(
        ctx.clone(),
        durability.clone(),
        client.clone(),
        options.recovery.clone(),
    ));
    let sync = Arc::new(ReplicaSync::new(
        ctx.clone(),
        durability.clone(),
        client.clone(),
        options.sync.clone(),
    ));

    let app_state = AppState {
        ctx: ctx.clone(),
        trust: trust.clone(),
        durability: durability.clone(),
        coordinator: coordinator.clone(),
        client: client.clone(),
        attack,
        registry,
    };
    let router = vigil_api::create_router(app_state);
    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });

    TestNode {
        name: name.to_string(),
        ctx,
        trust,
        durability,
        coordinator,
        detector,
        recovery,
        sync,
        scanner,
        client,
        base_url,
        server,
        _data_dir: keep_dir,
    }
}

/// Spawn a full cluster on loopback. Every node knows every other by
/// name through endpoint overrides.
pub async fn spawn_cluster(names: &[&str], options: ClusterOptions) -> Cluster {
    let mut listeners = Vec::new();
    let mut endpoints = HashMap::new();
    for name in names {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        endpoints.insert(
            name.to_string(),
            format!("http://{}", listener.local_addr().unwrap()),
        );
        listeners.push(listener);
    }

    let mut nodes = Vec::new();
    for (name, listener) in names.iter().zip(listeners) {
        let peers = names
            .iter()
            .filter(|n| n != &name)
            .map(|n| n.to_string())
            .collect();
        let dir = TempDir::new().unwrap();
        let path: PathBuf = dir.path().to_path_buf();
        nodes.push(
            spawn_node(
                name,
                peers,
                &path,
                endpoints.clone(),
                listener,
                &options,
                Some(dir),
            )
            .await,
        );
    }

    Cluster { nodes }
}

/// Wait until `check` passes or the deadline expires.
pub async fn wait_for(deadline: Duration, mut check: impl FnMut() -> bool) -> bool {
    let stop = tokio::time::Instant::now() + deadline;
    while tokio::time::Instant::now() < stop {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
