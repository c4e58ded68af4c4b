//! Node runtime wiring every subsystem together

use crate::config::NodeSettings;
use crate::scanner::SystemScanner;
use anyhow::{Context, Result};
use prometheus::Registry;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info};
use vigil_api::AppState;
use vigil_consensus::{Coordinator, CoordinatorConfig, Detector, DetectorConfig};
use vigil_core::{AttackProfile, Journal, NodeContext};
use vigil_durability::{
    Durability, DurabilityConfig, RecoveryConfig, ReplicaSync, SelfRecovery, SyncConfig,
};
use vigil_net::{PeerClient, PeerClientConfig};
use vigil_trust::{TrustConfig, TrustEngine};

pub struct NodeRuntime {
    settings: NodeSettings,
    ctx: Arc<NodeContext>,
    trust: Arc<TrustEngine>,
    durability: Arc<Durability>,
    detector: Arc<Detector>,
    recovery: Arc<SelfRecovery>,
    sync: Arc<ReplicaSync>,
    app_state: AppState,
    tasks: Vec<JoinHandle<()>>,
}

impl NodeRuntime {
    pub fn new(settings: NodeSettings) -> Result<Self> {
        info!(node = %settings.name, peers = settings.peers.len(), "initializing node");

        let registry = Arc::new(Registry::new());
        let ctx = Arc::new(NodeContext::new(
            settings.name.clone(),
            settings.peers.clone(),
        ));

        // Durability first: the startup sequence rebuilds state from the
        // checkpoint and WAL before anything else reads it.
        let durability = Arc::new(Durability::new(
            ctx.clone(),
            DurabilityConfig::in_dir(&settings.data_dir),
        ));
        durability.startup();
        let journal: Arc<dyn Journal> = durability.clone();

        let trust = Arc::new(
            TrustEngine::new(ctx.clone(), journal.clone(), TrustConfig::default(), &registry)
                .context("failed to initialize trust engine")?,
        );

        let client = Arc::new(
            PeerClient::new(PeerClientConfig {
                port: settings.port,
                ..Default::default()
            })
            .context("failed to build peer client")?,
        );

        let scanner = Arc::new(SystemScanner::default());
        let coordinator = Arc::new(
            Coordinator::new(
                ctx.clone(),
                trust.clone(),
                journal,
                client.clone(),
                scanner.clone(),
                CoordinatorConfig::default(),
                &registry,
            )
            .context("failed to initialize coordinator")?,
        );

        let attack = settings.attack_mode.then(AttackProfile::default);
        if attack.is_some() {
            info!("running with the adversarial attack profile");
        }

        let detector = Arc::new(Detector::new(
            ctx.clone(),
            scanner,
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
            RecoveryConfig {
                controller_url: settings.controller_url.clone(),
                ..Default::default()
            },
        ));

        let sync = Arc::new(ReplicaSync::new(
            ctx.clone(),
            durability.clone(),
            client.clone(),
            SyncConfig::default(),
        ));

        let app_state = AppState {
            ctx: ctx.clone(),
            trust: trust.clone(),
            durability: durability.clone(),
            coordinator,
            client,
            attack,
            registry,
        };

        Ok(Self {
            settings,
            ctx,
            trust,
            durability,
            detector,
            recovery,
            sync,
            app_state,
            tasks: Vec::new(),
        })
    }

    /// Spawn every background loop and serve the peer endpoint until the
    /// process is told to stop.
    pub async fn run(&mut self) -> Result<()> {
        let router = vigil_api::create_router(self.app_state.clone());
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", self.settings.port))
            .await
            .context("failed to bind peer endpoint")?;
        info!(port = self.settings.port, "peer endpoint listening");

        self.tasks.push(tokio::spawn(self.detector.clone().run()));
        self.tasks.push(tokio::spawn(self.trust.clone().run_watchdog()));
        self.tasks.push(tokio::spawn(self.trust.clone().run_decay()));
        self.tasks.push(tokio::spawn(self.durability.clone().run_flush()));
        self.tasks.push(tokio::spawn(self.recovery.clone().run()));
        self.tasks.push(tokio::spawn(self.sync.clone().run()));
        info!("background loops started");

        if let Err(err) = axum::serve(listener, router).await {
            error!(%err, "peer endpoint stopped");
            return Err(err.into());
        }
        Ok(())
    }

    /// Stop background loops and cut a final checkpoint.
    pub fn shutdown(&mut self) {
        info!("initiating graceful shutdown");
        for task in self.tasks.drain(..) {
            task.abort();
        }
        self.durability.checkpoint_now();
        info!(version = self.ctx.read().version, "final checkpoint written");
    }
}
