//! Common test utilities and helpers

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{routing::post, Json, Router};
use peer_latency::cluster::ClusterLifecycle;
use peer_latency::error::Result;
use peer_latency::logs::InMemoryLogSource;
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Cluster that only records the lifecycle calls it receives.
#[derive(Default)]
pub struct RecordingCluster {
    pub events: Mutex<Vec<&'static str>>,
}

impl RecordingCluster {
    pub fn events(&self) -> Vec<&'static str> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl ClusterLifecycle for RecordingCluster {
    async fn start(&self) -> Result<()> {
        self.events.lock().unwrap().push("start");
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.events.lock().unwrap().push("stop");
        Ok(())
    }
}

/// How one simulated peer reacts to a submitted transaction.
#[derive(Clone)]
pub struct SimulatedPeer {
    pub name: &'static str,
    pub received_at: &'static str,
    /// `None` for a peer that never reaches consensus
    pub consensus_at: Option<&'static str>,
}

/// Fake submission endpoint.
///
/// Every accepted transaction is recorded and makes the simulated peers log
/// a receive line at once and their consensus line shortly after, so the
/// samplers observe the log growing while they poll.
pub struct FakeCluster {
    pub endpoint: String,
    pub logs: InMemoryLogSource,
    pub transactions: Arc<Mutex<Vec<String>>>,
}

impl FakeCluster {
    pub async fn spawn(peers: Vec<SimulatedPeer>) -> Self {
        let logs = InMemoryLogSource::new();
        for peer in &peers {
            logs.register(peer.name);
        }

        let transactions = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&transactions);
        let peer_logs = logs.clone();

        let router = Router::new().route(
            "/send-transaction",
            post(move |Json(body): Json<Value>| {
                let sink = Arc::clone(&sink);
                let logs = peer_logs.clone();
                let peers = peers.clone();
                async move {
                    let tx = body["transaction"].as_str().unwrap_or_default().to_string();
                    sink.lock().unwrap().push(tx.clone());
                    for peer in &peers {
                        logs.append(
                            peer.name,
                            format!("{} - Received transaction {}", peer.received_at, tx),
                        );
                    }
                    tokio::spawn(async move {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        for peer in &peers {
                            if let Some(at) = peer.consensus_at {
                                logs.append(
                                    peer.name,
                                    format!("{} - \u{1b}[1;32mCONSENSUS\u{1b}[0m on block 1", at),
                                );
                            }
                        }
                    });
                    "Transaction received"
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            endpoint: format!("http://{}/send-transaction", addr),
            logs,
            transactions,
        }
    }
}
