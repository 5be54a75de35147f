//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use proxyflow::config::ServiceConfig;
use proxyflow::http::HttpServer;
use proxyflow::lifecycle::Shutdown;
use proxyflow::model::{NewPoolEntry, ProxyType};
use proxyflow::pool::PoolOperator;
use proxyflow::Store;

pub const ADMIN_KEY: &str = "test-admin-key";

pub struct TestServer {
    pub addr: SocketAddr,
    pub store: Arc<Store>,
    pub shutdown: Shutdown,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

/// `count` datacenter entries on 10.0.0.x with the given capacity.
pub fn pool_entries(count: usize, max_users: u32) -> Vec<NewPoolEntry> {
    (0..count)
        .map(|i| {
            NewPoolEntry::new(ProxyType::Datacenter, format!("10.0.0.{}", i + 1), 3128)
                .with_max_users(max_users)
        })
        .collect()
}

/// Start a server on an ephemeral port with admin enabled and the pool
/// pre-seeded.
pub async fn start_server(pool: Vec<NewPoolEntry>) -> TestServer {
    let store = Arc::new(Store::new(10_000));
    if !pool.is_empty() {
        PoolOperator::new(store.clone()).add_entries(pool).await.unwrap();
    }

    let mut config = ServiceConfig::default();
    config.admin.enabled = true;
    config.admin.api_key = ADMIN_KEY.into();
    config.gateway.public_address = "gw.test".into();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    config.listener.bind_address = addr.to_string();

    let shutdown = Shutdown::new();
    let (_, config_updates) = mpsc::unbounded_channel();
    let server = HttpServer::with_store(config, store.clone());
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    // Wait for server to start
    tokio::time::sleep(Duration::from_millis(100)).await;

    TestServer { addr, store, shutdown }
}
