//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the Axum router for the user, proxy and admin APIs
//! - Wire up middleware (request ID, tracing, timeout, body limit, metrics)
//! - Apply hot-reloaded config to the running services
//! - Flush persisted state on shutdown

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::accounts::Accounts;
use crate::admin::setup_admin_router;
use crate::allocator::Allocator;
use crate::config::ServiceConfig;
use crate::gateway::GatewayResolver;
use crate::http::middleware::{track_metrics, user_auth_middleware};
use crate::http::request::{request_id_of, MakeRequestUuidV4};
use crate::http::{proxy, user};
use crate::lifecycle::shutdown::wait as shutdown_signal;
use crate::pool::PoolOperator;
use crate::store::{Store, StoreError};

/// The part of the state that is swapped on config reload.
pub struct InnerState {
    pub config: ServiceConfig,
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<InnerState>>,
    pub store: Arc<Store>,
    pub allocator: Arc<Allocator>,
    pub accounts: Arc<Accounts>,
    pub pool: Arc<PoolOperator>,
    pub resolver: Arc<GatewayResolver>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(config: ServiceConfig, store: Arc<Store>) -> Self {
        Self {
            allocator: Arc::new(Allocator::new(store.clone(), config.gateway.endpoint())),
            accounts: Arc::new(Accounts::new(store.clone())),
            pool: Arc::new(PoolOperator::new(store.clone())),
            resolver: Arc::new(GatewayResolver::new(store.clone())),
            inner: Arc::new(ArcSwap::from_pointee(InnerState { config })),
            store,
            started_at: Instant::now(),
        }
    }
}

/// HTTP server for the allocation API.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    /// Open the configured store and build the server around it.
    pub fn new(config: ServiceConfig) -> Result<Self, StoreError> {
        let store = match &config.storage.state_path {
            Some(path) => Store::open(Path::new(path), config.gateway.base_port, config.storage.autosave)?,
            None => Store::new(config.gateway.base_port),
        };
        Ok(Self::with_store(config, Arc::new(store)))
    }

    pub fn with_store(config: ServiceConfig, store: Arc<Store>) -> Self {
        let state = AppState::new(config.clone(), store);
        let router = Self::build_router(&config, state.clone());
        Self { router, state }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServiceConfig, state: AppState) -> Router {
        let authenticated = Router::new()
            .route("/user/me", get(user::me))
            .route("/user/subscription", get(user::subscription).put(user::change_plan))
            .route("/user/stats", get(user::stats))
            .route("/proxy/allocate", post(proxy::allocate))
            .route("/proxy/allocated", get(proxy::allocated))
            .route("/proxy/release", post(proxy::release))
            .route_layer(middleware::from_fn_with_state(state.clone(), user_auth_middleware));

        let mut app = Router::new()
            .route("/", get(root))
            .route("/health", get(health))
            .route("/auth/register", post(user::register))
            .route("/proxy/types", get(proxy::proxy_types))
            .merge(authenticated);

        if config.admin.enabled {
            app = app.merge(setup_admin_router(state.clone()));
        }

        app.route_layer(middleware::from_fn(track_metrics))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuidV4))
                    .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                        tracing::info_span!(
                            "request",
                            method = %req.method(),
                            uri = %req.uri(),
                            request_id = %request_id_of(req),
                        )
                    }))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(RequestBodyLimitLayer::new(config.security.max_body_size))
                    .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs))),
            )
    }

    /// Run the server until `shutdown` fires, applying config updates as
    /// they arrive. State is flushed to disk before returning.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ServiceConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let reload_state = self.state.clone();
        let reload_task = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                apply_config(&reload_state, config);
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal(shutdown))
            .await?;

        reload_task.abort();
        if let Some(path) = self.state.store.path() {
            match self.state.store.save().await {
                Ok(()) => tracing::info!(path = %path.display(), "State saved"),
                Err(e) => tracing::error!(path = %path.display(), error = %e, "Failed to save state on shutdown"),
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }
}

/// Swap in a reloaded config. Only the gateway endpoint and admin key take
/// effect live; listener, storage and middleware settings need a restart.
pub fn apply_config(state: &AppState, config: ServiceConfig) {
    let current = state.inner.load();
    if current.config.listener.bind_address != config.listener.bind_address
        || current.config.storage.state_path != config.storage.state_path
        || current.config.admin.enabled != config.admin.enabled
        || current.config.gateway.base_port != config.gateway.base_port
    {
        tracing::warn!("Some changed settings only take effect after a restart");
    }

    state.allocator.update_gateway(config.gateway.endpoint());
    tracing::info!(
        gateway = %config.gateway.public_address,
        listen_port = config.gateway.listen_port,
        "Applied reloaded config"
    );
    state.inner.store(Arc::new(InnerState { config }));
}

#[derive(Serialize)]
struct ServiceInfo {
    name: &'static str,
    version: &'static str,
}

async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Serialize)]
struct Health {
    status: &'static str,
    pool_entries: usize,
    users: usize,
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    let snapshot = state.store.snapshot();
    Json(Health {
        status: "healthy",
        pool_entries: snapshot.pool.len(),
        users: snapshot.users.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_apply_config_updates_gateway() {
        let server = HttpServer::with_store(ServiceConfig::default(), Arc::new(Store::new(10_000)));
        let state = server.state().clone();

        let mut config = ServiceConfig::default();
        config.gateway.public_address = "gw.example.net".into();
        config.gateway.listen_port = 9000;
        config.admin.api_key = "rotated".into();
        apply_config(&state, config);

        let gateway = state.allocator.gateway();
        assert_eq!(gateway.address, "gw.example.net");
        assert_eq!(gateway.listen_port, 9000);
        assert_eq!(state.inner.load().config.admin.api_key, "rotated");
    }

    #[tokio::test]
    async fn test_oversized_body_rejected_through_full_stack() {
        use axum::http::{header, StatusCode};
        use tower::ServiceExt;

        let mut config = ServiceConfig::default();
        config.security.max_body_size = 16;
        let server = HttpServer::with_store(config, Arc::new(Store::new(10_000)));

        let body = r#"{"username":"alice","email":"alice@example.com"}"#;
        let req = Request::builder()
            .method("POST")
            .uri("/auth/register")
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .unwrap();
        let res = server.router.clone().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(res.headers().contains_key("x-request-id"));

        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let res = server.router.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
