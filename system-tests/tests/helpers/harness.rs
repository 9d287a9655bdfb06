// system-tests/tests/helpers/harness.rs
// ============================================================================
// Module: Engine and Server Harness
// Description: Engine construction and HTTP server spawning for suites.
// Purpose: One-line setup for in-process and over-the-wire tests.
// Dependencies: ade-core, ade-server, tokio
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use ade_core::AuditStore;
use ade_core::ExecutorRegistry;
use ade_core::InMemoryAuditStore;
use ade_core::InMemoryMemoryStore;
use ade_core::MemoryStore;
use ade_core::ScenarioRegistry;
use ade_core::SkillExecutor;
use ade_server::EngineHandle;
use ade_server::router;

use crate::helpers::scenarios::fitness_session;
use crate::helpers::scenarios::notification_timing;

/// Builds an engine with both demo scenarios and the built-in executor.
#[must_use]
pub fn demo_engine() -> Arc<EngineHandle> {
    demo_engine_with(None)
}

/// Builds the demo engine, optionally installing a skill-enhanced executor.
#[must_use]
pub fn demo_engine_with(enhanced: Option<Arc<dyn SkillExecutor>>) -> Arc<EngineHandle> {
    let registry = Arc::new(ScenarioRegistry::new());
    registry
        .register_scenario(notification_timing())
        .unwrap_or_else(|err| panic!("register notification-timing: {err}"));
    registry
        .register_scenario(fitness_session())
        .unwrap_or_else(|err| panic!("register fitness-session: {err}"));
    let mut executors = ExecutorRegistry::with_builtin();
    if let Some(executor) = enhanced {
        executors.register(executor);
    }
    let audit_store: Arc<dyn AuditStore> = Arc::new(InMemoryAuditStore::new());
    let memory_store: Arc<dyn MemoryStore> = Arc::new(InMemoryMemoryStore::new());
    let engine = EngineHandle::new(registry, executors, audit_store, memory_store)
        .unwrap_or_else(|err| panic!("engine build: {err}"));
    Arc::new(engine)
}

/// Spawns the HTTP server on an ephemeral port and returns its base URL.
pub async fn spawn_server(engine: Arc<EngineHandle>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap_or_else(|err| panic!("bind: {err}"));
    let addr: SocketAddr = listener.local_addr().unwrap_or_else(|err| panic!("addr: {err}"));
    let app = router(engine);
    tokio::spawn(async move {
        let _ = axum_serve(listener, app).await;
    });
    format!("http://{addr}")
}

/// Serves the router until the surrounding task is dropped.
async fn axum_serve(
    listener: tokio::net::TcpListener,
    app: axum::Router,
) -> Result<(), std::io::Error> {
    axum::serve(listener, app).await
}
