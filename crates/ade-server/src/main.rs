// crates/ade-server/src/main.rs
// ============================================================================
// Module: ADE Server Binary
// Description: Entry point serving the v1 decision surface.
// Purpose: Initialize tracing, build the in-memory engine, and serve until
// shutdown.
// Dependencies: ade-server, tokio, tracing-subscriber
// ============================================================================

//! ## Overview
//! Binds to `ADE_BIND` (default `127.0.0.1:8080`) with an in-memory engine.
//! Scenario registration happens through the embedding application or tests;
//! the binary itself carries no authoring format.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use ade_server::EngineHandle;
use ade_server::serve;
use tracing_subscriber::EnvFilter;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Default bind address when `ADE_BIND` is unset.
const DEFAULT_BIND: &str = "127.0.0.1:8080";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("info")
        }))
        .init();

    let bind = std::env::var("ADE_BIND").unwrap_or_else(|_| DEFAULT_BIND.to_string());
    let addr: SocketAddr = bind.parse()?;
    let engine = Arc::new(EngineHandle::in_memory()?);
    serve(engine, addr).await?;
    Ok(())
}
