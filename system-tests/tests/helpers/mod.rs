// system-tests/tests/helpers/mod.rs
// ============================================================================
// Module: System Test Helpers
// Description: Shared helpers for ADE system-tests.
// Purpose: Provide demo scenarios, rogue components, and server harnesses.
// Dependencies: system-tests, ade-core, ade-server
// ============================================================================

#![allow(dead_code, reason = "Shared helpers are reused across multiple test suites.")]

pub mod harness;
pub mod rogue;
pub mod scenarios;
