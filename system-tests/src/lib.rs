// system-tests/src/lib.rs
// ============================================================================
// Module: ADE System Tests
// Description: End-to-end suites for the Adaptive Decision Engine.
// Purpose: Host the integration test tree; the library itself is empty.
// Dependencies: ade-core, ade-server
// ============================================================================

//! ## Overview
//! End-to-end coverage lives under `tests/`: demo scenarios, governance
//! enforcement, learner isolation, determinism and replay, and the HTTP
//! surface. This library target exists only to anchor the test crate.
