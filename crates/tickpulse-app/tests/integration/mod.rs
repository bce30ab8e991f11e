//! Integration tests for tickpulse-app.
//!
//! These tests verify the interaction between components:
//! - Feed client connection lifecycle against a mock venue
//! - Tick flow from wire frames to published snapshots
//! - Symbol switching and reconnection

pub mod common;
