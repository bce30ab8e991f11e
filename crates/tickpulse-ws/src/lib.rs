//! Streaming feed client for a single instrument.
//!
//! Provides the transport half of the tracker:
//! - Explicit connection state machine (DISCONNECTED / CONNECTING / CONNECTED)
//! - Ticker + trade subscriptions on every successful open
//! - Text keep-alive (`"ping"` every 30s, `"pong"` acknowledged and dropped)
//! - Fixed-delay reconnect loop with no attempt cap
//! - Frame decoding into channel-tagged payloads

pub mod connection;
pub mod error;
pub mod fsm;
pub mod heartbeat;
pub mod message;

pub use connection::{FeedClient, FeedConfig, FeedEvent, FrameStats};
pub use error::{WsError, WsResult};
pub use fsm::{ConnectDecision, ConnectionFsm, FsmAction, ReconnectPlan};
pub use message::{decode_frame, ChannelKind, ChannelPayload, InboundFrame, SubscribeRequest};
pub use tickpulse_core::ConnectionState;

use std::sync::Once;

static INIT_CRYPTO: Once = Once::new();

/// Initialize the TLS crypto provider.
/// Must be called before any `wss://` connection is made.
pub fn init_crypto() {
    INIT_CRYPTO.call_once(|| {
        let _ = rustls::crypto::ring::default_provider().install_default();
    });
}
