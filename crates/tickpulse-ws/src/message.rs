//! Wire message types.
//!
//! Outbound: subscribe requests and the literal `"ping"` keep-alive.
//! Inbound: the literal `"pong"` reply, channel-tagged data frames
//! (`{"arg": {"channel": ..}, "data": [..]}`) and event frames
//! (`{"event": "subscribe" | "error", ..}`).

use crate::error::WsResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Keep-alive payload sent by the client.
pub const HEARTBEAT_PING: &str = "ping";
/// Keep-alive acknowledgement sent by the venue.
pub const HEARTBEAT_PONG: &str = "pong";

/// Market data channels subscribed per instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Ticker,
    Trade,
}

impl ChannelKind {
    /// Subscription order on every successful open.
    pub const ALL: [ChannelKind; 2] = [ChannelKind::Ticker, ChannelKind::Trade];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ticker => "ticker",
            Self::Trade => "trade",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "ticker" => Some(Self::Ticker),
            "trade" => Some(Self::Trade),
            _ => None,
        }
    }
}

impl std::fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One subscription target inside a subscribe request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeArg {
    #[serde(rename = "instType")]
    pub inst_type: String,
    pub channel: ChannelKind,
    #[serde(rename = "instId")]
    pub inst_id: String,
}

/// Outgoing subscribe request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub op: String,
    pub args: Vec<SubscribeArg>,
}

impl SubscribeRequest {
    /// Subscribe to a single channel for one instrument.
    pub fn single(inst_type: &str, channel: ChannelKind, inst_id: &str) -> Self {
        Self {
            op: "subscribe".to_string(),
            args: vec![SubscribeArg {
                inst_type: inst_type.to_string(),
                channel,
                inst_id: inst_id.to_string(),
            }],
        }
    }

    pub fn to_json(&self) -> WsResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Channel-tagged market data payload.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelPayload {
    /// Latest ticker snapshot (first element of `data`).
    Ticker {
        inst_id: Option<String>,
        payload: Value,
    },
    /// Trade prints in venue order.
    Trades {
        inst_id: Option<String>,
        payloads: Vec<Value>,
    },
}

impl ChannelPayload {
    pub fn channel(&self) -> ChannelKind {
        match self {
            Self::Ticker { .. } => ChannelKind::Ticker,
            Self::Trades { .. } => ChannelKind::Trade,
        }
    }
}

/// Decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// Keep-alive acknowledgement.
    Pong,
    /// Market data for a subscribed channel.
    Data(ChannelPayload),
    /// Venue event (subscribe ack, error report).
    Event {
        event: String,
        code: Option<Value>,
        msg: Option<String>,
    },
    /// Valid JSON with a shape we do not handle.
    Unrecognized,
}

#[derive(Debug, Deserialize)]
struct FrameArg {
    #[serde(default)]
    channel: Option<String>,
    #[serde(rename = "instId", default)]
    inst_id: Option<String>,
}

/// Decode a text frame.
///
/// Returns `Err` only when the text is not valid JSON; every other
/// oddity decodes to `InboundFrame::Unrecognized`.
pub fn decode_frame(text: &str) -> WsResult<InboundFrame> {
    if text == HEARTBEAT_PONG {
        return Ok(InboundFrame::Pong);
    }

    let value: Value = serde_json::from_str(text)?;
    let Some(obj) = value.as_object() else {
        return Ok(InboundFrame::Unrecognized);
    };

    let arg: Option<FrameArg> = obj
        .get("arg")
        .and_then(|a| serde_json::from_value(a.clone()).ok());

    if let Some(data) = obj.get("data").filter(|d| !d.is_null()) {
        let (channel, inst_id) = match arg {
            Some(FrameArg { channel, inst_id }) => (channel, inst_id),
            None => (None, None),
        };
        let frame = match channel.as_deref().and_then(ChannelKind::from_tag) {
            Some(ChannelKind::Ticker) => ticker_payload(data)
                .map(|payload| InboundFrame::Data(ChannelPayload::Ticker { inst_id, payload })),
            Some(ChannelKind::Trade) => data.as_array().map(|list| {
                InboundFrame::Data(ChannelPayload::Trades {
                    inst_id,
                    payloads: list.clone(),
                })
            }),
            None => None,
        };
        return Ok(frame.unwrap_or(InboundFrame::Unrecognized));
    }

    if let Some(event) = obj.get("event").and_then(Value::as_str) {
        return Ok(InboundFrame::Event {
            event: event.to_string(),
            code: obj.get("code").cloned(),
            msg: obj.get("msg").and_then(Value::as_str).map(str::to_string),
        });
    }

    Ok(InboundFrame::Unrecognized)
}

fn ticker_payload(data: &Value) -> Option<Value> {
    match data {
        Value::Array(items) => items.first().cloned(),
        Value::Object(_) => Some(data.clone()),
        _ => None,
    }
}
