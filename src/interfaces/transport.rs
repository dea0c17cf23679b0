// ============================================================================
// Transport Interface
// Outbound delivery of pre-formatted messages to a chat channel
// ============================================================================

use crate::errors::TransportError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// A structured message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub title: String,
    /// RGB color, e.g. `0xff0000`
    pub color: u32,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub thumbnail: Option<String>,
}

impl OutboundMessage {
    pub fn new(title: impl Into<String>, color: u32, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            color,
            body: body.into(),
            timestamp: Utc::now(),
            thumbnail: None,
        }
    }

    /// Builder method: Set the timestamp
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Builder method: Set the thumbnail URL
    pub fn with_thumbnail(mut self, url: impl Into<String>) -> Self {
        self.thumbnail = Some(url.into());
        self
    }
}

/// Delivers messages; a failure means "retry next cycle"
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, channel: &str, message: &OutboundMessage) -> Result<(), TransportError>;
}

/// Transport that only logs, for dry runs
pub struct LoggingTransport;

#[async_trait]
impl Transport for LoggingTransport {
    async fn send(&self, channel: &str, message: &OutboundMessage) -> Result<(), TransportError> {
        tracing::info!(channel, title = %message.title, body = %message.body, "outbound message");
        Ok(())
    }
}
