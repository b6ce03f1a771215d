//! ChannelManager — owns every channel and merges their inbound streams.

use std::collections::HashMap;

use futures::stream;

use crate::channels::{Channel, IncomingMessage, MessageStream, OutgoingResponse};
use crate::error::ChannelError;

/// Registry of active channels.
pub struct ChannelManager {
    channels: HashMap<String, Box<dyn Channel>>,
}

impl ChannelManager {
    pub fn new() -> Self {
        Self {
            channels: HashMap::new(),
        }
    }

    /// Add a channel. A later channel with the same name replaces the earlier one.
    pub fn add(&mut self, channel: Box<dyn Channel>) {
        let name = channel.name().to_string();
        if self.channels.insert(name.clone(), channel).is_some() {
            tracing::warn!(channel = %name, "Replaced existing channel");
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.channels.keys().map(String::as_str).collect()
    }

    /// Start every channel, check it is healthy, and merge their streams into one.
    pub async fn start_all(&self) -> Result<MessageStream, ChannelError> {
        let mut streams = Vec::with_capacity(self.channels.len());
        for (name, channel) in &self.channels {
            let s = channel.start().await?;
            channel.health_check().await.map_err(|e| {
                tracing::warn!(channel = %name, "Channel health check failed: {}", e);
                ChannelError::HealthCheckFailed { name: name.clone() }
            })?;
            tracing::info!(channel = %name, "Channel started");
            streams.push(s);
        }
        Ok(Box::pin(stream::select_all(streams)))
    }

    /// Route a reply back to the channel the message came from.
    pub async fn respond(
        &self,
        msg: &IncomingMessage,
        response: OutgoingResponse,
    ) -> Result<(), ChannelError> {
        let channel = self
            .channels
            .get(&msg.channel)
            .ok_or_else(|| ChannelError::UnknownChannel(msg.channel.clone()))?;
        channel.respond(msg, response).await
    }

    /// Shut down every channel, logging (not propagating) individual failures.
    pub async fn shutdown_all(&self) {
        for (name, channel) in &self.channels {
            if let Err(e) = channel.shutdown().await {
                tracing::warn!(channel = %name, "Channel shutdown failed: {}", e);
            }
        }
    }
}

impl Default for ChannelManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use futures::StreamExt;

    use super::*;

    struct FixedChannel {
        name: &'static str,
        lines: Vec<&'static str>,
        sent: Arc<Mutex<Vec<String>>>,
        healthy: bool,
    }

    #[async_trait]
    impl Channel for FixedChannel {
        fn name(&self) -> &str {
            self.name
        }

        async fn start(&self) -> Result<MessageStream, ChannelError> {
            let msgs: Vec<IncomingMessage> = self
                .lines
                .iter()
                .map(|l| IncomingMessage::new(self.name, "u", l))
                .collect();
            Ok(Box::pin(stream::iter(msgs)))
        }

        async fn respond(
            &self,
            _msg: &IncomingMessage,
            response: OutgoingResponse,
        ) -> Result<(), ChannelError> {
            self.sent.lock().unwrap().push(response.content);
            Ok(())
        }

        async fn health_check(&self) -> Result<(), ChannelError> {
            if self.healthy {
                Ok(())
            } else {
                Err(ChannelError::StartupFailed {
                    name: self.name.into(),
                    reason: "not connected".into(),
                })
            }
        }

        async fn shutdown(&self) -> Result<(), ChannelError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn merges_streams_and_routes_replies() {
        let sent_a = Arc::new(Mutex::new(Vec::new()));
        let sent_b = Arc::new(Mutex::new(Vec::new()));
        let mut manager = ChannelManager::new();
        manager.add(Box::new(FixedChannel {
            name: "a",
            lines: vec!["one", "two"],
            sent: sent_a.clone(),
            healthy: true,
        }));
        manager.add(Box::new(FixedChannel {
            name: "b",
            lines: vec!["three"],
            sent: sent_b.clone(),
            healthy: true,
        }));

        let all: Vec<IncomingMessage> = manager.start_all().await.unwrap().collect().await;
        assert_eq!(all.len(), 3);

        let from_b = all.iter().find(|m| m.channel == "b").unwrap();
        manager
            .respond(from_b, OutgoingResponse::text("reply"))
            .await
            .unwrap();
        assert!(sent_a.lock().unwrap().is_empty());
        assert_eq!(sent_b.lock().unwrap().as_slice(), ["reply"]);
    }

    #[tokio::test]
    async fn unhealthy_channel_fails_startup() {
        let mut manager = ChannelManager::new();
        manager.add(Box::new(FixedChannel {
            name: "down",
            lines: Vec::new(),
            sent: Arc::new(Mutex::new(Vec::new())),
            healthy: false,
        }));
        assert_eq!(manager.names(), ["down"]);

        let err = match manager.start_all().await {
            Ok(_) => panic!("unhealthy channel started"),
            Err(e) => e,
        };
        assert!(matches!(err, ChannelError::HealthCheckFailed { name } if name == "down"));
    }

    #[tokio::test]
    async fn unknown_channel_is_an_error() {
        let manager = ChannelManager::new();
        let msg = IncomingMessage::new("nowhere", "u", "hi");
        let err = manager
            .respond(&msg, OutgoingResponse::text("x"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::UnknownChannel(name) if name == "nowhere"));
    }
}
