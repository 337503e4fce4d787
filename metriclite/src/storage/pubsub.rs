// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Publish/subscribe channel boundary

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::mpsc;

/// Publish/subscribe channel errors.
#[derive(Error, Debug)]
pub enum PubSubError {
    #[error("Channel unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid payload: {0}")]
    Payload(String),
}

/// Cluster-wide broadcast channel. Every subscriber on a channel receives
/// every payload published to it; delivery order across nodes is not
/// guaranteed relative to other traffic.
#[async_trait]
pub trait PubSubChannel: Send + Sync {
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), PubSubError>;

    async fn subscribe(&self, channel: &str) -> Result<mpsc::Receiver<Vec<u8>>, PubSubError>;
}

/// Process-local fan-out channel for embedding and tests. Subscribers with
/// full buffers or dropped receivers are skipped on publish.
#[derive(Default)]
pub struct LocalPubSub {
    subscribers: Mutex<HashMap<String, Vec<mpsc::Sender<Vec<u8>>>>>,
}

impl LocalPubSub {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PubSubChannel for LocalPubSub {
    async fn publish(&self, channel: &str, payload: Vec<u8>) -> Result<(), PubSubError> {
        let senders = {
            let mut subscribers = self.subscribers.lock();
            if let Some(senders) = subscribers.get_mut(channel) {
                senders.retain(|s| !s.is_closed());
                senders.clone()
            } else {
                Vec::new()
            }
        };
        for sender in senders {
            let _ = sender.send(payload.clone()).await;
        }
        Ok(())
    }

    async fn subscribe(&self, channel: &str) -> Result<mpsc::Receiver<Vec<u8>>, PubSubError> {
        let (sender, receiver) = mpsc::channel(64);
        self.subscribers
            .lock()
            .entry(channel.to_string())
            .or_default()
            .push(sender);
        Ok(receiver)
    }
}
