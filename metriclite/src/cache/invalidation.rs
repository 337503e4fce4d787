// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Cluster-wide cache invalidation events
//!
//! Every node subscribes to one broadcast channel; a source-data mutation
//! publishes one event and every node evicts the event's exact
//! (metric id, time point) cross-product from its tiers. Targeting the
//! cross-product instead of a whole model keeps still-valid time points
//! cached. Event delivery races in-flight cache writes; that window is
//! accepted and bounded by the L1/L2 TTLs.

use super::hierarchy::CacheHierarchy;
use crate::storage::{PubSubChannel, PubSubError};
use chrono::Utc;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Default broadcast channel for invalidation events.
pub const INVALIDATION_CHANNEL: &str = "kpi:cache:invalidate";

/// One invalidation event. The metric ids crossed with the time points
/// define the exact eviction set; there is deliberately no wildcard form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheInvalidationEvent {
    pub model_id: String,
    pub metric_ids: Vec<String>,
    pub time_points: Vec<String>,
    pub timestamp_ms: i64,
}

impl CacheInvalidationEvent {
    pub fn new(
        model_id: impl Into<String>,
        metric_ids: Vec<String>,
        time_points: Vec<String>,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            metric_ids,
            time_points,
            timestamp_ms: Utc::now().timestamp_millis(),
        }
    }
}

/// Publishes invalidation events and applies received ones to the local
/// cache hierarchy.
pub struct InvalidationBus {
    channel: Arc<dyn PubSubChannel>,
    channel_name: String,
}

impl InvalidationBus {
    pub fn new(channel: Arc<dyn PubSubChannel>) -> Self {
        Self {
            channel,
            channel_name: INVALIDATION_CHANNEL.to_string(),
        }
    }

    pub fn with_channel_name(mut self, name: impl Into<String>) -> Self {
        self.channel_name = name.into();
        self
    }

    /// Broadcast one event to every node, including this one.
    pub async fn publish(
        &self,
        model_id: &str,
        metric_ids: Vec<String>,
        time_points: Vec<String>,
    ) -> Result<(), PubSubError> {
        let event = CacheInvalidationEvent::new(model_id, metric_ids, time_points);
        let payload =
            serde_json::to_vec(&event).map_err(|e| PubSubError::Payload(e.to_string()))?;
        debug!(
            "Publishing invalidation for model {} ({} metrics x {} time points)",
            event.model_id,
            event.metric_ids.len(),
            event.time_points.len()
        );
        self.channel.publish(&self.channel_name, payload).await
    }

    /// Spawn the subscriber loop. Each received event is consumed once:
    /// malformed payloads are logged and skipped, never retried.
    pub async fn start(
        &self,
        hierarchy: Arc<CacheHierarchy>,
    ) -> Result<JoinHandle<()>, PubSubError> {
        let mut receiver = self.channel.subscribe(&self.channel_name).await?;
        let channel_name = self.channel_name.clone();
        Ok(tokio::spawn(async move {
            while let Some(payload) = receiver.recv().await {
                let event: CacheInvalidationEvent = match serde_json::from_slice(&payload) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!("Dropping malformed invalidation event: {}", e);
                        continue;
                    }
                };
                apply_event(&hierarchy, &event).await;
            }
            debug!("Invalidation subscription on {} closed", channel_name);
        }))
    }
}

/// Evict the event's exact cross-product from every tier.
pub async fn apply_event(hierarchy: &CacheHierarchy, event: &CacheInvalidationEvent) {
    for metric_id in &event.metric_ids {
        for time_point in &event.time_points {
            hierarchy.invalidate(metric_id, time_point).await;
        }
    }
}
